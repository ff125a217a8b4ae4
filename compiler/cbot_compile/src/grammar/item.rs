//! Pass 1: class and function declarations.
//!
//! Bodies and initializer expressions are skipped here; their token
//! positions are queued for pass 2.

use std::rc::Rc;

use cbot_diagnostic::CompileErrorKind;
use cbot_ir::{
    ClassId, FnFlags, FunctionEntry, Kw, Param, Protection, Signature, Span, TokenType, TypeDesc,
    NO_LIMIT,
};
use cbot_value::{MemberDecl, MethodBody, MethodEntry};

use crate::types::{assignable, function_key};
use crate::{CResult, Compiler, PendingBody, PendingKind};

/// Modifiers in front of a declaration.
#[derive(Default)]
struct Modifiers {
    flags: FnFlags,
    protection: Protection,
    span: Option<Span>,
}

impl Compiler<'_> {
    /// Pass 1a: register every class name so that signatures and member
    /// types may refer to classes declared further down.
    pub(crate) fn declare_class_names(&mut self) -> CResult<()> {
        let env = self.env;
        self.cur.set_position(0);
        while !self.cur.is_at_end() {
            let public = self.cur.eat(Kw::Public);
            if self.cur.eat(Kw::Class) {
                let (name, span) = self.ident(CompileErrorKind::NoClassName)?;
                let defined = env
                    .classes_mut()
                    .define(&name, None, false, public, Some(self.program));
                let id = defined.map_err(|kind| self.fail(kind, span))?;
                self.classes.push(id);
            }
            self.skip_item();
        }
        Ok(())
    }

    /// Skip to the end of the current top-level item.
    fn skip_item(&mut self) {
        while !self.cur.is_at_end() {
            if self.cur.check(Kw::OpenBlk) {
                let _ = self.cur.skip_group(Kw::OpenBlk, Kw::CloseBlk);
                return;
            }
            if self.cur.eat(Kw::Semicolon) {
                return;
            }
            self.cur.bump();
        }
    }

    /// Pass 1b: class layouts, method signatures, function signatures.
    pub(crate) fn declare_items(&mut self) -> CResult<()> {
        self.cur.set_position(0);
        let mut class_index = 0;
        while !self.cur.is_at_end() {
            let mods = self.modifiers();
            if self.cur.eat(Kw::Class) {
                let Some(&id) = self.classes.get(class_index) else {
                    return self.err(CompileErrorKind::NoClassName, self.cur.span());
                };
                class_index += 1;
                self.class_declaration(id)?;
            } else {
                self.function_declaration(&mods)?;
            }
        }
        Ok(())
    }

    fn modifiers(&mut self) -> Modifiers {
        let mut mods = Modifiers::default();
        loop {
            let token = self.cur.current();
            match token.kw {
                Some(Kw::Public) => mods.flags |= FnFlags::PUBLIC,
                Some(Kw::Extern) => mods.flags |= FnFlags::EXTERN,
                Some(Kw::Static) => mods.flags |= FnFlags::STATIC,
                Some(Kw::Synchronized) => mods.flags |= FnFlags::SYNCHRONIZED,
                Some(Kw::Private) => mods.protection = Protection::Private,
                Some(Kw::Protected) => mods.protection = Protection::Protected,
                _ => return mods,
            }
            mods.span.get_or_insert(token.span);
            self.cur.bump();
        }
    }

    fn function_declaration(&mut self, mods: &Modifiers) -> CResult<()> {
        let start = mods.span.unwrap_or_else(|| self.cur.span());
        if !self.at_type() {
            return self.err(CompileErrorKind::NoType, self.cur.span());
        }
        let ret = self.parse_type()?;
        let (name, name_span) = self.ident(CompileErrorKind::NoFunc)?;
        let params = self.parameters()?;
        let flags = mods.flags & (FnFlags::EXTERN | FnFlags::PUBLIC);

        let types: Vec<TypeDesc> = params.iter().map(|p| p.ty.clone()).collect();
        let key = function_key(&self.env.classes(), None, &name, &types);
        if self.functions.iter().any(|f| f.key == key) {
            return self.err(CompileErrorKind::RedefFunc, name_span);
        }
        let sig = Signature {
            name: name.clone(),
            params,
            ret,
            flags,
            protection: Protection::Public,
            span: start.merge(name_span),
        };
        let entry = Rc::new(FunctionEntry::new(key, sig, self.program.raw()));
        tracing::trace!(key = %entry.key, "declared function");

        let pos = self.body_position()?;
        self.pending.push(PendingBody {
            kind: PendingKind::Function(Rc::clone(&entry)),
            pos,
        });
        self.by_name.entry(name).or_default().push(Rc::clone(&entry));
        self.functions.push(entry);
        Ok(())
    }

    /// Record where a `{ body }` starts and skip it.
    fn body_position(&mut self) -> CResult<usize> {
        if !self.cur.check(Kw::OpenBlk) {
            return self.err(CompileErrorKind::OpenBlock, self.cur.span());
        }
        let pos = self.cur.position();
        if !self.cur.skip_group(Kw::OpenBlk, Kw::CloseBlk) {
            let span = self.cur.token_span(pos);
            return self.err(CompileErrorKind::CloseBlock, span);
        }
        Ok(pos)
    }

    /// `( type name [= default], ... )`
    pub(crate) fn parameters(&mut self) -> CResult<Vec<Param>> {
        self.expect(Kw::OpenPar, CompileErrorKind::OpenPar)?;
        let mut params: Vec<Param> = Vec::new();
        if self.cur.eat(Kw::ClosePar) {
            return Ok(params);
        }
        loop {
            let start = self.cur.span();
            if self.cur.check(Kw::Void) {
                return self.err(CompileErrorKind::Void, start);
            }
            if !self.at_type() {
                return self.err(CompileErrorKind::NoType, start);
            }
            let ty = self.parse_type()?;
            let (name, name_span) = self.ident(CompileErrorKind::NoVar)?;
            let ty = self.array_suffixes(ty);
            if params.iter().any(|p| p.name == name) {
                return self.err(CompileErrorKind::RedefVar, name_span);
            }
            let default = if self.cur.eat(Kw::Assign) {
                let (lit, span) = self.default_value()?;
                if !assignable(&self.env.classes(), &ty, &lit.ty()) {
                    return self.err(CompileErrorKind::BadType1, span);
                }
                Some(lit)
            } else if params.iter().any(|p| p.default.is_some()) {
                return self.err(CompileErrorKind::DefaultValue, name_span);
            } else {
                None
            };
            params.push(Param {
                name,
                ty,
                default,
                span: start.merge(name_span),
            });
            if self.cur.eat(Kw::ClosePar) {
                return Ok(params);
            }
            self.expect(Kw::Comma, CompileErrorKind::ClosePar)?;
        }
    }

    fn class_declaration(&mut self, id: ClassId) -> CResult<()> {
        let env = self.env;
        let (name, name_span) = self.ident(CompileErrorKind::NoClassName)?;

        if self.cur.eat(Kw::Extends) {
            let (parent_name, span) = self.ident(CompileErrorKind::NoClassName)?;
            let Some(parent) = self.visible_class(&parent_name) else {
                return self.err(CompileErrorKind::UndefClass, span);
            };
            if parent == id || env.classes().is_child_of(parent, id) {
                return self.err(CompileErrorKind::UndefClass, span);
            }
            if let Some(def) = env.classes_mut().get_mut(id) {
                def.parent = Some(parent);
            }
        }
        tracing::trace!(class = %name, "declaring class");

        self.expect(Kw::OpenBlk, CompileErrorKind::OpenBlock)?;
        while !self.cur.eat(Kw::CloseBlk) {
            if self.cur.is_at_end() {
                return self.err(CompileErrorKind::CloseBlock, name_span);
            }
            let mods = self.modifiers();
            self.class_item(id, &name, &mods)?;
        }
        Ok(())
    }

    fn class_item(&mut self, class: ClassId, class_name: &str, mods: &Modifiers) -> CResult<()> {
        let token = self.cur.current();

        // Destructor: `~Name()` or `void ~Name()`.
        let void_skip = usize::from(token.is(Kw::Void));
        if self.cur.peek(void_skip).is(Kw::BitNot) {
            self.cur.set_position(self.cur.position() + void_skip + 1);
            let (name, span) = self.ident(CompileErrorKind::NoFunc)?;
            if name != class_name {
                return self.err(CompileErrorKind::NoFunc, span);
            }
            let flags = FnFlags::DESTRUCTOR;
            return self.method_declaration(class, class_name, &format!("~{name}"), TypeDesc::VOID, flags, mods, span);
        }

        // Constructor: `Name(...)` or `void Name(...)`.
        let ctor_name = self.cur.peek(void_skip);
        if ctor_name.ty == TokenType::Identifier
            && ctor_name.text == class_name
            && self.cur.peek(void_skip + 1).is(Kw::OpenPar)
        {
            self.cur.set_position(self.cur.position() + void_skip + 1);
            return self.method_declaration(
                class,
                class_name,
                class_name,
                TypeDesc::VOID,
                FnFlags::CONSTRUCTOR,
                mods,
                ctor_name.span,
            );
        }

        if !self.at_type() {
            return self.err(CompileErrorKind::NoType, token.span);
        }
        let ty = self.parse_type()?;
        let (name, span) = self.ident(CompileErrorKind::NoVar)?;
        if self.cur.check(Kw::OpenPar) {
            return self.method_declaration(class, class_name, &name, ty, FnFlags::empty(), mods, span);
        }
        self.member_declarators(class, ty, name, span, mods)
    }

    #[allow(clippy::too_many_arguments)]
    fn method_declaration(
        &mut self,
        class: ClassId,
        class_name: &str,
        name: &str,
        ret: TypeDesc,
        kind: FnFlags,
        mods: &Modifiers,
        span: Span,
    ) -> CResult<()> {
        let env = self.env;
        let params = self.parameters()?;
        if kind.contains(FnFlags::DESTRUCTOR) && !params.is_empty() {
            return self.err(CompileErrorKind::OverParam, span);
        }
        let types: Vec<TypeDesc> = params.iter().map(|p| p.ty.clone()).collect();
        let key = function_key(&env.classes(), Some(class_name), name, &types);
        let exists = env
            .classes()
            .get(class)
            .is_some_and(|def| def.method(&key).is_some());
        if exists {
            return self.err(CompileErrorKind::RedefFunc, span);
        }

        let flags = kind | (mods.flags & (FnFlags::STATIC | FnFlags::SYNCHRONIZED | FnFlags::PUBLIC));
        let sig = Signature {
            name: name.to_owned(),
            params,
            ret,
            flags,
            protection: mods.protection,
            span: mods.span.unwrap_or(span).merge(span),
        };
        let entry = Rc::new(FunctionEntry::new(key.clone(), sig, self.program.raw()));
        let pos = self.body_position()?;
        if let Some(def) = env.classes_mut().get_mut(class) {
            def.methods.push(MethodEntry {
                name: name.to_owned(),
                key,
                body: MethodBody::Script(Rc::clone(&entry)),
            });
        }
        self.pending.push(PendingBody {
            kind: PendingKind::Method { class, entry },
            pos,
        });
        Ok(())
    }

    /// `type a [= e], b[n], ...;` inside a class.
    fn member_declarators(
        &mut self,
        class: ClassId,
        base: TypeDesc,
        mut name: String,
        mut span: Span,
        mods: &Modifiers,
    ) -> CResult<()> {
        let env = self.env;
        loop {
            let pos = self.cur.position() - 1;
            let mut ty = base.clone();
            let mut sized = false;
            while self.cur.eat(Kw::OpenBracket) {
                sized |= !self.cur.check(Kw::CloseBracket);
                self.cur.skip_expression();
                self.expect(Kw::CloseBracket, CompileErrorKind::CloseIndex)?;
                ty = TypeDesc::array(ty, NO_LIMIT);
            }
            let has_init = self.cur.eat(Kw::Assign);
            if has_init {
                self.cur.skip_expression();
            }

            let decl = MemberDecl {
                name: name.clone(),
                ident: 0,
                ty: ty.clone(),
                protection: mods.protection,
                is_static: mods.flags.contains(FnFlags::STATIC),
                init: None,
            };
            let added = env.classes_mut().add_item(class, decl);
            added.map_err(|kind| self.fail(kind, span))?;
            if has_init || sized || ty.kind().is_array() {
                let index = env
                    .classes()
                    .get(class)
                    .map_or(0, |def| def.members.len().saturating_sub(1));
                self.pending.push(PendingBody {
                    kind: PendingKind::MemberInit { class, index },
                    pos,
                });
            }

            if self.cur.eat(Kw::Comma) {
                (name, span) = self.ident(CompileErrorKind::NoVar)?;
                continue;
            }
            self.expect(Kw::Semicolon, CompileErrorKind::NoTerminator)?;
            return Ok(());
        }
    }
}

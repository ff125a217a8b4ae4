//! Pass 2: function, method and member-initializer bodies.

use std::rc::Rc;

use cbot_diagnostic::CompileErrorKind;
use cbot_ir::{
    ClassId, Code, FnFlags, FunctionEntry, Kw, Literal, NodeId, NodeKind, ParamSlot, TypeDesc,
};

use crate::builder::CodeBuilder;
use crate::types::member_init_key;
use crate::{BodyCtx, CResult, Compiler, PendingKind};

impl Compiler<'_> {
    /// Compile every body queued by pass 1, stopping at the first error.
    pub(crate) fn compile_bodies(&mut self) -> CResult<()> {
        let pending = std::mem::take(&mut self.pending);
        for item in pending {
            match item.kind {
                PendingKind::Function(entry) => self.function_body(&entry, None, item.pos)?,
                PendingKind::Method { class, entry } => {
                    self.function_body(&entry, Some(class), item.pos)?;
                }
                PendingKind::MemberInit { class, index } => {
                    self.member_init(class, index, item.pos)?;
                }
            }
        }
        Ok(())
    }

    fn start_body(&mut self, body: BodyCtx) {
        self.cs.begin_body();
        self.code = CodeBuilder::new();
        if body.has_this {
            if let Some(class) = body.class {
                let ty = self.class_type(class);
                self.cs.declare_with("this", 0, ty);
            }
        }
        self.body = body;
    }

    fn function_body(
        &mut self,
        entry: &Rc<FunctionEntry>,
        class: Option<ClassId>,
        pos: usize,
    ) -> CResult<()> {
        let sig = &entry.sig;
        let has_this = class.is_some() && !sig.flags.contains(FnFlags::STATIC);
        let name = match class.and_then(|c| self.env.classes().name(c)) {
            Some(class_name) => format!("{class_name}::{}", sig.name),
            None => sig.name.clone(),
        };
        self.start_body(BodyCtx {
            class,
            has_this,
            ret: sig.ret.clone(),
            is_extern: sig.flags.contains(FnFlags::EXTERN),
            name: name.clone(),
        });

        let mut params = Vec::with_capacity(sig.params.len());
        for p in &sig.params {
            let ident = self.cs.declare(&p.name, p.ty.clone(), p.span)?;
            params.push(ParamSlot {
                name: p.name.clone(),
                ident,
                ty: p.ty.clone(),
            });
        }

        self.cur.set_position(pos);
        let root = self.block(true)?;
        if !sig.is_void() && !self.diverges(root) {
            let span = self.cur.previous_span();
            return self.err(CompileErrorKind::NoReturn, span);
        }

        let code = Code {
            key: entry.key.clone(),
            name,
            nodes: self.code.take(),
            root,
            params,
            ret: sig.ret.clone(),
            class,
            has_this,
            synchronized: sig.flags.contains(FnFlags::SYNCHRONIZED),
            span: sig.span,
        };
        tracing::trace!(key = %code.key, nodes = code.nodes.len(), "compiled body");
        *entry.code.borrow_mut() = Some(Rc::new(code));
        Ok(())
    }

    /// Member initializer: a single `Declare` node evaluated when an
    /// instance is created (or, for statics, on first use).
    fn member_init(&mut self, class: ClassId, index: usize, pos: usize) -> CResult<()> {
        let (decl, class_name) = {
            let classes = self.env.classes();
            let Some(def) = classes.get(class) else {
                return Ok(());
            };
            let Some(decl) = def.members.get(index) else {
                return Ok(());
            };
            (decl.clone(), Rc::clone(&def.name))
        };
        self.start_body(BodyCtx {
            class: Some(class),
            has_this: !decl.is_static,
            ret: TypeDesc::VOID,
            is_extern: false,
            name: format!("{class_name}::{}", decl.name),
        });

        self.cur.set_position(pos);
        let (_, span) = self.ident(CompileErrorKind::NoVar)?;
        let base = peel_arrays(&decl.ty, self.bracket_groups());
        let root = self.declarator(base, decl.name.clone(), span, Some(decl.ident), false)?;

        let code = Code {
            key: member_init_key(&class_name, &decl.name),
            name: self.body.name.clone(),
            nodes: self.code.take(),
            root,
            params: Vec::new(),
            ret: TypeDesc::VOID,
            class: Some(class),
            has_this: !decl.is_static,
            synchronized: false,
            span,
        };
        let mut classes = self.env.classes_mut();
        if let Some(member) = classes.get_mut(class).and_then(|def| def.members.get_mut(index)) {
            member.init = Some(Rc::new(code));
        }
        Ok(())
    }

    /// Number of `[...]` groups directly at the cursor.
    fn bracket_groups(&mut self) -> usize {
        let start = self.cur.position();
        let mut count = 0;
        while self.cur.check(Kw::OpenBracket) {
            if !self.cur.skip_group(Kw::OpenBracket, Kw::CloseBracket) {
                break;
            }
            count += 1;
        }
        self.cur.set_position(start);
        count
    }

    /// Whether control can never fall off the end of `node`.
    pub(crate) fn diverges(&self, node: NodeId) -> bool {
        match &self.code.node(node).kind {
            NodeKind::Return(_) | NodeKind::Throw(_) => true,
            NodeKind::Block { stmts, .. } => stmts.iter().any(|s| self.diverges(*s)),
            NodeKind::If {
                then,
                otherwise: Some(otherwise),
                ..
            } => self.diverges(*then) && self.diverges(*otherwise),
            NodeKind::While { cond, body, .. } => {
                self.is_true(*cond) && !self.breaks(*body, 0)
            }
            NodeKind::DoWhile { cond, body, .. } => {
                self.diverges(*body) || (self.is_true(*cond) && !self.breaks(*body, 0))
            }
            NodeKind::For { cond, body, .. } => {
                cond.map_or(true, |c| self.is_true(c)) && !self.breaks(*body, 0)
            }
            NodeKind::Try {
                body,
                catches,
                finally,
            } => {
                finally.is_some_and(|f| self.diverges(f))
                    || (self.diverges(*body) && catches.iter().all(|c| self.diverges(c.body)))
            }
            _ => false,
        }
    }

    fn is_true(&self, node: NodeId) -> bool {
        matches!(
            self.code.node(node).kind,
            NodeKind::Literal(Literal::Bool(true))
        )
    }

    /// Whether `node` contains a `break` that leaves the loop `depth`
    /// levels above it.
    fn breaks(&self, node: NodeId, depth: usize) -> bool {
        let kind = &self.code.node(node).kind;
        match kind {
            NodeKind::Break(Some(_)) => true,
            NodeKind::Break(None) => depth == 0,
            NodeKind::Block { stmts, .. } => stmts.iter().any(|s| self.breaks(*s, depth)),
            NodeKind::If { then, otherwise, .. } => {
                self.breaks(*then, depth) || otherwise.is_some_and(|o| self.breaks(o, depth))
            }
            NodeKind::While { body, .. }
            | NodeKind::DoWhile { body, .. }
            | NodeKind::For { body, .. }
            | NodeKind::Repeat { body, .. } => self.breaks(*body, depth + 1),
            NodeKind::Switch { body, .. } => body.iter().any(|s| self.breaks(*s, depth + 1)),
            NodeKind::Try {
                body,
                catches,
                finally,
            } => {
                self.breaks(*body, depth)
                    || catches.iter().any(|c| self.breaks(c.body, depth))
                    || finally.is_some_and(|f| self.breaks(f, depth))
            }
            _ => false,
        }
    }
}

/// Strip `n` array levels off `ty`.
fn peel_arrays(ty: &TypeDesc, n: usize) -> TypeDesc {
    let mut ty = ty;
    for _ in 0..n {
        match ty.elem() {
            Some(elem) => ty = elem,
            None => break,
        }
    }
    ty.clone()
}

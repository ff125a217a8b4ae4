//! Calls: argument lists, overload selection, functions, methods and
//! constructors.
//!
//! A plain `name(args)` resolves in this order: methods of the enclosing
//! class chain, host natives, functions of the unit, then public functions
//! of other programs. Methods bind statically to the overload chosen here.

use std::rc::Rc;

use cbot_diagnostic::CompileErrorKind;
use cbot_ir::{
    Access, ClassId, FnFlags, FunctionEntry, Kw, MethodRef, NodeId, NodeKind, Protection,
    Signature, Span, TypeDesc,
};
use cbot_value::{MethodBody, MethodEntry};
use smallvec::SmallVec;

use crate::types::conversion_cost;
use crate::{CResult, Compiler};

type ArgTypes = SmallVec<[TypeDesc; 4]>;

/// A method found along a class chain.
struct Candidate {
    class: ClassId,
    entry: MethodEntry,
}

impl Candidate {
    fn method_ref(&self) -> MethodRef {
        MethodRef {
            class: self.class,
            name: self.entry.name.clone(),
            key: self.entry.key.clone(),
        }
    }
}

impl Compiler<'_> {
    /// `( a, b, ... )`, returning the argument nodes and the list's span.
    pub(crate) fn call_args(&mut self) -> CResult<(Vec<NodeId>, Span)> {
        let open = self.expect(Kw::OpenPar, CompileErrorKind::OpenPar)?;
        let mut args = Vec::new();
        if !self.cur.check(Kw::ClosePar) {
            loop {
                args.push(self.expression()?);
                if !self.cur.eat(Kw::Comma) {
                    break;
                }
            }
        }
        let close = self.expect(Kw::ClosePar, CompileErrorKind::ClosePar)?;
        Ok((args, open.merge(close)))
    }

    fn arg_types(&self, args: &[NodeId]) -> ArgTypes {
        args.iter().map(|a| self.code.ty(*a).clone()).collect()
    }

    /// Pick the overload with the cheapest argument conversions.
    fn select(&mut self, sigs: &[&Signature], types: &[TypeDesc], span: Span) -> CResult<usize> {
        let mut best: Option<(u32, usize)> = None;
        let mut tie = false;
        let (mut too_few, mut too_many, mut bad_types) = (0, 0, 0);
        {
            let classes = self.env.classes();
            for (i, sig) in sigs.iter().enumerate() {
                if types.len() > sig.params.len() {
                    too_many += 1;
                    continue;
                }
                if types.len() < sig.required() {
                    too_few += 1;
                    continue;
                }
                let score = sig
                    .params
                    .iter()
                    .zip(types)
                    .map(|(p, t)| conversion_cost(&classes, &p.ty, t))
                    .try_fold(0u32, |acc, cost| cost.map(|c| acc + c));
                let Some(score) = score else {
                    bad_types += 1;
                    continue;
                };
                match best {
                    Some((s, _)) if score > s => {}
                    Some((s, _)) if score == s => tie = true,
                    _ => {
                        best = Some((score, i));
                        tie = false;
                    }
                }
            }
        }
        match best {
            Some((_, i)) if !tie => Ok(i),
            Some(_) => self.err(CompileErrorKind::AmbiguousCall, span),
            None => {
                let kind = if bad_types > 0 {
                    CompileErrorKind::BadParam
                } else if too_many == sigs.len() {
                    CompileErrorKind::OverParam
                } else if too_few == sigs.len() {
                    CompileErrorKind::LowParam
                } else {
                    CompileErrorKind::NbParam
                };
                self.err(kind, span)
            }
        }
    }

    /// Append literal nodes for omitted trailing parameters.
    fn append_defaults(&mut self, sig: &Signature, args: &mut Vec<NodeId>, span: Span) {
        for param in sig.params.iter().skip(args.len()) {
            if let Some(lit) = &param.default {
                let ty = lit.ty();
                args.push(self.code.push(NodeKind::Literal(lit.clone()), span, ty));
            }
        }
    }

    /// Methods named `name` along the chain of `class`, nearest first. An
    /// overload redeclared by a subclass hides the parent's.
    fn chain_methods(&self, class: ClassId, name: &str) -> Vec<Candidate> {
        let classes = self.env.classes();
        let mut found: Vec<Candidate> = Vec::new();
        for c in classes.ancestors(class) {
            let Some(def) = classes.get(c) else { continue };
            for m in def.methods_named(name) {
                let special = m.signature().is_some_and(|s| {
                    s.flags.intersects(FnFlags::CONSTRUCTOR | FnFlags::DESTRUCTOR)
                });
                if special {
                    continue;
                }
                let hidden = found.iter().any(|f| same_params(&f.entry, m));
                if !hidden {
                    found.push(Candidate {
                        class: c,
                        entry: m.clone(),
                    });
                }
            }
        }
        found
    }

    /// `name(args)` with the cursor on `(`.
    pub(crate) fn function_call(&mut self, name: &str, name_span: Span) -> CResult<NodeId> {
        if let Some(class) = self.body.class {
            if !self.chain_methods(class, name).is_empty() {
                return self.method_call(Access::this(), class, name, name_span, false);
            }
        }

        let (mut args, arg_span) = self.call_args()?;
        let span = name_span.merge(arg_span);
        let types = self.arg_types(&args);

        if let Some(native) = self.env.native(name) {
            let check = Rc::clone(&native.check);
            let ret = match check(types.as_slice(), &mut *self.user) {
                Ok(ret) => ret,
                Err(kind) => return self.err(kind, span),
            };
            return Ok(self.code.push(
                NodeKind::NativeCall {
                    name: name.to_owned(),
                    args,
                },
                span,
                ret,
            ));
        }

        let mut candidates: Vec<Rc<FunctionEntry>> =
            self.by_name.get(name).cloned().unwrap_or_default();
        if candidates.is_empty() {
            let own = self.program.raw();
            candidates = self
                .env
                .publics_named(name)
                .into_iter()
                .filter(|f| f.owner != own)
                .collect();
        }
        if candidates.is_empty() {
            return self.err(CompileErrorKind::UndefCall, name_span);
        }

        let sigs: Vec<&Signature> = candidates.iter().map(|f| &f.sig).collect();
        let chosen = self.select(&sigs, &types, span)?;
        let func = Rc::clone(&candidates[chosen]);
        self.append_defaults(&func.sig, &mut args, span);
        let ret = func.sig.ret.clone();
        Ok(self.code.push(NodeKind::Call { func, args }, span, ret))
    }

    /// `receiver.name(args)` on an object of static class `class`, with the
    /// cursor on `(`. `static_only` is set for `ClassName.name(args)`.
    pub(crate) fn method_call(
        &mut self,
        receiver: Access,
        class: ClassId,
        name: &str,
        name_span: Span,
        static_only: bool,
    ) -> CResult<NodeId> {
        let candidates = self.chain_methods(class, name);
        let (mut args, arg_span) = self.call_args()?;
        let span = name_span.merge(arg_span);
        let types = self.arg_types(&args);
        if candidates.is_empty() {
            return self.err(CompileErrorKind::UndefCall, name_span);
        }

        // Natives have no signature; the nearest one decides on its own.
        if let Some(native) = candidates.iter().find_map(|c| match &c.entry.body {
            MethodBody::Native(native) => Some((c.method_ref(), Rc::clone(&native.check))),
            MethodBody::Script(_) => None,
        }) {
            let (method, check) = native;
            if static_only {
                return self.err(CompileErrorKind::UndefCall, name_span);
            }
            let this_ty = self.class_type(class);
            let ret = match check(&this_ty, types.as_slice(), &mut *self.user) {
                Ok(ret) => ret,
                Err(kind) => return self.err(kind, span),
            };
            return Ok(self.code.push(
                NodeKind::MethodCall {
                    receiver,
                    method,
                    args,
                },
                span,
                ret,
            ));
        }

        let scripts: Vec<(&Candidate, &Rc<FunctionEntry>)> = candidates
            .iter()
            .filter_map(|c| match &c.entry.body {
                MethodBody::Script(entry) => Some((c, entry)),
                MethodBody::Native(_) => None,
            })
            .collect();
        let sigs: Vec<&Signature> = scripts.iter().map(|(_, e)| &e.sig).collect();
        let chosen = self.select(&sigs, &types, span)?;
        let (candidate, entry) = scripts[chosen];

        self.method_visible(candidate.class, entry.sig.protection, name_span)?;
        self.append_defaults(&entry.sig, &mut args, span);
        let ret = entry.sig.ret.clone();

        if entry.sig.flags.contains(FnFlags::STATIC) {
            let func = Rc::clone(entry);
            return Ok(self.code.push(NodeKind::Call { func, args }, span, ret));
        }
        let implicit_this = matches!(receiver.root, cbot_ir::AccessRoot::This);
        if static_only || (implicit_this && !self.body.has_this) {
            return self.err(CompileErrorKind::UndefCall, name_span);
        }
        Ok(self.code.push(
            NodeKind::MethodCall {
                receiver,
                method: candidate.method_ref(),
                args,
            },
            span,
            ret,
        ))
    }

    fn method_visible(&mut self, owner: ClassId, protection: Protection, span: Span) -> CResult<()> {
        let visible = match protection {
            Protection::Public | Protection::ReadOnly => true,
            Protection::Protected => self
                .body
                .class
                .is_some_and(|c| self.env.classes().is_child_of(c, owner)),
            Protection::Private => self.body.class == Some(owner),
        };
        if visible {
            Ok(())
        } else {
            self.err(CompileErrorKind::Private, span)
        }
    }

    /// `super.name(args)`: a method of the parent chain on `this`.
    pub(crate) fn super_call(&mut self) -> CResult<NodeId> {
        let start = self.cur.bump().span;
        let parent = self
            .body
            .class
            .filter(|_| self.body.has_this)
            .and_then(|c| self.env.classes().get(c).and_then(|def| def.parent));
        let Some(parent) = parent else {
            return self.err(CompileErrorKind::NoClassName, start);
        };
        self.expect(Kw::Dot, CompileErrorKind::UndefItem)?;
        let (name, span) = self.ident(CompileErrorKind::NoFunc)?;
        if !self.cur.check(Kw::OpenPar) {
            return self.err(CompileErrorKind::OpenPar, self.cur.span());
        }
        self.method_call(Access::this(), parent, &name, span, false)
    }

    /// Constructor of `class` for `args`. Only the class's own constructors
    /// are considered; with no arguments and none declared, the nearest
    /// argument-free constructor up the chain runs instead.
    pub(crate) fn constructor(
        &mut self,
        class: ClassId,
        mut args: Vec<NodeId>,
        span: Span,
    ) -> CResult<(Option<MethodRef>, Vec<NodeId>)> {
        let own = self.constructors(class);
        if own.is_empty() {
            if !args.is_empty() {
                return self.err(CompileErrorKind::NoConstruct, span);
            }
            let chain = self.env.classes().ancestors(class);
            let inherited = chain.into_iter().skip(1).find_map(|c| {
                self.constructors(c)
                    .into_iter()
                    .find(|(_, e)| e.sig.required() == 0)
            });
            let Some((candidate, entry)) = inherited else {
                return Ok((None, args));
            };
            self.append_defaults(&entry.sig, &mut args, span);
            return Ok((Some(candidate.method_ref()), args));
        }

        let types = self.arg_types(&args);
        let sigs: Vec<&Signature> = own.iter().map(|(_, e)| &e.sig).collect();
        let chosen = self.select(&sigs, &types, span)?;
        let (candidate, entry) = &own[chosen];
        self.method_visible(class, entry.sig.protection, span)?;
        self.append_defaults(&entry.sig, &mut args, span);
        Ok((Some(candidate.method_ref()), args))
    }

    fn constructors(&self, class: ClassId) -> Vec<(Candidate, Rc<FunctionEntry>)> {
        let classes = self.env.classes();
        let Some(def) = classes.get(class) else {
            return Vec::new();
        };
        def.methods_named(&def.name)
            .filter_map(|m| match &m.body {
                MethodBody::Script(entry) if entry.sig.flags.contains(FnFlags::CONSTRUCTOR) => {
                    Some((
                        Candidate {
                            class,
                            entry: m.clone(),
                        },
                        Rc::clone(entry),
                    ))
                }
                _ => None,
            })
            .collect()
    }
}

/// Whether two methods take the same parameter types.
fn same_params(a: &MethodEntry, b: &MethodEntry) -> bool {
    match (a.signature(), b.signature()) {
        (Some(x), Some(y)) => {
            x.params.len() == y.params.len()
                && x.params.iter().zip(&y.params).all(|(p, q)| p.ty.compare(&q.ty))
        }
        (None, None) => true,
        _ => false,
    }
}

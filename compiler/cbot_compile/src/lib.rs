//! Two-pass compiler for CBot.
//!
//! Pass 1 declares: every class (name, parent, members, method signatures)
//! and every function signature, so bodies may refer to anything in the
//! unit regardless of declaration order. Pass 2 compiles member
//! initializers and bodies into [`Code`](cbot_ir::Code) trees, type checking
//! against what pass 1 declared.
//!
//! Classes are registered in the [`Environment`] during pass 1. If the unit
//! fails to compile, everything it registered is withdrawn again and the
//! first error is returned.

mod builder;
mod cstack;
mod cursor;
mod grammar;
pub mod types;

use std::any::Any;
use std::rc::Rc;

use cbot_diagnostic::{CompileError, CompileErrorKind};
use cbot_ir::{ClassId, FnFlags, FunctionEntry, Span, TokenList, TypeDesc};
use cbot_value::{Environment, ProgramId};
use rustc_hash::FxHashMap;

use builder::CodeBuilder;
use cstack::CStack;
use cursor::Cursor;

pub(crate) type CResult<T> = Result<T, CompileError>;

/// What a successful compile produced.
#[derive(Debug)]
pub struct Unit {
    pub tokens: TokenList,
    /// Top-level functions in declaration order.
    pub functions: Vec<Rc<FunctionEntry>>,
    /// Classes declared by the unit.
    pub classes: Vec<ClassId>,
}

impl Unit {
    /// Names of the `extern` functions, in declaration order.
    pub fn extern_names(&self) -> Vec<String> {
        self.functions
            .iter()
            .filter(|f| f.sig.flags.contains(FnFlags::EXTERN))
            .map(|f| f.sig.name.clone())
            .collect()
    }

    /// The `extern` function `name` that can be started without arguments.
    pub fn entry(&self, name: &str) -> Option<Rc<FunctionEntry>> {
        self.functions
            .iter()
            .find(|f| {
                f.sig.name == name && f.sig.flags.contains(FnFlags::EXTERN) && f.sig.required() == 0
            })
            .cloned()
    }

    pub fn function_by_key(&self, key: &str) -> Option<Rc<FunctionEntry>> {
        self.functions.iter().find(|f| f.key == key).cloned()
    }

    /// Empty every body slot. Calls still pointing at them then fail with
    /// an undefined-function error, and reference cycles through the code
    /// are broken.
    pub fn clear(&self) {
        for f in &self.functions {
            f.code.borrow_mut().take();
        }
    }
}

/// Compile `source` for `program`.
#[tracing::instrument(level = "debug", skip_all, fields(%program))]
pub fn compile(
    env: &Environment,
    program: ProgramId,
    source: &str,
    user: &mut dyn Any,
) -> Result<Unit, CompileError> {
    let tokens = cbot_lexer::tokenize(source, |name| env.defined(name))?;
    tracing::trace!(tokens = tokens.len(), "tokenized");

    let mut compiler = Compiler::new(env, program, &tokens, user);
    let outcome = compiler.compile_unit();
    let (functions, classes, first_error) = compiler.finish();

    let outcome = outcome.and_then(|()| publish(env, &functions));
    if let Err(err) = outcome {
        for f in &functions {
            f.code.borrow_mut().take();
        }
        env.unregister_program(program);
        let err = first_error.unwrap_or(err);
        tracing::debug!(code = err.code(), span = %err.span, "compile failed");
        return Err(err);
    }

    let mut registry = env.classes_mut();
    for class in &classes {
        if let Some(def) = registry.get_mut(*class) {
            def.compiled = true;
        }
    }
    drop(registry);

    tracing::debug!(functions = functions.len(), classes = classes.len(), "compiled");
    Ok(Unit {
        tokens,
        functions,
        classes,
    })
}

fn publish(env: &Environment, functions: &[Rc<FunctionEntry>]) -> CResult<()> {
    for f in functions.iter().filter(|f| f.sig.flags.contains(FnFlags::PUBLIC)) {
        env.add_public(Rc::clone(f))
            .map_err(|kind| CompileError::new(kind, f.sig.span))?;
    }
    Ok(())
}

/// Body still to be compiled by pass 2.
#[derive(Debug)]
pub(crate) enum PendingKind {
    Function(Rc<FunctionEntry>),
    Method { class: ClassId, entry: Rc<FunctionEntry> },
    /// Own member `index` of `class`, declarator starting at the token.
    MemberInit { class: ClassId, index: usize },
}

#[derive(Debug)]
pub(crate) struct PendingBody {
    pub kind: PendingKind,
    /// Token index where the body (or declarator) starts.
    pub pos: usize,
}

/// The body being compiled.
#[derive(Clone, Debug, Default)]
pub(crate) struct BodyCtx {
    pub class: Option<ClassId>,
    pub has_this: bool,
    pub ret: TypeDesc,
    /// `extern` entry points may return a value from a `void` body.
    pub is_extern: bool,
    /// The function name, for error messages and run positions.
    pub name: String,
}

pub(crate) struct Compiler<'a> {
    env: &'a Environment,
    program: ProgramId,
    cur: Cursor<'a>,
    cs: CStack,
    user: &'a mut dyn Any,
    functions: Vec<Rc<FunctionEntry>>,
    by_name: FxHashMap<String, Vec<Rc<FunctionEntry>>>,
    classes: Vec<ClassId>,
    pending: Vec<PendingBody>,
    body: BodyCtx,
    code: CodeBuilder,
}

impl<'a> Compiler<'a> {
    fn new(
        env: &'a Environment,
        program: ProgramId,
        tokens: &'a TokenList,
        user: &'a mut dyn Any,
    ) -> Self {
        Compiler {
            env,
            program,
            cur: Cursor::new(tokens),
            cs: CStack::new(),
            user,
            functions: Vec::new(),
            by_name: FxHashMap::default(),
            classes: Vec::new(),
            pending: Vec::new(),
            body: BodyCtx::default(),
            code: CodeBuilder::new(),
        }
    }

    fn compile_unit(&mut self) -> CResult<()> {
        self.declare_class_names()?;
        self.declare_items()?;
        self.compile_bodies()
    }

    fn finish(self) -> (Vec<Rc<FunctionEntry>>, Vec<ClassId>, Option<CompileError>) {
        let error = self.cs.error().cloned();
        (self.functions, self.classes, error)
    }

    /// Record `kind` at `span` and return the error to propagate.
    pub(crate) fn fail(&mut self, kind: CompileErrorKind, span: Span) -> CompileError {
        self.cs.fail(kind, span)
    }

    pub(crate) fn err<T>(&mut self, kind: CompileErrorKind, span: Span) -> CResult<T> {
        Err(self.cs.fail(kind, span))
    }

    /// Consume `kw` or fail with `kind` at the current token.
    pub(crate) fn expect(&mut self, kw: cbot_ir::Kw, kind: CompileErrorKind) -> CResult<Span> {
        if self.cur.check(kw) {
            Ok(self.cur.bump().span)
        } else {
            let span = self.cur.span();
            self.err(kind, span)
        }
    }
}

#[cfg(test)]
mod tests;

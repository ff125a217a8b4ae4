//! Compile stack: error slot, variable scopes, last expression type.
//!
//! The error slot is sticky: the first error recorded wins and later
//! failures are ignored. Every failing parse function still returns `Err`,
//! but the error reported for the unit is always the first one.

use cbot_diagnostic::{CompileError, CompileErrorKind};
use cbot_ir::{Span, TypeDesc};

/// A variable visible in the body being compiled.
#[derive(Clone, Debug, PartialEq)]
pub struct LocalVar {
    pub name: String,
    pub ident: u64,
    pub ty: TypeDesc,
}

/// A `break` target.
#[derive(Clone, Debug, PartialEq)]
pub struct LoopCtx {
    pub label: Option<String>,
    /// Switches accept `break` but not `continue`.
    pub is_switch: bool,
}

#[derive(Debug, Default)]
pub struct CStack {
    error: Option<CompileError>,
    scopes: Vec<Vec<LocalVar>>,
    loops: Vec<LoopCtx>,
    last_ty: TypeDesc,
    next_ident: u64,
}

impl CStack {
    pub fn new() -> Self {
        CStack::default()
    }

    /// Record an error (unless one is already set) and return the error to
    /// propagate, which is always the first one.
    pub fn fail(&mut self, kind: CompileErrorKind, span: Span) -> CompileError {
        self.error
            .get_or_insert_with(|| CompileError::new(kind, span))
            .clone()
    }

    pub fn error(&self) -> Option<&CompileError> {
        self.error.as_ref()
    }

    /// Start a fresh body: no scopes, no loops.
    pub fn begin_body(&mut self) {
        self.scopes.clear();
        self.loops.clear();
        self.scopes.push(Vec::new());
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(Vec::new());
    }

    pub fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    pub fn new_ident(&mut self) -> u64 {
        self.next_ident += 1;
        self.next_ident
    }

    /// Declare a local in the innermost scope. Shadowing a variable of an
    /// enclosing scope of the same body is a redefinition.
    pub fn declare(&mut self, name: &str, ty: TypeDesc, span: Span) -> Result<u64, CompileError> {
        if self.lookup(name).is_some() {
            return Err(self.fail(CompileErrorKind::RedefVar, span));
        }
        let ident = self.new_ident();
        self.declare_with(name, ident, ty);
        Ok(ident)
    }

    /// Declare a local with a fixed identifier (`this`).
    pub fn declare_with(&mut self, name: &str, ident: u64, ty: TypeDesc) {
        if self.scopes.is_empty() {
            self.scopes.push(Vec::new());
        }
        if let Some(scope) = self.scopes.last_mut() {
            scope.push(LocalVar {
                name: name.to_owned(),
                ident,
                ty,
            });
        }
    }

    pub fn lookup(&self, name: &str) -> Option<&LocalVar> {
        self.scopes
            .iter()
            .rev()
            .flat_map(|scope| scope.iter().rev())
            .find(|var| var.name == name)
    }

    pub fn push_loop(&mut self, ctx: LoopCtx) {
        self.loops.push(ctx);
    }

    pub fn pop_loop(&mut self) {
        self.loops.pop();
    }

    /// Check that `break`/`continue` with an optional label has a target.
    pub fn check_jump(&mut self, label: Option<&str>, is_continue: bool, span: Span) -> Result<(), CompileError> {
        let usable = |ctx: &&LoopCtx| !(is_continue && ctx.is_switch);
        match label {
            None => {
                if self.loops.iter().rev().any(|ctx| usable(&ctx)) {
                    Ok(())
                } else {
                    Err(self.fail(CompileErrorKind::BreakOutside, span))
                }
            }
            Some(label) => {
                if self
                    .loops
                    .iter()
                    .filter(usable)
                    .any(|ctx| ctx.label.as_deref() == Some(label))
                {
                    Ok(())
                } else {
                    Err(self.fail(CompileErrorKind::UndefLabel, span))
                }
            }
        }
    }

    /// Type of the full expression compiled last.
    #[inline]
    pub fn set_last_type(&mut self, ty: TypeDesc) {
        self.last_ty = ty;
    }

    #[inline]
    pub fn last_type(&self) -> &TypeDesc {
        &self.last_ty
    }
}

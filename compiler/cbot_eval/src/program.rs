//! The host-facing program façade.

use std::any::Any;
use std::io::{Read, Write};
use std::rc::Rc;

use cbot_compile::Unit;
use cbot_diagnostic::{CompileError, RuntimeError, RuntimeErrorKind};
use cbot_ir::{NodeKind, Span};
use cbot_value::{Environment, MethodBody, ProgramId, Variable};
use thiserror::Error;

use crate::errors::StateResult;
use crate::exec::Exec;
use crate::persist;
use crate::stack::{ExecStack, Frame};

/// Why the last compile or run failed.
#[derive(Clone, Debug, Error)]
pub enum ProgramError {
    #[error(transparent)]
    Compile(CompileError),
    #[error(transparent)]
    Runtime(RuntimeError),
}

impl ProgramError {
    pub fn code(&self) -> i32 {
        match self {
            ProgramError::Compile(err) => err.code(),
            ProgramError::Runtime(err) => err.code(),
        }
    }

    pub fn span(&self) -> Span {
        match self {
            ProgramError::Compile(err) => err.span,
            ProgramError::Runtime(err) => err.span,
        }
    }
}

/// One compiled script and, while it runs, its execution stack.
///
/// ```text
/// compile ──► start(name) ──► run(budget) … run(budget) ──► finished
///                                  │
///                                  └── stop() / save_state / restore_state
/// ```
pub struct Program {
    pub(crate) env: Rc<Environment>,
    pub(crate) id: ProgramId,
    pub(crate) unit: Option<Unit>,
    pub(crate) error: Option<ProgramError>,
    pub(crate) stack: Option<ExecStack>,
    pub(crate) entry: Option<String>,
    pub(crate) result: Option<Variable>,
    pub(crate) budget: i32,
}

impl Program {
    pub fn new(env: &Rc<Environment>) -> Self {
        Program {
            env: Rc::clone(env),
            id: env.next_program_id(),
            unit: None,
            error: None,
            stack: None,
            entry: None,
            result: None,
            budget: env.config().default_budget,
        }
    }

    #[inline]
    pub fn id(&self) -> ProgramId {
        self.id
    }

    #[inline]
    pub fn env(&self) -> &Rc<Environment> {
        &self.env
    }

    #[inline]
    pub fn is_compiled(&self) -> bool {
        self.unit.is_some()
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.stack.is_some()
    }

    pub fn unit(&self) -> Option<&Unit> {
        self.unit.as_ref()
    }

    /// Compile `source`, replacing whatever was compiled before. On failure
    /// the program is left uncompiled with the error available from
    /// [`Program::error`].
    #[tracing::instrument(level = "debug", skip_all, fields(program = %self.id))]
    pub fn compile(&mut self, source: &str, user: &mut dyn Any) -> bool {
        self.stop();
        self.discard_unit();
        self.finalize(user);
        self.error = None;
        self.result = None;
        self.entry = None;
        match cbot_compile::compile(&self.env, self.id, source, user) {
            Ok(unit) => {
                self.unit = Some(unit);
                true
            }
            Err(err) => {
                self.error = Some(ProgramError::Compile(err));
                false
            }
        }
    }

    /// Names of the `extern` functions of the compiled unit.
    pub fn extern_names(&self) -> Vec<String> {
        self.unit.as_ref().map(Unit::extern_names).unwrap_or_default()
    }

    /// Prepare to run the `extern` function `name`.
    #[tracing::instrument(level = "debug", skip(self), fields(program = %self.id))]
    pub fn start(&mut self, name: &str) -> bool {
        self.stop();
        self.error = None;
        self.result = None;
        let code = self
            .unit
            .as_ref()
            .and_then(|unit| unit.entry(name))
            .and_then(|entry| entry.code());
        let Some(code) = code else {
            let span = Span::new(0, 0);
            self.error = Some(ProgramError::Runtime(RuntimeError::new(
                RuntimeErrorKind::NoRun,
                span,
            )));
            self.entry = None;
            return false;
        };
        self.entry = Some(name.to_owned());
        self.stack = Some(ExecStack::new(Frame::function(code, Vec::new())));
        true
    }

    /// Advance the started function by at most `budget` steps (a negative
    /// budget keeps the previous one). Returns `true` once it finished,
    /// normally or with a runtime error, and `false` when it must be called
    /// again.
    #[tracing::instrument(level = "trace", skip_all, fields(program = %self.id))]
    pub fn run(&mut self, user: &mut dyn Any, budget: i32) -> bool {
        if budget >= 0 {
            self.budget = budget;
        }
        self.finalize(user);
        let Some(stack) = self.stack.as_mut() else {
            return true;
        };
        stack.timer = self.budget;
        let env = Rc::clone(&self.env);
        let finished = Exec::new(&env, self.id, user).run(stack);
        if !finished {
            return false;
        }

        if let Some(stack) = self.stack.take() {
            self.result = stack.result;
            if let Some(err) = stack.error {
                tracing::debug!(code = err.code(), "program ended with error");
                self.error = Some(ProgramError::Runtime(err));
            }
        }
        self.env.classes_mut().free_locks(self.id);
        Exec::new(&env, self.id, user).finalize_orphans();
        true
    }

    /// Abandon the running function: cancel pending native calls, drop the
    /// frames and release every class lock the program holds.
    ///
    /// Instances released here are only queued. Their destructors run with
    /// the host context on the next [`Program::run`], [`Program::compile`] or
    /// [`Program::finalize`] of any program sharing the environment.
    pub fn stop(&mut self) {
        let Some(stack) = self.stack.take() else {
            return;
        };
        for frame in stack.frames.iter().filter(|f| f.result.is_some()) {
            self.cancel_native(frame);
        }
        drop(stack);
        self.env.classes_mut().free_locks(self.id);
        tracing::debug!(program = %self.id, pending = self.env.heap().has_orphans(), "stopped");
    }

    /// Run the destructors of unreachable instances with `user` as the host
    /// context.
    pub fn finalize(&mut self, user: &mut dyn Any) {
        let env = Rc::clone(&self.env);
        Exec::new(&env, self.id, user).finalize_orphans();
    }

    fn cancel_native(&self, frame: &Frame) {
        let cancel = match &frame.node().kind {
            NodeKind::NativeCall { name, .. } => self.env.native(name).and_then(|n| n.cancel),
            NodeKind::MethodCall { method, .. } => self
                .env
                .classes()
                .method(method.class, &method.key)
                .and_then(|entry| match entry.body {
                    MethodBody::Native(native) => native.cancel,
                    MethodBody::Script(_) => None,
                }),
            _ => None,
        };
        if let Some(cancel) = cancel {
            cancel(&frame.temps);
        }
    }

    /// Error code and span of the last compile or run failure.
    pub fn error(&self) -> Option<(i32, u32, u32)> {
        self.error.as_ref().map(|err| {
            let span = err.span();
            (err.code(), span.start, span.end)
        })
    }

    pub fn error_info(&self) -> Option<&ProgramError> {
        self.error.as_ref()
    }

    /// Function and span of the instruction that runs next.
    pub fn run_pos(&self) -> Option<(String, Span)> {
        self.stack.as_ref().and_then(ExecStack::position)
    }

    /// Active functions, outermost first.
    pub fn call_stack(&self) -> Vec<(String, Span)> {
        self.stack
            .as_ref()
            .map(ExecStack::call_stack)
            .unwrap_or_default()
    }

    /// Value returned by the entry function of the last finished run.
    pub fn result(&self) -> Option<&Variable> {
        self.result.as_ref()
    }

    /// Write the execution state (stack, statics, result) to `out`.
    pub fn save_state(&self, out: &mut impl Write) -> StateResult<()> {
        let bytes = persist::save(self)?;
        out.write_all(&bytes)?;
        Ok(())
    }

    /// Replace the execution state with one written by
    /// [`Program::save_state`]. The same source must be compiled first.
    pub fn restore_state(&mut self, input: &mut impl Read) -> StateResult<()> {
        let mut bytes = Vec::new();
        input.read_to_end(&mut bytes)?;
        self.stop();
        persist::restore(self, &bytes)
    }

    fn discard_unit(&mut self) {
        if let Some(unit) = self.unit.take() {
            unit.clear();
        }
        self.env.unregister_program(self.id);
    }
}

impl Drop for Program {
    fn drop(&mut self) {
        self.stop();
        self.discard_unit();
    }
}

impl std::fmt::Debug for Program {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Program")
            .field("id", &self.id)
            .field("compiled", &self.unit.is_some())
            .field("running", &self.stack.is_some())
            .field("entry", &self.entry)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests;

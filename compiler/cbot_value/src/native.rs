//! Host-supplied functions and methods.
//!
//! Every native has two halves: a checker run by the compiler on the
//! argument types, and an executor run by the interpreter on the argument
//! values. An executor may report [`CallStatus::Pending`]; the interpreter
//! then yields and calls it again on the next tick with the same argument
//! snapshot, until it reports `Done`. An executor failure carries an error
//! code that scripts can `catch`.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use cbot_diagnostic::CompileErrorKind;
use cbot_ir::TypeDesc;

use crate::{ClassBody, Variable};

/// Result of one native invocation.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CallStatus {
    Done,
    /// Not finished; call again on the next tick.
    Pending,
}

/// Outcome of dispatching a call by name.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DoCall {
    /// No native with that name.
    Unknown,
    Pending,
    Done,
    /// Completed with an exception code.
    Failed(i32),
}

impl DoCall {
    /// Host-facing code: -1 unknown, 0 suspended, 1 completed.
    pub fn code(self) -> i32 {
        match self {
            DoCall::Unknown => -1,
            DoCall::Pending => 0,
            DoCall::Done | DoCall::Failed(_) => 1,
        }
    }
}

impl From<Result<CallStatus, i32>> for DoCall {
    fn from(r: Result<CallStatus, i32>) -> Self {
        match r {
            Ok(CallStatus::Done) => DoCall::Done,
            Ok(CallStatus::Pending) => DoCall::Pending,
            Err(code) => DoCall::Failed(code),
        }
    }
}

pub type CheckFn = Rc<dyn Fn(&[TypeDesc], &mut dyn Any) -> Result<TypeDesc, CompileErrorKind>>;
pub type ExecFn = Rc<dyn Fn(&mut [Variable], &mut Variable, &mut dyn Any) -> Result<CallStatus, i32>>;
pub type CancelFn = Rc<dyn Fn(&[Variable])>;

pub type MethodCheckFn =
    Rc<dyn Fn(&TypeDesc, &[TypeDesc], &mut dyn Any) -> Result<TypeDesc, CompileErrorKind>>;
pub type MethodExecFn = Rc<
    dyn Fn(&mut Variable, &mut [Variable], &mut Variable, &mut dyn Any) -> Result<CallStatus, i32>,
>;

/// Runs before a member of an instance is read.
pub type UpdateFn = Rc<dyn Fn(&mut ClassBody, &mut dyn Any)>;

/// A free native function.
#[derive(Clone)]
pub struct NativeFunction {
    pub name: String,
    pub check: CheckFn,
    pub exec: ExecFn,
    pub cancel: Option<CancelFn>,
}

impl NativeFunction {
    pub fn new(
        name: impl Into<String>,
        exec: impl Fn(&mut [Variable], &mut Variable, &mut dyn Any) -> Result<CallStatus, i32> + 'static,
        check: impl Fn(&[TypeDesc], &mut dyn Any) -> Result<TypeDesc, CompileErrorKind> + 'static,
    ) -> Self {
        NativeFunction {
            name: name.into(),
            check: Rc::new(check),
            exec: Rc::new(exec),
            cancel: None,
        }
    }

    #[must_use]
    pub fn with_cancel(mut self, cancel: impl Fn(&[Variable]) + 'static) -> Self {
        self.cancel = Some(Rc::new(cancel));
        self
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeFunction({})", self.name)
    }
}

/// A native method of a class.
#[derive(Clone)]
pub struct NativeMethod {
    pub check: MethodCheckFn,
    pub exec: MethodExecFn,
    pub cancel: Option<CancelFn>,
}

impl NativeMethod {
    pub fn new(
        exec: impl Fn(&mut Variable, &mut [Variable], &mut Variable, &mut dyn Any) -> Result<CallStatus, i32>
            + 'static,
        check: impl Fn(&TypeDesc, &[TypeDesc], &mut dyn Any) -> Result<TypeDesc, CompileErrorKind>
            + 'static,
    ) -> Self {
        NativeMethod {
            check: Rc::new(check),
            exec: Rc::new(exec),
            cancel: None,
        }
    }

    #[must_use]
    pub fn with_cancel(mut self, cancel: impl Fn(&[Variable]) + 'static) -> Self {
        self.cancel = Some(Rc::new(cancel));
        self
    }
}

impl fmt::Debug for NativeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("NativeMethod")
    }
}

/// Argument count check shared by simple checkers.
pub fn expect_args(args: &[TypeDesc], count: usize) -> Result<(), CompileErrorKind> {
    match args.len().cmp(&count) {
        std::cmp::Ordering::Less => Err(CompileErrorKind::LowParam),
        std::cmp::Ordering::Greater => Err(CompileErrorKind::OverParam),
        std::cmp::Ordering::Equal => Ok(()),
    }
}

//! Runtime error taxonomy.

use cbot_ir::Span;
use thiserror::Error;

/// Runtime errors. Built-in codes start at 6000; `UserThrow` and `Native`
/// carry the code chosen by the script or the host.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Error)]
pub enum RuntimeErrorKind {
    #[error("division by zero")]
    ZeroDiv,
    #[error("variable not initialized")]
    NotInit,
    #[error("negative value rejected by \"throw\"")]
    BadThrow,
    #[error("the function returned no value")]
    NoRetVal,
    #[error("no function running")]
    NoRun,
    #[error("calling a function that no longer exists")]
    UndefFunc,
    #[error("this class does not exist")]
    NotClass,
    #[error("null pointer")]
    Null,
    #[error("nan value")]
    Nan,
    #[error("access beyond array limit")]
    OutArray,
    #[error("stack overflow")]
    StackOver,
    #[error("pointer to an object destroyed")]
    DeletedPtr,
    #[error("exception {0} thrown by the script")]
    UserThrow(i32),
    #[error("native call failed with code {0}")]
    Native(i32),
}

impl RuntimeErrorKind {
    const BUILTIN: [RuntimeErrorKind; 12] = [
        RuntimeErrorKind::ZeroDiv,
        RuntimeErrorKind::NotInit,
        RuntimeErrorKind::BadThrow,
        RuntimeErrorKind::NoRetVal,
        RuntimeErrorKind::NoRun,
        RuntimeErrorKind::UndefFunc,
        RuntimeErrorKind::NotClass,
        RuntimeErrorKind::Null,
        RuntimeErrorKind::Nan,
        RuntimeErrorKind::OutArray,
        RuntimeErrorKind::StackOver,
        RuntimeErrorKind::DeletedPtr,
    ];

    /// Numeric code, as seen by `catch (code)` and the host.
    pub fn code(self) -> i32 {
        match self {
            RuntimeErrorKind::UserThrow(code) | RuntimeErrorKind::Native(code) => code,
            builtin => {
                let index = RuntimeErrorKind::BUILTIN
                    .iter()
                    .position(|k| *k == builtin)
                    .unwrap_or_default();
                6000 + index as i32
            }
        }
    }

    /// Built-in kind for a code in the 6000 range.
    pub fn builtin(code: i32) -> Option<Self> {
        let index = usize::try_from(code.checked_sub(6000)?).ok()?;
        RuntimeErrorKind::BUILTIN.get(index).copied()
    }
}

/// A runtime error with the span of the failing instruction.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{kind} at {span}")]
pub struct RuntimeError {
    pub kind: RuntimeErrorKind,
    pub span: Span,
}

impl RuntimeError {
    pub fn new(kind: RuntimeErrorKind, span: Span) -> Self {
        RuntimeError { kind, span }
    }

    #[inline]
    pub fn code(&self) -> i32 {
        self.kind.code()
    }
}

#[cfg(test)]
mod tests;

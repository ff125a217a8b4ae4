//! Save/restore errors.

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    #[error("unsupported state version {found} (expected {expected})")]
    BadVersion { found: u64, expected: u64 },
    #[error("corrupt state: {0}")]
    Corrupt(&'static str),
    #[error("state refers to unknown code `{0}`")]
    UnknownCode(String),
    #[error("state refers to unknown class `{0}`")]
    UnknownClass(String),
    #[error("program is not compiled")]
    NotCompiled,
}

pub type StateResult<T> = Result<T, StateError>;

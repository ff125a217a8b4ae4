//! Error reporting for the CBot interpreter.
//!
//! Two disjoint, closed taxonomies:
//! - [`CompileErrorKind`]: reported once per compile, sticky first error
//! - [`RuntimeErrorKind`]: terminates a run, catchable by `try`/`catch`
//!
//! Both carry a [`Span`](cbot_ir::Span) so hosts can underline the exact
//! source range. [`emitter`] renders them for terminals.

mod compile;
pub mod emitter;
mod runtime;

pub use compile::{CompileError, CompileErrorKind};
pub use runtime::{RuntimeError, RuntimeErrorKind};

/// Result of a compilation step.
pub type CompileResult<T> = Result<T, CompileError>;

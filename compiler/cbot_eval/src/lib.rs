//! CBot Eval - the suspendable executor.
//!
//! # Architecture
//!
//! Execution never recurses on the native stack. Every running instruction
//! owns a [`Frame`] on an explicit [`ExecStack`]; a frame names its node by
//! `(code key, node index)` and remembers how far it got as an integer
//! `state`. One executor step pops the top frame, advances its node's state
//! machine and pushes whatever the node asked for:
//!
//! - a child frame for a sub-instruction
//! - a function frame for a call
//! - a finished value back to its parent
//! - a signal (`break`, `continue`, `return`, runtime error) that unwinds
//!   frames until a loop, function or `try` frame intercepts it
//!
//! Because the whole computation lives in frames, a run can pause after any
//! step (timer budget spent, lock busy, native call pending), resume later,
//! or be written out with [`persist`] and restored into a freshly compiled
//! program.
//!
//! [`Program`] is the host-facing façade: compile, start, run, stop, inspect.
//! [`stdlib`] installs the built-in natives (`strlen`, `sqrt`, ...).

mod errors;
mod exec;
pub mod persist;
mod program;
mod stack;
pub mod stdlib;

pub use errors::StateError;
pub use exec::do_call;
pub use program::{Program, ProgramError};
pub use stack::{BlockKind, ExecStack, Frame, Signal};

use std::rc::Rc;

use cbot_value::{EnvConfig, Environment};

/// An environment with the built-in natives installed.
pub fn default_environment() -> Rc<Environment> {
    let env = Environment::new();
    stdlib::install(&env);
    env
}

/// Like [`default_environment`], with explicit limits.
pub fn environment_with_config(config: EnvConfig) -> Rc<Environment> {
    let env = Environment::with_config(config);
    stdlib::install(&env);
    env
}

//! Runtime values of the CBot interpreter.
//!
//! - [`Variable`] / [`Value`]: typed value containers
//! - [`Heap`]: reference-counted class instances and arrays, finalizer queue
//! - [`ops`]: operator semantics
//! - [`ClassRegistry`]: classes, member layout, methods, locks
//! - [`NativeFunction`] / [`NativeMethod`]: the host bridge
//! - [`Environment`]: everything programs share

mod class;
mod env;
mod heap;
mod lock;
mod native;
mod number;
pub mod ops;
mod variable;

pub use class::{ClassDef, ClassRegistry, FieldRef, MemberDecl, MethodBody, MethodEntry};
pub use env::{
    EnvConfig, Environment, ProgramId, DEFAULT_BUDGET, LOCK_QUEUE_LEN, MAX_STACK_DEPTH,
};
pub use heap::{ArrayBody, ArrayRef, ClassBody, ClassInstance, Heap, InstanceRef, Orphan};
pub use lock::ClassLock;
pub use native::{
    expect_args, CallStatus, CancelFn, CheckFn, DoCall, ExecFn, MethodCheckFn, MethodExecFn,
    NativeFunction, NativeMethod, UpdateFn,
};
pub use number::Number;
pub use variable::{InitState, Value, Variable};

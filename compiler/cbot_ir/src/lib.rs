//! CBot IR - shared data structures for the CBot interpreter.
//!
//! This crate holds the types every other stage agrees on:
//! - Spans for source locations
//! - Tokens and `TokenList` for lexer output
//! - Type descriptors (`TypeDesc`, `TypeKind`, `TypeMask`)
//! - Instruction trees (`Code`, `Node`, `NodeKind`) produced by the compiler
//!   and walked by the executor
//!
//! Instruction trees are flat: nodes live in a per-`Code` vector and refer to
//! each other through `NodeId` indices. A suspended executor frame therefore
//! names its position as `(code key, node index, state)`, which is what makes
//! execution state serializable.

/// Compile-time assertion that a type has a specific size.
///
/// Used to prevent accidental size regressions in frequently-allocated types.
#[macro_export]
macro_rules! static_assert_size {
    ($ty:ty, $size:expr) => {
        const _: [(); $size] = [(); ::std::mem::size_of::<$ty>()];
    };
}

pub mod ast;
mod span;
pub mod token;
pub mod types;

pub use ast::{
    Access, AccessRoot, AccessStep, BinaryOp, CaseValue, CatchClause, Code, DeclInit, Declaration,
    FnFlags, FunctionEntry, IncDec, Literal, MethodRef, Node, NodeId, NodeKind, Param, ParamSlot,
    Signature, SwitchCase, UnaryOp,
};
pub use span::Span;
pub use token::{Kw, Token, TokenList, TokenType, TokenValue};
pub use types::{ClassId, Protection, TypeDesc, TypeKind, TypeMask, NO_LIMIT};

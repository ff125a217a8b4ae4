//! Operator enums shared by the compiler and the executor.

use std::fmt;

use crate::Kw;

/// Binary operators, including the short-circuit logical ones.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Power,
    Lo,
    Hi,
    Ls,
    Hs,
    Eq,
    Ne,
    /// Bitwise or boolean `&` (both operands always evaluated).
    And,
    Or,
    Xor,
    /// `&&` / `and`: right operand evaluated only when needed.
    LogAnd,
    LogOr,
    Sl,
    /// `>>`: arithmetic shift right.
    Asr,
    /// `>>>`: logical shift right.
    Sr,
}

impl BinaryOp {
    /// Operator for a binary operator token.
    pub fn from_kw(kw: Kw) -> Option<Self> {
        let op = match kw {
            Kw::Add => BinaryOp::Add,
            Kw::Sub => BinaryOp::Sub,
            Kw::Mul => BinaryOp::Mul,
            Kw::Div => BinaryOp::Div,
            Kw::Modulo => BinaryOp::Mod,
            Kw::Power => BinaryOp::Power,
            Kw::Lo => BinaryOp::Lo,
            Kw::Hi => BinaryOp::Hi,
            Kw::Ls => BinaryOp::Ls,
            Kw::Hs => BinaryOp::Hs,
            Kw::Eq => BinaryOp::Eq,
            Kw::Ne => BinaryOp::Ne,
            Kw::And => BinaryOp::And,
            Kw::Or => BinaryOp::Or,
            Kw::Xor | Kw::TxtXor => BinaryOp::Xor,
            Kw::LogAnd | Kw::TxtAnd => BinaryOp::LogAnd,
            Kw::LogOr | Kw::TxtOr => BinaryOp::LogOr,
            Kw::Sl => BinaryOp::Sl,
            Kw::Asr => BinaryOp::Asr,
            Kw::Sr => BinaryOp::Sr,
            _ => return None,
        };
        Some(op)
    }

    /// Operator applied by a compound assignment token (`+=` is `Add`).
    pub fn from_assign(kw: Kw) -> Option<Self> {
        let op = match kw {
            Kw::AssAdd => BinaryOp::Add,
            Kw::AssSub => BinaryOp::Sub,
            Kw::AssMul => BinaryOp::Mul,
            Kw::AssDiv => BinaryOp::Div,
            Kw::AssModulo => BinaryOp::Mod,
            Kw::AssAnd => BinaryOp::And,
            Kw::AssOr => BinaryOp::Or,
            Kw::AssXor => BinaryOp::Xor,
            Kw::AssSl => BinaryOp::Sl,
            Kw::AssAsr => BinaryOp::Asr,
            Kw::AssSr => BinaryOp::Sr,
            _ => return None,
        };
        Some(op)
    }

    /// Comparison operators always produce `boolean`.
    #[inline]
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Lo
                | BinaryOp::Hi
                | BinaryOp::Ls
                | BinaryOp::Hs
                | BinaryOp::Eq
                | BinaryOp::Ne
        )
    }

    #[inline]
    pub fn is_short_circuit(self) -> bool {
        matches!(self, BinaryOp::LogAnd | BinaryOp::LogOr)
    }

    #[inline]
    pub fn is_shift(self) -> bool {
        matches!(self, BinaryOp::Sl | BinaryOp::Asr | BinaryOp::Sr)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Power => "**",
            BinaryOp::Lo => "<",
            BinaryOp::Hi => ">",
            BinaryOp::Ls => "<=",
            BinaryOp::Hs => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::And => "&",
            BinaryOp::Or => "|",
            BinaryOp::Xor => "^",
            BinaryOp::LogAnd => "&&",
            BinaryOp::LogOr => "||",
            BinaryOp::Sl => "<<",
            BinaryOp::Asr => ">>",
            BinaryOp::Sr => ">>>",
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Prefix operators.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    /// `!` / `not`
    Not,
    /// `~`
    BitNot,
}

impl UnaryOp {
    pub fn from_kw(kw: Kw) -> Option<Self> {
        match kw {
            Kw::Sub => Some(UnaryOp::Neg),
            Kw::Not | Kw::TxtNot => Some(UnaryOp::Not),
            Kw::BitNot => Some(UnaryOp::BitNot),
            _ => None,
        }
    }
}

/// `++` or `--`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum IncDec {
    Inc,
    Dec,
}

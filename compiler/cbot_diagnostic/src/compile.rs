//! Compile-time error taxonomy.

use cbot_ir::Span;
use thiserror::Error;

/// Compile errors. Codes start at 5000 and follow declaration order; they are
/// what `Program::error` reports to the host.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Error)]
#[repr(i32)]
pub enum CompileErrorKind {
    #[error("missing opening parenthesis")]
    OpenPar = 5000,
    #[error("missing closing parenthesis")]
    ClosePar,
    #[error("the expression must be a boolean value")]
    NotBoolean,
    #[error("variable not declared")]
    UndefVar,
    #[error("assignment impossible")]
    BadLeft,
    #[error("semicolon terminator missing")]
    NoTerminator,
    #[error("instruction \"case\" outside a block \"switch\"")]
    CaseOut,
    #[error("missing \"}}\"")]
    CloseBlock,
    #[error("instruction \"else\" without corresponding \"if\"")]
    ElseWithoutIf,
    #[error("opening brace missing")]
    OpenBlock,
    #[error("wrong type for the assignment")]
    BadType1,
    #[error("a variable can not be declared twice")]
    RedefVar,
    #[error("the types of the two operands are incompatible")]
    BadType2,
    #[error("unknown function")]
    UndefCall,
    #[error("sign \":\" missing")]
    NoDoubleDots,
    #[error("instruction \"break\" or \"continue\" outside a loop")]
    BreakOutside,
    #[error("a label must be followed by \"for\", \"while\", \"do\" or \"repeat\"")]
    Label,
    #[error("this label does not exist")]
    UndefLabel,
    #[error("instruction \"case\" missing")]
    NoCase,
    #[error("number missing")]
    BadNum,
    #[error("void parameter")]
    Void,
    #[error("type declaration missing")]
    NoType,
    #[error("variable name missing")]
    NoVar,
    #[error("function name missing")]
    NoFunc,
    #[error("too many parameters")]
    OverParam,
    #[error("function already exists")]
    RedefFunc,
    #[error("parameters missing")]
    LowParam,
    #[error("no function with this kind of parameters")]
    BadParam,
    #[error("no function with this number of parameters")]
    NbParam,
    #[error("this is not a member of this class")]
    UndefItem,
    #[error("this object is not a member of a class")]
    UndefClass,
    #[error("appropriate constructor missing")]
    NoConstruct,
    #[error("this class already exists")]
    RedefClass,
    #[error("\"]\" missing")]
    CloseIndex,
    #[error("reserved keyword of the CBot language")]
    Reserved,
    #[error("bad argument for \"new\"")]
    BadNew,
    #[error("\"[\" expected")]
    OpenIndex,
    #[error("string missing")]
    BadString,
    #[error("incorrect index type")]
    BadIndex,
    #[error("private element")]
    Private,
    #[error("public required")]
    NoPublic,
    #[error("expression expected")]
    NoExpression,
    #[error("ambiguous call to overloaded function")]
    AmbiguousCall,
    #[error("class name expected")]
    NoClassName,
    #[error("non-void function needs \"return;\"")]
    NoReturn,
    #[error("default value must be a literal")]
    DefaultValue,
    #[error("missing end quote")]
    EndQuote,
    #[error("unknown escape sequence")]
    BadEscape,
    #[error("octal value out of range")]
    OctalRange,
    #[error("missing hex digits after escape sequence")]
    HexDigits,
    #[error("hex value out of range")]
    HexRange,
    #[error("invalid universal character name")]
    UnicodeName,
    #[error("empty character constant")]
    CharEmpty,
    #[error("duplicate label in switch")]
    RedefCase,
    #[error("invalid type for \"instanceof\"")]
    BadInstanceof,
    #[error("too many characters in character constant")]
    CharTooLong,
    #[error("unexpected character")]
    BadChar,
}

impl CompileErrorKind {
    /// Every kind, in code order.
    pub const ALL: &'static [CompileErrorKind] = &[
        CompileErrorKind::OpenPar,
        CompileErrorKind::ClosePar,
        CompileErrorKind::NotBoolean,
        CompileErrorKind::UndefVar,
        CompileErrorKind::BadLeft,
        CompileErrorKind::NoTerminator,
        CompileErrorKind::CaseOut,
        CompileErrorKind::CloseBlock,
        CompileErrorKind::ElseWithoutIf,
        CompileErrorKind::OpenBlock,
        CompileErrorKind::BadType1,
        CompileErrorKind::RedefVar,
        CompileErrorKind::BadType2,
        CompileErrorKind::UndefCall,
        CompileErrorKind::NoDoubleDots,
        CompileErrorKind::BreakOutside,
        CompileErrorKind::Label,
        CompileErrorKind::UndefLabel,
        CompileErrorKind::NoCase,
        CompileErrorKind::BadNum,
        CompileErrorKind::Void,
        CompileErrorKind::NoType,
        CompileErrorKind::NoVar,
        CompileErrorKind::NoFunc,
        CompileErrorKind::OverParam,
        CompileErrorKind::RedefFunc,
        CompileErrorKind::LowParam,
        CompileErrorKind::BadParam,
        CompileErrorKind::NbParam,
        CompileErrorKind::UndefItem,
        CompileErrorKind::UndefClass,
        CompileErrorKind::NoConstruct,
        CompileErrorKind::RedefClass,
        CompileErrorKind::CloseIndex,
        CompileErrorKind::Reserved,
        CompileErrorKind::BadNew,
        CompileErrorKind::OpenIndex,
        CompileErrorKind::BadString,
        CompileErrorKind::BadIndex,
        CompileErrorKind::Private,
        CompileErrorKind::NoPublic,
        CompileErrorKind::NoExpression,
        CompileErrorKind::AmbiguousCall,
        CompileErrorKind::NoClassName,
        CompileErrorKind::NoReturn,
        CompileErrorKind::DefaultValue,
        CompileErrorKind::EndQuote,
        CompileErrorKind::BadEscape,
        CompileErrorKind::OctalRange,
        CompileErrorKind::HexDigits,
        CompileErrorKind::HexRange,
        CompileErrorKind::UnicodeName,
        CompileErrorKind::CharEmpty,
        CompileErrorKind::RedefCase,
        CompileErrorKind::BadInstanceof,
        CompileErrorKind::CharTooLong,
        CompileErrorKind::BadChar,
    ];

    #[inline]
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn from_code(code: i32) -> Option<Self> {
        let index = usize::try_from(code.checked_sub(CompileErrorKind::OpenPar.code())?).ok()?;
        CompileErrorKind::ALL.get(index).copied()
    }
}

/// A compile error with the span it applies to.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{kind} at {span}")]
pub struct CompileError {
    pub kind: CompileErrorKind,
    pub span: Span,
}

impl CompileError {
    pub fn new(kind: CompileErrorKind, span: Span) -> Self {
        CompileError { kind, span }
    }

    #[inline]
    pub fn code(&self) -> i32 {
        self.kind.code()
    }
}

#[cfg(test)]
mod tests;

//! Keyword and operator identifiers.
//!
//! Every reserved word and every punctuation/operator token maps to one
//! `Kw` id. The compiler dispatches on these ids; the lexer resolves them
//! through [`Kw::keyword`] and [`Kw::OPERATORS`].

use std::fmt;

/// Keyword / operator id carried by a [`super::Token`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Kw {
    // Statements
    If,
    Else,
    While,
    Do,
    For,
    Repeat,
    Break,
    Continue,
    Switch,
    Case,
    Default,
    Try,
    Catch,
    Throw,
    Finally,
    Return,

    // Declarations
    Class,
    Extends,
    Public,
    Private,
    Protected,
    Static,
    Synchronized,
    Extern,
    New,
    This,
    Super,
    Instanceof,

    // Types
    Void,
    Byte,
    Short,
    Char,
    Int,
    Long,
    Float,
    Double,
    Boolean,
    String,

    // Constants
    True,
    False,
    Null,
    Nan,

    // Word operators
    TxtAnd,
    TxtOr,
    TxtXor,
    TxtNot,

    // Punctuation
    OpenPar,
    ClosePar,
    OpenBlk,
    CloseBlk,
    OpenBracket,
    CloseBracket,
    Semicolon,
    Comma,
    Dot,
    Colon,
    Question,

    // Assignment
    Assign,
    AssAdd,
    AssSub,
    AssMul,
    AssDiv,
    AssModulo,
    AssAnd,
    AssOr,
    AssXor,
    AssSl,
    AssAsr,
    AssSr,

    // Operators
    Eq,
    Ne,
    Lo,
    Hi,
    Ls,
    Hs,
    Add,
    Sub,
    Mul,
    Div,
    Modulo,
    Power,
    LogAnd,
    LogOr,
    And,
    Or,
    Xor,
    Not,
    BitNot,
    Sl,
    Asr,
    Sr,
    Inc,
    Dec,
}

impl Kw {
    /// Operators sorted so that longer spellings are tried first.
    pub const OPERATORS: &'static [(&'static str, Kw)] = &[
        (">>>=", Kw::AssSr),
        (">>>", Kw::Sr),
        ("<<=", Kw::AssSl),
        (">>=", Kw::AssAsr),
        ("**", Kw::Power),
        ("&&", Kw::LogAnd),
        ("||", Kw::LogOr),
        ("==", Kw::Eq),
        ("!=", Kw::Ne),
        ("<=", Kw::Ls),
        (">=", Kw::Hs),
        ("+=", Kw::AssAdd),
        ("-=", Kw::AssSub),
        ("*=", Kw::AssMul),
        ("/=", Kw::AssDiv),
        ("%=", Kw::AssModulo),
        ("&=", Kw::AssAnd),
        ("|=", Kw::AssOr),
        ("^=", Kw::AssXor),
        ("<<", Kw::Sl),
        (">>", Kw::Asr),
        ("++", Kw::Inc),
        ("--", Kw::Dec),
        ("(", Kw::OpenPar),
        (")", Kw::ClosePar),
        ("{", Kw::OpenBlk),
        ("}", Kw::CloseBlk),
        ("[", Kw::OpenBracket),
        ("]", Kw::CloseBracket),
        (";", Kw::Semicolon),
        (",", Kw::Comma),
        (".", Kw::Dot),
        (":", Kw::Colon),
        ("?", Kw::Question),
        ("=", Kw::Assign),
        ("<", Kw::Lo),
        (">", Kw::Hi),
        ("+", Kw::Add),
        ("-", Kw::Sub),
        ("*", Kw::Mul),
        ("/", Kw::Div),
        ("%", Kw::Modulo),
        ("&", Kw::And),
        ("|", Kw::Or),
        ("^", Kw::Xor),
        ("!", Kw::Not),
        ("~", Kw::BitNot),
    ];

    /// Look up a reserved word.
    pub fn keyword(text: &str) -> Option<Kw> {
        let kw = match text {
            "if" => Kw::If,
            "else" => Kw::Else,
            "while" => Kw::While,
            "do" => Kw::Do,
            "for" => Kw::For,
            "repeat" => Kw::Repeat,
            "break" => Kw::Break,
            "continue" => Kw::Continue,
            "switch" => Kw::Switch,
            "case" => Kw::Case,
            "default" => Kw::Default,
            "try" => Kw::Try,
            "catch" => Kw::Catch,
            "throw" => Kw::Throw,
            "finally" => Kw::Finally,
            "return" => Kw::Return,
            "class" => Kw::Class,
            "extends" => Kw::Extends,
            "public" => Kw::Public,
            "private" => Kw::Private,
            "protected" => Kw::Protected,
            "static" => Kw::Static,
            "synchronized" => Kw::Synchronized,
            "extern" => Kw::Extern,
            "new" => Kw::New,
            "this" => Kw::This,
            "super" => Kw::Super,
            "instanceof" => Kw::Instanceof,
            "void" => Kw::Void,
            "byte" => Kw::Byte,
            "short" => Kw::Short,
            "char" => Kw::Char,
            "int" => Kw::Int,
            "long" => Kw::Long,
            "float" => Kw::Float,
            "double" => Kw::Double,
            "boolean" | "bool" => Kw::Boolean,
            "string" => Kw::String,
            "true" => Kw::True,
            "false" => Kw::False,
            "null" => Kw::Null,
            "nan" => Kw::Nan,
            "and" => Kw::TxtAnd,
            "or" => Kw::TxtOr,
            "xor" => Kw::TxtXor,
            "not" => Kw::TxtNot,
            _ => return None,
        };
        Some(kw)
    }

    /// Canonical spelling, used in debug output and error messages.
    pub fn as_str(self) -> &'static str {
        match self {
            Kw::If => "if",
            Kw::Else => "else",
            Kw::While => "while",
            Kw::Do => "do",
            Kw::For => "for",
            Kw::Repeat => "repeat",
            Kw::Break => "break",
            Kw::Continue => "continue",
            Kw::Switch => "switch",
            Kw::Case => "case",
            Kw::Default => "default",
            Kw::Try => "try",
            Kw::Catch => "catch",
            Kw::Throw => "throw",
            Kw::Finally => "finally",
            Kw::Return => "return",
            Kw::Class => "class",
            Kw::Extends => "extends",
            Kw::Public => "public",
            Kw::Private => "private",
            Kw::Protected => "protected",
            Kw::Static => "static",
            Kw::Synchronized => "synchronized",
            Kw::Extern => "extern",
            Kw::New => "new",
            Kw::This => "this",
            Kw::Super => "super",
            Kw::Instanceof => "instanceof",
            Kw::Void => "void",
            Kw::Byte => "byte",
            Kw::Short => "short",
            Kw::Char => "char",
            Kw::Int => "int",
            Kw::Long => "long",
            Kw::Float => "float",
            Kw::Double => "double",
            Kw::Boolean => "boolean",
            Kw::String => "string",
            Kw::True => "true",
            Kw::False => "false",
            Kw::Null => "null",
            Kw::Nan => "nan",
            Kw::TxtAnd => "and",
            Kw::TxtOr => "or",
            Kw::TxtXor => "xor",
            Kw::TxtNot => "not",
            other => Kw::OPERATORS
                .iter()
                .find(|(_, kw)| *kw == other)
                .map_or("?", |(text, _)| text),
        }
    }

    /// True for the primitive type keywords (`int`, `string`, ...).
    pub fn is_type(self) -> bool {
        matches!(
            self,
            Kw::Void
                | Kw::Byte
                | Kw::Short
                | Kw::Char
                | Kw::Int
                | Kw::Long
                | Kw::Float
                | Kw::Double
                | Kw::Boolean
                | Kw::String
        )
    }

    /// True for `=` and every compound assignment operator.
    pub fn is_assignment(self) -> bool {
        matches!(
            self,
            Kw::Assign
                | Kw::AssAdd
                | Kw::AssSub
                | Kw::AssMul
                | Kw::AssDiv
                | Kw::AssModulo
                | Kw::AssAnd
                | Kw::AssOr
                | Kw::AssXor
                | Kw::AssSl
                | Kw::AssAsr
                | Kw::AssSr
        )
    }
}

impl fmt::Display for Kw {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

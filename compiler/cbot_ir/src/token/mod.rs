//! Tokens produced by the lexer.
//!
//! A compiled unit owns exactly one [`TokenList`]. The list is contiguous;
//! "previous" and "next" are index arithmetic on a cursor, and dropping the
//! list drops every token.

mod keyword;

pub use keyword::Kw;

use std::fmt;

use crate::Span;

/// Lexical class of a token.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TokenType {
    /// Reserved word or operator; see [`Token::kw`].
    Keyword,
    Identifier,
    /// Numeric literal; value in [`Token::value`].
    Number,
    /// Double-quoted string; cooked text in [`Token::text`].
    String,
    /// Single-quoted char literal.
    Char,
    /// Identifier bound to a host-defined numeric constant.
    DefinedNum,
    /// End of input. Always the last token of a list.
    Eof,
}

/// Literal payload decoded by the lexer.
#[derive(Clone, Debug, PartialEq)]
pub enum TokenValue {
    None,
    Int(i64),
    Float(f64),
    Char(char),
}

/// A token with its span and the separator text that followed it.
#[derive(Clone, PartialEq)]
pub struct Token {
    pub ty: TokenType,
    pub kw: Option<Kw>,
    /// Source text (identifiers, numbers) or cooked content (strings).
    pub text: String,
    /// Whitespace and comments after the token.
    pub sep: String,
    pub span: Span,
    pub value: TokenValue,
}

impl Token {
    pub fn new(ty: TokenType, text: impl Into<String>, span: Span) -> Self {
        Token {
            ty,
            kw: None,
            text: text.into(),
            sep: String::new(),
            span,
            value: TokenValue::None,
        }
    }

    pub fn keyword(kw: Kw, span: Span) -> Self {
        Token {
            ty: TokenType::Keyword,
            kw: Some(kw),
            text: kw.as_str().to_owned(),
            sep: String::new(),
            span,
            value: TokenValue::None,
        }
    }

    pub fn eof(offset: u32) -> Self {
        Token::new(TokenType::Eof, "", Span::point(offset))
    }

    #[inline]
    pub fn is(&self, kw: Kw) -> bool {
        self.kw == Some(kw)
    }

    #[inline]
    pub fn is_eof(&self) -> bool {
        self.ty == TokenType::Eof
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kw {
            Some(kw) => write!(f, "{kw:?} @ {}", self.span),
            None => write!(f, "{:?}({:?}) @ {}", self.ty, self.text, self.span),
        }
    }
}

/// The token stream of one compiled unit, terminated by an `Eof` token.
#[derive(Clone, Default, PartialEq, Debug)]
pub struct TokenList {
    tokens: Vec<Token>,
}

impl TokenList {
    #[inline]
    pub fn new() -> Self {
        TokenList { tokens: Vec::new() }
    }

    #[inline]
    pub fn push(&mut self, token: Token) {
        self.tokens.push(token);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&Token> {
        self.tokens.get(index)
    }

    /// Mutable access to the last pushed token (the lexer appends separators).
    #[inline]
    pub fn last_mut(&mut self) -> Option<&mut Token> {
        self.tokens.last_mut()
    }

    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, Token> {
        self.tokens.iter()
    }

    #[inline]
    pub fn as_slice(&self) -> &[Token] {
        &self.tokens
    }
}

impl std::ops::Index<usize> for TokenList {
    type Output = Token;

    #[inline]
    fn index(&self, index: usize) -> &Token {
        &self.tokens[index]
    }
}

impl<'a> IntoIterator for &'a TokenList {
    type Item = &'a Token;
    type IntoIter = std::slice::Iter<'a, Token>;

    fn into_iter(self) -> Self::IntoIter {
        self.tokens.iter()
    }
}

#[cfg(test)]
mod tests;

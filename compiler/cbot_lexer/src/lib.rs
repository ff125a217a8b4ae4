//! Lexer for CBot using logos.
//!
//! Produces the [`TokenList`] of one compilation unit. Whitespace and
//! comments are not tokens: they are folded into the separator text of the
//! token before them, so the list still reproduces the source exactly.
//!
//! Identifiers that name a host-defined numeric constant become
//! [`TokenType::DefinedNum`] tokens; the lookup is supplied by the caller so
//! the lexer holds no global state.

mod escape;
mod number;

use cbot_diagnostic::{CompileError, CompileErrorKind};
use cbot_ir::{Kw, Span, Token, TokenList, TokenType, TokenValue};
use logos::Logos;

pub use number::is_long;
use number::{parse_float, parse_int, Radix};

/// Raw token from logos (before cooking).
#[derive(Logos, Debug, Clone, Copy, PartialEq)]
enum RawToken {
    #[regex(r"[ \t\r\n\x0C]+")]
    Whitespace,

    #[regex(r"//[^\n]*")]
    LineComment,

    #[token("/*", block_comment)]
    BlockComment,

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Ident,

    #[regex(r"[0-9][0-9_]*")]
    DecInt,

    #[regex(r"0[xX][0-9a-fA-F_]+")]
    HexInt,

    #[regex(r"0[bB][01_]+")]
    BinInt,

    #[regex(r"[0-9]+\.[0-9]*([eE][+-]?[0-9]+)?")]
    #[regex(r"\.[0-9]+([eE][+-]?[0-9]+)?")]
    #[regex(r"[0-9]+[eE][+-]?[0-9]+")]
    Float,

    #[regex(r#""([^"\\\n]|\\[^\n])*""#)]
    Str,

    #[regex(r#""([^"\\\n]|\\[^\n])*"#)]
    UnterminatedStr,

    #[regex(r"'([^'\\\n]|\\[^\n])*'")]
    Char,

    #[regex(r"'([^'\\\n]|\\[^\n])*")]
    UnterminatedChar,

    #[regex(r"[-+*/%<>=!&|^~?:;,.(){}\[\]]", operator)]
    Operator(Kw),
}

/// Skip to the end of a block comment. An unterminated comment runs to the
/// end of the source.
fn block_comment(lex: &mut logos::Lexer<'_, RawToken>) {
    let rest = lex.remainder().as_bytes();
    let len = memchr::memmem::find(rest, b"*/").map_or(rest.len(), |i| i + 2);
    lex.bump(len);
}

/// Maximal munch over the operator table, starting at the matched char.
fn operator(lex: &mut logos::Lexer<'_, RawToken>) -> Option<Kw> {
    let start = lex.span().start;
    let text = &lex.source()[start..];
    let (spelling, kw) = Kw::OPERATORS
        .iter()
        .find(|(spelling, _)| text.starts_with(spelling))?;
    lex.bump(spelling.len() - 1);
    Some(*kw)
}

/// Tokenize `source`, resolving defined constants through `defines`.
///
/// Fails on the first malformed literal or character outside the language.
pub fn tokenize(
    source: &str,
    defines: impl Fn(&str) -> Option<i64>,
) -> Result<TokenList, CompileError> {
    let mut tokens = TokenList::new();
    let mut lexer = RawToken::lexer(source);

    while let Some(raw) = lexer.next() {
        let slice = lexer.slice();
        let span = Span::from_range(lexer.span());

        let token = match raw {
            Ok(RawToken::Whitespace | RawToken::LineComment | RawToken::BlockComment) => {
                if let Some(last) = tokens.last_mut() {
                    last.sep.push_str(slice);
                }
                continue;
            }
            Ok(RawToken::Ident) => ident(slice, span, &defines),
            Ok(RawToken::DecInt) => integer(slice, Radix::Decimal, span)?,
            Ok(RawToken::HexInt) => integer(slice, Radix::Hex, span)?,
            Ok(RawToken::BinInt) => integer(slice, Radix::Binary, span)?,
            Ok(RawToken::Float) => {
                let value = parse_float(slice)
                    .ok_or_else(|| CompileError::new(CompileErrorKind::BadNum, span))?;
                let mut token = Token::new(TokenType::Number, slice, span);
                token.value = value;
                token
            }
            Ok(RawToken::Str) => {
                let content = &slice[1..slice.len() - 1];
                let cooked = escape::cook(content, span.start + 1)?;
                Token::new(TokenType::String, cooked, span)
            }
            Ok(RawToken::Char) => {
                let content = &slice[1..slice.len() - 1];
                let cooked = escape::cook(content, span.start + 1)?;
                let mut chars = cooked.chars();
                let Some(c) = chars.next() else {
                    return Err(CompileError::new(CompileErrorKind::CharEmpty, span));
                };
                if chars.next().is_some() {
                    return Err(CompileError::new(CompileErrorKind::CharTooLong, span));
                }
                let mut token = Token::new(TokenType::Char, c.to_string(), span);
                token.value = TokenValue::Char(c);
                token
            }
            Ok(RawToken::UnterminatedStr | RawToken::UnterminatedChar) => {
                return Err(CompileError::new(CompileErrorKind::EndQuote, span));
            }
            Ok(RawToken::Operator(kw)) => Token::keyword(kw, span),
            Err(()) => return Err(CompileError::new(CompileErrorKind::BadChar, span)),
        };
        tokens.push(token);
    }

    tokens.push(Token::eof(u32::try_from(source.len()).unwrap_or(u32::MAX)));
    Ok(tokens)
}

/// Tokenize without any defined constants.
pub fn tokenize_plain(source: &str) -> Result<TokenList, CompileError> {
    tokenize(source, |_| None)
}

fn ident(slice: &str, span: Span, defines: &impl Fn(&str) -> Option<i64>) -> Token {
    if let Some(kw) = Kw::keyword(slice) {
        return Token::keyword(kw, span);
    }
    if let Some(value) = defines(slice) {
        let mut token = Token::new(TokenType::DefinedNum, slice, span);
        token.value = TokenValue::Int(value);
        return token;
    }
    Token::new(TokenType::Identifier, slice, span)
}

fn integer(slice: &str, radix: Radix, span: Span) -> Result<Token, CompileError> {
    let value =
        parse_int(slice, radix).ok_or_else(|| CompileError::new(CompileErrorKind::BadNum, span))?;
    let mut token = Token::new(TokenType::Number, slice, span);
    token.value = value;
    Ok(token)
}

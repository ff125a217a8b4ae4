//! Token cursor.
//!
//! Moves over a [`TokenList`] by index. The list always ends with an `Eof`
//! token, and the cursor never moves past it, so `current()` is always valid.

use cbot_ir::{Kw, Span, Token, TokenList, TokenType};

pub struct Cursor<'a> {
    tokens: &'a TokenList,
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(tokens: &'a TokenList) -> Self {
        debug_assert!(
            tokens.as_slice().last().is_some_and(Token::is_eof),
            "token list must end with Eof"
        );
        Cursor { tokens, pos: 0 }
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Jump back to a position recorded earlier.
    pub fn set_position(&mut self, pos: usize) {
        debug_assert!(pos < self.tokens.len(), "cursor position {pos} out of bounds");
        self.pos = pos.min(self.tokens.len().saturating_sub(1));
    }

    #[inline]
    pub fn current(&self) -> &'a Token {
        &self.tokens[self.pos]
    }

    /// Token `n` places ahead; clamps to `Eof`.
    pub fn peek(&self, n: usize) -> &'a Token {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[(self.pos + n).min(last)]
    }

    #[inline]
    pub fn span(&self) -> Span {
        self.current().span
    }

    pub fn previous_span(&self) -> Span {
        match self.pos {
            0 => Span::DUMMY,
            p => self.tokens[p - 1].span,
        }
    }

    /// Span of the token at an absolute position.
    pub fn token_span(&self, pos: usize) -> Span {
        self.tokens.get(pos).map_or(Span::DUMMY, |t| t.span)
    }

    #[inline]
    pub fn is_at_end(&self) -> bool {
        self.current().is_eof()
    }

    #[inline]
    pub fn check(&self, kw: Kw) -> bool {
        self.current().is(kw)
    }

    #[inline]
    pub fn check_ident(&self) -> bool {
        self.current().ty == TokenType::Identifier
    }

    /// Advance, returning the token left behind.
    pub fn bump(&mut self) -> &'a Token {
        let token = self.current();
        if !token.is_eof() {
            self.pos += 1;
        }
        token
    }

    /// Consume `kw` if it is next.
    pub fn eat(&mut self, kw: Kw) -> bool {
        if self.check(kw) {
            self.bump();
            true
        } else {
            false
        }
    }

    /// Skip a balanced `open ... close` group starting at the current
    /// token. Returns false if `Eof` came before the closing token.
    pub fn skip_group(&mut self, open: Kw, close: Kw) -> bool {
        let mut depth = 0usize;
        loop {
            let token = self.bump();
            if token.is_eof() {
                return false;
            }
            if token.is(open) {
                depth += 1;
            } else if token.is(close) {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return true;
                }
            }
        }
    }

    /// Skip to the next `,`, `;` or unmatched closer at nesting depth zero,
    /// without consuming it.
    pub fn skip_expression(&mut self) {
        let mut depth = 0usize;
        while !self.is_at_end() {
            let token = self.current();
            match token.kw {
                Some(Kw::OpenPar | Kw::OpenBracket | Kw::OpenBlk) => depth += 1,
                Some(Kw::ClosePar | Kw::CloseBracket | Kw::CloseBlk) => {
                    if depth == 0 {
                        return;
                    }
                    depth -= 1;
                }
                Some(Kw::Comma | Kw::Semicolon) if depth == 0 => return,
                _ => {}
            }
            self.bump();
        }
    }
}

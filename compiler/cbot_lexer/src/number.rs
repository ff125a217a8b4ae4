//! Numeric literal decoding.
//!
//! Integers that fit `i32` are `int` literals; larger ones up to `i64::MAX`
//! are `long` literals. Anything with a fraction or exponent is a float.

use cbot_ir::TokenValue;

/// Radix of an integer literal, by prefix.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Radix {
    Decimal,
    Hex,
    Binary,
}

/// Decode an integer literal (prefix included). `None` on overflow.
pub(crate) fn parse_int(text: &str, radix: Radix) -> Option<TokenValue> {
    let (digits, base) = match radix {
        Radix::Decimal => (text, 10),
        Radix::Hex => (&text[2..], 16),
        Radix::Binary => (&text[2..], 2),
    };
    let digits: String = digits.chars().filter(|c| *c != '_').collect();
    let value = u64::from_str_radix(&digits, base).ok()?;
    i64::try_from(value).ok().map(TokenValue::Int)
}

/// Decode a float literal.
pub(crate) fn parse_float(text: &str) -> Option<TokenValue> {
    text.parse::<f64>().ok().map(TokenValue::Float)
}

/// True when an integer literal must be typed `long`.
#[inline]
pub fn is_long(value: i64) -> bool {
    value > i64::from(i32::MAX)
}

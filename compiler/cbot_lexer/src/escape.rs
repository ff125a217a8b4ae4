//! Escape processing for string and char literals.
//!
//! Every malformed escape has its own error kind so editors can explain the
//! exact problem: `\q` is `BadEscape`, `\777` is `OctalRange`, `\x` with no
//! digits is `HexDigits`, `\x1FF` is `HexRange`, and a `\u`/`\U` sequence
//! that is short or names no Unicode scalar is `UnicodeName`.

use cbot_diagnostic::{CompileError, CompileErrorKind};
use cbot_ir::Span;

#[inline]
fn simple_escape(c: char) -> Option<char> {
    match c {
        '\\' => Some('\\'),
        '"' => Some('"'),
        '\'' => Some('\''),
        '?' => Some('?'),
        'n' => Some('\n'),
        't' => Some('\t'),
        'r' => Some('\r'),
        'a' => Some('\u{07}'),
        'b' => Some('\u{08}'),
        'f' => Some('\u{0C}'),
        'v' => Some('\u{0B}'),
        _ => None,
    }
}

/// Cook the content between the quotes of a literal starting at byte
/// `base` of the source.
pub(crate) fn cook(content: &str, base: u32) -> Result<String, CompileError> {
    // Fast path: nothing to cook.
    if memchr::memchr(b'\\', content.as_bytes()).is_none() {
        return Ok(content.to_owned());
    }

    let mut out = String::with_capacity(content.len());
    let mut chars = content.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let at = |end: usize| Span::new(base + i as u32, base + end as u32);
        let Some((j, esc)) = chars.next() else {
            return Err(CompileError::new(CompileErrorKind::BadEscape, at(i + 1)));
        };
        let mut end = j + esc.len_utf8();

        if let Some(resolved) = simple_escape(esc) {
            out.push(resolved);
            continue;
        }

        match esc {
            '0'..='7' => {
                let mut value = esc.to_digit(8).unwrap_or_default();
                for _ in 0..2 {
                    match chars.peek() {
                        Some(&(k, d @ '0'..='7')) => {
                            value = value * 8 + d.to_digit(8).unwrap_or_default();
                            end = k + 1;
                            chars.next();
                        }
                        _ => break,
                    }
                }
                if value > 0xFF {
                    return Err(CompileError::new(CompileErrorKind::OctalRange, at(end)));
                }
                out.push(char::from(value as u8));
            }
            'x' => {
                let mut value: u32 = 0;
                let mut digits = 0;
                while let Some(&(k, d)) = chars.peek() {
                    let Some(v) = d.to_digit(16) else { break };
                    value = value.saturating_mul(16).saturating_add(v);
                    digits += 1;
                    end = k + 1;
                    chars.next();
                }
                if digits == 0 {
                    return Err(CompileError::new(CompileErrorKind::HexDigits, at(end)));
                }
                if value > 0xFF {
                    return Err(CompileError::new(CompileErrorKind::HexRange, at(end)));
                }
                out.push(char::from(value as u8));
            }
            'u' | 'U' => {
                let want = if esc == 'u' { 4 } else { 8 };
                let mut value: u32 = 0;
                for _ in 0..want {
                    match chars.peek() {
                        Some(&(k, d)) if d.is_ascii_hexdigit() => {
                            value = value * 16 + d.to_digit(16).unwrap_or_default();
                            end = k + 1;
                            chars.next();
                        }
                        _ => {
                            return Err(CompileError::new(CompileErrorKind::UnicodeName, at(end)))
                        }
                    }
                }
                let Some(ch) = char::from_u32(value) else {
                    return Err(CompileError::new(CompileErrorKind::UnicodeName, at(end)));
                };
                out.push(ch);
            }
            _ => return Err(CompileError::new(CompileErrorKind::BadEscape, at(end))),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests;

use super::*;
use pretty_assertions::assert_eq;

fn kind(content: &str) -> Option<CompileErrorKind> {
    cook(content, 0).err().map(|e| e.kind)
}

#[test]
fn plain_content_is_unchanged() {
    assert_eq!(cook("hello", 0), Ok("hello".to_owned()));
}

#[test]
fn simple_escapes() {
    assert_eq!(
        cook(r#"a\n\t\"\\\'\?"#, 0),
        Ok("a\n\t\"\\'?".to_owned())
    );
}

#[test]
fn octal_and_hex() {
    assert_eq!(cook(r"\101\x41\0", 0), Ok("AA\0".to_owned()));
    assert_eq!(cook(r"\7a", 0), Ok("\u{07}a".to_owned()));
}

#[test]
fn unicode_escapes() {
    assert_eq!(cook(r"\u00e9\U0001F600", 0), Ok("é😀".to_owned()));
}

#[test]
fn malformed_escapes_have_distinct_kinds() {
    assert_eq!(kind(r"\q"), Some(CompileErrorKind::BadEscape));
    assert_eq!(kind(r"\777"), Some(CompileErrorKind::OctalRange));
    assert_eq!(kind(r"\xg"), Some(CompileErrorKind::HexDigits));
    assert_eq!(kind(r"\x1FF"), Some(CompileErrorKind::HexRange));
    assert_eq!(kind(r"\u12"), Some(CompileErrorKind::UnicodeName));
    assert_eq!(kind(r"\UD8000000"), Some(CompileErrorKind::UnicodeName));
}

#[test]
fn error_span_covers_the_escape() {
    let Err(err) = cook(r"ab\q", 10) else {
        panic!("\\q must be rejected");
    };
    assert_eq!(err.span, Span::new(12, 14));
}

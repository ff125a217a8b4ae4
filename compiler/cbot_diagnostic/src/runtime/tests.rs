use super::*;
use pretty_assertions::assert_eq;

#[test]
fn builtin_codes() {
    assert_eq!(RuntimeErrorKind::ZeroDiv.code(), 6000);
    assert_eq!(RuntimeErrorKind::StackOver.code(), 6010);
    assert_eq!(RuntimeErrorKind::DeletedPtr.code(), 6011);
    assert_eq!(RuntimeErrorKind::builtin(6008), Some(RuntimeErrorKind::Nan));
    assert_eq!(RuntimeErrorKind::builtin(6012), None);
    assert_eq!(RuntimeErrorKind::builtin(12), None);
}

#[test]
fn user_codes_pass_through() {
    assert_eq!(RuntimeErrorKind::UserThrow(42).code(), 42);
    assert_eq!(RuntimeErrorKind::Native(7).code(), 7);
    let err = RuntimeError::new(RuntimeErrorKind::UserThrow(42), Span::new(1, 2));
    assert_eq!(err.to_string(), "exception 42 thrown by the script at 1..2");
}

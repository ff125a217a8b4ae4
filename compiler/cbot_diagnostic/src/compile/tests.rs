use super::*;
use pretty_assertions::assert_eq;

#[test]
fn codes_are_sequential_from_5000() {
    for (i, kind) in CompileErrorKind::ALL.iter().enumerate() {
        assert_eq!(kind.code(), 5000 + i as i32, "{kind:?}");
        assert_eq!(CompileErrorKind::from_code(kind.code()), Some(*kind));
    }
    assert_eq!(CompileErrorKind::BadInstanceof.code(), 5054);
    assert_eq!(CompileErrorKind::BadChar.code(), 5056);
    assert_eq!(CompileErrorKind::from_code(4999), None);
    assert_eq!(CompileErrorKind::from_code(5057), None);
}

#[test]
fn error_display_includes_span() {
    let err = CompileError::new(CompileErrorKind::UndefVar, Span::new(4, 7));
    assert_eq!(err.to_string(), "variable not declared at 4..7");
    assert_eq!(err.code(), 5003);
}

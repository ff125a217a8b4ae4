use super::*;
use crate::CompileErrorKind;
use pretty_assertions::assert_eq;

#[test]
fn locate_finds_line_and_column() {
    let src = "int a;\nint b = c;\n";
    let loc = locate(src, Span::new(15, 16));
    assert_eq!(
        loc,
        Some(LineLocation {
            line: 2,
            column: 8,
            width: 1,
            text: "int b = c;",
        })
    );
}

#[test]
fn locate_clips_multiline_spans() {
    let src = "{\n}";
    let Some(loc) = locate(src, Span::new(0, 3)) else {
        panic!("span should resolve");
    };
    assert_eq!(loc.width, 1);
    assert_eq!(locate(src, Span::new(40, 41)), None);
}

#[test]
fn emit_without_colors() {
    let err = CompileError::new(CompileErrorKind::UndefVar, Span::new(8, 9));
    let mut out = Vec::new();
    let mut emitter = TerminalEmitter::new(&mut out);
    if let Err(e) = emitter.emit(&err, "int b = c;", "test.cbot") {
        panic!("write failed: {e}");
    }
    let text = String::from_utf8_lossy(&out);
    assert_eq!(
        text,
        "error[5003]: variable not declared\n  --> test.cbot:1:9\n  |\n1 | int b = c;\n  |         ^\n"
    );
}

#[test]
fn color_modes() {
    assert!(ColorMode::Always.should_use_colors(false));
    assert!(!ColorMode::Never.should_use_colors(true));
    assert!(ColorMode::Auto.should_use_colors(true));
}

//! Options, tokens and compile diagnostics as the host sees them.

use std::path::PathBuf;

use cbot_diagnostic::emitter::{locate, TerminalEmitter};
use cbot_diagnostic::CompileErrorKind;
use cbot_eval::ProgramError;
use cbot_ir::{Kw, TokenType};
use cbotc::options::{parse_run_options, OptionError, RunOptions};
use cbotc::session::SessionError;
use pretty_assertions::assert_eq;

use crate::common::run;

fn argv(args: &[&str]) -> Vec<String> {
    args.iter().map(|a| (*a).to_owned()).collect()
}

#[test]
fn run_options_default() {
    let options = parse_run_options(&argv(&["bot.cbot"])).unwrap();
    assert_eq!(
        options,
        RunOptions {
            path: PathBuf::from("bot.cbot"),
            ..RunOptions::default()
        }
    );
    assert_eq!(options.entry, "main");
    assert_eq!(options.budget, 1000);
}

#[test]
fn run_options_parse_every_flag() {
    let options = parse_run_options(&argv(&[
        "--entry=patrol",
        "bot.cbot",
        "--budget=25",
        "--max-ticks=7",
        "--save=out.state",
        "--restore=in.state",
        "-DTeam=3",
        "-D_Limit=-40",
    ]))
    .unwrap();
    assert_eq!(options.entry, "patrol");
    assert_eq!(options.budget, 25);
    assert_eq!(options.max_ticks, Some(7));
    assert_eq!(options.save_state, Some(PathBuf::from("out.state")));
    assert_eq!(options.restore_state, Some(PathBuf::from("in.state")));
    assert_eq!(
        options.defines,
        vec![("Team".to_owned(), 3), ("_Limit".to_owned(), -40)]
    );
}

#[test]
fn run_options_reject_bad_input() {
    assert_eq!(parse_run_options(&[]), Err(OptionError::MissingPath));
    assert_eq!(
        parse_run_options(&argv(&["a.cbot", "--budget=lots"])),
        Err(OptionError::BadValue {
            flag: "--budget",
            value: "lots".to_owned()
        })
    );
    assert_eq!(
        parse_run_options(&argv(&["a.cbot", "-D3x=1"])),
        Err(OptionError::BadDefine("3x=1".to_owned()))
    );
    assert_eq!(
        parse_run_options(&argv(&["a.cbot", "--fast"])),
        Err(OptionError::Unknown("--fast".to_owned()))
    );
    assert_eq!(
        parse_run_options(&argv(&["a.cbot", "b.cbot"])),
        Err(OptionError::Unknown("b.cbot".to_owned()))
    );
}

#[test]
fn token_stream_ends_with_eof() {
    let tokens = cbot_lexer::tokenize_plain("extern void main() { }").unwrap();
    let last = tokens.iter().last().unwrap();
    assert_eq!(last.ty, TokenType::Eof);
    assert_eq!(tokens.get(0).and_then(|t| t.kw), Some(Kw::Extern));
}

#[test]
fn compile_errors_point_at_the_offending_name() {
    let source = "extern void main() {\n    int a = missing;\n}";
    let (session, _) = run(source, &[]);
    let Err(SessionError::Compile(ProgramError::Compile(err))) = session else {
        panic!("expected a compile error");
    };
    assert_eq!(err.kind, CompileErrorKind::UndefVar);

    let loc = locate(source, err.span).unwrap();
    assert_eq!((loc.line, loc.column, loc.width), (2, 12, 7));
    assert_eq!(loc.text, "    int a = missing;");

    let mut rendered = Vec::new();
    TerminalEmitter::new(&mut rendered)
        .emit(&err, source, "bot.cbot")
        .unwrap();
    let rendered = String::from_utf8(rendered).unwrap();
    assert!(rendered.starts_with(&format!("error[{}]", err.code())));
    assert!(rendered.contains("bot.cbot:2:13"));
    assert!(rendered.contains("^^^^^^^"));
}

#[test]
fn defines_become_constants() {
    let (session, _) = run("extern void main() { return Team * 2; }", &["-DTeam=21"]);
    let session = session.unwrap();
    assert_eq!(
        session.program.result().and_then(|v| v.as_i64()),
        Some(42)
    );
}

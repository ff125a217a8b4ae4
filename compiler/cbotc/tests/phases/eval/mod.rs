//! Ticking programs through a host session.

use cbot_diagnostic::RuntimeErrorKind;
use cbot_eval::ProgramError;
use cbotc::session::SessionError;
use pretty_assertions::assert_eq;

use crate::common::run;

const COUNTDOWN: &str = "
extern void main() {
    for (int i = 3; i > 0; i--) {
        print(i);
        print(\" \");
    }
    println(\"liftoff\");
    return 3;
}";

#[test]
fn output_goes_to_the_host() {
    let (session, out) = run(COUNTDOWN, &[]);
    let session = session.unwrap();
    assert!(session.finished);
    assert_eq!(session.ticks, 1);
    assert_eq!(out, "3 2 1 liftoff\n");
    assert_eq!(session.program.result().and_then(|v| v.as_i64()), Some(3));
}

#[test]
fn small_budgets_take_more_ticks_with_the_same_output() {
    let (session, out) = run(COUNTDOWN, &["--budget=2"]);
    let session = session.unwrap();
    assert!(session.finished);
    assert!(session.ticks > 5, "only {} ticks", session.ticks);
    assert_eq!(out, "3 2 1 liftoff\n");
}

#[test]
fn tick_limit_leaves_the_program_running() {
    let (session, out) = run(
        "extern void main() { while (true) { print(\".\"); } }",
        &["--budget=10", "--max-ticks=3"],
    );
    let session = session.unwrap();
    assert!(!session.finished);
    assert_eq!(session.ticks, 3);
    assert!(session.program.is_running());
    assert!(!out.is_empty());
    assert!(session.program.run_pos().is_some());
}

#[test]
fn entry_option_selects_the_function() {
    let source = "extern void main() { println(\"main\"); }
        extern void other() { println(\"other\"); }";
    let (session, out) = run(source, &["--entry=other"]);
    assert!(session.unwrap().finished);
    assert_eq!(out, "other\n");
}

#[test]
fn missing_entry_is_reported() {
    let (session, _) = run("extern void main() { }", &["--entry=absent"]);
    assert!(matches!(session, Err(SessionError::NoEntry(name)) if name == "absent"));
}

#[test]
fn runtime_errors_end_the_session() {
    let (session, out) = run(
        "extern void main() { println(\"before\"); int z = 0; int x = 1 / z; println(\"after\"); }",
        &[],
    );
    let session = session.unwrap();
    assert!(session.finished);
    assert_eq!(out, "before\n");
    match session.program.error_info() {
        Some(ProgramError::Runtime(err)) => assert_eq!(err.kind, RuntimeErrorKind::ZeroDiv),
        other => panic!("expected a runtime error, got {other:?}"),
    }
}

#[test]
fn classes_and_builtins_work_together() {
    let source = "
public class Robot {
    string name;
    int energy = 100;
    void Robot(string n) { name = n; }
    void spend(int amount) { energy = energy - amount; }
}

extern void main() {
    Robot r(\"scout\");
    for (int i = 0; i < 4; i++) r.spend(15);
    println(strupper(r.name) + \" \" + r.energy);
}";
    let (session, out) = run(source, &["--budget=7"]);
    assert!(session.unwrap().finished);
    assert_eq!(out, "SCOUT 40\n");
}

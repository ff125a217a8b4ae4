//! Stopping, saving and resuming through state files.

use cbot_eval::StateError;
use cbotc::session::{execute, SessionError};
use pretty_assertions::assert_eq;

use crate::common::{captured_env, options, run, text};

const WORKER: &str = "
public class Tally { static int total = 0; }

int weigh(int n) { return n * n; }

extern void main() {
    int seen[];
    for (int i = 1; i <= 6; i++) {
        seen[i - 1] = weigh(i);
        Tally.total += seen[i - 1];
        print(i);
    }
    println(\"\");
    return Tally.total * 100 + sizeof(seen);
}";

#[test]
fn resumed_run_matches_an_uninterrupted_one() {
    let (straight, straight_out) = run(WORKER, &["--budget=5"]);
    let straight = straight.unwrap();
    let expected = straight.program.result().and_then(|v| v.as_i64());
    assert_eq!(expected, Some(9106));

    let dir = tempfile::tempdir().unwrap();
    let state = dir.path().join("worker.state");
    let state_arg = state.display().to_string();

    let (first, first_out) = run(
        WORKER,
        &["--budget=5", "--max-ticks=6", format!("--save={state_arg}").as_str()],
    );
    let first = first.unwrap();
    assert!(!first.finished);
    assert!(state.exists());
    drop(first);

    let (second, second_out) = run(
        WORKER,
        &["--budget=5", format!("--restore={state_arg}").as_str()],
    );
    let second = second.unwrap();
    assert!(second.finished);
    assert_eq!(second.program.result().and_then(|v| v.as_i64()), expected);
    assert_eq!(format!("{first_out}{second_out}"), straight_out);
}

#[test]
fn finished_state_restores_its_result() {
    let dir = tempfile::tempdir().unwrap();
    let state = dir.path().join("done.state");
    let save = format!("--save={}", state.display());
    let (first, _) = run("extern void main() { return 5; }", &[save.as_str()]);
    assert!(first.unwrap().finished);

    let restore = format!("--restore={}", state.display());
    let (second, _) = run("extern void main() { return 5; }", &[restore.as_str()]);
    let second = second.unwrap();
    assert_eq!(second.ticks, 0);
    assert_eq!(second.program.result().and_then(|v| v.as_i64()), Some(5));
}

#[test]
fn corrupt_state_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let state = dir.path().join("bad.state");
    std::fs::write(&state, [0x01_u8, 0x01]).unwrap();

    let (env, buffer) = captured_env();
    let restore = format!("--restore={}", state.display());
    let result = execute(&env, WORKER, &options(&[restore.as_str()]));
    assert!(matches!(
        result,
        Err(SessionError::State(StateError::Corrupt(_)))
    ));
    assert_eq!(text(&buffer), "");
}

#[test]
fn missing_state_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let restore = format!("--restore={}", dir.path().join("nope.state").display());
    let (result, _) = run(WORKER, &[restore.as_str()]);
    assert!(matches!(result, Err(SessionError::Io(_))));
}

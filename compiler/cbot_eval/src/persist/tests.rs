use super::codec::{unzigzag, zigzag, Decoder, Encoder};
use super::*;
use pretty_assertions::assert_eq;

use std::cell::Cell;

use cbot_ir::TypeDesc;
use cbot_value::{expect_args, CallStatus, NativeFunction};

use crate::default_environment;

fn compiled(env: &Rc<Environment>, src: &str) -> Program {
    let mut program = Program::new(env);
    assert!(program.compile(src, &mut ()), "{:?}", program.error_info());
    program
}

fn run_to_end(program: &mut Program, budget: i32) -> Option<i64> {
    let mut guard = 0;
    while !program.run(&mut (), budget) {
        guard += 1;
        assert!(guard < 100_000, "program never finished");
    }
    assert!(program.error_info().is_none(), "{:?}", program.error_info());
    program.result().and_then(Variable::as_i64)
}

fn snapshot(program: &Program) -> Vec<u8> {
    let mut bytes = Vec::new();
    match program.save_state(&mut bytes) {
        Ok(()) => bytes,
        Err(err) => panic!("save failed: {err}"),
    }
}

/// Run `src` to completion in one program; then, in a second environment,
/// run it `steps` single steps, save, restore into a third environment and
/// finish there. Both results must agree.
fn resumes_identically(src: &str, steps: usize) -> i64 {
    let env = default_environment();
    let mut straight = compiled(&env, src);
    assert!(straight.start("main"));
    let expected = run_to_end(&mut straight, 10_000);

    let env = default_environment();
    let mut first = compiled(&env, src);
    assert!(first.start("main"));
    for _ in 0..steps {
        assert!(!first.run(&mut (), 1), "finished before the snapshot");
    }
    let bytes = snapshot(&first);
    drop(first);

    let env = default_environment();
    let mut second = compiled(&env, src);
    if let Err(err) = second.restore_state(&mut bytes.as_slice()) {
        panic!("restore failed: {err}");
    }
    assert!(second.is_running());
    let resumed = run_to_end(&mut second, 10_000);
    assert_eq!(resumed, expected);
    resumed.unwrap_or_else(|| panic!("no result"))
}

#[test]
fn nested_loops_resume_mid_iteration() {
    let src = "extern void main() {
        int total = 0;
        for (int i = 0; i < 4; i++) {
            int j = 0;
            while (true) {
                j++;
                if (j > i) break;
                if (j == 2) continue;
                total += i * 10 + j;
            }
        }
        return total;
    }";
    for steps in [3, 17, 40] {
        resumes_identically(src, steps);
    }
}

#[test]
fn calls_and_try_frames_survive() {
    let src = "int f(int n) {
            try { if (n == 2) throw 9; return n; }
            catch (9) { return 100; }
        }
        extern void main() { int s = 0; for (int i = 0; i < 4; i++) s += f(i); return s; }";
    assert_eq!(resumes_identically(src, 25), 104);
}

#[test]
fn aliased_instances_stay_shared() {
    let src = "class Box { int v = 1; }
        extern void main() {
            Box a = new Box();
            Box b = a;
            for (int i = 0; i < 3; i++) { }
            b.v = 5;
            return a.v;
        }";
    assert_eq!(resumes_identically(src, 12), 5);
}

#[test]
fn cyclic_instances_restore() {
    let src = "class Node { Node next; int v; }
        extern void main() {
            Node a = new Node();
            Node b = new Node();
            a.next = b; b.next = a; a.v = 3;
            for (int i = 0; i < 3; i++) { }
            return b.next.v;
        }";
    assert_eq!(resumes_identically(src, 20), 3);
}

#[test]
fn statics_and_arrays_are_saved() {
    let src = "class K { static int hits = 0; }
        extern void main() {
            int a[] = {4, 5};
            a[4] = 6;
            K.hits = sizeof(a);
            for (int i = 0; i < 3; i++) { K.hits++; }
            return K.hits * 10 + a[1];
        }";
    assert_eq!(resumes_identically(src, 15), 85);
}

#[test]
fn pending_native_call_is_resumed() {
    fn slow_env(polls: &Rc<Cell<i32>>) -> Rc<Environment> {
        let env = default_environment();
        let seen = Rc::clone(polls);
        env.add_function(NativeFunction::new(
            "slow",
            move |args, ret, _| {
                seen.set(seen.get() + 1);
                if seen.get() < 2 {
                    return Ok(CallStatus::Pending);
                }
                ret.set_i64(args[0].as_i64().unwrap_or(0) * 2);
                Ok(CallStatus::Done)
            },
            |args, _| expect_args(args, 1).map(|()| TypeDesc::INT),
        ));
        env
    }
    let src = "extern void main() { int base = 1; return base + slow(20); }";

    let polls = Rc::new(Cell::new(0));
    let env = slow_env(&polls);
    let mut first = compiled(&env, src);
    assert!(first.start("main"));
    assert!(!first.run(&mut (), 100));
    assert_eq!(polls.get(), 1);
    let bytes = snapshot(&first);

    let polls = Rc::new(Cell::new(1));
    let env = slow_env(&polls);
    let mut second = compiled(&env, src);
    if let Err(err) = second.restore_state(&mut bytes.as_slice()) {
        panic!("restore failed: {err}");
    }
    assert_eq!(run_to_end(&mut second, 100), Some(41));
}

#[test]
fn finished_programs_keep_their_result() {
    let src = "extern void main() { return 6 * 7; }";
    let env = default_environment();
    let mut first = compiled(&env, src);
    assert!(first.start("main"));
    assert_eq!(run_to_end(&mut first, 100), Some(42));
    let bytes = snapshot(&first);

    let mut second = compiled(&default_environment(), src);
    if let Err(err) = second.restore_state(&mut bytes.as_slice()) {
        panic!("restore failed: {err}");
    }
    assert!(!second.is_running());
    assert_eq!(second.result().and_then(Variable::as_i64), Some(42));
}

#[test]
fn restore_needs_a_compiled_program() {
    let env = default_environment();
    let mut source = compiled(&env, "extern void main() { }");
    assert!(source.start("main"));
    let bytes = snapshot(&source);

    let mut empty = Program::new(&env);
    let err = empty.restore_state(&mut bytes.as_slice());
    assert!(matches!(err, Err(StateError::NotCompiled)));
}

#[test]
fn unknown_version_is_rejected() {
    let env = default_environment();
    let mut program = compiled(&env, "extern void main() { }");
    let mut bytes = Encoder::default();
    bytes.uvar(VERSION + 1);
    let err = program.restore_state(&mut bytes.into_bytes().as_slice());
    assert!(matches!(err, Err(StateError::BadVersion { found: 2, expected: 1 })));
}

#[test]
fn truncated_state_is_corrupt_and_changes_nothing() {
    let src = "extern void main() { for (int i = 0; i < 9; i++) { } }";
    let env = default_environment();
    let mut program = compiled(&env, src);
    assert!(program.start("main"));
    assert!(!program.run(&mut (), 5));
    let bytes = snapshot(&program);

    let mut target = compiled(&default_environment(), src);
    let cut = &bytes[..bytes.len() - 1];
    let err = target.restore_state(&mut &cut[..]);
    assert!(matches!(err, Err(StateError::Corrupt(_))));
    assert!(!target.is_running());
}

#[test]
fn state_for_other_code_is_refused() {
    let env = default_environment();
    let mut program = compiled(&env, "int helper() { return 1; } extern void main() { helper(); }");
    assert!(program.start("main"));
    assert!(!program.run(&mut (), 2));
    let bytes = snapshot(&program);

    let mut other = compiled(&default_environment(), "extern void other() { }");
    let err = other.restore_state(&mut bytes.as_slice());
    assert!(matches!(err, Err(StateError::UnknownCode(_))));
}

#[test]
fn zigzag_maps_small_magnitudes_to_small_codes() {
    assert_eq!(zigzag(0), 0);
    assert_eq!(zigzag(-1), 1);
    assert_eq!(zigzag(1), 2);
    assert_eq!(zigzag(-2), 3);
    for v in [i64::MIN, -300, 0, 77, i64::MAX] {
        assert_eq!(unzigzag(zigzag(v)), v);
    }
}

#[test]
fn leb128_layout() {
    let mut enc = Encoder::default();
    enc.uvar(300);
    enc.uvar(u64::MAX);
    let bytes = enc.into_bytes();
    assert_eq!(&bytes[..2], &[0xac, 0x02]);
    assert_eq!(bytes.len(), 12);

    let mut dec = Decoder::new(&bytes);
    assert_eq!(dec.uvar().ok(), Some(300));
    assert_eq!(dec.uvar().ok(), Some(u64::MAX));
    assert!(dec.is_empty());
}

#[test]
fn overlong_varints_are_rejected() {
    let mut dec = Decoder::new(&[0xff; 11]);
    assert!(matches!(dec.uvar(), Err(StateError::Corrupt(_))));
    let mut dec = Decoder::new(&[0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x02]);
    assert!(matches!(dec.uvar(), Err(StateError::Corrupt(_))));
}

#[test]
fn string_lengths_are_bounded_by_the_input() {
    let mut enc = Encoder::default();
    enc.uvar(1_000);
    enc.u8(b'x');
    let bytes = enc.into_bytes();
    let mut dec = Decoder::new(&bytes);
    assert!(matches!(dec.str(), Err(StateError::Corrupt(_))));
}

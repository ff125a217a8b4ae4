use super::*;
use pretty_assertions::assert_eq;

use std::cell::Cell;

use cbot_diagnostic::CompileErrorKind;
use cbot_ir::TypeDesc;
use cbot_value::{expect_args, CallStatus, NativeFunction, NativeMethod};

use crate::default_environment;

#[test]
fn compile_errors_leave_the_program_uncompiled() {
    let env = default_environment();
    let mut program = Program::new(&env);
    assert!(!program.compile("extern void main() { int a = ; }", &mut ()));
    assert!(!program.is_compiled());
    let Some(ProgramError::Compile(err)) = program.error_info() else {
        panic!("expected a compile error, got {:?}", program.error_info());
    };
    assert_eq!(err.kind, CompileErrorKind::NoExpression);
    let (code, start, _) = program.error().unwrap_or_default();
    assert_eq!(code, err.code());
    assert!(start > 0);
}

#[test]
fn missing_return_is_a_compile_error() {
    let env = default_environment();
    let mut program = Program::new(&env);
    assert!(!program.compile("int f(int n) { if (n > 0) return 1; }", &mut ()));
    assert!(matches!(
        program.error_info(),
        Some(ProgramError::Compile(err)) if err.kind == CompileErrorKind::NoReturn
    ));
}

#[test]
fn a_failed_compile_releases_classes_of_the_previous_one() {
    let env = default_environment();
    let mut program = Program::new(&env);
    assert!(program.compile("public class Shared { int v; }", &mut ()));
    assert!(env.classes().by_name("Shared").is_some());
    assert!(!program.compile("extern void main() { x; }", &mut ()));
    assert!(env.classes().by_name("Shared").is_none());
}

#[test]
fn extern_names_lists_entry_points() {
    let env = default_environment();
    let mut program = Program::new(&env);
    assert!(program.compile(
        "extern void a() { } void hidden() { } extern void b(int x = 1) { }",
        &mut ()
    ));
    let mut names = program.extern_names();
    names.sort();
    assert_eq!(names, vec!["a".to_owned(), "b".to_owned()]);
}

#[test]
fn starting_an_unknown_function_is_no_run() {
    let env = default_environment();
    let mut program = Program::new(&env);
    assert!(program.compile("extern void main() { }", &mut ()));
    assert!(!program.start("other"));
    assert_eq!(
        program.error().map(|(code, ..)| code),
        Some(RuntimeErrorKind::NoRun.code())
    );
    assert!(!program.is_running());
    assert!(program.run(&mut (), 10));
}

#[test]
fn negative_budget_keeps_the_previous_one() {
    let env = default_environment();
    let mut program = Program::new(&env);
    assert!(program.compile(
        "extern void main() { for (int i = 0; i < 100000; i++) { } }",
        &mut ()
    ));
    assert!(program.start("main"));
    assert!(!program.run(&mut (), 4));
    let first = program.run_pos();
    assert!(!program.run(&mut (), -1));
    assert_eq!(program.budget, 4);
    assert!(first.is_some());
}

#[test]
fn run_pos_and_call_stack_follow_calls() {
    let env = default_environment();
    let mut program = Program::new(&env);
    assert!(program.compile(
        "int inner() { int x = 1; return x; } extern void main() { int r = inner(); }",
        &mut ()
    ));
    assert!(program.start("main"));
    let mut deepest = 0;
    while !program.run(&mut (), 1) {
        let stack = program.call_stack();
        deepest = deepest.max(stack.len());
        if stack.len() == 2 {
            assert_eq!(stack[0].0, "main");
            assert_eq!(stack[1].0, "inner");
            assert_eq!(program.run_pos().map(|(name, _)| name), Some("inner".to_owned()));
        }
    }
    assert_eq!(deepest, 2);
    assert!(program.call_stack().is_empty());
}

#[test]
fn result_is_the_entry_return_value() {
    let env = default_environment();
    let mut program = Program::new(&env);
    assert!(program.compile("extern void main() { return \"done\"; }", &mut ()));
    assert!(program.start("main"));
    assert!(program.run(&mut (), 100));
    assert_eq!(program.result().and_then(Variable::as_str), Some("done"));
    assert!(program.error().is_none());
}

#[test]
fn stop_cancels_pending_natives() {
    let env = default_environment();
    let cancelled = Rc::new(Cell::new(false));
    let flag = Rc::clone(&cancelled);
    env.add_function(
        NativeFunction::new(
            "forever",
            |_, _, _| Ok(CallStatus::Pending),
            |args, _| expect_args(args, 0).map(|()| TypeDesc::VOID),
        )
        .with_cancel(move |_| flag.set(true)),
    );
    let mut program = Program::new(&env);
    assert!(program.compile("extern void main() { forever(); }", &mut ()));
    assert!(program.start("main"));
    assert!(!program.run(&mut (), 100));
    assert!(!program.run(&mut (), 100));
    program.stop();
    assert!(cancelled.get());
    assert!(!program.is_running());
}

struct Host {
    released: Vec<u64>,
}

#[test]
fn stopped_instances_are_destroyed_with_the_host_context() {
    let env = default_environment();
    let Ok(handle) = env.add_class("Handle", None, false) else {
        panic!("class registration failed");
    };
    let wrong = Rc::new(Cell::new(0));
    let seen = Rc::clone(&wrong);
    let dtor = NativeMethod::new(
        move |this, _, _, user| {
            let id = this.pointer().map_or(0, |p| p.borrow().id());
            match user.downcast_mut::<Host>() {
                Some(host) => host.released.push(id),
                None => seen.set(seen.get() + 1),
            }
            Ok(CallStatus::Done)
        },
        |_, args, _| expect_args(args, 0).map(|()| TypeDesc::VOID),
    );
    assert!(env.add_method(handle, "~Handle", dtor).is_ok());
    env.add_function(NativeFunction::new(
        "forever",
        |_, _, _| Ok(CallStatus::Pending),
        |args, _| expect_args(args, 0).map(|()| TypeDesc::VOID),
    ));

    let mut host = Host { released: Vec::new() };
    let mut program = Program::new(&env);
    let src = "extern void main() { Handle h = new Handle(); forever(); }";
    assert!(program.compile(src, &mut host));
    assert!(program.start("main"));
    assert!(!program.run(&mut host, 100));
    program.stop();
    assert!(host.released.is_empty());

    program.finalize(&mut host);
    assert_eq!(host.released.len(), 1);
    assert_eq!(wrong.get(), 0);

    assert!(program.start("main"));
    assert!(!program.run(&mut host, 100));
    assert!(program.compile(src, &mut host));
    assert_eq!(host.released.len(), 2);
    assert_eq!(wrong.get(), 0);
}

#[test]
fn recompiling_replaces_the_unit() {
    let env = default_environment();
    let mut program = Program::new(&env);
    assert!(program.compile("extern void one() { }", &mut ()));
    assert!(program.compile("extern void two() { }", &mut ()));
    assert_eq!(program.extern_names(), vec!["two".to_owned()]);
    assert!(!program.start("one"));
}

#[test]
fn dropping_a_program_unregisters_its_classes() {
    let env = default_environment();
    {
        let mut program = Program::new(&env);
        assert!(program.compile("public class Temp { }", &mut ()));
        assert!(env.classes().by_name("Temp").is_some());
    }
    assert!(env.classes().by_name("Temp").is_none());
}

use super::*;
use pretty_assertions::assert_eq;

use std::cell::Cell;

use cbot_ir::TypeKind;
use cbot_value::{expect_args, CallStatus, NativeFunction};

use crate::{default_environment, Program, ProgramError};

fn start(env: &Rc<Environment>, src: &str) -> Program {
    let mut program = Program::new(env);
    assert!(program.compile(src, &mut ()), "{:?}\n{src}", program.error_info());
    assert!(program.start("main"), "no entry point in\n{src}");
    program
}

/// Run to completion; returns how many `run` calls it took.
fn finish(program: &mut Program, budget: i32) -> usize {
    let mut calls = 1;
    while !program.run(&mut (), budget) {
        calls += 1;
        assert!(calls < 1_000_000, "program never finished");
    }
    calls
}

fn eval_in(env: &Rc<Environment>, src: &str) -> Variable {
    let mut program = start(env, src);
    finish(&mut program, 10_000);
    if let Some(err) = program.error_info() {
        panic!("unexpected error {err}\n{src}");
    }
    program
        .result()
        .cloned()
        .unwrap_or_else(|| panic!("no result from\n{src}"))
}

fn eval(src: &str) -> Variable {
    eval_in(&default_environment(), src)
}

fn error_of(src: &str) -> RuntimeErrorKind {
    let env = default_environment();
    let mut program = start(&env, src);
    finish(&mut program, 10_000);
    match program.error_info() {
        Some(ProgramError::Runtime(err)) => err.kind,
        other => panic!("expected a runtime error, got {other:?}\n{src}"),
    }
}

fn int(src: &str) -> i64 {
    let v = eval(src);
    v.as_i64().unwrap_or_else(|| panic!("not an integer: {v:?}"))
}

/// Native `name()` returning how many times `counter` was bumped.
fn counter_natives(env: &Environment, counter: &Rc<Cell<i32>>) {
    let bump = Rc::clone(counter);
    env.add_function(NativeFunction::new(
        "mark",
        move |_, _, _| {
            bump.set(bump.get() + 1);
            Ok(CallStatus::Done)
        },
        |args, _| expect_args(args, 0).map(|()| TypeDesc::VOID),
    ));
    let read = Rc::clone(counter);
    env.add_function(NativeFunction::new(
        "marks",
        move |_, ret, _| {
            ret.set_i64(i64::from(read.get()));
            Ok(CallStatus::Done)
        },
        |args, _| expect_args(args, 0).map(|()| TypeDesc::INT),
    ));
}

// Arithmetic and typing

#[test]
fn mixed_arithmetic_widens_to_float() {
    let v = eval("extern void main() { return 1 + 1.5; }");
    assert_eq!(v.kind(), TypeKind::Float);
    assert_eq!(v.as_f64(), Some(2.5));
}

#[test]
fn string_concatenation_formats_numbers() {
    let v = eval("extern void main() { return \"a\" + 1; }");
    assert_eq!(v.as_str(), Some("a1"));
}

#[test]
fn int_overflowing_literal_sum_is_long() {
    let v = eval("extern void main() { return 2147483647 + 1; }");
    assert_eq!(v.kind(), TypeKind::Long);
    assert_eq!(v.as_i64(), Some(2_147_483_648));
}

#[test]
fn division_by_zero_fails() {
    assert_eq!(
        error_of("extern void main() { return 5 / 0; }"),
        RuntimeErrorKind::ZeroDiv
    );
    assert_eq!(
        error_of("extern void main() { return 5.0 / 0.0; }"),
        RuntimeErrorKind::ZeroDiv
    );
    assert_eq!(
        error_of("extern void main() { int a = 5; int b = 0; return a / b; }"),
        RuntimeErrorKind::ZeroDiv
    );
    assert_eq!(
        error_of("extern void main() { float a = 5.0; float b = 0.0; return a / b; }"),
        RuntimeErrorKind::ZeroDiv
    );
}

#[test]
fn reading_an_unset_local_fails() {
    assert_eq!(
        error_of("extern void main() { int a; int b = a + 1; }"),
        RuntimeErrorKind::NotInit
    );
}

#[test]
fn nan_compares_by_init_state() {
    let v = eval("extern void main() { float x = nan; return x == nan; }");
    assert_eq!(v.as_bool(), Some(true));
    let v = eval("extern void main() { float x = nan; return x != 1; }");
    assert_eq!(v.as_bool(), Some(true));
}

#[test]
fn short_circuit_skips_the_right_operand() {
    let counter = Rc::new(Cell::new(0));
    let env = default_environment();
    counter_natives(&env, &counter);
    let v = eval_in(
        &env,
        "boolean touch() { mark(); return true; }
         extern void main() { boolean a = false && touch(); boolean b = true || touch(); return a || b; }",
    );
    assert_eq!(v.as_bool(), Some(true));
    assert_eq!(counter.get(), 0);
}

// Control flow

#[test]
fn loops_count_as_expected() {
    assert_eq!(
        int("extern void main() { int n = 0; int i = 0; while (i < 5) { n += 2; i++; } return n; }"),
        10
    );
    assert_eq!(
        int("extern void main() { int n = 0; do { n++; } while (n < 3); return n; }"),
        3
    );
    assert_eq!(
        int("extern void main() { int n = 0; for (int i = 0; i < 4; i++) { n += i; } return n; }"),
        6
    );
    assert_eq!(
        int("extern void main() { int n = 0; repeat (4) { n++; } return n; }"),
        4
    );
}

#[test]
fn labeled_break_and_continue_target_the_outer_loop() {
    let src = "extern void main() {
        int n = 0;
        outer: for (int i = 0; i < 3; i++) {
            for (int j = 0; j < 3; j++) {
                if (j == 1) continue outer;
                if (i == 2) break outer;
                n++;
            }
        }
        return n;
    }";
    assert_eq!(int(src), 2);
}

#[test]
fn switch_falls_through_to_default() {
    let src = "int pick(int v) {
            int r = 0;
            switch (v) { case 1: r = 10; break; case 2: r = 20; default: r = r + 1; }
            return r;
        }
        extern void main() { return pick(1) * 10000 + pick(2) * 100 + pick(5); }";
    assert_eq!(int(src), 102_101);
}

#[test]
fn ternary_converts_to_the_common_type() {
    let v = eval("extern void main() { boolean c = true; return c ? 1 : 2.5; }");
    assert_eq!(v.as_f64(), Some(1.0));
}

#[test]
fn recursion_works_until_the_stack_is_full() {
    assert_eq!(
        int("int fact(int n) { if (n <= 1) return 1; return n * fact(n - 1); }
             extern void main() { return fact(10); }"),
        3_628_800
    );
    assert_eq!(
        error_of("int down(int n) { return down(n + 1); } extern void main() { down(0); }"),
        RuntimeErrorKind::StackOver
    );
}

// Exceptions

#[test]
fn catch_finally_runs_in_order() {
    let src = "extern void main() {
        int r = 0;
        try { r = 1; throw 42; r = 2; }
        catch (42) { r = r + 10; }
        finally { r = r + 100; }
        return r;
    }";
    assert_eq!(int(src), 111);
}

#[test]
fn runtime_errors_are_catchable_by_code() {
    let src = "extern void main() {
        int zero = 0;
        try { int x = 1 / zero; } catch (6000) { return 1; }
        return 0;
    }";
    assert_eq!(int(src), 1);
}

#[test]
fn unmatched_throw_reaches_the_host() {
    assert_eq!(
        error_of("extern void main() { try { throw 7; } catch (8) { } }"),
        RuntimeErrorKind::UserThrow(7)
    );
    assert_eq!(
        error_of("extern void main() { throw 0; }"),
        RuntimeErrorKind::BadThrow
    );
}

#[test]
fn finally_runs_when_returning() {
    let counter = Rc::new(Cell::new(0));
    let env = default_environment();
    counter_natives(&env, &counter);
    let v = eval_in(
        &env,
        "int f() { try { return 1; } finally { mark(); } }
         extern void main() { return f(); }",
    );
    assert_eq!(v.as_i64(), Some(1));
    assert_eq!(counter.get(), 1);
}

// Arrays

#[test]
fn sizeof_reports_array_length() {
    assert_eq!(
        int("extern void main() { int a = sizeof(new int[5]); return a; }"),
        5
    );
}

#[test]
fn undimensioned_arrays_grow_on_write() {
    assert_eq!(
        int("extern void main() { int a[]; a[3] = 7; return sizeof(a) * 10 + a[3]; }"),
        47
    );
}

#[test]
fn reading_past_the_end_fails() {
    assert_eq!(
        error_of("extern void main() { int a[2]; int b = a[5]; }"),
        RuntimeErrorKind::OutArray
    );
}

#[test]
fn array_initializers_fill_elements() {
    assert_eq!(
        int("extern void main() { int a[] = {1, 2, 3}; return a[0] + a[1] * 10 + a[2] * 100; }"),
        321
    );
}

#[test]
fn arrays_are_shared_by_reference() {
    assert_eq!(
        int("extern void main() { int a[] = {1}; int b[] = a; b[0] = 9; return a[0]; }"),
        9
    );
}

// Classes

#[test]
fn members_default_and_initialize_parent_first() {
    let src = "class Base { int hp = 10; }
        class Tank extends Base { int armor = 3; }
        extern void main() { Tank t = new Tank(); return t.hp * 10 + t.armor; }";
    assert_eq!(int(src), 103);
}

#[test]
fn constructors_receive_arguments() {
    let src = "class P { int x; void P(int v) { x = v * 2; } }
        extern void main() { P p(4); P q = new P(5); return p.x + q.x; }";
    assert_eq!(int(src), 18);
}

#[test]
fn methods_bind_statically() {
    let src = "class A { int who() { return 1; } }
        class B extends A { int who() { return 2; } }
        extern void main() { A a = new B(); B b = new B(); return a.who() * 10 + b.who(); }";
    assert_eq!(int(src), 12);
}

#[test]
fn null_receiver_fails() {
    assert_eq!(
        error_of("class A { int v; } extern void main() { A a = null; a.v = 1; }"),
        RuntimeErrorKind::Null
    );
}

#[test]
fn instanceof_follows_inheritance() {
    let v = eval(
        "class A { } class B extends A { }
         extern void main() { A a = new B(); return a instanceof B; }",
    );
    assert_eq!(v.as_bool(), Some(true));
}

#[test]
fn statics_are_shared_between_instances() {
    let src = "class C { static int n = 5; void C() { n++; } }
        extern void main() { C a(); C b(); return C.n; }";
    assert_eq!(int(src), 7);
}

#[test]
fn destructor_runs_once_when_the_last_reference_goes() {
    let counter = Rc::new(Cell::new(0));
    let env = default_environment();
    counter_natives(&env, &counter);
    let src = "class R { void ~R() { mark(); } }
        extern void main() {
            R a = new R();
            R b = a;
            a = null;
            int seen = marks();
            b = null;
            return seen * 10 + marks();
        }";
    assert_eq!(eval_in(&env, src).as_i64(), Some(1));
    assert_eq!(counter.get(), 1);
}

#[test]
fn deleted_instances_fail_on_access() {
    let env = default_environment();
    let src = "class Bot { int hp = 3; }
        extern void main() { Bot b = new Bot(); wait(); return b.hp; }";
    let resumed = Rc::new(Cell::new(false));
    let flag = Rc::clone(&resumed);
    env.add_function(NativeFunction::new(
        "wait",
        move |_, _, _| {
            if flag.replace(true) {
                Ok(CallStatus::Done)
            } else {
                Ok(CallStatus::Pending)
            }
        },
        |args, _| expect_args(args, 0).map(|()| TypeDesc::VOID),
    ));
    let mut program = start(&env, src);
    assert!(!program.run(&mut (), 100));
    let id = env
        .heap()
        .find(1)
        .map(|instance| instance.borrow().id())
        .unwrap_or_else(|| panic!("instance not live"));
    assert!(env.heap().delete(id));
    finish(&mut program, 100);
    match program.error_info() {
        Some(ProgramError::Runtime(err)) => assert_eq!(err.kind, RuntimeErrorKind::DeletedPtr),
        other => panic!("expected DeletedPtr, got {other:?}"),
    }
}

// Suspension

#[test]
fn budget_interrupts_long_loops() {
    let env = default_environment();
    let mut program = start(&env, "extern void main() { for (int i = 0; i < 1000000; i++) {} }");
    assert!(!program.run(&mut (), 10));
    assert!(program.is_running());
}

#[test]
fn single_steps_are_deterministic() {
    let src = "int sq(int x) { return x * x; }
        extern void main() { int s = 0; for (int i = 0; i < 3; i++) { s += sq(i); } return s; }";
    let trace = || {
        let env = default_environment();
        let mut program = start(&env, src);
        let mut positions = Vec::new();
        while !program.run(&mut (), 1) {
            positions.push(program.run_pos());
        }
        (positions, program.result().and_then(Variable::as_i64))
    };
    let (first, result) = trace();
    let (second, _) = trace();
    assert_eq!(result, Some(5));
    assert!(first.len() > 10);
    assert_eq!(first, second);
}

#[test]
fn pending_natives_suspend_the_run() {
    let env = default_environment();
    let polls = Rc::new(Cell::new(0));
    let seen = Rc::clone(&polls);
    env.add_function(NativeFunction::new(
        "slow",
        move |args, ret, _| {
            seen.set(seen.get() + 1);
            if seen.get() < 3 {
                return Ok(CallStatus::Pending);
            }
            ret.set_i64(args[0].as_i64().unwrap_or(0) + 1);
            Ok(CallStatus::Done)
        },
        |args, _| expect_args(args, 1).map(|()| TypeDesc::INT),
    ));
    let mut program = start(&env, "extern void main() { return slow(41); }");
    assert_eq!(finish(&mut program, 1000), 3);
    assert_eq!(program.result().and_then(Variable::as_i64), Some(42));
    assert_eq!(polls.get(), 3);
}

#[test]
fn native_failures_are_catchable() {
    let env = default_environment();
    env.add_function(NativeFunction::new(
        "boom",
        |_, _, _| Err(77),
        |args, _| expect_args(args, 0).map(|()| TypeDesc::VOID),
    ));
    let v = eval_in(
        &env,
        "extern void main() { try { boom(); } catch (77) { return 1; } return 0; }",
    );
    assert_eq!(v.as_i64(), Some(1));
}

#[test]
fn synchronized_methods_are_reentrant() {
    let src = "class Counter {
            synchronized int depth(int n) { if (n == 0) return 0; return 1 + depth(n - 1); }
        }
        extern void main() { Counter c = new Counter(); return c.depth(3); }";
    assert_eq!(int(src), 3);
}

#[test]
fn a_held_lock_blocks_other_programs_until_freed() {
    let env = default_environment();
    let open = Rc::new(Cell::new(false));
    let gate = Rc::clone(&open);
    env.add_function(NativeFunction::new(
        "hold",
        move |_, _, _| {
            if gate.get() {
                Ok(CallStatus::Done)
            } else {
                Ok(CallStatus::Pending)
            }
        },
        |args, _| expect_args(args, 0).map(|()| TypeDesc::VOID),
    ));

    let mut first = start(
        &env,
        "public class Gate { synchronized int pass() { hold(); return 7; } }
         extern void main() { Gate g = new Gate(); return g.pass(); }",
    );
    let mut second = start(
        &env,
        "extern void main() { Gate g = new Gate(); return g.pass() + 1; }",
    );

    assert!(!first.run(&mut (), 100));
    let class = env.classes().by_name("Gate");
    let holder = class.and_then(|c| env.classes().get(c).and_then(|d| d.lock.holder()));
    assert_eq!(holder, Some(first.id()));

    open.set(true);
    assert!(!second.run(&mut (), 100));
    first.stop();
    assert_eq!(finish(&mut second, 100), 1);
    assert_eq!(second.result().and_then(Variable::as_i64), Some(8));
}

#[test]
fn do_call_reports_unknown_names() {
    let env = default_environment();
    let mut ret = Variable::create("", TypeDesc::INT);
    let mut args = [Variable::string("abc")];
    assert_eq!(do_call(&env, "nope", &mut args, &mut ret, &mut ()), DoCall::Unknown);
    assert_eq!(do_call(&env, "strlen", &mut args, &mut ret, &mut ()), DoCall::Done);
    assert_eq!(ret.as_i64(), Some(3));
}

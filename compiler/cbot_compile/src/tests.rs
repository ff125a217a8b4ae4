use super::*;
use pretty_assertions::assert_eq;

use cbot_ir::{NodeKind, TypeKind};
use cbot_value::{CallStatus, NativeFunction};

fn build(env: &Environment, src: &str) -> Result<Unit, CompileError> {
    let program = env.next_program_id();
    compile(env, program, src, &mut ())
}

fn error_of(src: &str) -> CompileErrorKind {
    let env = Environment::new();
    match build(&env, src) {
        Ok(_) => panic!("expected a compile error for:\n{src}"),
        Err(err) => err.kind,
    }
}

fn ok(env: &Environment, src: &str) -> Unit {
    build(env, src).unwrap_or_else(|err| panic!("{err}\n{src}"))
}

fn body(unit: &Unit, key: &str) -> Rc<cbot_ir::Code> {
    unit.function_by_key(key)
        .and_then(|f| f.code())
        .unwrap_or_else(|| panic!("no body for {key}"))
}

#[test]
fn extern_functions_are_listed_in_order() {
    let env = Environment::new();
    let unit = ok(
        &env,
        "extern void b() {} int helper(int x) { return x; } extern void a() {}",
    );
    assert_eq!(unit.extern_names(), vec!["b".to_owned(), "a".to_owned()]);
    assert!(unit.entry("a").is_some());
    assert!(unit.entry("helper").is_none());
}

#[test]
fn functions_may_call_later_declarations() {
    let env = Environment::new();
    let unit = ok(
        &env,
        "extern void main() { int v = twice(4); } int twice(int x) { return x * 2; }",
    );
    let code = body(&unit, "main()");
    let calls = code
        .nodes
        .iter()
        .filter(|n| matches!(&n.kind, NodeKind::Call { func, .. } if func.key == "twice(int)"))
        .count();
    assert_eq!(calls, 1);
}

#[test]
fn overloads_prefer_exact_match() {
    let env = Environment::new();
    let unit = ok(
        &env,
        "int f(int x) { return 1; } int f(float x) { return 2; }
         extern void main() { f(1); f(1.5); }",
    );
    let code = body(&unit, "main()");
    let keys: Vec<&str> = code
        .nodes
        .iter()
        .filter_map(|n| match &n.kind {
            NodeKind::Call { func, .. } => Some(func.key.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(keys, vec!["f(int)", "f(float)"]);
}

#[test]
fn default_arguments_are_appended() {
    let env = Environment::new();
    let unit = ok(
        &env,
        "int add(int a, int b = 10) { return a + b; } extern void main() { add(1); }",
    );
    let code = body(&unit, "main()");
    let args = code.nodes.iter().find_map(|n| match &n.kind {
        NodeKind::Call { args, .. } => Some(args.len()),
        _ => None,
    });
    assert_eq!(args, Some(2));
}

#[test]
fn natives_are_type_checked_by_their_checker() {
    let env = Environment::new();
    env.add_function(NativeFunction::new(
        "half",
        |args, ret, _| {
            let v = args[0].as_i64().unwrap_or(0);
            ret.set_i64(v / 2);
            Ok(CallStatus::Done)
        },
        |args, _| {
            cbot_value::expect_args(args, 1)?;
            if args[0].kind() == TypeKind::Int {
                Ok(TypeDesc::INT)
            } else {
                Err(CompileErrorKind::BadParam)
            }
        },
    ));
    ok(&env, "extern void main() { int x = half(4); }");
    let err = build(&env, "extern void main() { half(\"no\"); }").map(|_| ());
    assert_eq!(err.map_err(|e| e.kind), Err(CompileErrorKind::BadParam));
}

#[test]
fn classes_register_members_and_methods() {
    let env = Environment::new();
    let unit = ok(
        &env,
        "public class Point {
             int x = 1, y;
             private int secret;
             void Point() { x = 0; }
             int sum() { return x + y; }
         }
         extern void main() { Point p; p.x = 3; int s = p.sum(); }",
    );
    assert_eq!(unit.classes.len(), 1);
    let classes = env.classes();
    let id = classes.by_name("Point").unwrap_or_else(|| panic!("Point missing"));
    let def = classes.get(id).unwrap_or_else(|| panic!("Point missing"));
    assert!(def.compiled);
    assert_eq!(def.members.len(), 3);
    assert!(def.members[0].init.is_some());
    assert!(def.members[1].init.is_none());
    assert!(def.method("Point::sum()").is_some());
}

#[test]
fn class_local_without_initializer_constructs() {
    let env = Environment::new();
    let unit = ok(
        &env,
        "class A { int v; void A() { v = 1; } }
         extern void main() { A a; A b = null; }",
    );
    let code = body(&unit, "main()");
    let inits: Vec<bool> = code
        .nodes
        .iter()
        .filter_map(|n| match &n.kind {
            NodeKind::Declare(d) => Some(matches!(d.init, cbot_ir::DeclInit::Construct { .. })),
            _ => None,
        })
        .collect();
    assert_eq!(inits, vec![true, false]);
}

#[test]
fn failed_compile_withdraws_classes() {
    let env = Environment::new();
    let err = build(&env, "class Gone { int x; } extern void main() { y = 1; }");
    assert_eq!(err.map(|_| ()).map_err(|e| e.kind), Err(CompileErrorKind::UndefVar));
    assert!(env.classes().by_name("Gone").is_none());
}

#[test]
fn first_error_is_reported_with_its_span() {
    let env = Environment::new();
    let src = "extern void main() {\n  int a = 1\n}";
    let Err(err) = build(&env, src) else {
        panic!("expected a missing terminator");
    };
    assert_eq!(err.kind, CompileErrorKind::NoTerminator);
    assert_eq!(&src[err.span.start as usize..err.span.end as usize], "}");
}

#[test]
fn shadowing_is_a_redefinition() {
    assert_eq!(
        error_of("extern void main() { int a; { int a; } }"),
        CompileErrorKind::RedefVar
    );
    // Sibling scopes may reuse a name.
    let env = Environment::new();
    ok(&env, "extern void main() { { int a; } { int a; } }");
}

#[test]
fn type_errors() {
    assert_eq!(
        error_of("extern void main() { int a = \"x\"; }"),
        CompileErrorKind::BadType1
    );
    assert_eq!(
        error_of("extern void main() { if (1) {} }"),
        CompileErrorKind::NotBoolean
    );
    assert_eq!(
        error_of("extern void main() { boolean b = true - 1; }"),
        CompileErrorKind::BadType2
    );
    assert_eq!(
        error_of("extern void main() { 3 = 4; }"),
        CompileErrorKind::BadLeft
    );
}

#[test]
fn control_flow_errors() {
    assert_eq!(error_of("extern void main() { break; }"), CompileErrorKind::BreakOutside);
    assert_eq!(
        error_of("extern void main() { while (true) { continue outer; } }"),
        CompileErrorKind::UndefLabel
    );
    assert_eq!(error_of("extern void main() { x: int a; }"), CompileErrorKind::Label);
    assert_eq!(error_of("extern void main() { case 1: ; }"), CompileErrorKind::CaseOut);
    assert_eq!(
        error_of("extern void main() { switch (1) { case 1: case 1: } }"),
        CompileErrorKind::RedefCase
    );
    assert_eq!(error_of("int f() { }"), CompileErrorKind::NoReturn);
}

#[test]
fn infinite_loops_need_no_return() {
    let env = Environment::new();
    ok(&env, "int f() { while (true) { } }");
    ok(&env, "int g() { for (;;) { } }");
    assert_eq!(
        error_of("int h() { while (true) { break; } }"),
        CompileErrorKind::NoReturn
    );
}

#[test]
fn call_errors() {
    assert_eq!(error_of("extern void main() { nothing(); }"), CompileErrorKind::UndefCall);
    assert_eq!(
        error_of("void f(int a) {} extern void main() { f(); }"),
        CompileErrorKind::LowParam
    );
    assert_eq!(
        error_of("void f(int a) {} extern void main() { f(1, 2); }"),
        CompileErrorKind::OverParam
    );
    assert_eq!(
        error_of("void f(int a) {} extern void main() { f(true); }"),
        CompileErrorKind::BadParam
    );
    assert_eq!(
        error_of("void f(int a, float b) {} void f(float a, int b) {} extern void main() { f(1, 1); }"),
        CompileErrorKind::AmbiguousCall
    );
    assert_eq!(error_of("void f(int a = x) {}"), CompileErrorKind::DefaultValue);
    assert_eq!(error_of("void f(void a) {}"), CompileErrorKind::Void);
}

#[test]
fn class_errors() {
    assert_eq!(error_of("class A {} class A {}"), CompileErrorKind::RedefClass);
    assert_eq!(
        error_of("class A { private int x; } extern void main() { A a; a.x = 1; }"),
        CompileErrorKind::Private
    );
    assert_eq!(
        error_of("class A { void A(int v) {} } extern void main() { A a(1, 2); }"),
        CompileErrorKind::OverParam
    );
    assert_eq!(
        error_of("class A { } extern void main() { A a(1); }"),
        CompileErrorKind::NoConstruct
    );
    assert_eq!(
        error_of("class A { int x; } extern void main() { A a; a.y = 1; }"),
        CompileErrorKind::UndefItem
    );
}

#[test]
fn inherited_members_and_methods_resolve() {
    let env = Environment::new();
    ok(
        &env,
        "class Base { protected int hp = 10; int life() { return hp; } }
         class Tank extends Base { int armor() { return hp + life(); } }
         extern void main() { Tank t; int h = t.life(); }",
    );
}

#[test]
fn sizeof_type_is_folded() {
    let env = Environment::new();
    let unit = ok(&env, "extern void main() { int s = sizeof(long); }");
    let code = body(&unit, "main()");
    assert!(code
        .nodes
        .iter()
        .any(|n| matches!(n.kind, NodeKind::Literal(cbot_ir::Literal::Int(8)))));
}

#[test]
fn negative_literals_fold() {
    let env = Environment::new();
    let unit = ok(&env, "extern void main() { int m = -2147483648; long l = -5000000000; }");
    let code = body(&unit, "main()");
    let lits: Vec<&cbot_ir::Literal> = code
        .nodes
        .iter()
        .filter_map(|n| match &n.kind {
            NodeKind::Literal(lit) => Some(lit),
            _ => None,
        })
        .collect();
    assert!(lits.contains(&&cbot_ir::Literal::Int(i32::MIN)));
    assert!(lits.contains(&&cbot_ir::Literal::Long(-5_000_000_000)));
}

#[test]
fn public_functions_are_shared_between_programs() {
    let env = Environment::new();
    ok(&env, "public int shared(int x) { return x + 1; }");
    ok(&env, "extern void main() { int v = shared(2); }");
    assert_eq!(
        error_of("public int dup() { return 1; } public int dup() { return 2; }"),
        CompileErrorKind::RedefFunc
    );
}

#[test]
fn int_literal_overflow_folds_to_long() {
    let env = Environment::new();
    let unit = ok(&env, "extern void main() { long l = 2147483647 + 1; int i = 2 * 3; }");
    let code = body(&unit, "main()");
    let decl_types: Vec<TypeKind> = code
        .nodes
        .iter()
        .filter_map(|n| match &n.kind {
            NodeKind::Literal(lit) => Some(lit.ty().kind()),
            _ => None,
        })
        .collect();
    assert!(decl_types.contains(&TypeKind::Long));
    assert!(code
        .nodes
        .iter()
        .any(|n| matches!(n.kind, NodeKind::Literal(cbot_ir::Literal::Int(6)))));
}

#[test]
fn entry_functions_may_return_a_result() {
    let env = Environment::new();
    ok(&env, "extern void main() { return 5; }");
    assert_eq!(
        error_of("void helper() { return 5; }"),
        CompileErrorKind::BadType1
    );
}

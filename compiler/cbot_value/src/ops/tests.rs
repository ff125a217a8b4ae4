use super::*;
use pretty_assertions::assert_eq;

fn eval(op: BinaryOp, a: &Variable, b: &Variable, ty: &TypeDesc) -> Variable {
    match binary(op, a, b, ty) {
        Ok(v) => v,
        Err(e) => panic!("{op} failed: {e}"),
    }
}

#[test]
fn int_and_float_mix_to_float() {
    let r = eval(BinaryOp::Add, &Variable::int(1), &Variable::float(1.5), &TypeDesc::FLOAT);
    assert_eq!(r.number(), Some(Number::Float(2.5)));
}

#[test]
fn string_concat_stringifies_other_side() {
    let r = eval(BinaryOp::Add, &Variable::string("a"), &Variable::int(1), &TypeDesc::STRING);
    assert_eq!(r.as_str(), Some("a1"));
    let r = eval(BinaryOp::Add, &Variable::float(2.5), &Variable::string("x"), &TypeDesc::STRING);
    assert_eq!(r.as_str(), Some("2.5x"));
}

#[test]
fn int_arithmetic_wraps() {
    let r = eval(BinaryOp::Add, &Variable::int(i32::MAX), &Variable::int(1), &TypeDesc::INT);
    assert_eq!(r.number(), Some(Number::Int(i32::MIN)));
    let r = eval(BinaryOp::Div, &Variable::int(i32::MIN), &Variable::int(-1), &TypeDesc::INT);
    assert_eq!(r.number(), Some(Number::Int(i32::MIN)));
}

#[test]
fn division_by_zero() {
    let int = binary(BinaryOp::Div, &Variable::int(5), &Variable::int(0), &TypeDesc::INT);
    assert_eq!(int.err(), Some(RuntimeErrorKind::ZeroDiv));
    let float = binary(
        BinaryOp::Div,
        &Variable::float(5.0),
        &Variable::float(0.0),
        &TypeDesc::FLOAT,
    );
    assert_eq!(float.err(), Some(RuntimeErrorKind::ZeroDiv));
    let modulo = binary(BinaryOp::Mod, &Variable::int(5), &Variable::int(0), &TypeDesc::INT);
    assert_eq!(modulo.err(), Some(RuntimeErrorKind::ZeroDiv));
}

#[test]
fn undefined_and_nan_operands() {
    let undef = Variable::create("u", TypeDesc::INT);
    let nan = Variable::nan(TypeKind::Float);
    assert_eq!(
        binary(BinaryOp::Add, &undef, &Variable::int(1), &TypeDesc::INT).err(),
        Some(RuntimeErrorKind::NotInit)
    );
    assert_eq!(
        binary(BinaryOp::Mul, &nan, &Variable::float(1.0), &TypeDesc::FLOAT).err(),
        Some(RuntimeErrorKind::Nan)
    );
    assert_eq!(unary(UnaryOp::Neg, &nan).err(), Some(RuntimeErrorKind::Nan));
}

#[test]
fn nan_equality_compares_init_states() {
    let nan = Variable::nan(TypeKind::Float);
    let other_nan = Variable::nan(TypeKind::Int);
    let one = Variable::int(1);
    let b = TypeDesc::BOOLEAN;
    assert_eq!(eval(BinaryOp::Eq, &nan, &other_nan, &b).as_bool(), Some(true));
    assert_eq!(eval(BinaryOp::Ne, &nan, &one, &b).as_bool(), Some(true));
    assert_eq!(eval(BinaryOp::Eq, &nan, &one, &b).as_bool(), Some(false));
}

#[test]
fn comparisons() {
    let b = TypeDesc::BOOLEAN;
    let lo = eval(BinaryOp::Lo, &Variable::int(2), &Variable::double(2.5), &b);
    assert_eq!(lo.as_bool(), Some(true));
    let hs = eval(BinaryOp::Hs, &Variable::string("b"), &Variable::string("a"), &b);
    assert_eq!(hs.as_bool(), Some(true));
    let eq = eval(BinaryOp::Eq, &Variable::long(3), &Variable::int(3), &b);
    assert_eq!(eq.as_bool(), Some(true));
}

#[test]
fn pointer_identity() {
    let heap = crate::heap::Heap::new();
    let inst = heap.allocate(crate::ClassBody::new(
        cbot_ir::ClassId::new(0),
        "A".into(),
        Vec::new(),
    ));
    let mut p = Variable::create("p", TypeDesc::pointer(cbot_ir::ClassId::new(0)));
    p.set_pointer(Some(inst));
    let q = p.clone();
    let null = Variable::null();
    let b = TypeDesc::BOOLEAN;
    assert_eq!(eval(BinaryOp::Eq, &p, &q, &b).as_bool(), Some(true));
    assert_eq!(eval(BinaryOp::Eq, &p, &null, &b).as_bool(), Some(false));
    assert_eq!(eval(BinaryOp::Eq, &Variable::null(), &null, &b).as_bool(), Some(true));
}

#[test]
fn shifts() {
    let i = TypeDesc::INT;
    let r = eval(BinaryOp::Sr, &Variable::int(-8), &Variable::int(28), &i);
    assert_eq!(r.number(), Some(Number::Int(15)));
    let r = eval(BinaryOp::Asr, &Variable::int(-8), &Variable::int(1), &i);
    assert_eq!(r.number(), Some(Number::Int(-4)));
    let r = eval(BinaryOp::Sl, &Variable::int(1), &Variable::int(33), &i);
    assert_eq!(r.number(), Some(Number::Int(2)));
}

#[test]
fn boolean_and_bitwise_logic() {
    let t = Variable::boolean(true);
    let f = Variable::boolean(false);
    let b = TypeDesc::BOOLEAN;
    assert_eq!(eval(BinaryOp::Xor, &t, &f, &b).as_bool(), Some(true));
    assert_eq!(eval(BinaryOp::LogAnd, &t, &f, &b).as_bool(), Some(false));
    let r = eval(BinaryOp::And, &Variable::int(6), &Variable::int(3), &TypeDesc::INT);
    assert_eq!(r.number(), Some(Number::Int(2)));
}

#[test]
fn power_and_modulo() {
    let r = eval(BinaryOp::Power, &Variable::int(2), &Variable::int(10), &TypeDesc::INT);
    assert_eq!(r.number(), Some(Number::Int(1024)));
    let r = eval(BinaryOp::Mod, &Variable::int(-7), &Variable::int(3), &TypeDesc::INT);
    assert_eq!(r.number(), Some(Number::Int(-1)));
}

#[test]
fn unary_and_step() {
    let r = unary(UnaryOp::BitNot, &Variable::int(0)).map(|v| v.number());
    assert_eq!(r, Ok(Some(Number::Int(-1))));
    let r = unary(UnaryOp::Not, &Variable::boolean(false)).map(|v| v.as_bool());
    assert_eq!(r, Ok(Some(true)));

    let mut x = Variable::int(i32::MAX);
    assert_eq!(step(IncDec::Inc, &mut x), Ok(()));
    assert_eq!(x.number(), Some(Number::Int(i32::MIN)));
    let mut f = Variable::float(0.5);
    assert_eq!(step(IncDec::Dec, &mut f), Ok(()));
    assert_eq!(f.number(), Some(Number::Float(-0.5)));
    let mut u = Variable::create("u", TypeDesc::INT);
    assert_eq!(step(IncDec::Inc, &mut u), Err(RuntimeErrorKind::NotInit));
}

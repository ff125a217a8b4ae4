use super::*;
use pretty_assertions::assert_eq;

use cbot_ir::ClassId;

fn classes() -> (ClassRegistry, ClassId, ClassId) {
    let mut reg = ClassRegistry::new();
    let a = reg.define("A", None, false, false, None).unwrap_or_else(|e| panic!("{e}"));
    let b = reg.define("B", Some(a), false, false, None).unwrap_or_else(|e| panic!("{e}"));
    (reg, a, b)
}

#[test]
fn numeric_promotion() {
    assert_eq!(
        binary_result(BinaryOp::Add, &TypeDesc::INT, &TypeDesc::FLOAT),
        Ok(TypeDesc::FLOAT)
    );
    assert_eq!(
        binary_result(BinaryOp::Mul, &TypeDesc::CHAR, &TypeDesc::simple(TypeKind::Byte)),
        Ok(TypeDesc::INT)
    );
    assert_eq!(
        binary_result(BinaryOp::Sub, &TypeDesc::LONG, &TypeDesc::INT),
        Ok(TypeDesc::LONG)
    );
}

#[test]
fn string_concat_accepts_anything() {
    assert_eq!(
        binary_result(BinaryOp::Add, &TypeDesc::STRING, &TypeDesc::INT),
        Ok(TypeDesc::STRING)
    );
    assert_eq!(
        binary_result(BinaryOp::Add, &TypeDesc::BOOLEAN, &TypeDesc::STRING),
        Ok(TypeDesc::STRING)
    );
    assert_eq!(
        binary_result(BinaryOp::Sub, &TypeDesc::STRING, &TypeDesc::INT),
        Err(CompileErrorKind::BadType2)
    );
}

#[test]
fn comparisons_and_logic() {
    let p = TypeDesc::pointer(ClassId::new(0));
    assert_eq!(binary_result(BinaryOp::Eq, &p, &TypeDesc::NULL), Ok(TypeDesc::BOOLEAN));
    assert_eq!(
        binary_result(BinaryOp::Lo, &p, &TypeDesc::NULL),
        Err(CompileErrorKind::BadType2)
    );
    assert_eq!(
        binary_result(BinaryOp::LogAnd, &TypeDesc::INT, &TypeDesc::INT),
        Err(CompileErrorKind::NotBoolean)
    );
    assert_eq!(
        binary_result(BinaryOp::And, &TypeDesc::INT, &TypeDesc::LONG),
        Ok(TypeDesc::LONG)
    );
    assert_eq!(
        binary_result(BinaryOp::Sl, &TypeDesc::FLOAT, &TypeDesc::INT),
        Err(CompileErrorKind::BadType2)
    );
}

#[test]
fn pointer_assignment_follows_inheritance() {
    let (reg, a, b) = classes();
    let pa = TypeDesc::pointer(a);
    let pb = TypeDesc::pointer(b);
    assert!(assignable(&reg, &pa, &pb));
    assert!(!assignable(&reg, &pb, &pa));
    assert!(assignable(&reg, &pb, &TypeDesc::NULL));
    assert!(!assignable(&reg, &TypeDesc::INT, &pa));
}

#[test]
fn conversion_costs_prefer_exact() {
    let (reg, _, _) = classes();
    assert_eq!(conversion_cost(&reg, &TypeDesc::INT, &TypeDesc::INT), Some(0));
    assert_eq!(conversion_cost(&reg, &TypeDesc::FLOAT, &TypeDesc::INT), Some(1));
    assert_eq!(conversion_cost(&reg, &TypeDesc::INT, &TypeDesc::FLOAT), Some(4));
    assert_eq!(conversion_cost(&reg, &TypeDesc::BOOLEAN, &TypeDesc::INT), None);
}

#[test]
fn keys() {
    let (reg, a, _) = classes();
    let params = [TypeDesc::INT, TypeDesc::array(TypeDesc::pointer(a), -1)];
    assert_eq!(function_key(&reg, None, "f", &params), "f(int,A[])");
    assert_eq!(function_key(&reg, Some("A"), "g", &[]), "A::g()");
    assert_eq!(member_init_key("A", "x"), "A::<init>x");
}

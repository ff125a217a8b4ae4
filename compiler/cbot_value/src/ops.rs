//! Operator semantics on variables.
//!
//! The compiler has already checked operand types, so every function here
//! matches on the value variants and treats impossible combinations as a
//! host misuse (`debug_assert!` plus an undefined result).
//!
//! Rules shared by all operators:
//! - an `Undef` operand is `NotInit`
//! - a `nan` operand is `Nan`, except for `==`/`!=` which then compare the
//!   init states of both operands (`nan == nan` holds)
//! - `/` and `%` by zero are `ZeroDiv`, for floats too
//! - integer arithmetic wraps to the result kind

use std::cmp::Ordering;
use std::rc::Rc;

use cbot_diagnostic::RuntimeErrorKind;
use cbot_ir::{BinaryOp, IncDec, TypeDesc, TypeKind, UnaryOp};

use crate::{InitState, Number, Value, Variable};

type OpResult = Result<Variable, RuntimeErrorKind>;

fn check_operand(v: &Variable) -> Result<(), RuntimeErrorKind> {
    match v.init {
        InitState::Def => Ok(()),
        InitState::Undef => Err(RuntimeErrorKind::NotInit),
        InitState::IsNan => Err(RuntimeErrorKind::Nan),
    }
}

/// Apply a binary operator. `ty` is the static result type chosen by the
/// compiler.
pub fn binary(op: BinaryOp, a: &Variable, b: &Variable, ty: &TypeDesc) -> OpResult {
    if matches!(op, BinaryOp::Eq | BinaryOp::Ne) && (a.is_nan() || b.is_nan()) {
        // Init states are compared, not values.
        let same = a.init == b.init;
        return Ok(Variable::boolean(same == (op == BinaryOp::Eq)));
    }
    check_operand(a)?;
    check_operand(b)?;

    match op {
        BinaryOp::Add if ty.kind() == TypeKind::String => {
            Ok(Variable::string(format!("{a}{b}")))
        }
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod
        | BinaryOp::Power => arithmetic(op, a, b, ty.kind()),
        BinaryOp::Eq => Ok(Variable::boolean(equal(a, b))),
        BinaryOp::Ne => Ok(Variable::boolean(!equal(a, b))),
        BinaryOp::Lo | BinaryOp::Hi | BinaryOp::Ls | BinaryOp::Hs => {
            let ord = order(a, b);
            let holds = match op {
                BinaryOp::Lo => ord == Some(Ordering::Less),
                BinaryOp::Hi => ord == Some(Ordering::Greater),
                BinaryOp::Ls => matches!(ord, Some(Ordering::Less | Ordering::Equal)),
                _ => matches!(ord, Some(Ordering::Greater | Ordering::Equal)),
            };
            Ok(Variable::boolean(holds))
        }
        BinaryOp::And | BinaryOp::Or | BinaryOp::Xor | BinaryOp::LogAnd | BinaryOp::LogOr => {
            bitwise(op, a, b, ty.kind())
        }
        BinaryOp::Sl | BinaryOp::Asr | BinaryOp::Sr => shift(op, a, b, ty.kind()),
    }
}

fn numbers(a: &Variable, b: &Variable) -> Option<(Number, Number)> {
    let as_number = |v: &Variable| match v.value {
        Value::Number(n) => Some(n),
        Value::Bool(flag) => Some(Number::Int(i32::from(flag))),
        _ => None,
    };
    Some((as_number(a)?, as_number(b)?))
}

fn arithmetic(op: BinaryOp, a: &Variable, b: &Variable, kind: TypeKind) -> OpResult {
    let Some((x, y)) = numbers(a, b) else {
        debug_assert!(false, "{op} on non-numeric operands");
        return Ok(Variable::create("", TypeDesc::simple(kind)));
    };
    let float = kind.is_float() || x.is_float() || y.is_float();
    if matches!(op, BinaryOp::Div | BinaryOp::Mod) && y.is_zero() {
        return Err(RuntimeErrorKind::ZeroDiv);
    }

    let result = if float {
        let (x, y) = (x.as_f64(), y.as_f64());
        let r = match op {
            BinaryOp::Add => x + y,
            BinaryOp::Sub => x - y,
            BinaryOp::Mul => x * y,
            BinaryOp::Div => x / y,
            BinaryOp::Mod => x % y,
            _ => x.powf(y),
        };
        Number::from_f64(kind, r)
    } else {
        let (x, y) = (x.as_i64(), y.as_i64());
        let r = match op {
            BinaryOp::Add => x.wrapping_add(y),
            BinaryOp::Sub => x.wrapping_sub(y),
            BinaryOp::Mul => x.wrapping_mul(y),
            BinaryOp::Div => narrow_signed(kind, x).wrapping_div(narrow_signed(kind, y)),
            BinaryOp::Mod => narrow_signed(kind, x).wrapping_rem(narrow_signed(kind, y)),
            _ => (x as f64).powf(y as f64) as i64,
        };
        Number::from_i64(kind, r)
    };
    Ok(Variable::from_number(result))
}

/// Re-read `v` at the width of `kind` so `i32::MIN / -1` wraps like an int.
fn narrow_signed(kind: TypeKind, v: i64) -> i64 {
    Number::from_i64(kind, v).as_i64()
}

fn bitwise(op: BinaryOp, a: &Variable, b: &Variable, kind: TypeKind) -> OpResult {
    if let (Value::Bool(x), Value::Bool(y)) = (&a.value, &b.value) {
        let r = match op {
            BinaryOp::And | BinaryOp::LogAnd => *x && *y,
            BinaryOp::Or | BinaryOp::LogOr => *x || *y,
            _ => x ^ y,
        };
        return Ok(Variable::boolean(r));
    }
    let Some((x, y)) = numbers(a, b) else {
        debug_assert!(false, "{op} on incompatible operands");
        return Ok(Variable::boolean(false));
    };
    let (x, y) = (x.as_i64(), y.as_i64());
    let r = match op {
        BinaryOp::And | BinaryOp::LogAnd => x & y,
        BinaryOp::Or | BinaryOp::LogOr => x | y,
        _ => x ^ y,
    };
    Ok(Variable::from_number(Number::from_i64(kind, r)))
}

fn bit_width(kind: TypeKind) -> u32 {
    match kind {
        TypeKind::Byte => 8,
        TypeKind::Short | TypeKind::Char => 16,
        TypeKind::Long => 64,
        _ => 32,
    }
}

fn shift(op: BinaryOp, a: &Variable, b: &Variable, kind: TypeKind) -> OpResult {
    let Some((x, y)) = numbers(a, b) else {
        debug_assert!(false, "{op} on non-integer operands");
        return Ok(Variable::create("", TypeDesc::simple(kind)));
    };
    let width = bit_width(kind);
    let amount = (y.as_i64() as u32) & (width - 1);
    let x = narrow_signed(kind, x.as_i64());
    let r = match op {
        BinaryOp::Sl => x.wrapping_shl(amount),
        BinaryOp::Asr => x >> amount,
        _ => {
            let mask = if width == 64 { u64::MAX } else { (1u64 << width) - 1 };
            (((x as u64) & mask) >> amount) as i64
        }
    };
    Ok(Variable::from_number(Number::from_i64(kind, r)))
}

/// Address of the shared object behind a pointer or array, `None` for null.
fn identity(v: &Variable) -> Option<*const ()> {
    match &v.value {
        Value::Pointer(p) => p.as_ref().map(|p| Rc::as_ptr(p).cast::<()>()),
        Value::Array(a) => a.as_ref().map(|a| Rc::as_ptr(a).cast::<()>()),
        _ => None,
    }
}

fn is_reference(v: &Variable) -> bool {
    matches!(v.value, Value::Pointer(_) | Value::Array(_))
}

/// `==` on two defined operands.
pub fn equal(a: &Variable, b: &Variable) -> bool {
    if is_reference(a) || is_reference(b) {
        return identity(a) == identity(b);
    }
    match (&a.value, &b.value) {
        (Value::Str(x), Value::Str(y)) => x == y,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Instance(x), Value::Instance(y)) => {
            x.class == y.class
                && x.members.len() == y.members.len()
                && x
                    .members
                    .iter()
                    .zip(&y.members)
                    .all(|(m, n)| m.init == n.init && (!m.is_defined() || equal(m, n)))
        }
        _ => order(a, b) == Some(Ordering::Equal),
    }
}

fn order(a: &Variable, b: &Variable) -> Option<Ordering> {
    match (&a.value, &b.value) {
        (Value::Str(x), Value::Str(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => {
            let (x, y) = numbers(a, b)?;
            if x.is_float() || y.is_float() {
                x.as_f64().partial_cmp(&y.as_f64())
            } else {
                Some(x.as_i64().cmp(&y.as_i64()))
            }
        }
    }
}

/// Apply a unary operator.
pub fn unary(op: UnaryOp, v: &Variable) -> OpResult {
    check_operand(v)?;
    match (op, &v.value) {
        (UnaryOp::Not, Value::Bool(b)) => Ok(Variable::boolean(!b)),
        (UnaryOp::Neg, Value::Number(n)) => {
            let r = if n.is_float() {
                Number::from_f64(n.kind(), -n.as_f64())
            } else {
                Number::from_i64(n.kind(), n.as_i64().wrapping_neg())
            };
            Ok(Variable::from_number(r))
        }
        (UnaryOp::BitNot | UnaryOp::Not, Value::Number(n)) if !n.is_float() => {
            Ok(Variable::from_number(Number::from_i64(n.kind(), !n.as_i64())))
        }
        _ => {
            debug_assert!(false, "{op:?} on a {} value", v.kind().name());
            Ok(v.clone())
        }
    }
}

/// `++`/`--` in place.
pub fn step(op: IncDec, v: &mut Variable) -> Result<(), RuntimeErrorKind> {
    check_operand(v)?;
    let Value::Number(n) = v.value else {
        debug_assert!(false, "{op:?} on a {} value", v.kind().name());
        return Ok(());
    };
    let delta = match op {
        IncDec::Inc => 1,
        IncDec::Dec => -1,
    };
    v.value = Value::Number(if n.is_float() {
        Number::from_f64(n.kind(), n.as_f64() + f64::from(delta))
    } else {
        Number::from_i64(n.kind(), n.as_i64().wrapping_add(i64::from(delta)))
    });
    Ok(())
}

#[cfg(test)]
mod tests;

//! Built-in natives: `sizeof`, the string library and the math library.
//!
//! Every entry is an ordinary [`NativeFunction`]; hosts can replace one by
//! registering a native with the same name after [`install`].

use std::any::Any;
use std::cell::Cell;
use std::rc::Rc;

use cbot_diagnostic::{CompileErrorKind, RuntimeErrorKind};
use cbot_ir::{TypeDesc, TypeKind};
use cbot_value::{expect_args, CallStatus, Environment, NativeFunction, Variable};

type Check = fn(&[TypeDesc], &mut dyn Any) -> Result<TypeDesc, CompileErrorKind>;
type NativeResult = Result<CallStatus, i32>;

/// Register every built-in on `env`.
pub fn install(env: &Environment) {
    let simple: [(&str, fn(&mut [Variable], &mut Variable) -> NativeResult, Check); 24] = [
        ("sizeof", sizeof, check_sizeof),
        ("strlen", strlen, check_strlen),
        ("strleft", strleft, check_str_int),
        ("strright", strright, check_str_int),
        ("strmid", strmid, check_strmid),
        ("strfind", strfind, check_strfind),
        ("strval", strval, check_strval),
        ("strupper", strupper, check_str),
        ("strlower", strlower, check_str),
        ("abs", |a, r| unary_math(a, r, f64::abs), check_math1),
        ("sin", |a, r| unary_math(a, r, f64::sin), check_math1),
        ("cos", |a, r| unary_math(a, r, f64::cos), check_math1),
        ("tan", |a, r| unary_math(a, r, f64::tan), check_math1),
        ("asin", |a, r| unary_math(a, r, f64::asin), check_math1),
        ("acos", |a, r| unary_math(a, r, f64::acos), check_math1),
        ("atan", |a, r| unary_math(a, r, f64::atan), check_math1),
        ("atan2", |a, r| binary_math(a, r, f64::atan2), check_math2),
        ("sqrt", |a, r| unary_math(a, r, f64::sqrt), check_math1),
        ("pow", |a, r| binary_math(a, r, f64::powf), check_math2),
        ("floor", |a, r| unary_math(a, r, f64::floor), check_math1),
        ("ceil", |a, r| unary_math(a, r, f64::ceil), check_math1),
        ("round", |a, r| unary_math(a, r, f64::round), check_math1),
        ("trunc", |a, r| unary_math(a, r, f64::trunc), check_math1),
        ("isnan", isnan, check_isnan),
    ];
    for (name, exec, check) in simple {
        env.add_function(NativeFunction::new(
            name,
            move |args, ret, _user| exec(args, ret),
            check,
        ));
    }

    let seed = Rc::new(Cell::new(0x2545_f491_4f6c_dd1d_u64));
    env.add_function(NativeFunction::new(
        "rand",
        move |_args, ret, _user| {
            ret.set_f64(next_random(&seed));
            Ok(CallStatus::Done)
        },
        |args, _user| expect_args(args, 0).map(|()| TypeDesc::FLOAT),
    ));
    tracing::trace!("built-in natives installed");
}

/// xorshift64*; values in `[0, 1)`.
fn next_random(state: &Cell<u64>) -> f64 {
    let mut x = state.get();
    x ^= x >> 12;
    x ^= x << 25;
    x ^= x >> 27;
    state.set(x);
    let bits = x.wrapping_mul(0x2545_f491_4f6c_dd1d) >> 11;
    bits as f64 / (1u64 << 53) as f64
}

fn require(args: &[TypeDesc], kinds: &[fn(&TypeDesc) -> bool]) -> Result<(), CompileErrorKind> {
    expect_args(args, kinds.len())?;
    if args.iter().zip(kinds).all(|(ty, ok)| ok(ty)) {
        Ok(())
    } else {
        Err(CompileErrorKind::BadParam)
    }
}

fn is_string(ty: &TypeDesc) -> bool {
    ty.kind() == TypeKind::String
}

fn is_integer(ty: &TypeDesc) -> bool {
    ty.kind().is_integer()
}

fn check_sizeof(args: &[TypeDesc], _: &mut dyn Any) -> Result<TypeDesc, CompileErrorKind> {
    require(args, &[|ty| ty.kind().is_array()]).map(|()| TypeDesc::INT)
}

fn check_strlen(args: &[TypeDesc], _: &mut dyn Any) -> Result<TypeDesc, CompileErrorKind> {
    require(args, &[is_string]).map(|()| TypeDesc::INT)
}

fn check_str(args: &[TypeDesc], _: &mut dyn Any) -> Result<TypeDesc, CompileErrorKind> {
    require(args, &[is_string]).map(|()| TypeDesc::STRING)
}

fn check_str_int(args: &[TypeDesc], _: &mut dyn Any) -> Result<TypeDesc, CompileErrorKind> {
    require(args, &[is_string, is_integer]).map(|()| TypeDesc::STRING)
}

/// `strmid(s, start)` or `strmid(s, start, len)`.
fn check_strmid(args: &[TypeDesc], _: &mut dyn Any) -> Result<TypeDesc, CompileErrorKind> {
    if args.len() == 2 {
        return check_str_int(args, &mut ());
    }
    require(args, &[is_string, is_integer, is_integer]).map(|()| TypeDesc::STRING)
}

fn check_strfind(args: &[TypeDesc], _: &mut dyn Any) -> Result<TypeDesc, CompileErrorKind> {
    require(args, &[is_string, is_string]).map(|()| TypeDesc::INT)
}

fn check_strval(args: &[TypeDesc], _: &mut dyn Any) -> Result<TypeDesc, CompileErrorKind> {
    require(args, &[is_string]).map(|()| TypeDesc::FLOAT)
}

fn check_math1(args: &[TypeDesc], _: &mut dyn Any) -> Result<TypeDesc, CompileErrorKind> {
    require(args, &[TypeDesc::is_numeric]).map(|()| TypeDesc::FLOAT)
}

fn check_math2(args: &[TypeDesc], _: &mut dyn Any) -> Result<TypeDesc, CompileErrorKind> {
    require(args, &[TypeDesc::is_numeric, TypeDesc::is_numeric]).map(|()| TypeDesc::FLOAT)
}

fn check_isnan(args: &[TypeDesc], _: &mut dyn Any) -> Result<TypeDesc, CompileErrorKind> {
    require(args, &[TypeDesc::is_numeric]).map(|()| TypeDesc::BOOLEAN)
}

/// Defined argument `index`, or the not-initialized error code.
fn arg(args: &[Variable], index: usize) -> Result<&Variable, i32> {
    args.get(index)
        .filter(|v| v.is_defined())
        .ok_or(RuntimeErrorKind::NotInit.code())
}

fn arg_str(args: &[Variable], index: usize) -> Result<&str, i32> {
    arg(args, index)?
        .as_str()
        .ok_or(RuntimeErrorKind::NotInit.code())
}

fn arg_int(args: &[Variable], index: usize) -> Result<i64, i32> {
    let v = arg(args, index)?;
    if v.is_nan() {
        return Err(RuntimeErrorKind::Nan.code());
    }
    v.as_i64().ok_or(RuntimeErrorKind::NotInit.code())
}

fn arg_f64(args: &[Variable], index: usize) -> Result<f64, i32> {
    let v = arg(args, index)?;
    if v.is_nan() {
        return Err(RuntimeErrorKind::Nan.code());
    }
    v.as_f64().ok_or(RuntimeErrorKind::NotInit.code())
}

/// Character count `n` clamped to `0..=len`.
fn clamp(n: i64, len: usize) -> usize {
    usize::try_from(n.max(0)).map_or(len, |n| n.min(len))
}

fn sizeof(args: &mut [Variable], ret: &mut Variable) -> NativeResult {
    let len = match args.first().and_then(Variable::array) {
        Some(array) => array.borrow().len(),
        None => 0,
    };
    ret.set_i64(len as i64);
    Ok(CallStatus::Done)
}

fn strlen(args: &mut [Variable], ret: &mut Variable) -> NativeResult {
    let s = arg_str(args, 0)?;
    ret.set_i64(s.chars().count() as i64);
    Ok(CallStatus::Done)
}

fn strleft(args: &mut [Variable], ret: &mut Variable) -> NativeResult {
    let s = arg_str(args, 0)?;
    let n = clamp(arg_int(args, 1)?, s.chars().count());
    ret.set_string(s.chars().take(n).collect::<String>());
    Ok(CallStatus::Done)
}

fn strright(args: &mut [Variable], ret: &mut Variable) -> NativeResult {
    let s = arg_str(args, 0)?;
    let len = s.chars().count();
    let n = clamp(arg_int(args, 1)?, len);
    ret.set_string(s.chars().skip(len - n).collect::<String>());
    Ok(CallStatus::Done)
}

fn strmid(args: &mut [Variable], ret: &mut Variable) -> NativeResult {
    let s = arg_str(args, 0)?;
    let len = s.chars().count();
    let start = clamp(arg_int(args, 1)?, len);
    let count = if args.len() > 2 {
        clamp(arg_int(args, 2)?, len - start)
    } else {
        len - start
    };
    ret.set_string(s.chars().skip(start).take(count).collect::<String>());
    Ok(CallStatus::Done)
}

/// Character position of the first occurrence, `nan` when absent.
fn strfind(args: &mut [Variable], ret: &mut Variable) -> NativeResult {
    let s = arg_str(args, 0)?;
    let needle = arg_str(args, 1)?;
    match s.find(needle) {
        Some(byte) => ret.set_i64(s[..byte].chars().count() as i64),
        None => ret.set_nan(),
    }
    Ok(CallStatus::Done)
}

/// Leading number of a string; `0` when there is none.
fn strval(args: &mut [Variable], ret: &mut Variable) -> NativeResult {
    let s = arg_str(args, 0)?.trim_start();
    let end = s
        .char_indices()
        .take_while(|(i, c)| {
            c.is_ascii_digit() || *c == '.' || (*i == 0 && (*c == '-' || *c == '+'))
        })
        .map(|(i, c)| i + c.len_utf8())
        .last()
        .unwrap_or(0);
    let value = (1..=end)
        .rev()
        .find_map(|n| s.get(..n).and_then(|p| p.parse::<f64>().ok()))
        .unwrap_or(0.0);
    ret.set_f64(value);
    Ok(CallStatus::Done)
}

fn strupper(args: &mut [Variable], ret: &mut Variable) -> NativeResult {
    ret.set_string(arg_str(args, 0)?.to_uppercase());
    Ok(CallStatus::Done)
}

fn strlower(args: &mut [Variable], ret: &mut Variable) -> NativeResult {
    ret.set_string(arg_str(args, 0)?.to_lowercase());
    Ok(CallStatus::Done)
}

fn unary_math(args: &mut [Variable], ret: &mut Variable, f: fn(f64) -> f64) -> NativeResult {
    ret.set_f64(f(arg_f64(args, 0)?));
    Ok(CallStatus::Done)
}

fn binary_math(args: &mut [Variable], ret: &mut Variable, f: fn(f64, f64) -> f64) -> NativeResult {
    ret.set_f64(f(arg_f64(args, 0)?, arg_f64(args, 1)?));
    Ok(CallStatus::Done)
}

fn isnan(args: &mut [Variable], ret: &mut Variable) -> NativeResult {
    let nan = args
        .first()
        .is_some_and(|v| v.is_nan() || v.as_f64().is_some_and(f64::is_nan));
    ret.set_bool(nan);
    Ok(CallStatus::Done)
}

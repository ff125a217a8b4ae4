//! Static typing rules.

use cbot_diagnostic::CompileErrorKind;
use cbot_ir::{BinaryOp, TypeDesc, TypeKind, TypeMask};
use cbot_value::ClassRegistry;

/// Whether a value of type `src` may be stored into a `target` slot.
pub fn assignable(classes: &ClassRegistry, target: &TypeDesc, src: &TypeDesc) -> bool {
    let (t, s) = (target.kind(), src.kind());
    match t {
        _ if t.is_numeric() => s.is_numeric(),
        TypeKind::Boolean => s == TypeKind::Boolean,
        TypeKind::String => s != TypeKind::Void,
        TypeKind::Pointer | TypeKind::Class => match s {
            TypeKind::Null => true,
            TypeKind::Pointer | TypeKind::Class => match (src.class_id(), target.class_id()) {
                (Some(sc), Some(tc)) => classes.is_child_of(sc, tc),
                _ => false,
            },
            _ => false,
        },
        TypeKind::ArrayPointer | TypeKind::ArrayBody => match s {
            TypeKind::Null => true,
            _ if s.is_array() => match (target.elem(), src.elem()) {
                (Some(te), Some(se)) => {
                    te.compare(se) || (te.is_object() && assignable(classes, te, se))
                }
                _ => false,
            },
            _ => false,
        },
        TypeKind::Intrinsic => s == TypeKind::Intrinsic && target.class_id() == src.class_id(),
        TypeKind::Void | TypeKind::Null => false,
        _ => target.compare(src),
    }
}

/// Cost of passing `src` to a parameter of type `param`: `None` if
/// impossible, `0` for an exact match.
pub fn conversion_cost(classes: &ClassRegistry, param: &TypeDesc, src: &TypeDesc) -> Option<u32> {
    if param.compare(src) {
        return Some(0);
    }
    if !assignable(classes, param, src) {
        return None;
    }
    let cost = match (param.kind(), src.kind()) {
        (p, s) if p.is_numeric() && s.is_numeric() => {
            if p.rank() > s.rank() {
                1
            } else {
                // Narrowing is allowed but a poor match.
                4
            }
        }
        (TypeKind::String, _) => 8,
        _ => 2,
    };
    Some(cost)
}

fn integer_result(a: &TypeDesc, b: &TypeDesc) -> TypeDesc {
    let wide = TypeDesc::wider(a, b);
    if wide.kind().rank() < TypeKind::Int.rank() {
        TypeDesc::INT
    } else {
        wide
    }
}

/// Result type of `a op b`.
pub fn binary_result(op: BinaryOp, a: &TypeDesc, b: &TypeDesc) -> Result<TypeDesc, CompileErrorKind> {
    let (ma, mb) = (a.mask(), b.mask());
    let both = |mask: TypeMask| mask.contains(ma) && mask.contains(mb);
    let numeric = both(TypeMask::NUMERIC);
    let integer = both(TypeMask::INTEGER);
    let boolean = both(TypeMask::BOOLEAN);

    let ty = match op {
        BinaryOp::Add if a.kind() == TypeKind::String || b.kind() == TypeKind::String => {
            if a.is_void() || b.is_void() {
                return Err(CompileErrorKind::BadType2);
            }
            TypeDesc::STRING
        }
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod
        | BinaryOp::Power
            if numeric =>
        {
            if integer {
                integer_result(a, b)
            } else {
                TypeDesc::wider(a, b)
            }
        }
        BinaryOp::Lo | BinaryOp::Hi | BinaryOp::Ls | BinaryOp::Hs
            if numeric || both(TypeMask::STRING) =>
        {
            TypeDesc::BOOLEAN
        }
        BinaryOp::Eq | BinaryOp::Ne
            if numeric
                || boolean
                || both(TypeMask::STRING)
                || both(TypeMask::OBJECT | TypeMask::ARRAY) =>
        {
            TypeDesc::BOOLEAN
        }
        BinaryOp::And | BinaryOp::Or | BinaryOp::Xor if boolean => TypeDesc::BOOLEAN,
        BinaryOp::And | BinaryOp::Or | BinaryOp::Xor if integer => integer_result(a, b),
        BinaryOp::LogAnd | BinaryOp::LogOr if boolean => TypeDesc::BOOLEAN,
        BinaryOp::LogAnd | BinaryOp::LogOr => return Err(CompileErrorKind::NotBoolean),
        BinaryOp::Sl | BinaryOp::Asr | BinaryOp::Sr if integer => integer_result(a, &TypeDesc::INT),
        _ => return Err(CompileErrorKind::BadType2),
    };
    Ok(ty)
}

/// Name of a type as it appears in function keys and saved states.
pub fn type_name(classes: &ClassRegistry, ty: &TypeDesc) -> String {
    match (ty.elem(), ty.class_id()) {
        (Some(elem), _) => format!("{}[]", type_name(classes, elem)),
        (None, Some(class)) => classes
            .name(class)
            .map_or_else(|| format!("#{}", class.raw()), |n| n.to_string()),
        (None, None) => ty.kind().name().to_owned(),
    }
}

/// Key of a function or method: `name(int,string)` or `A::name(int)`.
pub fn function_key(classes: &ClassRegistry, owner: Option<&str>, name: &str, params: &[TypeDesc]) -> String {
    let params: Vec<String> = params.iter().map(|p| type_name(classes, p)).collect();
    match owner {
        Some(class) => format!("{class}::{name}({})", params.join(",")),
        None => format!("{name}({})", params.join(",")),
    }
}

/// Key of the initializer of a class member.
pub fn member_init_key(class: &str, member: &str) -> String {
    format!("{class}::<init>{member}")
}

/// Byte size of a primitive type for `sizeof(type)`.
pub fn size_of_kind(kind: TypeKind) -> Option<i32> {
    let size = match kind {
        TypeKind::Byte | TypeKind::Boolean => 1,
        TypeKind::Short | TypeKind::Char => 2,
        TypeKind::Int | TypeKind::Float => 4,
        TypeKind::Long | TypeKind::Double => 8,
        _ => return None,
    };
    Some(size)
}

#[cfg(test)]
mod tests;

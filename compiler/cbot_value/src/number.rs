//! Numeric scalars.
//!
//! Every numeric variable stores its value in the variant matching its
//! declared kind. Arithmetic is done in one of two domains, `i64` for
//! integer kinds and `f64` for float kinds, and the result is narrowed back
//! to the destination kind with wrapping semantics.

use std::fmt;

use cbot_ir::TypeKind;

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Number {
    Byte(i8),
    Short(i16),
    Char(char),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
}

impl Number {
    /// Zero of a numeric kind.
    pub fn zero(kind: TypeKind) -> Option<Number> {
        kind.is_numeric().then(|| Number::from_i64(kind, 0))
    }

    pub fn kind(self) -> TypeKind {
        match self {
            Number::Byte(_) => TypeKind::Byte,
            Number::Short(_) => TypeKind::Short,
            Number::Char(_) => TypeKind::Char,
            Number::Int(_) => TypeKind::Int,
            Number::Long(_) => TypeKind::Long,
            Number::Float(_) => TypeKind::Float,
            Number::Double(_) => TypeKind::Double,
        }
    }

    #[inline]
    pub fn is_float(self) -> bool {
        matches!(self, Number::Float(_) | Number::Double(_))
    }

    /// Integer view; floats truncate toward zero (saturating).
    pub fn as_i64(self) -> i64 {
        match self {
            Number::Byte(v) => i64::from(v),
            Number::Short(v) => i64::from(v),
            Number::Char(c) => i64::from(u32::from(c)),
            Number::Int(v) => i64::from(v),
            Number::Long(v) => v,
            Number::Float(v) => v as i64,
            Number::Double(v) => v as i64,
        }
    }

    pub fn as_f64(self) -> f64 {
        match self {
            Number::Float(v) => f64::from(v),
            Number::Double(v) => v,
            other => other.as_i64() as f64,
        }
    }

    /// Narrow an integer to `kind`, wrapping out-of-range values.
    ///
    /// Non-numeric kinds yield an `Int`.
    pub fn from_i64(kind: TypeKind, v: i64) -> Number {
        match kind {
            TypeKind::Byte => Number::Byte(v as i8),
            TypeKind::Short => Number::Short(v as i16),
            TypeKind::Char => Number::Char(char::from_u32(v as u32).unwrap_or('\u{FFFD}')),
            TypeKind::Long => Number::Long(v),
            TypeKind::Float => Number::Float(v as f32),
            TypeKind::Double => Number::Double(v as f64),
            _ => Number::Int(v as i32),
        }
    }

    /// Convert a float result to `kind`; integer kinds truncate.
    pub fn from_f64(kind: TypeKind, v: f64) -> Number {
        match kind {
            TypeKind::Float => Number::Float(v as f32),
            TypeKind::Double => Number::Double(v),
            other => Number::from_i64(other, v as i64),
        }
    }

    /// Same value in another numeric kind.
    pub fn convert(self, kind: TypeKind) -> Number {
        if self.is_float() {
            Number::from_f64(kind, self.as_f64())
        } else {
            Number::from_i64(kind, self.as_i64())
        }
    }

    pub fn is_zero(self) -> bool {
        if self.is_float() {
            self.as_f64() == 0.0
        } else {
            self.as_i64() == 0
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Byte(v) => write!(f, "{v}"),
            Number::Short(v) => write!(f, "{v}"),
            Number::Char(c) => write!(f, "{c}"),
            Number::Int(v) => write!(f, "{v}"),
            Number::Long(v) => write!(f, "{v}"),
            Number::Float(v) => write!(f, "{v}"),
            Number::Double(v) => write!(f, "{v}"),
        }
    }
}

//! Variables: the value containers scripts and natives manipulate.
//!
//! A [`Variable`] pairs a declared [`TypeDesc`] with a [`Value`] and the
//! metadata the language needs (init state, protection, static flag, and a
//! stable identifier used for member binding and save/restore).
//!
//! Copy semantics fall out of `Clone`: scalars and strings are duplicated,
//! intrinsic class bodies are deep-copied, while pointers and arrays clone
//! their `Rc` and so share the referenced object.

use std::fmt;

use cbot_ir::{Protection, TypeDesc, TypeKind};

use crate::heap::{ArrayRef, ClassBody, InstanceRef};
use crate::Number;

/// Initialization state of a variable.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum InitState {
    #[default]
    Undef = 0,
    Def = 1,
    /// Holds the `nan` value: defined, but not a usable number.
    IsNan = 2,
}

impl InitState {
    pub fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(InitState::Undef),
            1 => Some(InitState::Def),
            2 => Some(InitState::IsNan),
            _ => None,
        }
    }
}

/// Runtime payload of a variable.
#[derive(Clone, Debug)]
pub enum Value {
    Void,
    Number(Number),
    Bool(bool),
    Str(String),
    /// Shared, nullable reference to a heap class instance.
    Pointer(Option<InstanceRef>),
    /// Shared, nullable reference to an array body.
    Array(Option<ArrayRef>),
    /// Intrinsic class instance held by value.
    Instance(Box<ClassBody>),
}

/// A named, typed value.
#[derive(Clone, Debug)]
pub struct Variable {
    pub name: String,
    /// Stable identifier: locals are numbered per compiled unit, members
    /// per environment. `0` is reserved for `this`.
    pub ident: u64,
    pub ty: TypeDesc,
    pub init: InitState,
    pub is_static: bool,
    pub protection: Protection,
    pub value: Value,
}

impl Variable {
    /// Create a variable of type `ty` holding that type's default value.
    ///
    /// Scalars start `Undef`; pointers and arrays start as defined `null`.
    /// Intrinsic bodies start without members; the class registry fills
    /// them (see `ClassRegistry::create_variable`).
    pub fn create(name: impl Into<String>, ty: TypeDesc) -> Variable {
        let (value, init) = match ty.kind() {
            TypeKind::Void => (Value::Void, InitState::Undef),
            TypeKind::Boolean => (Value::Bool(false), InitState::Undef),
            TypeKind::String => (Value::Str(String::new()), InitState::Undef),
            TypeKind::Null | TypeKind::Pointer | TypeKind::Class => {
                (Value::Pointer(None), InitState::Def)
            }
            TypeKind::ArrayPointer | TypeKind::ArrayBody => (Value::Array(None), InitState::Def),
            TypeKind::Intrinsic => {
                let body = ClassBody::empty(ty.class_id());
                (Value::Instance(Box::new(body)), InitState::Def)
            }
            kind => (
                Value::Number(Number::zero(kind).unwrap_or(Number::Int(0))),
                InitState::Undef,
            ),
        };
        Variable {
            name: name.into(),
            ident: 0,
            ty,
            init,
            is_static: false,
            protection: Protection::Public,
            value,
        }
    }

    #[must_use]
    pub fn with_ident(mut self, ident: u64) -> Self {
        self.ident = ident;
        self
    }

    /// Shorthand constructors used by natives and tests.
    pub fn int(value: i32) -> Variable {
        Variable::from_number(Number::Int(value))
    }

    pub fn long(value: i64) -> Variable {
        Variable::from_number(Number::Long(value))
    }

    pub fn float(value: f32) -> Variable {
        Variable::from_number(Number::Float(value))
    }

    pub fn double(value: f64) -> Variable {
        Variable::from_number(Number::Double(value))
    }

    pub fn from_number(n: Number) -> Variable {
        let mut var = Variable::create("", TypeDesc::simple(n.kind()));
        var.value = Value::Number(n);
        var.init = InitState::Def;
        var
    }

    pub fn boolean(value: bool) -> Variable {
        let mut var = Variable::create("", TypeDesc::BOOLEAN);
        var.value = Value::Bool(value);
        var.init = InitState::Def;
        var
    }

    pub fn string(value: impl Into<String>) -> Variable {
        let mut var = Variable::create("", TypeDesc::STRING);
        var.value = Value::Str(value.into());
        var.init = InitState::Def;
        var
    }

    pub fn null() -> Variable {
        Variable::create("", TypeDesc::NULL)
    }

    /// A numeric variable in the NaN state.
    pub fn nan(kind: TypeKind) -> Variable {
        let mut var = Variable::create("", TypeDesc::simple(kind));
        var.init = InitState::IsNan;
        var
    }

    /// Copy under a different name; the identifier is kept.
    pub fn copy_named(&self, name: impl Into<String>) -> Variable {
        let mut copy = self.clone();
        copy.name = name.into();
        copy
    }

    #[inline]
    pub fn kind(&self) -> TypeKind {
        self.ty.kind()
    }

    #[inline]
    pub fn is_defined(&self) -> bool {
        self.init == InitState::Def
    }

    #[inline]
    pub fn is_nan(&self) -> bool {
        self.init == InitState::IsNan
    }

    pub fn number(&self) -> Option<Number> {
        match self.value {
            Value::Number(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self.value {
            Value::Number(n) => Some(n.as_i64()),
            Value::Bool(b) => Some(i64::from(b)),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        self.as_i64().map(|v| v as i32)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self.value {
            Value::Number(n) => Some(n.as_f64()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.value {
            Value::Bool(b) => Some(b),
            Value::Number(n) => Some(!n.is_zero()),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.value {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn pointer(&self) -> Option<&InstanceRef> {
        match &self.value {
            Value::Pointer(p) => p.as_ref(),
            _ => None,
        }
    }

    pub fn array(&self) -> Option<&ArrayRef> {
        match &self.value {
            Value::Array(a) => a.as_ref(),
            _ => None,
        }
    }

    /// Store an integer, converted to this variable's numeric kind.
    pub fn set_i64(&mut self, v: i64) {
        match self.ty.kind() {
            kind if kind.is_numeric() => self.value = Value::Number(Number::from_i64(kind, v)),
            TypeKind::Boolean => self.value = Value::Bool(v != 0),
            kind => debug_assert!(false, "set_i64 on a {} variable", kind.name()),
        }
        self.init = InitState::Def;
    }

    /// Store a float, converted to this variable's numeric kind.
    pub fn set_f64(&mut self, v: f64) {
        match self.ty.kind() {
            kind if kind.is_numeric() => self.value = Value::Number(Number::from_f64(kind, v)),
            kind => debug_assert!(false, "set_f64 on a {} variable", kind.name()),
        }
        self.init = InitState::Def;
    }

    pub fn set_bool(&mut self, v: bool) {
        debug_assert!(self.ty.kind() == TypeKind::Boolean || self.ty.is_void());
        self.value = Value::Bool(v);
        self.init = InitState::Def;
    }

    pub fn set_string(&mut self, v: impl Into<String>) {
        debug_assert!(self.ty.kind() == TypeKind::String || self.ty.is_void());
        self.value = Value::Str(v.into());
        self.init = InitState::Def;
    }

    pub fn set_pointer(&mut self, p: Option<InstanceRef>) {
        self.value = Value::Pointer(p);
        self.init = InitState::Def;
    }

    pub fn set_array(&mut self, a: Option<ArrayRef>) {
        self.value = Value::Array(a);
        self.init = InitState::Def;
    }

    pub fn set_nan(&mut self) {
        self.init = InitState::IsNan;
    }

    /// Assign `src` into this variable, converting to the declared type.
    ///
    /// Numbers convert between kinds, strings accept the display form of
    /// any value, and pointers/arrays share the referenced object.
    pub fn assign(&mut self, src: &Variable) {
        let kind = self.ty.kind();
        self.value = match (&src.value, kind) {
            (Value::Number(n), k) if k.is_numeric() => Value::Number(n.convert(k)),
            (Value::Bool(b), k) if k.is_numeric() => {
                Value::Number(Number::from_i64(k, i64::from(*b)))
            }
            (Value::Str(s), TypeKind::String) => Value::Str(s.clone()),
            (_, TypeKind::String) if src.init == InitState::Def => Value::Str(src.to_string()),
            (_, TypeKind::String) => Value::Str(String::new()),
            (Value::Void, _) => self.value.clone(),
            (value, _) => value.clone(),
        };
        self.init = src.init;
    }

    /// Move-assign: like [`assign`](Self::assign) but reuses `src`'s storage
    /// when the types line up.
    pub fn assign_owned(&mut self, src: Variable) {
        if src.ty.kind() == self.ty.kind() || self.ty.is_void() {
            if self.ty.is_void() {
                self.ty = src.ty;
            }
            self.value = src.value;
            self.init = src.init;
        } else {
            self.assign(&src);
        }
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.init {
            InitState::Undef => return f.write_str("undefined"),
            InitState::IsNan => return f.write_str("nan"),
            InitState::Def => {}
        }
        fmt::Display::fmt(&self.value, f)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Void => f.write_str("void"),
            Value::Number(n) => write!(f, "{n}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Str(s) => f.write_str(s),
            Value::Pointer(None) | Value::Array(None) => f.write_str("null"),
            // A failed mutable borrow means the instance is already being
            // printed higher up: a reference cycle.
            Value::Pointer(Some(inst)) => match inst.try_borrow_mut() {
                Ok(inst) => write!(f, "{}", inst.body),
                Err(_) => f.write_str("..."),
            },
            Value::Array(Some(arr)) => match arr.try_borrow_mut() {
                Ok(arr) => {
                    f.write_str("{")?;
                    for (i, item) in arr.items.iter().enumerate() {
                        if i > 0 {
                            f.write_str(", ")?;
                        }
                        write!(f, "{item}")?;
                    }
                    f.write_str("}")
                }
                Err(_) => f.write_str("..."),
            },
            Value::Instance(body) => write!(f, "{body}"),
        }
    }
}

#[cfg(test)]
mod tests;

//! Type descriptors.
//!
//! A [`TypeDesc`] describes the kind of a variable or expression, the element
//! type of arrays (recursively) with their size limit, and the class of
//! pointer/class/intrinsic kinds. Class references are non-owning
//! [`ClassId`]s resolved through the class registry.

use std::fmt;

use bitflags::bitflags;

/// Identity of a registered class. Never reused within one environment.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(u32);

impl ClassId {
    #[inline]
    pub const fn new(raw: u32) -> Self {
        ClassId(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Variable kinds. The discriminants are part of the saved-state format.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum TypeKind {
    Void = 0,
    Byte = 1,
    Short = 2,
    Char = 3,
    Int = 4,
    Long = 5,
    Float = 6,
    Double = 7,
    Boolean = 8,
    String = 9,
    Null = 10,
    /// Array variable: a shared reference to an array body.
    ArrayPointer = 11,
    /// The array body itself.
    ArrayBody = 12,
    /// Shared reference to a heap class instance.
    Pointer = 13,
    /// Class instance declared by value; stored as a pointer at run time.
    Class = 14,
    /// Class instance embedded by value (no heap allocation).
    Intrinsic = 15,
}

impl TypeKind {
    pub fn from_u8(raw: u8) -> Option<Self> {
        let kind = match raw {
            0 => TypeKind::Void,
            1 => TypeKind::Byte,
            2 => TypeKind::Short,
            3 => TypeKind::Char,
            4 => TypeKind::Int,
            5 => TypeKind::Long,
            6 => TypeKind::Float,
            7 => TypeKind::Double,
            8 => TypeKind::Boolean,
            9 => TypeKind::String,
            10 => TypeKind::Null,
            11 => TypeKind::ArrayPointer,
            12 => TypeKind::ArrayBody,
            13 => TypeKind::Pointer,
            14 => TypeKind::Class,
            15 => TypeKind::Intrinsic,
            _ => return None,
        };
        Some(kind)
    }

    #[inline]
    pub fn is_integer(self) -> bool {
        matches!(
            self,
            TypeKind::Byte | TypeKind::Short | TypeKind::Char | TypeKind::Int | TypeKind::Long
        )
    }

    #[inline]
    pub fn is_float(self) -> bool {
        matches!(self, TypeKind::Float | TypeKind::Double)
    }

    #[inline]
    pub fn is_numeric(self) -> bool {
        self.is_integer() || self.is_float()
    }

    #[inline]
    pub fn is_array(self) -> bool {
        matches!(self, TypeKind::ArrayPointer | TypeKind::ArrayBody)
    }

    /// Kinds that refer to a class definition.
    #[inline]
    pub fn has_class(self) -> bool {
        matches!(
            self,
            TypeKind::Pointer | TypeKind::Class | TypeKind::Intrinsic
        )
    }

    /// Numeric rank used for widening (`byte` < ... < `double`).
    #[inline]
    pub fn rank(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            TypeKind::Void => "void",
            TypeKind::Byte => "byte",
            TypeKind::Short => "short",
            TypeKind::Char => "char",
            TypeKind::Int => "int",
            TypeKind::Long => "long",
            TypeKind::Float => "float",
            TypeKind::Double => "double",
            TypeKind::Boolean => "boolean",
            TypeKind::String => "string",
            TypeKind::Null => "null",
            TypeKind::ArrayPointer | TypeKind::ArrayBody => "array",
            TypeKind::Pointer | TypeKind::Class => "object",
            TypeKind::Intrinsic => "intrinsic",
        }
    }

    pub fn mask(self) -> TypeMask {
        match self {
            TypeKind::Void => TypeMask::VOID,
            TypeKind::Byte => TypeMask::BYTE,
            TypeKind::Short => TypeMask::SHORT,
            TypeKind::Char => TypeMask::CHAR,
            TypeKind::Int => TypeMask::INT,
            TypeKind::Long => TypeMask::LONG,
            TypeKind::Float => TypeMask::FLOAT,
            TypeKind::Double => TypeMask::DOUBLE,
            TypeKind::Boolean => TypeMask::BOOLEAN,
            TypeKind::String => TypeMask::STRING,
            TypeKind::Null => TypeMask::NULL,
            TypeKind::ArrayPointer | TypeKind::ArrayBody => TypeMask::ARRAY,
            TypeKind::Pointer | TypeKind::Class => TypeMask::POINTER,
            TypeKind::Intrinsic => TypeMask::INTRINSIC,
        }
    }
}

bitflags! {
    /// Operand type sets accepted by an operator group.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
    pub struct TypeMask: u32 {
        const VOID = 1 << 0;
        const BYTE = 1 << 1;
        const SHORT = 1 << 2;
        const CHAR = 1 << 3;
        const INT = 1 << 4;
        const LONG = 1 << 5;
        const FLOAT = 1 << 6;
        const DOUBLE = 1 << 7;
        const BOOLEAN = 1 << 8;
        const STRING = 1 << 9;
        const NULL = 1 << 10;
        const ARRAY = 1 << 11;
        const POINTER = 1 << 12;
        const INTRINSIC = 1 << 13;

        const INTEGER = Self::BYTE.bits() | Self::SHORT.bits() | Self::CHAR.bits()
            | Self::INT.bits() | Self::LONG.bits();
        const FLOATING = Self::FLOAT.bits() | Self::DOUBLE.bits();
        const NUMERIC = Self::INTEGER.bits() | Self::FLOATING.bits();
        const OBJECT = Self::NULL.bits() | Self::POINTER.bits() | Self::INTRINSIC.bits();
        const COMPARABLE = Self::NUMERIC.bits() | Self::BOOLEAN.bits() | Self::STRING.bits()
            | Self::OBJECT.bits() | Self::ARRAY.bits();
    }
}

/// Member protection level. Discriminants are part of the saved-state format.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Protection {
    #[default]
    Public = 0,
    /// Readable everywhere, writable only from the declaring class.
    ReadOnly = 1,
    Protected = 2,
    Private = 3,
}

impl Protection {
    pub fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Protection::Public),
            1 => Some(Protection::ReadOnly),
            2 => Some(Protection::Protected),
            3 => Some(Protection::Private),
            _ => None,
        }
    }
}

/// Array size limit meaning "unbounded".
pub const NO_LIMIT: i32 = -1;

/// Type of a variable or expression.
///
/// Invariants: `elem` is present iff `kind` is an array kind; `class` is
/// present iff `kind` is pointer, class or intrinsic.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TypeDesc {
    kind: TypeKind,
    elem: Option<Box<TypeDesc>>,
    class: Option<ClassId>,
    limit: i32,
}

impl TypeDesc {
    pub const VOID: TypeDesc = TypeDesc::simple(TypeKind::Void);
    pub const INT: TypeDesc = TypeDesc::simple(TypeKind::Int);
    pub const LONG: TypeDesc = TypeDesc::simple(TypeKind::Long);
    pub const FLOAT: TypeDesc = TypeDesc::simple(TypeKind::Float);
    pub const DOUBLE: TypeDesc = TypeDesc::simple(TypeKind::Double);
    pub const BOOLEAN: TypeDesc = TypeDesc::simple(TypeKind::Boolean);
    pub const STRING: TypeDesc = TypeDesc::simple(TypeKind::String);
    pub const CHAR: TypeDesc = TypeDesc::simple(TypeKind::Char);
    pub const NULL: TypeDesc = TypeDesc::simple(TypeKind::Null);

    /// Descriptor for a kind without element type or class.
    pub const fn simple(kind: TypeKind) -> Self {
        TypeDesc {
            kind,
            elem: None,
            class: None,
            limit: NO_LIMIT,
        }
    }

    pub fn pointer(class: ClassId) -> Self {
        TypeDesc {
            kind: TypeKind::Pointer,
            elem: None,
            class: Some(class),
            limit: NO_LIMIT,
        }
    }

    pub fn class(class: ClassId) -> Self {
        TypeDesc {
            kind: TypeKind::Class,
            elem: None,
            class: Some(class),
            limit: NO_LIMIT,
        }
    }

    pub fn intrinsic(class: ClassId) -> Self {
        TypeDesc {
            kind: TypeKind::Intrinsic,
            elem: None,
            class: Some(class),
            limit: NO_LIMIT,
        }
    }

    /// Array (pointer) type of `elem` with a size limit (`NO_LIMIT` for none).
    pub fn array(elem: TypeDesc, limit: i32) -> Self {
        TypeDesc {
            kind: TypeKind::ArrayPointer,
            elem: Some(Box::new(elem)),
            class: None,
            limit,
        }
    }

    #[inline]
    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    #[inline]
    pub fn elem(&self) -> Option<&TypeDesc> {
        self.elem.as_deref()
    }

    #[inline]
    pub fn class_id(&self) -> Option<ClassId> {
        self.class
    }

    #[inline]
    pub fn limit(&self) -> i32 {
        self.limit
    }

    #[must_use]
    pub fn with_limit(mut self, limit: i32) -> Self {
        self.limit = limit;
        self
    }

    /// Kind-only equality ("Eq").
    #[inline]
    pub fn eq_kind(&self, kind: TypeKind) -> bool {
        self.kind == kind
    }

    /// Structural equality ("Compare"), ignoring array size limits.
    ///
    /// `Class` and `Pointer` of the same class compare equal because class
    /// values are pointers at run time.
    pub fn compare(&self, other: &TypeDesc) -> bool {
        let object = |k: TypeKind| matches!(k, TypeKind::Pointer | TypeKind::Class);
        let kinds_match = self.kind == other.kind
            || (object(self.kind) && object(other.kind))
            || (self.kind.is_array() && other.kind.is_array());
        if !kinds_match || self.class != other.class {
            return false;
        }
        match (self.elem(), other.elem()) {
            (Some(a), Some(b)) => a.compare(b),
            (None, None) => true,
            _ => false,
        }
    }

    #[inline]
    pub fn mask(&self) -> TypeMask {
        self.kind.mask()
    }

    #[inline]
    pub fn is_void(&self) -> bool {
        self.kind == TypeKind::Void
    }

    #[inline]
    pub fn is_numeric(&self) -> bool {
        self.kind.is_numeric()
    }

    /// Pointer, class value or `null`.
    #[inline]
    pub fn is_object(&self) -> bool {
        matches!(
            self.kind,
            TypeKind::Pointer | TypeKind::Class | TypeKind::Null
        )
    }

    /// Wider of two numeric types (`int + float` is `float`).
    pub fn wider(a: &TypeDesc, b: &TypeDesc) -> TypeDesc {
        if a.kind.rank() >= b.kind.rank() {
            a.clone()
        } else {
            b.clone()
        }
    }
}

impl Default for TypeDesc {
    fn default() -> Self {
        TypeDesc::VOID
    }
}

impl fmt::Display for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.elem, self.class) {
            (Some(elem), _) if self.limit >= 0 => write!(f, "{elem}[{}]", self.limit),
            (Some(elem), _) => write!(f, "{elem}[]"),
            (None, Some(class)) => write!(f, "{}#{}", self.kind.name(), class.raw()),
            (None, None) => f.write_str(self.kind.name()),
        }
    }
}

//! Instruction trees.
//!
//! The compiler turns every function body, method body and member
//! initializer into one [`Code`]: a flat vector of [`Node`]s addressed by
//! [`NodeId`]. The executor never recurses through this tree on the native
//! stack; it keeps one frame per node in progress and resumes each frame from
//! a small integer state.
//!
//! Calls between functions go through shared [`FunctionEntry`] slots. A slot
//! is created when the signature is declared and filled once the body has
//! been compiled, so mutually recursive functions need no fix-up pass. When
//! the owning program is recompiled or dropped the slot is emptied and any
//! call still pointing at it fails with an "undefined function" error.

mod ops;

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use bitflags::bitflags;

pub use ops::{BinaryOp, IncDec, UnaryOp};

use crate::{ClassId, Protection, Span, TypeDesc, TypeKind};

/// Index of a node inside its [`Code`].
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    #[inline]
    pub const fn new(raw: u32) -> Self {
        NodeId(raw)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

/// Constant folded into the tree.
#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Bool(bool),
    Str(String),
    Char(char),
    Null,
    /// The `nan` constant: a numeric value in the NaN init state.
    Nan,
}

impl Literal {
    pub fn ty(&self) -> TypeDesc {
        match self {
            Literal::Int(_) => TypeDesc::INT,
            Literal::Long(_) => TypeDesc::LONG,
            Literal::Float(_) | Literal::Nan => TypeDesc::FLOAT,
            Literal::Double(_) => TypeDesc::DOUBLE,
            Literal::Bool(_) => TypeDesc::BOOLEAN,
            Literal::Str(_) => TypeDesc::STRING,
            Literal::Char(_) => TypeDesc::CHAR,
            Literal::Null => TypeDesc::NULL,
        }
    }

    /// Integer value, for literals the compiler may fold.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Literal::Int(v) => Some(i64::from(v)),
            Literal::Long(v) => Some(v),
            Literal::Char(c) => Some(i64::from(u32::from(c))),
            _ => None,
        }
    }
}

/// Where a place expression starts.
#[derive(Clone, Debug, PartialEq)]
pub enum AccessRoot {
    /// A local variable or parameter, by identifier.
    Local(u64),
    /// The receiver of the current method.
    This,
    /// Static member `index` of `class`.
    Static { class: ClassId, index: usize },
    /// The value of an arbitrary expression (`f().x`, `(new A()).y`).
    Value(NodeId),
}

/// One step of a place path.
#[derive(Clone, Debug, PartialEq)]
pub enum AccessStep {
    /// Instance member at `index` in the flattened member list of `class`
    /// (parent members first).
    Field { class: ClassId, index: usize },
    /// Array element; the index expression is evaluated at run time.
    Index(NodeId),
}

/// A readable/writable location: a root followed by member and index steps.
#[derive(Clone, Debug, PartialEq)]
pub struct Access {
    pub root: AccessRoot,
    pub steps: Vec<AccessStep>,
}

impl Access {
    pub fn local(ident: u64) -> Self {
        Access {
            root: AccessRoot::Local(ident),
            steps: Vec::new(),
        }
    }

    pub fn this() -> Self {
        Access {
            root: AccessRoot::This,
            steps: Vec::new(),
        }
    }

    /// Sub-expressions that must be evaluated before the place is resolved,
    /// in evaluation order.
    pub fn operands(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        if let AccessRoot::Value(node) = self.root {
            out.push(node);
        }
        out.extend(self.steps.iter().filter_map(|step| match step {
            AccessStep::Index(node) => Some(*node),
            AccessStep::Field { .. } => None,
        }));
        out
    }
}

/// A statically bound method: the class it was found in and its key.
#[derive(Clone, Debug, PartialEq)]
pub struct MethodRef {
    pub class: ClassId,
    pub name: String,
    pub key: String,
}

/// How a declared variable gets its initial value.
#[derive(Clone, Debug, PartialEq)]
pub enum DeclInit {
    /// Scalars start uninitialized, arrays empty or sized by `dims`.
    Default,
    Expr(NodeId),
    /// Class-typed local: allocate an instance and run `ctor` if present.
    Construct {
        ctor: Option<MethodRef>,
        args: Vec<NodeId>,
    },
}

/// A single declarator (`int a[3] = ...`).
#[derive(Clone, Debug, PartialEq)]
pub struct Declaration {
    pub name: String,
    pub ident: u64,
    pub ty: TypeDesc,
    /// Array size expressions, outermost first.
    pub dims: Vec<NodeId>,
    pub init: DeclInit,
}

/// Constant selector of a `case` label.
#[derive(Clone, Debug, PartialEq)]
pub enum CaseValue {
    Int(i64),
    Str(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct SwitchCase {
    pub value: CaseValue,
    /// Index into the switch body where execution starts.
    pub target: usize,
}

/// `catch (cond) body`: `cond` is either a boolean or an error code.
#[derive(Clone, Debug, PartialEq)]
pub struct CatchClause {
    pub cond: NodeId,
    pub body: NodeId,
}

/// Instruction node kinds.
#[derive(Clone, Debug)]
pub enum NodeKind {
    // Expressions
    Literal(Literal),
    Load(Access),
    Assign {
        target: Access,
        op: Option<BinaryOp>,
        value: NodeId,
    },
    IncDec {
        target: Access,
        op: IncDec,
        prefix: bool,
    },
    Binary {
        op: BinaryOp,
        left: NodeId,
        right: NodeId,
    },
    Unary {
        op: UnaryOp,
        operand: NodeId,
    },
    Ternary {
        cond: NodeId,
        then: NodeId,
        otherwise: NodeId,
    },
    Call {
        func: Rc<FunctionEntry>,
        args: Vec<NodeId>,
    },
    NativeCall {
        name: String,
        args: Vec<NodeId>,
    },
    MethodCall {
        receiver: Access,
        method: MethodRef,
        args: Vec<NodeId>,
    },
    New {
        class: ClassId,
        ctor: Option<MethodRef>,
        args: Vec<NodeId>,
    },
    NewArray {
        dims: Vec<NodeId>,
    },
    ArrayInit {
        items: Vec<NodeId>,
    },
    InstanceOf {
        value: NodeId,
        class: ClassId,
    },

    // Statements
    Block {
        stmts: Vec<NodeId>,
        /// Scoped blocks own the locals declared in them.
        scope: bool,
    },
    Declare(Box<Declaration>),
    Discard(NodeId),
    If {
        cond: NodeId,
        then: NodeId,
        otherwise: Option<NodeId>,
    },
    While {
        label: Option<String>,
        cond: NodeId,
        body: NodeId,
    },
    DoWhile {
        label: Option<String>,
        body: NodeId,
        cond: NodeId,
    },
    For {
        label: Option<String>,
        init: Option<NodeId>,
        cond: Option<NodeId>,
        step: Option<NodeId>,
        body: NodeId,
    },
    Repeat {
        label: Option<String>,
        count: NodeId,
        body: NodeId,
    },
    Switch {
        label: Option<String>,
        value: NodeId,
        cases: Vec<SwitchCase>,
        default: Option<usize>,
        body: Vec<NodeId>,
    },
    Break(Option<String>),
    Continue(Option<String>),
    Return(Option<NodeId>),
    Throw(NodeId),
    Try {
        body: NodeId,
        catches: Vec<CatchClause>,
        finally: Option<NodeId>,
    },
}

impl NodeKind {
    /// Loop label, for nodes that `break`/`continue` can target.
    pub fn loop_label(&self) -> Option<Option<&str>> {
        match self {
            NodeKind::While { label, .. }
            | NodeKind::DoWhile { label, .. }
            | NodeKind::For { label, .. }
            | NodeKind::Repeat { label, .. } => Some(label.as_deref()),
            _ => None,
        }
    }

    /// Nodes whose frame owns locals declared beneath it.
    pub fn is_scope(&self) -> bool {
        matches!(
            self,
            NodeKind::Block { scope: true, .. } | NodeKind::For { .. } | NodeKind::Switch { .. }
        )
    }
}

/// An instruction node with its source span and static type.
#[derive(Clone, Debug)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
    pub ty: TypeDesc,
}

/// A parameter local of a compiled body.
#[derive(Clone, Debug, PartialEq)]
pub struct ParamSlot {
    pub name: String,
    pub ident: u64,
    pub ty: TypeDesc,
}

/// A compiled body: function, method, or member initializer.
#[derive(Clone, Debug)]
pub struct Code {
    /// Stable key used to find this body again after a save/restore.
    pub key: String,
    /// Name shown in run positions and call stacks.
    pub name: String,
    pub nodes: Vec<Node>,
    pub root: NodeId,
    pub params: Vec<ParamSlot>,
    pub ret: TypeDesc,
    /// Owning class for methods and member initializers.
    pub class: Option<ClassId>,
    /// Methods with a receiver bind `this` as local 0.
    pub has_this: bool,
    pub synchronized: bool,
    pub span: Span,
}

impl Code {
    #[inline]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    #[inline]
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }
}

bitflags! {
    /// Declaration modifiers of a function or method.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
    pub struct FnFlags: u16 {
        const EXTERN = 1 << 0;
        const PUBLIC = 1 << 1;
        const STATIC = 1 << 2;
        const SYNCHRONIZED = 1 << 3;
        const CONSTRUCTOR = 1 << 4;
        const DESTRUCTOR = 1 << 5;
        const NATIVE = 1 << 6;
    }
}

/// A declared parameter; `default` comes from the literal-only sub-compiler.
#[derive(Clone, Debug, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: TypeDesc,
    pub default: Option<Literal>,
    pub span: Span,
}

/// Function or method signature.
#[derive(Clone, Debug, PartialEq)]
pub struct Signature {
    pub name: String,
    pub params: Vec<Param>,
    pub ret: TypeDesc,
    pub flags: FnFlags,
    pub protection: Protection,
    pub span: Span,
}

impl Signature {
    /// Number of parameters without a default value.
    pub fn required(&self) -> usize {
        self.params.iter().filter(|p| p.default.is_none()).count()
    }

    pub fn is_void(&self) -> bool {
        self.ret.kind() == TypeKind::Void
    }
}

/// Shared slot for a script function: its signature and, once compiled, its
/// body.
pub struct FunctionEntry {
    pub key: String,
    pub sig: Signature,
    /// Raw id of the program that compiled it.
    pub owner: u32,
    pub code: RefCell<Option<Rc<Code>>>,
}

impl FunctionEntry {
    pub fn new(key: String, sig: Signature, owner: u32) -> Self {
        FunctionEntry {
            key,
            sig,
            owner,
            code: RefCell::new(None),
        }
    }

    /// The compiled body, if still available.
    pub fn code(&self) -> Option<Rc<Code>> {
        self.code.borrow().clone()
    }
}

impl fmt::Debug for FunctionEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionEntry")
            .field("key", &self.key)
            .field("compiled", &self.code.borrow().is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests;

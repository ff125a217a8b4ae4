//! Frames and execution stacks.

use std::rc::Rc;

use cbot_diagnostic::RuntimeError;
use cbot_ir::{Code, Node, NodeId, Span};
use cbot_value::Variable;

/// What a frame contributes to variable scoping.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum BlockKind {
    /// Plain instruction; its declarations land in the nearest scope below.
    Instruction = 0,
    /// Scope that owns the locals declared in it.
    Block = 1,
    /// Function body: owns the parameters, ends local lookups and
    /// intercepts `return`.
    Function = 2,
}

impl BlockKind {
    pub fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(BlockKind::Instruction),
            1 => Some(BlockKind::Block),
            2 => Some(BlockKind::Function),
            _ => None,
        }
    }
}

/// Non-local control transfer travelling down the stack.
#[derive(Clone, Debug)]
pub enum Signal {
    Break(Option<String>),
    Continue(Option<String>),
    Return(Option<Variable>),
    Error(RuntimeError),
}

/// One suspended instruction.
#[derive(Debug)]
pub struct Frame {
    pub code: Rc<Code>,
    pub node: NodeId,
    pub block: BlockKind,
    /// Evaluates a `catch` condition.
    pub secondary: bool,
    pub state: i32,
    /// Sub-counter for nodes that need a second index.
    pub step: i32,
    pub locals: Vec<Variable>,
    /// Values delivered by finished children, in evaluation order.
    pub temps: Vec<Variable>,
    /// In-flight native result or object under construction.
    pub result: Option<Variable>,
    /// This function frame holds its class lock.
    pub locked: bool,
    /// Signal parked while a `finally` block runs.
    pub pending: Option<Signal>,
}

impl Frame {
    /// Frame for `node` of `code`; scoping nodes get their own scope.
    pub fn new(code: Rc<Code>, node: NodeId) -> Self {
        let block = if code.get(node).is_some_and(|n| n.kind.is_scope()) {
            BlockKind::Block
        } else {
            BlockKind::Instruction
        };
        Frame {
            code,
            node,
            block,
            secondary: false,
            state: 0,
            step: 0,
            locals: Vec::new(),
            temps: Vec::new(),
            result: None,
            locked: false,
            pending: None,
        }
    }

    /// Function frame running the root of `code` with `locals` bound.
    pub fn function(code: Rc<Code>, locals: Vec<Variable>) -> Self {
        let root = code.root;
        let mut frame = Frame::new(code, root);
        frame.block = BlockKind::Function;
        frame.locals = locals;
        frame
    }

    #[inline]
    pub fn node(&self) -> &Node {
        self.code.node(self.node)
    }

    #[inline]
    pub fn span(&self) -> Span {
        self.node().span
    }

    pub fn local(&self, ident: u64) -> Option<usize> {
        self.locals.iter().position(|v| v.ident == ident)
    }

    /// Add a local, replacing an earlier one with the same identifier
    /// (a declaration executed again by a loop).
    pub fn declare(&mut self, var: Variable) {
        match self.local(var.ident) {
            Some(pos) => self.locals[pos] = var,
            None => self.locals.push(var),
        }
    }
}

/// The frames of one computation plus its run-wide state.
#[derive(Debug, Default)]
pub struct ExecStack {
    pub(crate) frames: Vec<Frame>,
    /// Steps left in the current `run`.
    pub(crate) timer: i32,
    /// Isolated stacks (initializers, destructors) ignore the timer.
    pub(crate) timed: bool,
    pub(crate) result: Option<Variable>,
    pub(crate) error: Option<RuntimeError>,
}

impl ExecStack {
    /// Stack that starts by running `frame` under the timer.
    pub fn new(frame: Frame) -> Self {
        ExecStack {
            frames: vec![frame],
            timer: 0,
            timed: true,
            result: None,
            error: None,
        }
    }

    /// Stack run to completion without a timer.
    pub(crate) fn isolated(frame: Frame) -> Self {
        ExecStack {
            timed: false,
            ..ExecStack::new(frame)
        }
    }

    #[inline]
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    #[inline]
    pub fn is_finished(&self) -> bool {
        self.frames.is_empty()
    }

    #[inline]
    pub fn timer(&self) -> i32 {
        self.timer
    }

    pub fn error(&self) -> Option<&RuntimeError> {
        self.error.as_ref()
    }

    pub fn result(&self) -> Option<&Variable> {
        self.result.as_ref()
    }

    /// Innermost instruction: its function name and span.
    pub fn position(&self) -> Option<(String, Span)> {
        self.frames
            .last()
            .map(|f| (f.code.name.clone(), f.span()))
    }

    /// Active functions, outermost first, each with the span of its
    /// innermost running instruction.
    pub fn call_stack(&self) -> Vec<(String, Span)> {
        let mut out: Vec<(String, Span)> = Vec::new();
        for frame in &self.frames {
            if frame.block == BlockKind::Function {
                out.push((frame.code.name.clone(), frame.span()));
            } else if let Some(last) = out.last_mut() {
                last.1 = frame.span();
            }
        }
        out
    }
}

#[cfg(test)]
mod tests;

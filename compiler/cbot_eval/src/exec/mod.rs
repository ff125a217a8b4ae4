//! The step loop.
//!
//! [`Exec`] borrows the environment and the host's user context for the
//! duration of one `run`. Node handlers live in the submodules:
//! - `expr`: values and operators
//! - `control`: blocks, branches, loops, `switch`, `try`, jumps
//! - `call`: function, native and method calls, construction, declarations
//! - `place`: resolving assignable locations

mod call;
mod control;
mod expr;
mod place;

use std::any::Any;
use std::rc::Rc;

use cbot_diagnostic::{RuntimeError, RuntimeErrorKind};
use cbot_ir::{Code, NodeId, NodeKind, Span, TypeDesc};
use cbot_value::{DoCall, Environment, InstanceRef, MethodBody, ProgramId, Variable};

use crate::stack::{ExecStack, Frame, Signal};

/// What a node handler asks the loop to do next.
pub(crate) enum Outcome {
    /// Keep the frame; step it again.
    Continue,
    /// Run a child instruction of the same code.
    Push(NodeId),
    /// Run a child instruction on the catch path.
    PushSecondary(NodeId),
    /// Enter a function body.
    Call(Frame),
    /// The frame is finished; hand its value to the parent.
    Done(Option<Variable>),
    /// Keep the frame and suspend the run.
    Yield,
    Signal(Signal),
}

#[inline]
pub(crate) fn fail(kind: RuntimeErrorKind, span: Span) -> Outcome {
    Outcome::Signal(Signal::Error(RuntimeError::new(kind, span)))
}

/// Next child to evaluate when `children` run at states `base..`.
pub(crate) fn next_child(frame: &mut Frame, children: &[NodeId], base: i32) -> Option<Outcome> {
    let index = usize::try_from(frame.state - base).ok()?;
    let child = *children.get(index)?;
    frame.state += 1;
    Some(Outcome::Push(child))
}

pub(crate) struct Exec<'a> {
    pub(crate) env: &'a Environment,
    pub(crate) program: ProgramId,
    pub(crate) user: &'a mut dyn Any,
    /// Nesting of isolated runs.
    depth: usize,
}

impl<'a> Exec<'a> {
    pub(crate) fn new(env: &'a Environment, program: ProgramId, user: &'a mut dyn Any) -> Self {
        Exec {
            env,
            program,
            user,
            depth: 0,
        }
    }

    /// Step `stack` until it empties (`true`) or suspends (`false`).
    pub(crate) fn run(&mut self, stack: &mut ExecStack) -> bool {
        loop {
            if stack.frames.is_empty() {
                return true;
            }
            if stack.timed {
                if stack.timer <= 0 {
                    return false;
                }
                stack.timer -= 1;
            }
            let Some(mut frame) = stack.frames.pop() else {
                return true;
            };
            let outcome = self.step(&mut frame, &mut stack.frames);
            let suspended = self.apply(stack, frame, outcome);
            self.finalize_orphans();
            if suspended && stack.timed {
                return false;
            }
        }
    }

    fn step(&mut self, frame: &mut Frame, below: &mut [Frame]) -> Outcome {
        let code = Rc::clone(&frame.code);
        let Some(node) = code.get(frame.node) else {
            return fail(RuntimeErrorKind::UndefFunc, code.span);
        };
        let span = node.span;
        match &node.kind {
            NodeKind::Literal(lit) => Outcome::Done(Some(expr::literal(lit))),
            NodeKind::Load(access) => self.load(frame, below, access, span),
            NodeKind::Assign { target, op, value } => {
                self.assign(frame, below, target, *op, *value, span)
            }
            NodeKind::IncDec { target, op, prefix } => {
                self.inc_dec(frame, below, target, *op, *prefix, span)
            }
            NodeKind::Binary { op, left, right } => {
                expr::binary(frame, *op, *left, *right, &node.ty, span)
            }
            NodeKind::Unary { op, operand } => expr::unary(frame, *op, *operand, span),
            NodeKind::Ternary {
                cond,
                then,
                otherwise,
            } => self.ternary(frame, *cond, *then, *otherwise, &node.ty, span),
            NodeKind::Call { func, args } => self.call(frame, func, args, &node.ty, span),
            NodeKind::NativeCall { name, args } => {
                self.native_call(frame, name, args, &node.ty, span)
            }
            NodeKind::MethodCall {
                receiver,
                method,
                args,
            } => self.method_call(frame, below, receiver, method, args, &node.ty, span),
            NodeKind::New { class, ctor, args } => {
                self.new_instance(frame, *class, ctor.as_ref(), args, span)
            }
            NodeKind::NewArray { dims } => self.new_array(frame, dims, &node.ty, span),
            NodeKind::ArrayInit { items } => self.array_init(frame, items, &node.ty, span),
            NodeKind::InstanceOf { value, class } => self.instance_of(frame, *value, *class),
            NodeKind::Block { stmts, .. } => control::block(frame, stmts, span),
            NodeKind::Declare(decl) => self.declare(frame, below, decl, span),
            NodeKind::Discard(inner) => expr::discard(frame, *inner),
            NodeKind::If {
                cond,
                then,
                otherwise,
            } => control::if_else(frame, *cond, *then, *otherwise, span),
            NodeKind::While { cond, body, .. } => control::while_loop(frame, *cond, *body, span),
            NodeKind::DoWhile { body, cond, .. } => control::do_while(frame, *body, *cond, span),
            NodeKind::For {
                init,
                cond,
                step,
                body,
                ..
            } => control::for_loop(frame, *init, *cond, *step, *body, span),
            NodeKind::Repeat { count, body, .. } => control::repeat(frame, *count, *body, span),
            NodeKind::Switch {
                value,
                cases,
                default,
                body,
                ..
            } => control::switch(frame, *value, cases, *default, body, span),
            NodeKind::Break(label) => Outcome::Signal(Signal::Break(label.clone())),
            NodeKind::Continue(label) => Outcome::Signal(Signal::Continue(label.clone())),
            NodeKind::Return(value) => control::ret(frame, *value),
            NodeKind::Throw(value) => control::throw(frame, *value, span),
            NodeKind::Try {
                body,
                catches,
                finally,
            } => control::try_catch(frame, *body, catches, *finally),
        }
    }

    /// Carry out `outcome` for `frame`. Returns whether the run suspends.
    fn apply(&mut self, stack: &mut ExecStack, frame: Frame, outcome: Outcome) -> bool {
        match outcome {
            Outcome::Continue => stack.frames.push(frame),
            Outcome::Push(node) => {
                let child = Frame::new(Rc::clone(&frame.code), node);
                return self.enter(stack, frame, child);
            }
            Outcome::PushSecondary(node) => {
                let mut child = Frame::new(Rc::clone(&frame.code), node);
                child.secondary = true;
                return self.enter(stack, frame, child);
            }
            Outcome::Call(callee) => return self.enter(stack, frame, callee),
            Outcome::Done(value) => {
                self.release(&frame);
                drop(frame);
                match stack.frames.last_mut() {
                    Some(parent) => parent.temps.extend(value),
                    None => stack.result = value,
                }
            }
            Outcome::Yield => {
                stack.frames.push(frame);
                return true;
            }
            Outcome::Signal(signal) => {
                self.release(&frame);
                drop(frame);
                return self.unwind(stack, signal);
            }
        }
        false
    }

    fn enter(&mut self, stack: &mut ExecStack, frame: Frame, child: Frame) -> bool {
        let span = frame.span();
        stack.frames.push(frame);
        if stack.frames.len() >= self.env.config().max_stack_depth {
            self.release(&child);
            let err = RuntimeError::new(RuntimeErrorKind::StackOver, span);
            return self.unwind(stack, Signal::Error(err));
        }
        stack.frames.push(child);
        false
    }

    /// Offer `signal` to the frames from the top down.
    fn unwind(&mut self, stack: &mut ExecStack, mut signal: Signal) -> bool {
        while let Some(mut frame) = stack.frames.pop() {
            match self.intercept(&mut frame, signal) {
                Ok(outcome) => return self.apply(stack, frame, outcome),
                Err(passed) => {
                    self.release(&frame);
                    signal = passed;
                }
            }
        }
        match signal {
            Signal::Error(err) => {
                tracing::debug!(code = err.code(), span = %err.span, "run failed");
                stack.error = Some(err);
            }
            Signal::Return(value) => stack.result = value,
            Signal::Break(_) | Signal::Continue(_) => {}
        }
        false
    }

    /// Drop whatever a leaving frame holds outside itself.
    fn release(&self, frame: &Frame) {
        if !frame.locked {
            return;
        }
        if let Some(class) = frame.code.class {
            if let Some(def) = self.env.classes_mut().get_mut(class) {
                def.lock.unlock(self.program);
            }
        }
    }

    /// Run `code` to completion on a fresh timer-free stack.
    pub(crate) fn run_isolated(
        &mut self,
        code: Rc<Code>,
        locals: Vec<Variable>,
    ) -> Result<Option<Variable>, RuntimeError> {
        if self.depth >= self.env.config().max_stack_depth {
            return Err(RuntimeError::new(RuntimeErrorKind::StackOver, code.span));
        }
        let mut stack = ExecStack::isolated(Frame::function(code, locals));
        self.depth += 1;
        cbot_stack::ensure_sufficient_stack(|| self.run(&mut stack));
        self.depth -= 1;
        match stack.error {
            Some(err) => Err(err),
            None => Ok(stack.result),
        }
    }

    /// Run the destructors owed by instances that became unreachable.
    pub(crate) fn finalize_orphans(&mut self) {
        let heap = Rc::clone(self.env.heap());
        while let Some(orphan) = heap.take_orphan() {
            let instance = heap.resurrect(orphan);
            self.destroy(&instance);
        }
    }

    fn destroy(&mut self, instance: &InstanceRef) {
        let Some(class) = instance.borrow().class() else {
            return;
        };
        let Some((_, dtor)) = self.env.classes().destructor(class) else {
            return;
        };
        let mut this = this_pointer(instance, class);
        let id = instance.borrow().id();
        tracing::trace!(id, method = %dtor.key, "run destructor");
        match dtor.body {
            MethodBody::Script(entry) => {
                let Some(code) = entry.code() else {
                    return;
                };
                if let Err(err) = self.run_isolated(code, vec![this]) {
                    tracing::warn!(id, code = err.code(), "destructor failed");
                }
            }
            MethodBody::Native(native) => {
                let mut ret = Variable::create("", TypeDesc::VOID);
                if let Err(code) = (native.exec)(&mut this, &mut [], &mut ret, &mut *self.user) {
                    tracing::warn!(id, code, "native destructor failed");
                }
            }
        }
    }
}

/// `this` as seen by a method of `class` running on `instance`.
pub(crate) fn this_pointer(instance: &InstanceRef, class: cbot_ir::ClassId) -> Variable {
    let mut this = Variable::create("this", TypeDesc::pointer(class));
    this.set_pointer(Some(Rc::clone(instance)));
    this
}

/// Call a registered native by name outside of any script.
///
/// Returns [`DoCall::Unknown`] when no native has that name; otherwise the
/// native's own status.
pub fn do_call(
    env: &Environment,
    name: &str,
    args: &mut [Variable],
    ret: &mut Variable,
    user: &mut dyn Any,
) -> DoCall {
    match env.native(name) {
        Some(native) => DoCall::from((native.exec)(args, ret, user)),
        None => DoCall::Unknown,
    }
}

#[cfg(test)]
mod tests;

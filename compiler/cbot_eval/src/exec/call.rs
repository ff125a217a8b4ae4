//! Calls, construction and declarations.

use std::rc::Rc;

use cbot_diagnostic::RuntimeErrorKind;
use cbot_ir::{
    Access, ClassId, Code, DeclInit, Declaration, FunctionEntry, MethodRef, NodeId, Span, TypeDesc,
};
use cbot_value::{CallStatus, ClassBody, InstanceRef, MethodBody, Value, Variable};

use super::expr::integer;
use super::place::with_var;
use super::{fail, next_child, this_pointer, Exec, Outcome};
use crate::stack::{BlockKind, Frame};

/// Value handed back once the callee frame finished.
fn finish_call(frame: &mut Frame, ty: &TypeDesc) -> Outcome {
    let value = if ty.is_void() { None } else { frame.temps.pop() };
    frame.temps.clear();
    Outcome::Done(value)
}

impl Exec<'_> {
    /// Locals of a function frame: `this` (ident 0), then the parameters
    /// converted to their declared types.
    fn bind_params(&self, code: &Code, args: Vec<Variable>, this: Option<Variable>) -> Vec<Variable> {
        let classes = self.env.classes();
        let mut locals = Vec::with_capacity(code.params.len() + 1);
        if let Some(mut this) = this {
            "this".clone_into(&mut this.name);
            this.ident = 0;
            locals.push(this);
        }
        for (slot, arg) in code.params.iter().zip(args) {
            let mut var = classes
                .create_variable(&slot.name, &slot.ty)
                .with_ident(slot.ident);
            var.assign_owned(arg);
            locals.push(var);
        }
        locals
    }

    /// Take the class lock a synchronized body needs. `None` while another
    /// program holds it; otherwise whether a lock was taken.
    fn acquire(&self, code: &Code) -> Option<bool> {
        let Some(class) = code.class.filter(|_| code.synchronized) else {
            return Some(false);
        };
        let queue = self.env.config().lock_queue_len;
        let mut classes = self.env.classes_mut();
        let Some(def) = classes.get_mut(class) else {
            return Some(false);
        };
        if def.lock.lock(self.program, queue) {
            Some(true)
        } else {
            tracing::trace!(program = %self.program, class = %def.name, "lock busy");
            None
        }
    }

    fn enter_function(&self, code: Rc<Code>, args: Vec<Variable>, this: Option<Variable>, locked: bool) -> Outcome {
        let locals = self.bind_params(&code, args, this);
        let mut callee = Frame::function(code, locals);
        callee.locked = locked;
        Outcome::Call(callee)
    }

    pub(super) fn call(
        &mut self,
        frame: &mut Frame,
        func: &Rc<FunctionEntry>,
        args: &[NodeId],
        ty: &TypeDesc,
        span: Span,
    ) -> Outcome {
        if let Some(next) = next_child(frame, args, 0) {
            return next;
        }
        let n = args.len() as i32;
        if frame.state > n {
            return finish_call(frame, ty);
        }
        let Some(code) = func.code() else {
            return fail(RuntimeErrorKind::UndefFunc, span);
        };
        let Some(locked) = self.acquire(&code) else {
            return Outcome::Yield;
        };
        frame.state = n + 1;
        let args = std::mem::take(&mut frame.temps);
        self.enter_function(code, args, None, locked)
    }

    pub(super) fn native_call(
        &mut self,
        frame: &mut Frame,
        name: &str,
        args: &[NodeId],
        ty: &TypeDesc,
        span: Span,
    ) -> Outcome {
        if let Some(next) = next_child(frame, args, 0) {
            return next;
        }
        let Some(native) = self.env.native(name) else {
            return fail(RuntimeErrorKind::UndefFunc, span);
        };
        let mut ret = match frame.result.take() {
            Some(ret) => ret,
            None => self.env.classes().create_variable("", ty),
        };
        match (native.exec)(&mut frame.temps, &mut ret, &mut *self.user) {
            Ok(CallStatus::Done) => {
                frame.temps.clear();
                Outcome::Done((!ty.is_void()).then_some(ret))
            }
            Ok(CallStatus::Pending) => {
                frame.result = Some(ret);
                Outcome::Yield
            }
            Err(code) => fail(RuntimeErrorKind::Native(code), span),
        }
    }

    /// The receiver of a method call, checked for `null` and deletion.
    fn receiver(
        &mut self,
        frame: &mut Frame,
        below: &mut [Frame],
        receiver: &Access,
        operands: usize,
    ) -> Result<Variable, RuntimeErrorKind> {
        let values = frame
            .temps
            .get(..operands)
            .map(<[Variable]>::to_vec)
            .unwrap_or_default();
        let this = self.read(frame, below, receiver, &values)?;
        match &this.value {
            Value::Pointer(None) => Err(RuntimeErrorKind::Null),
            Value::Pointer(Some(instance)) => {
                let instance = Rc::clone(instance);
                self.touch(&instance)?;
                Ok(this)
            }
            _ => Ok(this),
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub(super) fn method_call(
        &mut self,
        frame: &mut Frame,
        below: &mut [Frame],
        receiver: &Access,
        method: &MethodRef,
        args: &[NodeId],
        ty: &TypeDesc,
        span: Span,
    ) -> Outcome {
        let operands = receiver.operands();
        let k = operands.len() as i32;
        if let Some(next) = next_child(frame, &operands, 0) {
            return next;
        }
        if let Some(next) = next_child(frame, args, k) {
            return next;
        }
        let n = args.len() as i32;
        if frame.state > k + n {
            return finish_call(frame, ty);
        }
        let Some(entry) = self.env.classes().method(method.class, &method.key) else {
            return fail(RuntimeErrorKind::UndefFunc, span);
        };
        let k = k as usize;

        match entry.body {
            MethodBody::Script(func) => {
                let Some(code) = func.code() else {
                    return fail(RuntimeErrorKind::UndefFunc, span);
                };
                let this = match self.receiver(frame, below, receiver, k) {
                    Ok(this) => this,
                    Err(kind) => return fail(kind, span),
                };
                let Some(locked) = self.acquire(&code) else {
                    return Outcome::Yield;
                };
                frame.state = (k as i32) + n + 1;
                let mut temps = std::mem::take(&mut frame.temps);
                let args = temps.split_off(k.min(temps.len()));
                self.enter_function(code, args, Some(this), locked)
            }
            MethodBody::Native(native) => {
                // First attempt: snapshot `this` after the arguments.
                let mut ret = match frame.result.take() {
                    Some(ret) => ret,
                    None => {
                        match self.receiver(frame, below, receiver, k) {
                            Ok(this) => frame.temps.push(this),
                            Err(kind) => return fail(kind, span),
                        }
                        self.env.classes().create_variable("", ty)
                    }
                };
                let status = match frame.temps.split_last_mut() {
                    Some((this, rest)) => {
                        let args = rest.get_mut(k..).unwrap_or_default();
                        (native.exec)(this, args, &mut ret, &mut *self.user)
                    }
                    None => return fail(RuntimeErrorKind::NotInit, span),
                };
                match status {
                    Ok(CallStatus::Done) => {
                        if let Err(kind) = self.write_back(frame, below, receiver, k) {
                            return fail(kind, span);
                        }
                        frame.temps.clear();
                        Outcome::Done((!ty.is_void()).then_some(ret))
                    }
                    Ok(CallStatus::Pending) => {
                        frame.result = Some(ret);
                        Outcome::Yield
                    }
                    Err(code) => fail(RuntimeErrorKind::Native(code), span),
                }
            }
        }
    }

    /// A native method may change an intrinsic receiver held by value;
    /// store the changed copy back where it came from.
    fn write_back(
        &mut self,
        frame: &mut Frame,
        below: &mut [Frame],
        receiver: &Access,
        operands: usize,
    ) -> Result<(), RuntimeErrorKind> {
        let Some(this) = frame.temps.pop() else {
            return Ok(());
        };
        if !matches!(this.value, Value::Instance(_)) {
            return Ok(());
        }
        let values = frame
            .temps
            .get(..operands)
            .map(<[Variable]>::to_vec)
            .unwrap_or_default();
        let mut place = self.resolve(frame, below, receiver, &values, true)?;
        with_var(frame, below, &mut place, |v| v.assign_owned(this))
    }

    /// Allocate an instance of `class` with its members initialized,
    /// parent members first.
    pub(crate) fn instantiate(&mut self, class: ClassId) -> Result<InstanceRef, RuntimeErrorKind> {
        let (name, decls) = {
            let classes = self.env.classes();
            let def = classes.get(class).ok_or(RuntimeErrorKind::NotClass)?;
            let decls: Vec<_> = classes
                .layout(class)
                .into_iter()
                .map(|(_, decl)| decl.clone())
                .collect();
            (Rc::clone(&def.name), decls)
        };
        let members = decls
            .iter()
            .map(|decl| {
                let mut var = self.default_var(&decl.name, &decl.ty);
                var.ident = decl.ident;
                var.protection = decl.protection;
                var
            })
            .collect();
        let instance = self.env.heap().allocate(ClassBody::new(class, name, members));
        for (index, decl) in decls.iter().enumerate() {
            let Some(code) = &decl.init else {
                continue;
            };
            let this = this_pointer(&instance, class);
            let value = self
                .run_isolated(Rc::clone(code), vec![this])
                .map_err(|err| err.kind)?;
            if let Some(value) = value {
                if let Some(member) = instance.borrow_mut().body.members.get_mut(index) {
                    member.assign_owned(value);
                }
            }
        }
        Ok(instance)
    }

    /// Allocate into `frame.result` and return the constructor frame, if
    /// the constructor is a script. Constructor arguments are the frame's
    /// temporaries.
    fn construct(
        &mut self,
        frame: &mut Frame,
        class: ClassId,
        ctor: Option<&MethodRef>,
    ) -> Result<Option<Frame>, RuntimeErrorKind> {
        let instance = self.instantiate(class)?;
        let mut this = this_pointer(&instance, class);
        frame.result = Some(this.clone());
        instance.borrow_mut().constructed = true;
        let Some(ctor) = ctor else {
            frame.temps.clear();
            return Ok(None);
        };
        let entry = self
            .env
            .classes()
            .method(ctor.class, &ctor.key)
            .ok_or(RuntimeErrorKind::UndefFunc)?;
        let args = std::mem::take(&mut frame.temps);
        match entry.body {
            MethodBody::Script(func) => {
                let code = func.code().ok_or(RuntimeErrorKind::UndefFunc)?;
                let locals = self.bind_params(&code, args, Some(this));
                Ok(Some(Frame::function(code, locals)))
            }
            MethodBody::Native(native) => {
                let mut args = args;
                let mut ret = Variable::create("", TypeDesc::VOID);
                (native.exec)(&mut this, &mut args, &mut ret, &mut *self.user)
                    .map_err(RuntimeErrorKind::Native)?;
                Ok(None)
            }
        }
    }

    pub(super) fn new_instance(
        &mut self,
        frame: &mut Frame,
        class: ClassId,
        ctor: Option<&MethodRef>,
        args: &[NodeId],
        span: Span,
    ) -> Outcome {
        if let Some(next) = next_child(frame, args, 0) {
            return next;
        }
        let n = args.len() as i32;
        if frame.state > n {
            return Outcome::Done(frame.result.take());
        }
        match self.construct(frame, class, ctor) {
            Ok(Some(callee)) => {
                frame.state = n + 1;
                Outcome::Call(callee)
            }
            Ok(None) => Outcome::Done(frame.result.take()),
            Err(kind) => fail(kind, span),
        }
    }

    pub(super) fn declare(
        &mut self,
        frame: &mut Frame,
        below: &mut [Frame],
        decl: &Declaration,
        span: Span,
    ) -> Outcome {
        if let Some(next) = next_child(frame, &decl.dims, 0) {
            return next;
        }
        let dims = decl.dims.len();
        let base = dims as i32;
        let value = match &decl.init {
            DeclInit::Default => None,
            DeclInit::Expr(value) => {
                if frame.state == base {
                    frame.state += 1;
                    return Outcome::Push(*value);
                }
                frame.temps.pop()
            }
            DeclInit::Construct { ctor, args } => {
                if let Some(next) = next_child(frame, args, base) {
                    return next;
                }
                let end = base + args.len() as i32;
                let Some(class) = decl.ty.class_id() else {
                    return fail(RuntimeErrorKind::NotClass, span);
                };
                if frame.state == end {
                    frame.temps.drain(..dims.min(frame.temps.len()));
                    match self.construct(frame, class, ctor.as_ref()) {
                        Ok(Some(callee)) => {
                            frame.state = end + 1;
                            return Outcome::Call(callee);
                        }
                        Ok(None) => {}
                        Err(kind) => return fail(kind, span),
                    }
                }
                frame.result.take()
            }
        };

        let sizes: Result<Vec<i64>, _> = frame.temps.iter().take(dims).map(integer).collect();
        let mut var = if dims > 0 {
            match sizes.and_then(|sizes| self.build_array(&decl.ty, &sizes)) {
                Ok(var) => var,
                Err(kind) => return fail(kind, span),
            }
        } else {
            self.default_var(&decl.name, &decl.ty)
        };
        frame.temps.clear();
        decl.name.clone_into(&mut var.name);
        var.ident = decl.ident;
        if let Some(value) = value {
            var.assign_owned(value);
        }

        match below.iter_mut().rev().find(|f| f.block != BlockKind::Instruction) {
            Some(scope) => {
                scope.declare(var);
                Outcome::Done(None)
            }
            None => Outcome::Done(Some(var)),
        }
    }
}

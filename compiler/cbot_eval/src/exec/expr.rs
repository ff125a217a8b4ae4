//! Expression nodes.

use cbot_diagnostic::RuntimeErrorKind;
use cbot_ir::{
    Access, BinaryOp, ClassId, IncDec, Literal, NodeId, Span, TypeDesc, TypeKind, UnaryOp,
    NO_LIMIT,
};
use cbot_value::{ops, ArrayBody, InitState, Value, Variable};

use super::place::{elem_type, with_var};
use super::{fail, next_child, Exec, Outcome};
use crate::stack::Frame;

pub(crate) fn literal(lit: &Literal) -> Variable {
    match lit {
        Literal::Int(v) => Variable::int(*v),
        Literal::Long(v) => Variable::long(*v),
        Literal::Float(v) => Variable::float(*v),
        Literal::Double(v) => Variable::double(*v),
        Literal::Bool(v) => Variable::boolean(*v),
        Literal::Str(v) => Variable::string(v.as_str()),
        Literal::Char(c) => {
            let mut var = Variable::create("", TypeDesc::CHAR);
            var.set_i64(i64::from(u32::from(*c)));
            var
        }
        Literal::Null => Variable::null(),
        Literal::Nan => Variable::nan(TypeKind::Float),
    }
}

/// Condition value of `v`.
pub(crate) fn truth(v: &Variable) -> Result<bool, RuntimeErrorKind> {
    match v.init {
        InitState::Undef => Err(RuntimeErrorKind::NotInit),
        InitState::IsNan => Err(RuntimeErrorKind::Nan),
        InitState::Def => Ok(v.as_bool().unwrap_or(false)),
    }
}

/// Integer value of `v` (loop counts, sizes, thrown codes).
pub(crate) fn integer(v: &Variable) -> Result<i64, RuntimeErrorKind> {
    match v.init {
        InitState::Undef => Err(RuntimeErrorKind::NotInit),
        InitState::IsNan => Err(RuntimeErrorKind::Nan),
        InitState::Def => v.as_i64().ok_or(RuntimeErrorKind::NotInit),
    }
}

pub(crate) fn binary(
    frame: &mut Frame,
    op: BinaryOp,
    left: NodeId,
    right: NodeId,
    ty: &TypeDesc,
    span: Span,
) -> Outcome {
    match frame.state {
        0 => {
            frame.state = 1;
            Outcome::Push(left)
        }
        1 => {
            if op.is_short_circuit() {
                let Some(l) = frame.temps.last() else {
                    return fail(RuntimeErrorKind::NotInit, span);
                };
                match truth(l) {
                    Ok(b) if (op == BinaryOp::LogAnd) != b => {
                        return Outcome::Done(Some(Variable::boolean(b)));
                    }
                    Ok(_) => {}
                    Err(kind) => return fail(kind, span),
                }
            }
            frame.state = 2;
            Outcome::Push(right)
        }
        _ => {
            let (Some(r), Some(l)) = (frame.temps.pop(), frame.temps.pop()) else {
                return fail(RuntimeErrorKind::NotInit, span);
            };
            let result = if op.is_short_circuit() {
                truth(&r).map(Variable::boolean)
            } else {
                ops::binary(op, &l, &r, ty)
            };
            match result {
                Ok(v) => Outcome::Done(Some(v)),
                Err(kind) => fail(kind, span),
            }
        }
    }
}

pub(crate) fn unary(frame: &mut Frame, op: UnaryOp, operand: NodeId, span: Span) -> Outcome {
    if frame.state == 0 {
        frame.state = 1;
        return Outcome::Push(operand);
    }
    let Some(v) = frame.temps.pop() else {
        return fail(RuntimeErrorKind::NotInit, span);
    };
    match ops::unary(op, &v) {
        Ok(v) => Outcome::Done(Some(v)),
        Err(kind) => fail(kind, span),
    }
}

pub(crate) fn discard(frame: &mut Frame, inner: NodeId) -> Outcome {
    if frame.state == 0 {
        frame.state = 1;
        return Outcome::Push(inner);
    }
    frame.temps.clear();
    Outcome::Done(None)
}

impl Exec<'_> {
    pub(super) fn load(
        &mut self,
        frame: &mut Frame,
        below: &mut [Frame],
        access: &Access,
        span: Span,
    ) -> Outcome {
        if let Some(next) = Self::access_operands(frame, access) {
            return next;
        }
        let operands = std::mem::take(&mut frame.temps);
        match self.read(frame, below, access, &operands) {
            Ok(v) => Outcome::Done(Some(v)),
            Err(kind) => fail(kind, span),
        }
    }

    pub(super) fn assign(
        &mut self,
        frame: &mut Frame,
        below: &mut [Frame],
        target: &Access,
        op: Option<BinaryOp>,
        value: NodeId,
        span: Span,
    ) -> Outcome {
        if let Some(next) = Self::access_operands(frame, target) {
            return next;
        }
        let count = target.operands().len() as i32;
        if frame.state == count {
            frame.state += 1;
            return Outcome::Push(value);
        }
        let mut operands = std::mem::take(&mut frame.temps);
        let Some(value) = operands.pop() else {
            return fail(RuntimeErrorKind::NotInit, span);
        };
        let stored = self
            .resolve(frame, below, target, &operands, true)
            .and_then(|mut place| {
                with_var(frame, below, &mut place, |var| {
                    match op {
                        Some(op) => {
                            let ty = var.ty.clone();
                            let combined = ops::binary(op, var, &value, &ty)?;
                            var.assign_owned(combined);
                        }
                        None => var.assign_owned(value),
                    }
                    Ok(var.clone())
                })?
            });
        match stored {
            Ok(v) => Outcome::Done(Some(v)),
            Err(kind) => fail(kind, span),
        }
    }

    pub(super) fn inc_dec(
        &mut self,
        frame: &mut Frame,
        below: &mut [Frame],
        target: &Access,
        op: IncDec,
        prefix: bool,
        span: Span,
    ) -> Outcome {
        if let Some(next) = Self::access_operands(frame, target) {
            return next;
        }
        let operands = std::mem::take(&mut frame.temps);
        let stepped = self
            .resolve(frame, below, target, &operands, true)
            .and_then(|mut place| {
                with_var(frame, below, &mut place, |var| {
                    let old = var.clone();
                    ops::step(op, var)?;
                    Ok(if prefix { var.clone() } else { old })
                })?
            });
        match stepped {
            Ok(v) => Outcome::Done(Some(v)),
            Err(kind) => fail(kind, span),
        }
    }

    pub(super) fn ternary(
        &mut self,
        frame: &mut Frame,
        cond: NodeId,
        then: NodeId,
        otherwise: NodeId,
        ty: &TypeDesc,
        span: Span,
    ) -> Outcome {
        match frame.state {
            0 => {
                frame.state = 1;
                Outcome::Push(cond)
            }
            1 => {
                let taken = frame.temps.pop().ok_or(RuntimeErrorKind::NotInit);
                match taken.and_then(|c| truth(&c)) {
                    Ok(c) => {
                        frame.state = 2;
                        Outcome::Push(if c { then } else { otherwise })
                    }
                    Err(kind) => fail(kind, span),
                }
            }
            _ => {
                let Some(v) = frame.temps.pop() else {
                    return fail(RuntimeErrorKind::NotInit, span);
                };
                let mut out = self.env.classes().create_variable("", ty);
                out.assign_owned(v);
                Outcome::Done(Some(out))
            }
        }
    }

    pub(super) fn instance_of(&mut self, frame: &mut Frame, value: NodeId, class: ClassId) -> Outcome {
        if frame.state == 0 {
            frame.state = 1;
            return Outcome::Push(value);
        }
        let actual = frame
            .temps
            .pop()
            .and_then(|v| v.pointer().and_then(|p| p.borrow().class()));
        let holds = actual.is_some_and(|c| self.env.classes().is_child_of(c, class));
        Outcome::Done(Some(Variable::boolean(holds)))
    }

    pub(super) fn new_array(
        &mut self,
        frame: &mut Frame,
        dims: &[NodeId],
        ty: &TypeDesc,
        span: Span,
    ) -> Outcome {
        if let Some(next) = next_child(frame, dims, 0) {
            return next;
        }
        let sizes: Result<Vec<i64>, _> = frame.temps.iter().map(integer).collect();
        match sizes.and_then(|sizes| self.build_array(ty, &sizes)) {
            Ok(v) => Outcome::Done(Some(v)),
            Err(kind) => fail(kind, span),
        }
    }

    pub(super) fn array_init(
        &mut self,
        frame: &mut Frame,
        items: &[NodeId],
        ty: &TypeDesc,
        span: Span,
    ) -> Outcome {
        if let Some(next) = next_child(frame, items, 0) {
            return next;
        }
        let elem = elem_type(ty);
        let mut body = ArrayBody::new(elem.clone(), NO_LIMIT);
        for (i, value) in std::mem::take(&mut frame.temps).into_iter().enumerate() {
            let mut item = self.env.classes().create_variable(&format!("[{i}]"), &elem);
            item.assign_owned(value);
            if let Err(kind) = body.push(item) {
                return fail(kind, span);
            }
        }
        let mut var = Variable::create("", ty.clone());
        var.set_array(Some(body.shared()));
        Outcome::Done(Some(var))
    }

    /// Fresh variable of type `ty`. An array declared without dimensions
    /// starts empty rather than `null`.
    pub(crate) fn default_var(&self, name: &str, ty: &TypeDesc) -> Variable {
        let mut var = self.env.classes().create_variable(name, ty);
        if let (Value::Array(None), Some(elem)) = (&var.value, ty.elem()) {
            let body = ArrayBody::new(elem.clone(), ty.limit());
            var.set_array(Some(body.shared()));
        }
        var
    }

    /// Array of type `ty` with every dimension in `dims` created eagerly.
    /// Without dimensions the array is `null`.
    pub(crate) fn build_array(&self, ty: &TypeDesc, dims: &[i64]) -> Result<Variable, RuntimeErrorKind> {
        let mut var = Variable::create("", ty.clone());
        let Some((&len, rest)) = dims.split_first() else {
            return Ok(var);
        };
        let len = i32::try_from(len)
            .ok()
            .filter(|len| *len >= 0)
            .ok_or(RuntimeErrorKind::OutArray)?;
        let elem = elem_type(ty);
        let mut body = ArrayBody::new(elem.clone(), len);
        for i in 0..len {
            let item = if rest.is_empty() {
                self.env.classes().create_variable(&format!("[{i}]"), &elem)
            } else {
                self.build_array(&elem, rest)?
            };
            body.items.push(item);
        }
        var.set_array(Some(body.shared()));
        Ok(var)
    }
}

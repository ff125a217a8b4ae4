//! Expressions: assignment, ternary, binary precedence levels, unary
//! operators and `new`.

use cbot_diagnostic::CompileErrorKind;
use cbot_ir::{BinaryOp, IncDec, Kw, Literal, NodeId, NodeKind, TypeDesc, TypeKind, UnaryOp, NO_LIMIT};
use cbot_stack::ensure_sufficient_stack;

use super::place::Operand;
use crate::types::{assignable, binary_result};
use crate::{CResult, Compiler};

/// Binary operators from loosest to tightest binding.
const LEVELS: &[&[Kw]] = &[
    &[Kw::LogOr, Kw::TxtOr],
    &[Kw::LogAnd, Kw::TxtAnd],
    &[Kw::Or],
    &[Kw::Xor, Kw::TxtXor],
    &[Kw::And],
    &[Kw::Eq, Kw::Ne],
    &[Kw::Lo, Kw::Hi, Kw::Ls, Kw::Hs, Kw::Instanceof],
    &[Kw::Sl, Kw::Asr, Kw::Sr],
    &[Kw::Add, Kw::Sub],
    &[Kw::Mul, Kw::Div, Kw::Modulo],
    &[Kw::Power],
];

impl Compiler<'_> {
    /// A full expression, assignments included.
    pub(crate) fn expression(&mut self) -> CResult<NodeId> {
        let node = ensure_sufficient_stack(|| self.assignment())?;
        self.cs.set_last_type(self.code.ty(node).clone());
        Ok(node)
    }

    fn assignment(&mut self) -> CResult<NodeId> {
        let lhs = self.ternary()?;
        let token = self.cur.current();
        let op = match token.kw {
            Some(Kw::Assign) => None,
            Some(kw) if kw.is_assignment() => BinaryOp::from_assign(kw),
            _ => return Ok(self.value(lhs)),
        };
        let Operand::Place {
            access,
            ty,
            span,
            writable: true,
        } = lhs
        else {
            return self.err(CompileErrorKind::BadLeft, token.span);
        };
        self.cur.bump();

        let value = self.expression()?;
        let vty = self.code.ty(value).clone();
        let ok = match op {
            None => assignable(&self.env.classes(), &ty, &vty),
            Some(op) => match binary_result(op, &ty, &vty) {
                Ok(result) => assignable(&self.env.classes(), &ty, &result),
                Err(kind) => return self.err(kind, token.span),
            },
        };
        if !ok {
            return self.err(CompileErrorKind::BadType1, self.code.span(value));
        }
        let span = span.merge(self.code.span(value));
        Ok(self.code.push(
            NodeKind::Assign {
                target: access,
                op,
                value,
            },
            span,
            ty,
        ))
    }

    fn ternary(&mut self) -> CResult<Operand> {
        let cond = self.binary(0)?;
        if !self.cur.check(Kw::Question) {
            return Ok(cond);
        }
        let cond = self.value(cond);
        if self.code.ty(cond).kind() != TypeKind::Boolean {
            return self.err(CompileErrorKind::NotBoolean, self.code.span(cond));
        }
        self.cur.bump();
        let then = self.expression()?;
        self.expect(Kw::Colon, CompileErrorKind::NoDoubleDots)?;
        let otherwise = self.expression()?;

        let (a, b) = (self.code.ty(then).clone(), self.code.ty(otherwise).clone());
        let ty = if a.is_numeric() && b.is_numeric() {
            TypeDesc::wider(&a, &b)
        } else if assignable(&self.env.classes(), &a, &b) {
            a
        } else if assignable(&self.env.classes(), &b, &a) {
            b
        } else {
            return self.err(CompileErrorKind::BadType2, self.code.span(otherwise));
        };
        let span = self.code.span(cond).merge(self.code.span(otherwise));
        Ok(Operand::Node(self.code.push(
            NodeKind::Ternary {
                cond,
                then,
                otherwise,
            },
            span,
            ty,
        )))
    }

    fn binary(&mut self, level: usize) -> CResult<Operand> {
        let Some(ops) = LEVELS.get(level) else {
            return self.unary();
        };
        let mut left = self.binary(level + 1)?;
        loop {
            let token = self.cur.current();
            let Some(kw) = token.kw.filter(|kw| ops.contains(kw)) else {
                return Ok(left);
            };
            self.cur.bump();
            let lhs = self.value(left);

            if kw == Kw::Instanceof {
                left = Operand::Node(self.instance_of(lhs)?);
                continue;
            }
            // `**` groups to the right.
            let rhs = if kw == Kw::Power {
                self.binary(level)?
            } else {
                self.binary(level + 1)?
            };
            let rhs = self.value(rhs);
            let Some(op) = BinaryOp::from_kw(kw) else {
                return self.err(CompileErrorKind::BadType2, token.span);
            };
            let ty = match binary_result(op, self.code.ty(lhs), self.code.ty(rhs)) {
                Ok(ty) => ty,
                Err(kind) => return self.err(kind, token.span),
            };
            let span = self.code.span(lhs).merge(self.code.span(rhs));
            if let Some(lit) = self.fold_int_literals(op, lhs, rhs) {
                let ty = lit.ty();
                left = Operand::Node(self.code.push(NodeKind::Literal(lit), span, ty));
                continue;
            }
            left = Operand::Node(self.code.push(
                NodeKind::Binary {
                    op,
                    left: lhs,
                    right: rhs,
                },
                span,
                ty,
            ));
        }
    }

    /// `+ - *` between two int literals; a result outside the `int` range
    /// becomes a long literal instead of wrapping.
    fn fold_int_literals(&self, op: BinaryOp, lhs: NodeId, rhs: NodeId) -> Option<Literal> {
        let (NodeKind::Literal(Literal::Int(a)), NodeKind::Literal(Literal::Int(b))) =
            (&self.code.node(lhs).kind, &self.code.node(rhs).kind)
        else {
            return None;
        };
        let (a, b) = (i64::from(*a), i64::from(*b));
        let exact = match op {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            _ => return None,
        };
        Some(match i32::try_from(exact) {
            Ok(v) => Literal::Int(v),
            Err(_) => Literal::Long(exact),
        })
    }

    fn instance_of(&mut self, value: NodeId) -> CResult<NodeId> {
        let vty = self.code.ty(value).clone();
        if !matches!(vty.kind(), TypeKind::Pointer | TypeKind::Class | TypeKind::Null) {
            return self.err(CompileErrorKind::BadInstanceof, self.code.span(value));
        }
        let (name, span) = self.ident(CompileErrorKind::NoClassName)?;
        let Some(class) = self.visible_class(&name) else {
            return self.err(CompileErrorKind::UndefClass, span);
        };
        let span = self.code.span(value).merge(span);
        Ok(self
            .code
            .push(NodeKind::InstanceOf { value, class }, span, TypeDesc::BOOLEAN))
    }

    fn unary(&mut self) -> CResult<Operand> {
        let token = self.cur.current();
        match token.kw {
            Some(kw @ (Kw::Inc | Kw::Dec)) => {
                self.cur.bump();
                let target = self.primary()?;
                let op = if kw == Kw::Inc { IncDec::Inc } else { IncDec::Dec };
                return self.inc_dec(target, op, true, token.span).map(Operand::Node);
            }
            Some(kw) => {
                if let Some(op) = UnaryOp::from_kw(kw) {
                    self.cur.bump();
                    let operand = ensure_sufficient_stack(|| self.unary())?;
                    let operand = self.value(operand);
                    return self.unary_node(op, operand, token.span).map(Operand::Node);
                }
            }
            None => {}
        }

        let operand = self.primary()?;
        let next = self.cur.current();
        match next.kw {
            Some(Kw::Inc) => {
                self.cur.bump();
                self.inc_dec(operand, IncDec::Inc, false, next.span).map(Operand::Node)
            }
            Some(Kw::Dec) => {
                self.cur.bump();
                self.inc_dec(operand, IncDec::Dec, false, next.span).map(Operand::Node)
            }
            _ => Ok(operand),
        }
    }

    fn inc_dec(
        &mut self,
        target: Operand,
        op: IncDec,
        prefix: bool,
        op_span: cbot_ir::Span,
    ) -> CResult<NodeId> {
        let Operand::Place {
            access,
            ty,
            span,
            writable: true,
        } = target
        else {
            return self.err(CompileErrorKind::BadLeft, op_span);
        };
        if !ty.is_numeric() {
            return self.err(CompileErrorKind::BadType1, span);
        }
        Ok(self.code.push(
            NodeKind::IncDec {
                target: access,
                op,
                prefix,
            },
            span.merge(op_span),
            ty,
        ))
    }

    fn unary_node(&mut self, op: UnaryOp, operand: NodeId, op_span: cbot_ir::Span) -> CResult<NodeId> {
        let ty = self.code.ty(operand).clone();
        let span = op_span.merge(self.code.span(operand));
        let ty = match op {
            UnaryOp::Neg if ty.is_numeric() => {
                if ty.kind().rank() < TypeKind::Int.rank() {
                    TypeDesc::INT
                } else {
                    ty
                }
            }
            UnaryOp::Not if ty.kind() == TypeKind::Boolean => ty,
            UnaryOp::Not => return self.err(CompileErrorKind::NotBoolean, span),
            UnaryOp::BitNot if ty.kind().is_integer() => {
                if ty.kind().rank() < TypeKind::Int.rank() {
                    TypeDesc::INT
                } else {
                    ty
                }
            }
            _ => return self.err(CompileErrorKind::BadType1, span),
        };

        if op == UnaryOp::Neg {
            if let NodeKind::Literal(lit) = &self.code.node(operand).kind {
                let folded = match *lit {
                    Literal::Int(v) => Some(Literal::Int(v.wrapping_neg())),
                    // `-2147483648` arrives as a long literal.
                    Literal::Long(v) => Some(match i32::try_from(v.wrapping_neg()) {
                        Ok(small) => Literal::Int(small),
                        Err(_) => Literal::Long(v.wrapping_neg()),
                    }),
                    Literal::Float(v) => Some(Literal::Float(-v)),
                    Literal::Double(v) => Some(Literal::Double(-v)),
                    _ => None,
                };
                if let Some(folded) = folded {
                    let ty = folded.ty();
                    return Ok(self.code.push(NodeKind::Literal(folded), span, ty));
                }
            }
        }
        Ok(self.code.push(NodeKind::Unary { op, operand }, span, ty))
    }

    /// `new A(args)`, `new A`, `new int[n][m]`, `new int[] { ... }`.
    pub(crate) fn new_expression(&mut self) -> CResult<NodeId> {
        let start = self.cur.bump().span;
        let base = self.base_type()?;
        let mut ty = base.clone();
        let mut dims = Vec::new();
        let mut open_dims = 0usize;
        while self.cur.eat(Kw::OpenBracket) {
            if self.cur.eat(Kw::CloseBracket) {
                open_dims += 1;
            } else {
                let dim = self.expression()?;
                if !self.code.ty(dim).kind().is_integer() {
                    return self.err(CompileErrorKind::BadIndex, self.code.span(dim));
                }
                if open_dims > 0 {
                    return self.err(CompileErrorKind::BadIndex, self.code.span(dim));
                }
                dims.push(dim);
                self.expect(Kw::CloseBracket, CompileErrorKind::CloseIndex)?;
            }
            ty = TypeDesc::array(ty, NO_LIMIT);
        }

        if ty.kind().is_array() {
            if dims.is_empty() {
                if !self.cur.check(Kw::OpenBlk) {
                    return self.err(CompileErrorKind::OpenBlock, self.cur.span());
                }
                return self.array_literal(&ty);
            }
            let span = start.merge(self.cur.previous_span());
            return Ok(self.code.push(NodeKind::NewArray { dims }, span, ty));
        }

        let (TypeKind::Pointer, Some(class)) = (base.kind(), base.class_id()) else {
            return self.err(CompileErrorKind::BadNew, start);
        };
        let (args, arg_span) = if self.cur.check(Kw::OpenPar) {
            self.call_args()?
        } else {
            (Vec::new(), start)
        };
        let (ctor, args) = self.constructor(class, args, arg_span)?;
        let span = start.merge(self.cur.previous_span());
        Ok(self.code.push(NodeKind::New { class, ctor, args }, span, base))
    }

    /// `{ a, b, { c } }` for an array of type `ty`.
    pub(crate) fn array_literal(&mut self, ty: &TypeDesc) -> CResult<NodeId> {
        let open = self.cur.span();
        let elem = ty.elem().cloned().unwrap_or_default();
        self.cur.bump();
        let mut items = Vec::new();
        while !self.cur.check(Kw::CloseBlk) {
            let item = if self.cur.check(Kw::OpenBlk) && elem.kind().is_array() {
                self.array_literal(&elem)?
            } else {
                let item = self.expression()?;
                let ity = self.code.ty(item).clone();
                if !assignable(&self.env.classes(), &elem, &ity) {
                    return self.err(CompileErrorKind::BadType1, self.code.span(item));
                }
                item
            };
            items.push(item);
            if !self.cur.eat(Kw::Comma) {
                break;
            }
        }
        let close = self.expect(Kw::CloseBlk, CompileErrorKind::CloseBlock)?;
        Ok(self
            .code
            .push(NodeKind::ArrayInit { items }, open.merge(close), ty.clone()))
    }
}

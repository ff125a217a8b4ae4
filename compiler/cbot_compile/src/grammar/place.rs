//! Primary expressions and place paths (`a`, `this.x`, `list[i].y`,
//! `A.count`).

use cbot_diagnostic::CompileErrorKind;
use cbot_ir::{
    Access, AccessRoot, AccessStep, ClassId, Kw, Literal, NodeId, NodeKind, Protection, Span,
    TokenType, TypeDesc, TypeKind,
};

use super::primitive;
use crate::types::size_of_kind;
use crate::{CResult, Compiler};

/// Result of a primary expression: either a computed value or a location
/// that can still be assigned to.
#[derive(Debug)]
pub(crate) enum Operand {
    Node(NodeId),
    Place {
        access: Access,
        ty: TypeDesc,
        span: Span,
        writable: bool,
    },
}

impl Compiler<'_> {
    pub(crate) fn operand_ty(&self, op: &Operand) -> TypeDesc {
        match op {
            Operand::Node(node) => self.code.ty(*node).clone(),
            Operand::Place { ty, .. } => ty.clone(),
        }
    }

    pub(crate) fn operand_span(&self, op: &Operand) -> Span {
        match op {
            Operand::Node(node) => self.code.span(*node),
            Operand::Place { span, .. } => *span,
        }
    }

    /// Read a place, or pass a value through.
    pub(crate) fn value(&mut self, op: Operand) -> NodeId {
        match op {
            Operand::Node(node) => node,
            Operand::Place { access, ty, span, .. } => {
                self.code.push(NodeKind::Load(access), span, ty)
            }
        }
    }

    fn into_access(op: Operand) -> Access {
        match op {
            Operand::Place { access, .. } => access,
            Operand::Node(node) => Access {
                root: AccessRoot::Value(node),
                steps: Vec::new(),
            },
        }
    }

    /// Primary expression followed by any `.member`, `.method()` and
    /// `[index]` suffixes.
    pub(crate) fn primary(&mut self) -> CResult<Operand> {
        let op = self.primary_head()?;
        self.postfix(op)
    }

    fn primary_head(&mut self) -> CResult<Operand> {
        let token = self.cur.current();
        if let Some((lit, span)) = self.literal_token() {
            let ty = lit.ty();
            return Ok(Operand::Node(self.code.push(NodeKind::Literal(lit), span, ty)));
        }
        match token.kw {
            Some(Kw::OpenPar) => {
                self.cur.bump();
                let inner = self.expression()?;
                self.expect(Kw::ClosePar, CompileErrorKind::ClosePar)?;
                return Ok(Operand::Node(inner));
            }
            Some(Kw::New) => return self.new_expression().map(Operand::Node),
            Some(Kw::This) => {
                self.cur.bump();
                let Some(class) = self.body.class.filter(|_| self.body.has_this) else {
                    return self.err(CompileErrorKind::UndefVar, token.span);
                };
                return Ok(Operand::Place {
                    access: Access::this(),
                    ty: self.class_type(class),
                    span: token.span,
                    writable: false,
                });
            }
            Some(Kw::Super) => return self.super_call().map(Operand::Node),
            _ => {}
        }
        if token.ty != TokenType::Identifier {
            return self.err(CompileErrorKind::NoExpression, token.span);
        }

        let name = token.text.as_str();
        if name == "sizeof" {
            if let Some(node) = self.sizeof_type() {
                return Ok(Operand::Node(node));
            }
        }
        if self.cur.peek(1).is(Kw::OpenPar) {
            self.cur.bump();
            return self.function_call(name, token.span).map(Operand::Node);
        }
        if let Some(var) = self.cs.lookup(name) {
            let op = Operand::Place {
                access: Access::local(var.ident),
                ty: var.ty.clone(),
                span: token.span,
                writable: true,
            };
            self.cur.bump();
            return Ok(op);
        }
        if let Some(op) = self.implicit_member(name, token.span)? {
            self.cur.bump();
            return Ok(op);
        }
        if self.cur.peek(1).is(Kw::Dot) {
            if let Some(class) = self.visible_class(name) {
                self.cur.bump();
                self.cur.bump();
                return self.static_access(class);
            }
        }
        self.err(CompileErrorKind::UndefVar, token.span)
    }

    /// `sizeof(int)`: folded to the byte size of the type.
    fn sizeof_type(&mut self) -> Option<NodeId> {
        if !self.cur.peek(1).is(Kw::OpenPar) || !self.cur.peek(3).is(Kw::ClosePar) {
            return None;
        }
        let ty = self.cur.peek(2).kw.and_then(primitive)?;
        let size = size_of_kind(ty.kind())?;
        let span = self.cur.span().merge(self.cur.peek(3).span);
        for _ in 0..4 {
            self.cur.bump();
        }
        Some(
            self.code
                .push(NodeKind::Literal(Literal::Int(size)), span, TypeDesc::INT),
        )
    }

    /// A bare name inside a class body: instance member through `this`,
    /// or a static member of the class chain.
    fn implicit_member(&mut self, name: &str, span: Span) -> CResult<Option<Operand>> {
        let Some(class) = self.body.class else {
            return Ok(None);
        };
        let field = self.env.classes().field(class, name);
        if let Some(field) = field {
            if !self.body.has_this {
                return self.err(CompileErrorKind::UndefVar, span);
            }
            let writable = self.member_access(field.owner, field.decl.protection, span)?;
            return Ok(Some(Operand::Place {
                access: Access {
                    root: AccessRoot::This,
                    steps: vec![AccessStep::Field {
                        class,
                        index: field.index,
                    }],
                },
                ty: field.decl.ty,
                span,
                writable,
            }));
        }
        let stat = self.env.classes().static_member(class, name);
        match stat {
            Some((owner, index, decl)) => {
                let writable = self.member_access(owner, decl.protection, span)?;
                Ok(Some(Operand::Place {
                    access: Access {
                        root: AccessRoot::Static { class: owner, index },
                        steps: Vec::new(),
                    },
                    ty: decl.ty,
                    span,
                    writable,
                }))
            }
            None => Ok(None),
        }
    }

    /// After `ClassName.`: a static member or a static method call.
    fn static_access(&mut self, class: ClassId) -> CResult<Operand> {
        let (name, span) = self.ident(CompileErrorKind::UndefItem)?;
        if self.cur.check(Kw::OpenPar) {
            return self
                .method_call(Access::this(), class, &name, span, true)
                .map(Operand::Node);
        }
        let stat = self.env.classes().static_member(class, &name);
        let Some((owner, index, decl)) = stat else {
            return self.err(CompileErrorKind::UndefItem, span);
        };
        let writable = self.member_access(owner, decl.protection, span)?;
        Ok(Operand::Place {
            access: Access {
                root: AccessRoot::Static { class: owner, index },
                steps: Vec::new(),
            },
            ty: decl.ty,
            span,
            writable,
        })
    }

    /// Check that the current body may use a member declared by `owner`;
    /// returns whether it may also write it.
    fn member_access(&mut self, owner: ClassId, protection: Protection, span: Span) -> CResult<bool> {
        let inside = self.body.class == Some(owner);
        let in_chain = self
            .body
            .class
            .is_some_and(|c| self.env.classes().is_child_of(c, owner));
        match protection {
            Protection::Public => Ok(true),
            Protection::ReadOnly => Ok(inside),
            Protection::Protected if in_chain => Ok(true),
            Protection::Private if inside => Ok(true),
            Protection::Protected | Protection::Private => {
                self.err(CompileErrorKind::Private, span)
            }
        }
    }

    fn postfix(&mut self, mut op: Operand) -> CResult<Operand> {
        loop {
            if self.cur.eat(Kw::Dot) {
                op = self.member_suffix(op)?;
            } else if self.cur.check(Kw::OpenBracket) {
                op = self.index_suffix(op)?;
            } else {
                return Ok(op);
            }
        }
    }

    fn member_suffix(&mut self, op: Operand) -> CResult<Operand> {
        let ty = self.operand_ty(&op);
        let start = self.operand_span(&op);
        let (name, span) = self.ident(CompileErrorKind::UndefItem)?;
        let class = match ty.kind() {
            TypeKind::Pointer | TypeKind::Class | TypeKind::Intrinsic => ty.class_id(),
            _ => None,
        };
        let Some(class) = class else {
            return self.err(CompileErrorKind::UndefClass, span);
        };

        if self.cur.check(Kw::OpenPar) {
            let receiver = Self::into_access(op);
            return self
                .method_call(receiver, class, &name, span, false)
                .map(Operand::Node);
        }

        let field = self.env.classes().field(class, &name);
        if let Some(field) = field {
            let writable = self.member_access(field.owner, field.decl.protection, span)?;
            let mut access = Self::into_access(op);
            access.steps.push(AccessStep::Field {
                class,
                index: field.index,
            });
            return Ok(Operand::Place {
                access,
                ty: field.decl.ty,
                span: start.merge(span),
                writable,
            });
        }
        let stat = self.env.classes().static_member(class, &name);
        let Some((owner, index, decl)) = stat else {
            return self.err(CompileErrorKind::UndefItem, span);
        };
        let writable = self.member_access(owner, decl.protection, span)?;
        Ok(Operand::Place {
            access: Access {
                root: AccessRoot::Static { class: owner, index },
                steps: Vec::new(),
            },
            ty: decl.ty,
            span: start.merge(span),
            writable,
        })
    }

    fn index_suffix(&mut self, op: Operand) -> CResult<Operand> {
        let ty = self.operand_ty(&op);
        let start = self.operand_span(&op);
        let open = self.cur.bump().span;
        let Some(elem) = ty.elem().cloned() else {
            return self.err(CompileErrorKind::BadIndex, open);
        };
        let index = self.expression()?;
        if !self.code.ty(index).kind().is_integer() {
            return self.err(CompileErrorKind::BadIndex, self.code.span(index));
        }
        let close = self.expect(Kw::CloseBracket, CompileErrorKind::CloseIndex)?;
        let mut access = Self::into_access(op);
        access.steps.push(AccessStep::Index(index));
        Ok(Operand::Place {
            access,
            ty: elem,
            span: start.merge(close),
            writable: true,
        })
    }
}

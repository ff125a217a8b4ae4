//! Statements and local declarations.

use cbot_diagnostic::CompileErrorKind;
use cbot_ir::{
    CaseValue, CatchClause, DeclInit, Declaration, Kw, Literal, NodeId, NodeKind, Span,
    SwitchCase, TokenType, TypeDesc, TypeKind, NO_LIMIT,
};
use cbot_stack::ensure_sufficient_stack;

use crate::cstack::LoopCtx;
use crate::types::assignable;
use crate::{CResult, Compiler};

impl Compiler<'_> {
    /// `{ statements }`. A scoped block owns the locals declared in it.
    pub(crate) fn block(&mut self, scope: bool) -> CResult<NodeId> {
        let open = self.expect(Kw::OpenBlk, CompileErrorKind::OpenBlock)?;
        if scope {
            self.cs.push_scope();
        }
        let mut stmts = Vec::new();
        while !self.cur.check(Kw::CloseBlk) {
            if self.cur.is_at_end() {
                return self.err(CompileErrorKind::CloseBlock, open);
            }
            stmts.push(self.statement()?);
        }
        let close = self.expect(Kw::CloseBlk, CompileErrorKind::CloseBlock)?;
        if scope {
            self.cs.pop_scope();
        }
        Ok(self.code.push(
            NodeKind::Block { stmts, scope },
            open.merge(close),
            TypeDesc::VOID,
        ))
    }

    pub(crate) fn statement(&mut self) -> CResult<NodeId> {
        ensure_sufficient_stack(|| self.statement_inner())
    }

    fn statement_inner(&mut self) -> CResult<NodeId> {
        let token = self.cur.current();

        if token.ty == TokenType::Identifier && self.cur.peek(1).is(Kw::Colon) {
            self.cur.bump();
            self.cur.bump();
            let label = Some(token.text.clone());
            return match self.cur.current().kw {
                Some(Kw::While) => self.while_stmt(label),
                Some(Kw::Do) => self.do_stmt(label),
                Some(Kw::For) => self.for_stmt(label),
                Some(Kw::Repeat) => self.repeat_stmt(label),
                _ => self.err(CompileErrorKind::Label, token.span),
            };
        }

        match token.kw {
            Some(Kw::OpenBlk) => self.block(true),
            Some(Kw::If) => self.if_stmt(),
            Some(Kw::While) => self.while_stmt(None),
            Some(Kw::Do) => self.do_stmt(None),
            Some(Kw::For) => self.for_stmt(None),
            Some(Kw::Repeat) => self.repeat_stmt(None),
            Some(Kw::Switch) => self.switch_stmt(),
            Some(Kw::Break | Kw::Continue) => self.jump_stmt(),
            Some(Kw::Return) => self.return_stmt(),
            Some(Kw::Throw) => self.throw_stmt(),
            Some(Kw::Try) => self.try_stmt(),
            Some(Kw::Case | Kw::Default) => self.err(CompileErrorKind::CaseOut, token.span),
            Some(Kw::Else) => self.err(CompileErrorKind::ElseWithoutIf, token.span),
            Some(Kw::Semicolon) => {
                self.cur.bump();
                Ok(self.code.push(
                    NodeKind::Block {
                        stmts: Vec::new(),
                        scope: false,
                    },
                    token.span,
                    TypeDesc::VOID,
                ))
            }
            _ if self.at_declaration() => {
                let node = self.declaration()?;
                self.expect(Kw::Semicolon, CompileErrorKind::NoTerminator)?;
                Ok(node)
            }
            _ => {
                let node = self.expression_statement()?;
                self.expect(Kw::Semicolon, CompileErrorKind::NoTerminator)?;
                Ok(node)
            }
        }
    }

    /// A type followed by a variable name (`int a`, `A[] list`, `B b`).
    fn at_declaration(&self) -> bool {
        if !self.at_type() {
            return false;
        }
        if self.cur.current().kw.is_some() {
            return true;
        }
        let mut n = 1;
        while self.cur.peek(n).is(Kw::OpenBracket) && self.cur.peek(n + 1).is(Kw::CloseBracket) {
            n += 2;
        }
        self.cur.peek(n).ty == TokenType::Identifier
    }

    fn expression_statement(&mut self) -> CResult<NodeId> {
        let value = self.expression()?;
        let span = self.code.span(value);
        Ok(self.code.push(NodeKind::Discard(value), span, TypeDesc::VOID))
    }

    /// `type a [dims] [= init], b ...` without the terminator.
    fn declaration(&mut self) -> CResult<NodeId> {
        let start = self.cur.span();
        if self.cur.check(Kw::Void) {
            return self.err(CompileErrorKind::Void, start);
        }
        let base = self.parse_type()?;
        let mut decls = Vec::new();
        loop {
            let (name, span) = self.ident(CompileErrorKind::NoVar)?;
            decls.push(self.declarator(base.clone(), name, span, None, true)?);
            if !self.cur.eat(Kw::Comma) {
                break;
            }
        }
        if decls.len() == 1 {
            return Ok(decls[0]);
        }
        let span = start.merge(self.cur.previous_span());
        Ok(self.code.push(
            NodeKind::Block {
                stmts: decls,
                scope: false,
            },
            span,
            TypeDesc::VOID,
        ))
    }

    /// One declarator after its name: array dimensions and initializer.
    /// `ident` is fixed for class members; locals get a fresh one.
    /// `construct` makes a class-typed local without initializer allocate
    /// an instance.
    pub(crate) fn declarator(
        &mut self,
        base: TypeDesc,
        name: String,
        span: Span,
        ident: Option<u64>,
        construct: bool,
    ) -> CResult<NodeId> {
        let mut ty = base;
        let mut dims = Vec::new();
        let mut bracketed = 0usize;
        while self.cur.eat(Kw::OpenBracket) {
            bracketed += 1;
            if !self.cur.check(Kw::CloseBracket) {
                let dim = self.expression()?;
                if !self.code.ty(dim).kind().is_integer() {
                    return self.err(CompileErrorKind::BadIndex, self.code.span(dim));
                }
                dims.push(dim);
            }
            self.expect(Kw::CloseBracket, CompileErrorKind::CloseIndex)?;
            ty = TypeDesc::array(ty, NO_LIMIT);
        }
        if !dims.is_empty() && dims.len() != bracketed {
            // `int a[][3]` leaves an outer dimension open.
            return self.err(CompileErrorKind::BadIndex, span);
        }

        let init = if self.cur.eat(Kw::Assign) {
            if self.cur.check(Kw::OpenBlk) {
                if !ty.kind().is_array() {
                    return self.err(CompileErrorKind::BadType1, self.cur.span());
                }
                DeclInit::Expr(self.array_literal(&ty)?)
            } else {
                let value = self.expression()?;
                let vty = self.code.ty(value).clone();
                if !assignable(&self.env.classes(), &ty, &vty) {
                    return self.err(CompileErrorKind::BadType1, self.code.span(value));
                }
                DeclInit::Expr(value)
            }
        } else if construct && ty.kind() == TypeKind::Pointer {
            let Some(class) = ty.class_id() else {
                return self.err(CompileErrorKind::UndefClass, span);
            };
            let (args, arg_span) = if self.cur.check(Kw::OpenPar) {
                self.call_args()?
            } else {
                (Vec::new(), span)
            };
            let (ctor, args) = self.constructor(class, args, arg_span)?;
            DeclInit::Construct { ctor, args }
        } else {
            DeclInit::Default
        };

        let ident = match ident {
            Some(ident) => ident,
            None => self.cs.declare(&name, ty.clone(), span)?,
        };
        let decl = Declaration {
            name,
            ident,
            ty: ty.clone(),
            dims,
            init,
        };
        Ok(self.code.push(NodeKind::Declare(Box::new(decl)), span, ty))
    }

    /// `( boolean expression )`
    fn condition(&mut self) -> CResult<NodeId> {
        self.expect(Kw::OpenPar, CompileErrorKind::OpenPar)?;
        let cond = self.boolean_expression()?;
        self.expect(Kw::ClosePar, CompileErrorKind::ClosePar)?;
        Ok(cond)
    }

    pub(crate) fn boolean_expression(&mut self) -> CResult<NodeId> {
        let cond = self.expression()?;
        if self.cs.last_type().kind() != TypeKind::Boolean {
            return self.err(CompileErrorKind::NotBoolean, self.code.span(cond));
        }
        Ok(cond)
    }

    fn if_stmt(&mut self) -> CResult<NodeId> {
        let start = self.cur.bump().span;
        let cond = self.condition()?;
        let then = self.statement()?;
        let otherwise = if self.cur.eat(Kw::Else) {
            Some(self.statement()?)
        } else {
            None
        };
        let span = start.merge(self.cur.previous_span());
        Ok(self.code.push(
            NodeKind::If {
                cond,
                then,
                otherwise,
            },
            span,
            TypeDesc::VOID,
        ))
    }

    /// Loop body with `label` registered as a jump target.
    fn loop_body(&mut self, label: Option<&String>) -> CResult<NodeId> {
        self.cs.push_loop(LoopCtx {
            label: label.cloned(),
            is_switch: false,
        });
        let body = self.statement();
        self.cs.pop_loop();
        body
    }

    fn while_stmt(&mut self, label: Option<String>) -> CResult<NodeId> {
        let start = self.cur.bump().span;
        let cond = self.condition()?;
        let body = self.loop_body(label.as_ref())?;
        let span = start.merge(self.cur.previous_span());
        Ok(self
            .code
            .push(NodeKind::While { label, cond, body }, span, TypeDesc::VOID))
    }

    fn do_stmt(&mut self, label: Option<String>) -> CResult<NodeId> {
        let start = self.cur.bump().span;
        let body = self.loop_body(label.as_ref())?;
        self.expect(Kw::While, CompileErrorKind::NoExpression)?;
        let cond = self.condition()?;
        self.expect(Kw::Semicolon, CompileErrorKind::NoTerminator)?;
        let span = start.merge(self.cur.previous_span());
        Ok(self
            .code
            .push(NodeKind::DoWhile { label, body, cond }, span, TypeDesc::VOID))
    }

    fn for_stmt(&mut self, label: Option<String>) -> CResult<NodeId> {
        let start = self.cur.bump().span;
        self.expect(Kw::OpenPar, CompileErrorKind::OpenPar)?;
        self.cs.push_scope();

        let init = if self.cur.check(Kw::Semicolon) {
            None
        } else if self.at_declaration() {
            Some(self.declaration()?)
        } else {
            Some(self.expression_list()?)
        };
        self.expect(Kw::Semicolon, CompileErrorKind::NoTerminator)?;

        let cond = if self.cur.check(Kw::Semicolon) {
            None
        } else {
            Some(self.boolean_expression()?)
        };
        self.expect(Kw::Semicolon, CompileErrorKind::NoTerminator)?;

        let step = if self.cur.check(Kw::ClosePar) {
            None
        } else {
            Some(self.expression_list()?)
        };
        self.expect(Kw::ClosePar, CompileErrorKind::ClosePar)?;

        let body = self.loop_body(label.as_ref())?;
        self.cs.pop_scope();
        let span = start.merge(self.cur.previous_span());
        Ok(self.code.push(
            NodeKind::For {
                label,
                init,
                cond,
                step,
                body,
            },
            span,
            TypeDesc::VOID,
        ))
    }

    /// `a, b++, c = 1` as a block of discarded expressions.
    fn expression_list(&mut self) -> CResult<NodeId> {
        let mut stmts = vec![self.expression_statement()?];
        while self.cur.eat(Kw::Comma) {
            stmts.push(self.expression_statement()?);
        }
        if stmts.len() == 1 {
            return Ok(stmts[0]);
        }
        let span = self.code.span(stmts[0]).merge(self.cur.previous_span());
        Ok(self.code.push(
            NodeKind::Block {
                stmts,
                scope: false,
            },
            span,
            TypeDesc::VOID,
        ))
    }

    fn repeat_stmt(&mut self, label: Option<String>) -> CResult<NodeId> {
        let start = self.cur.bump().span;
        self.expect(Kw::OpenPar, CompileErrorKind::OpenPar)?;
        let count = self.expression()?;
        if !self.code.ty(count).kind().is_integer() {
            return self.err(CompileErrorKind::BadType1, self.code.span(count));
        }
        self.expect(Kw::ClosePar, CompileErrorKind::ClosePar)?;
        let body = self.loop_body(label.as_ref())?;
        let span = start.merge(self.cur.previous_span());
        Ok(self
            .code
            .push(NodeKind::Repeat { label, count, body }, span, TypeDesc::VOID))
    }

    fn switch_stmt(&mut self) -> CResult<NodeId> {
        let start = self.cur.bump().span;
        self.expect(Kw::OpenPar, CompileErrorKind::OpenPar)?;
        let value = self.expression()?;
        let vty = self.code.ty(value).kind();
        let is_string = vty == TypeKind::String;
        if !is_string && !vty.is_integer() {
            return self.err(CompileErrorKind::BadType1, self.code.span(value));
        }
        self.expect(Kw::ClosePar, CompileErrorKind::ClosePar)?;
        self.expect(Kw::OpenBlk, CompileErrorKind::OpenBlock)?;

        self.cs.push_scope();
        self.cs.push_loop(LoopCtx {
            label: None,
            is_switch: true,
        });
        let mut cases: Vec<SwitchCase> = Vec::new();
        let mut default = None;
        let mut body = Vec::new();
        while !self.cur.check(Kw::CloseBlk) {
            let token = self.cur.current();
            match token.kw {
                Some(Kw::Case) => {
                    self.cur.bump();
                    let (lit, span) = self.default_value()?;
                    let value = match (lit, is_string) {
                        (Literal::Str(s), true) => CaseValue::Str(s),
                        (lit, false) => match lit.as_i64() {
                            Some(v) => CaseValue::Int(v),
                            None => return self.err(CompileErrorKind::BadNum, span),
                        },
                        (_, true) => return self.err(CompileErrorKind::BadString, span),
                    };
                    if cases.iter().any(|c| c.value == value) {
                        return self.err(CompileErrorKind::RedefCase, span);
                    }
                    self.expect(Kw::Colon, CompileErrorKind::NoDoubleDots)?;
                    cases.push(SwitchCase {
                        value,
                        target: body.len(),
                    });
                }
                Some(Kw::Default) => {
                    self.cur.bump();
                    if default.is_some() {
                        return self.err(CompileErrorKind::RedefCase, token.span);
                    }
                    self.expect(Kw::Colon, CompileErrorKind::NoDoubleDots)?;
                    default = Some(body.len());
                }
                _ if self.cur.is_at_end() => {
                    return self.err(CompileErrorKind::CloseBlock, start);
                }
                _ => {
                    if cases.is_empty() && default.is_none() {
                        return self.err(CompileErrorKind::NoCase, token.span);
                    }
                    body.push(self.statement()?);
                }
            }
        }
        let close = self.expect(Kw::CloseBlk, CompileErrorKind::CloseBlock)?;
        self.cs.pop_loop();
        self.cs.pop_scope();
        Ok(self.code.push(
            NodeKind::Switch {
                label: None,
                value,
                cases,
                default,
                body,
            },
            start.merge(close),
            TypeDesc::VOID,
        ))
    }

    fn jump_stmt(&mut self) -> CResult<NodeId> {
        let token = self.cur.bump();
        let is_continue = token.is(Kw::Continue);
        let label = if self.cur.check_ident() {
            Some(self.cur.bump().text.clone())
        } else {
            None
        };
        self.cs
            .check_jump(label.as_deref(), is_continue, token.span)?;
        self.expect(Kw::Semicolon, CompileErrorKind::NoTerminator)?;
        let kind = if is_continue {
            NodeKind::Continue(label)
        } else {
            NodeKind::Break(label)
        };
        Ok(self.code.push(kind, token.span, TypeDesc::VOID))
    }

    fn return_stmt(&mut self) -> CResult<NodeId> {
        let start = self.cur.bump().span;
        let ret = self.body.ret.clone();
        let value = if self.cur.check(Kw::Semicolon) {
            if !ret.is_void() {
                return self.err(CompileErrorKind::NoReturn, start);
            }
            None
        } else {
            let value = self.expression()?;
            let vty = self.code.ty(value).clone();
            let accepted = if ret.is_void() {
                // The value becomes the program's result.
                self.body.is_extern && !vty.is_void()
            } else {
                assignable(&self.env.classes(), &ret, &vty)
            };
            if !accepted {
                return self.err(CompileErrorKind::BadType1, self.code.span(value));
            }
            Some(value)
        };
        self.expect(Kw::Semicolon, CompileErrorKind::NoTerminator)?;
        let span = start.merge(self.cur.previous_span());
        Ok(self.code.push(NodeKind::Return(value), span, TypeDesc::VOID))
    }

    fn throw_stmt(&mut self) -> CResult<NodeId> {
        let start = self.cur.bump().span;
        let value = self.expression()?;
        if !self.code.ty(value).kind().is_integer() {
            return self.err(CompileErrorKind::BadType1, self.code.span(value));
        }
        self.expect(Kw::Semicolon, CompileErrorKind::NoTerminator)?;
        let span = start.merge(self.cur.previous_span());
        Ok(self.code.push(NodeKind::Throw(value), span, TypeDesc::VOID))
    }

    fn try_stmt(&mut self) -> CResult<NodeId> {
        let start = self.cur.bump().span;
        let body = self.block(true)?;
        let mut catches = Vec::new();
        while self.cur.eat(Kw::Catch) {
            self.expect(Kw::OpenPar, CompileErrorKind::OpenPar)?;
            let cond = self.expression()?;
            let kind = self.code.ty(cond).kind();
            if kind != TypeKind::Boolean && !kind.is_integer() {
                return self.err(CompileErrorKind::BadType1, self.code.span(cond));
            }
            self.expect(Kw::ClosePar, CompileErrorKind::ClosePar)?;
            let body = self.block(true)?;
            catches.push(CatchClause { cond, body });
        }
        let finally = if self.cur.eat(Kw::Finally) {
            Some(self.block(true)?)
        } else {
            None
        };
        let span = start.merge(self.cur.previous_span());
        Ok(self.code.push(
            NodeKind::Try {
                body,
                catches,
                finally,
            },
            span,
            TypeDesc::VOID,
        ))
    }
}

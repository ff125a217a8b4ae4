//! Recursive-descent grammar, split by construct.

mod body;
mod call;
mod expr;
mod item;
mod place;
mod stmt;

use cbot_diagnostic::CompileErrorKind;
use cbot_ir::{ClassId, Kw, Literal, Span, TokenType, TokenValue, TypeDesc, TypeKind, NO_LIMIT};

use crate::{CResult, Compiler};

/// Primitive type named by a keyword.
fn primitive(kw: Kw) -> Option<TypeDesc> {
    let kind = match kw {
        Kw::Void => TypeKind::Void,
        Kw::Byte => TypeKind::Byte,
        Kw::Short => TypeKind::Short,
        Kw::Char => TypeKind::Char,
        Kw::Int => TypeKind::Int,
        Kw::Long => TypeKind::Long,
        Kw::Float => TypeKind::Float,
        Kw::Double => TypeKind::Double,
        Kw::Boolean => TypeKind::Boolean,
        Kw::String => TypeKind::String,
        _ => return None,
    };
    Some(TypeDesc::simple(kind))
}

impl Compiler<'_> {
    /// A class this unit may name: its own, host classes, and public ones.
    pub(crate) fn visible_class(&self, name: &str) -> Option<ClassId> {
        let classes = self.env.classes();
        let id = classes.by_name(name)?;
        let def = classes.get(id)?;
        let visible = def.public || def.owner.is_none() || def.owner == Some(self.program);
        visible.then_some(id)
    }

    /// Type of a class name used in a declaration.
    pub(crate) fn class_type(&self, class: ClassId) -> TypeDesc {
        let intrinsic = self.env.classes().get(class).is_some_and(|c| c.intrinsic);
        if intrinsic {
            TypeDesc::intrinsic(class)
        } else {
            TypeDesc::pointer(class)
        }
    }

    /// Whether a type starts at the cursor (`int`, `string[]`, `MyClass`).
    pub(crate) fn at_type(&self) -> bool {
        let token = self.cur.current();
        match token.kw {
            Some(kw) => kw.is_type(),
            None => token.ty == TokenType::Identifier && self.visible_class(&token.text).is_some(),
        }
    }

    /// Base type, without trailing `[]`.
    pub(crate) fn base_type(&mut self) -> CResult<TypeDesc> {
        let token = self.cur.current();
        if let Some(ty) = token.kw.and_then(primitive) {
            self.cur.bump();
            return Ok(ty);
        }
        if token.ty == TokenType::Identifier {
            if let Some(class) = self.visible_class(&token.text) {
                self.cur.bump();
                return Ok(self.class_type(class));
            }
            return self.err(CompileErrorKind::UndefClass, token.span);
        }
        self.err(CompileErrorKind::NoType, token.span)
    }

    /// Type with any number of `[]` suffixes.
    pub(crate) fn parse_type(&mut self) -> CResult<TypeDesc> {
        let ty = self.base_type()?;
        Ok(self.array_suffixes(ty))
    }

    /// Wrap `ty` once per `[]` pair at the cursor.
    pub(crate) fn array_suffixes(&mut self, mut ty: TypeDesc) -> TypeDesc {
        while self.cur.check(Kw::OpenBracket) && self.cur.peek(1).is(Kw::CloseBracket) {
            self.cur.bump();
            self.cur.bump();
            ty = TypeDesc::array(ty, NO_LIMIT);
        }
        ty
    }

    /// An identifier, or `err` at the current token.
    pub(crate) fn ident(&mut self, err: CompileErrorKind) -> CResult<(String, Span)> {
        let token = self.cur.current();
        if token.ty == TokenType::Identifier {
            self.cur.bump();
            Ok((token.text.clone(), token.span))
        } else {
            self.err(err, token.span)
        }
    }

    /// Literal token at the cursor, without sign.
    pub(crate) fn literal_token(&mut self) -> Option<(Literal, Span)> {
        let token = self.cur.current();
        let lit = match (token.ty, &token.value) {
            (TokenType::Number | TokenType::DefinedNum, TokenValue::Int(v)) => {
                match i32::try_from(*v) {
                    Ok(v) => Literal::Int(v),
                    Err(_) => Literal::Long(*v),
                }
            }
            (TokenType::Number, TokenValue::Float(v)) => Literal::Float(*v as f32),
            (TokenType::String, _) => Literal::Str(token.text.clone()),
            (TokenType::Char, TokenValue::Char(c)) => Literal::Char(*c),
            (TokenType::Keyword, _) => match token.kw {
                Some(Kw::True) => Literal::Bool(true),
                Some(Kw::False) => Literal::Bool(false),
                Some(Kw::Null) => Literal::Null,
                Some(Kw::Nan) => Literal::Nan,
                _ => return None,
            },
            _ => return None,
        };
        self.cur.bump();
        Some((lit, token.span))
    }

    /// Literal-only sub-compiler used for parameter defaults: an optional
    /// `-`, `!`/`not` or `~` followed by a literal.
    pub(crate) fn default_value(&mut self) -> CResult<(Literal, Span)> {
        let start = self.cur.span();
        let sign = self.cur.current().kw.filter(|kw| {
            matches!(kw, Kw::Sub | Kw::Not | Kw::TxtNot | Kw::BitNot)
        });
        if sign.is_some() {
            self.cur.bump();
        }
        let Some((lit, span)) = self.literal_token() else {
            return self.err(CompileErrorKind::DefaultValue, self.cur.span());
        };
        let span = start.merge(span);
        let folded = match (sign, lit) {
            (None, lit) => Some(lit),
            (Some(Kw::Sub), Literal::Int(v)) => Some(Literal::Int(v.wrapping_neg())),
            (Some(Kw::Sub), Literal::Long(v)) => Some(Literal::Long(v.wrapping_neg())),
            (Some(Kw::Sub), Literal::Float(v)) => Some(Literal::Float(-v)),
            (Some(Kw::Sub), Literal::Double(v)) => Some(Literal::Double(-v)),
            (Some(Kw::Not | Kw::TxtNot), Literal::Bool(b)) => Some(Literal::Bool(!b)),
            (Some(Kw::BitNot), Literal::Int(v)) => Some(Literal::Int(!v)),
            (Some(Kw::BitNot), Literal::Long(v)) => Some(Literal::Long(!v)),
            _ => None,
        };
        match folded {
            Some(lit) => Ok((lit, span)),
            None => self.err(CompileErrorKind::DefaultValue, span),
        }
    }
}

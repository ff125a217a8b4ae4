use super::*;
use pretty_assertions::assert_eq;
use crate::Kw;

#[test]
fn access_operands_follow_evaluation_order() {
    let access = Access {
        root: AccessRoot::Value(NodeId::new(4)),
        steps: vec![
            AccessStep::Index(NodeId::new(7)),
            AccessStep::Field {
                class: ClassId::new(1),
                index: 2,
            },
            AccessStep::Index(NodeId::new(9)),
        ],
    };
    assert_eq!(
        access.operands(),
        vec![NodeId::new(4), NodeId::new(7), NodeId::new(9)]
    );
    assert!(Access::local(3).operands().is_empty());
}

#[test]
fn literal_types() {
    assert_eq!(Literal::Int(1).ty(), TypeDesc::INT);
    assert_eq!(Literal::Long(1).ty(), TypeDesc::LONG);
    assert_eq!(Literal::Nan.ty(), TypeDesc::FLOAT);
    assert_eq!(Literal::Str("a".into()).ty(), TypeDesc::STRING);
    assert_eq!(Literal::Char('A').as_i64(), Some(65));
    assert_eq!(Literal::Bool(true).as_i64(), None);
}

#[test]
fn binary_operator_tokens() {
    assert_eq!(BinaryOp::from_kw(Kw::TxtAnd), Some(BinaryOp::LogAnd));
    assert_eq!(BinaryOp::from_kw(Kw::Sr), Some(BinaryOp::Sr));
    assert_eq!(BinaryOp::from_kw(Kw::Assign), None);
    assert_eq!(BinaryOp::from_assign(Kw::AssAsr), Some(BinaryOp::Asr));
    assert!(BinaryOp::Ne.is_comparison());
    assert!(!BinaryOp::And.is_short_circuit());
    assert_eq!(UnaryOp::from_kw(Kw::TxtNot), Some(UnaryOp::Not));
}

#[test]
fn loop_labels_and_scopes() {
    let body = NodeId::new(0);
    let kind = NodeKind::While {
        label: Some("outer".into()),
        cond: body,
        body,
    };
    assert_eq!(kind.loop_label(), Some(Some("outer")));
    assert!(NodeKind::Break(None).loop_label().is_none());
    assert!(NodeKind::Block {
        stmts: vec![],
        scope: true
    }
    .is_scope());
    assert!(!NodeKind::Block {
        stmts: vec![],
        scope: false
    }
    .is_scope());
}

#[test]
fn function_entry_slot_fills_and_clears() {
    let sig = Signature {
        name: "f".into(),
        params: vec![Param {
            name: "x".into(),
            ty: TypeDesc::INT,
            default: Some(Literal::Int(1)),
            span: Span::DUMMY,
        }],
        ret: TypeDesc::VOID,
        flags: FnFlags::EXTERN,
        protection: Protection::Public,
        span: Span::DUMMY,
    };
    assert_eq!(sig.required(), 0);
    assert!(sig.is_void());

    let entry = FunctionEntry::new("f(int)".into(), sig, 1);
    assert!(entry.code().is_none());
    let code = Rc::new(Code {
        key: "f(int)".into(),
        name: "f".into(),
        nodes: vec![Node {
            kind: NodeKind::Block {
                stmts: vec![],
                scope: true,
            },
            span: Span::DUMMY,
            ty: TypeDesc::VOID,
        }],
        root: NodeId::new(0),
        params: vec![],
        ret: TypeDesc::VOID,
        class: None,
        has_this: false,
        synchronized: false,
        span: Span::DUMMY,
    });
    *entry.code.borrow_mut() = Some(code);
    assert!(entry.code().is_some());
    entry.code.borrow_mut().take();
    assert!(entry.code().is_none());
}

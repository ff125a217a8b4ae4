use super::*;
use pretty_assertions::assert_eq;

use cbot_ir::{NodeKind, TypeDesc};

fn code(name: &str) -> Rc<Code> {
    let block = |stmts: Vec<NodeId>, start| Node {
        kind: NodeKind::Block { stmts, scope: true },
        span: Span::new(start, start + 4),
        ty: TypeDesc::VOID,
    };
    Rc::new(Code {
        key: format!("{name}()"),
        name: name.to_owned(),
        nodes: vec![
            block(vec![NodeId::new(1)], 0),
            Node {
                kind: NodeKind::Break(None),
                span: Span::new(10, 15),
                ty: TypeDesc::VOID,
            },
        ],
        root: NodeId::new(0),
        params: Vec::new(),
        ret: TypeDesc::VOID,
        class: None,
        has_this: false,
        synchronized: false,
        span: Span::new(0, 20),
    })
}

#[test]
fn block_kinds_round_trip_through_u8() {
    for kind in [BlockKind::Instruction, BlockKind::Block, BlockKind::Function] {
        assert_eq!(BlockKind::from_u8(kind as u8), Some(kind));
    }
    assert_eq!(BlockKind::from_u8(3), None);
}

#[test]
fn scoping_nodes_get_block_frames() {
    let code = code("main");
    assert_eq!(Frame::new(Rc::clone(&code), NodeId::new(0)).block, BlockKind::Block);
    assert_eq!(Frame::new(Rc::clone(&code), NodeId::new(1)).block, BlockKind::Instruction);
    assert_eq!(Frame::function(code, Vec::new()).block, BlockKind::Function);
}

#[test]
fn redeclaring_a_local_replaces_it() {
    let mut frame = Frame::function(code("main"), Vec::new());
    frame.declare(Variable::int(1).with_ident(4));
    frame.declare(Variable::int(2).with_ident(5));
    frame.declare(Variable::int(3).with_ident(4));
    assert_eq!(frame.locals.len(), 2);
    assert_eq!(frame.locals[0].as_i64(), Some(3));
    assert_eq!(frame.local(5), Some(1));
}

#[test]
fn call_stack_reports_innermost_instruction_per_function() {
    let outer = code("main");
    let inner = code("helper");
    let mut stack = ExecStack::new(Frame::function(Rc::clone(&outer), Vec::new()));
    stack.frames.push(Frame::new(outer, NodeId::new(1)));
    stack.frames.push(Frame::function(Rc::clone(&inner), Vec::new()));
    stack.frames.push(Frame::new(inner, NodeId::new(1)));

    let calls = stack.call_stack();
    assert_eq!(
        calls,
        vec![
            ("main".to_owned(), Span::new(10, 15)),
            ("helper".to_owned(), Span::new(10, 15)),
        ]
    );
    assert_eq!(stack.position().map(|p| p.0), Some("helper".to_owned()));
}

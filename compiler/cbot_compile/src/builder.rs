//! Node arena of the body being compiled.

use cbot_ir::{Node, NodeId, NodeKind, Span, TypeDesc};

#[derive(Debug, Default)]
pub struct CodeBuilder {
    nodes: Vec<Node>,
}

impl CodeBuilder {
    pub fn new() -> Self {
        CodeBuilder::default()
    }

    pub fn push(&mut self, kind: NodeKind, span: Span, ty: TypeDesc) -> NodeId {
        let id = NodeId::new(self.nodes.len() as u32);
        self.nodes.push(Node { kind, span, ty });
        id
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    #[inline]
    pub fn ty(&self, id: NodeId) -> &TypeDesc {
        &self.nodes[id.index()].ty
    }

    #[inline]
    pub fn span(&self, id: NodeId) -> Span {
        self.nodes[id.index()].span
    }

    /// Hand the nodes over and start empty.
    pub fn take(&mut self) -> Vec<Node> {
        std::mem::take(&mut self.nodes)
    }
}

use super::op::ExprOp;
use super::value::{Input, ValueType};
use crate::id::ExprId;

/// One pure node: an operator applied to fixed operands.
///
/// Nodes are never mutated after creation; only the values flowing into
/// their plug operands change between evaluations.
#[derive(Debug, Clone)]
pub struct ExprNode {
    pub op: ExprOp,
    pub inputs: Vec<Input>,
    pub outputs: Vec<ValueType>,
}

/// Append-only store of expression nodes.
///
/// A node can only reference plugs that already exist when it is created,
/// so the expression part of the graph is acyclic by construction.
#[derive(Debug, Clone, Default)]
pub struct ExpressionGraph {
    nodes: Vec<ExprNode>,
}

impl ExpressionGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, node: ExprNode) -> ExprId {
        let id = ExprId::from_index(self.nodes.len());
        self.nodes.push(node);
        id
    }

    pub(crate) fn truncate(&mut self, len: usize) {
        self.nodes.truncate(len);
    }

    pub fn node(&self, id: ExprId) -> Option<&ExprNode> {
        self.nodes.get(id.index())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ExprId, &ExprNode)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (ExprId::from_index(i), node))
    }
}

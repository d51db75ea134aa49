use crate::error::{RigError, RigResult};
use crate::id::NodeId;
use crate::math::Transform;

#[derive(Debug, Clone)]
pub struct TransformNode {
    pub name: String,
    pub parent: Option<NodeId>,
    /// Sorted by creation order, whatever order they were attached in.
    pub children: Vec<NodeId>,
    /// Rest value of the local channels; drivers override it on evaluation.
    pub local: Transform,
}

/// Ownership tree of transform nodes.
#[derive(Debug, Clone, Default)]
pub struct TransformGraph {
    nodes: Vec<TransformNode>,
}

impl TransformGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(
        &mut self,
        name: impl Into<String>,
        parent: Option<NodeId>,
        local: Transform,
    ) -> RigResult<NodeId> {
        if let Some(parent) = parent {
            self.get(parent)?;
        }
        let id = NodeId::from_index(self.nodes.len());
        self.nodes.push(TransformNode {
            name: name.into(),
            parent,
            children: Vec::new(),
            local,
        });
        if let Some(parent) = parent {
            self.nodes[parent.index()].children.push(id);
        }
        Ok(id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.index() < self.nodes.len()
    }

    pub fn node(&self, id: NodeId) -> Option<&TransformNode> {
        self.nodes.get(id.index())
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> RigResult<&mut TransformNode> {
        self.nodes
            .get_mut(id.index())
            .ok_or_else(|| RigError::MissingReference(format!("transform {id}")))
    }

    pub fn get(&self, id: NodeId) -> RigResult<&TransformNode> {
        self.node(id)
            .ok_or_else(|| RigError::MissingReference(format!("transform {id}")))
    }

    pub fn name(&self, id: NodeId) -> &str {
        self.node(id).map(|n| n.name.as_str()).unwrap_or("<missing>")
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = self.parent(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// `root` followed by its descendants, depth first in creation order.
    pub fn subtree(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.children(id).iter().rev());
        }
        out
    }

    /// Re-links `child` under `parent` without touching local values.
    pub(crate) fn set_parent(&mut self, child: NodeId, parent: Option<NodeId>) -> RigResult<()> {
        self.get(child)?;
        if let Some(parent) = parent {
            self.get(parent)?;
            if parent == child || self.is_ancestor(child, parent) {
                return Err(RigError::CyclicConnection {
                    from: self.name(parent).to_string(),
                    to: self.name(child).to_string(),
                });
            }
        }

        if let Some(old) = self.parent(child) {
            self.nodes[old.index()].children.retain(|c| *c != child);
        }
        self.nodes[child.index()].parent = parent;
        if let Some(parent) = parent {
            let children = &mut self.nodes[parent.index()].children;
            let at = children.partition_point(|c| *c < child);
            children.insert(at, child);
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &TransformNode)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (NodeId::from_index(i), node))
    }
}

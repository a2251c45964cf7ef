use crate::foundation::error::{StitchError, StitchResult};

/// Predecessor map rooted at a reference node.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct SpanningTree {
    root: usize,
    parents: Vec<Option<usize>>,
}

impl SpanningTree {
    /// Wrap a predecessor map; the root must have no parent.
    pub fn new(root: usize, parents: Vec<Option<usize>>) -> StitchResult<Self> {
        if root >= parents.len() || parents[root].is_some() {
            return Err(StitchError::configuration(format!(
                "invalid spanning tree root {root}"
            )));
        }
        if let Some(bad) = parents
            .iter()
            .enumerate()
            .find(|(i, p)| p.is_some_and(|p| p >= parents.len() || p == *i))
        {
            return Err(StitchError::Other(anyhow::anyhow!(
                "node {} has an invalid parent",
                bad.0
            )));
        }
        Ok(Self { root, parents })
    }

    /// Root node.
    pub fn root(&self) -> usize {
        self.root
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.parents.len()
    }

    /// Whether the tree has no nodes.
    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }

    /// Parent of `node`; `None` for the root and for unreachable nodes.
    pub fn parent(&self, node: usize) -> Option<usize> {
        self.parents.get(node).copied().flatten()
    }

    /// The raw predecessor map.
    pub fn parents(&self) -> &[Option<usize>] {
        &self.parents
    }

    /// Preorder depth-first walk from the root, children visited in ascending index.
    /// Nodes not attached to the root are omitted.
    pub fn depth_first_order(&self) -> Vec<usize> {
        let n = self.len();
        let mut children = vec![Vec::new(); n];
        for (node, parent) in self.parents.iter().enumerate() {
            if let Some(p) = parent {
                children[*p].push(node);
            }
        }

        let mut order = Vec::with_capacity(n);
        let mut visited = vec![false; n];
        let mut stack = vec![self.root];
        while let Some(node) = stack.pop() {
            if visited[node] {
                continue;
            }
            visited[node] = true;
            order.push(node);
            // Reverse push so the smallest child is popped first.
            for &c in children[node].iter().rev() {
                if !visited[c] {
                    stack.push(c);
                }
            }
        }
        order
    }

    /// Painter's order: the depth-first order reversed, so the root is drawn last.
    pub fn draw_order(&self) -> Vec<usize> {
        let mut order = self.depth_first_order();
        order.reverse();
        order
    }
}

#[cfg(test)]
#[path = "../../tests/unit/graph/tree.rs"]
mod tests;

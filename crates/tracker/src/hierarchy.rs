//! Parent/child/sibling topology of the contours found in one mask.
//!
//! The hierarchy is a forest stored as a frame-local arena: node `i` describes
//! contour `i`. Every constructor validates the links, so a `ContourHierarchy`
//! value always has acyclic, terminating sibling chains. Traversals still bound
//! their walks and report [`HierarchyError::SiblingCycle`] instead of spinning.

use crate::error::HierarchyError;

/// Links of one contour. `None` means the link is absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HierarchyNode {
    pub next: Option<usize>,
    pub prev: Option<usize>,
    pub first_child: Option<usize>,
    pub parent: Option<usize>,
}

impl HierarchyNode {
    pub fn is_top_level(&self) -> bool {
        self.parent.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContourHierarchy {
    nodes: Vec<HierarchyNode>,
    first_root: Option<usize>,
}

impl ContourHierarchy {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build the forest from each contour's parent, chaining siblings in index order.
    pub fn from_parents(parents: &[Option<usize>]) -> Result<Self, HierarchyError> {
        let len = parents.len();
        let mut nodes = vec![HierarchyNode::default(); len];
        let mut last_child: Vec<Option<usize>> = vec![None; len];
        let mut first_root = None;
        let mut last_root: Option<usize> = None;

        for (idx, parent) in parents.iter().copied().enumerate() {
            let tail = match parent {
                Some(p) if p >= len => {
                    return Err(HierarchyError::DanglingLink { from: idx, to: p, len });
                }
                Some(p) => {
                    nodes[idx].parent = Some(p);
                    if nodes[p].first_child.is_none() {
                        nodes[p].first_child = Some(idx);
                    }
                    last_child[p].replace(idx)
                }
                None => {
                    if first_root.is_none() {
                        first_root = Some(idx);
                    }
                    last_root.replace(idx)
                }
            };
            if let Some(prev) = tail {
                nodes[prev].next = Some(idx);
                nodes[idx].prev = Some(prev);
            }
        }

        Self::from_nodes(nodes, first_root)
    }

    /// Adopt externally built links after checking them.
    pub fn from_nodes(
        nodes: Vec<HierarchyNode>,
        first_root: Option<usize>,
    ) -> Result<Self, HierarchyError> {
        let hierarchy = Self { nodes, first_root };
        hierarchy.validate()?;
        Ok(hierarchy)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, idx: usize) -> Option<&HierarchyNode> {
        self.nodes.get(idx)
    }

    pub fn nodes(&self) -> &[HierarchyNode] {
        &self.nodes
    }

    pub fn first_root(&self) -> Option<usize> {
        self.first_root
    }

    /// Walk the `next` links starting at `start` (inclusive).
    pub fn siblings(&self, start: Option<usize>) -> Siblings<'_> {
        Siblings {
            nodes: &self.nodes,
            current: start,
            steps: 0,
            done: false,
        }
    }

    /// Top-level contours, first root onwards.
    pub fn roots(&self) -> Siblings<'_> {
        self.siblings(self.first_root)
    }

    pub fn children(&self, idx: usize) -> Siblings<'_> {
        self.siblings(self.nodes.get(idx).and_then(|n| n.first_child))
    }

    fn validate(&self) -> Result<(), HierarchyError> {
        let len = self.nodes.len();
        let in_range = |from: usize, to: Option<usize>| match to {
            Some(to) if to >= len => Err(HierarchyError::DanglingLink { from, to, len }),
            _ => Ok(()),
        };

        in_range(0, self.first_root)?;
        if let Some(root) = self.first_root {
            let node = &self.nodes[root];
            if node.parent.is_some() || node.prev.is_some() {
                return Err(HierarchyError::Unreachable(root));
            }
        }

        for (idx, node) in self.nodes.iter().enumerate() {
            in_range(idx, node.next)?;
            in_range(idx, node.prev)?;
            in_range(idx, node.first_child)?;
            in_range(idx, node.parent)?;

            if let Some(next) = node.next {
                let other = &self.nodes[next];
                if other.prev != Some(idx) || other.parent != node.parent {
                    return Err(HierarchyError::BrokenBackLink { from: idx, to: next });
                }
            }
            if let Some(prev) = node.prev {
                if self.nodes[prev].next != Some(idx) {
                    return Err(HierarchyError::BrokenBackLink { from: idx, to: prev });
                }
            }
            if let Some(child) = node.first_child {
                let other = &self.nodes[child];
                if other.parent != Some(idx) || other.prev.is_some() {
                    return Err(HierarchyError::BrokenBackLink { from: idx, to: child });
                }
            }
        }

        // Every node must be visited exactly once when walking the forest.
        let mut seen = vec![false; len];
        let mut heads = vec![self.first_root];
        while let Some(head) = heads.pop() {
            let mut current = head;
            while let Some(idx) = current {
                if seen[idx] {
                    return Err(HierarchyError::SiblingCycle(idx));
                }
                seen[idx] = true;
                heads.push(self.nodes[idx].first_child);
                current = self.nodes[idx].next;
            }
        }
        match seen.iter().position(|visited| !visited) {
            Some(idx) => Err(HierarchyError::Unreachable(idx)),
            None => Ok(()),
        }
    }
}

/// Iterator over a sibling chain. Yields an error and stops if the chain is
/// longer than the arena or leaves it.
pub struct Siblings<'a> {
    nodes: &'a [HierarchyNode],
    current: Option<usize>,
    steps: usize,
    done: bool,
}

impl Iterator for Siblings<'_> {
    type Item = Result<usize, HierarchyError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let idx = self.current?;
        let Some(node) = self.nodes.get(idx) else {
            self.done = true;
            return Some(Err(HierarchyError::DanglingLink {
                from: idx,
                to: idx,
                len: self.nodes.len(),
            }));
        };
        if self.steps >= self.nodes.len() {
            self.done = true;
            return Some(Err(HierarchyError::SiblingCycle(idx)));
        }
        self.steps += 1;
        self.current = node.next;
        Some(Ok(idx))
    }
}

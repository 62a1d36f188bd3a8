//! Boundary points and document-order comparison.

use std::cmp::Ordering;

use crate::error::RangeError;
use crate::tree::{NodeId, Tree};

/// One end of a range: a container node plus an offset into it.
///
/// For character-data containers the offset counts characters; for every
/// other kind it counts children. Valid offsets run from 0 through the
/// container's length inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundaryPoint {
    pub container: NodeId,
    pub offset: usize,
}

impl BoundaryPoint {
    pub fn new(container: NodeId, offset: usize) -> Self {
        Self { container, offset }
    }

    /// A boundary is valid while its container sits under a document or
    /// fragment root and its offset still fits the container.
    pub fn is_valid(&self, tree: &Tree) -> bool {
        !tree.is_orphan(self.container) && self.offset <= tree.node_length(self.container)
    }

    pub(crate) fn check_valid(&self, tree: &Tree, which: &str) -> Result<(), RangeError> {
        if tree.is_orphan(self.container) {
            return Err(RangeError::stale(format!(
                "{which} container {} is orphaned",
                tree.inspect_node(self.container)
            )));
        }
        let length = tree.node_length(self.container);
        if self.offset > length {
            return Err(RangeError::stale(format!(
                "{which} offset {} exceeds container length {length}",
                self.offset
            )));
        }
        Ok(())
    }
}

/// Check an offset supplied by the caller against the container's length.
pub(crate) fn assert_valid_offset(
    tree: &Tree,
    node: NodeId,
    offset: usize,
) -> Result<(), RangeError> {
    let length = tree.node_length(node);
    if offset > length {
        return Err(RangeError::IndexSize { offset, length });
    }
    Ok(())
}

/// A boundary container may not be, or live under, a doctype.
pub(crate) fn assert_no_doctype_ancestor(tree: &Tree, node: NodeId) -> Result<(), RangeError> {
    if let Some(doctype) = tree.doctype_ancestor(node, true) {
        return Err(RangeError::node_type(format!(
            "boundary may not lie within {}",
            tree.inspect_node(doctype)
        )));
    }
    Ok(())
}

/// Compare two boundary points in document order.
///
/// Four cases: same container, one container inside the other (either way),
/// and disjoint containers resolved through their common ancestor. Points in
/// unrelated trees yield [`RangeError::WrongDocument`].
pub fn compare_points(
    tree: &Tree,
    node_a: NodeId,
    offset_a: usize,
    node_b: NodeId,
    offset_b: usize,
) -> Result<Ordering, RangeError> {
    if node_a == node_b {
        return Ok(offset_a.cmp(&offset_b));
    }
    if tree.is_ancestor_of(node_a, node_b, false) {
        // B is inside A: compare A's offset with the index of the child of A
        // on the path down to B.
        let child = tree
            .closest_ancestor_in(node_b, node_a, true)
            .expect("ancestry was just established");
        let child_index = tree.node_index(child);
        return Ok(if offset_a <= child_index {
            Ordering::Less
        } else {
            Ordering::Greater
        });
    }
    if tree.is_ancestor_of(node_b, node_a, false) {
        let child = tree
            .closest_ancestor_in(node_a, node_b, true)
            .expect("ancestry was just established");
        let child_index = tree.node_index(child);
        return Ok(if child_index < offset_b {
            Ordering::Less
        } else {
            Ordering::Greater
        });
    }
    // Disjoint containers: order the children of the common ancestor that
    // lead toward each point.
    let root = tree
        .common_ancestor(node_a, node_b)
        .ok_or(RangeError::WrongDocument)?;
    let child_a = if node_a == root {
        root
    } else {
        tree.closest_ancestor_in(node_a, root, true)
            .expect("node_a descends from root")
    };
    let child_b = if node_b == root {
        root
    } else {
        tree.closest_ancestor_in(node_b, root, true)
            .expect("node_b descends from root")
    };
    if child_a == child_b {
        // Can only happen for malformed input; treat as equal.
        return Ok(Ordering::Equal);
    }
    for &child in tree.children(root) {
        if child == child_a {
            return Ok(Ordering::Less);
        }
        if child == child_b {
            return Ok(Ordering::Greater);
        }
    }
    Err(RangeError::WrongDocument)
}

/// The boundary immediately before a node within its parent.
pub fn boundary_before(tree: &Tree, node: NodeId) -> Result<BoundaryPoint, RangeError> {
    let parent = tree.parent(node).ok_or_else(|| {
        RangeError::not_found(format!("{} has no parent", tree.inspect_node(node)))
    })?;
    Ok(BoundaryPoint::new(parent, tree.node_index(node)))
}

/// The boundary immediately after a node within its parent.
pub fn boundary_after(tree: &Tree, node: NodeId) -> Result<BoundaryPoint, RangeError> {
    let parent = tree.parent(node).ok_or_else(|| {
        RangeError::not_found(format!("{} has no parent", tree.inspect_node(node)))
    })?;
    Ok(BoundaryPoint::new(parent, tree.node_index(node) + 1))
}

//! Iteration over the nodes a range touches.
//!
//! [`RangeIterator`] walks the top-level nodes between the boundaries: the
//! children of the common ancestor that the range covers, clipped at each
//! end. Partially selected subtrees are descended into through
//! [`RangeIterator::subtree_iterator`], which yields a fresh iterator over
//! the clipped sub-range. Boundary character-data nodes are yielded whole;
//! consumers that care about the in-range slice clip against the range's
//! own boundaries.

use log::trace;

use crate::error::RangeError;
use crate::ranges::range::Range;
use crate::tree::{NodeId, NodeKind, Tree};

pub struct RangeIterator {
    sc: NodeId,
    so: usize,
    ec: NodeId,
    eo: usize,
    collapsed: bool,
    single_character_data: bool,
    first: Option<NodeId>,
    last: Option<NodeId>,
    next: Option<NodeId>,
    current: Option<NodeId>,
}

impl RangeIterator {
    pub fn new(tree: &Tree, range: &Range) -> Result<Self, RangeError> {
        range.assert_valid(tree)?;
        let sc = range.start_container();
        let so = range.start_offset();
        let ec = range.end_container();
        let eo = range.end_offset();
        let mut iter = Self {
            sc,
            so,
            ec,
            eo,
            collapsed: range.collapsed(),
            single_character_data: false,
            first: None,
            last: None,
            next: None,
            current: None,
        };
        if !iter.collapsed {
            let root = range.common_ancestor();
            if sc == ec && tree.kind(sc).is_character_data() {
                iter.single_character_data = true;
                iter.first = Some(sc);
                iter.last = Some(sc);
                iter.next = Some(sc);
            } else {
                iter.first = if sc == root && !tree.kind(sc).is_character_data() {
                    tree.children(sc).get(so).copied()
                } else {
                    tree.closest_ancestor_in(sc, root, true)
                };
                iter.last = if ec == root && !tree.kind(ec).is_character_data() {
                    tree.children(ec).get(eo.wrapping_sub(1)).copied()
                } else {
                    tree.closest_ancestor_in(ec, root, true)
                };
                iter.next = iter.first;
            }
            trace!(
                "iterator over {} first={:?} last={:?}",
                range.inspect(tree),
                iter.first,
                iter.last
            );
        }
        Ok(iter)
    }

    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }

    pub(crate) fn first(&self) -> Option<NodeId> {
        self.first
    }

    pub(crate) fn last(&self) -> Option<NodeId> {
        self.last
    }

    pub fn current(&self) -> Option<NodeId> {
        self.current
    }

    /// Advance to the next top-level node. The following sibling is captured
    /// now, so the caller may remove the returned node before continuing.
    pub fn next(&mut self, tree: &Tree) -> Option<NodeId> {
        self.current = self.next;
        if let Some(current) = self.current {
            self.next = if Some(current) != self.last {
                tree.next_sibling(current)
            } else {
                None
            };
        }
        self.current
    }

    /// Rewind to before the first node.
    pub fn reset(&mut self) {
        self.current = None;
        self.next = self.first;
    }

    /// Remove the in-range portion of the current node: the whole node when
    /// fully covered, or just the covered characters of a boundary
    /// character-data node.
    pub fn remove(&mut self, tree: &mut Tree) {
        let Some(current) = self.current else {
            return;
        };
        if tree.kind(current).is_character_data() && (current == self.sc || current == self.ec) {
            let start = if current == self.sc { self.so } else { 0 };
            let end = if current == self.ec {
                self.eo
            } else {
                tree.node_length(current)
            };
            if start != end {
                tree.delete_data(current, start, end);
            }
        } else if tree.parent(current).is_some() {
            tree.detach(current);
        }
    }

    /// Whether a node is one of the boundary containers.
    pub(crate) fn is_boundary(&self, node: NodeId) -> bool {
        node == self.sc || node == self.ec
    }

    /// Covered character span of a boundary character-data node.
    pub(crate) fn character_span(&self, tree: &Tree, node: NodeId) -> (usize, usize) {
        let from = if node == self.sc { self.so } else { 0 };
        let to = if node == self.ec {
            self.eo
        } else {
            tree.node_length(node)
        };
        (from, to)
    }

    /// Whether the current node is a non-character-data node that one of the
    /// range boundaries cuts through.
    pub fn is_partially_selected_subtree(&self, tree: &Tree) -> bool {
        let Some(current) = self.current else {
            return false;
        };
        !tree.kind(current).is_character_data()
            && (tree.is_or_is_ancestor_of(current, self.sc)
                || tree.is_or_is_ancestor_of(current, self.ec))
    }

    /// The sub-range covering the in-range portion of the current node.
    pub fn subtree_range(&self, tree: &Tree) -> Result<Range, RangeError> {
        let mut sub = Range::new(tree);
        if self.single_character_data {
            sub.collapse_to_point(tree, self.ec, self.eo)?;
            return Ok(sub);
        }
        let current = self
            .current
            .ok_or_else(|| RangeError::not_found("iterator has no current node"))?;
        let (mut start_node, mut start_offset) = (current, 0);
        let (mut end_node, mut end_offset) = (current, tree.node_length(current));
        if tree.is_or_is_ancestor_of(current, self.sc) {
            start_node = self.sc;
            start_offset = self.so;
        }
        if tree.is_or_is_ancestor_of(current, self.ec) {
            end_node = self.ec;
            end_offset = self.eo;
        }
        sub.set_start_and_end(tree, start_node, start_offset, end_node, end_offset)?;
        Ok(sub)
    }

    /// Iterator over the in-range portion of the current (partially
    /// selected) node.
    pub fn subtree_iterator(&self, tree: &Tree) -> Result<RangeIterator, RangeError> {
        let sub = self.subtree_range(tree)?;
        RangeIterator::new(tree, &sub)
    }
}

impl Range {
    /// Depth-first visit of every node the range touches, boundaries
    /// included. Fully selected nodes are visited with all their
    /// descendants; partially selected subtrees recurse through clipped
    /// sub-iterators. The visitor returns `false` to stop early; the return
    /// value reports whether the walk ran to completion.
    pub fn iterate_subtree(
        &self,
        tree: &Tree,
        visitor: &mut impl FnMut(NodeId) -> bool,
    ) -> Result<bool, RangeError> {
        let mut iter = RangeIterator::new(tree, self)?;
        iterate_with(tree, &mut iter, visitor)
    }

    /// Nodes within the range, filtered by kind and an arbitrary predicate.
    /// An empty `kinds` slice admits every kind. Boundary character-data
    /// nodes that the range merely touches (no characters covered) are
    /// excluded.
    pub fn nodes_in_range(
        &self,
        tree: &Tree,
        kinds: &[NodeKind],
        mut filter: impl FnMut(NodeId) -> bool,
    ) -> Result<Vec<NodeId>, RangeError> {
        let mut nodes = Vec::new();
        self.iterate_subtree(tree, &mut |node| {
            if !kinds.is_empty() && !kinds.contains(&tree.kind(node)) {
                return true;
            }
            if !filter(node) {
                return true;
            }
            if node == self.start.container
                && tree.kind(node).is_character_data()
                && self.start.offset == tree.node_length(node)
            {
                return true;
            }
            if node == self.end.container
                && tree.kind(node).is_character_data()
                && self.end.offset == 0
            {
                return true;
            }
            nodes.push(node);
            true
        })?;
        Ok(nodes)
    }

    /// Concatenated raw text of the range: every covered character of every
    /// text node, without any whitespace or visibility processing.
    pub fn raw_text(&self, tree: &Tree) -> Result<String, RangeError> {
        self.assert_valid(tree)?;
        let sc = self.start.container;
        if sc == self.end.container && tree.kind(sc).is_character_data() {
            return Ok(if tree.kind(sc) == NodeKind::Text {
                tree.substring_data(sc, self.start.offset, self.end.offset)
            } else {
                String::new()
            });
        }
        let mut out = String::new();
        self.iterate_subtree(tree, &mut |node| {
            if tree.kind(node) == NodeKind::Text {
                let from = if node == self.start.container {
                    self.start.offset
                } else {
                    0
                };
                let to = if node == self.end.container {
                    self.end.offset
                } else {
                    tree.char_len(node)
                };
                out.push_str(&tree.substring_data(node, from, to));
            }
            true
        })?;
        Ok(out)
    }

    /// Whether every character of text inside `node` lies within the range.
    pub fn contains_node_text(&self, tree: &Tree, node: NodeId) -> Result<bool, RangeError> {
        let mut node_range = self.clone_range();
        node_range.select_node(tree, node)?;
        let text_nodes = node_range.nodes_in_range(tree, &[NodeKind::Text], |_| true)?;
        match (text_nodes.first().copied(), text_nodes.last().copied()) {
            (Some(first), Some(last)) => {
                node_range.set_start(tree, first, 0)?;
                node_range.set_end(tree, last, tree.node_length(last))?;
                self.contains_range(tree, &node_range)
            }
            _ => self.contains_node_contents(tree, node),
        }
    }
}

fn iterate_with(
    tree: &Tree,
    iter: &mut RangeIterator,
    visitor: &mut impl FnMut(NodeId) -> bool,
) -> Result<bool, RangeError> {
    while let Some(node) = iter.next(tree) {
        if iter.is_partially_selected_subtree(tree) {
            if !visitor(node) {
                return Ok(false);
            }
            let mut sub = iter.subtree_iterator(tree)?;
            if !iterate_with(tree, &mut sub, visitor)? {
                return Ok(false);
            }
        } else if !tree.walk_subtree(node, visitor) {
            return Ok(false);
        }
    }
    Ok(true)
}

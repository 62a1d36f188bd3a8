//! The range type: a pair of boundary points plus derived state.

use std::cmp::Ordering;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::RangeError;
use crate::ranges::boundary::{
    assert_no_doctype_ancestor, assert_valid_offset, boundary_after, boundary_before,
    compare_points, BoundaryPoint,
};
use crate::tree::{NodeId, NodeKind, Tree};

/// Which pair of boundary points [`Range::compare_boundary_points`] compares:
/// this range's boundary first, the other range's second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HowToCompare {
    StartToStart,
    /// This range's start against the other's end.
    StartToEnd,
    EndToEnd,
    /// This range's end against the other's start.
    EndToStart,
}

/// Where a node sits relative to a range, per [`Range::compare_node`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodePosition {
    Before,
    After,
    BeforeAndAfter,
    Inside,
}

/// Raw-character bookmark of a range relative to a container node.
///
/// Offsets count characters of the container's concatenated text content,
/// so a bookmark survives serialization and restores on an unmodified
/// container. It is best effort: structural edits in between invalidate it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    pub start: usize,
    pub end: usize,
    pub container: NodeId,
}

/// A contiguous span of a tree, bounded by a start and an end point with
/// start ≤ end in document order.
///
/// A range holds only node ids; all operations take the [`Tree`] explicitly.
/// Ranges do not observe tree mutation, so an edit made behind a range's
/// back can leave it stale; every operation re-validates its boundaries
/// first and reports [`RangeError::StaleRange`] instead of acting on
/// garbage.
#[derive(Debug, Clone)]
pub struct Range {
    pub(crate) start: BoundaryPoint,
    pub(crate) end: BoundaryPoint,
    pub(crate) common_ancestor: NodeId,
    pub(crate) collapsed: bool,
    pub(crate) detached: bool,
}

impl Range {
    /// A new range collapsed at the start of the tree's root.
    pub fn new(tree: &Tree) -> Self {
        let root = tree.root();
        Self {
            start: BoundaryPoint::new(root, 0),
            end: BoundaryPoint::new(root, 0),
            common_ancestor: root,
            collapsed: true,
            detached: false,
        }
    }

    // ---- accessors ---------------------------------------------------

    pub fn start(&self) -> BoundaryPoint {
        self.start
    }

    pub fn end(&self) -> BoundaryPoint {
        self.end
    }

    pub fn start_container(&self) -> NodeId {
        self.start.container
    }

    pub fn start_offset(&self) -> usize {
        self.start.offset
    }

    pub fn end_container(&self) -> NodeId {
        self.end.container
    }

    pub fn end_offset(&self) -> usize {
        self.end.offset
    }

    /// Deepest node containing both boundary points. Recomputed by every
    /// boundary update.
    pub fn common_ancestor(&self) -> NodeId {
        self.common_ancestor
    }

    pub fn collapsed(&self) -> bool {
        self.collapsed
    }

    /// Root container of the range's boundaries.
    pub fn root(&self, tree: &Tree) -> NodeId {
        tree.root_container(self.start.container)
    }

    pub fn is_detached(&self) -> bool {
        self.detached
    }

    /// Whether both boundaries still point at attached, in-bounds positions.
    pub fn is_valid(&self, tree: &Tree) -> bool {
        !self.detached && self.start.is_valid(tree) && self.end.is_valid(tree)
    }

    /// Render this range for error messages and logs.
    pub fn inspect(&self, tree: &Tree) -> String {
        format!(
            "[{}:{} .. {}:{}]",
            tree.inspect_node(self.start.container),
            self.start.offset,
            tree.inspect_node(self.end.container),
            self.end.offset
        )
    }

    // ---- validity ------------------------------------------------------

    pub(crate) fn assert_not_detached(&self) -> Result<(), RangeError> {
        if self.detached {
            Err(RangeError::InvalidState)
        } else {
            Ok(())
        }
    }

    /// Central guard run by every query and mutation.
    pub(crate) fn assert_valid(&self, tree: &Tree) -> Result<(), RangeError> {
        self.assert_not_detached()?;
        self.start.check_valid(tree, "start")?;
        self.end.check_valid(tree, "end")?;
        Ok(())
    }

    /// Detach the range. Terminal: every later operation fails with
    /// [`RangeError::InvalidState`].
    pub fn detach(&mut self) {
        self.detached = true;
    }

    // ---- boundary updates ------------------------------------------------

    pub(crate) fn update_boundaries(&mut self, tree: &Tree, start: BoundaryPoint, end: BoundaryPoint) {
        self.start = start;
        self.end = end;
        self.collapsed = start == end;
        self.common_ancestor = tree
            .common_ancestor(start.container, end.container)
            .unwrap_or(start.container);
        debug!("boundaries updated to {}", self.inspect(tree));
    }

    fn check_boundary_args(
        &self,
        tree: &Tree,
        node: NodeId,
        offset: usize,
    ) -> Result<(), RangeError> {
        self.assert_not_detached()?;
        assert_no_doctype_ancestor(tree, node)?;
        assert_valid_offset(tree, node, offset)?;
        Ok(())
    }

    /// Move the start. If the new start would fall after the current end, or
    /// lives under a different root, the end snaps to the new point.
    pub fn set_start(&mut self, tree: &Tree, node: NodeId, offset: usize) -> Result<(), RangeError> {
        self.check_boundary_args(tree, node, offset)?;
        let point = BoundaryPoint::new(node, offset);
        if point == self.start {
            return Ok(());
        }
        let mut end = self.end;
        if tree.root_container(node) != tree.root_container(end.container)
            || compare_points(tree, node, offset, end.container, end.offset)? == Ordering::Greater
        {
            end = point;
        }
        self.update_boundaries(tree, point, end);
        Ok(())
    }

    /// Move the end, snapping the start forward when it would be overtaken.
    pub fn set_end(&mut self, tree: &Tree, node: NodeId, offset: usize) -> Result<(), RangeError> {
        self.check_boundary_args(tree, node, offset)?;
        let point = BoundaryPoint::new(node, offset);
        if point == self.end {
            return Ok(());
        }
        let mut start = self.start;
        if tree.root_container(node) != tree.root_container(start.container)
            || compare_points(tree, node, offset, start.container, start.offset)?
                == Ordering::Less
        {
            start = point;
        }
        self.update_boundaries(tree, start, point);
        Ok(())
    }

    /// Set both boundaries at once, without the snap-on-inversion logic.
    /// Callers must supply points already in document order.
    pub fn set_start_and_end(
        &mut self,
        tree: &Tree,
        start_node: NodeId,
        start_offset: usize,
        end_node: NodeId,
        end_offset: usize,
    ) -> Result<(), RangeError> {
        self.check_boundary_args(tree, start_node, start_offset)?;
        assert_no_doctype_ancestor(tree, end_node)?;
        assert_valid_offset(tree, end_node, end_offset)?;
        self.update_boundaries(
            tree,
            BoundaryPoint::new(start_node, start_offset),
            BoundaryPoint::new(end_node, end_offset),
        );
        Ok(())
    }

    pub fn set_boundary(
        &mut self,
        tree: &Tree,
        node: NodeId,
        offset: usize,
        is_start: bool,
    ) -> Result<(), RangeError> {
        if is_start {
            self.set_start(tree, node, offset)
        } else {
            self.set_end(tree, node, offset)
        }
    }

    pub fn set_start_before(&mut self, tree: &Tree, node: NodeId) -> Result<(), RangeError> {
        let point = boundary_before(tree, node)?;
        self.set_start(tree, point.container, point.offset)
    }

    pub fn set_start_after(&mut self, tree: &Tree, node: NodeId) -> Result<(), RangeError> {
        let point = boundary_after(tree, node)?;
        self.set_start(tree, point.container, point.offset)
    }

    pub fn set_end_before(&mut self, tree: &Tree, node: NodeId) -> Result<(), RangeError> {
        let point = boundary_before(tree, node)?;
        self.set_end(tree, point.container, point.offset)
    }

    pub fn set_end_after(&mut self, tree: &Tree, node: NodeId) -> Result<(), RangeError> {
        let point = boundary_after(tree, node)?;
        self.set_end(tree, point.container, point.offset)
    }

    /// Select a whole node: start before it, end after it.
    pub fn select_node(&mut self, tree: &Tree, node: NodeId) -> Result<(), RangeError> {
        self.assert_not_detached()?;
        assert_no_doctype_ancestor(tree, node)?;
        let start = boundary_before(tree, node)?;
        let end = boundary_after(tree, node)?;
        self.update_boundaries(tree, start, end);
        Ok(())
    }

    /// Select everything inside a node.
    pub fn select_node_contents(&mut self, tree: &Tree, node: NodeId) -> Result<(), RangeError> {
        self.assert_not_detached()?;
        if tree.kind(node) == NodeKind::Doctype {
            return Err(RangeError::node_type("cannot select doctype contents"));
        }
        self.update_boundaries(
            tree,
            BoundaryPoint::new(node, 0),
            BoundaryPoint::new(node, tree.node_length(node)),
        );
        Ok(())
    }

    pub fn collapse(&mut self, tree: &Tree, to_start: bool) -> Result<(), RangeError> {
        self.assert_valid(tree)?;
        let point = if to_start { self.start } else { self.end };
        self.update_boundaries(tree, point, point);
        Ok(())
    }

    pub fn collapse_to_point(
        &mut self,
        tree: &Tree,
        node: NodeId,
        offset: usize,
    ) -> Result<(), RangeError> {
        self.check_boundary_args(tree, node, offset)?;
        let point = BoundaryPoint::new(node, offset);
        self.update_boundaries(tree, point, point);
        Ok(())
    }

    /// Collapse to the position immediately before a node.
    pub fn collapse_before(&mut self, tree: &Tree, node: NodeId) -> Result<(), RangeError> {
        self.set_end_before(tree, node)?;
        self.collapse(tree, false)
    }

    /// Collapse to the position immediately after a node.
    pub fn collapse_after(&mut self, tree: &Tree, node: NodeId) -> Result<(), RangeError> {
        self.set_start_after(tree, node)?;
        self.collapse(tree, true)
    }

    pub fn clone_range(&self) -> Range {
        self.clone()
    }

    /// Structural boundary equality.
    pub fn equals(&self, other: &Range) -> bool {
        self.start == other.start && self.end == other.end
    }

    // ---- comparison and queries -------------------------------------------

    /// Compare one of this range's boundaries with one of `other`'s.
    pub fn compare_boundary_points(
        &self,
        tree: &Tree,
        how: HowToCompare,
        other: &Range,
    ) -> Result<Ordering, RangeError> {
        self.assert_valid(tree)?;
        other.assert_valid(tree)?;
        let ours = match how {
            HowToCompare::StartToStart | HowToCompare::StartToEnd => self.start,
            HowToCompare::EndToEnd | HowToCompare::EndToStart => self.end,
        };
        let theirs = match how {
            HowToCompare::StartToStart | HowToCompare::EndToStart => other.start,
            HowToCompare::StartToEnd | HowToCompare::EndToEnd => other.end,
        };
        compare_points(
            tree,
            ours.container,
            ours.offset,
            theirs.container,
            theirs.offset,
        )
    }

    /// Where a point falls relative to this range: `Less` before the start,
    /// `Greater` after the end, `Equal` within.
    pub fn compare_point(
        &self,
        tree: &Tree,
        node: NodeId,
        offset: usize,
    ) -> Result<Ordering, RangeError> {
        self.assert_valid(tree)?;
        if compare_points(tree, node, offset, self.start.container, self.start.offset)?
            == Ordering::Less
        {
            return Ok(Ordering::Less);
        }
        if compare_points(tree, node, offset, self.end.container, self.end.offset)?
            == Ordering::Greater
        {
            return Ok(Ordering::Greater);
        }
        Ok(Ordering::Equal)
    }

    pub fn is_point_in_range(
        &self,
        tree: &Tree,
        node: NodeId,
        offset: usize,
    ) -> Result<bool, RangeError> {
        Ok(self.compare_point(tree, node, offset)? == Ordering::Equal)
    }

    /// Whole-node variant of [`Range::compare_point`].
    pub fn compare_node(&self, tree: &Tree, node: NodeId) -> Result<NodePosition, RangeError> {
        self.assert_valid(tree)?;
        let parent = tree.parent(node).ok_or_else(|| {
            RangeError::not_found(format!("{} has no parent", tree.inspect_node(node)))
        })?;
        let index = tree.node_index(node);
        let start_side = self.compare_point(tree, parent, index)?;
        let end_side = self.compare_point(tree, parent, index + 1)?;
        Ok(if start_side == Ordering::Less {
            if end_side == Ordering::Greater {
                NodePosition::BeforeAndAfter
            } else {
                NodePosition::Before
            }
        } else if end_side == Ordering::Greater {
            NodePosition::After
        } else {
            NodePosition::Inside
        })
    }

    fn overlaps(
        &self,
        tree: &Tree,
        other: &Range,
        touching_is_intersecting: bool,
    ) -> Result<bool, RangeError> {
        self.assert_valid(tree)?;
        other.assert_valid(tree)?;
        if self.root(tree) != other.root(tree) {
            return Err(RangeError::WrongDocument);
        }
        let start_vs_other_end = compare_points(
            tree,
            self.start.container,
            self.start.offset,
            other.end.container,
            other.end.offset,
        )?;
        let end_vs_other_start = compare_points(
            tree,
            self.end.container,
            self.end.offset,
            other.start.container,
            other.start.offset,
        )?;
        Ok(if touching_is_intersecting {
            start_vs_other_end != Ordering::Greater && end_vs_other_start != Ordering::Less
        } else {
            start_vs_other_end == Ordering::Less && end_vs_other_start == Ordering::Greater
        })
    }

    pub fn intersects_range(&self, tree: &Tree, other: &Range) -> Result<bool, RangeError> {
        self.overlaps(tree, other, false)
    }

    pub fn intersects_or_touches_range(
        &self,
        tree: &Tree,
        other: &Range,
    ) -> Result<bool, RangeError> {
        self.overlaps(tree, other, true)
    }

    /// The overlapping span of two ranges, if any.
    pub fn intersection(&self, tree: &Tree, other: &Range) -> Result<Option<Range>, RangeError> {
        if !self.intersects_range(tree, other)? {
            return Ok(None);
        }
        let mut result = self.clone_range();
        if compare_points(
            tree,
            self.start.container,
            self.start.offset,
            other.start.container,
            other.start.offset,
        )? == Ordering::Less
        {
            result.set_start(tree, other.start.container, other.start.offset)?;
        }
        if compare_points(
            tree,
            self.end.container,
            self.end.offset,
            other.end.container,
            other.end.offset,
        )? == Ordering::Greater
        {
            result.set_end(tree, other.end.container, other.end.offset)?;
        }
        Ok(Some(result))
    }

    /// The span covering both ranges. The ranges must intersect or touch.
    pub fn union(&self, tree: &Tree, other: &Range) -> Result<Range, RangeError> {
        if !self.intersects_or_touches_range(tree, other)? {
            return Err(RangeError::boundary("ranges do not intersect or touch"));
        }
        let mut result = self.clone_range();
        if compare_points(
            tree,
            other.start.container,
            other.start.offset,
            self.start.container,
            self.start.offset,
        )? == Ordering::Less
        {
            result.set_start(tree, other.start.container, other.start.offset)?;
        }
        if compare_points(
            tree,
            other.end.container,
            other.end.offset,
            self.end.container,
            self.end.offset,
        )? == Ordering::Greater
        {
            result.set_end(tree, other.end.container, other.end.offset)?;
        }
        Ok(result)
    }

    /// Whether the range intersects the span occupied by a node. A node from
    /// another tree never intersects; a parentless node is its own root and
    /// counts as intersecting when it is the range's root.
    pub fn intersects_node(
        &self,
        tree: &Tree,
        node: NodeId,
        touching_is_intersecting: bool,
    ) -> Result<bool, RangeError> {
        self.assert_valid(tree)?;
        if tree.root_container(node) != self.root(tree) {
            return Ok(false);
        }
        let Some(parent) = tree.parent(node) else {
            return Ok(true);
        };
        let index = tree.node_index(node);
        let start_side = compare_points(
            tree,
            parent,
            index,
            self.end.container,
            self.end.offset,
        )?;
        let end_side = compare_points(
            tree,
            parent,
            index + 1,
            self.start.container,
            self.start.offset,
        )?;
        Ok(if touching_is_intersecting {
            start_side != Ordering::Greater && end_side != Ordering::Less
        } else {
            start_side == Ordering::Less && end_side == Ordering::Greater
        })
    }

    pub fn contains_node(
        &self,
        tree: &Tree,
        node: NodeId,
        allow_partial: bool,
    ) -> Result<bool, RangeError> {
        if allow_partial {
            self.intersects_node(tree, node, false)
        } else {
            Ok(self.compare_node(tree, node)? == NodePosition::Inside)
        }
    }

    pub fn contains_node_contents(&self, tree: &Tree, node: NodeId) -> Result<bool, RangeError> {
        Ok(self.compare_point(tree, node, 0)? != Ordering::Less
            && self.compare_point(tree, node, tree.node_length(node))? != Ordering::Greater)
    }

    pub fn contains_range(&self, tree: &Tree, other: &Range) -> Result<bool, RangeError> {
        Ok(match self.intersection(tree, other)? {
            Some(intersection) => other.equals(&intersection),
            None => false,
        })
    }

    // ---- boundary normalization ------------------------------------------

    /// Merge character-data nodes that a boundary splits in two, pulling each
    /// boundary inside the merged node. Leaves the visible extent unchanged.
    pub fn normalize_boundaries(&mut self, tree: &mut Tree) -> Result<(), RangeError> {
        self.assert_valid(tree)?;
        let mut start = self.start;
        let mut end = self.end;

        fn merge_forward(tree: &mut Tree, end: &mut BoundaryPoint, node: NodeId) {
            if let Some(sibling) = tree.next_sibling(node) {
                if tree.kind(sibling) == tree.kind(node) {
                    *end = BoundaryPoint::new(node, tree.node_length(node));
                    let data = tree.data(sibling).to_string();
                    tree.append_data(node, &data);
                    tree.detach(sibling);
                }
            }
        }

        fn merge_backward(
            tree: &mut Tree,
            start: &mut BoundaryPoint,
            end: &mut BoundaryPoint,
            node: NodeId,
        ) {
            let Some(sibling) = tree.previous_sibling(node) else {
                return;
            };
            if tree.kind(sibling) != tree.kind(node) {
                return;
            }
            let node_length = tree.node_length(node);
            let sibling_length = tree.node_length(sibling);
            let node_index = tree.node_index(node);
            *start = BoundaryPoint::new(node, sibling_length);
            let data = tree.data(sibling).to_string();
            tree.insert_data(node, 0, &data);
            tree.detach(sibling);
            if start.container == end.container {
                end.offset += sibling_length;
                end.container = start.container;
            } else if Some(end.container) == tree.parent(node) {
                // The sibling's removal shifted child indices under the
                // shared parent.
                let node_index = node_index - 1;
                if end.offset == node_index {
                    *end = BoundaryPoint::new(node, node_length);
                } else if end.offset > node_index {
                    end.offset -= 1;
                }
            }
        }

        let mut normalize_start = true;
        if tree.kind(end.container).is_character_data() {
            if end.offset == tree.node_length(end.container) {
                let end_node = end.container;
                merge_forward(tree, &mut end, end_node);
            }
        } else {
            if end.offset > 0 {
                let end_node = tree.children(end.container)[end.offset - 1];
                if tree.kind(end_node).is_character_data() {
                    merge_forward(tree, &mut end, end_node);
                }
            }
            normalize_start = !self.collapsed;
        }

        if normalize_start {
            if tree.kind(start.container).is_character_data() {
                if start.offset == 0 {
                    let start_node = start.container;
                    merge_backward(tree, &mut start, &mut end, start_node);
                }
            } else if start.offset < tree.children(start.container).len() {
                let start_node = tree.children(start.container)[start.offset];
                if tree.kind(start_node).is_character_data() {
                    merge_backward(tree, &mut start, &mut end, start_node);
                }
            }
        } else {
            start = end;
        }

        self.update_boundaries(tree, start, end);
        Ok(())
    }

    /// Split boundary character-data nodes so that both boundaries land on
    /// node edges. `positions` are caller positions kept correct across the
    /// splits.
    pub fn split_boundaries(
        &mut self,
        tree: &mut Tree,
        positions: &mut [(NodeId, usize)],
    ) -> Result<(), RangeError> {
        self.assert_valid(tree)?;
        debug!("split_boundaries on {}", self.inspect(tree));
        let mut start = self.start;
        let mut end = self.end;
        let start_end_same = start.container == end.container;

        if tree.kind(end.container).is_character_data()
            && end.offset > 0
            && end.offset < tree.node_length(end.container)
        {
            tree.split_text(end.container, end.offset, positions);
        }
        if tree.kind(start.container).is_character_data()
            && start.offset > 0
            && start.offset < tree.node_length(start.container)
        {
            let new_start = tree.split_text(start.container, start.offset, positions);
            if start_end_same {
                end.offset -= start.offset;
                end.container = new_start;
            } else if end.container == tree.parent(new_start).expect("split node is attached")
                && end.offset >= tree.node_index(new_start)
            {
                end.offset += 1;
            }
            start = BoundaryPoint::new(new_start, 0);
        }
        self.set_start_and_end(tree, start.container, start.offset, end.container, end.offset)
    }

    // ---- bookmarks ---------------------------------------------------------

    /// Snapshot the range as raw-character offsets within `container`.
    pub fn bookmark(&self, tree: &Tree, container: NodeId) -> Result<Bookmark, RangeError> {
        self.assert_valid(tree)?;
        let mut container_range = Range::new(tree);
        container_range.select_node_contents(tree, container)?;
        let clipped = match self.intersection(tree, &container_range)? {
            Some(clipped) => Some(clipped),
            // A caret touching the container's edge still has a position.
            None if self.collapsed => {
                if container_range.is_point_in_range(
                    tree,
                    self.start.container,
                    self.start.offset,
                )? {
                    Some(self.clone_range())
                } else {
                    None
                }
            }
            None => None,
        };
        let (start, end) = match clipped {
            Some(clipped) => {
                container_range.set_end(tree, clipped.start.container, clipped.start.offset)?;
                let start = container_range.raw_text(tree)?.chars().count();
                let end = start + clipped.raw_text(tree)?.chars().count();
                (start, end)
            }
            None => (0, 0),
        };
        Ok(Bookmark {
            start,
            end,
            container,
        })
    }

    /// Restore boundaries from a bookmark taken on an unmodified container.
    pub fn move_to_bookmark(&mut self, tree: &Tree, bookmark: Bookmark) -> Result<(), RangeError> {
        self.assert_not_detached()?;
        self.collapse_to_point(tree, bookmark.container, 0)?;
        let mut char_index = 0usize;
        let mut found_start = false;
        let mut last_text = None;
        let mut stack = vec![bookmark.container];
        while let Some(node) = stack.pop() {
            if tree.kind(node) == NodeKind::Text {
                let next_char_index = char_index + tree.node_length(node);
                // A start landing exactly between two text nodes belongs to
                // the following node; an end belongs to the preceding one.
                if !found_start
                    && bookmark.start >= char_index
                    && bookmark.start < next_char_index
                {
                    self.set_start(tree, node, bookmark.start - char_index)?;
                    found_start = true;
                }
                if found_start && bookmark.end >= char_index && bookmark.end <= next_char_index {
                    self.set_end(tree, node, bookmark.end - char_index)?;
                    return Ok(());
                }
                char_index = next_char_index;
                last_text = Some(node);
            } else {
                for &child in tree.children(node).iter().rev() {
                    stack.push(child);
                }
            }
        }
        // Offsets at or past the last boundary clamp to the end of the final
        // text node.
        if let Some(node) = last_text {
            let length = tree.node_length(node);
            if !found_start {
                self.set_start(tree, node, length)?;
            }
            self.set_end(tree, node, length)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> (Tree, NodeId, NodeId, NodeId, NodeId) {
        // <div> "alpha" <span> "beta" </span> "gamma" </div>
        let mut tree = Tree::new();
        let div = tree.new_element("div");
        let alpha = tree.new_text("alpha");
        let span = tree.new_element("span");
        let beta = tree.new_text("beta");
        let gamma = tree.new_text("gamma");
        let root = tree.root();
        tree.append_child(root, div);
        tree.append_child(div, alpha);
        tree.append_child(div, span);
        tree.append_child(span, beta);
        tree.append_child(div, gamma);
        (tree, div, alpha, beta, gamma)
    }

    #[test]
    fn test_new_range_is_collapsed_at_root() {
        let tree = Tree::new();
        let range = Range::new(&tree);
        assert!(range.collapsed());
        assert_eq!(range.start_container(), tree.root());
        assert_eq!(range.common_ancestor(), tree.root());
    }

    #[test]
    fn test_set_start_end_updates_derived_state() {
        let (tree, div, alpha, beta, _) = sample();
        let mut range = Range::new(&tree);
        range.set_start(&tree, alpha, 1).unwrap();
        range.set_end(&tree, beta, 2).unwrap();
        assert!(!range.collapsed());
        assert_eq!(range.common_ancestor(), div);
    }

    #[test]
    fn test_start_moved_past_end_snaps_end() {
        let (tree, _, alpha, _, gamma) = sample();
        let mut range = Range::new(&tree);
        range.set_start(&tree, alpha, 0).unwrap();
        range.set_end(&tree, alpha, 3).unwrap();
        range.set_start(&tree, gamma, 2).unwrap();
        assert!(range.collapsed());
        assert_eq!(range.end(), BoundaryPoint::new(gamma, 2));
    }

    #[test]
    fn test_end_moved_before_start_snaps_start() {
        let (tree, _, alpha, _, gamma) = sample();
        let mut range = Range::new(&tree);
        range.set_start(&tree, gamma, 1).unwrap();
        range.set_end(&tree, gamma, 4).unwrap();
        range.set_end(&tree, alpha, 2).unwrap();
        assert!(range.collapsed());
        assert_eq!(range.start(), BoundaryPoint::new(alpha, 2));
    }

    #[test]
    fn test_invalid_offset_is_index_size() {
        let (tree, _, alpha, _, _) = sample();
        let mut range = Range::new(&tree);
        assert_eq!(
            range.set_start(&tree, alpha, 6),
            Err(RangeError::IndexSize {
                offset: 6,
                length: 5
            })
        );
    }

    #[test]
    fn test_detach_is_terminal() {
        let (tree, _, alpha, _, _) = sample();
        let mut range = Range::new(&tree);
        range.detach();
        assert_eq!(
            range.set_start(&tree, alpha, 0),
            Err(RangeError::InvalidState)
        );
        assert_eq!(range.collapse(&tree, true), Err(RangeError::InvalidState));
    }

    #[test]
    fn test_stale_range_detected_after_mutation() {
        let (mut tree, _, alpha, _, _) = sample();
        let mut range = Range::new(&tree);
        range.set_start(&tree, alpha, 2).unwrap();
        range.set_end(&tree, alpha, 5).unwrap();
        tree.delete_data(alpha, 0, 4);
        assert!(matches!(
            range.collapse(&tree, true),
            Err(RangeError::StaleRange { .. })
        ));
    }

    #[test]
    fn test_select_node_and_contents() {
        let (tree, div, _, beta, _) = sample();
        let mut range = Range::new(&tree);
        range.select_node(&tree, div).unwrap();
        assert_eq!(range.start(), BoundaryPoint::new(tree.root(), 0));
        assert_eq!(range.end(), BoundaryPoint::new(tree.root(), 1));

        range.select_node_contents(&tree, beta).unwrap();
        assert_eq!(range.start(), BoundaryPoint::new(beta, 0));
        assert_eq!(range.end(), BoundaryPoint::new(beta, 4));
    }

    #[test]
    fn test_collapse_before_and_after() {
        let (tree, div, _, _, gamma) = sample();
        let mut range = Range::new(&tree);
        range.collapse_before(&tree, gamma).unwrap();
        assert_eq!(range.start(), BoundaryPoint::new(div, 2));
        assert!(range.collapsed());
        range.collapse_after(&tree, gamma).unwrap();
        assert_eq!(range.start(), BoundaryPoint::new(div, 3));
    }

    #[test]
    fn test_compare_boundary_points() {
        let (tree, _, alpha, _, gamma) = sample();
        let mut a = Range::new(&tree);
        a.set_start_and_end(&tree, alpha, 0, alpha, 3).unwrap();
        let mut b = Range::new(&tree);
        b.set_start_and_end(&tree, alpha, 3, gamma, 1).unwrap();
        assert_eq!(
            a.compare_boundary_points(&tree, HowToCompare::StartToStart, &b)
                .unwrap(),
            Ordering::Less
        );
        assert_eq!(
            a.compare_boundary_points(&tree, HowToCompare::EndToStart, &b)
                .unwrap(),
            Ordering::Equal
        );
        assert_eq!(
            a.compare_boundary_points(&tree, HowToCompare::EndToEnd, &b)
                .unwrap(),
            Ordering::Less
        );
    }

    #[test]
    fn test_compare_point_and_containment() {
        let (tree, _, alpha, beta, gamma) = sample();
        let mut range = Range::new(&tree);
        range.set_start_and_end(&tree, alpha, 1, gamma, 1).unwrap();
        assert_eq!(
            range.compare_point(&tree, alpha, 0).unwrap(),
            Ordering::Less
        );
        assert_eq!(
            range.compare_point(&tree, beta, 2).unwrap(),
            Ordering::Equal
        );
        assert_eq!(
            range.compare_point(&tree, gamma, 3).unwrap(),
            Ordering::Greater
        );
        assert!(range.is_point_in_range(&tree, beta, 0).unwrap());
    }

    #[test]
    fn test_compare_node_positions() {
        let (tree, div, alpha, _, gamma) = sample();
        let span = tree.children(div)[1];
        let mut range = Range::new(&tree);
        range.set_start_and_end(&tree, alpha, 2, gamma, 1).unwrap();
        assert_eq!(
            range.compare_node(&tree, alpha).unwrap(),
            NodePosition::Before
        );
        assert_eq!(
            range.compare_node(&tree, span).unwrap(),
            NodePosition::Inside
        );
        assert_eq!(
            range.compare_node(&tree, gamma).unwrap(),
            NodePosition::After
        );
        assert_eq!(
            range.compare_node(&tree, div).unwrap(),
            NodePosition::BeforeAndAfter
        );
    }

    #[test]
    fn test_intersection_and_union() {
        let (tree, _, alpha, beta, gamma) = sample();
        let mut a = Range::new(&tree);
        a.set_start_and_end(&tree, alpha, 0, beta, 2).unwrap();
        let mut b = Range::new(&tree);
        b.set_start_and_end(&tree, beta, 1, gamma, 3).unwrap();

        let overlap = a.intersection(&tree, &b).unwrap().unwrap();
        assert_eq!(overlap.start(), BoundaryPoint::new(beta, 1));
        assert_eq!(overlap.end(), BoundaryPoint::new(beta, 2));

        let merged = a.union(&tree, &b).unwrap();
        assert_eq!(merged.start(), BoundaryPoint::new(alpha, 0));
        assert_eq!(merged.end(), BoundaryPoint::new(gamma, 3));
    }

    #[test]
    fn test_touching_ranges_union_but_do_not_intersect() {
        let (tree, _, alpha, beta, _) = sample();
        let mut a = Range::new(&tree);
        a.set_start_and_end(&tree, alpha, 0, alpha, 5).unwrap();
        let mut b = Range::new(&tree);
        b.set_start_and_end(&tree, alpha, 5, beta, 2).unwrap();
        assert!(!a.intersects_range(&tree, &b).unwrap());
        assert!(a.intersects_or_touches_range(&tree, &b).unwrap());
        assert!(a.union(&tree, &b).is_ok());
        assert!(a.intersection(&tree, &b).unwrap().is_none());
    }

    #[test]
    fn test_disjoint_union_is_bad_boundary_points() {
        let (tree, _, alpha, _, gamma) = sample();
        let mut a = Range::new(&tree);
        a.set_start_and_end(&tree, alpha, 0, alpha, 2).unwrap();
        let mut b = Range::new(&tree);
        b.set_start_and_end(&tree, gamma, 0, gamma, 2).unwrap();
        assert!(matches!(
            a.union(&tree, &b),
            Err(RangeError::BadBoundaryPoints { .. })
        ));
    }

    #[test]
    fn test_contains_range_and_node() {
        let (tree, _, alpha, beta, gamma) = sample();
        let span = {
            let div = tree.children(tree.root())[0];
            tree.children(div)[1]
        };
        let mut outer = Range::new(&tree);
        outer.set_start_and_end(&tree, alpha, 0, gamma, 5).unwrap();
        let mut inner = Range::new(&tree);
        inner.set_start_and_end(&tree, beta, 1, beta, 3).unwrap();
        assert!(outer.contains_range(&tree, &inner).unwrap());
        assert!(!inner.contains_range(&tree, &outer).unwrap());
        assert!(outer.contains_node(&tree, span, false).unwrap());
        assert!(outer.contains_node_contents(&tree, span).unwrap());

        let mut partial = Range::new(&tree);
        partial.set_start_and_end(&tree, alpha, 0, beta, 1).unwrap();
        assert!(!partial.contains_node(&tree, span, false).unwrap());
        assert!(partial.contains_node(&tree, span, true).unwrap());
    }

    #[test]
    fn test_split_boundaries_lands_on_node_edges() {
        let (mut tree, div, alpha, _, _) = sample();
        let mut range = Range::new(&tree);
        range.set_start_and_end(&tree, alpha, 1, alpha, 4).unwrap();
        let mut positions: [(NodeId, usize); 0] = [];
        range.split_boundaries(&mut tree, &mut positions).unwrap();
        assert_eq!(range.start_offset(), 0);
        assert_eq!(tree.data(range.start_container()), "lph");
        assert_eq!(range.end_offset(), 3);
        assert_eq!(tree.children(div).len(), 5);
    }

    #[test]
    fn test_normalize_after_split_restores_single_node() {
        let (mut tree, div, alpha, _, _) = sample();
        let mut range = Range::new(&tree);
        range.set_start_and_end(&tree, alpha, 1, alpha, 4).unwrap();
        let mut positions: [(NodeId, usize); 0] = [];
        range.split_boundaries(&mut tree, &mut positions).unwrap();
        range.normalize_boundaries(&mut tree).unwrap();
        assert_eq!(tree.children(div).len(), 3);
        assert_eq!(tree.data(range.start_container()), "alpha");
        assert_eq!(range.start_offset(), 1);
        assert_eq!(range.end_offset(), 4);
    }

    #[test]
    fn test_equals_and_clone() {
        let (tree, _, alpha, _, _) = sample();
        let mut range = Range::new(&tree);
        range.set_start_and_end(&tree, alpha, 1, alpha, 3).unwrap();
        let copy = range.clone_range();
        assert!(range.equals(&copy));
    }

    #[test]
    fn test_bookmark_between_text_nodes_restores_into_the_following_node() {
        let mut tree = Tree::new();
        let root = tree.root();
        let div = tree.new_element("div");
        tree.append_child(root, div);
        let first = tree.new_text("ab");
        tree.append_child(div, first);
        let second = tree.new_text("cd");
        tree.append_child(div, second);

        let mut range = Range::new(&tree);
        range.set_start_and_end(&tree, second, 0, second, 1).unwrap();
        let bookmark = range.bookmark(&tree, div).unwrap();
        assert_eq!((bookmark.start, bookmark.end), (2, 3));

        let mut restored = Range::new(&tree);
        restored.move_to_bookmark(&tree, bookmark).unwrap();
        // The start sits on the boundary shared by both text nodes; it must
        // restore into the node the range actually covers.
        assert_eq!(restored.start_container(), second);
        assert_eq!(restored.start_offset(), 0);
        assert!(restored.equals(&range));
    }

    #[test]
    fn test_bookmark_of_caret_at_container_end() {
        let (tree, div, _, _, gamma) = sample();
        let mut caret = Range::new(&tree);
        caret
            .collapse_to_point(&tree, div, tree.node_length(div))
            .unwrap();
        let bookmark = caret.bookmark(&tree, div).unwrap();
        assert_eq!((bookmark.start, bookmark.end), (14, 14));

        let mut restored = Range::new(&tree);
        restored.move_to_bookmark(&tree, bookmark).unwrap();
        assert!(restored.collapsed());
        assert_eq!(restored.start_container(), gamma);
        assert_eq!(restored.start_offset(), 5);
    }
}

//! Content mutators: insert, clone, delete, extract and surround.
//!
//! Every mutator validates the range and checks the read-only flags before
//! touching the tree, so failures leave both the tree and the range
//! unchanged. Delete and extract share one template: snapshot the collapse
//! target, assert nothing in range is read-only, run the remover, then
//! collapse the range to the snapshot.

use log::debug;

use crate::error::RangeError;
use crate::ranges::boundary::{boundary_after, BoundaryPoint};
use crate::ranges::iterator::RangeIterator;
use crate::ranges::range::Range;
use crate::tree::{NodeId, NodeKind, Tree};

impl Range {
    /// Insert a node (or the children of a fragment) at the start boundary.
    /// A start inside character data splits it first. The start moves to
    /// just before the inserted content; the end does not grow to cover it.
    pub fn insert_node(&mut self, tree: &mut Tree, node: NodeId) -> Result<(), RangeError> {
        self.assert_valid(tree)?;
        assert_insertable(tree, node)?;
        assert_not_read_only(tree, self.start.container)?;
        if tree.is_or_is_ancestor_of(node, self.start.container) {
            return Err(RangeError::hierarchy(
                "cannot insert a node into its own descendant",
            ));
        }
        let first =
            insert_node_at_position(tree, node, self.start.container, self.start.offset)?;
        self.set_start_before(tree, first)
    }

    /// A fragment holding a copy of everything in range. Boundary character
    /// data arrives trimmed to the covered characters.
    pub fn clone_contents(&self, tree: &mut Tree) -> Result<NodeId, RangeError> {
        self.assert_valid(tree)?;
        if self.collapsed {
            return Ok(tree.new_fragment());
        }
        let sc = self.start.container;
        if sc == self.end.container && tree.kind(sc).is_character_data() {
            let clone = tree.clone_node(sc, false);
            let text = tree.substring_data(sc, self.start.offset, self.end.offset);
            tree.set_data(clone, &text);
            let frag = tree.new_fragment();
            tree.append_child(frag, clone);
            return Ok(frag);
        }
        let mut iter = RangeIterator::new(tree, self)?;
        clone_subtree(tree, &mut iter)
    }

    /// Remove everything in range, collapsing the range to where the content
    /// was.
    pub fn delete_contents(&mut self, tree: &mut Tree) -> Result<(), RangeError> {
        debug!("delete_contents of {}", self.inspect(tree));
        self.remove_contents(tree, |tree, iter| {
            delete_subtree(tree, iter)?;
            Ok(None)
        })
        .map(|_| ())
    }

    /// Remove everything in range into a returned fragment.
    pub fn extract_contents(&mut self, tree: &mut Tree) -> Result<NodeId, RangeError> {
        debug!("extract_contents of {}", self.inspect(tree));
        let extracted = self.remove_contents(tree, |tree, iter| {
            extract_subtree(tree, iter).map(Some)
        })?;
        Ok(match extracted {
            Some(frag) => frag,
            None => tree.new_fragment(),
        })
    }

    fn remove_contents(
        &mut self,
        tree: &mut Tree,
        remover: impl FnOnce(&mut Tree, &mut RangeIterator) -> Result<Option<NodeId>, RangeError>,
    ) -> Result<Option<NodeId>, RangeError> {
        self.assert_valid(tree)?;
        self.assert_nothing_read_only(tree)?;
        // Collapse target: after the start container's top-level ancestor,
        // which survives the removal.
        let root = self.common_ancestor;
        let sc = self.start.container;
        let collapse_to = if sc == root {
            BoundaryPoint::new(sc, self.start.offset)
        } else {
            let top = tree
                .closest_ancestor_in(sc, root, true)
                .expect("start container descends from the common ancestor");
            boundary_after(tree, top)?
        };
        let mut iter = RangeIterator::new(tree, self)?;
        let result = remover(tree, &mut iter)?;
        self.update_boundaries(tree, collapse_to, collapse_to);
        Ok(result)
    }

    /// Whether [`Range::surround_contents`] can run: no non-text node may be
    /// cut by a boundary, and the boundary containers must be writable.
    pub fn can_surround_contents(&self, tree: &Tree) -> Result<bool, RangeError> {
        self.assert_valid(tree)?;
        assert_not_read_only(tree, self.start.container)?;
        assert_not_read_only(tree, self.end.container)?;
        let iter = RangeIterator::new(tree, self)?;
        let sliced = iter
            .first()
            .is_some_and(|n| self.is_non_text_partially_selected(tree, n))
            || iter
                .last()
                .is_some_and(|n| self.is_non_text_partially_selected(tree, n));
        Ok(!sliced)
    }

    fn is_non_text_partially_selected(&self, tree: &Tree, node: NodeId) -> bool {
        tree.kind(node) != NodeKind::Text
            && (tree.is_or_is_ancestor_of(node, self.start.container)
                || tree.is_or_is_ancestor_of(node, self.end.container))
    }

    /// Extract the contents, wrap them in `wrapper`, insert the wrapper at
    /// the old start, and select it. Any existing children of the wrapper
    /// are discarded.
    pub fn surround_contents(&mut self, tree: &mut Tree, wrapper: NodeId) -> Result<(), RangeError> {
        if tree.kind(wrapper) != NodeKind::Element {
            return Err(RangeError::node_type("surround wrapper must be an element"));
        }
        if !self.can_surround_contents(tree)? {
            return Err(RangeError::boundary(
                "a node is partially selected and cannot be surrounded",
            ));
        }
        let content = self.extract_contents(tree)?;
        while let Some(child) = tree.last_child(wrapper) {
            tree.detach(child);
        }
        insert_node_at_position(tree, wrapper, self.start.container, self.start.offset)?;
        tree.append_child(wrapper, content);
        self.select_node(tree, wrapper)
    }

    /// Every node the range touches must be writable before a removal runs.
    fn assert_nothing_read_only(&self, tree: &Tree) -> Result<(), RangeError> {
        if tree.read_only_ancestor(self.common_ancestor).is_some() {
            return Err(RangeError::NoModificationAllowed);
        }
        let mut hit = false;
        self.iterate_subtree(tree, &mut |node| {
            if tree.is_read_only(node) {
                hit = true;
                return false;
            }
            true
        })?;
        if hit {
            Err(RangeError::NoModificationAllowed)
        } else {
            Ok(())
        }
    }
}

fn assert_not_read_only(tree: &Tree, node: NodeId) -> Result<(), RangeError> {
    if tree.read_only_ancestor(node).is_some() {
        Err(RangeError::NoModificationAllowed)
    } else {
        Ok(())
    }
}

fn assert_insertable(tree: &Tree, node: NodeId) -> Result<(), RangeError> {
    match tree.kind(node) {
        NodeKind::Document => Err(RangeError::node_type("cannot insert a document")),
        NodeKind::Doctype => Err(RangeError::node_type("cannot insert a doctype")),
        NodeKind::Fragment if tree.first_child(node).is_none() => Err(RangeError::hierarchy(
            "cannot insert an empty fragment",
        )),
        _ => Ok(()),
    }
}

/// Insert a node at a boundary position, splitting character data when the
/// position falls inside it. Returns the first node actually inserted.
fn insert_node_at_position(
    tree: &mut Tree,
    node: NodeId,
    container: NodeId,
    offset: usize,
) -> Result<NodeId, RangeError> {
    let first = if tree.kind(node) == NodeKind::Fragment {
        tree.first_child(node)
            .ok_or_else(|| RangeError::hierarchy("cannot insert an empty fragment"))?
    } else {
        node
    };
    if tree.kind(container).is_character_data() {
        if offset == tree.node_length(container) {
            tree.insert_after(node, container);
        } else {
            let reference = if offset == 0 {
                container
            } else {
                let mut none: [(NodeId, usize); 0] = [];
                tree.split_text(container, offset, &mut none)
            };
            let parent = tree
                .parent(container)
                .ok_or_else(|| RangeError::hierarchy("boundary text node has no parent"))?;
            let index = tree.node_index(reference);
            tree.insert_before(parent, node, index);
        }
    } else {
        tree.insert_before(container, node, offset);
    }
    Ok(first)
}

/// Copy every node an iterator yields into a fresh fragment, clipping
/// boundary character data and recursing into partially selected subtrees.
fn clone_subtree(tree: &mut Tree, iter: &mut RangeIterator) -> Result<NodeId, RangeError> {
    let frag = tree.new_fragment();
    while let Some(node) = iter.next(tree) {
        if tree.kind(node) == NodeKind::Doctype {
            return Err(RangeError::hierarchy("cannot clone a doctype"));
        }
        let clone = if iter.is_partially_selected_subtree(tree) {
            let shell = tree.clone_node(node, false);
            let mut sub = iter.subtree_iterator(tree)?;
            let inner = clone_subtree(tree, &mut sub)?;
            tree.append_child(shell, inner);
            shell
        } else if tree.kind(node).is_character_data() && iter.is_boundary(node) {
            let (from, to) = iter.character_span(tree, node);
            let clone = tree.clone_node(node, false);
            let text = tree.substring_data(node, from, to);
            tree.set_data(clone, &text);
            clone
        } else {
            tree.clone_node(node, true)
        };
        tree.append_child(frag, clone);
    }
    Ok(frag)
}

/// Move every in-range node into a fresh fragment. Partially selected
/// subtrees leave a shallow clone shell in the fragment and recurse;
/// boundary character data leaves the uncovered characters behind.
fn extract_subtree(tree: &mut Tree, iter: &mut RangeIterator) -> Result<NodeId, RangeError> {
    let frag = tree.new_fragment();
    while let Some(node) = iter.next(tree) {
        if tree.kind(node) == NodeKind::Doctype {
            return Err(RangeError::hierarchy("cannot extract a doctype"));
        }
        let moved = if iter.is_partially_selected_subtree(tree) {
            let shell = tree.clone_node(node, false);
            let mut sub = iter.subtree_iterator(tree)?;
            let inner = extract_subtree(tree, &mut sub)?;
            tree.append_child(shell, inner);
            shell
        } else if tree.kind(node).is_character_data() && iter.is_boundary(node) {
            let (from, to) = iter.character_span(tree, node);
            let clone = tree.clone_node(node, false);
            let text = tree.substring_data(node, from, to);
            tree.set_data(clone, &text);
            iter.remove(tree);
            clone
        } else {
            iter.remove(tree);
            node
        };
        tree.append_child(frag, moved);
    }
    Ok(frag)
}

fn delete_subtree(tree: &mut Tree, iter: &mut RangeIterator) -> Result<(), RangeError> {
    while iter.next(tree).is_some() {
        if iter.is_partially_selected_subtree(tree) {
            let mut sub = iter.subtree_iterator(tree)?;
            delete_subtree(tree, &mut sub)?;
        } else {
            iter.remove(tree);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> (Tree, NodeId, NodeId, NodeId, NodeId, NodeId) {
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
        (tree, div, alpha, span, beta, gamma)
    }

    #[test]
    fn test_delete_contents_trims_and_collapses() {
        let (mut tree, div, alpha, _, _, gamma) = sample();
        let mut range = Range::new(&tree);
        range.set_start_and_end(&tree, alpha, 2, gamma, 3).unwrap();
        range.delete_contents(&mut tree).unwrap();
        assert_eq!(tree.data(alpha), "al");
        assert_eq!(tree.data(gamma), "ma");
        assert_eq!(tree.children(div).len(), 2);
        assert!(range.collapsed());
        assert_eq!(range.start_container(), div);
        assert_eq!(range.start_offset(), 1);
    }

    #[test]
    fn test_delete_contents_within_one_text_node() {
        let (mut tree, _, alpha, _, _, _) = sample();
        let mut range = Range::new(&tree);
        range.set_start_and_end(&tree, alpha, 1, alpha, 4).unwrap();
        range.delete_contents(&mut tree).unwrap();
        assert_eq!(tree.data(alpha), "aa");
        assert!(range.collapsed());
    }

    #[test]
    fn test_extract_contents_moves_nodes() {
        let (mut tree, div, alpha, span, beta, gamma) = sample();
        let mut range = Range::new(&tree);
        range.set_start_and_end(&tree, alpha, 2, gamma, 3).unwrap();
        let frag = range.extract_contents(&mut tree).unwrap();
        assert_eq!(tree.data(alpha), "al");
        assert_eq!(tree.data(gamma), "ma");
        // The fragment holds the extracted tail, the whole span, and the
        // extracted head of gamma.
        let children = tree.children(frag).to_vec();
        assert_eq!(children.len(), 3);
        assert_eq!(tree.data(children[0]), "pha");
        assert_eq!(children[1], span);
        assert_eq!(tree.text_content(span), "beta");
        assert_eq!(tree.data(children[2]), "gam");
        assert_eq!(tree.text_content(beta), "beta");
        assert_eq!(tree.children(div).len(), 2);
    }

    #[test]
    fn test_extract_partial_subtree_leaves_shell() {
        let (mut tree, div, alpha, span, beta, _) = sample();
        let mut range = Range::new(&tree);
        range.set_start_and_end(&tree, alpha, 2, beta, 2).unwrap();
        let frag = range.extract_contents(&mut tree).unwrap();
        // Original span survives with the uncovered text.
        assert_eq!(tree.text_content(span), "ta");
        assert!(tree.children(div).contains(&span));
        // Extracted fragment has a span shell holding the covered text.
        let children = tree.children(frag).to_vec();
        assert_eq!(children.len(), 2);
        assert_eq!(tree.tag(children[1]), "span");
        assert_eq!(tree.text_content(children[1]), "be");
    }

    #[test]
    fn test_clone_contents_leaves_tree_untouched() {
        let (mut tree, _, alpha, _, _, gamma) = sample();
        let mut range = Range::new(&tree);
        range.set_start_and_end(&tree, alpha, 2, gamma, 3).unwrap();
        let frag = range.clone_contents(&mut tree).unwrap();
        assert_eq!(tree.text_content(frag), "phabetagam");
        assert_eq!(tree.data(alpha), "alpha");
        assert_eq!(tree.data(gamma), "gamma");
        assert!(!range.collapsed());
    }

    #[test]
    fn test_clone_contents_collapsed_is_empty_fragment() {
        let (mut tree, _, alpha, _, _, _) = sample();
        let mut range = Range::new(&tree);
        range.collapse_to_point(&tree, alpha, 2).unwrap();
        let frag = range.clone_contents(&mut tree).unwrap();
        assert!(tree.children(frag).is_empty());
    }

    #[test]
    fn test_insert_node_mid_text_splits() {
        let (mut tree, div, alpha, _, _, _) = sample();
        let mut range = Range::new(&tree);
        range.collapse_to_point(&tree, alpha, 2).unwrap();
        let em = tree.new_element("em");
        range.insert_node(&mut tree, em).unwrap();
        let children = tree.children(div).to_vec();
        assert_eq!(tree.data(children[0]), "al");
        assert_eq!(children[1], em);
        assert_eq!(tree.data(children[2]), "pha");
        // Start moved to just before the inserted node.
        assert_eq!(range.start_container(), div);
        assert_eq!(range.start_offset(), 1);
    }

    #[test]
    fn test_insert_fragment_flattens_and_starts_at_first() {
        let (mut tree, div, _, _, _, _) = sample();
        let mut range = Range::new(&tree);
        range.collapse_to_point(&tree, div, 1).unwrap();
        let frag = tree.new_fragment();
        let x = tree.new_text("x");
        let y = tree.new_text("y");
        tree.append_child(frag, x);
        tree.append_child(frag, y);
        range.insert_node(&mut tree, frag).unwrap();
        let children = tree.children(div).to_vec();
        assert_eq!(children[1], x);
        assert_eq!(children[2], y);
        assert_eq!(range.start_offset(), 1);
    }

    #[test]
    fn test_insert_into_own_descendant_is_hierarchy_error() {
        let (mut tree, div, alpha, _, _, _) = sample();
        let mut range = Range::new(&tree);
        range.collapse_to_point(&tree, alpha, 0).unwrap();
        assert!(matches!(
            range.insert_node(&mut tree, div),
            Err(RangeError::HierarchyRequest { .. })
        ));
    }

    #[test]
    fn test_read_only_blocks_removal() {
        let (mut tree, _, alpha, span, _, gamma) = sample();
        tree.set_read_only(span, true);
        let mut range = Range::new(&tree);
        range.set_start_and_end(&tree, alpha, 2, gamma, 3).unwrap();
        assert_eq!(
            range.delete_contents(&mut tree),
            Err(RangeError::NoModificationAllowed)
        );
        // Nothing was touched.
        assert_eq!(tree.data(alpha), "alpha");
        assert_eq!(tree.data(gamma), "gamma");
    }

    #[test]
    fn test_surround_contents_wraps_and_selects() {
        let (mut tree, _, _, _, beta, _) = sample();
        let mut range = Range::new(&tree);
        range.set_start_and_end(&tree, beta, 1, beta, 3).unwrap();
        let em = tree.new_element("em");
        range.surround_contents(&mut tree, em).unwrap();
        assert_eq!(tree.text_content(em), "et");
        // The wrapper sits between the split halves of beta.
        let span = tree.parent(em).unwrap();
        assert_eq!(tree.tag(span), "span");
        assert_eq!(tree.text_content(span), "beta");
        // Range now selects the wrapper.
        assert_eq!(range.start_container(), span);
        assert_eq!(
            tree.children(span)[range.start_offset()],
            em
        );
    }

    #[test]
    fn test_surround_sliced_element_is_bad_boundary_points() {
        let (mut tree, _, alpha, _, beta, _) = sample();
        let mut range = Range::new(&tree);
        range.set_start_and_end(&tree, alpha, 2, beta, 2).unwrap();
        let em = tree.new_element("em");
        assert!(!range.can_surround_contents(&tree).unwrap());
        assert!(matches!(
            range.surround_contents(&mut tree, em),
            Err(RangeError::BadBoundaryPoints { .. })
        ));
    }
}

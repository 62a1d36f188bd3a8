//! Shared builders for unit tests.

use crate::tree::{NodeId, Tree};

/// Standalone element with UA-default style; block for tags like `div`.
pub fn block(tree: &mut Tree, tag: &str) -> NodeId {
    tree.new_element(tag)
}

/// Element appended to `parent`.
pub fn child_element(tree: &mut Tree, parent: NodeId, tag: &str) -> NodeId {
    let e = tree.new_element(tag);
    tree.append_child(parent, e);
    e
}

/// Text node appended to `parent`.
pub fn text(tree: &mut Tree, parent: NodeId, data: &str) -> NodeId {
    let t = tree.new_text(data);
    tree.append_child(parent, t);
    t
}

//! Cache session for text-layer queries.
//!
//! Resolving what a reader sees at a position leans on per-node facts
//! (rendered-or-collapsed, implied spaces around blocks) and per-position
//! character state, both expensive to recompute. A [`Session`] memoizes
//! them for the lifetime of one batch of text operations. Sessions are
//! valid only while the tree is not mutated; after an edit, drop the
//! session and start a new one.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::ranges::Range;
use crate::text::position::{Position, PositionState};
use crate::tree::{Display, NodeId, NodeKind, Tree, Visibility};

/// Collapse behavior of a text node, derived from the parent's
/// `white-space`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TextNodeInfo {
    pub collapse_spaces: bool,
    pub pre_line: bool,
}

/// Whether `ch` belongs to the collapsible space class of a text node.
/// Under `pre-line`, newlines are literal and excluded from the class.
pub(crate) fn is_collapsible_space(info: TextNodeInfo, ch: char) -> bool {
    match ch {
        ' ' | '\t' | '\u{c}' | '\r' => true,
        '\n' => !info.pre_line,
        _ => false,
    }
}

#[derive(Default)]
struct NodeFacts {
    collapsed: Option<bool>,
    ignored: Option<bool>,
    text_info: Option<TextNodeInfo>,
    trailing_space: Option<Option<char>>,
    leading_space: Option<Option<char>>,
    rendered_block: Option<bool>,
    inner_text: Option<bool>,
}

pub struct Session<'t> {
    tree: &'t Tree,
    node_facts: RefCell<HashMap<NodeId, NodeFacts>>,
    pub(crate) positions: RefCell<HashMap<Position, PositionState>>,
}

impl<'t> Session<'t> {
    pub fn new(tree: &'t Tree) -> Self {
        Self {
            tree,
            node_facts: RefCell::new(HashMap::new()),
            positions: RefCell::new(HashMap::new()),
        }
    }

    pub fn tree(&self) -> &'t Tree {
        self.tree
    }

    /// The position of one boundary of a range.
    pub fn range_boundary_position(&self, range: &Range, start: bool) -> Position {
        let point = if start { range.start() } else { range.end() };
        Position::new(point.container, point.offset)
    }

    // ---- memoized node facts ----------------------------------------------

    /// A collapsed node occupies no visible positions: comments, processing
    /// instructions, `display: none` subtrees, scripts and styles, hidden
    /// text, and whitespace-only text that rendering drops.
    pub(crate) fn is_collapsed_node(&self, node: NodeId) -> bool {
        if let Some(v) = self.node_facts.borrow().get(&node).and_then(|f| f.collapsed) {
            return v;
        }
        let v = self.compute_collapsed(node);
        self.node_facts.borrow_mut().entry(node).or_default().collapsed = Some(v);
        v
    }

    fn compute_collapsed(&self, node: NodeId) -> bool {
        let tree = self.tree;
        match tree.kind(node) {
            NodeKind::Comment | NodeKind::ProcessingInstruction => true,
            kind => {
                if self.is_hidden(node) {
                    return true;
                }
                if kind == NodeKind::Element && matches!(tree.tag(node), "script" | "style") {
                    return true;
                }
                if kind == NodeKind::Text {
                    if let Some(parent) = tree.parent(node) {
                        if tree.kind(parent) == NodeKind::Element
                            && tree.style(parent).visibility == Visibility::Hidden
                        {
                            return true;
                        }
                    }
                    if self.is_collapsed_whitespace(node) {
                        return true;
                    }
                }
                false
            }
        }
    }

    fn is_hidden(&self, node: NodeId) -> bool {
        let tree = self.tree;
        let mut n = Some(node);
        while let Some(id) = n {
            if tree.kind(id) == NodeKind::Element && tree.style(id).display == Display::None {
                return true;
            }
            n = tree.parent(id);
        }
        false
    }

    /// Whitespace-only text in a collapsing context.
    fn is_whitespace_text(&self, node: NodeId) -> bool {
        let tree = self.tree;
        let data = tree.data(node);
        if data.is_empty() {
            return true;
        }
        let Some(parent) = tree.parent(node) else {
            return false;
        };
        if tree.kind(parent) != NodeKind::Element {
            return false;
        }
        let ws = tree.style(parent).white_space;
        if ws.is_pre_line() {
            data.chars().all(|c| matches!(c, ' ' | '\t' | '\r'))
        } else if ws.collapses_spaces() {
            data.chars().all(|c| matches!(c, ' ' | '\t' | '\r' | '\n'))
        } else {
            false
        }
    }

    fn is_collapsed_whitespace(&self, node: NodeId) -> bool {
        let tree = self.tree;
        if tree.data(node).is_empty() {
            return true;
        }
        if !self.is_whitespace_text(node) {
            return false;
        }
        match tree.parent(node) {
            Some(_) => self.is_hidden(node),
            None => true,
        }
    }

    /// Ignored nodes are skipped when looking for an inline's last rendered
    /// child.
    pub(crate) fn is_ignored_node(&self, node: NodeId) -> bool {
        if let Some(v) = self.node_facts.borrow().get(&node).and_then(|f| f.ignored) {
            return v;
        }
        let tree = self.tree;
        let v = match tree.kind(node) {
            NodeKind::Comment | NodeKind::ProcessingInstruction => true,
            NodeKind::Element => tree.style(node).display == Display::None,
            _ => false,
        };
        self.node_facts.borrow_mut().entry(node).or_default().ignored = Some(v);
        v
    }

    pub(crate) fn text_node_info(&self, node: NodeId) -> TextNodeInfo {
        if let Some(v) = self
            .node_facts
            .borrow()
            .get(&node)
            .and_then(|f| f.text_info)
        {
            return v;
        }
        let tree = self.tree;
        let v = match tree.parent(node) {
            Some(parent) if tree.kind(parent) == NodeKind::Element => {
                let ws = tree.style(parent).white_space;
                TextNodeInfo {
                    collapse_spaces: ws.collapses_spaces(),
                    pre_line: ws.is_pre_line(),
                }
            }
            _ => TextNodeInfo {
                collapse_spaces: false,
                pre_line: false,
            },
        };
        self.node_facts.borrow_mut().entry(node).or_default().text_info = Some(v);
        v
    }

    /// The implied visible space after an element: a newline after a
    /// rendered block, a tab after a table cell, recursion into the last
    /// rendered child of an inline.
    pub(crate) fn trailing_space(&self, node: NodeId) -> Option<char> {
        if let Some(v) = self
            .node_facts
            .borrow()
            .get(&node)
            .and_then(|f| f.trailing_space)
        {
            return v;
        }
        let v = self.compute_trailing_space(node);
        self.node_facts
            .borrow_mut()
            .entry(node)
            .or_default()
            .trailing_space = Some(v);
        v
    }

    fn compute_trailing_space(&self, node: NodeId) -> Option<char> {
        let tree = self.tree;
        if tree.tag(node) == "br" {
            return None;
        }
        match tree.style(node).display {
            Display::Inline => {
                let mut child = tree.last_child(node);
                while let Some(c) = child {
                    if !self.is_ignored_node(c) {
                        return if tree.kind(c) == NodeKind::Element {
                            self.trailing_space(c)
                        } else {
                            None
                        };
                    }
                    child = tree.previous_sibling(c);
                }
                None
            }
            Display::InlineBlock | Display::None => None,
            Display::TableCell => Some('\t'),
            Display::Block | Display::ListItem => {
                if self.is_rendered_block(node) {
                    Some('\n')
                } else {
                    None
                }
            }
        }
    }

    /// The implied line break before a rendered block element.
    pub(crate) fn leading_space(&self, node: NodeId) -> Option<char> {
        if let Some(v) = self
            .node_facts
            .borrow()
            .get(&node)
            .and_then(|f| f.leading_space)
        {
            return v;
        }
        let v = match self.tree.style(node).display {
            Display::Block | Display::ListItem => {
                if self.is_rendered_block(node) {
                    Some('\n')
                } else {
                    None
                }
            }
            _ => None,
        };
        self.node_facts
            .borrow_mut()
            .entry(node)
            .or_default()
            .leading_space = Some(v);
        v
    }

    /// A block is rendered when it holds a live `<br>` or any visible text.
    pub(crate) fn is_rendered_block(&self, node: NodeId) -> bool {
        if let Some(v) = self
            .node_facts
            .borrow()
            .get(&node)
            .and_then(|f| f.rendered_block)
        {
            return v;
        }
        let tree = self.tree;
        let mut live_br = false;
        tree.walk_subtree(node, &mut |n| {
            if tree.kind(n) == NodeKind::Element
                && tree.tag(n) == "br"
                && !self.is_collapsed_node(n)
            {
                live_br = true;
                return false;
            }
            true
        });
        let v = live_br || self.has_inner_text(node);
        self.node_facts
            .borrow_mut()
            .entry(node)
            .or_default()
            .rendered_block = Some(v);
        v
    }

    fn has_inner_text(&self, node: NodeId) -> bool {
        if let Some(v) = self
            .node_facts
            .borrow()
            .get(&node)
            .and_then(|f| f.inner_text)
        {
            return v;
        }
        let tree = self.tree;
        let end = tree
            .parent(node)
            .map(|p| Position::new(p, tree.node_index(node) + 1));
        let mut pos = Some(Position::new(node, 0));
        let mut v = false;
        while let Some(p) = pos {
            if Some(p) == end {
                break;
            }
            if self.is_definitely_non_empty(p) {
                v = true;
                break;
            }
            pos = self.next_visible(p);
        }
        self.node_facts
            .borrow_mut()
            .entry(node)
            .or_default()
            .inner_text = Some(v);
        v
    }
}

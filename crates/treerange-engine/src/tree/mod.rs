//! Arena-based document tree collaborator.
//!
//! The engine never owns nodes directly: the host owns a [`Tree`] (an arena
//! of nodes addressed by stable [`NodeId`] indices) and the range/text
//! machinery only holds ids into it. Parent/child/sibling relationships are
//! explicit index fields, so ancestor checks and sibling walks are cheap and
//! never chase raw references.
//!
//! Offsets into character-data nodes are **character** offsets, not byte
//! offsets. The splice helpers below do the UTF-8 boundary arithmetic.

use log::debug;
use serde::{Deserialize, Serialize};

/// Stable identifier of a node within a [`Tree`] arena.
///
/// Ids are never reused; removing a node from its parent leaves it in the
/// arena as an orphan (see [`Tree::is_orphan`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Node kind tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    Fragment,
    Element,
    Text,
    Comment,
    ProcessingInstruction,
    /// Exists only so hierarchy errors are expressible; carries no content.
    Doctype,
}

impl NodeKind {
    /// Character-data nodes hold text content directly instead of children.
    pub fn is_character_data(self) -> bool {
        matches!(
            self,
            NodeKind::Text | NodeKind::Comment | NodeKind::ProcessingInstruction
        )
    }

    /// Container nodes are recognized roots for range boundaries.
    pub fn is_container(self) -> bool {
        matches!(self, NodeKind::Document | NodeKind::Fragment)
    }
}

/// Computed `display` category of an element, as reported by the host's
/// layout. The engine only reads this; it never computes layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Display {
    #[default]
    Inline,
    Block,
    InlineBlock,
    ListItem,
    TableCell,
    None,
}

/// Computed `white-space` category of an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WhiteSpace {
    #[default]
    Normal,
    Nowrap,
    Pre,
    PreWrap,
    PreLine,
}

impl WhiteSpace {
    /// Whether runs of collapsible whitespace collapse to a single space.
    pub fn collapses_spaces(self) -> bool {
        matches!(self, WhiteSpace::Normal | WhiteSpace::Nowrap | WhiteSpace::PreLine)
    }

    /// In `pre-line`, newlines are preserved and only blanks collapse.
    pub fn is_pre_line(self) -> bool {
        matches!(self, WhiteSpace::PreLine)
    }
}

/// Computed `visibility` of an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Visible,
    Hidden,
}

/// Computed style facts the engine consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Style {
    pub display: Display,
    pub white_space: WhiteSpace,
    pub visibility: Visibility,
}

impl Style {
    pub fn new(display: Display, white_space: WhiteSpace, visibility: Visibility) -> Self {
        Self {
            display,
            white_space,
            visibility,
        }
    }

    pub fn block() -> Self {
        Self {
            display: Display::Block,
            ..Self::default()
        }
    }

    pub fn inline() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    /// Element tag name, lowercase. Empty for non-elements.
    tag: String,
    /// Character data. Empty for non-character-data nodes.
    data: String,
    style: Style,
    read_only: bool,
}

impl Node {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
            tag: String::new(),
            data: String::new(),
            style: Style::default(),
            read_only: false,
        }
    }
}

/// Default UA-style classification for common tags, used by the
/// [`Tree::new_element`] convenience constructor. Hosts with a real layout
/// engine should use [`Tree::new_element_with_style`] instead.
fn default_style_for(tag: &str) -> Style {
    let display = match tag {
        "div" | "p" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "blockquote" | "pre" | "ul"
        | "ol" | "section" | "article" | "body" => Display::Block,
        "li" => Display::ListItem,
        "td" | "th" => Display::TableCell,
        _ => Display::Inline,
    };
    let white_space = if tag == "pre" {
        WhiteSpace::Pre
    } else {
        WhiteSpace::Normal
    };
    Style {
        display,
        white_space,
        visibility: Visibility::Visible,
    }
}

/// Elements that can never contain range positions (void elements).
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "basefont", "br", "col", "frame", "hr", "img", "input", "isindex", "link",
    "meta", "param",
];

/// The host-owned node arena.
///
/// A fresh tree contains a single `Document` root. All structural mutation
/// goes through the methods here; the range layer performs its own validity
/// and hierarchy checks *before* calling in, so these methods treat violated
/// preconditions as programmer errors.
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    pub fn new() -> Self {
        let mut tree = Self {
            nodes: Vec::new(),
            root: NodeId(0),
        };
        tree.root = tree.alloc(Node::new(NodeKind::Document));
        tree
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    /// The document node every fresh tree is rooted at.
    pub fn root(&self) -> NodeId {
        self.root
    }

    // ---- construction ----------------------------------------------------

    /// Create an element with UA-default style for its tag.
    pub fn new_element(&mut self, tag: &str) -> NodeId {
        self.new_element_with_style(tag, default_style_for(tag))
    }

    pub fn new_element_with_style(&mut self, tag: &str, style: Style) -> NodeId {
        let mut node = Node::new(NodeKind::Element);
        node.tag = tag.to_ascii_lowercase();
        node.style = style;
        self.alloc(node)
    }

    pub fn new_text(&mut self, data: &str) -> NodeId {
        let mut node = Node::new(NodeKind::Text);
        node.data = data.to_string();
        self.alloc(node)
    }

    pub fn new_comment(&mut self, data: &str) -> NodeId {
        let mut node = Node::new(NodeKind::Comment);
        node.data = data.to_string();
        self.alloc(node)
    }

    pub fn new_processing_instruction(&mut self, data: &str) -> NodeId {
        let mut node = Node::new(NodeKind::ProcessingInstruction);
        node.data = data.to_string();
        self.alloc(node)
    }

    pub fn new_doctype(&mut self, name: &str) -> NodeId {
        let mut node = Node::new(NodeKind::Doctype);
        node.tag = name.to_string();
        self.alloc(node)
    }

    pub fn new_fragment(&mut self) -> NodeId {
        self.alloc(Node::new(NodeKind::Fragment))
    }

    /// Mark a node read-only; content mutators refuse to touch it or its
    /// descendants.
    pub fn set_read_only(&mut self, node: NodeId, read_only: bool) {
        self.node_mut(node).read_only = read_only;
    }

    // ---- accessors -------------------------------------------------------

    pub fn kind(&self, node: NodeId) -> NodeKind {
        self.node(node).kind
    }

    pub fn tag(&self, node: NodeId) -> &str {
        &self.node(node).tag
    }

    pub fn data(&self, node: NodeId) -> &str {
        &self.node(node).data
    }

    pub fn style(&self, node: NodeId) -> Style {
        self.node(node).style
    }

    pub fn is_read_only(&self, node: NodeId) -> bool {
        self.node(node).read_only
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node).parent
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.node(node).children
    }

    pub fn first_child(&self, node: NodeId) -> Option<NodeId> {
        self.node(node).children.first().copied()
    }

    pub fn last_child(&self, node: NodeId) -> Option<NodeId> {
        self.node(node).children.last().copied()
    }

    /// Index of a node among its parent's children; 0 for a parentless node.
    pub fn node_index(&self, node: NodeId) -> usize {
        match self.node(node).parent {
            Some(parent) => self
                .node(parent)
                .children
                .iter()
                .position(|&c| c == node)
                .unwrap_or(0),
            None => 0,
        }
    }

    pub fn previous_sibling(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.node(node).parent?;
        let idx = self.node_index(node);
        if idx == 0 {
            None
        } else {
            Some(self.node(parent).children[idx - 1])
        }
    }

    pub fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.node(node).parent?;
        let idx = self.node_index(node);
        self.node(parent).children.get(idx + 1).copied()
    }

    /// Boundary length of a node: character count for character data, child
    /// count otherwise. Doctypes have length 0.
    pub fn node_length(&self, node: NodeId) -> usize {
        let n = self.node(node);
        match n.kind {
            NodeKind::Text | NodeKind::Comment | NodeKind::ProcessingInstruction => {
                n.data.chars().count()
            }
            NodeKind::Doctype => 0,
            _ => n.children.len(),
        }
    }

    pub fn char_len(&self, node: NodeId) -> usize {
        self.node(node).data.chars().count()
    }

    /// Character at a char offset of a character-data node.
    pub fn char_at(&self, node: NodeId, offset: usize) -> Option<char> {
        self.node(node).data.chars().nth(offset)
    }

    /// Substring of a character-data node, by char offsets.
    pub fn substring_data(&self, node: NodeId, start: usize, end: usize) -> String {
        let data = &self.node(node).data;
        let from = char_to_byte(data, start);
        let to = char_to_byte(data, end);
        data[from..to].to_string()
    }

    /// Whether a node can contain range positions (character data, or any
    /// element other than the void elements).
    pub fn contains_positions(&self, node: NodeId) -> bool {
        let n = self.node(node);
        match n.kind {
            NodeKind::Element => !VOID_ELEMENTS.contains(&n.tag.as_str()),
            NodeKind::Doctype => false,
            _ => true,
        }
    }

    // ---- ancestry --------------------------------------------------------

    pub fn is_ancestor_of(&self, ancestor: NodeId, descendant: NodeId, self_is_ancestor: bool) -> bool {
        let mut n = if self_is_ancestor {
            Some(descendant)
        } else {
            self.parent(descendant)
        };
        while let Some(id) = n {
            if id == ancestor {
                return true;
            }
            n = self.parent(id);
        }
        false
    }

    pub fn is_or_is_ancestor_of(&self, ancestor: NodeId, descendant: NodeId) -> bool {
        self.is_ancestor_of(ancestor, descendant, true)
    }

    /// The child of `ancestor` on the path down to `node` (or `node` itself
    /// when it is a direct child).
    pub fn closest_ancestor_in(
        &self,
        node: NodeId,
        ancestor: NodeId,
        self_is_ancestor: bool,
    ) -> Option<NodeId> {
        let mut n = if self_is_ancestor {
            Some(node)
        } else {
            self.parent(node)
        };
        while let Some(id) = n {
            let p = self.parent(id);
            if p == Some(ancestor) {
                return Some(id);
            }
            n = p;
        }
        None
    }

    /// Nearest node that is an inclusive ancestor of both arguments.
    pub fn common_ancestor(&self, a: NodeId, b: NodeId) -> Option<NodeId> {
        let mut ancestors = Vec::new();
        let mut n = Some(a);
        while let Some(id) = n {
            ancestors.push(id);
            n = self.parent(id);
        }
        let mut n = Some(b);
        while let Some(id) = n {
            if ancestors.contains(&id) {
                return Some(id);
            }
            n = self.parent(id);
        }
        None
    }

    /// Topmost node reachable from `node` by parent links.
    pub fn root_container(&self, node: NodeId) -> NodeId {
        let mut n = node;
        while let Some(parent) = self.parent(n) {
            n = parent;
        }
        n
    }

    /// Nearest inclusive ancestor that is a document or fragment, if any.
    pub fn document_or_fragment_container(&self, node: NodeId) -> Option<NodeId> {
        let mut n = Some(node);
        while let Some(id) = n {
            if self.kind(id).is_container() {
                return Some(id);
            }
            n = self.parent(id);
        }
        None
    }

    /// A node is an orphan when it is not attached under any document or
    /// fragment root. Boundaries on orphans are stale.
    pub fn is_orphan(&self, node: NodeId) -> bool {
        !self.kind(node).is_container() && self.document_or_fragment_container(node).is_none()
    }

    /// Nearest inclusive ancestor flagged read-only, if any.
    pub fn read_only_ancestor(&self, node: NodeId) -> Option<NodeId> {
        let mut n = Some(node);
        while let Some(id) = n {
            if self.node(id).read_only {
                return Some(id);
            }
            n = self.parent(id);
        }
        None
    }

    /// Nearest inclusive (or exclusive) ancestor that is a doctype, if any.
    pub fn doctype_ancestor(&self, node: NodeId, self_included: bool) -> Option<NodeId> {
        let mut n = if self_included {
            Some(node)
        } else {
            self.parent(node)
        };
        while let Some(id) = n {
            if self.kind(id) == NodeKind::Doctype {
                return Some(id);
            }
            n = self.parent(id);
        }
        None
    }

    // ---- mutation --------------------------------------------------------

    /// Insert `node` as a child of `parent` at `index`. Fragments are
    /// flattened: their children move and the fragment is left empty.
    pub fn insert_before(&mut self, parent: NodeId, node: NodeId, index: usize) {
        debug_assert!(!self.is_or_is_ancestor_of(node, parent), "insertion would create a cycle");
        if self.kind(node) == NodeKind::Fragment {
            let children = std::mem::take(&mut self.node_mut(node).children);
            for (i, child) in children.into_iter().enumerate() {
                self.node_mut(child).parent = Some(parent);
                self.node_mut(parent).children.insert(index + i, child);
            }
            return;
        }
        self.detach(node);
        let index = index.min(self.node(parent).children.len());
        self.node_mut(node).parent = Some(parent);
        self.node_mut(parent).children.insert(index, node);
    }

    pub fn append_child(&mut self, parent: NodeId, node: NodeId) {
        let index = self.node(parent).children.len();
        self.insert_before(parent, node, index);
    }

    /// Insert `node` immediately after `preceding` under the same parent.
    pub fn insert_after(&mut self, node: NodeId, preceding: NodeId) {
        let parent = self
            .parent(preceding)
            .expect("insert_after requires an attached reference node");
        let index = self.node_index(preceding) + 1;
        self.insert_before(parent, node, index);
    }

    /// Detach a node from its parent. The node stays in the arena as an
    /// orphan; any boundary pointing at it becomes stale.
    pub fn detach(&mut self, node: NodeId) {
        if let Some(parent) = self.node(node).parent {
            let idx = self.node_index(node);
            self.node_mut(parent).children.remove(idx);
            self.node_mut(node).parent = None;
        }
    }

    /// Shallow or deep clone; the clone is allocated parentless.
    pub fn clone_node(&mut self, node: NodeId, deep: bool) -> NodeId {
        let mut copy = self.node(node).clone();
        copy.parent = None;
        copy.children = Vec::new();
        let clone = self.alloc(copy);
        if deep {
            let children = self.node(node).children.clone();
            for child in children {
                let child_clone = self.clone_node(child, true);
                self.node_mut(child_clone).parent = Some(clone);
                self.node_mut(clone).children.push(child_clone);
            }
        }
        clone
    }

    pub fn insert_data(&mut self, node: NodeId, offset: usize, text: &str) {
        let byte = char_to_byte(&self.node(node).data, offset);
        self.node_mut(node).data.insert_str(byte, text);
    }

    pub fn append_data(&mut self, node: NodeId, text: &str) {
        self.node_mut(node).data.push_str(text);
    }

    pub fn delete_data(&mut self, node: NodeId, start: usize, end: usize) {
        let data = &self.node(node).data;
        let from = char_to_byte(data, start);
        let to = char_to_byte(data, end);
        self.node_mut(node).data.replace_range(from..to, "");
    }

    pub fn set_data(&mut self, node: NodeId, text: &str) {
        self.node_mut(node).data = text.to_string();
    }

    /// Split a character-data node at a char offset. The tail moves into a
    /// fresh sibling inserted directly after `node`, which is returned.
    ///
    /// `positions` is a caller-supplied list of (node, offset) pairs kept
    /// correct across the structural edit: a position inside the moved tail
    /// is re-pointed at the new node, and a sibling-index position past the
    /// split point is incremented.
    pub fn split_text(
        &mut self,
        node: NodeId,
        offset: usize,
        positions: &mut [(NodeId, usize)],
    ) -> NodeId {
        debug!(
            "split_text at {} in {}",
            offset,
            self.inspect_node(node)
        );
        let tail = self.substring_data(node, offset, self.char_len(node));
        self.delete_data(node, offset, self.char_len(node));
        let new_node = self.clone_node(node, false);
        self.set_data(new_node, &tail);
        self.insert_after(new_node, node);

        let parent = self.parent(node);
        let node_idx = self.node_index(node);
        for position in positions.iter_mut() {
            if position.0 == node && position.1 > offset {
                position.0 = new_node;
                position.1 -= offset;
            } else if Some(position.0) == parent && position.1 > node_idx {
                position.1 += 1;
            }
        }
        new_node
    }

    // ---- traversal helpers -----------------------------------------------

    /// Depth-first walk of a subtree, inclusive of `node`. The visitor
    /// returns `false` to stop early; the return value reports whether the
    /// walk ran to completion.
    pub fn walk_subtree(&self, node: NodeId, f: &mut impl FnMut(NodeId) -> bool) -> bool {
        if !f(node) {
            return false;
        }
        for &child in self.node(node).children.iter() {
            if !self.walk_subtree(child, f) {
                return false;
            }
        }
        true
    }

    /// Concatenated text content of a subtree (raw, no whitespace handling).
    pub fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.walk_subtree(node, &mut |n| {
            if self.kind(n) == NodeKind::Text {
                out.push_str(self.data(n));
            }
            true
        });
        out
    }

    /// Short human-readable description of a node for error/log messages.
    pub fn inspect_node(&self, node: NodeId) -> String {
        let n = self.node(node);
        match n.kind {
            NodeKind::Element => format!("<{}>[{}]", n.tag, n.children.len()),
            NodeKind::Text => format!("\"{}\"", n.data),
            NodeKind::Comment => format!("<!--{}-->", n.data),
            NodeKind::ProcessingInstruction => format!("<?{}?>", n.data),
            NodeKind::Document => "#document".to_string(),
            NodeKind::Fragment => "#fragment".to_string(),
            NodeKind::Doctype => format!("<!DOCTYPE {}>", n.tag),
        }
    }
}

/// Byte index of a char offset, clamped to the end of the string.
pub(crate) fn char_to_byte(s: &str, char_offset: usize) -> usize {
    s.char_indices()
        .nth(char_offset)
        .map_or(s.len(), |(byte, _)| byte)
}

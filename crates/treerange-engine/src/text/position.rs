//! Positions between units of the tree and the visible character each one
//! carries.
//!
//! A [`Position`] is `(node, offset)`: a character offset inside character
//! data, a child index otherwise. Every position owns at most one visible
//! character, the one a reader would see immediately before it. Whether a
//! collapsible space is actually visible depends on its neighbors, so
//! resolution happens in stages: `prepopulate` pins down what can be known
//! from the position alone, `resolve_spaces` folds in implied spaces around
//! element boundaries, and `character` runs the full neighborhood analysis
//! under a given [`CharacterOptions`].

use std::collections::HashMap;

use log::trace;

use crate::text::session::{Session, is_collapsible_space};
use crate::text::CharacterOptions;
use crate::tree::{NodeId, NodeKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub node: NodeId,
    pub offset: usize,
}

impl Position {
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }
}

/// How the character before a position behaves under collapsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum CharType {
    /// No character precedes the position.
    #[default]
    Empty,
    NonSpace,
    /// A space that rendering never collapses.
    UncollapsibleSpace,
    /// A space whose visibility depends on the neighborhood.
    Collapsible,
}

/// Where a collapsible space sits relative to breaks and blocks. Decides
/// which [`CharacterOptions`] flag governs it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum SpaceKind {
    #[default]
    None,
    BeforeBr,
    InBlock,
    BeforeBlock,
    PreLine,
    TrailingBreakAfterBr,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct PositionState {
    pub prepopulated: bool,
    pub character: Option<char>,
    pub char_type: CharType,
    pub is_br: bool,
    pub is_leading_space: bool,
    pub is_trailing_space: bool,
    /// The character is independent of options and neighbors.
    pub is_char_invariant: bool,
    pub check_leading: bool,
    pub check_trailing: bool,
    pub resolved_spaces: bool,
    pub space_kind: SpaceKind,
    /// Visible character per options cache key.
    pub resolved: HashMap<u8, Option<char>>,
    /// Memoized next uncollapsed position.
    pub next_uncollapsed: Option<Option<Position>>,
}

impl<'t> Session<'t> {
    pub(crate) fn position_state(&self, pos: Position) -> PositionState {
        self.positions
            .borrow()
            .get(&pos)
            .cloned()
            .unwrap_or_default()
    }

    pub(crate) fn store_position_state(&self, pos: Position, state: PositionState) {
        self.positions.borrow_mut().insert(pos, state);
    }

    // ---- raw traversal ----------------------------------------------------

    /// The next position in document order, stepping into children that can
    /// contain positions.
    pub(crate) fn next_position(&self, pos: Position) -> Option<Position> {
        let tree = self.tree();
        let Position { node, offset } = pos;
        if offset == tree.node_length(node) {
            return tree
                .parent(node)
                .map(|p| Position::new(p, tree.node_index(node) + 1));
        }
        if tree.kind(node).is_character_data() {
            return Some(Position::new(node, offset + 1));
        }
        let child = tree.children(node)[offset];
        if tree.contains_positions(child) {
            Some(Position::new(child, 0))
        } else {
            Some(Position::new(node, offset + 1))
        }
    }

    pub(crate) fn previous_position(&self, pos: Position) -> Option<Position> {
        let tree = self.tree();
        let Position { node, offset } = pos;
        if offset == 0 {
            return tree
                .parent(node)
                .map(|p| Position::new(p, tree.node_index(node)));
        }
        if tree.kind(node).is_character_data() {
            return Some(Position::new(node, offset - 1));
        }
        let child = tree.children(node)[offset - 1];
        if tree.contains_positions(child) {
            Some(Position::new(child, tree.node_length(child)))
        } else {
            Some(Position::new(node, offset - 1))
        }
    }

    /// The next position, hopping over collapsed subtrees.
    pub(crate) fn next_visible(&self, pos: Position) -> Option<Position> {
        let next = self.next_position(pos)?;
        let tree = self.tree();
        if self.is_collapsed_node(next.node) {
            return tree
                .parent(next.node)
                .map(|p| Position::new(p, tree.node_index(next.node) + 1));
        }
        Some(next)
    }

    pub(crate) fn previous_visible(&self, pos: Position) -> Option<Position> {
        let prev = self.previous_position(pos)?;
        let tree = self.tree();
        if self.is_collapsed_node(prev.node) {
            return tree
                .parent(prev.node)
                .map(|p| Position::new(p, tree.node_index(prev.node)));
        }
        Some(prev)
    }

    // ---- character resolution ----------------------------------------------

    /// First resolution stage: what the position's own node says about its
    /// character.
    pub(crate) fn prepopulate(&self, pos: Position) {
        let mut st = self.position_state(pos);
        if st.prepopulated {
            return;
        }
        st.prepopulated = true;
        let tree = self.tree();
        let Position { node, offset } = pos;
        if offset > 0 {
            if tree.kind(node).is_character_data() {
                let info = self.text_node_info(node);
                let ch = tree.char_at(node, offset - 1).unwrap_or(' ');
                if info.collapse_spaces {
                    if is_collapsible_space(info, ch) {
                        let after_space = offset > 1
                            && tree
                                .char_at(node, offset - 2)
                                .is_some_and(|c| is_collapsible_space(info, c));
                        if after_space {
                            // the earlier space in the run owns the character
                        } else if info.pre_line && tree.char_at(node, offset) == Some('\n') {
                            st.character = Some(' ');
                            st.char_type = CharType::Collapsible;
                            st.space_kind = SpaceKind::PreLine;
                        } else {
                            st.character = Some(' ');
                            st.char_type = CharType::Collapsible;
                        }
                    } else {
                        st.character = Some(ch);
                        st.char_type = CharType::NonSpace;
                        st.is_char_invariant = true;
                    }
                } else {
                    st.character = Some(ch);
                    st.char_type = CharType::UncollapsibleSpace;
                    st.is_char_invariant = true;
                }
            } else {
                let children = tree.children(node);
                let before = children[offset - 1];
                if tree.kind(before) == NodeKind::Element && !self.is_collapsed_node(before) {
                    if tree.tag(before) == "br" {
                        st.character = Some('\n');
                        st.is_br = true;
                        st.char_type = CharType::Collapsible;
                    } else {
                        st.check_trailing = true;
                    }
                }
                if st.character.is_none() {
                    if let Some(&after) = children.get(offset) {
                        if tree.kind(after) == NodeKind::Element
                            && !self.is_collapsed_node(after)
                        {
                            st.check_leading = true;
                        }
                    }
                }
            }
        }
        self.store_position_state(pos, st);
    }

    /// Second stage: fold in implied spaces around the elements adjacent to
    /// the position.
    pub(crate) fn resolve_spaces(&self, pos: Position) {
        self.prepopulate(pos);
        let mut st = self.position_state(pos);
        if st.resolved_spaces {
            return;
        }
        st.resolved_spaces = true;
        let tree = self.tree();
        if st.check_trailing {
            let child = tree.children(pos.node)[pos.offset - 1];
            if let Some(ch) = self.trailing_space(child) {
                st.is_trailing_space = true;
                st.character = Some(ch);
                st.char_type = CharType::Collapsible;
            }
            st.check_trailing = false;
        }
        if st.check_leading {
            let child = tree.children(pos.node)[pos.offset];
            if let Some(ch) = self.leading_space(child) {
                st.is_leading_space = true;
                st.character = Some(ch);
                st.char_type = CharType::Collapsible;
            }
            st.check_leading = false;
        }
        self.store_position_state(pos, st);
    }

    /// State with both resolution stages applied.
    pub(crate) fn resolved_state(&self, pos: Position) -> PositionState {
        self.resolve_spaces(pos);
        self.position_state(pos)
    }

    /// Used while probing whether a block renders at all.
    pub(crate) fn is_definitely_non_empty(&self, pos: Position) -> bool {
        self.prepopulate(pos);
        matches!(
            self.position_state(pos).char_type,
            CharType::NonSpace | CharType::UncollapsibleSpace
        )
    }

    /// The nearest following position carrying any character, visible or
    /// not. Memoized; independent of options.
    pub(crate) fn next_uncollapsed(&self, pos: Position) -> Option<Position> {
        if let Some(memo) = self.position_state(pos).next_uncollapsed {
            return memo;
        }
        let mut p = self.next_visible(pos);
        while let Some(q) = p {
            self.resolve_spaces(q);
            if self.position_state(q).character.is_some() {
                break;
            }
            p = self.next_visible(q);
        }
        let mut st = self.position_state(pos);
        st.next_uncollapsed = Some(p);
        self.store_position_state(pos, st);
        p
    }

    /// The nearest preceding position whose character is visible under the
    /// given options.
    pub(crate) fn previous_uncollapsed(
        &self,
        pos: Position,
        opts: &CharacterOptions,
    ) -> Option<Position> {
        let mut p = self.previous_visible(pos);
        while let Some(q) = p {
            if self.character(q, opts).is_some() {
                return Some(q);
            }
            p = self.previous_visible(q);
        }
        None
    }

    /// The visible character owned by `pos` under `opts`, if any.
    pub(crate) fn character(&self, pos: Position, opts: &CharacterOptions) -> Option<char> {
        self.resolve_spaces(pos);
        let st = self.position_state(pos);
        if st.is_char_invariant {
            return st.character;
        }
        let key = opts.cache_key();
        if let Some(cached) = st.resolved.get(&key) {
            return *cached;
        }
        let result = self.compute_character(pos, opts);
        trace!(
            "character at ({:?}, {}) resolved to {:?}",
            pos.node, pos.offset, result
        );
        let mut st = self.position_state(pos);
        st.resolved.insert(key, result);
        self.store_position_state(pos, st);
        result
    }

    fn compute_character(&self, pos: Position, opts: &CharacterOptions) -> Option<char> {
        let st = self.position_state(pos);
        if st.char_type != CharType::Collapsible {
            return None;
        }
        let ch = st.character?;

        // A collapsed space after nothing, a break or a trailing space is
        // never rendered.
        if ch == ' ' {
            let hidden = match self.previous_uncollapsed(pos, opts) {
                None => true,
                Some(p) => {
                    let ps = self.position_state(p);
                    ps.is_trailing_space || ps.character == Some('\n')
                }
            };
            if hidden {
                return None;
            }
        }

        if ch == '\n' && st.is_leading_space {
            // A block's leading break renders only after visible content
            // that did not itself end in a break.
            return match self.previous_uncollapsed(pos, opts) {
                Some(p) if self.position_state(p).character != Some('\n') => Some('\n'),
                _ => None,
            };
        }

        let Some(next) = self.next_uncollapsed(pos) else {
            return None;
        };
        let ns = self.position_state(next);
        let kind = if ns.is_br {
            SpaceKind::BeforeBr
        } else if ns.is_trailing_space && ns.character == Some('\n') {
            SpaceKind::InBlock
        } else if ns.is_leading_space && ns.character == Some('\n') {
            SpaceKind::BeforeBlock
        } else {
            st.space_kind
        };
        if kind != st.space_kind {
            let mut stw = self.position_state(pos);
            stw.space_kind = kind;
            self.store_position_state(pos, stw);
        }

        if ns.character == Some('\n') {
            if kind == SpaceKind::BeforeBr && !opts.include_space_before_br {
                return None;
            }
            if kind == SpaceKind::BeforeBlock && !opts.include_space_before_block {
                return None;
            }
            if kind == SpaceKind::InBlock
                && ns.is_trailing_space
                && !opts.include_block_content_trailing_space
            {
                return None;
            }
            if kind == SpaceKind::PreLine
                && ns.char_type == CharType::NonSpace
                && !opts.include_pre_line_trailing_space
            {
                return None;
            }
            match ch {
                '\n' => {
                    if ns.is_trailing_space {
                        if st.is_trailing_space {
                            return None;
                        }
                        if st.is_br {
                            // A break right before a block's trailing space
                            // absorbs it; the trailing space only survives
                            // when the break opened the block.
                            let mut nsw = self.position_state(next);
                            nsw.space_kind = SpaceKind::TrailingBreakAfterBr;
                            self.store_position_state(next, nsw);
                            if let Some(p) = self.previous_uncollapsed(pos, opts) {
                                let ps = self.position_state(p);
                                if ps.is_leading_space && ps.character == Some('\n') {
                                    let mut nsw = self.position_state(next);
                                    nsw.character = None;
                                    self.store_position_state(next, nsw);
                                }
                            }
                        }
                        None
                    } else {
                        Some('\n')
                    }
                }
                ' ' => Some(' '),
                _ => None,
            }
        } else {
            Some(ch)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{block, text};
    use crate::tree::Tree;

    fn visible_text(session: &Session<'_>, root: NodeId) -> String {
        let opts = CharacterOptions::default();
        let tree = session.tree();
        let end = Position::new(root, tree.node_length(root));
        let mut out = String::new();
        let mut pos = Some(Position::new(root, 0));
        while let Some(p) = pos {
            if let Some(ch) = session.character(p, &opts) {
                out.push(ch);
            }
            if p == end {
                break;
            }
            pos = session.next_visible(p);
        }
        out
    }

    #[test]
    fn collapses_space_runs_and_edges() {
        let mut tree = Tree::new();
        let div = block(&mut tree, "div");
        text(&mut tree, div, " a  b ");
        let session = Session::new(&tree);
        assert_eq!(visible_text(&session, div), "a b");
    }

    #[test]
    fn break_renders_as_newline() {
        let mut tree = Tree::new();
        let div = block(&mut tree, "div");
        text(&mut tree, div, "one");
        let br = tree.new_element("br");
        tree.append_child(div, br);
        text(&mut tree, div, "two");
        let session = Session::new(&tree);
        assert_eq!(visible_text(&session, div), "one\ntwo");
    }

    #[test]
    fn space_before_break_is_hidden_by_default() {
        let mut tree = Tree::new();
        let div = block(&mut tree, "div");
        text(&mut tree, div, "one ");
        let br = tree.new_element("br");
        tree.append_child(div, br);
        text(&mut tree, div, "two");
        let session = Session::new(&tree);
        assert_eq!(visible_text(&session, div), "one\ntwo");

        let session = Session::new(&tree);
        let opts = CharacterOptions::all_visible();
        let pos = Position::new(tree.children(div)[0], 4);
        assert_eq!(session.character(pos, &opts), Some(' '));
    }

    #[test]
    fn nested_blocks_imply_line_breaks() {
        let mut tree = Tree::new();
        let outer = block(&mut tree, "div");
        let first = block(&mut tree, "p");
        tree.append_child(outer, first);
        text(&mut tree, first, "alpha");
        let second = block(&mut tree, "p");
        tree.append_child(outer, second);
        text(&mut tree, second, "beta");
        let session = Session::new(&tree);
        assert_eq!(visible_text(&session, outer), "alpha\nbeta");
    }

    #[test]
    fn hidden_subtree_contributes_nothing() {
        let mut tree = Tree::new();
        let div = block(&mut tree, "div");
        text(&mut tree, div, "shown");
        let hidden = tree.new_element_with_style(
            "span",
            crate::tree::Style {
                display: crate::tree::Display::None,
                ..crate::tree::Style::inline()
            },
        );
        tree.append_child(div, hidden);
        text(&mut tree, hidden, "hidden");
        let session = Session::new(&tree);
        assert_eq!(visible_text(&session, div), "shown");
    }

    #[test]
    fn pre_formatted_text_keeps_every_space() {
        let mut tree = Tree::new();
        let pre = tree.new_element_with_style(
            "pre",
            crate::tree::Style {
                white_space: crate::tree::WhiteSpace::Pre,
                ..crate::tree::Style::block()
            },
        );
        text(&mut tree, pre, "a  b\nc");
        let session = Session::new(&tree);
        assert_eq!(visible_text(&session, pre), "a  b\nc");
    }

    #[test]
    fn pre_line_keeps_newlines_and_collapses_spaces() {
        let mut tree = Tree::new();
        let div = tree.new_element_with_style(
            "div",
            crate::tree::Style {
                white_space: crate::tree::WhiteSpace::PreLine,
                ..crate::tree::Style::block()
            },
        );
        text(&mut tree, div, "a  b \nc");
        let session = Session::new(&tree);
        assert_eq!(visible_text(&session, div), "a b \nc");
    }
}

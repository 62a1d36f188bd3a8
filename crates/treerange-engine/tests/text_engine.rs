//! End-to-end checks of the visible-text layer through the public API.

use pretty_assertions::assert_eq;
use rstest::rstest;
use treerange_engine::{
    CharacterOptions, Direction, ExpandOptions, FindOptions, MoveOptions, NodeId, Range,
    SearchPattern, Selection, Session, Style, TextUnit, Tree, Visibility, WhiteSpace,
};

fn element(tree: &mut Tree, parent: NodeId, tag: &str) -> NodeId {
    let e = tree.new_element(tag);
    tree.append_child(parent, e);
    e
}

fn styled_element(tree: &mut Tree, parent: NodeId, tag: &str, style: Style) -> NodeId {
    let e = tree.new_element_with_style(tag, style);
    tree.append_child(parent, e);
    e
}

fn text(tree: &mut Tree, parent: NodeId, data: &str) -> NodeId {
    let t = tree.new_text(data);
    tree.append_child(parent, t);
    t
}

fn visible_text(tree: &Tree, node: NodeId) -> String {
    let session = Session::new(tree);
    let mut range = Range::new(tree);
    range.select_node_contents(tree, node).unwrap();
    range.text(&session, &CharacterOptions::default())
}

#[rstest]
#[case(WhiteSpace::Normal, "a b")]
#[case(WhiteSpace::Nowrap, "a b")]
#[case(WhiteSpace::Pre, " a  b ")]
#[case(WhiteSpace::PreLine, "a b")]
fn white_space_controls_collapsing(#[case] white_space: WhiteSpace, #[case] expected: &str) {
    let mut tree = Tree::new();
    let root = tree.root();
    let div = styled_element(
        &mut tree,
        root,
        "div",
        Style {
            white_space,
            ..Style::block()
        },
    );
    text(&mut tree, div, " a  b ");
    assert_eq!(visible_text(&tree, div), expected);
}

#[test]
fn blocks_and_breaks_render_as_line_breaks() {
    let mut tree = Tree::new();
    let root = tree.root();
    let body = element(&mut tree, root, "body");
    let p1 = element(&mut tree, body, "p");
    text(&mut tree, p1, "one");
    let p2 = element(&mut tree, body, "p");
    text(&mut tree, p2, "two");
    element(&mut tree, p2, "br");
    text(&mut tree, p2, "three");
    assert_eq!(visible_text(&tree, body), "one\ntwo\nthree");
}

#[test]
fn hidden_and_non_rendered_content_is_skipped() {
    let mut tree = Tree::new();
    let root = tree.root();
    let div = element(&mut tree, root, "div");
    text(&mut tree, div, "a");
    let comment = tree.new_comment("note");
    tree.append_child(div, comment);
    let script = element(&mut tree, div, "script");
    text(&mut tree, script, "run()");
    let gone = styled_element(
        &mut tree,
        div,
        "span",
        Style {
            display: treerange_engine::Display::None,
            ..Style::inline()
        },
    );
    text(&mut tree, gone, "gone");
    let unseen = styled_element(
        &mut tree,
        div,
        "span",
        Style {
            visibility: Visibility::Hidden,
            ..Style::inline()
        },
    );
    text(&mut tree, unseen, "unseen");
    text(&mut tree, div, "b");
    assert_eq!(visible_text(&tree, div), "ab");
}

#[rstest]
#[case(CharacterOptions::default(), "a\nb")]
#[case(CharacterOptions::all_visible(), "a \nb")]
fn space_before_break_obeys_options(#[case] options: CharacterOptions, #[case] expected: &str) {
    let mut tree = Tree::new();
    let root = tree.root();
    let div = element(&mut tree, root, "div");
    text(&mut tree, div, "a ");
    element(&mut tree, div, "br");
    text(&mut tree, div, "b");
    let session = Session::new(&tree);
    let mut range = Range::new(&tree);
    range.select_node_contents(&tree, div).unwrap();
    assert_eq!(range.text(&session, &options), expected);
}

#[test]
fn select_characters_spans_block_boundaries() {
    let mut tree = Tree::new();
    let root = tree.root();
    let body = element(&mut tree, root, "body");
    let p1 = element(&mut tree, body, "p");
    text(&mut tree, p1, "one");
    let p2 = element(&mut tree, body, "p");
    text(&mut tree, p2, "two");
    let session = Session::new(&tree);
    let options = CharacterOptions::default();

    let mut range = Range::new(&tree);
    range
        .select_characters(&session, body, 0, 5, &options)
        .unwrap();
    assert_eq!(range.text(&session, &options), "one\nt");
    assert_eq!(
        range.to_character_range(&session, body, &options).unwrap(),
        treerange_engine::CharacterRange { start: 0, end: 5 }
    );
}

#[test]
fn find_text_is_confined_to_the_scope_range() {
    let mut tree = Tree::new();
    let root = tree.root();
    let body = element(&mut tree, root, "body");
    let p1 = element(&mut tree, body, "p");
    let t1 = text(&mut tree, p1, "alpha foo");
    let p2 = element(&mut tree, body, "p");
    text(&mut tree, p2, "also foo here");
    let session = Session::new(&tree);

    let mut scope = Range::new(&tree);
    scope.select_node_contents(&tree, p1).unwrap();
    let options = FindOptions {
        within_range: Some(scope),
        ..FindOptions::default()
    };

    let mut range = Range::new(&tree);
    let found = range
        .find_text(&session, &SearchPattern::Text("foo".into()), &options)
        .unwrap();
    assert!(found);
    assert_eq!(range.start_container(), t1);
    assert_eq!(range.start_offset(), 6);
    assert_eq!(range.end_offset(), 9);

    // "here" only occurs outside the scope.
    let mut miss = Range::new(&tree);
    let found = miss
        .find_text(&session, &SearchPattern::Text("here".into()), &options)
        .unwrap();
    assert!(!found);
}

#[test]
fn find_text_backward_takes_the_last_match() {
    let mut tree = Tree::new();
    let root = tree.root();
    let div = element(&mut tree, root, "div");
    let t = text(&mut tree, div, "foo bar foo");
    let session = Session::new(&tree);

    let mut range = Range::new(&tree);
    range.collapse_to_point(&tree, t, 11).unwrap();
    let options = FindOptions {
        direction: Direction::Backward,
        ..FindOptions::default()
    };
    let found = range
        .find_text(&session, &SearchPattern::Text("foo".into()), &options)
        .unwrap();
    assert!(found);
    assert_eq!(range.start_offset(), 8);
    assert_eq!(range.end_offset(), 11);
}

#[test]
fn expand_with_trim_drops_edge_whitespace() {
    let mut tree = Tree::new();
    let root = tree.root();
    let div = element(&mut tree, root, "div");
    let t = text(&mut tree, div, "one two three");
    let session = Session::new(&tree);

    let mut range = Range::new(&tree);
    range.set_start_and_end(&tree, t, 3, t, 8).unwrap();
    let options = ExpandOptions {
        trim: true,
        ..ExpandOptions::default()
    };
    let changed = range.expand(&session, TextUnit::Word, &options).unwrap();
    assert!(changed);
    assert_eq!(
        range.text(&session, &CharacterOptions::default()),
        "two"
    );
}

#[test]
fn caret_moves_by_words_across_blocks() {
    let mut tree = Tree::new();
    let root = tree.root();
    let body = element(&mut tree, root, "body");
    let p1 = element(&mut tree, body, "p");
    let t1 = text(&mut tree, p1, "one");
    let p2 = element(&mut tree, body, "p");
    let t2 = text(&mut tree, p2, "two");
    let session = Session::new(&tree);

    let mut selection = Selection::new();
    selection.collapse(&tree, t1, 0).unwrap();
    let moved = selection
        .move_caret(&session, TextUnit::Word, 2, &MoveOptions::default())
        .unwrap();
    assert_eq!(moved, 2);
    let focus = selection.focus().unwrap();
    assert_eq!(focus.container, t2);
    assert_eq!(focus.offset, 3);
}

#[test]
fn selection_text_spans_multiple_ranges() {
    let mut tree = Tree::new();
    let root = tree.root();
    let body = element(&mut tree, root, "body");
    let p1 = element(&mut tree, body, "p");
    text(&mut tree, p1, "first");
    let p2 = element(&mut tree, body, "p");
    text(&mut tree, p2, "second");
    let p3 = element(&mut tree, body, "p");
    text(&mut tree, p3, "third");
    let session = Session::new(&tree);

    let mut selection = Selection::new();
    let mut a = Range::new(&tree);
    a.select_node_contents(&tree, p1).unwrap();
    let mut c = Range::new(&tree);
    c.select_node_contents(&tree, p3).unwrap();
    selection.add_range(&tree, c).unwrap();
    selection.add_range(&tree, a).unwrap();
    assert_eq!(
        selection.text(&session, &CharacterOptions::default()),
        "firstthird"
    );

    let saved = selection.save(&tree, body).unwrap();
    let mut restored = Selection::new();
    restored.restore(&tree, &saved).unwrap();
    assert_eq!(restored.range_count(), 2);
    assert_eq!(
        restored.text(&session, &CharacterOptions::default()),
        "firstthird"
    );
}

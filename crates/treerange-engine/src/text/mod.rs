//! Visible-text layer: resolving tree positions to the characters a reader
//! would see, and moving, expanding and searching by them.
//!
//! All behavior knobs live in plain option structs with hard-coded defaults
//! matching modern rendering: collapsible spaces before a line break, a
//! block boundary or at the end of block content are invisible, while a
//! `pre-line` space before a literal newline is kept.

use regex::Regex;
use serde::{Deserialize, Serialize};

pub mod iterator;
pub mod movement;
pub mod position;
pub mod session;

pub use iterator::{CharacterIterator, CharacterPosition};
pub use position::Position;
pub use session::Session;

/// Visibility of collapsible spaces at the edges of rendered runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharacterOptions {
    /// Keep a collapsible space that directly precedes a `<br>`.
    pub include_space_before_br: bool,
    /// Keep a collapsible space at the end of a block's content.
    pub include_block_content_trailing_space: bool,
    /// Keep a collapsible space that directly precedes a block element.
    pub include_space_before_block: bool,
    /// Keep a `pre-line` collapsible space that precedes a literal newline.
    pub include_pre_line_trailing_space: bool,
}

impl Default for CharacterOptions {
    fn default() -> Self {
        Self {
            include_space_before_br: false,
            include_block_content_trailing_space: false,
            include_space_before_block: false,
            include_pre_line_trailing_space: true,
        }
    }
}

impl CharacterOptions {
    /// Every edge space visible; the raw collapsed-text reading.
    pub fn all_visible() -> Self {
        Self {
            include_space_before_br: true,
            include_block_content_trailing_space: true,
            include_space_before_block: true,
            include_pre_line_trailing_space: true,
        }
    }

    /// Per-option cache discriminator for resolved characters.
    pub(crate) fn cache_key(&self) -> u8 {
        (self.include_space_before_br as u8)
            | (self.include_block_content_trailing_space as u8) << 1
            | (self.include_space_before_block as u8) << 2
            | (self.include_pre_line_trailing_space as u8) << 3
    }
}

/// What counts as a word for word movement, expansion and whole-word search.
#[derive(Debug, Clone)]
pub struct WordOptions {
    pub word_regex: Regex,
    /// Extend each word token over the space run that follows it.
    pub include_trailing_space: bool,
}

impl Default for WordOptions {
    fn default() -> Self {
        Self {
            word_regex: Regex::new(r"(?i)[a-z0-9]+('[a-z0-9]+)*")
                .expect("default word pattern is valid"),
            include_trailing_space: false,
        }
    }
}

/// Unit for boundary movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextUnit {
    Character,
    Word,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Forward,
    Backward,
}

#[derive(Debug, Clone, Default)]
pub struct MoveOptions {
    pub character_options: CharacterOptions,
    pub word_options: WordOptions,
}

#[derive(Debug, Clone)]
pub struct ExpandOptions {
    pub character_options: CharacterOptions,
    pub word_options: WordOptions,
    /// Trim leading/trailing whitespace off the expanded range.
    pub trim: bool,
    pub trim_start: bool,
    pub trim_end: bool,
}

impl Default for ExpandOptions {
    fn default() -> Self {
        Self {
            character_options: CharacterOptions::default(),
            word_options: WordOptions::default(),
            trim: false,
            trim_start: true,
            trim_end: true,
        }
    }
}

/// Needle for [`crate::Range::find_text`].
#[derive(Debug, Clone)]
pub enum SearchPattern {
    Text(String),
    Regex(Regex),
}

#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    /// Case-sensitive comparison; applies to [`SearchPattern::Text`] only.
    pub case_sensitive: bool,
    /// Restrict the search to a range instead of the whole tree.
    pub within_range: Option<crate::ranges::Range>,
    pub whole_words_only: bool,
    /// Wrap around to the far side of the scope when nothing is found
    /// between the search origin and the scope edge.
    pub wrap: bool,
    pub direction: Direction,
    pub character_options: CharacterOptions,
    pub word_options: WordOptions,
}

/// Visible-character offsets of a range relative to a container node.
/// Offsets can be negative when the range starts before the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterRange {
    pub start: isize,
    pub end: isize,
}

/// General whitespace, as used for trimming and token splitting.
pub(crate) fn is_whitespace_char(c: char) -> bool {
    matches!(c,
        '\t'..='\r'
        | ' '
        | '\u{85}'
        | '\u{A0}'
        | '\u{1680}'
        | '\u{180E}'
        | '\u{2000}'..='\u{200B}'
        | '\u{2028}'
        | '\u{2029}'
        | '\u{202F}'
        | '\u{205F}'
        | '\u{3000}')
}

/// Space-like characters excluding line breaks; the trailing-space class for
/// word tokens.
pub(crate) fn is_space_not_line_break(c: char) -> bool {
    matches!(c,
        '\t'
        | ' '
        | '\u{A0}'
        | '\u{1680}'
        | '\u{180E}'
        | '\u{2000}'..='\u{200B}'
        | '\u{202F}'
        | '\u{205F}'
        | '\u{3000}')
}

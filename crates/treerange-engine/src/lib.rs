//! Document-tree ranges, selections and visible-text positions.
//!
//! The engine operates on a host-owned [`tree::Tree`] arena and never runs
//! layout itself: elements carry the computed style facts
//! ([`tree::Display`], [`tree::WhiteSpace`], [`tree::Visibility`]) the host
//! reports. On top of the arena sit three layers:
//!
//! - [`ranges`]: boundary points, the [`Range`] type with its boundary
//!   updates, comparisons and content mutators;
//! - [`text`]: the visible-text model resolving tree positions to the
//!   characters a reader would see, with character/word movement, expansion
//!   and search;
//! - [`selection`]: an ordered set of disjoint ranges with a direction.
//!
//! Text-layer operations take a [`text::Session`] that caches per-node facts
//! and resolved positions; a session is valid only while the tree is not
//! mutated.

pub mod error;
pub mod ranges;
pub mod selection;
pub mod text;
pub mod tree;

pub use error::RangeError;
pub use ranges::{BoundaryPoint, Bookmark, HowToCompare, NodePosition, Range, RangeIterator};
pub use selection::{Selection, SelectionBookmark};
pub use text::{
    CharacterIterator, CharacterOptions, CharacterPosition, CharacterRange, Direction,
    ExpandOptions, FindOptions, MoveOptions, Position, SearchPattern, Session, TextUnit,
    WordOptions,
};
pub use tree::{Display, NodeId, NodeKind, Style, Tree, Visibility, WhiteSpace};

#[cfg(test)]
pub mod tests;

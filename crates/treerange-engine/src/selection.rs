//! A selection: zero or more disjoint ranges kept in document order, plus a
//! direction flag for the caret end.

use std::cmp::Ordering;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::RangeError;
use crate::ranges::{compare_points, Bookmark, BoundaryPoint, Range};
use crate::text::{CharacterOptions, ExpandOptions, MoveOptions, Session, TextUnit};
use crate::tree::{NodeId, Tree};

#[derive(Debug, Clone, Default)]
pub struct Selection {
    ranges: Vec<Range>,
    backward: bool,
}

/// Serializable snapshot of a selection, relative to a container node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionBookmark {
    pub ranges: Vec<Bookmark>,
    pub backward: bool,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn range_count(&self) -> usize {
        self.ranges.len()
    }

    pub fn range_at(&self, index: usize) -> Option<&Range> {
        self.ranges.get(index)
    }

    pub fn ranges(&self) -> &[Range] {
        &self.ranges
    }

    /// Whether the caret end precedes the anchor end.
    pub fn is_backward(&self) -> bool {
        self.backward
    }

    /// The boundary the selection was extended from.
    pub fn anchor(&self) -> Option<BoundaryPoint> {
        let first = self.ranges.first()?;
        Some(if self.backward {
            first.end()
        } else {
            first.start()
        })
    }

    /// The boundary the selection was extended to; the caret.
    pub fn focus(&self) -> Option<BoundaryPoint> {
        if self.backward {
            self.ranges.first().map(Range::start)
        } else {
            self.ranges.last().map(Range::end)
        }
    }

    /// Insert a range, keeping document order by start boundary. All ranges
    /// of a selection must live under the same root.
    pub fn add_range(&mut self, tree: &Tree, range: Range) -> Result<(), RangeError> {
        range.assert_valid(tree)?;
        let start = range.start();
        if let Some(existing) = self.ranges.first() {
            if tree.root_container(existing.start_container())
                != tree.root_container(start.container)
            {
                return Err(RangeError::WrongDocument);
            }
        }
        let mut index = self.ranges.len();
        for (i, existing) in self.ranges.iter().enumerate() {
            let other = existing.start();
            if compare_points(
                tree,
                start.container,
                start.offset,
                other.container,
                other.offset,
            )? == Ordering::Less
            {
                index = i;
                break;
            }
        }
        debug!("add_range at index {index} of {}", self.ranges.len());
        self.ranges.insert(index, range);
        Ok(())
    }

    /// Remove the first range with the same boundaries. Returns whether one
    /// was found.
    pub fn remove_range(&mut self, range: &Range) -> bool {
        match self.ranges.iter().position(|r| r.equals(range)) {
            Some(i) => {
                self.ranges.remove(i);
                true
            }
            None => false,
        }
    }

    pub fn remove_all_ranges(&mut self) {
        self.ranges.clear();
        self.backward = false;
    }

    /// Replace the contents with a single range and a direction.
    pub fn set_single_range(
        &mut self,
        tree: &Tree,
        range: Range,
        backward: bool,
    ) -> Result<(), RangeError> {
        self.ranges.clear();
        self.add_range(tree, range)?;
        self.backward = backward;
        Ok(())
    }

    /// Collapse to a caret at a point.
    pub fn collapse(
        &mut self,
        tree: &Tree,
        node: NodeId,
        offset: usize,
    ) -> Result<(), RangeError> {
        let mut range = Range::new(tree);
        range.collapse_to_point(tree, node, offset)?;
        self.set_single_range(tree, range, false)
    }

    pub fn collapse_to_start(&mut self, tree: &Tree) -> Result<(), RangeError> {
        match self.ranges.first().map(Range::start) {
            Some(p) => self.collapse(tree, p.container, p.offset),
            None => Err(RangeError::not_found("selection has no ranges")),
        }
    }

    pub fn collapse_to_end(&mut self, tree: &Tree) -> Result<(), RangeError> {
        match self.ranges.last().map(Range::end) {
            Some(p) => self.collapse(tree, p.container, p.offset),
            None => Err(RangeError::not_found("selection has no ranges")),
        }
    }

    /// The visible text of all ranges, concatenated in document order.
    pub fn text(&self, session: &Session<'_>, options: &CharacterOptions) -> String {
        self.ranges
            .iter()
            .map(|r| r.text(session, options))
            .collect()
    }

    /// Snapshot the selection as character offsets under `container`.
    pub fn save(&self, tree: &Tree, container: NodeId) -> Result<SelectionBookmark, RangeError> {
        let mut ranges = Vec::with_capacity(self.ranges.len());
        for range in &self.ranges {
            ranges.push(range.bookmark(tree, container)?);
        }
        Ok(SelectionBookmark {
            ranges,
            backward: self.backward,
        })
    }

    /// Restore a snapshot; direction is preserved.
    pub fn restore(
        &mut self,
        tree: &Tree,
        bookmark: &SelectionBookmark,
    ) -> Result<(), RangeError> {
        let mut ranges = Vec::with_capacity(bookmark.ranges.len());
        for b in &bookmark.ranges {
            let mut range = Range::new(tree);
            range.move_to_bookmark(tree, b.clone())?;
            ranges.push(range);
        }
        self.ranges.clear();
        self.backward = bookmark.backward;
        for range in ranges {
            self.add_range(tree, range)?;
        }
        Ok(())
    }

    fn change_each_range(
        &mut self,
        mut op: impl FnMut(&mut Range) -> Result<bool, RangeError>,
    ) -> Result<bool, RangeError> {
        let mut changed = false;
        for range in &mut self.ranges {
            changed = op(range)? || changed;
        }
        Ok(changed)
    }

    /// Expand every range to unit boundaries.
    pub fn expand(
        &mut self,
        session: &Session<'_>,
        unit: TextUnit,
        options: &ExpandOptions,
    ) -> Result<bool, RangeError> {
        self.change_each_range(|r| r.expand(session, unit, options))
    }

    /// Trim surrounding whitespace off every range.
    pub fn trim(
        &mut self,
        session: &Session<'_>,
        options: &CharacterOptions,
    ) -> Result<bool, RangeError> {
        self.change_each_range(|r| r.trim(session, options))
    }

    /// Collapse to the focus and move it as a caret. Returns units moved.
    pub fn move_caret(
        &mut self,
        session: &Session<'_>,
        unit: TextUnit,
        count: isize,
        options: &MoveOptions,
    ) -> Result<isize, RangeError> {
        let tree = session.tree();
        let Some(focus) = self.focus() else {
            return Ok(0);
        };
        let mut range = Range::new(tree);
        range.collapse_to_point(tree, focus.container, focus.offset)?;
        let moved = range.move_by(session, unit, count, options)?;
        self.set_single_range(tree, range, false)?;
        Ok(moved)
    }
}

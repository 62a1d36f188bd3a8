//! Character- and word-based range operations: reading visible text,
//! moving boundaries, trimming, word expansion and text search.

use std::cmp::Ordering;

use log::debug;

use crate::error::RangeError;
use crate::ranges::{compare_points, Range};
use crate::text::iterator::{CharacterIterator, CharacterPosition, TokenizedTextProvider};
use crate::text::position::Position;
use crate::text::session::Session;
use crate::text::{
    is_whitespace_char, CharacterOptions, CharacterRange, Direction, ExpandOptions, FindOptions,
    MoveOptions, SearchPattern, TextUnit, WordOptions,
};
use crate::tree::NodeId;

/// Move a position by whole characters or words. Returns the landing
/// position and the units actually moved, negative when moving backward.
pub(crate) fn move_position_by(
    session: &Session<'_>,
    pos: Position,
    unit: TextUnit,
    count: isize,
    options: &MoveOptions,
) -> (Position, isize) {
    if count == 0 {
        return (pos, 0);
    }
    let backward = count < 0;
    let target = count.unsigned_abs();
    let direction = if backward {
        Direction::Backward
    } else {
        Direction::Forward
    };
    let mut new_pos = pos;
    let mut units = 0usize;
    let mut overrun: Option<CharacterPosition> = None;

    match unit {
        TextUnit::Character => {
            let mut it =
                CharacterIterator::new(session, pos, direction, None, options.character_options);
            while let Some(cp) = it.next() {
                if units < target {
                    units += 1;
                    new_pos = cp.position;
                } else {
                    overrun = Some(cp);
                    break;
                }
            }
        }
        TextUnit::Word => {
            let mut provider = TokenizedTextProvider::new(
                session,
                pos,
                options.character_options,
                options.word_options.clone(),
            );
            loop {
                if units >= target {
                    break;
                }
                let token = if backward {
                    provider.previous_start_token()
                } else {
                    provider.next_end_token()
                };
                let Some(token) = token else { break };
                if token.is_word {
                    units += 1;
                    new_pos = if backward {
                        token.chars[0].position
                    } else {
                        token.chars[token.chars.len() - 1].position
                    };
                }
            }
        }
    }

    if backward {
        new_pos = session.previous_visible(new_pos).unwrap_or(new_pos);
        return (new_pos, -(units as isize));
    }

    // A forward move can land on a block's implied leading break; pull the
    // position back to just after the block's last real character.
    if session.resolved_state(new_pos).is_leading_space {
        if unit == TextUnit::Word {
            let mut it = CharacterIterator::new(
                session,
                pos,
                Direction::Forward,
                None,
                options.character_options,
            );
            overrun = it.next();
        }
        if let Some(o) = overrun {
            new_pos = session.previous_visible(o.position).unwrap_or(new_pos);
        }
    }
    (new_pos, units as isize)
}

/// A located occurrence of a search needle.
struct SearchHit {
    start: Position,
    end: Position,
    valid: bool,
}

fn is_whole_word(
    session: &Session<'_>,
    start: Position,
    end: Position,
    word_options: &WordOptions,
) -> Result<bool, RangeError> {
    let tree = session.tree();
    let mut range = Range::new(tree);
    range.set_start_and_end(tree, start.node, start.offset, end.node, end.offset)?;
    let opts = ExpandOptions {
        word_options: word_options.clone(),
        ..ExpandOptions::default()
    };
    Ok(!range.expand(session, TextUnit::Word, &opts)?)
}

/// Scan for the needle from `from`, staying inside `scope`.
fn find_from_position(
    session: &Session<'_>,
    from: Position,
    pattern: &SearchPattern,
    needle: &str,
    scope: &Range,
    word_options: &WordOptions,
    options: &FindOptions,
) -> Result<Option<SearchHit>, RangeError> {
    let backward = options.direction == Direction::Backward;
    let limit = session.range_boundary_position(scope, backward);
    let direction = if backward {
        Direction::Backward
    } else {
        Direction::Forward
    };
    let mut it = CharacterIterator::new(
        session,
        from,
        direction,
        Some(limit),
        options.character_options,
    );

    let handle = |chars: &[CharacterPosition], l: usize, m: usize| -> Result<SearchHit, RangeError> {
        let first = chars[l].position;
        let start = session.previous_visible(first).unwrap_or(first);
        let end = chars[m - 1].position;
        let valid = !options.whole_words_only || is_whole_word(session, start, end, word_options)?;
        Ok(SearchHit { start, end, valid })
    };

    let mut text = String::new();
    let mut chars: Vec<CharacterPosition> = Vec::new();
    // Last complete regex match, kept until it can no longer grow.
    let mut pending: Option<(usize, usize)> = None;

    while let Some(cp) = it.next() {
        let mut ch = cp.character;
        if matches!(pattern, SearchPattern::Text(_)) && !options.case_sensitive {
            ch = ch.to_lowercase().next().unwrap_or(ch);
        }
        if backward {
            chars.insert(0, cp);
            text.insert(0, ch);
        } else {
            chars.push(cp);
            text.push(ch);
        }
        match pattern {
            SearchPattern::Text(_) => {
                if let Some(byte_idx) = text.find(needle) {
                    let l = text[..byte_idx].chars().count();
                    let m = l + needle.chars().count();
                    return Ok(Some(handle(&chars, l, m)?));
                }
            }
            SearchPattern::Regex(re) => {
                if let Some(mat) = re.find(&text) {
                    let l = text[..mat.start()].chars().count();
                    let m = l + text[mat.start()..mat.end()].chars().count();
                    pending = Some((l, m));
                    // Keep scanning while the match touches the growing edge;
                    // more characters could extend it.
                    let complete = if backward { l > 0 } else { m < chars.len() };
                    if complete {
                        return Ok(Some(handle(&chars, l, m)?));
                    }
                }
            }
        }
    }
    if let Some((l, m)) = pending {
        return Ok(Some(handle(&chars, l, m)?));
    }
    Ok(None)
}

impl Range {
    /// Iterator over the visible characters inside the range.
    pub fn characters<'s, 't>(
        &self,
        session: &'s Session<'t>,
        options: &CharacterOptions,
    ) -> CharacterIterator<'s, 't> {
        self.range_character_iterator(session, options, false)
    }

    fn range_character_iterator<'s, 't>(
        &self,
        session: &'s Session<'t>,
        options: &CharacterOptions,
        backward: bool,
    ) -> CharacterIterator<'s, 't> {
        let start = session.range_boundary_position(self, true);
        let end = session.range_boundary_position(self, false);
        if backward {
            CharacterIterator::new(session, end, Direction::Backward, Some(start), *options)
        } else {
            CharacterIterator::new(session, start, Direction::Forward, Some(end), *options)
        }
    }

    /// The text a reader would see inside the range.
    pub fn text(&self, session: &Session<'_>, options: &CharacterOptions) -> String {
        if self.collapsed() {
            return String::new();
        }
        self.characters(session, options)
            .map(|c| c.character)
            .collect()
    }

    /// Move the start boundary by characters or words. Returns the units
    /// actually moved, negative for backward movement.
    pub fn move_start(
        &mut self,
        session: &Session<'_>,
        unit: TextUnit,
        count: isize,
        options: &MoveOptions,
    ) -> Result<isize, RangeError> {
        self.move_range_boundary(session, true, unit, count, options)
    }

    pub fn move_end(
        &mut self,
        session: &Session<'_>,
        unit: TextUnit,
        count: isize,
        options: &MoveOptions,
    ) -> Result<isize, RangeError> {
        self.move_range_boundary(session, false, unit, count, options)
    }

    fn move_range_boundary(
        &mut self,
        session: &Session<'_>,
        is_start: bool,
        unit: TextUnit,
        count: isize,
        options: &MoveOptions,
    ) -> Result<isize, RangeError> {
        let pos = session.range_boundary_position(self, is_start);
        let (new_pos, units) = move_position_by(session, pos, unit, count, options);
        self.set_boundary(session.tree(), new_pos.node, new_pos.offset, is_start)?;
        Ok(units)
    }

    /// Collapse the range and move it as a caret: forward moves collapse to
    /// the end first, backward moves to the start.
    pub fn move_by(
        &mut self,
        session: &Session<'_>,
        unit: TextUnit,
        count: isize,
        options: &MoveOptions,
    ) -> Result<isize, RangeError> {
        if count == 0 {
            return Ok(0);
        }
        let move_start = count >= 0;
        self.collapse(session.tree(), !move_start)?;
        self.move_range_boundary(session, move_start, unit, count, options)
    }

    /// Drop leading visible whitespace. Returns whether anything changed.
    pub fn trim_start(
        &mut self,
        session: &Session<'_>,
        options: &CharacterOptions,
    ) -> Result<bool, RangeError> {
        self.trim_boundary(session, options, true)
    }

    /// Drop trailing visible whitespace.
    pub fn trim_end(
        &mut self,
        session: &Session<'_>,
        options: &CharacterOptions,
    ) -> Result<bool, RangeError> {
        self.trim_boundary(session, options, false)
    }

    fn trim_boundary(
        &mut self,
        session: &Session<'_>,
        options: &CharacterOptions,
        at_start: bool,
    ) -> Result<bool, RangeError> {
        let mut it = self.range_character_iterator(session, options, !at_start);
        let mut n = 0isize;
        while let Some(cp) = it.next() {
            if !is_whitespace_char(cp.character) {
                break;
            }
            n += 1;
        }
        drop(it);
        if n == 0 {
            return Ok(false);
        }
        let move_opts = MoveOptions {
            character_options: *options,
            word_options: WordOptions::default(),
        };
        if at_start {
            self.move_start(session, TextUnit::Character, n, &move_opts)?;
        } else {
            self.move_end(session, TextUnit::Character, -n, &move_opts)?;
        }
        Ok(true)
    }

    pub fn trim(
        &mut self,
        session: &Session<'_>,
        options: &CharacterOptions,
    ) -> Result<bool, RangeError> {
        let start_changed = self.trim_start(session, options)?;
        let end_changed = self.trim_end(session, options)?;
        Ok(start_changed || end_changed)
    }

    /// Expand the range outward to unit boundaries. For words, a collapsed
    /// range inside or directly after a word selects that word. Returns
    /// whether the boundaries changed.
    pub fn expand(
        &mut self,
        session: &Session<'_>,
        unit: TextUnit,
        options: &ExpandOptions,
    ) -> Result<bool, RangeError> {
        let tree = session.tree();
        if unit == TextUnit::Character {
            let move_opts = MoveOptions {
                character_options: options.character_options,
                word_options: options.word_options.clone(),
            };
            return Ok(self.move_end(session, TextUnit::Character, 1, &move_opts)? != 0);
        }

        let start_pos = session.range_boundary_position(self, true);
        let end_pos = session.range_boundary_position(self, false);
        let mut provider = TokenizedTextProvider::new(
            session,
            start_pos,
            options.character_options,
            options.word_options.clone(),
        );
        let mut start_token = provider.next_end_token();

        if self.collapsed() {
            // A caret right after a word belongs to that word, not to the
            // punctuation or space that follows it.
            if start_token.as_ref().is_some_and(|t| !t.is_word) {
                let mut back = TokenizedTextProvider::new(
                    session,
                    start_pos,
                    options.character_options,
                    options.word_options.clone(),
                );
                if let Some(bt) = back.previous_start_token() {
                    if bt.is_word {
                        start_token = Some(bt);
                    }
                }
            }
        }

        let end_token = if self.collapsed() {
            start_token.clone()
        } else {
            let mut back = TokenizedTextProvider::new(
                session,
                end_pos,
                options.character_options,
                options.word_options.clone(),
            );
            back.previous_start_token()
        };

        let mut changed = false;
        if let Some(token) = &start_token {
            let first = token.chars[0].position;
            let new_start = session.previous_visible(first).unwrap_or(first);
            if new_start != start_pos {
                self.set_start(tree, new_start.node, new_start.offset)?;
                changed = true;
            }
        }
        if let Some(token) = &end_token {
            if let Some(last) = token.chars.last() {
                if last.position != end_pos {
                    self.set_end(tree, last.position.node, last.position.offset)?;
                    changed = true;
                }
            }
        }
        if options.trim {
            if options.trim_start {
                changed = self.trim_start(session, &options.character_options)? || changed;
            }
            if options.trim_end {
                changed = self.trim_end(session, &options.character_options)? || changed;
            }
        }
        debug!("expand({:?}) changed={changed}", unit);
        Ok(changed)
    }

    /// Search for the pattern and select the first occurrence found.
    /// Returns false when nothing matches; the range is left untouched.
    pub fn find_text(
        &mut self,
        session: &Session<'_>,
        pattern: &SearchPattern,
        options: &FindOptions,
    ) -> Result<bool, RangeError> {
        let tree = session.tree();
        let backward = options.direction == Direction::Backward;
        let mut word_options = options.word_options.clone();
        if options.whole_words_only {
            word_options.include_trailing_space = false;
        }
        let mut scope = match &options.within_range {
            Some(r) => r.clone_range(),
            None => {
                let mut r = Range::new(tree);
                r.select_node_contents(tree, tree.root_container(self.start_container()))?;
                r
            }
        };
        let needle = match pattern {
            SearchPattern::Text(s) if !options.case_sensitive => s.to_lowercase(),
            SearchPattern::Text(s) => s.clone(),
            SearchPattern::Regex(_) => String::new(),
        };

        // Search origin: this range's leading boundary in the direction of
        // travel, clamped into the scope.
        let mut initial = session.range_boundary_position(self, !backward);
        match scope.compare_point(tree, initial.node, initial.offset)? {
            Ordering::Less => initial = session.range_boundary_position(&scope, true),
            Ordering::Greater => initial = session.range_boundary_position(&scope, false),
            Ordering::Equal => {}
        }

        let mut pos = initial;
        let mut wrapped = false;
        loop {
            let hit = find_from_position(
                session,
                pos,
                pattern,
                &needle,
                &scope,
                &word_options,
                options,
            )?;
            match hit {
                Some(hit) if hit.valid => {
                    debug!(
                        "find_text hit at ({:?}, {})..({:?}, {})",
                        hit.start.node, hit.start.offset, hit.end.node, hit.end.offset
                    );
                    self.set_start_and_end(
                        tree,
                        hit.start.node,
                        hit.start.offset,
                        hit.end.node,
                        hit.end.offset,
                    )?;
                    return Ok(true);
                }
                Some(hit) => {
                    pos = if backward { hit.start } else { hit.end };
                }
                None => {
                    if !options.wrap || wrapped {
                        return Ok(false);
                    }
                    pos = session.range_boundary_position(&scope, !backward);
                    scope.set_boundary(tree, initial.node, initial.offset, backward)?;
                    wrapped = true;
                }
            }
        }
    }

    /// Select a visible-character span inside a container node.
    pub fn select_characters(
        &mut self,
        session: &Session<'_>,
        container: NodeId,
        start: isize,
        end: isize,
        options: &CharacterOptions,
    ) -> Result<(), RangeError> {
        let tree = session.tree();
        let move_opts = MoveOptions {
            character_options: *options,
            word_options: WordOptions::default(),
        };
        self.select_node_contents(tree, container)?;
        self.collapse(tree, true)?;
        self.move_start(session, TextUnit::Character, start, &move_opts)?;
        self.collapse(tree, true)?;
        self.move_end(session, TextUnit::Character, end - start, &move_opts)?;
        Ok(())
    }

    /// The range's extent in visible characters, relative to the start of a
    /// container node. Offsets are negative when the range starts before the
    /// container.
    pub fn to_character_range(
        &self,
        session: &Session<'_>,
        container: NodeId,
        options: &CharacterOptions,
    ) -> Result<CharacterRange, RangeError> {
        let tree = session.tree();
        let parent = tree
            .parent(container)
            .ok_or_else(|| RangeError::not_found("container node has no parent"))?;
        let index = tree.node_index(container);
        let starts_before = compare_points(
            tree,
            self.start_container(),
            self.start_offset(),
            parent,
            index,
        )? == Ordering::Less;
        let mut probe = self.clone_range();
        let start = if starts_before {
            probe.set_start_and_end(
                tree,
                self.start_container(),
                self.start_offset(),
                parent,
                index,
            )?;
            -(probe.text(session, options).chars().count() as isize)
        } else {
            probe.set_start_and_end(
                tree,
                parent,
                index,
                self.start_container(),
                self.start_offset(),
            )?;
            probe.text(session, options).chars().count() as isize
        };
        let end = start + self.text(session, options).chars().count() as isize;
        Ok(CharacterRange { start, end })
    }
}

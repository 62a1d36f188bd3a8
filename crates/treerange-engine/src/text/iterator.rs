//! Streaming iteration over visible characters and word tokens.

use std::collections::HashMap;

use log::trace;

use crate::text::position::Position;
use crate::text::session::Session;
use crate::text::{
    is_space_not_line_break, is_whitespace_char, CharacterOptions, Direction, WordOptions,
};

/// A visible character together with the position that owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharacterPosition {
    pub position: Position,
    pub character: char,
}

/// Walks visible characters from a start position.
///
/// Forward iteration yields the characters strictly after the start, up to
/// and including the one owned by `limit`. Backward iteration yields the
/// character owned by the start itself, then walks toward `limit`,
/// exclusive.
pub struct CharacterIterator<'s, 't> {
    session: &'s Session<'t>,
    options: CharacterOptions,
    backward: bool,
    pos: Option<Position>,
    limit: Option<Position>,
    finished: bool,
    pending: Option<CharacterPosition>,
}

impl<'s, 't> CharacterIterator<'s, 't> {
    pub fn new(
        session: &'s Session<'t>,
        start: Position,
        direction: Direction,
        limit: Option<Position>,
        options: CharacterOptions,
    ) -> Self {
        let backward = direction == Direction::Backward;
        // A limit inside a collapsed subtree can never be reached; shift it
        // to the nearest visible position in the direction of travel.
        let limit = limit.and_then(|l| {
            if session.is_collapsed_node(l.node) {
                if backward {
                    session.previous_visible(l)
                } else {
                    session.next_visible(l)
                }
            } else {
                Some(l)
            }
        });
        Self {
            session,
            options,
            backward,
            pos: Some(start),
            limit,
            finished: false,
            pending: None,
        }
    }

    /// Push one character back; the next call to `next` returns it again.
    pub(crate) fn rewind(&mut self, cp: CharacterPosition) {
        self.pending = Some(cp);
    }

    fn step_raw(&mut self) -> Option<Position> {
        if self.finished {
            return None;
        }
        if self.backward {
            let out = self.pos?;
            match self.session.previous_visible(out) {
                Some(p) if Some(p) != self.limit => self.pos = Some(p),
                _ => {
                    self.finished = true;
                    self.pos = None;
                }
            }
            Some(out)
        } else {
            let cur = self.pos?;
            match self.session.next_visible(cur) {
                None => {
                    self.finished = true;
                    None
                }
                Some(n) => {
                    self.pos = Some(n);
                    if Some(n) == self.limit {
                        self.finished = true;
                    }
                    Some(n)
                }
            }
        }
    }
}

impl Iterator for CharacterIterator<'_, '_> {
    type Item = CharacterPosition;

    fn next(&mut self) -> Option<CharacterPosition> {
        if let Some(p) = self.pending.take() {
            return Some(p);
        }
        while let Some(pos) = self.step_raw() {
            if let Some(ch) = self.session.character(pos, &self.options) {
                return Some(CharacterPosition {
                    position: pos,
                    character: ch,
                });
            }
        }
        None
    }
}

/// A maximal run of word or non-word characters.
#[derive(Debug, Clone)]
pub(crate) struct Token {
    pub chars: Vec<CharacterPosition>,
    pub is_word: bool,
}

/// Split a character run into word and non-word tokens.
pub(crate) fn tokenize(chars: &[CharacterPosition], opts: &WordOptions) -> Vec<Token> {
    let joined: String = chars.iter().map(|c| c.character).collect();
    let mut char_of_byte = HashMap::new();
    for (ci, (bi, _)) in joined.char_indices().enumerate() {
        char_of_byte.insert(bi, ci);
    }
    char_of_byte.insert(joined.len(), chars.len());

    let mut tokens = Vec::new();
    let mut last = 0usize;
    for m in opts.word_regex.find_iter(&joined) {
        let start = char_of_byte[&m.start()];
        let mut end = char_of_byte[&m.end()];
        if end <= last {
            continue;
        }
        let start = start.max(last);
        if start > last {
            tokens.push(Token {
                chars: chars[last..start].to_vec(),
                is_word: false,
            });
        }
        if opts.include_trailing_space {
            while end < chars.len() && is_space_not_line_break(chars[end].character) {
                end += 1;
            }
        }
        tokens.push(Token {
            chars: chars[start..end].to_vec(),
            is_word: true,
        });
        last = end;
    }
    if last < chars.len() {
        tokens.push(Token {
            chars: chars[last..].to_vec(),
            is_word: false,
        });
    }
    tokens
}

/// Pull characters off an iterator up to the start of the next word.
///
/// A chunk therefore covers at most one word plus the whitespace around it,
/// which is the granularity tokens are refined at.
pub(crate) fn consume_word(it: &mut CharacterIterator<'_, '_>) -> Vec<CharacterPosition> {
    let mut chars = Vec::new();
    let mut seen_non_space = false;
    let mut space_found = false;
    while let Some(cp) = it.next() {
        if is_whitespace_char(cp.character) {
            if seen_non_space {
                space_found = true;
            }
        } else {
            if space_found {
                it.rewind(cp);
                break;
            }
            seen_non_space = true;
        }
        chars.push(cp);
    }
    chars
}

/// Serves word tokens on either side of a position, refining lazily.
///
/// Tokenizing a chunk in isolation can split a word at the chunk edge, so
/// whenever one incomplete token remains it is re-tokenized together with
/// the next chunk before being handed out.
pub(crate) struct TokenizedTextProvider<'s, 't> {
    forward_iter: CharacterIterator<'s, 't>,
    backward_iter: CharacterIterator<'s, 't>,
    word_options: WordOptions,
    forward_tokens: Vec<Token>,
    backward_tokens: Vec<Token>,
}

impl<'s, 't> TokenizedTextProvider<'s, 't> {
    pub(crate) fn new(
        session: &'s Session<'t>,
        pos: Position,
        char_options: CharacterOptions,
        word_options: WordOptions,
    ) -> Self {
        let mut forward_iter =
            CharacterIterator::new(session, pos, Direction::Forward, None, char_options);
        let mut backward_iter =
            CharacterIterator::new(session, pos, Direction::Backward, None, char_options);
        let forward_chunk = consume_word(&mut forward_iter);
        let mut backward_chunk = consume_word(&mut backward_iter);
        backward_chunk.reverse();

        let boundary = backward_chunk.len();
        let mut combined = backward_chunk;
        combined.extend(forward_chunk.iter().copied());
        let tokens = tokenize(&combined, &word_options);
        trace!(
            "seeded token provider with {} tokens around boundary {}",
            tokens.len(),
            boundary
        );

        // Split at the position; a token straddling it feeds both sides.
        let mut forward_tokens = Vec::new();
        let mut backward_tokens = Vec::new();
        let mut index = 0usize;
        for token in tokens {
            let start = index;
            let end = index + token.chars.len();
            index = end;
            if start < boundary {
                backward_tokens.push(token.clone());
            }
            if end > boundary && !forward_chunk.is_empty() {
                forward_tokens.push(token);
            }
        }

        Self {
            forward_iter,
            backward_iter,
            word_options,
            forward_tokens,
            backward_tokens,
        }
    }

    /// The next token ending after the position.
    pub(crate) fn next_end_token(&mut self) -> Option<Token> {
        loop {
            if self.forward_tokens.len() == 1 && !self.forward_tokens[0].is_word {
                let chunk = consume_word(&mut self.forward_iter);
                if !chunk.is_empty() {
                    let mut chars = self.forward_tokens.remove(0).chars;
                    chars.extend(chunk);
                    self.forward_tokens = tokenize(&chars, &self.word_options);
                    continue;
                }
            }
            break;
        }
        if self.forward_tokens.is_empty() {
            None
        } else {
            Some(self.forward_tokens.remove(0))
        }
    }

    /// The previous token starting before the position.
    pub(crate) fn previous_start_token(&mut self) -> Option<Token> {
        loop {
            if self.backward_tokens.len() == 1 && !self.backward_tokens[0].is_word {
                let mut chunk = consume_word(&mut self.backward_iter);
                if !chunk.is_empty() {
                    chunk.reverse();
                    chunk.extend(self.backward_tokens.pop().into_iter().flat_map(|t| t.chars));
                    self.backward_tokens = tokenize(&chunk, &self.word_options);
                    continue;
                }
            }
            break;
        }
        self.backward_tokens.pop()
    }
}

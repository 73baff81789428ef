//! Find-in-note overlay.
//!
//! Matches are computed over the note's flattened text and shown as
//! transient `search_match` marks. Mark positions are derived from the
//! flattened text at the moment they are applied; stored match offsets are
//! never patched after edits, the whole scan is redone instead.

use regex::{Regex, RegexBuilder};
use serde::Serialize;

use crate::doc::{DocError, Document, FlatText};
use crate::model::Mark;
use crate::util::unicode::byte_to_char;

/// A hit in the flattened text, in char offsets
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchMatch {
    pub from: usize,
    pub to: usize,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Prev,
}

/// Case-insensitive literal matcher for `query`
pub fn build_matcher(query: &str) -> Option<Regex> {
    if query.is_empty() {
        return None;
    }
    RegexBuilder::new(&regex::escape(query))
        .case_insensitive(true)
        .build()
        .ok()
}

/// All non-overlapping matches of `query` in `text`
pub fn find_matches(text: &str, query: &str) -> Vec<SearchMatch> {
    let Some(re) = build_matcher(query) else {
        return Vec::new();
    };
    re.find_iter(text)
        .map(|m| SearchMatch {
            from: byte_to_char(text, m.start()),
            to: byte_to_char(text, m.end()),
            text: m.as_str().to_string(),
        })
        .collect()
}

#[derive(Debug, Clone, Default)]
pub struct SearchOverlay {
    query: String,
    matches: Vec<SearchMatch>,
    active: usize,
    /// Content version the matches were computed against
    scanned_version: u64,
}

impl SearchOverlay {
    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn matches(&self) -> &[SearchMatch] {
        &self.matches
    }

    pub fn active(&self) -> Option<usize> {
        (!self.matches.is_empty()).then_some(self.active)
    }

    pub fn is_open(&self) -> bool {
        !self.query.is_empty()
    }

    /// Replace the query: clear every old highlight, rescan, highlight
    /// the new matches with the first one active. Returns the match count.
    pub fn search(&mut self, doc: &mut Document, query: &str) -> Result<usize, DocError> {
        self.query = query.to_string();
        self.active = 0;
        self.rescan(doc);
        self.render(doc)?;
        log::debug!("event=search matches={}", self.matches.len());
        Ok(self.matches.len())
    }

    /// Move the active match and return the document position to scroll to
    pub fn navigate(&mut self, doc: &mut Document, dir: Direction) -> Result<Option<usize>, DocError> {
        if doc.content_version() != self.scanned_version {
            self.rescan(doc);
        }
        let len = self.matches.len();
        if len == 0 {
            self.render(doc)?;
            return Ok(None);
        }
        self.active = match dir {
            Direction::Next => (self.active + 1) % len,
            Direction::Prev => (self.active + len - 1) % len,
        };
        self.render(doc)?;
        Ok(doc.flat_text().start_pos(self.matches[self.active].from))
    }

    /// Document position of the active match
    pub fn active_pos(&self, doc: &Document) -> Option<usize> {
        let m = self.matches.get(self.active)?;
        doc.flat_text().start_pos(m.from)
    }

    /// Remove every search highlight from the document
    pub fn clear_all(&self, doc: &mut Document) -> Result<(), DocError> {
        let size = doc.content_size();
        doc.apply(|tr| {
            tr.set_transient();
            tr.remove_marks(0, size, &|m| matches!(m, Mark::SearchMatch { .. }))
        })?;
        Ok(())
    }

    pub fn close(&mut self, doc: &mut Document) -> Result<(), DocError> {
        self.query.clear();
        self.matches.clear();
        self.active = 0;
        self.clear_all(doc)
    }

    fn rescan(&mut self, doc: &Document) {
        let flat = doc.flat_text();
        self.matches = find_matches(&flat.text, &self.query);
        if self.active >= self.matches.len() {
            self.active = 0;
        }
        self.scanned_version = doc.content_version();
    }

    /// Clear and reapply all marks in one transient transaction
    fn render(&self, doc: &mut Document) -> Result<(), DocError> {
        let flat = doc.flat_text();
        let ranges = mark_ranges(&flat, &self.matches);
        let size = doc.content_size();
        doc.apply(|tr| {
            tr.set_transient();
            tr.remove_marks(0, size, &|m| matches!(m, Mark::SearchMatch { .. }))?;
            for (i, (from, to)) in ranges.into_iter().enumerate() {
                let mark = Mark::SearchMatch {
                    query: self.query.clone(),
                    active: i == self.active,
                };
                tr.add_mark(from, to, mark)?;
            }
            Ok(())
        })?;
        Ok(())
    }
}

fn mark_ranges(flat: &FlatText, matches: &[SearchMatch]) -> Vec<(usize, usize)> {
    matches
        .iter()
        .filter_map(|m| Some((flat.start_pos(m.from)?, flat.end_pos(m.to)?)))
        .collect()
}

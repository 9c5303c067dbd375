//! Highlight layer marking every match of a search pattern.
//!
//! Queries use **character offsets**, like the rest of the crate. Matching runs on demand over
//! the lines intersecting the requested range, so a match never spans the window border unless
//! the pattern itself crosses line breaks.

use crate::attributes::AttributeSet;
use crate::changes::{ChangeSupport, HighlightsChange, ListenerId};
use crate::document::{Document, DocumentEdit};
use crate::highlight::Highlight;
use crate::layer::HighlightLayer;
use crate::sequence::{EmptySequence, HighlightsSequence, VecSequence};
use regex::{Regex, RegexBuilder};
use ropey::Rope;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;

/// Options that control how the pattern is matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    /// If `true`, performs a case-sensitive search.
    pub case_sensitive: bool,
    /// If `true`, matches only whole words (alphanumeric and `_`).
    pub whole_word: bool,
    /// If `true`, treats the query as a regex pattern.
    pub regex: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            case_sensitive: true,
            whole_word: false,
            regex: false,
        }
    }
}

/// Search errors.
#[derive(Debug, Error)]
pub enum SearchError {
    /// The provided regex pattern failed to compile.
    #[error("invalid regex: {0}")]
    InvalidRegex(#[from] regex::Error),
}

#[derive(Debug)]
struct Pattern {
    regex: Regex,
    whole_word: bool,
}

/// Layer highlighting the matches of a search query with a fixed set of attributes.
pub struct SearchMatchesLayer {
    attributes: AttributeSet,
    text: RwLock<Rope>,
    pattern: RwLock<Option<Pattern>>,
    changes: ChangeSupport,
}

impl SearchMatchesLayer {
    /// Create a layer without a pattern over `text`.
    pub fn new(text: Rope, attributes: AttributeSet) -> Self {
        Self {
            attributes,
            text: RwLock::new(text),
            pattern: RwLock::new(None),
            changes: ChangeSupport::new(),
        }
    }

    /// Create a layer over the current content of `document` that keeps following its edits.
    pub fn tracking(document: &Document, attributes: AttributeSet) -> (Arc<Self>, ListenerId) {
        let layer = Arc::new(Self::new(document.snapshot(), attributes));
        let id = layer.track(document);
        (layer, id)
    }

    /// Follow the edits of `document`.
    pub fn track(self: &Arc<Self>, document: &Document) -> ListenerId {
        let layer = Arc::clone(self);
        document.subscribe(move |edit| layer.apply_edit(edit))
    }

    /// Attributes applied to matches.
    pub fn attributes(&self) -> &AttributeSet {
        &self.attributes
    }

    /// Search for `query`; an empty query clears the pattern.
    pub fn set_pattern(&self, query: &str, options: SearchOptions) -> Result<(), SearchError> {
        let pattern = if query.is_empty() {
            None
        } else {
            let source = if options.regex {
                query.to_string()
            } else {
                regex::escape(query)
            };
            let regex = RegexBuilder::new(&source)
                .case_insensitive(!options.case_sensitive)
                .multi_line(true)
                .build()?;
            Some(Pattern {
                regex,
                whole_word: options.whole_word,
            })
        };
        *self.pattern.write().unwrap_or_else(PoisonError::into_inner) = pattern;
        self.changes.fire(&HighlightsChange::everything());
        Ok(())
    }

    /// Stop highlighting matches.
    pub fn clear_pattern(&self) {
        let previous = self
            .pattern
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if previous.is_some() {
            self.changes.fire(&HighlightsChange::everything());
        }
    }

    /// Returns `true` if a pattern is set.
    pub fn has_pattern(&self) -> bool {
        self.pattern
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Replace the searched text.
    pub fn set_text(&self, text: Rope) {
        *self.text.write().unwrap_or_else(PoisonError::into_inner) = text;
        if self.has_pattern() {
            self.changes.fire(&HighlightsChange::everything());
        }
    }

    /// Apply a document edit notification.
    ///
    /// Matches from the start of the edited line onwards may have changed.
    pub fn apply_edit(&self, edit: &DocumentEdit) {
        let line_start = {
            let mut text = self.text.write().unwrap_or_else(PoisonError::into_inner);
            *text = edit.text.clone();
            let offset = edit.offset.min(text.len_chars());
            text.line_to_char(text.char_to_line(offset))
        };
        if self.has_pattern() {
            self.changes
                .fire(&HighlightsChange::new(line_start, usize::MAX));
        }
    }

    fn matches(&self, start: usize, end: usize) -> Vec<Highlight> {
        let pattern = self.pattern.read().unwrap_or_else(PoisonError::into_inner);
        let Some(pattern) = pattern.as_ref() else {
            return Vec::new();
        };
        let text = self.text.read().unwrap_or_else(PoisonError::into_inner);
        let len = text.len_chars();
        let start = start.min(len);
        let end = end.min(len);
        if start >= end {
            return Vec::new();
        }

        let first_line = text.char_to_line(start);
        let last_line = text.char_to_line(end.saturating_sub(1));
        let window_start = text.line_to_char(first_line);
        let window_end = if last_line + 1 < text.len_lines() {
            text.line_to_char(last_line + 1)
        } else {
            len
        };
        let window = text.slice(window_start..window_end).to_string();

        let mut highlights = Vec::new();
        let mut byte_cursor = 0;
        let mut char_cursor = window_start;
        for m in pattern.regex.find_iter(&window) {
            if m.start() == m.end() {
                continue;
            }
            char_cursor += window[byte_cursor..m.start()].chars().count();
            let match_start = char_cursor;
            let match_end = match_start + m.as_str().chars().count();
            char_cursor = match_end;
            byte_cursor = m.end();

            if match_start >= end {
                break;
            }
            if pattern.whole_word && !is_whole_word(&window, m.start(), m.end()) {
                continue;
            }
            highlights.push(Highlight::new(
                match_start,
                match_end,
                self.attributes.clone(),
            ));
        }
        tracing::trace!(
            start,
            end,
            matches = highlights.len(),
            "searched window"
        );
        highlights
    }
}

impl HighlightLayer for SearchMatchesLayer {
    fn highlights(&self, start: usize, end: usize) -> Box<dyn HighlightsSequence + '_> {
        if !self.has_pattern() {
            return Box::new(EmptySequence);
        }
        Box::new(VecSequence::clipped(self.matches(start, end), start, end))
    }

    fn change_support(&self) -> Option<&ChangeSupport> {
        Some(&self.changes)
    }
}

impl fmt::Debug for SearchMatchesLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchMatchesLayer")
            .field("attributes", &self.attributes)
            .field("has_pattern", &self.has_pattern())
            .finish()
    }
}

fn is_word_char(ch: char) -> bool {
    ch == '_' || ch.is_alphanumeric()
}

fn is_whole_word(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
}

//! Highlight value types.

use crate::attributes::AttributeSet;
use std::fmt;

/// A position that may fall inside a multi-column character.
///
/// `split == 0` is the boundary in front of the character at `offset`. A non-zero `split`
/// addresses a column inside the glyph of that character (a tab expanded to several columns,
/// or the virtual area of a newline). Positions order by `offset`, then by `split`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SplitOffset {
    /// Character offset.
    pub offset: usize,
    /// Column inside the character at `offset`.
    pub split: usize,
}

impl SplitOffset {
    /// Create a split position.
    pub const fn new(offset: usize, split: usize) -> Self {
        Self { offset, split }
    }

    /// Create a position on a character boundary.
    pub const fn at(offset: usize) -> Self {
        Self { offset, split: 0 }
    }
}

impl From<usize> for SplitOffset {
    fn from(offset: usize) -> Self {
        Self::at(offset)
    }
}

impl fmt::Display for SplitOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.split == 0 {
            write!(f, "{}", self.offset)
        } else {
            write!(f, "{}.{}", self.offset, self.split)
        }
    }
}

/// A standalone highlight `[start, end)` with its attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Highlight {
    /// Start position (inclusive).
    pub start: SplitOffset,
    /// End position (exclusive).
    pub end: SplitOffset,
    /// Attributes; `None` only for filler ranges of covering sequences.
    pub attributes: Option<AttributeSet>,
}

impl Highlight {
    /// Create a highlight over whole characters.
    pub fn new(start: usize, end: usize, attributes: AttributeSet) -> Self {
        Self {
            start: SplitOffset::at(start),
            end: SplitOffset::at(end),
            attributes: Some(attributes),
        }
    }

    /// Create a highlight with explicit split positions.
    pub fn with_split(
        start: SplitOffset,
        end: SplitOffset,
        attributes: Option<AttributeSet>,
    ) -> Self {
        Self {
            start,
            end,
            attributes,
        }
    }

    /// Returns `true` if the highlight covers nothing.
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// One item of a highlights list.
///
/// The item's start is implicit: it is the end of the preceding item (or the list start for the
/// first item).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightItem {
    end_offset: usize,
    end_split_offset: usize,
    attributes: Option<AttributeSet>,
}

impl HighlightItem {
    /// Create an item ending on a character boundary.
    pub fn new(end_offset: usize, attributes: Option<AttributeSet>) -> Self {
        Self {
            end_offset,
            end_split_offset: 0,
            attributes,
        }
    }

    /// Create an item ending inside the character at `end_offset`.
    pub fn with_split(
        end_offset: usize,
        end_split_offset: usize,
        attributes: Option<AttributeSet>,
    ) -> Self {
        Self {
            end_offset,
            end_split_offset,
            attributes,
        }
    }

    /// End offset (exclusive).
    pub fn end_offset(&self) -> usize {
        self.end_offset
    }

    /// Column inside the character at [`HighlightItem::end_offset`] where the item ends.
    pub fn end_split_offset(&self) -> usize {
        self.end_split_offset
    }

    /// End position.
    pub fn end(&self) -> SplitOffset {
        SplitOffset::new(self.end_offset, self.end_split_offset)
    }

    /// Attributes, or `None` for an unhighlighted range.
    pub fn attributes(&self) -> Option<&AttributeSet> {
        self.attributes.as_ref()
    }
}

//! Forward-only highlight cursors.
//!
//! Layers and merged containers hand out their highlights as a [`HighlightsSequence`]: a cursor
//! that is positioned *before* the first highlight and advanced with
//! [`HighlightsSequence::move_next`]. Sequences cannot seek backwards; to restart, query the
//! source again.

use crate::attributes::AttributeSet;
use crate::highlight::{Highlight, SplitOffset};

/// Cursor over ascending, non-overlapping highlights.
pub trait HighlightsSequence {
    /// Advance to the next highlight; returns `false` once the sequence is exhausted.
    fn move_next(&mut self) -> bool;

    /// Start offset of the current highlight.
    fn start_offset(&self) -> usize;

    /// End offset (exclusive) of the current highlight.
    fn end_offset(&self) -> usize;

    /// Column inside the character at [`HighlightsSequence::start_offset`] where the current
    /// highlight starts.
    ///
    /// Sequences without sub-character precision keep the default of `0`.
    fn start_split_offset(&self) -> usize {
        0
    }

    /// Column inside the character at [`HighlightsSequence::end_offset`] where the current
    /// highlight ends.
    fn end_split_offset(&self) -> usize {
        0
    }

    /// Attributes of the current highlight.
    ///
    /// Layer sequences always return `Some`; covering merged sequences return `None` for ranges
    /// no layer highlights.
    fn attributes(&self) -> Option<&AttributeSet>;

    /// Start position of the current highlight.
    fn start(&self) -> SplitOffset {
        SplitOffset::new(self.start_offset(), self.start_split_offset())
    }

    /// End position of the current highlight.
    fn end(&self) -> SplitOffset {
        SplitOffset::new(self.end_offset(), self.end_split_offset())
    }
}

impl<S: HighlightsSequence + ?Sized> HighlightsSequence for Box<S> {
    fn move_next(&mut self) -> bool {
        (**self).move_next()
    }

    fn start_offset(&self) -> usize {
        (**self).start_offset()
    }

    fn end_offset(&self) -> usize {
        (**self).end_offset()
    }

    fn start_split_offset(&self) -> usize {
        (**self).start_split_offset()
    }

    fn end_split_offset(&self) -> usize {
        (**self).end_split_offset()
    }

    fn attributes(&self) -> Option<&AttributeSet> {
        (**self).attributes()
    }
}

/// Drain the remaining highlights of `sequence`.
pub fn collect_highlights<S: HighlightsSequence + ?Sized>(sequence: &mut S) -> Vec<Highlight> {
    let mut out = Vec::new();
    while sequence.move_next() {
        out.push(Highlight::with_split(
            sequence.start(),
            sequence.end(),
            sequence.attributes().cloned(),
        ));
    }
    out
}

/// A sequence that never yields anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptySequence;

impl HighlightsSequence for EmptySequence {
    fn move_next(&mut self) -> bool {
        false
    }

    fn start_offset(&self) -> usize {
        0
    }

    fn end_offset(&self) -> usize {
        0
    }

    fn attributes(&self) -> Option<&AttributeSet> {
        None
    }
}

/// A sequence over an owned list of highlights.
///
/// The list is yielded as given; it is the producer's job to keep it ascending and
/// non-overlapping.
#[derive(Debug, Clone)]
pub struct VecSequence {
    highlights: Vec<Highlight>,
    index: Option<usize>,
}

impl VecSequence {
    /// Yield `highlights` verbatim.
    pub fn new(highlights: Vec<Highlight>) -> Self {
        Self {
            highlights,
            index: None,
        }
    }

    /// Yield the parts of `highlights` that intersect `[start, end)`, clipped to that range.
    pub fn clipped(
        highlights: impl IntoIterator<Item = Highlight>,
        start: usize,
        end: usize,
    ) -> Self {
        let lower = SplitOffset::at(start);
        let upper = SplitOffset::at(end);
        let highlights = highlights
            .into_iter()
            .filter_map(|mut h| {
                h.start = h.start.max(lower);
                h.end = h.end.min(upper);
                (!h.is_empty()).then_some(h)
            })
            .collect();
        Self::new(highlights)
    }

    fn current(&self) -> Option<&Highlight> {
        self.index.and_then(|i| self.highlights.get(i))
    }
}

impl HighlightsSequence for VecSequence {
    fn move_next(&mut self) -> bool {
        let next = self.index.map_or(0, |i| i + 1);
        if next < self.highlights.len() {
            self.index = Some(next);
            true
        } else {
            self.index = Some(self.highlights.len());
            false
        }
    }

    fn start_offset(&self) -> usize {
        self.current().map_or(0, |h| h.start.offset)
    }

    fn end_offset(&self) -> usize {
        self.current().map_or(0, |h| h.end.offset)
    }

    fn start_split_offset(&self) -> usize {
        self.current().map_or(0, |h| h.start.split)
    }

    fn end_split_offset(&self) -> usize {
        self.current().map_or(0, |h| h.end.split)
    }

    fn attributes(&self) -> Option<&AttributeSet> {
        self.current().and_then(|h| h.attributes.as_ref())
    }
}

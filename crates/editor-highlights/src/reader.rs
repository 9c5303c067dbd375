//! Materializing merged highlights into a [`HighlightsList`].

use crate::highlight::{HighlightItem, SplitOffset};
use crate::list::HighlightsList;
use crate::merge::{DirectMergeContainer, DirectMergeSequence};
use crate::sequence::HighlightsSequence;

/// Pulls highlights from a covering sequence into a [`HighlightsList`] on demand.
///
/// The list always covers a contiguous area starting at the reader's start offset: gaps in the
/// sequence are filled with unhighlighted items and, once the sequence ends, a trailing
/// unhighlighted item extends the list to the reader's end offset.
pub struct HighlightsReader<S> {
    sequence: S,
    end_offset: usize,
    list: HighlightsList,
    exhausted: bool,
}

impl<'a> HighlightsReader<DirectMergeSequence<'a>> {
    /// Read the covering merge of `container` over `[start_offset, end_offset)`.
    pub fn for_container(
        container: &'a DirectMergeContainer,
        start_offset: usize,
        end_offset: usize,
    ) -> Self {
        Self::new(
            container.covering_highlights(start_offset, end_offset),
            start_offset,
            end_offset,
        )
    }
}

impl<S: HighlightsSequence> HighlightsReader<S> {
    /// Read `sequence`, which should cover `[start_offset, end_offset)`.
    pub fn new(sequence: S, start_offset: usize, end_offset: usize) -> Self {
        Self {
            sequence,
            end_offset: end_offset.max(start_offset),
            list: HighlightsList::new(start_offset),
            exhausted: false,
        }
    }

    /// End of the area the reader covers.
    pub fn end_offset(&self) -> usize {
        self.end_offset
    }

    /// The underlying sequence.
    pub fn sequence(&self) -> &S {
        &self.sequence
    }

    /// Items read so far (minus whatever was cut off).
    pub fn list(&self) -> &HighlightsList {
        &self.list
    }

    /// Mutable access for cutting runs.
    pub fn list_mut(&mut self) -> &mut HighlightsList {
        &mut self.list
    }

    /// Consume the reader, keeping the list.
    pub fn into_list(self) -> HighlightsList {
        self.list
    }

    /// Extend the list until it reaches `offset` (clamped to the reader's end offset).
    pub fn read_until(&mut self, offset: usize) {
        let limit = SplitOffset::at(self.end_offset);
        let target = SplitOffset::at(offset).min(limit);
        while self.list.end() < target {
            if self.exhausted || !self.sequence.move_next() {
                self.exhausted = true;
                tracing::trace!(
                    from = %self.list.end(),
                    to = self.end_offset,
                    "highlights ended early, padding with an unhighlighted item"
                );
                self.list.add(HighlightItem::new(self.end_offset, None));
                break;
            }

            let start = self.sequence.start();
            let end = self.sequence.end().min(limit);
            if start > self.list.end() {
                tracing::debug!(
                    from = %self.list.end(),
                    to = %start,
                    "gap in covering highlights, inserting an unhighlighted item"
                );
                self.list
                    .add(HighlightItem::with_split(start.offset, start.split, None));
            }
            if end > self.list.end() {
                self.list.add(HighlightItem::with_split(
                    end.offset,
                    end.split,
                    self.sequence.attributes().cloned(),
                ));
            }
        }
    }
}

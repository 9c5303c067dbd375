//! Mutable highlight layer whose boundaries follow document edits.

use crate::attributes::AttributeSet;
use crate::changes::{ChangeSupport, HighlightsChange, ListenerId};
use crate::document::{Document, DocumentEdit, EditKind};
use crate::highlight::Highlight;
use crate::layer::HighlightLayer;
use crate::offset_tracker::{OffsetElement, OffsetTracker, TrackerId};
use crate::sequence::{HighlightsSequence, VecSequence};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Boundary of the bag: `attrs` apply from this mark up to the next one.
#[derive(Debug)]
struct BagMark {
    offset: usize,
    owner: Option<TrackerId>,
    attrs: Option<AttributeSet>,
}

impl BagMark {
    fn new(offset: usize, attrs: Option<AttributeSet>) -> Self {
        Self {
            offset,
            owner: None,
            attrs,
        }
    }
}

impl OffsetElement for BagMark {
    fn raw_offset(&self) -> usize {
        self.offset
    }

    fn set_raw_offset(&mut self, raw_offset: usize) {
        self.offset = raw_offset;
    }

    fn attach(&mut self, tracker: TrackerId) -> usize {
        self.owner = Some(tracker);
        self.offset
    }

    fn detach(&mut self, offset: usize) {
        self.owner = None;
        self.offset = offset;
    }

    fn owner(&self) -> Option<TrackerId> {
        self.owner
    }
}

/// A layer of non-overlapping highlights set by the caller (selection, occurrences, ...).
///
/// Adding a highlight replaces whatever the bag held in that range. Highlight boundaries are
/// stored in an [`OffsetTracker`], so after [`OffsetsBag::track`] they keep following the text
/// as the document is edited; text removed from under a highlight shrinks it.
pub struct OffsetsBag {
    marks: Mutex<OffsetTracker<BagMark>>,
    changes: ChangeSupport,
}

impl OffsetsBag {
    /// Create an empty bag.
    pub fn new() -> Self {
        Self {
            marks: Mutex::new(OffsetTracker::new()),
            changes: ChangeSupport::new(),
        }
    }

    /// Highlight `[start, end)` with `attrs`, replacing existing highlights there.
    pub fn add_highlight(&self, start: usize, end: usize, attrs: AttributeSet) {
        if start >= end {
            return;
        }
        set_range(&mut self.lock(), start, end, Some(attrs));
        self.changes.fire(&HighlightsChange::new(start, end));
    }

    /// Remove highlights from `[start, end)`, trimming highlights that cross its bounds.
    pub fn remove_highlights(&self, start: usize, end: usize) {
        if start >= end {
            return;
        }
        set_range(&mut self.lock(), start, end, None);
        self.changes.fire(&HighlightsChange::new(start, end));
    }

    /// Replace the whole content of the bag.
    pub fn set_highlights(&self, highlights: impl IntoIterator<Item = Highlight>) {
        let changed = {
            let mut marks = self.lock();
            let mut changed = covered_range(&marks);
            marks.clear();
            for h in highlights {
                if h.start.offset >= h.end.offset {
                    continue;
                }
                set_range(&mut marks, h.start.offset, h.end.offset, h.attributes);
                changed = Some(match changed {
                    Some((s, e)) => (s.min(h.start.offset), e.max(h.end.offset)),
                    None => (h.start.offset, h.end.offset),
                });
            }
            changed
        };
        if let Some((start, end)) = changed {
            self.changes.fire(&HighlightsChange::new(start, end));
        }
    }

    /// Remove every highlight.
    pub fn clear(&self) {
        let changed = {
            let mut marks = self.lock();
            let changed = covered_range(&marks);
            marks.clear();
            changed
        };
        if let Some((start, end)) = changed {
            self.changes.fire(&HighlightsChange::new(start, end));
        }
    }

    /// Returns `true` if the bag holds no highlights.
    pub fn is_empty(&self) -> bool {
        self.lock().iter().all(|mark| mark.attrs.is_none())
    }

    /// Account for `length` characters inserted at `offset`.
    ///
    /// Fires a change covering the highlights moved by the insertion.
    pub fn insert_update(&self, offset: usize, length: usize) {
        let moved = self.update(offset, length, |marks| marks.insert_update(offset, length));
        if let Some(last) = moved {
            self.changes.fire(&HighlightsChange::new(offset, last));
        }
    }

    /// Account for `length` characters removed at `offset`.
    ///
    /// Fires a change covering the highlights shrunk or moved by the removal.
    pub fn remove_update(&self, offset: usize, length: usize) {
        let moved = self.update(offset, length, |marks| marks.remove_update(offset, length));
        if let Some(last) = moved {
            self.changes.fire(&HighlightsChange::new(offset, last));
        }
    }

    /// Apply a document edit notification.
    pub fn apply_edit(&self, edit: &DocumentEdit) {
        match edit.kind {
            EditKind::Insert => self.insert_update(edit.offset, edit.length),
            EditKind::Remove => self.remove_update(edit.offset, edit.length),
        }
    }

    /// Follow the edits of `document` until the returned subscription is cancelled with
    /// [`Document::unsubscribe`].
    pub fn track(self: &Arc<Self>, document: &Document) -> ListenerId {
        let bag = Arc::clone(self);
        document.subscribe(move |edit| bag.apply_edit(edit))
    }

    /// Apply an edit of `length` characters at `offset` to the marks.
    ///
    /// Returns the end of the area whose highlights changed, or `None` when no mark sits at or
    /// after `offset`.
    fn update(
        &self,
        offset: usize,
        length: usize,
        edit: impl FnOnce(&mut OffsetTracker<BagMark>),
    ) -> Option<usize> {
        let mut marks = self.lock();
        let affected = length > 0 && marks.find_element_index(offset) < marks.len();
        edit(&mut *marks);
        if !affected {
            return None;
        }
        let last = marks.len().checked_sub(1).and_then(|index| marks.offset_at(index))?;
        Some(last.max(offset.saturating_add(1)))
    }

    fn lock(&self) -> MutexGuard<'_, OffsetTracker<BagMark>> {
        self.marks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for OffsetsBag {
    fn default() -> Self {
        Self::new()
    }
}

impl HighlightLayer for OffsetsBag {
    fn highlights(&self, start: usize, end: usize) -> Box<dyn HighlightsSequence + '_> {
        let marks = self.lock();
        let first = marks.find_element_index(start.saturating_add(1)).saturating_sub(1);
        let mut highlights = Vec::new();
        for index in first..marks.len() {
            let (Some(mark), Some(offset)) = (marks.get(index), marks.offset_at(index)) else {
                break;
            };
            if offset >= end {
                break;
            }
            let next = marks.offset_at(index + 1).unwrap_or(offset);
            if let Some(attrs) = &mark.attrs
                && next > offset
            {
                highlights.push(Highlight::new(offset, next, attrs.clone()));
            }
        }
        Box::new(VecSequence::clipped(highlights, start, end))
    }

    fn change_support(&self) -> Option<&ChangeSupport> {
        Some(&self.changes)
    }
}

impl fmt::Debug for OffsetsBag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OffsetsBag")
            .field("marks", &*self.lock())
            .finish()
    }
}

/// Attributes in effect at `offset`.
fn attrs_at(marks: &OffsetTracker<BagMark>, offset: usize) -> Option<AttributeSet> {
    let index = marks.find_element_index(offset.saturating_add(1)).checked_sub(1)?;
    marks.get(index).and_then(|mark| mark.attrs.clone())
}

fn set_range(
    marks: &mut OffsetTracker<BagMark>,
    start: usize,
    end: usize,
    attrs: Option<AttributeSet>,
) {
    let after = attrs_at(marks, end);
    let lo = marks.find_element_index(start);
    let hi = marks.find_element_index(end.saturating_add(1));
    for _ in lo..hi {
        marks.remove(lo);
    }
    let before = lo
        .checked_sub(1)
        .and_then(|index| marks.get(index))
        .and_then(|mark| mark.attrs.clone());
    if attrs != before {
        marks.add(BagMark::new(start, attrs.clone()));
    }
    if after != attrs {
        marks.add(BagMark::new(end, after));
    }
}

fn covered_range(marks: &OffsetTracker<BagMark>) -> Option<(usize, usize)> {
    let first = marks.offset_at(0)?;
    let last = marks.offset_at(marks.len() - 1)?;
    Some((first, last))
}

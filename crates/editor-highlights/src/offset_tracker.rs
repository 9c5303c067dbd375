//! Edit-stable offset tracking (gap list).
//!
//! [`OffsetTracker`] keeps elements sorted by their offset into a text buffer and keeps those
//! offsets correct while the buffer is edited, without rewriting every offset on every keystroke.
//!
//! Each element stores a *raw* offset. Raw offsets below the gap start are the real offsets;
//! raw offsets at or above it are shifted by the gap length:
//!
//! ```text
//! real = if raw < gap_start { raw } else { raw - gap_length }
//! raw  = if real < gap_start { real } else { real + gap_length }
//! ```
//!
//! The gap sits at the last edit point. An edit at the gap only changes `gap_start` and
//! `gap_length`; an edit elsewhere first moves the gap, rewriting the raw offsets of the
//! elements between the old and the new gap position only.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use thiserror::Error;

/// Initial gap length; large enough for any document the tracker may describe.
const INITIAL_GAP_LENGTH: usize = usize::MAX / 2;

static NEXT_TRACKER_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of an [`OffsetTracker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TrackerId(u64);

impl TrackerId {
    fn next() -> Self {
        Self(NEXT_TRACKER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Caller contract violations reported by [`OffsetTracker`].
///
/// These indicate a bug in the calling code and are not meant to be retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrackerError {
    /// The index is past the end of the tracker.
    #[error("index {index} out of bounds (len {len})")]
    IndexOutOfBounds {
        /// Requested index.
        index: usize,
        /// Number of tracked elements.
        len: usize,
    },
    /// Placing the element at `index` would break ascending offset order.
    #[error(
        "offset {offset} at index {index} breaks ascending order (previous {prev:?}, next {next:?})"
    )]
    OrderViolation {
        /// Requested index.
        index: usize,
        /// Real offset of the rejected element.
        offset: usize,
        /// Real offset of the preceding element.
        prev: Option<usize>,
        /// Real offset of the following element.
        next: Option<usize>,
    },
}

/// An element whose offset can be tracked by an [`OffsetTracker`].
///
/// While attached, the tracker owns the meaning of the stored raw offset. Once detached, the
/// element holds its last real offset as a plain value.
pub trait OffsetElement {
    /// Stored raw offset.
    fn raw_offset(&self) -> usize;

    /// Replace the stored raw offset.
    fn set_raw_offset(&mut self, raw_offset: usize);

    /// Start being tracked by `tracker`; returns the element's real offset at this moment.
    fn attach(&mut self, tracker: TrackerId) -> usize;

    /// Stop being tracked, freezing `offset` as the element's offset.
    fn detach(&mut self, offset: usize);

    /// Tracker currently owning the element.
    fn owner(&self) -> Option<TrackerId>;

    /// Identity comparison used by [`OffsetTracker::index_of`].
    fn same_element(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
    }
}

/// Sorted collection of offset-carrying elements kept valid across document edits.
pub struct OffsetTracker<E> {
    id: TrackerId,
    elements: Vec<E>,
    gap_start: usize,
    gap_length: usize,
    fixed_zero: bool,
}

impl<E: OffsetElement> OffsetTracker<E> {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self {
            id: TrackerId::next(),
            elements: Vec::new(),
            gap_start: 0,
            gap_length: INITIAL_GAP_LENGTH,
            fixed_zero: false,
        }
    }

    /// Create an empty tracker in which elements at offset `0` never move.
    ///
    /// Text inserted at the start of the document lands after such elements.
    pub fn with_fixed_zero() -> Self {
        Self {
            fixed_zero: true,
            ..Self::new()
        }
    }

    /// Identity of this tracker.
    pub fn id(&self) -> TrackerId {
        self.id
    }

    /// Number of tracked elements.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Returns `true` if nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Element at `index`.
    pub fn get(&self, index: usize) -> Option<&E> {
        self.elements.get(index)
    }

    /// Elements in ascending offset order.
    pub fn iter(&self) -> impl Iterator<Item = &E> {
        self.elements.iter()
    }

    /// Current gap start (a real offset).
    pub fn gap_start(&self) -> usize {
        self.gap_start
    }

    /// Current gap length.
    pub fn gap_length(&self) -> usize {
        self.gap_length
    }

    /// Real offset of a tracked element.
    pub fn element_offset(&self, element: &E) -> usize {
        self.raw_to_offset(element.raw_offset())
    }

    /// Real offset of the element at `index`.
    pub fn offset_at(&self, index: usize) -> Option<usize> {
        self.elements
            .get(index)
            .map(|e| self.raw_to_offset(e.raw_offset()))
    }

    /// Real offsets of all elements, in index order.
    pub fn offsets(&self) -> impl Iterator<Item = usize> + '_ {
        self.elements
            .iter()
            .map(|e| self.raw_to_offset(e.raw_offset()))
    }

    /// Index of the first element whose offset is `>= offset`.
    ///
    /// For duplicate offsets this is the leftmost element carrying `offset`.
    pub fn find_element_index(&self, offset: usize) -> usize {
        let raw = self.offset_to_raw(offset);
        self.elements.partition_point(|e| e.raw_offset() < raw)
    }

    /// Attach `element` and insert it in offset order; returns its index.
    ///
    /// An element added at an offset already present is placed after the existing ones.
    pub fn add(&mut self, mut element: E) -> usize {
        debug_assert!(
            element.owner().is_none(),
            "element already attached to a tracker"
        );
        let offset = element.attach(self.id);
        let raw = self.offset_to_raw(offset);
        element.set_raw_offset(raw);
        let index = self.elements.partition_point(|e| e.raw_offset() <= raw);
        self.elements.insert(index, element);
        index
    }

    /// Attach `element` and insert it at `index`, which must preserve ascending order.
    pub fn add_at(&mut self, index: usize, mut element: E) -> Result<(), TrackerError> {
        let len = self.elements.len();
        if index > len {
            return Err(TrackerError::IndexOutOfBounds { index, len });
        }
        let offset = element.attach(self.id);
        let raw = self.offset_to_raw(offset);
        let prev = index.checked_sub(1);
        if let Err(err) = self.check_order(index, prev, Some(index), offset, raw) {
            element.detach(offset);
            return Err(err);
        }
        element.set_raw_offset(raw);
        self.elements.insert(index, element);
        Ok(())
    }

    /// Replace the element at `index`; returns the detached previous element.
    pub fn set(&mut self, index: usize, mut element: E) -> Result<E, TrackerError> {
        let len = self.elements.len();
        if index >= len {
            return Err(TrackerError::IndexOutOfBounds { index, len });
        }
        let offset = element.attach(self.id);
        let raw = self.offset_to_raw(offset);
        let next = (index + 1 < len).then_some(index + 1);
        if let Err(err) = self.check_order(index, index.checked_sub(1), next, offset, raw) {
            element.detach(offset);
            return Err(err);
        }
        element.set_raw_offset(raw);
        let mut old = std::mem::replace(&mut self.elements[index], element);
        let old_offset = self.raw_to_offset(old.raw_offset());
        old.detach(old_offset);
        Ok(old)
    }

    /// Remove and detach the element at `index`.
    pub fn remove(&mut self, index: usize) -> Option<E> {
        if index >= self.elements.len() {
            return None;
        }
        let mut element = self.elements.remove(index);
        let offset = self.raw_to_offset(element.raw_offset());
        element.detach(offset);
        Some(element)
    }

    /// Index of `element`, or `None` if it is not tracked here.
    pub fn index_of(&self, element: &E) -> Option<usize> {
        if element.owner() != Some(self.id) {
            return None;
        }
        let raw = element.raw_offset();
        let mut index = self.elements.partition_point(|e| e.raw_offset() < raw);
        while let Some(candidate) = self.elements.get(index) {
            if candidate.raw_offset() != raw {
                break;
            }
            if candidate.same_element(element) {
                return Some(index);
            }
            index += 1;
        }
        None
    }

    /// Detach and drop every element.
    pub fn clear(&mut self) {
        for mut element in std::mem::take(&mut self.elements) {
            let offset = self.raw_to_offset(element.raw_offset());
            element.detach(offset);
        }
    }

    /// Account for `length` characters inserted at `offset`.
    ///
    /// Elements at or after `offset` move forward by `length`. The gap ends up right after the
    /// inserted text, so continued typing at that point needs no element updates.
    pub fn insert_update(&mut self, offset: usize, length: usize) {
        if length == 0 {
            return;
        }
        if self.gap_start != offset {
            self.move_gap(offset);
        }
        debug_assert!(length <= self.gap_length, "offset gap exhausted");
        self.gap_start += length;
        self.gap_length -= length;
    }

    /// Account for `length` characters removed at `offset`.
    ///
    /// Elements inside the removed area collapse to `offset`; elements after it move back by
    /// `length`.
    pub fn remove_update(&mut self, offset: usize, length: usize) {
        if length == 0 {
            return;
        }
        if self.gap_start != offset {
            self.move_gap(offset);
        }
        let end = offset.saturating_add(length);
        let raw_start = offset.saturating_add(self.gap_length);
        let raw_end = end.saturating_add(self.gap_length);
        // Elements ending up at offset 0 of a fixed-zero tracker must get raw 0, including
        // those sitting right at the end of the removed area.
        let to_zero = self.fixed_zero && offset == 0;
        let lo = self.elements.partition_point(|e| e.raw_offset() < raw_start);
        let hi = self.elements.partition_point(|e| {
            let raw = e.raw_offset();
            raw < raw_end || (to_zero && raw == raw_end)
        });
        if lo < hi {
            let collapsed = if to_zero { 0 } else { raw_end };
            for element in &mut self.elements[lo..hi] {
                element.set_raw_offset(collapsed);
            }
        }
        self.gap_length = self.gap_length.saturating_add(length);
    }

    fn raw_to_offset(&self, raw: usize) -> usize {
        if raw == usize::MAX {
            // Saturated offsets stay past the end of any document.
            usize::MAX
        } else if (self.fixed_zero && raw == 0) || raw < self.gap_start {
            raw
        } else {
            raw - self.gap_length
        }
    }

    fn offset_to_raw(&self, offset: usize) -> usize {
        if (self.fixed_zero && offset == 0) || offset < self.gap_start {
            offset
        } else {
            offset.saturating_add(self.gap_length)
        }
    }

    fn move_gap(&mut self, offset: usize) {
        let gap_start = self.gap_start;
        let gap_length = self.gap_length;
        let fixed_zero = self.fixed_zero;
        let moved = if offset < gap_start {
            // Real offsets in [offset, gap_start) move above the gap.
            let lo = self.elements.partition_point(|e| e.raw_offset() < offset);
            let hi = self.elements.partition_point(|e| e.raw_offset() < gap_start);
            for element in &mut self.elements[lo..hi] {
                let raw = element.raw_offset();
                if !(fixed_zero && raw == 0) {
                    element.set_raw_offset(raw + gap_length);
                }
            }
            hi - lo
        } else {
            // Real offsets in [gap_start, offset) move below the gap.
            let lo = self
                .elements
                .partition_point(|e| e.raw_offset() < gap_start + gap_length);
            let hi = self
                .elements
                .partition_point(|e| e.raw_offset() < offset.saturating_add(gap_length));
            for element in &mut self.elements[lo..hi] {
                let raw = element.raw_offset();
                element.set_raw_offset(raw - gap_length);
            }
            hi - lo
        };
        tracing::trace!(from = gap_start, to = offset, moved, "moved offset gap");
        self.gap_start = offset;
    }

    fn check_order(
        &self,
        index: usize,
        prev: Option<usize>,
        next: Option<usize>,
        offset: usize,
        raw: usize,
    ) -> Result<(), TrackerError> {
        let prev = prev.and_then(|i| self.elements.get(i));
        let next = next.and_then(|i| self.elements.get(i));
        let prev_ok = prev.is_none_or(|e| e.raw_offset() <= raw);
        let next_ok = next.is_none_or(|e| raw <= e.raw_offset());
        if prev_ok && next_ok {
            Ok(())
        } else {
            Err(TrackerError::OrderViolation {
                index,
                offset,
                prev: prev.map(|e| self.raw_to_offset(e.raw_offset())),
                next: next.map(|e| self.raw_to_offset(e.raw_offset())),
            })
        }
    }
}

impl<E: OffsetElement> Default for OffsetTracker<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for OffsetTracker<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OffsetTracker")
            .field("id", &self.id)
            .field("len", &self.elements.len())
            .field("gap_start", &self.gap_start)
            .field("gap_length", &self.gap_length)
            .field("fixed_zero", &self.fixed_zero)
            .finish()
    }
}

const DETACHED: u64 = 0;

struct MarkState {
    offset: AtomicUsize,
    owner: AtomicU64,
}

/// Shared handle to a tracked position.
///
/// Clones refer to the same position, so a caller can keep a `Mark` while a tracker holds
/// another clone of it. Query the live offset through [`OffsetTracker::element_offset`]; after
/// the mark is removed from its tracker, [`Mark::frozen_offset`] returns its last offset.
#[derive(Clone)]
pub struct Mark(Arc<MarkState>);

impl Mark {
    /// Create a detached mark at `offset`.
    pub fn new(offset: usize) -> Self {
        Self(Arc::new(MarkState {
            offset: AtomicUsize::new(offset),
            owner: AtomicU64::new(DETACHED),
        }))
    }

    /// Returns `true` while a tracker owns the mark.
    pub fn is_attached(&self) -> bool {
        self.0.owner.load(Ordering::Acquire) != DETACHED
    }

    /// Offset of a detached mark.
    pub fn frozen_offset(&self) -> Option<usize> {
        (!self.is_attached()).then(|| self.0.offset.load(Ordering::Acquire))
    }
}

impl OffsetElement for Mark {
    fn raw_offset(&self) -> usize {
        self.0.offset.load(Ordering::Acquire)
    }

    fn set_raw_offset(&mut self, raw_offset: usize) {
        self.0.offset.store(raw_offset, Ordering::Release);
    }

    fn attach(&mut self, tracker: TrackerId) -> usize {
        self.0.owner.store(tracker.0, Ordering::Release);
        self.0.offset.load(Ordering::Acquire)
    }

    fn detach(&mut self, offset: usize) {
        self.0.offset.store(offset, Ordering::Release);
        self.0.owner.store(DETACHED, Ordering::Release);
    }

    fn owner(&self) -> Option<TrackerId> {
        match self.0.owner.load(Ordering::Acquire) {
            DETACHED => None,
            id => Some(TrackerId(id)),
        }
    }

    fn same_element(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mark")
            .field("raw_offset", &self.raw_offset())
            .field("owner", &self.owner())
            .finish()
    }
}

//! N-way highlight merging.
//!
//! [`DirectMergeContainer`] stacks highlight layers by z-order (lowest priority first) and
//! streams their highlights into one ascending, non-overlapping sequence. Where highlights of
//! several layers overlap, their attributes are composed so that the higher layer wins on key
//! collisions.
//!
//! # Algorithm
//!
//! Each layer is read through a `Wrapper` that remembers the layer's last fetched highlight and
//! the position up to which the layer's contribution stays constant (its *next change*). The
//! wrappers additionally cache the composite of their own and all lower layers' attributes and
//! the nearest next change among them, so the top wrapper answers "these attributes hold until
//! position X". Advancing the merge refreshes only wrappers whose next change has been reached
//! and recomposes from the lowest refreshed wrapper upwards.
//!
//! # Misbehaving layers
//!
//! A layer returning overlapping or inverted highlights, or more than
//! [`MergeConfig::max_empty_highlight_count`] consecutive empty ones, is logged and ignored for
//! the rest of the query. The other layers keep merging normally.
//!
//! # Change notification
//!
//! The container subscribes to every layer's [`ChangeSupport`]. A layer change re-fires from the
//! container and marks every sequence handed out so far as stale: stale sequences stop yielding
//! highlights and have to be re-queried.

use crate::attributes::AttributeSet;
use crate::changes::{ChangeSupport, HighlightsChange, ListenerId};
use crate::highlight::SplitOffset;
use crate::layer::HighlightLayer;
use crate::sequence::HighlightsSequence;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

/// Default limit of consecutive empty highlights accepted from one layer.
pub const MAX_EMPTY_HIGHLIGHT_COUNT: usize = 10_000;

/// Merge tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeConfig {
    /// Consecutive empty (or out-of-range) highlights tolerated from a layer before the layer is
    /// dropped from the current query.
    pub max_empty_highlight_count: usize,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            max_empty_highlight_count: MAX_EMPTY_HIGHLIGHT_COUNT,
        }
    }
}

struct Shared {
    changes: ChangeSupport,
    in_flight: Mutex<Vec<Weak<AtomicBool>>>,
}

impl Shared {
    fn register_sequence(&self) -> Arc<AtomicBool> {
        let stale = Arc::new(AtomicBool::new(false));
        let mut in_flight = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        in_flight.retain(|flag| flag.strong_count() > 0);
        in_flight.push(Arc::downgrade(&stale));
        stale
    }

    fn layer_changed(&self, change: &HighlightsChange) {
        let marked = {
            let mut in_flight = self
                .in_flight
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let mut marked = 0usize;
            for flag in in_flight.drain(..).filter_map(|flag| flag.upgrade()) {
                flag.store(true, Ordering::Release);
                marked += 1;
            }
            marked
        };
        tracing::debug!(
            start = change.start,
            end = change.end,
            marked,
            "layer changed, in-flight merges marked stale"
        );
        self.changes.fire(change);
    }
}

/// Merges highlight layers ordered by z-order, lowest priority first.
pub struct DirectMergeContainer {
    layers: Vec<Arc<dyn HighlightLayer>>,
    config: MergeConfig,
    shared: Arc<Shared>,
    subscriptions: Vec<(usize, ListenerId)>,
}

impl DirectMergeContainer {
    /// Create a container over `layers` (lowest priority first).
    pub fn new(layers: Vec<Arc<dyn HighlightLayer>>) -> Self {
        Self::with_config(layers, MergeConfig::default())
    }

    /// Create a container with explicit tuning.
    pub fn with_config(layers: Vec<Arc<dyn HighlightLayer>>, config: MergeConfig) -> Self {
        let shared = Arc::new(Shared {
            changes: ChangeSupport::new(),
            in_flight: Mutex::new(Vec::new()),
        });
        let mut subscriptions = Vec::new();
        for (index, layer) in layers.iter().enumerate() {
            if let Some(support) = layer.change_support() {
                let shared = Arc::clone(&shared);
                let id = support.subscribe(move |change| shared.layer_changed(change));
                subscriptions.push((index, id));
            }
        }
        Self {
            layers,
            config,
            shared,
            subscriptions,
        }
    }

    /// Merged layers, lowest priority first.
    pub fn layers(&self) -> &[Arc<dyn HighlightLayer>] {
        &self.layers
    }

    /// Merge tuning.
    pub fn config(&self) -> MergeConfig {
        self.config
    }

    /// Registry re-firing the changes of every merged layer.
    pub fn changes(&self) -> &ChangeSupport {
        &self.shared.changes
    }

    /// Merged highlights in `[start, end)`; ranges no layer highlights are skipped.
    pub fn highlights(&self, start: usize, end: usize) -> DirectMergeSequence<'_> {
        self.sequence(start, end, false)
    }

    /// Merged highlights covering every position of `[start, end)`.
    ///
    /// Ranges no layer highlights are yielded with `None` attributes.
    pub fn covering_highlights(&self, start: usize, end: usize) -> DirectMergeSequence<'_> {
        self.sequence(start, end, true)
    }

    fn sequence(&self, start: usize, end: usize, covering: bool) -> DirectMergeSequence<'_> {
        let end = end.max(start);
        let wrappers = self
            .layers
            .iter()
            .enumerate()
            .map(|(index, layer)| Wrapper::new(index, layer.highlights(start, end), start))
            .collect();
        DirectMergeSequence {
            wrappers,
            start: SplitOffset::at(start),
            end: SplitOffset::at(end),
            covering,
            max_empty_highlight_count: self.config.max_empty_highlight_count,
            stale: self.shared.register_sequence(),
            next_start: SplitOffset::at(start),
            hl_start: SplitOffset::at(start),
            hl_end: SplitOffset::at(start),
            hl_attrs: None,
            finished: false,
        }
    }
}

impl Drop for DirectMergeContainer {
    fn drop(&mut self) {
        for &(index, id) in &self.subscriptions {
            if let Some(support) = self.layers.get(index).and_then(|l| l.change_support()) {
                support.unsubscribe(id);
            }
        }
    }
}

impl HighlightLayer for DirectMergeContainer {
    fn highlights(&self, start: usize, end: usize) -> Box<dyn HighlightsSequence + '_> {
        Box::new(DirectMergeContainer::highlights(self, start, end))
    }

    fn change_support(&self) -> Option<&ChangeSupport> {
        Some(&self.shared.changes)
    }
}

impl fmt::Debug for DirectMergeContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectMergeContainer")
            .field("layers", &self.layers.len())
            .field("config", &self.config)
            .finish()
    }
}

/// Per-layer merge state.
struct Wrapper<'a> {
    layer: usize,
    sequence: Box<dyn HighlightsSequence + 'a>,
    exhausted: bool,
    /// End of the last valid highlight returned by the layer, before clipping.
    prev_end: Option<SplitOffset>,
    hl_start: SplitOffset,
    hl_end: SplitOffset,
    hl_attrs: Option<AttributeSet>,
    /// Attributes at the current merge position (`None` outside the layer's highlights).
    current_attrs: Option<AttributeSet>,
    next_change: SplitOffset,
    /// Composite of this and all lower layers.
    merged_attrs: Option<AttributeSet>,
    merged_next_change: SplitOffset,
}

impl<'a> Wrapper<'a> {
    fn new(layer: usize, sequence: Box<dyn HighlightsSequence + 'a>, start: usize) -> Self {
        let start = SplitOffset::at(start);
        Self {
            layer,
            sequence,
            exhausted: false,
            prev_end: None,
            hl_start: start,
            hl_end: start,
            hl_attrs: None,
            current_attrs: None,
            next_change: start,
            merged_attrs: None,
            merged_next_change: start,
        }
    }

    fn update_current_state(
        &mut self,
        pos: SplitOffset,
        range: (SplitOffset, SplitOffset),
        max_empty: usize,
    ) {
        loop {
            if pos < self.hl_start {
                self.current_attrs = None;
                self.next_change = self.hl_start;
                return;
            }
            if pos < self.hl_end {
                self.current_attrs = self.hl_attrs.clone();
                self.next_change = self.hl_end;
                return;
            }
            if self.exhausted || !self.fetch_next_highlight(range, max_empty) {
                self.exhausted = true;
                self.current_attrs = None;
                self.next_change = range.1;
                return;
            }
        }
    }

    /// Fetch the next usable highlight clipped to `range`; `false` ends the layer's contribution.
    fn fetch_next_highlight(
        &mut self,
        range: (SplitOffset, SplitOffset),
        max_empty: usize,
    ) -> bool {
        let (lower, upper) = range;
        let mut empty = 0usize;
        loop {
            if !self.sequence.move_next() {
                return false;
            }
            let start = self.sequence.start();
            let end = self.sequence.end();
            if let Some(prev_end) = self.prev_end
                && start < prev_end
            {
                tracing::warn!(
                    layer = self.layer,
                    %start,
                    %end,
                    %prev_end,
                    "layer returned an overlapping highlight; ignoring the layer for this query"
                );
                return false;
            }
            if end < start {
                tracing::warn!(
                    layer = self.layer,
                    %start,
                    %end,
                    "layer returned an inverted highlight; ignoring the layer for this query"
                );
                return false;
            }
            self.prev_end = Some(end);
            if start >= upper {
                return false;
            }

            let start = start.max(lower);
            let end = end.min(upper);
            match self.sequence.attributes() {
                Some(attrs) if start < end => {
                    self.hl_start = start;
                    self.hl_end = end;
                    self.hl_attrs = Some(attrs.clone());
                    return true;
                }
                _ => {
                    empty += 1;
                    if empty >= max_empty {
                        tracing::warn!(
                            layer = self.layer,
                            empty,
                            "layer returned too many empty highlights; \
                             ignoring the layer for this query"
                        );
                        return false;
                    }
                }
            }
        }
    }
}

/// Merged highlight sequence produced by [`DirectMergeContainer`].
pub struct DirectMergeSequence<'a> {
    wrappers: Vec<Wrapper<'a>>,
    start: SplitOffset,
    end: SplitOffset,
    covering: bool,
    max_empty_highlight_count: usize,
    stale: Arc<AtomicBool>,
    next_start: SplitOffset,
    hl_start: SplitOffset,
    hl_end: SplitOffset,
    hl_attrs: Option<AttributeSet>,
    finished: bool,
}

impl DirectMergeSequence<'_> {
    /// Returns `true` if a merged layer changed after this sequence was created.
    ///
    /// A stale sequence yields no further highlights; query the container again.
    pub fn is_stale(&self) -> bool {
        self.stale.load(Ordering::Acquire)
    }

    /// Returns `true` if unhighlighted ranges are yielded too.
    pub fn is_covering(&self) -> bool {
        self.covering
    }

    fn next_merge(&mut self) -> bool {
        let pos = self.next_start;
        if pos >= self.end {
            return false;
        }
        let (attrs, next_change) = self.update_merge_vars(pos);
        let end = next_change.min(self.end);
        debug_assert!(end > pos, "merge did not advance at {pos}");
        self.hl_start = pos;
        self.hl_end = end;
        self.hl_attrs = attrs;
        self.next_start = end;
        true
    }

    fn update_merge_vars(&mut self, pos: SplitOffset) -> (Option<AttributeSet>, SplitOffset) {
        let range = (self.start, self.end);
        let max_empty = self.max_empty_highlight_count;
        let mut first_updated = None;
        for (index, wrapper) in self.wrappers.iter_mut().enumerate() {
            if pos >= wrapper.next_change {
                wrapper.update_current_state(pos, range, max_empty);
                first_updated.get_or_insert(index);
            }
        }

        if let Some(from) = first_updated {
            let (mut attrs, mut next_change) = match from.checked_sub(1) {
                Some(below) => {
                    let lower = &self.wrappers[below];
                    (lower.merged_attrs.clone(), lower.merged_next_change)
                }
                None => (None, self.end),
            };
            for wrapper in &mut self.wrappers[from..] {
                attrs = match (&wrapper.current_attrs, attrs) {
                    (Some(current), Some(lower)) => Some(AttributeSet::compose(current, &lower)),
                    (Some(current), None) => Some(current.clone()),
                    (None, lower) => lower,
                };
                next_change = next_change.min(wrapper.next_change);
                wrapper.merged_attrs = attrs.clone();
                wrapper.merged_next_change = next_change;
            }
        }

        match self.wrappers.last() {
            Some(top) => (top.merged_attrs.clone(), top.merged_next_change),
            None => (None, self.end),
        }
    }
}

impl HighlightsSequence for DirectMergeSequence<'_> {
    fn move_next(&mut self) -> bool {
        if self.finished {
            return false;
        }
        loop {
            if self.is_stale() || !self.next_merge() {
                self.finished = true;
                return false;
            }
            if self.covering || self.hl_attrs.is_some() {
                return true;
            }
        }
    }

    fn start_offset(&self) -> usize {
        self.hl_start.offset
    }

    fn end_offset(&self) -> usize {
        self.hl_end.offset
    }

    fn start_split_offset(&self) -> usize {
        self.hl_start.split
    }

    fn end_split_offset(&self) -> usize {
        self.hl_end.split
    }

    fn attributes(&self) -> Option<&AttributeSet> {
        self.hl_attrs.as_ref()
    }
}

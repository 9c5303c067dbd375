//! Highlight layer abstraction.

use crate::changes::ChangeSupport;
use crate::sequence::HighlightsSequence;

/// A source of highlights (syntax coloring, selection, search matches, diagnostics, ...).
///
/// Layers are stacked by z-order when merged: a higher layer's attributes win where highlights
/// overlap.
pub trait HighlightLayer: Send + Sync {
    /// Fresh sequence of the layer's highlights intersecting `[start, end)`.
    ///
    /// The sequence must be ascending and non-overlapping, and every highlight must carry
    /// attributes. Highlights may extend past the requested range; the consumer clips them.
    fn highlights(&self, start: usize, end: usize) -> Box<dyn HighlightsSequence + '_>;

    /// Registry fired whenever the layer's output for some range changes.
    ///
    /// Layers whose output never changes keep the default.
    fn change_support(&self) -> Option<&ChangeSupport> {
        None
    }
}

#![warn(missing_docs)]
//! Editor Highlights - Layered Highlight Merging for Text Editors
//!
//! # Overview
//!
//! `editor-highlights` combines independent highlight sources (syntax coloring, selection,
//! search matches, diagnostics, ...) into the single stream of styled runs a renderer paints.
//! All positions are **character offsets** into the document; a *split offset* addresses a
//! column inside one character and is used for virtual text placed between characters.
//!
//! # Core Features
//!
//! - **Offset Tracking**: gap list that keeps sorted positions valid across edits, O(1) for
//!   sequential typing
//! - **N-way Merge**: layers stacked by z-order, the higher layer wins on attribute collisions
//! - **Robustness**: a misbehaving layer is logged and skipped, never poisons the merge
//! - **Change Propagation**: layer changes mark in-flight merges stale and re-fire upwards
//! - **Run Cutting**: contiguous highlight lists cut into same-font runs for text layout
//!
//! # Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  HighlightsReader / HighlightsList          │  ← Rendering Runs
//! ├─────────────────────────────────────────────┤
//! │  DirectMergeContainer                       │  ← Layer Merging
//! ├─────────────────────────────────────────────┤
//! │  HighlightLayer (OffsetsBag, search, ...)   │  ← Highlight Sources
//! ├─────────────────────────────────────────────┤
//! │  OffsetTracker (gap list)                   │  ← Edit Tracking
//! ├─────────────────────────────────────────────┤
//! │  Document (rope)                            │  ← Text Storage
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use editor_highlights::{
//!     AttributeKey, AttributeSet, Color, DirectMergeContainer, HighlightLayer,
//!     HighlightsReader, OffsetsBag, RunAttributes,
//! };
//! use std::sync::Arc;
//!
//! let syntax = Arc::new(OffsetsBag::new());
//! syntax.add_highlight(0, 2, AttributeSet::single(AttributeKey::Foreground, Color::BLUE));
//!
//! let selection = Arc::new(OffsetsBag::new());
//! selection.add_highlight(1, 4, AttributeSet::single(AttributeKey::Background, Color::YELLOW));
//!
//! let layers: Vec<Arc<dyn HighlightLayer>> = vec![syntax, selection];
//! let container = DirectMergeContainer::new(layers);
//!
//! let mut reader = HighlightsReader::for_container(&container, 0, 6);
//! reader.read_until(6);
//! let list = reader.list_mut();
//!
//! // [0, 1): syntax only
//! let RunAttributes::Single(Some(attrs)) = list.cut(1usize) else { panic!() };
//! assert_eq!(attrs.color(&AttributeKey::Foreground), Some(Color::BLUE));
//! assert_eq!(attrs.color(&AttributeKey::Background), None);
//!
//! // [1, 2): both layers
//! let RunAttributes::Single(Some(attrs)) = list.cut(2usize) else { panic!() };
//! assert_eq!(attrs.color(&AttributeKey::Background), Some(Color::YELLOW));
//! assert_eq!(attrs.color(&AttributeKey::Foreground), Some(Color::BLUE));
//! ```
//!
//! # Module Description
//!
//! - [`offset_tracker`] - Gap list of edit-tracked positions
//! - [`attributes`] - Immutable attribute sets and font resolution
//! - [`highlight`] - Highlights, split offsets and list items
//! - [`sequence`] - Forward-only highlight cursors
//! - [`layer`] - Highlight layer abstraction
//! - [`merge`] - N-way merging container
//! - [`list`] / [`reader`] - Materialized highlight lists and run cutting
//! - [`changes`] - Change listeners
//! - [`document`] - Rope-backed text buffer with edit notifications
//! - [`layers`] - Ready-made layers
//!
//! # Logging
//!
//! The crate logs through [`tracing`]: misbehaving layers at `warn`, change propagation at
//! `debug`, gap moves and reader padding at `trace`. Install any subscriber to see them.

pub mod attributes;
pub mod changes;
pub mod document;
pub mod highlight;
pub mod layer;
pub mod layers;
pub mod list;
pub mod merge;
pub mod offset_tracker;
pub mod reader;
pub mod sequence;

pub use attributes::{AttributeKey, AttributeSet, AttributeValue, Color, FontSpec};
pub use changes::{ChangeSupport, HighlightsChange, ListenerCallback, ListenerId, Listeners};
pub use document::{Document, DocumentEdit, DocumentError, EditKind};
pub use highlight::{Highlight, HighlightItem, SplitOffset};
pub use layer::HighlightLayer;
pub use layers::{OffsetsBag, SearchError, SearchMatchesLayer, SearchOptions};
pub use list::{CompoundAttributes, HighlightsList, RunAttributes};
pub use merge::{DirectMergeContainer, DirectMergeSequence, MAX_EMPTY_HIGHLIGHT_COUNT, MergeConfig};
pub use offset_tracker::{Mark, OffsetElement, OffsetTracker, TrackerError, TrackerId};
pub use reader::HighlightsReader;
pub use sequence::{EmptySequence, HighlightsSequence, VecSequence, collect_highlights};

//! Ready-made highlight layers.

mod bag;
mod search;

pub use bag::OffsetsBag;
pub use search::{SearchError, SearchMatchesLayer, SearchOptions};

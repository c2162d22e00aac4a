//! Comparison algorithms over layerings and placed coordinates.

mod gap;
mod geometry;
mod layering;

pub use gap::{analyze_candidates, analyze_passes, composite_order, score_candidate};
pub use geometry::{compare_geometry, DEFAULT_TOP_DRIFT, MIN_SHARED_NODES};
pub use layering::compare_layerings;

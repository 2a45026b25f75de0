#![deny(unsafe_code)]

//! vetra-filter - image-filter DAG evaluation with result caching.
//!
//! Image filters form a DAG of immutable, reference-counted nodes;
//! each node maps an input raster to an output raster under a current
//! transform and clip. Evaluation threads a [`Context`] through the
//! graph and memoizes every successful node result in a bounded,
//! process-wide LRU cache keyed by the full evaluation fingerprint.
//!
//! ## Architecture
//!
//! - `image`: reference-counted raster images and the padding canvas
//! - `context`: the `(ctm, clip, cache)` triple threaded through evaluation
//! - `crop`: per-node masked crop rectangles
//! - `cache`: the byte-budgeted LRU store and its process-wide default
//! - `node`: `FilterCommon`, the `ImageFilter` trait, and the evaluator
//! - `nodes`: concrete filters (offset, merge)
//! - `flatten`: the persisted node record format

pub mod cache;
pub mod context;
pub mod crop;
pub mod flatten;
pub mod image;
pub mod node;
pub mod nodes;

pub use cache::{CacheKey, FilterCache};
pub use context::Context;
pub use crop::{CropEdges, CropRect};
pub use image::{RasterCanvas, RasterImage};
pub use node::{FilterCommon, ImageFilter, MapDirection};
pub use nodes::{MergeFilter, OffsetFilter};

use std::sync::atomic::{AtomicU32, Ordering};

static NEXT_UNIQUE_ID: AtomicU32 = AtomicU32::new(0);

/// Process-wide id source for filter nodes and raster images.
///
/// Never returns zero (zero marks "no source image" in cache keys) and
/// never recycles within a process lifetime.
pub fn next_unique_id() -> u32 {
    loop {
        let id = NEXT_UNIQUE_ID.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
        if id != 0 {
            return id;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_id_never_zero() {
        for _ in 0..1000 {
            assert_ne!(next_unique_id(), 0);
        }
    }

    #[test]
    fn test_unique_ids_distinct() {
        let a = next_unique_id();
        let b = next_unique_id();
        assert_ne!(a, b);
    }
}

//! Vetra: the front-end of a 2D vector-graphics rasterization stack.
//!
//! Two subsystems, one crate to reach them through:
//!
//! - **Edge building** ([`scan`]): walk a path's verbs and produce a
//!   flat list of monotone-in-Y edge records for a scanline
//!   rasterizer, clipped, with conics approximated by quadratics and
//!   adjacent vertical edges fused.
//! - **Image filters** ([`filter`]): evaluate a DAG of filter nodes
//!   under a transform and clip, memoizing results in a bounded
//!   process-wide LRU cache.
//!
//! ## Build edges from a path
//!
//! ```
//! use vetra::{BasicEdgeBuilder, Path};
//!
//! let mut path = Path::new();
//! path.move_to((10.0, 10.0))
//!     .quad_to((50.0, 90.0), (90.0, 10.0))
//!     .close();
//!
//! let mut builder = BasicEdgeBuilder::new(0);
//! let count = builder.build_edges(&path, None);
//! assert!(count > 0);
//! for edge in builder.edge_list() {
//!     assert!(edge.first_y() <= edge.last_y());
//! }
//! ```
//!
//! ## Evaluate a filter graph
//!
//! ```
//! use std::sync::Arc;
//! use kurbo::Affine;
//! use vetra::{Context, FilterCache, IPoint, IRect, ImageFilter, OffsetFilter, RasterImage};
//!
//! let cache = FilterCache::new(1 << 20);
//! let ctx = Context::new(Affine::IDENTITY, IRect::new(0, 0, 256, 256), Some(&cache));
//! let node = OffsetFilter::new(8.0, 8.0, None, None);
//! let src = Arc::new(RasterImage::new(64, 64));
//!
//! let mut offset = IPoint::ZERO;
//! let result = node.apply(&src, &ctx, &mut offset).unwrap();
//! assert_eq!(offset, IPoint::new(8, 8));
//! # let _ = result;
//! ```

pub use vetra_filter as filter;
pub use vetra_scan as scan;

pub use vetra_core::{
    geom::{IPoint, IRect},
    path::{Path, PathCursor, SegmentMask, Verb},
    DeserializeError,
};
pub use vetra_filter::{
    flatten, CacheKey, Context, CropEdges, CropRect, FilterCache, FilterCommon, ImageFilter,
    MapDirection, MergeFilter, OffsetFilter, RasterCanvas, RasterImage,
};
pub use vetra_scan::{
    AnalyticEdgeBuilder, BasicEdgeBuilder, BezierEdgeBuilder, Combine, EdgeSink,
};

//! End-to-end scenarios across the edge builder and the filter stack.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use kurbo::Affine;

use vetra::{
    BasicEdgeBuilder, CacheKey, Context, EdgeSink, FilterCache, FilterCommon, IPoint, IRect,
    ImageFilter, MergeFilter, OffsetFilter, Path, RasterImage,
};

fn pt(x: f64, y: f64) -> kurbo::Point {
    kurbo::Point::new(x, y)
}

#[test]
fn vertical_cancellation_empties_list() {
    let mut builder = BasicEdgeBuilder::new(0);
    builder.add_line(&[pt(0.0, 10.0), pt(0.0, 20.0)]);
    builder.add_line(&[pt(0.0, 20.0), pt(0.0, 10.0)]);
    assert_eq!(builder.len(), 0);
}

#[test]
fn vertical_extension_fuses_to_one() {
    let mut builder = BasicEdgeBuilder::new(0);
    builder.add_line(&[pt(5.0, 10.0), pt(5.0, 21.0)]);
    builder.add_line(&[pt(5.0, 21.0), pt(5.0, 31.0)]);
    assert_eq!(builder.len(), 1);

    let edge = builder.edge_list().next().unwrap();
    assert_eq!(edge.first_y(), 10);
    assert_eq!(edge.last_y(), 30);
}

#[test]
fn conic_under_clip_yields_contained_monotone_quads() {
    let mut path = Path::new();
    path.move_to((0.0, 0.0))
        .conic_to((50.0, 0.0), (100.0, 100.0), 0.5)
        .close();

    let clip = IRect::new(10, 10, 90, 90);
    let mut builder = BasicEdgeBuilder::new(0);
    let count = builder.build_edges(&path, Some(&clip));
    assert!(count > 0);

    for edge in builder.edge_list() {
        assert!(edge.first_y() <= edge.last_y(), "edge not monotone");
        assert!(
            edge.first_y() >= 10 && edge.last_y() < 90,
            "edge Y range [{}..{}] escapes the clip",
            edge.first_y(),
            edge.last_y()
        );
    }
}

#[test]
fn cache_eviction_follows_recency() {
    let cache = FilterCache::new(300);
    let image_100b = || Arc::new(RasterImage::new(5, 5));
    let key = |id: u32| CacheKey::new(id, &Affine::IDENTITY, IRect::new(0, 0, 1, 1), 0, IRect::EMPTY);

    cache.set(key(1), image_100b(), IPoint::ZERO);
    cache.set(key(2), image_100b(), IPoint::ZERO);
    cache.set(key(3), image_100b(), IPoint::ZERO);
    assert!(cache.get(&key(1)).is_some());

    cache.set(key(4), image_100b(), IPoint::ZERO);
    assert!(cache.get(&key(2)).is_none(), "K2 was least recently used");
    assert!(cache.get(&key(1)).is_some());
    assert!(cache.get(&key(3)).is_some());
    assert!(cache.get(&key(4)).is_some());
}

#[test]
fn oversized_entry_survives_until_next_insert() {
    let cache = FilterCache::new(100);
    let key = |id: u32| CacheKey::new(id, &Affine::IDENTITY, IRect::new(0, 0, 1, 1), 0, IRect::EMPTY);

    cache.set(key(1), Arc::new(RasterImage::new(25, 5)), IPoint::ZERO);
    assert!(cache.get(&key(1)).is_some());
    assert_eq!(cache.current_bytes(), 500);

    cache.set(key(2), Arc::new(RasterImage::new(5, 5)), IPoint::ZERO);
    assert!(cache.get(&key(1)).is_none());
    assert!(cache.get(&key(2)).is_some());
    assert_eq!(cache.current_bytes(), 100);
}

/// Counts compute invocations; passes its input through.
struct CountingFilter {
    common: FilterCommon,
    computes: AtomicUsize,
}

impl CountingFilter {
    fn new() -> Arc<Self> {
        Arc::new(CountingFilter {
            common: FilterCommon::new(vec![None], None),
            computes: AtomicUsize::new(0),
        })
    }
}

impl ImageFilter for CountingFilter {
    fn common(&self) -> &FilterCommon {
        &self.common
    }

    fn compute(
        &self,
        src: &Arc<RasterImage>,
        ctx: &Context<'_>,
        offset: &mut IPoint,
    ) -> Option<Arc<RasterImage>> {
        self.computes.fetch_add(1, Ordering::SeqCst);
        let mut input_offset = IPoint::ZERO;
        let input = self.filter_input(0, src, ctx, &mut input_offset)?;
        *offset = input_offset;
        Some(input)
    }
}

#[test]
fn node_destruction_purges_only_its_entries() {
    let global = FilterCache::global();
    global.purge();

    let src = Arc::new(RasterImage::new(8, 8));
    let ctx = Context::new(Affine::IDENTITY, IRect::new(0, 0, 64, 64), Some(global));
    let mut offset = IPoint::ZERO;

    let survivor = CountingFilter::new();
    survivor.apply(&src, &ctx, &mut offset).unwrap();

    {
        let doomed = CountingFilter::new();
        doomed.apply(&src, &ctx, &mut offset).unwrap();
        assert_eq!(global.count(), 2);
    }

    assert_eq!(global.count(), 1, "only the dropped node's entries leave");
    survivor.apply(&src, &ctx, &mut offset).unwrap();
    assert_eq!(
        survivor.computes.load(Ordering::SeqCst),
        1,
        "the survivor's entry must still hit"
    );

    global.purge();
}

#[test]
fn memoization_computes_once_per_fingerprint() {
    let cache = FilterCache::new(1 << 20);
    let node = CountingFilter::new();
    let src = Arc::new(RasterImage::new(16, 16));
    let ctx = Context::new(Affine::IDENTITY, IRect::new(0, 0, 64, 64), Some(&cache));

    let mut offset = IPoint::ZERO;
    for _ in 0..5 {
        node.apply(&src, &ctx, &mut offset).unwrap();
    }
    assert_eq!(node.computes.load(Ordering::SeqCst), 1);

    // a different source image is a different fingerprint
    let other = Arc::new(RasterImage::new(16, 16));
    node.apply(&other, &ctx, &mut offset).unwrap();
    assert_eq!(node.computes.load(Ordering::SeqCst), 2);
}

#[test]
fn filter_graph_composes_offsets_through_merge() {
    let cache = FilterCache::new(1 << 20);
    let ctx = Context::new(Affine::IDENTITY, IRect::new(0, 0, 64, 64), Some(&cache));

    let left = OffsetFilter::new(0.0, 0.0, None, None);
    let right = OffsetFilter::new(10.0, 0.0, None, None);
    let merge = MergeFilter::new(
        vec![
            Some(left as Arc<dyn ImageFilter>),
            Some(right as Arc<dyn ImageFilter>),
        ],
        None,
    );

    let src = Arc::new(RasterImage::from_pixels(4, 4, vec![0xff33_6699; 16]));
    let mut offset = IPoint::ZERO;
    let out = merge.apply(&src, &ctx, &mut offset).unwrap();

    assert_eq!(offset, IPoint::ZERO);
    assert_eq!(out.width(), 14);
    assert_eq!(out.pixel(1, 1), 0xff33_6699);
    assert_eq!(out.pixel(11, 1), 0xff33_6699);
    assert_eq!(out.pixel(6, 1), 0);

    // the whole graph memoized: merge plus both offsets
    assert_eq!(cache.count(), 3);
}

#[test]
fn clipped_triangle_polyline_path_end_to_end() {
    let mut path = Path::new();
    path.move_to((-20.0, 10.0))
        .line_to((120.0, 50.0))
        .line_to((-20.0, 90.0))
        .close();

    let clip = IRect::new(0, 0, 100, 100);
    let mut builder = BasicEdgeBuilder::new(0);
    let count = builder.build_edges(&path, Some(&clip));
    assert!(count > 0);

    for edge in builder.edge_list() {
        assert!(edge.first_y() <= edge.last_y());
        assert!(edge.first_y() >= 0);
        assert!(edge.last_y() < 100);
    }
}

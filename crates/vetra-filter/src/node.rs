//! Filter nodes and the evaluation protocol.
//!
//! A filter graph is a DAG of immutable, reference-counted nodes. The
//! [`ImageFilter`] trait carries the whole evaluation protocol as
//! provided methods; a concrete node supplies [`ImageFilter::compute`]
//! and, when it moves pixels, [`ImageFilter::map_node_bounds`].
//!
//! A `None` input slot is not "missing": it means "substitute the
//! caller's source image at evaluation time". [`FilterCommon`] records
//! at construction whether the node transitively reaches such a slot.

use std::sync::Arc;

use kurbo::{Affine, Rect};
use parking_lot::Mutex;

use vetra_core::geom::{IPoint, IRect};

use crate::cache::{CacheKey, FilterCache};
use crate::context::Context;
use crate::crop::CropRect;
use crate::image::{RasterCanvas, RasterImage};
use crate::next_unique_id;

/// Which way a bounds query travels through the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapDirection {
    /// From source content to output coverage.
    Forward,
    /// From required output back to required input.
    Reverse,
}

/// The state every filter node shares: inputs, crop, identity, and the
/// cache keys this node has populated.
pub struct FilterCommon {
    inputs: Vec<Option<Arc<dyn ImageFilter>>>,
    crop_rect: Option<CropRect>,
    unique_id: u32,
    uses_src_input: bool,
    cache_keys: Mutex<Vec<CacheKey>>,
}

impl FilterCommon {
    pub fn new(inputs: Vec<Option<Arc<dyn ImageFilter>>>, crop_rect: Option<CropRect>) -> Self {
        let uses_src_input = inputs
            .iter()
            .any(|input| match input {
                None => true,
                Some(filter) => filter.common().uses_src_input(),
            });
        FilterCommon {
            inputs,
            crop_rect,
            unique_id: next_unique_id(),
            uses_src_input,
            cache_keys: Mutex::new(Vec::new()),
        }
    }

    #[inline]
    pub fn unique_id(&self) -> u32 {
        self.unique_id
    }

    #[inline]
    pub fn uses_src_input(&self) -> bool {
        self.uses_src_input
    }

    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    pub fn input(&self, index: usize) -> Option<&Arc<dyn ImageFilter>> {
        self.inputs.get(index).and_then(|i| i.as_ref())
    }

    pub fn inputs(&self) -> &[Option<Arc<dyn ImageFilter>>] {
        &self.inputs
    }

    pub fn crop_rect(&self) -> Option<&CropRect> {
        self.crop_rect.as_ref()
    }

    /// Remember a key this node caused to be inserted. The key-list
    /// mutex is its own lock; callers never hold it across cache calls.
    fn record_key(&self, key: CacheKey) {
        self.cache_keys.lock().push(key);
    }

    #[cfg(test)]
    pub(crate) fn recorded_key_count(&self) -> usize {
        self.cache_keys.lock().len()
    }
}

impl Drop for FilterCommon {
    fn drop(&mut self) {
        // eagerly evict this node's results; its id never recurs, so
        // the entries could otherwise only age out by capacity
        let keys = std::mem::take(self.cache_keys.get_mut());
        if !keys.is_empty() {
            FilterCache::global().purge_by_keys(&keys);
        }
    }
}

/// A node in the image-filter DAG.
pub trait ImageFilter: Send + Sync {
    fn common(&self) -> &FilterCommon;

    /// Node-specific evaluation. On success, `offset` holds the
    /// result's top-left in clip space. `None` means filter failure
    /// and propagates to the caller uncached.
    fn compute(
        &self,
        src: &Arc<RasterImage>,
        ctx: &Context<'_>,
        offset: &mut IPoint,
    ) -> Option<Arc<RasterImage>>;

    /// This node's own spatial effect on a bounds rectangle.
    fn map_node_bounds(&self, src: IRect, _ctm: &Affine, _direction: MapDirection) -> IRect {
        src
    }

    /// The inputs' aggregate effect on a bounds rectangle: the join of
    /// each input's recursive bounds, with `None` slots contributing
    /// `src` unchanged. Leaves pass `src` through.
    fn map_bounds(&self, src: IRect, ctm: &Affine, direction: MapDirection) -> IRect {
        let common = self.common();
        if common.input_count() == 0 {
            return src;
        }
        let mut total: Option<IRect> = None;
        for input in common.inputs() {
            let rect = match input {
                Some(filter) => filter.filter_bounds(src, ctm, direction),
                None => src,
            };
            total = Some(match total {
                Some(t) => t.join(&rect),
                None => rect,
            });
        }
        total.unwrap_or(src)
    }

    /// Evaluate this node, memoizing through the context's cache.
    fn apply(
        &self,
        src: &Arc<RasterImage>,
        ctx: &Context<'_>,
        offset: &mut IPoint,
    ) -> Option<Arc<RasterImage>> {
        let common = self.common();

        // nodes that never read the source are keyed independently of it
        let src_id = if common.uses_src_input() { src.unique_id() } else { 0 };
        let src_subset = if common.uses_src_input() { src.subset() } else { IRect::EMPTY };
        let key = CacheKey::new(
            common.unique_id(),
            ctx.ctm(),
            ctx.clip_bounds(),
            src_id,
            src_subset,
        );

        if let Some(cache) = ctx.cache() {
            if let Some((image, cached_offset)) = cache.get(&key) {
                log::trace!("filter cache hit for node {}", common.unique_id());
                *offset = cached_offset;
                return Some(image);
            }
        }

        let result = self.compute(src, ctx, offset);
        if let Some(image) = &result {
            if let Some(cache) = ctx.cache() {
                cache.set(key, image.clone(), *offset);
                common.record_key(key);
            }
        }
        result
    }

    /// Evaluate input `index`, or return the dynamic source for a
    /// `None` slot.
    fn filter_input(
        &self,
        index: usize,
        src: &Arc<RasterImage>,
        ctx: &Context<'_>,
        offset: &mut IPoint,
    ) -> Option<Arc<RasterImage>> {
        match self.common().input(index) {
            None => Some(src.clone()),
            Some(input) => input.apply(src, &self.map_context(ctx), offset),
        }
    }

    /// The context an input is evaluated under: the clip mapped back
    /// through this node's spatial effect.
    fn map_context<'a>(&self, ctx: &Context<'a>) -> Context<'a> {
        let clip = self.map_node_bounds(ctx.clip_bounds(), ctx.ctm(), MapDirection::Reverse);
        ctx.with_clip_bounds(clip)
    }

    /// Map bounds through the whole subgraph rooted here.
    fn filter_bounds(&self, src: IRect, ctm: &Affine, direction: MapDirection) -> IRect {
        match direction {
            MapDirection::Reverse => {
                let bounds = self.map_node_bounds(src, ctm, MapDirection::Reverse);
                self.map_bounds(bounds, ctm, MapDirection::Reverse)
            }
            MapDirection::Forward => {
                let bounds = self.map_bounds(src, ctm, MapDirection::Forward);
                let bounds = self.map_node_bounds(bounds, ctm, MapDirection::Forward);
                match self.common().crop_rect() {
                    Some(crop) => crop.apply_to(bounds, ctm),
                    None => bounds,
                }
            }
        }
    }

    /// Conservative scalar bound: join of the inputs' recursive fast
    /// bounds, with `None` slots contributing `src`.
    fn compute_fast_bounds(&self, src: &Rect) -> Rect {
        let common = self.common();
        if common.input_count() == 0 {
            return *src;
        }
        let mut combined: Option<Rect> = None;
        for input in common.inputs() {
            let bounds = match input {
                Some(filter) => filter.compute_fast_bounds(src),
                None => *src,
            };
            combined = Some(match combined {
                Some(c) => c.union(bounds),
                None => bounds,
            });
        }
        combined.unwrap_or(*src)
    }

    /// Constrain an input image to this node's cropped, clipped output
    /// bounds, padding with transparency when the source doesn't cover
    /// them. On success returns the (possibly reused) image and the
    /// bounds; `src_offset` is rebased onto the bounds origin.
    /// `None` means the crop and clip don't intersect.
    fn apply_crop_rect(
        &self,
        ctx: &Context<'_>,
        src: &Arc<RasterImage>,
        src_offset: &mut IPoint,
    ) -> Option<(Arc<RasterImage>, IRect)> {
        let src_bounds = IRect::from_xywh(src_offset.x, src_offset.y, src.width(), src.height());
        let dst_bounds = self.map_node_bounds(src_bounds, ctx.ctm(), MapDirection::Forward);
        let cropped = match self.common().crop_rect() {
            Some(crop) => crop.apply_to(dst_bounds, ctx.ctm()),
            None => dst_bounds,
        };
        // the crop may grow past the clip (e.g. tiling); never process
        // more than the clip needs
        let bounds = cropped.intersect(&ctx.clip_bounds())?;

        if src_bounds.contains(&bounds) {
            return Some((src.clone(), bounds));
        }

        let mut canvas = RasterCanvas::new(bounds.width(), bounds.height());
        canvas.draw_image(src, src_offset.x - bounds.left, src_offset.y - bounds.top);
        *src_offset = IPoint::new(bounds.left, bounds.top);
        Some((Arc::new(canvas.snapshot()), bounds))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Pass-through node that counts compute calls.
    struct CountingFilter {
        common: FilterCommon,
        computes: AtomicUsize,
    }

    impl CountingFilter {
        fn new(inputs: Vec<Option<Arc<dyn ImageFilter>>>) -> Arc<Self> {
            Self::with_crop(inputs, None)
        }

        fn with_crop(
            inputs: Vec<Option<Arc<dyn ImageFilter>>>,
            crop: Option<CropRect>,
        ) -> Arc<Self> {
            Arc::new(CountingFilter {
                common: FilterCommon::new(inputs, crop),
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

    /// Node that always fails.
    struct FailingFilter {
        common: FilterCommon,
    }

    impl ImageFilter for FailingFilter {
        fn common(&self) -> &FilterCommon {
            &self.common
        }

        fn compute(
            &self,
            _src: &Arc<RasterImage>,
            _ctx: &Context<'_>,
            _offset: &mut IPoint,
        ) -> Option<Arc<RasterImage>> {
            None
        }
    }

    fn source() -> Arc<RasterImage> {
        Arc::new(RasterImage::new(8, 8))
    }

    #[test]
    fn test_unique_ids_nonzero_monotone_use() {
        let a = FilterCommon::new(vec![], None);
        let b = FilterCommon::new(vec![], None);
        assert_ne!(a.unique_id(), 0);
        assert_ne!(b.unique_id(), 0);
        assert_ne!(a.unique_id(), b.unique_id());
    }

    #[test]
    fn test_uses_src_input_propagates() {
        let leaf_no_src = CountingFilter::new(vec![]);
        assert!(!leaf_no_src.common().uses_src_input());

        let with_null = CountingFilter::new(vec![None]);
        assert!(with_null.common().uses_src_input());

        // transitively through a child that reads the source
        let parent =
            CountingFilter::new(vec![Some(with_null.clone() as Arc<dyn ImageFilter>)]);
        assert!(parent.common().uses_src_input());

        let parent_clean =
            CountingFilter::new(vec![Some(leaf_no_src.clone() as Arc<dyn ImageFilter>)]);
        assert!(!parent_clean.common().uses_src_input());
    }

    #[test]
    fn test_apply_memoizes_compute() {
        let cache = FilterCache::new(1 << 20);
        let node = CountingFilter::new(vec![None]);
        let src = source();
        let ctx = Context::new(Affine::IDENTITY, IRect::new(0, 0, 100, 100), Some(&cache));

        let mut offset = IPoint::ZERO;
        assert!(node.apply(&src, &ctx, &mut offset).is_some());
        assert!(node.apply(&src, &ctx, &mut offset).is_some());
        assert_eq!(node.computes.load(Ordering::SeqCst), 1);
        assert_eq!(node.common().recorded_key_count(), 1);
    }

    #[test]
    fn test_apply_without_cache_recomputes() {
        let node = CountingFilter::new(vec![None]);
        let src = source();
        let ctx = Context::new(Affine::IDENTITY, IRect::new(0, 0, 100, 100), None);

        let mut offset = IPoint::ZERO;
        node.apply(&src, &ctx, &mut offset);
        node.apply(&src, &ctx, &mut offset);
        assert_eq!(node.computes.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_different_context_recomputes() {
        let cache = FilterCache::new(1 << 20);
        let node = CountingFilter::new(vec![None]);
        let src = source();

        let mut offset = IPoint::ZERO;
        let ctx1 = Context::new(Affine::IDENTITY, IRect::new(0, 0, 100, 100), Some(&cache));
        node.apply(&src, &ctx1, &mut offset);
        let ctx2 = Context::new(Affine::scale(2.0), IRect::new(0, 0, 100, 100), Some(&cache));
        node.apply(&src, &ctx2, &mut offset);
        assert_eq!(node.computes.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_failure_not_cached() {
        let cache = FilterCache::new(1 << 20);
        let node = Arc::new(FailingFilter { common: FilterCommon::new(vec![None], None) });
        let src = source();
        let ctx = Context::new(Affine::IDENTITY, IRect::new(0, 0, 100, 100), Some(&cache));

        let mut offset = IPoint::ZERO;
        assert!(node.apply(&src, &ctx, &mut offset).is_none());
        assert_eq!(cache.count(), 0);
        assert_eq!(node.common().recorded_key_count(), 0);
    }

    #[test]
    fn test_filter_input_null_returns_src() {
        let node = CountingFilter::new(vec![None]);
        let src = source();
        let ctx = Context::new(Affine::IDENTITY, IRect::new(0, 0, 100, 100), None);

        let mut offset = IPoint::new(9, 9);
        let result = node.filter_input(0, &src, &ctx, &mut offset).unwrap();
        assert_eq!(result.unique_id(), src.unique_id());
        // a null input does not touch the offset
        assert_eq!(offset, IPoint::new(9, 9));
    }

    #[test]
    fn test_compute_fast_bounds_leaf_passthrough() {
        let leaf = CountingFilter::new(vec![]);
        let src = Rect::new(1.0, 2.0, 3.0, 4.0);
        assert_eq!(leaf.compute_fast_bounds(&src), src);
    }

    #[test]
    fn test_apply_crop_rect_reuses_contained_source() {
        let node = CountingFilter::new(vec![None]);
        let src = Arc::new(RasterImage::new(100, 100));
        let ctx = Context::new(Affine::IDENTITY, IRect::new(10, 10, 50, 50), None);

        let mut offset = IPoint::ZERO;
        let (image, bounds) = node.apply_crop_rect(&ctx, &src, &mut offset).unwrap();
        assert_eq!(bounds, IRect::new(10, 10, 50, 50));
        assert_eq!(image.unique_id(), src.unique_id());
        assert_eq!(offset, IPoint::ZERO);
    }

    #[test]
    fn test_apply_crop_rect_pads_uncovered_bounds() {
        // the crop grows the output past the 2x2 source at (3, 3)
        let crop = CropRect::full(Rect::new(0.0, 0.0, 6.0, 6.0));
        let node = CountingFilter::with_crop(vec![None], Some(crop));
        let src = Arc::new(RasterImage::from_pixels(2, 2, vec![0xff00_00ff; 4]));
        let ctx = Context::new(Affine::IDENTITY, IRect::new(0, 0, 6, 6), None);

        let mut offset = IPoint::new(3, 3);
        let (image, bounds) = node.apply_crop_rect(&ctx, &src, &mut offset).unwrap();
        assert_eq!(bounds, IRect::new(0, 0, 6, 6));
        assert_eq!(offset, IPoint::ZERO);
        assert_ne!(image.unique_id(), src.unique_id());
        assert_eq!(image.pixel(0, 0), 0);
        assert_eq!(image.pixel(3, 3), 0xff00_00ff);
    }

    #[test]
    fn test_apply_crop_rect_empty_intersection_fails() {
        let node = CountingFilter::new(vec![None]);
        let src = Arc::new(RasterImage::new(4, 4));
        let ctx = Context::new(Affine::IDENTITY, IRect::new(100, 100, 200, 200), None);

        let mut offset = IPoint::ZERO;
        assert!(node.apply_crop_rect(&ctx, &src, &mut offset).is_none());
    }

    #[test]
    fn test_drop_purges_recorded_keys_from_global() {
        let global = FilterCache::global();
        global.purge();

        let src = source();
        let ctx = Context::new(Affine::IDENTITY, IRect::new(0, 0, 100, 100), Some(global));

        let survivor = CountingFilter::new(vec![None]);
        let mut offset = IPoint::ZERO;
        survivor.apply(&src, &ctx, &mut offset);

        {
            let doomed = CountingFilter::new(vec![None]);
            doomed.apply(&src, &ctx, &mut offset);
            assert_eq!(global.count(), 2);
        }
        // doomed's entries are gone, survivor's remain
        assert_eq!(global.count(), 1);

        let mut offset = IPoint::ZERO;
        survivor.apply(&src, &ctx, &mut offset);
        assert_eq!(survivor.computes.load(Ordering::SeqCst), 1);

        global.purge();
    }
}

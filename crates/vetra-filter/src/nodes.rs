//! Concrete filter nodes.
//!
//! Two small nodes keep the evaluation protocol exercised end to end:
//! [`OffsetFilter`] translates its input (a node with a real spatial
//! effect, so it overrides `map_node_bounds`), and [`MergeFilter`]
//! composites any number of inputs in order (fan-in, bounds joins).

use std::sync::Arc;

use kurbo::Affine;
use kurbo::Point;

use vetra_core::geom::{IPoint, IRect};

use crate::context::Context;
use crate::crop::CropRect;
use crate::image::{RasterCanvas, RasterImage};
use crate::node::{FilterCommon, ImageFilter, MapDirection};

/// Translate the input by a layer-space vector.
pub struct OffsetFilter {
    common: FilterCommon,
    dx: f64,
    dy: f64,
}

impl OffsetFilter {
    pub fn new(
        dx: f64,
        dy: f64,
        input: Option<Arc<dyn ImageFilter>>,
        crop_rect: Option<CropRect>,
    ) -> Arc<Self> {
        Arc::new(OffsetFilter {
            common: FilterCommon::new(vec![input], crop_rect),
            dx,
            dy,
        })
    }

    /// The offset vector in device space (direction only, no
    /// translation component of the CTM).
    fn device_offset(&self, ctm: &Affine) -> IPoint {
        let mapped = (*ctm * Point::new(self.dx, self.dy)) - *ctm * Point::ZERO;
        IPoint::new(mapped.x.round() as i32, mapped.y.round() as i32)
    }
}

impl ImageFilter for OffsetFilter {
    fn common(&self) -> &FilterCommon {
        &self.common
    }

    fn compute(
        &self,
        src: &Arc<RasterImage>,
        ctx: &Context<'_>,
        offset: &mut IPoint,
    ) -> Option<Arc<RasterImage>> {
        let mut input_offset = IPoint::ZERO;
        let input = self.filter_input(0, src, ctx, &mut input_offset)?;
        let vec = self.device_offset(ctx.ctm());

        if self.common.crop_rect().is_none() {
            // pure translation: move the offset, keep the pixels
            *offset = IPoint::new(input_offset.x + vec.x, input_offset.y + vec.y);
            return Some(input);
        }

        let src_bounds =
            IRect::from_xywh(input_offset.x, input_offset.y, input.width(), input.height());
        let dst_bounds = self.map_node_bounds(src_bounds, ctx.ctm(), MapDirection::Forward);
        let cropped = match self.common.crop_rect() {
            Some(crop) => crop.apply_to(dst_bounds, ctx.ctm()),
            None => dst_bounds,
        };
        let bounds = cropped.intersect(&ctx.clip_bounds())?;

        let mut canvas = RasterCanvas::new(bounds.width(), bounds.height());
        canvas.draw_image(
            &input,
            input_offset.x + vec.x - bounds.left,
            input_offset.y + vec.y - bounds.top,
        );
        *offset = IPoint::new(bounds.left, bounds.top);
        Some(Arc::new(canvas.snapshot()))
    }

    fn map_node_bounds(&self, src: IRect, ctm: &Affine, direction: MapDirection) -> IRect {
        let vec = self.device_offset(ctm);
        match direction {
            MapDirection::Forward => src.offset(vec.x, vec.y),
            MapDirection::Reverse => src.offset(-vec.x, -vec.y),
        }
    }

    fn compute_fast_bounds(&self, src: &kurbo::Rect) -> kurbo::Rect {
        let bounds = match self.common.input(0) {
            Some(input) => input.compute_fast_bounds(src),
            None => *src,
        };
        bounds + kurbo::Vec2::new(self.dx, self.dy)
    }
}

/// Composite all inputs in order over transparency.
pub struct MergeFilter {
    common: FilterCommon,
}

impl MergeFilter {
    pub fn new(
        inputs: Vec<Option<Arc<dyn ImageFilter>>>,
        crop_rect: Option<CropRect>,
    ) -> Arc<Self> {
        Arc::new(MergeFilter { common: FilterCommon::new(inputs, crop_rect) })
    }
}

impl ImageFilter for MergeFilter {
    fn common(&self) -> &FilterCommon {
        &self.common
    }

    fn compute(
        &self,
        src: &Arc<RasterImage>,
        ctx: &Context<'_>,
        offset: &mut IPoint,
    ) -> Option<Arc<RasterImage>> {
        let count = self.common.input_count();
        if count == 0 {
            return None;
        }

        let mut children = Vec::with_capacity(count);
        let mut bounds = IRect::EMPTY;
        for index in 0..count {
            let mut child_offset = IPoint::ZERO;
            let child = self.filter_input(index, src, ctx, &mut child_offset)?;
            bounds = bounds.join(&IRect::from_xywh(
                child_offset.x,
                child_offset.y,
                child.width(),
                child.height(),
            ));
            children.push((child, child_offset));
        }

        let cropped = match self.common.crop_rect() {
            Some(crop) => crop.apply_to(bounds, ctx.ctm()),
            None => bounds,
        };
        let bounds = cropped.intersect(&ctx.clip_bounds())?;

        let mut canvas = RasterCanvas::new(bounds.width(), bounds.height());
        for (child, child_offset) in &children {
            canvas.draw_image(child, child_offset.x - bounds.left, child_offset.y - bounds.top);
        }
        *offset = IPoint::new(bounds.left, bounds.top);
        Some(Arc::new(canvas.snapshot()))
    }
}

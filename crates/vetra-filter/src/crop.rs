//! Per-node crop rectangles.
//!
//! A crop rect constrains a node's output bounds edge by edge. Left
//! and top are positional; width and height are sizes anchored at the
//! (possibly overridden) left/top, not right/bottom coordinates.

use bitflags::bitflags;
use kurbo::{Affine, Rect};
use vetra_core::geom::IRect;

bitflags! {
    /// Which edges of the crop rectangle participate.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CropEdges: u32 {
        const HAS_LEFT   = 1 << 0;
        const HAS_TOP    = 1 << 1;
        const HAS_WIDTH  = 1 << 2;
        const HAS_HEIGHT = 1 << 3;
        const HAS_ALL    = Self::HAS_LEFT.bits()
            | Self::HAS_TOP.bits()
            | Self::HAS_WIDTH.bits()
            | Self::HAS_HEIGHT.bits();
    }
}

/// A scalar rectangle plus the mask of edges that apply.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropRect {
    rect: Rect,
    edges: CropEdges,
}

impl CropRect {
    pub fn new(rect: Rect, edges: CropEdges) -> Self {
        CropRect { rect, edges }
    }

    /// A crop applying all four edges.
    pub fn full(rect: Rect) -> Self {
        CropRect { rect, edges: CropEdges::HAS_ALL }
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn edges(&self) -> CropEdges {
        self.edges
    }

    pub fn is_set(&self) -> bool {
        !self.edges.is_empty()
    }

    /// Constrain `bounds` by the present edges, under `ctm`.
    ///
    /// The crop rect lives in layer space: its corners are transformed
    /// through the CTM and rounded outward before any edge applies.
    /// Left/top are computed first so width/height can anchor on them.
    pub fn apply_to(&self, bounds: IRect, ctm: &Affine) -> IRect {
        let mut cropped = bounds;
        if self.edges.is_empty() {
            return cropped;
        }

        let dev = IRect::from_rect_round_out(&ctm.transform_rect_bbox(self.rect));

        if self.edges.contains(CropEdges::HAS_LEFT) {
            cropped.left = dev.left;
        }
        if self.edges.contains(CropEdges::HAS_TOP) {
            cropped.top = dev.top;
        }
        if self.edges.contains(CropEdges::HAS_WIDTH) {
            cropped.right = cropped.left + dev.width();
        }
        if self.edges.contains(CropEdges::HAS_HEIGHT) {
            cropped.bottom = cropped.top + dev.height();
        }
        cropped
    }
}

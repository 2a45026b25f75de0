//! The evaluation context threaded through the filter DAG.

use kurbo::Affine;
use vetra_core::geom::IRect;

use crate::cache::FilterCache;

/// Everything a node needs at evaluation time: the current transform,
/// the integer clip, and an optional cache to memoize through.
///
/// A context is a non-owning view; the cache it borrows must outlive
/// the evaluation it is used for.
#[derive(Clone, Copy)]
pub struct Context<'a> {
    ctm: Affine,
    clip_bounds: IRect,
    cache: Option<&'a FilterCache>,
}

impl<'a> Context<'a> {
    pub fn new(ctm: Affine, clip_bounds: IRect, cache: Option<&'a FilterCache>) -> Self {
        Context { ctm, clip_bounds, cache }
    }

    #[inline]
    pub fn ctm(&self) -> &Affine {
        &self.ctm
    }

    #[inline]
    pub fn clip_bounds(&self) -> IRect {
        self.clip_bounds
    }

    #[inline]
    pub fn cache(&self) -> Option<&'a FilterCache> {
        self.cache
    }

    /// The same context with a different clip.
    pub fn with_clip_bounds(&self, clip_bounds: IRect) -> Context<'a> {
        Context { clip_bounds, ..*self }
    }
}

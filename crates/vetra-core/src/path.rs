//! Path storage and the cursor that feeds the edge builder.
//!
//! A path is a verb stream over a flat point array, with conic weights
//! stored out of band. The cursor always walks with force-close
//! semantics: every contour is reported closed, synthesizing the
//! closing line segment when the author left it open. Fills only ever
//! see closed contours, so the edge builder consumes paths exclusively
//! through this cursor.

use bitflags::bitflags;
use kurbo::Point;

/// A typed step in a path stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Move,
    Line,
    Quad,
    Conic,
    Cubic,
    Close,
    Done,
}

impl Verb {
    /// Number of points the cursor reports for this verb, including
    /// the implicit starting point for segment verbs.
    pub const fn point_count(self) -> usize {
        match self {
            Verb::Move => 1,
            Verb::Line => 2,
            Verb::Quad | Verb::Conic => 3,
            Verb::Cubic => 4,
            Verb::Close | Verb::Done => 0,
        }
    }
}

bitflags! {
    /// Which segment kinds a path contains.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct SegmentMask: u8 {
        const LINE  = 1 << 0;
        const QUAD  = 1 << 1;
        const CONIC = 1 << 2;
        const CUBIC = 1 << 3;
    }
}

/// A 2D path: move/line/quad/conic/cubic/close verbs over scalar points.
#[derive(Debug, Clone, Default)]
pub struct Path {
    verbs: Vec<Verb>,
    points: Vec<Point>,
    conic_weights: Vec<f64>,
    segment_masks: SegmentMask,
    convex: bool,
}

impl Path {
    pub fn new() -> Self {
        Path {
            verbs: Vec::new(),
            points: Vec::new(),
            conic_weights: Vec::new(),
            segment_masks: SegmentMask::empty(),
            convex: false,
        }
    }

    pub fn move_to(&mut self, p: impl Into<Point>) -> &mut Self {
        self.verbs.push(Verb::Move);
        self.points.push(p.into());
        self
    }

    pub fn line_to(&mut self, p: impl Into<Point>) -> &mut Self {
        self.verbs.push(Verb::Line);
        self.points.push(p.into());
        self.segment_masks |= SegmentMask::LINE;
        self
    }

    pub fn quad_to(&mut self, p1: impl Into<Point>, p2: impl Into<Point>) -> &mut Self {
        self.verbs.push(Verb::Quad);
        self.points.push(p1.into());
        self.points.push(p2.into());
        self.segment_masks |= SegmentMask::QUAD;
        self
    }

    pub fn conic_to(
        &mut self,
        p1: impl Into<Point>,
        p2: impl Into<Point>,
        weight: f64,
    ) -> &mut Self {
        self.verbs.push(Verb::Conic);
        self.points.push(p1.into());
        self.points.push(p2.into());
        self.conic_weights.push(weight);
        self.segment_masks |= SegmentMask::CONIC;
        self
    }

    pub fn cubic_to(
        &mut self,
        p1: impl Into<Point>,
        p2: impl Into<Point>,
        p3: impl Into<Point>,
    ) -> &mut Self {
        self.verbs.push(Verb::Cubic);
        self.points.push(p1.into());
        self.points.push(p2.into());
        self.points.push(p3.into());
        self.segment_masks |= SegmentMask::CUBIC;
        self
    }

    pub fn close(&mut self) -> &mut Self {
        self.verbs.push(Verb::Close);
        self
    }

    pub fn count_points(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.verbs.is_empty()
    }

    pub fn segment_masks(&self) -> SegmentMask {
        self.segment_masks
    }

    /// Convexity is a property the path author asserts; it defaults to
    /// false (treat as possibly concave).
    pub fn is_convex(&self) -> bool {
        self.convex
    }

    pub fn set_convex(&mut self, convex: bool) -> &mut Self {
        self.convex = convex;
        self
    }

    pub fn cursor(&self) -> PathCursor<'_> {
        PathCursor {
            path: self,
            verb_idx: 0,
            point_idx: 0,
            weight_idx: 0,
            cur: Point::ZERO,
            start: Point::ZERO,
            have_segments: false,
            close_pending: false,
            weight: 1.0,
        }
    }
}

/// Force-closing iterator over `(Verb, points)`.
///
/// At most 4 points are written per step. After a `Conic` verb,
/// [`PathCursor::conic_weight`] reports that segment's weight.
pub struct PathCursor<'a> {
    path: &'a Path,
    verb_idx: usize,
    point_idx: usize,
    weight_idx: usize,
    cur: Point,
    start: Point,
    have_segments: bool,
    close_pending: bool,
    weight: f64,
}

impl<'a> PathCursor<'a> {
    /// Advance to the next verb, writing its points into `pts`.
    pub fn next(&mut self, pts: &mut [Point; 4]) -> Verb {
        if self.close_pending {
            self.close_pending = false;
            self.have_segments = false;
            return Verb::Close;
        }

        loop {
            let Some(&verb) = self.path.verbs.get(self.verb_idx) else {
                if self.have_segments {
                    return self.auto_close(pts);
                }
                return Verb::Done;
            };

            match verb {
                Verb::Move => {
                    if self.have_segments {
                        // the previous contour is still open
                        return self.auto_close(pts);
                    }
                    self.verb_idx += 1;
                    self.start = self.path.points[self.point_idx];
                    self.cur = self.start;
                    self.point_idx += 1;
                    pts[0] = self.start;
                    return Verb::Move;
                }
                Verb::Line => {
                    self.verb_idx += 1;
                    let p = self.path.points[self.point_idx];
                    self.point_idx += 1;
                    pts[0] = self.cur;
                    pts[1] = p;
                    self.cur = p;
                    self.have_segments = true;
                    return Verb::Line;
                }
                Verb::Quad | Verb::Conic => {
                    self.verb_idx += 1;
                    pts[0] = self.cur;
                    pts[1] = self.path.points[self.point_idx];
                    pts[2] = self.path.points[self.point_idx + 1];
                    self.point_idx += 2;
                    self.cur = pts[2];
                    self.have_segments = true;
                    if verb == Verb::Conic {
                        self.weight = self.path.conic_weights[self.weight_idx];
                        self.weight_idx += 1;
                    }
                    return verb;
                }
                Verb::Cubic => {
                    self.verb_idx += 1;
                    pts[0] = self.cur;
                    pts[1] = self.path.points[self.point_idx];
                    pts[2] = self.path.points[self.point_idx + 1];
                    pts[3] = self.path.points[self.point_idx + 2];
                    self.point_idx += 3;
                    self.cur = pts[3];
                    self.have_segments = true;
                    return Verb::Cubic;
                }
                Verb::Close => {
                    self.verb_idx += 1;
                    if self.have_segments {
                        return self.auto_close(pts);
                    }
                    // close on an empty contour carries no segment
                    return Verb::Close;
                }
                Verb::Done => {
                    return Verb::Done;
                }
            }
        }
    }

    /// Weight of the most recently returned `Conic` verb.
    pub fn conic_weight(&self) -> f64 {
        self.weight
    }

    fn auto_close(&mut self, pts: &mut [Point; 4]) -> Verb {
        if self.cur != self.start {
            pts[0] = self.cur;
            pts[1] = self.start;
            self.cur = self.start;
            self.close_pending = true;
            return Verb::Line;
        }
        self.have_segments = false;
        Verb::Close
    }
}

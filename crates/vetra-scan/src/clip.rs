// this_file: crates/vetra-scan/src/clip.rs

//! Clipping for the edge builder.
//!
//! Two collaborators: [`clip_line`] cuts one segment against a scalar
//! rectangle, turning the portions hanging off the left/right sides
//! into vertical segments along the clip edge (so winding is
//! preserved), and [`EdgeClipper`] does the same for quads and cubics,
//! queueing monotone pieces the caller drains with [`EdgeClipper::next`].
//!
//! Culling to the right is an optimization the caller grants: segments
//! wholly right of the clip contribute nothing to a fill that is
//! closed, so they may be dropped instead of pinned.

use kurbo::{Point, Rect};
use smallvec::SmallVec;
use vetra_core::path::Verb;

use crate::curves::{
    chop_cubic_at, chop_mono_cubic_at_x, chop_mono_cubic_at_y, chop_mono_quad_at_x,
    chop_mono_quad_at_y, chop_cubic_at_y_extrema, chop_quad_at, chop_quad_at_y_extrema,
};

/// Clipping a line can produce at most this many sub-segments: a
/// vertical piece on the left edge, the interior piece, and a vertical
/// piece on the right edge.
pub const MAX_CLIPPED_LINE_SEGMENTS: usize = 3;

/// Point capacity for [`clip_line`] output.
pub const MAX_CLIP_POINTS: usize = MAX_CLIPPED_LINE_SEGMENTS + 1;

fn sect_with_horizontal(src: &[Point; 2], y: f64) -> f64 {
    let dy = src[1].y - src[0].y;
    if dy == 0.0 {
        (src[0].x + src[1].x) * 0.5
    } else {
        src[0].x + (y - src[0].y) * (src[1].x - src[0].x) / dy
    }
}

fn sect_clamp_with_vertical(src: &[Point; 2], x: f64) -> f64 {
    let dx = src[1].x - src[0].x;
    let y = if dx == 0.0 {
        (src[0].y + src[1].y) * 0.5
    } else {
        src[0].y + (x - src[0].x) * (src[1].y - src[0].y) / dx
    };
    // clamp against the segment's own range to absorb imprecision
    let (lo, hi) = if src[0].y < src[1].y {
        (src[0].y, src[1].y)
    } else {
        (src[1].y, src[0].y)
    };
    y.clamp(lo, hi)
}

/// Clip one line segment against `clip`.
///
/// Writes up to `MAX_CLIP_POINTS` points into `out`; consecutive
/// points pair into the returned number of segments, in a direction
/// consistent with the input. Returns 0 when the segment is wholly
/// outside vertically, or wholly right of the clip with
/// `can_cull_to_the_right` granted.
pub fn clip_line(
    src: &[Point; 2],
    clip: &Rect,
    out: &mut [Point; MAX_CLIP_POINTS],
    can_cull_to_the_right: bool,
) -> usize {
    let (index0, index1) = if src[0].y < src[1].y { (0, 1) } else { (1, 0) };

    // completely above or below
    if src[index1].y <= clip.y0 || src[index0].y >= clip.y1 {
        return 0;
    }

    // chop in Y to a single in-range segment
    let mut tmp = *src;
    if src[index0].y < clip.y0 {
        tmp[index0] = Point::new(sect_with_horizontal(src, clip.y0), clip.y0);
    }
    if tmp[index1].y > clip.y1 {
        tmp[index1] = Point::new(sect_with_horizontal(src, clip.y1), clip.y1);
    }

    // chop in X into 1..3 segments wholly inside in X
    let (index0, index1, mut reverse) = if src[0].x < src[1].x {
        (0, 1, false)
    } else {
        (1, 0, true)
    };

    let mut storage = [Point::ZERO; MAX_CLIP_POINTS];
    let result: &[Point];
    let line_count;

    if tmp[index1].x <= clip.x0 {
        // wholly to the left: pin
        tmp[0].x = clip.x0;
        tmp[1].x = clip.x0;
        result = &tmp;
        line_count = 1;
        reverse = false;
    } else if tmp[index0].x >= clip.x1 {
        // wholly to the right: cull or pin
        if can_cull_to_the_right {
            return 0;
        }
        tmp[0].x = clip.x1;
        tmp[1].x = clip.x1;
        result = &tmp;
        line_count = 1;
        reverse = false;
    } else {
        let mut n = 0;
        if tmp[index0].x < clip.x0 {
            storage[n] = Point::new(clip.x0, tmp[index0].y);
            n += 1;
            storage[n] = Point::new(clip.x0, sect_clamp_with_vertical(&tmp, clip.x0));
        } else {
            storage[n] = tmp[index0];
        }
        n += 1;

        if tmp[index1].x > clip.x1 {
            storage[n] = Point::new(clip.x1, sect_clamp_with_vertical(&tmp, clip.x1));
            n += 1;
            storage[n] = Point::new(clip.x1, tmp[index1].y);
        } else {
            storage[n] = tmp[index1];
        }

        line_count = n;
        result = &storage;
    }

    if reverse {
        // preserve winding order
        for i in 0..=line_count {
            out[line_count - i] = result[i];
        }
    } else {
        out[..line_count + 1].copy_from_slice(&result[..line_count + 1]);
    }
    line_count
}

/// One queued monotone piece.
type Piece = (Verb, [Point; 4]);

/// Clips verbs against a rectangle, producing monotone pieces.
///
/// Load with one of the `clip_*` methods (each resets the queue), then
/// drain with [`EdgeClipper::next`] until it reports [`Verb::Done`].
pub struct EdgeClipper {
    queue: SmallVec<[Piece; 8]>,
    index: usize,
    can_cull_to_the_right: bool,
}

impl EdgeClipper {
    pub fn new(can_cull_to_the_right: bool) -> Self {
        EdgeClipper {
            queue: SmallVec::new(),
            index: 0,
            can_cull_to_the_right,
        }
    }

    fn reset(&mut self) {
        self.queue.clear();
        self.index = 0;
    }

    /// Drain the next monotone piece into `pts`.
    pub fn next(&mut self, pts: &mut [Point; 4]) -> Verb {
        if let Some((verb, src)) = self.queue.get(self.index) {
            *pts = *src;
            self.index += 1;
            *verb
        } else {
            Verb::Done
        }
    }

    pub fn clip_line(&mut self, p0: Point, p1: Point, clip: &Rect) -> bool {
        self.reset();

        let mut lines = [Point::ZERO; MAX_CLIP_POINTS];
        let count = clip_line(&[p0, p1], clip, &mut lines, self.can_cull_to_the_right);
        for i in 0..count {
            self.push_line(lines[i], lines[i + 1]);
        }
        !self.queue.is_empty()
    }

    pub fn clip_quad(&mut self, pts: &[Point], clip: &Rect) -> bool {
        self.reset();

        if !quick_reject_y(pts, clip) {
            let mut mono = [Point::ZERO; 5];
            let count = chop_quad_at_y_extrema(pts, &mut mono);
            for i in 0..=count {
                self.clip_mono_quad(&mono[i * 2..i * 2 + 3], clip);
            }
        }
        !self.queue.is_empty()
    }

    pub fn clip_cubic(&mut self, pts: &[Point], clip: &Rect) -> bool {
        self.reset();

        if !quick_reject_y(pts, clip) {
            let mut mono = [Point::ZERO; 10];
            let count = chop_cubic_at_y_extrema(pts, &mut mono);
            for i in 0..=count {
                self.clip_mono_cubic(&mono[i * 3..i * 3 + 4], clip);
            }
        }
        !self.queue.is_empty()
    }

    fn push_line(&mut self, p0: Point, p1: Point) {
        self.queue.push((Verb::Line, [p0, p1, Point::ZERO, Point::ZERO]));
    }

    fn append_vline(&mut self, x: f64, mut y0: f64, mut y1: f64, reverse: bool) {
        if y0 == y1 {
            return;
        }
        if reverse {
            std::mem::swap(&mut y0, &mut y1);
        }
        self.push_line(Point::new(x, y0), Point::new(x, y1));
    }

    fn append_quad(&mut self, pts: &[Point], reverse: bool) {
        let p = if reverse {
            [pts[2], pts[1], pts[0], Point::ZERO]
        } else {
            [pts[0], pts[1], pts[2], Point::ZERO]
        };
        self.queue.push((Verb::Quad, p));
    }

    fn append_cubic(&mut self, pts: &[Point], reverse: bool) {
        let p = if reverse {
            [pts[3], pts[2], pts[1], pts[0]]
        } else {
            [pts[0], pts[1], pts[2], pts[3]]
        };
        self.queue.push((Verb::Cubic, p));
    }

    fn clip_mono_quad(&mut self, src: &[Point], clip: &Rect) {
        let mut pts = [src[0], src[1], src[2]];
        let mut reverse = sort_increasing_y(&mut pts);

        // completely above or below
        if pts[2].y <= clip.y0 || pts[0].y >= clip.y1 {
            return;
        }

        chop_quad_in_y(&mut pts, clip);

        if pts[0].x > pts[2].x {
            pts.swap(0, 2);
            reverse = !reverse;
        }

        if pts[0].x.max(pts[2].x) <= clip.x0 {
            // wholly to the left
            self.append_vline(clip.x0, pts[0].y, pts[2].y, reverse);
            return;
        }
        if pts[0].x.min(pts[2].x) >= clip.x1 {
            // wholly to the right
            if !self.can_cull_to_the_right {
                self.append_vline(clip.x1, pts[0].y, pts[2].y, reverse);
            }
            return;
        }

        // partially to the left
        if pts[0].x < clip.x0 {
            if let Some(t) = chop_mono_quad_at_x(&pts, clip.x0) {
                let mut tmp = [Point::ZERO; 5];
                chop_quad_at(&pts, &mut tmp, t);
                self.append_vline(clip.x0, tmp[0].y, tmp[2].y, reverse);
                // absorb chop imprecision
                tmp[2].x = clip.x0;
                tmp[3].x = tmp[3].x.max(clip.x0);
                pts[0] = tmp[2];
                pts[1] = tmp[3];
            } else {
                // inexact numerics: clamp the whole piece to the edge
                self.append_vline(clip.x0, pts[0].y, pts[2].y, reverse);
                return;
            }
        }

        // partially to the right
        if pts[2].x > clip.x1 {
            if let Some(t) = chop_mono_quad_at_x(&pts, clip.x1) {
                let mut tmp = [Point::ZERO; 5];
                chop_quad_at(&pts, &mut tmp, t);
                tmp[1].x = tmp[1].x.min(clip.x1);
                tmp[2].x = clip.x1;
                self.append_quad(&tmp[..3], reverse);
                if !self.can_cull_to_the_right {
                    self.append_vline(clip.x1, tmp[2].y, tmp[4].y, reverse);
                }
            } else {
                self.append_vline(clip.x1, pts[0].y, pts[2].y, reverse);
            }
        } else {
            self.append_quad(&pts, reverse);
        }
    }

    fn clip_mono_cubic(&mut self, src: &[Point], clip: &Rect) {
        let mut pts = [src[0], src[1], src[2], src[3]];
        let mut reverse = sort_increasing_y4(&mut pts);

        if pts[3].y <= clip.y0 || pts[0].y >= clip.y1 {
            return;
        }

        chop_cubic_in_y(&mut pts, clip);

        if pts[0].x > pts[3].x {
            pts.swap(0, 3);
            pts.swap(1, 2);
            reverse = !reverse;
        }

        if pts[0].x.max(pts[3].x) <= clip.x0 {
            self.append_vline(clip.x0, pts[0].y, pts[3].y, reverse);
            return;
        }
        if pts[0].x.min(pts[3].x) >= clip.x1 {
            if !self.can_cull_to_the_right {
                self.append_vline(clip.x1, pts[0].y, pts[3].y, reverse);
            }
            return;
        }

        if pts[0].x < clip.x0 {
            if let Some(t) = chop_mono_cubic_at_x(&pts, clip.x0) {
                let mut tmp = [Point::ZERO; 7];
                chop_cubic_at(&pts, &mut tmp, t);
                self.append_vline(clip.x0, tmp[0].y, tmp[3].y, reverse);
                tmp[3].x = clip.x0;
                tmp[4].x = tmp[4].x.max(clip.x0);
                pts[0] = tmp[3];
                pts[1] = tmp[4];
                pts[2] = tmp[5];
            } else {
                self.append_vline(clip.x0, pts[0].y, pts[3].y, reverse);
                return;
            }
        }

        if pts[3].x > clip.x1 {
            if let Some(t) = chop_mono_cubic_at_x(&pts, clip.x1) {
                let mut tmp = [Point::ZERO; 7];
                chop_cubic_at(&pts, &mut tmp, t);
                tmp[1].x = tmp[1].x.min(clip.x1);
                tmp[2].x = tmp[2].x.min(clip.x1);
                tmp[3].x = clip.x1;
                self.append_cubic(&tmp[..4], reverse);
                if !self.can_cull_to_the_right {
                    self.append_vline(clip.x1, tmp[3].y, tmp[6].y, reverse);
                }
            } else {
                self.append_vline(clip.x1, pts[0].y, pts[3].y, reverse);
            }
        } else {
            self.append_cubic(&pts, reverse);
        }
    }
}

/// True when the curve is entirely above or below the clip.
fn quick_reject_y(pts: &[Point], clip: &Rect) -> bool {
    let mut top = pts[0].y;
    let mut bottom = pts[0].y;
    for p in &pts[1..] {
        top = top.min(p.y);
        bottom = bottom.max(p.y);
    }
    top >= clip.y1 || bottom <= clip.y0
}

fn sort_increasing_y(pts: &mut [Point; 3]) -> bool {
    if pts[0].y > pts[2].y {
        pts.swap(0, 2);
        true
    } else {
        false
    }
}

fn sort_increasing_y4(pts: &mut [Point; 4]) -> bool {
    if pts[0].y > pts[3].y {
        pts.swap(0, 3);
        pts.swap(1, 2);
        true
    } else {
        false
    }
}

fn chop_quad_in_y(pts: &mut [Point; 3], clip: &Rect) {
    if pts[0].y < clip.y0 {
        if let Some(t) = chop_mono_quad_at_y(pts, clip.y0) {
            let mut tmp = [Point::ZERO; 5];
            chop_quad_at(pts, &mut tmp, t);
            tmp[2].y = clip.y0;
            tmp[3].y = tmp[3].y.max(clip.y0);
            pts[0] = tmp[2];
            pts[1] = tmp[3];
        } else {
            for p in pts.iter_mut() {
                p.y = p.y.max(clip.y0);
            }
        }
    }
    if pts[2].y > clip.y1 {
        if let Some(t) = chop_mono_quad_at_y(pts, clip.y1) {
            let mut tmp = [Point::ZERO; 5];
            chop_quad_at(pts, &mut tmp, t);
            tmp[1].y = tmp[1].y.min(clip.y1);
            tmp[2].y = clip.y1;
            pts[1] = tmp[1];
            pts[2] = tmp[2];
        } else {
            for p in pts.iter_mut() {
                p.y = p.y.min(clip.y1);
            }
        }
    }
}

fn chop_cubic_in_y(pts: &mut [Point; 4], clip: &Rect) {
    if pts[0].y < clip.y0 {
        if let Some(t) = chop_mono_cubic_at_y(pts, clip.y0) {
            let mut tmp = [Point::ZERO; 7];
            chop_cubic_at(pts, &mut tmp, t);
            tmp[3].y = clip.y0;
            tmp[4].y = tmp[4].y.max(clip.y0);
            pts[0] = tmp[3];
            pts[1] = tmp[4];
            pts[2] = tmp[5];
        } else {
            for p in pts.iter_mut() {
                p.y = p.y.max(clip.y0);
            }
        }
    }
    if pts[3].y > clip.y1 {
        if let Some(t) = chop_mono_cubic_at_y(pts, clip.y1) {
            let mut tmp = [Point::ZERO; 7];
            chop_cubic_at(pts, &mut tmp, t);
            tmp[1].y = tmp[1].y.min(clip.y1);
            tmp[2].y = tmp[2].y.min(clip.y1);
            tmp[3].y = clip.y1;
            pts[1] = tmp[1];
            pts[2] = tmp[2];
            pts[3] = tmp[3];
        } else {
            for p in pts.iter_mut() {
                p.y = p.y.min(clip.y1);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(x: f64, y: f64) -> Point {
        Point::new(x, y)
    }

    fn drain(clipper: &mut EdgeClipper) -> Vec<(Verb, Vec<Point>)> {
        let mut pts = [Point::ZERO; 4];
        let mut out = Vec::new();
        loop {
            match clipper.next(&mut pts) {
                Verb::Done => break,
                v => out.push((v, pts[..v.point_count()].to_vec())),
            }
        }
        out
    }

    #[test]
    fn test_clip_line_inside_unchanged() {
        let clip = Rect::new(0.0, 0.0, 100.0, 100.0);
        let mut out = [Point::ZERO; MAX_CLIP_POINTS];
        let n = clip_line(&[pt(10.0, 10.0), pt(20.0, 30.0)], &clip, &mut out, false);
        assert_eq!(n, 1);
        assert_eq!(out[0], pt(10.0, 10.0));
        assert_eq!(out[1], pt(20.0, 30.0));
    }

    #[test]
    fn test_clip_line_above_rejected() {
        let clip = Rect::new(0.0, 10.0, 100.0, 100.0);
        let mut out = [Point::ZERO; MAX_CLIP_POINTS];
        let n = clip_line(&[pt(0.0, 0.0), pt(50.0, 5.0)], &clip, &mut out, false);
        assert_eq!(n, 0);
    }

    #[test]
    fn test_clip_line_left_becomes_vertical() {
        let clip = Rect::new(10.0, 0.0, 100.0, 100.0);
        let mut out = [Point::ZERO; MAX_CLIP_POINTS];
        let n = clip_line(&[pt(-10.0, 0.0), pt(-5.0, 50.0)], &clip, &mut out, false);
        assert_eq!(n, 1);
        assert_eq!(out[0].x, 10.0);
        assert_eq!(out[1].x, 10.0);
        assert_eq!(out[0].y, 0.0);
        assert_eq!(out[1].y, 50.0);
    }

    #[test]
    fn test_clip_line_right_culled_or_pinned() {
        let clip = Rect::new(0.0, 0.0, 50.0, 100.0);
        let seg = [pt(60.0, 0.0), pt(70.0, 50.0)];

        let mut out = [Point::ZERO; MAX_CLIP_POINTS];
        assert_eq!(clip_line(&seg, &clip, &mut out, true), 0);

        let n = clip_line(&seg, &clip, &mut out, false);
        assert_eq!(n, 1);
        assert_eq!(out[0].x, 50.0);
        assert_eq!(out[1].x, 50.0);
    }

    #[test]
    fn test_clip_line_straddles_left() {
        let clip = Rect::new(10.0, 0.0, 100.0, 100.0);
        // crosses x = 10 at y = 25
        let n_pts = [pt(0.0, 20.0), pt(20.0, 30.0)];
        let mut out = [Point::ZERO; MAX_CLIP_POINTS];
        let n = clip_line(&n_pts, &clip, &mut out, false);
        assert_eq!(n, 2);
        // first a vertical on the left edge
        assert_eq!(out[0], pt(10.0, 20.0));
        assert_eq!(out[1], pt(10.0, 25.0));
        // then the interior segment
        assert_eq!(out[2], pt(20.0, 30.0));
    }

    #[test]
    fn test_clip_line_preserves_direction() {
        let clip = Rect::new(0.0, 0.0, 100.0, 100.0);
        // downward in Y travelling right-to-left
        let seg = [pt(80.0, 90.0), pt(20.0, 10.0)];
        let mut out = [Point::ZERO; MAX_CLIP_POINTS];
        let n = clip_line(&seg, &clip, &mut out, false);
        assert_eq!(n, 1);
        assert_eq!(out[0], seg[0]);
        assert_eq!(out[1], seg[1]);
    }

    #[test]
    fn test_clipper_quad_inside_passthrough() {
        let clip = Rect::new(0.0, 0.0, 100.0, 100.0);
        let mut clipper = EdgeClipper::new(false);
        assert!(clipper.clip_quad(&[pt(10.0, 10.0), pt(50.0, 20.0), pt(90.0, 90.0)], &clip));

        let pieces = drain(&mut clipper);
        assert_eq!(pieces.len(), 1);
        assert_eq!(pieces[0].0, Verb::Quad);
    }

    #[test]
    fn test_clipper_quad_arch_split_monotone() {
        let clip = Rect::new(0.0, 0.0, 100.0, 100.0);
        let mut clipper = EdgeClipper::new(false);
        // arch peaks mid-span: must come out as two monotone pieces
        assert!(clipper.clip_quad(&[pt(10.0, 90.0), pt(50.0, 10.0), pt(90.0, 90.0)], &clip));

        let pieces = drain(&mut clipper);
        assert_eq!(pieces.len(), 2);
        for (verb, pts) in &pieces {
            assert_eq!(*verb, Verb::Quad);
            let ys: Vec<f64> = pts.iter().map(|p| p.y).collect();
            let increasing = ys[0] <= ys[2];
            assert!(
                ys.windows(2).all(|w| if increasing { w[0] <= w[1] } else { w[0] >= w[1] }),
                "piece not monotone: {ys:?}"
            );
        }
    }

    #[test]
    fn test_clipper_quad_outside_rejected() {
        let clip = Rect::new(0.0, 0.0, 100.0, 50.0);
        let mut clipper = EdgeClipper::new(false);
        assert!(!clipper.clip_quad(&[pt(0.0, 60.0), pt(50.0, 80.0), pt(100.0, 70.0)], &clip));
    }

    #[test]
    fn test_clipper_quad_chopped_to_clip_y_range() {
        let clip = Rect::new(10.0, 10.0, 90.0, 90.0);
        let mut clipper = EdgeClipper::new(false);
        assert!(clipper.clip_quad(&[pt(20.0, 0.0), pt(50.0, 50.0), pt(80.0, 120.0)], &clip));

        for (_, pts) in drain(&mut clipper) {
            for p in pts {
                assert!(p.y >= 10.0 - 1e-6 && p.y <= 90.0 + 1e-6, "y out of clip: {p:?}");
            }
        }
    }

    #[test]
    fn test_clipper_cubic_left_pinned() {
        let clip = Rect::new(0.0, 0.0, 100.0, 100.0);
        let mut clipper = EdgeClipper::new(false);
        // wholly left of the clip: becomes a single vertical line
        assert!(clipper.clip_cubic(
            &[pt(-50.0, 10.0), pt(-40.0, 30.0), pt(-30.0, 60.0), pt(-20.0, 90.0)],
            &clip
        ));

        let pieces = drain(&mut clipper);
        assert_eq!(pieces.len(), 1);
        assert_eq!(pieces[0].0, Verb::Line);
        assert_eq!(pieces[0].1[0].x, 0.0);
        assert_eq!(pieces[0].1[1].x, 0.0);
    }

    #[test]
    fn test_clipper_cubic_right_culled() {
        let clip = Rect::new(0.0, 0.0, 100.0, 100.0);
        let mut clipper = EdgeClipper::new(true);
        assert!(!clipper.clip_cubic(
            &[pt(150.0, 10.0), pt(160.0, 30.0), pt(170.0, 60.0), pt(180.0, 90.0)],
            &clip
        ));
    }

    #[test]
    fn test_clipper_reversed_quad_preserves_direction() {
        let clip = Rect::new(0.0, 0.0, 100.0, 100.0);
        let mut clipper = EdgeClipper::new(false);
        // travels upward: pieces must still run top-point-last
        assert!(clipper.clip_quad(&[pt(90.0, 90.0), pt(50.0, 50.0), pt(10.0, 10.0)], &clip));

        let pieces = drain(&mut clipper);
        assert_eq!(pieces.len(), 1);
        let pts = &pieces[0].1;
        assert!(pts[0].y > pts[2].y, "direction flipped: {pts:?}");
    }
}

// this_file: crates/vetra-scan/src/edge.rs

//! Basic-flavor edge records: integer scanlines, 16.16 X and slope.
//!
//! A line edge covers scanlines `first_y..=last_y` with its X at the
//! first scanline center and a per-scanline increment. Curve edges
//! carry forward-difference state on top of the same line part; each
//! `update` re-derives the line fields for the next curve segment.
//! All coordinates pass through FDot6 quantization (optionally
//! pre-scaled by the builder's clip shift) so identical inputs produce
//! identical edges regardless of the path that computed them.

use kurbo::Point;

use crate::fixed::{fdot6_div, FDot6, Fix16};

/// Largest subdivision shift the coefficient bias scheme supports.
const MAX_COEFF_SHIFT: u32 = 6;

/// FDot6 distance from `y0` up to the center of scanline `top`.
#[inline]
fn compute_dy(top: i32, y0: FDot6) -> FDot6 {
    FDot6::from_raw((top << 6) + 32 - y0.raw())
}

/// `slope * dy` where the slope is 16.16 and dy is FDot6; FDot6 result.
#[inline]
fn fix_mul_fdot6(slope: Fix16, dy: FDot6) -> FDot6 {
    FDot6::from_raw(((slope.raw() as i64 * dy.raw() as i64) >> 16) as i32)
}

#[inline]
fn cheap_distance(dx: i32, dy: i32) -> i32 {
    let dx = dx.abs();
    let dy = dy.abs();
    // max + min/2 approximates the euclidean distance
    if dx > dy {
        dx + (dy >> 1)
    } else {
        dy + (dx >> 1)
    }
}

/// Subdivision shift from the curve's deviation off its baseline.
///
/// Each subdivision cuts the error by 4, so the shift is half the bit
/// length of the deviation after scaling to half-pixel accuracy.
#[inline]
fn diff_to_shift(dx: FDot6, dy: FDot6) -> u32 {
    let mut dist = cheap_distance(dx.raw(), dy.raw());
    dist = (dist + (1 << 4)) >> 5;
    (32 - dist.leading_zeros()) >> 1
}

/// Deviation of the two off-curve cubic controls from the baseline.
#[inline]
fn cubic_delta_from_line(a: FDot6, b: FDot6, c: FDot6, d: FDot6) -> FDot6 {
    let span = d.raw() - a.raw();
    let one_third = a.raw() + span / 3;
    let two_thirds = a.raw() + 2 * span / 3;
    FDot6::from_raw((b.raw() - one_third).abs().max((c.raw() - two_thirds).abs()))
}

/// A line edge, and the line part embedded in every curve edge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineEdge {
    /// X at the current scanline, 16.16.
    pub x: Fix16,
    /// X increment per scanline, 16.16.
    pub dx: Fix16,
    /// First scanline covered (inclusive).
    pub first_y: i32,
    /// Last scanline covered (inclusive).
    pub last_y: i32,
    /// +1 or -1.
    pub winding: i8,
    /// Remaining forward-difference segments: 0 for lines, positive
    /// for curve edges.
    pub curve_count: i8,
}

impl LineEdge {
    /// Quantize and set from two scalar points. Returns false when the
    /// rounded Ys coincide (the edge covers no scanline).
    pub fn set_line(&mut self, p0: Point, p1: Point, shift: u32) -> bool {
        let mut x0 = FDot6::from_scalar_shifted(p0.x, shift);
        let mut y0 = FDot6::from_scalar_shifted(p0.y, shift);
        let mut x1 = FDot6::from_scalar_shifted(p1.x, shift);
        let mut y1 = FDot6::from_scalar_shifted(p1.y, shift);

        let mut winding = 1i8;
        if y0 > y1 {
            std::mem::swap(&mut x0, &mut x1);
            std::mem::swap(&mut y0, &mut y1);
            winding = -1;
        }

        let top = y0.round();
        let bot = y1.round();
        if top == bot {
            return false;
        }

        let slope = fdot6_div(x1 - x0, y1 - y0);
        let dy = compute_dy(top, y0);

        self.x = (x0 + fix_mul_fdot6(slope, dy)).to_fix();
        self.dx = slope;
        self.first_y = top;
        self.last_y = bot - 1;
        self.winding = winding;
        self.curve_count = 0;
        true
    }

    /// Re-derive the line fields from one curve segment, in 16.16.
    fn update_line(&mut self, x0: Fix16, y0: Fix16, x1: Fix16, y1: Fix16) -> bool {
        let y0 = y0.to_fdot6();
        let y1 = y1.to_fdot6();
        debug_assert!(y0 <= y1);

        let top = y0.round();
        let bot = y1.round();
        if top == bot {
            return false;
        }

        let x0 = x0.to_fdot6();
        let x1 = x1.to_fdot6();

        let slope = fdot6_div(x1 - x0, y1 - y0);
        let dy = compute_dy(top, y0);

        self.x = (x0 + fix_mul_fdot6(slope, dy)).to_fix();
        self.dx = slope;
        self.first_y = top;
        self.last_y = bot - 1;
        true
    }

    #[inline]
    pub fn is_vertical(&self) -> bool {
        self.dx == Fix16::ZERO && self.curve_count == 0
    }
}

/// A quadratic edge: line part plus forward differences.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuadEdge {
    pub line: LineEdge,
    curve_shift: u8,
    qx: Fix16,
    qy: Fix16,
    qdx: Fix16,
    qdy: Fix16,
    qddx: Fix16,
    qddy: Fix16,
    qlast_x: Fix16,
    qlast_y: Fix16,
}

impl QuadEdge {
    /// Set from a Y-monotone quad. Returns false when the quad rounds
    /// to zero height or its first segment produces no scanline.
    pub fn set_quadratic(&mut self, pts: &[Point], shift: u32) -> bool {
        let mut x0 = FDot6::from_scalar_shifted(pts[0].x, shift);
        let mut y0 = FDot6::from_scalar_shifted(pts[0].y, shift);
        let x1 = FDot6::from_scalar_shifted(pts[1].x, shift);
        let y1 = FDot6::from_scalar_shifted(pts[1].y, shift);
        let mut x2 = FDot6::from_scalar_shifted(pts[2].x, shift);
        let mut y2 = FDot6::from_scalar_shifted(pts[2].y, shift);

        let mut winding = 1i8;
        if y0 > y2 {
            std::mem::swap(&mut x0, &mut x2);
            std::mem::swap(&mut y0, &mut y2);
            winding = -1;
        }
        debug_assert!(y0 <= y1 && y1 <= y2);

        let top = y0.round();
        let bot = y2.round();
        if top == bot {
            return false;
        }

        // subdivision count, from the control's deviation off the chord
        let dx = FDot6::from_raw(((x1.raw() << 1) - x0.raw() - x2.raw()) >> 2);
        let dy = FDot6::from_raw(((y1.raw() << 1) - y0.raw() - y2.raw()) >> 2);
        let sub_shift = diff_to_shift(dx, dy).clamp(1, MAX_COEFF_SHIFT);

        self.line.winding = winding;
        self.line.curve_count = (1i32 << sub_shift) as i8;

        // The polynomial form A t^2 + B t + C forward-differences
        // cleanly, but A and B can overflow 16.16 at full scale, so
        // they are stored at half value and the stepping shift is one
        // less to compensate.
        self.curve_shift = (sub_shift - 1) as u8;
        let up_shift = 10u32;

        let a = (x0 - x1 - x1 + x2).up_shift(up_shift); // half the real A
        let b = (x1 - x0).up_shift(up_shift); // half the real B
        self.qx = x0.to_fix();
        self.qdx = b + a.shr(sub_shift);
        self.qddx = a.shr(sub_shift - 1);

        let a = (y0 - y1 - y1 + y2).up_shift(up_shift);
        let b = (y1 - y0).up_shift(up_shift);
        self.qy = y0.to_fix();
        self.qdy = b + a.shr(sub_shift);
        self.qddy = a.shr(sub_shift - 1);

        self.qlast_x = x2.to_fix();
        self.qlast_y = y2.to_fix();

        self.update()
    }

    /// Advance to the next forward-difference segment, skipping
    /// segments that round to zero height. Returns false when the
    /// curve is exhausted.
    pub fn update(&mut self) -> bool {
        let mut count = self.line.curve_count as i32;
        if count <= 0 {
            return false;
        }

        let mut oldx = self.qx;
        let mut oldy = self.qy;
        let mut dx = self.qdx;
        let mut dy = self.qdy;
        let shift = self.curve_shift as u32;
        let mut newx;
        let mut newy;
        let mut success;

        loop {
            count -= 1;
            if count > 0 {
                newx = oldx + dx.shr(shift);
                dx = dx + self.qddx;
                newy = oldy + dy.shr(shift);
                dy = dy + self.qddy;
            } else {
                newx = self.qlast_x;
                newy = self.qlast_y;
            }
            success = self.line.update_line(oldx, oldy, newx, newy);
            oldx = newx;
            oldy = newy;
            if count <= 0 || success {
                break;
            }
        }

        self.qx = newx;
        self.qy = newy;
        self.qdx = dx;
        self.qdy = dy;
        self.line.curve_count = count as i8;
        success
    }
}

/// A cubic edge: line part plus third-order forward differences.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CubicEdge {
    pub line: LineEdge,
    curve_shift: u8,
    d_shift: u8,
    cx: Fix16,
    cy: Fix16,
    cdx: Fix16,
    cdy: Fix16,
    cddx: Fix16,
    cddy: Fix16,
    cdddx: Fix16,
    cdddy: Fix16,
    clast_x: Fix16,
    clast_y: Fix16,
}

impl CubicEdge {
    /// Set from a Y-monotone cubic.
    pub fn set_cubic(&mut self, pts: &[Point], shift: u32) -> bool {
        let mut x0 = FDot6::from_scalar_shifted(pts[0].x, shift);
        let mut y0 = FDot6::from_scalar_shifted(pts[0].y, shift);
        let mut x1 = FDot6::from_scalar_shifted(pts[1].x, shift);
        let mut y1 = FDot6::from_scalar_shifted(pts[1].y, shift);
        let mut x2 = FDot6::from_scalar_shifted(pts[2].x, shift);
        let mut y2 = FDot6::from_scalar_shifted(pts[2].y, shift);
        let mut x3 = FDot6::from_scalar_shifted(pts[3].x, shift);
        let mut y3 = FDot6::from_scalar_shifted(pts[3].y, shift);

        let mut winding = 1i8;
        if y0 > y3 {
            std::mem::swap(&mut x0, &mut x3);
            std::mem::swap(&mut x1, &mut x2);
            std::mem::swap(&mut y0, &mut y3);
            std::mem::swap(&mut y1, &mut y2);
            winding = -1;
        }

        let top = y0.round();
        let bot = y3.round();
        if top == bot {
            return false;
        }

        // The curve's own center need not be the max deviation from
        // the baseline, so measure both off-curve controls. The extra
        // subdivision level over the quad case is empirical.
        let dx = cubic_delta_from_line(x0, x1, x2, x3);
        let dy = cubic_delta_from_line(y0, y1, y2, y3);
        let sub_shift = (diff_to_shift(dx, dy) + 1).min(MAX_COEFF_SHIFT);
        debug_assert!(sub_shift > 0);

        // Coefficients carry a 3x factor, so the largest safe upshift
        // from FDot6 is 6; spill the remainder into the stepping shift.
        let mut up_shift = 6u32;
        let mut down_shift = sub_shift + up_shift;
        if down_shift >= 10 {
            down_shift -= 10;
        } else {
            down_shift = 0;
            up_shift = 10 - sub_shift;
        }

        self.line.winding = winding;
        self.line.curve_count = (1i32 << sub_shift) as i8;
        self.curve_shift = sub_shift as u8;
        self.d_shift = down_shift as u8;

        let b = FDot6::from_raw(3 * (x1.raw() - x0.raw())).up_shift(up_shift);
        let c = FDot6::from_raw(3 * (x0.raw() - x1.raw() - x1.raw() + x2.raw())).up_shift(up_shift);
        let d = FDot6::from_raw(x3.raw() + 3 * (x1.raw() - x2.raw()) - x0.raw()).up_shift(up_shift);

        self.cx = x0.to_fix();
        self.cdx = b + c.shr(sub_shift) + d.shr(2 * sub_shift);
        self.cddx = c + c + Fix16::from_raw((3 * d.raw()) >> (sub_shift - 1));
        self.cdddx = Fix16::from_raw((3 * d.raw()) >> (sub_shift - 1));

        let b = FDot6::from_raw(3 * (y1.raw() - y0.raw())).up_shift(up_shift);
        let c = FDot6::from_raw(3 * (y0.raw() - y1.raw() - y1.raw() + y2.raw())).up_shift(up_shift);
        let d = FDot6::from_raw(y3.raw() + 3 * (y1.raw() - y2.raw()) - y0.raw()).up_shift(up_shift);

        self.cy = y0.to_fix();
        self.cdy = b + c.shr(sub_shift) + d.shr(2 * sub_shift);
        self.cddy = c + c + Fix16::from_raw((3 * d.raw()) >> (sub_shift - 1));
        self.cdddy = Fix16::from_raw((3 * d.raw()) >> (sub_shift - 1));

        self.clast_x = x3.to_fix();
        self.clast_y = y3.to_fix();

        self.update()
    }

    /// Advance to the next forward-difference segment.
    pub fn update(&mut self) -> bool {
        let mut count = self.line.curve_count as i32;
        if count <= 0 {
            return false;
        }

        let mut oldx = self.cx;
        let mut oldy = self.cy;
        let dd_shift = self.curve_shift as u32;
        let d_shift = self.d_shift as u32;
        let mut newx;
        let mut newy;
        let mut success;

        loop {
            count -= 1;
            if count > 0 {
                newx = oldx + self.cdx.shr(d_shift);
                self.cdx = self.cdx + self.cddx.shr(dd_shift);
                self.cddx = self.cddx + self.cdddx;

                newy = oldy + self.cdy.shr(d_shift);
                self.cdy = self.cdy + self.cddy.shr(dd_shift);
                self.cddy = self.cddy + self.cdddy;
            } else {
                newx = self.clast_x;
                newy = self.clast_y;
            }

            // finite fixed point cannot promise newy >= oldy, so pin
            if newy < oldy {
                newy = oldy;
            }

            success = self.line.update_line(oldx, oldy, newx, newy);
            oldx = newx;
            oldy = newy;
            if count <= 0 || success {
                break;
            }
        }

        self.cx = newx;
        self.cy = newy;
        self.line.curve_count = count as i8;
        success
    }
}

/// One basic-flavor edge record in the builder's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BasicEdge {
    Line(LineEdge),
    Quad(QuadEdge),
    Cubic(CubicEdge),
}

impl BasicEdge {
    /// The line part shared by every flavor of record.
    pub fn line_part(&self) -> &LineEdge {
        match self {
            BasicEdge::Line(e) => e,
            BasicEdge::Quad(q) => &q.line,
            BasicEdge::Cubic(c) => &c.line,
        }
    }

    pub fn first_y(&self) -> i32 {
        self.line_part().first_y
    }

    pub fn last_y(&self) -> i32 {
        self.line_part().last_y
    }

    pub fn winding(&self) -> i8 {
        self.line_part().winding
    }

    pub fn curve_count(&self) -> i8 {
        self.line_part().curve_count
    }
}

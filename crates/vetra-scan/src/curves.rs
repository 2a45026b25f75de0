// this_file: crates/vetra-scan/src/curves.rs

//! Curve chopping: Y-extrema subdivision and conic approximation.
//!
//! The edge builder only ever hands monotone-in-Y pieces to an edge
//! record, so quads and cubics are split at the parameter values where
//! dY/dt changes sign. Conics are approximated by a power-of-two run
//! of quadratics chosen from the standard error bound.

use kurbo::Point;
use vetra_core::geom::points_are_finite;

/// Subdivision levels are capped; error shrinks 4x per level so five
/// levels cover any tolerance a rasterizer would ask for.
const MAX_CONIC_TO_QUAD_POW2: usize = 5;

#[inline]
fn lerp(a: Point, b: Point, t: f64) -> Point {
    Point::new(a.x + (b.x - a.x) * t, a.y + (b.y - a.y) * t)
}

/// `numer / denom` when the ratio lands strictly inside (0, 1).
fn valid_unit_divide(mut numer: f64, mut denom: f64) -> Option<f64> {
    if numer < 0.0 {
        numer = -numer;
        denom = -denom;
    }
    if denom == 0.0 || numer == 0.0 || numer >= denom {
        return None;
    }
    let r = numer / denom;
    if r.is_nan() || r == 0.0 {
        return None;
    }
    Some(r)
}

/// Both roots of `A t^2 + B t + C = 0` inside the unit interval,
/// computed with the numerically stable form of the formula.
fn find_unit_quad_roots(a: f64, b: f64, c: f64, roots: &mut [f64; 2]) -> usize {
    if a == 0.0 {
        return match valid_unit_divide(-c, b) {
            Some(r) => {
                roots[0] = r;
                1
            }
            None => 0,
        };
    }

    let dr = b * b - 4.0 * a * c;
    if dr < 0.0 {
        return 0;
    }
    let dr = dr.sqrt();
    let q = if b < 0.0 { -(b - dr) / 2.0 } else { -(b + dr) / 2.0 };

    let mut n = 0;
    if let Some(r) = valid_unit_divide(q, a) {
        roots[n] = r;
        n += 1;
    }
    if let Some(r) = valid_unit_divide(c, q) {
        roots[n] = r;
        n += 1;
    }
    if n == 2 {
        if roots[0] > roots[1] {
            roots.swap(0, 1);
        } else if roots[0] == roots[1] {
            n = 1;
        }
    }
    n
}

/// De Casteljau split of a quad at `t`; the halves share `dst[2]`.
pub fn chop_quad_at(src: &[Point], dst: &mut [Point; 5], t: f64) {
    let ab = lerp(src[0], src[1], t);
    let bc = lerp(src[1], src[2], t);

    dst[0] = src[0];
    dst[1] = ab;
    dst[2] = lerp(ab, bc, t);
    dst[3] = bc;
    dst[4] = src[2];
}

/// De Casteljau split of a cubic at `t`; the halves share `dst[3]`.
pub fn chop_cubic_at(src: &[Point], dst: &mut [Point; 7], t: f64) {
    let ab = lerp(src[0], src[1], t);
    let bc = lerp(src[1], src[2], t);
    let cd = lerp(src[2], src[3], t);
    let abc = lerp(ab, bc, t);
    let bcd = lerp(bc, cd, t);

    dst[0] = src[0];
    dst[1] = ab;
    dst[2] = abc;
    dst[3] = lerp(abc, bcd, t);
    dst[4] = bcd;
    dst[5] = cd;
    dst[6] = src[3];
}

fn is_not_monotonic(a: f64, b: f64, c: f64) -> bool {
    let ab = a - b;
    let mut bc = b - c;
    if ab < 0.0 {
        bc = -bc;
    }
    ab == 0.0 || bc < 0.0
}

/// Split a quad at its Y extremum when one lies strictly inside (0, 1).
///
/// Returns `n` in {0, 1}; `dst` holds `n + 1` monotone quads sharing
/// endpoints (5 points for the split case). The shared extremum's
/// neighbor control Ys are flattened so each piece is truly monotone.
pub fn chop_quad_at_y_extrema(src: &[Point], dst: &mut [Point; 5]) -> usize {
    let a = src[0].y;
    let mut b = src[1].y;
    let c = src[2].y;

    if is_not_monotonic(a, b, c) {
        if let Some(t) = valid_unit_divide(a - b, a - b - b + c) {
            chop_quad_at(src, dst, t);
            // pin the controls flanking the extremum
            dst[1].y = dst[2].y;
            dst[3].y = dst[2].y;
            return 1;
        }
        // underflow in the divide: force monotonicity on the control
        b = if (a - b).abs() < (b - c).abs() { a } else { c };
    }
    dst[0] = Point::new(src[0].x, a);
    dst[1] = Point::new(src[1].x, b);
    dst[2] = Point::new(src[2].x, c);
    0
}

/// Parameter values in (0, 1) where the cubic's Y derivative vanishes.
fn find_cubic_y_extrema(a: f64, b: f64, c: f64, d: f64, roots: &mut [f64; 2]) -> usize {
    // derivative coefficients, folded by 3
    let na = d - a + 3.0 * (b - c);
    let nb = 2.0 * (a - b - b + c);
    let nc = b - a;
    find_unit_quad_roots(na, nb, nc, roots)
}

/// Split a cubic at each of `ts` (ascending), writing the pieces into
/// `dst` with shared endpoints (3 points of stride per piece).
fn chop_cubic_at_multi(src: &[Point], dst: &mut [Point; 10], ts: &[f64]) {
    if ts.is_empty() {
        dst[..4].copy_from_slice(&src[..4]);
        return;
    }

    let mut cur = [src[0], src[1], src[2], src[3]];
    let mut t_prev = 0.0;
    let mut out = 0;
    for &t in ts {
        // re-map t into the remaining curve
        let local = if t_prev < 1.0 { (t - t_prev) / (1.0 - t_prev) } else { 1.0 };
        let mut halves = [Point::ZERO; 7];
        chop_cubic_at(&cur, &mut halves, local);
        dst[out..out + 4].copy_from_slice(&halves[..4]);
        out += 3;
        cur = [halves[3], halves[4], halves[5], halves[6]];
        t_prev = t;
    }
    dst[out..out + 4].copy_from_slice(&cur);
}

/// Split a cubic at its interior Y extrema.
///
/// Returns `n` in {0, 1, 2}; `dst` holds `n + 1` monotone cubics
/// sharing endpoints (up to 10 points). Shared extrema have their
/// neighbor control Ys flattened.
pub fn chop_cubic_at_y_extrema(src: &[Point], dst: &mut [Point; 10]) -> usize {
    let mut ts = [0.0f64; 2];
    let n = find_cubic_y_extrema(src[0].y, src[1].y, src[2].y, src[3].y, &mut ts);

    chop_cubic_at_multi(src, dst, &ts[..n]);
    if n > 0 {
        dst[2].y = dst[3].y;
        dst[4].y = dst[3].y;
        if n == 2 {
            dst[5].y = dst[6].y;
            dst[7].y = dst[6].y;
        }
    }
    n
}

/// A rational quadratic with its weight.
#[derive(Debug, Clone, Copy)]
struct Conic {
    pts: [Point; 3],
    w: f64,
}

impl Conic {
    /// Split at t = 1/2 into two conics covering the same arc.
    fn chop(&self) -> (Conic, Conic) {
        let scale = 1.0 / (1.0 + self.w);
        let new_w = (0.5 + self.w * 0.5).sqrt();

        let p0 = self.pts[0];
        let p1 = self.pts[1];
        let p2 = self.pts[2];
        let wp1 = Point::new(self.w * p1.x, self.w * p1.y);

        let m01 = Point::new((p0.x + wp1.x) * scale, (p0.y + wp1.y) * scale);
        let m12 = Point::new((wp1.x + p2.x) * scale, (wp1.y + p2.y) * scale);
        let mid = Point::new(
            (p0.x + 2.0 * wp1.x + p2.x) * scale * 0.5,
            (p0.y + 2.0 * wp1.y + p2.y) * scale * 0.5,
        );

        (
            Conic { pts: [p0, m01, mid], w: new_w },
            Conic { pts: [mid, m12, p2], w: new_w },
        )
    }

    /// Subdivision count (as a power of two) keeping the quad
    /// approximation within `tol`.
    fn quad_pow2(&self, tol: f64) -> usize {
        if tol < 0.0 || !tol.is_finite() || !points_are_finite(&self.pts) {
            return 0;
        }
        let a = self.w - 1.0;
        let k = a / (4.0 * (2.0 + a));
        let x = k * (self.pts[0].x - 2.0 * self.pts[1].x + self.pts[2].x);
        let y = k * (self.pts[0].y - 2.0 * self.pts[1].y + self.pts[2].y);

        let mut error = (x * x + y * y).sqrt();
        let mut pow2 = 0;
        while pow2 < MAX_CONIC_TO_QUAD_POW2 {
            if error <= tol {
                break;
            }
            error *= 0.25;
            pow2 += 1;
        }
        pow2
    }
}

/// A conic approximated as `1 << pow2` quadratics sharing endpoints.
#[derive(Debug, Clone)]
pub struct ConicQuads {
    pts: Vec<Point>,
    count: usize,
}

impl ConicQuads {
    /// Approximate the conic `(pts, weight)` to within `tol`.
    pub fn compute(pts: &[Point], weight: f64, tol: f64) -> Self {
        let conic = Conic { pts: [pts[0], pts[1], pts[2]], w: weight };
        let pow2 = conic.quad_pow2(tol);
        let count = 1usize << pow2;

        let mut out = Vec::with_capacity(1 + 2 * count);
        out.push(conic.pts[0]);
        subdivide(conic, &mut out, pow2);
        debug_assert_eq!(out.len(), 1 + 2 * count);
        // anchor the tail exactly on the conic endpoint
        if let Some(last) = out.last_mut() {
            *last = pts[2];
        }

        ConicQuads { pts: out, count }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// The `i`th quadratic: three points at stride two.
    pub fn quad(&self, i: usize) -> &[Point] {
        &self.pts[i * 2..i * 2 + 3]
    }
}

fn subdivide(conic: Conic, out: &mut Vec<Point>, level: usize) {
    if level == 0 {
        out.push(conic.pts[1]);
        out.push(conic.pts[2]);
    } else {
        let (a, b) = conic.chop();
        subdivide(a, out, level - 1);
        subdivide(b, out, level - 1);
    }
}

/// Solve `quad_y(t) == y` for a Y-monotone quad, if a root lies in (0, 1).
pub fn chop_mono_quad_at_y(pts: &[Point], y: f64) -> Option<f64> {
    solve_mono_quad(pts[0].y, pts[1].y, pts[2].y, y)
}

/// Solve `quad_x(t) == x` for an X-sorted quad, if a root lies in (0, 1).
pub fn chop_mono_quad_at_x(pts: &[Point], x: f64) -> Option<f64> {
    solve_mono_quad(pts[0].x, pts[1].x, pts[2].x, x)
}

fn solve_mono_quad(c0: f64, c1: f64, c2: f64, target: f64) -> Option<f64> {
    let a = c0 - c1 - c1 + c2;
    let b = 2.0 * (c1 - c0);
    let c = c0 - target;

    let mut roots = [0.0f64; 2];
    let n = find_unit_quad_roots(a, b, c, &mut roots);
    if n > 0 {
        Some(roots[0])
    } else {
        None
    }
}

/// Bisect a Y-monotone cubic for the parameter hitting `y`.
pub fn chop_mono_cubic_at_y(pts: &[Point], y: f64) -> Option<f64> {
    bisect_mono_cubic(pts[0].y, pts[1].y, pts[2].y, pts[3].y, y)
}

/// Bisect an X-sorted cubic for the parameter hitting `x`.
pub fn chop_mono_cubic_at_x(pts: &[Point], x: f64) -> Option<f64> {
    bisect_mono_cubic(pts[0].x, pts[1].x, pts[2].x, pts[3].x, x)
}

fn eval_cubic(c0: f64, c1: f64, c2: f64, c3: f64, t: f64) -> f64 {
    let s = 1.0 - t;
    c0 * s * s * s + 3.0 * c1 * s * s * t + 3.0 * c2 * s * t * t + c3 * t * t * t
}

fn bisect_mono_cubic(c0: f64, c1: f64, c2: f64, c3: f64, target: f64) -> Option<f64> {
    let (lo_val, hi_val) = if c0 <= c3 { (c0, c3) } else { (c3, c0) };
    if target <= lo_val || target >= hi_val {
        return None;
    }

    let increasing = c0 <= c3;
    let mut lo = 0.0f64;
    let mut hi = 1.0f64;
    for _ in 0..40 {
        let mid = (lo + hi) * 0.5;
        let v = eval_cubic(c0, c1, c2, c3, mid);
        if (v < target) == increasing {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    Some((lo + hi) * 0.5)
}

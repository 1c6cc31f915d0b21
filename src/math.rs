//! Geometric math utilities.
//!
//! Point to segment distances, segment crossing parameters, and the
//! Hermite and quadratic evaluation helpers shared by the sampler, the
//! outliner and the shape-to-path reconstruction.

use crate::basics::PointD;

// ============================================================================
// Constants
// ============================================================================

/// Coinciding points maximal distance (epsilon).
pub const VERTEX_DIST_EPSILON: f64 = 1e-14;

/// Epsilon for intersection calculations.
pub const INTERSECTION_EPSILON: f64 = 1.0e-30;

// ============================================================================
// Distance calculations
// ============================================================================

/// Parameter `u` of the projection of `p` onto the segment `a`→`b`.
/// Returns 0 if the segment is degenerate.
#[inline]
pub fn calc_segment_point_u(a: PointD, b: PointD, p: PointD) -> f64 {
    let d = b - a;
    let l2 = d.sq_length();
    if l2 == 0.0 {
        return 0.0;
    }
    (p - a).dot(d) / l2
}

/// Squared distance from `p` to the closest point on segment `a`→`b`.
#[inline]
pub fn calc_segment_point_sq_distance(a: PointD, b: PointD, p: PointD) -> f64 {
    let u = calc_segment_point_u(a, b, p);
    if u <= 0.0 {
        (p - a).sq_length()
    } else if u >= 1.0 {
        (p - b).sq_length()
    } else {
        (p - a.lerp(b, u)).sq_length()
    }
}

// ============================================================================
// Intersection
// ============================================================================

/// Parameters `(t, u)` of the crossing of segments `a1`→`b1` and `a2`→`b2`
/// along each segment, or `None` when they are parallel.
#[inline]
pub fn calc_segment_params(a1: PointD, b1: PointD, a2: PointD, b2: PointD) -> Option<(f64, f64)> {
    let d1 = b1 - a1;
    let d2 = b2 - a2;
    let den = d1.cross(d2);
    if den.abs() < INTERSECTION_EPSILON || den.abs() < 1e-12 * d1.length() * d2.length() {
        return None;
    }
    let w = a2 - a1;
    Some((w.cross(d2) / den, w.cross(d1) / den))
}

// ============================================================================
// Curve evaluation
// ============================================================================

/// Point on the Hermite cubic from `s` (tangent `sd`) to `e` (tangent `ed`).
#[inline]
pub fn hermite_point(s: PointD, sd: PointD, e: PointD, ed: PointD, t: f64) -> PointD {
    let t2 = t * t;
    let t3 = t2 * t;
    s * (2.0 * t3 - 3.0 * t2 + 1.0)
        + sd * (t3 - 2.0 * t2 + t)
        + e * (-2.0 * t3 + 3.0 * t2)
        + ed * (t3 - t2)
}

/// First derivative of the Hermite cubic.
#[inline]
pub fn hermite_derivative(s: PointD, sd: PointD, e: PointD, ed: PointD, t: f64) -> PointD {
    let t2 = t * t;
    s * (6.0 * t2 - 6.0 * t)
        + sd * (3.0 * t2 - 4.0 * t + 1.0)
        + e * (-6.0 * t2 + 6.0 * t)
        + ed * (3.0 * t2 - 2.0 * t)
}

/// Second derivative of the Hermite cubic.
#[inline]
pub fn hermite_second_derivative(s: PointD, sd: PointD, e: PointD, ed: PointD, t: f64) -> PointD {
    s * (12.0 * t - 6.0) + sd * (6.0 * t - 4.0) + e * (-12.0 * t + 6.0) + ed * (6.0 * t - 2.0)
}

/// Point on the quadratic bezier `s`, control `c`, `e`.
#[inline]
pub fn quadratic_point(s: PointD, c: PointD, e: PointD, t: f64) -> PointD {
    let u = 1.0 - t;
    s * (u * u) + c * (2.0 * u * t) + e * (t * t)
}

/// First derivative of the quadratic bezier.
#[inline]
pub fn quadratic_derivative(s: PointD, c: PointD, e: PointD, t: f64) -> PointD {
    (c - s) * (2.0 * (1.0 - t)) + (e - c) * (2.0 * t)
}

// ============================================================================
// Tests
// ============================================================================

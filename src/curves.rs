//! Adaptive curve flattening.
//!
//! `CurveSampler` turns cubic, quadratic and arc pieces into polyline
//! points. Cubics (and quadratics, which are exact cubics after degree
//! elevation) are flattened by recursive halving in Hermite form; arcs are
//! stepped angularly. Every routine writes into a [`PointSink`], so plain
//! conversion, back-data conversion and offset conversion share one engine.
//!
//! The sink receives the *interior* points of a piece only; the caller adds
//! the piece's endpoint itself.

use log::trace;

use crate::arc::SvgArc;
use crate::basics::PointD;
use crate::math::{
    calc_segment_point_sq_distance, hermite_derivative, hermite_point, hermite_second_derivative,
    quadratic_derivative, quadratic_point,
};
use crate::polyline::BackData;

// ============================================================================
// Constants
// ============================================================================

/// Maximum halving depth of the cubic recursion. When it is reached the
/// current chord is accepted as is.
pub const CURVE_RECURSION_LIMIT: u32 = 16;

/// Default flattening tolerance.
pub const CURVE_DEFAULT_TOLERANCE: f64 = 0.25;

// ============================================================================
// PointSink
// ============================================================================

/// Receiver of sampled points.
pub trait PointSink {
    /// Accept one point, with its origin on the source path when tracked.
    fn emit(&mut self, p: PointD, back: Option<BackData>);
}

impl PointSink for Vec<PointD> {
    fn emit(&mut self, p: PointD, _back: Option<BackData>) {
        self.push(p);
    }
}

impl<S: PointSink + ?Sized> PointSink for &mut S {
    fn emit(&mut self, p: PointD, back: Option<BackData>) {
        (**self).emit(p, back);
    }
}

// ============================================================================
// CurvePiece
// ============================================================================

/// One parametric piece of a path: the closed set of segment kinds the
/// sampler, the outliner and the reconstruction code dispatch over.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CurvePiece {
    Line { s: PointD, e: PointD },
    /// Hermite cubic: start, start tangent, end, end tangent.
    Cubic { s: PointD, sd: PointD, e: PointD, ed: PointD },
    Quadratic { s: PointD, c: PointD, e: PointD },
    Arc(SvgArc),
}

impl CurvePiece {
    pub fn start(&self) -> PointD {
        match *self {
            CurvePiece::Line { s, .. } => s,
            CurvePiece::Cubic { s, .. } => s,
            CurvePiece::Quadratic { s, .. } => s,
            CurvePiece::Arc(ref a) => a.start(),
        }
    }

    pub fn end(&self) -> PointD {
        match *self {
            CurvePiece::Line { e, .. } => e,
            CurvePiece::Cubic { e, .. } => e,
            CurvePiece::Quadratic { e, .. } => e,
            CurvePiece::Arc(ref a) => a.end(),
        }
    }

    pub fn point_at(&self, t: f64) -> PointD {
        match *self {
            CurvePiece::Line { s, e } => s.lerp(e, t),
            CurvePiece::Cubic { s, sd, e, ed } => hermite_point(s, sd, e, ed, t),
            CurvePiece::Quadratic { s, c, e } => quadratic_point(s, c, e, t),
            CurvePiece::Arc(ref a) => a.point_at(t),
        }
    }

    pub fn derivative_at(&self, t: f64) -> PointD {
        match *self {
            CurvePiece::Line { s, e } => e - s,
            CurvePiece::Cubic { s, sd, e, ed } => hermite_derivative(s, sd, e, ed, t),
            CurvePiece::Quadratic { s, c, e } => quadratic_derivative(s, c, e, t),
            CurvePiece::Arc(ref a) => a.derivative_at(t),
        }
    }

    pub fn second_derivative_at(&self, t: f64) -> PointD {
        match *self {
            CurvePiece::Line { .. } => PointD::ZERO,
            CurvePiece::Cubic { s, sd, e, ed } => hermite_second_derivative(s, sd, e, ed, t),
            CurvePiece::Quadratic { s, c, e } => (s - c * 2.0 + e) * 2.0,
            CurvePiece::Arc(ref a) => a.second_derivative_at(t),
        }
    }

    /// Unit tangent at `t`, falling back to the chord direction where the
    /// derivative vanishes (cusps, collapsed control points).
    pub fn unit_tangent_at(&self, t: f64) -> PointD {
        let d = self.derivative_at(t);
        if d.length() > 1e-9 {
            return d.normalized();
        }
        // Step slightly inside the piece before giving up on the derivative.
        let h = if t < 0.5 { 1e-3 } else { -1e-3 };
        let d = self.point_at(t + h) - self.point_at(t);
        if d.length() > 1e-12 {
            return (if h > 0.0 { d } else { -d }).normalized();
        }
        (self.end() - self.start()).normalized()
    }

    /// Signed curvature at `t`; positive when the piece turns left.
    pub fn curvature_at(&self, t: f64) -> f64 {
        let d1 = self.derivative_at(t);
        let l = d1.length();
        if l < 1e-9 {
            return 0.0;
        }
        d1.cross(self.second_derivative_at(t)) / (l * l * l)
    }

    /// The same piece traversed backwards.
    pub fn reversed(&self) -> CurvePiece {
        match *self {
            CurvePiece::Line { s, e } => CurvePiece::Line { s: e, e: s },
            CurvePiece::Cubic { s, sd, e, ed } => CurvePiece::Cubic {
                s: e,
                sd: -ed,
                e: s,
                ed: -sd,
            },
            CurvePiece::Quadratic { s, c, e } => CurvePiece::Quadratic { s: e, c, e: s },
            CurvePiece::Arc(ref a) => CurvePiece::Arc(a.reversed()),
        }
    }

    /// The part between parameters `t0` and `t1` (reversed when `t1 < t0`).
    /// Cubics and quadratics come back as exact Hermite cubics.
    pub fn sub_piece(&self, t0: f64, t1: f64) -> CurvePiece {
        match *self {
            CurvePiece::Line { s, e } => CurvePiece::Line {
                s: s.lerp(e, t0),
                e: s.lerp(e, t1),
            },
            CurvePiece::Arc(ref a) => CurvePiece::Arc(a.sub_arc(t0, t1)),
            _ => {
                let k = t1 - t0;
                CurvePiece::Cubic {
                    s: self.point_at(t0),
                    sd: self.derivative_at(t0) * k,
                    e: self.point_at(t1),
                    ed: self.derivative_at(t1) * k,
                }
            }
        }
    }

    /// Emit the interior points of this piece through `sampler`.
    pub fn sample<S: PointSink>(&self, sampler: &CurveSampler, sink: &mut S, piece: Option<usize>) {
        match *self {
            CurvePiece::Line { s, e } => sampler.sample_line(sink, s, e, piece),
            CurvePiece::Cubic { s, sd, e, ed } => sampler.sample_cubic(sink, s, sd, e, ed, piece),
            CurvePiece::Quadratic { s, c, e } => sampler.sample_quadratic(sink, s, c, e, piece),
            CurvePiece::Arc(ref a) => sampler.sample_arc(sink, a, piece),
        }
    }
}

// ============================================================================
// CurveSampler
// ============================================================================

/// Recursive subdivision engine shared by every conversion mode.
#[derive(Debug, Clone, Copy)]
pub struct CurveSampler {
    tolerance: f64,
    max_length: f64,
    recursion_limit: u32,
    offset: f64,
}

impl CurveSampler {
    pub fn new(tolerance: f64) -> Self {
        let mut s = Self {
            tolerance: CURVE_DEFAULT_TOLERANCE,
            max_length: f64::INFINITY,
            recursion_limit: CURVE_RECURSION_LIMIT,
            offset: 0.0,
        };
        s.set_tolerance(tolerance);
        s
    }

    /// Maximum distance between the curve and its polyline.
    pub fn set_tolerance(&mut self, t: f64) {
        self.tolerance = if t.is_finite() && t > 0.0 {
            t
        } else {
            CURVE_DEFAULT_TOLERANCE
        };
    }
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Longest chord the sampler may emit; lines are split as well.
    pub fn set_max_length(&mut self, l: f64) {
        self.max_length = if l.is_finite() && l > 0.0 { l } else { f64::INFINITY };
    }
    pub fn max_length(&self) -> f64 {
        self.max_length
    }

    pub fn set_recursion_limit(&mut self, l: u32) {
        self.recursion_limit = l;
    }
    pub fn recursion_limit(&self) -> u32 {
        self.recursion_limit
    }

    /// Emit `P(t) + offset * N(t)` instead of `P(t)`, `N` being the unit
    /// left normal.
    pub fn set_offset(&mut self, o: f64) {
        self.offset = o;
    }
    pub fn offset(&self) -> f64 {
        self.offset
    }

    #[inline]
    fn emit<S: PointSink>(&self, sink: &mut S, p: PointD, tangent: PointD, t: f64, piece: Option<usize>) {
        let p = if self.offset != 0.0 {
            p + tangent.normalized().perp() * self.offset
        } else {
            p
        };
        sink.emit(
            p,
            piece.map(|piece| BackData {
                piece,
                t,
                offset: self.offset,
            }),
        );
    }

    /// Interior points of the straight line `s`→`e` (only when a maximum
    /// length forces splits).
    pub fn sample_line<S: PointSink>(&self, sink: &mut S, s: PointD, e: PointD, piece: Option<usize>) {
        let len = (e - s).length();
        if !self.max_length.is_finite() || len <= self.max_length {
            return;
        }
        let n = (len / self.max_length).ceil() as usize;
        let d = e - s;
        for i in 1..n {
            let t = i as f64 / n as f64;
            self.emit(sink, s.lerp(e, t), d, t, piece);
        }
    }

    /// Interior points of the Hermite cubic from `s` to `e`.
    pub fn sample_cubic<S: PointSink>(
        &self,
        sink: &mut S,
        s: PointD,
        sd: PointD,
        e: PointD,
        ed: PointD,
        piece: Option<usize>,
    ) {
        self.rec_cubic(sink, s, sd, e, ed, 0.0, 1.0, piece, self.recursion_limit);
    }

    /// Interior points of the quadratic bezier `s`, `c`, `e`.
    pub fn sample_quadratic<S: PointSink>(
        &self,
        sink: &mut S,
        s: PointD,
        c: PointD,
        e: PointD,
        piece: Option<usize>,
    ) {
        // A quadratic is the Hermite cubic with these tangents.
        let sd = (c - s) * 2.0;
        let ed = (e - c) * 2.0;
        self.rec_cubic(sink, s, sd, e, ed, 0.0, 1.0, piece, self.recursion_limit);
    }

    #[allow(clippy::too_many_arguments)]
    fn rec_cubic<S: PointSink>(
        &self,
        sink: &mut S,
        s: PointD,
        sd: PointD,
        e: PointD,
        ed: PointD,
        st: f64,
        et: f64,
        piece: Option<usize>,
        lev: u32,
    ) {
        // Bezier control points of this span; the curve stays in their hull.
        let c1 = s + sd * (1.0 / 3.0);
        let c2 = e - ed * (1.0 / 3.0);
        let tol2 = self.tolerance * self.tolerance;
        let flat = calc_segment_point_sq_distance(s, e, c1) <= tol2
            && calc_segment_point_sq_distance(s, e, c2) <= tol2
            && (e - s).length() <= self.max_length;
        if flat {
            return;
        }
        if lev == 0 {
            trace!("cubic recursion limit reached between t={st} and t={et}");
            return;
        }

        let m = (s + e) * 0.5 + (sd - ed) * 0.125;
        let md = (e - s) * 0.75 - (sd + ed) * 0.125;
        let hsd = sd * 0.5;
        let hed = ed * 0.5;
        let mt = (st + et) * 0.5;

        self.rec_cubic(sink, s, hsd, m, md, st, mt, piece, lev - 1);
        self.emit(sink, m, md, mt, piece);
        self.rec_cubic(sink, m, md, e, hed, mt, et, piece, lev - 1);
    }

    /// Interior points of an elliptical arc, stepped angularly so that no
    /// chord deviates more than the tolerance.
    pub fn sample_arc<S: PointSink>(&self, sink: &mut S, arc: &SvgArc, piece: Option<usize>) {
        if arc.is_degenerate() {
            self.sample_line(sink, arc.start(), arc.end(), piece);
            return;
        }
        let sweep = arc.sweep_angle().abs();
        let mut n = (sweep / arc.angle_step(self.tolerance)).ceil().max(1.0);
        if self.max_length.is_finite() {
            let (rx, ry) = arc.radii();
            let chord = rx.max(ry) * sweep / n;
            if chord > self.max_length {
                n = (n * chord / self.max_length).ceil();
            }
        }
        let n = n as usize;
        for i in 1..n {
            let t = i as f64 / n as f64;
            self.emit(sink, arc.point_at(t), arc.derivative_at(t), t, piece);
        }
    }
}

impl Default for CurveSampler {
    fn default() -> Self {
        Self::new(CURVE_DEFAULT_TOLERANCE)
    }
}

// ============================================================================
// Tests
// ============================================================================

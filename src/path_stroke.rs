//! Stroking: the filled region swept by a pen of a given width along the
//! path's polyline.
//!
//! The raw stroke shape is a set of positively oriented loops, one per
//! segment body, outer join wedge and cap. Their nonzero union is exactly
//! the stroke, so `stroke_to_shape` only has to resolve it once.

use log::debug;

use crate::basics::{ButtType, FillRule, JoinType, PointD};
use crate::dash::DashPattern;
use crate::math::VERTEX_DIST_EPSILON;
use crate::math_stroke::{JoinShape, MathStroke};
use crate::path::Path;
use crate::polyline::{Polyline, PolylinePoint};
use crate::shape::Shape;

// ============================================================================
// StrokeStyle
// ============================================================================

/// Pen description shared by stroking and outlining.
#[derive(Debug, Clone, PartialEq)]
pub struct StrokeStyle {
    width: f64,
    join: JoinType,
    butt: ButtType,
    miter_limit: f64,
    tolerance: f64,
    dash: Option<DashPattern>,
}

impl StrokeStyle {
    pub fn new(width: f64) -> Self {
        Self {
            width: width.abs(),
            ..Self::default()
        }
    }

    pub fn set_width(&mut self, w: f64) {
        self.width = w.abs();
    }
    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn set_join(&mut self, j: JoinType) {
        self.join = j;
    }
    pub fn join(&self) -> JoinType {
        self.join
    }

    pub fn set_butt(&mut self, b: ButtType) {
        self.butt = b;
    }
    pub fn butt(&self) -> ButtType {
        self.butt
    }

    pub fn set_miter_limit(&mut self, ml: f64) {
        self.miter_limit = ml;
    }
    pub fn miter_limit(&self) -> f64 {
        self.miter_limit
    }

    /// Flattening tolerance of round joins, caps and outline curves.
    pub fn set_tolerance(&mut self, t: f64) {
        self.tolerance = t;
    }
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn set_dash(&mut self, dash: Option<DashPattern>) {
        self.dash = dash;
    }
    pub fn dash(&self) -> Option<&DashPattern> {
        self.dash.as_ref()
    }

    pub(crate) fn math(&self) -> MathStroke {
        let mut ms = MathStroke::new();
        ms.set_width(self.width);
        ms.set_join(self.join);
        ms.set_butt(self.butt);
        ms.set_miter_limit(self.miter_limit);
        ms.set_tolerance(self.tolerance);
        ms
    }
}

impl Default for StrokeStyle {
    fn default() -> Self {
        Self {
            width: 1.0,
            join: JoinType::Miter,
            butt: ButtType::Butt,
            miter_limit: 4.0,
            tolerance: 0.25,
            dash: None,
        }
    }
}

// ============================================================================
// Stroker
// ============================================================================

struct Stroker<'a> {
    ms: MathStroke,
    dest: &'a mut Shape,
    buf: Vec<PointD>,
}

impl Stroker<'_> {
    fn add_loop(&mut self, pts: &[PointD]) {
        if pts.len() < 3 {
            return;
        }
        let first = self.dest.add_point(pts[0]);
        let mut prev = first;
        for &q in &pts[1..] {
            let v = self.dest.add_point(q);
            self.dest.add_edge(prev, v);
            prev = v;
        }
        self.dest.add_edge(prev, first);
    }

    /// Rectangle swept along `a`→`b`.
    fn do_segment(&mut self, a: PointD, b: PointD) {
        let n = (b - a).normalized().perp() * self.ms.half_width();
        self.add_loop(&[a - n, b - n, b + n, a + n]);
    }

    /// Outer wedge at `v` between incoming direction `d1` and outgoing `d2`.
    fn do_join(&mut self, v: PointD, d1: PointD, d2: PointD) {
        let hw = self.ms.half_width();
        let cross = d1.cross(d2);
        if cross.abs() <= 1e-12 && d1.dot(d2) > 0.0 {
            return;
        }
        let left_turn = cross > 0.0;
        // Offsets on the outer side, in counter-clockwise order.
        let (u1, u2) = if left_turn {
            (-d1.perp() * hw, -d2.perp() * hw)
        } else {
            (d2.perp() * hw, d1.perp() * hw)
        };
        let (o1, o2) = if left_turn {
            (u1, u2)
        } else {
            (d1.perp() * hw, d2.perp() * hw)
        };
        self.buf.clear();
        self.buf.push(v);
        self.buf.push(v + u1);
        match self.ms.calc_join(v, o1, o2) {
            JoinShape::Bevel => {}
            JoinShape::Miter(m) => self.buf.push(m),
            JoinShape::Clipped(p1, p2) => {
                if left_turn {
                    self.buf.extend([p1, p2]);
                } else {
                    self.buf.extend([p2, p1]);
                }
            }
            JoinShape::Round => {
                let mut arc = Vec::new();
                self.ms.calc_arc(&mut arc, v, u1, u2, true);
                self.buf.extend(arc);
            }
        }
        self.buf.push(v + u2);
        let pts = std::mem::take(&mut self.buf);
        self.add_loop(&pts);
        self.buf = pts;
    }

    /// Cap at `p`, `d` pointing away from the path.
    fn do_butt(&mut self, p: PointD, d: PointD) {
        if self.ms.butt() == ButtType::Butt {
            return;
        }
        let n = d.perp() * self.ms.half_width();
        self.buf.clear();
        self.buf.push(p);
        self.buf.push(p - n);
        let mut cap = Vec::new();
        self.ms.calc_cap(&mut cap, p, d);
        self.buf.extend(cap);
        self.buf.push(p + n);
        let pts = std::mem::take(&mut self.buf);
        self.add_loop(&pts);
        self.buf = pts;
    }

    /// Dot drawn for a zero-length subpath.
    fn do_dot(&mut self, p: PointD) {
        let hw = self.ms.half_width();
        match self.ms.butt() {
            ButtType::Butt => {}
            ButtType::Square => self.add_loop(&[
                p + PointD::new(-hw, -hw),
                p + PointD::new(hw, -hw),
                p + PointD::new(hw, hw),
                p + PointD::new(-hw, hw),
            ]),
            ButtType::Round => {
                let mut pts = vec![p + PointD::new(hw, 0.0)];
                self.ms.calc_arc(&mut pts, p, PointD::new(hw, 0.0), PointD::new(-hw, 0.0), true);
                pts.push(p + PointD::new(-hw, 0.0));
                self.ms.calc_arc(&mut pts, p, PointD::new(-hw, 0.0), PointD::new(hw, 0.0), true);
                self.add_loop(&pts);
            }
        }
    }

    fn stroke_subpath(&mut self, pts: &[PolylinePoint], do_close: bool) {
        let mut v: Vec<PointD> = Vec::with_capacity(pts.len());
        for pt in pts {
            if v.last().map_or(true, |l: &PointD| l.distance(pt.p) > VERTEX_DIST_EPSILON) {
                v.push(pt.p);
            }
        }
        let mut closed = do_close;
        if v.len() > 2 && v[0].distance(v[v.len() - 1]) <= VERTEX_DIST_EPSILON {
            v.pop();
            closed = true;
        }
        match v.len() {
            0 => return,
            1 => {
                self.do_dot(v[0]);
                return;
            }
            2 => closed = false,
            _ => {}
        }
        let n = v.len();
        let seg_count = if closed { n } else { n - 1 };
        for i in 0..seg_count {
            self.do_segment(v[i], v[(i + 1) % n]);
        }
        let dir = |i: usize| (v[(i + 1) % n] - v[i]).normalized();
        let joins = if closed { 0..n } else { 1..n - 1 };
        for i in joins {
            let prev = (i + n - 1) % n;
            self.do_join(v[i], dir(prev), dir(i));
        }
        if !closed {
            self.do_butt(v[0], -dir(0));
            self.do_butt(v[n - 1], dir(n - 2));
        }
    }
}

impl Path {
    /// Add the raw stroke of the current polyline to `dest`. Subpaths whose
    /// polyline returns to its start, and every subpath when `do_close` is
    /// set, are stroked as closed loops. When the style carries a dash
    /// pattern only its "on" pieces are stroked.
    pub fn stroke(&self, dest: &mut Shape, do_close: bool, style: &StrokeStyle) {
        if style.width() <= 0.0 {
            return;
        }
        let dashed: Option<Polyline> = style.dash().map(|d| d.dash_polyline(self.polyline()));
        let polyline = dashed.as_ref().unwrap_or_else(|| self.polyline());
        let do_close = do_close && dashed.is_none();
        let mut stroker = Stroker {
            ms: style.math(),
            dest,
            buf: Vec::new(),
        };
        let pts = polyline.points();
        for (s, e) in polyline.subpaths() {
            stroker.stroke_subpath(&pts[s..e], do_close);
        }
        debug!(
            "stroked {} polyline points into {} raw edges",
            pts.len(),
            stroker.dest.number_of_edges()
        );
    }

    /// Clean polygon of the stroke.
    pub fn stroke_to_shape(&self, do_close: bool, style: &StrokeStyle) -> Shape {
        let mut raw = Shape::new();
        self.stroke(&mut raw, do_close, style);
        Shape::convert_to_shape(&raw, FillRule::NonZero)
    }
}

// ============================================================================
// Tests
// ============================================================================

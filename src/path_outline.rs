//! Outlining: the offset curves on either side of a path, written back as
//! path commands instead of a flattened shape.
//!
//! Each side is offset at half the pen width. Straight pieces stay lines,
//! circular arcs become concentric arcs, and every other piece is replaced
//! by Hermite cubics fitted to the exact offset curve by recursive halving.
//! Joins follow the pen's join type on the outer side of a turn; on the
//! inner side the offset passes through the vertex itself, which leaves
//! small loops that the nonzero fill rule absorbs once both sides are
//! filled together.

use log::{debug, trace};

use crate::basics::{ButtType, PointD};
use crate::curves::CurvePiece;
use crate::math::hermite_point;
use crate::math_stroke::{JoinShape, MathStroke};
use crate::path::Path;
use crate::path_stroke::StrokeStyle;

/// Maximum halving depth when fitting offset cubics.
pub const OUTLINE_RECURSION_LIMIT: u32 = 8;

/// Which offset loops to emit for each subpath.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Sides {
    Both,
    Outside,
    Inside,
}

// ============================================================================
// Outliner
// ============================================================================

struct Outliner<'a> {
    dest: &'a mut Path,
    ms: MathStroke,
    /// Signed offset along the left normal; the right side is walked.
    offset: f64,
    tolerance: f64,
    last: PointD,
}

impl<'a> Outliner<'a> {
    fn new(dest: &'a mut Path, style: &StrokeStyle) -> Self {
        let ms = style.math();
        let offset = -ms.half_width();
        let tolerance = if style.tolerance() > 0.0 { style.tolerance() } else { 0.25 };
        Self {
            dest,
            ms,
            offset,
            tolerance,
            last: PointD::ZERO,
        }
    }

    fn hw(&self) -> f64 {
        self.ms.half_width()
    }

    /// Point on the walked side of `p` for direction `t`.
    fn side_point(&self, p: PointD, t: PointD) -> PointD {
        p + t.perp() * self.offset
    }

    fn move_to(&mut self, p: PointD) {
        self.dest.move_to(p);
        self.last = p;
    }

    fn line_to(&mut self, p: PointD) {
        if p.distance(self.last) > 1e-12 {
            self.dest.line_to(p);
            self.last = p;
        }
    }

    fn arc_to(&mut self, p: PointD, r: f64, angle: f64, large: bool, sweep: bool) {
        if p.distance(self.last) > 1e-12 {
            self.dest.arc_to(p, r, r, angle, large, sweep);
            self.last = p;
        }
    }

    fn cubic_to(&mut self, p: PointD, sd: PointD, ed: PointD) {
        self.dest.cubic_to(p, sd, ed);
        self.last = p;
    }

    // ---------------------------------------------------------------
    // Pieces
    // ---------------------------------------------------------------

    /// Offset of `pc` at `t` and the derivative of that offset curve.
    fn offset_at(&self, pc: &CurvePiece, t: f64) -> (PointD, PointD) {
        let p = pc.point_at(t);
        let n = pc.unit_tangent_at(t).perp();
        let k = (1.0 - self.offset * pc.curvature_at(t)).max(0.0);
        (p + n * self.offset, pc.derivative_at(t) * k)
    }

    fn offset_piece(&mut self, pc: &CurvePiece) {
        match *pc {
            CurvePiece::Line { s, e } => {
                let d = (e - s).normalized();
                let q = self.side_point(e, d);
                self.line_to(q);
            }
            CurvePiece::Arc(ref a) if !a.is_degenerate() => {
                let (rx, ry) = a.radii();
                if (rx - ry).abs() > 1e-9 * rx.max(ry) {
                    self.offset_curve(pc, 0.0, 1.0, 0);
                    return;
                }
                // Concentric circle: the left normal points at the center
                // when the arc turns counter-clockwise.
                let ccw = a.sweep_angle() > 0.0;
                let r = if ccw { rx - self.offset } else { rx + self.offset };
                let q = self.side_point(a.end(), pc.unit_tangent_at(1.0));
                if r <= 1e-9 {
                    trace!("outline arc collapsed to a point, replaced by a line");
                    self.line_to(q);
                    return;
                }
                let (large, sweep) = a.flags();
                self.arc_to(q, r, a.rotation_degrees(), large, sweep);
            }
            _ => self.offset_curve(pc, 0.0, 1.0, 0),
        }
    }

    fn offset_curve(&mut self, pc: &CurvePiece, t0: f64, t1: f64, depth: u32) {
        let (p0, d0) = self.offset_at(pc, t0);
        let (p1, d1) = self.offset_at(pc, t1);
        let k = t1 - t0;
        let (sd, ed) = (d0 * k, d1 * k);
        let err = [0.25, 0.5, 0.75]
            .iter()
            .map(|&u| {
                let exact = self.offset_at(pc, t0 + k * u).0;
                hermite_point(p0, sd, p1, ed, u).distance(exact)
            })
            .fold(0.0, f64::max);
        if err <= self.tolerance {
            self.cubic_to(p1, sd, ed);
            return;
        }
        if depth >= OUTLINE_RECURSION_LIMIT {
            trace!("offset cubic recursion limit reached, error {:.3e}", err);
            self.cubic_to(p1, sd, ed);
            return;
        }
        let tm = (t0 + t1) * 0.5;
        self.offset_curve(pc, t0, tm, depth + 1);
        self.offset_curve(pc, tm, t1, depth + 1);
    }

    // ---------------------------------------------------------------
    // Joins and caps
    // ---------------------------------------------------------------

    /// Connect the offset of the incoming direction `t1` to the offset of
    /// the outgoing direction `t2` around vertex `v`.
    fn join(&mut self, v: PointD, t1: PointD, t2: PointD) {
        let u1 = t1.perp() * self.offset;
        let u2 = t2.perp() * self.offset;
        let next = v + u2;
        let turn = t1.cross(t2);
        if turn.abs() <= 1e-9 && t1.dot(t2) > 0.0 {
            self.line_to(next);
            return;
        }
        if turn < 0.0 {
            // Inner side of a right turn.
            self.line_to(v);
            self.line_to(next);
            return;
        }
        match self.ms.calc_join(v, u1, u2) {
            JoinShape::Bevel => self.line_to(next),
            JoinShape::Miter(m) => {
                self.line_to(m);
                self.line_to(next);
            }
            JoinShape::Clipped(a, b) => {
                self.line_to(a);
                self.line_to(b);
                self.line_to(next);
            }
            JoinShape::Round => {
                let hw = self.hw();
                self.arc_to(next, hw, 0.0, false, true);
            }
        }
    }

    /// Turn around the path end `p`, `d` pointing away from the path. The
    /// walk arrives on the right of `d` and leaves on its left.
    fn cap(&mut self, p: PointD, d: PointD) {
        let hw = self.hw();
        let left = p + d.perp() * hw;
        match self.ms.butt() {
            ButtType::Butt => self.line_to(left),
            ButtType::Square => {
                let mut pts = Vec::with_capacity(2);
                self.ms.calc_cap(&mut pts, p, d);
                for q in pts {
                    self.line_to(q);
                }
                self.line_to(left);
            }
            ButtType::Round => self.arc_to(left, hw, 0.0, false, true),
        }
    }

    /// Offset every piece of a chain, joining consecutive pieces. The walk
    /// must already stand at the offset start of the first piece.
    fn chain(&mut self, pieces: &[CurvePiece]) {
        for (k, pc) in pieces.iter().enumerate() {
            if k > 0 {
                let prev = &pieces[k - 1];
                self.join(pc.start(), prev.unit_tangent_at(1.0), pc.unit_tangent_at(0.0));
            }
            self.offset_piece(pc);
        }
    }

    /// One closed offset loop around a closed chain.
    fn closed_loop(&mut self, pieces: &[CurvePiece]) {
        let (first, last) = match (pieces.first(), pieces.last()) {
            (Some(f), Some(l)) => (*f, *l),
            _ => return,
        };
        let start = self.side_point(first.start(), first.unit_tangent_at(0.0));
        self.move_to(start);
        self.chain(pieces);
        self.join(first.start(), last.unit_tangent_at(1.0), first.unit_tangent_at(0.0));
        // close() only fails without an open subpath.
        let _ = self.dest.close();
    }

    fn subpath(&mut self, pieces: &[CurvePiece], closed: bool, sides: Sides) {
        let (first, last) = match (pieces.first(), pieces.last()) {
            (Some(f), Some(l)) => (*f, *l),
            _ => return,
        };
        let reversed: Vec<CurvePiece> = pieces.iter().rev().map(|pc| pc.reversed()).collect();
        if closed {
            if sides != Sides::Inside {
                self.closed_loop(pieces);
            }
            if sides != Sides::Outside {
                self.closed_loop(&reversed);
            }
            return;
        }
        match sides {
            Sides::Both => {
                let start = self.side_point(first.start(), first.unit_tangent_at(0.0));
                self.move_to(start);
                self.chain(pieces);
                self.cap(last.end(), last.unit_tangent_at(1.0));
                self.chain(&reversed);
                self.cap(first.start(), -first.unit_tangent_at(0.0));
                let _ = self.dest.close();
            }
            Sides::Outside => {
                let start = self.side_point(first.start(), first.unit_tangent_at(0.0));
                self.move_to(start);
                self.chain(pieces);
            }
            Sides::Inside => {
                let start = self.side_point(last.end(), -last.unit_tangent_at(1.0));
                self.move_to(start);
                self.chain(&reversed);
            }
        }
    }
}

// ============================================================================
// Path entry points
// ============================================================================

impl Path {
    /// Replace `dest` with the closed outline of the pen swept along this
    /// path: both offset sides plus caps for open subpaths. Filled with the
    /// nonzero rule it covers the same region as the stroke.
    pub fn outline(&self, dest: &mut Path, style: &StrokeStyle) {
        self.outline_sides(dest, style, Sides::Both);
    }

    /// Offset on the right of the direction of travel only, which is the
    /// outside of a counter-clockwise contour.
    pub fn outside_outline(&self, dest: &mut Path, style: &StrokeStyle) {
        self.outline_sides(dest, style, Sides::Outside);
    }

    /// Offset on the left of the direction of travel, walked backwards.
    ///
    /// Inner joins pass through the path's own vertices, so at every
    /// convex corner of a counter-clockwise contour this loop keeps a small
    /// piece with the opposite winding. Filled alone it covers the inset
    /// region plus those corner pieces; fill it together with
    /// `outside_outline` (or use `outline`) to get the pen band, and
    /// subtract the band from the path's own fill to get the true inset.
    pub fn inside_outline(&self, dest: &mut Path, style: &StrokeStyle) {
        self.outline_sides(dest, style, Sides::Inside);
    }

    fn outline_sides(&self, dest: &mut Path, style: &StrokeStyle, sides: Sides) {
        dest.reset();
        if style.width() <= 0.0 {
            return;
        }
        let subpaths = self.subpath_pieces();
        let mut outliner = Outliner::new(dest, style);
        for sp in &subpaths {
            let pieces: Vec<CurvePiece> = sp.pieces.iter().map(|(_, pc)| *pc).collect();
            if pieces.is_empty() {
                trace!("outline skips a subpath without length at {:?}", sp.start);
                continue;
            }
            outliner.subpath(&pieces, sp.closed, sides);
        }
        debug!(
            "outlined {} subpaths into {} commands",
            subpaths.len(),
            outliner.dest.descr_count()
        );
    }
}

// ============================================================================
// Tests
// ============================================================================

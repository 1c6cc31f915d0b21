//! Cap, join and miter calculations shared by stroking and
//! outlining.
//!
//! Offsets are given as vectors from the path vertex to the offset point
//! (length = half the stroke width). Arcs are sampled with the angular step
//! that keeps the chord deviation under the stroke tolerance.

use crate::basics::{ButtType, JoinType, PointD, PI};

/// Geometry of an outer join between the offset points `v + u1` and
/// `v + u2`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum JoinShape {
    /// Straight connection.
    Bevel,
    /// Through the intersection of the two offset lines.
    Miter(PointD),
    /// Miter cut at the limit distance: two points, the first on the
    /// incoming side.
    Clipped(PointD, PointD),
    /// Circular arc around the vertex.
    Round,
}

// ============================================================================
// MathStroke
// ============================================================================

/// Join and cap geometry calculator.
#[derive(Debug, Clone, Copy)]
pub struct MathStroke {
    half_width: f64,
    miter_limit: f64,
    tolerance: f64,
    join: JoinType,
    butt: ButtType,
}

impl MathStroke {
    pub fn new() -> Self {
        Self {
            half_width: 0.5,
            miter_limit: 4.0,
            tolerance: 0.25,
            join: JoinType::Miter,
            butt: ButtType::Butt,
        }
    }

    pub fn set_width(&mut self, w: f64) {
        self.half_width = w.abs() * 0.5;
    }
    pub fn width(&self) -> f64 {
        self.half_width * 2.0
    }
    pub fn half_width(&self) -> f64 {
        self.half_width
    }

    /// Ratio of miter length to stroke width above which the miter is
    /// replaced by the join's fallback.
    pub fn set_miter_limit(&mut self, ml: f64) {
        self.miter_limit = ml.max(1.0);
    }
    pub fn miter_limit(&self) -> f64 {
        self.miter_limit
    }

    pub fn set_tolerance(&mut self, t: f64) {
        if t.is_finite() && t > 0.0 {
            self.tolerance = t;
        }
    }
    pub fn tolerance(&self) -> f64 {
        self.tolerance
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

    /// Angular step of round joins and caps.
    pub fn arc_step(&self) -> f64 {
        let r = self.half_width;
        if self.tolerance >= r {
            return PI / 2.0;
        }
        (2.0 * (1.0 - self.tolerance / r).acos()).clamp(1e-3, PI / 2.0)
    }

    /// Points strictly between `c + u1` and `c + u2` on the circle of radius
    /// `|u1|` around `c`, turning counter-clockwise when `ccw` is set.
    pub fn calc_arc(&self, out: &mut Vec<PointD>, c: PointD, u1: PointD, u2: PointD, ccw: bool) {
        let r = u1.length();
        let a1 = u1.y.atan2(u1.x);
        let mut a2 = u2.y.atan2(u2.x);
        if ccw {
            if a2 <= a1 {
                a2 += 2.0 * PI;
            }
        } else if a2 >= a1 {
            a2 -= 2.0 * PI;
        }
        let sweep = a2 - a1;
        let n = (sweep.abs() / self.arc_step()).ceil().max(1.0) as usize;
        for i in 1..n {
            let a = a1 + sweep * i as f64 / n as f64;
            out.push(PointD::new(c.x + r * a.cos(), c.y + r * a.sin()));
        }
    }

    /// Outer join at `v` between the offset vectors `u1` (incoming side) and
    /// `u2` (outgoing side).
    pub fn calc_join(&self, v: PointD, u1: PointD, u2: PointD) -> JoinShape {
        let hw = self.half_width;
        let s = u1 + u2;
        let sl = s.length();
        if sl <= 1e-9 * hw {
            // Half turn: the offset lines are parallel.
            return match self.join {
                JoinType::Round | JoinType::Reflected => JoinShape::Round,
                _ => JoinShape::Bevel,
            };
        }
        let ratio = 2.0 * hw / sl;
        let miter = v + s * (2.0 * hw * hw / (sl * sl));
        let within = ratio <= self.miter_limit;
        match self.join {
            JoinType::Bevel => JoinShape::Bevel,
            JoinType::Round => JoinShape::Round,
            JoinType::Miter => {
                if within {
                    JoinShape::Miter(miter)
                } else {
                    JoinShape::Bevel
                }
            }
            JoinType::Reflected => {
                if within {
                    JoinShape::Miter(miter)
                } else {
                    JoinShape::Round
                }
            }
            JoinType::Extrapolated => {
                if within {
                    return JoinShape::Miter(miter);
                }
                let dbevel = sl * 0.5;
                let lim = hw * self.miter_limit;
                let di = hw * ratio;
                if lim <= dbevel {
                    return JoinShape::Bevel;
                }
                let k = (lim - dbevel) / (di - dbevel);
                let x1 = v + u1;
                let x2 = v + u2;
                JoinShape::Clipped(x1 + (miter - x1) * k, x2 + (miter - x2) * k)
            }
        }
    }

    /// Points strictly between `p - perp(d) * hw` and `p + perp(d) * hw`
    /// going counter-clockwise around `p + d * hw`, `d` being the unit
    /// direction pointing away from the path.
    pub fn calc_cap(&self, out: &mut Vec<PointD>, p: PointD, d: PointD) {
        let hw = self.half_width;
        let n = d.perp() * hw;
        match self.butt {
            ButtType::Butt => {}
            ButtType::Square => {
                out.push(p - n + d * hw);
                out.push(p + n + d * hw);
            }
            ButtType::Round => self.calc_arc(out, p, -n, n, true),
        }
    }
}

impl Default for MathStroke {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64) -> PointD {
        PointD::new(x, y)
    }

    #[test]
    fn test_defaults() {
        let ms = MathStroke::new();
        assert!((ms.width() - 1.0).abs() < 1e-10);
        assert_eq!(ms.butt(), ButtType::Butt);
        assert_eq!(ms.join(), JoinType::Miter);
        assert!((ms.miter_limit() - 4.0).abs() < 1e-10);
    }

    #[test]
    fn test_width_setter() {
        let mut ms = MathStroke::new();
        ms.set_width(2.0);
        assert!((ms.width() - 2.0).abs() < 1e-10);
        ms.set_width(-3.0);
        assert!((ms.half_width() - 1.5).abs() < 1e-10);
    }

    #[test]
    fn test_right_angle_miter() {
        let mut ms = MathStroke::new();
        ms.set_width(2.0);
        // Offsets of a left turn at the origin, on the outer (right) side.
        match ms.calc_join(p(0.0, 0.0), p(0.0, -1.0), p(1.0, 0.0)) {
            JoinShape::Miter(m) => assert!(m.distance(p(1.0, -1.0)) < 1e-12),
            j => panic!("unexpected {:?}", j),
        }
    }

    #[test]
    fn test_miter_limit_fallbacks() {
        let mut ms = MathStroke::new();
        ms.set_width(2.0);
        ms.set_miter_limit(1.2);
        let (v, u1, u2) = (p(0.0, 0.0), p(0.0, -1.0), p(1.0, 0.0));
        assert_eq!(ms.calc_join(v, u1, u2), JoinShape::Bevel);
        ms.set_join(JoinType::Reflected);
        assert_eq!(ms.calc_join(v, u1, u2), JoinShape::Round);
        ms.set_join(JoinType::Extrapolated);
        match ms.calc_join(v, u1, u2) {
            JoinShape::Clipped(a, b) => {
                // Both points sit at the limit distance along the bisector.
                let bis = p(1.0, -1.0).normalized();
                assert!((a.dot(bis) - 1.2).abs() < 1e-9);
                assert!((b.dot(bis) - 1.2).abs() < 1e-9);
            }
            j => panic!("unexpected {:?}", j),
        }
    }

    #[test]
    fn test_arc_points_on_circle() {
        let mut ms = MathStroke::new();
        ms.set_width(20.0);
        ms.set_tolerance(0.01);
        let mut out = Vec::new();
        ms.calc_arc(&mut out, p(1.0, 1.0), p(10.0, 0.0), p(0.0, 10.0), true);
        assert!(!out.is_empty());
        for q in &out {
            assert!(((*q - p(1.0, 1.0)).length() - 10.0).abs() < 1e-9);
            assert!(q.x > 1.0 && q.y > 1.0);
        }
        let mut cw = Vec::new();
        ms.calc_arc(&mut cw, p(1.0, 1.0), p(10.0, 0.0), p(0.0, 10.0), false);
        assert!(cw.len() > out.len());
    }

    #[test]
    fn test_caps() {
        let mut ms = MathStroke::new();
        ms.set_width(2.0);
        let mut out = Vec::new();
        ms.calc_cap(&mut out, p(0.0, 0.0), p(1.0, 0.0));
        assert!(out.is_empty());
        ms.set_butt(ButtType::Square);
        ms.calc_cap(&mut out, p(0.0, 0.0), p(1.0, 0.0));
        assert_eq!(out, vec![p(1.0, -1.0), p(1.0, 1.0)]);
        out.clear();
        ms.set_butt(ButtType::Round);
        ms.calc_cap(&mut out, p(0.0, 0.0), p(1.0, 0.0));
        assert!(out.iter().all(|q| q.x > 0.0 && (q.length() - 1.0).abs() < 1e-9));
    }
}

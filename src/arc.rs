//! Elliptical arcs in SVG endpoint form.
//!
//! An `ArcTo` command only stores its endpoint, radii, x-axis rotation and
//! the large-arc / sweep flags. `SvgArc` recovers the center
//! parameterization so the arc can be evaluated at any parameter `t` in
//! `[0, 1]`, which is what the sampler, the outliner and the shape-to-path
//! reconstruction need.

use crate::basics::{deg2rad, rad2deg, PointD, PI};

/// Radii below this are treated as a straight line.
const ARC_RADIUS_EPSILON: f64 = 1e-10;

/// Center parameterization of an SVG endpoint arc.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SvgArc {
    start: PointD,
    end: PointD,
    center: PointD,
    rx: f64,
    ry: f64,
    /// x-axis rotation in radians.
    rotation: f64,
    start_angle: f64,
    sweep_angle: f64,
    degenerate: bool,
}

impl SvgArc {
    /// Build the arc from `start` to `end`. `angle` is the x-axis rotation
    /// in degrees. `sweep == true` makes the parametric angle increase.
    ///
    /// Radii too small to span the endpoints are scaled up uniformly; zero
    /// radii or coincident endpoints make the arc degenerate (a line).
    pub fn new(start: PointD, end: PointD, rx: f64, ry: f64, angle: f64, large: bool, sweep: bool) -> Self {
        let mut arc = Self {
            start,
            end,
            center: start.lerp(end, 0.5),
            rx: rx.abs(),
            ry: ry.abs(),
            rotation: deg2rad(angle),
            start_angle: 0.0,
            sweep_angle: 0.0,
            degenerate: true,
        };
        if arc.rx < ARC_RADIUS_EPSILON
            || arc.ry < ARC_RADIUS_EPSILON
            || (end - start).length() < ARC_RADIUS_EPSILON
            || !start.is_finite()
            || !end.is_finite()
        {
            return arc;
        }

        let mut rx = arc.rx;
        let mut ry = arc.ry;

        // Midpoint, rotated to align with the ellipse axes
        let d = (start - end) * 0.5;
        let cos_a = arc.rotation.cos();
        let sin_a = arc.rotation.sin();
        let x1 = cos_a * d.x + sin_a * d.y;
        let y1 = -sin_a * d.x + cos_a * d.y;

        // Ensure radii are large enough
        let mut prx = rx * rx;
        let mut pry = ry * ry;
        let px1 = x1 * x1;
        let py1 = y1 * y1;
        let radii_check = px1 / prx + py1 / pry;
        if radii_check > 1.0 {
            rx *= radii_check.sqrt();
            ry *= radii_check.sqrt();
            prx = rx * rx;
            pry = ry * ry;
        }

        // Center
        let sign = if large == sweep { -1.0 } else { 1.0 };
        let den = prx * py1 + pry * px1;
        let sq = if den > 0.0 {
            (prx * pry - prx * py1 - pry * px1) / den
        } else {
            0.0
        };
        let coef = sign * sq.max(0.0).sqrt();
        let cx1 = coef * ((rx * y1) / ry);
        let cy1 = coef * -((ry * x1) / rx);

        let mid = start.lerp(end, 0.5);
        let center = PointD::new(
            mid.x + (cos_a * cx1 - sin_a * cy1),
            mid.y + (sin_a * cx1 + cos_a * cy1),
        );

        // Angles
        let ux = (x1 - cx1) / rx;
        let uy = (y1 - cy1) / ry;
        let vx = (-x1 - cx1) / rx;
        let vy = (-y1 - cy1) / ry;

        let n = (ux * ux + uy * uy).sqrt();
        let sign = if uy < 0.0 { -1.0 } else { 1.0 };
        let start_angle = sign * (ux / n).clamp(-1.0, 1.0).acos();

        let n = ((ux * ux + uy * uy) * (vx * vx + vy * vy)).sqrt();
        let p = ux * vx + uy * vy;
        let sign = if ux * vy - uy * vx < 0.0 { -1.0 } else { 1.0 };
        let mut sweep_angle = sign * (p / n).clamp(-1.0, 1.0).acos();
        if !sweep && sweep_angle > 0.0 {
            sweep_angle -= PI * 2.0;
        } else if sweep && sweep_angle < 0.0 {
            sweep_angle += PI * 2.0;
        }

        arc.center = center;
        arc.rx = rx;
        arc.ry = ry;
        arc.start_angle = start_angle;
        arc.sweep_angle = sweep_angle;
        arc.degenerate = !sweep_angle.is_finite() || sweep_angle.abs() < 1e-12;
        arc
    }

    /// True when the arc collapses to the straight segment start→end.
    pub fn is_degenerate(&self) -> bool {
        self.degenerate
    }

    pub fn start(&self) -> PointD {
        self.start
    }

    pub fn end(&self) -> PointD {
        self.end
    }

    pub fn center(&self) -> PointD {
        self.center
    }

    /// Radii after the out-of-range correction.
    pub fn radii(&self) -> (f64, f64) {
        (self.rx, self.ry)
    }

    pub fn start_angle(&self) -> f64 {
        self.start_angle
    }

    /// Signed sweep in radians; positive when the angle increases.
    pub fn sweep_angle(&self) -> f64 {
        self.sweep_angle
    }

    /// x-axis rotation in degrees, as taken by `ArcTo`.
    pub fn rotation_degrees(&self) -> f64 {
        rad2deg(self.rotation)
    }

    /// `(large, sweep)` flags that reproduce this arc from its endpoints.
    pub fn flags(&self) -> (bool, bool) {
        (self.sweep_angle.abs() > PI, self.sweep_angle > 0.0)
    }

    /// The same arc traversed from end to start.
    pub fn reversed(&self) -> SvgArc {
        SvgArc {
            start: self.end,
            end: self.start,
            start_angle: self.start_angle + self.sweep_angle,
            sweep_angle: -self.sweep_angle,
            ..*self
        }
    }

    /// The part of the arc between parameters `t0` and `t1`; `t1 < t0`
    /// yields a reversed piece.
    pub fn sub_arc(&self, t0: f64, t1: f64) -> SvgArc {
        SvgArc {
            start: self.point_at(t0),
            end: self.point_at(t1),
            start_angle: self.angle_at(t0),
            sweep_angle: self.sweep_angle * (t1 - t0),
            degenerate: self.degenerate || (t1 - t0).abs() < 1e-12,
            ..*self
        }
    }

    /// Parametric angle at `t`.
    #[inline]
    pub fn angle_at(&self, t: f64) -> f64 {
        self.start_angle + self.sweep_angle * t
    }

    /// Point at parameter `t`; the endpoints are returned exactly.
    pub fn point_at(&self, t: f64) -> PointD {
        if self.degenerate {
            return self.start.lerp(self.end, t);
        }
        if t <= 0.0 {
            return self.start;
        }
        if t >= 1.0 {
            return self.end;
        }
        self.point_at_angle(self.angle_at(t))
    }

    fn point_at_angle(&self, a: f64) -> PointD {
        let (sin_r, cos_r) = self.rotation.sin_cos();
        let x = self.rx * a.cos();
        let y = self.ry * a.sin();
        PointD::new(
            self.center.x + cos_r * x - sin_r * y,
            self.center.y + sin_r * x + cos_r * y,
        )
    }

    /// Derivative with respect to `t`.
    pub fn derivative_at(&self, t: f64) -> PointD {
        if self.degenerate {
            return self.end - self.start;
        }
        let a = self.angle_at(t);
        let (sin_r, cos_r) = self.rotation.sin_cos();
        let dx = -self.rx * a.sin() * self.sweep_angle;
        let dy = self.ry * a.cos() * self.sweep_angle;
        PointD::new(cos_r * dx - sin_r * dy, sin_r * dx + cos_r * dy)
    }

    /// Second derivative with respect to `t`.
    pub fn second_derivative_at(&self, t: f64) -> PointD {
        if self.degenerate {
            return PointD::ZERO;
        }
        let a = self.angle_at(t);
        let (sin_r, cos_r) = self.rotation.sin_cos();
        let s2 = self.sweep_angle * self.sweep_angle;
        let dx = -self.rx * a.cos() * s2;
        let dy = -self.ry * a.sin() * s2;
        PointD::new(cos_r * dx - sin_r * dy, sin_r * dx + cos_r * dy)
    }

    /// Angular step keeping the chord deviation under `tolerance`.
    pub fn angle_step(&self, tolerance: f64) -> f64 {
        let r = self.rx.max(self.ry);
        if tolerance >= r {
            return PI / 2.0;
        }
        (2.0 * (1.0 - tolerance / r).acos()).clamp(1e-4, PI / 2.0)
    }
}

// ============================================================================
// Tests
// ============================================================================

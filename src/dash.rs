//! Dashing: cut a polyline into its "on" pieces along arc length.
//!
//! The pattern alternates on and off lengths, starting with "on", and
//! restarts at the beginning of every subpath shifted by the phase.

use log::trace;

use crate::basics::PointD;
use crate::path::Path;
use crate::polyline::{BackData, Polyline, PolylinePoint, PolylinePointKind};

/// Dash lengths shorter than this do not advance the walk.
const DASH_EPSILON: f64 = 1e-12;

/// Alternating on/off lengths plus a starting offset.
#[derive(Debug, Clone, PartialEq)]
pub struct DashPattern {
    dashes: Vec<f64>,
    phase: f64,
}

impl DashPattern {
    /// An odd-length list is repeated once to make it even. Negative or
    /// non-finite lengths are clamped to zero.
    pub fn new(dashes: &[f64], phase: f64) -> Self {
        let mut d: Vec<f64> = dashes
            .iter()
            .map(|&x| if x.is_finite() && x > 0.0 { x } else { 0.0 })
            .collect();
        if d.len() % 2 == 1 {
            d.extend_from_within(..);
        }
        Self {
            dashes: d,
            phase: if phase.is_finite() { phase } else { 0.0 },
        }
    }

    pub fn dashes(&self) -> &[f64] {
        &self.dashes
    }

    pub fn phase(&self) -> f64 {
        self.phase
    }

    /// Length of one full period.
    pub fn total(&self) -> f64 {
        self.dashes.iter().sum()
    }

    /// A pattern with no positive length would never advance.
    pub fn is_valid(&self) -> bool {
        self.total() > DASH_EPSILON
    }

    /// Dash index and remaining length at the start of a subpath.
    fn start_state(&self) -> (usize, f64) {
        let total = self.total();
        let mut pos = self.phase.rem_euclid(total);
        for (i, &d) in self.dashes.iter().enumerate() {
            if pos < d {
                return (i, d - pos);
            }
            pos -= d;
        }
        (0, self.dashes[0])
    }

    /// The "on" pieces of `src` as separate subpaths. An invalid pattern
    /// leaves the polyline unchanged.
    pub fn dash_polyline(&self, src: &Polyline) -> Polyline {
        if !self.is_valid() {
            trace!("dash pattern without positive length, polyline left undashed");
            return src.clone();
        }
        let mut out = Polyline::new();
        out.reset(src.has_back_data());
        let pts = src.points();
        for (s, e) in src.subpaths() {
            self.dash_sub_path(&pts[s..e], &mut out);
        }
        out
    }

    /// Dash one subpath into `out`.
    pub fn dash_sub_path(&self, pts: &[PolylinePoint], out: &mut Polyline) {
        if pts.len() < 2 || !self.is_valid() {
            return;
        }
        let (mut idx, mut remaining) = self.start_state();
        let mut drawing = false;
        for w in pts.windows(2) {
            let (a, b) = (&w[0], &w[1]);
            let len = a.p.distance(b.p);
            let mut s = 0.0;
            loop {
                let on = idx % 2 == 0;
                let step = remaining.min(len - s);
                if on {
                    if !drawing {
                        out.start_subpath();
                        out.add_point(cut(a, b, s / len.max(DASH_EPSILON)), PolylinePointKind::MoveTo, cut_back(a, b, s, len));
                        drawing = true;
                    }
                    if step > DASH_EPSILON || remaining <= DASH_EPSILON {
                        let t = (s + step) / len.max(DASH_EPSILON);
                        out.add_point(cut(a, b, t), PolylinePointKind::LineTo, cut_back(a, b, s + step, len));
                    }
                }
                s += step;
                remaining -= step;
                if remaining <= DASH_EPSILON {
                    idx = (idx + 1) % self.dashes.len();
                    remaining = self.dashes[idx];
                    if idx % 2 == 1 {
                        drawing = false;
                    }
                    continue;
                }
                if len - s <= DASH_EPSILON {
                    break;
                }
            }
        }
    }
}

fn cut(a: &PolylinePoint, b: &PolylinePoint, t: f64) -> PointD {
    a.p.lerp(b.p, t.clamp(0.0, 1.0))
}

fn cut_back(a: &PolylinePoint, b: &PolylinePoint, s: f64, len: f64) -> Option<BackData> {
    let bb = b.back?;
    let t0 = match a.back {
        Some(ab) if ab.piece == bb.piece => ab.t,
        _ => 0.0,
    };
    let u = if len > DASH_EPSILON { (s / len).clamp(0.0, 1.0) } else { 1.0 };
    Some(BackData {
        t: t0 + (bb.t - t0) * u,
        ..bb
    })
}

impl Path {
    /// Replace the polyline with its dashed version.
    pub fn dash_polyline(&mut self, pattern: &DashPattern) {
        let dashed = pattern.dash_polyline(self.polyline());
        *self.polyline_mut() = dashed;
    }

    /// Write the dashes of the current polyline into `dest` as line
    /// commands, one open subpath per dash.
    pub fn dash_to(&self, dest: &mut Path, pattern: &DashPattern) {
        dest.reset();
        let dashed = pattern.dash_polyline(self.polyline());
        for pt in dashed.points() {
            match pt.kind {
                PolylinePointKind::MoveTo => {
                    dest.move_to(pt.p);
                }
                _ => {
                    dest.line_to(pt.p);
                }
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

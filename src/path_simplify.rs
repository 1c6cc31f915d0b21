//! Refitting: turn a flattened path back into a short list of curves.
//!
//! `simplify` replaces the commands with the fewest cubics that stay within
//! a tolerance of the polyline. `coalesce` works on the command level and
//! merges runs of consecutive commands that a single cubic can replace,
//! copying every other command unchanged.

use log::debug;

use crate::basics::PointD;
use crate::math::{calc_segment_point_sq_distance, calc_segment_point_u, hermite_point};
use crate::path::{Path, PathCommand};
use crate::polyline::{PolylinePoint, PolylinePointKind};
use crate::simul_eq::simul_eq_solve;

/// Parameter refinement passes after the first least-squares fit.
const REFINE_PASSES: usize = 2;

/// Outcome of fitting one curve through a run of points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SimplifyFit {
    /// The run is straight.
    Line,
    /// Hermite cubic between the first and last point of the run.
    Cubic { start_tangent: PointD, end_tangent: PointD },
}

// ============================================================================
// Curve fitting
// ============================================================================

/// Fit one curve from the first to the last point of `points`, or `None`
/// when no single cubic stays within `tolerance` of every point and of every
/// segment between them.
pub fn attempt_simplify(points: &[PointD], tolerance: f64) -> Option<SimplifyFit> {
    let n = points.len();
    if n < 2 {
        return None;
    }
    let (s, e) = (points[0], points[n - 1]);
    if n == 2 || is_straight(points, tolerance) {
        return Some(SimplifyFit::Line);
    }

    let mut ts = chord_params(points)?;
    let (mut sd, mut ed) = fit_tangents(points, &ts).unwrap_or_else(|| neighbour_tangents(points, &ts));
    for _ in 0..REFINE_PASSES {
        let (b1, b2) = (s + sd * (1.0 / 3.0), e - ed * (1.0 / 3.0));
        for k in 1..n - 1 {
            ts[k] = raffine_tk(points[k], s, b1, b2, e, ts[k]);
        }
        if let Some((a, b)) = fit_tangents(points, &ts) {
            sd = a;
            ed = b;
        }
    }

    let tol2 = tolerance * tolerance;
    for k in 1..n - 1 {
        if (hermite_point(s, sd, e, ed, ts[k]) - points[k]).sq_length() > tol2 {
            return None;
        }
    }
    for k in 0..n - 1 {
        let q = hermite_point(s, sd, e, ed, (ts[k] + ts[k + 1]) * 0.5);
        if calc_segment_point_sq_distance(points[k], points[k + 1], q) > tol2 {
            return None;
        }
    }
    Some(SimplifyFit::Cubic {
        start_tangent: sd,
        end_tangent: ed,
    })
}

/// Every point close to the chord and moving forward along it.
fn is_straight(points: &[PointD], tolerance: f64) -> bool {
    let (s, e) = (points[0], points[points.len() - 1]);
    let tol2 = tolerance * tolerance;
    let mut last_u = 0.0;
    for &p in &points[1..points.len() - 1] {
        if calc_segment_point_sq_distance(s, e, p) > tol2 {
            return false;
        }
        let u = calc_segment_point_u(s, e, p);
        if u + 1e-9 < last_u {
            return false;
        }
        last_u = u;
    }
    true
}

/// Normalized cumulative chord lengths.
fn chord_params(points: &[PointD]) -> Option<Vec<f64>> {
    let mut ts = Vec::with_capacity(points.len());
    let mut acc = 0.0;
    ts.push(0.0);
    for w in points.windows(2) {
        acc += w[0].distance(w[1]);
        ts.push(acc);
    }
    if acc <= 1e-12 {
        return None;
    }
    for t in &mut ts {
        *t /= acc;
    }
    Some(ts)
}

/// Least-squares Hermite tangents for fixed endpoints and parameters.
fn fit_tangents(points: &[PointD], ts: &[f64]) -> Option<(PointD, PointD)> {
    let n = points.len();
    let (s, e) = (points[0], points[n - 1]);
    let mut m = [[0.0; 2]; 2];
    let mut rhs = [[0.0; 2]; 2];
    for k in 1..n - 1 {
        let t = ts[k];
        let t2 = t * t;
        let t3 = t2 * t;
        let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
        let h10 = t3 - 2.0 * t2 + t;
        let h01 = -2.0 * t3 + 3.0 * t2;
        let h11 = t3 - t2;
        let r = points[k] - s * h00 - e * h01;
        m[0][0] += h10 * h10;
        m[0][1] += h10 * h11;
        m[1][1] += h11 * h11;
        rhs[0][0] += h10 * r.x;
        rhs[0][1] += h10 * r.y;
        rhs[1][0] += h11 * r.x;
        rhs[1][1] += h11 * r.y;
    }
    m[1][0] = m[0][1];
    let x = simul_eq_solve(&m, &rhs, 1e-12)?;
    let sd = PointD::new(x[0][0], x[0][1]);
    let ed = PointD::new(x[1][0], x[1][1]);
    if sd.is_finite() && ed.is_finite() {
        Some((sd, ed))
    } else {
        None
    }
}

/// Finite-difference tangents at both ends, for runs too short to pin
/// down the least-squares system.
fn neighbour_tangents(points: &[PointD], ts: &[f64]) -> (PointD, PointD) {
    let n = points.len();
    let dt0 = ts[1].max(1e-12);
    let dt1 = (1.0 - ts[n - 2]).max(1e-12);
    (
        (points[1] - points[0]) * (1.0 / dt0),
        (points[n - 1] - points[n - 2]) * (1.0 / dt1),
    )
}

/// One Newton step moving `t` toward the parameter of the point of the
/// Bezier `p0..p3` closest to `pt`.
pub fn raffine_tk(pt: PointD, p0: PointD, p1: PointD, p2: PointD, p3: PointD, t: f64) -> f64 {
    let u = 1.0 - t;
    let b = p0 * (u * u * u) + p1 * (3.0 * u * u * t) + p2 * (3.0 * u * t * t) + p3 * (t * t * t);
    let d1 = ((p1 - p0) * (u * u) + (p2 - p1) * (2.0 * u * t) + (p3 - p2) * (t * t)) * 3.0;
    let d2 = ((p2 - p1 * 2.0 + p0) * u + (p3 - p2 * 2.0 + p1) * t) * 6.0;
    let diff = b - pt;
    let f = diff.dot(d1);
    let fp = d1.dot(d1) + diff.dot(d2);
    if fp.abs() < 1e-12 {
        return t;
    }
    (t - f / fp).clamp(0.0, 1.0)
}

fn emit_fit(dest: &mut Path, fit: SimplifyFit, p: PointD) {
    match fit {
        SimplifyFit::Line => {
            dest.line_to(p);
        }
        SimplifyFit::Cubic {
            start_tangent,
            end_tangent,
        } => {
            dest.cubic_to(p, start_tangent, end_tangent);
        }
    }
}

// ============================================================================
// Simplify
// ============================================================================

/// Longest run starting at `i` that one curve fits, never crossing `limit`.
fn longest_fit(pts: &[PointD], i: usize, limit: usize, tolerance: f64) -> (usize, SimplifyFit) {
    let mut good = (i + 1, SimplifyFit::Line);
    let mut bad = None;
    let mut step = 2;
    while good.0 < limit {
        let j = (i + step).min(limit);
        match attempt_simplify(&pts[i..=j], tolerance) {
            Some(fit) => {
                good = (j, fit);
                step *= 2;
            }
            None => {
                bad = Some(j);
                break;
            }
        }
    }
    if let Some(mut hi) = bad {
        while hi - good.0 > 1 {
            let mid = (good.0 + hi) / 2;
            match attempt_simplify(&pts[i..=mid], tolerance) {
                Some(fit) => good = (mid, fit),
                None => hi = mid,
            }
        }
    }
    good
}

fn simplify_subpath(dest: &mut Path, pts: &[PolylinePoint], tolerance: f64) {
    let n = pts.len();
    if n == 0 {
        return;
    }
    let coords: Vec<PointD> = pts.iter().map(|q| q.p).collect();
    dest.move_to(coords[0]);
    let closed = n > 2 && coords[n - 1].distance(coords[0]) <= 1e-12;
    let mut i = 0;
    while i + 1 < n {
        let limit = (i + 1..n - 1)
            .find(|&k| pts[k].kind == PolylinePointKind::Forced)
            .unwrap_or(n - 1);
        let (j, fit) = longest_fit(&coords, i, limit, tolerance);
        emit_fit(dest, fit, coords[j]);
        i = j;
    }
    if closed {
        let _ = dest.close();
    }
}

impl Path {
    /// Replace the commands with cubics fitted to the current polyline
    /// within `tolerance`. An unconverted path is flattened first. Forced
    /// points are kept as curve ends. The polyline is invalidated.
    pub fn simplify(&mut self, tolerance: f64) {
        if self.polyline().is_empty() {
            self.convert(tolerance * 0.25);
        }
        let polyline = self.polyline().clone();
        let pts = polyline.points();
        let mut out = Path::new();
        for (s, e) in polyline.subpaths() {
            simplify_subpath(&mut out, &pts[s..e], tolerance);
        }
        debug!(
            "simplified {} polyline points into {} commands",
            pts.len(),
            out.descr_count()
        );
        *self = out;
    }

    // ---------------------------------------------------------------
    // Coalesce
    // ---------------------------------------------------------------

    /// Merge runs of consecutive drawing commands that one cubic replaces
    /// within `tolerance`. Commands that merge with nothing are copied
    /// unchanged, and subpath boundaries, closes and forced points always
    /// end a run. The polyline is invalidated.
    pub fn coalesce(&mut self, tolerance: f64) {
        if self.descr_count() == 0 {
            return;
        }
        self.convert_with_back_data(tolerance * 0.25);
        let coords: Vec<PointD> = self.polyline().points().iter().map(|q| q.p).collect();
        let mut out = Path::new();
        let mut run: Option<Run> = None;
        let mut cursor = 0;

        for (i, d) in self.commands().iter().enumerate() {
            match d.cmd {
                PathCommand::MoveTo { p } => {
                    self.flush_run(&mut out, run.take(), &coords);
                    out.move_to(p);
                    cursor = d.associated.unwrap_or(cursor);
                }
                PathCommand::IntermBezierTo { .. } => {}
                PathCommand::Close => {
                    self.flush_run(&mut out, run.take(), &coords);
                    let _ = out.close();
                    cursor = d.associated.unwrap_or(cursor);
                }
                PathCommand::Forced => {
                    self.flush_run(&mut out, run.take(), &coords);
                    let _ = out.force_point();
                }
                _ => {
                    let end = match d.associated {
                        Some(end) if end < coords.len() => end,
                        _ => {
                            self.flush_run(&mut out, run.take(), &coords);
                            self.copy_command(&mut out, i);
                            continue;
                        }
                    };
                    run = match run.take() {
                        None => Some(Run::single(i, cursor, end)),
                        Some(r) => match attempt_simplify(&coords[r.from..=end], tolerance) {
                            Some(fit) => Some(Run {
                                count: r.count + 1,
                                to: end,
                                fit,
                                ..r
                            }),
                            None => {
                                self.flush_run(&mut out, Some(r), &coords);
                                Some(Run::single(i, cursor, end))
                            }
                        },
                    };
                    cursor = end;
                }
            }
        }
        self.flush_run(&mut out, run.take(), &coords);
        debug!(
            "coalesced {} commands into {}",
            self.descr_count(),
            out.descr_count()
        );
        *self = out;
    }

    fn flush_run(&self, out: &mut Path, run: Option<Run>, coords: &[PointD]) {
        let r = match run {
            Some(r) => r,
            None => return,
        };
        if r.count == 1 {
            self.copy_command(out, r.first);
        } else {
            emit_fit(out, r.fit, coords[r.to]);
        }
    }

    /// Append command `i` to `out` as is, spline control points included.
    fn copy_command(&self, out: &mut Path, i: usize) {
        let cmds = self.commands();
        match cmds[i].cmd {
            PathCommand::LineTo { p } => {
                out.line_to(p);
            }
            PathCommand::CubicTo {
                p,
                start_tangent,
                end_tangent,
            } => {
                out.cubic_to(p, start_tangent, end_tangent);
            }
            PathCommand::ArcTo {
                p,
                rx,
                ry,
                angle,
                large,
                sweep,
            } => {
                out.arc_to(p, rx, ry, angle, large, sweep);
            }
            PathCommand::BezierTo { p, nb } => {
                out.bezier_to(p);
                for d in cmds[i + 1..].iter().take(nb) {
                    if let PathCommand::IntermBezierTo { p } = d.cmd {
                        let _ = out.interm_bezier_to(p);
                    }
                }
                let _ = out.end_bezier_to();
            }
            _ => {}
        }
    }
}

/// Consecutive commands merged so far, covering polyline points
/// `from..=to`.
#[derive(Debug, Clone, Copy)]
struct Run {
    first: usize,
    count: usize,
    from: usize,
    to: usize,
    fit: SimplifyFit,
}

impl Run {
    fn single(first: usize, from: usize, to: usize) -> Self {
        Self {
            first,
            count: 1,
            from,
            to,
            fit: SimplifyFit::Line,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curves::CurvePiece;

    fn p(x: f64, y: f64) -> PointD {
        PointD::new(x, y)
    }

    fn count(path: &Path, f: impl Fn(&PathCommand) -> bool) -> usize {
        path.commands().iter().filter(|d| f(&d.cmd)).count()
    }

    #[test]
    fn test_attempt_simplify_line_and_cubic() {
        let straight: Vec<PointD> = (0..=10).map(|i| p(i as f64, 0.0)).collect();
        assert_eq!(attempt_simplify(&straight, 0.01), Some(SimplifyFit::Line));

        let piece = CurvePiece::Cubic {
            s: p(0.0, 0.0),
            sd: p(10.0, 10.0),
            e: p(10.0, 0.0),
            ed: p(10.0, -10.0),
        };
        let pts: Vec<PointD> = (0..=20).map(|i| piece.point_at(i as f64 / 20.0)).collect();
        match attempt_simplify(&pts, 0.2) {
            Some(SimplifyFit::Cubic { start_tangent, .. }) => {
                assert!(start_tangent.x > 0.0 && start_tangent.y > 0.0);
            }
            other => panic!("unexpected {:?}", other),
        }

        let corner = [p(0.0, 0.0), p(10.0, 0.0), p(10.0, 10.0)];
        assert_eq!(attempt_simplify(&corner, 0.1), None);
    }

    #[test]
    fn test_raffine_tk_moves_toward_point() {
        let (p0, p1, p2, p3) = (p(0.0, 0.0), p(1.0, 0.0), p(2.0, 0.0), p(3.0, 0.0));
        // On this uniform line B(t) = 3t, so the closest parameter to x=1.5 is 0.5.
        let t = raffine_tk(p(1.5, 1.0), p0, p1, p2, p3, 0.3);
        assert!((t - 0.5).abs() < 1e-12);
        assert!((raffine_tk(p(-5.0, 0.0), p0, p1, p2, p3, 0.1) - 0.0).abs() < 1e-12);
    }

    #[test]
    fn test_simplify_straight_run() {
        let mut path = Path::new();
        path.move_to(p(0.0, 0.0));
        path.line_to(p(10.0, 0.0));
        path.convert_even_lines(0.1, 1.0);
        assert!(path.polyline().len() > 5);
        path.simplify(0.01);
        assert_eq!(path.descr_count(), 2);
        assert!(path.polyline().is_empty());
    }

    #[test]
    fn test_simplify_keeps_corners() {
        let mut path = Path::new();
        path.move_to(p(0.0, 0.0));
        path.line_to(p(10.0, 0.0));
        path.line_to(p(10.0, 10.0));
        path.line_to(p(0.0, 10.0));
        path.close().unwrap();
        path.convert(0.1);
        path.simplify(0.1);
        assert_eq!(count(&path, |c| matches!(c, PathCommand::LineTo { .. })), 4);
        assert_eq!(count(&path, |c| *c == PathCommand::Close), 1);
        path.convert(0.1);
        let mut sh = crate::shape::Shape::new();
        path.fill(&mut sh, None, false, true, false);
        assert!((sh.area() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_simplify_forced_point_is_a_cut() {
        let mut path = Path::new();
        path.move_to(p(0.0, 0.0));
        path.line_to(p(5.0, 0.0));
        path.force_point().unwrap();
        path.line_to(p(10.0, 0.0));
        path.convert_even_lines(0.1, 1.0);
        path.simplify(0.01);
        assert_eq!(path.descr_count(), 3);
        assert_eq!(path.commands()[1].cmd, PathCommand::LineTo { p: p(5.0, 0.0) });
    }

    #[test]
    fn test_simplify_quarter_circle() {
        let mut path = Path::new();
        path.move_to(p(10.0, 0.0));
        path.arc_to(p(0.0, 10.0), 10.0, 10.0, 0.0, false, true);
        path.convert(0.001);
        let before = path.polyline().len();
        path.simplify(0.05);
        assert!(path.descr_count() <= 4);
        assert!(path.descr_count() < before);
        path.convert(0.001);
        for q in path.polyline().points() {
            assert!((q.p.length() - 10.0).abs() < 0.1);
        }
    }

    #[test]
    fn test_coalesce_collinear_lines() {
        let mut path = Path::new();
        path.move_to(p(0.0, 0.0));
        for i in 1..=10 {
            path.line_to(p(i as f64, 0.0));
        }
        path.coalesce(0.01);
        assert_eq!(path.descr_count(), 2);
        assert_eq!(path.commands()[1].cmd, PathCommand::LineTo { p: p(10.0, 0.0) });
    }

    #[test]
    fn test_coalesce_split_cubic() {
        let piece = CurvePiece::Cubic {
            s: p(0.0, 0.0),
            sd: p(10.0, 10.0),
            e: p(10.0, 0.0),
            ed: p(10.0, -10.0),
        };
        let mut path = Path::new();
        path.move_to(piece.start());
        for (t0, t1) in [(0.0, 0.5), (0.5, 1.0)] {
            if let CurvePiece::Cubic { e, sd, ed, .. } = piece.sub_piece(t0, t1) {
                path.cubic_to(e, sd, ed);
            }
        }
        path.coalesce(0.2);
        assert_eq!(path.descr_count(), 2);
        assert!(matches!(path.commands()[1].cmd, PathCommand::CubicTo { .. }));
        path.convert(0.01);
        for q in path.polyline().points() {
            let nearest = (0..=200)
                .map(|i| piece.point_at(i as f64 / 200.0).distance(q.p))
                .fold(f64::MAX, f64::min);
            assert!(nearest < 0.3);
        }
    }

    #[test]
    fn test_coalesce_copies_unmergeable_commands() {
        let mut path = Path::new();
        path.move_to(p(0.0, 0.0));
        path.line_to(p(10.0, 0.0));
        path.line_to(p(10.0, 10.0));
        path.bezier_to(p(0.0, 10.0));
        path.interm_bezier_to(p(5.0, 20.0)).unwrap();
        path.end_bezier_to().unwrap();
        path.close().unwrap();
        let before: Vec<PathCommand> = path.commands().iter().map(|d| d.cmd).collect();
        path.coalesce(0.01);
        let after: Vec<PathCommand> = path.commands().iter().map(|d| d.cmd).collect();
        assert_eq!(before, after);
    }
}

//! Flattened form of a path.
//!
//! A `Polyline` is the ordered list of points produced by converting a
//! [`Path`](crate::path::Path). Each point is tagged as the start of a
//! subpath, a plain line-to, or a forced breakpoint; in back-data mode it
//! also records which command produced it and at which parameter.

use crate::basics::{PointD, RectD};
use crate::curves::PointSink;

/// How a polyline point connects to its predecessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolylinePointKind {
    /// Line from the previous point.
    LineTo,
    /// Start of a new subpath.
    MoveTo,
    /// Line from the previous point, and a mandatory cut location for
    /// refitting.
    Forced,
}

/// Origin of a polyline point on the source path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackData {
    /// Index of the path command that produced the point.
    pub piece: usize,
    /// Parameter in `[0, 1]` along that command.
    pub t: f64,
    /// Offset distance applied to the point (0 except for offset conversion).
    pub offset: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolylinePoint {
    pub p: PointD,
    pub kind: PolylinePointKind,
    pub back: Option<BackData>,
}

/// Ordered polyline points, possibly spanning several subpaths.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Polyline {
    points: Vec<PolylinePoint>,
    back: bool,
    pending_move: bool,
}

impl Polyline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop all points; `back` selects whether back data is recorded.
    pub fn reset(&mut self, back: bool) {
        self.points.clear();
        self.back = back;
        self.pending_move = false;
    }

    pub fn has_back_data(&self) -> bool {
        self.back
    }

    pub fn points(&self) -> &[PolylinePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last_point(&self) -> Option<PointD> {
        self.points.last().map(|pt| pt.p)
    }

    /// Append a point and return its index. Back data is dropped unless the
    /// polyline was reset in back-data mode.
    pub fn add_point(&mut self, p: PointD, kind: PolylinePointKind, back: Option<BackData>) -> usize {
        let back = if self.back { back } else { None };
        let kind = if self.pending_move {
            self.pending_move = false;
            PolylinePointKind::MoveTo
        } else {
            kind
        };
        self.points.push(PolylinePoint { p, kind, back });
        self.points.len() - 1
    }

    /// Make the next added point start a new subpath.
    pub fn start_subpath(&mut self) {
        self.pending_move = true;
    }

    /// Mark the last point as a forced breakpoint. Subpath starts keep
    /// their kind, since they are cut locations already.
    pub fn force_last(&mut self) {
        if let Some(last) = self.points.last_mut() {
            if last.kind == PolylinePointKind::LineTo {
                last.kind = PolylinePointKind::Forced;
            }
        }
    }

    /// Index ranges `[start, end)` of each subpath.
    pub fn subpaths(&self) -> Vec<(usize, usize)> {
        let mut out = Vec::new();
        let mut start = 0;
        for (i, pt) in self.points.iter().enumerate() {
            if i > 0 && pt.kind == PolylinePointKind::MoveTo {
                out.push((start, i));
                start = i;
            }
        }
        if start < self.points.len() {
            out.push((start, self.points.len()));
        }
        out
    }

    /// Bounding box of all points, `None` when empty.
    pub fn bounds(&self) -> Option<RectD> {
        if self.points.is_empty() {
            return None;
        }
        let mut r = RectD::empty();
        for pt in &self.points {
            r.expand(pt.p);
        }
        Some(r)
    }

    /// Total length of all subpaths.
    pub fn length(&self) -> f64 {
        self.points
            .windows(2)
            .filter(|w| w[1].kind != PolylinePointKind::MoveTo)
            .map(|w| w[0].p.distance(w[1].p))
            .sum()
    }
}

impl PointSink for Polyline {
    fn emit(&mut self, p: PointD, back: Option<BackData>) {
        self.add_point(p, PolylinePointKind::LineTo, back);
    }
}

// ============================================================================
// Tests
// ============================================================================

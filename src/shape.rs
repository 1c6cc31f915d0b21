//! Shape: planar graph of directed edges.
//!
//! A raw shape (`ShapeKind::Graph`) is what `Path::fill` and stroking
//! produce: edges may cross and overlap. The boolean engine in
//! [`shape_boolean`](crate::shape_boolean) turns it into a clean polygon
//! (`ShapeKind::Polygon`): planar, interior on the left of every edge,
//! edges stored contour by contour.

use log::debug;

use crate::basics::{FillRule, PointD, RectD};
use crate::curves::CurvePiece;
use crate::math::VERTEX_DIST_EPSILON;
use crate::path::Path;

/// Parameter gap under which two edge ranges are considered contiguous.
const BACK_CONTINUITY_EPSILON: f64 = 1e-9;

/// Origin of an edge on a source path, for curve reconstruction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeBackData {
    /// Index of the source path in the `origins` slice of `convert_to_forme`.
    pub path_id: usize,
    /// Piece index inside that path (see `Path::command_pieces`).
    pub piece: usize,
    pub t_st: f64,
    pub t_en: f64,
    /// Offset distance the edge was sampled at.
    pub offset: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeEdge {
    pub st: usize,
    pub en: usize,
    pub back: Option<EdgeBackData>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShapeKind {
    /// Unresolved edge soup.
    #[default]
    Graph,
    /// Planar, oriented, stored contour by contour.
    Polygon,
}

/// Vertex list plus directed edge list.
#[derive(Debug, Clone, Default)]
pub struct Shape {
    points: Vec<PointD>,
    edges: Vec<ShapeEdge>,
    kind: ShapeKind,
}

impl Shape {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove all vertices and edges (keeps allocated memory).
    pub fn reset(&mut self) {
        self.points.clear();
        self.edges.clear();
        self.kind = ShapeKind::Graph;
    }

    pub fn kind(&self) -> ShapeKind {
        self.kind
    }

    pub(crate) fn set_kind(&mut self, kind: ShapeKind) {
        self.kind = kind;
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn number_of_points(&self) -> usize {
        self.points.len()
    }

    pub fn number_of_edges(&self) -> usize {
        self.edges.len()
    }

    pub fn points(&self) -> &[PointD] {
        &self.points
    }

    pub fn edges(&self) -> &[ShapeEdge] {
        &self.edges
    }

    pub fn point(&self, i: usize) -> PointD {
        self.points[i]
    }

    pub fn edge(&self, i: usize) -> &ShapeEdge {
        &self.edges[i]
    }

    /// Append a vertex and return its index.
    pub fn add_point(&mut self, p: PointD) -> usize {
        self.points.push(p);
        self.points.len() - 1
    }

    /// Append the directed edge `st`→`en`. Loops are refused.
    pub fn add_edge(&mut self, st: usize, en: usize) -> Option<usize> {
        self.add_edge_with_back(st, en, None)
    }

    pub fn add_edge_with_back(&mut self, st: usize, en: usize, back: Option<EdgeBackData>) -> Option<usize> {
        if st == en || st >= self.points.len() || en >= self.points.len() {
            return None;
        }
        self.edges.push(ShapeEdge { st, en, back });
        Some(self.edges.len() - 1)
    }

    #[inline]
    pub(crate) fn edge_points(&self, e: &ShapeEdge) -> (PointD, PointD) {
        (self.points[e.st], self.points[e.en])
    }

    // ---------------------------------------------------------------
    // Measures
    // ---------------------------------------------------------------

    /// Signed area, positive for counter-clockwise boundaries.
    pub fn area(&self) -> f64 {
        self.edges
            .iter()
            .map(|e| {
                let (a, b) = self.edge_points(e);
                a.cross(b)
            })
            .sum::<f64>()
            * 0.5
    }

    /// Bounding box of the vertices used by edges.
    pub fn bounds(&self) -> Option<RectD> {
        if self.edges.is_empty() {
            return None;
        }
        let mut r = RectD::empty();
        for e in &self.edges {
            let (a, b) = self.edge_points(e);
            r.expand(a);
            r.expand(b);
        }
        Some(r)
    }

    /// Winding number of `p`: counter-clockwise loops around it count +1.
    pub fn winding_at(&self, p: PointD) -> i32 {
        let mut w = 0;
        for e in &self.edges {
            let (a, b) = self.edge_points(e);
            let side = (b - a).cross(p - a);
            if a.y <= p.y && p.y < b.y {
                if side > 0.0 {
                    w += 1;
                }
            } else if b.y <= p.y && p.y < a.y && side < 0.0 {
                w -= 1;
            }
        }
        w
    }

    pub fn is_inside(&self, p: PointD, rule: FillRule) -> bool {
        rule.is_inside(self.winding_at(p))
    }

    // ---------------------------------------------------------------
    // Contours
    // ---------------------------------------------------------------

    /// Maximal chains of consecutive edges where each edge starts at the
    /// previous one's end, as lists of edge indices.
    pub fn contours(&self) -> Vec<Vec<usize>> {
        let mut out: Vec<Vec<usize>> = Vec::new();
        let mut cur: Vec<usize> = Vec::new();
        for (i, e) in self.edges.iter().enumerate() {
            if let Some(&last) = cur.last() {
                let prev = &self.edges[last];
                let prev_closed = prev.en == self.edges[cur[0]].st;
                if prev.en != e.st || prev_closed {
                    out.push(std::mem::take(&mut cur));
                }
            }
            cur.push(i);
        }
        if !cur.is_empty() {
            out.push(cur);
        }
        out
    }

    fn contour_is_closed(&self, contour: &[usize]) -> bool {
        match (contour.first(), contour.last()) {
            (Some(&f), Some(&l)) => self.edges[l].en == self.edges[f].st,
            _ => false,
        }
    }

    /// Polygonal path of the shape's contours.
    pub fn to_path(&self) -> Path {
        let mut dest = Path::new();
        for contour in self.contours() {
            let first = self.edges[contour[0]].st;
            dest.move_to(self.points[first]);
            let closed = self.contour_is_closed(&contour);
            let n = if closed { contour.len() - 1 } else { contour.len() };
            for &ei in &contour[..n] {
                dest.line_to(self.points[self.edges[ei].en]);
            }
            if closed {
                let _ = dest.close();
            }
        }
        dest
    }

    /// Rebuild a curved path from the shape, using the edges' back data to
    /// re-emit exact pieces of the source paths in `origins`. Runs of edges
    /// covering a contiguous range of one piece become one command; edges
    /// without usable back data become lines.
    pub fn convert_to_forme(&self, dest: &mut Path, origins: &[&Path]) {
        dest.reset();
        let contours = self.contours();
        for contour in &contours {
            let closed = self.contour_is_closed(contour);
            let order = if closed {
                self.rotate_to_run_start(contour)
            } else {
                contour.clone()
            };
            dest.move_to(self.points[self.edges[order[0]].st]);
            let mut i = 0;
            while i < order.len() {
                let mut j = i + 1;
                while j < order.len() && self.continues(order[j - 1], order[j]) {
                    j += 1;
                }
                self.emit_run(dest, &order[i..j], origins);
                i = j;
            }
            if closed {
                let _ = dest.close();
            }
        }
        debug!(
            "rebuilt {} contours into {} commands",
            contours.len(),
            dest.descr_count()
        );
    }

    /// Whether edge `b` extends the parametric run of edge `a`.
    fn continues(&self, a: usize, b: usize) -> bool {
        match (self.edges[a].back, self.edges[b].back) {
            (Some(x), Some(y)) => {
                x.path_id == y.path_id
                    && x.piece == y.piece
                    && x.offset == y.offset
                    && (x.t_en - y.t_st).abs() < BACK_CONTINUITY_EPSILON
                    && (x.t_en - x.t_st) * (y.t_en - y.t_st) > 0.0
            }
            _ => false,
        }
    }

    fn rotate_to_run_start(&self, contour: &[usize]) -> Vec<usize> {
        let n = contour.len();
        let start = (0..n)
            .find(|&k| !self.continues(contour[(k + n - 1) % n], contour[k]))
            .unwrap_or(0);
        contour[start..].iter().chain(&contour[..start]).copied().collect()
    }

    fn emit_run(&self, dest: &mut Path, run: &[usize], origins: &[&Path]) {
        let end = self.points[self.edges[run[run.len() - 1]].en];
        let (first, last) = match (self.edges[run[0]].back, self.edges[run[run.len() - 1]].back) {
            (Some(f), Some(l)) => (f, l),
            _ => {
                for &ei in run {
                    dest.line_to(self.points[self.edges[ei].en]);
                }
                return;
            }
        };
        let piece = origins.get(first.path_id).and_then(|p| p.piece(first.piece));
        let (t0, t1) = (first.t_st, last.t_en);
        let piece = match piece {
            Some(piece) if (t1 - t0).abs() > BACK_CONTINUITY_EPSILON => piece,
            _ => {
                for &ei in run {
                    dest.line_to(self.points[self.edges[ei].en]);
                }
                return;
            }
        };

        if first.offset != 0.0 {
            let (sd, ed) = offset_tangents(&piece, t0, t1, first.offset);
            dest.cubic_to(end, sd, ed);
            return;
        }
        match piece.sub_piece(t0, t1) {
            CurvePiece::Line { .. } => {
                dest.line_to(end);
            }
            CurvePiece::Cubic { sd, ed, .. } => {
                dest.cubic_to(end, sd, ed);
            }
            CurvePiece::Quadratic { c, .. } => {
                dest.bezier_to(end);
                let _ = dest.interm_bezier_to(c);
                let _ = dest.end_bezier_to();
            }
            CurvePiece::Arc(a) => {
                let start = dest
                    .prev_point(dest.descr_count())
                    .unwrap_or_else(|| a.start());
                if a.is_degenerate() || start.distance(end) <= VERTEX_DIST_EPSILON {
                    dest.line_to(end);
                } else {
                    let (rx, ry) = a.radii();
                    let (large, sweep) = a.flags();
                    dest.arc_to(end, rx, ry, a.rotation_degrees(), large, sweep);
                }
            }
        }
    }
}

/// Hermite tangents of the curve offset by `offset` along the left normal
/// of `piece`, restricted to `[t0, t1]`.
fn offset_tangents(piece: &CurvePiece, t0: f64, t1: f64, offset: f64) -> (PointD, PointD) {
    let k = t1 - t0;
    let tangent = |t: f64| piece.derivative_at(t) * (k * (1.0 - offset * piece.curvature_at(t)));
    (tangent(t0), tangent(t1))
}

// ============================================================================
// Tests
// ============================================================================

//! Boolean engine: turns raw edge graphs into clean polygons.
//!
//! Both operands are cut into one planar arrangement, every resulting edge
//! gets the winding numbers of its two sides (per operand), and the edges
//! separating inside from outside under the operator are kept, oriented
//! with the interior on their left and chained into contours.
//!
//! Vertices are snapped to a `2^-VERTEX_SNAP_SHIFT` grid so that points
//! computed twice from different edges merge into one vertex.

use std::cmp::Ordering;
use std::collections::HashMap;

use log::{debug, trace};
use smallvec::SmallVec;

use crate::basics::{BooleanOp, ButtType, FillRule, JoinType, PointD, PI};
use crate::math::{calc_segment_params, calc_segment_point_sq_distance, calc_segment_point_u};
use crate::path_stroke::StrokeStyle;
use crate::shape::{EdgeBackData, Shape, ShapeKind};

/// Vertex snapping grid: coordinates are rounded to multiples of
/// `2^-VERTEX_SNAP_SHIFT`.
pub const VERTEX_SNAP_SHIFT: u32 = 16;

const SNAP_SCALE: f64 = (1u64 << VERTEX_SNAP_SHIFT) as f64;

/// Distance under which a point is considered to lie on a segment.
const SNAP_TOLERANCE: f64 = 1.0 / SNAP_SCALE;

#[inline]
fn snap_key(p: PointD) -> (i64, i64) {
    ((p.x * SNAP_SCALE).round() as i64, (p.y * SNAP_SCALE).round() as i64)
}

#[inline]
fn snap(p: PointD) -> PointD {
    let (x, y) = snap_key(p);
    PointD::new(x as f64 / SNAP_SCALE, y as f64 / SNAP_SCALE)
}

// ============================================================================
// Arrangement
// ============================================================================

/// Input segment with its winding weight per operand and the cut points
/// found on it.
struct Segment {
    a: PointD,
    b: PointD,
    wa: i32,
    wb: i32,
    back: Option<EdgeBackData>,
    splits: SmallVec<[(f64, PointD); 4]>,
}

impl Segment {
    fn min_x(&self) -> f64 {
        self.a.x.min(self.b.x)
    }
    fn max_x(&self) -> f64 {
        self.a.x.max(self.b.x)
    }
    fn y_overlaps(&self, o: &Segment) -> bool {
        self.a.y.min(self.b.y) <= o.a.y.max(o.b.y) + SNAP_TOLERANCE
            && o.a.y.min(o.b.y) <= self.a.y.max(self.b.y) + SNAP_TOLERANCE
    }
}

/// Undirected edge stored from its lower to its higher vertex index, with
/// weights counted in that direction.
#[derive(Debug, Clone, Copy)]
struct MergedEdge {
    lo: usize,
    hi: usize,
    wa: i32,
    wb: i32,
    back: Option<EdgeBackData>,
}

#[derive(Default)]
struct Arrangement {
    points: Vec<PointD>,
    index: HashMap<(i64, i64), usize>,
    edges: Vec<MergedEdge>,
    edge_index: HashMap<(usize, usize), usize>,
}

impl Arrangement {
    fn vertex(&mut self, p: PointD) -> usize {
        let key = snap_key(p);
        if let Some(&v) = self.index.get(&key) {
            return v;
        }
        self.points.push(snap(p));
        self.index.insert(key, self.points.len() - 1);
        self.points.len() - 1
    }

    fn add(&mut self, from: usize, to: usize, wa: i32, wb: i32, back: Option<EdgeBackData>) {
        let (lo, hi, sign, back) = if from < to {
            (from, to, 1, back)
        } else {
            (to, from, -1, back.map(swap_back))
        };
        match self.edge_index.get(&(lo, hi)) {
            Some(&k) => {
                let e = &mut self.edges[k];
                e.wa += sign * wa;
                e.wb += sign * wb;
                if e.back.is_none() {
                    e.back = back;
                }
            }
            None => {
                self.edge_index.insert((lo, hi), self.edges.len());
                self.edges.push(MergedEdge {
                    lo,
                    hi,
                    wa: sign * wa,
                    wb: sign * wb,
                    back,
                });
            }
        }
    }
}

fn swap_back(mut bd: EdgeBackData) -> EdgeBackData {
    std::mem::swap(&mut bd.t_st, &mut bd.t_en);
    bd
}

fn gather(shape: &Shape, wa: i32, wb: i32, out: &mut Vec<Segment>) {
    for e in shape.edges() {
        let (a, b) = shape.edge_points(e);
        if !a.is_finite() || !b.is_finite() {
            trace!("skipping non-finite edge {:?} -> {:?}", a, b);
            continue;
        }
        let (a, b) = (snap(a), snap(b));
        if snap_key(a) == snap_key(b) {
            continue;
        }
        out.push(Segment {
            a,
            b,
            wa,
            wb,
            back: e.back,
            splits: SmallVec::new(),
        });
    }
}

/// Parameter of `q` on the interior of segment `a`→`b`, when `q` lies on it
/// and away from both ends.
fn interior_param(a: PointD, b: PointD, q: PointD) -> Option<f64> {
    if q.distance(a) <= SNAP_TOLERANCE || q.distance(b) <= SNAP_TOLERANCE {
        return None;
    }
    let u = calc_segment_point_u(a, b, q);
    if u <= 0.0 || u >= 1.0 {
        return None;
    }
    if calc_segment_point_sq_distance(a, b, q) <= SNAP_TOLERANCE * SNAP_TOLERANCE {
        Some(u)
    } else {
        None
    }
}

type Splits = SmallVec<[(f64, PointD); 4]>;

/// Cut points of two segments on each other: proper crossings, T-junctions
/// and the ends of collinear overlaps.
fn pair_splits(s1: &Segment, s2: &Segment) -> (Splits, Splits) {
    let mut c1 = Splits::new();
    let mut c2 = Splits::new();
    for q in [s2.a, s2.b] {
        if let Some(u) = interior_param(s1.a, s1.b, q) {
            c1.push((u, q));
        }
    }
    for q in [s1.a, s1.b] {
        if let Some(u) = interior_param(s2.a, s2.b, q) {
            c2.push((u, q));
        }
    }
    if let Some((t, u)) = calc_segment_params(s1.a, s1.b, s2.a, s2.b) {
        if t > 0.0 && t < 1.0 && u > 0.0 && u < 1.0 {
            let x = snap(s1.a.lerp(s1.b, t));
            let near_end = [s1.a, s1.b, s2.a, s2.b]
                .iter()
                .any(|&q| q.distance(x) <= SNAP_TOLERANCE);
            if !near_end {
                c1.push((t, x));
                c2.push((u, x));
            }
        }
    }
    (c1, c2)
}

/// Sweep the segments by x and record every cut point.
fn find_intersections(segs: &mut [Segment]) -> usize {
    let mut order: Vec<usize> = (0..segs.len()).collect();
    order.sort_by(|&i, &j| {
        segs[i]
            .min_x()
            .partial_cmp(&segs[j].min_x())
            .unwrap_or(Ordering::Equal)
    });
    let mut active: Vec<usize> = Vec::new();
    let mut count = 0;
    for &i in &order {
        let xi = segs[i].min_x();
        active.retain(|&j| segs[j].max_x() + SNAP_TOLERANCE >= xi);
        for &j in &active {
            if !segs[i].y_overlaps(&segs[j]) {
                continue;
            }
            let (ci, cj) = pair_splits(&segs[i], &segs[j]);
            count += ci.len() + cj.len();
            segs[i].splits.extend(ci);
            segs[j].splits.extend(cj);
        }
        active.push(i);
    }
    count
}

/// Cut every segment at its split points and merge the pieces.
fn build_arrangement(segs: &[Segment]) -> Arrangement {
    let mut arr = Arrangement::default();
    for seg in segs {
        let mut cuts: SmallVec<[(f64, PointD); 8]> = SmallVec::new();
        cuts.extend(seg.splits.iter().copied());
        cuts.push((1.0, seg.b));
        cuts.sort_by(|x, y| x.0.partial_cmp(&y.0).unwrap_or(Ordering::Equal));
        let mut prev_v = arr.vertex(seg.a);
        let mut prev_u = 0.0;
        for &(u, p) in &cuts {
            let v = arr.vertex(p);
            if v == prev_v {
                continue;
            }
            let back = seg.back.map(|bd| EdgeBackData {
                t_st: bd.t_st + (bd.t_en - bd.t_st) * prev_u,
                t_en: bd.t_st + (bd.t_en - bd.t_st) * u,
                ..bd
            });
            arr.add(prev_v, v, seg.wa, seg.wb, back);
            prev_v = v;
            prev_u = u;
        }
    }
    arr.edges.retain(|e| e.wa != 0 || e.wb != 0);
    arr
}

// ============================================================================
// Windings
// ============================================================================

/// Winding numbers on both sides of an edge, per operand.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Sides {
    left_a: i32,
    right_a: i32,
    left_b: i32,
    right_b: i32,
}

/// Lexicographic order on points: by x, then by y. Sweeping in this order
/// treats a vertical edge as leaning slightly right, so every edge has a
/// left end, a right end and a side below it.
fn lex_cmp(p: PointD, q: PointD) -> Ordering {
    p.x.total_cmp(&q.x).then_with(|| p.y.total_cmp(&q.y))
}

/// Height of the non-vertical segment `l`→`r` at `x`.
fn y_at(l: PointD, r: PointD, x: f64) -> f64 {
    if r.x == l.x {
        return l.y;
    }
    l.y + (x - l.x) * (r.y - l.y) / (r.x - l.x)
}

/// One arrangement edge as seen by the sweep.
#[derive(Debug, Clone, Copy)]
struct SweepEdge {
    left: usize,
    right: usize,
    /// Per-operand weights counted from the left end to the right end.
    wa: i32,
    wb: i32,
}

/// Winding numbers on both sides of every arrangement edge, from one sweep
/// over the vertices in lexicographic order. The active edges are kept
/// sorted bottom to top; an edge entering the sweep takes the winding
/// above the edge right under it as its own winding below. The
/// arrangement is planar, so active edges never swap places.
fn compute_sides(arr: &Arrangement) -> Vec<Sides> {
    let pts = &arr.points;
    let sweep: Vec<SweepEdge> = arr
        .edges
        .iter()
        .map(|e| {
            if lex_cmp(pts[e.lo], pts[e.hi]) == Ordering::Less {
                SweepEdge {
                    left: e.lo,
                    right: e.hi,
                    wa: e.wa,
                    wb: e.wb,
                }
            } else {
                SweepEdge {
                    left: e.hi,
                    right: e.lo,
                    wa: -e.wa,
                    wb: -e.wb,
                }
            }
        })
        .collect();

    let mut starts: Vec<SmallVec<[usize; 2]>> = vec![SmallVec::new(); pts.len()];
    let mut ends: Vec<SmallVec<[usize; 2]>> = vec![SmallVec::new(); pts.len()];
    for (k, e) in sweep.iter().enumerate() {
        starts[e.left].push(k);
        ends[e.right].push(k);
    }
    let mut order: Vec<usize> = (0..pts.len()).filter(|&v| !starts[v].is_empty() || !ends[v].is_empty()).collect();
    order.sort_by(|&u, &v| lex_cmp(pts[u], pts[v]));

    // Winding above each edge, per operand.
    let mut above = vec![(0i32, 0i32); sweep.len()];
    let mut below = vec![(0i32, 0i32); sweep.len()];
    let mut active: Vec<usize> = Vec::new();
    let mut max_active = 0;

    for v in order {
        let pv = pts[v];
        if !ends[v].is_empty() {
            active.retain(|k| sweep[*k].right != v);
        }
        if starts[v].is_empty() {
            continue;
        }
        let pos = active.partition_point(|&k| {
            let e = &sweep[k];
            y_at(pts[e.left], pts[e.right], pv.x) < pv.y
        });
        let mut fan: SmallVec<[usize; 4]> = starts[v].iter().copied().collect();
        // Bottom to top: increasing direction angle, vertical last.
        fan.sort_by(|&i, &j| {
            let (di, dj) = (pts[sweep[i].right] - pv, pts[sweep[j].right] - pv);
            di.y.atan2(di.x).total_cmp(&dj.y.atan2(dj.x))
        });
        let mut w = if pos > 0 { above[active[pos - 1]] } else { (0, 0) };
        for &k in &fan {
            below[k] = w;
            w = (w.0 + sweep[k].wa, w.1 + sweep[k].wb);
            above[k] = w;
        }
        active.splice(pos..pos, fan);
        max_active = max_active.max(active.len());
    }
    trace!(
        "winding sweep over {} edges, at most {} active",
        sweep.len(),
        max_active
    );

    // Crossing an edge from right to left adds its weight, so the side above
    // a left-to-right edge is its left side.
    arr.edges
        .iter()
        .enumerate()
        .map(|(k, e)| {
            let (up, down) = (above[k], below[k]);
            if sweep[k].left == e.lo {
                Sides {
                    left_a: up.0,
                    right_a: down.0,
                    left_b: up.1,
                    right_b: down.1,
                }
            } else {
                Sides {
                    left_a: down.0,
                    right_a: up.0,
                    left_b: down.1,
                    right_b: up.1,
                }
            }
        })
        .collect()
}

// ============================================================================
// Contour assembly
// ============================================================================

#[derive(Debug, Clone, Copy)]
struct Directed {
    from: usize,
    to: usize,
    back: Option<EdgeBackData>,
}

/// Clockwise angle from `r` to `d`, in `(0, 2π]`.
fn cw_angle(r: PointD, d: PointD) -> f64 {
    let mut a = -r.cross(d).atan2(r.dot(d));
    if a <= 0.0 {
        a += 2.0 * PI;
    }
    a
}

/// Chain directed edges into closed contours. At each vertex the walk
/// takes the sharpest left turn, so loops touching at a vertex come out
/// as separate contours.
fn assemble(points: &[PointD], kept: &[Directed]) -> Shape {
    let mut outgoing: Vec<SmallVec<[usize; 2]>> = vec![SmallVec::new(); points.len()];
    for (k, d) in kept.iter().enumerate() {
        outgoing[d.from].push(k);
    }
    let mut used = vec![false; kept.len()];
    let mut remap: Vec<Option<usize>> = vec![None; points.len()];
    let mut out = Shape::new();
    let mut contours = 0;

    for start in 0..kept.len() {
        if used[start] {
            continue;
        }
        used[start] = true;
        let mut chain = vec![start];
        let mut cur = start;
        loop {
            let v = kept[cur].to;
            let r = points[kept[cur].from] - points[v];
            let mut best: Option<(f64, usize)> = None;
            for &c in &outgoing[v] {
                if used[c] && c != start {
                    continue;
                }
                let a = cw_angle(r, points[kept[c].to] - points[v]);
                if best.map_or(true, |(ba, _)| a < ba) {
                    best = Some((a, c));
                }
            }
            match best {
                Some((_, c)) if c != start => {
                    used[c] = true;
                    chain.push(c);
                    cur = c;
                }
                _ => break,
            }
        }
        contours += 1;
        for &k in &chain {
            let d = kept[k];
            let st = *remap[d.from].get_or_insert_with(|| out.add_point(points[d.from]));
            let en = *remap[d.to].get_or_insert_with(|| out.add_point(points[d.to]));
            out.add_edge_with_back(st, en, d.back);
        }
    }
    out.set_kind(ShapeKind::Polygon);
    debug!(
        "assembled {} edges into {} contours",
        out.number_of_edges(),
        contours
    );
    out
}

// ============================================================================
// Entry points
// ============================================================================

fn resolve(a: &Shape, rule_a: FillRule, b: Option<&Shape>, rule_b: FillRule, op: BooleanOp) -> Shape {
    let mut segs = Vec::with_capacity(a.number_of_edges() + b.map_or(0, |b| b.number_of_edges()));
    gather(a, 1, 0, &mut segs);
    if let Some(b) = b {
        gather(b, 0, 1, &mut segs);
    }
    if segs.is_empty() {
        let mut out = Shape::new();
        out.set_kind(ShapeKind::Polygon);
        return out;
    }
    let cuts = find_intersections(&mut segs);
    let arr = build_arrangement(&segs);
    let sides = compute_sides(&arr);
    debug!(
        "boolean {:?}: {} segments, {} cuts, {} arrangement edges",
        op,
        segs.len(),
        cuts,
        arr.edges.len()
    );

    let mut kept = Vec::new();
    for (e, s) in arr.edges.iter().zip(&sides) {
        let forward = Directed {
            from: e.lo,
            to: e.hi,
            back: e.back,
        };
        let backward = Directed {
            from: e.hi,
            to: e.lo,
            back: e.back.map(swap_back),
        };
        if b.is_none() && rule_a == FillRule::JustDont {
            if e.wa > 0 {
                kept.push(forward);
            } else if e.wa < 0 {
                kept.push(backward);
            }
            continue;
        }
        let inside = |wa: i32, wb: i32| op.apply(rule_a.is_inside(wa), rule_b.is_inside(wb));
        let left = inside(s.left_a, s.left_b);
        let right = inside(s.right_a, s.right_b);
        if left != right {
            kept.push(if left { forward } else { backward });
        }
    }
    assemble(&arr.points, &kept)
}

impl Shape {
    /// Boolean combination of two shapes, both filled with the nonzero rule.
    pub fn booleen(a: &Shape, b: &Shape, op: BooleanOp) -> Shape {
        resolve(a, FillRule::NonZero, Some(b), FillRule::NonZero, op)
    }

    /// Boolean combination with an explicit fill rule per operand.
    pub fn booleen_with_rules(a: &Shape, rule_a: FillRule, b: &Shape, rule_b: FillRule, op: BooleanOp) -> Shape {
        resolve(a, rule_a, Some(b), rule_b, op)
    }

    /// Resolve the self-intersections of a raw shape under `rule`.
    pub fn convert_to_shape(src: &Shape, rule: FillRule) -> Shape {
        resolve(src, rule, None, FillRule::NonZero, BooleanOp::Union)
    }

    /// Grow (`distance > 0`) or shrink (`distance < 0`) a clean shape by
    /// stroking its boundary and combining the stroke with it.
    pub fn make_offset(src: &Shape, distance: f64, join: JoinType, miter: f64, tolerance: f64) -> Shape {
        if distance == 0.0 || src.is_empty() {
            return Shape::convert_to_shape(src, FillRule::NonZero);
        }
        let mut boundary = src.to_path();
        boundary.convert(tolerance);
        let mut style = StrokeStyle::new(2.0 * distance.abs());
        style.set_join(join);
        style.set_butt(ButtType::Butt);
        style.set_miter_limit(miter);
        style.set_tolerance(tolerance);
        let ring = boundary.stroke_to_shape(true, &style);
        let op = if distance > 0.0 {
            BooleanOp::Union
        } else {
            BooleanOp::Difference
        };
        Shape::booleen(src, &ring, op)
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

    fn polygon(pts: &[(f64, f64)]) -> Shape {
        let mut sh = Shape::new();
        let idx: Vec<usize> = pts.iter().map(|&(x, y)| sh.add_point(p(x, y))).collect();
        for i in 0..idx.len() {
            sh.add_edge(idx[i], idx[(i + 1) % idx.len()]);
        }
        sh
    }

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Shape {
        polygon(&[(x0, y0), (x1, y0), (x1, y1), (x0, y1)])
    }

    /// Every vertex has as many incoming as outgoing edges.
    fn is_balanced(sh: &Shape) -> bool {
        let mut deg = vec![0i32; sh.number_of_points()];
        for e in sh.edges() {
            deg[e.st] += 1;
            deg[e.en] -= 1;
        }
        deg.iter().all(|&d| d == 0)
    }

    #[test]
    fn test_snap() {
        let q = snap(p(0.1, -0.3));
        assert!((q.x - 0.1).abs() <= 0.5 / SNAP_SCALE);
        assert!((q.y + 0.3).abs() <= 0.5 / SNAP_SCALE);
        assert_eq!(snap(q), q);
    }

    #[test]
    fn test_cw_angle() {
        let r = p(0.0, -1.0);
        assert!((cw_angle(r, p(-1.0, 0.0)) - PI / 2.0).abs() < 1e-12);
        assert!((cw_angle(r, p(1.0, 0.0)) - 1.5 * PI).abs() < 1e-12);
        assert!((cw_angle(r, r) - 2.0 * PI).abs() < 1e-12);
    }

    #[test]
    fn test_union_overlapping_squares() {
        let a = rect(0.0, 0.0, 2.0, 2.0);
        let b = rect(1.0, 1.0, 3.0, 3.0);
        let u = Shape::booleen(&a, &b, BooleanOp::Union);
        assert_eq!(u.kind(), ShapeKind::Polygon);
        assert!((u.area() - 7.0).abs() < 1e-9);
        assert_eq!(u.number_of_edges(), 8);
        assert_eq!(u.contours().len(), 1);
        assert!(is_balanced(&u));
    }

    #[test]
    fn test_intersection_difference_xor() {
        let a = rect(0.0, 0.0, 2.0, 2.0);
        let b = rect(1.0, 1.0, 3.0, 3.0);
        let i = Shape::booleen(&a, &b, BooleanOp::Intersection);
        assert!((i.area() - 1.0).abs() < 1e-9);
        let d = Shape::booleen(&a, &b, BooleanOp::Difference);
        assert!((d.area() - 3.0).abs() < 1e-9);
        let x = Shape::booleen(&a, &b, BooleanOp::SymmetricDifference);
        assert!((x.area() - 6.0).abs() < 1e-9);
        assert!(x.is_inside(p(0.5, 0.5), FillRule::NonZero));
        assert!(!x.is_inside(p(1.5, 1.5), FillRule::NonZero));
    }

    #[test]
    fn test_disjoint_and_empty() {
        let a = rect(0.0, 0.0, 1.0, 1.0);
        let b = rect(5.0, 5.0, 6.0, 6.0);
        assert!(Shape::booleen(&a, &b, BooleanOp::Intersection).is_empty());
        let u = Shape::booleen(&a, &b, BooleanOp::Union);
        assert_eq!(u.contours().len(), 2);
        assert!((u.area() - 2.0).abs() < 1e-12);
        let e = Shape::booleen(&Shape::new(), &Shape::new(), BooleanOp::Union);
        assert!(e.is_empty());
        assert_eq!(e.kind(), ShapeKind::Polygon);
    }

    #[test]
    fn test_shared_edge_union() {
        let a = rect(0.0, 0.0, 1.0, 1.0);
        let b = rect(1.0, 0.0, 2.0, 1.0);
        let u = Shape::booleen(&a, &b, BooleanOp::Union);
        assert!((u.area() - 2.0).abs() < 1e-12);
        // The shared side disappears.
        assert!(u
            .edges()
            .iter()
            .all(|e| !(u.point(e.st).x == 1.0 && u.point(e.en).x == 1.0)));
    }

    #[test]
    fn test_t_junction_overlap() {
        let a = rect(0.0, 0.0, 4.0, 1.0);
        let b = rect(1.0, 1.0, 2.0, 2.0);
        let u = Shape::booleen(&a, &b, BooleanOp::Union);
        assert!((u.area() - 5.0).abs() < 1e-12);
        assert_eq!(u.contours().len(), 1);
        assert!(is_balanced(&u));
    }

    #[test]
    fn test_clockwise_input_is_reoriented() {
        let cw = polygon(&[(0.0, 0.0), (0.0, 2.0), (2.0, 2.0), (2.0, 0.0)]);
        let r = Shape::convert_to_shape(&cw, FillRule::NonZero);
        assert!((r.area() - 4.0).abs() < 1e-12);
        let pos = Shape::convert_to_shape(&cw, FillRule::Positive);
        assert!(pos.is_empty());
    }

    #[test]
    fn test_self_intersecting_bowtie() {
        let bow = polygon(&[(0.0, 0.0), (2.0, 2.0), (2.0, 0.0), (0.0, 2.0)]);
        let r = Shape::convert_to_shape(&bow, FillRule::NonZero);
        assert!((r.area() - 2.0).abs() < 1e-9);
        assert_eq!(r.contours().len(), 2);
    }

    #[test]
    fn test_fill_rules_on_nested_squares() {
        let mut sh = rect(0.0, 0.0, 4.0, 4.0);
        let inner = rect(1.0, 1.0, 3.0, 3.0);
        let base = sh.number_of_points();
        for q in inner.points() {
            sh.add_point(*q);
        }
        for e in inner.edges() {
            sh.add_edge(e.st + base, e.en + base);
        }
        let nz = Shape::convert_to_shape(&sh, FillRule::NonZero);
        assert!((nz.area() - 16.0).abs() < 1e-12);
        let eo = Shape::convert_to_shape(&sh, FillRule::OddEven);
        assert!((eo.area() - 12.0).abs() < 1e-12);
        assert!(!eo.is_inside(p(2.0, 2.0), FillRule::NonZero));
        let jd = Shape::convert_to_shape(&sh, FillRule::JustDont);
        assert_eq!(jd.number_of_edges(), 8);
    }

    #[test]
    fn test_touching_corners_split_into_loops() {
        let a = rect(0.0, 0.0, 1.0, 1.0);
        let b = rect(1.0, 1.0, 2.0, 2.0);
        let u = Shape::booleen(&a, &b, BooleanOp::Union);
        assert_eq!(u.contours().len(), 2);
        for c in u.contours() {
            assert_eq!(c.len(), 4);
        }
    }

    #[test]
    fn test_back_data_survives_split() {
        let bd = EdgeBackData {
            path_id: 0,
            piece: 1,
            t_st: 0.0,
            t_en: 1.0,
            offset: 0.0,
        };
        let mut a = Shape::new();
        let s = a.add_point(p(0.0, 0.0));
        let e = a.add_point(p(4.0, 0.0));
        let c = a.add_point(p(4.0, 1.0));
        let d = a.add_point(p(0.0, 1.0));
        a.add_edge_with_back(s, e, Some(bd));
        a.add_edge(e, c);
        a.add_edge(c, d);
        a.add_edge(d, s);
        let b = rect(1.0, -1.0, 2.0, 0.5);
        let r = Shape::booleen(&a, &b, BooleanOp::Difference);
        let mut ranges: Vec<(f64, f64)> = r
            .edges()
            .iter()
            .filter_map(|e| e.back)
            .map(|bd| (bd.t_st, bd.t_en))
            .collect();
        ranges.sort_by(|x, y| x.0.partial_cmp(&y.0).unwrap());
        assert_eq!(ranges.len(), 2);
        assert!((ranges[0].0 - 0.0).abs() < 1e-9 && (ranges[0].1 - 0.25).abs() < 1e-9);
        assert!((ranges[1].0 - 0.5).abs() < 1e-9 && (ranges[1].1 - 1.0).abs() < 1e-9);
    }

    fn circle(cx: f64, r: f64, n: usize) -> Shape {
        let pts: Vec<(f64, f64)> = (0..n)
            .map(|k| {
                let a = 2.0 * PI * k as f64 / n as f64;
                (cx + r * a.cos(), r * a.sin())
            })
            .collect();
        polygon(&pts)
    }

    #[test]
    fn test_union_of_dense_circles() {
        // 30k input edges; the winding pass is one sweep over them.
        let a = circle(0.0, 100.0, 15_000);
        let b = circle(50.0, 100.0, 15_000);
        let u = Shape::booleen(&a, &b, BooleanOp::Union);
        let (r, d) = (100.0f64, 50.0f64);
        let lens = 2.0 * r * r * (d / (2.0 * r)).acos() - 0.5 * d * (4.0 * r * r - d * d).sqrt();
        let expected = 2.0 * PI * r * r - lens;
        assert!((u.area() - expected).abs() / expected < 1e-4);
        assert_eq!(u.contours().len(), 1);
        assert!(is_balanced(&u));
    }

    #[test]
    fn test_sweep_sides_with_vertical_edges() {
        // Square with a hole: every edge is vertical or horizontal.
        let mut sh = rect(0.0, 0.0, 4.0, 4.0);
        let hole = polygon(&[(1.0, 1.0), (1.0, 3.0), (3.0, 3.0), (3.0, 1.0)]);
        let base = sh.number_of_points();
        for q in hole.points() {
            sh.add_point(*q);
        }
        for e in hole.edges() {
            sh.add_edge(e.st + base, e.en + base);
        }
        let mut segs = Vec::new();
        gather(&sh, 1, 0, &mut segs);
        find_intersections(&mut segs);
        let arr = build_arrangement(&segs);
        let sides = compute_sides(&arr);
        for (e, s) in arr.edges.iter().zip(&sides) {
            assert_eq!(s.left_a - s.right_a, e.wa);
            assert_eq!(s.left_b, 0);
            // Outer sides are 0, the ring is 1, the hole is back to 0.
            assert!(s.left_a.min(s.right_a) == 0 && s.left_a.max(s.right_a) == 1);
        }
        let r = Shape::convert_to_shape(&sh, FillRule::NonZero);
        assert!((r.area() - 12.0).abs() < 1e-12);
    }

    #[test]
    fn test_make_offset_grows_and_shrinks() {
        let sq = rect(0.0, 0.0, 10.0, 10.0);
        let grown = Shape::make_offset(&sq, 1.0, JoinType::Miter, 4.0, 0.01);
        assert!((grown.area() - 144.0).abs() < 1e-6);
        let shrunk = Shape::make_offset(&sq, -1.0, JoinType::Miter, 4.0, 0.01);
        assert!((shrunk.area() - 64.0).abs() < 1e-6);
    }
}

//! Randomized geometric properties of the kernel, each run on a seeded
//! generator so failures reproduce.

use livarot::basics::{BooleanOp, ButtType, FillRule, JoinType, PointD, PI};
use livarot::float_ligne::FloatLigne;
use livarot::int_ligne::IntLigne;
use livarot::math::calc_segment_point_sq_distance;
use livarot::path::Path;
use livarot::path_stroke::StrokeStyle;
use livarot::shape::Shape;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn p(x: f64, y: f64) -> PointD {
    PointD::new(x, y)
}

fn rand_point(rng: &mut StdRng, lo: f64, hi: f64) -> PointD {
    p(rng.gen_range(lo..hi), rng.gen_range(lo..hi))
}

fn polyline_points(path: &Path) -> Vec<PointD> {
    path.polyline().points().iter().map(|q| q.p).collect()
}

fn distance_to_polyline(pts: &[PointD], q: PointD) -> f64 {
    pts.windows(2)
        .map(|w| calc_segment_point_sq_distance(w[0], w[1], q))
        .fold(f64::MAX, f64::min)
        .sqrt()
}

/// Largest distance from the sampled piece `piece` of `path` to its
/// flattening.
fn max_deviation(path: &Path, piece: usize) -> f64 {
    let pts = polyline_points(path);
    (0..=400)
        .map(|k| {
            let q = path.point_at(piece, k as f64 / 400.0).unwrap();
            distance_to_polyline(&pts, q)
        })
        .fold(0.0, f64::max)
}

fn rect_shape(x: f64, y: f64, w: f64, h: f64) -> Shape {
    let mut path = Path::new();
    path.move_to(p(x, y));
    path.line_to(p(x + w, y));
    path.line_to(p(x + w, y + h));
    path.line_to(p(x, y + h));
    path.close().unwrap();
    path.convert(0.1);
    let mut raw = Shape::new();
    path.fill(&mut raw, None, false, true, false);
    Shape::convert_to_shape(&raw, FillRule::NonZero)
}

/// Rectangle on a 1/8 grid, so every area below is exact.
fn rand_rect(rng: &mut StdRng) -> (Shape, f64) {
    let x = rng.gen_range(0..60) as f64 / 8.0;
    let y = rng.gen_range(0..60) as f64 / 8.0;
    let w = rng.gen_range(4..40) as f64 / 8.0;
    let h = rng.gen_range(4..40) as f64 / 8.0;
    (rect_shape(x, y, w, h), w * h)
}

// ============================================================================
// Flattening
// ============================================================================

#[test]
fn test_cubic_flatness_bound() {
    let mut rng = StdRng::seed_from_u64(11);
    for &tol in &[0.5, 0.1, 0.01] {
        for _ in 0..40 {
            let mut path = Path::new();
            path.move_to(rand_point(&mut rng, 0.0, 100.0));
            path.cubic_to(
                rand_point(&mut rng, 0.0, 100.0),
                rand_point(&mut rng, -300.0, 300.0),
                rand_point(&mut rng, -300.0, 300.0),
            );
            path.convert(tol);
            assert!(max_deviation(&path, 1) <= tol + 1e-9);
        }
    }
}

#[test]
fn test_arc_flatness_bound() {
    let mut rng = StdRng::seed_from_u64(12);
    for &tol in &[0.5, 0.05] {
        for _ in 0..40 {
            let mut path = Path::new();
            path.move_to(rand_point(&mut rng, 0.0, 100.0));
            path.arc_to(
                rand_point(&mut rng, 0.0, 100.0),
                rng.gen_range(5.0..80.0),
                rng.gen_range(5.0..80.0),
                rng.gen_range(0.0..180.0),
                rng.gen_bool(0.5),
                rng.gen_bool(0.5),
            );
            path.convert(tol);
            assert!(max_deviation(&path, 1) <= tol * 1.0001 + 1e-9);
        }
    }
}

#[test]
fn test_convert_is_idempotent() {
    let mut rng = StdRng::seed_from_u64(13);
    let mut path = Path::new();
    path.move_to(rand_point(&mut rng, 0.0, 50.0));
    for _ in 0..10 {
        path.cubic_to(
            rand_point(&mut rng, 0.0, 50.0),
            rand_point(&mut rng, -100.0, 100.0),
            rand_point(&mut rng, -100.0, 100.0),
        );
        path.arc_to(rand_point(&mut rng, 0.0, 50.0), 20.0, 10.0, 30.0, false, true);
    }
    path.close().unwrap();
    path.convert_with_back_data(0.05);
    let first = path.polyline().clone();
    path.convert_with_back_data(0.05);
    assert_eq!(&first, path.polyline());
}

// ============================================================================
// Boolean operations
// ============================================================================

#[test]
fn test_boolean_area_laws() {
    let mut rng = StdRng::seed_from_u64(21);
    for _ in 0..30 {
        let (a, area_a) = rand_rect(&mut rng);
        let (b, area_b) = rand_rect(&mut rng);
        let union = Shape::booleen(&a, &b, BooleanOp::Union).area();
        let inter = Shape::booleen(&a, &b, BooleanOp::Intersection).area();
        let diff = Shape::booleen(&a, &b, BooleanOp::Difference).area();
        let xor = Shape::booleen(&a, &b, BooleanOp::SymmetricDifference).area();

        assert!(union >= area_a.max(area_b) - 1e-9);
        assert!(inter <= area_a.min(area_b) + 1e-9);
        assert!((union + inter - area_a - area_b).abs() < 1e-9);
        assert!((diff - (area_a - inter)).abs() < 1e-9);
        assert!((xor - (union - inter)).abs() < 1e-9);
        assert!(Shape::booleen(&a, &a, BooleanOp::Difference).is_empty());

        // (A ∪ B) \ A covers the same area as B \ A.
        let u = Shape::booleen(&a, &b, BooleanOp::Union);
        let lhs = Shape::booleen(&u, &a, BooleanOp::Difference).area();
        let rhs = Shape::booleen(&b, &a, BooleanOp::Difference).area();
        assert!((lhs - rhs).abs() < 1e-9);
    }
}

#[test]
fn test_boolean_commutes() {
    let mut rng = StdRng::seed_from_u64(22);
    for _ in 0..20 {
        let (a, _) = rand_rect(&mut rng);
        let (b, _) = rand_rect(&mut rng);
        for op in [BooleanOp::Union, BooleanOp::Intersection, BooleanOp::SymmetricDifference] {
            let ab = Shape::booleen(&a, &b, op).area();
            let ba = Shape::booleen(&b, &a, op).area();
            assert!((ab - ba).abs() < 1e-9);
        }
    }
}

// ============================================================================
// Stroking
// ============================================================================

#[test]
fn test_segment_stroke_area() {
    let mut rng = StdRng::seed_from_u64(31);
    for _ in 0..10 {
        let s = rand_point(&mut rng, 0.0, 50.0);
        let e = rand_point(&mut rng, 0.0, 50.0);
        let len = s.distance(e);
        if len < 1.0 {
            continue;
        }
        let w = rng.gen_range(0.5..4.0);
        let mut path = Path::new();
        path.move_to(s);
        path.line_to(e);
        path.convert(0.01);
        let mut style = StrokeStyle::new(w);
        style.set_butt(ButtType::Round);
        style.set_join(JoinType::Round);
        style.set_tolerance(0.0005);
        let area = path.stroke_to_shape(false, &style).area();
        let expected = len * w + PI * w * w / 4.0;
        assert!((area - expected).abs() / expected < 0.01);
    }
}

#[test]
fn test_unit_square_miter_stroke() {
    let mut path = Path::new();
    path.move_to(p(0.0, 0.0));
    path.line_to(p(1.0, 0.0));
    path.line_to(p(1.0, 1.0));
    path.line_to(p(0.0, 1.0));
    path.close().unwrap();
    path.convert(0.001);
    let mut style = StrokeStyle::new(0.1);
    style.set_join(JoinType::Miter);
    style.set_butt(ButtType::Butt);
    let area = path.stroke_to_shape(false, &style).area();
    // Ring between the squares of side 1.1 and 0.9.
    let expected = 1.1 * 1.1 - 0.9 * 0.9;
    assert!((area - expected).abs() / expected < 0.01);
}

// ============================================================================
// Coverage
// ============================================================================

#[test]
fn test_int_copy_conserves_float_coverage() {
    let mut rng = StdRng::seed_from_u64(41);
    for _ in 0..30 {
        let mut raw = Shape::new();
        let ids: Vec<usize> = (0..3).map(|_| raw.add_point(rand_point(&mut rng, 0.0, 10.0))).collect();
        for k in 0..3 {
            raw.add_edge(ids[k], ids[(k + 1) % 3]);
        }
        let sh = Shape::convert_to_shape(&raw, FillRule::NonZero);
        if sh.is_empty() {
            continue;
        }
        let y0 = rng.gen_range(0.0..9.0);
        let mut fl = FloatLigne::new();
        sh.scan_float(&mut fl, y0, y0 + 1.0);
        fl.flatten();
        let mut il = IntLigne::new();
        il.copy_float(&fl);
        assert!((il.total_coverage() - fl.coverage_length()).abs() < 1e-4);
    }
}

#[test]
fn test_exact_raster_matches_area() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..10 {
        let (sh, area) = rand_rect(&mut rng);
        let px = sh.rasterize(16, 16, livarot::shape_raster::RasterMode::Exact);
        let total: f64 = px.iter().map(|&v| v as f64).sum();
        assert!((total - area).abs() < 1e-3);
    }
}

// ============================================================================
// Simplification
// ============================================================================

#[test]
fn test_simplify_stays_near_flattening() {
    let tol = 0.1;
    let mut path = Path::new();
    path.move_to(p(0.0, 0.0));
    path.cubic_to(p(20.0, 0.0), p(30.0, 40.0), p(30.0, -40.0));
    path.cubic_to(p(40.0, 10.0), p(10.0, 30.0), p(0.0, 20.0));
    path.arc_to(p(60.0, 10.0), 15.0, 15.0, 0.0, false, true);
    path.convert(tol * 0.25);
    let original = polyline_points(&path);

    let mut simplified = path.clone();
    simplified.simplify(tol);
    assert!(simplified.descr_count() < path.polyline().len());
    simplified.convert(tol);
    let refit = polyline_points(&simplified);

    for &q in &refit {
        assert!(distance_to_polyline(&original, q) <= 3.0 * tol);
    }
    for &q in &original {
        assert!(distance_to_polyline(&refit, q) <= 3.0 * tol);
    }
}

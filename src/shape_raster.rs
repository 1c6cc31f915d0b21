//! Scan conversion of shapes into coverage lines.
//!
//! `scan_float` measures, for a horizontal band, how much of the band's
//! height is inside the shape at every x. Each edge contributes a ramp
//! over its x extent within the band followed by a constant step, and the
//! steps of a closed polygon cancel right of its bounding box. The result
//! is exact for clean polygons, whose winding is 0 or 1 everywhere.
//!
//! `scan_bits` samples one horizontal line under any fill rule, for
//! supersampled rendering.

use log::debug;

use crate::basics::FillRule;
use crate::bit_ligne::BitLigne;
use crate::float_ligne::FloatLigne;
use crate::int_ligne::IntLigne;
use crate::shape::{Shape, ShapeKind};

/// How `rasterize` computes pixel coverage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterMode {
    /// Exact area coverage through float and integer lines.
    Exact,
    /// `n` by `n` samples per pixel through bit lines.
    Supersampled(u32),
}

impl Default for RasterMode {
    fn default() -> Self {
        RasterMode::Exact
    }
}

impl Shape {
    /// Add the bords of the band between `y_top` and `y_bottom` to `line`.
    /// Values are fractions of the band height, so after `flatten` the
    /// line holds the coverage of that band. The shape must be a clean
    /// polygon.
    pub fn scan_float(&self, line: &mut FloatLigne, y_top: f64, y_bottom: f64) {
        let (y0, y1) = if y_top <= y_bottom { (y_top, y_bottom) } else { (y_bottom, y_top) };
        let h = y1 - y0;
        let x_max = match self.bounds() {
            Some(b) if h > 0.0 => b.x2,
            _ => return,
        };
        for e in self.edges() {
            let (a, b) = self.edge_points(e);
            if a.y == b.y {
                continue;
            }
            let ya = a.y.min(b.y).max(y0);
            let yb = a.y.max(b.y).min(y1);
            if yb <= ya {
                continue;
            }
            let x_at = |y: f64| a.x + (b.x - a.x) * (y - a.y) / (b.y - a.y);
            let (xa, xb) = (x_at(ya), x_at(yb));
            let (lo, hi) = if xa <= xb { (xa, xb) } else { (xb, xa) };
            // Left of a downward edge the winding drops by one.
            let s = if b.y < a.y { 1.0 } else { -1.0 };
            let v = s * (yb - ya) / h;
            line.add_bord(lo, 0.0, hi, v);
            line.add_bord(hi, v, x_max, v);
        }
    }

    /// Set the bits of `line` where the horizontal line at `y` is inside the
    /// shape under `rule`.
    pub fn scan_bits(&self, line: &mut BitLigne, y: f64, rule: FillRule) {
        let mut crossings: Vec<(f64, i32)> = Vec::new();
        for e in self.edges() {
            let (a, b) = self.edge_points(e);
            let s = if a.y <= y && y < b.y {
                -1
            } else if b.y <= y && y < a.y {
                1
            } else {
                continue;
            };
            let x = a.x + (b.x - a.x) * (y - a.y) / (b.y - a.y);
            crossings.push((x, s));
        }
        crossings.sort_by(|p, q| p.0.total_cmp(&q.0));
        let mut w = 0;
        for k in 0..crossings.len() {
            w += crossings[k].1;
            if rule.is_inside(w) {
                if let Some(next) = crossings.get(k + 1) {
                    line.add_bord(crossings[k].0, next.0);
                }
            }
        }
    }

    /// Coverage of the pixels of a `width` by `height` grid, row-major, pixel
    /// `(x, y)` covering `[x, x + 1) x [y, y + 1)`. Shapes that are not yet
    /// clean polygons are resolved with the nonzero rule first.
    pub fn rasterize(&self, width: usize, height: usize, mode: RasterMode) -> Vec<f32> {
        let mut out = vec![0.0f32; width * height];
        if width == 0 || height == 0 || self.is_empty() {
            return out;
        }
        let resolved;
        let shape = if self.kind() == ShapeKind::Polygon {
            self
        } else {
            resolved = Shape::convert_to_shape(self, FillRule::NonZero);
            &resolved
        };
        let bounds = match shape.bounds() {
            Some(b) => b,
            None => return out,
        };
        let w = i32::try_from(width).unwrap_or(i32::MAX);
        let mut il = IntLigne::new();
        let rows = out.chunks_mut(width).enumerate();
        match mode {
            RasterMode::Exact => {
                let mut fl = FloatLigne::new();
                for (row, dest) in rows {
                    let y0 = row as f64;
                    if y0 + 1.0 <= bounds.y1 || y0 >= bounds.y2 {
                        continue;
                    }
                    fl.reset();
                    shape.scan_float(&mut fl, y0, y0 + 1.0);
                    fl.flatten();
                    il.copy_float(&fl);
                    il.raster(dest, 0);
                }
            }
            RasterMode::Supersampled(n) => {
                let n = n.max(1);
                let mut lines: Vec<BitLigne> = (0..n).map(|_| BitLigne::new(0, w, n)).collect();
                for (row, dest) in rows {
                    let y0 = row as f64;
                    if y0 + 1.0 <= bounds.y1 || y0 >= bounds.y2 {
                        continue;
                    }
                    for (k, line) in lines.iter_mut().enumerate() {
                        line.reset();
                        let y = y0 + (k as f64 + 0.5) / n as f64;
                        shape.scan_bits(line, y, FillRule::NonZero);
                    }
                    il.copy_bit_lines(&lines);
                    il.raster(dest, 0);
                }
            }
        }
        debug!(
            "rasterized {} edges into {}x{} pixels ({:?})",
            shape.number_of_edges(),
            width,
            height,
            mode
        );
        out
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basics::PointD;

    fn polygon(pts: &[(f64, f64)]) -> Shape {
        let mut sh = Shape::new();
        let ids: Vec<usize> = pts.iter().map(|&(x, y)| sh.add_point(PointD::new(x, y))).collect();
        for k in 0..ids.len() {
            sh.add_edge(ids[k], ids[(k + 1) % ids.len()]);
        }
        sh
    }

    fn total(px: &[f32]) -> f64 {
        px.iter().map(|&v| v as f64).sum()
    }

    #[test]
    fn test_pixel_aligned_square() {
        let sh = polygon(&[(1.0, 1.0), (3.0, 1.0), (3.0, 3.0), (1.0, 3.0)]);
        let px = sh.rasterize(4, 4, RasterMode::Exact);
        for y in 0..4 {
            for x in 0..4 {
                let inside = (1..3).contains(&x) && (1..3).contains(&y);
                let want = if inside { 1.0 } else { 0.0 };
                assert!((px[y * 4 + x] - want).abs() < 1e-5, "pixel {} {}", x, y);
            }
        }
    }

    #[test]
    fn test_half_pixel_square() {
        let sh = polygon(&[(0.5, 0.5), (2.5, 0.5), (2.5, 2.5), (0.5, 2.5)]);
        let px = sh.rasterize(3, 3, RasterMode::Exact);
        assert!((px[0] - 0.25).abs() < 1e-5);
        assert!((px[1] - 0.5).abs() < 1e-5);
        assert!((px[4] - 1.0).abs() < 1e-5);
        assert!((total(&px) - 4.0).abs() < 1e-4);
    }

    #[test]
    fn test_triangle_area_exact_and_supersampled() {
        let sh = polygon(&[(0.0, 0.0), (4.0, 0.0), (0.0, 4.0)]);
        let exact = sh.rasterize(5, 5, RasterMode::Exact);
        assert!((total(&exact) - 8.0).abs() < 1e-4);
        // Pixel (1, 1) is cut by the hypotenuse through its corners.
        assert!((exact[5 + 1] - 1.0).abs() < 1e-5);
        assert!((exact[5 * 2 + 1] - 0.5).abs() < 1e-5);

        // Samples on the hypotenuse fall outside, so the estimate runs low.
        let ss = sh.rasterize(5, 5, RasterMode::Supersampled(16));
        assert!((total(&ss) - 8.0).abs() < 0.2);
    }

    #[test]
    fn test_scan_float_band() {
        let sh = polygon(&[(0.0, 0.0), (4.0, 0.0), (4.0, 1.0), (0.0, 1.0)]);
        let mut fl = FloatLigne::new();
        sh.scan_float(&mut fl, 0.5, 2.0);
        fl.flatten();
        // A third of the band's height, over four units.
        assert!((fl.coverage_length() - 4.0 / 3.0).abs() < 1e-9);
        assert_eq!(fl.span(), Some((0.0, 4.0)));
    }

    #[test]
    fn test_scan_bits_fill_rules() {
        let mut sh = polygon(&[(0.0, 0.0), (2.0, 0.0), (2.0, 2.0), (0.0, 2.0)]);
        let b = polygon(&[(1.0, 0.0), (3.0, 0.0), (3.0, 2.0), (1.0, 2.0)]);
        let base = sh.number_of_points();
        for p in b.points() {
            sh.add_point(*p);
        }
        for e in b.edges() {
            sh.add_edge(e.st + base, e.en + base);
        }

        let mut line = BitLigne::new(0, 3, 4);
        sh.scan_bits(&mut line, 0.5, FillRule::OddEven);
        assert_eq!(line.count_in_pixel(0), 4);
        assert_eq!(line.count_in_pixel(1), 0);
        assert_eq!(line.count_in_pixel(2), 4);

        line.reset();
        sh.scan_bits(&mut line, 0.5, FillRule::NonZero);
        assert!((0..3).all(|x| line.count_in_pixel(x) == 4));
    }

    #[test]
    fn test_empty_shape_raster() {
        let px = Shape::new().rasterize(2, 2, RasterMode::Supersampled(4));
        assert_eq!(px, vec![0.0; 4]);
        assert!(Shape::new().rasterize(0, 3, RasterMode::Exact).is_empty());
    }
}

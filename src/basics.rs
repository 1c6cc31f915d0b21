//! Foundation types, constants, and the small enums every other module uses.
//!
//! Points, rectangles, rounding helpers, coverage constants, and the
//! vocabulary shared by paths, shapes and scanlines: fill rules, boolean
//! operators, join and cap styles.

use core::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

// ============================================================================
// Rounding and conversion functions
// ============================================================================

/// Round a double to the nearest integer (round half away from zero).
#[inline]
pub fn iround(v: f64) -> i32 {
    if v < 0.0 {
        (v - 0.5) as i32
    } else {
        (v + 0.5) as i32
    }
}

/// Floor a double to the nearest integer toward negative infinity.
#[inline]
pub fn ifloor(v: f64) -> i32 {
    let i = v as i32;
    i - (i as f64 > v) as i32
}

// ============================================================================
// Coverage output
// ============================================================================

/// The type used for 8-bit coverage output.
pub type CoverType = u8;

/// Full coverage in 8-bit output.
pub const COVER_FULL: CoverType = 255;

// ============================================================================
// Mathematical constants
// ============================================================================

pub const PI: f64 = std::f64::consts::PI;

/// Convert degrees to radians.
#[inline]
pub fn deg2rad(deg: f64) -> f64 {
    deg * PI / 180.0
}

/// Convert radians to degrees.
#[inline]
pub fn rad2deg(rad: f64) -> f64 {
    rad * 180.0 / PI
}

// ============================================================================
// Fill rule, boolean operator, join and cap styles
// ============================================================================

/// How a winding number decides insideness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FillRule {
    /// Inside when the winding number is odd.
    OddEven,
    /// Inside when the winding number is not zero.
    #[default]
    NonZero,
    /// Inside when the winding number is strictly positive.
    Positive,
    /// No fill resolution: every edge with a nonzero net weight is kept.
    JustDont,
}

impl FillRule {
    /// Whether a region with winding number `w` is filled.
    #[inline]
    pub fn is_inside(self, w: i32) -> bool {
        match self {
            FillRule::OddEven => w & 1 != 0,
            FillRule::NonZero | FillRule::JustDont => w != 0,
            FillRule::Positive => w > 0,
        }
    }
}

/// Boolean set operator, shared by shapes and coverage lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BooleanOp {
    Union,
    Intersection,
    Difference,
    SymmetricDifference,
}

impl BooleanOp {
    /// Combine the insideness of the two operands.
    #[inline]
    pub fn apply(self, a: bool, b: bool) -> bool {
        match self {
            BooleanOp::Union => a || b,
            BooleanOp::Intersection => a && b,
            BooleanOp::Difference => a && !b,
            BooleanOp::SymmetricDifference => a != b,
        }
    }
}

/// Join style at stroke and outline corners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinType {
    /// Straight segment between the two offset points.
    Bevel,
    /// Circular arc around the corner.
    Round,
    /// Sharp corner, falling back to a bevel past the miter limit.
    #[default]
    Miter,
    /// Sharp corner, clipped at the miter limit instead of beveled.
    Extrapolated,
    /// Sharp corner, falling back to a round join past the miter limit.
    Reflected,
}

/// Cap style at the ends of open subpaths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ButtType {
    #[default]
    Butt,
    Round,
    Square,
}

// ============================================================================
// Rect
// ============================================================================

/// A rectangle defined by two corner points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect<T: Copy> {
    pub x1: T,
    pub y1: T,
    pub x2: T,
    pub y2: T,
}

impl<T: Copy + PartialOrd> Rect<T> {
    pub fn new(x1: T, y1: T, x2: T, y2: T) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Returns `true` if the rectangle is valid (non-empty).
    pub fn is_valid(&self) -> bool {
        self.x1 <= self.x2 && self.y1 <= self.y2
    }

    /// Returns `true` if this rectangle overlaps with `r`.
    pub fn overlaps(&self, r: &Self) -> bool {
        !(r.x1 > self.x2 || r.x2 < self.x1 || r.y1 > self.y2 || r.y2 < self.y1)
    }
}

impl Rect<f64> {
    /// An inverted rectangle that any `expand` call will overwrite.
    pub fn empty() -> Self {
        Self::new(f64::MAX, f64::MAX, f64::MIN, f64::MIN)
    }

    /// Grow to include `p`.
    pub fn expand(&mut self, p: PointD) {
        self.x1 = self.x1.min(p.x);
        self.y1 = self.y1.min(p.y);
        self.x2 = self.x2.max(p.x);
        self.y2 = self.y2.max(p.y);
    }
}

/// Rectangle with `f64` coordinates.
pub type RectD = Rect<f64>;

// ============================================================================
// Point
// ============================================================================

/// A 2D point.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PointBase<T: Copy> {
    pub x: T,
    pub y: T,
}

impl<T: Copy> PointBase<T> {
    pub fn new(x: T, y: T) -> Self {
        Self { x, y }
    }
}

pub type PointD = PointBase<f64>;

impl PointD {
    pub const ZERO: PointD = PointD { x: 0.0, y: 0.0 };

    #[inline]
    pub fn dot(self, o: PointD) -> f64 {
        self.x * o.x + self.y * o.y
    }

    /// Z component of the 3D cross product; positive when `o` turns left of `self`.
    #[inline]
    pub fn cross(self, o: PointD) -> f64 {
        self.x * o.y - self.y * o.x
    }

    #[inline]
    pub fn length(self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    #[inline]
    pub fn sq_length(self) -> f64 {
        self.x * self.x + self.y * self.y
    }

    /// Unit vector in the same direction, or zero for a zero vector.
    #[inline]
    pub fn normalized(self) -> PointD {
        let l = self.length();
        if l > 0.0 {
            PointD::new(self.x / l, self.y / l)
        } else {
            PointD::ZERO
        }
    }

    /// Rotated a quarter turn counter-clockwise (the left normal in a y-up frame).
    #[inline]
    pub fn perp(self) -> PointD {
        PointD::new(-self.y, self.x)
    }

    #[inline]
    pub fn distance(self, o: PointD) -> f64 {
        (o - self).length()
    }

    #[inline]
    pub fn lerp(self, o: PointD, t: f64) -> PointD {
        PointD::new(self.x + (o.x - self.x) * t, self.y + (o.y - self.y) * t)
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for PointD {
    type Output = PointD;
    #[inline]
    fn add(self, o: PointD) -> PointD {
        PointD::new(self.x + o.x, self.y + o.y)
    }
}

impl AddAssign for PointD {
    #[inline]
    fn add_assign(&mut self, o: PointD) {
        self.x += o.x;
        self.y += o.y;
    }
}

impl Sub for PointD {
    type Output = PointD;
    #[inline]
    fn sub(self, o: PointD) -> PointD {
        PointD::new(self.x - o.x, self.y - o.y)
    }
}

impl SubAssign for PointD {
    #[inline]
    fn sub_assign(&mut self, o: PointD) {
        self.x -= o.x;
        self.y -= o.y;
    }
}

impl Mul<f64> for PointD {
    type Output = PointD;
    #[inline]
    fn mul(self, s: f64) -> PointD {
        PointD::new(self.x * s, self.y * s)
    }
}

impl Neg for PointD {
    type Output = PointD;
    #[inline]
    fn neg(self) -> PointD {
        PointD::new(-self.x, -self.y)
    }
}

// ============================================================================
// Tests
// ============================================================================

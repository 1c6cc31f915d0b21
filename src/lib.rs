//! # livarot
//!
//! Path-to-polygon geometry kernel in pure Rust.
//!
//! Livarot turns vector paths made of lines, cubic Béziers, quadratic
//! B-spline chains and elliptical arcs into polygons, and works on those
//! polygons:
//!
//! - Adaptive curve flattening with back-references to the source curves
//! - Boolean operations and fill-rule resolution on edge graphs
//! - Stroking with joins and caps, dashing, and curve-preserving outlines
//! - Simplification and coalescing of paths into fewer cubic segments
//! - Scanline coverage lines for exact and supersampled rasterization
//!
//! ## Architecture
//!
//! The kernel is a short pipeline:
//!
//! 1. **Path**: command list built by a small state machine
//! 2. **Polyline**: adaptive sampling of the path, each point tagged with
//!    the command and parameter it came from
//! 3. **Shape**: directed edge graph made from the polyline, resolved into
//!    clean polygons under a fill rule
//! 4. **Lignes**: per-scanline coverage built from a shape
//!
//! Coordinates are `f64` in a y-up frame; the interior of a resolved
//! polygon lies to the left of its edges.

// Foundation
pub mod basics;
pub mod error;
pub mod math;
pub mod simul_eq;
pub mod trans_affine;

// Paths and curve sampling
pub mod arc;
pub mod curves;
pub mod path;
pub mod polyline;

// Edge graphs
pub mod shape;
pub mod shape_boolean;

// Path generators
pub mod dash;
pub mod math_stroke;
pub mod path_outline;
pub mod path_simplify;
pub mod path_stroke;

// Scanline coverage
pub mod bit_ligne;
pub mod float_ligne;
pub mod int_ligne;
pub mod shape_raster;

//! Errors raised when a path is built out of order.

use thiserror::Error;

/// Construction contract violations on [`Path`](crate::path::Path).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PathError {
    /// `interm_bezier_to` / `end_bezier_to` without a pending spline.
    #[error("no quadratic spline is pending")]
    NoPendingBezier,
    /// A command that needs a current point was issued before any subpath.
    #[error("no subpath is open")]
    NoSubpath,
    /// `end_bezier_to` without an endpoint on a spline started by `temp_bezier_to`.
    #[error("a delayed spline needs an explicit endpoint")]
    DelayedBezierPending,
    /// A command index outside the command list.
    #[error("command index {index} out of range for a path of {len} commands")]
    CommandOutOfRange { index: usize, len: usize },
}

pub type Result<T> = std::result::Result<T, PathError>;

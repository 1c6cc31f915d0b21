//! Small dense linear systems, solved by Gaussian elimination with partial
//! pivoting. Curve fitting uses it for the 2x2 normal equations of the
//! tangent least-squares problem, with one right-hand column per axis.

// ============================================================================
// Simultaneous equation solver
// ============================================================================

/// Solve `left * X = right` for `X`, or `None` when `left` is singular
/// (a pivot smaller than `epsilon` in magnitude).
#[allow(clippy::needless_range_loop)]
pub fn simul_eq_solve<const SIZE: usize, const RIGHT_COLS: usize>(
    left: &[[f64; SIZE]; SIZE],
    right: &[[f64; RIGHT_COLS]; SIZE],
    epsilon: f64,
) -> Option<[[f64; RIGHT_COLS]; SIZE]> {
    let mut a = *left;
    let mut b = *right;

    for k in 0..SIZE {
        let pivot_row = (k..SIZE)
            .max_by(|&i, &j| a[i][k].abs().total_cmp(&a[j][k].abs()))
            .unwrap_or(k);
        if a[pivot_row][k].abs() <= epsilon {
            return None;
        }
        a.swap(pivot_row, k);
        b.swap(pivot_row, k);

        let p = a[k][k];
        for j in k..SIZE {
            a[k][j] /= p;
        }
        for j in 0..RIGHT_COLS {
            b[k][j] /= p;
        }
        for i in (k + 1)..SIZE {
            let f = a[i][k];
            if f == 0.0 {
                continue;
            }
            for j in k..SIZE {
                a[i][j] -= f * a[k][j];
            }
            for j in 0..RIGHT_COLS {
                b[i][j] -= f * b[k][j];
            }
        }
    }

    let mut x = [[0.0; RIGHT_COLS]; SIZE];
    for c in 0..RIGHT_COLS {
        for m in (0..SIZE).rev() {
            let mut v = b[m][c];
            for j in (m + 1)..SIZE {
                v -= a[m][j] * x[j][c];
            }
            x[m][c] = v;
        }
    }
    Some(x)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solve_2x2_two_columns() {
        // [2 1; 1 3] X = [[3, 5], [4, 10]]
        let left = [[2.0, 1.0], [1.0, 3.0]];
        let right = [[3.0, 5.0], [4.0, 10.0]];
        let x = simul_eq_solve(&left, &right, 1e-12).unwrap();
        assert!((x[0][0] - 1.0).abs() < 1e-12);
        assert!((x[1][0] - 1.0).abs() < 1e-12);
        assert!((x[0][1] - 1.0).abs() < 1e-12);
        assert!((x[1][1] - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_pivoting() {
        let left = [[0.0, 1.0], [1.0, 0.0]];
        let right = [[2.0], [3.0]];
        let x = simul_eq_solve(&left, &right, 1e-12).unwrap();
        assert!((x[0][0] - 3.0).abs() < 1e-12);
        assert!((x[1][0] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_singular() {
        let left = [[1.0, 2.0], [2.0, 4.0]];
        let right = [[1.0], [2.0]];
        assert!(simul_eq_solve(&left, &right, 1e-12).is_none());
    }
}

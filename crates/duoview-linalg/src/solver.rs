/// Errors raised by the dense solver.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum LinalgError {
    /// The system matrix is (numerically) rank deficient.
    #[error("Linear system is singular (pivot {pivot:e} at column {column})")]
    SingularMatrix {
        /// Column where elimination broke down.
        column: usize,
        /// Magnitude of the rejected pivot.
        pivot: f64,
    },

    /// The system contains NaN or infinite coefficients.
    #[error("Linear system contains non-finite values")]
    NonFinite,
}

/// Relative pivot threshold below which a system is treated as singular.
const PIVOT_EPS: f64 = 1e-12;

/// Solve the square system `a * x = b` with Gaussian elimination and partial pivoting.
///
/// A pivot is rejected when its magnitude falls below `1e-12` times the largest absolute
/// coefficient of `a`, which makes the rank test independent of the overall scale of the
/// system.
///
/// # Arguments
///
/// * `a` - The row-major system matrix, consumed as scratch space.
/// * `b` - The right hand side, consumed as scratch space.
///
/// # Returns
///
/// The solution vector `x`.
///
/// # Example
///
/// ```
/// use duoview_linalg::solve_linear_system;
///
/// let a = [[2.0, 1.0], [1.0, 3.0]];
/// let b = [3.0, 5.0];
/// let x = solve_linear_system(a, b).unwrap();
/// assert!((x[0] - 0.8).abs() < 1e-12);
/// assert!((x[1] - 1.4).abs() < 1e-12);
/// ```
pub fn solve_linear_system<const N: usize>(
    mut a: [[f64; N]; N],
    mut b: [f64; N],
) -> Result<[f64; N], LinalgError> {
    let scale = a
        .iter()
        .flatten()
        .try_fold(0.0f64, |acc, v| v.is_finite().then(|| acc.max(v.abs())))
        .ok_or(LinalgError::NonFinite)?;
    if b.iter().any(|v| !v.is_finite()) {
        return Err(LinalgError::NonFinite);
    }
    let threshold = scale * PIVOT_EPS;

    for col in 0..N {
        // pick the row with the largest magnitude in this column
        let mut pivot_row = col;
        let mut pivot_abs = a[col][col].abs();
        for (row, a_row) in a.iter().enumerate().skip(col + 1) {
            if a_row[col].abs() > pivot_abs {
                pivot_abs = a_row[col].abs();
                pivot_row = row;
            }
        }

        if pivot_abs <= threshold {
            return Err(LinalgError::SingularMatrix {
                column: col,
                pivot: pivot_abs,
            });
        }

        a.swap(col, pivot_row);
        b.swap(col, pivot_row);

        let pivot = a[col][col];
        for row in col + 1..N {
            let factor = a[row][col] / pivot;
            if factor == 0.0 {
                continue;
            }
            for k in col..N {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    // back substitution
    let mut x = [0.0; N];
    for row in (0..N).rev() {
        let mut acc = b[row];
        for k in row + 1..N {
            acc -= a[row][k] * x[k];
        }
        x[row] = acc / a[row][row];
    }

    Ok(x)
}

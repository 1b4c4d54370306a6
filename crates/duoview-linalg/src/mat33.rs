/// Row-major 3x3 matrix.
pub type Mat33 = [[f64; 3]; 3];

/// The 3x3 identity matrix.
pub const IDENTITY_MAT33: Mat33 = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];

/// Compute the determinant of a 3x3 matrix.
#[rustfmt::skip]
pub fn det_mat33(m: &Mat33) -> f64 {
    m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1]) -
    m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0]) +
    m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
}

/// Compute the adjugate (transposed cofactor matrix) of a 3x3 matrix.
#[rustfmt::skip]
pub fn adjugate_mat33(m: &Mat33) -> Mat33 {
    [
        [
            m[1][1] * m[2][2] - m[1][2] * m[2][1],
            m[0][2] * m[2][1] - m[0][1] * m[2][2],
            m[0][1] * m[1][2] - m[0][2] * m[1][1],
        ],
        [
            m[1][2] * m[2][0] - m[1][0] * m[2][2],
            m[0][0] * m[2][2] - m[0][2] * m[2][0],
            m[0][2] * m[1][0] - m[0][0] * m[1][2],
        ],
        [
            m[1][0] * m[2][1] - m[1][1] * m[2][0],
            m[0][1] * m[2][0] - m[0][0] * m[2][1],
            m[0][0] * m[1][1] - m[0][1] * m[1][0],
        ],
    ]
}

/// Invert a 3x3 matrix.
///
/// Returns `None` when the determinant is exactly zero or not finite.
pub fn inverse_mat33(m: &Mat33) -> Option<Mat33> {
    let det = det_mat33(m);
    if det == 0.0 || !det.is_finite() {
        return None;
    }

    let adj = adjugate_mat33(m);
    let inv_det = 1.0 / det;

    let mut inv = [[0.0; 3]; 3];
    for (inv_row, adj_row) in inv.iter_mut().zip(adj.iter()) {
        for (v, a) in inv_row.iter_mut().zip(adj_row.iter()) {
            *v = a * inv_det;
        }
    }
    Some(inv)
}

/// Multiply two 3x3 matrices: `a * b`.
pub fn mat33_mul(a: &Mat33, b: &Mat33) -> Mat33 {
    let mut out = [[0.0; 3]; 3];
    for (i, row) in out.iter_mut().enumerate() {
        for (j, v) in row.iter_mut().enumerate() {
            *v = a[i][0] * b[0][j] + a[i][1] * b[1][j] + a[i][2] * b[2][j];
        }
    }
    out
}

/// Multiply a 3x3 matrix with a 3-vector.
pub fn mat33_mul_vec3(m: &Mat33, v: &[f64; 3]) -> [f64; 3] {
    [
        m[0][0] * v[0] + m[0][1] * v[1] + m[0][2] * v[2],
        m[1][0] * v[0] + m[1][1] * v[1] + m[1][2] * v[2],
        m[2][0] * v[0] + m[2][1] * v[1] + m[2][2] * v[2],
    ]
}

/// Frobenius norm of a 3x3 matrix.
pub fn frobenius_norm_mat33(m: &Mat33) -> f64 {
    m.iter().flatten().map(|v| v * v).sum::<f64>().sqrt()
}

/// Scale a 3x3 matrix in place so that its bottom-right entry equals one.
///
/// Returns `false` and leaves the matrix untouched when that entry is (close to) zero.
pub fn normalize_mat33_inplace(m: &mut Mat33) -> bool {
    let s = m[2][2];
    if s.abs() < f64::EPSILON {
        return false;
    }
    m.iter_mut().flatten().for_each(|v| *v /= s);
    true
}

/// Twice the signed area of the triangle `(a, b, c)`.
pub fn cross2(a: &[f64; 2], b: &[f64; 2], c: &[f64; 2]) -> f64 {
    (b[0] - a[0]) * (c[1] - a[1]) - (b[1] - a[1]) * (c[0] - a[0])
}

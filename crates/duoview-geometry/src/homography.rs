use duoview_linalg::{
    cross2, det_mat33, frobenius_norm_mat33, inverse_mat33, mat33_mul, mat33_mul_vec3,
    normalize_mat33_inplace, solve_linear_system, Mat33, IDENTITY_MAT33,
};
use serde::{Deserialize, Serialize};

use crate::HomographyError;

/// Minimum `|det(H)| / ‖H‖_F³` accepted for a user supplied or final homography.
pub const DEGENERACY_EPS: f64 = 1e-15;

/// Minimum `|det(H)| / ‖H‖_F³` accepted for a homography between conditioned points.
const CONDITIONED_DEGENERACY_EPS: f64 = 1e-8;

/// Minimum `|sin|` of the angle spanned by three sample points.
const COLLINEAR_EPS: f64 = 1e-6;

/// Homogeneous w below which a point is considered mapped to infinity.
const W_EPS: f64 = 1e-12;

/// A projective transform from source to target image coordinates.
///
/// The matrix is row-major, applies to column vectors `[x, y, 1]ᵀ` and is normalized so
/// that its bottom-right entry equals one. Construction rejects rank deficient matrices.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Mat33", into = "Mat33")]
pub struct Homography(Mat33);

impl Homography {
    /// The identity transform.
    pub fn identity() -> Self {
        Self(IDENTITY_MAT33)
    }

    /// Create a homography from a row-major 3x3 matrix.
    ///
    /// The matrix is rescaled so that `m[2][2] == 1`.
    ///
    /// # Errors
    ///
    /// Returns [`HomographyError::DegenerateHomography`] if the matrix has non-finite
    /// entries, a zero bottom-right entry, or is rank deficient.
    pub fn from_array(m: Mat33) -> Result<Self, HomographyError> {
        let mut m = m;
        if m.iter().flatten().any(|v| !v.is_finite()) || !normalize_mat33_inplace(&mut m) {
            return Err(HomographyError::DegenerateHomography);
        }
        if is_degenerate(&m, DEGENERACY_EPS) {
            return Err(HomographyError::DegenerateHomography);
        }
        Ok(Self(m))
    }

    /// The row-major matrix.
    pub fn as_array(&self) -> &Mat33 {
        &self.0
    }

    /// Determinant of the normalized matrix.
    pub fn determinant(&self) -> f64 {
        det_mat33(&self.0)
    }

    /// The inverse transform (target to source).
    pub fn inverse(&self) -> Result<Self, HomographyError> {
        let inv = inverse_mat33(&self.0).ok_or(HomographyError::DegenerateHomography)?;
        Self::from_array(inv)
    }

    /// Compose two transforms: the result applies `other` first, then `self`.
    pub fn compose(&self, other: &Homography) -> Result<Self, HomographyError> {
        Self::from_array(mat33_mul(&self.0, &other.0))
    }

    /// Map a point through the transform.
    ///
    /// Returns `None` when the point is sent to (or close to) the line at infinity.
    #[inline]
    pub fn transform_point(&self, p: &[f64; 2]) -> Option<[f64; 2]> {
        transform_point_mat33(&self.0, p)
    }
}

impl Default for Homography {
    fn default() -> Self {
        Self::identity()
    }
}

impl TryFrom<Mat33> for Homography {
    type Error = HomographyError;

    fn try_from(m: Mat33) -> Result<Self, Self::Error> {
        Self::from_array(m)
    }
}

impl From<Homography> for Mat33 {
    fn from(h: Homography) -> Self {
        h.0
    }
}

#[inline]
fn transform_point_mat33(m: &Mat33, p: &[f64; 2]) -> Option<[f64; 2]> {
    let [x, y, w] = mat33_mul_vec3(m, &[p[0], p[1], 1.0]);
    if w.abs() < W_EPS || !x.is_finite() || !y.is_finite() {
        return None;
    }
    Some([x / w, y / w])
}

/// Whether `|det(m)|` is negligible relative to `‖m‖_F³`.
pub fn is_degenerate(m: &Mat33, eps: f64) -> bool {
    let norm = frobenius_norm_mat33(m);
    if norm == 0.0 || !norm.is_finite() {
        return true;
    }
    let det = det_mat33(m);
    !det.is_finite() || det.abs() < eps * norm * norm * norm
}

/// Euclidean distance between `H * src` and `dst`.
///
/// Points mapped to infinity get an infinite error.
#[inline]
pub fn reprojection_error(h: &Homography, src: &[f64; 2], dst: &[f64; 2]) -> f64 {
    match h.transform_point(src) {
        Some(p) => ((p[0] - dst[0]).powi(2) + (p[1] - dst[1]).powi(2)).sqrt(),
        None => f64::INFINITY,
    }
}

/// Whether four points contain a duplicate or three (nearly) collinear points.
///
/// Such a configuration cannot determine a projective transform.
pub fn is_degenerate_sample(points: &[[f64; 2]; 4]) -> bool {
    const TRIPLETS: [[usize; 3]; 4] = [[0, 1, 2], [0, 1, 3], [0, 2, 3], [1, 2, 3]];
    TRIPLETS.iter().any(|&[a, b, c]| {
        let (pa, pb, pc) = (&points[a], &points[b], &points[c]);
        let ab = (pb[0] - pa[0]).hypot(pb[1] - pa[1]);
        let ac = (pc[0] - pa[0]).hypot(pc[1] - pa[1]);
        let bc = (pc[0] - pb[0]).hypot(pc[1] - pb[1]);
        // |cross| = |ab| |ac| sin(angle); also catches duplicates where a length is zero
        let longest = ab.max(ac).max(bc);
        cross2(pa, pb, pc).abs() <= COLLINEAR_EPS * longest * longest
    })
}

/// Similarity transform moving the centroid to the origin and the mean distance to √2.
fn conditioning_transform(points: &[[f64; 2]]) -> Result<Mat33, HomographyError> {
    let n = points.len() as f64;
    let (sx, sy) = points
        .iter()
        .fold((0.0, 0.0), |(sx, sy), p| (sx + p[0], sy + p[1]));
    let (cx, cy) = (sx / n, sy / n);
    let mean_dist = points
        .iter()
        .map(|p| (p[0] - cx).hypot(p[1] - cy))
        .sum::<f64>()
        / n;
    if !mean_dist.is_finite() || mean_dist < f64::EPSILON {
        return Err(HomographyError::DegeneratePoints);
    }
    let s = std::f64::consts::SQRT_2 / mean_dist;
    Ok([[s, 0.0, -s * cx], [0.0, s, -s * cy], [0.0, 0.0, 1.0]])
}

#[inline]
fn apply_conditioning(t: &Mat33, p: &[f64; 2]) -> [f64; 2] {
    [t[0][0] * p[0] + t[0][2], t[1][1] * p[1] + t[1][2]]
}

/// The two DLT equations of one correspondence, with `h33` fixed to one.
#[inline]
fn dlt_rows(p: &[f64; 2], q: &[f64; 2]) -> ([[f64; 8]; 2], [f64; 2]) {
    let ([x, y], [u, v]) = (*p, *q);
    (
        [
            [x, y, 1.0, 0.0, 0.0, 0.0, -u * x, -u * y],
            [0.0, 0.0, 0.0, x, y, 1.0, -v * x, -v * y],
        ],
        [u, v],
    )
}

/// Undo the conditioning of a homography solved between conditioned points.
fn denormalize(
    h: &[f64; 8],
    t_src: &Mat33,
    t_dst: &Mat33,
) -> Result<Homography, HomographyError> {
    let hn = [[h[0], h[1], h[2]], [h[3], h[4], h[5]], [h[6], h[7], 1.0]];
    if is_degenerate(&hn, CONDITIONED_DEGENERACY_EPS) {
        return Err(HomographyError::DegenerateHomography);
    }
    let t_dst_inv = inverse_mat33(t_dst).ok_or(HomographyError::DegeneratePoints)?;
    Homography::from_array(mat33_mul(&mat33_mul(&t_dst_inv, &hn), t_src))
}

/// Compute the homography that maps four source points exactly onto four target points.
///
/// Both point sets are conditioned (centroid at the origin, mean distance √2) and the
/// resulting 8x8 linear system is solved with Gaussian elimination.
///
/// # Arguments
///
/// * `src` - The four source points `[x, y]`.
/// * `dst` - The four target points `[x, y]`.
///
/// # Errors
///
/// Fails with [`HomographyError::DegeneratePoints`] for duplicate or collinear points,
/// [`HomographyError::SingularSystem`] if the solve breaks down and
/// [`HomographyError::DegenerateHomography`] if the result is rank deficient.
pub fn homography_4pt(
    src: &[[f64; 2]; 4],
    dst: &[[f64; 2]; 4],
) -> Result<Homography, HomographyError> {
    if is_degenerate_sample(src) || is_degenerate_sample(dst) {
        return Err(HomographyError::DegeneratePoints);
    }

    let t_src = conditioning_transform(src)?;
    let t_dst = conditioning_transform(dst)?;

    let mut a = [[0.0; 8]; 8];
    let mut b = [0.0; 8];
    for i in 0..4 {
        let p = apply_conditioning(&t_src, &src[i]);
        let q = apply_conditioning(&t_dst, &dst[i]);
        let (rows, rhs) = dlt_rows(&p, &q);
        a[2 * i] = rows[0];
        a[2 * i + 1] = rows[1];
        b[2 * i] = rhs[0];
        b[2 * i + 1] = rhs[1];
    }

    let h = solve_linear_system(a, b)?;
    denormalize(&h, &t_src, &t_dst)
}

/// Compute the least-squares homography over any number (≥ 4) of correspondences.
///
/// The overdetermined DLT system in conditioned coordinates is reduced to its 8x8
/// normal equations. The computation is deterministic: the same input always yields
/// bit-identical output.
///
/// # Arguments
///
/// * `src` - The source points `[x, y]`.
/// * `dst` - The target points `[x, y]`, index-aligned with `src`.
pub fn homography_least_squares(
    src: &[[f64; 2]],
    dst: &[[f64; 2]],
) -> Result<Homography, HomographyError> {
    if src.len() != dst.len() {
        return Err(HomographyError::MismatchedLengths {
            source_len: src.len(),
            target_len: dst.len(),
        });
    }
    if src.len() < 4 {
        return Err(HomographyError::InsufficientCorrespondences {
            required: 4,
            actual: src.len(),
        });
    }

    let t_src = conditioning_transform(src)?;
    let t_dst = conditioning_transform(dst)?;

    // accumulate AᵀA and Aᵀb
    let mut ata = [[0.0; 8]; 8];
    let mut atb = [0.0; 8];
    for (p, q) in src.iter().zip(dst.iter()) {
        let p = apply_conditioning(&t_src, p);
        let q = apply_conditioning(&t_dst, q);
        let (rows, rhs) = dlt_rows(&p, &q);
        for (row, r) in rows.iter().zip(rhs.iter()) {
            for i in 0..8 {
                if row[i] == 0.0 {
                    continue;
                }
                for j in 0..8 {
                    ata[i][j] += row[i] * row[j];
                }
                atb[i] += row[i] * r;
            }
        }
    }

    let h = solve_linear_system(ata, atb)?;
    denormalize(&h, &t_src, &t_dst)
}

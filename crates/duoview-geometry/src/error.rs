use duoview_linalg::LinalgError;

/// Errors returned by homography estimation.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum HomographyError {
    /// Not enough correspondences to determine a projective transform.
    #[error("Need at least {required} correspondences, got {actual}")]
    InsufficientCorrespondences {
        /// Minimum number of correspondences.
        required: usize,
        /// Number of correspondences provided.
        actual: usize,
    },

    /// Source and target point lists have different lengths.
    #[error("Source points ({source_len}) and target points ({target_len}) differ in length")]
    MismatchedLengths {
        /// Number of source points.
        source_len: usize,
        /// Number of target points.
        target_len: usize,
    },

    /// No model with enough support was found within the trial budget.
    #[error("Degenerate geometry: best model has {inliers} inliers, {required} required")]
    DegenerateGeometry {
        /// Inlier count of the best model found (0 if none).
        inliers: usize,
        /// Minimum inlier count that was required.
        required: usize,
    },

    /// The matrix is rank deficient or not finite.
    #[error("Homography matrix is degenerate")]
    DegenerateHomography,

    /// The point configuration cannot determine a homography.
    #[error("Point configuration is degenerate")]
    DegeneratePoints,

    /// The linear system could not be solved.
    #[error("Linear solve failed. {0}")]
    SingularSystem(#[from] LinalgError),
}

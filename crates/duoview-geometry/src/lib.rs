#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! # Homography estimation
//!
//! - [`homography`]: the [`Homography`] type and the direct linear transform solvers
//!   (exact 4-point and least squares over any number of pairs)
//! - [`ransac`]: robust estimation with adaptive RANSAC and inlier refinement
//!
//! # Example
//!
//! ```
//! use duoview_geometry::{find_homography, Homography, RansacParams};
//!
//! let h = Homography::from_array([[1.0, 0.0, 5.0], [0.0, 1.0, -3.0], [0.0, 0.0, 1.0]])?;
//! let src: Vec<[f64; 2]> = (0..12)
//!     .map(|i| [(i % 4) as f64 * 40.0, (i / 4) as f64 * 30.0 + (i % 3) as f64])
//!     .collect();
//! let dst: Vec<[f64; 2]> = src.iter().filter_map(|p| h.transform_point(p)).collect();
//!
//! let result = find_homography(&src, &dst, &RansacParams::default())?;
//! assert_eq!(result.inlier_count, 12);
//! # Ok::<(), duoview_geometry::HomographyError>(())
//! ```

mod error;
pub use error::HomographyError;

/// Homography type and linear solvers.
pub mod homography;
pub use homography::*;

/// Robust estimation with RANSAC.
pub mod ransac;
pub use ransac::*;

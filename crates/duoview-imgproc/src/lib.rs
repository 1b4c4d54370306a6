#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// merge a warped source image and a target image on one canvas.
pub mod composite;

/// utilities for interpolation.
pub mod interpolation;

/// module containing parallelization utilities.
pub mod parallel;

/// image geometric transformations module.
pub mod warp;

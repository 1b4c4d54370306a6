#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Error types for the io module.
pub mod error;

/// Reading feature sets stored as JSON.
pub mod features;

/// High-level read and write functions for images.
pub mod functional;

pub use crate::error::IoError;
pub use crate::features::{read_features_json, write_features_json, PrecomputedFeatures};
pub use crate::functional::{read_image_mono8, read_image_rgb8, write_image_rgb8};

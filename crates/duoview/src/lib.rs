#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! Registers a source image onto a target image from two sets of features and merges
//! both into one canvas. The stages are available on their own through the re-exported
//! crates; [`register`] and [`stitch`] chain them with a single [`StitchConfig`].
//!
//! ```
//! use duoview::features::{BinaryDescriptor, Feature};
//! use duoview::image::Image;
//! use duoview::{stitch, StitchConfig};
//!
//! // features at matching locations with matching descriptors
//! let features: Vec<_> = (0..12)
//!     .map(|i| {
//!         let location = [(i % 4) as f64 * 10.0 + 2.0, (i / 4) as f64 * 9.0 + (i % 3) as f64];
//!         Feature::new(location, BinaryDescriptor::new([i as u8 * 17; 4]))
//!     })
//!     .collect();
//!
//! let source = Image::<u8, 3>::from_size_val([48, 32].into(), 200)?;
//! let target = Image::<u8, 3>::from_size_val([48, 32].into(), 50)?;
//!
//! let panorama = stitch(&source, &target, &features, &features, &StitchConfig::default())?;
//! assert_eq!(panorama.registration.result.inlier_count, 12);
//! assert_eq!(panorama.image.size().width, 96);
//! # Ok::<(), duoview::StitchError>(())
//! ```

#[doc(inline)]
pub use duoview_features as features;

#[doc(inline)]
pub use duoview_geometry as geometry;

#[doc(inline)]
pub use duoview_image as image;

#[doc(inline)]
pub use duoview_imgproc as imgproc;

#[doc(inline)]
pub use duoview_io as io;

#[doc(inline)]
pub use duoview_linalg as linalg;

mod error;
pub use error::StitchError;

mod pipeline;
pub use pipeline::*;

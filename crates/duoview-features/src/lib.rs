#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! Features are produced by an external extractor (see [`FeatureExtractor`]); this crate
//! only correlates two already extracted sets. The matcher is generic over the
//! [`Descriptor`] trait so binary and real-valued descriptors share one code path.
//!
//! # Example
//!
//! ```
//! use duoview_features::{match_descriptors, BinaryDescriptor, Feature, MatchConfig};
//!
//! let source = vec![Feature::new([1.0, 2.0], BinaryDescriptor::new([0b1010u8; 4]))];
//! let target = vec![
//!     Feature::new([5.0, 5.0], BinaryDescriptor::new([0xffu8; 4])),
//!     Feature::new([3.0, 4.0], BinaryDescriptor::new([0b1011u8; 4])),
//! ];
//!
//! let matches = match_descriptors(&source, &target, &MatchConfig::default());
//! assert_eq!(matches.len(), 1);
//! assert_eq!(matches[0].target_index, 1);
//! assert_eq!(matches[0].distance, 4);
//! ```

mod descriptor;
pub use descriptor::*;

mod feature;
pub use feature::*;

mod matcher;
pub use matcher::*;

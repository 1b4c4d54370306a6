//! Geometric image transformations.
//!
//! - Perspective transformations (homographies) with inverse mapping

mod perspective;

pub use perspective::warp_perspective;

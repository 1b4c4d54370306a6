#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! All routines work on stack-allocated arrays. Homography problems never need more than
//! a 9x9 system, so no dynamically sized matrix type is involved.

/// 3x3 matrix and 3-vector helpers.
pub mod mat33;

/// Dense square linear system solver.
pub mod solver;

pub use mat33::*;
pub use solver::{solve_linear_system, LinalgError};

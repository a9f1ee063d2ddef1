#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

mod icp;
pub use icp::*;

mod nn;
pub use nn::*;

mod ops;
pub use ops::fit_rigid_transform;

mod seed;
pub use seed::*;

use thiserror::Error;

/// Error type for registration operations.
///
/// Reaching the iteration cap is not an error; see
/// [`IcpResult::converged`].
#[derive(Debug, Error)]
pub enum RegistrationError {
    /// The nearest-neighbor reference set has no points.
    #[error("reference point set is empty")]
    EmptyReferenceSet,

    /// Fewer than 3 correspondence pairs, or mismatched set sizes.
    #[error("at least 3 matched correspondence pairs are required, got {len_source} and {len_target}")]
    InsufficientCorrespondences {
        /// Number of points in the source set.
        len_source: usize,
        /// Number of points in the target set.
        len_target: usize,
    },

    /// The solver hit a numerically degenerate configuration.
    #[error("numeric degeneracy: {0}")]
    NumericDegeneracy(String),
}

#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Landmark maps and declarative joint frame definitions.
pub mod frames;

/// Linear algebra utilities.
pub mod linalg;

/// Transform collection averaging and dispersion statistics.
pub mod mean;

/// Point cloud container.
pub mod pointcloud;

/// Rigid transform type.
pub mod transform;

/// Rotation matrix constructors.
pub mod transforms;

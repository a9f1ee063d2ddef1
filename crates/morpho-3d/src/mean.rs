use thiserror::Error;

use crate::linalg::{det33, matmul33, svd3, transpose33};
use crate::transform::RigidTransform;

/// Error type for transform averaging.
#[derive(Debug, Error)]
pub enum AverageError {
    /// The input transform collection has no elements.
    #[error("cannot average an empty transform collection")]
    EmptyCollection,
}

/// Spread of a transform collection around its mean.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DispersionSummary {
    /// Standard deviation of the rotation angles to the mean rotation, in radians.
    pub rotation_std: f64,
    /// Standard deviation of the translation vector norms, in the cloud's length unit.
    pub translation_std: f64,
}

/// Compute the angle between two rotation matrices, following the formula:
///
/// ```text
/// angle = arccos((trace(r1^T * r2) - 1) / 2)
/// ```
///
/// The arccos argument is clamped to [-1, 1] so that floating-point
/// overshoot on nearly identical rotations cannot produce NaN.
pub fn angle_between_rotations(r1: &[[f64; 3]; 3], r2: &[[f64; 3]; 3]) -> f64 {
    let mut rel = [[0.0; 3]; 3];
    matmul33(&transpose33(r1), r2, &mut rel);
    let arg = (rel[0][0] + rel[1][1] + rel[2][2] - 1.0) / 2.0;
    arg.clamp(-1.0, 1.0).acos()
}

/// Compute the mean of a collection of rigid transforms and, optionally,
/// its dispersion.
///
/// The rotation mean is the chordal mean: the rotation blocks are averaged
/// element-wise and the result is re-projected onto the nearest rotation
/// matrix via SVD. This approximates the geodesic mean well when the input
/// rotations are close together, which is the regime of repeated anatomical
/// coordinate systems; it is not the true Riemannian mean. The translation
/// mean is arithmetic.
///
/// Dispersion is the population standard deviation of the angles between
/// each rotation and the mean rotation, and of the translation norms.
pub fn average_transforms(
    transforms: &[RigidTransform],
    compute_dispersion: bool,
) -> Result<(RigidTransform, Option<DispersionSummary>), AverageError> {
    if transforms.is_empty() {
        return Err(AverageError::EmptyCollection);
    }
    let n = transforms.len() as f64;

    let mut rotation_sum = [[0.0; 3]; 3];
    let mut translation = [0.0; 3];
    for t in transforms {
        for i in 0..3 {
            for j in 0..3 {
                rotation_sum[i][j] += t.rotation[i][j];
            }
            translation[i] += t.translation[i];
        }
    }
    for row in &mut rotation_sum {
        for val in row {
            *val /= n;
        }
    }
    for val in &mut translation {
        *val /= n;
    }

    let rotation = project_to_rotation(&rotation_sum);
    let mean = RigidTransform::new(rotation, translation);

    if !compute_dispersion {
        return Ok((mean, None));
    }

    let angles = transforms
        .iter()
        .map(|t| angle_between_rotations(&t.rotation, &mean.rotation))
        .collect::<Vec<_>>();
    let norms = transforms
        .iter()
        .map(|t| {
            (t.translation[0].powi(2) + t.translation[1].powi(2) + t.translation[2].powi(2)).sqrt()
        })
        .collect::<Vec<_>>();

    let summary = DispersionSummary {
        rotation_std: population_std(&angles),
        translation_std: population_std(&norms),
    };
    Ok((mean, Some(summary)))
}

/// Re-project a near-rotation matrix onto the closest orthonormal matrix
/// with determinant +1.
fn project_to_rotation(m: &[[f64; 3]; 3]) -> [[f64; 3]; 3] {
    let svd = svd3(m);
    let mut u = svd.u;
    let vt = transpose33(&svd.v);

    let mut rotation = [[0.0; 3]; 3];
    matmul33(&u, &vt, &mut rotation);
    if det33(&rotation) < 0.0 {
        for row in &mut u {
            row[2] = -row[2];
        }
        matmul33(&u, &vt, &mut rotation);
    }
    rotation
}

fn population_std(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt()
}

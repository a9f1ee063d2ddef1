use morpho_3d::linalg::{matvec33, transform_points};
use morpho_3d::pointcloud::PointCloud;
use morpho_3d::transform::RigidTransform;

use crate::ops::fit_rigid_transform;
use crate::{BruteForceIndex, NearestNeighbor, RegistrationError};

/// Configuration of an ICP run.
#[derive(Debug, Clone)]
pub struct IcpConfig {
    /// Maximum number of iterations to perform.
    pub max_iterations: usize,
    /// Convergence tolerance on the incremental-step deviation metric.
    pub tolerance: f64,
    /// Approximate number of source points kept by stride subsampling.
    /// Zero disables subsampling. Ignored when `share_indices` is set.
    pub target_points_source: usize,
    /// Approximate number of target points kept by stride subsampling.
    /// Zero disables subsampling. Ignored when `share_indices` is set.
    pub target_points_target: usize,
    /// Declare that both clouds share index order (same mesh topology),
    /// pairing points by index and skipping the nearest-neighbor search.
    pub share_indices: bool,
    /// Initial guess applied to the source cloud before the first
    /// iteration.
    pub initial_transform: RigidTransform,
    /// Compute the post-alignment RMS point-to-point residual with one
    /// extra correspondence pass.
    pub compute_residual: bool,
}

impl Default for IcpConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            tolerance: 1e-6,
            target_points_source: 3000,
            target_points_target: 3000,
            share_indices: false,
            initial_transform: RigidTransform::identity(),
            compute_residual: false,
        }
    }
}

/// Result of an ICP run.
///
/// The transform maps original (uncentered) source-cloud coordinates onto
/// the target frame.
#[derive(Debug, Clone)]
pub struct IcpResult {
    /// Estimated rigid transform from the source to the target frame.
    pub transform: RigidTransform,
    /// Number of iterations performed.
    pub num_iterations: usize,
    /// Whether the run terminated by the tolerance criterion. `false`
    /// means the iteration cap was reached; the transform is still the
    /// best estimate found and the run is not an error.
    pub converged: bool,
    /// RMS point-to-point distance after the final alignment, when
    /// requested.
    pub residual_rmse: Option<f64>,
}

/// Align `source` onto `target` with point-to-point ICP.
///
/// Each iteration applies the accumulated transform to the (centered,
/// subsampled) source cloud, pairs each source point with its closest
/// target point, solves the incremental rigid transform with
/// [`fit_rigid_transform`] and left-multiplies it onto the accumulated
/// transform. Iteration stops when the sum of squared entries of
/// `I - incremental`, or its change between consecutive iterations, drops
/// below `tolerance`.
///
/// Correspondences come from a [`BruteForceIndex`] over the strided target
/// cloud, or from index-order pairing when `config.share_indices` is set.
/// With `share_indices` the optional residual is also computed over the
/// index-order pairs rather than a nearest-neighbor pass, so it measures
/// the per-vertex misfit of the declared correspondence.
pub fn register(
    source: &PointCloud,
    target: &PointCloud,
    config: &IcpConfig,
) -> Result<IcpResult, RegistrationError> {
    if config.share_indices {
        return run_icp(source, target.points(), None, config);
    }

    let target_sub = stride_points(
        target.points(),
        stride_for(target.len(), config.target_points_target),
    );
    let index = BruteForceIndex::new(&target_sub)?;
    run_icp(source, &target_sub, Some(&index), config)
}

/// Align `source` onto `target` using a caller-supplied nearest-neighbor
/// index, e.g. a [`crate::KdTreeIndex`] for large clouds.
///
/// The index must have been built over `target.points()` as passed here;
/// no target subsampling is applied in this path. When
/// `config.share_indices` is set the index is not consulted.
pub fn register_with_index<I: NearestNeighbor>(
    source: &PointCloud,
    target: &PointCloud,
    index: &I,
    config: &IcpConfig,
) -> Result<IcpResult, RegistrationError> {
    if config.share_indices {
        return run_icp(source, target.points(), None, config);
    }
    run_icp(source, target.points(), Some(index), config)
}

fn run_icp(
    source: &PointCloud,
    target_points: &[[f64; 3]],
    index: Option<&dyn NearestNeighbor>,
    config: &IcpConfig,
) -> Result<IcpResult, RegistrationError> {
    let centroid = source
        .centroid()
        .ok_or(RegistrationError::InsufficientCorrespondences {
            len_source: 0,
            len_target: target_points.len(),
        })?;

    // center the source on its own centroid; the translation is undone in
    // the finalization step so the output maps original coordinates
    let source_stride = if config.share_indices {
        1
    } else {
        stride_for(source.len(), config.target_points_source)
    };
    let centered = source
        .points()
        .iter()
        .step_by(source_stride)
        .map(|p| [p[0] - centroid[0], p[1] - centroid[1], p[2] - centroid[2]])
        .collect::<Vec<_>>();

    if index.is_none() && centered.len() != target_points.len() {
        return Err(RegistrationError::InsufficientCorrespondences {
            len_source: centered.len(),
            len_target: target_points.len(),
        });
    }

    let mut accumulated = config.initial_transform.clone();
    let mut moved = vec![[0.0; 3]; centered.len()];
    let mut prev_metric = f64::INFINITY;
    let mut num_iterations = 0;
    let mut converged = false;

    for iteration in 0..config.max_iterations {
        transform_points(
            &centered,
            &accumulated.rotation,
            &accumulated.translation,
            &mut moved,
        );

        let step = match index {
            // shared index order: pair points positionally
            None => fit_rigid_transform(&moved, target_points)?,
            Some(index) => {
                let matched = moved
                    .iter()
                    .map(|p| target_points[index.nearest_one(p).index])
                    .collect::<Vec<_>>();
                fit_rigid_transform(&moved, &matched)?
            }
        };

        accumulated = step.compose(&accumulated);
        num_iterations = iteration + 1;

        let metric = identity_deviation(&step);
        log::debug!("iteration {iteration}: step deviation {metric:.3e}");

        // a near-identity step, or a stalled metric, means convergence
        if metric < config.tolerance || (prev_metric - metric).abs() < config.tolerance {
            converged = true;
            break;
        }
        prev_metric = metric;
    }

    let residual_rmse = if config.compute_residual {
        transform_points(
            &centered,
            &accumulated.rotation,
            &accumulated.translation,
            &mut moved,
        );
        let sum_squared = match index {
            None => moved
                .iter()
                .zip(target_points.iter())
                .map(|(p, q)| {
                    (p[0] - q[0]).powi(2) + (p[1] - q[1]).powi(2) + (p[2] - q[2]).powi(2)
                })
                .sum::<f64>(),
            Some(index) => moved
                .iter()
                .map(|p| index.nearest_one(p).distance_squared)
                .sum::<f64>(),
        };
        Some((sum_squared / moved.len() as f64).sqrt())
    } else {
        None
    };

    // undo the initial centering
    let rc = matvec33(&accumulated.rotation, &centroid);
    for i in 0..3 {
        accumulated.translation[i] -= rc[i];
    }

    Ok(IcpResult {
        transform: accumulated,
        num_iterations,
        converged,
        residual_rmse,
    })
}

/// Sum of squared entries of the homogeneous `I - transform`, a scalar
/// measure of how far an incremental step is from a no-op.
fn identity_deviation(transform: &RigidTransform) -> f64 {
    let mut sum = 0.0;
    for i in 0..3 {
        for j in 0..3 {
            let eye = if i == j { 1.0 } else { 0.0 };
            sum += (eye - transform.rotation[i][j]).powi(2);
        }
        sum += transform.translation[i].powi(2);
    }
    sum
}

/// Stride that downsamples `total` points to approximately `target`,
/// deterministic for a given input size.
fn stride_for(total: usize, target: usize) -> usize {
    if target == 0 {
        return 1;
    }
    (total / target).max(1)
}

fn stride_points(points: &[[f64; 3]], stride: usize) -> Vec<[f64; 3]> {
    points.iter().step_by(stride).copied().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use morpho_3d::transforms::axis_angle_to_rotation_matrix;

    fn create_random_points(num_points: usize) -> Vec<[f64; 3]> {
        (0..num_points)
            .map(|_| {
                [
                    rand::random::<f64>(),
                    rand::random::<f64>(),
                    rand::random::<f64>(),
                ]
            })
            .collect()
    }

    fn assert_transform_eq(result: &RigidTransform, expected: &RigidTransform, epsilon: f64) {
        for i in 0..3 {
            assert_relative_eq!(
                result.translation[i],
                expected.translation[i],
                epsilon = epsilon
            );
            for j in 0..3 {
                assert_relative_eq!(
                    result.rotation[i][j],
                    expected.rotation[i][j],
                    epsilon = epsilon
                );
            }
        }
    }

    #[test]
    fn test_icp_self_alignment_single_iteration() -> Result<(), Box<dyn std::error::Error>> {
        // zero-centroid cloud aligned to itself: the very first incremental
        // step is the identity and the run stops after one iteration
        let points = vec![
            [1.0, 0.0, 0.0],
            [-1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, -1.0, 0.0],
            [0.0, 0.0, 1.0],
            [0.0, 0.0, -1.0],
        ];
        let cloud = PointCloud::new(points, None);

        let result = register(
            &cloud,
            &cloud.clone(),
            &IcpConfig {
                share_indices: true,
                ..Default::default()
            },
        )?;

        assert!(result.converged);
        assert_eq!(result.num_iterations, 1);
        assert_transform_eq(&result.transform, &RigidTransform::identity(), 1e-9);
        Ok(())
    }

    #[test]
    fn test_icp_self_alignment_off_center() -> Result<(), Box<dyn std::error::Error>> {
        let points = create_random_points(50)
            .into_iter()
            .map(|p| [p[0] + 10.0, p[1] - 4.0, p[2] + 7.0])
            .collect::<Vec<_>>();
        let cloud = PointCloud::new(points, None);

        let result = register(
            &cloud,
            &cloud.clone(),
            &IcpConfig {
                share_indices: true,
                ..Default::default()
            },
        )?;

        assert!(result.converged);
        assert_transform_eq(&result.transform, &RigidTransform::identity(), 1e-9);
        Ok(())
    }

    #[test]
    fn test_icp_exact_recovery_share_indices() -> Result<(), Box<dyn std::error::Error>> {
        let points_src = create_random_points(100);
        let expected = RigidTransform::new(
            axis_angle_to_rotation_matrix(&[0.3, 0.8, -0.2], 0.4)?,
            [0.5, -1.0, 2.0],
        );

        let mut points_dst = vec![[0.0; 3]; points_src.len()];
        transform_points(
            &points_src,
            &expected.rotation,
            &expected.translation,
            &mut points_dst,
        );

        let result = register(
            &PointCloud::new(points_src, None),
            &PointCloud::new(points_dst, None),
            &IcpConfig {
                share_indices: true,
                ..Default::default()
            },
        )?;

        assert!(result.converged);
        assert_transform_eq(&result.transform, &expected, 1e-6);
        Ok(())
    }

    #[test]
    fn test_icp_nearest_neighbor_path() -> Result<(), Box<dyn std::error::Error>> {
        let points_src = create_random_points(300);
        let expected = RigidTransform::new(
            axis_angle_to_rotation_matrix(&[1.0, 0.0, 0.0], 0.05)?,
            [0.02, -0.01, 0.03],
        );

        let mut points_dst = vec![[0.0; 3]; points_src.len()];
        transform_points(
            &points_src,
            &expected.rotation,
            &expected.translation,
            &mut points_dst,
        );

        let result = register(
            &PointCloud::new(points_src.clone(), None),
            &PointCloud::new(points_dst.clone(), None),
            &IcpConfig {
                compute_residual: true,
                // keep every point so the correspondences can be exact
                target_points_source: 0,
                target_points_target: 0,
                ..Default::default()
            },
        )?;

        let rmse = result.residual_rmse.expect("residual was requested");
        assert!(rmse < 1e-3, "rmse too large: {rmse}");

        // the recovered transform must map the source onto the target
        let mut aligned = vec![[0.0; 3]; points_src.len()];
        transform_points(
            &points_src,
            &result.transform.rotation,
            &result.transform.translation,
            &mut aligned,
        );
        let max_err = aligned
            .iter()
            .zip(points_dst.iter())
            .map(|(a, b)| {
                ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2) + (a[2] - b[2]).powi(2)).sqrt()
            })
            .fold(0.0, f64::max);
        assert!(max_err < 1e-2, "alignment error too large: {max_err}");
        Ok(())
    }

    #[test]
    fn test_icp_with_kdtree_index() -> Result<(), Box<dyn std::error::Error>> {
        let points_src = create_random_points(200);
        let expected = RigidTransform::new(
            axis_angle_to_rotation_matrix(&[0.0, 0.0, 1.0], 0.03)?,
            [0.01, 0.02, -0.01],
        );

        let mut points_dst = vec![[0.0; 3]; points_src.len()];
        transform_points(
            &points_src,
            &expected.rotation,
            &expected.translation,
            &mut points_dst,
        );

        let target = PointCloud::new(points_dst, None);
        let index = crate::KdTreeIndex::new(target.points())?;
        let result = register_with_index(
            &PointCloud::new(points_src, None),
            &target,
            &index,
            &IcpConfig {
                target_points_source: 0,
                ..Default::default()
            },
        )?;

        assert!(result.converged);
        Ok(())
    }

    #[test]
    fn test_icp_iteration_cap_is_not_an_error() -> Result<(), Box<dyn std::error::Error>> {
        let points_src = create_random_points(50);
        let points_dst = create_random_points(50);

        let result = register(
            &PointCloud::new(points_src, None),
            &PointCloud::new(points_dst, None),
            &IcpConfig {
                max_iterations: 3,
                tolerance: 0.0,
                share_indices: true,
                ..Default::default()
            },
        )?;

        assert!(!result.converged);
        assert_eq!(result.num_iterations, 3);
        Ok(())
    }

    #[test]
    fn test_icp_residual_zero_for_identical_clouds() -> Result<(), Box<dyn std::error::Error>> {
        let cloud = PointCloud::new(create_random_points(40), None);

        let result = register(
            &cloud,
            &cloud.clone(),
            &IcpConfig {
                share_indices: true,
                compute_residual: true,
                ..Default::default()
            },
        )?;

        let rmse = result.residual_rmse.expect("residual was requested");
        assert_relative_eq!(rmse, 0.0, epsilon = 1e-9);
        Ok(())
    }

    #[test]
    fn test_icp_share_indices_residual_is_positional() -> Result<(), Box<dyn std::error::Error>> {
        // the target holds the same points with two of them swapped: every
        // point has an exact nearest neighbor, but the index-order pairing
        // declared by share_indices leaves a nonzero per-vertex misfit
        let points = vec![
            [1.0, 0.0, 0.0],
            [-1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, -1.0, 0.0],
            [0.0, 0.0, 1.0],
            [0.0, 0.0, -1.0],
        ];
        let mut swapped = points.clone();
        swapped.swap(0, 1);

        let result = register(
            &PointCloud::new(points, None),
            &PointCloud::new(swapped, None),
            &IcpConfig {
                share_indices: true,
                compute_residual: true,
                ..Default::default()
            },
        )?;

        let rmse = result.residual_rmse.expect("residual was requested");
        assert!(rmse > 0.1, "positional residual should be nonzero: {rmse}");
        Ok(())
    }

    #[test]
    fn test_icp_empty_source_fails() {
        let empty = PointCloud::new(vec![], None);
        let target = PointCloud::new(create_random_points(10), None);
        assert!(register(&empty, &target, &IcpConfig::default()).is_err());
    }

    #[test]
    fn test_icp_share_indices_mismatched_lengths_fail() {
        let source = PointCloud::new(create_random_points(10), None);
        let target = PointCloud::new(create_random_points(12), None);
        let result = register(
            &source,
            &target,
            &IcpConfig {
                share_indices: true,
                ..Default::default()
            },
        );
        assert!(matches!(
            result,
            Err(RegistrationError::InsufficientCorrespondences { .. })
        ));
    }

    #[test]
    fn test_stride_for() {
        assert_eq!(stride_for(10000, 3000), 3);
        assert_eq!(stride_for(100, 3000), 1);
        assert_eq!(stride_for(100, 0), 1);
    }
}

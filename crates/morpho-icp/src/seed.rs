use morpho_3d::frames::Landmarks;
use morpho_3d::transform::RigidTransform;

use crate::ops::fit_rigid_transform;
use crate::RegistrationError;

/// Compute an initial alignment guess from named landmarks present in
/// both maps, for use as [`crate::IcpConfig::initial_transform`].
///
/// The shared landmark names are sorted before solving so the result does
/// not depend on map iteration order. At least 3 shared names are
/// required; errors are those of [`fit_rigid_transform`].
pub fn initial_transform_from_landmarks(
    source: &Landmarks,
    target: &Landmarks,
) -> Result<RigidTransform, RegistrationError> {
    let mut names = source
        .keys()
        .filter(|name| target.contains_key(*name))
        .collect::<Vec<_>>();
    names.sort();

    let src = names
        .iter()
        .map(|name| drop_homogeneous(&source[*name]))
        .collect::<Vec<_>>();
    let dst = names
        .iter()
        .map(|name| drop_homogeneous(&target[*name]))
        .collect::<Vec<_>>();

    fit_rigid_transform(&src, &dst)
}

fn drop_homogeneous(p: &[f64; 4]) -> [f64; 3] {
    [p[0], p[1], p[2]]
}

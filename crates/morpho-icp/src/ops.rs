use morpho_3d::linalg::{det33, matmul33, matvec33, svd3, transpose33};
use morpho_3d::transform::RigidTransform;

use crate::RegistrationError;

// Relative threshold under which the cross-covariance is considered rank
// deficient: a second singular value this far below the first means the
// point sets are collinear or coincident and the rotation is unobservable.
const RANK_EPSILON: f64 = 1e-12;

/// Compute the centroids of two sets of points.
pub(crate) fn compute_centroids(points1: &[[f64; 3]], points2: &[[f64; 3]]) -> ([f64; 3], [f64; 3]) {
    let mut centroid1 = [0.0; 3];
    let mut centroid2 = [0.0; 3];

    for (p1, p2) in points1.iter().zip(points2.iter()) {
        for i in 0..3 {
            centroid1[i] += p1[i];
            centroid2[i] += p2[i];
        }
    }

    let n = points1.len() as f64;
    for i in 0..3 {
        centroid1[i] /= n;
        centroid2[i] /= n;
    }

    (centroid1, centroid2)
}

/// Closed-form least-squares rigid transform between two corresponded
/// point sets (Kabsch algorithm).
///
/// Computes the rotation `R` and translation `t` minimizing
/// `sum(||R * src_i + t - dst_i||^2)` over point pairs with 1:1
/// correspondence: both sets are centered on their centroids, the
/// cross-covariance `H = sum(c_src * c_dst^T)` is decomposed as
/// `H = U * S * V^T`, and `R = V * U^T` with the last column of `V`
/// negated when the raw product is a reflection, so that `det(R) = +1`
/// always holds. The translation is `t = centroid_dst - R * centroid_src`.
///
/// # Errors
///
/// * [`RegistrationError::InsufficientCorrespondences`] for mismatched
///   lengths or fewer than 3 pairs.
/// * [`RegistrationError::NumericDegeneracy`] when the cross-covariance is
///   rank deficient (collinear or coincident points).
pub fn fit_rigid_transform(
    src: &[[f64; 3]],
    dst: &[[f64; 3]],
) -> Result<RigidTransform, RegistrationError> {
    if src.len() != dst.len() || src.len() < 3 {
        return Err(RegistrationError::InsufficientCorrespondences {
            len_source: src.len(),
            len_target: dst.len(),
        });
    }

    let (centroid_src, centroid_dst) = compute_centroids(src, dst);

    // cross covariance H = sum[(src - centroid_src) * (dst - centroid_dst)^T]
    let mut h = [[0.0; 3]; 3];
    for (p_src, p_dst) in src.iter().zip(dst.iter()) {
        let cs = [
            p_src[0] - centroid_src[0],
            p_src[1] - centroid_src[1],
            p_src[2] - centroid_src[2],
        ];
        let cd = [
            p_dst[0] - centroid_dst[0],
            p_dst[1] - centroid_dst[1],
            p_dst[2] - centroid_dst[2],
        ];
        for (r, &cs_r) in cs.iter().enumerate() {
            for (c, &cd_c) in cd.iter().enumerate() {
                h[r][c] += cs_r * cd_c;
            }
        }
    }

    let svd = svd3(&h);
    if svd.s[1] <= svd.s[0] * RANK_EPSILON {
        return Err(RegistrationError::NumericDegeneracy(
            "cross-covariance matrix is rank deficient (collinear or coincident points)".into(),
        ));
    }

    let mut v = svd.v;
    let ut = transpose33(&svd.u);

    let mut rotation = [[0.0; 3]; 3];
    matmul33(&v, &ut, &mut rotation);
    if det33(&rotation) < 0.0 {
        for row in &mut v {
            row[2] = -row[2];
        }
        matmul33(&v, &ut, &mut rotation);
    }

    let rc = matvec33(&rotation, &centroid_src);
    let translation = [
        centroid_dst[0] - rc[0],
        centroid_dst[1] - rc[1],
        centroid_dst[2] - rc[2],
    ];

    Ok(RigidTransform::new(rotation, translation))
}

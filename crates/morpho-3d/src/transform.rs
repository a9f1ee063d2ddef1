use crate::linalg::{matmul33, matvec33, transpose33};

/// A rigid transform, i.e. a 4x4 homogeneous matrix stored as its
/// orthonormal rotation block and translation vector.
///
/// Invariant: the rotation block is orthonormal with determinant +1.
/// Transforms produced by the solvers and by averaging are re-projected
/// onto the rotation manifold via SVD, so accumulated products do not
/// drift away from it.
#[derive(Debug, Clone, PartialEq)]
pub struct RigidTransform {
    /// Row-major rotation matrix.
    pub rotation: [[f64; 3]; 3],
    /// Translation vector.
    pub translation: [f64; 3],
}

impl Default for RigidTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl RigidTransform {
    /// Create a rigid transform from a rotation matrix and translation vector.
    pub fn new(rotation: [[f64; 3]; 3], translation: [f64; 3]) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    /// The identity transform. Each call constructs a fresh value.
    pub fn identity() -> Self {
        Self {
            rotation: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
            translation: [0.0, 0.0, 0.0],
        }
    }

    /// Invert the transform, following the formula:
    ///
    /// ```text
    /// [R^T   , -R^T * t]
    /// [  0   ,     1   ]
    /// ```
    pub fn inverse(&self) -> Self {
        let rotation = transpose33(&self.rotation);
        let t = matvec33(&rotation, &self.translation);
        Self {
            rotation,
            translation: [-t[0], -t[1], -t[2]],
        }
    }

    /// Compose two transforms, `self * rhs`, i.e. apply `rhs` first.
    pub fn compose(&self, rhs: &Self) -> Self {
        let mut rotation = [[0.0; 3]; 3];
        matmul33(&self.rotation, &rhs.rotation, &mut rotation);
        let rt = matvec33(&self.rotation, &rhs.translation);
        Self {
            rotation,
            translation: [
                rt[0] + self.translation[0],
                rt[1] + self.translation[1],
                rt[2] + self.translation[2],
            ],
        }
    }

    /// Apply the transform to a single point, `R * p + t`.
    pub fn transform_point(&self, point: &[f64; 3]) -> [f64; 3] {
        let rp = matvec33(&self.rotation, point);
        [
            rp[0] + self.translation[0],
            rp[1] + self.translation[1],
            rp[2] + self.translation[2],
        ]
    }

    /// Pack the transform into a 4x4 row-major homogeneous matrix.
    pub fn to_matrix4(&self) -> [[f64; 4]; 4] {
        let mut out = [[0.0; 4]; 4];
        for i in 0..3 {
            out[i][..3].copy_from_slice(&self.rotation[i]);
            out[i][3] = self.translation[i];
        }
        out[3][3] = 1.0;
        out
    }

    /// Extract the rotation block and translation column of a 4x4
    /// row-major homogeneous matrix. The bottom row is ignored.
    pub fn from_matrix4(matrix: &[[f64; 4]; 4]) -> Self {
        let mut rotation = [[0.0; 3]; 3];
        let mut translation = [0.0; 3];
        for i in 0..3 {
            rotation[i].copy_from_slice(&matrix[i][..3]);
            translation[i] = matrix[i][3];
        }
        Self {
            rotation,
            translation,
        }
    }
}

/// Transform expressing frame `b` relative to frame `a`, i.e. `a^-1 * b`.
pub fn relative_transform(a: &RigidTransform, b: &RigidTransform) -> RigidTransform {
    a.inverse().compose(b)
}

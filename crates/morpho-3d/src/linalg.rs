/// Result of a 3x3 singular value decomposition.
#[derive(Debug, Clone)]
pub struct Svd3 {
    /// Left singular vectors.
    pub u: [[f64; 3]; 3],
    /// Singular values in non-increasing order.
    pub s: [f64; 3],
    /// Right singular vectors.
    pub v: [[f64; 3]; 3],
}

/// Compute the singular value decomposition of a 3x3 matrix, `m = u * diag(s) * v^T`.
pub fn svd3(m: &[[f64; 3]; 3]) -> Svd3 {
    let mat = faer::Mat::<f64>::from_fn(3, 3, |i, j| m[i][j]);
    let svd = mat.svd();

    let (u, v) = (svd.u(), svd.v());
    let s = svd.s_diagonal();

    let mut out = Svd3 {
        u: [[0.0; 3]; 3],
        s: [0.0; 3],
        v: [[0.0; 3]; 3],
    };
    for i in 0..3 {
        out.s[i] = s.read(i);
        for j in 0..3 {
            out.u[i][j] = u.read(i, j);
            out.v[i][j] = v.read(i, j);
        }
    }
    out
}

/// Multiply two 3x3 matrices, `out = a * b`.
pub fn matmul33(a: &[[f64; 3]; 3], b: &[[f64; 3]; 3], out: &mut [[f64; 3]; 3]) {
    for i in 0..3 {
        for j in 0..3 {
            out[i][j] = a[i][0] * b[0][j] + a[i][1] * b[1][j] + a[i][2] * b[2][j];
        }
    }
}

/// Transpose a 3x3 matrix.
pub fn transpose33(m: &[[f64; 3]; 3]) -> [[f64; 3]; 3] {
    let mut out = [[0.0; 3]; 3];
    for (i, row) in m.iter().enumerate() {
        for (j, val) in row.iter().enumerate() {
            out[j][i] = *val;
        }
    }
    out
}

/// Determinant of a 3x3 matrix.
pub fn det33(m: &[[f64; 3]; 3]) -> f64 {
    m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
}

/// Multiply a 3x3 matrix by a 3-vector.
pub fn matvec33(m: &[[f64; 3]; 3], v: &[f64; 3]) -> [f64; 3] {
    [
        m[0][0] * v[0] + m[0][1] * v[1] + m[0][2] * v[2],
        m[1][0] * v[0] + m[1][1] * v[1] + m[1][2] * v[2],
        m[2][0] * v[0] + m[2][1] * v[1] + m[2][2] * v[2],
    ]
}

/// Subtract the 3D parts of two homogeneous 4-vectors, forcing the
/// homogeneous component of the result to exactly 1.
///
/// Used to re-center homogeneous coordinates without invalidating them.
pub fn sub_homogeneous(a: &[f64; 4], b: &[f64; 4]) -> [f64; 4] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2], 1.0]
}

/// Transform a set of points using a rotation and translation.
///
/// # Arguments
///
/// * `src_points` - A set of points to be transformed.
/// * `rotation` - A rotation matrix.
/// * `translation` - A translation vector.
/// * `dst_points` - A pre-allocated slice to store the transformed points.
///
/// PRECONDITION: dst_points is pre-allocated with the same size as src_points.
///
/// Example:
///
/// ```
/// use morpho_3d::linalg::transform_points;
///
/// let src_points = vec![[2.0, 2.0, 2.0], [3.0, 4.0, 5.0]];
/// let rotation = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
/// let translation = [0.0, 0.0, 0.0];
/// let mut dst_points = vec![[0.0; 3]; src_points.len()];
/// transform_points(&src_points, &rotation, &translation, &mut dst_points);
/// assert_eq!(dst_points, src_points);
/// ```
pub fn transform_points(
    src_points: &[[f64; 3]],
    rotation: &[[f64; 3]; 3],
    translation: &[f64; 3],
    dst_points: &mut [[f64; 3]],
) {
    assert_eq!(src_points.len(), dst_points.len());

    let rotation_mat = {
        let rotation_slice = unsafe {
            std::slice::from_raw_parts(rotation.as_ptr() as *const f64, rotation.len() * 3)
        };
        faer::mat::from_row_major_slice(rotation_slice, 3, 3)
    };

    // view of the source points as an N x 3 row-major matrix
    let points_in_src = {
        let src_points_slice = unsafe {
            std::slice::from_raw_parts(src_points.as_ptr() as *const f64, src_points.len() * 3)
        };
        faer::mat::from_row_major_slice(src_points_slice, src_points.len(), 3)
    };

    // mutable view of the destination points as a 3 x N column-major matrix,
    // i.e. each column is one output point
    let mut points_in_dst = {
        let dst_points_slice = unsafe {
            std::slice::from_raw_parts_mut(
                dst_points.as_mut_ptr() as *mut f64,
                dst_points.len() * 3,
            )
        };
        faer::mat::from_column_major_slice_mut(dst_points_slice, 3, dst_points.len())
    };

    faer::linalg::matmul::matmul(
        &mut points_in_dst,
        rotation_mat,
        points_in_src.transpose(),
        None,
        1.0,
        faer::Parallelism::None,
    );

    let (tx, ty, tz) = (translation[0], translation[1], translation[2]);
    for mut col in points_in_dst.col_iter_mut() {
        col.write(0, col.read(0) + tx);
        col.write(1, col.read(1) + ty);
        col.write(2, col.read(2) + tz);
    }
}

/// Compute the rotation matrix for a rotation about an arbitrary axis.
///
/// The axis does not need to be normalized, but it must be non-zero.
///
/// Example:
///
/// ```no_run
/// use morpho_3d::transforms::axis_angle_to_rotation_matrix;
///
/// let rotation = axis_angle_to_rotation_matrix(&[1.0, 0.0, 0.0], std::f64::consts::PI / 2.0).unwrap();
/// assert_eq!(rotation, [[1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]]);
/// ```
pub fn axis_angle_to_rotation_matrix(
    axis: &[f64; 3],
    angle: f64,
) -> Result<[[f64; 3]; 3], &'static str> {
    let magnitude = (axis[0].powi(2) + axis[1].powi(2) + axis[2].powi(2)).sqrt();
    if magnitude < 1e-10 {
        return Err("cannot compute rotation matrix from a zero vector");
    }
    let (x, y, z) = (axis[0] / magnitude, axis[1] / magnitude, axis[2] / magnitude);

    let c = angle.cos();
    let s = angle.sin();
    let t = 1.0 - c;

    Ok([
        [c + x * x * t, x * y * t - z * s, x * z * t + y * s],
        [x * y * t + z * s, c + y * y * t, y * z * t - x * s],
        [x * z * t - y * s, y * z * t + x * s, c + z * z * t],
    ])
}

/// Compute a rotation matrix from Euler angles applied in the given
/// axis sequence, e.g. `euler_to_rotation_matrix(&[a, b], "xz")` is the
/// rotation about x by `a` followed by the rotation about z by `b`
/// (intrinsic composition, right-multiplied).
pub fn euler_to_rotation_matrix(angles: &[f64], sequence: &str) -> Result<[[f64; 3]; 3], &'static str> {
    if angles.len() != sequence.len() {
        return Err("angles and sequence must have the same length");
    }

    let mut out = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
    for (angle, axis) in angles.iter().zip(sequence.chars()) {
        let (c, s) = (angle.cos(), angle.sin());
        let rotation = match axis {
            'x' => [[1.0, 0.0, 0.0], [0.0, c, -s], [0.0, s, c]],
            'y' => [[c, 0.0, s], [0.0, 1.0, 0.0], [-s, 0.0, c]],
            'z' => [[c, -s, 0.0], [s, c, 0.0], [0.0, 0.0, 1.0]],
            _ => return Err("rotation sequence may only contain 'x', 'y' or 'z'"),
        };
        let mut next = [[0.0; 3]; 3];
        crate::linalg::matmul33(&out, &rotation, &mut next);
        out = next;
    }
    Ok(out)
}

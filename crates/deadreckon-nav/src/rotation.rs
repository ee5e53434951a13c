use glam::{Mat3, Quat, Vec3};

/// Rotation matrix of the quaternion `(w, x, y, z)`.
///
/// The quaternion is not normalized first: a non-unit input yields a
/// non-orthonormal matrix, so callers must pass unit quaternions.
pub fn rotation_matrix(w: f32, x: f32, y: f32, z: f32) -> Mat3 {
    // Columns of
    // [1-2y²-2z²  2xy-2zw    2xz+2yw  ]
    // [2xy+2zw    1-2x²-2z²  2yz-2xw  ]
    // [2xz-2yw    2yz+2xw    1-2x²-2y²]
    Mat3::from_cols(
        Vec3::new(
            1.0 - 2.0 * y * y - 2.0 * z * z,
            2.0 * x * y + 2.0 * z * w,
            2.0 * x * z - 2.0 * y * w,
        ),
        Vec3::new(
            2.0 * x * y - 2.0 * z * w,
            1.0 - 2.0 * x * x - 2.0 * z * z,
            2.0 * y * z + 2.0 * x * w,
        ),
        Vec3::new(
            2.0 * x * z + 2.0 * y * w,
            2.0 * y * z - 2.0 * x * w,
            1.0 - 2.0 * x * x - 2.0 * y * y,
        ),
    )
}

pub fn rotation_from_quat(q: Quat) -> Mat3 {
    rotation_matrix(q.w, q.x, q.y, q.z)
}

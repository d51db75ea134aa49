use glam::{Mat3, Quat, Vec3};

pub const AIM_EPSILON: f32 = 1.0e-6;

/// Rotation that points `local_aim` along `aim_dir` while keeping `local_up`
/// as close as possible to `up_hint`.
///
/// Both frames are completed Gram-Schmidt style (aim, up, aim × up), so the
/// result is always a proper rotation. A parallel up hint falls back to an
/// arbitrary perpendicular axis: the pose is then undefined but stable.
pub fn aim_basis(aim_dir: Vec3, up_hint: Vec3, local_aim: Vec3, local_up: Vec3) -> Quat {
    if aim_dir.length_squared() < AIM_EPSILON || local_aim.length_squared() < AIM_EPSILON {
        return Quat::IDENTITY;
    }
    let world = frame(aim_dir, up_hint);
    let local = frame(local_aim, local_up);
    Quat::from_mat3(&(world * local.transpose())).normalize()
}

fn frame(aim: Vec3, up: Vec3) -> Mat3 {
    let x = aim.normalize();
    let projected = up - x * up.dot(x);
    let y = if projected.length_squared() < AIM_EPSILON {
        x.any_orthonormal_vector()
    } else {
        projected.normalize()
    };
    Mat3::from_cols(x, y, x.cross(y))
}

pub fn is_orthonormal(m: Mat3, tolerance: f32) -> bool {
    let (x, y, z) = (m.x_axis, m.y_axis, m.z_axis);
    (x.length() - 1.0).abs() < tolerance
        && (y.length() - 1.0).abs() < tolerance
        && (z.length() - 1.0).abs() < tolerance
        && x.dot(y).abs() < tolerance
        && y.dot(z).abs() < tolerance
        && z.dot(x).abs() < tolerance
        && x.cross(y).abs_diff_eq(z, tolerance)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aims_local_axis_at_direction() {
        let q = aim_basis(Vec3::new(0.0, 0.0, -3.0), Vec3::Y, Vec3::X, Vec3::Y);
        assert!((q * Vec3::X).abs_diff_eq(Vec3::NEG_Z, 1e-5));
        assert!((q * Vec3::Y).abs_diff_eq(Vec3::Y, 1e-5));
    }

    #[test]
    fn up_hint_is_projected_off_the_aim() {
        let q = aim_basis(Vec3::X, Vec3::new(1.0, 1.0, 0.0), Vec3::X, Vec3::Y);
        assert!((q * Vec3::Y).abs_diff_eq(Vec3::Y, 1e-5));
    }

    #[test]
    fn parallel_up_degrades_to_a_valid_rotation() {
        let q = aim_basis(Vec3::Y, Vec3::Y, Vec3::X, Vec3::Y);
        assert!(is_orthonormal(Mat3::from_quat(q), 1e-4));
        assert!((q * Vec3::X).abs_diff_eq(Vec3::Y, 1e-5));
    }
}

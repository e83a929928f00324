//! Euler angle to rotation vector conversion.

use glam::{DQuat, DVec3};

/// Converts intrinsic X→Y→Z Euler angles (radians) into a rotation vector.
///
/// The result is `angle * axis` of the combined rotation, with the angle in
/// `[0, π]`.
///
/// ```
/// use pad_teleop::controller::rotation::euler_xyz_to_rotvec;
///
/// let v = euler_xyz_to_rotvec(0.0, 0.0, 0.5);
/// assert!((v.z - 0.5).abs() < 1e-12);
/// ```
#[must_use]
pub fn euler_xyz_to_rotvec(roll: f64, pitch: f64, yaw: f64) -> DVec3 {
    // Intrinsic XYZ composes left to right
    let q = DQuat::from_rotation_x(roll) * DQuat::from_rotation_y(pitch) * DQuat::from_rotation_z(yaw);

    // Pick the hemisphere with w >= 0 so the angle stays within [0, π]
    let q = if q.w < 0.0 { -q } else { q };
    q.to_scaled_axis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    const EPS: f64 = 1e-9;

    fn assert_vec_eq(actual: DVec3, expected: DVec3) {
        assert!(
            (actual - expected).length() < EPS,
            "expected {:?}, got {:?}",
            expected,
            actual
        );
    }

    #[test]
    fn test_zero_angles() {
        assert_vec_eq(euler_xyz_to_rotvec(0.0, 0.0, 0.0), DVec3::ZERO);
    }

    #[test]
    fn test_pure_yaw() {
        for theta in [0.1, 1.6, -0.7, FRAC_PI_2] {
            assert_vec_eq(euler_xyz_to_rotvec(0.0, 0.0, theta), DVec3::new(0.0, 0.0, theta));
        }
    }

    #[test]
    fn test_pure_roll_and_pitch() {
        assert_vec_eq(euler_xyz_to_rotvec(0.3, 0.0, 0.0), DVec3::new(0.3, 0.0, 0.0));
        assert_vec_eq(euler_xyz_to_rotvec(0.0, -0.4, 0.0), DVec3::new(0.0, -0.4, 0.0));
    }

    #[test]
    fn test_angle_wraps_into_half_turn() {
        // 3π/2 about Z is the same rotation as -π/2 about Z
        assert_vec_eq(
            euler_xyz_to_rotvec(0.0, 0.0, 1.5 * PI),
            DVec3::new(0.0, 0.0, -FRAC_PI_2),
        );
    }

    #[test]
    fn test_combined_rotation_matches_quaternion() {
        let (roll, pitch, yaw) = (0.2, -0.3, 0.4);
        let rotvec = euler_xyz_to_rotvec(roll, pitch, yaw);

        let expected = DQuat::from_rotation_x(roll)
            * DQuat::from_rotation_y(pitch)
            * DQuat::from_rotation_z(yaw);
        let rebuilt = DQuat::from_scaled_axis(rotvec);

        // Same rotation up to quaternion sign
        assert!(rebuilt.dot(expected).abs() > 1.0 - EPS);
        assert!(rotvec.length() <= PI + EPS);
    }
}

use deadreckon_config::PipelineConfig;
use glam::{Mat3, Vec3};

/// Rotates sensor-frame acceleration into the reference frame and removes gravity.
#[derive(Debug, Clone, Copy)]
pub struct FrameTransformer {
    /// Unit gravity direction in the reference frame (g units).
    gravity_direction: Vec3,
    /// Scale from g to m/s^2.
    gravity_magnitude: f32,
}

impl FrameTransformer {
    pub fn new(gravity_direction: Vec3, gravity_magnitude: f32) -> Self {
        Self {
            gravity_direction,
            gravity_magnitude,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.gravity_direction, config.gravity_magnitude)
    }

    /// Tilt compensation: `rotation * accel`.
    pub fn tilt_compensate(&self, rotation: Mat3, accel: Vec3) -> Vec3 {
        rotation * accel
    }

    /// Gravity compensation: `(accel - g_dir) * g_mag`.
    pub fn remove_gravity(&self, reference_accel: Vec3) -> Vec3 {
        (reference_accel - self.gravity_direction) * self.gravity_magnitude
    }

    /// Linear acceleration (m/s^2) of one sample.
    pub fn linear_acceleration(&self, rotation: Mat3, accel: Vec3) -> Vec3 {
        self.remove_gravity(self.tilt_compensate(rotation, accel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rotation::rotation_from_quat;
    use glam::Quat;

    #[test]
    fn resting_sensor_has_no_linear_acceleration() {
        let transformer = FrameTransformer::new(Vec3::Z, 9.81);
        let linear = transformer.linear_acceleration(Mat3::IDENTITY, Vec3::Z);
        assert_eq!(linear, Vec3::ZERO);
    }

    #[test]
    fn excess_g_is_scaled_to_m_s2() {
        let transformer = FrameTransformer::new(Vec3::Z, 9.81);
        let linear = transformer.linear_acceleration(Mat3::IDENTITY, Vec3::new(0.0, 0.0, 2.0));
        assert!((linear - Vec3::new(0.0, 0.0, 9.81)).length() < 1e-5);
    }

    #[test]
    fn tilted_sensor_reading_is_rotated_before_gravity_removal() {
        // Sensor pitched 90 degrees: gravity shows up on its local X axis.
        let q = Quat::from_rotation_y(-std::f32::consts::FRAC_PI_2);
        let rotation = rotation_from_quat(q);
        let transformer = FrameTransformer::new(Vec3::Z, 9.81);

        let linear = transformer.linear_acceleration(rotation, Vec3::X);
        assert!(linear.length() < 1e-5, "{linear:?}");
    }
}

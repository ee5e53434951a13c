use glam::{Mat3, Quat, Vec3};

/// A captured session: per-sample time step, orientation and raw acceleration.
///
/// Columns are stored flat and index-aligned by sample number:
/// `dt[i]`, `quat[4i..4i+4]` as `(w, x, y, z)`, `accel[3i..3i+3]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleBuffer {
    dt: Vec<f32>,
    quat: Vec<f32>,
    accel: Vec<f32>,
}

impl SampleBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(samples: usize) -> Self {
        Self {
            dt: Vec::with_capacity(samples),
            quat: Vec::with_capacity(samples * 4),
            accel: Vec::with_capacity(samples * 3),
        }
    }

    /// Build a buffer from already-flattened columns. Lengths are checked when a run starts.
    pub fn from_columns(dt: Vec<f32>, quat: Vec<f32>, accel: Vec<f32>) -> Self {
        Self { dt, quat, accel }
    }

    /// Append one sample. `quat` is `(w, x, y, z)`.
    pub fn push(&mut self, dt: f32, quat: [f32; 4], accel: [f32; 3]) {
        self.dt.push(dt);
        self.quat.extend_from_slice(&quat);
        self.accel.extend_from_slice(&accel);
    }

    /// Number of samples (length of the time column).
    pub fn len(&self) -> usize {
        self.dt.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dt.is_empty()
    }

    pub fn dt(&self) -> &[f32] {
        &self.dt
    }

    pub fn quat_components(&self) -> &[f32] {
        &self.quat
    }

    pub fn accel_components(&self) -> &[f32] {
        &self.accel
    }

    /// Orientation of sample `i`. Panics if `i` is out of range.
    pub fn quaternion(&self, i: usize) -> Quat {
        let q = &self.quat[4 * i..4 * i + 4];
        Quat::from_xyzw(q[1], q[2], q[3], q[0])
    }

    /// Raw sensor-frame acceleration of sample `i`. Panics if `i` is out of range.
    pub fn acceleration(&self, i: usize) -> Vec3 {
        Vec3::from_slice(&self.accel[3 * i..3 * i + 3])
    }
}

/// Every buffer produced by one pipeline run, all of length N (or empty for N < 2).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineOutput {
    /// Sensor-to-reference rotation per sample.
    pub rotations: Vec<Mat3>,
    /// Tilt- and gravity-compensated acceleration (m/s^2).
    pub linear_acceleration: Vec<Vec3>,
    /// Integrated velocity before drift removal.
    pub raw_velocity: Vec<Vec3>,
    /// High-pass filtered velocity (m/s).
    pub velocity: Vec<Vec3>,
    /// Integrated position before drift removal.
    pub raw_position: Vec<Vec3>,
    /// High-pass filtered position (m).
    pub position: Vec<Vec3>,
    /// `1 / mean(dt)` of the recording.
    pub sample_rate_hz: f64,
    /// Filter cutoff as a fraction of the Nyquist rate, after clamping.
    pub normalized_cutoff: f64,
}

impl PipelineOutput {
    pub fn len(&self) -> usize {
        self.position.len()
    }

    pub fn is_empty(&self) -> bool {
        self.position.is_empty()
    }

    /// Velocity and position flattened as `x, y, z` per sample.
    pub fn flattened(&self) -> (Vec<f32>, Vec<f32>) {
        let flat = |v: &[Vec3]| v.iter().flat_map(|p| p.to_array()).collect::<Vec<f32>>();
        (flat(&self.velocity), flat(&self.position))
    }
}

/// Lifecycle of the orchestrator's current run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    #[default]
    Idle,
    Running,
    Completed,
    Failed,
}

impl RunState {
    /// Whether the run has ended, successfully or not.
    pub fn is_finished(self) -> bool {
        matches!(self, RunState::Completed | RunState::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors_follow_column_layout() {
        let mut buffer = SampleBuffer::new();
        buffer.push(0.0, [1.0, 0.0, 0.0, 0.0], [0.0, 0.0, 1.0]);
        buffer.push(0.01, [0.5, 0.5, -0.5, 0.5], [1.0, 2.0, 3.0]);

        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.quat_components().len(), 8);

        let q = buffer.quaternion(1);
        assert_eq!((q.w, q.x, q.y, q.z), (0.5, 0.5, -0.5, 0.5));
        assert_eq!(buffer.acceleration(1), Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    #[should_panic]
    fn out_of_range_sample_panics() {
        let buffer = SampleBuffer::from_columns(vec![0.0], vec![1.0, 0.0, 0.0, 0.0], vec![0.0; 3]);
        let _ = buffer.acceleration(1);
    }

    #[test]
    fn flattened_output_interleaves_axes() {
        let output = PipelineOutput {
            velocity: vec![Vec3::new(1.0, 2.0, 3.0), Vec3::new(4.0, 5.0, 6.0)],
            position: vec![Vec3::ZERO, Vec3::ONE],
            ..Default::default()
        };
        let (vel, pos) = output.flattened();
        assert_eq!(vel, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(pos, vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
    }
}

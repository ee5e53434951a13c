use crate::filter::{self, ZeroPhaseHighPass};
use crate::frame::FrameTransformer;
use crate::integrate::{self, integrate_series};
use crate::rotation::rotation_from_quat;
use crate::types::{PipelineOutput, SampleBuffer};
use deadreckon_config::PipelineConfig;
use glam::{Mat3, Vec3};

/// Stages that each tick once per sample: rotate, transform, integrate
/// velocity, filter velocity, integrate position, filter position.
pub const STAGE_COUNT: u64 = 6;

/// Progress ticks a full run over `samples` samples produces.
pub fn expected_ticks(samples: usize) -> u64 {
    if samples < 2 {
        0
    } else {
        STAGE_COUNT * samples as u64
    }
}

/// Run every stage over `buffer` on the calling thread.
///
/// `tick(n)` is called as samples are processed; the sum of all calls equals
/// [`expected_ticks`]. Fewer than two samples produce an empty output.
/// The buffer's column lengths must already agree (see `validate`).
pub fn run_pipeline(
    buffer: &SampleBuffer,
    config: &PipelineConfig,
    mut tick: impl FnMut(u64),
) -> PipelineOutput {
    let n = buffer.len();
    if n < 2 {
        tracing::debug!(samples = n, "Not enough samples to integrate");
        return PipelineOutput::default();
    }

    let rotations: Vec<Mat3> = (0..n)
        .map(|i| {
            let rotation = rotation_from_quat(buffer.quaternion(i));
            tick(1);
            rotation
        })
        .collect();
    tracing::debug!(samples = n, "Rotation matrices computed");

    let transformer = FrameTransformer::from_config(config);
    let linear_acceleration: Vec<Vec3> = rotations
        .iter()
        .enumerate()
        .map(|(i, &rotation)| {
            let linear = transformer.linear_acceleration(rotation, buffer.acceleration(i));
            tick(1);
            linear
        })
        .collect();
    tracing::debug!("Tilt and gravity compensation applied");

    let sample_rate_hz = filter::sample_rate(buffer.dt());
    let normalized_cutoff = filter::normalized_cutoff(config.filter_cutoff as f64, sample_rate_hz);
    let high_pass = ZeroPhaseHighPass::from_normalized(normalized_cutoff);
    let integrator = integrate::for_scheme(config.integration_scheme);
    tracing::debug!(
        sample_rate_hz,
        normalized_cutoff,
        scheme = ?config.integration_scheme,
        "Integration parameters"
    );

    let raw_velocity = integrate_series(integrator.as_ref(), buffer.dt(), &linear_acceleration, || tick(1));
    let mut velocity = raw_velocity.clone();
    high_pass.apply_with_progress(&mut velocity, || tick(1));
    tracing::debug!("Velocity integrated and filtered");

    let raw_position = integrate_series(integrator.as_ref(), buffer.dt(), &velocity, || tick(1));
    let mut position = raw_position.clone();
    high_pass.apply_with_progress(&mut position, || tick(1));
    tracing::debug!("Position integrated and filtered");

    PipelineOutput {
        rotations,
        linear_acceleration,
        raw_velocity,
        velocity,
        raw_position,
        position,
        sample_rate_hz,
        normalized_cutoff,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deadreckon_config::IntegrationScheme;

    fn resting(samples: usize, g: f32) -> SampleBuffer {
        let mut buffer = SampleBuffer::new();
        for i in 0..samples {
            let dt = if i == 0 { 0.0 } else { 1.0 };
            buffer.push(dt, [1.0, 0.0, 0.0, 0.0], [0.0, 0.0, g]);
        }
        buffer
    }

    #[test]
    fn tick_total_matches_expected() {
        let buffer = resting(10, 1.0);
        let mut ticks = 0;
        run_pipeline(&buffer, &PipelineConfig::default(), |n| ticks += n);
        assert_eq!(ticks, expected_ticks(10));
        assert_eq!(ticks, 60);
    }

    #[test]
    fn single_sample_yields_empty_output() {
        let buffer = resting(1, 1.0);
        let mut ticks = 0;
        let output = run_pipeline(&buffer, &PipelineConfig::default(), |n| ticks += n);
        assert!(output.is_empty());
        assert!(output.rotations.is_empty());
        assert_eq!(ticks, 0);
    }

    #[test]
    fn over_reported_gravity_integrates_linearly() {
        let config = PipelineConfig {
            integration_scheme: IntegrationScheme::Rectangular,
            ..Default::default()
        };
        let output = run_pipeline(&resting(3, 2.0), &config, |_| {});

        for a in &output.linear_acceleration {
            assert!((*a - Vec3::new(0.0, 0.0, 9.81)).length() < 1e-5);
        }
        assert_eq!(output.raw_velocity[0], Vec3::ZERO);
        assert!((output.raw_velocity[1] - Vec3::new(0.0, 0.0, 9.81)).length() < 1e-5);
        assert!((output.raw_velocity[2] - Vec3::new(0.0, 0.0, 19.62)).length() < 1e-4);
    }

    #[test]
    fn reports_sample_rate_and_cutoff() {
        let output = run_pipeline(&resting(3, 1.0), &PipelineConfig::default(), |_| {});
        // mean(dt) = 2/3 s -> 1.5 Hz; 0.1 Hz / 0.75 Hz Nyquist.
        assert!((output.sample_rate_hz - 1.5).abs() < 1e-9);
        assert!((output.normalized_cutoff - 0.1 / 0.75).abs() < 1e-6);
    }
}

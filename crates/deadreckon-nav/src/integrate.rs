//! Numerical integration of a 3-axis series over per-sample time steps.
//!
//! The scheme is picked once per run with [`for_scheme`] and then applied to
//! every sample, so the hot loop never branches on it.

use deadreckon_config::IntegrationScheme;
use glam::Vec3;

/// One-step integration rule.
pub trait Integrator: Send + Sync {
    /// Increment over one step given the input at both ends of the interval.
    fn step(&self, previous: Vec3, current: Vec3, dt: f32) -> Vec3;

    /// Fill `output[i]` from `output[i - 1]` and `input[i - 1..=i]`.
    ///
    /// `i == 0` leaves `output[0]` untouched. Panics if `i` is out of range.
    fn integrate_at(&self, i: usize, dt: &[f32], input: &[Vec3], output: &mut [Vec3]) {
        if i == 0 {
            return;
        }
        output[i] = output[i - 1] + self.step(input[i - 1], input[i], dt[i]);
    }
}

/// Method of squares: only the current sample is used.
#[derive(Debug, Clone, Copy, Default)]
pub struct Rectangular;

impl Integrator for Rectangular {
    fn step(&self, _previous: Vec3, current: Vec3, dt: f32) -> Vec3 {
        current * dt
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Trapezoidal;

impl Integrator for Trapezoidal {
    fn step(&self, previous: Vec3, current: Vec3, dt: f32) -> Vec3 {
        (previous + current) * dt / 2.0
    }
}

/// Runge-Kutta style weighting with only the two endpoint samples available.
///
/// `k2` and `k3` are the same linear midpoint estimate, so this is not a true
/// fourth-order step. The formula is kept as-is because recorded results
/// depend on it.
#[derive(Debug, Clone, Copy, Default)]
pub struct Rk4Like;

impl Integrator for Rk4Like {
    fn step(&self, previous: Vec3, current: Vec3, dt: f32) -> Vec3 {
        let k1 = previous * dt;
        let k2 = (previous + 0.5 * (current - previous)) * dt;
        let k3 = k2;
        let k4 = current * dt;
        (k1 + 2.0 * k2 + 2.0 * k3 + k4) / 6.0
    }
}

/// Integrator implementing `scheme`.
pub fn for_scheme(scheme: IntegrationScheme) -> Box<dyn Integrator> {
    match scheme {
        IntegrationScheme::Rectangular => Box::new(Rectangular),
        IntegrationScheme::Trapezoidal => Box::new(Trapezoidal),
        IntegrationScheme::Rk4Like => Box::new(Rk4Like),
    }
}

/// Integrate a whole series with a dynamically selected scheme.
pub fn integrate_series(
    integrator: &dyn Integrator,
    dt: &[f32],
    input: &[Vec3],
    mut on_sample: impl FnMut(),
) -> Vec<Vec3> {
    let mut output = vec![Vec3::ZERO; input.len()];
    for i in 0..input.len() {
        integrator.integrate_at(i, dt, input, &mut output);
        on_sample();
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMES: [IntegrationScheme; 3] = [
        IntegrationScheme::Rectangular,
        IntegrationScheme::Trapezoidal,
        IntegrationScheme::Rk4Like,
    ];

    fn run(scheme: IntegrationScheme, dt: &[f32], input: &[Vec3]) -> Vec<Vec3> {
        integrate_series(for_scheme(scheme).as_ref(), dt, input, || {})
    }

    #[test]
    fn first_sample_stays_zero_for_every_scheme() {
        let dt = [0.5, 0.5, 0.5];
        let input = [Vec3::new(3.0, -1.0, 2.0); 3];
        for scheme in SCHEMES {
            let out = run(scheme, &dt, &input);
            assert_eq!(out[0], Vec3::ZERO, "{scheme:?}");
        }
    }

    #[test]
    fn index_zero_is_a_no_op() {
        let mut output = [Vec3::splat(7.0), Vec3::ZERO];
        Trapezoidal.integrate_at(0, &[1.0, 1.0], &[Vec3::ONE, Vec3::ONE], &mut output);
        assert_eq!(output[0], Vec3::splat(7.0));
    }

    #[test]
    fn rectangular_is_exact_for_piecewise_constant_input() {
        // Each interval (i-1, i] holds the value of sample i.
        let dt = [0.0, 0.1, 0.25, 0.5];
        let input = [
            Vec3::ZERO,
            Vec3::new(2.0, 0.0, -4.0),
            Vec3::new(-1.0, 3.0, 0.0),
            Vec3::new(0.5, 0.5, 0.5),
        ];
        let out = integrate_series(&Rectangular, &dt, &input, || {});

        let expected = Vec3::new(2.0, 0.0, -4.0) * 0.1
            + Vec3::new(-1.0, 3.0, 0.0) * 0.25
            + Vec3::new(0.5, 0.5, 0.5) * 0.5;
        assert!((out[3] - expected).length() < 1e-6);
    }

    #[test]
    fn trapezoidal_is_exact_for_linear_input() {
        // a(t) = 2t on an irregular grid; v(t) = t^2.
        let times = [0.0f32, 0.5, 0.75, 1.5, 2.0];
        let dt: Vec<f32> = std::iter::once(0.0)
            .chain(times.windows(2).map(|w| w[1] - w[0]))
            .collect();
        let input: Vec<Vec3> = times.iter().map(|&t| Vec3::new(2.0 * t, 0.0, -2.0 * t)).collect();

        let out = integrate_series(&Trapezoidal, &dt, &input, || {});
        for (t, v) in times.iter().zip(&out) {
            assert!((v.x - t * t).abs() < 1e-5, "t={t} v={v:?}");
            assert!((v.z + t * t).abs() < 1e-5);
        }
    }

    #[test]
    fn rk4_like_keeps_its_endpoint_weighting() {
        let step = Rk4Like.step(Vec3::new(1.0, 0.0, 0.0), Vec3::new(3.0, 0.0, 0.0), 2.0);
        // k1 = 2, k2 = k3 = 4, k4 = 6 -> (2 + 8 + 8 + 6) / 6 = 4
        assert!((step.x - 4.0).abs() < 1e-6);
    }

    #[test]
    fn constant_input_gives_linear_growth() {
        let dt = [0.0, 1.0, 1.0];
        let input = [Vec3::new(0.0, 0.0, 9.81); 3];
        let out = integrate_series(&Rectangular, &dt, &input, || {});
        assert!((out[1].z - 9.81).abs() < 1e-5);
        assert!((out[2].z - 19.62).abs() < 1e-5);
    }

    #[test]
    fn progress_callback_fires_once_per_sample() {
        let mut ticks = 0;
        let _ = integrate_series(&Rk4Like, &[0.0, 1.0, 1.0, 1.0], &[Vec3::ONE; 4], || ticks += 1);
        assert_eq!(ticks, 4);
    }
}

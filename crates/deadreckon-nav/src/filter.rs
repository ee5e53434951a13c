//! Zero-phase first-order high-pass filter used to strip integration drift.
//!
//! The filter runs forward then backward over each axis (filtfilt), which
//! cancels the phase lag of the single pass. All arithmetic is `f64` so long
//! recordings do not accumulate single-precision error.

use glam::Vec3;

/// Replacement for a normalized cutoff at or below zero (or NaN).
pub const MIN_NORMALIZED_CUTOFF: f64 = 0.01;
/// Replacement for a normalized cutoff at or above Nyquist.
pub const MAX_NORMALIZED_CUTOFF: f64 = 0.99;

/// Sample rate of a recording: `1 / mean(dt)`.
///
/// An empty series or a zero mean gives a non-finite rate, which
/// [`normalized_cutoff`] maps back into range.
pub fn sample_rate(dt: &[f32]) -> f64 {
    let sum: f64 = dt.iter().map(|&d| d as f64).sum();
    let mean = sum / dt.len() as f64;
    1.0 / mean
}

/// Cutoff as a fraction of the Nyquist rate.
///
/// Values inside `(0, 1)` pass through unchanged. `>= 1` becomes
/// [`MAX_NORMALIZED_CUTOFF`]; `<= 0` or NaN becomes [`MIN_NORMALIZED_CUTOFF`].
pub fn normalized_cutoff(cutoff_hz: f64, sample_rate_hz: f64) -> f64 {
    let nyquist = 0.5 * sample_rate_hz;
    let normalized = cutoff_hz / nyquist;
    if normalized >= 1.0 {
        MAX_NORMALIZED_CUTOFF
    } else if normalized > 0.0 {
        normalized
    } else {
        MIN_NORMALIZED_CUTOFF
    }
}

/// First-order Butterworth high-pass, applied forward and backward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZeroPhaseHighPass {
    b0: f64,
    b1: f64,
    a1: f64,
}

impl ZeroPhaseHighPass {
    /// Build from a cutoff given as a fraction of the Nyquist rate.
    pub fn from_normalized(normalized_cutoff: f64) -> Self {
        let tan_wc = (std::f64::consts::PI * normalized_cutoff).tan();
        let b0 = 1.0 / (1.0 + tan_wc);
        Self {
            b0,
            b1: -b0,
            a1: (tan_wc - 1.0) / (tan_wc + 1.0),
        }
    }

    /// Build from a cutoff in Hz and the recording's sample rate.
    pub fn new(cutoff_hz: f64, sample_rate_hz: f64) -> Self {
        Self::from_normalized(normalized_cutoff(cutoff_hz, sample_rate_hz))
    }

    pub fn coefficients(&self) -> (f64, f64, f64) {
        (self.b0, self.b1, self.a1)
    }

    /// One causal pass with zero initial state.
    fn pass(&self, input: impl Iterator<Item = f64>) -> Vec<f64> {
        let mut out = Vec::with_capacity(input.size_hint().0);
        let (mut x_prev, mut y_prev) = (0.0, 0.0);
        for x in input {
            let y = self.b0 * x + self.b1 * x_prev - self.a1 * y_prev;
            out.push(y);
            x_prev = x;
            y_prev = y;
        }
        out
    }

    /// Forward-backward filter a single channel.
    pub fn filtfilt(&self, signal: &[f64]) -> Vec<f64> {
        let forward = self.pass(signal.iter().copied());
        let mut backward = self.pass(forward.into_iter().rev());
        backward.reverse();
        backward
    }

    /// Filter each axis of `series` independently, in place.
    pub fn apply(&self, series: &mut [Vec3]) {
        self.apply_with_progress(series, || {});
    }

    /// Like [`apply`](Self::apply), calling `on_sample` once per sample as
    /// the last axis is written back.
    pub fn apply_with_progress(&self, series: &mut [Vec3], mut on_sample: impl FnMut()) {
        for axis in 0..3 {
            let channel: Vec<f64> = series.iter().map(|v| v[axis] as f64).collect();
            for (v, y) in series.iter_mut().zip(self.filtfilt(&channel)) {
                v[axis] = y as f32;
                if axis == 2 {
                    on_sample();
                }
            }
        }
    }
}

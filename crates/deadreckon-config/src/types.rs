use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Folder the recorder writes `recording_*.csv` sessions into.
    /// Used to pick the newest session when no file is given.
    #[serde(default)]
    pub recordings_dir: Option<PathBuf>,
    /// Dead-reckoning pipeline settings.
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Numerical integration scheme, used for both the velocity and position passes.
    pub integration_scheme: IntegrationScheme,
    /// Unit vector of gravity in the reference frame, in units of g.
    /// Written as a `[x, y, z]` array.
    pub gravity_direction: Vec3,
    /// Gravity magnitude (m/s^2). Converts g-relative readings to physical units.
    pub gravity_magnitude: f32,
    /// High-pass cutoff (Hz) for drift removal. Scaled by the Nyquist rate of
    /// the recording before use.
    pub filter_cutoff: f32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            integration_scheme: IntegrationScheme::default(),
            gravity_direction: Vec3::Z,
            gravity_magnitude: 9.81,
            filter_cutoff: 0.1,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrationScheme {
    /// Method of squares: `out[i] = out[i-1] + in[i]*dt`.
    Rectangular,
    /// Average of both endpoints.
    Trapezoidal,
    /// Four-slope weighting built from the two endpoint samples.
    #[default]
    #[serde(alias = "rk4-like", alias = "rk4")]
    Rk4Like,
}

use anyhow::{anyhow, Context, Result};
use deadreckon_config::AppConfig;
use deadreckon_nav::{Pipeline, PipelineOutput, RunState};
use glam::Vec3;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

/// How often progress is logged while the pipeline runs.
const PROGRESS_INTERVAL: Duration = Duration::from_millis(250);

/// Pick the recording to process: the CLI argument, else the newest one in
/// the configured recordings folder.
fn resolve_recording(config: &AppConfig) -> Result<PathBuf> {
    if let Some(arg) = std::env::args_os().nth(1) {
        return Ok(PathBuf::from(arg));
    }
    let dir = config
        .recordings_dir
        .as_deref()
        .ok_or_else(|| anyhow!("usage: deadreckon <recording.csv> (or set recordings_dir in the config)"))?;
    deadreckon_recording::latest_recording(dir)?
        .ok_or_else(|| anyhow!("No recording_*.csv found in {}", dir.display()))
}

/// Summary statistics of a finished run.
struct TrajectorySummary {
    samples: usize,
    final_position: Vec3,
    peak_displacement: f32,
    peak_speed: f32,
}

impl TrajectorySummary {
    fn from_output(output: &PipelineOutput) -> Self {
        let peak = |series: &[Vec3]| series.iter().map(|v| v.length()).fold(0.0f32, f32::max);
        Self {
            samples: output.len(),
            final_position: output.position.last().copied().unwrap_or(Vec3::ZERO),
            peak_displacement: peak(&output.position),
            peak_speed: peak(&output.velocity),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "deadreckon=info,deadreckon_nav=info,deadreckon_recording=info".into()
            }),
        )
        .init();

    // Load config.
    let config = deadreckon_config::load_config().unwrap_or_else(|e| {
        warn!(?e, "Failed to load config, using defaults");
        AppConfig::default()
    });
    info!(?config.pipeline.integration_scheme, cutoff = config.pipeline.filter_cutoff, "Config loaded");

    let path = resolve_recording(&config)?;
    let (buffer, stats) = deadreckon_recording::load_recording(&path)
        .with_context(|| format!("loading {}", path.display()))?;
    if stats.substituted_fields > 0 {
        warn!(fields = stats.substituted_fields, "Recording had malformed fields (replaced with 0)");
    }

    let mut pipeline = Pipeline::new(config.pipeline.clone());
    let progress = pipeline.handle();
    pipeline.start(buffer)?;

    let finished = progress.finished();
    tokio::pin!(finished);
    let mut ticker = tokio::time::interval(PROGRESS_INTERVAL);
    let state = loop {
        tokio::select! {
            state = &mut finished => break state,
            _ = ticker.tick() => {
                info!(
                    percent = format!("{:.1}", progress.percent()),
                    ticks = progress.progress(),
                    total = progress.total_expected_ticks(),
                    "Processing"
                );
            }
        }
    };

    let output = pipeline.wait()?;
    if state != RunState::Completed {
        return Err(anyhow!("Pipeline run ended in state {state:?}"));
    }

    let summary = TrajectorySummary::from_output(output);
    info!(
        samples = summary.samples,
        sample_rate_hz = format!("{:.2}", output.sample_rate_hz),
        normalized_cutoff = format!("{:.4}", output.normalized_cutoff),
        "Dead reckoning complete"
    );
    info!(
        final_position = ?summary.final_position,
        peak_displacement_m = summary.peak_displacement,
        peak_speed_m_s = summary.peak_speed,
        "Trajectory"
    );

    Ok(())
}

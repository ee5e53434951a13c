pub mod filter;
pub mod frame;
pub mod integrate;
pub mod rotation;
pub mod run;
pub mod types;

pub use run::{expected_ticks, run_pipeline, STAGE_COUNT};
pub use types::{PipelineOutput, RunState, SampleBuffer};

use deadreckon_config::PipelineConfig;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::watch;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Insufficient data: {components} quaternion components, need at least 4")]
    InsufficientData { components: usize },
    #[error(
        "Column lengths disagree: {samples} samples, {quat_components} quaternion \
         components, {accel_components} acceleration components"
    )]
    LengthMismatch {
        samples: usize,
        quat_components: usize,
        accel_components: usize,
    },
    #[error("A pipeline run is already in progress")]
    AlreadyRunning,
    #[error("No pipeline output available")]
    NotStarted,
    #[error("Pipeline worker panicked")]
    WorkerPanicked,
    #[error("Failed to spawn pipeline worker: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Check that a buffer can be run.
///
/// An empty buffer is valid and produces an empty output.
pub fn validate(buffer: &SampleBuffer) -> Result<(), PipelineError> {
    let samples = buffer.len();
    if samples == 0 {
        return Ok(());
    }
    let quat_components = buffer.quat_components().len();
    if quat_components < 4 {
        return Err(PipelineError::InsufficientData {
            components: quat_components,
        });
    }
    let accel_components = buffer.accel_components().len();
    if quat_components != 4 * samples || accel_components != 3 * samples {
        return Err(PipelineError::LengthMismatch {
            samples,
            quat_components,
            accel_components,
        });
    }
    Ok(())
}

/// State shared between the orchestrator, its worker and observers.
struct Shared {
    ticks: AtomicU64,
    total_ticks: AtomicU64,
    running: AtomicBool,
    state: watch::Sender<RunState>,
}

impl Shared {
    fn finish(&self, state: RunState) {
        self.running.store(false, Ordering::Release);
        self.state.send_replace(state);
    }
}

/// Marks the run failed if the worker unwinds before finishing.
struct PanicGuard(Arc<Shared>);

impl Drop for PanicGuard {
    fn drop(&mut self) {
        if std::thread::panicking() {
            tracing::error!("Pipeline worker panicked");
            self.0.finish(RunState::Failed);
        }
    }
}

/// Read-only view of a pipeline's progress, cheap to clone across threads.
#[derive(Clone)]
pub struct ProgressHandle {
    shared: Arc<Shared>,
    state_rx: watch::Receiver<RunState>,
}

impl ProgressHandle {
    /// Samples processed so far, summed over stages. Resets when a run starts.
    pub fn progress(&self) -> u64 {
        self.shared.ticks.load(Ordering::Relaxed)
    }

    /// `STAGE_COUNT * N` for the current run (0 when there is nothing to integrate).
    pub fn total_expected_ticks(&self) -> u64 {
        self.shared.total_ticks.load(Ordering::Relaxed)
    }

    /// Completion in percent (0-100).
    pub fn percent(&self) -> f32 {
        let total = self.total_expected_ticks();
        if total == 0 {
            return if self.state() == RunState::Completed { 100.0 } else { 0.0 };
        }
        (self.progress().min(total) as f64 / total as f64 * 100.0) as f32
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    pub fn state(&self) -> RunState {
        *self.state_rx.borrow()
    }

    /// Wait until the current run completes or fails.
    ///
    /// While idle this waits for the next run to be started and to finish.
    pub async fn finished(&self) -> RunState {
        let mut rx = self.state_rx.clone();
        let result = rx.wait_for(|state| state.is_finished()).await.map(|state| *state);
        // The sender lives in `Shared`, which this handle keeps alive.
        result.unwrap_or(RunState::Failed)
    }
}

/// Dead-reckoning pipeline orchestrator.
///
/// Runs the stages over a [`SampleBuffer`] on a background thread, one run at
/// a time. Progress can be polled from any thread through [`ProgressHandle`];
/// the result is collected with [`Pipeline::wait`] or [`Pipeline::output`].
/// Dropping the pipeline blocks until an in-flight run has finished.
pub struct Pipeline {
    config: PipelineConfig,
    shared: Arc<Shared>,
    state_rx: watch::Receiver<RunState>,
    worker: Option<JoinHandle<PipelineOutput>>,
    output: Option<PipelineOutput>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        let (state_tx, state_rx) = watch::channel(RunState::Idle);
        Self {
            config,
            shared: Arc::new(Shared {
                ticks: AtomicU64::new(0),
                total_ticks: AtomicU64::new(0),
                running: AtomicBool::new(false),
                state: state_tx,
            }),
            state_rx,
            worker: None,
            output: None,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Settings for the next run. The current run keeps the settings it started with.
    pub fn set_config(&mut self, config: PipelineConfig) {
        self.config = config;
    }

    pub fn handle(&self) -> ProgressHandle {
        ProgressHandle {
            shared: self.shared.clone(),
            state_rx: self.state_rx.clone(),
        }
    }

    pub fn state(&self) -> RunState {
        *self.state_rx.borrow()
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    pub fn progress(&self) -> u64 {
        self.shared.ticks.load(Ordering::Relaxed)
    }

    pub fn total_expected_ticks(&self) -> u64 {
        self.shared.total_ticks.load(Ordering::Relaxed)
    }

    /// Start a run over `buffer` on a worker thread.
    ///
    /// Rejected while a run is in progress. A buffer that fails [`validate`]
    /// marks the pipeline `Failed` and leaves the previous output in place;
    /// otherwise the previous output is discarded before the worker starts.
    pub fn start(&mut self, buffer: SampleBuffer) -> Result<(), PipelineError> {
        if self.is_running() {
            return Err(PipelineError::AlreadyRunning);
        }
        // The previous worker may still be exiting after clearing `running`.
        if let Some(worker) = self.worker.take() {
            if let Err(e) = self.join(worker) {
                tracing::warn!(%e, "Previous run produced no output");
            }
        }

        if let Err(e) = validate(&buffer) {
            tracing::warn!(%e, "Rejecting pipeline run");
            self.shared.finish(RunState::Failed);
            return Err(e);
        }

        let samples = buffer.len();
        self.output = None;
        self.shared.ticks.store(0, Ordering::Relaxed);
        self.shared
            .total_ticks
            .store(expected_ticks(samples), Ordering::Relaxed);
        self.shared.running.store(true, Ordering::Release);
        self.shared.state.send_replace(RunState::Running);

        let shared = self.shared.clone();
        let config = self.config.clone();
        tracing::info!(samples, scheme = ?config.integration_scheme, "Starting pipeline run");

        let spawned = std::thread::Builder::new()
            .name("deadreckon-pipeline".into())
            .spawn(move || {
                let _guard = PanicGuard(shared.clone());
                let started = Instant::now();
                let output = run_pipeline(&buffer, &config, |n| {
                    shared.ticks.fetch_add(n, Ordering::Relaxed);
                });
                tracing::info!(
                    samples,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Pipeline run complete"
                );
                shared.finish(RunState::Completed);
                output
            });

        match spawned {
            Ok(worker) => {
                self.worker = Some(worker);
                Ok(())
            }
            Err(e) => {
                self.shared.finish(RunState::Failed);
                Err(PipelineError::Spawn(e))
            }
        }
    }

    /// Block until the current run finishes and return its output.
    ///
    /// Returns the last successful output if no run is in flight.
    pub fn wait(&mut self) -> Result<&PipelineOutput, PipelineError> {
        if let Some(worker) = self.worker.take() {
            self.join(worker)?;
        }
        self.output.as_ref().ok_or(PipelineError::NotStarted)
    }

    /// Output of the last finished run, without blocking.
    pub fn output(&mut self) -> Option<&PipelineOutput> {
        // A panicked worker leaves no output; the state already says Failed.
        let _ = self.reap();
        self.output.as_ref()
    }

    /// Join the worker if it has already finished.
    fn reap(&mut self) -> Result<(), PipelineError> {
        match self.worker.take() {
            Some(worker) if worker.is_finished() => self.join(worker),
            other => {
                self.worker = other;
                Ok(())
            }
        }
    }

    fn join(&mut self, worker: JoinHandle<PipelineOutput>) -> Result<(), PipelineError> {
        match worker.join() {
            Ok(output) => {
                self.output = Some(output);
                Ok(())
            }
            Err(_) => Err(PipelineError::WorkerPanicked),
        }
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            if !worker.is_finished() {
                tracing::info!("Waiting for in-flight pipeline run");
            }
            if worker.join().is_err() {
                tracing::error!("Pipeline worker panicked during shutdown");
            }
        }
    }
}

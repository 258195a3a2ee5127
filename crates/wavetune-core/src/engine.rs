use crate::buffer::SampleBuffer;
use crate::chirp::{validate_request, SweepGenerator, SynthesisMode};
use crate::error::{CoreError, Result};
use crate::padding::pad;
use crate::playback::{
    AudioOutputSink, PlaybackHandle, PlaybackOutcome, PlaybackScheduler, PlaybackSession,
};
use crate::progress::ProgressClock;
use log::debug;
use std::time::Duration;
use tokio::runtime::Handle;
use wavetune_shared_protocol::{SweepRequest, SweepSettings};

/// Generates, plays and tracks sweeps on a single output.
pub struct SweepEngine {
    scheduler: PlaybackScheduler,
    generator: SweepGenerator,
    tick_interval: Duration,
    runtime: Handle,
}

impl SweepEngine {
    /// `runtime` is where completion callbacks and progress ticks are delivered.
    pub fn new(sink: Box<dyn AudioOutputSink>, runtime: Handle) -> Self {
        Self::with_settings(sink, runtime, &SweepSettings::default())
    }

    pub fn with_settings(
        sink: Box<dyn AudioOutputSink>,
        runtime: Handle,
        settings: &SweepSettings,
    ) -> Self {
        Self {
            scheduler: PlaybackScheduler::new(sink, runtime.clone()),
            generator: SweepGenerator::new(SynthesisMode::from(settings)),
            tick_interval: Duration::from_millis(settings.tick_interval_ms),
            runtime,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.scheduler.is_active()
    }

    /// Generates the padded sweep for `request` and starts playing it.
    ///
    /// `on_progress` receives the sounding frequency roughly every tick interval;
    /// `on_complete` runs once, after the last sample has been rendered, and no
    /// `on_progress` call follows it. If the output fails mid-sweep, progress stops,
    /// `on_complete` is skipped and the handle's outcome carries the error.
    pub fn start_sweep<P, C>(
        &self,
        request: SweepRequest,
        on_progress: P,
        on_complete: C,
    ) -> Result<PlaybackHandle>
    where
        P: FnMut(f64) + Send + 'static,
        C: FnOnce() + Send + 'static,
    {
        self.preflight(&request)?;
        let buffer = pad(self.generator.generate(&request)?, request.padding_seconds);
        self.launch(request, buffer, on_progress, on_complete)
    }

    /// Like [`start_sweep`](Self::start_sweep), but synthesizes on a blocking worker
    /// and resolves once playback has completed. A failed render comes back as
    /// [`CoreError::DeviceUnavailable`].
    pub async fn run_sweep<P>(&self, request: SweepRequest, on_progress: P) -> Result<PlaybackHandle>
    where
        P: FnMut(f64) + Send + 'static,
    {
        self.preflight(&request)?;
        let generator = self.generator;
        let job = request.clone();
        let buffer = tokio::task::spawn_blocking(move || {
            generator
                .generate(&job)
                .map(|raw| pad(raw, job.padding_seconds))
        })
        .await??;
        let handle = self.launch(request, buffer, on_progress, || {})?;
        match handle.wait().await {
            PlaybackOutcome::Rendered => Ok(handle),
            PlaybackOutcome::Failed(err) => Err(err.into()),
        }
    }

    fn preflight(&self, request: &SweepRequest) -> Result<()> {
        validate_request(request)?;
        // Cheap early exit; `play` still makes the authoritative check.
        if self.scheduler.is_active() {
            return Err(CoreError::SessionAlreadyActive);
        }
        Ok(())
    }

    fn launch<P, C>(
        &self,
        request: SweepRequest,
        buffer: SampleBuffer,
        on_progress: P,
        on_complete: C,
    ) -> Result<PlaybackHandle>
    where
        P: FnMut(f64) + Send + 'static,
        C: FnOnce() + Send + 'static,
    {
        debug_assert_eq!(buffer.len(), request.total_samples());
        debug!(
            "sweep {:.1}-{:.1} Hz over {}s ({}), {} samples",
            request.low_frequency_hz,
            request.high_frequency_hz,
            request.duration_seconds,
            request.shape,
            request.total_samples()
        );
        let clock = ProgressClock::new(self.tick_interval);
        let stopper = clock.clone();
        let handle = self.scheduler.play_with_outcome(buffer, move |outcome| {
            stopper.stop();
            if outcome.is_rendered() {
                on_complete();
            }
        })?;
        clock.start(
            PlaybackSession::new(request, handle.clone()),
            on_progress,
            &self.runtime,
        );
        Ok(handle)
    }
}

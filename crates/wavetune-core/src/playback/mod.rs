//! Handing a rendered sweep to an output sink and reporting when it has been heard.

#[cfg(feature = "cpal")]
pub mod device;
pub mod session;
pub mod sink;
pub mod wav;

pub use session::PlaybackSession;
pub use sink::{AudioOutputSink, RenderComplete, SimulatedSink};
pub use wav::WavFileSink;

use crate::buffer::SampleBuffer;
use crate::error::{CoreError, DeviceUnavailable, RequestError, Result};
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{oneshot, watch};
use tokio::time::Instant;
use uuid::Uuid;
use wavetune_shared_protocol::{OutputTarget, PlaybackStatus};

/// Opens the sink named by `target`.
pub fn open_sink(target: &OutputTarget) -> Result<Box<dyn AudioOutputSink>, DeviceUnavailable> {
    match target {
        OutputTarget::Simulated => Ok(Box::new(SimulatedSink::new())),
        OutputTarget::Wav { path } => Ok(Box::new(WavFileSink::new(path.clone()))),
        #[cfg(feature = "cpal")]
        OutputTarget::Device { name } => Ok(Box::new(device::CpalSink::new(name.clone()))),
        #[cfg(not(feature = "cpal"))]
        OutputTarget::Device { .. } => Err(DeviceUnavailable::new(
            "device output needs the `cpal` feature; use a simulated or wav output instead",
        )),
    }
}

/// How a playback ended.
#[derive(Debug, Clone)]
pub enum PlaybackOutcome {
    /// The sink reported the final sample rendered.
    Rendered,
    /// The sink gave up on the buffer, or dropped it without reporting back.
    Failed(DeviceUnavailable),
}

impl PlaybackOutcome {
    pub fn is_rendered(&self) -> bool {
        matches!(self, PlaybackOutcome::Rendered)
    }
}

/// Caller's view of one playback. Cloning is cheap; every clone observes the same session.
#[derive(Debug, Clone)]
pub struct PlaybackHandle {
    id: Uuid,
    started_at: Instant,
    duration: Duration,
    done: watch::Receiver<Option<PlaybackOutcome>>,
}

impl PlaybackHandle {
    pub(crate) fn new(
        id: Uuid,
        started_at: Instant,
        duration: Duration,
        done: watch::Receiver<Option<PlaybackOutcome>>,
    ) -> Self {
        Self {
            id,
            started_at,
            duration,
            done,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Length of the submitted buffer, padding included.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// True once the session has ended and its callback (if any) has returned.
    pub fn is_complete(&self) -> bool {
        self.done.borrow().is_some()
    }

    /// `None` while playing.
    pub fn outcome(&self) -> Option<PlaybackOutcome> {
        self.done.borrow().clone()
    }

    pub fn status(&self) -> PlaybackStatus {
        if self.is_complete() {
            PlaybackStatus::Idle
        } else {
            PlaybackStatus::Playing
        }
    }

    /// Resolves once the session has ended.
    pub async fn wait(&self) -> PlaybackOutcome {
        let mut done = self.done.clone();
        let seen = match done.wait_for(Option::is_some).await {
            Ok(outcome) => outcome.clone(),
            Err(_) => None,
        };
        // None here means the delivery runtime went away first.
        seen.unwrap_or_else(|| {
            PlaybackOutcome::Failed(DeviceUnavailable::new(
                "delivery runtime shut down before playback finished",
            ))
        })
    }
}

/// Plays one buffer at a time through a sink.
///
/// Completion callbacks run as tasks on the `delivery` runtime, never on the sink's
/// rendering thread.
pub struct PlaybackScheduler {
    sink: Arc<Mutex<Box<dyn AudioOutputSink>>>,
    active: Arc<Mutex<Option<Uuid>>>,
    delivery: Handle,
}

impl PlaybackScheduler {
    pub fn new(sink: Box<dyn AudioOutputSink>, delivery: Handle) -> Self {
        Self {
            sink: Arc::new(Mutex::new(sink)),
            active: Arc::new(Mutex::new(None)),
            delivery,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.lock().is_some()
    }

    /// Starts rendering `buffer` immediately. `on_complete` runs exactly once, after the
    /// sink reports the final sample rendered. If the sink fails instead, `on_complete` is
    /// skipped and the handle reports [`PlaybackOutcome::Failed`].
    ///
    /// Fails with [`CoreError::SessionAlreadyActive`] while another buffer is playing, and
    /// with [`CoreError::DeviceUnavailable`] if the sink cannot be brought up; in the latter
    /// case the sink is stopped again before returning.
    pub fn play<F>(&self, buffer: SampleBuffer, on_complete: F) -> Result<PlaybackHandle>
    where
        F: FnOnce() + Send + 'static,
    {
        self.play_with_outcome(buffer, move |outcome| {
            if outcome.is_rendered() {
                on_complete();
            }
        })
    }

    /// Like [`play`](Self::play), but `on_finish` runs exactly once however the session
    /// ends, after the sink is stopped and the output released.
    pub fn play_with_outcome<F>(&self, buffer: SampleBuffer, on_finish: F) -> Result<PlaybackHandle>
    where
        F: FnOnce(&PlaybackOutcome) + Send + 'static,
    {
        if !buffer.has_playable_rate() {
            return Err(RequestError::SampleRate(buffer.sample_rate_hz()).into());
        }

        let mut active = self.active.lock();
        if let Some(current) = *active {
            debug!("rejecting playback: session {current} still active");
            return Err(CoreError::SessionAlreadyActive);
        }

        let id = Uuid::new_v4();
        let duration = buffer.duration();
        let (rendered_tx, rendered_rx) = oneshot::channel::<Result<(), DeviceUnavailable>>();
        let started_at = {
            let mut sink = self.sink.lock();
            let opened = sink
                .initialize(buffer.sample_rate_hz())
                .and_then(|()| sink.start());
            if let Err(err) = opened {
                sink.stop();
                warn!("output unavailable for session {id}: {err}");
                return Err(err.into());
            }
            let started_at = Instant::now();
            sink.submit(
                buffer,
                Box::new(move |result| {
                    let _ = rendered_tx.send(result);
                }),
            );
            started_at
        };
        *active = Some(id);
        drop(active);
        debug!("session {id} playing {:.3}s", duration.as_secs_f64());

        let (done_tx, done_rx) = watch::channel(None);
        let sink = Arc::clone(&self.sink);
        let slot = Arc::clone(&self.active);
        self.delivery.spawn(async move {
            let outcome = match rendered_rx.await {
                Ok(Ok(())) => PlaybackOutcome::Rendered,
                Ok(Err(err)) => {
                    warn!("session {id} failed while rendering: {err}");
                    PlaybackOutcome::Failed(err)
                }
                Err(_) => {
                    warn!("output dropped session {id} before reporting it rendered");
                    PlaybackOutcome::Failed(DeviceUnavailable::new(
                        "output dropped the buffer before rendering it",
                    ))
                }
            };
            // Stopping may join an output thread; keep it off the delivery runtime.
            let stopped = tokio::task::spawn_blocking(move || sink.lock().stop()).await;
            if let Err(err) = stopped {
                error!("stopping the output after session {id} failed: {err}");
            }
            {
                let mut slot = slot.lock();
                if *slot == Some(id) {
                    *slot = None;
                }
            }
            if outcome.is_rendered() {
                info!("sweep completed (session {id})");
            }
            on_finish(&outcome);
            let _ = done_tx.send(Some(outcome));
        });

        Ok(PlaybackHandle::new(id, started_at, duration, done_rx))
    }
}

use super::PlaybackHandle;
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;
use wavetune_shared_protocol::{ProgressEvent, SweepRequest};

/// A sweep that is currently being played: what was asked for and when it started.
#[derive(Debug, Clone)]
pub struct PlaybackSession {
    request: SweepRequest,
    handle: PlaybackHandle,
}

impl PlaybackSession {
    pub fn new(request: SweepRequest, handle: PlaybackHandle) -> Self {
        Self { request, handle }
    }

    pub fn id(&self) -> Uuid {
        self.handle.id()
    }

    pub fn request(&self) -> &SweepRequest {
        &self.request
    }

    pub fn started_at(&self) -> Instant {
        self.handle.started_at()
    }

    pub fn is_completed(&self) -> bool {
        self.handle.is_complete()
    }

    /// Instant the first swept sample sounds, i.e. after the leading silence.
    pub fn sweep_origin(&self) -> Instant {
        let padding = self.request.padding_seconds;
        let lead_in = Duration::try_from_secs_f64(padding).unwrap_or(Duration::ZERO);
        self.started_at() + lead_in
    }

    /// What the listener should be hearing at `now`, or `None` outside the swept part
    /// of the buffer.
    pub fn progress_at(&self, now: Instant) -> Option<ProgressEvent> {
        let origin = self.sweep_origin();
        if now < origin {
            return None;
        }
        let elapsed = (now - origin).as_secs_f64();
        let progress = elapsed / self.request.duration_seconds;
        if !(0.0..=1.0).contains(&progress) {
            return None;
        }
        Some(ProgressEvent {
            elapsed_seconds: elapsed,
            instantaneous_frequency_hz: self.request.frequency_at_progress(progress),
        })
    }
}

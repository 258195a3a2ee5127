//! Periodic frequency reporting while a sweep plays.
//!
//! The clock keeps its own time from the session's start instant; it never looks at the
//! sink, and it never decides on its own that playback is over. Whoever owns the
//! completion signal calls [`ProgressClock::stop`].

use crate::playback::PlaybackSession;
use log::{debug, trace, warn};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

pub type TickHandler = Box<dyn FnMut(f64) + Send + 'static>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockPhase {
    Idle,
    Running,
    Stopped,
}

enum ClockState {
    Idle,
    Running(TickHandler),
    Stopped,
}

struct ClockInner {
    state: Mutex<ClockState>,
    cancel: CancellationToken,
    interval: Duration,
}

/// `Idle -> Running -> Stopped`, or `Idle -> Stopped` when completion wins the race.
#[derive(Clone)]
pub struct ProgressClock {
    inner: Arc<ClockInner>,
}

impl ProgressClock {
    pub fn new(interval: Duration) -> Self {
        Self {
            inner: Arc::new(ClockInner {
                state: Mutex::new(ClockState::Idle),
                cancel: CancellationToken::new(),
                interval: interval.max(Duration::from_millis(1)),
            }),
        }
    }

    pub fn phase(&self) -> ClockPhase {
        match *self.inner.state.lock() {
            ClockState::Idle => ClockPhase::Idle,
            ClockState::Running(_) => ClockPhase::Running,
            ClockState::Stopped => ClockPhase::Stopped,
        }
    }

    /// Begins ticking on `runtime`. Returns `false`, and drops `handler`, unless the
    /// clock was idle.
    pub fn start<F>(&self, session: PlaybackSession, handler: F, runtime: &Handle) -> bool
    where
        F: FnMut(f64) + Send + 'static,
    {
        {
            let mut state = self.inner.state.lock();
            match &*state {
                ClockState::Idle => {}
                ClockState::Running(_) => {
                    warn!("progress clock for session {} already running", session.id());
                    return false;
                }
                ClockState::Stopped => {
                    debug!("session {} finished before its progress clock started", session.id());
                    return false;
                }
            }
            *state = ClockState::Running(Box::new(handler));
        }

        let inner = Arc::clone(&self.inner);
        runtime.spawn(async move {
            let mut ticker = time::interval(inner.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = inner.cancel.cancelled() => break,
                    _ = ticker.tick() => {}
                }
                // Checked at dispatch: a tick that raced with stop() finds Stopped here.
                let mut state = inner.state.lock();
                let ClockState::Running(handler) = &mut *state else {
                    break;
                };
                if let Some(event) = session.progress_at(Instant::now()) {
                    trace!(
                        "t={:.3}s f={:.1}Hz",
                        event.elapsed_seconds,
                        event.instantaneous_frequency_hz
                    );
                    handler(event.instantaneous_frequency_hz);
                }
            }
            debug!("progress clock for session {} stopped", session.id());
        });
        true
    }

    /// Stops ticking and releases the handler. Once this returns the handler will not
    /// be called again. Returns `false` if the clock was already stopped.
    pub fn stop(&self) -> bool {
        let previous = std::mem::replace(&mut *self.inner.state.lock(), ClockState::Stopped);
        self.inner.cancel.cancel();
        !matches!(previous, ClockState::Stopped)
    }
}

pub mod buffer;
pub mod chirp;
pub mod config;
pub mod engine;
pub mod error;
pub mod padding;
pub mod playback;
pub mod progress;

pub use buffer::SampleBuffer;
pub use chirp::{generate, validate_request, SweepGenerator, SynthesisMode};
pub use engine::SweepEngine;
pub use error::{CoreError, DeviceUnavailable, RequestError};
pub use padding::pad;
pub use playback::{
    AudioOutputSink, PlaybackHandle, PlaybackOutcome, PlaybackScheduler, PlaybackSession,
};
pub use progress::ProgressClock;

use thiserror::Error;

/// Why a [`SweepRequest`](wavetune_shared_protocol::SweepRequest) was refused before synthesis.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RequestError {
    #[error("duration must be a positive number of seconds, got {0}")]
    Duration(f64),
    #[error("sample rate must be positive, got {0} Hz")]
    SampleRate(f64),
    #[error("{which} frequency must be positive, got {value} Hz")]
    Frequency { which: &'static str, value: f64 },
    #[error("{which} frequency {value} Hz is not below the Nyquist frequency {nyquist} Hz")]
    AboveNyquist {
        which: &'static str,
        value: f64,
        nyquist: f64,
    },
    #[error("padding must be zero or more seconds, got {0}")]
    Padding(f64),
    #[error("sweep of {duration_seconds}s at {sample_rate_hz} Hz produces no samples")]
    Empty {
        duration_seconds: f64,
        sample_rate_hz: f64,
    },
}

/// The output sink could not be opened or started.
#[derive(Debug, Clone, Error)]
#[error("audio output unavailable: {reason}")]
pub struct DeviceUnavailable {
    reason: String,
}

impl DeviceUnavailable {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid sweep request: {0}")]
    InvalidRequest(#[from] RequestError),
    #[error(transparent)]
    DeviceUnavailable(#[from] DeviceUnavailable),
    #[error("a sweep is already playing on this output")]
    SessionAlreadyActive,
    #[error("sweep synthesis worker failed: {0}")]
    Synthesis(#[from] tokio::task::JoinError),
}

pub type Result<T, E = CoreError> = std::result::Result<T, E>;

use crate::sweep::SweepRequest;
use serde::{Deserialize, Serialize};

/// Derived snapshot of the sweep as heard at one tick of the progress clock.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub elapsed_seconds: f64,
    pub instantaneous_frequency_hz: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SweepEvent {
    SweepStarted {
        session_id: String,
        request: SweepRequest,
    },
    Progress {
        elapsed_seconds: f64,
        frequency_hz: f64,
    },
    SweepCompleted {
        session_id: String,
    },
}

impl From<ProgressEvent> for SweepEvent {
    fn from(event: ProgressEvent) -> Self {
        SweepEvent::Progress {
            elapsed_seconds: event.elapsed_seconds,
            frequency_hz: event.instantaneous_frequency_hz,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackStatus {
    Idle,
    Playing,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_are_tagged_by_type() {
        let event = SweepEvent::from(ProgressEvent {
            elapsed_seconds: 1.5,
            instantaneous_frequency_hz: 440.0,
        });
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "progress");
        assert_eq!(value["frequency_hz"], 440.0);

        let done: SweepEvent =
            serde_json::from_str(r#"{"type":"sweep_completed","session_id":"abc"}"#).unwrap();
        assert_eq!(
            done,
            SweepEvent::SweepCompleted {
                session_id: "abc".into()
            }
        );
    }
}

use crate::sweep::{SweepRequest, SweepShape};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where a sweep is rendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutputTarget {
    /// Real-time rendering without an audio device.
    Simulated,
    /// 16-bit mono WAV file.
    Wav { path: PathBuf },
    /// System output device; `None` selects the host default.
    Device {
        #[serde(default)]
        name: Option<String>,
    },
}

/// `Simulated`, the one target every build can open.
impl Default for OutputTarget {
    fn default() -> Self {
        OutputTarget::Simulated
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepSettings {
    pub sample_rate_hz: f64,
    pub padding_seconds: f64,
    pub tick_interval_ms: u64,
    pub phase_continuous: bool,
    pub output: OutputTarget,
    pub low_frequency_hz: f64,
    pub high_frequency_hz: f64,
    pub duration_seconds: f64,
    pub shape: SweepShape,
}

impl Default for SweepSettings {
    fn default() -> Self {
        let request = SweepRequest::default();
        Self {
            sample_rate_hz: request.sample_rate_hz,
            padding_seconds: request.padding_seconds,
            tick_interval_ms: 16,
            phase_continuous: false,
            output: OutputTarget::default(),
            low_frequency_hz: request.low_frequency_hz,
            high_frequency_hz: request.high_frequency_hz,
            duration_seconds: request.duration_seconds,
            shape: request.shape,
        }
    }
}

impl SweepSettings {
    /// Builds a request from whatever the host supplied, filling gaps from the settings.
    pub fn request(
        &self,
        duration_seconds: Option<f64>,
        low_frequency_hz: Option<f64>,
        high_frequency_hz: Option<f64>,
        shape: Option<SweepShape>,
    ) -> SweepRequest {
        SweepRequest {
            duration_seconds: duration_seconds.unwrap_or(self.duration_seconds),
            low_frequency_hz: low_frequency_hz.unwrap_or(self.low_frequency_hz),
            high_frequency_hz: high_frequency_hz.unwrap_or(self.high_frequency_hz),
            sample_rate_hz: self.sample_rate_hz,
            padding_seconds: self.padding_seconds,
            shape: shape.unwrap_or(self.shape),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let settings: SweepSettings =
            serde_json::from_str(r#"{"sample_rate_hz": 44100.0, "output": {"kind": "simulated"}}"#)
                .unwrap();
        assert_eq!(settings.sample_rate_hz, 44_100.0);
        assert_eq!(settings.output, OutputTarget::Simulated);
        assert_eq!(settings.padding_seconds, 0.025);
        assert_eq!(settings.tick_interval_ms, 16);
        assert_eq!(settings.shape, SweepShape::LinearUp);
    }

    #[test]
    fn request_prefers_supplied_values() {
        let settings = SweepSettings::default();
        let req = settings.request(Some(10.0), None, Some(8_000.0), Some(SweepShape::LinearUpDown));
        assert_eq!(req.duration_seconds, 10.0);
        assert_eq!(req.low_frequency_hz, 20.0);
        assert_eq!(req.high_frequency_hz, 8_000.0);
        assert_eq!(req.sample_rate_hz, 48_000.0);
        assert_eq!(req.shape, SweepShape::LinearUpDown);
    }

    #[test]
    fn device_output_name_is_optional() {
        let target: OutputTarget = serde_json::from_str(r#"{"kind": "device"}"#).unwrap();
        assert_eq!(target, OutputTarget::Device { name: None });
    }

    #[test]
    fn default_output_needs_no_hardware() {
        assert_eq!(SweepSettings::default().output, OutputTarget::Simulated);
        let settings: SweepSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings.output, OutputTarget::Simulated);
    }
}

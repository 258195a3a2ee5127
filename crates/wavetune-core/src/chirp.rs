use crate::buffer::SampleBuffer;
use crate::error::RequestError;
use std::f64::consts::PI;
use wavetune_shared_protocol::{SweepRequest, SweepSettings};

/// How a sample's phase is derived from the sweep's instantaneous frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SynthesisMode {
    /// `sin(2π · f(t) · t)`. Matches the long-standing behaviour of the tool, at the cost of
    /// phase jumps that become audible on fast sweeps.
    #[default]
    Instantaneous,
    /// Phase accumulated sample by sample, `φ[i] = φ[i-1] + 2π · f(t_i) / rate`.
    PhaseContinuous,
}

impl From<&SweepSettings> for SynthesisMode {
    fn from(settings: &SweepSettings) -> Self {
        if settings.phase_continuous {
            SynthesisMode::PhaseContinuous
        } else {
            SynthesisMode::Instantaneous
        }
    }
}

/// Rejects requests the generator cannot turn into finite samples.
pub fn validate_request(req: &SweepRequest) -> Result<(), RequestError> {
    if !(req.duration_seconds.is_finite() && req.duration_seconds > 0.0) {
        return Err(RequestError::Duration(req.duration_seconds));
    }
    if !(req.sample_rate_hz.is_finite() && req.sample_rate_hz > 0.0) {
        return Err(RequestError::SampleRate(req.sample_rate_hz));
    }
    let nyquist = req.nyquist_hz();
    for (which, value) in [("low", req.low_frequency_hz), ("high", req.high_frequency_hz)] {
        if !(value.is_finite() && value > 0.0) {
            return Err(RequestError::Frequency { which, value });
        }
        if value >= nyquist {
            return Err(RequestError::AboveNyquist {
                which,
                value,
                nyquist,
            });
        }
    }
    if !(req.padding_seconds.is_finite() && req.padding_seconds >= 0.0) {
        return Err(RequestError::Padding(req.padding_seconds));
    }
    if req.sweep_samples() == 0 {
        return Err(RequestError::Empty {
            duration_seconds: req.duration_seconds,
            sample_rate_hz: req.sample_rate_hz,
        });
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SweepGenerator {
    mode: SynthesisMode,
}

impl SweepGenerator {
    pub fn new(mode: SynthesisMode) -> Self {
        Self { mode }
    }

    /// Synthesizes the sweep described by `req`, without padding.
    pub fn generate(&self, req: &SweepRequest) -> Result<SampleBuffer, RequestError> {
        validate_request(req)?;
        let sr = req.sample_rate_hz;
        let total = req.sweep_samples();
        let samples = match self.mode {
            SynthesisMode::Instantaneous => (0..total)
                .map(|i| {
                    let t = i as f64 / sr;
                    let f = req.frequency_at(t);
                    (2.0 * PI * f * t).sin() as f32
                })
                .collect(),
            SynthesisMode::PhaseContinuous => {
                let mut phase = 0.0f64;
                let mut out = Vec::with_capacity(total);
                for i in 0..total {
                    let t = i as f64 / sr;
                    out.push(phase.sin() as f32);
                    phase = (phase + 2.0 * PI * req.frequency_at(t) / sr) % (2.0 * PI);
                }
                out
            }
        };
        Ok(SampleBuffer::from_samples(samples, sr))
    }
}

/// Convenience for [`SweepGenerator::generate`] with the default synthesis mode.
pub fn generate(req: &SweepRequest) -> Result<SampleBuffer, RequestError> {
    SweepGenerator::default().generate(req)
}

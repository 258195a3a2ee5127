use std::time::Duration;

/// Mono samples in `[-1.0, 1.0]` tagged with the rate they were produced at.
///
/// A buffer is never mutated after construction; handing it to the scheduler moves it.
#[derive(Debug, PartialEq)]
pub struct SampleBuffer {
    samples: Vec<f32>,
    sample_rate_hz: f64,
}

impl SampleBuffer {
    pub fn from_samples(samples: Vec<f32>, sample_rate_hz: f64) -> Self {
        Self {
            samples,
            sample_rate_hz,
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn sample_rate_hz(&self) -> f64 {
        self.sample_rate_hz
    }

    /// Wall-clock length of the buffer when rendered at its own sample rate. Zero when
    /// the rate is not a finite positive number.
    pub fn duration(&self) -> Duration {
        if !self.has_playable_rate() {
            return Duration::ZERO;
        }
        Duration::try_from_secs_f64(self.samples.len() as f64 / self.sample_rate_hz)
            .unwrap_or(Duration::ZERO)
    }

    pub fn has_playable_rate(&self) -> bool {
        self.sample_rate_hz.is_finite() && self.sample_rate_hz > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_follows_sample_rate() {
        let buffer = SampleBuffer::from_samples(vec![0.0; 24_000], 48_000.0);
        assert_eq!(buffer.duration(), Duration::from_millis(500));
        assert_eq!(buffer.len(), 24_000);
        assert!(!buffer.is_empty());
    }

    #[test]
    fn unusable_rates_have_no_duration() {
        for rate in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY, 0.0, -48_000.0, 1e-300] {
            let buffer = SampleBuffer::from_samples(vec![0.0; 4], rate);
            assert_eq!(buffer.duration(), Duration::ZERO, "rate {rate}");
        }
        assert!(!SampleBuffer::from_samples(vec![], f64::NAN).has_playable_rate());
    }
}

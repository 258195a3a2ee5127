use crate::buffer::SampleBuffer;
use wavetune_shared_protocol::samples_in;

/// Surrounds `buffer` with `round(padding_seconds * rate)` zero samples on each side, so
/// the output transducer starts and stops from rest.
///
/// The count is rounded on its own, the same way as
/// [`SweepRequest::padding_samples`](wavetune_shared_protocol::SweepRequest::padding_samples).
/// Zero (or negative) padding returns the samples unchanged.
pub fn pad(buffer: SampleBuffer, padding_seconds: f64) -> SampleBuffer {
    let sample_rate_hz = buffer.sample_rate_hz();
    let pad_samples = samples_in(padding_seconds, sample_rate_hz);
    if pad_samples == 0 {
        return buffer;
    }
    let inner = buffer.into_samples();
    let mut out = Vec::with_capacity(inner.len() + 2 * pad_samples);
    out.resize(pad_samples, 0.0);
    out.extend_from_slice(&inner);
    out.resize(inner.len() + 2 * pad_samples, 0.0);
    SampleBuffer::from_samples(out, sample_rate_hz)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wavetune_shared_protocol::SweepRequest;

    #[test]
    fn adds_equal_silence_on_both_sides() {
        let buffer = SampleBuffer::from_samples(vec![0.5; 100], 8_000.0);
        let padded = pad(buffer, 0.01);
        assert_eq!(padded.len(), 80 + 100 + 80);
        assert!(padded.samples()[..80].iter().all(|s| *s == 0.0));
        assert!(padded.samples()[80..180].iter().all(|s| *s == 0.5));
        assert!(padded.samples()[180..].iter().all(|s| *s == 0.0));
        assert_eq!(padded.sample_rate_hz(), 8_000.0);
    }

    #[test]
    fn zero_padding_is_identity() {
        let buffer = SampleBuffer::from_samples(vec![0.25, -0.25], 48_000.0);
        let padded = pad(buffer, 0.0);
        assert_eq!(padded.samples(), &[0.25, -0.25]);
    }

    #[test]
    fn default_padding_at_48k_is_1200_samples() {
        let buffer = SampleBuffer::from_samples(vec![1.0], 48_000.0);
        let padded = pad(buffer, SweepRequest::default().padding_seconds);
        assert_eq!(padded.len(), 2_401);
        assert_eq!(padded.samples()[1_200], 1.0);
    }

    #[test]
    fn fractional_padding_rounds_per_side() {
        // 2.4 samples per side rounds to 2 on each, not to 5 overall.
        let buffer = SampleBuffer::from_samples(vec![0.5; 800], 8_000.0);
        let padded = pad(buffer, 0.000_3);
        assert_eq!(padded.len(), 804);
        assert_eq!(&padded.samples()[..2], &[0.0, 0.0]);
        assert_eq!(padded.samples()[2], 0.5);
        assert_eq!(&padded.samples()[802..], &[0.0, 0.0]);
    }
}

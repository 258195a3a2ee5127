use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How the instantaneous frequency moves between the two bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepShape {
    /// `low` at the start, `high` at the end.
    LinearUp,
    /// Triangular: `low` to `high` over the first half, back to `low` over the second.
    LinearUpDown,
}

impl SweepShape {
    /// Fraction of the `low..high` span reached at `progress` (0.0 = start, 1.0 = end).
    pub fn span_fraction(self, progress: f64) -> f64 {
        match self {
            SweepShape::LinearUp => progress,
            SweepShape::LinearUpDown => {
                if progress < 0.5 {
                    2.0 * progress
                } else {
                    1.0 - 2.0 * (progress - 0.5)
                }
            }
        }
    }
}

impl fmt::Display for SweepShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SweepShape::LinearUp => f.write_str("linear_up"),
            SweepShape::LinearUpDown => f.write_str("linear_up_down"),
        }
    }
}

impl FromStr for SweepShape {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "up" | "linear_up" => Ok(SweepShape::LinearUp),
            "updown" | "up_down" | "linear_up_down" | "triangle" => Ok(SweepShape::LinearUpDown),
            other => Err(ParseValueError::new("sweep shape", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepRequest {
    pub duration_seconds: f64,
    pub low_frequency_hz: f64,
    pub high_frequency_hz: f64,
    pub sample_rate_hz: f64,
    pub padding_seconds: f64,
    pub shape: SweepShape,
}

impl Default for SweepRequest {
    fn default() -> Self {
        Self {
            duration_seconds: 5.0,
            low_frequency_hz: 20.0,
            high_frequency_hz: 20_000.0,
            sample_rate_hz: 48_000.0,
            padding_seconds: 0.025,
            shape: SweepShape::LinearUp,
        }
    }
}

impl SweepRequest {
    pub fn nyquist_hz(&self) -> f64 {
        self.sample_rate_hz / 2.0
    }

    /// Frequency sounding at `progress` through the sweep. Progress is clamped to
    /// `[0, 1]`, so the result always lies between the two bounds.
    pub fn frequency_at_progress(&self, progress: f64) -> f64 {
        let low = self.low_frequency_hz;
        let high = self.high_frequency_hz;
        let fraction = self.shape.span_fraction(progress.clamp(0.0, 1.0));
        let f = low + (high - low) * fraction;
        f.clamp(low.min(high), low.max(high))
    }

    /// Frequency sounding `t` seconds after the sweep (not the padding) begins.
    pub fn frequency_at(&self, t: f64) -> f64 {
        self.frequency_at_progress(t / self.duration_seconds)
    }

    /// Number of synthesized samples, excluding padding.
    pub fn sweep_samples(&self) -> usize {
        samples_in(self.duration_seconds, self.sample_rate_hz)
    }

    /// Number of silent samples on each side of the sweep.
    pub fn padding_samples(&self) -> usize {
        samples_in(self.padding_seconds, self.sample_rate_hz)
    }

    /// Length of the padded buffer. Sweep and padding are rounded separately, so this is
    /// `round(d·r) + 2·round(p·r)`, not `round((d + 2p)·r)`.
    pub fn total_samples(&self) -> usize {
        self.sweep_samples() + 2 * self.padding_samples()
    }
}

/// Whole samples covering `seconds` at `sample_rate_hz`, rounded to nearest. Negative or
/// non-finite products give zero.
pub fn samples_in(seconds: f64, sample_rate_hz: f64) -> usize {
    let exact = seconds * sample_rate_hz;
    if exact.is_finite() && exact > 0.0 {
        exact.round() as usize
    } else {
        0
    }
}

/// Sweep lengths offered to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DurationPreset {
    #[serde(rename = "5s")]
    Seconds5,
    #[serde(rename = "10s")]
    Seconds10,
    #[serde(rename = "60s")]
    Seconds60,
    #[serde(rename = "120s")]
    Seconds120,
}

impl DurationPreset {
    pub fn seconds(self) -> f64 {
        match self {
            DurationPreset::Seconds5 => 5.0,
            DurationPreset::Seconds10 => 10.0,
            DurationPreset::Seconds60 => 60.0,
            DurationPreset::Seconds120 => 120.0,
        }
    }
}

impl Default for DurationPreset {
    fn default() -> Self {
        Self::Seconds5
    }
}

impl FromStr for DurationPreset {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed.strip_suffix('s').unwrap_or(trimmed);
        match digits {
            "5" => Ok(DurationPreset::Seconds5),
            "10" => Ok(DurationPreset::Seconds10),
            "60" => Ok(DurationPreset::Seconds60),
            "120" => Ok(DurationPreset::Seconds120),
            _ => Err(ParseValueError::new("duration preset", trimmed)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseValueError {
    what: &'static str,
    value: String,
}

impl ParseValueError {
    fn new(what: &'static str, value: &str) -> Self {
        Self {
            what,
            value: value.to_string(),
        }
    }
}

impl fmt::Display for ParseValueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unrecognised {}: {:?}", self.what, self.value)
    }
}

impl std::error::Error for ParseValueError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(shape: SweepShape) -> SweepRequest {
        SweepRequest {
            shape,
            ..SweepRequest::default()
        }
    }

    #[test]
    fn linear_up_hits_both_bounds() {
        let req = request(SweepShape::LinearUp);
        assert!((req.frequency_at(0.0) - 20.0).abs() < 1e-9);
        assert!((req.frequency_at(req.duration_seconds) - 20_000.0).abs() < 1e-9);
        assert!((req.frequency_at(2.5) - 10_010.0).abs() < 1e-9);
    }

    #[test]
    fn linear_up_down_peaks_in_the_middle() {
        let req = request(SweepShape::LinearUpDown);
        assert!((req.frequency_at(0.0) - 20.0).abs() < 1e-9);
        assert!((req.frequency_at(req.duration_seconds / 2.0) - 20_000.0).abs() < 1e-9);
        assert!((req.frequency_at(req.duration_seconds) - 20.0).abs() < 1e-9);
        assert!((req.frequency_at(1.25) - req.frequency_at(3.75)).abs() < 1e-6);
    }

    #[test]
    fn frequency_stays_within_bounds_for_descending_sweep() {
        let req = SweepRequest {
            low_frequency_hz: 8_000.0,
            high_frequency_hz: 100.0,
            ..SweepRequest::default()
        };
        for step in 0..=100 {
            let f = req.frequency_at_progress(step as f64 / 100.0);
            assert!((100.0..=8_000.0).contains(&f), "{f} escaped the bounds");
        }
        assert_eq!(req.frequency_at_progress(-0.5), 8_000.0);
        assert_eq!(req.frequency_at_progress(1.5), 100.0);
    }

    #[test]
    fn sample_counts_round_to_nearest() {
        let req = SweepRequest::default();
        assert_eq!(req.sweep_samples(), 240_000);
        assert_eq!(req.padding_samples(), 1_200);
        assert_eq!(req.total_samples(), 242_400);

        let odd = SweepRequest {
            duration_seconds: 0.100_01,
            sample_rate_hz: 44_100.0,
            ..SweepRequest::default()
        };
        assert_eq!(odd.sweep_samples(), 4_410);
    }

    #[test]
    fn padding_rounds_separately_from_the_sweep() {
        // 2.4 padding samples per side: 800 + 2 * 2, where round((0.1 + 0.0006) * 8000) is 805.
        let req = SweepRequest {
            duration_seconds: 0.1,
            sample_rate_hz: 8_000.0,
            padding_seconds: 0.000_3,
            ..SweepRequest::default()
        };
        assert_eq!(req.sweep_samples(), 800);
        assert_eq!(req.padding_samples(), 2);
        assert_eq!(req.total_samples(), 804);
        assert_eq!(samples_in(-0.5, 8_000.0), 0);
        assert_eq!(samples_in(f64::NAN, 8_000.0), 0);
    }

    #[test]
    fn parses_shapes_and_presets() {
        assert_eq!("up".parse::<SweepShape>().unwrap(), SweepShape::LinearUp);
        assert_eq!("Linear-Up-Down".parse::<SweepShape>().unwrap(), SweepShape::LinearUpDown);
        assert!("sawtooth".parse::<SweepShape>().is_err());

        assert_eq!("60s".parse::<DurationPreset>().unwrap(), DurationPreset::Seconds60);
        assert_eq!("120".parse::<DurationPreset>().unwrap().seconds(), 120.0);
        assert!("7s".parse::<DurationPreset>().is_err());
    }

    #[test]
    fn shape_serializes_as_snake_case() {
        let json = serde_json::to_string(&SweepShape::LinearUpDown).unwrap();
        assert_eq!(json, "\"linear_up_down\"");
        let preset: DurationPreset = serde_json::from_str("\"10s\"").unwrap();
        assert_eq!(preset, DurationPreset::Seconds10);
    }
}

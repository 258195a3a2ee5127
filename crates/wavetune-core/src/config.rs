use anyhow::{Context, Result};
use log::{info, warn};
use std::fs;
use std::path::Path;
use wavetune_shared_protocol::{OutputTarget, SweepSettings};

pub const ENV_SAMPLE_RATE: &str = "WAVETUNE_SAMPLE_RATE";
pub const ENV_PADDING_MS: &str = "WAVETUNE_PADDING_MS";
pub const ENV_TICK_INTERVAL_MS: &str = "WAVETUNE_TICK_INTERVAL_MS";
pub const ENV_PHASE_CONTINUOUS: &str = "WAVETUNE_PHASE_CONTINUOUS";

/// Built-in settings. Builds with the `cpal` feature default to the host's output device;
/// without it they fall back to the simulated output.
pub fn default_settings() -> SweepSettings {
    SweepSettings {
        output: default_output(),
        ..SweepSettings::default()
    }
}

#[cfg(feature = "cpal")]
fn default_output() -> OutputTarget {
    OutputTarget::Device { name: None }
}

#[cfg(not(feature = "cpal"))]
fn default_output() -> OutputTarget {
    OutputTarget::Simulated
}

/// Reads settings from `path`, writing the defaults there first if the file is missing.
pub fn load_or_create_settings(path: &Path) -> Result<SweepSettings> {
    if path.exists() {
        let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
        let settings = serde_json::from_slice(&bytes)
            .with_context(|| format!("parse {}", path.display()))?;
        Ok(settings)
    } else {
        let settings = default_settings();
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
        fs::write(path, serde_json::to_vec_pretty(&settings)?)
            .with_context(|| format!("write {}", path.display()))?;
        info!("wrote default settings to {}", path.display());
        Ok(settings)
    }
}

/// Settings from `path` (or built-in defaults) with environment overrides applied.
pub fn load_settings(path: Option<&Path>) -> Result<SweepSettings> {
    let mut settings = match path {
        Some(path) => load_or_create_settings(path)?,
        None => default_settings(),
    };
    apply_overrides(&mut settings, |key| std::env::var(key).ok());
    Ok(settings)
}

/// Applies `WAVETUNE_*` overrides looked up through `lookup`. Values that do not parse
/// are skipped with a warning.
pub fn apply_overrides<F>(settings: &mut SweepSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(rate) = parsed::<f64, _>(&lookup, ENV_SAMPLE_RATE) {
        settings.sample_rate_hz = rate;
    }
    if let Some(ms) = parsed::<f64, _>(&lookup, ENV_PADDING_MS) {
        settings.padding_seconds = ms / 1000.0;
    }
    if let Some(ms) = parsed::<u64, _>(&lookup, ENV_TICK_INTERVAL_MS) {
        settings.tick_interval_ms = ms;
    }
    if let Some(raw) = lookup(ENV_PHASE_CONTINUOUS) {
        settings.phase_continuous = raw == "1" || raw.eq_ignore_ascii_case("true");
    }
}

fn parsed<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("ignoring {key}={raw:?}: not a number");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn creates_defaults_then_reads_them_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let first = load_or_create_settings(&path).unwrap();
        assert!(path.exists());
        assert_eq!(first, default_settings());

        fs::write(
            &path,
            r#"{"sample_rate_hz": 44100.0, "output": {"kind": "wav", "path": "/tmp/out.wav"}}"#,
        )
        .unwrap();
        let second = load_or_create_settings(&path).unwrap();
        assert_eq!(second.sample_rate_hz, 44_100.0);
        assert_eq!(
            second.output,
            OutputTarget::Wav {
                path: "/tmp/out.wav".into()
            }
        );
    }

    #[test]
    fn default_output_can_be_opened() {
        let settings = default_settings();
        #[cfg(not(feature = "cpal"))]
        assert_eq!(settings.output, OutputTarget::Simulated);
        #[cfg(feature = "cpal")]
        assert_eq!(settings.output, OutputTarget::Device { name: None });
        #[cfg(not(feature = "cpal"))]
        assert!(crate::playback::open_sink(&settings.output).is_ok());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(load_or_create_settings(&path).is_err());
    }

    #[test]
    fn environment_overrides_parse_or_are_ignored() {
        let env: HashMap<&str, &str> = [
            (ENV_SAMPLE_RATE, "96000"),
            (ENV_PADDING_MS, "10"),
            (ENV_TICK_INTERVAL_MS, "fast"),
            (ENV_PHASE_CONTINUOUS, "TRUE"),
        ]
        .into_iter()
        .collect();
        let mut settings = SweepSettings::default();
        apply_overrides(&mut settings, |key| env.get(key).map(|v| v.to_string()));

        assert_eq!(settings.sample_rate_hz, 96_000.0);
        assert!((settings.padding_seconds - 0.01).abs() < 1e-12);
        assert_eq!(settings.tick_interval_ms, 16);
        assert!(settings.phase_continuous);
    }
}

use std::fs;
use std::path::PathBuf;

use wavetune_core::chirp::{SweepGenerator, SynthesisMode};
use wavetune_core::config::load_settings;
use wavetune_core::padding::pad;
use wavetune_core::playback::wav::write_wav;
use wavetune_shared_protocol::SweepShape;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: generate-sweep-wav <output_path> [duration_s] [low_hz] [high_hz] [up|updown]");
        std::process::exit(1);
    }
    let path = PathBuf::from(&args[1]);
    let duration: Option<f64> = args.get(2).and_then(|s| s.parse().ok());
    let low: Option<f64> = args.get(3).and_then(|s| s.parse().ok());
    let high: Option<f64> = args.get(4).and_then(|s| s.parse().ok());
    let shape: Option<SweepShape> = args.get(5).and_then(|s| s.parse().ok());

    let settings = load_settings(None)?;
    let request = settings.request(duration, low, high, shape);
    let mode = SynthesisMode::from(&settings);

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let buffer = pad(SweepGenerator::new(mode).generate(&request)?, request.padding_seconds);
    write_wav(&path, &buffer)?;
    println!(
        "Wrote {:.0}-{:.0} Hz sweep ({} samples) to {}",
        request.low_frequency_hz,
        request.high_frequency_hz,
        buffer.len(),
        path.display()
    );
    Ok(())
}

use std::io::Write;
use std::path::PathBuf;
use std::process;
use std::time::Instant;

use anyhow::{anyhow, bail, Result};
use env_logger::Env;
use tokio::runtime::Handle;
use tokio::signal;
use wavetune_core::config::load_settings;
use wavetune_core::playback::open_sink;
use wavetune_core::{PlaybackOutcome, SweepEngine};
use wavetune_shared_protocol::{DurationPreset, OutputTarget, SweepEvent, SweepShape};

const USAGE: &str = "Usage: wavetune-sweep [--low HZ] [--high HZ] [--duration 5s|10s|60s|120s|SECONDS]
                      [--shape up|updown] [--output device[:NAME]|simulated|wav:PATH]
                      [--config PATH] [--json]";

#[derive(Default)]
struct Args {
    config: Option<PathBuf>,
    low: Option<f64>,
    high: Option<f64>,
    duration: Option<f64>,
    shape: Option<SweepShape>,
    output: Option<OutputTarget>,
    json: bool,
}

fn parse_args(mut raw: impl Iterator<Item = String>) -> Result<Args> {
    let mut args = Args::default();
    while let Some(flag) = raw.next() {
        if flag == "--json" {
            args.json = true;
            continue;
        }
        let value = raw
            .next()
            .ok_or_else(|| anyhow!("{flag} needs a value"))?;
        match flag.as_str() {
            "--low" => args.low = Some(parse_hz(&value)?),
            "--high" => args.high = Some(parse_hz(&value)?),
            "--duration" => args.duration = Some(parse_duration(&value)?),
            "--shape" => args.shape = Some(value.parse()?),
            "--output" => args.output = Some(parse_output(&value)?),
            "--config" => args.config = Some(PathBuf::from(value)),
            other => bail!("unknown option {other}"),
        }
    }
    Ok(args)
}

fn parse_hz(value: &str) -> Result<f64> {
    value
        .trim()
        .parse()
        .map_err(|_| anyhow!("not a frequency: {value:?}"))
}

fn parse_duration(value: &str) -> Result<f64> {
    if let Ok(preset) = value.parse::<DurationPreset>() {
        return Ok(preset.seconds());
    }
    value
        .trim()
        .trim_end_matches('s')
        .parse()
        .map_err(|_| anyhow!("not a duration: {value:?}"))
}

fn parse_output(value: &str) -> Result<OutputTarget> {
    match value.split_once(':') {
        Some(("wav", path)) if !path.is_empty() => Ok(OutputTarget::Wav { path: path.into() }),
        Some(("device", name)) if !name.is_empty() => Ok(OutputTarget::Device {
            name: Some(name.to_string()),
        }),
        None if value == "device" => Ok(OutputTarget::Device { name: None }),
        None if value == "simulated" => Ok(OutputTarget::Simulated),
        _ => bail!("unknown output {value:?}"),
    }
}

fn emit(event: &SweepEvent) {
    match serde_json::to_string(event) {
        Ok(line) => println!("{line}"),
        Err(e) => eprintln!("failed to encode event: {e}"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{e}\n\n{USAGE}");
            process::exit(2);
        }
    };

    let mut settings = load_settings(args.config.as_deref())?;
    if let Some(output) = args.output {
        settings.output = output;
    }
    let request = settings.request(args.duration, args.low, args.high, args.shape);
    let sink = open_sink(&settings.output)?;
    let engine = SweepEngine::with_settings(sink, Handle::current(), &settings);

    let json = args.json;
    let lead_in = request.padding_seconds;
    let began = Instant::now();
    let handle = engine.start_sweep(
        request.clone(),
        move |hz| {
            if json {
                emit(&SweepEvent::Progress {
                    elapsed_seconds: (began.elapsed().as_secs_f64() - lead_in).max(0.0),
                    frequency_hz: hz,
                });
            } else {
                print!("\rCurrent Frequency: {hz:.1} Hz   ");
                let _ = std::io::stdout().flush();
            }
        },
        || {},
    )?;

    if json {
        emit(&SweepEvent::SweepStarted {
            session_id: handle.id().to_string(),
            request: request.clone(),
        });
    } else {
        println!(
            "Sweeping {:.0} Hz -> {:.0} Hz over {}s ({})",
            request.low_frequency_hz, request.high_frequency_hz, request.duration_seconds, request.shape
        );
    }

    let outcome = tokio::select! {
        outcome = handle.wait() => outcome,
        _ = signal::ctrl_c() => {
            println!("\nInterrupted; a sweep cannot be cancelled once started, exiting");
            return Ok(());
        }
    };
    if let PlaybackOutcome::Failed(err) = outcome {
        println!();
        return Err(err.into());
    }

    if json {
        emit(&SweepEvent::SweepCompleted {
            session_id: handle.id().to_string(),
        });
    } else {
        println!("\nSweep completed");
    }
    Ok(())
}

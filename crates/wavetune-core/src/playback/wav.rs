use super::sink::{hand_off, AudioOutputSink, RenderComplete, RenderJob};
use crate::buffer::SampleBuffer;
use crate::error::DeviceUnavailable;
use hound::{SampleFormat, WavSpec, WavWriter};
use log::{error, info};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};

type FileWriter = WavWriter<BufWriter<File>>;

/// Converts a `[-1, 1]` sample to 16-bit PCM.
pub fn to_pcm16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16
}

pub fn write_wav(path: impl AsRef<Path>, buffer: &SampleBuffer) -> anyhow::Result<()> {
    let rate = wav_rate(buffer.sample_rate_hz())?;
    let writer = WavWriter::create(path, wav_spec(rate))?;
    write_all(writer, buffer)?;
    Ok(())
}

/// The header stores the rate as an integer, so anything else would be misreported.
fn wav_rate(sample_rate_hz: f64) -> Result<u32, DeviceUnavailable> {
    if sample_rate_hz > 0.0 && sample_rate_hz.fract() == 0.0 && sample_rate_hz <= u32::MAX as f64 {
        Ok(sample_rate_hz as u32)
    } else {
        Err(DeviceUnavailable::new(format!(
            "WAV output needs a whole-number sample rate, got {sample_rate_hz} Hz"
        )))
    }
}

fn wav_spec(sample_rate: u32) -> WavSpec {
    WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    }
}

fn write_all(mut writer: FileWriter, buffer: &SampleBuffer) -> hound::Result<()> {
    for s in buffer.samples() {
        writer.write_sample(to_pcm16(*s))?;
    }
    writer.finalize()
}

/// Renders each submitted buffer into a mono 16-bit WAV file instead of a device.
pub struct WavFileSink {
    path: PathBuf,
    writer: Option<FileWriter>,
    jobs: Option<mpsc::Sender<RenderJob>>,
    worker: Option<JoinHandle<()>>,
}

impl WavFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: None,
            jobs: None,
            worker: None,
        }
    }
}

impl AudioOutputSink for WavFileSink {
    fn initialize(&mut self, sample_rate_hz: f64) -> Result<(), DeviceUnavailable> {
        let rate = wav_rate(sample_rate_hz)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                DeviceUnavailable::new(format!("cannot create {}: {e}", parent.display()))
            })?;
        }
        let writer = WavWriter::create(&self.path, wav_spec(rate)).map_err(|e| {
            DeviceUnavailable::new(format!("cannot open {}: {e}", self.path.display()))
        })?;
        self.writer = Some(writer);
        Ok(())
    }

    fn start(&mut self) -> Result<(), DeviceUnavailable> {
        let Some(writer) = self.writer.take() else {
            return Err(DeviceUnavailable::new("WAV output started before initialize"));
        };
        let path = self.path.clone();
        let (jobs, queue) = mpsc::channel::<RenderJob>();
        let worker = thread::Builder::new()
            .name("wavetune-wav".into())
            .spawn(move || {
                // Without a buffer the writer is dropped, which finalizes an empty file.
                let Ok((buffer, on_render_complete)) = queue.recv() else {
                    return;
                };
                match write_all(writer, &buffer) {
                    Ok(()) => {
                        info!("wrote {} samples to {}", buffer.len(), path.display());
                        on_render_complete(Ok(()));
                    }
                    Err(err) => {
                        error!("failed writing {}: {err}", path.display());
                        on_render_complete(Err(DeviceUnavailable::new(format!(
                            "failed writing {}: {err}",
                            path.display()
                        ))));
                    }
                }
            })
            .map_err(|e| DeviceUnavailable::new(format!("failed to spawn WAV writer thread: {e}")))?;
        self.jobs = Some(jobs);
        self.worker = Some(worker);
        Ok(())
    }

    fn submit(&mut self, buffer: SampleBuffer, on_render_complete: RenderComplete) {
        hand_off(self.jobs.as_ref(), buffer, on_render_complete);
    }

    fn stop(&mut self) {
        self.jobs.take();
        self.worker.take();
        if let Some(writer) = self.writer.take() {
            if let Err(err) = writer.finalize() {
                error!("failed closing {}: {err}", self.path.display());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::WavReader;
    use std::time::Duration;
    use tempfile::tempdir;

    #[test]
    fn renders_buffer_to_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out").join("sweep.wav");
        let mut sink = WavFileSink::new(&path);
        sink.initialize(8_000.0).unwrap();
        sink.start().unwrap();

        let (tx, rx) = mpsc::channel();
        sink.submit(
            SampleBuffer::from_samples(vec![0.0, 0.5, -0.5, 1.0], 8_000.0),
            Box::new(move |result| tx.send(result.is_ok()).unwrap()),
        );
        assert!(rx.recv_timeout(Duration::from_secs(2)).unwrap());
        sink.stop();

        let mut reader = WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().sample_rate, 8_000);
        assert_eq!(reader.spec().channels, 1);
        let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![0, 16_384, -16_384, i16::MAX]);
    }

    #[test]
    fn fractional_rate_is_unavailable() {
        let dir = tempdir().unwrap();
        let mut sink = WavFileSink::new(dir.path().join("x.wav"));
        assert!(sink.initialize(44_100.5).is_err());
        assert!(sink.start().is_err());
    }

    #[test]
    fn write_wav_round_trips_length() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("direct.wav");
        write_wav(&path, &SampleBuffer::from_samples(vec![0.25; 480], 48_000.0)).unwrap();
        let reader = WavReader::open(&path).unwrap();
        assert_eq!(reader.len(), 480);
    }

    #[test]
    fn write_wav_refuses_rates_the_header_cannot_hold() {
        let dir = tempdir().unwrap();
        for rate in [44_100.5, f64::NAN, 0.0] {
            let path = dir.path().join("odd.wav");
            let err = write_wav(&path, &SampleBuffer::from_samples(vec![0.0; 16], rate))
                .unwrap_err();
            assert!(err.to_string().contains("whole-number"), "{err}");
            assert!(!path.exists());
        }
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn failed_write_is_reported_through_the_callback() {
        let full = Path::new("/dev/full");
        if !full.exists() {
            return;
        }
        let mut sink = WavFileSink::new(full);
        sink.initialize(8_000.0).unwrap();
        sink.start().unwrap();

        let (tx, rx) = mpsc::channel();
        sink.submit(
            SampleBuffer::from_samples(vec![0.5; 64], 8_000.0),
            Box::new(move |result| tx.send(result).unwrap()),
        );
        let outcome = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert!(outcome.unwrap_err().reason().contains("failed writing"));
        sink.stop();
    }
}

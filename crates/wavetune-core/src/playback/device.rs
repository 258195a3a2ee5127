//! Output through the host audio system via `cpal`.
//!
//! `cpal::Stream` is not `Send` on every platform, so the stream lives on a dedicated
//! thread and the sink talks to it over a command channel.

use super::sink::{AudioOutputSink, RenderComplete};
use crate::buffer::SampleBuffer;
use crate::error::DeviceUnavailable;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use log::{debug, error, info};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputDeviceInfo {
    pub name: String,
    pub is_default: bool,
}

pub fn list_output_devices() -> Result<Vec<OutputDeviceInfo>, DeviceUnavailable> {
    let host = cpal::default_host();
    let default_name = host.default_output_device().and_then(|d| d.name().ok());
    let devices = host
        .output_devices()
        .map_err(|e| DeviceUnavailable::new(format!("failed to enumerate devices: {e}")))?;

    Ok(devices
        .filter_map(|device| device.name().ok())
        .map(|name| OutputDeviceInfo {
            is_default: Some(&name) == default_name.as_ref(),
            name,
        })
        .collect())
}

fn find_device(name: Option<&str>) -> Result<cpal::Device, DeviceUnavailable> {
    let host = cpal::default_host();
    match name {
        Some(wanted) => host
            .output_devices()
            .map_err(|e| DeviceUnavailable::new(format!("failed to enumerate devices: {e}")))?
            .find(|d| d.name().map(|n| n == wanted).unwrap_or(false))
            .ok_or_else(|| DeviceUnavailable::new(format!("device '{wanted}' not found"))),
        None => host
            .default_output_device()
            .ok_or_else(|| DeviceUnavailable::new("no default output device")),
    }
}

struct Pending {
    samples: Vec<f32>,
    position: usize,
    on_complete: Option<RenderComplete>,
}

type Queue = Arc<Mutex<Option<Pending>>>;

enum Command {
    Play(mpsc::Sender<Result<(), DeviceUnavailable>>),
    Shutdown,
}

pub struct CpalSink {
    device_name: Option<String>,
    queue: Queue,
    commands: Option<mpsc::Sender<Command>>,
    owner: Option<JoinHandle<()>>,
}

impl CpalSink {
    pub fn new(device_name: Option<String>) -> Self {
        Self {
            device_name,
            queue: Arc::new(Mutex::new(None)),
            commands: None,
            owner: None,
        }
    }
}

fn build_stream(
    device_name: Option<&str>,
    sample_rate_hz: u32,
    queue: Queue,
) -> Result<cpal::Stream, DeviceUnavailable> {
    let device = find_device(device_name)?;
    let channels = device
        .default_output_config()
        .map_err(|e| DeviceUnavailable::new(format!("failed to query output config: {e}")))?
        .channels()
        .max(1);
    let config = cpal::StreamConfig {
        channels,
        sample_rate: cpal::SampleRate(sample_rate_hz),
        buffer_size: cpal::BufferSize::Default,
    };
    info!(
        "opening {} at {sample_rate_hz} Hz, {channels} channel(s)",
        device.name().unwrap_or_else(|_| "output device".into())
    );

    let frame_len = channels as usize;
    device
        .build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let Some(mut slot) = queue.try_lock() else {
                    data.fill(0.0);
                    return;
                };
                for frame in data.chunks_mut(frame_len) {
                    let value = match slot.as_mut() {
                        Some(p) if p.position < p.samples.len() => {
                            p.position += 1;
                            p.samples[p.position - 1]
                        }
                        _ => 0.0,
                    };
                    frame.fill(value);
                }
                if let Some(p) = slot.as_mut() {
                    if p.position >= p.samples.len() {
                        if let Some(done) = p.on_complete.take() {
                            done(Ok(()));
                        }
                    }
                }
            },
            |err| error!("output stream error: {err}"),
            None,
        )
        .map_err(|e| DeviceUnavailable::new(format!("failed to build output stream: {e}")))
}

impl AudioOutputSink for CpalSink {
    fn initialize(&mut self, sample_rate_hz: f64) -> Result<(), DeviceUnavailable> {
        if !(sample_rate_hz > 0.0 && sample_rate_hz.fract() == 0.0) {
            return Err(DeviceUnavailable::new(format!(
                "device output needs a whole-number sample rate, got {sample_rate_hz} Hz"
            )));
        }
        self.stop();

        let (ready_tx, ready_rx) = mpsc::channel();
        let (command_tx, command_rx) = mpsc::channel::<Command>();
        let name = self.device_name.clone();
        let queue = Arc::clone(&self.queue);
        let rate = sample_rate_hz as u32;

        let owner = thread::Builder::new()
            .name("wavetune-output".into())
            .spawn(move || {
                let stream = match build_stream(name.as_deref(), rate, queue) {
                    Ok(stream) => {
                        let _ = ready_tx.send(Ok(()));
                        stream
                    }
                    Err(err) => {
                        let _ = ready_tx.send(Err(err));
                        return;
                    }
                };
                while let Ok(command) = command_rx.recv() {
                    match command {
                        Command::Play(reply) => {
                            let result = stream.play().map_err(|e| {
                                DeviceUnavailable::new(format!("failed to start stream: {e}"))
                            });
                            let _ = reply.send(result);
                        }
                        Command::Shutdown => break,
                    }
                }
                debug!("output stream closed");
            })
            .map_err(|e| DeviceUnavailable::new(format!("failed to spawn output thread: {e}")))?;

        let ready = ready_rx
            .recv()
            .map_err(|_| DeviceUnavailable::new("output thread exited during setup"))?;
        self.owner = Some(owner);
        ready?;
        self.commands = Some(command_tx);
        Ok(())
    }

    fn start(&mut self) -> Result<(), DeviceUnavailable> {
        let commands = self
            .commands
            .as_ref()
            .ok_or_else(|| DeviceUnavailable::new("device output started before initialize"))?;
        let (reply_tx, reply_rx) = mpsc::channel();
        commands
            .send(Command::Play(reply_tx))
            .map_err(|_| DeviceUnavailable::new("output thread is gone"))?;
        reply_rx
            .recv()
            .map_err(|_| DeviceUnavailable::new("output thread is gone"))?
    }

    fn submit(&mut self, buffer: SampleBuffer, on_render_complete: RenderComplete) {
        *self.queue.lock() = Some(Pending {
            samples: buffer.into_samples(),
            position: 0,
            on_complete: Some(on_render_complete),
        });
    }

    fn stop(&mut self) {
        if let Some(commands) = self.commands.take() {
            let _ = commands.send(Command::Shutdown);
        }
        if let Some(owner) = self.owner.take() {
            if owner.join().is_err() {
                error!("output thread panicked");
            }
        }
        self.queue.lock().take();
    }
}

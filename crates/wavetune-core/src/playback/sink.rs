use crate::buffer::SampleBuffer;
use crate::error::DeviceUnavailable;
use log::debug;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Called by a sink, from its rendering context, once the last submitted sample is out
/// (`Ok`) or once it has given up on the buffer (`Err`).
pub type RenderComplete = Box<dyn FnOnce(Result<(), DeviceUnavailable>) + Send + 'static>;

/// Something that can render a mono buffer at a fixed sample rate.
///
/// A sink that drops `on_render_complete` without calling it is treated as having
/// abandoned the buffer.
pub trait AudioOutputSink: Send {
    fn initialize(&mut self, sample_rate_hz: f64) -> Result<(), DeviceUnavailable>;
    /// Brings up whatever renders submitted buffers. Worker threads are spawned here so
    /// that failing to create one is reported before anything is submitted.
    fn start(&mut self) -> Result<(), DeviceUnavailable>;
    fn submit(&mut self, buffer: SampleBuffer, on_render_complete: RenderComplete);
    /// Releases whatever `initialize`/`start` acquired. Safe to call in any state. May
    /// block while a worker shuts down.
    fn stop(&mut self);
}

/// A buffer queued for a sink's worker thread.
pub(crate) type RenderJob = (SampleBuffer, RenderComplete);

/// Queues `buffer` on a started worker, failing the callback if there is none.
pub(crate) fn hand_off(
    jobs: Option<&mpsc::Sender<RenderJob>>,
    buffer: SampleBuffer,
    on_render_complete: RenderComplete,
) {
    let Some(jobs) = jobs else {
        on_render_complete(Err(DeviceUnavailable::new("buffer submitted before start")));
        return;
    };
    if let Err(mpsc::SendError((_, on_render_complete))) = jobs.send((buffer, on_render_complete)) {
        on_render_complete(Err(DeviceUnavailable::new("render thread has exited")));
    }
}

const DEFAULT_BLOCK: Duration = Duration::from_millis(10);

/// Renders buffers in real time on a background thread without touching any device.
pub struct SimulatedSink {
    block: Duration,
    sample_rate_hz: f64,
    rendered: Arc<AtomicUsize>,
    halt: Arc<AtomicBool>,
    jobs: Option<mpsc::Sender<RenderJob>>,
    worker: Option<JoinHandle<()>>,
}

impl SimulatedSink {
    pub fn new() -> Self {
        Self::with_block(DEFAULT_BLOCK)
    }

    pub fn with_block(block: Duration) -> Self {
        Self {
            block: block.max(Duration::from_millis(1)),
            sample_rate_hz: 0.0,
            rendered: Arc::new(AtomicUsize::new(0)),
            halt: Arc::new(AtomicBool::new(false)),
            jobs: None,
            worker: None,
        }
    }

    /// Frames rendered so far for the current buffer.
    pub fn rendered_frames(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.rendered)
    }
}

impl Default for SimulatedSink {
    fn default() -> Self {
        Self::new()
    }
}

/// Paces `buffer` against the wall clock block by block. Returns false if halted first.
fn render_in_real_time(
    buffer: &SampleBuffer,
    rate: f64,
    frames_per_block: usize,
    rendered: &AtomicUsize,
    halt: &AtomicBool,
) -> bool {
    let began = Instant::now();
    let mut done = 0usize;
    for block in buffer.samples().chunks(frames_per_block) {
        if halt.load(Ordering::SeqCst) {
            debug!("simulated render halted after {done} of {} frames", buffer.len());
            return false;
        }
        done += block.len();
        let deadline = began + Duration::from_secs_f64(done as f64 / rate);
        if let Some(wait) = deadline.checked_duration_since(Instant::now()) {
            thread::sleep(wait);
        }
        rendered.store(done, Ordering::SeqCst);
    }
    true
}

impl AudioOutputSink for SimulatedSink {
    fn initialize(&mut self, sample_rate_hz: f64) -> Result<(), DeviceUnavailable> {
        if !(sample_rate_hz.is_finite() && sample_rate_hz > 0.0) {
            return Err(DeviceUnavailable::new(format!(
                "unsupported sample rate {sample_rate_hz} Hz"
            )));
        }
        self.sample_rate_hz = sample_rate_hz;
        self.rendered.store(0, Ordering::SeqCst);
        self.halt = Arc::new(AtomicBool::new(false));
        Ok(())
    }

    fn start(&mut self) -> Result<(), DeviceUnavailable> {
        if self.sample_rate_hz <= 0.0 {
            return Err(DeviceUnavailable::new("simulated output started before initialize"));
        }
        let rate = self.sample_rate_hz;
        let frames_per_block = ((rate * self.block.as_secs_f64()).round() as usize).max(1);
        let rendered = Arc::clone(&self.rendered);
        let halt = Arc::clone(&self.halt);
        let (jobs, queue) = mpsc::channel::<RenderJob>();

        let worker = thread::Builder::new()
            .name("wavetune-render".into())
            .spawn(move || {
                while let Ok((buffer, on_render_complete)) = queue.recv() {
                    if !render_in_real_time(&buffer, rate, frames_per_block, &rendered, &halt) {
                        return;
                    }
                    on_render_complete(Ok(()));
                }
            })
            .map_err(|e| DeviceUnavailable::new(format!("failed to spawn render thread: {e}")))?;

        self.jobs = Some(jobs);
        self.worker = Some(worker);
        Ok(())
    }

    fn submit(&mut self, buffer: SampleBuffer, on_render_complete: RenderComplete) {
        hand_off(self.jobs.as_ref(), buffer, on_render_complete);
    }

    fn stop(&mut self) {
        self.halt.store(true, Ordering::SeqCst);
        // Closing the queue lets an idle worker exit; a busy one sees `halt`.
        self.jobs.take();
        self.worker.take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_in_real_time_and_signals_completion() {
        let mut sink = SimulatedSink::with_block(Duration::from_millis(5));
        let rendered = sink.rendered_frames();
        sink.initialize(8_000.0).unwrap();
        sink.start().unwrap();

        let (tx, rx) = mpsc::channel();
        let began = Instant::now();
        sink.submit(
            SampleBuffer::from_samples(vec![0.0; 800], 8_000.0),
            Box::new(move |result| tx.send(result.is_ok()).unwrap()),
        );
        assert!(rx.recv_timeout(Duration::from_secs(2)).unwrap());
        assert!(began.elapsed() >= Duration::from_millis(95));
        assert_eq!(rendered.load(Ordering::SeqCst), 800);
        sink.stop();
    }

    #[test]
    fn stop_abandons_the_buffer() {
        let mut sink = SimulatedSink::new();
        sink.initialize(8_000.0).unwrap();
        sink.start().unwrap();
        let (tx, rx) = mpsc::channel::<bool>();
        sink.submit(
            SampleBuffer::from_samples(vec![0.0; 80_000], 8_000.0),
            Box::new(move |result| tx.send(result.is_ok()).unwrap()),
        );
        sink.stop();
        // The sender is dropped with the abandoned callback.
        assert_eq!(
            rx.recv_timeout(Duration::from_secs(1)),
            Err(mpsc::RecvTimeoutError::Disconnected)
        );
    }

    #[test]
    fn rejects_start_without_initialize() {
        let mut sink = SimulatedSink::new();
        assert!(sink.start().is_err());
        assert!(sink.initialize(0.0).is_err());
        assert!(sink.initialize(f64::NAN).is_err());
    }

    #[test]
    fn submit_without_a_worker_reports_failure() {
        let mut sink = SimulatedSink::new();
        sink.initialize(8_000.0).unwrap();
        let (tx, rx) = mpsc::channel();
        sink.submit(
            SampleBuffer::from_samples(vec![0.0; 8], 8_000.0),
            Box::new(move |result| tx.send(result).unwrap()),
        );
        let failure = rx.recv_timeout(Duration::from_secs(1)).unwrap().unwrap_err();
        assert!(failure.reason().contains("before start"), "{failure}");
    }

    #[test]
    fn submit_after_stop_reports_failure() {
        let mut sink = SimulatedSink::new();
        sink.initialize(8_000.0).unwrap();
        sink.start().unwrap();
        sink.stop();
        let (tx, rx) = mpsc::channel();
        sink.submit(
            SampleBuffer::from_samples(vec![0.0; 8], 8_000.0),
            Box::new(move |result| tx.send(result.is_err()).unwrap()),
        );
        assert!(rx.recv_timeout(Duration::from_secs(1)).unwrap());
    }
}

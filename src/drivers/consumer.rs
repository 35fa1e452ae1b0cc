use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::{Duration, SystemTime};
use ndarray::Array2;
use crate::drivers::fft::{FrequencySpectrum, SpectrumBuilder};
use crate::drivers::stats::{calc_stats, StatsResult};
use crate::drivers::{DaqError, RingBuffer, SampleBlock};
use crate::recorder::DataRecorder;
use crate::types::AcquisitionEvent;
/// Outcome of draining the acquisition channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionStatus {
    Running,
    /// The worker reported a terminal error.
    Failed(String),
    /// The worker exited and the channel is closed.
    Ended,
}
/// Consumer side of an acquisition session: owns the live ring buffer.
pub struct LiveView {
    rx: Receiver<AcquisitionEvent>,
    buffer: RingBuffer,
    sample_rate_hz: f64,
    status: SessionStatus,
    blocks_received: u64,
    last_block_at: Option<SystemTime>,
    recorder: DataRecorder,
}
impl LiveView {
    pub fn new(rx: Receiver<AcquisitionEvent>, buffer: RingBuffer, sample_rate_hz: f64) -> Self {
        Self {
            rx,
            buffer,
            sample_rate_hz,
            status: SessionStatus::Running,
            blocks_received: 0,
            last_block_at: None,
            recorder: DataRecorder::new(),
        }
    }
    /// Appends every queued block in arrival order without blocking.
    ///
    /// A block whose shape does not fit the buffer is logged and skipped; it
    /// does not end the session.
    pub fn pump(&mut self) -> &SessionStatus {
        while self.status == SessionStatus::Running {
            match self.rx.try_recv() {
                Ok(event) => self.handle(event),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => self.status = SessionStatus::Ended,
            }
        }
        &self.status
    }
    /// Like [`pump`](Self::pump) but waits up to `timeout` for the first event.
    pub fn pump_timeout(&mut self, timeout: Duration) -> &SessionStatus {
        if self.status == SessionStatus::Running {
            match self.rx.recv_timeout(timeout) {
                Ok(event) => self.handle(event),
                Err(std::sync::mpsc::RecvTimeoutError::Timeout) => {}
                Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => {
                    self.status = SessionStatus::Ended
                }
            }
        }
        self.pump()
    }
    fn handle(&mut self, event: AcquisitionEvent) {
        match event {
            AcquisitionEvent::Block(block) => self.ingest(&block),
            AcquisitionEvent::Error { stage, message } => {
                self.status = SessionStatus::Failed(format!("{stage}: {message}"));
            }
        }
    }
    fn ingest(&mut self, block: &SampleBlock) {
        match self.buffer.append(block) {
            Ok(()) => {
                self.blocks_received += 1;
                self.last_block_at = Some(block.captured_at());
                if let Err(err) = self.recorder.write_block(block) {
                    log::warn!("block not recorded: {err}");
                }
            }
            Err(err) => log::warn!("dropping block: {err}"),
        }
    }
    pub fn status(&self) -> &SessionStatus {
        &self.status
    }
    pub fn blocks_received(&self) -> u64 {
        self.blocks_received
    }
    pub fn last_block_at(&self) -> Option<SystemTime> {
        self.last_block_at
    }
    pub fn buffer(&self) -> &RingBuffer {
        &self.buffer
    }
    /// Accepted blocks are also written here while it is recording.
    pub fn recorder_mut(&mut self) -> &mut DataRecorder {
        &mut self.recorder
    }
    /// Restart with an empty buffer, e.g. after stop/start.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.blocks_received = 0;
        self.last_block_at = None;
    }
    pub fn latest_frame(&self, seconds: f64) -> Array2<f64> {
        let count = (self.sample_rate_hz * seconds).ceil().max(0.0) as usize;
        self.buffer.snapshot(count)
    }
    pub fn latest_spectrum(&self, fft_size: usize) -> Result<FrequencySpectrum, DaqError> {
        let window = self.buffer.snapshot(fft_size);
        if window.ncols() == 0 {
            return Err(DaqError::InvalidInput("no samples acquired yet".into()));
        }
        SpectrumBuilder::with_size(fft_size).compute(window.view(), self.sample_rate_hz)
    }
    pub fn latest_stats(&self, count: usize) -> Result<StatsResult, DaqError> {
        calc_stats(self.buffer.snapshot(count).view())
    }
}

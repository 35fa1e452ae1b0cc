use std::collections::VecDeque;
use std::f64::consts::TAU;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, SystemTime};
use anyhow::{anyhow, bail, Result};
use ndarray::{Array1, Array2, Axis};
use rand::Rng;
use crate::drivers::DaqError;
/// One timestamped read across all active channels.
#[derive(Clone, Debug)]
pub struct SampleBlock {
    captured_at: SystemTime,
    samples: Array2<f64>, // channels x samples
}
impl SampleBlock {
    pub fn new(samples: Array2<f64>, captured_at: SystemTime) -> Result<Self, DaqError> {
        let (channels, len) = samples.dim();
        if channels == 0 || len == 0 {
            return Err(DaqError::InvalidInput(format!(
                "sample block must be non-empty, got {channels}x{len}"
            )));
        }
        Ok(Self {
            captured_at,
            samples,
        })
    }
    /// Wraps a single-channel read as a 1 x N block.
    pub fn from_channel(samples: Array1<f64>, captured_at: SystemTime) -> Result<Self, DaqError> {
        Self::new(samples.insert_axis(Axis(0)), captured_at)
    }
    pub fn captured_at(&self) -> SystemTime {
        self.captured_at
    }
    pub fn samples(&self) -> &Array2<f64> {
        &self.samples
    }
    pub fn into_samples(self) -> Array2<f64> {
        self.samples
    }
    pub fn num_channels(&self) -> usize {
        self.samples.nrows()
    }
    pub fn samples_per_channel(&self) -> usize {
        self.samples.ncols()
    }
    pub fn duration(&self, sample_rate_hz: f64) -> Option<Duration> {
        (sample_rate_hz > 0.0)
            .then(|| Duration::from_secs_f64(self.samples_per_channel() as f64 / sample_rate_hz))
    }
}
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClockMode {
    Continuous,
    Finite,
}
/// Opaque acquisition device driver. Errors are driver-specific.
pub trait SampleSource {
    type Handle: SourceHandle;
    fn open(&mut self, device_id: &str, channel_id: &str, sample_rate_hz: u32) -> Result<Self::Handle>;
}
/// An opened device task.
pub trait SourceHandle {
    fn configure_clock(&mut self, sample_rate_hz: u32, mode: ClockMode) -> Result<()>;
    /// Blocks until `samples_per_channel` samples per channel are available.
    fn read(&mut self, samples_per_channel: usize) -> Result<Array2<f64>>;
    fn close(&mut self);
}
/// Number of channels named by an id such as `ai0` or `ai0:3`.
pub fn channel_count_from_id(channel_id: &str) -> usize {
    fn index(part: &str) -> Option<usize> {
        let digits: String = part
            .trim()
            .chars()
            .skip_while(|c| !c.is_ascii_digit())
            .collect();
        digits.parse().ok()
    }
    match channel_id.split_once(':') {
        Some((first, last)) => match (index(first), index(last)) {
            (Some(a), Some(b)) => a.abs_diff(b) + 1,
            _ => 1,
        },
        None => 1,
    }
}
/// In-memory source that replays scripted reads, useful for tests.
pub struct ScriptedSource {
    reads: VecDeque<Result<Array2<f64>, String>>,
    open_error: Option<String>,
    clock_error: Option<String>,
    closed: Arc<AtomicBool>,
}
impl ScriptedSource {
    pub fn new(reads: impl IntoIterator<Item = Array2<f64>>) -> Self {
        Self {
            reads: reads.into_iter().map(Ok).collect(),
            open_error: None,
            clock_error: None,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }
    pub fn failing_open(message: &str) -> Self {
        let mut source = Self::new([]);
        source.open_error = Some(message.to_string());
        source
    }
    pub fn with_clock_error(mut self, message: &str) -> Self {
        self.clock_error = Some(message.to_string());
        self
    }
    /// Queues a failing read after the scripted ones.
    pub fn then_fail(mut self, message: &str) -> Self {
        self.reads.push_back(Err(message.to_string()));
        self
    }
    /// Set once the handle has been closed.
    pub fn closed_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.closed)
    }
}
impl SampleSource for ScriptedSource {
    type Handle = ScriptedHandle;
    fn open(&mut self, device_id: &str, channel_id: &str, _sample_rate_hz: u32) -> Result<ScriptedHandle> {
        if let Some(message) = self.open_error.take() {
            bail!("cannot open {device_id}/{channel_id}: {message}");
        }
        Ok(ScriptedHandle {
            reads: std::mem::take(&mut self.reads),
            clock_error: self.clock_error.take(),
            closed: Arc::clone(&self.closed),
        })
    }
}
pub struct ScriptedHandle {
    reads: VecDeque<Result<Array2<f64>, String>>,
    clock_error: Option<String>,
    closed: Arc<AtomicBool>,
}
impl SourceHandle for ScriptedHandle {
    fn configure_clock(&mut self, _sample_rate_hz: u32, _mode: ClockMode) -> Result<()> {
        match self.clock_error.take() {
            Some(message) => Err(anyhow!(message)),
            None => Ok(()),
        }
    }
    fn read(&mut self, _samples_per_channel: usize) -> Result<Array2<f64>> {
        match self.reads.pop_front() {
            Some(Ok(samples)) => Ok(samples),
            Some(Err(message)) => Err(anyhow!(message)),
            None => Err(anyhow!("scripted source exhausted")),
        }
    }
    fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}
/// Sine generator paced at the configured rate, standing in for hardware.
#[derive(Clone, Debug)]
pub struct SimulatedSource {
    pub signal_hz: f64,
    pub amplitude: f64,
    pub noise: f64,
    /// Sleep for the duration of each read, like a real clocked task.
    pub paced: bool,
}
impl Default for SimulatedSource {
    fn default() -> Self {
        Self {
            signal_hz: 10.0,
            amplitude: 1.0,
            noise: 0.05,
            paced: true,
        }
    }
}
impl SampleSource for SimulatedSource {
    type Handle = SimulatedHandle;
    fn open(&mut self, _device_id: &str, channel_id: &str, sample_rate_hz: u32) -> Result<SimulatedHandle> {
        if sample_rate_hz == 0 {
            bail!("sample rate must be positive");
        }
        Ok(SimulatedHandle {
            params: self.clone(),
            channels: channel_count_from_id(channel_id),
            sample_rate_hz: sample_rate_hz as f64,
            sample_index: 0,
            continuous: false,
            open: true,
        })
    }
}
pub struct SimulatedHandle {
    params: SimulatedSource,
    channels: usize,
    sample_rate_hz: f64,
    sample_index: u64,
    continuous: bool,
    open: bool,
}
impl SourceHandle for SimulatedHandle {
    fn configure_clock(&mut self, sample_rate_hz: u32, mode: ClockMode) -> Result<()> {
        if sample_rate_hz == 0 {
            bail!("sample clock rate must be positive");
        }
        self.sample_rate_hz = sample_rate_hz as f64;
        self.continuous = mode == ClockMode::Continuous;
        Ok(())
    }
    fn read(&mut self, samples_per_channel: usize) -> Result<Array2<f64>> {
        if !self.open {
            bail!("task is closed");
        }
        if !self.continuous {
            bail!("sample clock not configured for continuous acquisition");
        }
        if self.params.paced {
            thread::sleep(Duration::from_secs_f64(
                samples_per_channel as f64 / self.sample_rate_hz,
            ));
        }
        let mut rng = rand::thread_rng();
        let start = self.sample_index;
        let params = &self.params;
        let rate = self.sample_rate_hz;
        let block = Array2::from_shape_fn((self.channels, samples_per_channel), |(ch, i)| {
            let t = (start + i as u64) as f64 / rate;
            let phase = ch as f64 * TAU / 8.0;
            let noise = if params.noise > 0.0 {
                rng.gen_range(-params.noise..params.noise)
            } else {
                0.0
            };
            params.amplitude * (TAU * params.signal_hz * t + phase).sin() + noise
        });
        self.sample_index += samples_per_channel as u64;
        Ok(block)
    }
    fn close(&mut self) {
        self.open = false;
    }
}

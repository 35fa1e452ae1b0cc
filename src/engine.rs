// src/engine.rs
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::SystemTime;
use crate::config::AcquisitionConfig;
use crate::drivers::{ClockMode, DaqError, SampleBlock, SampleSource, SourceHandle};
use crate::types::{AcquisitionEvent, AcquisitionStage};

/// Drives a [`SampleSource`] on a dedicated thread.
///
/// Blocks are sent in read order over an mpsc channel. Any open, clock, or
/// read failure is sent as the final event and ends the session; there is no
/// retry. `stop` is cooperative: an in-flight read finishes first.
pub struct AcquisitionWorker {
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl AcquisitionWorker {
    /// Validates `config` and starts acquiring into `tx`.
    pub fn start<S>(source: S, config: AcquisitionConfig, tx: Sender<AcquisitionEvent>) -> Result<Self, DaqError>
    where
        S: SampleSource + Send + 'static,
    {
        config.validate()?;
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);
        let thread = thread::Builder::new()
            .name(format!("acquire-{}", config.physical_channel()))
            .spawn(move || run_session(source, &config, &flag, &tx))?;
        Ok(Self {
            running,
            thread: Some(thread),
        })
    }

    /// Like [`start`](Self::start), creating the channel as well.
    pub fn spawn<S>(source: S, config: AcquisitionConfig) -> Result<(Self, Receiver<AcquisitionEvent>), DaqError>
    where
        S: SampleSource + Send + 'static,
    {
        let (tx, rx) = channel();
        let worker = Self::start(source, config, tx)?;
        Ok((worker, rx))
    }

    pub fn stop(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            log::info!("acquisition stop requested");
        }
    }

    /// True until the loop has exited or a stop was requested.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
            && self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Waits for the acquisition thread to exit.
    pub fn join(mut self) {
        self.join_thread();
    }

    fn join_thread(&mut self) {
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("acquisition thread panicked");
            }
        }
    }
}

impl Drop for AcquisitionWorker {
    fn drop(&mut self) {
        self.stop();
        self.join_thread();
    }
}

fn run_session<S: SampleSource>(
    mut source: S,
    config: &AcquisitionConfig,
    running: &AtomicBool,
    tx: &Sender<AcquisitionEvent>,
) {
    let fail = |stage: AcquisitionStage, message: String| {
        log::error!("acquisition {stage} failed on {}: {message}", config.physical_channel());
        running.store(false, Ordering::SeqCst);
        tx.send(AcquisitionEvent::Error { stage, message }).ok();
    };

    // 1. 打开设备
    let mut handle = match source.open(&config.device_id, &config.channel_id, config.sample_rate_hz) {
        Ok(handle) => handle,
        Err(err) => return fail(AcquisitionStage::Open, format!("{err:#}")),
    };

    // 2. 连续采样时钟
    if let Err(err) = handle.configure_clock(config.sample_rate_hz, ClockMode::Continuous) {
        handle.close();
        return fail(AcquisitionStage::ConfigureClock, format!("{err:#}"));
    }
    log::info!(
        "acquiring {} at {} Hz, {} samples per read",
        config.physical_channel(),
        config.sample_rate_hz,
        config.samples_per_read
    );

    // 3. 数据流循环
    let mut channels: Option<usize> = None;
    let mut blocks: u64 = 0;
    while running.load(Ordering::SeqCst) {
        let block = handle
            .read(config.samples_per_read)
            .map_err(|err| format!("{err:#}"))
            .and_then(|samples| {
                SampleBlock::new(samples, SystemTime::now()).map_err(|err| err.to_string())
            })
            .and_then(|block| match channels {
                Some(expected) if expected != block.num_channels() => Err(format!(
                    "device changed channel count from {expected} to {}",
                    block.num_channels()
                )),
                _ => Ok(block),
            });
        match block {
            Ok(block) => {
                channels = Some(block.num_channels());
                blocks += 1;
                log::debug!("block {blocks}: {:?}", block.samples().dim());
                if tx.send(AcquisitionEvent::Block(block)).is_err() {
                    log::warn!("acquisition consumer went away, stopping");
                    break;
                }
            }
            Err(message) => {
                handle.close();
                return fail(AcquisitionStage::Read, message);
            }
        }
    }
    handle.close();
    running.store(false, Ordering::SeqCst);
    log::info!("acquisition stopped after {blocks} blocks");
}

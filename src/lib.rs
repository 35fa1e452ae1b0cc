// src/lib.rs
//! Data acquisition and playback toolkit: a background acquisition worker,
//! a multichannel ring buffer, a frame-by-frame playback engine and a
//! stateless signal pipeline (FFT, lowpass filters, statistics and external
//! transform plugins).
pub mod capture;
pub mod config;
pub mod drivers;
pub mod engine;
pub mod player;
pub mod recorder;
pub mod types;

pub use config::{AcquisitionConfig, SessionConfig};
pub use drivers::pipeline;
pub use drivers::{DaqError, PluginError, RingBuffer, SampleBlock};
pub use engine::AcquisitionWorker;
pub use player::{Dataset, PlaybackEngine, PlaybackSpeed, PlaybackState};
pub use recorder::DataRecorder;
pub use types::{AcquisitionEvent, AcquisitionStage, PlaybackEvent};

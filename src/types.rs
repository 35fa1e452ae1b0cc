// src/types.rs
use std::fmt;
use ndarray::Array1;
use crate::drivers::SampleBlock;

// Which step of the device session failed
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum AcquisitionStage {
    Open,
    ConfigureClock,
    Read,
}

impl fmt::Display for AcquisitionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AcquisitionStage::Open => "open",
            AcquisitionStage::ConfigureClock => "clock configuration",
            AcquisitionStage::Read => "read",
        };
        f.write_str(name)
    }
}

// Worker thread -> consumer
#[derive(Clone, Debug)]
pub enum AcquisitionEvent {
    Block(SampleBlock),
    // Always the last event of a session
    Error { stage: AcquisitionStage, message: String },
}

// Playback engine -> renderer
#[derive(Clone, Debug, PartialEq)]
pub enum PlaybackEvent {
    FrameChanged { index: usize, frame: Array1<f64> },
    Finished,
}

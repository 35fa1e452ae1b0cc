use std::path::Path;
use std::time::SystemTime;
use ndarray::{concatenate, Array2, Axis};
use crate::capture;
use crate::drivers::{DaqError, SampleBlock};
use crate::player::Dataset;

/// Accumulates acquired blocks into a dataset that can be saved or replayed.
pub struct DataRecorder {
    blocks: Option<Vec<Array2<f64>>>,
    channels: Option<usize>,
    started_at: Option<SystemTime>,
}

impl Default for DataRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl DataRecorder {
    pub fn new() -> Self {
        Self {
            blocks: None,
            channels: None,
            started_at: None,
        }
    }

    pub fn start(&mut self) {
        self.blocks = Some(Vec::new());
        self.channels = None;
        self.started_at = Some(SystemTime::now());
        log::info!("recording started");
    }

    pub fn is_recording(&self) -> bool {
        self.blocks.is_some()
    }

    pub fn started_at(&self) -> Option<SystemTime> {
        self.started_at
    }

    /// Appends a block; ignored while not recording.
    pub fn write_block(&mut self, block: &SampleBlock) -> Result<(), DaqError> {
        let Some(blocks) = &mut self.blocks else {
            return Ok(());
        };
        match self.channels {
            Some(expected) if expected != block.num_channels() => {
                return Err(DaqError::ShapeMismatch {
                    expected,
                    actual: block.num_channels(),
                })
            }
            _ => self.channels = Some(block.num_channels()),
        }
        blocks.push(block.samples().clone());
        Ok(())
    }

    /// Frames recorded so far.
    pub fn frame_count(&self) -> usize {
        self.blocks
            .as_ref()
            .map_or(0, |blocks| blocks.iter().map(|b| b.ncols()).sum())
    }

    /// Stops recording and returns everything captured.
    pub fn stop(&mut self) -> Result<Dataset, DaqError> {
        let blocks = self.blocks.take().unwrap_or_default();
        self.channels = None;
        log::info!("recording stopped after {} blocks", blocks.len());
        let views: Vec<_> = blocks.iter().map(|b| b.view()).collect();
        let data = concatenate(Axis(1), &views)
            .map_err(|_| DaqError::InvalidInput("nothing was recorded".into()))?;
        Dataset::new(data)
    }

    /// Stops recording and writes the capture, format chosen by extension.
    pub fn stop_and_save(&mut self, path: impl AsRef<Path>) -> Result<Dataset, DaqError> {
        let dataset = self.stop()?;
        capture::save_data(path, dataset.view())?;
        Ok(dataset)
    }
}

use std::fs;
use std::path::Path;
use serde::{Deserialize, Serialize};
use crate::drivers::DaqError;
pub const MIN_SAMPLE_RATE_HZ: u32 = 1;
pub const MAX_SAMPLE_RATE_HZ: u32 = 2_000_000;
/// Parameters for one acquisition session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    pub device_id: String,
    /// Physical channel, e.g. `ai0` or a range such as `ai0:3`.
    pub channel_id: String,
    pub sample_rate_hz: u32,
    pub samples_per_read: usize,
}
impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            device_id: "Dev1".to_string(),
            channel_id: "ai0".to_string(),
            sample_rate_hz: 10_000,
            samples_per_read: 1_000,
        }
    }
}
impl AcquisitionConfig {
    pub fn new(device_id: &str, channel_id: &str, sample_rate_hz: u32, samples_per_read: usize) -> Self {
        Self {
            device_id: device_id.to_string(),
            channel_id: channel_id.to_string(),
            sample_rate_hz,
            samples_per_read,
        }
    }
    pub fn validate(&self) -> Result<(), DaqError> {
        if self.device_id.trim().is_empty() {
            return Err(DaqError::Configuration("device identifier is empty".into()));
        }
        if self.channel_id.trim().is_empty() {
            return Err(DaqError::Configuration("channel identifier is empty".into()));
        }
        if !(MIN_SAMPLE_RATE_HZ..=MAX_SAMPLE_RATE_HZ).contains(&self.sample_rate_hz) {
            return Err(DaqError::Configuration(format!(
                "sample rate {} Hz outside {MIN_SAMPLE_RATE_HZ}..={MAX_SAMPLE_RATE_HZ}",
                self.sample_rate_hz
            )));
        }
        if self.samples_per_read == 0 {
            return Err(DaqError::Configuration(
                "samples per read must be positive".into(),
            ));
        }
        Ok(())
    }
    /// Qualified physical channel name, `device/channel`.
    pub fn physical_channel(&self) -> String {
        format!("{}/{}", self.device_id, self.channel_id)
    }
}
/// Everything the binary needs to run a live session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub acquisition: AcquisitionConfig,
    /// Samples kept per channel by the live ring buffer.
    pub buffer_capacity: usize,
}
impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            acquisition: AcquisitionConfig::default(),
            buffer_capacity: 10_000,
        }
    }
}
impl SessionConfig {
    pub fn from_json_str(text: &str) -> Result<Self, DaqError> {
        let config: SessionConfig = serde_json::from_str(text)
            .map_err(|err| DaqError::Configuration(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, DaqError> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
    pub fn validate(&self) -> Result<(), DaqError> {
        self.acquisition.validate()?;
        if self.buffer_capacity == 0 {
            return Err(DaqError::Configuration(
                "buffer capacity must be positive".into(),
            ));
        }
        Ok(())
    }
}

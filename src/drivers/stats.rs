use ndarray::{ArrayView2, Axis};
use serde::Serialize;
use crate::drivers::DaqError;
/// Per-channel summary; index `i` of every field belongs to channel `i`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StatsResult {
    pub mean: Vec<f64>,
    /// Population standard deviation.
    pub std: Vec<f64>,
    pub min: Vec<f64>,
    pub max: Vec<f64>,
}
impl StatsResult {
    pub fn channel_count(&self) -> usize {
        self.mean.len()
    }
}
pub fn calc_stats(data: ArrayView2<f64>) -> Result<StatsResult, DaqError> {
    if data.nrows() == 0 || data.ncols() == 0 {
        return Err(DaqError::Stats);
    }
    let channels = data.nrows();
    let mut result = StatsResult {
        mean: Vec::with_capacity(channels),
        std: Vec::with_capacity(channels),
        min: Vec::with_capacity(channels),
        max: Vec::with_capacity(channels),
    };
    for channel in data.axis_iter(Axis(0)) {
        let len = channel.len() as f64;
        let mean = channel.sum() / len;
        let variance = channel
            .iter()
            .map(|v| {
                let delta = v - mean;
                delta * delta
            })
            .sum::<f64>()
            / len;
        result.mean.push(mean);
        result.std.push(variance.sqrt());
        result.min.push(channel.fold(f64::INFINITY, |acc, &v| acc.min(v)));
        result.max.push(channel.fold(f64::NEG_INFINITY, |acc, &v| acc.max(v)));
    }
    Ok(result)
}

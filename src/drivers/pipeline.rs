//! Stateless signal-processing entry points.
//!
//! Everything here takes a borrowed `channels x samples` view, so the same
//! calls work on a [`SampleBlock`](crate::drivers::SampleBlock), a ring buffer
//! snapshot, or a loaded [`Dataset`](crate::player::Dataset), from any thread.
use std::path::Path;
use ndarray::{Array2, ArrayView2};
use rustfft::num_complex::Complex64;
use crate::drivers::filter::{apply_fir, apply_sections, design_butterworth, design_fir};
use crate::drivers::{DaqError, FilterSpec, StatsResult};
pub fn fft(data: ArrayView2<f64>) -> Result<Array2<Complex64>, DaqError> {
    crate::drivers::fft::fft(data)
}
pub fn ifft(spectrum: ArrayView2<Complex64>) -> Result<Array2<Complex64>, DaqError> {
    crate::drivers::fft::ifft(spectrum)
}
/// FIR lowpass (`spec.order` taps, 64 by default) along the sample axis.
pub fn fir_lowpass(data: ArrayView2<f64>, spec: &FilterSpec) -> Result<Array2<f64>, DaqError> {
    let taps = design_fir(spec)?;
    log::debug!(
        "fir lowpass: {} taps at {} Hz (fs {} Hz)",
        taps.len(),
        spec.cutoff_hz,
        spec.sample_rate_hz
    );
    Ok(apply_fir(&taps, data))
}
/// Butterworth IIR lowpass (order 4 by default) along the sample axis.
pub fn iir_lowpass(data: ArrayView2<f64>, spec: &FilterSpec) -> Result<Array2<f64>, DaqError> {
    let sections = design_butterworth(spec)?;
    log::debug!(
        "iir lowpass: order {} as {} sections at {} Hz (fs {} Hz)",
        spec.order,
        sections.len(),
        spec.cutoff_hz,
        spec.sample_rate_hz
    );
    Ok(apply_sections(&sections, data))
}
pub fn stats(data: ArrayView2<f64>) -> Result<StatsResult, DaqError> {
    crate::drivers::stats::calc_stats(data)
}
pub fn run_external_transform(plugin_path: impl AsRef<Path>, data: &Array2<f64>) -> Result<Array2<f64>, DaqError> {
    let path = plugin_path.as_ref();
    crate::drivers::transform::run_external_transform(path, data).map_err(|err| {
        log::warn!("external transform {} failed: {err}", path.display());
        err
    })
}

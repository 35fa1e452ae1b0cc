use std::f64::consts::PI;
use ndarray::{Array2, ArrayView2, Axis};
use crate::drivers::DaqError;
pub const DEFAULT_FIR_ORDER: usize = 64;
pub const DEFAULT_IIR_ORDER: usize = 4;
/// Lowpass design parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FilterSpec {
    pub cutoff_hz: f64,
    pub sample_rate_hz: f64,
    pub order: usize,
}
impl FilterSpec {
    pub fn fir(cutoff_hz: f64, sample_rate_hz: f64) -> Self {
        Self {
            cutoff_hz,
            sample_rate_hz,
            order: DEFAULT_FIR_ORDER,
        }
    }
    pub fn iir(cutoff_hz: f64, sample_rate_hz: f64) -> Self {
        Self {
            cutoff_hz,
            sample_rate_hz,
            order: DEFAULT_IIR_ORDER,
        }
    }
    pub fn with_order(mut self, order: usize) -> Self {
        self.order = order;
        self
    }
    pub fn nyquist_hz(&self) -> f64 {
        self.sample_rate_hz * 0.5
    }
    pub fn validate(&self) -> Result<(), DaqError> {
        if !(self.sample_rate_hz > 0.0) || !self.sample_rate_hz.is_finite() {
            return Err(DaqError::Filter(format!(
                "sample rate must be positive, got {}",
                self.sample_rate_hz
            )));
        }
        if !(self.cutoff_hz > 0.0) || self.cutoff_hz >= self.nyquist_hz() {
            return Err(DaqError::Filter(format!(
                "cutoff {} Hz must lie in (0, {}) Hz",
                self.cutoff_hz,
                self.nyquist_hz()
            )));
        }
        if self.order == 0 {
            return Err(DaqError::Filter("filter order must be positive".into()));
        }
        Ok(())
    }
}
/// Hamming-windowed sinc taps with unity gain at DC. `spec.order` is the tap count.
pub fn design_fir(spec: &FilterSpec) -> Result<Vec<f64>, DaqError> {
    spec.validate()?;
    let taps = spec.order;
    let cutoff = spec.cutoff_hz / spec.nyquist_hz();
    let center = (taps - 1) as f64 / 2.0;
    let mut h: Vec<f64> = (0..taps)
        .map(|n| {
            let m = n as f64 - center;
            let window = if taps == 1 {
                1.0
            } else {
                0.54 - 0.46 * (2.0 * PI * n as f64 / (taps - 1) as f64).cos()
            };
            cutoff * sinc(cutoff * m) * window
        })
        .collect();
    let gain: f64 = h.iter().sum();
    if !gain.is_finite() || gain.abs() < f64::EPSILON {
        return Err(DaqError::Filter("fir design produced no usable taps".into()));
    }
    h.iter_mut().for_each(|tap| *tap /= gain);
    ensure_finite(&h)?;
    Ok(h)
}
fn sinc(x: f64) -> f64 {
    if x == 0.0 {
        1.0
    } else {
        (PI * x).sin() / (PI * x)
    }
}
/// Normalized biquad, `a0 == 1`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BiquadCoeffs {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}
#[derive(Clone, Copy, Debug, Default)]
struct BiquadState {
    z1: f64,
    z2: f64,
}
#[derive(Clone, Copy, Debug)]
struct BiquadFilter {
    coeffs: BiquadCoeffs,
    state: BiquadState,
}
impl BiquadFilter {
    fn new(coeffs: BiquadCoeffs) -> Self {
        Self {
            coeffs,
            state: BiquadState::default(),
        }
    }
    fn process(&mut self, input: f64) -> f64 {
        // Transposed direct form II
        let y = self.coeffs.b0 * input + self.state.z1;
        self.state.z1 = self.coeffs.b1 * input - self.coeffs.a1 * y + self.state.z2;
        self.state.z2 = self.coeffs.b2 * input - self.coeffs.a2 * y;
        y
    }
}
/// Digital Butterworth lowpass as cascaded second-order sections.
///
/// Every section shares the prewarped cutoff, so the cascade equals the
/// bilinear transform of the analog prototype of the requested order. Odd
/// orders end with a first-order section (`b2 == a2 == 0`).
pub fn design_butterworth(spec: &FilterSpec) -> Result<Vec<BiquadCoeffs>, DaqError> {
    spec.validate()?;
    let n = spec.order;
    let w0 = 2.0 * PI * spec.cutoff_hz / spec.sample_rate_hz;
    let mut sections = Vec::with_capacity(n.div_ceil(2));
    for k in 0..n / 2 {
        let q = 1.0 / (2.0 * (PI * (2 * k + 1) as f64 / (2 * n) as f64).sin());
        sections.push(lowpass(w0, q));
    }
    if n % 2 == 1 {
        let k = (w0 / 2.0).tan();
        let b0 = k / (1.0 + k);
        sections.push(BiquadCoeffs {
            b0,
            b1: b0,
            b2: 0.0,
            a1: (k - 1.0) / (k + 1.0),
            a2: 0.0,
        });
    }
    for section in &sections {
        ensure_finite(&[section.b0, section.b1, section.b2, section.a1, section.a2])?;
    }
    Ok(sections)
}
fn lowpass(w0: f64, q: f64) -> BiquadCoeffs {
    let alpha = w0.sin() / (2.0 * q);
    let cos_w0 = w0.cos();
    let b0 = (1.0 - cos_w0) * 0.5;
    let b1 = 1.0 - cos_w0;
    let b2 = b0;
    let a0 = 1.0 + alpha;
    let a1 = -2.0 * cos_w0;
    let a2 = 1.0 - alpha;
    normalize(b0, b1, b2, a0, a1, a2)
}
fn normalize(b0: f64, b1: f64, b2: f64, a0: f64, a1: f64, a2: f64) -> BiquadCoeffs {
    let a0_inv = 1.0 / a0;
    BiquadCoeffs {
        b0: b0 * a0_inv,
        b1: b1 * a0_inv,
        b2: b2 * a0_inv,
        a1: a1 * a0_inv,
        a2: a2 * a0_inv,
    }
}
fn ensure_finite(values: &[f64]) -> Result<(), DaqError> {
    if values.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(DaqError::Filter("design produced non-finite coefficients".into()))
    }
}
/// Causal convolution of each channel with `taps`, zero initial state.
pub fn apply_fir(taps: &[f64], data: ArrayView2<f64>) -> Array2<f64> {
    let mut out = Array2::zeros(data.raw_dim());
    for (input, mut output) in data.axis_iter(Axis(0)).zip(out.axis_iter_mut(Axis(0))) {
        for (n, y) in output.iter_mut().enumerate() {
            *y = taps
                .iter()
                .take(n + 1)
                .enumerate()
                .map(|(k, tap)| tap * input[n - k])
                .sum();
        }
    }
    out
}
/// Runs each channel through a fresh copy of the section cascade.
pub fn apply_sections(sections: &[BiquadCoeffs], data: ArrayView2<f64>) -> Array2<f64> {
    let mut out = data.to_owned();
    for mut channel in out.axis_iter_mut(Axis(0)) {
        let mut cascade: Vec<BiquadFilter> = sections.iter().copied().map(BiquadFilter::new).collect();
        for value in channel.iter_mut() {
            *value = cascade
                .iter_mut()
                .fold(*value, |acc, section| section.process(acc));
        }
    }
    out
}
#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array1};
    use std::f64::consts::TAU;
    fn tone(freq_hz: f64, rate: f64, len: usize) -> Array2<f64> {
        Array1::from_iter((0..len).map(|i| (TAU * freq_hz * i as f64 / rate).sin()))
            .into_shape((1, len))
            .unwrap()
    }
    fn rms_tail(data: &Array2<f64>, skip: usize) -> f64 {
        let tail: Vec<f64> = data.row(0).iter().skip(skip).copied().collect();
        (tail.iter().map(|v| v * v).sum::<f64>() / tail.len() as f64).sqrt()
    }
    #[test]
    fn fir_taps_are_symmetric_with_unity_dc_gain() {
        let taps = design_fir(&FilterSpec::fir(10.0, 100.0)).unwrap();
        assert_eq!(taps.len(), 64);
        assert!((taps.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        for i in 0..taps.len() / 2 {
            assert!((taps[i] - taps[taps.len() - 1 - i]).abs() < 1e-12);
        }
    }
    #[test]
    fn butterworth_has_unity_dc_gain_per_section() {
        for order in 1..=7 {
            let sections = design_butterworth(&FilterSpec::iir(10.0, 100.0).with_order(order)).unwrap();
            assert_eq!(sections.len(), (order + 1) / 2);
            for s in sections {
                let gain = (s.b0 + s.b1 + s.b2) / (1.0 + s.a1 + s.a2);
                assert!((gain - 1.0).abs() < 1e-9, "order {order}: gain {gain}");
            }
        }
    }
    #[test]
    fn second_order_matches_reference_design() {
        // scipy.signal.butter(2, 0.25) with Wn relative to Nyquist.
        let sections = design_butterworth(&FilterSpec::iir(12.5, 100.0).with_order(2)).unwrap();
        let s = sections[0];
        assert!((s.b0 - 0.097_631_072_937_817_5).abs() < 1e-9);
        assert!((s.b1 - 0.195_262_145_875_635).abs() < 1e-9);
        assert!((s.a1 + 0.942_809_041_582_063_4).abs() < 1e-9);
        assert!((s.a2 - 0.333_333_333_333_333_4).abs() < 1e-9);
    }
    #[test]
    fn fir_passes_dc_after_warmup() {
        let taps = design_fir(&FilterSpec::fir(5.0, 100.0)).unwrap();
        let data = Array2::from_elem((1, 200), 3.0);
        let out = apply_fir(&taps, data.view());
        assert!(out[[0, 0]].abs() < 3.0);
        assert!((out[[0, 199]] - 3.0).abs() < 1e-9);
    }
    #[test]
    fn zero_initial_state_makes_first_output_scaled_input() {
        let taps = vec![0.5, 0.25, 0.25];
        let out = apply_fir(&taps, array![[4.0, 0.0, 0.0, 0.0]].view());
        assert_eq!(out, array![[2.0, 1.0, 1.0, 0.0]]);
        let sections = design_butterworth(&FilterSpec::iir(10.0, 100.0)).unwrap();
        let impulse = apply_sections(&sections, array![[1.0, 0.0, 0.0]].view());
        let b0: f64 = sections.iter().map(|s| s.b0).product();
        assert!((impulse[[0, 0]] - b0).abs() < 1e-12);
    }
    #[test]
    fn both_designs_attenuate_above_cutoff() {
        let rate = 1000.0;
        let high = tone(300.0, rate, 2000);
        let low = tone(10.0, rate, 2000);
        let taps = design_fir(&FilterSpec::fir(50.0, rate)).unwrap();
        let sections = design_butterworth(&FilterSpec::iir(50.0, rate)).unwrap();
        assert!(rms_tail(&apply_fir(&taps, high.view()), 200) < 0.05);
        assert!(rms_tail(&apply_sections(&sections, high.view()), 200) < 0.05);
        assert!(rms_tail(&apply_fir(&taps, low.view()), 200) > 0.6);
        assert!(rms_tail(&apply_sections(&sections, low.view()), 200) > 0.6);
    }
    #[test]
    fn invalid_specs_are_filter_errors() {
        for cutoff in [-1.0, 0.0, 50.0, 75.0, f64::NAN] {
            assert!(matches!(design_fir(&FilterSpec::fir(cutoff, 100.0)), Err(DaqError::Filter(_))));
            assert!(matches!(design_butterworth(&FilterSpec::iir(cutoff, 100.0)), Err(DaqError::Filter(_))));
        }
        assert!(design_fir(&FilterSpec::fir(10.0, 100.0).with_order(0)).is_err());
        assert!(design_butterworth(&FilterSpec::iir(10.0, 0.0)).is_err());
    }
}

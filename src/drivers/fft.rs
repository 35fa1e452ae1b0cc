use ndarray::{Array2, ArrayView2, Axis};
use rustfft::{num_complex::Complex64, FftDirection, FftPlanner};
use crate::drivers::DaqError;
/// Complex DFT of every channel along the sample axis. Output shape equals input shape.
pub fn fft(data: ArrayView2<f64>) -> Result<Array2<Complex64>, DaqError> {
    transform(data.mapv(|v| Complex64::new(v, 0.0)), FftDirection::Forward)
}
/// Inverse of [`fft`], scaled by `1/n` so that `ifft(fft(x)) == x`.
pub fn ifft(spectrum: ArrayView2<Complex64>) -> Result<Array2<Complex64>, DaqError> {
    let n = spectrum.ncols() as f64;
    let mut out = transform(spectrum.to_owned(), FftDirection::Inverse)?;
    out.mapv_inplace(|c| c / n);
    Ok(out)
}
fn transform(mut data: Array2<Complex64>, direction: FftDirection) -> Result<Array2<Complex64>, DaqError> {
    let len = data.ncols();
    if data.nrows() == 0 || len == 0 {
        return Err(DaqError::InvalidInput(format!(
            "fft needs a non-empty matrix, got {}x{len}",
            data.nrows()
        )));
    }
    let fft = FftPlanner::<f64>::new().plan_fft(len, direction);
    let mut scratch = vec![Complex64::default(); fft.get_inplace_scratch_len()];
    for mut row in data.axis_iter_mut(Axis(0)) {
        match row.as_slice_mut() {
            Some(slice) => fft.process_with_scratch(slice, &mut scratch),
            None => {
                let mut buffer = row.to_vec();
                fft.process_with_scratch(&mut buffer, &mut scratch);
                row.iter_mut().zip(buffer).for_each(|(dst, src)| *dst = src);
            }
        }
    }
    Ok(data)
}
/// Magnitude spectrum for each channel.
#[derive(Clone, Debug)]
pub struct FrequencySpectrum {
    pub sample_rate_hz: f64,
    pub frequencies_hz: Vec<f64>,
    pub magnitudes: Vec<Vec<f64>>, // channel -> bins
}
/// Helper that computes one-sided magnitude spectra for a fixed window size.
pub struct SpectrumBuilder {
    fft_size: usize,
}
impl SpectrumBuilder {
    pub fn with_size(fft_size: usize) -> Self {
        Self { fft_size }
    }
    /// Uses the newest `fft_size` samples of each channel, zero-padding short input.
    pub fn compute(&self, samples: ArrayView2<f64>, sample_rate_hz: f64) -> Result<FrequencySpectrum, DaqError> {
        if self.fft_size == 0 {
            return Err(DaqError::InvalidInput("fft size must be positive".into()));
        }
        let start = samples.ncols().saturating_sub(self.fft_size);
        let mut window = Array2::<f64>::zeros((samples.nrows(), self.fft_size));
        window
            .slice_mut(ndarray::s![.., ..samples.ncols() - start])
            .assign(&samples.slice(ndarray::s![.., start..]));
        let spectrum = fft(window.view())?;
        let bins = self.fft_size / 2;
        let frequencies_hz = (0..bins)
            .map(|k| k as f64 * sample_rate_hz / self.fft_size as f64)
            .collect();
        let magnitudes = spectrum
            .axis_iter(Axis(0))
            .map(|row| {
                row.iter()
                    .take(bins)
                    .map(|c| c.norm() / self.fft_size as f64)
                    .collect()
            })
            .collect();
        Ok(FrequencySpectrum {
            sample_rate_hz,
            frequencies_hz,
            magnitudes,
        })
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array1};
    use std::f64::consts::TAU;
    #[test]
    fn output_shape_matches_input() {
        let t = Array1::linspace(0.0, 0.99, 100);
        let data = ndarray::stack![Axis(0), t.mapv(|v| (TAU * 5.0 * v).sin()), t.mapv(|v| (TAU * 5.0 * v).cos())];
        let spectrum = fft(data.view()).unwrap();
        assert_eq!(spectrum.dim(), data.dim());
    }
    #[test]
    fn inverse_recovers_real_input() {
        let data = array![[1.0, -2.5, 3.25, 0.0, 7.0], [0.5, 0.25, -0.125, 9.0, 1.0]];
        let restored = ifft(fft(data.view()).unwrap().view()).unwrap();
        for (orig, back) in data.iter().zip(restored.iter()) {
            assert!((orig - back.re).abs() < 1e-9);
            assert!(back.im.abs() < 1e-9);
        }
    }
    #[test]
    fn dc_input_concentrates_in_first_bin() {
        let data = array![[2.0, 2.0, 2.0, 2.0]];
        let spectrum = fft(data.view()).unwrap();
        assert!((spectrum[[0, 0]].re - 8.0).abs() < 1e-12);
        assert!(spectrum.iter().skip(1).all(|c| c.norm() < 1e-12));
    }
    #[test]
    fn empty_input_is_rejected() {
        let empty = Array2::<f64>::zeros((2, 0));
        assert!(matches!(fft(empty.view()), Err(DaqError::InvalidInput(_))));
    }
    #[test]
    fn spectrum_peaks_at_signal_frequency() {
        let rate = 256.0;
        let tone = Array1::from_iter((0..256).map(|i| (TAU * 32.0 * i as f64 / rate).sin()));
        let data = tone.into_shape((1, 256)).unwrap();
        let spectrum = SpectrumBuilder::with_size(256).compute(data.view(), rate).unwrap();
        assert_eq!(spectrum.frequencies_hz.len(), 128);
        let peak = spectrum.magnitudes[0]
            .iter()
            .enumerate()
            .fold((0, 0.0), |best, (i, &m)| if m > best.1 { (i, m) } else { best });
        assert_eq!(spectrum.frequencies_hz[peak.0], 32.0);
    }
    #[test]
    fn short_windows_are_zero_padded() {
        let data = array![[1.0, 1.0, 1.0], [0.0, 0.0, 0.0]];
        let spectrum = SpectrumBuilder::with_size(8).compute(data.view(), 100.0).unwrap();
        assert_eq!(spectrum.magnitudes.len(), 2);
        assert_eq!(spectrum.magnitudes[0].len(), 4);
        assert!((spectrum.magnitudes[0][0] - 3.0 / 8.0).abs() < 1e-12);
    }
}

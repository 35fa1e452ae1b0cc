use std::io::Cursor;
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use ndarray::{ArrayView2, Axis};
use plotters::prelude::LineSeries;
use plotters::prelude::*;
use crate::drivers::error::DaqError;
use crate::drivers::fft::FrequencySpectrum;
/// Bitmap size and colors. Text is never drawn, so no font backend is needed.
#[derive(Clone, Debug)]
pub struct PlotStyle {
    pub width: u32,
    pub height: u32,
    pub background: RGBColor,
    pub palette: Vec<RGBColor>,
}
impl Default for PlotStyle {
    fn default() -> Self {
        Self {
            width: 900,
            height: 400,
            background: RGBColor(255, 255, 255),
            palette: vec![RED, GREEN, BLUE, MAGENTA, CYAN, YELLOW],
        }
    }
}
impl PlotStyle {
    fn check(&self) -> Result<(), DaqError> {
        if self.palette.is_empty() {
            return Err(DaqError::Plot("plot style has an empty palette".into()));
        }
        if self.width == 0 || self.height == 0 {
            return Err(DaqError::Plot(format!("invalid bitmap size {}x{}", self.width, self.height)));
        }
        Ok(())
    }
}
/// Renders a `channels x samples` snapshot, one line per channel.
pub fn render_waveform_png(samples: ArrayView2<f64>, style: &PlotStyle) -> Result<Vec<u8>, DaqError> {
    if samples.is_empty() {
        return Err(DaqError::Plot("snapshot has no samples".into()));
    }
    style.check()?;
    let mut buffer = vec![0u8; (style.width * style.height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (style.width, style.height))
            .into_drawing_area();
        root.fill(&style.background)?;
        let (y_min, y_max) = samples
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        let y_bounds = if (y_max - y_min).abs() < f64::EPSILON {
            (y_min - 1.0, y_max + 1.0)
        } else {
            (y_min, y_max)
        };
        let mut chart = ChartBuilder::on(&root)
            .margin(10)
            .build_cartesian_2d(0f64..samples.ncols() as f64, y_bounds.0..y_bounds.1)?;
        for (idx, channel) in samples.axis_iter(Axis(0)).enumerate() {
            let color = style.palette[idx % style.palette.len()];
            let series = channel.iter().enumerate().map(|(i, v)| (i as f64, *v));
            chart.draw_series(LineSeries::new(series, &color))?;
        }
        root.present()?;
    }
    encode_png(&buffer, style.width, style.height)
}
pub fn render_spectrum_png(spectrum: &FrequencySpectrum, style: &PlotStyle) -> Result<Vec<u8>, DaqError> {
    if spectrum.magnitudes.is_empty() || spectrum.frequencies_hz.is_empty() {
        return Err(DaqError::Plot("spectrum has no magnitudes".into()));
    }
    style.check()?;
    let mut buffer = vec![0u8; (style.width * style.height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (style.width, style.height))
            .into_drawing_area();
        root.fill(&style.background)?;
        let peak = spectrum
            .magnitudes
            .iter()
            .flat_map(|c| c.iter().copied())
            .fold(0.0f64, |acc, v| acc.max(v))
            .max(1e-3);
        let top = spectrum.frequencies_hz.last().copied().unwrap_or(0.0).max(1e-3);
        let mut chart = ChartBuilder::on(&root)
            .margin(10)
            .build_cartesian_2d(0f64..top, 0f64..peak)?;
        for (idx, mags) in spectrum.magnitudes.iter().enumerate() {
            let color = style.palette[idx % style.palette.len()];
            let series = spectrum
                .frequencies_hz
                .iter()
                .copied()
                .zip(mags.iter().copied());
            chart.draw_series(LineSeries::new(series, &color))?;
        }
        root.present()?;
    }
    encode_png(&buffer, style.width, style.height)
}
fn encode_png(buffer: &[u8], width: u32, height: u32) -> Result<Vec<u8>, DaqError> {
    let image = ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, buffer.to_vec())
        .ok_or_else(|| DaqError::Plot("failed to allocate image buffer".into()))?;
    let mut output = Vec::new();
    let dynamic = DynamicImage::ImageRgb8(image);
    dynamic.write_to(&mut Cursor::new(&mut output), ImageFormat::Png)?;
    Ok(output)
}

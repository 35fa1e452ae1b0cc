// src/capture.rs
//! Capture files: the live recording format and the playback input.
//!
//! * `.csv` - one row per channel, comma separated, 8 decimals.
//! * `.h5` / `.hdf5` - a single dataset named `data` (channels x frames),
//!   available with the `hdf5` feature.
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use ndarray::{Array2, ArrayView2};
use crate::drivers::DaqError;
use crate::player::Dataset;

pub const HDF5_DATASET_NAME: &str = "data";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaptureFormat {
    Csv,
    Hdf5,
}

impl CaptureFormat {
    /// Picks the format from the file extension; there is no fallback.
    pub fn from_path(path: &Path) -> Result<Self, DaqError> {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "csv" => Ok(CaptureFormat::Csv),
            "h5" | "hdf5" => Ok(CaptureFormat::Hdf5),
            _ => Err(DaqError::UnsupportedFormat(format!(
                "{} (expected .csv, .h5 or .hdf5)",
                path.display()
            ))),
        }
    }
}

pub fn save_data(path: impl AsRef<Path>, data: ArrayView2<f64>) -> Result<(), DaqError> {
    let path = path.as_ref();
    match CaptureFormat::from_path(path)? {
        CaptureFormat::Csv => save_csv(path, data),
        CaptureFormat::Hdf5 => save_hdf5(path, data),
    }?;
    log::info!("saved {:?} capture to {}", data.dim(), path.display());
    Ok(())
}

pub fn load_data(path: impl AsRef<Path>) -> Result<Array2<f64>, DaqError> {
    let path = path.as_ref();
    let data = match CaptureFormat::from_path(path)? {
        CaptureFormat::Csv => load_csv(path),
        CaptureFormat::Hdf5 => load_hdf5(path),
    }?;
    log::info!("loaded {:?} capture from {}", data.dim(), path.display());
    Ok(data)
}

/// Loads a capture file straight into a playable dataset.
pub fn load_dataset(path: impl AsRef<Path>) -> Result<Dataset, DaqError> {
    Dataset::new(load_data(path)?)
}

pub fn save_csv(path: &Path, data: ArrayView2<f64>) -> Result<(), DaqError> {
    let mut w = BufWriter::new(File::create(path)?);
    for row in data.rows() {
        let line: Vec<String> = row.iter().map(|v| format!("{v:.8}")).collect();
        writeln!(w, "{}", line.join(","))?;
    }
    w.flush()?;
    Ok(())
}

pub fn load_csv(path: &Path) -> Result<Array2<f64>, DaqError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_path(path)?;
    let mut values = Vec::new();
    let mut rows = 0usize;
    let mut cols: Option<usize> = None;
    for record in reader.records() {
        let record = record?;
        if record.iter().all(|field| field.is_empty()) {
            continue;
        }
        match cols {
            Some(expected) if expected != record.len() => {
                return Err(DaqError::Capture(format!(
                    "row {} has {} values, expected {expected}",
                    rows + 1,
                    record.len()
                )));
            }
            _ => cols = Some(record.len()),
        }
        for field in record.iter() {
            let value = field.parse::<f64>().map_err(|err| {
                DaqError::Capture(format!("row {}: {field:?} is not a number ({err})", rows + 1))
            })?;
            values.push(value);
        }
        rows += 1;
    }
    let cols = cols.ok_or_else(|| DaqError::Capture(format!("{} is empty", path.display())))?;
    Array2::from_shape_vec((rows, cols), values).map_err(|err| DaqError::Capture(err.to_string()))
}

#[cfg(feature = "hdf5")]
pub fn save_hdf5(path: &Path, data: ArrayView2<f64>) -> Result<(), DaqError> {
    let file = hdf5::File::create(path)?;
    let contiguous = data.as_standard_layout();
    file.new_dataset_builder()
        .with_data(contiguous.view())
        .create(HDF5_DATASET_NAME)?;
    Ok(())
}

#[cfg(feature = "hdf5")]
pub fn load_hdf5(path: &Path) -> Result<Array2<f64>, DaqError> {
    if !path.is_file() {
        return Err(DaqError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} does not exist", path.display()),
        )));
    }
    let file = hdf5::File::open(path)?;
    let data = file.dataset(HDF5_DATASET_NAME)?.read_2d::<f64>()?;
    Ok(data)
}

#[cfg(not(feature = "hdf5"))]
pub fn save_hdf5(path: &Path, _data: ArrayView2<f64>) -> Result<(), DaqError> {
    Err(hdf5_disabled(path))
}

#[cfg(not(feature = "hdf5"))]
pub fn load_hdf5(path: &Path) -> Result<Array2<f64>, DaqError> {
    Err(hdf5_disabled(path))
}

#[cfg(not(feature = "hdf5"))]
fn hdf5_disabled(path: &Path) -> DaqError {
    DaqError::UnsupportedFormat(format!(
        "{}: built without the `hdf5` feature",
        path.display()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn sample() -> Array2<f64> {
        Array2::from_shape_fn((2, 10), |(c, f)| (c * 10 + f) as f64 + 0.125)
    }

    #[test]
    fn csv_round_trip_keeps_channel_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capture.csv");
        save_data(&path, sample().view()).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("0.12500000,1.12500000,"));
        assert_eq!(text.lines().count(), 2);
        assert_eq!(load_data(&path).unwrap(), sample());
        let dataset = load_dataset(&path).unwrap();
        assert_eq!(dataset.channel_count(), 2);
        assert_eq!(dataset.frame_count(), 10);
    }

    #[test]
    fn extension_match_is_case_insensitive() {
        assert_eq!(CaptureFormat::from_path(Path::new("a.CSV")).unwrap(), CaptureFormat::Csv);
        assert_eq!(CaptureFormat::from_path(Path::new("a.Hdf5")).unwrap(), CaptureFormat::Hdf5);
        assert_eq!(CaptureFormat::from_path(Path::new("a.h5")).unwrap(), CaptureFormat::Hdf5);
    }

    #[test]
    fn unknown_extensions_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capture.txt");
        assert!(matches!(save_data(&path, sample().view()), Err(DaqError::UnsupportedFormat(_))));
        assert!(!path.exists());
        std::fs::write(&path, "dummy").unwrap();
        assert!(matches!(load_data(&path), Err(DaqError::UnsupportedFormat(_))));
        assert!(matches!(load_data(dir.path().join("noext")), Err(DaqError::UnsupportedFormat(_))));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(load_data(dir.path().join("absent.csv")), Err(DaqError::Io(_))));
    }

    #[test]
    fn malformed_csv_is_a_capture_error() {
        let dir = tempfile::tempdir().unwrap();
        let ragged = dir.path().join("ragged.csv");
        std::fs::write(&ragged, "1,2,3\n4,5\n").unwrap();
        assert!(matches!(load_data(&ragged), Err(DaqError::Capture(_))));
        let words = dir.path().join("words.csv");
        std::fs::write(&words, "1,two\n").unwrap();
        assert!(matches!(load_data(&words), Err(DaqError::Capture(_))));
        let empty = dir.path().join("empty.csv");
        std::fs::write(&empty, "").unwrap();
        assert!(matches!(load_data(&empty), Err(DaqError::Capture(_))));
    }

    #[test]
    fn single_channel_csv_loads_as_one_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("one.csv");
        std::fs::write(&path, " 1.5, -2 ,3\n\n").unwrap();
        assert_eq!(load_data(&path).unwrap(), array![[1.5, -2.0, 3.0]]);
    }

    #[cfg(feature = "hdf5")]
    #[test]
    fn hdf5_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capture.h5");
        save_data(&path, sample().view()).unwrap();
        assert_eq!(load_data(&path).unwrap(), sample());
        assert!(matches!(load_data(dir.path().join("absent.h5")), Err(DaqError::Io(_))));
    }

    #[cfg(not(feature = "hdf5"))]
    #[test]
    fn hdf5_without_feature_is_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capture.h5");
        assert!(matches!(save_data(&path, sample().view()), Err(DaqError::UnsupportedFormat(_))));
    }
}

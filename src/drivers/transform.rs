//! External transform units.
//!
//! A unit is a dynamic library exporting one C-ABI entry point:
//!
//! ```c
//! int32_t process(const double *input, size_t channels, size_t samples, double *output);
//! ```
//!
//! `input` and `output` are row-major `channels x samples` matrices. A zero
//! status means success. The host only locates, invokes, and wraps errors;
//! the unit runs in-process with no sandbox.
use std::path::{Path, PathBuf};
use libloading::Library;
use ndarray::{Array2, ArrayView2};
use crate::drivers::{DaqError, PluginError};
pub const ENTRY_POINT: &[u8] = b"process\0";
type ProcessFn = unsafe extern "C" fn(*const f64, usize, usize, *mut f64) -> i32;
/// Something that maps a matrix to a matrix of the same shape.
pub trait Transform {
    fn name(&self) -> &str;
    fn process(&self, input: ArrayView2<f64>) -> anyhow::Result<Array2<f64>>;
}
/// Runs `transform` and wraps any failure as a processing error.
pub fn apply_transform(transform: &dyn Transform, data: &Array2<f64>) -> Result<Array2<f64>, DaqError> {
    let output = transform.process(data.view()).map_err(|err| {
        PluginError::Processing(format!("{}: {err:#}", transform.name()))
    })?;
    if output.dim() != data.dim() {
        return Err(PluginError::Processing(format!(
            "{} returned shape {:?}, expected {:?}",
            transform.name(),
            output.dim(),
            data.dim()
        ))
        .into());
    }
    Ok(output)
}
/// A transform unit loaded from a dynamic library.
pub struct DynamicTransform {
    path: PathBuf,
    name: String,
    process: ProcessFn,
    // Keeps `process` valid; must outlive it.
    _lib: Library,
}
impl DynamicTransform {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PluginError> {
        let path = path.as_ref().to_path_buf();
        if !path.is_file() {
            return Err(PluginError::NotFound(path));
        }
        // Safety: loading runs the library's initializers; units are trusted by whoever picked the path.
        let lib = unsafe { Library::new(&path) }.map_err(|err| PluginError::Contract {
            path: path.clone(),
            reason: format!("not a loadable library: {err}"),
        })?;
        // Safety: the contract fixes the signature of `process`.
        let process = unsafe { lib.get::<ProcessFn>(ENTRY_POINT) }
            .map(|symbol| *symbol)
            .map_err(|_| PluginError::Contract {
                path: path.clone(),
                reason: "no `process` entry point exported".into(),
            })?;
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        log::info!("loaded transform unit {}", path.display());
        Ok(Self {
            path,
            name,
            process,
            _lib: lib,
        })
    }
    pub fn path(&self) -> &Path {
        &self.path
    }
}
impl Transform for DynamicTransform {
    fn name(&self) -> &str {
        &self.name
    }
    fn process(&self, input: ArrayView2<f64>) -> anyhow::Result<Array2<f64>> {
        let (channels, samples) = input.dim();
        let contiguous = input.as_standard_layout();
        let mut output = Array2::<f64>::zeros((channels, samples));
        // Safety: both buffers hold exactly channels * samples values in row-major order.
        let status = unsafe {
            (self.process)(
                contiguous.as_ptr(),
                channels,
                samples,
                output.as_mut_ptr(),
            )
        };
        if status != 0 {
            anyhow::bail!("process returned status {status}");
        }
        Ok(output)
    }
}
/// Loads the unit at `plugin_path` and applies it to `data`.
pub fn run_external_transform(plugin_path: impl AsRef<Path>, data: &Array2<f64>) -> Result<Array2<f64>, DaqError> {
    let unit = DynamicTransform::load(plugin_path)?;
    apply_transform(&unit, data)
}
#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    struct Scale(f64);
    impl Transform for Scale {
        fn name(&self) -> &str {
            "scale"
        }
        fn process(&self, input: ArrayView2<f64>) -> anyhow::Result<Array2<f64>> {
            Ok(input.mapv(|v| v * self.0))
        }
    }
    struct Broken;
    impl Transform for Broken {
        fn name(&self) -> &str {
            "broken"
        }
        fn process(&self, _input: ArrayView2<f64>) -> anyhow::Result<Array2<f64>> {
            Err(anyhow::anyhow!("division by zero"))
        }
    }
    struct Truncate;
    impl Transform for Truncate {
        fn name(&self) -> &str {
            "truncate"
        }
        fn process(&self, input: ArrayView2<f64>) -> anyhow::Result<Array2<f64>> {
            Ok(input.slice(ndarray::s![.., ..1]).to_owned())
        }
    }
    /// A system library that certainly has no `process` symbol.
    fn library_without_entry_point() -> Option<PathBuf> {
        [
            "/lib/x86_64-linux-gnu/libm.so.6",
            "/usr/lib/x86_64-linux-gnu/libm.so.6",
            "/lib/aarch64-linux-gnu/libm.so.6",
            "/usr/lib/aarch64-linux-gnu/libm.so.6",
            "/lib64/libm.so.6",
            "/usr/lib64/libm.so.6",
            "/usr/lib/libm.so.6",
            "/lib/libm.so.6",
            "/usr/lib/libm.so",
            "/lib/ld-musl-x86_64.so.1",
            "/lib/ld-musl-aarch64.so.1",
            "/usr/lib/libSystem.B.dylib",
        ]
        .iter()
        .map(PathBuf::from)
        .find(|path| path.is_file())
    }
    #[test]
    fn in_process_transform_output_is_returned() {
        let data = array![[1.0, 2.0], [3.0, 4.0]];
        let out = apply_transform(&Scale(2.0), &data).unwrap();
        assert_eq!(out, array![[2.0, 4.0], [6.0, 8.0]]);
    }
    #[test]
    fn transform_failures_are_processing_errors() {
        let data = array![[1.0, 2.0]];
        let err = apply_transform(&Broken, &data).unwrap_err();
        match err {
            DaqError::Plugin(PluginError::Processing(msg)) => assert!(msg.contains("division by zero")),
            other => panic!("unexpected error {other:?}"),
        }
        let err = apply_transform(&Truncate, &data).unwrap_err();
        assert!(matches!(err, DaqError::Plugin(PluginError::Processing(_))));
    }
    #[test]
    fn missing_unit_is_not_found() {
        let data = array![[1.0]];
        let err = run_external_transform("no/such/unit.so", &data).unwrap_err();
        assert!(matches!(err, DaqError::Plugin(PluginError::NotFound(_))));
    }
    #[test]
    fn non_library_file_is_a_contract_error() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), b"def process(data): return data").unwrap();
        let data = array![[1.0, 2.0]];
        let err = run_external_transform(file.path(), &data).unwrap_err();
        assert!(matches!(err, DaqError::Plugin(PluginError::Contract { .. })));
    }
    #[test]
    fn unit_lacking_process_is_a_contract_error_and_input_is_untouched() {
        let path = library_without_entry_point()
            .unwrap_or_else(|| panic!("no system libm found to load as a unit without `process`"));
        let data = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
        let before = data.clone();
        let err = run_external_transform(&path, &data).unwrap_err();
        assert!(matches!(err, DaqError::Plugin(PluginError::Contract { .. })));
        assert_eq!(data, before);
    }
}

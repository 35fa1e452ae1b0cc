use std::path::PathBuf;
use std::process::Command;
use daqscope::drivers::{DynamicTransform, Transform};
use daqscope::pipeline;
use ndarray::array;

/// Builds `plugins/gain` into this test's scratch target dir and returns the library path.
fn build_gain_unit() -> PathBuf {
    let target_dir = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join("units");
    let status = Command::new(env!("CARGO"))
        .args(["build", "-p", "daqscope-gain", "--target-dir"])
        .arg(&target_dir)
        .current_dir(env!("CARGO_MANIFEST_DIR"))
        .status()
        .expect("failed to run cargo");
    assert!(status.success(), "building daqscope-gain failed");
    let path = target_dir
        .join("debug")
        .join(libloading::library_filename("daqscope_gain"));
    assert!(path.is_file(), "{} was not produced", path.display());
    path
}

#[test]
fn gain_unit_doubles_every_sample() {
    let path = build_gain_unit();
    let data = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
    let before = data.clone();
    let out = pipeline::run_external_transform(&path, &data).unwrap();
    assert_eq!(out, array![[2.0, 4.0, 6.0], [8.0, 10.0, 12.0]]);
    assert_eq!(data, before);

    // column-major input still reaches the unit in row-major order
    let unit = DynamicTransform::load(&path).unwrap();
    assert!(unit.name().contains("daqscope_gain"));
    let transposed = data.t().to_owned();
    let out = unit.process(transposed.view()).unwrap();
    assert_eq!(out, transposed.mapv(|v| v * 2.0));
}

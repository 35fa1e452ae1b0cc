//! Example transform unit for `daqscope transform`: doubles every sample.
//!
//! Build: cargo build -p daqscope-gain --release

const GAIN: f64 = 2.0;

/// # Safety
/// `input` and `output` must each point to `channels * samples` doubles.
#[no_mangle]
pub unsafe extern "C" fn process(
    input: *const f64,
    channels: usize,
    samples: usize,
    output: *mut f64,
) -> i32 {
    if input.is_null() || output.is_null() {
        return -1;
    }
    let Some(len) = channels.checked_mul(samples) else {
        return -2;
    };
    let input = std::slice::from_raw_parts(input, len);
    let output = std::slice::from_raw_parts_mut(output, len);
    for (dst, src) in output.iter_mut().zip(input) {
        *dst = src * GAIN;
    }
    0
}

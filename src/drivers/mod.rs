// src/drivers/mod.rs
// 声明同级目录下的子模块文件
pub mod buffer;
pub mod consumer;
pub mod error;
pub mod fft;
pub mod filter;
pub mod pipeline;
pub mod plot;
pub mod source;
pub mod stats;
pub mod transform;
// 公开导出这些模块里的结构体，方便外部调用
pub use buffer::{RingBuffer, SharedRingBuffer};
pub use consumer::{LiveView, SessionStatus};
pub use error::{DaqError, PluginError};
pub use fft::{FrequencySpectrum, SpectrumBuilder};
pub use filter::{FilterSpec, DEFAULT_FIR_ORDER, DEFAULT_IIR_ORDER};
pub use plot::{render_spectrum_png, render_waveform_png, PlotStyle};
pub use source::{
    channel_count_from_id, ClockMode, SampleBlock, SampleSource, ScriptedSource, SimulatedSource,
    SourceHandle,
};
pub use stats::{calc_stats, StatsResult};
pub use transform::{apply_transform, DynamicTransform, Transform};

// src/main.rs
use std::path::{Path, PathBuf};
use std::sync::mpsc::channel;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use daqscope::capture;
use daqscope::drivers::{
    channel_count_from_id, render_spectrum_png, render_waveform_png, FilterSpec, LiveView,
    PlotStyle, RingBuffer, SessionStatus, SimulatedSource, StatsResult,
};
use daqscope::pipeline;
use daqscope::{AcquisitionWorker, PlaybackEngine, PlaybackEvent, PlaybackSpeed, SessionConfig};

#[derive(Parser)]
#[command(name = "daqscope", version, about = "Acquire, replay and transform sampled signals")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Increase verbosity (-v, -vv); RUST_LOG still wins when set
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Acquire from the simulated device into the live buffer
    Acquire(AcquireArgs),
    /// Replay a capture file frame by frame
    Play(PlayArgs),
    /// Lowpass filter a capture file
    Filter(FilterArgs),
    /// Run a capture file through an external transform library
    Transform(TransformArgs),
}

#[derive(Args)]
struct AcquireArgs {
    /// Session config (JSON); defaults are used when omitted
    #[arg(long)]
    config: Option<PathBuf>,
    /// Stop after this many blocks
    #[arg(long, default_value_t = 10)]
    blocks: u64,
    /// Frequency of the simulated sine
    #[arg(long, default_value_t = 10.0)]
    signal_hz: f64,
    /// Record the whole session to a capture file (.csv / .h5)
    #[arg(long)]
    save: Option<PathBuf>,
    /// Render the last second of the buffer
    #[arg(long)]
    png: Option<PathBuf>,
    /// Render the magnitude spectrum of the newest samples
    #[arg(long)]
    spectrum_png: Option<PathBuf>,
}

#[derive(Args)]
struct PlayArgs {
    file: PathBuf,
    /// 1x, 2x or 4x
    #[arg(long, default_value = "1x")]
    speed: String,
    /// Start frame
    #[arg(long, default_value_t = 0)]
    seek: i64,
}

#[derive(Args)]
struct FilterArgs {
    input: PathBuf,
    output: PathBuf,
    #[arg(long)]
    cutoff_hz: f64,
    #[arg(long)]
    sample_rate_hz: f64,
    /// Butterworth IIR instead of the windowed FIR
    #[arg(long)]
    iir: bool,
    #[arg(long)]
    order: Option<usize>,
}

#[derive(Args)]
struct TransformArgs {
    plugin: PathBuf,
    input: PathBuf,
    /// Where to write the transformed capture
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match cli.command {
        Command::Acquire(args) => acquire(args),
        Command::Play(args) => play(args),
        Command::Filter(args) => filter(args),
        Command::Transform(args) => transform(args),
    }
}

fn acquire(args: AcquireArgs) -> Result<()> {
    let session = match &args.config {
        Some(path) => SessionConfig::from_json_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => SessionConfig::default(),
    };
    let config = session.acquisition.clone();
    let channels = channel_count_from_id(&config.channel_id);
    let buffer = RingBuffer::new(channels, session.buffer_capacity)?;
    let source = SimulatedSource {
        signal_hz: args.signal_hz,
        ..Default::default()
    };

    let (worker, rx) = AcquisitionWorker::spawn(source, config.clone())?;
    let mut view = LiveView::new(rx, buffer, config.sample_rate_hz as f64);
    if args.save.is_some() {
        view.recorder_mut().start();
    }
    while view.blocks_received() < args.blocks {
        if *view.pump_timeout(Duration::from_secs(1)) != SessionStatus::Running {
            break;
        }
    }
    worker.stop();
    worker.join();
    let status = view.pump().clone();
    if let SessionStatus::Failed(message) = status {
        bail!("acquisition failed: {message}");
    }
    log::info!(
        "received {} blocks, buffer holds {} / {} samples per channel",
        view.blocks_received(),
        view.buffer().len(),
        view.buffer().capacity()
    );
    print_stats(&view.latest_stats(view.buffer().len())?);

    let style = PlotStyle::default();
    if let Some(path) = &args.png {
        let png = render_waveform_png(view.latest_frame(1.0).view(), &style)?;
        write_file(path, &png)?;
    }
    if let Some(path) = &args.spectrum_png {
        let spectrum = view.latest_spectrum(view.buffer().len().next_power_of_two().min(8192))?;
        write_file(path, &render_spectrum_png(&spectrum, &style)?)?;
    }
    if let Some(path) = &args.save {
        let dataset = view.recorder_mut().stop_and_save(path)?;
        log::info!("recorded {} frames to {}", dataset.frame_count(), path.display());
    }
    Ok(())
}

fn play(args: PlayArgs) -> Result<()> {
    let dataset = Arc::new(
        capture::load_dataset(&args.file)
            .with_context(|| format!("loading {}", args.file.display()))?,
    );
    let (tx, rx) = channel();
    let printer = thread::spawn(move || {
        for event in rx {
            match event {
                PlaybackEvent::FrameChanged { index, frame } => {
                    let values: Vec<String> = frame.iter().map(|v| format!("{v:.4}")).collect();
                    println!("{index}\t{}", values.join("\t"));
                }
                PlaybackEvent::Finished => log::info!("playback finished"),
            }
        }
    });

    let mut engine = PlaybackEngine::new(tx);
    engine.load_dataset(dataset);
    engine.set_speed(PlaybackSpeed::from_label(&args.speed));
    engine.seek(args.seek);
    log::info!("playing {} at {}", engine.position_label(), engine.speed());
    engine.play();
    engine.run_blocking();
    drop(engine);
    if printer.join().is_err() {
        bail!("frame printer panicked");
    }
    Ok(())
}

fn filter(args: FilterArgs) -> Result<()> {
    let data = capture::load_data(&args.input)
        .with_context(|| format!("loading {}", args.input.display()))?;
    let mut spec = if args.iir {
        FilterSpec::iir(args.cutoff_hz, args.sample_rate_hz)
    } else {
        FilterSpec::fir(args.cutoff_hz, args.sample_rate_hz)
    };
    if let Some(order) = args.order {
        spec = spec.with_order(order);
    }
    let filtered = if args.iir {
        pipeline::iir_lowpass(data.view(), &spec)?
    } else {
        pipeline::fir_lowpass(data.view(), &spec)?
    };
    capture::save_data(&args.output, filtered.view())?;
    print_stats(&pipeline::stats(filtered.view())?);
    Ok(())
}

fn transform(args: TransformArgs) -> Result<()> {
    let data = capture::load_data(&args.input)
        .with_context(|| format!("loading {}", args.input.display()))?;
    let output = pipeline::run_external_transform(&args.plugin, &data)
        .with_context(|| format!("running {}", args.plugin.display()))?;
    print_stats(&pipeline::stats(output.view())?);
    if let Some(path) = &args.output {
        capture::save_data(path, output.view())?;
    }
    Ok(())
}

fn print_stats(stats: &StatsResult) {
    println!("channel\tmean\tstd\tmin\tmax");
    for ch in 0..stats.channel_count() {
        println!(
            "{ch}\t{:.6}\t{:.6}\t{:.6}\t{:.6}",
            stats.mean[ch], stats.std[ch], stats.min[ch], stats.max[ch]
        );
    }
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    std::fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))?;
    log::info!("wrote {}", path.display());
    Ok(())
}

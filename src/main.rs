use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use crossbeam_channel::unbounded;
use log::{error, info, warn};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use pcm_channel_meter::audio_stream::{collect_output, start_conversion_thread};
use pcm_channel_meter::display::LevelDisplay;
use pcm_channel_meter::get_results::start_meter_thread;
use pcm_channel_meter::make_waves::sine_pcm;
use pcm_channel_meter::presets::{PresetManager, DEFAULT_PRESET};
use pcm_channel_meter::utils::DEFAULT_SAMPLE_RATE;
use pcm_channel_meter::wav_io::{read_pcm, write_pcm, PcmData, PcmSpec};
use pcm_channel_meter::{
    Accumulator, AmplitudeTracker, BitDepth, Channel, Converted, Converter, LevelMeter,
    Operation, Source, StreamConfig,
};

#[derive(Parser, Debug)]
#[command(name = "pcm-meter", version, about = "Convert PCM between mono and stereo layouts and meter its level")]
struct Cli {
    /// Turn on logging (respects RUST_LOG)
    #[arg(long, global = true)]
    enable_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert a whole file in one call and print the resulting levels
    Convert(ConvertArgs),
    /// Stream a file through the converter while showing a level meter
    Meter(MeterArgs),
    /// Write a sine test tone
    Tone(ToneArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum OpArg {
    ZeroPad,
    CopyPad,
    Combine,
    Split,
    SplitBoth,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum AccumulatorArg {
    Narrow,
    Wide,
}

impl From<AccumulatorArg> for Accumulator {
    fn from(arg: AccumulatorArg) -> Self {
        match arg {
            AccumulatorArg::Narrow => Accumulator::Narrow,
            AccumulatorArg::Wide => Accumulator::Wide,
        }
    }
}

#[derive(Args, Debug)]
struct ConvertArgs {
    #[arg(long, value_enum)]
    op: OpArg,
    /// Channel for zero-pad and split
    #[arg(long, default_value = "left")]
    channel: Channel,
    /// Bit depth of raw PCM input (WAV headers take precedence)
    #[arg(long, default_value_t = 16)]
    bit_depth: u16,
    #[arg(long, default_value_t = DEFAULT_SAMPLE_RATE)]
    sample_rate: u32,
    #[arg(long, value_enum, default_value = "narrow")]
    accumulator: AccumulatorArg,
    /// Input file (.wav or raw PCM); the left input for combine
    #[arg(short, long)]
    input: PathBuf,
    /// Right input for combine
    #[arg(long)]
    right: Option<PathBuf>,
    /// Output file (.wav or raw PCM); the left output for split-both
    #[arg(short, long)]
    output: PathBuf,
    /// Right output for split-both
    #[arg(long)]
    right_out: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct MeterArgs {
    /// Input file (.wav or raw PCM)
    #[arg(short, long)]
    input: PathBuf,
    /// Conversion to run; defaults to copy-pad for mono and split-both for stereo
    #[arg(long, value_enum)]
    op: Option<OpArg>,
    #[arg(long, default_value = "left")]
    channel: Channel,
    /// Number of channels in raw PCM input
    #[arg(long, default_value_t = 2)]
    channels: u16,
    #[arg(long, default_value = DEFAULT_PRESET)]
    preset: String,
    #[arg(long, default_value = "presets.yaml")]
    presets: PathBuf,
    /// Pace the stream at its sample rate
    #[arg(long)]
    realtime: bool,
    /// Print readings as JSON lines
    #[arg(long)]
    json: bool,
    /// Also write the converted stream
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ToneArgs {
    #[arg(short, long)]
    output: PathBuf,
    #[arg(long, default_value_t = 16)]
    bit_depth: u16,
    #[arg(long, default_value_t = 440.0)]
    freq: f32,
    #[arg(long, default_value_t = 1.0)]
    seconds: f32,
    /// Peak level relative to full scale
    #[arg(long, default_value_t = 1.0)]
    amplitude: f32,
    #[arg(long, default_value_t = DEFAULT_SAMPLE_RATE)]
    sample_rate: u32,
    /// Copy the tone into both channels
    #[arg(long)]
    stereo: bool,
}

fn main() {
    let cli = Cli::parse();

    if cli.enable_logs {
        env_logger::Builder::from_env(
            env_logger::Env::default().default_filter_or("pcm_channel_meter=info,pcm_meter=info"),
        )
        .init();
    }

    if let Err(e) = run(cli.command) {
        if cli.enable_logs {
            error!("Application encountered an error: {:?}", e);
        } else {
            eprintln!("Error: {:?}", e);
        }
        std::process::exit(1);
    }
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Convert(args) => run_convert(args),
        Command::Meter(args) => run_meter(args),
        Command::Tone(args) => run_tone(args),
    }
}

fn to_operation(op: OpArg, channel: Channel) -> Operation {
    match op {
        OpArg::ZeroPad => Operation::ZeroPad(channel),
        OpArg::CopyPad => Operation::CopyPad,
        OpArg::Combine => Operation::Combine,
        OpArg::Split => Operation::OneChannelSplit(channel),
        OpArg::SplitBoth => Operation::TwoChannelSplit,
    }
}

fn load_input(path: &Path, raw_spec: PcmSpec, expected_channels: usize) -> Result<PcmData> {
    let data = read_pcm(path, raw_spec)?;
    if data.spec.channels as usize != expected_channels {
        return Err(anyhow!(
            "{} has {} channel(s), the operation expects {}",
            path.display(),
            data.spec.channels,
            expected_channels
        ));
    }
    Ok(data)
}

fn load_source(op: Operation, input: &Path, right: Option<&Path>, raw_spec: PcmSpec) -> Result<(PcmSpec, Source)> {
    let channels = op.input_channels();
    let primary = load_input(input, raw_spec, channels)?;
    let source = match (op, right) {
        (Operation::Combine, Some(right)) => {
            let secondary = load_input(right, primary.spec, channels)?;
            if secondary.spec.bit_depth != primary.spec.bit_depth {
                return Err(anyhow!(
                    "left input is {}, right input is {}",
                    primary.spec.bit_depth,
                    secondary.spec.bit_depth
                ));
            }
            Source::Pair {
                left: primary.bytes,
                right: secondary.bytes,
            }
        }
        (Operation::Combine, None) => return Err(anyhow!("combine needs --right")),
        (_, Some(_)) => {
            warn!("--right is only used by combine, ignoring it");
            Source::Single(primary.bytes)
        }
        (_, None) => Source::Single(primary.bytes),
    };
    Ok((primary.spec, source))
}

fn write_converted(
    op: Operation,
    spec: PcmSpec,
    converted: &Converted,
    output: &Path,
    right_out: Option<&Path>,
) -> Result<()> {
    let out_spec = PcmSpec {
        channels: op.output_channels() as u16,
        ..spec
    };
    match converted {
        Converted::Single(bytes) => write_pcm(output, out_spec, bytes),
        Converted::Pair { left, right } => {
            let right_out = right_out.ok_or_else(|| anyhow!("split-both needs --right-out"))?;
            write_pcm(output, out_spec, left)?;
            write_pcm(right_out, out_spec, right)
        }
    }
}

fn run_convert(args: ConvertArgs) -> Result<()> {
    let op = to_operation(args.op, args.channel);
    let raw_spec = PcmSpec {
        channels: op.input_channels() as u16,
        sample_rate: args.sample_rate,
        bit_depth: BitDepth::try_from(args.bit_depth)?,
    };
    let (spec, source) = load_source(op, &args.input, args.right.as_deref(), raw_spec)?;

    let tracker = Arc::new(AmplitudeTracker::new());
    let accumulator = Accumulator::from(args.accumulator);
    let converter = Converter::new(Arc::clone(&tracker)).with_accumulator(accumulator);
    let converted = converter
        .apply(op, spec.bit_depth, &source)
        .with_context(|| format!("{} failed", op))?;
    write_converted(op, spec, &converted, &args.output, args.right_out.as_deref())?;

    let meter = LevelMeter::new(tracker, spec.bit_depth, accumulator);
    let reading = meter.read();
    info!("{} done: {:?}", op, reading);
    println!("{}", LevelDisplay::new(20).format_reading(&reading));
    println!("raw levels: left {} right {}", reading.raw.left, reading.raw.right);
    Ok(())
}

fn run_meter(args: MeterArgs) -> Result<()> {
    let manager = PresetManager::new(&args.presets)?;
    let preset = manager.get(&args.preset);
    info!("Using preset '{}': {:?}", args.preset, preset);

    let raw_spec = PcmSpec {
        channels: args.channels,
        sample_rate: preset.sample_rate,
        bit_depth: preset.bit_depth,
    };
    let probe = read_pcm(&args.input, raw_spec)?;
    let op = match args.op {
        Some(op) => to_operation(op, args.channel),
        None if probe.spec.channels == 1 => Operation::CopyPad,
        None => Operation::TwoChannelSplit,
    };
    if op == Operation::Combine {
        return Err(anyhow!("meter streams a single input, use convert for combine"));
    }
    if probe.spec.channels as usize != op.input_channels() {
        return Err(anyhow!(
            "{} has {} channel(s), {} expects {}",
            args.input.display(),
            probe.spec.channels,
            op,
            op.input_channels()
        ));
    }
    let spec = probe.spec;

    let tracker = Arc::new(AmplitudeTracker::new());
    let converter = Arc::new(Converter::new(Arc::clone(&tracker)).with_accumulator(preset.accumulator));
    let meter = Arc::new(LevelMeter::new(tracker, spec.bit_depth, preset.accumulator));
    let display = LevelDisplay::new(preset.bar_width);

    let shutdown_flag = Arc::new(AtomicBool::new(false));
    {
        let shutdown_flag = Arc::clone(&shutdown_flag);
        let meter = Arc::clone(&meter);
        ctrlc::set_handler(move || {
            // An interrupted stream reads as silence.
            meter.set_streaming(false);
            shutdown_flag.store(true, Ordering::SeqCst);
        })
        .context("Failed to install Ctrl-C handler")?;
    }

    let config = StreamConfig {
        operation: op,
        bit_depth: spec.bit_depth,
        chunk_frames: preset.chunk_frames_for(spec.sample_rate),
        sample_rate: spec.sample_rate,
        realtime: args.realtime || preset.realtime,
    };

    let (output_tx, output_rx) = unbounded();
    let (reading_tx, reading_rx) = unbounded();

    let conversion_thread = start_conversion_thread(
        converter,
        Source::Single(probe.bytes),
        config,
        output_tx,
        Arc::clone(&shutdown_flag),
    )?;
    let collector_thread = thread::spawn(move || collect_output(op, &output_rx));
    let meter_thread = start_meter_thread(
        Arc::clone(&meter),
        Duration::from_millis(preset.refresh_ms),
        reading_tx,
        Arc::clone(&shutdown_flag),
    )?;

    let stdout = io::stdout();
    for reading in reading_rx.iter() {
        let mut out = stdout.lock();
        if args.json {
            writeln!(out, "{}", serde_json::to_string(&reading)?)?;
        } else {
            write!(out, "\r{}", display.format_reading(&reading))?;
            out.flush()?;
        }
    }
    if !args.json {
        println!();
    }

    let chunks = conversion_thread
        .join()
        .map_err(|_| anyhow!("Conversion thread panicked"))??;
    let readings = meter_thread
        .join()
        .map_err(|_| anyhow!("Meter thread panicked"))?;
    let converted = collector_thread
        .join()
        .map_err(|_| anyhow!("Output collector panicked"))??;
    info!("Streamed {} chunks, {} meter readings", chunks, readings);

    if let Some(output) = args.output {
        match &converted {
            Converted::Pair { .. } => {
                let right_out = output.with_file_name(format!(
                    "right_{}",
                    output.file_name().and_then(|n| n.to_str()).unwrap_or("out.pcm")
                ));
                write_converted(op, spec, &converted, &output, Some(&right_out))?;
            }
            Converted::Single(_) => write_converted(op, spec, &converted, &output, None)?,
        }
    }
    Ok(())
}

fn run_tone(args: ToneArgs) -> Result<()> {
    let depth = BitDepth::try_from(args.bit_depth)?;
    let frames = (args.seconds.max(0.0) * args.sample_rate as f32) as usize;
    let mono = sine_pcm(depth, args.freq, args.sample_rate, frames, args.amplitude);

    let (channels, bytes) = if args.stereo {
        let converter = Converter::new(Arc::new(AmplitudeTracker::new()));
        let mut stereo = vec![0u8; mono.len() * 2];
        converter.copy_pad(&mono, depth, &mut stereo)?;
        (2, stereo)
    } else {
        (1, mono)
    };

    let spec = PcmSpec {
        channels,
        sample_rate: args.sample_rate,
        bit_depth: depth,
    };
    write_pcm(&args.output, spec, &bytes)?;
    println!(
        "Wrote {} Hz {} tone ({} frames, {} ch) to {}",
        args.freq,
        depth,
        frames,
        channels,
        args.output.display()
    );
    Ok(())
}

use std::error::Error;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use env_logger::Env;
use log::info;

use vga_sim::sink::{ImageSink, PngSink};
use vga_sim::units::TimeUnit;
use vga_sim::vga::{
    frame_limit_from_sentinel, TimingConfig, VgaDecoder, VgaEncoder, VgaTiming,
    SVGA_800X600_60HZ, UNLIMITED_FRAMES, VGA_640X480_60HZ, XGA_1024X768_60HZ,
};
use vga_sim::{decode_trace, display};

/// VGA Simulator
/// Draws images from the VGA output of an HDL simulation
#[derive(Parser)]
#[command(name = "vga-sim", version)]
#[command(about = "Draws images from a corresponding HDL simulation file")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Decode a testbench trace into frames
    Decode(DecodeArgs),
    /// Write a testbench-style trace that scans out an image
    Encode(EncodeArgs),
}

#[derive(Args)]
struct DecodeArgs {
    /// Output file from your testbench
    filename: PathBuf,

    /// Screen width in pixels
    width: u32,

    /// Screen height in pixels
    height: u32,

    /// Pixel clock frequency in MHz
    px_clk: f64,

    /// Length of horizontal back porch in pixels
    hbp: u32,

    /// Length of vertical back porch in lines
    vbp: u32,

    /// Maximum number of frames to draw, -1 draws all frames
    #[arg(long, default_value_t = UNLIMITED_FRAMES, allow_negative_numbers = true)]
    max_frames: i64,

    /// Accepted deviation from the pixel clock period, in nanoseconds
    #[arg(long, default_value_t = 5.0)]
    tolerance_ns: f64,

    /// Directory to write the frames to as PNG files
    #[arg(short, long, default_value = "vga-frames")]
    output: PathBuf,

    /// Show the frames in a window instead of saving them
    #[arg(long)]
    display: bool,

    /// Also save the unfinished frame at the end of the trace
    #[arg(long)]
    keep_partial: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    /// 640x480 @ 60Hz
    Vga,
    /// 800x600 @ 60Hz
    Svga,
    /// 1024x768 @ 60Hz
    Xga,
}

impl Mode {
    fn timing(self) -> VgaTiming {
        match self {
            Mode::Vga => VGA_640X480_60HZ,
            Mode::Svga => SVGA_800X600_60HZ,
            Mode::Xga => XGA_1024X768_60HZ,
        }
    }
}

#[derive(Args)]
struct EncodeArgs {
    /// Image to scan out
    image: PathBuf,

    /// Trace file to write
    trace: PathBuf,

    /// Video mode
    #[arg(long, value_enum, default_value_t = Mode::Vga)]
    mode: Mode,

    /// Number of frames to write
    #[arg(long, default_value_t = 1)]
    frames: u32,

    /// Time unit of the timestamps
    #[arg(long, default_value_t = TimeUnit::Picoseconds)]
    unit: TimeUnit,

    /// Random timing jitter, in time units
    #[arg(long, default_value_t = 0)]
    jitter: u64,

    /// Seed for the jitter, for a reproducible trace
    #[arg(long)]
    seed: Option<u64>,

    /// Extra records between pixel clock edges
    #[arg(long, default_value_t = 0)]
    substeps: u32,

    /// Records with undefined values before the first frame
    #[arg(long, default_value_t = 0)]
    undefined: u32,

    /// Width of the red bus
    #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u8).range(1..=16))]
    red_bits: u8,

    /// Width of the green bus
    #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u8).range(1..=16))]
    green_bits: u8,

    /// Width of the blue bus
    #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(u8).range(1..=16))]
    blue_bits: u8,
}

fn decode(args: DecodeArgs) -> Result<(), Box<dyn Error>> {
    let config = TimingConfig::new(args.width, args.height, args.px_clk, args.hbp, args.vbp)?
        .with_tolerance(args.tolerance_ns * 1e-9)?
        .with_max_frames(frame_limit_from_sentinel(args.max_frames)?);

    info!("VGA Simulator");
    info!("Resolution: {} × {}", config.width, config.height);

    let input = BufReader::new(File::open(&args.filename)?);
    let mut decoder = VgaDecoder::new(config);

    if args.display {
        let mut sink = ImageSink::new();
        let summary = decode_trace(input, &mut decoder, &mut sink)?;
        info!("{} frames decoded", summary.frames_completed);

        let mut frames: Vec<_> = sink.take_completed().collect();
        if args.keep_partial {
            frames.extend(sink.into_partial());
        }
        display::show_frames(frames)?;
    } else {
        fs::create_dir_all(&args.output)?;
        let mut sink = PngSink::new(&args.output);
        let summary = decode_trace(input, &mut decoder, &mut sink)?;
        let written = sink.finish(args.keep_partial)?;
        info!(
            "{} frames decoded, {} images written to {}",
            summary.frames_completed,
            written.len(),
            args.output.display()
        );
    }

    Ok(())
}

fn encode(args: EncodeArgs) -> Result<(), Box<dyn Error>> {
    let timing = args.mode.timing();
    let image = image::open(&args.image)?.into_rgb8();
    let mut encoder = VgaEncoder::new(timing, image)
        .with_time_unit(args.unit)
        .with_color_bits(
            args.red_bits as usize,
            args.green_bits as usize,
            args.blue_bits as usize,
        )?
        .with_jitter(args.jitter)
        .with_substeps(args.substeps)
        .with_undefined_preamble(args.undefined);
    if let Some(seed) = args.seed {
        encoder = encoder.with_seed(seed);
    }

    encoder.write_trace(args.frames, BufWriter::new(File::create(&args.trace)?))?;

    let config = timing.decoder_config()?;
    info!(
        "Wrote {} frames to {}, decode with: {} {} {} {} {}",
        args.frames,
        args.trace.display(),
        config.width,
        config.height,
        timing.pixel_clock_mhz,
        config.h_back_porch,
        config.v_back_porch
    );

    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    // Initialize logging.
    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();

    match cli.command {
        Command::Decode(args) => decode(args)?,
        Command::Encode(args) => encode(args)?,
    }

    info!("Goodbye.");
    Ok(())
}

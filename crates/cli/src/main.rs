use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};

use framereel_core::shared::constants::{DEFAULT_FRAME_RATE, IMAGE_EXTENSIONS};
use framereel_core::video::infrastructure::image_file_writer::{ImageFileWriter, SaveablePixel};
use framereel_core::{
    open_video, EncoderSettings, FfmpegOutput, FrameSink, Luma8, Pixel, Rgba8, VideoCodec,
};

/// Frame-by-frame video probing, extraction and transcoding.
#[derive(Parser)]
#[command(name = "framereel")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the track size and frame count of a video.
    Probe {
        /// Input video file.
        input: PathBuf,
    },
    /// Save frames of a video as image files.
    Extract {
        /// Input video file.
        input: PathBuf,

        /// Directory the images are written to.
        output_dir: PathBuf,

        /// Pixel type frames are decoded as.
        #[arg(long, value_enum, default_value = "rgba")]
        pixel: PixelKind,

        /// Keep every Nth frame (1 = every frame).
        #[arg(long, default_value = "1")]
        every: usize,

        /// Stop after this many images.
        #[arg(long)]
        limit: Option<usize>,

        /// Image format, by file extension.
        #[arg(long, default_value = "png")]
        format: String,

        /// Resize images to WIDTHxHEIGHT.
        #[arg(long, value_parser = parse_size)]
        size: Option<(u32, u32)>,
    },
    /// Decode a video and encode its frames into a new file.
    Transcode {
        /// Input video file.
        input: PathBuf,

        /// Output video file; the container follows the extension.
        output: PathBuf,

        /// Output codec: mpeg4, or ffv1 (lossless, use .mkv).
        #[arg(long, default_value = "mpeg4")]
        codec: VideoCodec,

        /// Pixel type frames pass through.
        #[arg(long, value_enum, default_value = "rgba")]
        pixel: PixelKind,

        /// Time between output frames, in milliseconds.
        #[arg(long)]
        interval_ms: Option<u64>,

        /// Encoder bit rate in bits per second.
        #[arg(long)]
        bit_rate: Option<usize>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum PixelKind {
    Rgba,
    Luma,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    match Cli::parse().command {
        Command::Probe { input } => {
            validate_input(&input)?;
            run_probe(&input)
        }
        Command::Extract {
            input,
            output_dir,
            pixel,
            every,
            limit,
            format,
            size,
        } => {
            validate_input(&input)?;
            validate_extract(every, &format)?;
            let writer = match size {
                Some((width, height)) => ImageFileWriter::with_size(width, height),
                None => ImageFileWriter::new(),
            };
            let options = ExtractOptions {
                every,
                limit,
                format,
                writer,
            };
            match pixel {
                PixelKind::Rgba => run_extract::<Rgba8>(&input, &output_dir, &options),
                PixelKind::Luma => run_extract::<Luma8>(&input, &output_dir, &options),
            }
        }
        Command::Transcode {
            input,
            output,
            codec,
            pixel,
            interval_ms,
            bit_rate,
        } => {
            validate_input(&input)?;
            let settings = EncoderSettings {
                codec,
                bit_rate,
                ..EncoderSettings::default()
            };
            let interval = frame_interval(interval_ms)?;
            match pixel {
                PixelKind::Rgba => run_transcode::<Rgba8>(&input, &output, settings, interval),
                PixelKind::Luma => run_transcode::<Luma8>(&input, &output, settings, interval),
            }
        }
    }
}

fn run_probe(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let source = open_video::<Luma8>(input)?;
    let (width, height) = source.size();
    let frame_count = source.frames()?.count();
    println!("{}: {width}x{height}, {frame_count} frames", input.display());
    Ok(())
}

struct ExtractOptions {
    every: usize,
    limit: Option<usize>,
    format: String,
    writer: ImageFileWriter,
}

fn run_extract<P: SaveablePixel>(
    input: &Path,
    output_dir: &Path,
    options: &ExtractOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let source = open_video::<P>(input)?;
    let limit = options.limit.unwrap_or(usize::MAX);

    let mut written = 0;
    for (index, frame) in source.frames()?.enumerate().step_by(options.every) {
        if written >= limit {
            break;
        }
        let path = output_dir.join(format!("frame_{index:06}.{}", options.format));
        options.writer.write(&path, &frame)?;
        written += 1;
        eprint!("\rExtracted {written} frames");
    }
    eprintln!();
    log::info!("Saved {written} frames to {}", output_dir.display());
    Ok(())
}

fn run_transcode<P: Pixel>(
    input: &Path,
    output: &Path,
    settings: EncoderSettings,
    interval: Duration,
) -> Result<(), Box<dyn std::error::Error>> {
    let source = open_video::<P>(input)?;
    if source.size() == (0, 0) {
        return Err(format!("{} has no frames", input.display()).into());
    }

    let (width, height) = source.size();
    let mut sink = FrameSink::with_size(FfmpegOutput::new(output, settings), width, height)?;
    let mut count = 0;
    for frame in source.frames()? {
        sink.write_after(&frame, interval)?;
        count += 1;
        eprint!("\rEncoded frame {count}");
    }
    eprintln!();
    sink.finish_blocking()?;
    log::info!("Output written to {}", output.display());
    Ok(())
}

fn validate_input(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if !input.exists() {
        return Err(format!("Input file not found: {}", input.display()).into());
    }
    Ok(())
}

fn validate_extract(every: usize, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    if every == 0 {
        return Err("--every must be at least 1".into());
    }
    if !IMAGE_EXTENSIONS.contains(&format.to_lowercase().as_str()) {
        return Err(format!(
            "Image format must be one of: {}, got '{format}'",
            IMAGE_EXTENSIONS.join(", ")
        )
        .into());
    }
    Ok(())
}

fn frame_interval(interval_ms: Option<u64>) -> Result<Duration, Box<dyn std::error::Error>> {
    match interval_ms {
        Some(0) => Err("--interval-ms must be greater than 0".into()),
        Some(ms) => Ok(Duration::from_millis(ms)),
        None => Ok(Duration::from_secs(1) / DEFAULT_FRAME_RATE as u32),
    }
}

fn parse_size(s: &str) -> Result<(u32, u32), String> {
    let (width, height) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{s}'"))?;
    let parse = |v: &str| match v.trim().parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(format!("invalid dimension '{v}' in '{s}'")),
    };
    Ok((parse(width)?, parse(height)?))
}

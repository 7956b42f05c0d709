//! hueloop: turn a still image into a looping hue-wave GIF.
//!
//! Reads a source image (and an optional mask), runs the hue-wave
//! pipeline, and writes the animation as a GIF. The output file is only
//! created once every frame has been synthesized and encoded, so a
//! failed run never leaves a partial file behind.
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin hueloop -- [OPTIONS] --output <OUTPUT> <SOURCE>
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use hueloop_pipeline::diagnostics::{Clock, PipelineDiagnostics, StageMetrics};
use hueloop_pipeline::{PipelineConfig, PipelineError, ResizeFilter};

/// Turn a still image into a looping hue-wave GIF.
///
/// A wave of hue travels across the picture while saturation and
/// brightness stay put. Pixels that are dark in the mask (or transparent
/// in the source's own alpha channel) stay transparent in every frame.
#[derive(Parser)]
#[command(name = "hueloop", version, allow_negative_numbers = true)]
struct Cli {
    /// Path to the source image (PNG, JPEG, BMP, WebP).
    source: PathBuf,

    /// Optional grayscale mask; values <= 5 become transparent.
    ///
    /// Ignored when the source has its own alpha channel, and skipped
    /// with a warning when the file does not exist.
    #[arg(long)]
    mask: Option<PathBuf>,

    /// Output GIF path.
    #[arg(short, long)]
    output: PathBuf,

    /// Largest allowed output dimension in pixels.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_MAX_PX, value_parser = clap::builder::RangedU64ValueParser::<u32>::new().range(1..))]
    max_px: u32,

    /// Hue cycles per second.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_TIME_FREQUENCY)]
    time_frequency: f64,

    /// Hue cycles across the image width.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_SPATIAL_FREQUENCY_X)]
    spatial_frequency_x: f64,

    /// Hue cycles across the image height.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_SPATIAL_FREQUENCY_Y)]
    spatial_frequency_y: f64,

    /// Animation length in seconds.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_DURATION_SECONDS)]
    duration: f64,

    /// Frames per second.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_FPS, value_parser = clap::builder::RangedU64ValueParser::<u32>::new().range(1..))]
    fps: u32,

    /// Number of times to play the animation (0 = forever).
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_LOOP_COUNT)]
    loop_count: u16,

    /// Resize filter (nearest, triangle, catmull-rom, gaussian, lanczos3).
    #[arg(long, value_enum, default_value_t = CLI_DEFAULT_FILTER)]
    resize_filter: Filter,

    /// Quantizer sampling factor (1 = best quality, 30 = fastest).
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_QUANTIZER_SAMPLE_FACTOR, value_parser = clap::value_parser!(i32).range(1..=30))]
    sample_factor: i32,

    /// Full pipeline config as a JSON string.
    ///
    /// When provided, all other pipeline parameter flags are ignored.
    /// The JSON must be a valid `PipelineConfig` serialization; missing
    /// fields take their defaults.
    #[arg(long)]
    config_json: Option<String>,

    /// Print per-stage timing and metrics after the run.
    #[arg(long)]
    diagnostics: bool,

    /// Print diagnostics as JSON instead of a human-readable report.
    #[arg(long, requires = "diagnostics")]
    json: bool,
}

/// Resize filter selection.
#[derive(Clone, Copy, ValueEnum)]
enum Filter {
    /// Nearest-neighbor (fastest, blocky).
    Nearest,
    /// Bilinear interpolation.
    Triangle,
    /// Bicubic Catmull-Rom.
    CatmullRom,
    /// Gaussian (smooth).
    Gaussian,
    /// Lanczos with 3 lobes (slowest, sharpest).
    Lanczos3,
}

impl Filter {
    const fn from_pipeline(filter: ResizeFilter) -> Self {
        match filter {
            ResizeFilter::Nearest => Self::Nearest,
            ResizeFilter::Triangle => Self::Triangle,
            ResizeFilter::CatmullRom => Self::CatmullRom,
            ResizeFilter::Gaussian => Self::Gaussian,
            ResizeFilter::Lanczos3 => Self::Lanczos3,
        }
    }

    const fn to_pipeline(self) -> ResizeFilter {
        match self {
            Self::Nearest => ResizeFilter::Nearest,
            Self::Triangle => ResizeFilter::Triangle,
            Self::CatmullRom => ResizeFilter::CatmullRom,
            Self::Gaussian => ResizeFilter::Gaussian,
            Self::Lanczos3 => ResizeFilter::Lanczos3,
        }
    }
}

/// Derived from [`PipelineConfig::DEFAULT_RESIZE_FILTER`] so the two
/// cannot silently diverge.
const CLI_DEFAULT_FILTER: Filter = Filter::from_pipeline(PipelineConfig::DEFAULT_RESIZE_FILTER);

/// Everything that can stop a run.
#[derive(Debug, thiserror::Error)]
enum RunError {
    #[error("source image not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("error reading {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("error parsing --config-json: {0}")]
    ConfigJson(#[from] serde_json::Error),

    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("export error: {0}")]
    Export(#[from] hueloop_export::ExportError),

    #[error("error writing {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Build a [`PipelineConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and all
/// individual parameter flags are ignored.
fn config_from_cli(cli: &Cli) -> Result<PipelineConfig, RunError> {
    if let Some(ref json) = cli.config_json {
        return Ok(serde_json::from_str(json)?);
    }

    Ok(PipelineConfig {
        max_px: cli.max_px,
        time_frequency: cli.time_frequency,
        spatial_frequency_x: cli.spatial_frequency_x,
        spatial_frequency_y: cli.spatial_frequency_y,
        duration_seconds: cli.duration,
        fps: cli.fps,
        loop_count: cli.loop_count,
        resize_filter: cli.resize_filter.to_pipeline(),
        quantizer_sample_factor: cli.sample_factor,
    })
}

fn read(path: &Path) -> Result<Vec<u8>, RunError> {
    std::fs::read(path).map_err(|source| RunError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Run the whole tool and return the path of the written GIF.
fn run(cli: &Cli) -> Result<PathBuf, RunError> {
    let config = config_from_cli(cli)?;

    if !cli.source.exists() {
        return Err(RunError::NotFound(cli.source.clone()));
    }
    let source_bytes = read(&cli.source)?;
    eprintln!(
        "Source: {} ({} bytes)",
        cli.source.display(),
        source_bytes.len(),
    );

    let mask_bytes = match cli.mask {
        Some(ref path) if path.exists() => {
            let bytes = read(path)?;
            eprintln!("Mask: {} ({} bytes)", path.display(), bytes.len());
            Some(bytes)
        }
        Some(ref path) => {
            eprintln!("Warning: mask {} not found, ignoring", path.display());
            None
        }
        None => None,
    };

    let (animation, diagnostics) = hueloop_pipeline::diagnostics::process_with_diagnostics(
        &source_bytes,
        mask_bytes.as_deref(),
        &config,
        &StdClock,
    )?;
    print_progress(&diagnostics);

    // Encode fully in memory so a failure never leaves a partial file.
    let gif = hueloop_export::to_gif_bytes(&animation)?;
    std::fs::write(&cli.output, &gif).map_err(|source| RunError::Write {
        path: cli.output.clone(),
        source,
    })?;
    eprintln!(
        "GIF written to {} ({} bytes)",
        cli.output.display(),
        gif.len(),
    );

    if cli.diagnostics {
        if cli.json {
            match serde_json::to_string_pretty(&diagnostics) {
                Ok(json) => println!("{json}"),
                Err(e) => eprintln!("Error serializing diagnostics: {e}"),
            }
        } else {
            println!("{}", diagnostics.report());
        }
    }

    Ok(cli.output.clone())
}

fn print_progress(diagnostics: &PipelineDiagnostics) {
    if let StageMetrics::Decode {
        width,
        height,
        layout,
        mask_source,
        ..
    } = &diagnostics.decode.metrics
    {
        eprintln!("Decoded: {width}x{height} {layout}, mask: {mask_source}");
    }
    if let StageMetrics::Normalize {
        width,
        height,
        gain,
        ..
    } = &diagnostics.normalize.metrics
    {
        eprintln!("Working size: {width}x{height} (gain {gain:.4})");
    }
    let summary = &diagnostics.summary;
    eprintln!(
        "Frames: {} at {} ms",
        summary.frame_count, summary.delay_ms,
    );
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}

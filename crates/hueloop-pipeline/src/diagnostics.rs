//! Pipeline diagnostics: timing and metrics for each stage.
//!
//! The pipeline crate never reads the system clock itself. Callers pass
//! a [`Clock`] into [`process_with_diagnostics`]; native binaries
//! back it with `std::time::Instant`, tests with a fake.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::decode::{MaskSource, SourceLayout};
use crate::resize::ResizeFilter;
use crate::types::{Animation, PipelineConfig, PipelineError};

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Source of timestamps for stage timing.
pub trait Clock {
    /// Opaque timestamp type.
    type Instant;

    /// Capture the current time.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// Diagnostics collected from a single pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDiagnostics {
    /// Stage 1: decode and source/mask resolution.
    pub decode: StageDiagnostics,
    /// Stage 2: resize, stencil, HSV split.
    pub normalize: StageDiagnostics,
    /// Stage 3: phase field construction.
    pub phase_field: StageDiagnostics,
    /// Stage 4: frame synthesis (all frames).
    pub synthesis: StageDiagnostics,
    /// Total wall-clock duration of the entire pipeline (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Summary of the produced animation.
    pub summary: PipelineSummary,
}

/// Diagnostics for a single pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics.
    pub metrics: StageMetrics,
}

/// Stage-specific metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Decode metrics.
    Decode {
        /// Size of the source image bytes.
        input_bytes: usize,
        /// Size of the supplied mask bytes, if any.
        mask_bytes: Option<usize>,
        /// Decoded width in pixels.
        width: u32,
        /// Decoded height in pixels.
        height: u32,
        /// Channel layout of the source.
        layout: SourceLayout,
        /// Where the mask came from.
        mask_source: MaskSource,
    },
    /// Normalization metrics.
    Normalize {
        /// Working width in pixels.
        width: u32,
        /// Working height in pixels.
        height: u32,
        /// Scale factor applied to the source.
        gain: f64,
        /// Resampling filter.
        filter: ResizeFilter,
        /// Number of stencilled (transparent) pixels.
        transparent_pixels: usize,
    },
    /// Phase field metrics.
    PhaseField {
        /// Spatial frequency along x.
        kx: f64,
        /// Spatial frequency along y.
        ky: f64,
    },
    /// Frame synthesis metrics.
    Synthesis {
        /// Frames rendered.
        frame_count: u32,
        /// Frames per second.
        fps: u32,
        /// Temporal frequency.
        time_frequency: f64,
        /// NeuQuant sampling factor.
        sample_factor: i32,
    },
}

/// High-level summary of the produced animation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Number of frames.
    pub frame_count: usize,
    /// Delay between frames in milliseconds.
    pub delay_ms: u32,
    /// Repeat count (`0` = forever).
    pub loop_count: u16,
}

impl PipelineDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Pipeline Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Output: {}x{}, {} frames @ {}ms",
            self.summary.width, self.summary.height, self.summary.frame_count, self.summary.delay_ms,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<24} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);
        let stages = [
            ("Decode", &self.decode),
            ("Normalize", &self.normalize),
            ("Phase Field", &self.phase_field),
            ("Synthesis", &self.synthesis),
        ];

        for (name, diag) in stages {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<24} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        let loops = match self.summary.loop_count {
            0 => "forever".to_owned(),
            n => format!("{n}x"),
        };
        lines.push(String::new());
        lines.push(format!("Loop: {loops}"));

        lines.join("\n")
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Format stage metrics into a compact detail string.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Decode {
            input_bytes,
            mask_bytes,
            width,
            height,
            layout,
            mask_source,
        } => {
            let mask = mask_bytes.map_or_else(String::new, |b| format!(" (+{b} mask bytes)"));
            format!("{input_bytes} bytes{mask} -> {width}x{height} {layout}, mask: {mask_source}")
        }
        StageMetrics::Normalize {
            width,
            height,
            gain,
            filter,
            transparent_pixels,
        } => format!("{width}x{height} gain={gain:.3} {filter} transparent={transparent_pixels}"),
        StageMetrics::PhaseField { kx, ky } => format!("kx={kx:.3} ky={ky:.3}"),
        StageMetrics::Synthesis {
            frame_count,
            fps,
            time_frequency,
            sample_factor,
        } => format!("{frame_count} frames @ {fps}fps f={time_frequency:.3} samplefac={sample_factor}"),
    }
}

/// Run the pipeline like [`crate::process`], timing every stage.
///
/// # Errors
///
/// Same as [`crate::process`].
pub fn process_with_diagnostics<C: Clock>(
    source: &[u8],
    mask: Option<&[u8]>,
    config: &PipelineConfig,
    clock: &C,
) -> Result<(Animation, PipelineDiagnostics), PipelineError> {
    config.validate()?;
    let start = clock.now();

    let stage = clock.now();
    let resolved = crate::decode::load(source, mask)?;
    let decode = StageDiagnostics {
        duration: clock.elapsed(&stage),
        metrics: StageMetrics::Decode {
            input_bytes: source.len(),
            mask_bytes: mask.map(<[u8]>::len),
            width: resolved.color.width(),
            height: resolved.color.height(),
            layout: resolved.layout,
            mask_source: resolved.mask_source,
        },
    };

    let stage = clock.now();
    let normalized = crate::normalize::normalize(&resolved, config.max_px, config.resize_filter)?;
    let normalize = StageDiagnostics {
        duration: clock.elapsed(&stage),
        metrics: StageMetrics::Normalize {
            width: normalized.dimensions.width,
            height: normalized.dimensions.height,
            gain: normalized.gain,
            filter: config.resize_filter,
            transparent_pixels: normalized.stencil.transparent_count(),
        },
    };

    let stage = clock.now();
    let phase = crate::phase::PhaseField::new(
        normalized.dimensions,
        config.spatial_frequency_x,
        config.spatial_frequency_y,
    );
    let phase_field = StageDiagnostics {
        duration: clock.elapsed(&stage),
        metrics: StageMetrics::PhaseField {
            kx: config.spatial_frequency_x,
            ky: config.spatial_frequency_y,
        },
    };

    let stage = clock.now();
    let animation = crate::animate(&normalized, &phase, config);
    let synthesis = StageDiagnostics {
        duration: clock.elapsed(&stage),
        metrics: StageMetrics::Synthesis {
            frame_count: config.total_frames(),
            fps: config.fps,
            time_frequency: config.time_frequency,
            sample_factor: config.quantizer_sample_factor,
        },
    };

    let summary = PipelineSummary {
        width: animation.dimensions.width,
        height: animation.dimensions.height,
        frame_count: animation.frames.len(),
        delay_ms: animation.delay_ms,
        loop_count: animation.loop_count,
    };

    let diagnostics = PipelineDiagnostics {
        decode,
        normalize,
        phase_field,
        synthesis,
        total_duration: clock.elapsed(&start),
        summary,
    };
    Ok((animation, diagnostics))
}

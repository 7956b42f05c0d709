//! Shared types for the hueloop frame synthesis pipeline.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::resize::ResizeFilter;

/// Re-export `GrayImage` so downstream crates can reference mask
/// data without depending on `image` directly.
pub use image::GrayImage;

/// Re-export `RgbImage` so downstream crates can reference the
/// resolved colour grid without depending on `image` directly.
pub use image::RgbImage;

/// Re-export `RgbaImage` for callers that build sources in memory.
pub use image::RgbaImage;

/// Palette index reserved for fully transparent pixels in every frame.
pub const TRANSPARENT_INDEX: u8 = 255;

/// Number of entries in every frame palette (including the sentinel).
pub const PALETTE_SIZE: usize = 256;

/// Upper bound of the 8-bit hue convention (`0..180`, i.e. degrees / 2).
///
/// Synthesized hues are `floor(HUE_MAX * theta)` with `theta < 1`, so
/// they never reach this value.
pub const HUE_MAX: u8 = 179;

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Create a new dimensions value.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Total pixel count (`width * height`).
    #[must_use]
    pub const fn pixel_count(self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Returns `true` if either axis is zero.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Configuration for the hue-wave pipeline.
///
/// Construct with struct-update syntax over [`PipelineConfig::default`]
/// and call [`validate`](Self::validate) (the pipeline entry points do
/// this before touching any pixel data).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Maximum working size in pixels along either axis. Larger sources
    /// are scaled down so the longer axis equals this value.
    pub max_px: u32,

    /// Temporal frequency `f` of the hue wave, in cycles per second.
    pub time_frequency: f64,

    /// Spatial frequency `kx` along the image width (cycles per width).
    pub spatial_frequency_x: f64,

    /// Spatial frequency `ky` along the image height (cycles per height).
    pub spatial_frequency_y: f64,

    /// Length of the animation in seconds.
    pub duration_seconds: f64,

    /// Frames per second.
    pub fps: u32,

    /// Number of times the animation repeats. `0` loops forever.
    pub loop_count: u16,

    /// Resampling filter used when the source exceeds `max_px`.
    pub resize_filter: ResizeFilter,

    /// NeuQuant sampling factor (1 = best quality, 30 = fastest).
    pub quantizer_sample_factor: i32,
}

impl PipelineConfig {
    /// Default maximum working size in pixels.
    pub const DEFAULT_MAX_PX: u32 = 1000;

    /// Default temporal frequency in cycles per second.
    pub const DEFAULT_TIME_FREQUENCY: f64 = 0.3;

    /// Default spatial frequency along x.
    pub const DEFAULT_SPATIAL_FREQUENCY_X: f64 = 0.5;

    /// Default spatial frequency along y.
    pub const DEFAULT_SPATIAL_FREQUENCY_Y: f64 = 0.5;

    /// Default animation length in seconds.
    pub const DEFAULT_DURATION_SECONDS: f64 = 3.0;

    /// Default frame rate.
    pub const DEFAULT_FPS: u32 = 30;

    /// Default loop count (infinite).
    pub const DEFAULT_LOOP_COUNT: u16 = 0;

    /// Default resampling filter.
    pub const DEFAULT_RESIZE_FILTER: ResizeFilter = ResizeFilter::Triangle;

    /// Default NeuQuant sampling factor.
    pub const DEFAULT_QUANTIZER_SAMPLE_FACTOR: i32 = 10;

    /// Valid range for [`quantizer_sample_factor`](Self::quantizer_sample_factor).
    pub const QUANTIZER_SAMPLE_FACTOR_RANGE: std::ops::RangeInclusive<i32> = 1..=30;

    /// Number of frames in the animation: `round(duration * fps)`.
    ///
    /// Rounds half up. Returns 0 for non-positive or non-finite
    /// durations.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn total_frames(&self) -> u32 {
        let frames = self.duration_seconds.mul_add(f64::from(self.fps), 0.5).floor();
        if frames.is_finite() && frames > 0.0 {
            frames as u32
        } else {
            0
        }
    }

    /// Per-frame delay in whole milliseconds: `floor(1000 / fps)`.
    ///
    /// Returns 0 when `fps` is 0 (rejected by [`validate`](Self::validate)).
    #[must_use]
    pub const fn frame_delay_ms(&self) -> u32 {
        match self.fps {
            0 => 0,
            fps => 1000 / fps,
        }
    }

    /// Check every field and the derived frame count.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] describing the first
    /// offending field.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.max_px == 0 {
            return Err(PipelineError::InvalidConfig(
                "max_px must be at least 1".to_owned(),
            ));
        }
        if self.fps == 0 {
            return Err(PipelineError::InvalidConfig(
                "fps must be at least 1".to_owned(),
            ));
        }
        if !self.duration_seconds.is_finite() || self.duration_seconds <= 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "duration_seconds must be a positive number, got {}",
                self.duration_seconds,
            )));
        }
        for (name, value) in [
            ("time_frequency", self.time_frequency),
            ("spatial_frequency_x", self.spatial_frequency_x),
            ("spatial_frequency_y", self.spatial_frequency_y),
        ] {
            if !value.is_finite() {
                return Err(PipelineError::InvalidConfig(format!(
                    "{name} must be finite, got {value}",
                )));
            }
        }
        if !Self::QUANTIZER_SAMPLE_FACTOR_RANGE.contains(&self.quantizer_sample_factor) {
            return Err(PipelineError::InvalidConfig(format!(
                "quantizer_sample_factor must be within {}..={}, got {}",
                Self::QUANTIZER_SAMPLE_FACTOR_RANGE.start(),
                Self::QUANTIZER_SAMPLE_FACTOR_RANGE.end(),
                self.quantizer_sample_factor,
            )));
        }
        if self.total_frames() < 1 {
            return Err(PipelineError::InvalidConfig(format!(
                "duration {}s at {} fps yields no frames",
                self.duration_seconds, self.fps,
            )));
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_px: Self::DEFAULT_MAX_PX,
            time_frequency: Self::DEFAULT_TIME_FREQUENCY,
            spatial_frequency_x: Self::DEFAULT_SPATIAL_FREQUENCY_X,
            spatial_frequency_y: Self::DEFAULT_SPATIAL_FREQUENCY_Y,
            duration_seconds: Self::DEFAULT_DURATION_SECONDS,
            fps: Self::DEFAULT_FPS,
            loop_count: Self::DEFAULT_LOOP_COUNT,
            resize_filter: Self::DEFAULT_RESIZE_FILTER,
            quantizer_sample_factor: Self::DEFAULT_QUANTIZER_SAMPLE_FACTOR,
        }
    }
}

/// One palette-indexed animation frame.
///
/// Each frame owns its own palette; indices are not comparable across
/// frames. Pixels the stencil marks transparent always hold
/// [`transparent_index`](Self::transparent_index).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Frame dimensions in pixels.
    pub dimensions: Dimensions,
    /// Flat RGB palette, `3 * PALETTE_SIZE` bytes.
    pub palette: Vec<u8>,
    /// Row-major palette indices, one per pixel.
    pub indices: Vec<u8>,
    /// Palette slot that encodes "fully transparent".
    pub transparent_index: u8,
}

impl Frame {
    /// Palette index at pixel `(x, y)`, or `None` if out of bounds.
    #[must_use]
    pub fn index_at(&self, x: u32, y: u32) -> Option<u8> {
        if x >= self.dimensions.width || y >= self.dimensions.height {
            return None;
        }
        let offset = y as usize * self.dimensions.width as usize + x as usize;
        self.indices.get(offset).copied()
    }

    /// RGB colour of palette slot `index`, or `None` if out of range.
    #[must_use]
    pub fn palette_color(&self, index: u8) -> Option<[u8; 3]> {
        let start = usize::from(index) * 3;
        self.palette
            .get(start..start + 3)
            .map(|rgb| [rgb[0], rgb[1], rgb[2]])
    }
}

/// An ordered sequence of frames plus timing metadata, ready to be
/// serialized by an exporter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Animation {
    /// Frames in playback order.
    pub frames: Vec<Frame>,
    /// Dimensions shared by every frame.
    pub dimensions: Dimensions,
    /// Delay between frames in milliseconds.
    pub delay_ms: u32,
    /// Repeat count. `0` loops forever.
    pub loop_count: u16,
    /// Palette slot that encodes "fully transparent" in every frame.
    pub transparent_index: u8,
}

/// Errors that can occur during pipeline processing.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Failed to decode the source or mask image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// The mask could not be brought to the working resolution.
    #[error("mask dimensions {actual} do not match image dimensions {expected}")]
    DimensionMismatch {
        /// Working resolution of the colour image.
        expected: Dimensions,
        /// Dimensions the mask ended up with.
        actual: Dimensions,
    },

    /// Pipeline configuration is invalid.
    #[error("invalid pipeline configuration: {0}")]
    InvalidConfig(String),
}

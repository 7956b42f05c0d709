//! Working-resolution math and resampling.
//!
//! The source is reduced so neither axis exceeds `max_px`, preserving
//! the aspect ratio. Images already within bounds keep their exact
//! dimensions and are not resampled at all.

use std::fmt;

use image::{ImageBuffer, Pixel};
use serde::{Deserialize, Serialize};

use crate::types::Dimensions;

/// Resampling filter used when scaling the source down.
///
/// Ordered from fastest/lowest-quality to slowest/highest-quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ResizeFilter {
    /// Nearest-neighbor: fastest, blocky artifacts.
    Nearest,
    /// Bilinear interpolation: fast, smooth.
    #[default]
    Triangle,
    /// Bicubic (Catmull-Rom): moderate speed, good quality.
    CatmullRom,
    /// Gaussian: moderate speed, soft output.
    Gaussian,
    /// Lanczos with 3 lobes: slowest, sharpest.
    Lanczos3,
}

impl ResizeFilter {
    /// Convert to the `image` crate's `FilterType`.
    const fn to_image_filter(self) -> image::imageops::FilterType {
        match self {
            Self::Nearest => image::imageops::FilterType::Nearest,
            Self::Triangle => image::imageops::FilterType::Triangle,
            Self::CatmullRom => image::imageops::FilterType::CatmullRom,
            Self::Gaussian => image::imageops::FilterType::Gaussian,
            Self::Lanczos3 => image::imageops::FilterType::Lanczos3,
        }
    }
}

impl fmt::Display for ResizeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nearest => f.write_str("Nearest"),
            Self::Triangle => f.write_str("Triangle"),
            Self::CatmullRom => f.write_str("CatmullRom"),
            Self::Gaussian => f.write_str("Gaussian"),
            Self::Lanczos3 => f.write_str("Lanczos3"),
        }
    }
}

/// Output dimensions and scale factor for a source of size `source`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkingSize {
    /// Dimensions after scaling.
    pub dimensions: Dimensions,
    /// Scale factor applied to both axes (`1.0` when no scaling).
    pub gain: f64,
}

/// Compute the working size for `source` bounded by `max_px`.
///
/// `gain` is 1.0 when both axes fit. Otherwise the longer axis becomes
/// exactly `max_px` and the shorter one is `floor(short * gain)`,
/// never less than one pixel.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn working_size(source: Dimensions, max_px: u32) -> WorkingSize {
    let Dimensions { width, height } = source;
    if width <= max_px && height <= max_px {
        return WorkingSize {
            dimensions: source,
            gain: 1.0,
        };
    }

    let scale = |axis: u32, gain: f64| ((f64::from(axis) * gain).floor() as u32).max(1);

    if width > height {
        let gain = f64::from(max_px) / f64::from(width);
        WorkingSize {
            dimensions: Dimensions::new(max_px, scale(height, gain)),
            gain,
        }
    } else {
        let gain = f64::from(max_px) / f64::from(height);
        WorkingSize {
            dimensions: Dimensions::new(scale(width, gain), max_px),
            gain,
        }
    }
}

/// Resample `image` to `target`, keeping its pixel type.
///
/// Returns a clone when the image already has the target dimensions.
#[must_use]
pub fn resize<P>(
    image: &ImageBuffer<P, Vec<u8>>,
    target: Dimensions,
    filter: ResizeFilter,
) -> ImageBuffer<P, Vec<u8>>
where
    P: Pixel<Subpixel = u8> + 'static,
{
    if image.dimensions() == (target.width, target.height) {
        return image.clone();
    }
    image::imageops::resize(
        image,
        target.width,
        target.height,
        filter.to_image_filter(),
    )
}

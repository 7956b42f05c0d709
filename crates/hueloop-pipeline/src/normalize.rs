//! Working-resolution normalization: resize, transparency stencil,
//! and HSV split.
//!
//! Runs once per pipeline, right after decode. Everything it produces
//! is read-only for the rest of the run: the frame synthesizer only
//! regenerates hue, reusing the saturation/value planes and the
//! stencil for every frame.

use image::{GrayImage, RgbImage};

use crate::color::rgb_to_hsv;
use crate::decode::Resolved;
use crate::resize::{ResizeFilter, resize, working_size};
use crate::types::{Dimensions, PipelineError};

/// Binary per-pixel mask of pixels that must be rendered transparent.
///
/// Mask samples at or below [`Stencil::THRESHOLD`] mark a hole (dark
/// means transparent); everything brighter is opaque.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stencil {
    dimensions: Dimensions,
    transparent: Vec<bool>,
}

impl Stencil {
    /// Highest mask sample still treated as transparent.
    pub const THRESHOLD: u8 = 5;

    /// A stencil with every pixel opaque.
    #[must_use]
    pub fn opaque(dimensions: Dimensions) -> Self {
        Self {
            dimensions,
            transparent: vec![false; pixel_len(dimensions)],
        }
    }

    /// Threshold a mask that is already at the working resolution.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::DimensionMismatch`] if the mask is not
    /// exactly `expected` in size.
    pub fn from_mask(mask: &GrayImage, expected: Dimensions) -> Result<Self, PipelineError> {
        let actual = Dimensions::new(mask.width(), mask.height());
        if actual != expected {
            return Err(PipelineError::DimensionMismatch { expected, actual });
        }
        let transparent = mask.pixels().map(|p| p.0[0] <= Self::THRESHOLD).collect();
        Ok(Self {
            dimensions: expected,
            transparent,
        })
    }

    /// Stencil dimensions.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Whether pixel `(x, y)` must be transparent. Out-of-bounds
    /// coordinates are reported as opaque.
    #[must_use]
    pub fn is_transparent(&self, x: u32, y: u32) -> bool {
        if x >= self.dimensions.width || y >= self.dimensions.height {
            return false;
        }
        self.transparent[y as usize * self.dimensions.width as usize + x as usize]
    }

    /// Row-major transparency flags, one per pixel.
    #[must_use]
    pub fn as_slice(&self) -> &[bool] {
        &self.transparent
    }

    /// Number of transparent pixels.
    #[must_use]
    pub fn transparent_count(&self) -> usize {
        self.transparent.iter().filter(|&&t| t).count()
    }
}

/// Saturation and value planes of the working image.
///
/// Hue is deliberately absent: it is regenerated every frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SvPlanes {
    /// Row-major saturation samples.
    pub saturation: Vec<u8>,
    /// Row-major value samples.
    pub value: Vec<u8>,
}

impl SvPlanes {
    /// Split an RGB image into its saturation and value planes.
    #[must_use]
    pub fn from_rgb(image: &RgbImage) -> Self {
        let (saturation, value) = image
            .pixels()
            .map(|p| {
                let [_, s, v] = rgb_to_hsv(p.0);
                (s, v)
            })
            .unzip();
        Self { saturation, value }
    }
}

/// Output of the normalization stage.
#[derive(Debug, Clone)]
pub struct Normalized {
    /// Working resolution shared by every downstream grid.
    pub dimensions: Dimensions,
    /// Scale factor applied to the source (`1.0` when unscaled).
    pub gain: f64,
    /// Colour grid at the working resolution.
    pub color: RgbImage,
    /// Saturation/value planes of `color`.
    pub planes: SvPlanes,
    /// Transparency stencil at the working resolution.
    pub stencil: Stencil,
}

/// Bring a resolved source to the working resolution and derive the
/// per-run constants.
///
/// A missing mask yields a fully opaque stencil.
///
/// # Errors
///
/// Returns [`PipelineError::DimensionMismatch`] if the mask is empty or
/// cannot be resampled to the colour grid's working resolution.
pub fn normalize(
    resolved: &Resolved,
    max_px: u32,
    filter: ResizeFilter,
) -> Result<Normalized, PipelineError> {
    let source = Dimensions::new(resolved.color.width(), resolved.color.height());
    let size = working_size(source, max_px);
    let color = resize(&resolved.color, size.dimensions, filter);

    let stencil = match &resolved.mask {
        None => Stencil::opaque(size.dimensions),
        Some(mask) => {
            let mask_dims = Dimensions::new(mask.width(), mask.height());
            if mask_dims.is_empty() {
                return Err(PipelineError::DimensionMismatch {
                    expected: size.dimensions,
                    actual: mask_dims,
                });
            }
            let mask = resize(mask, size.dimensions, filter);
            Stencil::from_mask(&mask, size.dimensions)?
        }
    };

    let planes = SvPlanes::from_rgb(&color);

    Ok(Normalized {
        dimensions: size.dimensions,
        gain: size.gain,
        color,
        planes,
        stencil,
    })
}

/// Number of pixels as a buffer length.
fn pixel_len(dimensions: Dimensions) -> usize {
    dimensions.width as usize * dimensions.height as usize
}

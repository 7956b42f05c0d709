//! Image decoding and source/mask resolution.
//!
//! Accepts raw image bytes (PNG, JPEG, BMP, WebP) and resolves them
//! into a three-channel colour grid plus an optional single-channel
//! mask. The channel layout of the source decides where the mask comes
//! from:
//!
//! | Layout | Colour grid | Mask |
//! |---|---|---|
//! | [`SourceLayout::Grayscale`] | gray expanded to RGB | supplied mask, if any |
//! | [`SourceLayout::Rgb`] | as decoded | supplied mask, if any |
//! | [`SourceLayout::Rgba`] | RGB channels | embedded alpha; supplied mask ignored |
//!
//! This is the first step in the pipeline: raw bytes in, [`Resolved`] out.

use std::fmt;

use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::types::{Dimensions, PipelineError};

/// Channel layout of a decoded source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceLayout {
    /// Single luminance channel.
    Grayscale,
    /// Three colour channels, no alpha.
    Rgb,
    /// Colour (or gray) plus an alpha channel.
    Rgba,
}

impl fmt::Display for SourceLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Grayscale => f.write_str("Grayscale"),
            Self::Rgb => f.write_str("RGB"),
            Self::Rgba => f.write_str("RGBA"),
        }
    }
}

/// Where the resolved mask came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaskSource {
    /// No mask; the whole image is treated as opaque.
    None,
    /// A separately supplied mask image.
    Supplied,
    /// The source image's own alpha channel.
    EmbeddedAlpha,
}

impl fmt::Display for MaskSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("none"),
            Self::Supplied => f.write_str("supplied"),
            Self::EmbeddedAlpha => f.write_str("embedded alpha"),
        }
    }
}

/// A decoded source image, tagged by channel layout.
#[derive(Debug, Clone)]
pub enum SourceImage {
    /// Single-channel source.
    Grayscale(GrayImage),
    /// Three-channel source.
    Rgb(RgbImage),
    /// Four-channel source (gray+alpha sources are widened to RGBA).
    Rgba(RgbaImage),
}

impl SourceImage {
    /// Decode raw bytes, keeping any alpha channel.
    ///
    /// Higher bit depths are reduced to 8 bits per channel.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::EmptyInput`] if `bytes` is empty.
    /// Returns [`PipelineError::ImageDecode`] if the image format is
    /// unrecognized or the data is corrupt.
    pub fn decode(bytes: &[u8]) -> Result<Self, PipelineError> {
        if bytes.is_empty() {
            return Err(PipelineError::EmptyInput);
        }
        let img = image::load_from_memory(bytes)?;
        Ok(Self::from_dynamic(&img))
    }

    /// Classify an already decoded image by its channel layout.
    #[must_use]
    pub fn from_dynamic(img: &DynamicImage) -> Self {
        let color = img.color();
        if color.has_alpha() {
            Self::Rgba(img.to_rgba8())
        } else if color.has_color() {
            Self::Rgb(img.to_rgb8())
        } else {
            Self::Grayscale(img.to_luma8())
        }
    }

    /// The layout tag of this source.
    #[must_use]
    pub const fn layout(&self) -> SourceLayout {
        match self {
            Self::Grayscale(_) => SourceLayout::Grayscale,
            Self::Rgb(_) => SourceLayout::Rgb,
            Self::Rgba(_) => SourceLayout::Rgba,
        }
    }

    /// Source dimensions in pixels.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        let (width, height) = match self {
            Self::Grayscale(img) => img.dimensions(),
            Self::Rgb(img) => img.dimensions(),
            Self::Rgba(img) => img.dimensions(),
        };
        Dimensions { width, height }
    }

    /// Split into a colour grid and a mask.
    ///
    /// `supplied_mask` is only decoded when the source has no alpha
    /// channel of its own; for RGBA sources it is ignored entirely.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ImageDecode`] or
    /// [`PipelineError::EmptyInput`] if a needed supplied mask cannot be
    /// decoded.
    pub fn resolve(self, supplied_mask: Option<&[u8]>) -> Result<Resolved, PipelineError> {
        let layout = self.layout();
        let (color, mask, mask_source) = match self {
            Self::Grayscale(gray) => {
                let color = RgbImage::from_fn(gray.width(), gray.height(), |x, y| {
                    let Luma([l]) = *gray.get_pixel(x, y);
                    Rgb([l, l, l])
                });
                let (mask, source) = decode_supplied(supplied_mask)?;
                (color, mask, source)
            }
            Self::Rgb(color) => {
                let (mask, source) = decode_supplied(supplied_mask)?;
                (color, mask, source)
            }
            Self::Rgba(rgba) => {
                let (width, height) = rgba.dimensions();
                let color = RgbImage::from_fn(width, height, |x, y| {
                    let [r, g, b, _] = rgba.get_pixel(x, y).0;
                    Rgb([r, g, b])
                });
                let alpha =
                    GrayImage::from_fn(width, height, |x, y| Luma([rgba.get_pixel(x, y).0[3]]));
                (color, Some(alpha), MaskSource::EmbeddedAlpha)
            }
        };

        Ok(Resolved {
            color,
            mask,
            layout,
            mask_source,
        })
    }
}

/// A colour grid and its (optional) raw mask, before resizing.
#[derive(Debug, Clone)]
pub struct Resolved {
    /// Three-channel colour grid.
    pub color: RgbImage,
    /// Raw 0-255 mask samples, or `None` when no mask is available.
    pub mask: Option<GrayImage>,
    /// Layout of the decoded source.
    pub layout: SourceLayout,
    /// Where `mask` came from.
    pub mask_source: MaskSource,
}

/// Decode raw mask bytes as a single luminance channel.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `bytes` is empty.
/// Returns [`PipelineError::ImageDecode`] if the image cannot be decoded.
pub fn decode_mask(bytes: &[u8]) -> Result<GrayImage, PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::EmptyInput);
    }
    Ok(image::load_from_memory(bytes)?.to_luma8())
}

/// Decode the supplied mask, if there is one.
fn decode_supplied(bytes: Option<&[u8]>) -> Result<(Option<GrayImage>, MaskSource), PipelineError> {
    match bytes {
        Some(bytes) => Ok((Some(decode_mask(bytes)?), MaskSource::Supplied)),
        None => Ok((None, MaskSource::None)),
    }
}

/// Decode a source image and resolve its mask in one step.
///
/// # Errors
///
/// See [`SourceImage::decode`] and [`SourceImage::resolve`].
pub fn load(source: &[u8], supplied_mask: Option<&[u8]>) -> Result<Resolved, PipelineError> {
    SourceImage::decode(source)?.resolve(supplied_mask)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use image::{ExtendedColorType, ImageEncoder, Rgba};

    use super::*;

    /// Helper: encode raw pixels as a PNG byte buffer.
    pub(crate) fn encode_png(
        raw: &[u8],
        width: u32,
        height: u32,
        color: ExtendedColorType,
    ) -> Vec<u8> {
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        encoder.write_image(raw, width, height, color).unwrap();
        buf
    }

    pub(crate) fn rgb_png(img: &RgbImage) -> Vec<u8> {
        encode_png(img.as_raw(), img.width(), img.height(), ExtendedColorType::Rgb8)
    }

    pub(crate) fn rgba_png(img: &RgbaImage) -> Vec<u8> {
        encode_png(img.as_raw(), img.width(), img.height(), ExtendedColorType::Rgba8)
    }

    pub(crate) fn gray_png(img: &GrayImage) -> Vec<u8> {
        encode_png(img.as_raw(), img.width(), img.height(), ExtendedColorType::L8)
    }

    #[test]
    fn empty_input_returns_error() {
        let result = SourceImage::decode(&[]);
        assert!(matches!(result, Err(PipelineError::EmptyInput)));
    }

    #[test]
    fn corrupt_bytes_returns_image_decode_error() {
        let result = SourceImage::decode(&[0xFF, 0xFE, 0x00, 0x01]);
        assert!(matches!(result, Err(PipelineError::ImageDecode(_))));
    }

    #[test]
    fn grayscale_source_expands_to_rgb() {
        let gray = GrayImage::from_fn(3, 2, |x, _| Luma([u8::try_from(x * 100).unwrap()]));
        let source = SourceImage::decode(&gray_png(&gray)).unwrap();
        assert_eq!(source.layout(), SourceLayout::Grayscale);

        let resolved = source.resolve(None).unwrap();
        assert_eq!(resolved.color.dimensions(), (3, 2));
        assert_eq!(resolved.color.get_pixel(2, 1).0, [200, 200, 200]);
        assert!(resolved.mask.is_none());
        assert_eq!(resolved.mask_source, MaskSource::None);
    }

    #[test]
    fn grayscale_source_keeps_supplied_mask() {
        let gray = GrayImage::from_pixel(4, 4, Luma([90]));
        let mask = GrayImage::from_pixel(4, 4, Luma([0]));
        let resolved = load(&gray_png(&gray), Some(&gray_png(&mask))).unwrap();
        assert_eq!(resolved.layout, SourceLayout::Grayscale);
        assert_eq!(resolved.mask_source, MaskSource::Supplied);
        assert!(resolved.mask.unwrap().pixels().all(|p| p.0[0] == 0));
    }

    #[test]
    fn rgb_source_is_used_as_is() {
        let rgb = RgbImage::from_pixel(5, 3, Rgb([10, 20, 30]));
        let resolved = load(&rgb_png(&rgb), None).unwrap();
        assert_eq!(resolved.layout, SourceLayout::Rgb);
        assert_eq!(resolved.color, rgb);
        assert!(resolved.mask.is_none());
    }

    #[test]
    fn rgb_source_loads_supplied_mask_as_single_channel() {
        let rgb = RgbImage::from_pixel(5, 3, Rgb([10, 20, 30]));
        // A colour mask is reduced to luminance.
        let mask = RgbImage::from_pixel(5, 3, Rgb([255, 255, 255]));
        let resolved = load(&rgb_png(&rgb), Some(&rgb_png(&mask))).unwrap();
        assert_eq!(resolved.mask_source, MaskSource::Supplied);
        let mask = resolved.mask.unwrap();
        assert_eq!(mask.dimensions(), (5, 3));
        assert!(mask.pixels().all(|p| p.0[0] == 255));
    }

    #[test]
    fn rgba_alpha_overrides_supplied_mask() {
        let rgba = RgbaImage::from_fn(4, 4, |x, _| {
            if x < 2 {
                Rgba([200, 0, 0, 0])
            } else {
                Rgba([200, 0, 0, 255])
            }
        });
        let supplied = GrayImage::from_pixel(4, 4, Luma([255]));
        let resolved = load(&rgba_png(&rgba), Some(&gray_png(&supplied))).unwrap();

        assert_eq!(resolved.layout, SourceLayout::Rgba);
        assert_eq!(resolved.mask_source, MaskSource::EmbeddedAlpha);
        assert_eq!(resolved.color.get_pixel(0, 0).0, [200, 0, 0]);
        let mask = resolved.mask.unwrap();
        assert_eq!(mask.get_pixel(0, 0).0[0], 0);
        assert_eq!(mask.get_pixel(3, 3).0[0], 255);
    }

    #[test]
    fn rgba_source_never_decodes_supplied_mask() {
        let rgba = RgbaImage::from_pixel(2, 2, Rgba([1, 2, 3, 255]));
        // Garbage mask bytes would fail to decode if they were touched.
        let resolved = load(&rgba_png(&rgba), Some(&[0xDE, 0xAD])).unwrap();
        assert_eq!(resolved.mask_source, MaskSource::EmbeddedAlpha);
    }

    #[test]
    fn corrupt_supplied_mask_is_an_error_for_rgb_sources() {
        let rgb = RgbImage::from_pixel(2, 2, Rgb([1, 2, 3]));
        let result = load(&rgb_png(&rgb), Some(&[0xDE, 0xAD]));
        assert!(matches!(result, Err(PipelineError::ImageDecode(_))));
    }

    #[test]
    fn gray_alpha_source_is_treated_as_rgba() {
        let raw: Vec<u8> = [[50, 0], [50, 255], [50, 255], [50, 0]].concat();
        let png = encode_png(&raw, 2, 2, ExtendedColorType::La8);
        let source = SourceImage::decode(&png).unwrap();
        assert_eq!(source.layout(), SourceLayout::Rgba);

        let resolved = source.resolve(None).unwrap();
        assert_eq!(resolved.color.get_pixel(1, 0).0, [50, 50, 50]);
        let mask = resolved.mask.unwrap();
        assert_eq!(mask.get_pixel(0, 0).0[0], 0);
        assert_eq!(mask.get_pixel(1, 0).0[0], 255);
    }

    #[test]
    fn dimensions_match_input() {
        let rgb = RgbImage::from_pixel(17, 31, Rgb([128, 64, 32]));
        let source = SourceImage::decode(&rgb_png(&rgb)).unwrap();
        assert_eq!(source.dimensions(), Dimensions::new(17, 31));
    }
}

//! hueloop-pipeline: Pure hue-wave animation pipeline (sans-IO).
//!
//! Turns one still image into a sequence of palette frames whose hue
//! travels across the picture as a wave:
//! decode -> normalize -> phase field -> frame synthesis.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! byte slices and returns structured data. Reading files and writing
//! the animated output live in `hueloop` and `hueloop-export`.

pub mod color;
pub mod decode;
pub mod diagnostics;
pub mod frame;
pub mod normalize;
pub mod phase;
pub mod resize;
pub mod types;

pub use decode::{MaskSource, Resolved, SourceImage, SourceLayout};
pub use frame::FrameSynthesizer;
pub use normalize::{Normalized, Stencil, SvPlanes};
pub use phase::PhaseField;
pub use resize::ResizeFilter;
pub use types::{
    Animation, Dimensions, Frame, HUE_MAX, PALETTE_SIZE, PipelineConfig, PipelineError,
    TRANSPARENT_INDEX,
};

/// Run the full pipeline.
///
/// Takes raw source image bytes (PNG, JPEG, BMP, WebP), optional raw
/// mask bytes, and a configuration, then produces an [`Animation`] of
/// `config.total_frames()` palette frames ready for export.
///
/// # Pipeline steps
///
/// 1. Validate the configuration
/// 2. Decode the source and resolve the mask (embedded alpha wins)
/// 3. Resize to the working resolution, threshold the mask into a
///    stencil, split out saturation/value
/// 4. Build the static phase field
/// 5. Synthesize, quantize and stencil every frame
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] if the configuration is
/// invalid; nothing is decoded in that case.
/// Returns [`PipelineError::EmptyInput`] if `source` is empty.
/// Returns [`PipelineError::ImageDecode`] if the source (or a needed
/// mask) cannot be decoded.
/// Returns [`PipelineError::DimensionMismatch`] if the mask cannot be
/// brought to the working resolution.
pub fn process(
    source: &[u8],
    mask: Option<&[u8]>,
    config: &PipelineConfig,
) -> Result<Animation, PipelineError> {
    // 1. Validate before touching pixel data.
    config.validate()?;

    // 2. Decode and resolve the mask.
    let resolved = decode::load(source, mask)?;

    // 3. Working resolution, stencil, saturation/value.
    let normalized = normalize::normalize(&resolved, config.max_px, config.resize_filter)?;

    // 4. Static phase field.
    let phase = PhaseField::new(
        normalized.dimensions,
        config.spatial_frequency_x,
        config.spatial_frequency_y,
    );

    // 5. Frames.
    Ok(animate(&normalized, &phase, config))
}

/// Synthesize every frame of the animation from the per-run constants.
///
/// `config` is assumed to be valid (see [`PipelineConfig::validate`]).
#[must_use]
pub fn animate(normalized: &Normalized, phase: &PhaseField, config: &PipelineConfig) -> Animation {
    let synthesizer = FrameSynthesizer {
        phase,
        planes: &normalized.planes,
        stencil: &normalized.stencil,
        time_frequency: config.time_frequency,
        fps: config.fps,
        sample_factor: config.quantizer_sample_factor,
    };
    let frames = synthesizer.synthesize_all(config.total_frames());

    Animation {
        frames,
        dimensions: normalized.dimensions,
        delay_ms: config.frame_delay_ms(),
        loop_count: config.loop_count,
        transparent_index: TRANSPARENT_INDEX,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use image::{GrayImage, Luma, Rgb, RgbImage, Rgba, RgbaImage};

    use super::*;
    use crate::decode::tests::{gray_png, rgb_png, rgba_png};

    fn short_config() -> PipelineConfig {
        PipelineConfig {
            duration_seconds: 0.3,
            fps: 10,
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn process_empty_input() {
        let result = process(&[], None, &PipelineConfig::default());
        assert!(matches!(result, Err(PipelineError::EmptyInput)));
    }

    #[test]
    fn process_corrupt_input() {
        let result = process(&[0xFF, 0x00], None, &PipelineConfig::default());
        assert!(matches!(result, Err(PipelineError::ImageDecode(_))));
    }

    #[test]
    fn process_rejects_zero_frames_before_decoding() {
        let config = PipelineConfig {
            duration_seconds: 0.0,
            ..PipelineConfig::default()
        };
        let result = process(&[], None, &config);
        assert!(matches!(result, Err(PipelineError::InvalidConfig(_))));
    }

    #[test]
    fn solid_source_without_mask_is_fully_opaque() {
        let png = rgb_png(&RgbImage::from_pixel(10, 10, Rgb([220, 30, 30])));
        let animation = process(&png, None, &short_config()).unwrap();

        assert_eq!(animation.dimensions, Dimensions::new(10, 10));
        assert_eq!(animation.frames.len(), 3);
        assert_eq!(animation.delay_ms, 100);
        assert_eq!(animation.transparent_index, TRANSPARENT_INDEX);
        for frame in &animation.frames {
            assert_eq!(frame.dimensions, animation.dimensions);
            assert!(frame.indices.iter().all(|&i| i != TRANSPARENT_INDEX));
        }
    }

    #[test]
    fn one_second_at_ten_fps_has_ten_frames() {
        let png = rgb_png(&RgbImage::from_pixel(4, 4, Rgb([0, 90, 200])));
        let config = PipelineConfig {
            duration_seconds: 1.0,
            fps: 10,
            ..PipelineConfig::default()
        };
        let animation = process(&png, None, &config).unwrap();
        assert_eq!(animation.frames.len(), 10);
        assert_eq!(animation.delay_ms, 100);
    }

    #[test]
    fn large_source_is_bounded_by_max_px() {
        let png = rgb_png(&RgbImage::from_pixel(200, 100, Rgb([10, 200, 10])));
        let config = PipelineConfig {
            max_px: 100,
            ..short_config()
        };
        let animation = process(&png, None, &config).unwrap();
        assert_eq!(animation.dimensions, Dimensions::new(100, 50));
        assert!(animation.frames.iter().all(|f| f.indices.len() == 5000));
    }

    #[test]
    fn supplied_mask_marks_dark_pixels_transparent() {
        let png = rgb_png(&RgbImage::from_pixel(8, 8, Rgb([120, 60, 200])));
        let mask = GrayImage::from_fn(8, 8, |_, y| if y < 4 { Luma([0]) } else { Luma([255]) });
        let animation = process(&png, Some(&gray_png(&mask)), &short_config()).unwrap();

        for frame in &animation.frames {
            for x in 0..8 {
                assert_eq!(frame.index_at(x, 0), Some(TRANSPARENT_INDEX));
                assert_ne!(frame.index_at(x, 7), Some(TRANSPARENT_INDEX));
            }
        }
    }

    #[test]
    fn embedded_alpha_wins_over_supplied_mask() {
        // Alpha makes the left column a hole; the supplied mask would
        // make everything a hole.
        let rgba = RgbaImage::from_fn(6, 6, |x, _| {
            if x == 0 {
                Rgba([50, 50, 250, 0])
            } else {
                Rgba([50, 50, 250, 255])
            }
        });
        let supplied = GrayImage::from_pixel(6, 6, Luma([0]));
        let animation = process(&rgba_png(&rgba), Some(&gray_png(&supplied)), &short_config())
            .unwrap();

        for frame in &animation.frames {
            assert_eq!(frame.index_at(0, 3), Some(TRANSPARENT_INDEX));
            assert_ne!(frame.index_at(5, 3), Some(TRANSPARENT_INDEX));
        }
    }

    #[test]
    fn identical_inputs_give_identical_frames() {
        let img = RgbImage::from_fn(9, 7, |x, y| {
            Rgb([
                u8::try_from(x * 25).unwrap(),
                u8::try_from(y * 30).unwrap(),
                128,
            ])
        });
        let png = rgb_png(&img);
        let config = PipelineConfig {
            time_frequency: 2.0,
            spatial_frequency_x: 1.0,
            spatial_frequency_y: -1.0,
            ..short_config()
        };
        let a = process(&png, None, &config).unwrap();
        let b = process(&png, None, &config).unwrap();
        assert_eq!(a, b);
    }
}

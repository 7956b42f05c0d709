//! Per-frame hue-wave synthesis.
//!
//! Each frame:
//!
//! 1. samples the wave at `t = index / fps`,
//! 2. wraps `f * t - phase` into `[0, 1)` and scales it to a hue in
//!    `0..HUE_MAX`,
//! 3. recombines that hue with the fixed saturation/value planes into
//!    RGBA (alpha is always 255),
//! 4. quantizes to a palette image, and
//! 5. stamps [`TRANSPARENT_INDEX`] over every stencilled pixel.
//!
//! Step 5 must come after step 4: the quantizer is free to hand out any
//! palette slot on every frame, so the sentinel is only guaranteed if it
//! is written into the index buffer afterwards. The quantizer is also
//! limited to `PALETTE_SIZE - 1` colours, which keeps the sentinel slot
//! out of reach for opaque pixels.

use color_quant::NeuQuant;
use rayon::prelude::*;

use crate::color::hsv_to_rgb;
use crate::normalize::{Stencil, SvPlanes};
use crate::phase::{PhaseField, wrap_unit};
use crate::types::{Dimensions, Frame, HUE_MAX, PALETTE_SIZE, TRANSPARENT_INDEX};

/// Colours the quantizer may allocate; the last slot is the sentinel.
const QUANTIZED_COLORS: usize = PALETTE_SIZE - 1;

/// Time in seconds of frame `index` at `fps` frames per second.
#[must_use]
pub fn frame_time(index: u32, fps: u32) -> f64 {
    f64::from(index) / f64::from(fps.max(1))
}

/// Hue plane for time `t`: `floor(HUE_MAX * wrap(f * t - phase))`.
///
/// Every value is in `0..HUE_MAX`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn hue_plane(phase: &PhaseField, time_frequency: f64, t: f64) -> Vec<u8> {
    let ft = time_frequency * t;
    let scale = f64::from(HUE_MAX);
    phase
        .values()
        .iter()
        .map(|&p| (scale * wrap_unit(ft - p)).floor() as u8)
        .collect()
}

/// Recombine a hue plane with saturation/value into RGBA bytes.
#[must_use]
pub fn compose_rgba(hue: &[u8], planes: &SvPlanes) -> Vec<u8> {
    let mut rgba = Vec::with_capacity(hue.len() * 4);
    for ((&h, &s), &v) in hue.iter().zip(&planes.saturation).zip(&planes.value) {
        let [r, g, b] = hsv_to_rgb([h, s, v]);
        rgba.extend_from_slice(&[r, g, b, u8::MAX]);
    }
    rgba
}

/// A palette image produced by [`quantize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quantized {
    /// Flat RGB palette, `3 * PALETTE_SIZE` bytes. The sentinel slot is black.
    pub palette: Vec<u8>,
    /// One palette index per pixel, all below [`TRANSPARENT_INDEX`].
    pub indices: Vec<u8>,
}

/// Reduce RGBA pixels to a palette image with NeuQuant.
///
/// `sample_factor` trades quality (1) for speed (30).
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn quantize(rgba: &[u8], sample_factor: i32) -> Quantized {
    let quantizer = NeuQuant::new(sample_factor, QUANTIZED_COLORS, rgba);

    let mut palette = quantizer.color_map_rgb();
    palette.resize(PALETTE_SIZE * 3, 0);

    // index_of never exceeds QUANTIZED_COLORS - 1, so the cast is lossless.
    let indices = rgba
        .chunks_exact(4)
        .map(|pixel| quantizer.index_of(pixel) as u8)
        .collect();

    Quantized { palette, indices }
}

/// Overwrite the index of every stencilled pixel with the sentinel.
pub fn apply_stencil(indices: &mut [u8], stencil: &Stencil) {
    for (index, &transparent) in indices.iter_mut().zip(stencil.as_slice()) {
        if transparent {
            *index = TRANSPARENT_INDEX;
        }
    }
}

/// Renders frames from the per-run constants.
///
/// Holds only shared references, so frames can be rendered in any
/// order or in parallel.
#[derive(Debug, Clone, Copy)]
pub struct FrameSynthesizer<'a> {
    /// Static spatial phase.
    pub phase: &'a PhaseField,
    /// Saturation/value planes reused by every frame.
    pub planes: &'a SvPlanes,
    /// Transparency stencil reused by every frame.
    pub stencil: &'a Stencil,
    /// Temporal frequency `f` in cycles per second.
    pub time_frequency: f64,
    /// Frames per second.
    pub fps: u32,
    /// NeuQuant sampling factor.
    pub sample_factor: i32,
}

impl FrameSynthesizer<'_> {
    /// Working dimensions of the frames this synthesizer produces.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        self.phase.dimensions()
    }

    /// Hue plane of frame `index`.
    #[must_use]
    pub fn hue(&self, index: u32) -> Vec<u8> {
        hue_plane(self.phase, self.time_frequency, frame_time(index, self.fps))
    }

    /// Render frame `index`.
    #[must_use]
    pub fn synthesize(&self, index: u32) -> Frame {
        let hue = self.hue(index);
        let rgba = compose_rgba(&hue, self.planes);
        let Quantized {
            palette,
            mut indices,
        } = quantize(&rgba, self.sample_factor);
        apply_stencil(&mut indices, self.stencil);

        Frame {
            dimensions: self.dimensions(),
            palette,
            indices,
            transparent_index: TRANSPARENT_INDEX,
        }
    }

    /// Render frames `0..count` in playback order.
    ///
    /// Frames are independent and rendered in parallel; the result is
    /// identical to rendering them one by one.
    #[must_use]
    pub fn synthesize_all(&self, count: u32) -> Vec<Frame> {
        (0..count)
            .into_par_iter()
            .map(|index| self.synthesize(index))
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use image::{GrayImage, Luma, Rgb, RgbImage};

    use super::*;

    struct Fixture {
        phase: PhaseField,
        planes: SvPlanes,
        stencil: Stencil,
    }

    impl Fixture {
        fn new(dimensions: Dimensions, stencil: Stencil) -> Self {
            let color = RgbImage::from_fn(dimensions.width, dimensions.height, |x, y| {
                Rgb([
                    u8::try_from((x * 37) % 256).unwrap(),
                    200,
                    u8::try_from((y * 53) % 256).unwrap(),
                ])
            });
            Self {
                phase: PhaseField::new(dimensions, 1.0, -1.0),
                planes: SvPlanes::from_rgb(&color),
                stencil,
            }
        }

        fn synthesizer(&self) -> FrameSynthesizer<'_> {
            FrameSynthesizer {
                phase: &self.phase,
                planes: &self.planes,
                stencil: &self.stencil,
                time_frequency: 2.0,
                fps: 10,
                sample_factor: 10,
            }
        }
    }

    fn checkerboard_stencil(dimensions: Dimensions) -> Stencil {
        let mask = GrayImage::from_fn(dimensions.width, dimensions.height, |x, y| {
            if (x + y) % 2 == 0 { Luma([0]) } else { Luma([255]) }
        });
        Stencil::from_mask(&mask, dimensions).unwrap()
    }

    #[test]
    fn frame_time_divides_by_fps() {
        assert!((frame_time(15, 30) - 0.5).abs() < f64::EPSILON);
        assert!(frame_time(0, 30).abs() < f64::EPSILON);
    }

    #[test]
    fn hue_is_always_below_hue_max() {
        let phase = PhaseField::new(Dimensions::new(23, 19), 3.7, -2.9);
        for index in 0..40 {
            let hue = hue_plane(&phase, -1.3, frame_time(index, 7));
            assert_eq!(hue.len(), 23 * 19);
            assert!(hue.iter().all(|&h| h < HUE_MAX), "frame {index}");
        }
    }

    #[test]
    fn hue_wraps_negative_phase() {
        // Single pixel row: phases 0, 0.25, 0.5, 0.75 at t = 0.
        let phase = PhaseField::new(Dimensions::new(4, 1), 1.0, 0.0);
        let hue = hue_plane(&phase, 0.0, 0.0);
        // theta = wrap(-p) = 0, 0.75, 0.5, 0.25
        assert_eq!(hue, vec![0, 134, 89, 44]);
    }

    #[test]
    fn hue_advances_with_time() {
        let phase = PhaseField::new(Dimensions::new(1, 1), 0.0, 0.0);
        // f * t = 0.5 -> floor(179 * 0.5) = 89
        assert_eq!(hue_plane(&phase, 1.0, 0.5), vec![89]);
        // f * t = 1.0 wraps back to 0
        assert_eq!(hue_plane(&phase, 1.0, 1.0), vec![0]);
    }

    #[test]
    fn hue_is_deterministic() {
        let fixture = Fixture::new(Dimensions::new(16, 12), Stencil::opaque(Dimensions::new(16, 12)));
        let synth = fixture.synthesizer();
        for index in [0, 3, 17] {
            assert_eq!(synth.hue(index), synth.hue(index));
        }
    }

    #[test]
    fn compose_keeps_alpha_opaque() {
        let planes = SvPlanes {
            saturation: vec![255, 0],
            value: vec![255, 100],
        };
        let rgba = compose_rgba(&[0, 60], &planes);
        assert_eq!(rgba, vec![255, 0, 0, 255, 100, 100, 100, 255]);
    }

    #[test]
    fn quantize_reserves_sentinel_slot() {
        let rgba: Vec<u8> = (0..64u8)
            .flat_map(|i| [i * 4, 255 - i * 4, i, 255])
            .collect();
        let quantized = quantize(&rgba, 1);
        assert_eq!(quantized.palette.len(), PALETTE_SIZE * 3);
        assert_eq!(quantized.indices.len(), 64);
        assert!(quantized.indices.iter().all(|&i| i != TRANSPARENT_INDEX));
        assert_eq!(&quantized.palette[PALETTE_SIZE * 3 - 3..], &[0, 0, 0]);
    }

    #[test]
    fn quantize_solid_color_maps_to_close_entry() {
        let rgba: Vec<u8> = std::iter::repeat_n([30u8, 140, 220, 255], 100)
            .flatten()
            .collect();
        let quantized = quantize(&rgba, 10);
        let first = quantized.indices[0];
        assert!(quantized.indices.iter().all(|&i| i == first));
        let start = usize::from(first) * 3;
        let entry = &quantized.palette[start..start + 3];
        for (got, want) in entry.iter().zip([30u8, 140, 220]) {
            assert!(got.abs_diff(want) <= 8, "palette {entry:?} too far from source");
        }
    }

    #[test]
    fn apply_stencil_only_touches_transparent_pixels() {
        let stencil = checkerboard_stencil(Dimensions::new(2, 2));
        let mut indices = vec![1, 2, 3, 4];
        apply_stencil(&mut indices, &stencil);
        assert_eq!(indices, vec![TRANSPARENT_INDEX, 2, 3, TRANSPARENT_INDEX]);
    }

    #[test]
    fn stencilled_pixels_are_transparent_in_every_frame() {
        let dims = Dimensions::new(12, 9);
        let fixture = Fixture::new(dims, checkerboard_stencil(dims));
        let synth = fixture.synthesizer();
        for index in 0..6 {
            let frame = synth.synthesize(index);
            assert_eq!(frame.transparent_index, TRANSPARENT_INDEX);
            for y in 0..dims.height {
                for x in 0..dims.width {
                    let idx = frame.index_at(x, y).unwrap();
                    if fixture.stencil.is_transparent(x, y) {
                        assert_eq!(idx, TRANSPARENT_INDEX, "frame {index} ({x}, {y})");
                    } else {
                        assert_ne!(idx, TRANSPARENT_INDEX, "frame {index} ({x}, {y})");
                    }
                }
            }
        }
    }

    #[test]
    fn opaque_stencil_never_produces_sentinel() {
        let dims = Dimensions::new(10, 10);
        let fixture = Fixture::new(dims, Stencil::opaque(dims));
        let frame = fixture.synthesizer().synthesize(4);
        assert!(frame.indices.iter().all(|&i| i != TRANSPARENT_INDEX));
        assert_eq!(frame.dimensions, dims);
        assert_eq!(frame.palette.len(), PALETTE_SIZE * 3);
    }

    #[test]
    fn parallel_synthesis_matches_sequential() {
        let dims = Dimensions::new(8, 6);
        let fixture = Fixture::new(dims, checkerboard_stencil(dims));
        let synth = fixture.synthesizer();
        let parallel = synth.synthesize_all(5);
        let sequential: Vec<Frame> = (0..5).map(|i| synth.synthesize(i)).collect();
        assert_eq!(parallel, sequential);
    }
}

//! Animated GIF serializer.
//!
//! Writes an [`Animation`] as a looping GIF89a stream. Every frame
//! carries its own local colour table (palette indices are not stable
//! across frames) and marks the animation's sentinel index as its
//! transparency key.
//!
//! ## Timing
//!
//! GIF delays are stored in centiseconds, so the millisecond delay is
//! truncated to `delay_ms / 10` (33 ms -> 3 cs).
//!
//! ## Looping
//!
//! `loop_count == 0` writes the NETSCAPE2.0 extension with an infinite
//! repeat; any other value repeats that many times.
//!
//! Frame disposal is left unspecified, so each frame simply replaces
//! the previous one.
//!
//! This is sans-IO: the caller provides any `std::io::Write`.

use std::borrow::Cow;
use std::io::Write;

use gif::{DisposalMethod, Encoder, Repeat};
use hueloop_pipeline::{Animation, Dimensions, PALETTE_SIZE};

/// Errors that can occur while assembling the animation.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// The animation has no frames.
    #[error("animation has no frames")]
    EmptyAnimation,

    /// A frame does not match the animation's dimensions or buffers.
    #[error("frame {index} is inconsistent: {reason}")]
    InconsistentFrame {
        /// Position of the offending frame.
        index: usize,
        /// What is wrong with it.
        reason: String,
    },

    /// The dimensions do not fit the 16-bit GIF size fields.
    #[error("dimensions {0} exceed the GIF limit of 65535 pixels per axis")]
    DimensionsTooLarge(Dimensions),

    /// The underlying GIF encoder failed.
    #[error("GIF encoding failed: {0}")]
    Gif(#[from] gif::EncodingError),
}

/// Check that `animation` can be serialized: at least one frame, every
/// frame the same size with a full palette and one index per pixel.
///
/// # Errors
///
/// Returns [`ExportError::EmptyAnimation`] or
/// [`ExportError::InconsistentFrame`].
pub fn validate(animation: &Animation) -> Result<(), ExportError> {
    if animation.frames.is_empty() {
        return Err(ExportError::EmptyAnimation);
    }

    let expected = animation.dimensions;
    let pixels = expected.width as usize * expected.height as usize;

    for (index, frame) in animation.frames.iter().enumerate() {
        let reason = if frame.dimensions != expected {
            Some(format!(
                "dimensions {} differ from animation dimensions {expected}",
                frame.dimensions,
            ))
        } else if frame.indices.len() != pixels {
            Some(format!(
                "{} indices for {pixels} pixels",
                frame.indices.len()
            ))
        } else if frame.palette.len() != PALETTE_SIZE * 3 {
            Some(format!(
                "palette has {} bytes, expected {}",
                frame.palette.len(),
                PALETTE_SIZE * 3,
            ))
        } else {
            None
        };
        if let Some(reason) = reason {
            return Err(ExportError::InconsistentFrame { index, reason });
        }
    }
    Ok(())
}

/// Serialize `animation` as a looping GIF into `writer`.
///
/// Nothing is written unless the whole animation passes [`validate`].
/// On an encoder error part of the stream may already have been
/// written, so callers that target files should encode into memory
/// first (see [`to_gif_bytes`]).
///
/// # Errors
///
/// Returns [`ExportError::EmptyAnimation`],
/// [`ExportError::InconsistentFrame`],
/// [`ExportError::DimensionsTooLarge`], or [`ExportError::Gif`].
pub fn write_gif<W: Write>(animation: &Animation, writer: W) -> Result<(), ExportError> {
    validate(animation)?;

    let too_large = || ExportError::DimensionsTooLarge(animation.dimensions);
    let width = u16::try_from(animation.dimensions.width).map_err(|_| too_large())?;
    let height = u16::try_from(animation.dimensions.height).map_err(|_| too_large())?;

    // No global palette: every frame ships its own.
    let mut encoder = Encoder::new(writer, width, height, &[])?;
    encoder.set_repeat(repeat(animation.loop_count))?;

    let delay = delay_centiseconds(animation.delay_ms);
    for frame in &animation.frames {
        let gif_frame = gif::Frame {
            width,
            height,
            delay,
            dispose: DisposalMethod::Any,
            transparent: Some(animation.transparent_index),
            palette: Some(frame.palette.clone()),
            buffer: Cow::Borrowed(&frame.indices),
            ..gif::Frame::default()
        };
        encoder.write_frame(&gif_frame)?;
    }
    Ok(())
}

/// Serialize `animation` into an in-memory GIF.
///
/// # Errors
///
/// Same as [`write_gif`].
pub fn to_gif_bytes(animation: &Animation) -> Result<Vec<u8>, ExportError> {
    let mut buf = Vec::new();
    write_gif(animation, &mut buf)?;
    Ok(buf)
}

/// GIF delay field for a millisecond delay, saturating at `u16::MAX`.
#[must_use]
pub fn delay_centiseconds(delay_ms: u32) -> u16 {
    u16::try_from(delay_ms / 10).unwrap_or(u16::MAX)
}

/// NETSCAPE loop setting for a repeat count (`0` = forever).
const fn repeat(loop_count: u16) -> Repeat {
    match loop_count {
        0 => Repeat::Infinite,
        n => Repeat::Finite(n),
    }
}

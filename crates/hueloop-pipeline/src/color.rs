//! 8-bit HSV colour conversion.
//!
//! Uses the compact 8-bit convention where hue is stored as
//! degrees / 2 (`0..180`) and saturation/value span `0..=255`.
//! Only hue is rewritten per frame, so the forward conversion mainly
//! matters for the saturation and value planes it produces.

/// Number of hue steps in a full turn under the 8-bit convention.
const HUE_STEPS: u16 = 180;

/// Convert an RGB pixel to `[hue, saturation, value]`.
///
/// Hue is in `0..180`; achromatic pixels get hue 0.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn rgb_to_hsv([r, g, b]: [u8; 3]) -> [u8; 3] {
    let v = r.max(g).max(b);
    let min = r.min(g).min(b);
    let diff = v - min;

    let s = if v == 0 {
        0
    } else {
        // Rounded 255 * diff / v; never exceeds 255 since diff <= v.
        ((u32::from(diff) * 255 + u32::from(v) / 2) / u32::from(v)) as u8
    };

    if diff == 0 {
        return [0, s, v];
    }

    let (rf, gf, bf, d) = (
        f32::from(r),
        f32::from(g),
        f32::from(b),
        f32::from(diff),
    );
    let mut degrees = if v == r {
        60.0 * (gf - bf) / d
    } else if v == g {
        120.0 + 60.0 * (bf - rf) / d
    } else {
        240.0 + 60.0 * (rf - gf) / d
    };
    if degrees < 0.0 {
        degrees += 360.0;
    }

    let h = (degrees / 2.0).round() as u16 % HUE_STEPS;
    [h as u8, s, v]
}

/// Convert `[hue, saturation, value]` back to an RGB pixel.
///
/// Hues at or above 180 wrap around.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn hsv_to_rgb([h, s, v]: [u8; 3]) -> [u8; 3] {
    let v = f32::from(v) / 255.0;
    if s == 0 {
        let gray = (v * 255.0).round() as u8;
        return [gray, gray, gray];
    }
    let s = f32::from(s) / 255.0;

    // Six 30-step sectors per turn.
    let h = f32::from(u16::from(h) % HUE_STEPS) / 30.0;
    let sector = h.floor();
    let f = h - sector;

    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));

    let (r, g, b) = match sector as u8 {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    };

    let to_byte = |c: f32| (c * 255.0).round().clamp(0.0, 255.0) as u8;
    [to_byte(r), to_byte(g), to_byte(b)]
}

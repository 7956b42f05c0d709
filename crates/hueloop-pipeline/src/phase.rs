//! Static spatial phase of the travelling hue wave.
//!
//! The wave at pixel `(x, y)` and time `t` has phase
//! `f * t - (kx * x + ky * y)`, with `x` and `y` normalized to `[0, 1)`.
//! The spatial term does not depend on the frame, so it is built once
//! and shared read-only by every frame.

use crate::types::Dimensions;

/// Per-pixel spatial phase `kx * x + ky * y`.
///
/// `x = col / width` and `y = row / height`, so both run over `[0, 1)`.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseField {
    dimensions: Dimensions,
    values: Vec<f64>,
}

impl PhaseField {
    /// Build the field for the given working dimensions and spatial
    /// frequencies.
    #[must_use]
    pub fn new(dimensions: Dimensions, kx: f64, ky: f64) -> Self {
        let Dimensions { width, height } = dimensions;
        let x_step = 1.0 / f64::from(width.max(1));
        let y_step = 1.0 / f64::from(height.max(1));

        let columns: Vec<f64> = (0..width).map(|col| kx * (f64::from(col) * x_step)).collect();

        let mut values = Vec::with_capacity(width as usize * height as usize);
        for row in 0..height {
            let row_term = ky * (f64::from(row) * y_step);
            values.extend(columns.iter().map(|&col_term| col_term + row_term));
        }

        Self { dimensions, values }
    }

    /// Field dimensions.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Row-major phase values.
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Phase at pixel `(x, y)`, or `None` if out of bounds.
    #[must_use]
    pub fn at(&self, x: u32, y: u32) -> Option<f64> {
        if x >= self.dimensions.width || y >= self.dimensions.height {
            return None;
        }
        self.values
            .get(y as usize * self.dimensions.width as usize + x as usize)
            .copied()
    }
}

/// Wrap `value` into `[0, 1)`.
///
/// Negative inputs wrap upward (`-0.25 -> 0.75`). Values within
/// rounding distance below an integer can come back as exactly 1.0
/// from `rem_euclid`; those are folded to 0.0.
#[must_use]
pub fn wrap_unit(value: f64) -> f64 {
    let wrapped = value.rem_euclid(1.0);
    if wrapped >= 1.0 { 0.0 } else { wrapped }
}

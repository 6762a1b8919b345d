// SPDX: CC0-1.0

//! Conversions between math coordinates and pixels.
//!
//! Pixel `y` grows downwards, so larger math `y` maps to smaller `py`.
//! Positions are computed from offsets normalised by the rectangle's span,
//! which keeps tiny and huge spans accurate.

use crate::{MathRect, Number, Point};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub width: Number,
    pub height: Number,
    /// Margin on every side of the drawable area.
    pub padding: Number,
}

impl Viewport {
    pub const fn new(width: Number, height: Number, padding: Number) -> Self {
        Self {
            width,
            height,
            padding,
        }
    }

    // at least one pixel so the mapping stays invertible
    #[inline]
    pub fn inner_width(&self) -> Number {
        (self.width - 2.0 * self.padding).max(1.0)
    }

    #[inline]
    pub fn inner_height(&self) -> Number {
        (self.height - 2.0 * self.padding).max(1.0)
    }
}

pub fn to_pixel(rect: &MathRect, viewport: &Viewport, x: Number, y: Number) -> Point<Number> {
    let tx = (x - rect.x_min) / rect.x_span();
    let ty = (rect.y_max - y) / rect.y_span();
    Point {
        x: viewport.padding + tx * viewport.inner_width(),
        y: viewport.padding + ty * viewport.inner_height(),
    }
}

pub fn to_math(rect: &MathRect, viewport: &Viewport, px: Number, py: Number) -> Point<Number> {
    let tx = (px - viewport.padding) / viewport.inner_width();
    let ty = (py - viewport.padding) / viewport.inner_height();
    Point {
        x: rect.x_min + tx * rect.x_span(),
        y: rect.y_max - ty * rect.y_span(),
    }
}

/// Pixels per math unit along each axis, both positive.
pub fn scale(rect: &MathRect, viewport: &Viewport) -> Point<Number> {
    Point {
        x: viewport.inner_width() / rect.x_span(),
        y: viewport.inner_height() / rect.y_span(),
    }
}

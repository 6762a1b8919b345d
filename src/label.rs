// SPDX: CC0-1.0

use crate::{eval::Expression, map, map::Viewport, MathRect, Number, Point};

/// Horizontal text alignment relative to the label position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Anchor {
    Start,
    Middle,
    End,
}

impl Anchor {
    /// Value of the SVG `text-anchor` attribute.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Middle => "middle",
            Self::End => "end",
        }
    }
}

/// Where to draw a point's label. `(x, y)` is the point in pixels and the
/// text goes at `(x + offset_x, y + offset_y)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LabelPlacement {
    pub x: Number,
    pub y: Number,
    pub anchor: Anchor,
    pub offset_x: Number,
    pub offset_y: Number,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LabelConfig {
    /// Half-width of the central difference, in math units.
    pub delta: Number,
    /// Pixel slopes below this magnitude count as flat.
    pub flat_slope: Number,
    /// Distance between point and label, in pixels.
    pub gap: Number,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            delta: 1e-2,
            flat_slope: 0.5,
            gap: 12.0,
        }
    }
}

impl LabelConfig {
    /// Labels the curve's point at `x`. Where the function is undefined the
    /// point is taken on the x axis, clamped into view.
    pub fn place(
        &self,
        expr: &Expression,
        x: Number,
        rect: &MathRect,
        viewport: &Viewport,
    ) -> LabelPlacement {
        let mut stack = Vec::with_capacity(expr.program().depth());
        let y = expr
            .eval_with(x, &mut stack)
            .unwrap_or_else(|| rect.clamp_y(0.0));
        let d = self.delta;
        let slope = match (
            expr.eval_with(x + d, &mut stack),
            expr.eval_with(x - d, &mut stack),
        ) {
            (Some(right), Some(left)) => Some((right - left) / (2.0 * d)),
            _ => None,
        };
        self.place_at(Point { x, y }, slope, rect, viewport)
    }

    /// Labels a point whose slope (in math units) is already known, or
    /// `None` when it is not.
    pub fn place_at(
        &self,
        point: Point<Number>,
        slope: Option<Number>,
        rect: &MathRect,
        viewport: &Viewport,
    ) -> LabelPlacement {
        let y = rect.clamp_y(point.y);
        let at = map::to_pixel(rect, viewport, point.x, y);
        let gap = self.gap.abs().max(1.0);

        // screen up is positive, so rising curves have a positive slope
        let scale = map::scale(rect, viewport);
        let pixel_slope = slope.map(|s| s * scale.y / scale.x);

        let vertical = if y < rect.y_mid() {
            // lower half: room above
            (Anchor::Middle, 0.0, -gap)
        } else {
            (Anchor::Middle, 0.0, gap)
        };
        let (anchor, offset_x, offset_y) = match pixel_slope {
            Some(s) if s.abs() < self.flat_slope => vertical,
            // a rising curve is below the point on its left
            Some(s) if s > 0.0 => (Anchor::End, -gap, -0.5 * gap),
            Some(s) if s < 0.0 => (Anchor::Start, gap, -0.5 * gap),
            _ => vertical,
        };

        LabelPlacement {
            x: at.x,
            y: at.y,
            anchor,
            offset_x,
            offset_y,
        }
    }
}

pub fn place_label(
    expr: &Expression,
    x: Number,
    rect: &MathRect,
    viewport: &Viewport,
) -> LabelPlacement {
    LabelConfig::default().place(expr, x, rect, viewport)
}

pub fn place_label_at(
    point: Point<Number>,
    slope: Option<Number>,
    rect: &MathRect,
    viewport: &Viewport,
) -> LabelPlacement {
    LabelConfig::default().place_at(point, slope, rect, viewport)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile;

    const VP: Viewport = Viewport::new(400.0, 400.0, 20.0);

    fn rect() -> MathRect {
        MathRect::new(-5.0..5.0, -5.0..5.0).unwrap()
    }

    fn place(src: &str, x: Number) -> LabelPlacement {
        place_label(&compile(src).unwrap(), x, &rect(), &VP)
    }

    #[test]
    fn rising_curve_labels_go_left() {
        let label = place("2x", 1.0);
        assert_eq!(label.anchor, Anchor::End);
        assert!(label.offset_x < 0.0);
    }

    #[test]
    fn falling_curve_labels_go_right() {
        let label = place("-2x", 1.0);
        assert_eq!(label.anchor, Anchor::Start);
        assert!(label.offset_x > 0.0);
    }

    #[test]
    fn flat_curve_labels_go_above_or_below() {
        // vertex in the lower half: above, which is up on screen
        let label = place("x^2 - 4", 0.0);
        assert_eq!(label.anchor, Anchor::Middle);
        assert!(label.offset_y < 0.0);

        let label = place("4 - x^2", 0.0);
        assert_eq!(label.anchor, Anchor::Middle);
        assert!(label.offset_y > 0.0);
    }

    #[test]
    fn slope_is_measured_in_pixels() {
        // slope 0.1 in math units, but the y axis is stretched tenfold
        let rect = MathRect::new(-5.0..5.0, -0.5..0.5).unwrap();
        let label = place_label(&compile("0.1x").unwrap(), 0.0, &rect, &VP);
        assert_eq!(label.anchor, Anchor::End);
    }

    #[test]
    fn undefined_neighbourhood_falls_back_to_vertical() {
        // sqrt(-0.01) is undefined
        let label = place("sqrt(x)", 0.0);
        assert_eq!(label.anchor, Anchor::Middle);
        assert!(label.offset_y != 0.0);
    }

    #[test]
    fn undefined_point_sits_on_the_axis() {
        let label = place("1/x", 0.0);
        let axis = map::to_pixel(&rect(), &VP, 0.0, 0.0);
        assert_eq!((label.x, label.y), (axis.x, axis.y));
    }

    #[test]
    fn known_slope_skips_the_difference() {
        let point = Point { x: 2.0, y: 1.0 };
        let label = place_label_at(point, Some(-3.0), &rect(), &VP);
        assert_eq!(label.anchor, Anchor::Start);
        let label = place_label_at(point, None, &rect(), &VP);
        // upper half: room below
        assert_eq!(label.anchor, Anchor::Middle);
        assert!(label.offset_y > 0.0);
    }

    #[test]
    fn offset_is_never_zero() {
        let config = LabelConfig {
            gap: 0.0,
            ..LabelConfig::default()
        };
        for src in ["x", "-x", "5", "x^3", "tan(x)", "ln(x)", "1/x"] {
            for x in [-4.0, -1.0, 0.0, 0.5, 3.0] {
                let label = config.place(&compile(src).unwrap(), x, &rect(), &VP);
                assert!(
                    (label.offset_x, label.offset_y) != (0.0, 0.0),
                    "{src} at {x}"
                );
            }
        }
    }
}

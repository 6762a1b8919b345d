// SPDX: CC0-1.0

pub mod eval;
pub mod label;
pub mod lex;
pub mod map;
pub mod parse;
pub mod range;
pub mod sample;
pub mod shell;
pub mod stdlib;

use crate::{
    eval::{Expression, Idents},
    label::{LabelConfig, LabelPlacement},
    lex::Lexer,
    map::Viewport,
    parse::ParseErr,
    range::RangeConfig,
    sample::{Polyline, SampleOptions},
};
use core::{fmt, ops::Range};
use std::sync::Arc;

pub type Number = f64;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point<T> {
    pub x: T,
    pub y: T,
}

/// Axis-aligned rectangle in math units. Always `x_min < x_max` and
/// `y_min < y_max` when built through [`MathRect::new`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MathRect {
    pub x_min: Number,
    pub x_max: Number,
    pub y_min: Number,
    pub y_max: Number,
}

impl MathRect {
    pub fn new(x: Range<Number>, y: Range<Number>) -> Option<Self> {
        let rect = Self {
            x_min: x.start,
            x_max: x.end,
            y_min: y.start,
            y_max: y.end,
        };
        rect.is_valid().then_some(rect)
    }

    pub fn is_valid(&self) -> bool {
        // NaN fails both comparisons
        self.x_min < self.x_max
            && self.y_min < self.y_max
            && self.x_span().is_finite()
            && self.y_span().is_finite()
    }

    #[inline]
    pub fn x_span(&self) -> Number {
        self.x_max - self.x_min
    }

    #[inline]
    pub fn y_span(&self) -> Number {
        self.y_max - self.y_min
    }

    #[inline]
    pub fn y_mid(&self) -> Number {
        self.y_min + 0.5 * self.y_span()
    }

    /// Clamps into `[y_min, y_max]` without panicking on a malformed rect.
    #[inline]
    pub fn clamp_y(&self, y: Number) -> Number {
        y.max(self.y_min).min(self.y_max)
    }

    pub fn contains(&self, p: Point<Number>) -> bool {
        (self.x_min..=self.x_max).contains(&p.x) && (self.y_min..=self.y_max).contains(&p.y)
    }
}

impl fmt::Display for MathRect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MathRect")
            .field("x range", &(self.x_min..self.x_max))
            .field("y range", &(self.y_min..self.y_max))
            .finish()
    }
}

/// Compiles `source` against the standard primitives.
pub fn compile(source: &str) -> Result<Expression, ParseErr> {
    compile_with(Arc::new(String::from(source)), stdlib::idents())
}

pub fn compile_with(src: Arc<String>, idents: &Idents) -> Result<Expression, ParseErr> {
    let prog = parse::parse(Lexer::new(&src), idents)?;
    tracing::debug!(source = %src, ops = prog.ops.len(), depth = prog.depth, "compiled expression");
    Ok(Expression::new(src, prog))
}

/// Everything one render pass needs besides the expression and viewport.
#[derive(Clone, Debug)]
pub struct PlotRequest {
    pub domain: Range<Number>,
    /// Explicit y bounds. `None` auto-ranges.
    pub y: Option<Range<Number>>,
    /// Values the auto-ranged y bounds must include, such as limits or 0.
    pub anchors: Vec<Number>,
    /// x-values to annotate.
    pub labels: Vec<Number>,
    pub range: RangeConfig,
    pub sample: SampleOptions,
    pub label: LabelConfig,
}

impl PlotRequest {
    pub fn new(domain: Range<Number>) -> Self {
        Self {
            domain,
            y: None,
            anchors: Vec::new(),
            labels: Vec::new(),
            range: RangeConfig::default(),
            sample: SampleOptions::default(),
            label: LabelConfig::default(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Plot {
    pub rect: MathRect,
    pub polylines: Vec<Polyline>,
    pub labels: Vec<LabelPlacement>,
}

/// Runs the whole pipeline: range, sample, then label placement.
pub fn plot(expr: &Expression, req: &PlotRequest, viewport: &Viewport) -> Plot {
    let rect = req
        .range
        .resolve(expr, req.domain.clone(), req.y.clone(), &req.anchors);
    let polylines = sample::sample(expr, &rect, viewport, &req.sample);
    let labels = req
        .labels
        .iter()
        .map(|&x| req.label.place(expr, x, &rect, viewport))
        .collect();
    tracing::debug!(
        expr = %expr,
        %rect,
        polylines = polylines.len(),
        "plotted expression"
    );
    Plot {
        rect,
        polylines,
        labels,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_rejects_empty_and_reversed_ranges() {
        assert!(MathRect::new(0.0..1.0, 0.0..1.0).is_some());
        assert!(MathRect::new(1.0..1.0, 0.0..1.0).is_none());
        assert!(MathRect::new(0.0..1.0, 2.0..1.0).is_none());
        assert!(MathRect::new(0.0..Number::NAN, 0.0..1.0).is_none());
    }

    #[test]
    fn rect_contains_its_boundary() {
        let rect = MathRect::new(-1.0..1.0, -2.0..2.0).unwrap();
        assert!(rect.contains(Point { x: 1.0, y: -2.0 }));
        assert!(!rect.contains(Point { x: 1.5, y: 0.0 }));
        assert_eq!(rect.y_mid(), 0.0);
    }

    #[test]
    fn plot_annotates_requested_points() {
        let expr = compile("x^2").unwrap();
        let mut req = PlotRequest::new(-2.0..2.0);
        req.labels = vec![-1.0, 0.0, 1.0];
        let plot = plot(&expr, &req, &Viewport::new(400.0, 300.0, 20.0));
        assert_eq!(plot.polylines.len(), 1);
        assert_eq!(plot.labels.len(), 3);
    }
}

// SPDX: CC0-1.0

use crate::{eval::Expression, MathRect, Number};
use core::ops::Range;

/// Fewest samples an auto-ranging pass takes, whatever the config says.
pub const MIN_SAMPLES: usize = 20;

#[derive(Clone, Debug, PartialEq)]
pub struct RangeConfig {
    /// Evenly spaced samples across the domain.
    pub samples: usize,
    /// Padding added above and below, as a fraction of the data span.
    pub pad_fraction: Number,
    /// Padding never drops below this many units. Set it near zero for
    /// functions whose values are tiny.
    pub min_pad: Number,
    /// y range used when the expression is undefined across the domain.
    pub fallback: Range<Number>,
}

impl Default for RangeConfig {
    fn default() -> Self {
        Self {
            samples: 100,
            pad_fraction: 0.2,
            min_pad: 2.0,
            fallback: -10.0..10.0,
        }
    }
}

/// Orders the domain and widens an empty one, falling back to `[-10, 10]`
/// when a bound is not finite.
pub fn normalize_domain(domain: Range<Number>) -> Range<Number> {
    let Range { start, end } = domain;
    if !(start.is_finite() && end.is_finite()) {
        return -10.0..10.0;
    }
    if start < end {
        start..end
    } else if end < start {
        end..start
    } else {
        start - 1.0..end + 1.0
    }
}

impl RangeConfig {
    /// Uses `explicit_y` unchanged when it forms a valid rectangle with the
    /// domain, and auto-ranges otherwise.
    pub fn resolve(
        &self,
        expr: &Expression,
        domain: Range<Number>,
        explicit_y: Option<Range<Number>>,
        anchors: &[Number],
    ) -> MathRect {
        let domain = normalize_domain(domain);
        if let Some(y) = explicit_y {
            if let Some(rect) = MathRect::new(domain.clone(), y.clone()) {
                return rect;
            }
            tracing::warn!(?y, "ignoring invalid explicit y range");
        }
        self.compute(expr, domain, anchors)
    }

    pub fn compute(&self, expr: &Expression, domain: Range<Number>, anchors: &[Number]) -> MathRect {
        let domain = normalize_domain(domain);
        let n = self.samples.max(MIN_SAMPLES);
        let step = (domain.end - domain.start) / (n - 1) as Number;

        let mut stack = Vec::with_capacity(expr.program().depth());
        let values: Vec<Number> = (0..n)
            .map(|i| {
                if i == n - 1 {
                    domain.end
                } else {
                    domain.start + step * i as Number
                }
            })
            .filter_map(|x| expr.eval_with(x, &mut stack))
            .collect();

        if values.is_empty() {
            tracing::warn!(
                expr = %expr,
                ?domain,
                "expression is undefined across the domain, using fallback range"
            );
            let (lo, hi) = envelope(
                [self.fallback.start, self.fallback.end]
                    .into_iter()
                    .chain(anchors.iter().copied()),
            )
            .unwrap_or((-10.0, 10.0));
            return self.rect(domain, lo, hi, 0.0);
        }

        self.fit_values(domain, values.into_iter().chain(anchors.iter().copied()))
    }

    /// Ranges a finite set of y-values, for diagrams made of discrete points.
    pub fn fit_values<I>(&self, domain: Range<Number>, values: I) -> MathRect
    where
        I: IntoIterator<Item = Number>,
    {
        let domain = normalize_domain(domain);
        match envelope(values) {
            Some((lo, hi)) => {
                let pad = ((hi - lo) * self.pad_fraction).max(self.min_pad);
                self.rect(domain, lo, hi, pad)
            }
            None => self.rect(domain, self.fallback.start, self.fallback.end, 0.0),
        }
    }

    fn rect(&self, domain: Range<Number>, lo: Number, hi: Number, pad: Number) -> MathRect {
        let (mut y_min, mut y_max) = (lo - pad, hi + pad);
        if !(y_min < y_max) {
            // flat data with no padding configured
            let pad = (lo.abs() * 0.1).max(1.0);
            y_min = lo - pad;
            y_max = hi + pad;
        }
        let rect = MathRect {
            x_min: domain.start,
            x_max: domain.end,
            y_min,
            y_max,
        };
        if rect.is_valid() {
            return rect;
        }
        tracing::warn!(%rect, "range is not drawable, using [-10, 10]");
        MathRect::new(domain, -10.0..10.0).unwrap_or(MathRect {
            x_min: -10.0,
            x_max: 10.0,
            y_min: -10.0,
            y_max: 10.0,
        })
    }
}

/// Smallest and largest finite value.
fn envelope<I: IntoIterator<Item = Number>>(values: I) -> Option<(Number, Number)> {
    values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

pub fn compute_range(expr: &Expression, domain: Range<Number>, anchors: &[Number]) -> MathRect {
    RangeConfig::default().compute(expr, domain, anchors)
}

pub fn resolve_range(
    expr: &Expression,
    domain: Range<Number>,
    explicit_y: Option<Range<Number>>,
    anchors: &[Number],
) -> MathRect {
    RangeConfig::default().resolve(expr, domain, explicit_y, anchors)
}

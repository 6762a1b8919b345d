// SPDX: CC0-1.0

//! Turns an expression into pixel-space polylines.
//!
//! The domain is walked in equal steps. A sample is visible when it is
//! defined, lies within the y range widened by a slack band, and is not
//! inside the caller's exclusion zone. Each run of visible samples becomes
//! one polyline, so undefined regions and asymptotes show up as gaps rather
//! than as lines joining unrelated branches.

use crate::{
    eval::{Expression, Sample},
    map,
    map::Viewport,
    MathRect, Number, Point,
};
use core::mem;

/// Samples closer than `radius` to `x` are dropped whether or not the
/// function is defined there. Limit diagrams use this to split a curve into
/// left and right branches around the point under study.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Exclusion {
    pub x: Number,
    pub radius: Number,
}

impl Exclusion {
    #[inline]
    pub fn contains(&self, x: Number) -> bool {
        (x - self.x).abs() < self.radius
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SampleOptions {
    /// Number of equal steps across the domain; `step_count + 1` samples.
    pub step_count: usize,
    pub exclusion: Option<Exclusion>,
    /// Extra band above and below the y range, as a fraction of its span.
    pub slack: Number,
    /// Bisection rounds spent locating where a run starts or ends.
    pub refine: u32,
    /// Neighbouring samples further apart than this many pixels, or on
    /// opposite sides of the x axis, are checked for an asymptote between
    /// them.
    pub jump: Number,
}

impl Default for SampleOptions {
    fn default() -> Self {
        Self {
            step_count: 200,
            exclusion: None,
            slack: 0.1,
            refine: 12,
            jump: 4.0,
        }
    }
}

/// Bisection rounds spent deciding whether a steep pair hides a pole.
const POLE_ROUNDS: u32 = 8;

/// A continuous run of projected points. Never empty.
#[derive(Clone, Debug, PartialEq)]
pub struct Polyline {
    points: Vec<Point<Number>>,
}

impl Polyline {
    pub fn points(&self) -> &[Point<Number>] {
        &self.points
    }
}

struct Sampler<'a> {
    expr: &'a Expression,
    rect: &'a MathRect,
    viewport: &'a Viewport,
    opts: &'a SampleOptions,
    band: (Number, Number),
    stack: Vec<Number>,
    open: Vec<Point<Number>>,
    done: Vec<Polyline>,
}

impl Sampler<'_> {
    /// Samples `x`, keeping `y` only where the point is drawn.
    fn visible(&mut self, x: Number) -> Sample {
        if self.opts.exclusion.is_some_and(|ex| ex.contains(x)) {
            return Sample { x, y: None };
        }
        let Sample { x, y } = self.expr.sample(x, &mut self.stack);
        Sample {
            x,
            y: y.filter(|y| (self.band.0..=self.band.1).contains(y)),
        }
    }

    fn push(&mut self, x: Number, y: Number) {
        let y = self.rect.clamp_y(y);
        self.open.push(map::to_pixel(self.rect, self.viewport, x, y));
    }

    fn close(&mut self) {
        if !self.open.is_empty() {
            self.done.push(Polyline {
                points: mem::take(&mut self.open),
            });
        }
    }

    /// Bisects between a visible and an invisible x, returning the visible
    /// point closest to the transition.
    fn edge(&mut self, inside: Number, outside: Number) -> Option<(Number, Number)> {
        let (mut a, mut b) = (inside, outside);
        let mut best = None;
        for _ in 0..self.opts.refine {
            let mid = 0.5 * (a + b);
            match self.visible(mid).y {
                Some(y) => {
                    best = Some((mid, y));
                    a = mid;
                }
                None => b = mid,
            }
        }
        best
    }

    /// Decides whether two visible neighbours sit on different branches.
    ///
    /// Pairs that are close on screen and on the same side of the x axis are
    /// joined without further work. Otherwise the interval is bisected,
    /// always keeping the half with the larger rise. Across a continuous
    /// stretch that rise shrinks with every round; across a pole it does not,
    /// and an undefined point on the way is a split as well.
    fn straddles_asymptote(&mut self, a: Sample, b: Sample) -> bool {
        let (Some(mut ya), Some(mut yb)) = (a.y, b.y) else {
            return false;
        };
        let rise = (yb - ya).abs();
        let pixels = rise * map::scale(self.rect, self.viewport).y;
        let crosses = (ya < 0.0 && yb > 0.0) || (ya > 0.0 && yb < 0.0);
        if pixels <= self.opts.jump && !crosses {
            return false;
        }

        let (mut xa, mut xb) = (a.x, b.x);
        for _ in 0..POLE_ROUNDS {
            let mid = 0.5 * (xa + xb);
            let Some(ym) = self.expr.eval_with(mid, &mut self.stack) else {
                return true;
            };
            if (ym - ya).abs() >= (yb - ym).abs() {
                (xb, yb) = (mid, ym);
            } else {
                (xa, ya) = (mid, ym);
            }
        }
        (yb - ya).abs() > 0.5 * rise
    }

    fn run(mut self) -> Vec<Polyline> {
        let n = self.opts.step_count.max(1);
        let step = self.rect.x_span() / n as Number;

        let mut prev: Option<Sample> = None;
        for i in 0..=n {
            let x = if i == n {
                self.rect.x_max
            } else {
                self.rect.x_min + step * i as Number
            };
            let cur = self.visible(x);

            match (prev, cur.y) {
                (None, Some(y)) => self.push(x, y),

                // run starts after a gap
                (Some(Sample { x: gap_x, y: None }), Some(y)) => {
                    if let Some((ex, ey)) = self.edge(x, gap_x) {
                        self.push(ex, ey);
                    }
                    self.push(x, y);
                }

                (Some(last), Some(y)) => {
                    if self.straddles_asymptote(last, cur) {
                        tracing::debug!(x0 = last.x, x1 = x, "split at asymptote");
                        self.close();
                    }
                    self.push(x, y);
                }

                // run ends before a gap
                (Some(Sample { x: px, y: Some(_) }), None) => {
                    if let Some((ex, ey)) = self.edge(px, x) {
                        self.push(ex, ey);
                    }
                    self.close();
                }

                (_, None) => {}
            }

            prev = Some(cur);
        }

        self.close();
        self.done
    }
}

pub fn sample(
    expr: &Expression,
    rect: &MathRect,
    viewport: &Viewport,
    opts: &SampleOptions,
) -> Vec<Polyline> {
    let slack = opts.slack.max(0.0) * rect.y_span();
    let sampler = Sampler {
        expr,
        rect,
        viewport,
        opts,
        band: (rect.y_min - slack, rect.y_max + slack),
        stack: Vec::with_capacity(expr.program().depth()),
        open: Vec::new(),
        done: Vec::new(),
    };
    let polylines = sampler.run();
    tracing::debug!(
        expr = %expr,
        steps = opts.step_count,
        polylines = polylines.len(),
        "sampled expression"
    );
    polylines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile;

    const VP: Viewport = Viewport::new(500.0, 400.0, 25.0);

    fn math_xs(line: &Polyline, rect: &MathRect) -> Vec<Number> {
        line.points()
            .iter()
            .map(|p| map::to_math(rect, &VP, p.x, p.y).x)
            .collect()
    }

    fn run(src: &str, rect: &MathRect, opts: &SampleOptions) -> Vec<Polyline> {
        sample(&compile(src).unwrap(), rect, &VP, opts)
    }

    #[test]
    fn reciprocal_splits_at_zero() {
        let rect = MathRect::new(-2.0..2.0, -10.0..10.0).unwrap();
        for step_count in [150, 200, 201, 300] {
            let opts = SampleOptions {
                step_count,
                ..SampleOptions::default()
            };
            let lines = run("1/x", &rect, &opts);
            assert_eq!(lines.len(), 2, "step_count {step_count}");
            for line in &lines {
                for x in math_xs(line, &rect) {
                    assert!(x.abs() > 0.05, "point at x = {x}");
                }
            }
        }
    }

    #[test]
    fn x_is_monotonic_and_within_domain() {
        let rect = MathRect::new(-6.0..6.0, -4.0..4.0).unwrap();
        for src in ["tan(x)", "1/(x^2-1)", "sqrt(4-x^2)", "ln(x)", "sin(x)/x"] {
            for line in run(src, &rect, &SampleOptions::default()) {
                let px: Vec<Number> = line.points().iter().map(|p| p.x).collect();
                assert!(px.windows(2).all(|w| w[0] <= w[1]), "{src}");
                for x in math_xs(&line, &rect) {
                    assert!((-6.0 - 1e-9..=6.0 + 1e-9).contains(&x), "{src}: {x}");
                }
            }
        }
    }

    #[test]
    fn continuous_function_is_one_polyline() {
        let rect = MathRect::new(-1.0..4.0, -2.0..8.0).unwrap();
        let lines = run("x^2 - 3*x + 2", &rect, &SampleOptions::default());
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].points().len(), 201);
    }

    #[test]
    fn tangent_branches_are_separated() {
        let rect = MathRect::new(-3.0..3.0, -10.0..10.0).unwrap();
        // asymptotes at -pi/2 and pi/2
        assert_eq!(run("tan(x)", &rect, &SampleOptions::default()).len(), 3);
    }

    #[test]
    fn reciprocal_splits_in_a_tall_frame() {
        let rect = MathRect::new(-2.0..2.0, -1000.0..1000.0).unwrap();
        for step_count in [151, 200, 201] {
            let opts = SampleOptions {
                step_count,
                ..SampleOptions::default()
            };
            let lines = run("1/x", &rect, &opts);
            assert_eq!(lines.len(), 2, "step_count {step_count}");
            // the left branch ends below the axis, the right starts above it
            let axis = map::to_pixel(&rect, &VP, 0.0, 0.0).y;
            let left = lines[0].points();
            assert!(left[left.len() - 1].y > axis);
            assert!(lines[1].points()[0].y < axis);
        }
    }

    #[test]
    fn tangent_splits_whatever_the_frame_height() {
        for half_height in [2.0, 10.0, 50.0, 200.0, 1000.0] {
            let rect = MathRect::new(-3.0..3.0, -half_height..half_height).unwrap();
            let lines = run("tan(x)", &rect, &SampleOptions::default());
            assert_eq!(lines.len(), 3, "y range ±{half_height}");
        }
    }

    #[test]
    fn curves_crossing_the_axis_stay_whole() {
        for half_height in [8.0, 100.0] {
            let rect = MathRect::new(-2.0..2.0, -half_height..half_height).unwrap();
            for src in ["x^3 - x", "sin(3x)", "exp(x) - 3", "x - 0.5"] {
                let lines = run(src, &rect, &SampleOptions::default());
                assert_eq!(lines.len(), 1, "{src} in ±{half_height}");
            }
        }
    }

    #[test]
    fn points_are_clamped_into_frame() {
        let rect = MathRect::new(-2.0..2.0, -1.0..1.0).unwrap();
        for line in run("x^3", &rect, &SampleOptions::default()) {
            for p in line.points() {
                assert!((25.0..=375.0).contains(&p.y), "{p:?}");
            }
        }
    }

    #[test]
    fn runs_reach_the_domain_boundary() {
        let rect = MathRect::new(-1.0..1.0, -1.0..2.0).unwrap();
        let opts = SampleOptions {
            step_count: 3,
            ..SampleOptions::default()
        };
        // samples at -1, -1/3, 1/3, 1: only the last two are defined
        let lines = run("sqrt(x)", &rect, &opts);
        assert_eq!(lines.len(), 1);
        let first = math_xs(&lines[0], &rect)[0];
        assert!(first.abs() < 1e-3, "{first}");
    }

    #[test]
    fn exclusion_splits_a_defined_curve() {
        let rect = MathRect::new(0.0..4.0, -1.0..5.0).unwrap();
        let opts = SampleOptions {
            exclusion: Some(Exclusion { x: 2.0, radius: 0.1 }),
            ..SampleOptions::default()
        };
        let lines = run("x + 1", &rect, &opts);
        assert_eq!(lines.len(), 2);
        for line in &lines {
            for x in math_xs(line, &rect) {
                assert!((x - 2.0).abs() >= 0.1 - 1e-9, "{x}");
            }
        }
        let left_end = math_xs(&lines[0], &rect).pop().unwrap();
        assert!((left_end - 1.9).abs() < 1e-2);
    }

    #[test]
    fn nowhere_defined_gives_nothing() {
        let rect = MathRect::new(-3.0..-1.0, -1.0..1.0).unwrap();
        assert!(run("ln(x)", &rect, &SampleOptions::default()).is_empty());
    }

    #[test]
    fn zero_steps_still_samples_both_ends() {
        let rect = MathRect::new(0.0..1.0, -1.0..2.0).unwrap();
        let opts = SampleOptions {
            step_count: 0,
            ..SampleOptions::default()
        };
        let lines = run("x", &rect, &opts);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].points().len(), 2);
    }
}

//! Baseline fitting and keypoint sampling along each span.

use crate::assembler::ContourSpan;
use crate::contour::Contour;
use crate::params::SpanParams;
use nalgebra::Point2;
use page_dewarp_core::{
    linear_fit, median_fit_error, quadratic_fit, FitError, LinearFit, QuadraticFit,
};
use serde::{Deserialize, Serialize};

/// Least-squares baseline `y = f(x)` of a span in pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Baseline {
    Linear(LinearFit),
    Quadratic(QuadraticFit),
}

impl Baseline {
    /// Parabola for three or more points, a line for two.
    pub fn fit(points: &[Point2<f64>]) -> Result<Self, FitError> {
        if points.len() >= 3 {
            quadratic_fit(points).map(Baseline::Quadratic)
        } else {
            linear_fit(points).map(Baseline::Linear)
        }
    }

    pub fn eval(&self, x: f64) -> f64 {
        match self {
            Baseline::Linear(f) => f.eval(x),
            Baseline::Quadratic(f) => f.eval(x),
        }
    }
}

/// A span with its fitted baseline and sampled keypoints.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SampledSpan {
    /// Index into the assembled span list.
    pub span: usize,
    pub baseline: Baseline,
    /// Horizontal extent of the members, in pixels.
    pub x_range: (f64, f64),
    /// Keypoints on the baseline, left to right, in pixels.
    pub keypoints: Vec<Point2<f64>>,
    /// Median distance of the fit points from the baseline.
    pub fit_error: Option<f64>,
}

#[derive(Clone, Debug)]
pub struct KeypointSampler {
    step: f64,
}

impl KeypointSampler {
    pub fn new(params: &SpanParams) -> Self {
        Self { step: params.step }
    }

    /// Points the baseline is fitted through: member centres, or the anchors
    /// and centre of a lone member.
    fn fit_points(contours: &[Contour], span: &ContourSpan) -> Vec<Point2<f64>> {
        match span.members.as_slice() {
            [only] => {
                let c = &contours[*only];
                vec![c.point0, c.center, c.point1]
            }
            members => members.iter().map(|&i| contours[i].center).collect(),
        }
    }

    /// Sample x positions spaced `step` apart, centred in `[lo, hi]`.
    fn sample_xs(&self, lo: f64, hi: f64) -> Vec<f64> {
        let width = (hi - lo).max(0.0);
        if !(self.step > 0.0) || width < self.step {
            return vec![0.5 * (lo + hi)];
        }
        let count = (width / self.step).floor() as usize + 1;
        let start = lo + 0.5 * (width - (count - 1) as f64 * self.step);
        (0..count)
            .map(|i| (start + i as f64 * self.step).clamp(lo, hi))
            .collect()
    }

    pub fn sample_span(
        &self,
        contours: &[Contour],
        index: usize,
        span: &ContourSpan,
    ) -> Result<SampledSpan, FitError> {
        let points = Self::fit_points(contours, span);
        let baseline = Baseline::fit(&points)?;
        let fit_error = median_fit_error(&points, |x| baseline.eval(x));

        let (lo, hi) = span.bounds.x_interval();
        let keypoints = self
            .sample_xs(lo, hi)
            .into_iter()
            .map(|x| Point2::new(x, baseline.eval(x)))
            .collect();

        Ok(SampledSpan {
            span: index,
            baseline,
            x_range: (lo, hi),
            keypoints,
            fit_error,
        })
    }

    /// Sample every span, dropping those whose baseline cannot be fitted.
    pub fn sample_all(&self, contours: &[Contour], spans: &[ContourSpan]) -> Vec<SampledSpan> {
        let mut sampled = Vec::with_capacity(spans.len());
        for (i, span) in spans.iter().enumerate() {
            match self.sample_span(contours, i, span) {
                Ok(s) => {
                    log::debug!(
                        "span {i}: {} members, {} keypoints, median fit error {:?}",
                        span.members.len(),
                        s.keypoints.len(),
                        s.fit_error
                    );
                    sampled.push(s);
                }
                Err(err) => log::warn!("dropping span {i}: {err}"),
            }
        }
        sampled
    }
}

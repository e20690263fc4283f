//! Objectives built on the projection model.

use crate::minimizer::Objective;
use crate::projection::Projector;
use nalgebra::Point2;
use page_dewarp_spans::SpanInfo;

/// Squared difference with non-finite terms counted as zero.
#[inline]
fn damped_square(d: f64) -> f64 {
    let sq = d * d;
    if sq.is_finite() {
        sq
    } else {
        0.0
    }
}

/// Sum of squared per-axis reprojection errors over all observations of a
/// [`SpanInfo`], anchor included.
pub struct ReprojectionCost<'a> {
    projector: Projector,
    info: &'a SpanInfo,
}

impl<'a> ReprojectionCost<'a> {
    pub fn new(projector: Projector, info: &'a SpanInfo) -> Self {
        Self { projector, info }
    }

    pub fn info(&self) -> &SpanInfo {
        self.info
    }

    /// Model predictions for every observation.
    pub fn projections(&self, params: &[f64]) -> Vec<Point2<f64>> {
        self.projector
            .project_keypoints(params, &self.info.key_indices)
    }
}

impl Objective for ReprojectionCost<'_> {
    fn evaluate(&self, params: &[f64]) -> f64 {
        self.projections(params)
            .iter()
            .zip(&self.info.observed)
            .map(|(p, o)| damped_square(p.x - o.x) + damped_square(p.y - o.y))
            .sum()
    }
}

/// Squared distance between the projection of a free flat-page point and an
/// observed normalized point, under fixed model parameters.
///
/// Evaluated on a two-element vector `[x, y]`. Unlike [`ReprojectionCost`],
/// a non-finite projection is rejected outright (infinite cost), so the
/// search cannot settle on it.
pub struct CornerCost<'a> {
    projector: Projector,
    params: &'a [f64],
    target: Point2<f64>,
}

impl<'a> CornerCost<'a> {
    pub fn new(projector: Projector, params: &'a [f64], target: Point2<f64>) -> Self {
        Self {
            projector,
            params,
            target,
        }
    }
}

impl Objective for CornerCost<'_> {
    fn evaluate(&self, flat: &[f64]) -> f64 {
        let p = self
            .projector
            .project(self.params, Point2::new(flat[0], flat[1]));
        let d = (p - self.target).norm_squared();
        if d.is_finite() {
            d
        } else {
            f64::INFINITY
        }
    }
}

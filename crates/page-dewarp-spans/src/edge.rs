//! Pairwise compatibility of two contours as neighbours on one text line.

use crate::contour::Contour;
use crate::params::EdgeParams;
use page_dewarp_core::{angle_distance, interval_overlap};
use serde::{Deserialize, Serialize};

/// Candidate link from the left contour `from` to the right contour `to`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContourEdge {
    pub from: usize,
    pub to: usize,
    /// Gap between `from`'s right anchor and `to`'s left anchor, in pixels.
    pub distance: f64,
    /// Larger deviation of the two contours from the connecting direction,
    /// in radians within `[0, π]`.
    pub angle_delta: f64,
    /// Intersection over union of the two vertical extents, in `[0, 1]`.
    pub overlap: f64,
    /// Lower is better.
    pub score: f64,
}

/// Scores contour pairs against a fixed set of [`EdgeParams`].
#[derive(Clone, Debug)]
pub struct EdgeScorer {
    params: EdgeParams,
    max_angle: f64,
}

/// 1-D intersection over union of two closed intervals.
fn interval_iou(a: (f64, f64), b: (f64, f64)) -> f64 {
    let inter = interval_overlap(a, b);
    if inter < 0.0 {
        return 0.0;
    }
    let union = a.1.max(b.1) - a.0.min(b.0);
    if union > 0.0 {
        (inter / union).clamp(0.0, 1.0)
    } else {
        // Both intervals collapse onto the same value.
        1.0
    }
}

impl EdgeScorer {
    pub fn new(params: &EdgeParams) -> Self {
        Self {
            max_angle: params.max_angle_deg.to_radians(),
            params: params.clone(),
        }
    }

    pub fn params(&self) -> &EdgeParams {
        &self.params
    }

    /// Composite score; increasing in distance and angle, decreasing in
    /// overlap.
    pub fn score(&self, distance: f64, angle_delta: f64, overlap: f64) -> f64 {
        distance
            + self.params.angle_cost * angle_delta.to_degrees()
            + self.params.overlap_cost * (1.0 - overlap)
    }

    /// Edge between contours `a` and `b` of `contours`, or `None` when any
    /// threshold is violated. The pair is ordered by centre x (then index),
    /// so the result does not depend on argument order.
    pub fn score_edge(&self, contours: &[Contour], a: usize, b: usize) -> Option<ContourEdge> {
        let order = contours[a]
            .center
            .x
            .total_cmp(&contours[b].center.x)
            .then(a.cmp(&b));
        let (from, to) = if order.is_gt() { (b, a) } else { (a, b) };
        let (ca, cb) = (&contours[from], &contours[to]);

        let distance = (cb.point0 - ca.point1).norm();
        if !distance.is_finite() || distance > self.params.max_distance {
            return None;
        }

        let link = cb.center - ca.center;
        let link_angle = link.y.atan2(link.x);
        let angle_delta =
            angle_distance(ca.angle, link_angle).max(angle_distance(cb.angle, link_angle));
        if !angle_delta.is_finite() || angle_delta > self.max_angle {
            return None;
        }

        let overlap = interval_iou(ca.bounds.y_interval(), cb.bounds.y_interval());
        if overlap < self.params.min_overlap {
            return None;
        }

        let along = ca.local_overlap(cb).max(cb.local_overlap(ca));
        if along > self.params.max_horizontal_overlap {
            return None;
        }

        Some(ContourEdge {
            from,
            to,
            distance,
            angle_delta,
            overlap,
            score: self.score(distance, angle_delta, overlap),
        })
    }
}

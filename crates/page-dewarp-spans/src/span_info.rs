//! Global optimization target built from all sampled spans.
//!
//! Observations are stored in normalized coordinates. Entry 0 is the page
//! anchor: its observed value is the normalized origin (image centre) and its
//! key index is [`KeyIndex::ANCHOR`], which the projector always maps from
//! flat `(0, 0)`. Entries `1..=N` are the sampled keypoints in span order.

use crate::sampler::SampledSpan;
use nalgebra::{Point2, Vector2};
use page_dewarp_core::{KeyIndex, KeypointRef, Normalizer, PageCorners, ParamLayout};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpanInfo {
    pub normalizer: Normalizer,
    pub layout: ParamLayout,
    /// Page quadrilateral in normalized coordinates.
    pub corners: PageCorners,
    /// Dominant text direction, unit length with non-negative x.
    pub x_dir: Vector2<f64>,
    /// Perpendicular to `x_dir`, pointing down the page.
    pub y_dir: Vector2<f64>,
    /// Observed normalized points; entry 0 is the anchor.
    pub observed: Vec<Point2<f64>>,
    /// Parameter slots of each observation; parallel to `observed`.
    pub key_indices: Vec<KeyIndex>,
    /// Span slot and offset of each sampled keypoint (`observed[1..]`).
    pub keypoint_refs: Vec<KeypointRef>,
    /// Default flat-page y of each span slot.
    pub span_offsets: Vec<f64>,
    /// Assembled span index behind each span slot.
    pub span_sources: Vec<usize>,
}

impl SpanInfo {
    /// Aggregate sampled spans; `None` when there is nothing to fit.
    pub fn build(sampled: &[SampledSpan], normalizer: Normalizer) -> Option<Self> {
        let spans: Vec<&SampledSpan> = sampled.iter().filter(|s| !s.keypoints.is_empty()).collect();
        let keypoint_count: usize = spans.iter().map(|s| s.keypoints.len()).sum();
        if keypoint_count == 0 {
            return None;
        }
        let layout = ParamLayout::new(spans.len(), keypoint_count);

        let mut observed = Vec::with_capacity(keypoint_count + 1);
        let mut key_indices = Vec::with_capacity(keypoint_count + 1);
        let mut keypoint_refs = Vec::with_capacity(keypoint_count);
        observed.push(Point2::origin());
        key_indices.push(KeyIndex::ANCHOR);

        let centre_x = normalizer.width() as f64 * 0.5;
        let mut span_offsets = Vec::with_capacity(spans.len());
        let mut direction = Vector2::zeros();

        for (slot, span) in spans.iter().enumerate() {
            let norm: Vec<Point2<f64>> = span
                .keypoints
                .iter()
                .map(|&p| normalizer.pix_to_norm(p))
                .collect();
            if let (Some(first), Some(last)) = (norm.first(), norm.last()) {
                direction += last - first;
            }
            for (offset, &p) in norm.iter().enumerate() {
                key_indices.push(layout.key_index(slot, keypoint_refs.len()));
                keypoint_refs.push(KeypointRef { span: slot, offset });
                observed.push(p);
            }
            let at_centre = Point2::new(centre_x, span.baseline.eval(centre_x));
            span_offsets.push(normalizer.pix_to_norm(at_centre).y);
        }

        let x_dir = page_direction(direction);
        let y_dir = Vector2::new(-x_dir.y, x_dir.x);
        let corners = extreme_corners(&observed[1..], &x_dir, &y_dir);

        log::debug!(
            "span info: {} spans, {} keypoints, {} parameters",
            layout.span_count(),
            layout.keypoint_count(),
            layout.param_count()
        );

        Some(Self {
            normalizer,
            layout,
            corners,
            x_dir,
            y_dir,
            observed,
            key_indices,
            keypoint_refs,
            span_offsets,
            span_sources: spans.iter().map(|s| s.span).collect(),
        })
    }

    pub fn span_count(&self) -> usize {
        self.layout.span_count()
    }

    pub fn keypoint_count(&self) -> usize {
        self.layout.keypoint_count()
    }

    /// Sampled keypoints in normalized coordinates, without the anchor.
    pub fn keypoints(&self) -> &[Point2<f64>] {
        &self.observed[1..]
    }

    /// Page corners in source pixels.
    pub fn corners_pix(&self) -> PageCorners {
        self.corners.map(|p| self.normalizer.norm_to_pix(p))
    }

    /// Starting parameter vector: zero pose, the given curvature seed,
    /// measured span offsets and keypoint columns.
    pub fn default_params(&self, curvature_seed: [f64; 2]) -> Vec<f64> {
        let mut params = vec![0.0; self.layout.param_count()];
        params[ParamLayout::ALPHA] = curvature_seed[0];
        params[ParamLayout::BETA] = curvature_seed[1];
        for (slot, &offset) in self.span_offsets.iter().enumerate() {
            params[self.layout.span_offset_slot(slot)] = offset;
        }
        for (k, p) in self.keypoints().iter().enumerate() {
            params[self.layout.column_slot(k)] = p.x;
        }
        params
    }
}

fn page_direction(sum: Vector2<f64>) -> Vector2<f64> {
    let norm = sum.norm();
    if !(norm > 1e-12) || !norm.is_finite() {
        return Vector2::x();
    }
    let dir = sum / norm;
    if dir.x < 0.0 {
        -dir
    } else {
        dir
    }
}

fn extreme_corners(
    points: &[Point2<f64>],
    x_dir: &Vector2<f64>,
    y_dir: &Vector2<f64>,
) -> PageCorners {
    let mut px = (f64::INFINITY, f64::NEG_INFINITY);
    let mut py = (f64::INFINITY, f64::NEG_INFINITY);
    for p in points {
        let u = x_dir.dot(&p.coords);
        let v = y_dir.dot(&p.coords);
        px = (px.0.min(u), px.1.max(u));
        py = (py.0.min(v), py.1.max(v));
    }
    let at = |u: f64, v: f64| Point2::from(x_dir * u + y_dir * v);
    PageCorners {
        top_left: at(px.0, py.0),
        top_right: at(px.1, py.0),
        bottom_right: at(px.1, py.1),
        bottom_left: at(px.0, py.1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::Baseline;
    use approx::assert_abs_diff_eq;
    use page_dewarp_core::LinearFit;

    fn straight_span(span: usize, y: f64, xs: &[f64]) -> SampledSpan {
        SampledSpan {
            span,
            baseline: Baseline::Linear(LinearFit {
                slope: 0.0,
                intercept: y,
            }),
            x_range: (xs[0], xs[xs.len() - 1]),
            keypoints: xs.iter().map(|&x| Point2::new(x, y)).collect(),
            fit_error: Some(0.0),
        }
    }

    fn two_lines() -> SpanInfo {
        let sampled = vec![
            straight_span(0, 50.0, &[20.0, 40.0, 60.0]),
            straight_span(1, 150.0, &[10.0, 30.0, 50.0, 70.0]),
        ];
        SpanInfo::build(&sampled, Normalizer::new(100, 200)).expect("spans")
    }

    #[test]
    fn anchor_is_entry_zero() {
        let info = two_lines();
        assert_eq!(info.observed.len(), 8);
        assert_eq!(info.key_indices[0], KeyIndex::ANCHOR);
        assert_eq!(info.observed[0], Point2::origin());
        assert_eq!(info.keypoint_refs[3], KeypointRef { span: 1, offset: 0 });
        assert_eq!(info.key_indices[4], info.layout.key_index(1, 3));
    }

    #[test]
    fn default_vector_follows_layout() {
        let info = two_lines();
        let params = info.default_params([0.1, -0.2]);
        assert_eq!(params.len(), ParamLayout::FIXED + 2 + 7);
        assert!(params[..6].iter().all(|&v| v == 0.0));
        assert_eq!(params[ParamLayout::ALPHA], 0.1);
        assert_eq!(params[ParamLayout::BETA], -0.2);
        // scale = 2 / 200, offset = (50, 100)
        assert_abs_diff_eq!(params[8], -0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(params[9], 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(params[10], -0.3, epsilon = 1e-12);
        assert_abs_diff_eq!(params[16], 0.2, epsilon = 1e-12);
    }

    #[test]
    fn corners_bound_all_keypoints() {
        let info = two_lines();
        assert_abs_diff_eq!(info.x_dir.x, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(info.y_dir.y, 1.0, epsilon = 1e-12);
        let px = info.corners_pix();
        assert_abs_diff_eq!(px.top_left.x, 10.0, epsilon = 1e-9);
        assert_abs_diff_eq!(px.top_left.y, 50.0, epsilon = 1e-9);
        assert_abs_diff_eq!(px.bottom_right.x, 70.0, epsilon = 1e-9);
        assert_abs_diff_eq!(px.bottom_right.y, 150.0, epsilon = 1e-9);
    }

    #[test]
    fn empty_input_has_no_target() {
        assert!(SpanInfo::build(&[], Normalizer::new(10, 10)).is_none());
    }
}

use nalgebra::Point2;
use page_dewarp_model::{OptimizeResult, PageExtents};
use page_dewarp_spans::{Contour, ContourLinks, ContourSpan, SampledSpan, SpanInfo};
use serde::{Deserialize, Serialize};

/// Intermediate state of one pipeline run, filled in stage by stage.
///
/// Stages that did not run leave their fields empty. Projections are in
/// normalized coordinates and parallel to `span_info.observed`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DewarpTrace {
    pub image_size: (usize, usize),
    /// Contours that passed the filters, in extraction order.
    pub contours: Vec<Contour>,
    /// Span links, parallel to `contours`.
    pub links: Vec<ContourLinks>,
    pub spans: Vec<ContourSpan>,
    pub sampled: Vec<SampledSpan>,
    pub span_info: Option<SpanInfo>,
    pub initial_params: Option<Vec<f64>>,
    pub initial_projections: Vec<Point2<f64>>,
    pub fitted_projections: Vec<Point2<f64>>,
    pub optimize: Option<OptimizeResult>,
    pub extents: Option<PageExtents>,
}

impl DewarpTrace {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            image_size: (width, height),
            ..Self::default()
        }
    }

    /// Parameters the output was remapped with.
    pub fn fitted_params(&self) -> Option<&[f64]> {
        self.optimize.as_ref().map(|r| r.params.as_slice())
    }

    pub fn to_json_string(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

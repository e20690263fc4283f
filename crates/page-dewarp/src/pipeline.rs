//! Image-independent pipeline: blob outlines in, page outline or flattened
//! raster out.

use crate::config::DewarpParams;
use crate::error::DewarpError;
use crate::trace::DewarpTrace;
use nalgebra::Point2;
use page_dewarp_core::{GrayImage, GrayImageView, Normalizer, PageCorners};
use page_dewarp_model::{
    NelderMead, Optimizer, PageExtents, Projector, Remapper, ReprojectionCost,
};
use page_dewarp_spans::{
    Contour, KeypointSampler, SampledSpan, SpanAssembler, SpanAssembly, SpanInfo,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Caller-supplied contour predicate, applied after the built-in filters.
pub type ContourFilter<'a> = &'a dyn Fn(&Contour) -> bool;

/// Page quadrilateral in source pixels.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PageOutline {
    pub top_left: Point2<f64>,
    pub bottom_left: Point2<f64>,
    pub bottom_right: Point2<f64>,
    pub top_right: Point2<f64>,
}

impl From<PageCorners> for PageOutline {
    fn from(c: PageCorners) -> Self {
        Self {
            top_left: c.top_left,
            bottom_left: c.bottom_left,
            bottom_right: c.bottom_right,
            top_right: c.top_right,
        }
    }
}

#[derive(Debug)]
pub enum Outcome {
    /// The model was fitted (or kept at its initial value on a stall) and
    /// the source remapped through it.
    Flattened {
        initial_residual: f64,
        residual: f64,
        iterations: usize,
        elapsed: Duration,
        stalled: bool,
    },
    /// No page was found; the output is the input.
    Unchanged(DewarpError),
}

impl Outcome {
    pub fn is_flattened(&self) -> bool {
        matches!(self, Outcome::Flattened { .. })
    }
}

#[derive(Debug)]
pub struct Dewarped<I = GrayImage> {
    pub image: I,
    pub outcome: Outcome,
    pub trace: Option<DewarpTrace>,
}

impl<I> Dewarped<I> {
    pub fn map_image<J>(self, f: impl FnOnce(I) -> J) -> Dewarped<J> {
        Dewarped {
            image: f(self.image),
            outcome: self.outcome,
            trace: self.trace,
        }
    }
}

/// Everything derived from the blob outlines before model fitting.
#[derive(Clone, Debug)]
pub struct Analysis {
    pub contours: Vec<Contour>,
    pub assembly: SpanAssembly,
    pub sampled: Vec<SampledSpan>,
    pub span_info: SpanInfo,
}

#[derive(Clone, Debug, Default)]
pub struct Dewarper {
    params: DewarpParams,
    trace: bool,
}

impl Dewarper {
    pub fn new(params: DewarpParams) -> Self {
        Self {
            params,
            trace: false,
        }
    }

    /// Record a [`DewarpTrace`] on every run.
    pub fn with_trace(mut self, enabled: bool) -> Self {
        self.trace = enabled;
        self
    }

    pub fn params(&self) -> &DewarpParams {
        &self.params
    }

    /// Summarize outlines and keep the text-like ones accepted by `filter`.
    pub fn contours_from_outlines<I>(
        &self,
        outlines: I,
        filter: Option<ContourFilter<'_>>,
    ) -> Vec<Contour>
    where
        I: IntoIterator<Item = Vec<Point2<f64>>>,
    {
        let mut total = 0usize;
        let contours: Vec<Contour> = outlines
            .into_iter()
            .inspect(|_| total += 1)
            .map(Contour::from_outline)
            .filter(|c| c.is_text_like(&self.params.contours))
            .filter(|c| filter.is_none_or(|f| f(c)))
            .collect();
        log::debug!("kept {} of {} contours", contours.len(), total);
        contours
    }

    /// Run contour filtering, span assembly, sampling and aggregation.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, outlines, filter, trace))
    )]
    pub fn analyze<I>(
        &self,
        width: usize,
        height: usize,
        outlines: I,
        filter: Option<ContourFilter<'_>>,
        mut trace: Option<&mut DewarpTrace>,
    ) -> Result<Analysis, DewarpError>
    where
        I: IntoIterator<Item = Vec<Point2<f64>>>,
    {
        let contours = self.contours_from_outlines(outlines, filter);
        if let Some(t) = trace.as_deref_mut() {
            t.contours = contours.clone();
        }
        if contours.is_empty() {
            return Err(DewarpError::NoContours);
        }

        let assembly =
            SpanAssembler::new(&self.params.edges, &self.params.spans).assemble(&contours);
        if let Some(t) = trace.as_deref_mut() {
            t.links = assembly.links.clone();
            t.spans = assembly.spans.clone();
        }
        if assembly.spans.is_empty() {
            return Err(DewarpError::NoSpans);
        }

        let sampled =
            KeypointSampler::new(&self.params.spans).sample_all(&contours, &assembly.spans);
        if let Some(t) = trace.as_deref_mut() {
            t.sampled = sampled.clone();
        }

        let span_info = SpanInfo::build(&sampled, Normalizer::new(width, height))
            .ok_or(DewarpError::NoKeypoints)?;
        if let Some(t) = trace.as_deref_mut() {
            t.span_info = Some(span_info.clone());
        }

        Ok(Analysis {
            contours,
            assembly,
            sampled,
            span_info,
        })
    }

    /// Page outline in source pixels.
    pub fn detect_from_outlines<I>(
        &self,
        width: usize,
        height: usize,
        outlines: I,
    ) -> Result<PageOutline, DewarpError>
    where
        I: IntoIterator<Item = Vec<Point2<f64>>>,
    {
        let analysis = self.analyze(width, height, outlines, None, None)?;
        Ok(analysis.span_info.corners_pix().into())
    }

    /// Fit the page model and remap `source`. When no page is found the
    /// source is returned unchanged with [`Outcome::Unchanged`], as it is when
    /// the fitted page would need an oversized output.
    #[cfg_attr(
        feature = "tracing",
        instrument(
            level = "info",
            skip(self, source, outlines, filter),
            fields(width = source.width, height = source.height)
        )
    )]
    pub fn dewarp_from_outlines<I>(
        &self,
        source: &GrayImageView<'_>,
        outlines: I,
        filter: Option<ContourFilter<'_>>,
    ) -> Dewarped
    where
        I: IntoIterator<Item = Vec<Point2<f64>>>,
    {
        let mut trace = self
            .trace
            .then(|| DewarpTrace::new(source.width, source.height));

        let analysis =
            match self.analyze(source.width, source.height, outlines, filter, trace.as_mut()) {
                Ok(analysis) => analysis,
                Err(err) => return unchanged(source, err, trace),
            };
        let info = &analysis.span_info;

        let projector = Projector::from_params(&self.params.model);
        let initial = info.default_params(self.params.model.initial_curvature());
        let cost = ReprojectionCost::new(projector, info);
        let result = Optimizer::new(self.params.optimizer.clone()).optimize(&initial, &cost);

        let extents = self.page_extents(projector, info, &result.params);
        if let Some(t) = trace.as_mut() {
            t.initial_projections = cost.projections(&initial);
            t.fitted_projections = cost.projections(&result.params);
            t.initial_params = Some(initial);
            t.extents = Some(extents);
            t.optimize = Some(result.clone());
        }

        let image = match Remapper::new(projector, info.normalizer, self.params.remap.clone())
            .remap(source, &result.params, &extents)
        {
            Ok(image) => image,
            Err(err) => return unchanged(source, err.into(), trace),
        };

        Dewarped {
            image,
            outcome: Outcome::Flattened {
                initial_residual: result.initial_residual,
                residual: result.residual,
                iterations: result.iterations,
                elapsed: result.elapsed,
                stalled: result.stalled,
            },
            trace,
        }
    }

    fn page_extents(&self, projector: Projector, info: &SpanInfo, params: &[f64]) -> PageExtents {
        let remap = &self.params.remap;
        if !remap.crop_to_page {
            PageExtents::full_image(&info.normalizer)
        } else if remap.refine_page_extents {
            PageExtents::fit(projector, params, &info.corners, &NelderMead)
        } else {
            PageExtents::from_corners(&info.corners)
        }
    }
}

fn unchanged(source: &GrayImageView<'_>, err: DewarpError, trace: Option<DewarpTrace>) -> Dewarped {
    log::warn!("{err}; returning the input unchanged");
    Dewarped {
        image: GrayImage {
            width: source.width,
            height: source.height,
            data: source.data.to_vec(),
        },
        outcome: Outcome::Unchanged(err),
        trace,
    }
}

//! Text-line span detection built on top of `page-dewarp-core`.
//!
//! ## Quickstart
//!
//! ```
//! use nalgebra::Point2;
//! use page_dewarp_core::Normalizer;
//! use page_dewarp_spans::{
//!     Contour, EdgeParams, KeypointSampler, SpanAssembler, SpanInfo, SpanParams,
//! };
//!
//! let bar = |x0: f64| {
//!     Contour::from_outline(vec![
//!         Point2::new(x0, 40.0),
//!         Point2::new(x0 + 40.0, 40.0),
//!         Point2::new(x0 + 40.0, 46.0),
//!         Point2::new(x0, 46.0),
//!     ])
//! };
//! let contours = vec![bar(10.0), bar(60.0), bar(110.0)];
//!
//! let spans = SpanParams::default();
//! let assembly = SpanAssembler::new(&EdgeParams::default(), &spans).assemble(&contours);
//! let sampled = KeypointSampler::new(&spans).sample_all(&contours, &assembly.spans);
//! let info = SpanInfo::build(&sampled, Normalizer::new(200, 100)).unwrap();
//! assert_eq!(info.span_count(), 1);
//! ```
//!
//! Pipeline:
//! 1. Summarize each blob outline as a [`Contour`] and drop shapes that do
//!    not look like text.
//! 2. Score candidate edges between nearby contours and greedily link the
//!    best ones into chains, each contour keeping at most one predecessor
//!    and one successor.
//! 3. Fit a baseline through every chain and sample keypoints along it.
//! 4. Aggregate the keypoints into a [`SpanInfo`]: normalized observations,
//!    the parameter layout, the default parameter vector and the page
//!    corners.

mod assembler;
mod contour;
mod edge;
mod params;
mod sampler;
mod span_info;

pub use assembler::{ContourLinks, ContourSpan, SpanAssembler, SpanAssembly};
pub use contour::Contour;
pub use edge::{ContourEdge, EdgeScorer};
pub use params::{ContourFilterParams, EdgeParams, SpanParams};
pub use sampler::{Baseline, KeypointSampler, SampledSpan};
pub use span_info::SpanInfo;

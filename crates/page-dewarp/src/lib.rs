//! High-level facade for the `page-dewarp-*` workspace.
//!
//! Flattens photographs of curved printed pages. The pipeline:
//!
//! 1. binarize the photo and extract word blobs (feature `image`),
//! 2. summarize blobs into [`spans::Contour`]s and drop the non-text ones,
//! 3. chain contours into text-line spans ([`spans::SpanAssembler`]),
//! 4. sample keypoints along each span and aggregate them ([`spans::SpanInfo`]),
//! 5. fit the camera and page curvature model ([`model::Optimizer`]),
//! 6. resample the photo through the fitted model ([`model::Remapper`]).
//!
//! Photos without a detectable page are returned unchanged, with the reason
//! in [`Outcome::Unchanged`].
//!
//! ## Quickstart
//!
//! ```no_run
//! use page_dewarp::{dewarp, DewarpParams};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let img = image::open("page.jpg")?.to_luma8();
//! let result = dewarp(&img, &DewarpParams::default(), None);
//! println!("flattened: {}", result.outcome.is_flattened());
//! result.image.save("page_flat.png")?;
//! # Ok(())
//! # }
//! ```
//!
//! Callers with their own segmentation can skip the `image` feature and feed
//! blob outlines to [`Dewarper::dewarp_from_outlines`].
//!
//! ## API map
//! - `page_dewarp::core`: images, geometry, statistics, fits, parameter layout.
//! - `page_dewarp::spans`: contours, edge scoring, span assembly, keypoints.
//! - `page_dewarp::model`: projection, costs, minimizer, optimizer, remapping.
//! - `page_dewarp::detect` (feature `image`): helpers on `image::GrayImage`.
//! - `page_dewarp::render` (feature `image`): debug overlays from a [`DewarpTrace`].

pub use page_dewarp_core as core;
pub use page_dewarp_model as model;
pub use page_dewarp_spans as spans;

mod config;
mod error;
mod pipeline;
mod trace;

#[cfg(feature = "image")]
pub mod detect;
#[cfg(feature = "image")]
pub mod preprocess;
#[cfg(feature = "image")]
pub mod render;

pub use config::{DewarpParams, MaskInsets, PreprocessParams};
pub use error::DewarpError;
pub use pipeline::{Analysis, ContourFilter, Dewarped, Dewarper, Outcome, PageOutline};
pub use trace::DewarpTrace;

#[cfg(feature = "image")]
pub use detect::{
    detect, detect_from_gray_u8, dewarp, dewarp_from_gray_u8, gray_image_from_slice, gray_view,
};

/// Install the `tracing` subscriber and route `log` records into it.
/// `verbose` is the `-v` count used when `RUST_LOG` is unset.
#[cfg(feature = "tracing")]
pub fn init_tracing(json: bool, verbose: u8) {
    page_dewarp_core::init_tracing(json, verbose);
    let _ = tracing_log::LogTracer::init();
}

//! Page model fitting and remapping.
//!
//! The model lifts flat-page coordinates onto a cubic curved surface and
//! projects them through a pinhole camera ([`Projector`]). Its parameter
//! vector follows [`page_dewarp_core::ParamLayout`]. [`ReprojectionCost`]
//! compares the projections against the observations of a
//! [`page_dewarp_spans::SpanInfo`]; an [`Optimizer`] drives any
//! [`Minimizer`] (by default [`NelderMead`]) on it, and a [`Remapper`]
//! resamples the source through the fitted model.
//!
//! ```
//! use page_dewarp_model::{Optimizer, OptimizerParams};
//!
//! let bowl = |x: &[f64]| (x[0] - 1.0).powi(2) + (x[1] + 0.5).powi(2);
//! let result = Optimizer::new(OptimizerParams::default()).optimize(&[0.0, 0.0], &bowl);
//! assert!(result.residual < result.initial_residual);
//! ```

mod cost;
mod minimizer;
mod optimizer;
mod projection;
mod remap;

pub use cost::{CornerCost, ReprojectionCost};
pub use minimizer::{Minimizer, MinimizerSettings, Minimum, NelderMead, Objective};
pub use optimizer::{OptimizeResult, Optimizer, OptimizerParams};
pub use projection::{curvature_height, ModelParams, Projector};
pub use remap::{PageExtents, RemapError, RemapParams, Remapper};

//! Core types and numeric utilities for page dewarping.
//!
//! This crate is intentionally small and purely geometric. It does *not*
//! depend on any image decoding crate or on the contour and model layers.

mod fit;
mod geometry;
mod image;
mod layout;
mod logger;
mod sparse_array;
mod stats;

pub use fit::{linear_fit, median_fit_error, quadratic_fit, FitError, LinearFit, QuadraticFit};
pub use geometry::{angle_distance, interval_overlap, BoundingBox, Normalizer, PageCorners};
pub use image::{sample_bilinear, sample_bilinear_u8, GrayImage, GrayImageView};
pub use layout::{KeyIndex, KeypointRef, ParamLayout};
pub use stats::{median, median_variation, rank_value, sort_indices, SortOrder, SortStrategy};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{filter_directives, init_with_level, level_from_verbosity, Stage};

//! Resampling of the source image through the fitted page model.
//!
//! Output pixel `(i, j)` corresponds to the flat-page point
//! `min + (i, j) · (max − min) / (size − 1)` of the [`PageExtents`]. That
//! point is projected into normalized image coordinates, converted to source
//! pixels and sampled bilinearly. The flat → source map is evaluated on a grid
//! decimated by `decimate` output pixels and bilinearly interpolated between
//! grid nodes.

use crate::cost::CornerCost;
use crate::minimizer::{Minimizer, MinimizerSettings};
use crate::projection::Projector;
use nalgebra::Point2;
use page_dewarp_core::{sample_bilinear_u8, GrayImage, GrayImageView, Normalizer, PageCorners};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Longest output side, as a multiple of the longer source side.
const MAX_OUTPUT_SCALE: f64 = 8.0;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum RemapError {
    #[error("output of {width:.0}x{height:.0} pixels exceeds the {limit} pixel side limit")]
    OutputTooLarge { width: f64, height: f64, limit: usize },
}

/// Settings for the two-dimensional corner searches.
const CORNER_SEARCH: MinimizerSettings = MinimizerSettings {
    initial_step: 0.05,
    max_iterations: 500,
    tolerance: 1e-10,
};

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RemapParams {
    /// Output scale relative to the source resolution. Default: 1.0.
    pub zoom: f64,
    /// Spacing of the exactly projected grid nodes, in output pixels.
    /// Default: 16.
    pub decimate: usize,
    /// Fill value for positions outside the source image. Default: 255.
    pub background: u8,
    /// Cover only the detected page instead of the whole source frame.
    /// Default: true.
    pub crop_to_page: bool,
    /// Fit the flat page corners to the observed ones before cropping.
    /// Default: true.
    pub refine_page_extents: bool,
}

impl Default for RemapParams {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            decimate: 16,
            background: 255,
            crop_to_page: true,
            refine_page_extents: true,
        }
    }
}

/// Axis-aligned rectangle of the flat page, in normalized units.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PageExtents {
    pub min: Point2<f64>,
    pub max: Point2<f64>,
}

impl PageExtents {
    /// Rectangle spanning the source pixel centres, so an identity model
    /// reproduces the source pixel grid.
    pub fn full_image(normalizer: &Normalizer) -> Self {
        let w = normalizer.width().saturating_sub(1) as f64;
        let h = normalizer.height().saturating_sub(1) as f64;
        Self {
            min: normalizer.pix_to_norm(Point2::origin()),
            max: normalizer.pix_to_norm(Point2::new(w, h)),
        }
    }

    /// Bounding rectangle of a corner quadrilateral.
    pub fn from_corners(corners: &PageCorners) -> Self {
        let pts = corners.to_array();
        let lo = |v: [f64; 4]| v.into_iter().fold(f64::INFINITY, f64::min);
        let hi = |v: [f64; 4]| v.into_iter().fold(f64::NEG_INFINITY, f64::max);
        let (xs, ys) = (pts.map(|p| p.x), pts.map(|p| p.y));
        Self {
            min: Point2::new(lo(xs), lo(ys)),
            max: Point2::new(hi(xs), hi(ys)),
        }
    }

    /// Flat-page rectangle whose top-left and bottom-right corners project
    /// onto the observed ones. Falls back to [`PageExtents::from_corners`]
    /// when the search does not yield a proper rectangle.
    pub fn fit<M: Minimizer + ?Sized>(
        projector: Projector,
        params: &[f64],
        corners: &PageCorners,
        minimizer: &M,
    ) -> Self {
        let initial = Self::from_corners(corners);
        let solve = |target: Point2<f64>, start: Point2<f64>| {
            let cost = CornerCost::new(projector, params, target);
            let min = minimizer.minimize(&cost, &[start.x, start.y], &CORNER_SEARCH);
            Point2::new(min.point[0], min.point[1])
        };
        let fitted = Self {
            min: solve(corners.top_left, initial.min),
            max: solve(corners.bottom_right, initial.max),
        };
        if fitted.is_valid() {
            log::debug!(
                "page extents: ({:.4}, {:.4}) .. ({:.4}, {:.4})",
                fitted.min.x,
                fitted.min.y,
                fitted.max.x,
                fitted.max.y
            );
            fitted
        } else {
            log::warn!("page extent search failed; using the observed corner box");
            initial
        }
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    fn is_valid(&self) -> bool {
        let (w, h) = (self.width(), self.height());
        w.is_finite() && h.is_finite() && w > 0.0 && h > 0.0
    }
}

/// Grid node positions along one output axis: every `step`, plus the last
/// pixel.
fn grid_nodes(len: usize, step: usize) -> Vec<usize> {
    let mut nodes: Vec<usize> = (0..len).step_by(step.max(1)).collect();
    if let Some(&last) = nodes.last() {
        if last + 1 != len {
            nodes.push(len - 1);
        }
    }
    nodes
}

/// Cell index and fractional offset of `v` within `nodes`.
fn locate(nodes: &[usize], step: usize, v: usize) -> (usize, f64) {
    if nodes.len() < 2 {
        return (0, 0.0);
    }
    let k = (v / step.max(1)).min(nodes.len() - 2);
    let span = (nodes[k + 1] - nodes[k]) as f64;
    (k, (v - nodes[k]) as f64 / span)
}

pub struct Remapper {
    projector: Projector,
    normalizer: Normalizer,
    params: RemapParams,
}

impl Remapper {
    pub fn new(projector: Projector, normalizer: Normalizer, params: RemapParams) -> Self {
        Self {
            projector,
            normalizer,
            params,
        }
    }

    pub fn params(&self) -> &RemapParams {
        &self.params
    }

    /// Largest output width or height accepted by [`Remapper::remap`].
    pub fn max_output_side(&self) -> usize {
        let long = self.normalizer.width().max(self.normalizer.height()).max(1);
        (long as f64 * MAX_OUTPUT_SCALE) as usize
    }

    /// Output `(width, height)` for the given extents:
    /// `round(extent / scale · zoom) + 1` per axis.
    ///
    /// Sizes past [`Remapper::max_output_side`] (a large `zoom`, or extents
    /// from a diverged fit) are rejected.
    pub fn output_size(&self, extents: &PageExtents) -> Result<(usize, usize), RemapError> {
        let px = |extent: f64| {
            let v = (extent / self.normalizer.scale() * self.params.zoom).round();
            if v > 0.0 {
                v
            } else {
                0.0
            }
        };
        let (w, h) = (px(extents.width()), px(extents.height()));
        let limit = self.max_output_side();
        if w >= limit as f64 || h >= limit as f64 {
            return Err(RemapError::OutputTooLarge {
                width: w + 1.0,
                height: h + 1.0,
                limit,
            });
        }
        Ok((w as usize + 1, h as usize + 1))
    }

    /// Source pixel position that output pixel `(i, j)` samples from.
    fn source_position(
        &self,
        params: &[f64],
        extents: &PageExtents,
        size: (usize, usize),
        i: usize,
        j: usize,
    ) -> Point2<f64> {
        let step = |extent: f64, n: usize| if n > 1 { extent / (n - 1) as f64 } else { 0.0 };
        let flat = Point2::new(
            extents.min.x + i as f64 * step(extents.width(), size.0),
            extents.min.y + j as f64 * step(extents.height(), size.1),
        );
        self.normalizer
            .norm_to_pix(self.projector.project(params, flat))
    }

    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self, source, params), fields(w = source.width, h = source.height))
    )]
    pub fn remap(
        &self,
        source: &GrayImageView<'_>,
        params: &[f64],
        extents: &PageExtents,
    ) -> Result<GrayImage, RemapError> {
        let (width, height) = self.output_size(extents)?;
        let step = self.params.decimate.max(1);
        let xs = grid_nodes(width, step);
        let ys = grid_nodes(height, step);

        let mut grid = Vec::with_capacity(xs.len() * ys.len());
        for &j in &ys {
            for &i in &xs {
                grid.push(self.source_position(params, extents, (width, height), i, j));
            }
        }
        let node = |kx: usize, ky: usize| grid[ky * xs.len() + kx];

        let mut out = GrayImage::filled(width, height, self.params.background);
        for oy in 0..height {
            let (ky, ty) = locate(&ys, step, oy);
            let ky1 = (ky + 1).min(ys.len() - 1);
            for ox in 0..width {
                let (kx, tx) = locate(&xs, step, ox);
                let kx1 = (kx + 1).min(xs.len() - 1);
                let top = node(kx, ky).coords.lerp(&node(kx1, ky).coords, tx);
                let bottom = node(kx, ky1).coords.lerp(&node(kx1, ky1).coords, tx);
                let p = top.lerp(&bottom, ty);
                out.put(
                    ox,
                    oy,
                    sample_bilinear_u8(source, p.x, p.y, self.params.background),
                );
            }
        }

        log::debug!(
            "remapped {}x{} source into {}x{} output ({} grid nodes)",
            source.width,
            source.height,
            width,
            height,
            grid.len()
        );
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::minimizer::NelderMead;
    use page_dewarp_core::ParamLayout;

    fn gradient(width: usize, height: usize) -> GrayImage {
        let mut img = GrayImage::filled(width, height, 0);
        for y in 0..height {
            for x in 0..width {
                img.put(x, y, ((x * 7 + y * 3) % 256) as u8);
            }
        }
        img
    }

    #[test]
    fn grid_nodes_cover_both_ends() {
        assert_eq!(grid_nodes(40, 16), vec![0, 16, 32, 39]);
        assert_eq!(grid_nodes(33, 16), vec![0, 16, 32]);
        assert_eq!(grid_nodes(1, 16), vec![0]);
        assert_eq!(locate(&[0, 16, 32, 39], 16, 35), (2, 3.0 / 7.0));
        assert_eq!(locate(&[0, 16, 32, 39], 16, 39), (2, 1.0));
    }

    #[test]
    fn identity_model_reproduces_the_source() {
        let src = gradient(61, 45);
        let normalizer = Normalizer::new(src.width, src.height);
        let remapper = Remapper::new(Projector::default(), normalizer, RemapParams::default());
        let params = vec![0.0; ParamLayout::FIXED];
        let extents = PageExtents::full_image(&normalizer);

        assert_eq!(remapper.output_size(&extents), Ok((61, 45)));
        let out = remapper.remap(&src.view(), &params, &extents).expect("remap");
        assert_eq!((out.width, out.height), (61, 45));
        let max_diff = out
            .data
            .iter()
            .zip(&src.data)
            .map(|(&a, &b)| (a as i32 - b as i32).abs())
            .max()
            .unwrap_or(0);
        assert!(max_diff <= 1, "max diff {max_diff}");
    }

    #[test]
    fn outside_positions_get_the_background() {
        let src = gradient(20, 20);
        let normalizer = Normalizer::new(20, 20);
        let params = RemapParams {
            background: 200,
            ..RemapParams::default()
        };
        let remapper = Remapper::new(Projector::default(), normalizer, params);
        let mut model = vec![0.0; ParamLayout::FIXED];
        model[3] = 10.0; // shift far to the right
        let extents = PageExtents::full_image(&normalizer);
        let out = remapper.remap(&src.view(), &model, &extents).expect("remap");
        assert!(out.data.iter().all(|&v| v == 200));
    }

    #[test]
    fn zoom_scales_the_output() {
        let normalizer = Normalizer::new(101, 51);
        let params = RemapParams {
            zoom: 0.5,
            ..RemapParams::default()
        };
        let remapper = Remapper::new(Projector::default(), normalizer, params);
        let extents = PageExtents::full_image(&normalizer);
        assert_eq!(remapper.output_size(&extents), Ok((51, 26)));
    }

    #[test]
    fn oversized_output_is_rejected_before_allocating() {
        let src = gradient(100, 100);
        let normalizer = Normalizer::new(100, 100);
        let params = RemapParams {
            zoom: 1e6,
            ..RemapParams::default()
        };
        let remapper = Remapper::new(Projector::default(), normalizer, params);
        let extents = PageExtents::full_image(&normalizer);
        let model = vec![0.0; ParamLayout::FIXED];
        assert_eq!(remapper.max_output_side(), 800);
        assert!(matches!(
            remapper.remap(&src.view(), &model, &extents),
            Err(RemapError::OutputTooLarge { limit: 800, .. })
        ));

        let diverged = PageExtents {
            min: Point2::new(0.0, 0.0),
            max: Point2::new(f64::INFINITY, 1.0),
        };
        let unit = Remapper::new(Projector::default(), normalizer, RemapParams::default());
        assert!(unit.output_size(&diverged).is_err());
    }

    #[test]
    fn fitted_extents_match_corners_under_identity() {
        let corners = PageCorners {
            top_left: Point2::new(-0.4, -0.3),
            top_right: Point2::new(0.5, -0.3),
            bottom_right: Point2::new(0.5, 0.2),
            bottom_left: Point2::new(-0.4, 0.2),
        };
        let params = vec![0.0; ParamLayout::FIXED];
        let extents = PageExtents::fit(Projector::default(), &params, &corners, &NelderMead);
        assert!((extents.min - corners.top_left).norm() < 1e-4);
        assert!((extents.max - corners.bottom_right).norm() < 1e-4);
    }
}

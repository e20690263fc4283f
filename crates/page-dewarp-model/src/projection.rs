//! Cubic page-curvature surface seen through a pinhole camera.
//!
//! A flat-page point `(x, y)` is lifted to `(x, y, z(x))`, where `z` is the
//! cubic with coefficients `[α + β, −2α − β, α, 0]` (highest power first):
//! it vanishes at `x = 0` and `x = 1` with slopes `α` and `β` there. The
//! lifted point is moved by the axis-angle rotation and translation from the
//! parameter vector and projected with focal scale `F`:
//!
//! ```text
//! Pc = R(rvec) · P + tvec
//! image = F · (Pc.x, Pc.y) / (Pc.z + F)
//! ```
//!
//! The camera sits at depth `F` in front of the flat page, so the zero pose
//! with `α = β = 0` maps flat coordinates onto identical normalized image
//! coordinates.

use nalgebra::{Point2, Point3, Rotation3, Vector3};
use page_dewarp_core::{KeyIndex, ParamLayout};
use serde::{Deserialize, Serialize};

/// Camera and curvature settings of the page model.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ModelParams {
    /// Focal scale in normalized units. Default: 1.8.
    pub focal_length: f64,
    /// Starting `(α, β)` of the curvature cubic. Default: (0, 0).
    pub curvature_seed: [f64; 2],
    /// Fit the curvature cubic. When false, `α` and `β` are pinned at 0 and
    /// the page is modelled as a plane. Default: true.
    pub curvature: bool,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            focal_length: 1.8,
            curvature_seed: [0.0, 0.0],
            curvature: true,
        }
    }
}

impl ModelParams {
    /// `(α, β)` to start the fit from: the seed, or zero for a flat page.
    pub fn initial_curvature(&self) -> [f64; 2] {
        if self.curvature {
            self.curvature_seed
        } else {
            [0.0, 0.0]
        }
    }
}

/// Height of the page surface above flat-page position `x`.
pub fn curvature_height(alpha: f64, beta: f64, x: f64) -> f64 {
    let c = [alpha + beta, -2.0 * alpha - beta, alpha, 0.0];
    c.iter().fold(0.0, |acc, &ci| acc * x + ci)
}

/// Pose and curvature read out of a parameter vector once per batch.
struct Pose {
    rotation: Rotation3<f64>,
    translation: Vector3<f64>,
    alpha: f64,
    beta: f64,
}

impl Pose {
    fn from_params(params: &[f64], curvature: bool) -> Self {
        let r = &params[ParamLayout::ROTATION];
        let t = &params[ParamLayout::TRANSLATION];
        let (alpha, beta) = if curvature {
            (params[ParamLayout::ALPHA], params[ParamLayout::BETA])
        } else {
            (0.0, 0.0)
        };
        Self {
            rotation: Rotation3::new(Vector3::new(r[0], r[1], r[2])),
            translation: Vector3::new(t[0], t[1], t[2]),
            alpha,
            beta,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projector {
    focal_length: f64,
    curvature: bool,
}

impl Default for Projector {
    fn default() -> Self {
        Self::from_params(&ModelParams::default())
    }
}

impl Projector {
    pub fn new(focal_length: f64) -> Self {
        Self {
            focal_length,
            curvature: true,
        }
    }

    pub fn from_params(params: &ModelParams) -> Self {
        Self::new(params.focal_length).with_curvature(params.curvature)
    }

    /// Read `α` and `β` from the parameter vector (`true`) or treat the page
    /// as flat whatever those slots hold.
    pub fn with_curvature(mut self, curvature: bool) -> Self {
        self.curvature = curvature;
        self
    }

    pub fn focal_length(&self) -> f64 {
        self.focal_length
    }

    pub fn curvature(&self) -> bool {
        self.curvature
    }

    fn pose(&self, params: &[f64]) -> Pose {
        Pose::from_params(params, self.curvature)
    }

    fn project_with(&self, pose: &Pose, flat: Point2<f64>) -> Point2<f64> {
        let z = curvature_height(pose.alpha, pose.beta, flat.x);
        let pc = pose.rotation * Point3::new(flat.x, flat.y, z) + pose.translation;
        let f = self.focal_length;
        let denom = pc.z + f;
        Point2::new(f * pc.x / denom, f * pc.y / denom)
    }

    /// Normalized image position of flat-page point `flat`.
    ///
    /// # Panics
    /// If `params` is shorter than [`ParamLayout::FIXED`].
    pub fn project(&self, params: &[f64], flat: Point2<f64>) -> Point2<f64> {
        self.project_with(&self.pose(params), flat)
    }

    pub fn project_points(&self, params: &[f64], flat: &[Point2<f64>]) -> Vec<Point2<f64>> {
        let pose = self.pose(params);
        flat.iter().map(|&p| self.project_with(&pose, p)).collect()
    }

    /// Project the flat coordinates held in `params` at each key index.
    ///
    /// Entry 0 is always projected from flat `(0, 0)`, whatever its key
    /// index points at. This pins the page anchor to the flat origin; the
    /// anchor's key index `(0, 0)` would otherwise read rotation slots.
    pub fn project_keypoints(&self, params: &[f64], key_indices: &[KeyIndex]) -> Vec<Point2<f64>> {
        let pose = self.pose(params);
        key_indices
            .iter()
            .enumerate()
            .map(|(i, ki)| {
                let flat = if i == 0 {
                    Point2::origin()
                } else {
                    Point2::new(params[ki.x], params[ki.y])
                };
                self.project_with(&pose, flat)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn zero_params(extra: usize) -> Vec<f64> {
        vec![0.0; ParamLayout::FIXED + extra]
    }

    #[test]
    fn cubic_vanishes_at_page_ends() {
        for (a, b) in [(0.3, -0.2), (1.0, 1.0), (-0.5, 0.0)] {
            assert_abs_diff_eq!(curvature_height(a, b, 0.0), 0.0);
            assert_abs_diff_eq!(curvature_height(a, b, 1.0), 0.0, epsilon = 1e-12);
        }
        assert_abs_diff_eq!(curvature_height(0.4, 0.0, 0.5), 0.05, epsilon = 1e-12);
    }

    #[test]
    fn zero_pose_is_identity() {
        let projector = Projector::default();
        let params = zero_params(0);
        for p in [Point2::new(0.3, -0.7), Point2::new(-1.0, 0.25), Point2::origin()] {
            let q = projector.project(&params, p);
            assert_abs_diff_eq!(q.x, p.x, epsilon = 1e-12);
            assert_abs_diff_eq!(q.y, p.y, epsilon = 1e-12);
        }
    }

    #[test]
    fn depth_shrinks_towards_centre() {
        let projector = Projector::default();
        let mut params = zero_params(0);
        params[5] = 1.8;
        let q = projector.project(&params, Point2::new(0.5, -0.5));
        assert_abs_diff_eq!(q.x, 0.25, epsilon = 1e-12);
        assert_abs_diff_eq!(q.y, -0.25, epsilon = 1e-12);
    }

    #[test]
    fn rotation_about_z_turns_the_page() {
        let projector = Projector::default();
        let mut params = zero_params(0);
        params[2] = std::f64::consts::FRAC_PI_2;
        let q = projector.project(&params, Point2::new(0.5, 0.0));
        assert_abs_diff_eq!(q.x, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(q.y, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn flat_projector_ignores_curvature_slots() {
        let mut params = zero_params(0);
        params[ParamLayout::ALPHA] = 0.3;
        params[ParamLayout::BETA] = -0.2;
        let p = Point2::new(0.5, -0.25);

        let curved = Projector::default().project(&params, p);
        assert!((curved - p).norm() > 1e-3);

        let flat = Projector::from_params(&ModelParams {
            curvature: false,
            ..ModelParams::default()
        });
        assert!(!flat.curvature());
        let q = flat.project(&params, p);
        assert_abs_diff_eq!(q.x, p.x, epsilon = 1e-12);
        assert_abs_diff_eq!(q.y, p.y, epsilon = 1e-12);
    }

    #[test]
    fn initial_curvature_follows_the_switch() {
        let mut model = ModelParams {
            curvature_seed: [0.1, -0.1],
            ..ModelParams::default()
        };
        assert_eq!(model.initial_curvature(), [0.1, -0.1]);
        model.curvature = false;
        assert_eq!(model.initial_curvature(), [0.0, 0.0]);
    }

    #[test]
    fn anchor_entry_ignores_its_key_index() {
        let projector = Projector::default();
        let layout = ParamLayout::new(1, 2);
        let mut params = zero_params(3);
        params[0] = 0.2; // rotation slot that KeyIndex::ANCHOR points at
        params[layout.span_offset_slot(0)] = 0.1;
        params[layout.column_slot(0)] = -0.4;
        params[layout.column_slot(1)] = 0.4;

        let keys = [
            KeyIndex::ANCHOR,
            layout.key_index(0, 0),
            layout.key_index(0, 1),
        ];
        let projected = projector.project_keypoints(&params, &keys);
        let expected = projector.project_points(
            &params,
            &[
                Point2::origin(),
                Point2::new(-0.4, 0.1),
                Point2::new(0.4, 0.1),
            ],
        );
        for (p, e) in projected.iter().zip(&expected) {
            assert_abs_diff_eq!(p.x, e.x, epsilon = 1e-15);
            assert_abs_diff_eq!(p.y, e.y, epsilon = 1e-15);
        }
    }
}

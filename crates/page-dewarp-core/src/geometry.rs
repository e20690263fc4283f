use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Absolute difference between two angles, wrapped into `[0, π]`.
pub fn angle_distance(a: f64, b: f64) -> f64 {
    let two_pi = 2.0 * PI;
    // Difference in [-π, π).
    let mut diff = (b - a).rem_euclid(two_pi);
    if diff >= PI {
        diff -= two_pi;
    }
    diff.abs()
}

/// Signed overlap of two closed intervals: positive for the length of the
/// intersection, negative for the size of the gap between them.
pub fn interval_overlap(a: (f64, f64), b: (f64, f64)) -> f64 {
    a.1.min(b.1) - a.0.max(b.0)
}

/// Axis-aligned box in pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Point2<f64>,
    pub max: Point2<f64>,
}

impl BoundingBox {
    /// Smallest box containing all `points`; `None` for an empty slice.
    pub fn from_points(points: &[Point2<f64>]) -> Option<Self> {
        let first = *points.first()?;
        let mut min = first;
        let mut max = first;
        for p in &points[1..] {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
        }
        Some(Self { min, max })
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn x_interval(&self) -> (f64, f64) {
        (self.min.x, self.max.x)
    }

    pub fn y_interval(&self) -> (f64, f64) {
        (self.min.y, self.max.y)
    }
}

/// Page quadrilateral, clockwise from the top-left corner.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PageCorners {
    pub top_left: Point2<f64>,
    pub top_right: Point2<f64>,
    pub bottom_right: Point2<f64>,
    pub bottom_left: Point2<f64>,
}

impl PageCorners {
    pub fn to_array(&self) -> [Point2<f64>; 4] {
        [
            self.top_left,
            self.top_right,
            self.bottom_right,
            self.bottom_left,
        ]
    }

    /// Apply `f` to every corner.
    pub fn map(&self, f: impl Fn(Point2<f64>) -> Point2<f64>) -> Self {
        Self {
            top_left: f(self.top_left),
            top_right: f(self.top_right),
            bottom_right: f(self.bottom_right),
            bottom_left: f(self.bottom_left),
        }
    }

    pub fn width(&self) -> f64 {
        (self.top_right - self.top_left).norm()
    }

    pub fn height(&self) -> f64 {
        (self.bottom_left - self.top_left).norm()
    }
}

/// Pixel ↔ normalized coordinate transform for one image size.
///
/// Normalized coordinates put the origin at the image centre and scale by
/// half the larger image dimension, so the long axis spans `[-1, 1]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Normalizer {
    width: usize,
    height: usize,
    scale: f64,
    offset: Vector2<f64>,
}

impl Normalizer {
    pub fn new(width: usize, height: usize) -> Self {
        let max_dim = width.max(height).max(1) as f64;
        Self {
            width,
            height,
            scale: 2.0 / max_dim,
            offset: Vector2::new(width as f64 * 0.5, height as f64 * 0.5),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Normalized units per pixel.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn pix_to_norm(&self, p: Point2<f64>) -> Point2<f64> {
        Point2::from((p.coords - self.offset) * self.scale)
    }

    pub fn norm_to_pix(&self, p: Point2<f64>) -> Point2<f64> {
        Point2::from(p.coords / self.scale + self.offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn angle_distance_wraps() {
        assert_abs_diff_eq!(angle_distance(0.1, -0.1), 0.2, epsilon = 1e-12);
        assert_abs_diff_eq!(angle_distance(PI - 0.05, -PI + 0.05), 0.1, epsilon = 1e-12);
        assert_abs_diff_eq!(angle_distance(0.0, PI), PI, epsilon = 1e-12);
        assert_abs_diff_eq!(angle_distance(0.0, 3.0 * PI), PI, epsilon = 1e-9);
    }

    #[test]
    fn interval_overlap_reports_gap_as_negative() {
        assert_eq!(interval_overlap((0.0, 10.0), (5.0, 20.0)), 5.0);
        assert_eq!(interval_overlap((0.0, 10.0), (12.0, 20.0)), -2.0);
        assert_eq!(interval_overlap((0.0, 10.0), (2.0, 3.0)), 1.0);
    }

    #[test]
    fn normalizer_is_its_own_inverse() {
        let n = Normalizer::new(640, 480);
        assert_abs_diff_eq!(n.scale(), 2.0 / 640.0);
        let centre = n.pix_to_norm(Point2::new(320.0, 240.0));
        assert_abs_diff_eq!(centre.x, 0.0);
        assert_abs_diff_eq!(centre.y, 0.0);
        let corner = n.pix_to_norm(Point2::new(640.0, 0.0));
        assert_abs_diff_eq!(corner.x, 1.0);
        assert_abs_diff_eq!(corner.y, -0.75);

        for p in [
            Point2::new(0.0, 0.0),
            Point2::new(13.5, 400.25),
            Point2::new(639.0, 479.0),
        ] {
            let back = n.norm_to_pix(n.pix_to_norm(p));
            assert_abs_diff_eq!(back.x, p.x, epsilon = 1e-9);
            assert_abs_diff_eq!(back.y, p.y, epsilon = 1e-9);
        }
    }

    #[test]
    fn bounding_box_of_points() {
        let bb = BoundingBox::from_points(&[
            Point2::new(3.0, 4.0),
            Point2::new(-1.0, 7.0),
            Point2::new(2.0, 1.0),
        ])
        .expect("non-empty");
        assert_eq!(bb.min, Point2::new(-1.0, 1.0));
        assert_eq!(bb.max, Point2::new(3.0, 7.0));
        assert_eq!(bb.width(), 4.0);
        assert_eq!(bb.height(), 6.0);
        assert!(BoundingBox::from_points(&[]).is_none());
    }
}

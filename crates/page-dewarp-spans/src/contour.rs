//! Per-blob geometric summary.

use crate::params::ContourFilterParams;
use nalgebra::{Point2, Vector2};
use page_dewarp_core::{interval_overlap, BoundingBox};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Polygons with less area than this are treated as degenerate.
const MIN_AREA: f64 = 1e-9;

/// One connected blob, summarized from its boundary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Contour {
    /// Ordered boundary points in pixels.
    pub outline: Vec<Point2<f64>>,
    pub bounds: BoundingBox,
    /// Enclosed polygon area; 0 for degenerate outlines.
    pub area: f64,
    pub center: Point2<f64>,
    /// Principal axis angle in `(-π/2, π/2]`.
    pub angle: f64,
    /// Unit vector along the principal axis, with non-negative x.
    pub tangent: Vector2<f64>,
    /// Extent of the outline along `tangent`, relative to `center`.
    pub local_range: (f64, f64),
    /// Leftmost anchor: `center + tangent * local_range.0`.
    pub point0: Point2<f64>,
    /// Rightmost anchor: `center + tangent * local_range.1`.
    pub point1: Point2<f64>,
}

/// Raw geometric moments up to second order.
#[derive(Clone, Copy, Debug, Default)]
struct Moments {
    m00: f64,
    m10: f64,
    m01: f64,
    m20: f64,
    m11: f64,
    m02: f64,
}

impl Moments {
    /// Area moments of the closed polygon (Green's theorem), oriented so
    /// that `m00 >= 0`.
    fn of_polygon(points: &[Vector2<f64>]) -> Self {
        let mut m = Moments::default();
        let n = points.len();
        if n < 3 {
            return m;
        }
        for i in 0..n {
            let p = points[(i + n - 1) % n];
            let q = points[i];
            let cross = p.x * q.y - q.x * p.y;
            m.m00 += cross;
            m.m10 += cross * (p.x + q.x);
            m.m01 += cross * (p.y + q.y);
            m.m20 += cross * (p.x * p.x + p.x * q.x + q.x * q.x);
            m.m11 += cross * (p.x * (2.0 * p.y + q.y) + q.x * (p.y + 2.0 * q.y));
            m.m02 += cross * (p.y * p.y + p.y * q.y + q.y * q.y);
        }
        let sign = if m.m00 < 0.0 { -1.0 } else { 1.0 };
        Moments {
            m00: sign * m.m00 / 2.0,
            m10: sign * m.m10 / 6.0,
            m01: sign * m.m01 / 6.0,
            m20: sign * m.m20 / 12.0,
            m11: sign * m.m11 / 24.0,
            m02: sign * m.m02 / 12.0,
        }
    }

    /// Moments of the vertices as unit point masses.
    fn of_vertices(points: &[Vector2<f64>]) -> Self {
        let mut m = Moments::default();
        for p in points {
            m.m00 += 1.0;
            m.m10 += p.x;
            m.m01 += p.y;
            m.m20 += p.x * p.x;
            m.m11 += p.x * p.y;
            m.m02 += p.y * p.y;
        }
        m
    }

    fn centroid(&self) -> Vector2<f64> {
        if self.m00 <= 0.0 {
            return Vector2::zeros();
        }
        Vector2::new(self.m10 / self.m00, self.m01 / self.m00)
    }

    /// Orientation of the major axis from the central second moments.
    fn principal_angle(&self) -> f64 {
        if self.m00 <= 0.0 {
            return 0.0;
        }
        let c = self.centroid();
        let mu20 = self.m20 / self.m00 - c.x * c.x;
        let mu11 = self.m11 / self.m00 - c.x * c.y;
        let mu02 = self.m02 / self.m00 - c.y * c.y;
        if mu11 == 0.0 && mu20 == mu02 {
            return 0.0;
        }
        0.5 * (2.0 * mu11).atan2(mu20 - mu02)
    }
}

impl Contour {
    /// Summarize a blob outline. Degenerate outlines (fewer than three
    /// points, or zero enclosed area) fall back to vertex statistics and
    /// report an area of 0; an empty outline yields a contour at the origin.
    pub fn from_outline(outline: Vec<Point2<f64>>) -> Self {
        let origin = outline.first().copied().unwrap_or_else(Point2::origin);
        let bounds = BoundingBox::from_points(&outline).unwrap_or(BoundingBox {
            min: origin,
            max: origin,
        });

        // Moments relative to the first vertex keep the central moments
        // accurate at large pixel coordinates.
        let local: Vec<Vector2<f64>> = outline.iter().map(|p| p - origin).collect();
        let polygon = Moments::of_polygon(&local);
        let (moments, area) = if polygon.m00 > MIN_AREA {
            (polygon, polygon.m00)
        } else {
            (Moments::of_vertices(&local), 0.0)
        };

        let center = origin + moments.centroid();
        let mut angle = moments.principal_angle();
        if angle <= -std::f64::consts::FRAC_PI_2 {
            angle += std::f64::consts::PI;
        }
        let tangent = Vector2::new(angle.cos(), angle.sin());

        let (lo, hi) = outline
            .iter()
            .map(|p| tangent.dot(&(p - center)))
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), t| {
                (lo.min(t), hi.max(t))
            });
        let local_range = if lo <= hi { (lo, hi) } else { (0.0, 0.0) };

        Self {
            point0: center + tangent * local_range.0,
            point1: center + tangent * local_range.1,
            outline,
            bounds,
            area,
            center,
            angle,
            tangent,
            local_range,
        }
    }

    pub fn width(&self) -> f64 {
        self.bounds.width()
    }

    pub fn height(&self) -> f64 {
        self.bounds.height()
    }

    /// Width over height; infinite for a flat, non-empty box.
    pub fn aspect(&self) -> f64 {
        let h = self.height();
        if h > 0.0 {
            self.width() / h
        } else if self.width() > 0.0 {
            f64::INFINITY
        } else {
            0.0
        }
    }

    /// Largest vertical extent of the outline within one pixel column.
    pub fn thickness(&self) -> f64 {
        let mut columns: BTreeMap<i64, (f64, f64)> = BTreeMap::new();
        for p in &self.outline {
            let entry = columns.entry(p.x.round() as i64).or_insert((p.y, p.y));
            entry.0 = entry.0.min(p.y);
            entry.1 = entry.1.max(p.y);
        }
        columns
            .values()
            .map(|(lo, hi)| hi - lo)
            .fold(0.0, f64::max)
    }

    /// Distance from the centre to the farther anchor.
    pub fn half_length(&self) -> f64 {
        self.local_range.0.abs().max(self.local_range.1.abs())
    }

    /// Overlap of `other`'s anchors with this contour, measured along this
    /// contour's tangent; negative values are gaps.
    pub fn local_overlap(&self, other: &Contour) -> f64 {
        let t0 = self.tangent.dot(&(other.point0 - self.center));
        let t1 = self.tangent.dot(&(other.point1 - self.center));
        interval_overlap(self.local_range, (t0.min(t1), t0.max(t1)))
    }

    /// Whether the contour looks like a piece of a text line.
    pub fn is_text_like(&self, params: &ContourFilterParams) -> bool {
        let w = self.width();
        let h = self.height();
        w >= params.min_width
            && h >= params.min_height
            && w >= params.min_aspect * h
            && self.thickness() <= params.max_thickness
    }
}

//! Least-squares line and parabola fits `y = f(x)` via the normal equations.
//!
//! Abscissas are centred and scaled to `[-1, 1]` before the sums are formed,
//! so fits over pixel-sized x values stay well conditioned.

use crate::stats::median;
use nalgebra::{Matrix2, Matrix3, Point2, Vector2, Vector3};
use serde::{Deserialize, Serialize};

/// Relative determinant below which the normal equations count as singular.
const SINGULAR_TOLERANCE: f64 = 1e-12;

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitError {
    #[error("need at least {required} points to fit, got {got}")]
    TooFewPoints { required: usize, got: usize },
    #[error("normal equations are singular")]
    Singular,
}

/// `y = slope * x + intercept`
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearFit {
    pub fn eval(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// `y = a * x² + b * x + c`
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuadraticFit {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl QuadraticFit {
    pub fn eval(&self, x: f64) -> f64 {
        (self.a * x + self.b) * x + self.c
    }

    pub fn slope_at(&self, x: f64) -> f64 {
        2.0 * self.a * x + self.b
    }
}

/// Centre and scale of the abscissas: `u = (x - mean) / half_range`.
struct Abscissa {
    mean: f64,
    half_range: f64,
}

impl Abscissa {
    fn of(points: &[Point2<f64>]) -> Result<Self, FitError> {
        let mean = points.iter().map(|p| p.x).sum::<f64>() / points.len() as f64;
        let half_range = points
            .iter()
            .map(|p| (p.x - mean).abs())
            .fold(0.0, f64::max);
        if half_range <= 0.0 || !half_range.is_finite() {
            return Err(FitError::Singular);
        }
        Ok(Self { mean, half_range })
    }

    fn u(&self, x: f64) -> f64 {
        (x - self.mean) / self.half_range
    }
}

fn require(points: &[Point2<f64>], required: usize) -> Result<(), FitError> {
    if points.len() < required {
        return Err(FitError::TooFewPoints {
            required,
            got: points.len(),
        });
    }
    Ok(())
}

/// Ordinary least-squares line through `points`.
pub fn linear_fit(points: &[Point2<f64>]) -> Result<LinearFit, FitError> {
    require(points, 2)?;
    let ax = Abscissa::of(points)?;

    let n = points.len() as f64;
    let (mut su, mut suu, mut sy, mut suy) = (0.0, 0.0, 0.0, 0.0);
    for p in points {
        let u = ax.u(p.x);
        su += u;
        suu += u * u;
        sy += p.y;
        suy += u * p.y;
    }

    let m = Matrix2::new(suu, su, su, n);
    if m.determinant().abs() <= SINGULAR_TOLERANCE * suu * n {
        return Err(FitError::Singular);
    }
    let sol = m
        .lu()
        .solve(&Vector2::new(suy, sy))
        .ok_or(FitError::Singular)?;

    // y = B u + C with u = (x - mean) / s
    let slope = sol[0] / ax.half_range;
    Ok(LinearFit {
        slope,
        intercept: sol[1] - slope * ax.mean,
    })
}

/// Ordinary least-squares parabola through `points`.
pub fn quadratic_fit(points: &[Point2<f64>]) -> Result<QuadraticFit, FitError> {
    require(points, 3)?;
    let ax = Abscissa::of(points)?;

    let n = points.len() as f64;
    let (mut s1, mut s2, mut s3, mut s4) = (0.0, 0.0, 0.0, 0.0);
    let (mut sy, mut s1y, mut s2y) = (0.0, 0.0, 0.0);
    for p in points {
        let u = ax.u(p.x);
        let u2 = u * u;
        s1 += u;
        s2 += u2;
        s3 += u2 * u;
        s4 += u2 * u2;
        sy += p.y;
        s1y += u * p.y;
        s2y += u2 * p.y;
    }

    #[rustfmt::skip]
    let m = Matrix3::new(
        s4, s3, s2,
        s3, s2, s1,
        s2, s1, n,
    );
    if m.determinant().abs() <= SINGULAR_TOLERANCE * s4 * s2 * n {
        return Err(FitError::Singular);
    }
    let sol = m
        .lu()
        .solve(&Vector3::new(s2y, s1y, sy))
        .ok_or(FitError::Singular)?;

    // y = A u² + B u + C with u = (x - mean) / s
    let (mean, s) = (ax.mean, ax.half_range);
    let a = sol[0] / (s * s);
    let b_u = sol[1] / s;
    Ok(QuadraticFit {
        a,
        b: b_u - 2.0 * a * mean,
        c: a * mean * mean - b_u * mean + sol[2],
    })
}

/// Median absolute residual `|y - model(x)|` over `points`.
pub fn median_fit_error(points: &[Point2<f64>], model: impl Fn(f64) -> f64) -> Option<f64> {
    let residuals: Vec<f64> = points.iter().map(|p| (p.y - model(p.x)).abs()).collect();
    median(&residuals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn pts(xy: &[(f64, f64)]) -> Vec<Point2<f64>> {
        xy.iter().map(|&(x, y)| Point2::new(x, y)).collect()
    }

    #[test]
    fn line_through_exact_points() {
        let fit = linear_fit(&pts(&[(0.0, 1.0), (1.0, 3.0), (2.0, 5.0), (3.0, 7.0)]))
            .expect("fit");
        assert_abs_diff_eq!(fit.slope, 2.0, epsilon = 1e-9);
        assert_abs_diff_eq!(fit.intercept, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn line_minimizes_squared_error() {
        // Symmetric noise around y = x.
        let fit = linear_fit(&pts(&[(0.0, 1.0), (0.0, -1.0), (2.0, 3.0), (2.0, 1.0)]))
            .expect("fit");
        assert_abs_diff_eq!(fit.slope, 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(fit.intercept, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn parabola_at_pixel_scale() {
        let truth = QuadraticFit {
            a: 2.0e-4,
            b: -0.3,
            c: 412.0,
        };
        let points: Vec<_> = (0..12)
            .map(|i| {
                let x = 900.0 + 20.0 * i as f64;
                Point2::new(x, truth.eval(x))
            })
            .collect();
        let fit = quadratic_fit(&points).expect("fit");
        for p in &points {
            assert_abs_diff_eq!(fit.eval(p.x), p.y, epsilon = 1e-6);
        }
        assert_abs_diff_eq!(fit.a, truth.a, epsilon = 1e-9);
        assert_abs_diff_eq!(fit.slope_at(1000.0), truth.slope_at(1000.0), epsilon = 1e-7);
    }

    #[test]
    fn too_few_points_is_reported() {
        assert_eq!(
            linear_fit(&pts(&[(1.0, 1.0)])),
            Err(FitError::TooFewPoints {
                required: 2,
                got: 1
            })
        );
        assert_eq!(
            quadratic_fit(&pts(&[(1.0, 1.0), (2.0, 2.0)])),
            Err(FitError::TooFewPoints {
                required: 3,
                got: 2
            })
        );
    }

    #[test]
    fn repeated_abscissa_is_singular() {
        assert_eq!(
            linear_fit(&pts(&[(4.0, 1.0), (4.0, 2.0), (4.0, 9.0)])),
            Err(FitError::Singular)
        );
        // Only two distinct x values cannot pin a parabola.
        assert_eq!(
            quadratic_fit(&pts(&[(0.0, 0.0), (0.0, 1.0), (1.0, 1.0), (1.0, 2.0)])),
            Err(FitError::Singular)
        );
    }

    #[test]
    fn median_error_ignores_single_outlier() {
        let fit = LinearFit {
            slope: 0.0,
            intercept: 0.0,
        };
        let err = median_fit_error(
            &pts(&[(0.0, 0.1), (1.0, -0.2), (2.0, 50.0)]),
            |x| fit.eval(x),
        )
        .expect("non-empty");
        assert_abs_diff_eq!(err, 0.2);
    }
}

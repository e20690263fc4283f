//! Derivative-free local minimization behind a small strategy trait.

use serde::{Deserialize, Serialize};

/// Floor added to the relative convergence test so exact zeros terminate.
const TINY: f64 = 1e-10;

/// Scalar function of a parameter vector.
pub trait Objective {
    fn evaluate(&self, x: &[f64]) -> f64;
}

impl<F> Objective for F
where
    F: Fn(&[f64]) -> f64,
{
    fn evaluate(&self, x: &[f64]) -> f64 {
        self(x)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MinimizerSettings {
    /// Offset of the initial simplex vertices along each axis.
    pub initial_step: f64,
    pub max_iterations: usize,
    /// Relative spread of objective values at which the search stops.
    pub tolerance: f64,
}

/// Best point found and the objective value there.
#[derive(Clone, Debug, PartialEq)]
pub struct Minimum {
    pub point: Vec<f64>,
    pub value: f64,
    pub iterations: usize,
    pub evaluations: usize,
}

/// Unconstrained local minimizer.
///
/// Implementations must be deterministic for a fixed objective, start point
/// and settings, and must never return a value above the objective at
/// `initial`.
pub trait Minimizer {
    fn minimize(
        &self,
        objective: &dyn Objective,
        initial: &[f64],
        settings: &MinimizerSettings,
    ) -> Minimum;
}

/// Nelder–Mead downhill simplex with the standard coefficients
/// (reflection 1, expansion 2, contraction ½, shrink ½).
#[derive(Clone, Copy, Debug, Default)]
pub struct NelderMead;

struct Counted<'a> {
    objective: &'a dyn Objective,
    evaluations: usize,
}

impl Counted<'_> {
    /// NaN is ranked as the worst possible value.
    fn eval(&mut self, x: &[f64]) -> f64 {
        self.evaluations += 1;
        let v = self.objective.evaluate(x);
        if v.is_nan() {
            f64::INFINITY
        } else {
            v
        }
    }
}

fn converged(best: f64, worst: f64, tolerance: f64) -> bool {
    if !worst.is_finite() {
        return false;
    }
    2.0 * (worst - best).abs() <= tolerance * (worst.abs() + best.abs()) + TINY
}

impl Minimizer for NelderMead {
    fn minimize(
        &self,
        objective: &dyn Objective,
        initial: &[f64],
        settings: &MinimizerSettings,
    ) -> Minimum {
        let n = initial.len();
        let mut f = Counted {
            objective,
            evaluations: 0,
        };

        let mut simplex: Vec<Vec<f64>> = Vec::with_capacity(n + 1);
        simplex.push(initial.to_vec());
        for i in 0..n {
            let mut v = initial.to_vec();
            v[i] += settings.initial_step;
            simplex.push(v);
        }
        let mut values: Vec<f64> = simplex.iter().map(|v| f.eval(v)).collect();

        let mut iterations = 0;
        loop {
            // Stable sort keeps the ordering deterministic on ties.
            let mut order: Vec<usize> = (0..=n).collect();
            order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
            simplex = order.iter().map(|&i| std::mem::take(&mut simplex[i])).collect();
            values = order.iter().map(|&i| values[i]).collect();

            if n == 0 || iterations >= settings.max_iterations {
                break;
            }
            if converged(values[0], values[n], settings.tolerance) {
                break;
            }
            iterations += 1;

            let mut centroid = vec![0.0; n];
            for v in &simplex[..n] {
                for (c, x) in centroid.iter_mut().zip(v) {
                    *c += x;
                }
            }
            centroid.iter_mut().for_each(|c| *c /= n as f64);

            let worst = &simplex[n];
            let along = |t: f64| -> Vec<f64> {
                centroid
                    .iter()
                    .zip(worst)
                    .map(|(c, w)| c + t * (c - w))
                    .collect()
            };

            let reflected = along(1.0);
            let f_reflected = f.eval(&reflected);

            let replacement = if f_reflected < values[0] {
                let expanded = along(2.0);
                let f_expanded = f.eval(&expanded);
                if f_expanded < f_reflected {
                    Some((expanded, f_expanded))
                } else {
                    Some((reflected, f_reflected))
                }
            } else if f_reflected < values[n - 1] {
                Some((reflected, f_reflected))
            } else if f_reflected < values[n] {
                let outside = along(0.5);
                let f_outside = f.eval(&outside);
                (f_outside <= f_reflected).then_some((outside, f_outside))
            } else {
                let inside = along(-0.5);
                let f_inside = f.eval(&inside);
                (f_inside < values[n]).then_some((inside, f_inside))
            };

            match replacement {
                Some((point, value)) => {
                    simplex[n] = point;
                    values[n] = value;
                }
                None => {
                    let best = simplex[0].clone();
                    for i in 1..=n {
                        for (x, b) in simplex[i].iter_mut().zip(&best) {
                            *x = b + 0.5 * (*x - b);
                        }
                        values[i] = f.eval(&simplex[i]);
                    }
                }
            }
        }

        Minimum {
            point: simplex.swap_remove(0),
            value: values[0],
            iterations,
            evaluations: f.evaluations,
        }
    }
}

use crate::minimizer::{Minimizer, MinimizerSettings, NelderMead, Objective};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Termination settings handed to the minimizer.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OptimizerParams {
    /// Initial simplex step in parameter units. Default: 0.5.
    pub initial_step: f64,
    /// Iteration cap. Default: 5000.
    pub max_iterations: usize,
    /// Relative objective tolerance. Default: 1e-4.
    pub tolerance: f64,
}

impl Default for OptimizerParams {
    fn default() -> Self {
        Self {
            initial_step: 0.5,
            max_iterations: 5000,
            tolerance: 1e-4,
        }
    }
}

impl OptimizerParams {
    pub fn settings(&self) -> MinimizerSettings {
        MinimizerSettings {
            initial_step: self.initial_step,
            max_iterations: self.max_iterations,
            tolerance: self.tolerance,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OptimizeResult {
    /// Fitted parameter vector; the initial one when `stalled`.
    pub params: Vec<f64>,
    pub initial_residual: f64,
    pub residual: f64,
    pub iterations: usize,
    pub evaluations: usize,
    pub elapsed: Duration,
    /// No strict improvement over the initial vector was found.
    pub stalled: bool,
}

/// Runs a [`Minimizer`] once from a given start and reports the outcome.
#[derive(Clone, Debug)]
pub struct Optimizer<M = NelderMead> {
    minimizer: M,
    params: OptimizerParams,
}

impl Optimizer<NelderMead> {
    pub fn new(params: OptimizerParams) -> Self {
        Self::with_minimizer(NelderMead, params)
    }
}

impl Default for Optimizer<NelderMead> {
    fn default() -> Self {
        Self::new(OptimizerParams::default())
    }
}

impl<M: Minimizer> Optimizer<M> {
    pub fn with_minimizer(minimizer: M, params: OptimizerParams) -> Self {
        Self { minimizer, params }
    }

    pub fn minimizer(&self) -> &M {
        &self.minimizer
    }

    pub fn params(&self) -> &OptimizerParams {
        &self.params
    }

    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, initial, objective), fields(dims = initial.len()))
    )]
    pub fn optimize(&self, initial: &[f64], objective: &dyn Objective) -> OptimizeResult {
        let start = Instant::now();
        let initial_residual = objective.evaluate(initial);
        log::info!(
            "optimizing {} parameters, initial residual {:.6e}",
            initial.len(),
            initial_residual
        );

        let minimum = self
            .minimizer
            .minimize(objective, initial, &self.params.settings());
        let elapsed = start.elapsed();

        let stalled = !(minimum.value.is_finite() && minimum.value < initial_residual);
        let result = if stalled {
            log::warn!(
                "optimizer made no progress after {} iterations; keeping initial parameters",
                minimum.iterations
            );
            OptimizeResult {
                params: initial.to_vec(),
                initial_residual,
                residual: initial_residual,
                iterations: minimum.iterations,
                evaluations: minimum.evaluations,
                elapsed,
                stalled,
            }
        } else {
            OptimizeResult {
                params: minimum.point,
                initial_residual,
                residual: minimum.value,
                iterations: minimum.iterations,
                evaluations: minimum.evaluations,
                elapsed,
                stalled,
            }
        };

        log::info!(
            "optimization done: residual {:.6e} -> {:.6e}, {} iterations, {:.3}s",
            result.initial_residual,
            result.residual,
            result.iterations,
            result.elapsed.as_secs_f64()
        );
        result
    }
}

//! Line search strategies over scalar merit functions.
//!
//! A search controller hands the strategy a one-dimensional merit function
//! `phi(t)` along its current search direction, the initial slope `phi'(0)`,
//! and a trial step. The strategy returns the accepted step together with
//! the number of merit evaluations it performed, so the caller can track its
//! oracle budget precisely.
//!
//! The returned step is either finite or NaN: NaN is the caller's signal for
//! unsuccessful termination (soft, not an error). Strategies must never
//! return an infinite step and must treat a NaN merit value as rejection.
//!
//! The default [`StaticStep`] performs no adaptive search and costs no
//! evaluations; [`ArmijoBacktracking`] is the richer interchangeable
//! strategy. Both are consumed through the same [`LineSearch`] trait, so
//! swapping them does not change the controller contract.

use crate::{
    error::{Result, SaddleError},
    types::Scalar,
};
use num_traits::Float;
use std::fmt::Debug;

/// Parameters for adaptive line search strategies.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LineSearchParams<T: Scalar> {
    /// Sufficient decrease constant `c1` in (0, 1).
    pub c1: T,

    /// Backtracking reduction factor `rho` in (0, 1).
    pub rho: T,

    /// Maximum number of backtracking steps before giving up.
    pub max_iterations: usize,

    /// Step floor below which the search gives up.
    pub min_step: T,
}

impl<T: Scalar> Default for LineSearchParams<T> {
    fn default() -> Self {
        Self {
            c1: <T as Scalar>::from_f64(1e-4),
            rho: <T as Scalar>::from_f64(0.5),
            max_iterations: 10,
            min_step: T::MIN_STEP_SIZE,
        }
    }
}

impl<T: Scalar> LineSearchParams<T> {
    /// Validates the parameters against their mathematical constraints.
    pub fn validate(&self) -> Result<()> {
        if self.c1 <= T::zero() || self.c1 >= T::one() {
            return Err(SaddleError::invalid_configuration(
                "sufficient decrease constant must be in (0, 1)",
                "c1",
                format!("{}", self.c1),
            ));
        }
        if self.rho <= T::zero() || self.rho >= T::one() {
            return Err(SaddleError::invalid_configuration(
                "backtracking factor must be in (0, 1)",
                "rho",
                format!("{}", self.rho),
            ));
        }
        if self.min_step <= T::zero() {
            return Err(SaddleError::invalid_configuration(
                "step floor must be positive",
                "min_step",
                format!("{}", self.min_step),
            ));
        }
        if self.max_iterations == 0 {
            return Err(SaddleError::invalid_configuration(
                "must allow at least one iteration",
                "max_iterations",
                "0",
            ));
        }
        Ok(())
    }
}

/// Strategy interface for one-dimensional step acceptance.
pub trait LineSearch<T: Scalar>: Debug {
    /// Searches for an acceptable step along the merit function.
    ///
    /// * `merit` - merit value at a trial step; each call is one extra
    ///   oracle evaluation from the caller's point of view. Strategies that
    ///   need a reference value obtain it as `merit(0)`.
    /// * `slope0` - directional derivative of the merit at step zero.
    /// * `trial_step` - the caller's step-size guess.
    ///
    /// Returns `(accepted_step, evaluations)`; the step is NaN when no
    /// acceptable step was found.
    fn search(&self, merit: &mut dyn FnMut(T) -> T, slope0: T, trial_step: T) -> (T, usize);

    /// Returns a human-readable name identifying the strategy.
    fn name(&self) -> &str;
}

/// Static step acceptance: the trial step is taken as-is.
///
/// This is the default strategy. It performs no merit evaluations, so the
/// caller's evaluation counters are unaffected by the line search.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticStep;

impl<T: Scalar> LineSearch<T> for StaticStep {
    fn search(&self, _merit: &mut dyn FnMut(T) -> T, _slope0: T, trial_step: T) -> (T, usize) {
        if Float::is_finite(trial_step) {
            (trial_step, 0)
        } else {
            (T::nan(), 0)
        }
    }

    fn name(&self) -> &str {
        "Static"
    }
}

/// Backtracking line search with the Armijo sufficient decrease condition.
///
/// Starting from the trial step, the step is reduced by `rho` until
/// `phi(t) <= phi(0) + c1 t phi'(0)` holds. One evaluation is spent on the
/// reference value `phi(0)`; failure to satisfy the condition within the
/// iteration budget, or reaching the step floor, yields a NaN step.
#[derive(Debug, Clone, Default)]
pub struct ArmijoBacktracking<T: Scalar> {
    params: LineSearchParams<T>,
}

impl<T: Scalar> ArmijoBacktracking<T> {
    /// Creates a backtracking search with validated parameters.
    pub fn new(params: LineSearchParams<T>) -> Result<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    /// Returns the search parameters.
    pub fn params(&self) -> &LineSearchParams<T> {
        &self.params
    }
}

impl<T: Scalar> LineSearch<T> for ArmijoBacktracking<T> {
    fn search(&self, merit: &mut dyn FnMut(T) -> T, slope0: T, trial_step: T) -> (T, usize) {
        if !Float::is_finite(trial_step) || !Float::is_finite(slope0) {
            return (T::nan(), 0);
        }

        let value0 = merit(T::zero());
        let mut evaluations = 1;
        if Float::is_nan(value0) {
            return (T::nan(), evaluations);
        }

        let mut step = <T as Float>::min(trial_step, T::MAX_STEP_SIZE);
        for _ in 0..self.params.max_iterations {
            let trial = merit(step);
            evaluations += 1;

            if Float::is_finite(trial) && trial <= value0 + self.params.c1 * step * slope0 {
                return (step, evaluations);
            }

            step *= self.params.rho;
            if step < self.params.min_step {
                break;
            }
        }

        (T::nan(), evaluations)
    }

    fn name(&self) -> &str {
        "ArmijoBacktracking"
    }
}

//! Adaptive ODE integrators driving relaxation-type searches.
//!
//! The integrators advance `x' = F(t, x)` for a [`RateField`] oracle that
//! also reports a convergence residual, so continuous-time relaxation can
//! drive the same position updates as a discrete search. Three variants
//! share one contract:
//!
//! - [`Ode12`](embedded::Ode12): embedded Euler/trapezoid pair (orders 1-2)
//! - [`Ode23`](embedded::Ode23): Bogacki-Shampine pair (orders 2-3, FSAL)
//! - [`Ode12r`](residual::Ode12r): residual-driven accept/reject with
//!   secant step-size extrapolation, replacing classical error-per-step
//!   control with a merit-aware policy
//!
//! The generic driver loop is shared; only the step-size and error-estimate
//! formulas differ per variant. All variants terminate successfully once
//! the oracle-reported residual reaches `tol_res`, stop unsuccessfully after
//! `maxnit` attempted steps, and return the gathered trajectory without
//! erroring when the trial step collapses below its floor.

pub mod embedded;
pub mod residual;

use saddlesearch_core::{
    error::{Result, SaddleError},
    log::OdeLog,
    observer::{NullObserver, SearchObserver},
    oracle::RateField,
    termination::TerminationReason,
    types::{DVector, Scalar},
};

use num_traits::Float;
use std::fmt::Debug;
use std::time::Duration;

/// Post-step projection applied to every accepted state, e.g. to re-impose
/// a path constraint. The identity (any `|x| x` closure) is the default.
pub trait Redistribute<T: Scalar> {
    /// Projects an accepted state.
    fn apply(&mut self, x: DVector<T>) -> DVector<T>;
}

impl<T: Scalar, F: FnMut(DVector<T>) -> DVector<T>> Redistribute<T> for F {
    fn apply(&mut self, x: DVector<T>) -> DVector<T> {
        self(x)
    }
}

/// Options shared by every integrator variant.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OdeOptions<T: Scalar> {
    /// Residual tolerance; the run converges once the oracle-reported
    /// residual is at or below this value.
    pub tol_res: T,

    /// Maximum number of attempted steps.
    pub maxnit: usize,

    /// Initial trial step. When absent, a step proportional to
    /// `rtol / R0` is used, clamped away from degenerate values.
    pub h0: Option<T>,
}

impl<T: Scalar> Default for OdeOptions<T> {
    fn default() -> Self {
        Self {
            tol_res: T::DEFAULT_FORCE_TOLERANCE,
            maxnit: 1000,
            h0: None,
        }
    }
}

impl<T: Scalar> OdeOptions<T> {
    /// Creates options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the residual tolerance.
    pub fn with_tol_res(mut self, tol_res: T) -> Self {
        self.tol_res = tol_res;
        self
    }

    /// Sets the attempted-step budget.
    pub fn with_maxnit(mut self, maxnit: usize) -> Self {
        self.maxnit = maxnit;
        self
    }

    /// Sets the initial trial step.
    pub fn with_initial_step(mut self, h0: T) -> Self {
        self.h0 = Some(h0);
        self
    }

    /// Validates the options.
    pub fn validate(&self) -> Result<()> {
        if !(self.tol_res > T::zero()) {
            return Err(SaddleError::invalid_configuration(
                "residual tolerance must be positive",
                "tol_res",
                format!("{}", self.tol_res),
            ));
        }
        if self.maxnit == 0 {
            return Err(SaddleError::invalid_configuration(
                "must allow at least one step",
                "maxnit",
                "0",
            ));
        }
        if let Some(h0) = self.h0 {
            if !(h0 > T::zero()) || !Float::is_finite(h0) {
                return Err(SaddleError::invalid_configuration(
                    "initial step must be positive and finite",
                    "h0",
                    format!("{}", h0),
                ));
            }
        }
        Ok(())
    }
}

/// Result of an adaptive relaxation run.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RelaxationResult<T: Scalar> {
    /// Pseudo-times of the accepted states, starting at zero.
    pub times: Vec<T>,

    /// Accepted states, starting with the initial state.
    pub trajectory: Vec<DVector<T>>,

    /// Per-accepted-step diagnostic columns.
    pub log: OdeLog<T>,

    /// Why the run stopped.
    pub termination: TerminationReason,

    /// True iff the residual tolerance was reached.
    pub converged: bool,

    /// Number of attempted steps.
    pub iterations: usize,

    /// Total rate evaluations, in cost units of `dim` per oracle call.
    pub gradient_evaluations: usize,

    /// Wall-clock time of the run. Diagnostic only.
    pub duration: Duration,
}

impl<T: Scalar> RelaxationResult<T> {
    /// The final state of the trajectory.
    pub fn final_state(&self) -> &DVector<T> {
        self.trajectory
            .last()
            .expect("trajectory always contains the initial state")
    }
}

/// Capability shared by the adaptive integrator variants.
pub trait AdaptiveIntegrator<T: Scalar>: Debug {
    /// Returns a human-readable name identifying the variant.
    fn name(&self) -> &str;

    /// Integrates the rate field from `x0`, projecting accepted states
    /// through `redistribute` and emitting one event per attempted step.
    ///
    /// `dim` is the per-evaluation cost unit used for evaluation-count
    /// bookkeeping (e.g. the number of images moved by one oracle call).
    fn integrate_with<F, R>(
        &self,
        field: &F,
        x0: &DVector<T>,
        dim: usize,
        options: &OdeOptions<T>,
        redistribute: &mut R,
        observer: &mut dyn SearchObserver<T>,
    ) -> Result<RelaxationResult<T>>
    where
        F: RateField<T>,
        R: Redistribute<T>;

    /// Integrates without projection or observation.
    fn integrate<F>(
        &self,
        field: &F,
        x0: &DVector<T>,
        dim: usize,
        options: &OdeOptions<T>,
    ) -> Result<RelaxationResult<T>>
    where
        F: RateField<T>,
        Self: Sized,
    {
        let mut identity = |x: DVector<T>| x;
        self.integrate_with(field, x0, dim, options, &mut identity, &mut NullObserver)
    }
}

/// Scaled infinity-norm error estimate,
/// `err = max_i |e_i| / max(|x_i|, |xnew_i|, threshold)`.
pub(crate) fn scaled_error_norm<T: Scalar>(
    e: &DVector<T>,
    x: &DVector<T>,
    xnew: &DVector<T>,
    threshold: T,
) -> T {
    let mut err = T::zero();
    for i in 0..e.len() {
        let scale = <T as Float>::max(
            <T as Float>::max(<T as Float>::abs(x[i]), <T as Float>::abs(xnew[i])),
            threshold,
        );
        err = <T as Float>::max(err, <T as Float>::abs(e[i]) / scale);
    }
    err
}

/// Step floor for the classical embedded pairs, `16 eps |t|`.
pub(crate) fn step_floor<T: Scalar>(t: T) -> T {
    <T as Scalar>::from_f64(16.0) * T::EPSILON * <T as Float>::abs(t)
}

/// Initial trial step when none is configured: proportional to how far the
/// initial residual sits from tolerance, clamped into `[floor, 1]`.
pub(crate) fn initial_step<T: Scalar>(h0: Option<T>, rtol: T, r0: T, floor: T) -> T {
    match h0 {
        Some(h) => h,
        None => {
            let guess =
                <T as Scalar>::from_f64(0.5) * rtol / <T as Float>::max(r0, T::EPSILON);
            <T as Float>::min(<T as Float>::max(guess, floor), T::one())
        }
    }
}

/// Validates the per-evaluation cost unit.
pub(crate) fn validate_dim(dim: usize) -> Result<()> {
    if dim == 0 {
        return Err(SaddleError::invalid_configuration(
            "per-evaluation cost unit must be positive",
            "dim",
            "0",
        ));
    }
    Ok(())
}

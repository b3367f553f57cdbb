//! Residual-driven adaptive stepping (ODE12r).
//!
//! A variant of the Euler/trapezoid pair with no classical order: instead of
//! pure error-per-step control, a trial step is accepted when the
//! oracle-reported residual strictly contracts, or grows only moderately
//! while the embedded error estimate stays within tolerance. Regardless of
//! the verdict, the next trial step is taken as the most conservative of a
//! growth-clamped continuation, the classical error-based candidate and a
//! secant-style extrapolation of the rate field.

use super::{
    initial_step, scaled_error_norm, validate_dim, AdaptiveIntegrator, OdeOptions, Redistribute,
    RelaxationResult,
};
use saddlesearch_core::{
    error::{Result, SaddleError},
    log::OdeLog,
    observer::{IterationRecord, SearchObserver},
    oracle::RateField,
    termination::TerminationReason,
    types::{DVector, Scalar},
};

use num_traits::Float;
use std::time::Instant;

/// Residual-driven adaptive integrator.
///
/// Acceptance of a trial step from residual `R_n` to `R_new`:
///
/// - `R_new <= R_n (1 - c1 h)` (strict contraction), or
/// - `R_new <= R_n c2` and the scaled error estimate is within `rtol`
///
/// Step-size candidates are computed from both the classical error estimate
/// (`h_err = 0.5 h sqrt(rtol/err)`) and a secant extrapolation of the rate
/// field selected by `extrapolate`; degenerate candidates are ignored. On
/// acceptance `h <- max(h/4, min(4h, h_err, h_ls))`, on rejection
/// `h <- max(h/10, min(h/4, h_err, h_ls))`, so a rejected trial always
/// shrinks the next step.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Ode12r<T: Scalar> {
    /// Absolute tolerance entering the error scaling threshold.
    pub atol: T,

    /// Relative tolerance on the scaled error estimate.
    pub rtol: T,

    /// Contraction constant `c1` of the strict-acceptance rule.
    pub c1: T,

    /// Growth cap `c2` of the tolerant-acceptance rule.
    pub c2: T,

    /// Step floor; falling below it is a soft stop.
    pub hmin: T,

    /// Budget on rate evaluations.
    pub max_evaluations: usize,

    /// Secant extrapolation mode, one of 1, 2, 3.
    pub extrapolate: u8,
}

impl<T: Scalar> Default for Ode12r<T> {
    fn default() -> Self {
        Self {
            atol: <T as Scalar>::from_f64(0.1),
            rtol: <T as Scalar>::from_f64(0.1),
            c1: <T as Scalar>::from_f64(1e-2),
            c2: <T as Scalar>::from_f64(2.0),
            hmin: <T as Scalar>::from_f64(1e-10),
            max_evaluations: 1000,
            extrapolate: 3,
        }
    }
}

impl<T: Scalar> Ode12r<T> {
    /// Creates the integrator with default parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets both tolerances.
    pub fn with_tolerances(mut self, rtol: T, atol: T) -> Self {
        self.rtol = rtol;
        self.atol = atol;
        self
    }

    /// Sets the acceptance constants.
    pub fn with_acceptance(mut self, c1: T, c2: T) -> Self {
        self.c1 = c1;
        self.c2 = c2;
        self
    }

    /// Sets the step floor.
    pub fn with_hmin(mut self, hmin: T) -> Self {
        self.hmin = hmin;
        self
    }

    /// Sets the rate-evaluation budget.
    pub fn with_max_evaluations(mut self, budget: usize) -> Self {
        self.max_evaluations = budget;
        self
    }

    /// Sets the secant extrapolation mode.
    pub fn with_extrapolate(mut self, mode: u8) -> Self {
        self.extrapolate = mode;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        if !(self.rtol > T::zero()) || !(self.atol > T::zero()) {
            return Err(SaddleError::invalid_configuration(
                "tolerances must be positive",
                "rtol/atol",
                format!("{}, {}", self.rtol, self.atol),
            ));
        }
        if !(self.c1 > T::zero()) || !(self.c2 >= T::one()) {
            return Err(SaddleError::invalid_configuration(
                "acceptance constants must satisfy c1 > 0 and c2 >= 1",
                "c1/c2",
                format!("{}, {}", self.c1, self.c2),
            ));
        }
        if !(self.hmin > T::zero()) {
            return Err(SaddleError::invalid_configuration(
                "step floor must be positive",
                "hmin",
                format!("{}", self.hmin),
            ));
        }
        if self.max_evaluations == 0 {
            return Err(SaddleError::invalid_configuration(
                "must allow at least one evaluation",
                "max_evaluations",
                "0",
            ));
        }
        if !(1..=3).contains(&self.extrapolate) {
            return Err(SaddleError::invalid_configuration(
                "must be one of 1, 2, 3",
                "extrapolate",
                format!("{}", self.extrapolate),
            ));
        }
        Ok(())
    }

    /// Secant extrapolation of a favorable step from consecutive rates.
    ///
    /// Computed over the decrement `y = F_n - F_new`; a non-finite or
    /// non-positive candidate is reported as infinity so it drops out of
    /// the `min` in the step update.
    fn extrapolated_step(&self, h: T, fnow: &DVector<T>, fnew: &DVector<T>) -> T {
        let tiny = <T as Scalar>::from_f64(1e-10);
        let y = fnow - fnew;
        let candidate = match self.extrapolate {
            1 => h * fnow.dot(&y) / (y.norm_squared() + tiny),
            2 => h * fnow.norm_squared() / (fnow.dot(&y) + tiny),
            3 => h * fnow.dot(fnew) / (fnow.dot(&y) + tiny),
            // Rejected by validate() before any stepping.
            _ => unreachable!("extrapolate mode validated at entry"),
        };
        if Float::is_finite(candidate) && candidate > T::zero() {
            candidate
        } else {
            T::infinity()
        }
    }
}

impl<T: Scalar> AdaptiveIntegrator<T> for Ode12r<T> {
    fn name(&self) -> &str {
        "ODE12r"
    }

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
        R: Redistribute<T>,
    {
        self.validate()?;
        options.validate()?;
        validate_dim(dim)?;

        let start = Instant::now();
        let half = <T as Scalar>::from_f64(0.5);
        let threshold = self.atol / self.rtol;

        let mut t = T::zero();
        let mut x = x0.clone_owned();
        let (mut fnow, mut rnow) = field.rate(t, &x, 0)?;
        let mut num_gradient = dim;
        let mut evaluations = 1usize;

        let mut log = OdeLog::new();
        let mut times = vec![t];
        let mut trajectory = vec![x.clone_owned()];
        let mut iterations = 0usize;
        let mut termination = TerminationReason::MaxIterations;

        observer.on_start(self.name());

        if rnow <= options.tol_res {
            observer.on_finish(TerminationReason::Converged);
            return Ok(RelaxationResult {
                times,
                trajectory,
                log,
                termination: TerminationReason::Converged,
                converged: true,
                iterations,
                gradient_evaluations: num_gradient,
                duration: start.elapsed(),
            });
        }

        let mut h = initial_step(options.h0, self.rtol, rnow, self.hmin);

        for nit in 1..=options.maxnit {
            if evaluations >= self.max_evaluations {
                termination = TerminationReason::BudgetExhausted;
                break;
            }
            iterations = nit;

            let xnew = &x + &fnow * h;
            let (fnew, rnew) = field.rate(t + h, &xnew, nit)?;
            num_gradient += dim;
            evaluations += 1;

            let error = (&fnew - &fnow) * (h * half);
            let err = scaled_error_norm(&error, &x, &xnew, threshold);

            let accepted = rnew <= rnow * (T::one() - self.c1 * h)
                || (rnew <= rnow * self.c2 && err <= self.rtol);

            observer.on_iteration(&IterationRecord {
                iteration: nit,
                num_energy: 0,
                num_gradient,
                residual: rnew,
                res_rotation: None,
                step_size: Some(h),
                accepted,
            });

            // Candidate steps, computed regardless of the verdict.
            let h_ls = self.extrapolated_step(h, &fnow, &fnew);
            let h_err = if Float::is_finite(err) && err > T::zero() {
                h * half * <T as Float>::sqrt(self.rtol / err)
            } else {
                T::infinity()
            };

            if accepted {
                t += h;
                x = redistribute.apply(xnew);
                fnow = fnew;
                rnow = rnew;
                times.push(t);
                trajectory.push(x.clone_owned());
                log.push(0, num_gradient, rnow);

                if rnow <= options.tol_res {
                    termination = TerminationReason::Converged;
                    break;
                }

                let four = <T as Scalar>::from_f64(4.0);
                h = <T as Float>::max(
                    <T as Scalar>::from_f64(0.25) * h,
                    <T as Float>::min(four * h, <T as Float>::min(h_err, h_ls)),
                );
            } else {
                h = <T as Float>::max(
                    <T as Scalar>::from_f64(0.1) * h,
                    <T as Float>::min(<T as Scalar>::from_f64(0.25) * h, <T as Float>::min(h_err, h_ls)),
                );
            }

            if h < self.hmin {
                termination = TerminationReason::StepSizeUnderflow;
                break;
            }
        }

        observer.on_finish(termination);

        Ok(RelaxationResult {
            times,
            trajectory,
            log,
            converged: termination.is_converged(),
            termination,
            iterations,
            gradient_evaluations: num_gradient,
            duration: start.elapsed(),
        })
    }
}

//! Classical embedded Runge-Kutta pairs with error-per-step control.
//!
//! [`Ode12`] pairs forward Euler with the trapezoid rule (orders 1-2);
//! [`Ode23`] is the Bogacki-Shampine 2(3) pair with the first-same-as-last
//! property. Both accept a step iff the scaled embedded error estimate is
//! within the relative tolerance and update the trial step by the standard
//! safety-factor rule `h <- h min(5, 0.9 (rtol/err)^p)` with `p = 1/(q+1)`
//! for an order-`q` error estimate.
//!
//! # References
//!
//! - Bogacki & Shampine, "A 3(2) pair of Runge-Kutta formulas" (1989)
//! - Shampine & Reichelt, "The MATLAB ODE suite" (1997)

use super::{
    initial_step, scaled_error_norm, step_floor, validate_dim, AdaptiveIntegrator, OdeOptions,
    Redistribute, RelaxationResult,
};
use saddlesearch_core::{
    error::{Result, SaddleError},
    log::OdeLog,
    observer::{IterationRecord, SearchObserver},
    oracle::RateField,
    termination::TerminationReason,
    types::{infinity_norm, DVector, Scalar},
};

use num_traits::Float;
use std::fmt::Debug;
use std::time::Instant;

/// One attempted step of an embedded pair.
struct StepTrial<T: Scalar> {
    xnew: DVector<T>,
    fnew: DVector<T>,
    rnew: T,
    error: DVector<T>,
    evaluations: usize,
}

/// Formula set distinguishing the embedded-pair variants; the driver loop
/// is shared.
trait EmbeddedPair<T: Scalar>: Debug {
    fn rtol(&self) -> T;
    fn atol(&self) -> T;
    fn scale_atol_by_rate(&self) -> bool;
    /// Error-control exponent `1/(q+1)` for the order-`q` error estimate.
    fn exponent(&self) -> T;
    fn attempt<F: RateField<T>>(
        &self,
        field: &F,
        t: T,
        h: T,
        x: &DVector<T>,
        fnow: &DVector<T>,
        iteration: usize,
    ) -> Result<StepTrial<T>>;
    fn validate(&self) -> Result<()>;
}

fn validate_tolerances<T: Scalar>(rtol: T, atol: T) -> Result<()> {
    if !(rtol > T::zero()) || !Float::is_finite(rtol) {
        return Err(SaddleError::invalid_configuration(
            "relative tolerance must be positive and finite",
            "rtol",
            format!("{}", rtol),
        ));
    }
    if !(atol > T::zero()) || !Float::is_finite(atol) {
        return Err(SaddleError::invalid_configuration(
            "absolute tolerance must be positive and finite",
            "atol",
            format!("{}", atol),
        ));
    }
    Ok(())
}

/// Shared accept/reject driver for the classical pairs.
fn integrate_embedded<T, Pair, F, R>(
    pair: &Pair,
    name: &str,
    field: &F,
    x0: &DVector<T>,
    dim: usize,
    options: &OdeOptions<T>,
    redistribute: &mut R,
    observer: &mut dyn SearchObserver<T>,
) -> Result<RelaxationResult<T>>
where
    T: Scalar,
    Pair: EmbeddedPair<T>,
    F: RateField<T>,
    R: Redistribute<T>,
{
    pair.validate()?;
    options.validate()?;
    validate_dim(dim)?;

    let start = Instant::now();
    let mut t = T::zero();
    let mut x = x0.clone_owned();
    let (mut fnow, mut rnow) = field.rate(t, &x, 0)?;
    let mut num_gradient = dim;

    let mut log = OdeLog::new();
    let mut times = vec![t];
    let mut trajectory = vec![x.clone_owned()];
    let mut iterations = 0usize;
    let mut termination = TerminationReason::MaxIterations;

    observer.on_start(name);

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

    let mut h = initial_step(options.h0, pair.rtol(), rnow, step_floor(T::one()));

    for nit in 1..=options.maxnit {
        iterations = nit;
        let trial = pair.attempt(field, t, h, &x, &fnow, nit)?;
        num_gradient += dim * trial.evaluations;

        let threshold = if pair.scale_atol_by_rate() {
            pair.atol() * <T as Float>::max(T::one(), infinity_norm(&fnow)) / pair.rtol()
        } else {
            pair.atol() / pair.rtol()
        };
        let err = scaled_error_norm(&trial.error, &x, &trial.xnew, threshold);
        let accepted = err <= pair.rtol();

        observer.on_iteration(&IterationRecord {
            iteration: nit,
            num_energy: 0,
            num_gradient,
            residual: trial.rnew,
            res_rotation: None,
            step_size: Some(h),
            accepted,
        });

        if accepted {
            t += h;
            x = redistribute.apply(trial.xnew);
            fnow = trial.fnew;
            rnow = trial.rnew;
            times.push(t);
            trajectory.push(x.clone_owned());
            log.push(0, num_gradient, rnow);

            if rnow <= options.tol_res {
                termination = TerminationReason::Converged;
                break;
            }
        }

        // Same safety-factor update on acceptance and rejection; a rejected
        // step has err > rtol and therefore shrinks.
        let five = <T as Scalar>::from_f64(5.0);
        let factor = if Float::is_finite(err) && err > T::zero() {
            <T as Float>::min(
                five,
                <T as Scalar>::from_f64(0.9)
                    * <T as Float>::powf(pair.rtol() / err, pair.exponent()),
            )
        } else if err == T::zero() {
            five
        } else {
            <T as Scalar>::from_f64(0.1)
        };
        h *= factor;

        let hmin = step_floor(t);
        if h < hmin {
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

/// Embedded Euler/trapezoid pair (orders 1-2).
///
/// The step advances with forward Euler; the trapezoid correction supplies
/// the embedded error estimate `e = h/2 (F_new - F_n)`, so each attempt
/// costs a single rate evaluation.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Ode12<T: Scalar> {
    /// Relative tolerance on the scaled error estimate.
    pub rtol: T,

    /// Absolute tolerance entering the error scaling threshold.
    pub atol: T,

    /// Scale the absolute tolerance by the current rate norm.
    pub scale_atol_by_rate: bool,
}

impl<T: Scalar> Default for Ode12<T> {
    fn default() -> Self {
        Self {
            rtol: <T as Scalar>::from_f64(1e-1),
            atol: <T as Scalar>::from_f64(1e-4),
            scale_atol_by_rate: false,
        }
    }
}

impl<T: Scalar> Ode12<T> {
    /// Creates the pair with default tolerances.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets both tolerances.
    pub fn with_tolerances(mut self, rtol: T, atol: T) -> Self {
        self.rtol = rtol;
        self.atol = atol;
        self
    }

    /// Enables tolerance adaptation to the current rate norm.
    pub fn with_rate_scaled_atol(mut self) -> Self {
        self.scale_atol_by_rate = true;
        self
    }
}

impl<T: Scalar> EmbeddedPair<T> for Ode12<T> {
    fn rtol(&self) -> T {
        self.rtol
    }

    fn atol(&self) -> T {
        self.atol
    }

    fn scale_atol_by_rate(&self) -> bool {
        self.scale_atol_by_rate
    }

    fn exponent(&self) -> T {
        <T as Scalar>::from_f64(0.5)
    }

    fn attempt<F: RateField<T>>(
        &self,
        field: &F,
        t: T,
        h: T,
        x: &DVector<T>,
        fnow: &DVector<T>,
        iteration: usize,
    ) -> Result<StepTrial<T>> {
        let xnew = x + fnow * h;
        let (fnew, rnew) = field.rate(t + h, &xnew, iteration)?;
        let error = (&fnew - fnow) * (h * <T as Scalar>::from_f64(0.5));
        Ok(StepTrial {
            xnew,
            fnew,
            rnew,
            error,
            evaluations: 1,
        })
    }

    fn validate(&self) -> Result<()> {
        validate_tolerances(self.rtol, self.atol)
    }
}

impl<T: Scalar> AdaptiveIntegrator<T> for Ode12<T> {
    fn name(&self) -> &str {
        "ode12"
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
        integrate_embedded(
            self,
            self.name(),
            field,
            x0,
            dim,
            options,
            redistribute,
            observer,
        )
    }
}

/// Bogacki-Shampine 2(3) embedded pair with the FSAL property.
///
/// The step advances with the third-order solution; the embedded
/// second-order formula supplies the error estimate. The final stage of an
/// accepted step is reused as the first stage of the next one, so each
/// attempt costs three rate evaluations.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Ode23<T: Scalar> {
    /// Relative tolerance on the scaled error estimate.
    pub rtol: T,

    /// Absolute tolerance entering the error scaling threshold.
    pub atol: T,

    /// Scale the absolute tolerance by the current rate norm.
    pub scale_atol_by_rate: bool,
}

impl<T: Scalar> Default for Ode23<T> {
    fn default() -> Self {
        Self {
            rtol: <T as Scalar>::from_f64(1e-1),
            atol: <T as Scalar>::from_f64(1e-4),
            scale_atol_by_rate: false,
        }
    }
}

impl<T: Scalar> Ode23<T> {
    /// Creates the pair with default tolerances.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets both tolerances.
    pub fn with_tolerances(mut self, rtol: T, atol: T) -> Self {
        self.rtol = rtol;
        self.atol = atol;
        self
    }

    /// Enables tolerance adaptation to the current rate norm.
    pub fn with_rate_scaled_atol(mut self) -> Self {
        self.scale_atol_by_rate = true;
        self
    }
}

impl<T: Scalar> EmbeddedPair<T> for Ode23<T> {
    fn rtol(&self) -> T {
        self.rtol
    }

    fn atol(&self) -> T {
        self.atol
    }

    fn scale_atol_by_rate(&self) -> bool {
        self.scale_atol_by_rate
    }

    fn exponent(&self) -> T {
        T::one() / <T as Scalar>::from_f64(3.0)
    }

    fn attempt<F: RateField<T>>(
        &self,
        field: &F,
        t: T,
        h: T,
        x: &DVector<T>,
        fnow: &DVector<T>,
        iteration: usize,
    ) -> Result<StepTrial<T>> {
        let half = <T as Scalar>::from_f64(0.5);
        let three_quarters = <T as Scalar>::from_f64(0.75);
        let ninth = T::one() / <T as Scalar>::from_f64(9.0);

        let k1 = fnow;
        let (k2, _) = field.rate(t + half * h, &(x + k1 * (half * h)), iteration)?;
        let (k3, _) = field.rate(t + three_quarters * h, &(x + &k2 * (three_quarters * h)), iteration)?;

        let xnew = x
            + (k1 * <T as Scalar>::from_f64(2.0) + &k2 * <T as Scalar>::from_f64(3.0)
                + &k3 * <T as Scalar>::from_f64(4.0))
                * (h * ninth);
        let (k4, rnew) = field.rate(t + h, &xnew, iteration)?;

        let seventy_second = T::one() / <T as Scalar>::from_f64(72.0);
        let error = (k1 * <T as Scalar>::from_f64(-5.0) + &k2 * <T as Scalar>::from_f64(6.0)
            + &k3 * <T as Scalar>::from_f64(8.0)
            + &k4 * <T as Scalar>::from_f64(-9.0))
            * (h * seventy_second);

        Ok(StepTrial {
            xnew,
            fnew: k4,
            rnew,
            error,
            evaluations: 3,
        })
    }

    fn validate(&self) -> Result<()> {
        validate_tolerances(self.rtol, self.atol)
    }
}

impl<T: Scalar> AdaptiveIntegrator<T> for Ode23<T> {
    fn name(&self) -> &str {
        "ode23"
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
        integrate_embedded(
            self,
            self.name(),
            field,
            x0,
            dim,
            options,
            redistribute,
            observer,
        )
    }
}

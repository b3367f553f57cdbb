//! Barzilai-Borwein dimer saddle search.
//!
//! The dimer method walks a position `x` and a unit direction `v` toward an
//! index-1 saddle point of an energy landscape. Curvature along `v` is
//! estimated from two gradient evaluations at `x +/- l/2 v` (no Hessian is
//! ever formed), the translation direction reverses the gradient component
//! along `v` to climb the unstable mode, and both the translation and the
//! rotation step sizes are re-estimated every iteration from preconditioned
//! Barzilai-Borwein secants, stabilized by an interchangeable line search.
//!
//! # Algorithm Overview
//!
//! Each iteration:
//! 1. Refreshes the preconditioner at `x` and renormalizes `v` in its metric
//! 2. Forms the finite-difference curvature `Hv` and midpoint gradient `dE0`
//! 3. Optionally rescales the metric along `v` by a rank-one update built
//!    from the curvature estimate (`rescale_v`)
//! 4. Computes the translation and rotation residuals, logs them, and
//!    terminates on convergence or an exhausted gradient budget
//! 5. Builds the reflected translation direction and the rotation force
//! 6. Estimates both step sizes by the BB secant rule (configured initial
//!    guesses on the first iteration)
//! 7. Line searches each step against its merit function and applies the
//!    accepted steps
//!
//! A NaN in the state is fatal ([`SaddleError::NumericalInstability`], a
//! known failure mode of BB step selection); a NaN step out of a line search
//! is a soft stop ([`TerminationReason::LineSearchFailed`]).
//!
//! # References
//!
//! - Henkelman & Jonsson, "A dimer method for finding saddle points on high
//!   dimensional potential surfaces using only first derivatives" (1999)
//! - Barzilai & Borwein, "Two-point step size gradient methods" (1988)
//! - Gould, Ortner & Packwood, "A dimer-type saddle search algorithm with
//!   preconditioning and linesearch" (2016)

use saddlesearch_core::{
    error::{Result, SaddleError},
    line_search::{LineSearch, StaticStep},
    log::DimerLog,
    observer::{IterationRecord, NullObserver, SearchObserver},
    oracle::EnergyLandscape,
    precon::{IdentityPrecon, Preconditioner, RankOneUpdate},
    step_size::barzilai_borwein,
    termination::TerminationReason,
    types::{infinity_norm, DVector, Scalar},
};

use num_traits::Float;
use std::cell::Cell;
use std::time::{Duration, Instant};

/// Configuration for the BB dimer controller.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BBDimerConfig<T: Scalar> {
    /// Initial translation step guess, used on the first iteration only.
    pub a0_trans: T,

    /// Initial rotation step guess, used on the first iteration only.
    pub a0_rot: T,

    /// Tolerance on the translation residual (infinity norm of the midpoint
    /// gradient).
    pub tol_trans: T,

    /// Tolerance on the rotation residual (infinity norm of the rotation
    /// force).
    pub tol_rot: T,

    /// Budget on gradient evaluations; exceeding it is a soft stop.
    pub max_gradient_evals: usize,

    /// Finite-difference dimer length `l`; gradients are evaluated at
    /// `x +/- l/2 v`.
    pub dimer_length: T,

    /// Whether to precondition the rotation search direction.
    pub precon_rot: bool,

    /// Whether to rescale the metric along `v` from the curvature estimate
    /// before each iteration's updates.
    pub rescale_v: bool,
}

impl<T: Scalar> Default for BBDimerConfig<T> {
    fn default() -> Self {
        Self {
            a0_trans: <T as Scalar>::from_f64(1e-3),
            a0_rot: <T as Scalar>::from_f64(1e-3),
            tol_trans: T::DEFAULT_FORCE_TOLERANCE,
            tol_rot: T::DEFAULT_CURVATURE_TOLERANCE,
            max_gradient_evals: 2000,
            dimer_length: T::DEFAULT_DIMER_LENGTH,
            precon_rot: false,
            rescale_v: false,
        }
    }
}

impl<T: Scalar> BBDimerConfig<T> {
    /// Creates a new configuration with default parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the initial step guesses.
    pub fn with_initial_steps(mut self, a0_trans: T, a0_rot: T) -> Self {
        self.a0_trans = a0_trans;
        self.a0_rot = a0_rot;
        self
    }

    /// Sets the residual tolerances.
    pub fn with_tolerances(mut self, tol_trans: T, tol_rot: T) -> Self {
        self.tol_trans = tol_trans;
        self.tol_rot = tol_rot;
        self
    }

    /// Sets the gradient-evaluation budget.
    pub fn with_max_gradient_evals(mut self, budget: usize) -> Self {
        self.max_gradient_evals = budget;
        self
    }

    /// Sets the finite-difference dimer length.
    pub fn with_dimer_length(mut self, length: T) -> Self {
        self.dimer_length = length;
        self
    }

    /// Enables or disables preconditioning of the rotation direction.
    pub fn with_precon_rot(mut self, precon_rot: bool) -> Self {
        self.precon_rot = precon_rot;
        self
    }

    /// Enables or disables the curvature-based metric rescaling.
    pub fn with_rescale_v(mut self, rescale_v: bool) -> Self {
        self.rescale_v = rescale_v;
        self
    }

    /// Validates the configuration against its mathematical constraints.
    pub fn validate(&self) -> Result<()> {
        if !(self.a0_trans > T::zero()) || !(self.a0_rot > T::zero()) {
            return Err(SaddleError::invalid_configuration(
                "initial step guesses must be positive",
                "a0_trans/a0_rot",
                format!("{}, {}", self.a0_trans, self.a0_rot),
            ));
        }
        if !(self.tol_trans > T::zero()) || !(self.tol_rot > T::zero()) {
            return Err(SaddleError::invalid_configuration(
                "residual tolerances must be positive",
                "tol_trans/tol_rot",
                format!("{}, {}", self.tol_trans, self.tol_rot),
            ));
        }
        if !(self.dimer_length > T::zero()) {
            return Err(SaddleError::invalid_configuration(
                "dimer length must be positive",
                "dimer_length",
                format!("{}", self.dimer_length),
            ));
        }
        if self.max_gradient_evals < 2 {
            return Err(SaddleError::invalid_configuration(
                "must allow at least one iteration (two gradient evaluations)",
                "max_gradient_evals",
                format!("{}", self.max_gradient_evals),
            ));
        }
        Ok(())
    }
}

/// Result of a dimer run.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DimerResult<T: Scalar> {
    /// Final position.
    pub x: DVector<T>,

    /// Final unit direction (in the preconditioned metric).
    pub v: DVector<T>,

    /// Per-iteration diagnostic columns.
    pub log: DimerLog<T>,

    /// Why the run stopped.
    pub termination: TerminationReason,

    /// True iff both residual tolerances were satisfied at the final state.
    pub converged: bool,

    /// Number of dimer iterations executed (equals `log.len()`).
    pub iterations: usize,

    /// Total energy evaluations (line-search merit evaluations only).
    pub energy_evaluations: usize,

    /// Total gradient evaluations (exactly two per iteration).
    pub gradient_evaluations: usize,

    /// Wall-clock time of the run. Diagnostic only; not part of the
    /// reproducibility contract.
    pub duration: Duration,
}

/// Secant data carried between accepted iterations for the BB estimates.
#[derive(Debug, Clone)]
struct SecantHistory<T: Scalar> {
    dx: DVector<T>,
    dv: DVector<T>,
    p_trans: DVector<T>,
    p_rot: DVector<T>,
}

/// BB dimer saddle-search controller.
///
/// Generic over the preconditioner metric and the line search strategy;
/// `BBDimer::unpreconditioned` gives the identity-metric, static-step
/// default.
///
/// # Examples
///
/// ```
/// use saddlesearch_core::prelude::*;
/// use saddlesearch_solvers::{BBDimer, BBDimerConfig};
///
/// let saddle = QuadraticForm::diagonal(&DVector::from_vec(vec![1.0, -1.0]));
/// let mut dimer = BBDimer::unpreconditioned(BBDimerConfig::default()).unwrap();
///
/// let x0 = DVector::from_vec(vec![1.0, 1.0]);
/// let v0 = DVector::from_vec(vec![0.0, 1.0]);
/// let result = dimer.run(&saddle, &x0, &v0).unwrap();
/// assert!(result.converged);
/// ```
#[derive(Debug)]
pub struct BBDimer<T: Scalar, P: Preconditioner<T>, LS: LineSearch<T>> {
    config: BBDimerConfig<T>,
    precon: P,
    line_search: LS,
}

impl<T: Scalar> BBDimer<T, IdentityPrecon, StaticStep> {
    /// Creates a dimer with the identity metric and static step acceptance.
    pub fn unpreconditioned(config: BBDimerConfig<T>) -> Result<Self> {
        Self::new(config, IdentityPrecon, StaticStep)
    }
}

impl<T: Scalar, P: Preconditioner<T>, LS: LineSearch<T>> BBDimer<T, P, LS> {
    /// Creates a dimer controller with validated configuration.
    pub fn new(config: BBDimerConfig<T>, precon: P, line_search: LS) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            precon,
            line_search,
        })
    }

    /// Returns the controller configuration.
    pub fn config(&self) -> &BBDimerConfig<T> {
        &self.config
    }

    /// Returns the controller name.
    pub fn name(&self) -> &str {
        "BB Dimer"
    }

    /// Runs the search from `(x0, v0)` without observation.
    pub fn run<O: EnergyLandscape<T>>(
        &mut self,
        oracle: &O,
        x0: &DVector<T>,
        v0: &DVector<T>,
    ) -> Result<DimerResult<T>> {
        self.run_with_observer(oracle, x0, v0, &mut NullObserver)
    }

    /// Runs the search, emitting one structured event per iteration.
    pub fn run_with_observer<O: EnergyLandscape<T>>(
        &mut self,
        oracle: &O,
        x0: &DVector<T>,
        v0: &DVector<T>,
        observer: &mut dyn SearchObserver<T>,
    ) -> Result<DimerResult<T>> {
        if x0.len() != v0.len() {
            return Err(SaddleError::dimension_mismatch(x0.len(), v0.len()));
        }
        if x0.is_empty() {
            return Err(SaddleError::dimension_mismatch("n >= 1", "0"));
        }

        let start = Instant::now();
        let length = self.config.dimer_length;
        let half = length * <T as Scalar>::from_f64(0.5);
        let two = <T as Scalar>::from_f64(2.0);

        let mut x = x0.clone_owned();
        let mut v = v0.clone_owned();
        let mut log = DimerLog::new();
        let mut num_energy = 0usize;
        let mut num_gradient = 0usize;
        let mut iterations = 0usize;
        let mut history: Option<SecantHistory<T>> = None;
        let mut termination = TerminationReason::BudgetExhausted;

        observer.on_start(self.name());

        // Each pass consumes two gradient evaluations, so the strict budget
        // check below always fires within this bound.
        for nit in 0..self.config.max_gradient_evals {
            if x.iter().any(|c| Float::is_nan(*c)) || v.iter().any(|c| Float::is_nan(*c)) {
                return Err(SaddleError::numerical_instability(
                    nit,
                    "NaN entry in position or direction",
                ));
            }

            self.precon.prepare(&x)?;
            let vnorm = self.precon.norm(&v);
            if !(vnorm > T::zero()) || !Float::is_finite(vnorm) {
                return Err(SaddleError::numerical_instability(
                    nit,
                    "direction norm is degenerate",
                ));
            }
            v.unscale_mut(vnorm);

            // Finite-difference curvature along the dimer axis.
            let g_plus = oracle.gradient(&(&x + &v * half))?;
            let g_minus = oracle.gradient(&(&x - &v * half))?;
            num_gradient += 2;
            let hv = (&g_plus - &g_minus) / length;
            let de0 = (&g_plus + &g_minus) * <T as Scalar>::from_f64(0.5);

            // Metric rescaling along v from the curvature estimate; with a
            // zero shift the wrapper is exactly the base operator.
            let shift = if self.config.rescale_v {
                <T as Float>::abs(v.dot(&hv)) - T::one()
            } else {
                T::zero()
            };
            let precon_iter = RankOneUpdate::new(&self.precon, v.clone_owned(), shift);
            if self.config.rescale_v {
                let vnorm = precon_iter.norm(&v);
                if !(vnorm > T::zero()) || !Float::is_finite(vnorm) {
                    return Err(SaddleError::numerical_instability(
                        nit,
                        "rescaled direction norm is degenerate",
                    ));
                }
                v.unscale_mut(vnorm);
            }

            // Residuals and termination checks.
            let res_trans = infinity_norm(&de0);
            let lambda = v.dot(&hv);
            let q_rot = precon_iter.apply(&v) * lambda - &hv;
            let res_rot = infinity_norm(&q_rot);

            log.push(num_energy, num_gradient, res_trans, res_rot);
            iterations = nit + 1;
            observer.on_iteration(&IterationRecord {
                iteration: nit,
                num_energy,
                num_gradient,
                residual: res_trans,
                res_rotation: Some(res_rot),
                step_size: None,
                accepted: true,
            });

            if res_trans <= self.config.tol_trans && res_rot <= self.config.tol_rot {
                termination = TerminationReason::Converged;
                break;
            }
            if num_gradient > self.config.max_gradient_evals {
                termination = TerminationReason::BudgetExhausted;
                break;
            }

            // Translation direction: reflected preconditioned gradient.
            let p_trans = &v * (two * v.dot(&de0)) - precon_iter.solve(&de0)?;
            // Rotation direction.
            let p_rot = if self.config.precon_rot {
                &v * lambda - precon_iter.solve(&hv)?
            } else {
                q_rot.clone_owned()
            };

            // Step-size guesses: configured on the first iteration, BB
            // secant estimates afterwards.
            let (beta_guess, gamma_guess) = match &history {
                None => (self.config.a0_trans, self.config.a0_rot),
                Some(h) => (
                    barzilai_borwein(&h.dx, &(&p_trans - &h.p_trans), &precon_iter),
                    barzilai_borwein(&h.dv, &(&p_rot - &h.p_rot), &precon_iter),
                ),
            };

            // Line searches. Merit evaluations are counted through the
            // shared cell; the oracle's energy is the only cost.
            let extra_energy = Cell::new(0usize);

            let v_dot_g = v.dot(&de0);
            let v_dot_p = v.dot(&p_trans);
            let mut merit_trans = |t: T| -> T {
                extra_energy.set(extra_energy.get() + 1);
                let e = match oracle.energy(&(&x + &p_trans * t)) {
                    Ok(e) => e,
                    Err(_) => T::nan(),
                };
                let s = t * v_dot_p;
                e - two * v_dot_g * s - lambda * s * s
            };
            let slope_trans = de0.dot(&p_trans) - two * v_dot_g * v_dot_p;
            let (beta, _) = self
                .line_search
                .search(&mut merit_trans, slope_trans, beta_guess);

            let e_center = Cell::new(None::<T>);
            let mut merit_rot = |g: T| -> T {
                let mut w = &v + &p_rot * g;
                let wnorm = precon_iter.norm(&w);
                if !(wnorm > T::zero()) || !Float::is_finite(wnorm) {
                    return T::nan();
                }
                w.unscale_mut(wnorm);
                let e0 = match e_center.get() {
                    Some(e0) => e0,
                    None => {
                        extra_energy.set(extra_energy.get() + 1);
                        let e0 = match oracle.energy(&x) {
                            Ok(e0) => e0,
                            Err(_) => T::nan(),
                        };
                        e_center.set(Some(e0));
                        e0
                    }
                };
                extra_energy.set(extra_energy.get() + 2);
                let e_plus = match oracle.energy(&(&x + &w * half)) {
                    Ok(e) => e,
                    Err(_) => T::nan(),
                };
                let e_minus = match oracle.energy(&(&x - &w * half)) {
                    Ok(e) => e,
                    Err(_) => T::nan(),
                };
                // Central-difference Rayleigh quotient with half-length l/2.
                (e_plus - two * e0 + e_minus) / (half * half)
            };
            let slope_rot = -two * p_rot.dot(&q_rot);
            let (gamma, _) = self
                .line_search
                .search(&mut merit_rot, slope_rot, gamma_guess);

            num_energy += extra_energy.get();

            if Float::is_nan(beta) || Float::is_nan(gamma) {
                termination = TerminationReason::LineSearchFailed;
                break;
            }

            // Apply the accepted steps and remember the secant pair.
            let dx = &p_trans * beta;
            let dv = &p_rot * gamma;
            x += &dx;
            v += &dv;
            history = Some(SecantHistory {
                dx,
                dv,
                p_trans,
                p_rot,
            });
        }

        observer.on_finish(termination);

        Ok(DimerResult {
            x,
            v,
            log,
            converged: termination.is_converged(),
            termination,
            iterations,
            energy_evaluations: num_energy,
            gradient_evaluations: num_gradient,
            duration: start.elapsed(),
        })
    }
}

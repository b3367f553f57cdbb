//! Saddle-point search controllers.
//!
//! This crate provides the concrete search drivers built on the abstractions
//! of `saddlesearch-core`:
//!
//! - **BB dimer** ([`BBDimer`]): walks a position and a unit direction toward
//!   an index-1 saddle point, estimating curvature from finite differences
//!   and both step sizes from preconditioned Barzilai-Borwein secants
//! - **Adaptive ODE relaxation** ([`ode`]): embedded-pair integrators
//!   (`ode12`, `ode23`) and the residual-driven `ODE12r` variant, driving
//!   the same kind of position update as a continuous-time relaxation
//!
//! Both families agree on convergence semantics: success means the
//! configured residual tolerances are met at the returned state, every other
//! outcome is reported through [`TerminationReason`], and fatal conditions
//! (NaN state, invalid configuration) unwind as errors without corrupting
//! the already-gathered log.
//!
//! # Examples
//!
//! ```
//! use saddlesearch_core::prelude::*;
//! use saddlesearch_solvers::{BBDimer, BBDimerConfig};
//!
//! // E(x) = (x1^2 - x2^2) / 2 has an index-1 saddle at the origin.
//! let saddle = QuadraticForm::diagonal(&DVector::from_vec(vec![1.0, -1.0]));
//!
//! let mut dimer = BBDimer::unpreconditioned(BBDimerConfig::default()).unwrap();
//! let x0 = DVector::from_vec(vec![1.0, 1.0]);
//! let v0 = DVector::from_vec(vec![0.0, 1.0]);
//!
//! let result = dimer.run(&saddle, &x0, &v0).unwrap();
//! assert!(result.converged);
//! ```

pub mod bb_dimer;
pub mod ode;

// Re-export main controllers for convenience
pub use bb_dimer::{BBDimer, BBDimerConfig, DimerResult};
pub use ode::embedded::{Ode12, Ode23};
pub use ode::residual::Ode12r;
pub use ode::{AdaptiveIntegrator, OdeOptions, Redistribute, RelaxationResult};

// Re-export commonly used items from core
pub use saddlesearch_core::{
    line_search::{ArmijoBacktracking, LineSearch, LineSearchParams, StaticStep},
    precon::{IdentityPrecon, Preconditioner},
    Result, SaddleError, TerminationReason,
};

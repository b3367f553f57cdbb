//! Core traits and types for saddle-point search.
//!
//! This crate provides the foundational abstractions consumed by the search
//! controllers in `saddlesearch-solvers`: the oracle interfaces for energies,
//! gradients and relaxation rate fields, the preconditioner metric, line
//! search strategies, the Barzilai-Borwein step estimate, iteration logging
//! and structured observation.
//!
//! # Key Concepts
//!
//! - **Oracles**: the energy `E`, its gradient `dE`, or an ODE right-hand
//!   side `f` reporting a convergence residual
//! - **Preconditioner**: a positive-definite metric rescaling gradients and
//!   directions, refreshed once per iteration
//! - **Line search**: interchangeable step-acceptance strategies over a
//!   one-dimensional merit function
//! - **Logs and observers**: append-only diagnostic columns and structured
//!   event sinks; no I/O happens inside the numerical loops
//!
//! # Modules
//!
//! - [`error`]: fatal error types
//! - [`line_search`]: step acceptance strategies
//! - [`log`]: iteration logs
//! - [`observer`]: structured event sinks
//! - [`oracle`]: energy landscape and rate field interfaces
//! - [`precon`]: preconditioner metric
//! - [`step_size`]: Barzilai-Borwein secant estimate
//! - [`termination`]: terminal states of a run
//! - [`types`]: scalar abstraction and vector aliases

pub mod error;
pub mod line_search;
pub mod log;
pub mod observer;
pub mod oracle;
pub mod precon;
pub mod step_size;
pub mod termination;
pub mod types;

// Re-export commonly used items at the crate root
pub use error::{Result, SaddleError};
pub use termination::TerminationReason;

/// Prelude module for convenient imports.
///
/// # Example
/// ```
/// use saddlesearch_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{Result, SaddleError};
    pub use crate::line_search::{ArmijoBacktracking, LineSearch, LineSearchParams, StaticStep};
    pub use crate::log::{DimerLog, OdeLog};
    pub use crate::observer::{IterationRecord, NullObserver, RecordingObserver, SearchObserver};
    pub use crate::oracle::{
        CountingLandscape, EnergyLandscape, FnLandscape, FnRateField, GradientFlow, QuadraticForm,
        RateField,
    };
    pub use crate::precon::{IdentityPrecon, Preconditioner, RankOneUpdate};
    pub use crate::step_size::barzilai_borwein;
    pub use crate::termination::TerminationReason;
    pub use crate::types::{infinity_norm, DMatrix, DVector, Scalar};
}

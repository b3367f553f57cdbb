//! Terminal states of a saddle-point search.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Reason a search controller stopped iterating.
///
/// Exactly one of these is reported by every run, alongside the final state
/// and the iteration log. A caller can distinguish "converged", "did not
/// converge (budget)" and "did not converge (failure)" from the returned
/// value alone; fatal conditions are errors instead and never appear here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TerminationReason {
    /// All residual tolerances satisfied at the returned state.
    Converged,
    /// Oracle evaluation budget exhausted without convergence.
    BudgetExhausted,
    /// Maximum iteration count exhausted without convergence.
    MaxIterations,
    /// A line search or secant step-size estimate produced a not-a-number
    /// step. Non-fatal: the current state and log are returned.
    LineSearchFailed,
    /// The trial step size collapsed below its floor (ODE mode). The
    /// trajectory gathered so far is preserved.
    StepSizeUnderflow,
}

impl TerminationReason {
    /// True iff this reason indicates a successful search.
    pub fn is_converged(self) -> bool {
        matches!(self, Self::Converged)
    }
}

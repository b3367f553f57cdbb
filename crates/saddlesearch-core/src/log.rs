//! Iteration logs: append-only, equal-length diagnostic columns.
//!
//! A log is a pure data sink. Entry `i` records the evaluation counters and
//! the residual(s) of iteration `i` at acceptance; rendering, printing and
//! file output are the caller's responsibility.

use crate::types::Scalar;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Diagnostic time series of a dimer run.
///
/// Four parallel columns of equal length: cumulative energy evaluations,
/// cumulative gradient evaluations, translation residual and rotation
/// residual.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DimerLog<T: Scalar> {
    num_energy: Vec<usize>,
    num_gradient: Vec<usize>,
    res_translation: Vec<T>,
    res_rotation: Vec<T>,
}

impl<T: Scalar> DimerLog<T> {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self {
            num_energy: Vec::new(),
            num_gradient: Vec::new(),
            res_translation: Vec::new(),
            res_rotation: Vec::new(),
        }
    }

    /// Appends one iteration record.
    pub fn push(&mut self, num_energy: usize, num_gradient: usize, res_trans: T, res_rot: T) {
        self.num_energy.push(num_energy);
        self.num_gradient.push(num_gradient);
        self.res_translation.push(res_trans);
        self.res_rotation.push(res_rot);
    }

    /// Number of recorded iterations.
    pub fn len(&self) -> usize {
        self.num_energy.len()
    }

    /// True iff nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.num_energy.is_empty()
    }

    /// Cumulative energy-evaluation counts, one entry per iteration.
    pub fn num_energy(&self) -> &[usize] {
        &self.num_energy
    }

    /// Cumulative gradient-evaluation counts, one entry per iteration.
    pub fn num_gradient(&self) -> &[usize] {
        &self.num_gradient
    }

    /// Translation residuals, one entry per iteration.
    pub fn res_translation(&self) -> &[T] {
        &self.res_translation
    }

    /// Rotation residuals, one entry per iteration.
    pub fn res_rotation(&self) -> &[T] {
        &self.res_rotation
    }

    /// The most recent residual pair, if any.
    pub fn last_residuals(&self) -> Option<(T, T)> {
        match (self.res_translation.last(), self.res_rotation.last()) {
            (Some(&rt), Some(&rr)) => Some((rt, rr)),
            _ => None,
        }
    }
}

/// Diagnostic time series of an adaptive ODE relaxation run.
///
/// Three parallel columns of equal length: cumulative energy evaluations
/// (zero in pure relaxation mode, kept because the schema is part of the
/// contract), cumulative rate evaluations in cost units, and the residual
/// reported by the oracle at acceptance.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OdeLog<T: Scalar> {
    num_energy: Vec<usize>,
    num_gradient: Vec<usize>,
    residual: Vec<T>,
}

impl<T: Scalar> OdeLog<T> {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self {
            num_energy: Vec::new(),
            num_gradient: Vec::new(),
            residual: Vec::new(),
        }
    }

    /// Appends one accepted-step record.
    pub fn push(&mut self, num_energy: usize, num_gradient: usize, residual: T) {
        self.num_energy.push(num_energy);
        self.num_gradient.push(num_gradient);
        self.residual.push(residual);
    }

    /// Number of recorded steps.
    pub fn len(&self) -> usize {
        self.residual.len()
    }

    /// True iff nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.residual.is_empty()
    }

    /// Cumulative energy-evaluation counts, one entry per accepted step.
    pub fn num_energy(&self) -> &[usize] {
        &self.num_energy
    }

    /// Cumulative rate-evaluation counts, one entry per accepted step.
    pub fn num_gradient(&self) -> &[usize] {
        &self.num_gradient
    }

    /// Residuals at acceptance, one entry per accepted step.
    pub fn residual(&self) -> &[T] {
        &self.residual
    }

    /// The most recent residual, if any.
    pub fn last_residual(&self) -> Option<T> {
        self.residual.last().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimer_log_columns_stay_aligned() {
        let mut log = DimerLog::new();
        assert!(log.is_empty());

        log.push(0, 2, 1.0, 0.5);
        log.push(1, 4, 0.6, 0.2);

        assert_eq!(log.len(), 2);
        assert_eq!(log.num_energy(), &[0, 1]);
        assert_eq!(log.num_gradient(), &[2, 4]);
        assert_eq!(log.res_translation(), &[1.0, 0.6]);
        assert_eq!(log.res_rotation(), &[0.5, 0.2]);
        assert_eq!(log.last_residuals(), Some((0.6, 0.2)));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_dimer_log_serde_round_trip() {
        let mut log = DimerLog::new();
        log.push(0, 2, 1.0, 0.5);
        log.push(3, 4, 0.1, 0.05);

        let json = serde_json::to_string(&log).unwrap();
        let back: DimerLog<f64> = serde_json::from_str(&json).unwrap();
        assert_eq!(log, back);
    }

    #[test]
    fn test_ode_log_columns_stay_aligned() {
        let mut log = OdeLog::new();
        assert!(log.last_residual().is_none());

        log.push(0, 3, 2.0);
        log.push(0, 6, 1.0);
        log.push(0, 9, 0.25);

        assert_eq!(log.len(), 3);
        assert_eq!(log.num_gradient(), &[3, 6, 9]);
        assert_eq!(log.last_residual(), Some(0.25));
        assert_eq!(log.num_energy(), &[0, 0, 0]);
    }
}

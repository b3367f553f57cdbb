//! Observer support for search controllers.
//!
//! Controllers emit structured per-iteration events to an injected sink;
//! rendering, file I/O and timestamping live entirely outside the numerical
//! loop. The default [`NullObserver`] discards everything.

use crate::{termination::TerminationReason, types::Scalar};

/// One structured iteration event.
#[derive(Debug, Clone, Copy)]
pub struct IterationRecord<T: Scalar> {
    /// Iteration index, starting at zero for the dimer and one for the
    /// ODE integrators (attempted steps).
    pub iteration: usize,

    /// Cumulative energy evaluations.
    pub num_energy: usize,

    /// Cumulative gradient (or rate) evaluations, in cost units.
    pub num_gradient: usize,

    /// Primary residual: translation residual for the dimer, the
    /// oracle-reported residual for ODE mode.
    pub residual: T,

    /// Rotation residual (dimer mode only).
    pub res_rotation: Option<T>,

    /// Step size attempted this iteration, when the controller has one
    /// before emitting the event (ODE mode).
    pub step_size: Option<T>,

    /// Whether this iteration's step was accepted. Dimer iterations are
    /// always accepted; ODE integrators also report rejected trials.
    pub accepted: bool,
}

/// Sink for structured search events.
pub trait SearchObserver<T: Scalar> {
    /// Called once before the first iteration.
    fn on_start(&mut self, method: &str) {
        let _ = method;
    }

    /// Called after each iteration (dimer) or attempted step (ODE).
    fn on_iteration(&mut self, record: &IterationRecord<T>) {
        let _ = record;
    }

    /// Called once when the run terminates.
    fn on_finish(&mut self, reason: TerminationReason) {
        let _ = reason;
    }
}

/// An observer that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl<T: Scalar> SearchObserver<T> for NullObserver {}

/// An observer that collects every record, for tests and post-hoc analysis.
#[derive(Debug, Clone, Default)]
pub struct RecordingObserver<T: Scalar> {
    /// All records received, in order.
    pub records: Vec<IterationRecord<T>>,
    /// The reported termination reason, if the run finished.
    pub finished: Option<TerminationReason>,
}

impl<T: Scalar> RecordingObserver<T> {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            finished: None,
        }
    }
}

impl<T: Scalar> SearchObserver<T> for RecordingObserver<T> {
    fn on_iteration(&mut self, record: &IterationRecord<T>) {
        self.records.push(*record);
    }

    fn on_finish(&mut self, reason: TerminationReason) {
        self.finished = Some(reason);
    }
}

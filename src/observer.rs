//! Trace observers
//!
//! The engine never logs from its control flow. Anything that wants to watch a
//! recalculation (a debugger, the CLI's `--trace` flag, a test) implements
//! [`StrengthObserver`] and receives callbacks as days are replayed.

use crate::recalculate::RecalcDecision;
use chrono::NaiveDate;

/// What happened to the running strength on one replayed day
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DayOutcome {
    /// Frozen day: no step, value carried over
    Frozen { strength: f64 },
    /// A smoothing step ran with the given completion value
    Stepped { completion: f64, strength: f64 },
}

impl DayOutcome {
    /// Running strength after the day
    pub fn strength(&self) -> f64 {
        match *self {
            DayOutcome::Frozen { strength } | DayOutcome::Stepped { strength, .. } => strength,
        }
    }
}

/// Receives diagnostic callbacks during recalculation and history replay.
///
/// Every method has an empty default so implementors only override what they
/// care about.
pub trait StrengthObserver {
    /// The orchestrator picked a branch for `habit_id`
    fn on_decision(&self, _habit_id: &str, _decision: &RecalcDecision) {}

    /// A day was replayed
    fn on_day(&self, _date: NaiveDate, _outcome: DayOutcome) {}

    /// A full recompute captured a new baseline just before today's step
    fn on_baseline(&self, _date: NaiveDate, _baseline: f64) {}

    /// Recalculation finished with this unfloored value
    fn on_finish(&self, _habit_id: &str, _strength: f64) {}
}

/// Observer that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl StrengthObserver for NoopObserver {}

/// Observer that forwards callbacks as structured `tracing` events
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl StrengthObserver for TracingObserver {
    fn on_decision(&self, habit_id: &str, decision: &RecalcDecision) {
        tracing::debug!(target: "habit_strength", habit_id, path = decision.label(), ?decision, "recalculation path chosen");
    }

    fn on_day(&self, date: NaiveDate, outcome: DayOutcome) {
        match outcome {
            DayOutcome::Frozen { strength } => {
                tracing::trace!(target: "habit_strength", %date, strength, "frozen day, no step");
            }
            DayOutcome::Stepped { completion, strength } => {
                tracing::trace!(target: "habit_strength", %date, completion, strength, "step applied");
            }
        }
    }

    fn on_baseline(&self, date: NaiveDate, baseline: f64) {
        tracing::debug!(target: "habit_strength", %date, baseline, "baseline captured");
    }

    fn on_finish(&self, habit_id: &str, strength: f64) {
        tracing::debug!(target: "habit_strength", habit_id, strength, "recalculation finished");
    }
}

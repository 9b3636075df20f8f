//! Day-by-day replay
//!
//! The one loop every strength computation goes through. The full and
//! incremental recalculation paths and the history trace all advance the
//! running value with [`Replay::advance`], so they cannot drift apart.

use crate::ema::step;
use crate::normalizer::CompletionNormalizer;
use crate::observer::{DayOutcome, StrengthObserver};
use crate::types::HabitRecord;
use chrono::NaiveDate;

/// First day of a habit's history: the earlier of its creation day and the
/// first day carrying a truthy completion or a freeze marker.
pub fn walk_start(habit: &HabitRecord) -> NaiveDate {
    let created = habit.created_day();
    let first_completion = habit
        .completions
        .iter()
        .find(|(_, entry)| entry.is_truthy())
        .map(|(date, _)| *date);
    let first_freeze = habit
        .skipped
        .iter()
        .find(|(_, frozen)| **frozen)
        .map(|(date, _)| *date);

    [first_completion, first_freeze]
        .into_iter()
        .flatten()
        .fold(created, NaiveDate::min)
}

/// Every calendar day from `from` through `to` inclusive. Empty if `from > to`.
pub fn days(from: NaiveDate, to: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    from.iter_days().take_while(move |date| *date <= to)
}

/// Replays a habit's days through normalize + step
pub struct Replay<'a> {
    habit: &'a HabitRecord,
    period: f64,
    observer: &'a dyn StrengthObserver,
}

impl<'a> Replay<'a> {
    pub fn new(habit: &'a HabitRecord, period: f64, observer: &'a dyn StrengthObserver) -> Self {
        Self {
            habit,
            period,
            observer,
        }
    }

    /// Process one day starting from `strength`
    pub fn advance(&self, strength: f64, date: NaiveDate) -> DayOutcome {
        let outcome = if self.habit.is_frozen(date) {
            DayOutcome::Frozen { strength }
        } else {
            let completion = CompletionNormalizer::normalize(self.habit, date);
            DayOutcome::Stepped {
                completion,
                strength: step(strength, completion, self.period),
            }
        };
        self.observer.on_day(date, outcome);
        outcome
    }

    /// Walk `from..=to` starting at `start`, handing each day to `visit`
    /// together with the value it started from. Returns the final value.
    pub fn run<F>(&self, from: NaiveDate, to: NaiveDate, start: f64, mut visit: F) -> f64
    where
        F: FnMut(NaiveDate, f64, DayOutcome),
    {
        let mut strength = start;
        for date in days(from, to) {
            let outcome = self.advance(strength, date);
            visit(date, strength, outcome);
            strength = outcome.strength();
        }
        strength
    }
}

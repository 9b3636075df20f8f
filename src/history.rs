//! Strength history reconstruction
//!
//! Rebuilds the day-by-day strength trace used for charts. Read-only: the
//! habit is never modified, and the trace depends only on the habit's stored
//! daily record, never on its cached strength fields.

use crate::ema::DEFAULT_STRENGTH_PERIOD;
use crate::observer::{DayOutcome, NoopObserver, StrengthObserver};
use crate::replay::{walk_start, Replay};
use crate::types::{HabitRecord, StrengthPoint};
use chrono::NaiveDate;

/// Replays a habit's whole lifetime into a strength trace
pub struct HistoryReconstructor<'a> {
    period: f64,
    observer: &'a dyn StrengthObserver,
}

impl<'a> HistoryReconstructor<'a> {
    pub fn new(period: f64, observer: &'a dyn StrengthObserver) -> Self {
        Self { period, observer }
    }

    /// One point per calendar day from the habit's first day through `today`.
    ///
    /// The last point's [`StrengthPoint::display_strength`] always equals the
    /// `strength` a full recalculation on `today` produces.
    pub fn reconstruct(&self, habit: &HabitRecord, today: NaiveDate) -> Vec<StrengthPoint> {
        let start = walk_start(habit);
        let capacity = usize::try_from((today - start).num_days() + 1).unwrap_or(0);
        let mut points = Vec::with_capacity(capacity);

        Replay::new(habit, self.period, self.observer).run(start, today, 0.0, |date, _, outcome| {
            points.push(StrengthPoint {
                date,
                strength: outcome.strength(),
                frozen: matches!(outcome, DayOutcome::Frozen { .. }),
            });
        });

        points
    }
}

/// Reconstruct history with the default period
pub fn history(habit: &HabitRecord, today: NaiveDate) -> Vec<StrengthPoint> {
    HistoryReconstructor::new(DEFAULT_STRENGTH_PERIOD, &NoopObserver).reconstruct(habit, today)
}

/// Strength recorded for `date` in a trace, if the trace covers it
pub fn strength_on(points: &[StrengthPoint], date: NaiveDate) -> Option<f64> {
    points
        .binary_search_by_key(&date, |point| point.date)
        .ok()
        .map(|index| points[index].strength)
}

//! Completion value normalization
//!
//! Turns one day's raw record into a 0-100 completion value.
//! - Binary habits: done = 100, anything else = 0
//! - Measurable `min` targets: linear partial credit, capped at 100
//! - Measurable `max` targets: full credit up to the target, then a linear
//!   penalty that reaches 0 at twice the target
//! - Measurable habits with no usable target: any positive amount completes

use crate::types::{CompletionEntry, HabitRecord, HabitType, TargetType};
use chrono::NaiveDate;

/// Completion value of a fully satisfied day
pub const FULL_COMPLETION: f64 = 100.0;

/// Normalizer for converting raw daily entries to completion values
pub struct CompletionNormalizer;

impl CompletionNormalizer {
    /// Completion value of `habit` on `date`, in 0-100
    pub fn normalize(habit: &HabitRecord, date: NaiveDate) -> f64 {
        match habit.entry(date) {
            Some(entry) => Self::normalize_entry(habit, entry),
            None => 0.0,
        }
    }

    /// Completion value of a single raw entry under `habit`'s goal
    pub fn normalize_entry(habit: &HabitRecord, entry: CompletionEntry) -> f64 {
        match (habit.habit_type, entry) {
            (_, CompletionEntry::Done(false)) => 0.0,
            (_, CompletionEntry::Done(true)) => FULL_COMPLETION,
            (HabitType::Binary, CompletionEntry::Amount(v)) => any_positive(v),
            (HabitType::Measurable, CompletionEntry::Amount(v)) => {
                // Negative and NaN amounts never reach the smoothing step
                if v.is_nan() || v < 0.0 {
                    return 0.0;
                }
                match habit.target_value {
                    Some(target) if target > 0.0 => {
                        score_against_target(v, target, habit.target_type.unwrap_or_default())
                    }
                    _ => any_positive(v),
                }
            }
        }
    }
}

/// Convenience wrapper around [`CompletionNormalizer::normalize`]
pub fn normalize(habit: &HabitRecord, date: NaiveDate) -> f64 {
    CompletionNormalizer::normalize(habit, date)
}

fn any_positive(v: f64) -> f64 {
    if v > 0.0 {
        FULL_COMPLETION
    } else {
        0.0
    }
}

fn score_against_target(v: f64, target: f64, target_type: TargetType) -> f64 {
    match target_type {
        TargetType::Min => (v / target * 100.0).min(FULL_COMPLETION),
        TargetType::Max => {
            if v <= target {
                FULL_COMPLETION
            } else {
                let penalty = (v - target) / target * 100.0;
                (FULL_COMPLETION - penalty).max(0.0)
            }
        }
    }
}

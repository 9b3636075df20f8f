//! Strength recalculation
//!
//! Invoked after every edit to a habit's daily record, and once per habit
//! when a new calendar day starts. Picks one of two strategies:
//!
//! - **Incremental**: the habit was fully recomputed earlier today and the
//!   edit touches today. Replays only today from the stored unfloored
//!   baseline.
//! - **Full**: anything else. Replays the whole history from zero, captures a
//!   fresh baseline just before today's step, and moves the checkpoint to
//!   today.
//!
//! Edits to days after today are ignored outright.

use crate::ema::{public_strength, DEFAULT_STRENGTH_PERIOD};
use crate::observer::{NoopObserver, StrengthObserver};
use crate::replay::{walk_start, Replay};
use crate::types::HabitRecord;
use chrono::NaiveDate;

/// Which recalculation strategy applies to an edit
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RecalcDecision {
    /// The edit is after today; nothing is recomputed
    FutureEdit { changed: NaiveDate },
    /// Replay from the stored baseline anchored on `anchor` (today)
    Incremental { anchor: NaiveDate, baseline: f64 },
    /// Replay everything from `start`
    Full { start: NaiveDate },
}

impl RecalcDecision {
    /// Choose the strategy for `habit` after an edit on `changed_date`
    /// (`None` for a new-day event).
    pub fn decide(habit: &HabitRecord, changed_date: Option<NaiveDate>, today: NaiveDate) -> Self {
        if let Some(changed) = changed_date {
            if changed > today {
                return RecalcDecision::FutureEdit { changed };
            }
        }

        match (habit.last_strength_update, habit.strength_baseline) {
            (Some(anchor), Some(baseline))
                if anchor == today && changed_date.map_or(true, |changed| changed >= anchor) =>
            {
                RecalcDecision::Incremental { anchor, baseline }
            }
            _ => RecalcDecision::Full {
                start: walk_start(habit),
            },
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RecalcDecision::FutureEdit { .. } => "future_edit",
            RecalcDecision::Incremental { .. } => "incremental",
            RecalcDecision::Full { .. } => "full",
        }
    }
}

/// Runs recalculations with a fixed smoothing period and observer
pub struct Recalculator<'a> {
    period: f64,
    observer: &'a dyn StrengthObserver,
}

impl<'a> Recalculator<'a> {
    pub fn new(period: f64, observer: &'a dyn StrengthObserver) -> Self {
        Self { period, observer }
    }

    /// Return an updated copy of `habit` after an edit on `changed_date`
    pub fn recalculate(
        &self,
        habit: &HabitRecord,
        changed_date: Option<NaiveDate>,
        today: NaiveDate,
    ) -> HabitRecord {
        let decision = RecalcDecision::decide(habit, changed_date, today);
        self.observer.on_decision(&habit.id, &decision);

        let replay = Replay::new(habit, self.period, self.observer);
        let mut updated = habit.clone();

        match decision {
            RecalcDecision::FutureEdit { .. } => return updated,
            RecalcDecision::Incremental { anchor, baseline } => {
                let strength = replay.run(anchor, today, baseline, |_, _, _| {});
                self.observer.on_finish(&habit.id, strength);
                updated.strength = public_strength(strength);
            }
            RecalcDecision::Full { start } => {
                // Stays 0 when the walk never reaches today
                let mut baseline = 0.0;
                let strength = replay.run(start, today, 0.0, |date, before, _| {
                    if date == today {
                        baseline = before;
                    }
                });
                self.observer.on_baseline(today, baseline);
                self.observer.on_finish(&habit.id, strength);
                updated.strength = public_strength(strength);
                updated.strength_baseline = Some(baseline);
                updated.last_strength_update = Some(today);
            }
        }

        updated
    }
}

/// Recalculate with the default period and no observer
pub fn recalculate(
    habit: &HabitRecord,
    changed_date: Option<NaiveDate>,
    today: NaiveDate,
) -> HabitRecord {
    Recalculator::new(DEFAULT_STRENGTH_PERIOD, &NoopObserver).recalculate(habit, changed_date, today)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::history;
    use crate::observer::DayOutcome;
    use crate::types::{parse_created_at, parse_day, CompletionEntry, Edit, TargetType};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use std::cell::RefCell;

    fn day(s: &str) -> NaiveDate {
        parse_day(s).unwrap()
    }

    fn binary_habit(created: &str) -> HabitRecord {
        HabitRecord::new_binary(parse_created_at(created).unwrap())
    }

    /// Day 1 done, day 2 missed, day 3 done
    fn three_day_habit() -> HabitRecord {
        let mut habit = binary_habit("2025-01-01");
        habit.completions.insert(day("2025-01-01"), CompletionEntry::Done(true));
        habit.completions.insert(day("2025-01-03"), CompletionEntry::Done(true));
        habit
    }

    /// Same record with every checkpoint forgotten
    fn fresh(habit: &HabitRecord) -> HabitRecord {
        HabitRecord {
            strength: 0,
            strength_baseline: None,
            last_strength_update: None,
            ..habit.clone()
        }
    }

    #[derive(Default)]
    struct RecordingObserver {
        decisions: RefCell<Vec<&'static str>>,
        days: RefCell<Vec<(NaiveDate, DayOutcome)>>,
        baselines: RefCell<Vec<f64>>,
    }

    impl StrengthObserver for RecordingObserver {
        fn on_decision(&self, _habit_id: &str, decision: &RecalcDecision) {
            self.decisions.borrow_mut().push(decision.label());
        }

        fn on_day(&self, date: NaiveDate, outcome: DayOutcome) {
            self.days.borrow_mut().push((date, outcome));
        }

        fn on_baseline(&self, _date: NaiveDate, baseline: f64) {
            self.baselines.borrow_mut().push(baseline);
        }
    }

    #[test]
    fn test_three_day_scenario() {
        let habit = three_day_habit();
        let updated = recalculate(&habit, None, day("2025-01-03"));

        assert_eq!(updated.strength, 39);
        assert_eq!(updated.strength_baseline, Some(18.75));
        assert_eq!(updated.last_strength_update, Some(day("2025-01-03")));
        // Input untouched
        assert_eq!(habit.strength, 0);
        assert_eq!(habit.last_strength_update, None);
    }

    #[test]
    fn test_first_recalculation_is_full() {
        let habit = three_day_habit();
        assert_eq!(
            RecalcDecision::decide(&habit, None, day("2025-01-03")),
            RecalcDecision::Full { start: day("2025-01-01") }
        );
    }

    #[test]
    fn test_same_day_edit_is_incremental() {
        let today = day("2025-01-03");
        let checkpointed = recalculate(&three_day_habit(), None, today);

        let edited = Edit::SetCompletion { date: today, entry: false.into() }.apply_to(&checkpointed);
        assert_eq!(
            RecalcDecision::decide(&edited, Some(today), today),
            RecalcDecision::Incremental { anchor: today, baseline: 18.75 }
        );

        let updated = recalculate(&edited, Some(today), today);
        // 18.75 * 0.75
        assert_eq!(updated.strength, 14);
        assert_eq!(updated.strength_baseline, Some(18.75));
        assert_eq!(updated.last_strength_update, Some(today));
    }

    #[test]
    fn test_edit_before_checkpoint_is_full() {
        let today = day("2025-01-03");
        let checkpointed = recalculate(&three_day_habit(), None, today);

        let edited = Edit::SetCompletion { date: day("2025-01-01"), entry: false.into() }
            .apply_to(&checkpointed);
        let decision = RecalcDecision::decide(&edited, Some(day("2025-01-01")), today);
        assert!(matches!(decision, RecalcDecision::Full { .. }));

        // Day 1 and 2 now both zero, day 3 done: 0, 0, 25
        let updated = recalculate(&edited, Some(day("2025-01-01")), today);
        assert_eq!(updated.strength, 25);
        assert_eq!(updated.strength_baseline, Some(0.0));
    }

    #[test]
    fn test_future_edit_is_noop() {
        let today = day("2025-01-03");
        let checkpointed = recalculate(&three_day_habit(), None, today);
        let edited = Edit::SetCompletion { date: day("2025-01-04"), entry: true.into() }
            .apply_to(&checkpointed);

        let observer = RecordingObserver::default();
        let result = Recalculator::new(7.0, &observer).recalculate(
            &edited,
            Some(day("2025-01-04")),
            today,
        );

        assert_eq!(result, edited);
        assert_eq!(*observer.decisions.borrow(), vec!["future_edit"]);
        assert!(observer.days.borrow().is_empty());
    }

    #[test]
    fn test_checkpoint_without_baseline_is_full() {
        let today = day("2025-01-03");
        let mut habit = three_day_habit();
        habit.last_strength_update = Some(today);
        habit.strength_baseline = None;

        assert!(matches!(
            RecalcDecision::decide(&habit, Some(today), today),
            RecalcDecision::Full { .. }
        ));
        assert_eq!(recalculate(&habit, Some(today), today).strength, 39);
    }

    #[test]
    fn test_new_day_event_moves_checkpoint() {
        let checkpointed = recalculate(&three_day_habit(), None, day("2025-01-03"));
        let next_day = day("2025-01-04");

        assert!(matches!(
            RecalcDecision::decide(&checkpointed, None, next_day),
            RecalcDecision::Full { .. }
        ));
        let rolled = recalculate(&checkpointed, None, next_day);
        // Day 4 has no record: 39.0625 * 0.75
        assert_eq!(rolled.strength, 29);
        assert_eq!(rolled.strength_baseline, Some(39.0625));
        assert_eq!(rolled.last_strength_update, Some(next_day));
    }

    #[test]
    fn test_multi_day_gap_self_heals() {
        let mut habit = binary_habit("2025-01-01");
        for d in 1..=10 {
            habit
                .completions
                .insert(day(&format!("2025-01-{d:02}")), CompletionEntry::Done(true));
        }
        let checkpointed = recalculate(&habit, None, day("2025-01-10"));

        // App not opened for two weeks; next trigger is an app-start event
        let today = day("2025-01-24");
        let healed = recalculate(&checkpointed, None, today);
        let from_scratch = recalculate(&fresh(&checkpointed), None, today);

        assert_eq!(healed, from_scratch);
        assert!(healed.strength < checkpointed.strength);
        assert_eq!(healed.last_strength_update, Some(today));

        // A same-day edit right after the gap replays only today
        let edited = Edit::SetCompletion { date: today, entry: true.into() }.apply_to(&healed);
        assert!(matches!(
            RecalcDecision::decide(&edited, Some(today), today),
            RecalcDecision::Incremental { .. }
        ));
        assert_eq!(
            recalculate(&edited, Some(today), today).strength,
            recalculate(&fresh(&edited), None, today).strength
        );
    }

    #[test]
    fn test_freeze_keeps_strength_flat() {
        let today = day("2025-01-04");
        let mut habit = three_day_habit();
        habit.skipped.insert(today, true);
        habit.completions.insert(today, CompletionEntry::Done(true));

        let updated = recalculate(&habit, None, today);
        assert_eq!(updated.strength, 39);
        assert_eq!(updated.strength_baseline, Some(39.0625));

        let missed = recalculate(&three_day_habit(), None, today);
        assert_eq!(missed.strength, 29);
    }

    #[test]
    fn test_freezing_today_incrementally() {
        let today = day("2025-01-03");
        let checkpointed = recalculate(&three_day_habit(), None, today);
        let frozen = Edit::Freeze { date: today }.apply_to(&checkpointed);

        let updated = recalculate(&frozen, Some(today), today);
        assert_eq!(updated.strength, 18);
    }

    #[test]
    fn test_observer_sees_full_walk() {
        let observer = RecordingObserver::default();
        Recalculator::new(7.0, &observer).recalculate(&three_day_habit(), None, day("2025-01-03"));

        assert_eq!(*observer.decisions.borrow(), vec!["full"]);
        assert_eq!(observer.days.borrow().len(), 3);
        assert_eq!(*observer.baselines.borrow(), vec![18.75]);
    }

    #[test]
    fn test_habit_starting_after_today() {
        let habit = binary_habit("2025-02-01");
        let updated = recalculate(&habit, None, day("2025-01-15"));
        assert_eq!(updated.strength, 0);
        assert_eq!(updated.strength_baseline, Some(0.0));
        assert_eq!(updated.last_strength_update, Some(day("2025-01-15")));
    }

    #[test]
    fn test_ten_years_of_history() {
        let mut habit = binary_habit("2015-01-01");
        let start = day("2015-01-01");
        for (i, date) in crate::replay::days(start, day("2024-12-31")).enumerate() {
            if i % 3 != 0 {
                habit.completions.insert(date, CompletionEntry::Done(true));
            }
        }
        let today = day("2024-12-31");

        let updated = recalculate(&habit, None, today);
        let trace = history(&habit, today);

        assert_eq!(trace.len(), 3653);
        assert_eq!(trace[0].date, start);
        assert_eq!(trace.last().map(|p| p.date), Some(today));
        assert_eq!(trace.last().map(|p| p.display_strength()), Some(updated.strength));
        // Two out of three days done settles well above half
        assert!(updated.strength > 50);
    }

    #[test]
    fn test_long_run_incremental_matches_full() {
        let mut habit = HabitRecord::new_measurable(
            parse_created_at("2023-01-01").unwrap(),
            8.0,
            TargetType::Min,
        );
        let mut today = day("2023-01-01");

        for i in 0..730u32 {
            habit = recalculate(&habit, None, today);

            // A handful of same-day edits, each replayed incrementally
            let edits = [
                Edit::SetCompletion { date: today, entry: CompletionEntry::Amount((i % 11) as f64) },
                Edit::SetCompletion { date: today, entry: CompletionEntry::Amount((i % 7) as f64 + 0.3) },
                if i % 13 == 0 { Edit::Freeze { date: today } } else { Edit::Unfreeze { date: today } },
            ];
            for edit in &edits {
                habit = edit.apply_to(&habit);
                assert!(matches!(
                    RecalcDecision::decide(&habit, Some(today), today),
                    RecalcDecision::Incremental { .. }
                ));
                habit = recalculate(&habit, Some(today), today);
            }

            let full = recalculate(&fresh(&habit), None, today);
            assert_eq!(habit.strength, full.strength, "diverged on {today}");
            assert_eq!(habit.strength_baseline, full.strength_baseline, "baseline drift on {today}");

            today = today.succ_opt().unwrap();
        }
    }

    fn entry_strategy() -> impl Strategy<Value = Option<CompletionEntry>> {
        prop_oneof![
            Just(None),
            Just(Some(CompletionEntry::Done(true))),
            Just(Some(CompletionEntry::Done(false))),
            (0.0f64..30.0).prop_map(|v| Some(CompletionEntry::Amount(v))),
        ]
    }

    proptest! {
        #[test]
        fn prop_incremental_equals_full(
            past in prop::collection::vec((entry_strategy(), any::<bool>()), 1..90),
            todays_edits in prop::collection::vec(entry_strategy(), 1..6),
            max_target in any::<bool>(),
        ) {
            let target_type = if max_target { TargetType::Max } else { TargetType::Min };
            let mut habit = HabitRecord::new_measurable(
                parse_created_at("2024-01-01").unwrap(),
                12.0,
                target_type,
            );
            let start = day("2024-01-01");
            let mut today = start;
            for (offset, (entry, frozen)) in past.iter().enumerate() {
                today = start + chrono::Duration::days(offset as i64);
                if let Some(entry) = entry {
                    habit.completions.insert(today, *entry);
                }
                if *frozen {
                    habit.skipped.insert(today, true);
                }
            }

            habit = recalculate(&habit, None, today);
            for entry in &todays_edits {
                let edit = match entry {
                    Some(entry) => Edit::SetCompletion { date: today, entry: *entry },
                    None => Edit::ClearCompletion { date: today },
                };
                habit = recalculate(&edit.apply_to(&habit), Some(today), today);
            }

            let full = recalculate(&fresh(&habit), None, today);
            prop_assert_eq!(habit.strength, full.strength);
            prop_assert_eq!(habit.strength_baseline, full.strength_baseline);

            let trace = history(&habit, today);
            prop_assert_eq!(trace.last().map(|p| p.display_strength()), Some(full.strength));
        }
    }
}

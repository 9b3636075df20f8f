//! Engine facade
//!
//! `StrengthEngine` is the entry point the store and chart layers hold on to.
//! It owns the configuration and trace observer and exposes every operation
//! with them applied.

use crate::config::StrengthConfig;
use crate::error::StrengthError;
use crate::history::HistoryReconstructor;
use crate::normalizer::CompletionNormalizer;
use crate::observer::{NoopObserver, StrengthObserver};
use crate::recalculate::Recalculator;
use crate::types::{Edit, HabitRecord, StrengthPoint};
use chrono::{Local, NaiveDate};

/// Configured habit strength engine
pub struct StrengthEngine {
    config: StrengthConfig,
    observer: Box<dyn StrengthObserver>,
}

impl Default for StrengthEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl StrengthEngine {
    /// Create an engine with the default period and no observer
    pub fn new() -> Self {
        Self {
            config: StrengthConfig::default(),
            observer: Box::new(NoopObserver),
        }
    }

    /// Create an engine with a specific configuration
    pub fn with_config(config: StrengthConfig) -> Result<Self, StrengthError> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::new()
        })
    }

    /// Attach a trace observer
    pub fn with_observer(mut self, observer: impl StrengthObserver + 'static) -> Self {
        self.observer = Box::new(observer);
        self
    }

    pub fn config(&self) -> &StrengthConfig {
        &self.config
    }

    /// The host's current local calendar day
    pub fn today() -> NaiveDate {
        Local::now().date_naive()
    }

    /// Completion value of `habit` on `date`
    pub fn normalize(&self, habit: &HabitRecord, date: NaiveDate) -> f64 {
        CompletionNormalizer::normalize(habit, date)
    }

    /// Updated copy of `habit` after an edit on `changed_date` (`None` for a
    /// new-day event)
    pub fn recalculate(
        &self,
        habit: &HabitRecord,
        changed_date: Option<NaiveDate>,
        today: NaiveDate,
    ) -> HabitRecord {
        Recalculator::new(self.config.period, self.observer.as_ref())
            .recalculate(habit, changed_date, today)
    }

    /// Day-by-day strength trace through `today`
    pub fn history(&self, habit: &HabitRecord, today: NaiveDate) -> Vec<StrengthPoint> {
        HistoryReconstructor::new(self.config.period, self.observer.as_ref())
            .reconstruct(habit, today)
    }

    /// Apply an edit to a copy of `habit` and recalculate. Edits to days after
    /// `today` are dropped and the habit comes back unchanged.
    pub fn apply_edit(&self, habit: &HabitRecord, edit: &Edit, today: NaiveDate) -> HabitRecord {
        let date = edit.date();
        if date > today {
            return habit.clone();
        }
        self.recalculate(&edit.apply_to(habit), Some(date), today)
    }

    /// New-day event: bring every habit's checkpoint up to `today`
    pub fn rollover(&self, habits: &[HabitRecord], today: NaiveDate) -> Vec<HabitRecord> {
        habits
            .iter()
            .map(|habit| self.recalculate(habit, None, today))
            .collect()
    }

    /// JSON in, JSON out variant of [`Self::recalculate`]
    pub fn recalculate_json(
        &self,
        habit_json: &str,
        changed_date: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Result<String, StrengthError> {
        let habit = HabitRecord::from_json(habit_json)?;
        self.recalculate(&habit, changed_date, today).to_json()
    }

    /// JSON in, JSON array out variant of [`Self::history`]
    pub fn history_json(&self, habit_json: &str, today: NaiveDate) -> Result<String, StrengthError> {
        let habit = HabitRecord::from_json(habit_json)?;
        Ok(serde_json::to_string(&self.history(&habit, today))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::DayOutcome;
    use crate::types::{parse_created_at, parse_day, CompletionEntry};
    use std::cell::Cell;
    use std::rc::Rc;

    fn day(s: &str) -> NaiveDate {
        parse_day(s).unwrap()
    }

    fn sample_habit_json() -> &'static str {
        r#"{
            "id": "read-daily",
            "createdAt": "2025-01-01",
            "type": "binary",
            "completions": { "2025-01-01": true, "2025-01-03": true }
        }"#
    }

    struct CountingObserver(Rc<Cell<usize>>);

    impl StrengthObserver for CountingObserver {
        fn on_day(&self, _date: NaiveDate, _outcome: DayOutcome) {
            self.0.set(self.0.get() + 1);
        }
    }

    #[test]
    fn test_apply_edit_same_day() {
        let engine = StrengthEngine::new();
        let today = day("2025-01-03");
        let habit = engine.recalculate(&HabitRecord::from_json(sample_habit_json()).unwrap(), None, today);

        let edit = Edit::SetCompletion { date: today, entry: CompletionEntry::Done(false) };
        let updated = engine.apply_edit(&habit, &edit, today);
        assert_eq!(updated.strength, 14);
        assert_eq!(updated.entry(today), Some(CompletionEntry::Done(false)));
        assert_eq!(habit.entry(today), Some(CompletionEntry::Done(true)));
    }

    #[test]
    fn test_apply_edit_future_is_dropped() {
        let engine = StrengthEngine::new();
        let today = day("2025-01-03");
        let habit = HabitRecord::from_json(sample_habit_json()).unwrap();

        let edit = Edit::SetCompletion { date: day("2025-01-09"), entry: CompletionEntry::Done(true) };
        let updated = engine.apply_edit(&habit, &edit, today);
        assert_eq!(updated, habit);
        assert_eq!(updated.entry(day("2025-01-09")), None);
    }

    #[test]
    fn test_rollover_updates_every_habit() {
        let engine = StrengthEngine::new();
        let today = day("2025-01-03");
        let first = HabitRecord::from_json(sample_habit_json()).unwrap();
        let second = HabitRecord::new_binary(parse_created_at("2025-01-02").unwrap());

        let rolled = engine.rollover(&[first, second], today);
        assert_eq!(rolled.len(), 2);
        assert_eq!(rolled[0].strength, 39);
        assert_eq!(rolled[1].strength, 0);
        assert!(rolled.iter().all(|h| h.last_strength_update == Some(today)));
    }

    #[test]
    fn test_custom_period() {
        let engine = StrengthEngine::with_config(StrengthConfig { period: 3.0 }).unwrap();
        let habit = HabitRecord::from_json(sample_habit_json()).unwrap();
        // alpha = 0.5: 50, 25, 62.5
        let updated = engine.recalculate(&habit, None, day("2025-01-03"));
        assert_eq!(updated.strength, 62);
        assert_eq!(updated.strength_baseline, Some(25.0));

        assert!(StrengthEngine::with_config(StrengthConfig { period: 0.0 }).is_err());
    }

    #[test]
    fn test_observer_is_used() {
        let count = Rc::new(Cell::new(0));
        let engine = StrengthEngine::new().with_observer(CountingObserver(count.clone()));
        let habit = HabitRecord::from_json(sample_habit_json()).unwrap();

        engine.history(&habit, day("2025-01-05"));
        assert_eq!(count.get(), 5);
    }

    #[test]
    fn test_json_entry_points() {
        let engine = StrengthEngine::new();
        let today = day("2025-01-03");

        let updated: serde_json::Value =
            serde_json::from_str(&engine.recalculate_json(sample_habit_json(), None, today).unwrap())
                .unwrap();
        assert_eq!(updated["strength"], 39);
        assert_eq!(updated["strengthBaseline"], 18.75);
        assert_eq!(updated["lastStrengthUpdate"], "2025-01-03");

        let trace: serde_json::Value =
            serde_json::from_str(&engine.history_json(sample_habit_json(), today).unwrap()).unwrap();
        assert_eq!(trace.as_array().map(|a| a.len()), Some(3));
        assert_eq!(trace[1]["strength"], 18.75);

        assert!(engine.recalculate_json("not json", None, today).is_err());
    }

    #[test]
    fn test_normalize_passthrough() {
        let engine = StrengthEngine::new();
        let habit = HabitRecord::from_json(sample_habit_json()).unwrap();
        assert_eq!(engine.normalize(&habit, day("2025-01-01")), 100.0);
        assert_eq!(engine.normalize(&habit, day("2025-01-02")), 0.0);
    }
}

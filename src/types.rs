//! Core types for the habit strength engine
//!
//! `HabitRecord` is the binding contract with the storage collaborator. It is
//! treated as an immutable value: every engine operation takes a borrowed
//! record and hands back an updated copy.

use crate::error::{StrengthError, ValidationError};
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Date format used for every calendar-day key
pub const DAY_FORMAT: &str = "%Y-%m-%d";

/// Kind of habit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HabitType {
    /// Done / not done
    Binary,
    /// Tracked against a numeric target
    Measurable,
}

impl HabitType {
    pub fn as_str(&self) -> &'static str {
        match self {
            HabitType::Binary => "binary",
            HabitType::Measurable => "measurable",
        }
    }
}

/// Direction of a measurable habit's goal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    /// Reach at least the target
    #[default]
    Min,
    /// Stay at or below the target
    Max,
}

/// One day's raw record: `true`, `false`, or a measured amount
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CompletionEntry {
    Done(bool),
    Amount(f64),
}

impl CompletionEntry {
    /// Whether the entry counts as activity when locating the first day of a
    /// habit's history. `false`, `0` and `NaN` do not.
    pub fn is_truthy(&self) -> bool {
        match *self {
            CompletionEntry::Done(done) => done,
            CompletionEntry::Amount(v) => v != 0.0 && !v.is_nan(),
        }
    }
}

impl From<bool> for CompletionEntry {
    fn from(done: bool) -> Self {
        CompletionEntry::Done(done)
    }
}

impl From<f64> for CompletionEntry {
    fn from(amount: f64) -> Self {
        CompletionEntry::Amount(amount)
    }
}

/// A habit and everything the engine knows about it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitRecord {
    /// Opaque identifier owned by the store
    pub id: String,
    /// When the habit began, in the offset it was recorded with. Accepts a
    /// bare `YYYY-MM-DD` on input.
    #[serde(with = "created_at_format")]
    pub created_at: DateTime<FixedOffset>,
    #[serde(rename = "type")]
    pub habit_type: HabitType,
    /// Numeric goal (measurable habits only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_type: Option<TargetType>,
    #[serde(default)]
    pub completions: BTreeMap<NaiveDate, CompletionEntry>,
    /// Frozen days. Only `true` values freeze.
    #[serde(default)]
    pub skipped: BTreeMap<NaiveDate, bool>,
    /// Public score, floored and clamped to 0-100
    #[serde(default)]
    pub strength: u8,
    /// Unfloored running value captured just before today's step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strength_baseline: Option<f64>,
    /// Day of the last full recomputation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_strength_update: Option<NaiveDate>,
}

impl HabitRecord {
    /// Create a fresh binary habit with a random id
    pub fn new_binary(created_at: DateTime<FixedOffset>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            created_at,
            habit_type: HabitType::Binary,
            target_value: None,
            target_type: None,
            completions: BTreeMap::new(),
            skipped: BTreeMap::new(),
            strength: 0,
            strength_baseline: None,
            last_strength_update: None,
        }
    }

    /// Create a fresh measurable habit with a random id
    pub fn new_measurable(
        created_at: DateTime<FixedOffset>,
        target_value: f64,
        target_type: TargetType,
    ) -> Self {
        Self {
            habit_type: HabitType::Measurable,
            target_value: Some(target_value),
            target_type: Some(target_type),
            ..Self::new_binary(created_at)
        }
    }

    /// The local calendar day the habit began, read in `created_at`'s own offset
    pub fn created_day(&self) -> NaiveDate {
        self.created_at.date_naive()
    }

    /// Raw entry recorded for a day, if any
    pub fn entry(&self, date: NaiveDate) -> Option<CompletionEntry> {
        self.completions.get(&date).copied()
    }

    /// Whether the day is frozen (no smoothing step applies)
    pub fn is_frozen(&self, date: NaiveDate) -> bool {
        self.skipped.get(&date).copied().unwrap_or(false)
    }

    /// Check the record against the storage contract
    pub fn validate(&self, today: NaiveDate) -> Result<(), ValidationError> {
        for (date, entry) in &self.completions {
            if let CompletionEntry::Amount(v) = entry {
                if !v.is_finite() {
                    return Err(ValidationError::NonFiniteCompletion {
                        date: date.format(DAY_FORMAT).to_string(),
                    });
                }
            }
        }

        if let Some(target) = self.target_value {
            if !target.is_finite() {
                return Err(ValidationError::NonFiniteTarget);
            }
            if target < 0.0 {
                return Err(ValidationError::NegativeTarget(target));
            }
        }

        if self.strength > 100 {
            return Err(ValidationError::StrengthOutOfRange(self.strength));
        }

        if let Some(baseline) = self.strength_baseline {
            if !baseline.is_finite() {
                return Err(ValidationError::NonFiniteBaseline);
            }
        }

        if let Some(last) = self.last_strength_update {
            if last > today {
                return Err(ValidationError::CheckpointInFuture {
                    last: last.format(DAY_FORMAT).to_string(),
                    today: today.format(DAY_FORMAT).to_string(),
                });
            }
        }

        Ok(())
    }

    /// Load a habit record from JSON
    pub fn from_json(json: &str) -> Result<Self, StrengthError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize the habit record to JSON
    pub fn to_json(&self) -> Result<String, StrengthError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// A single mutation to a habit's daily record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Edit {
    SetCompletion { date: NaiveDate, entry: CompletionEntry },
    ClearCompletion { date: NaiveDate },
    Freeze { date: NaiveDate },
    Unfreeze { date: NaiveDate },
}

impl Edit {
    /// The day this edit touches
    pub fn date(&self) -> NaiveDate {
        match self {
            Edit::SetCompletion { date, .. }
            | Edit::ClearCompletion { date }
            | Edit::Freeze { date }
            | Edit::Unfreeze { date } => *date,
        }
    }

    /// Apply the edit to a copy of `habit`
    pub fn apply_to(&self, habit: &HabitRecord) -> HabitRecord {
        let mut updated = habit.clone();
        match *self {
            Edit::SetCompletion { date, entry } => {
                updated.completions.insert(date, entry);
            }
            Edit::ClearCompletion { date } => {
                updated.completions.remove(&date);
            }
            Edit::Freeze { date } => {
                updated.skipped.insert(date, true);
            }
            Edit::Unfreeze { date } => {
                updated.skipped.remove(&date);
            }
        }
        updated
    }
}

/// One day of a reconstructed strength trace
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrengthPoint {
    pub date: NaiveDate,
    /// Unfloored strength after the day was processed
    pub strength: f64,
    /// The day was frozen, so `strength` carried over unchanged
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub frozen: bool,
}

impl StrengthPoint {
    /// Strength as the public score would show it
    pub fn display_strength(&self) -> u8 {
        crate::ema::public_strength(self.strength)
    }
}

/// Parse a `YYYY-MM-DD` calendar day
pub fn parse_day(raw: &str) -> Result<NaiveDate, StrengthError> {
    NaiveDate::parse_from_str(raw.trim(), DAY_FORMAT)
        .map_err(|e| StrengthError::DateParseError(format!("{raw}: {e}")))
}

/// Parse a creation timestamp: RFC 3339 with its offset kept, or a bare day
/// taken as midnight at offset zero
pub fn parse_created_at(raw: &str) -> Result<DateTime<FixedOffset>, StrengthError> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt);
    }
    let day = parse_day(raw)?;
    day.and_hms_opt(0, 0, 0)
        .map(|naive| DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc).into())
        .ok_or_else(|| StrengthError::DateParseError(raw.to_string()))
}

mod created_at_format {
    use chrono::{DateTime, FixedOffset, SecondsFormat};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &DateTime<FixedOffset>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<FixedOffset>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        super::parse_created_at(&raw).map_err(serde::de::Error::custom)
    }
}

//! Error types for the habit strength engine
//!
//! The core computations (normalize, step, recalculate, history) never fail.
//! Errors only arise at the boundaries: parsing records, loading config, and
//! validating caller input.

use thiserror::Error;

/// Errors that can occur at the engine's input boundaries
#[derive(Debug, Error)]
pub enum StrengthError {
    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Date parse error: {0}")]
    DateParseError(String),

    #[error("Invalid smoothing period: {0} (must be a finite positive number)")]
    InvalidPeriod(f64),
}

/// Contract violations found by [`crate::types::HabitRecord::validate`]
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("completion on {date} is not a finite number")]
    NonFiniteCompletion { date: String },

    #[error("target value {0} is negative")]
    NegativeTarget(f64),

    #[error("target value is not a finite number")]
    NonFiniteTarget,

    #[error("strength {0} is outside 0-100")]
    StrengthOutOfRange(u8),

    #[error("strength baseline is not a finite number")]
    NonFiniteBaseline,

    #[error("last strength update {last} is after today ({today})")]
    CheckpointInFuture { last: String, today: String },
}

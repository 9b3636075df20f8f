//! Habit Strength - On-device engine for habit strength scores
//!
//! Turns a habit's raw record of daily completions into a single 0-100
//! strength score, and reconstructs that score's full history for charting.
//! Each day's record is normalized to a completion value and folded into an
//! exponential moving average; frozen days suspend the average instead of
//! counting as misses.
//!
//! ## Modules
//!
//! - **Normalizer**: one day's raw record → completion value (0-100)
//! - **EMA**: one smoothing step
//! - **Recalculate**: incremental or full recomputation after an edit
//! - **History**: full day-by-day strength trace

pub mod config;
pub mod ema;
pub mod engine;
pub mod error;
pub mod history;
pub mod normalizer;
pub mod observer;
pub mod recalculate;
pub mod replay;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use config::StrengthConfig;
pub use ema::{step, DEFAULT_STRENGTH_PERIOD};
pub use engine::StrengthEngine;
pub use error::{StrengthError, ValidationError};
pub use history::{history, HistoryReconstructor};
pub use normalizer::{normalize, CompletionNormalizer};
pub use observer::{DayOutcome, NoopObserver, StrengthObserver, TracingObserver};
pub use recalculate::{recalculate, RecalcDecision, Recalculator};
pub use types::{
    CompletionEntry, Edit, HabitRecord, HabitType, StrengthPoint, TargetType,
};

/// Engine version
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name reported by the CLI and FFI
pub const PRODUCER_NAME: &str = "habit-strength";

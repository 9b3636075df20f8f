//! Exponential moving average step
//!
//! `S[t] = S[t-1] * (1 - alpha) + value[t] * alpha`, with
//! `alpha = 2 / (period + 1)`.
//!
//! The step has no notion of frozen days. Callers simply do not invoke it for
//! a day that is frozen.

/// Default smoothing period in days (alpha = 0.25)
pub const DEFAULT_STRENGTH_PERIOD: f64 = 7.0;

/// Smoothing factor for a period
pub fn alpha(period: f64) -> f64 {
    2.0 / (period + 1.0)
}

/// Advance the running strength by one processed day
pub fn step(previous_strength: f64, completion_value: f64, period: f64) -> f64 {
    let alpha = alpha(period);
    previous_strength * (1.0 - alpha) + completion_value * alpha
}

/// Floor and clamp a running value into the public 0-100 score
pub fn public_strength(value: f64) -> u8 {
    // NaN saturates to 0 in the cast
    value.floor().clamp(0.0, 100.0) as u8
}

//! Engine configuration

use crate::ema::{alpha, DEFAULT_STRENGTH_PERIOD};
use crate::error::StrengthError;
use serde::{Deserialize, Serialize};

/// Tunable engine settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrengthConfig {
    /// Effective smoothing window in days
    #[serde(default = "default_period")]
    pub period: f64,
}

fn default_period() -> f64 {
    DEFAULT_STRENGTH_PERIOD
}

impl Default for StrengthConfig {
    fn default() -> Self {
        Self {
            period: DEFAULT_STRENGTH_PERIOD,
        }
    }
}

impl StrengthConfig {
    /// Config with a specific period, validated
    pub fn with_period(period: f64) -> Result<Self, StrengthError> {
        let config = Self { period };
        config.validate()?;
        Ok(config)
    }

    /// Reject periods the smoothing step cannot use
    pub fn validate(&self) -> Result<(), StrengthError> {
        if self.period.is_finite() && self.period > 0.0 {
            Ok(())
        } else {
            Err(StrengthError::InvalidPeriod(self.period))
        }
    }

    /// Smoothing factor implied by the period
    pub fn alpha(&self) -> f64 {
        alpha(self.period)
    }

    /// Load and validate config from JSON
    pub fn from_json(json: &str) -> Result<Self, StrengthError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize config to JSON
    pub fn to_json(&self) -> Result<String, StrengthError> {
        Ok(serde_json::to_string(self)?)
    }
}

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("tick period must be > 0")]
    InvalidTickPeriod,

    #[error("dwell time must be > 0")]
    InvalidDwell,

    #[error("session budget must be at least one second")]
    InvalidBudget,

    #[error("model input edge must be > 0")]
    InvalidInputEdge,

    #[error("inference failure limit must be > 0")]
    InvalidFailureLimit,
}

//
// ─── SETTINGS ──────────────────────────────────────────────────────────────────
//

/// Tuning knobs for the sign detection loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionSettings {
    tick_period_ms: u64,
    dwell_ms: u64,
    budget_secs: u32,
    input_edge: u32,
    max_inference_failures: u32,
}

impl Default for DetectionSettings {
    /// One tick per second, 1.5 s dwell, 10 s per attempt, 320 px model input.
    fn default() -> Self {
        Self {
            tick_period_ms: 1_000,
            dwell_ms: 1_500,
            budget_secs: 10,
            input_edge: 320,
            max_inference_failures: 3,
        }
    }
}

impl DetectionSettings {
    /// Creates custom detection settings.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` if any value is zero.
    pub fn new(
        tick_period: Duration,
        dwell: Duration,
        budget_secs: u32,
        input_edge: u32,
        max_inference_failures: u32,
    ) -> Result<Self, SettingsError> {
        let settings = Self {
            tick_period_ms: u64::try_from(tick_period.as_millis()).unwrap_or(u64::MAX),
            dwell_ms: u64::try_from(dwell.as_millis()).unwrap_or(u64::MAX),
            budget_secs,
            input_edge,
            max_inference_failures,
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Checks values that may have come from deserialization.
    ///
    /// # Errors
    ///
    /// Returns the first `SettingsError` found.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.tick_period_ms == 0 {
            return Err(SettingsError::InvalidTickPeriod);
        }
        if self.dwell_ms == 0 {
            return Err(SettingsError::InvalidDwell);
        }
        if self.budget_secs == 0 {
            return Err(SettingsError::InvalidBudget);
        }
        if self.input_edge == 0 {
            return Err(SettingsError::InvalidInputEdge);
        }
        if self.max_inference_failures == 0 {
            return Err(SettingsError::InvalidFailureLimit);
        }
        Ok(())
    }

    #[must_use]
    pub fn with_tick_period(mut self, period: Duration) -> Self {
        self.tick_period_ms = u64::try_from(period.as_millis()).unwrap_or(u64::MAX).max(1);
        self
    }

    #[must_use]
    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_period_ms)
    }

    #[must_use]
    pub fn dwell(&self) -> Duration {
        Duration::from_millis(self.dwell_ms)
    }

    #[must_use]
    pub fn budget_secs(&self) -> u32 {
        self.budget_secs
    }

    #[must_use]
    pub fn input_edge(&self) -> u32 {
        self.input_edge
    }

    #[must_use]
    pub fn max_inference_failures(&self) -> u32 {
        self.max_inference_failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_detection_contract() {
        let settings = DetectionSettings::default();
        assert_eq!(settings.tick_period(), Duration::from_secs(1));
        assert_eq!(settings.dwell(), Duration::from_millis(1_500));
        assert_eq!(settings.budget_secs(), 10);
        assert_eq!(settings.input_edge(), 320);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn rejects_zero_values() {
        let err = DetectionSettings::new(Duration::ZERO, Duration::from_secs(1), 10, 320, 3)
            .unwrap_err();
        assert_eq!(err, SettingsError::InvalidTickPeriod);

        let err = DetectionSettings::new(Duration::from_secs(1), Duration::from_secs(1), 0, 320, 3)
            .unwrap_err();
        assert_eq!(err, SettingsError::InvalidBudget);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let settings: DetectionSettings = serde_json::from_str(r#"{"budget_secs": 20}"#).unwrap();
        assert_eq!(settings.budget_secs(), 20);
        assert_eq!(settings.dwell(), Duration::from_millis(1_500));
    }
}

use thiserror::Error;

use crate::model::{ChallengeError, OutputShapeError, SettingsError};

/// Any validation failure raised by the core model.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Challenge(#[from] ChallengeError),
    #[error(transparent)]
    OutputShape(#[from] OutputShapeError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DetectionSettings;
    use std::time::Duration;

    fn settings(budget_secs: u32) -> Result<DetectionSettings, Error> {
        let dwell = Duration::from_millis(1_500);
        Ok(DetectionSettings::new(Duration::from_secs(1), dwell, budget_secs, 320, 3)?)
    }

    #[test]
    fn model_errors_convert() {
        assert!(settings(10).is_ok());
        let err = settings(0).unwrap_err();
        assert!(matches!(err, Error::Settings(SettingsError::InvalidBudget)));
        assert_eq!(err.to_string(), SettingsError::InvalidBudget.to_string());
    }
}

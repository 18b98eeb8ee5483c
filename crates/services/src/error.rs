//! Shared error types for the services crate.

use thiserror::Error;

use lingo_core::model::{ChallengeError, OutputShapeError, QuizStatus, SettingsError};
use storage::StorageError;

/// Errors emitted while fetching or preparing the sign detection model.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ModelLoadError {
    #[error("invalid model url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("model request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("malformed model manifest: {0}")]
    Manifest(#[from] serde_json::Error),
    #[error("unsupported model format: {0}")]
    UnsupportedFormat(String),
    #[error("model manifest has no topology")]
    MissingTopology,
    #[error("model manifest lists no weights")]
    MissingWeights,
    #[error("inference backend rejected the model: {0}")]
    Backend(String),
}

/// Errors emitted by a single inference call.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum InferenceError {
    #[error("frame has no pixels")]
    EmptyFrame,
    #[error("inference backend failed: {0}")]
    Backend(String),
    #[error(transparent)]
    OutputShape(#[from] OutputShapeError),
}

/// Errors emitted by the quiz orchestrator.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizError {
    #[error("lesson already completed")]
    Completed,
    #[error("no option selected")]
    NoSelection,
    #[error("option does not belong to the current challenge")]
    UnknownOption,
    #[error("challenge already answered ({0})")]
    AlreadyAnswered(QuizStatus),
    #[error("current challenge is not answered by signing")]
    NotGestureChallenge,
    #[error("sign detection is unavailable")]
    DetectionUnavailable,
    #[error(transparent)]
    Detection(#[from] DetectionError),
    #[error(transparent)]
    Challenge(#[from] ChallengeError),
    #[error(transparent)]
    Progress(#[from] StorageError),
}

/// Errors emitted by course selection.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CourseError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while configuring the detection loop.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DetectionError {
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

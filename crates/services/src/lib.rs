#![forbid(unsafe_code)]

pub mod course_service;
pub mod detection;
pub mod error;
pub mod inference;
pub mod quiz;

pub use lingo_core::Clock;

pub use course_service::{CameraConsent, CourseSelection, CourseSelectionService};
pub use detection::{DetectionEvent, DetectionHandle, DetectionSession};
pub use error::{CourseError, DetectionError, InferenceError, ModelLoadError, QuizError};
pub use inference::{
    Classifier, Frame, FrameSource, HttpModelSource, InferenceEngine, ModelConfig, ModelSource,
    ScriptedClassifier, StillFrameSource, TensorBackend, load_classifier,
};
pub use quiz::{
    CompletionSummary, DetectionOutcome, QuizCollaborators, QuizFeedback, QuizInit,
    QuizOrchestrator, RecordingFeedback,
};

mod feedback;
mod orchestrator;

pub use feedback::{FeedbackEvent, GENERIC_ERROR_MESSAGE, QuizFeedback, RecordingFeedback};
pub use orchestrator::{
    CompletionSummary, DetectionOutcome, QuizCollaborators, QuizInit, QuizOrchestrator,
};

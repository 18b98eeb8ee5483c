use std::sync::Mutex;

/// Message shown when a collaborator call fails.
pub const GENERIC_ERROR_MESSAGE: &str = "Something went wrong. Please try again.";

/// UI side effects the quiz triggers: sounds, modals, toasts, countdown.
///
/// All methods default to no-ops so front ends only implement what they show.
pub trait QuizFeedback: Send + Sync {
    fn play_correct(&self) {}

    fn play_incorrect(&self) {}

    fn open_hearts_modal(&self) {}

    fn open_practice_modal(&self) {}

    fn notify_error(&self, _message: &str) {}

    fn time_left(&self, _secs: u32) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedbackEvent {
    Correct,
    Incorrect,
    HeartsModal,
    PracticeModal,
    Error(String),
    TimeLeft(u32),
}

/// Keeps every feedback call in order; handy for replays and tests.
#[derive(Debug, Default)]
pub struct RecordingFeedback {
    events: Mutex<Vec<FeedbackEvent>>,
}

impl RecordingFeedback {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, event: FeedbackEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }

    #[must_use]
    pub fn events(&self) -> Vec<FeedbackEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Removes and returns everything recorded so far.
    pub fn drain(&self) -> Vec<FeedbackEvent> {
        self.events
            .lock()
            .map(|mut e| std::mem::take(&mut *e))
            .unwrap_or_default()
    }
}

impl QuizFeedback for RecordingFeedback {
    fn play_correct(&self) {
        self.push(FeedbackEvent::Correct);
    }

    fn play_incorrect(&self) {
        self.push(FeedbackEvent::Incorrect);
    }

    fn open_hearts_modal(&self) {
        self.push(FeedbackEvent::HeartsModal);
    }

    fn open_practice_modal(&self) {
        self.push(FeedbackEvent::PracticeModal);
    }

    fn notify_error(&self, message: &str) {
        self.push(FeedbackEvent::Error(message.to_owned()));
    }

    fn time_left(&self, secs: u32) {
        self.push(FeedbackEvent::TimeLeft(secs));
    }
}

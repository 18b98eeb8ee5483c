use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use lingo_core::Clock;
use lingo_core::model::{
    Challenge, ChallengeKind, ChallengeOptionId, ClassId, DetectionSettings, Hearts, LabelMap,
    LessonId, Percentage, QuizStatus, prepare_lesson,
};
use storage::repository::POINTS_PER_CHALLENGE;
use storage::{
    ChallengeProgressRepository, HeartsOutcome, HeartsRepository, ProgressOutcome, Storage,
};

use super::feedback::{GENERIC_ERROR_MESSAGE, QuizFeedback};
use crate::detection::{DetectionEvent, DetectionHandle, DetectionSession};
use crate::error::QuizError;
use crate::inference::{Classifier, FrameSource};

const DETECTION_STOPPED_MESSAGE: &str = "Sign detection stopped. Please try again.";

//
// ─── INPUTS / OUTPUTS ──────────────────────────────────────────────────────────
//

/// Lesson state loaded before the quiz starts.
#[derive(Debug, Clone)]
pub struct QuizInit {
    pub lesson_id: LessonId,
    pub challenges: Vec<Challenge>,
    pub hearts: Hearts,
    /// Progress through the lesson so far; 100 means the lesson is replayed as practice.
    pub percentage: f64,
}

/// Narrow collaborators the quiz commits answers through.
#[derive(Clone)]
pub struct QuizCollaborators {
    pub progress: Arc<dyn ChallengeProgressRepository>,
    pub hearts: Arc<dyn HeartsRepository>,
}

impl From<&Storage> for QuizCollaborators {
    fn from(storage: &Storage) -> Self {
        Self {
            progress: Arc::clone(&storage.challenge_progress),
            hearts: Arc::clone(&storage.hearts),
        }
    }
}

/// Shown once every challenge has been answered correctly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionSummary {
    pub points: u32,
    pub hearts: Hearts,
}

/// What one detection event did to the quiz.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionOutcome {
    TimeLeft(u32),
    /// A confirmed sign that did not match, or arrived after an answer.
    Ignored(ClassId),
    Accepted(ClassId),
    /// The answer could not be recorded because the user has no hearts left.
    HeartsRequired,
    TimedOut,
    Aborted,
    /// No detection session is running.
    Idle,
}

//
// ─── ORCHESTRATOR ──────────────────────────────────────────────────────────────
//

/// Drives one lesson attempt: answer checking, hearts, progress, and the
/// sign detection session for gesture challenges.
pub struct QuizOrchestrator {
    lesson_id: LessonId,
    challenges: Vec<Challenge>,
    active_index: usize,
    hearts: Hearts,
    percentage: Percentage,
    status: QuizStatus,
    selected_option: Option<ChallengeOptionId>,
    practice: bool,
    labels: LabelMap,
    collaborators: QuizCollaborators,
    feedback: Arc<dyn QuizFeedback>,
    classifier: Option<Arc<dyn Classifier>>,
    settings: DetectionSettings,
    clock: Clock,
    detection: Option<DetectionHandle>,
    time_left: Option<u32>,
}

impl QuizOrchestrator {
    /// Creates the quiz for a lesson, resuming at the first uncompleted challenge.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::Challenge` if the lesson is empty or a challenge is invalid.
    pub fn new(
        init: QuizInit,
        collaborators: QuizCollaborators,
        feedback: Arc<dyn QuizFeedback>,
    ) -> Result<Self, QuizError> {
        let challenges = prepare_lesson(init.challenges)?;
        let practice = Percentage::new(init.percentage).is_complete();
        let active_index = challenges
            .iter()
            .position(|c| !c.completed())
            .unwrap_or(0);
        let percentage = if practice {
            Percentage::default()
        } else {
            Percentage::new(init.percentage)
        };

        if practice {
            feedback.open_practice_modal();
        }
        info!(lesson_id = %init.lesson_id, active_index, practice, "quiz started");

        Ok(Self {
            lesson_id: init.lesson_id,
            challenges,
            active_index,
            hearts: init.hearts,
            percentage,
            status: QuizStatus::None,
            selected_option: None,
            practice,
            labels: LabelMap::default(),
            collaborators,
            feedback,
            classifier: None,
            settings: DetectionSettings::default(),
            clock: Clock::default_clock(),
            detection: None,
            time_left: None,
        })
    }

    /// Enables sign detection. `None` keeps gesture challenges unanswerable by camera,
    /// which is what happens when the model failed to load.
    #[must_use]
    pub fn with_classifier(mut self, classifier: Option<Arc<dyn Classifier>>) -> Self {
        self.classifier = classifier;
        self
    }

    #[must_use]
    pub fn with_detection_settings(mut self, settings: DetectionSettings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    // ─── Accessors ─────────────────────────────────────────────────────────────

    #[must_use]
    pub fn lesson_id(&self) -> LessonId {
        self.lesson_id
    }

    #[must_use]
    pub fn status(&self) -> QuizStatus {
        self.status
    }

    #[must_use]
    pub fn hearts(&self) -> Hearts {
        self.hearts
    }

    #[must_use]
    pub fn percentage(&self) -> f64 {
        self.percentage.value()
    }

    #[must_use]
    pub fn active_index(&self) -> usize {
        self.active_index
    }

    #[must_use]
    pub fn total_challenges(&self) -> usize {
        self.challenges.len()
    }

    #[must_use]
    pub fn selected_option(&self) -> Option<ChallengeOptionId> {
        self.selected_option
    }

    #[must_use]
    pub fn is_practice(&self) -> bool {
        self.practice
    }

    #[must_use]
    pub fn current_challenge(&self) -> Option<&Challenge> {
        self.challenges.get(self.active_index)
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.active_index >= self.challenges.len()
    }

    #[must_use]
    pub fn is_detecting(&self) -> bool {
        self.detection.is_some()
    }

    #[must_use]
    pub fn detection_available(&self) -> bool {
        self.classifier.is_some()
    }

    /// Seconds left in the running detection attempt, if any.
    #[must_use]
    pub fn time_left(&self) -> Option<u32> {
        self.time_left
    }

    /// Heading for the current challenge.
    #[must_use]
    pub fn prompt_title(&self) -> Option<&str> {
        let challenge = self.current_challenge()?;
        let title = match (challenge.kind(), challenge.requires_gesture()) {
            (ChallengeKind::Assist, true) => "Sign the following",
            (ChallengeKind::Assist, false) => "Select the correct meaning",
            _ => challenge.question(),
        };
        Some(title)
    }

    /// Final score once every challenge has been passed.
    #[must_use]
    pub fn completion(&self) -> Option<CompletionSummary> {
        if !self.is_complete() {
            return None;
        }
        let count = u32::try_from(self.challenges.len()).unwrap_or(u32::MAX);
        Some(CompletionSummary {
            points: count.saturating_mul(POINTS_PER_CHALLENGE),
            hearts: self.hearts,
        })
    }

    fn current(&self) -> Result<&Challenge, QuizError> {
        self.current_challenge().ok_or(QuizError::Completed)
    }

    // ─── Multiple choice ───────────────────────────────────────────────────────

    /// Select an option on the current challenge.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::AlreadyAnswered` unless the challenge is awaiting an
    /// answer, and `QuizError::UnknownOption` for an option of another challenge.
    pub fn select_option(&mut self, option_id: ChallengeOptionId) -> Result<(), QuizError> {
        if !self.status.is_awaiting_answer() {
            return Err(QuizError::AlreadyAnswered(self.status));
        }
        if !self.current()?.has_option(option_id) {
            return Err(QuizError::UnknownOption);
        }
        self.selected_option = Some(option_id);
        Ok(())
    }

    /// The footer button: check the answer, retry after a wrong answer, or move on.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::NoSelection` when nothing is selected on a multiple
    /// choice challenge, `QuizError::Completed` after the last challenge, or a
    /// collaborator failure.
    pub async fn on_continue(&mut self) -> Result<(), QuizError> {
        let challenge = self.current()?;
        let gesture = challenge.requires_gesture();
        if self.selected_option.is_none() && !gesture {
            return Err(QuizError::NoSelection);
        }

        match self.status {
            QuizStatus::Wrong => {
                self.reset_for_retry();
                Ok(())
            }
            QuizStatus::Correct => {
                self.advance();
                Ok(())
            }
            QuizStatus::None => {
                let Some(correct) = challenge.correct_option().map(|o| o.id) else {
                    return Ok(());
                };
                if self.selected_option == Some(correct) {
                    self.handle_correct().await?;
                } else {
                    self.handle_incorrect().await?;
                }
                Ok(())
            }
        }
    }

    fn reset_for_retry(&mut self) {
        self.stop_detection();
        self.status = QuizStatus::None;
        self.selected_option = None;
        debug!(index = self.active_index, "retrying challenge");
    }

    fn advance(&mut self) {
        self.reset_for_retry();
        self.active_index += 1;
        if self.is_complete() {
            info!(lesson_id = %self.lesson_id, hearts = %self.hearts, "lesson completed");
        } else {
            debug!(index = self.active_index, "next challenge");
        }
    }

    // ─── Sign detection ────────────────────────────────────────────────────────

    /// A sign was held long enough. Returns true if it answered the challenge.
    ///
    /// Confirmations that arrive after the challenge was answered are ignored.
    ///
    /// # Errors
    ///
    /// Returns a collaborator failure from committing progress.
    pub async fn on_class_verified(&mut self, class_id: ClassId) -> Result<bool, QuizError> {
        let outcome = self.apply_confirmation(class_id).await?;
        Ok(outcome == DetectionOutcome::Accepted(class_id))
    }

    /// The detection budget ran out. Returns true if the challenge was failed.
    ///
    /// Only a sign challenge still awaiting an answer can time out.
    ///
    /// # Errors
    ///
    /// Returns a collaborator failure from reducing hearts.
    pub async fn on_timer_elapsed(&mut self) -> Result<bool, QuizError> {
        let outcome = self.apply_timeout().await?;
        Ok(outcome == DetectionOutcome::TimedOut && self.status == QuizStatus::Wrong)
    }

    async fn apply_confirmation(&mut self, class_id: ClassId) -> Result<DetectionOutcome, QuizError> {
        if !self.status.is_awaiting_answer() {
            debug!(%class_id, status = %self.status, "late confirmation ignored");
            return Ok(DetectionOutcome::Ignored(class_id));
        }
        let Some(challenge) = self.current_challenge() else {
            return Ok(DetectionOutcome::Ignored(class_id));
        };
        if !challenge.requires_gesture() || !self.labels.matches(class_id, challenge.question()) {
            debug!(%class_id, expected = challenge.question(), "sign does not match");
            return Ok(DetectionOutcome::Ignored(class_id));
        }

        info!(%class_id, "correct sign detected");
        self.stop_detection();
        if self.handle_correct().await? {
            Ok(DetectionOutcome::Accepted(class_id))
        } else {
            Ok(DetectionOutcome::HeartsRequired)
        }
    }

    async fn apply_timeout(&mut self) -> Result<DetectionOutcome, QuizError> {
        let gesture = self
            .current_challenge()
            .is_some_and(Challenge::requires_gesture);
        if !gesture || !self.status.is_awaiting_answer() {
            debug!(status = %self.status, "stray timer expiry ignored");
            self.stop_detection();
            return Ok(DetectionOutcome::Idle);
        }
        info!("no sign confirmed before the timer ran out");
        self.stop_detection();
        if self.handle_incorrect().await? {
            Ok(DetectionOutcome::TimedOut)
        } else {
            Ok(DetectionOutcome::HeartsRequired)
        }
    }

    /// Opens the camera and starts classifying frames for the current challenge.
    ///
    /// Any previous session is torn down first.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::DetectionUnavailable` without a model,
    /// `QuizError::NotGestureChallenge` for multiple choice challenges, and
    /// `QuizError::AlreadyAnswered` once the challenge has an outcome.
    pub fn start_detection(&mut self, frames: Box<dyn FrameSource>) -> Result<(), QuizError> {
        let challenge = self.current()?;
        if !challenge.requires_gesture() {
            return Err(QuizError::NotGestureChallenge);
        }
        if !self.status.is_awaiting_answer() {
            return Err(QuizError::AlreadyAnswered(self.status));
        }
        let Some(classifier) = self.classifier.clone() else {
            warn!("sign detection requested without a loaded model");
            return Err(QuizError::DetectionUnavailable);
        };

        self.stop_detection();
        let handle =
            DetectionSession::spawn(classifier, frames, self.settings.clone(), self.clock)?;
        self.detection = Some(handle);
        self.time_left = Some(self.settings.budget_secs());
        Ok(())
    }

    /// Stops the running detection session, if any, and releases the camera.
    pub fn stop_detection(&mut self) {
        if let Some(mut handle) = self.detection.take() {
            handle.stop();
            debug!("detection session stopped");
        }
        self.time_left = None;
    }

    /// The start/stop detection button. Returns whether detection is now running.
    ///
    /// # Errors
    ///
    /// Same as [`QuizOrchestrator::start_detection`].
    pub fn toggle_detection(&mut self, frames: Box<dyn FrameSource>) -> Result<bool, QuizError> {
        if self.is_detecting() {
            self.stop_detection();
            return Ok(false);
        }
        self.start_detection(frames)?;
        Ok(true)
    }

    /// Waits for the next detection event and applies it.
    ///
    /// # Errors
    ///
    /// Returns a collaborator failure raised while answering.
    pub async fn pump_detection(&mut self) -> Result<DetectionOutcome, QuizError> {
        let Some(handle) = self.detection.as_mut() else {
            return Ok(DetectionOutcome::Idle);
        };
        let Some(event) = handle.next_event().await else {
            self.stop_detection();
            return Ok(DetectionOutcome::Idle);
        };

        match event {
            DetectionEvent::TimeLeft(secs) => {
                self.time_left = Some(secs);
                self.feedback.time_left(secs);
                Ok(DetectionOutcome::TimeLeft(secs))
            }
            DetectionEvent::Confirmed(class_id) => self.apply_confirmation(class_id).await,
            DetectionEvent::TimerElapsed => self.apply_timeout().await,
            DetectionEvent::Aborted {
                failures,
                last_error,
            } => {
                warn!(failures, error = %last_error, "sign detection aborted");
                self.stop_detection();
                self.feedback.notify_error(DETECTION_STOPPED_MESSAGE);
                Ok(DetectionOutcome::Aborted)
            }
        }
    }

    /// Pumps detection events until the attempt is decided or detection stops.
    ///
    /// # Errors
    ///
    /// Same as [`QuizOrchestrator::pump_detection`].
    pub async fn run_detection(&mut self) -> Result<DetectionOutcome, QuizError> {
        loop {
            match self.pump_detection().await? {
                DetectionOutcome::TimeLeft(_) | DetectionOutcome::Ignored(_) => {}
                outcome => return Ok(outcome),
            }
        }
    }

    // ─── Outcomes ──────────────────────────────────────────────────────────────

    /// Commits a correct answer. Returns false when the hearts modal was opened instead.
    async fn handle_correct(&mut self) -> Result<bool, QuizError> {
        if self.status == QuizStatus::Correct {
            return Ok(true);
        }
        let challenge_id = self.current()?.id();
        let outcome = match self
            .collaborators
            .progress
            .upsert_challenge_progress(challenge_id)
            .await
        {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(%challenge_id, error = %err, "failed to commit progress");
                self.feedback.notify_error(GENERIC_ERROR_MESSAGE);
                return Err(err.into());
            }
        };

        if outcome == ProgressOutcome::InsufficientHearts {
            self.feedback.open_hearts_modal();
            return Ok(false);
        }

        self.stop_detection();
        self.feedback.play_correct();
        self.status = QuizStatus::Correct;
        self.percentage = self.percentage.add_share(self.challenges.len());
        if self.practice {
            self.hearts = self.hearts.restore_one();
        }
        info!(%challenge_id, percentage = self.percentage.value(), "answer correct");
        Ok(true)
    }

    async fn handle_incorrect(&mut self) -> Result<bool, QuizError> {
        if self.status == QuizStatus::Wrong {
            return Ok(true);
        }
        let challenge_id = self.current()?.id();
        let outcome = match self.collaborators.hearts.reduce_hearts(challenge_id).await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(%challenge_id, error = %err, "failed to reduce hearts");
                self.feedback.notify_error(GENERIC_ERROR_MESSAGE);
                return Err(err.into());
            }
        };

        if outcome == HeartsOutcome::InsufficientHearts {
            self.feedback.open_hearts_modal();
            return Ok(false);
        }

        self.stop_detection();
        self.feedback.play_incorrect();
        self.status = QuizStatus::Wrong;
        if outcome == HeartsOutcome::Reduced {
            self.hearts = self.hearts.lose_one();
        }
        info!(%challenge_id, hearts = %self.hearts, "answer wrong");
        Ok(true)
    }
}

impl fmt::Debug for QuizOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizOrchestrator")
            .field("lesson_id", &self.lesson_id)
            .field("challenges_len", &self.challenges.len())
            .field("active_index", &self.active_index)
            .field("hearts", &self.hearts)
            .field("percentage", &self.percentage)
            .field("status", &self.status)
            .field("practice", &self.practice)
            .field("detecting", &self.detection.is_some())
            .finish_non_exhaustive()
    }
}

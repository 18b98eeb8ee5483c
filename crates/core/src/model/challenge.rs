use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{ChallengeId, ChallengeOptionId, LessonId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ChallengeError {
    #[error("challenge question cannot be empty")]
    EmptyQuestion,

    #[error("option {0} appears more than once")]
    DuplicateOption(ChallengeOptionId),

    #[error("lesson has no challenges")]
    EmptyLesson,
}

//
// ─── CHALLENGE ─────────────────────────────────────────────────────────────────
//

/// How a challenge is presented to the learner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChallengeKind {
    Select,
    Assist,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeOption {
    pub id: ChallengeOptionId,
    pub text: String,
    pub correct: bool,
    #[serde(default)]
    pub image_src: Option<String>,
    #[serde(default)]
    pub audio_src: Option<String>,
}

impl ChallengeOption {
    #[must_use]
    pub fn new(id: ChallengeOptionId, text: impl Into<String>, correct: bool) -> Self {
        Self {
            id,
            text: text.into(),
            correct,
            image_src: None,
            audio_src: None,
        }
    }
}

/// A single question inside a lesson.
///
/// A challenge without options is answered by signing the `question` text in
/// front of the camera instead of picking an option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Challenge {
    id: ChallengeId,
    lesson_id: LessonId,
    #[serde(rename = "type")]
    kind: ChallengeKind,
    question: String,
    #[serde(default)]
    order: u32,
    #[serde(default)]
    completed: bool,
    #[serde(default, rename = "challengeOptions")]
    options: Vec<ChallengeOption>,
}

impl Challenge {
    /// Creates a validated challenge.
    ///
    /// # Errors
    ///
    /// Returns `ChallengeError::EmptyQuestion` for a blank question and
    /// `ChallengeError::DuplicateOption` if two options share an id.
    pub fn new(
        id: ChallengeId,
        lesson_id: LessonId,
        kind: ChallengeKind,
        question: impl Into<String>,
        options: Vec<ChallengeOption>,
    ) -> Result<Self, ChallengeError> {
        let challenge = Self {
            id,
            lesson_id,
            kind,
            question: question.into(),
            order: 0,
            completed: false,
            options,
        };
        challenge.validate()?;
        Ok(challenge)
    }

    /// Checks invariants on a challenge that may have been deserialized.
    ///
    /// # Errors
    ///
    /// See [`Challenge::new`].
    pub fn validate(&self) -> Result<(), ChallengeError> {
        if self.question.trim().is_empty() {
            return Err(ChallengeError::EmptyQuestion);
        }
        for (i, option) in self.options.iter().enumerate() {
            if self.options[..i].iter().any(|o| o.id == option.id) {
                return Err(ChallengeError::DuplicateOption(option.id));
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn with_order(mut self, order: u32) -> Self {
        self.order = order;
        self
    }

    #[must_use]
    pub fn with_completed(mut self, completed: bool) -> Self {
        self.completed = completed;
        self
    }

    #[must_use]
    pub fn id(&self) -> ChallengeId {
        self.id
    }

    #[must_use]
    pub fn lesson_id(&self) -> LessonId {
        self.lesson_id
    }

    #[must_use]
    pub fn kind(&self) -> ChallengeKind {
        self.kind
    }

    #[must_use]
    pub fn question(&self) -> &str {
        &self.question
    }

    #[must_use]
    pub fn order(&self) -> u32 {
        self.order
    }

    #[must_use]
    pub fn completed(&self) -> bool {
        self.completed
    }

    #[must_use]
    pub fn options(&self) -> &[ChallengeOption] {
        &self.options
    }

    /// True when the challenge has no options and must be answered by signing.
    #[must_use]
    pub fn requires_gesture(&self) -> bool {
        self.options.is_empty()
    }

    #[must_use]
    pub fn correct_option(&self) -> Option<&ChallengeOption> {
        self.options.iter().find(|o| o.correct)
    }

    #[must_use]
    pub fn has_option(&self, id: ChallengeOptionId) -> bool {
        self.options.iter().any(|o| o.id == id)
    }
}

/// Validates a lesson's challenge list and sorts it by `order`.
///
/// # Errors
///
/// Returns `ChallengeError::EmptyLesson` for an empty list, or the first
/// per-challenge validation failure.
pub fn prepare_lesson(mut challenges: Vec<Challenge>) -> Result<Vec<Challenge>, ChallengeError> {
    if challenges.is_empty() {
        return Err(ChallengeError::EmptyLesson);
    }
    for challenge in &challenges {
        challenge.validate()?;
    }
    challenges.sort_by_key(Challenge::order);
    Ok(challenges)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn option(id: u64, correct: bool) -> ChallengeOption {
        ChallengeOption::new(ChallengeOptionId::new(id), format!("opt {id}"), correct)
    }

    #[test]
    fn gesture_challenge_has_no_options() {
        let sign = Challenge::new(
            ChallengeId::new(1),
            LessonId::new(1),
            ChallengeKind::Assist,
            "Hello",
            Vec::new(),
        )
        .unwrap();
        assert!(sign.requires_gesture());
        assert!(sign.correct_option().is_none());

        let select = Challenge::new(
            ChallengeId::new(2),
            LessonId::new(1),
            ChallengeKind::Select,
            "Which one is \"Yes\"?",
            vec![option(1, false), option(2, true)],
        )
        .unwrap();
        assert!(!select.requires_gesture());
        assert_eq!(select.correct_option().unwrap().id, ChallengeOptionId::new(2));
    }

    #[test]
    fn rejects_blank_question_and_duplicate_options() {
        let err = Challenge::new(
            ChallengeId::new(1),
            LessonId::new(1),
            ChallengeKind::Select,
            "  ",
            Vec::new(),
        )
        .unwrap_err();
        assert_eq!(err, ChallengeError::EmptyQuestion);

        let err = Challenge::new(
            ChallengeId::new(1),
            LessonId::new(1),
            ChallengeKind::Select,
            "Q",
            vec![option(7, true), option(7, false)],
        )
        .unwrap_err();
        assert_eq!(err, ChallengeError::DuplicateOption(ChallengeOptionId::new(7)));
    }

    #[test]
    fn deserializes_lesson_json() {
        let json = r#"[
            {"id": 2, "lessonId": 1, "type": "ASSIST", "question": "Yes", "order": 2},
            {"id": 1, "lessonId": 1, "type": "SELECT", "question": "Pick", "order": 1,
             "completed": true,
             "challengeOptions": [{"id": 10, "text": "a", "correct": true}]}
        ]"#;
        let challenges: Vec<Challenge> = serde_json::from_str(json).unwrap();
        let lesson = prepare_lesson(challenges).unwrap();
        assert_eq!(lesson[0].id(), ChallengeId::new(1));
        assert!(lesson[0].completed());
        assert_eq!(lesson[1].kind(), ChallengeKind::Assist);
        assert!(lesson[1].requires_gesture());
    }

    #[test]
    fn empty_lesson_is_rejected() {
        assert_eq!(prepare_lesson(Vec::new()).unwrap_err(), ChallengeError::EmptyLesson);
    }
}

use async_trait::async_trait;
use lingo_core::model::{Challenge, ChallengeId, Course, CourseId, Hearts};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::debug;

/// Points awarded for every committed challenge, including practice runs.
pub const POINTS_PER_CHALLENGE: u32 = 10;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("user progress not found")]
    MissingUserProgress,

    #[error("connection error: {0}")]
    Connection(String),
}

/// Reply to a challenge-progress commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressOutcome {
    /// First completion of the challenge.
    Committed,
    /// The challenge was already completed; a heart was restored.
    Practice,
    /// No hearts left outside practice; nothing was recorded.
    InsufficientHearts,
}

/// Reply to a hearts decrement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartsOutcome {
    Reduced,
    /// Practice challenges never cost hearts.
    Practice,
    InsufficientHearts,
}

impl ProgressOutcome {
    #[must_use]
    pub fn is_insufficient_hearts(self) -> bool {
        matches!(self, Self::InsufficientHearts)
    }
}

impl HeartsOutcome {
    #[must_use]
    pub fn is_insufficient_hearts(self) -> bool {
        matches!(self, Self::InsufficientHearts)
    }
}

/// Per-user progress shared by every lesson.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProgress {
    pub active_course: CourseId,
    pub hearts: Hearts,
    pub points: u32,
}

/// Records that the current user answered a challenge correctly.
#[async_trait]
pub trait ChallengeProgressRepository: Send + Sync {
    /// Commit progress for a correctly answered challenge.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` for an unknown challenge and
    /// `StorageError::MissingUserProgress` if no course has been selected.
    async fn upsert_challenge_progress(
        &self,
        challenge_id: ChallengeId,
    ) -> Result<ProgressOutcome, StorageError>;
}

/// Charges the current user a heart for a wrong answer.
#[async_trait]
pub trait HeartsRepository: Send + Sync {
    /// Remove one heart after a wrong answer.
    ///
    /// # Errors
    ///
    /// Same as [`ChallengeProgressRepository::upsert_challenge_progress`].
    async fn reduce_hearts(&self, challenge_id: ChallengeId) -> Result<HeartsOutcome, StorageError>;
}

#[async_trait]
pub trait UserProgressRepository: Send + Sync {
    /// Make `course_id` the active course, creating progress on first use.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the course does not exist.
    async fn upsert_user_progress(&self, course_id: CourseId) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn get_user_progress(&self) -> Result<Option<UserProgress>, StorageError>;
}

#[derive(Default)]
struct ProgressState {
    courses: HashMap<CourseId, Course>,
    challenges: HashSet<ChallengeId>,
    completed: HashSet<ChallengeId>,
    user: Option<UserProgress>,
}

/// In-memory progress backend applying the hearts and practice rules.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<Mutex<ProgressState>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<T>(
        &self,
        f: impl FnOnce(&mut ProgressState) -> Result<T, StorageError>,
    ) -> Result<T, StorageError> {
        let mut guard = self
            .state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        f(&mut guard)
    }

    /// Register a course that can later be selected.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the state lock is poisoned.
    pub fn insert_course(&self, course: Course) -> Result<(), StorageError> {
        self.with_state(|state| {
            state.courses.insert(course.id, course);
            Ok(())
        })
    }

    /// Register a lesson's challenges, keeping their completion flags.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the state lock is poisoned.
    pub fn insert_challenges(&self, challenges: &[Challenge]) -> Result<(), StorageError> {
        self.with_state(|state| {
            for challenge in challenges {
                state.challenges.insert(challenge.id());
                if challenge.completed() {
                    state.completed.insert(challenge.id());
                }
            }
            Ok(())
        })
    }

    /// Overwrite the stored heart count.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::MissingUserProgress` if no course was selected yet.
    pub fn set_hearts(&self, hearts: Hearts) -> Result<(), StorageError> {
        self.with_state(|state| {
            let user = state.user.as_mut().ok_or(StorageError::MissingUserProgress)?;
            user.hearts = hearts;
            Ok(())
        })
    }

    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the state lock is poisoned.
    pub fn is_completed(&self, challenge_id: ChallengeId) -> Result<bool, StorageError> {
        self.with_state(|state| Ok(state.completed.contains(&challenge_id)))
    }
}

#[async_trait]
impl ChallengeProgressRepository for InMemoryRepository {
    async fn upsert_challenge_progress(
        &self,
        challenge_id: ChallengeId,
    ) -> Result<ProgressOutcome, StorageError> {
        self.with_state(|state| {
            if !state.challenges.contains(&challenge_id) {
                return Err(StorageError::NotFound);
            }
            let practice = state.completed.contains(&challenge_id);
            let user = state.user.as_mut().ok_or(StorageError::MissingUserProgress)?;

            if user.hearts.is_empty() && !practice {
                return Ok(ProgressOutcome::InsufficientHearts);
            }

            user.points = user.points.saturating_add(POINTS_PER_CHALLENGE);
            if practice {
                user.hearts = user.hearts.restore_one();
                debug!(%challenge_id, hearts = %user.hearts, "practice progress recorded");
                return Ok(ProgressOutcome::Practice);
            }

            state.completed.insert(challenge_id);
            debug!(%challenge_id, "challenge completed");
            Ok(ProgressOutcome::Committed)
        })
    }
}

#[async_trait]
impl HeartsRepository for InMemoryRepository {
    async fn reduce_hearts(&self, challenge_id: ChallengeId) -> Result<HeartsOutcome, StorageError> {
        self.with_state(|state| {
            if !state.challenges.contains(&challenge_id) {
                return Err(StorageError::NotFound);
            }
            if state.completed.contains(&challenge_id) {
                return Ok(HeartsOutcome::Practice);
            }
            let user = state.user.as_mut().ok_or(StorageError::MissingUserProgress)?;
            if user.hearts.is_empty() {
                return Ok(HeartsOutcome::InsufficientHearts);
            }
            user.hearts = user.hearts.lose_one();
            debug!(%challenge_id, hearts = %user.hearts, "heart removed");
            Ok(HeartsOutcome::Reduced)
        })
    }
}

#[async_trait]
impl UserProgressRepository for InMemoryRepository {
    async fn upsert_user_progress(&self, course_id: CourseId) -> Result<(), StorageError> {
        self.with_state(|state| {
            if !state.courses.contains_key(&course_id) {
                return Err(StorageError::NotFound);
            }
            match state.user.as_mut() {
                Some(user) => user.active_course = course_id,
                None => {
                    state.user = Some(UserProgress {
                        active_course: course_id,
                        hearts: Hearts::full(),
                        points: 0,
                    });
                }
            }
            Ok(())
        })
    }

    async fn get_user_progress(&self) -> Result<Option<UserProgress>, StorageError> {
        self.with_state(|state| Ok(state.user.clone()))
    }
}

/// Aggregates the progress collaborators behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub challenge_progress: Arc<dyn ChallengeProgressRepository>,
    pub hearts: Arc<dyn HeartsRepository>,
    pub user_progress: Arc<dyn UserProgressRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_repository(InMemoryRepository::new())
    }

    #[must_use]
    pub fn from_repository(repo: InMemoryRepository) -> Self {
        Self {
            challenge_progress: Arc::new(repo.clone()),
            hearts: Arc::new(repo.clone()),
            user_progress: Arc::new(repo),
        }
    }
}

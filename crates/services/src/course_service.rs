use std::sync::Arc;

use tracing::{info, warn};

use lingo_core::model::{Course, CourseId};
use storage::UserProgressRepository;

use crate::error::CourseError;
use crate::quiz::QuizFeedback;

/// Toast shown when switching courses fails.
pub const COURSE_ERROR_MESSAGE: &str = "Something went wrong.";

/// A course that needs camera access before it can be activated.
///
/// Only produced by [`CourseSelectionService::select`]; hand it back to
/// [`CourseSelectionService::confirm_camera`] once the user agreed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraConsent {
    course_id: CourseId,
    title: String,
}

impl CameraConsent {
    #[must_use]
    pub fn course_id(&self) -> CourseId {
        self.course_id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }
}

/// What the course list should do after a click.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CourseSelection {
    /// Go to the learn page for this course.
    Navigate(CourseId),
    /// Ask for camera permission first.
    CameraConsentRequired(CameraConsent),
}

/// Switches the user's active course.
#[derive(Clone)]
pub struct CourseSelectionService {
    user_progress: Arc<dyn UserProgressRepository>,
    feedback: Arc<dyn QuizFeedback>,
}

impl CourseSelectionService {
    #[must_use]
    pub fn new(
        user_progress: Arc<dyn UserProgressRepository>,
        feedback: Arc<dyn QuizFeedback>,
    ) -> Self {
        Self {
            user_progress,
            feedback,
        }
    }

    /// Handle a click on `course_id` in the course list.
    ///
    /// Ids missing from `courses` are passed straight to storage, which owns
    /// course validation.
    ///
    /// # Errors
    ///
    /// Returns `CourseError::Storage` if the progress update fails.
    pub async fn select(
        &self,
        courses: &[Course],
        active: Option<CourseId>,
        course_id: CourseId,
    ) -> Result<CourseSelection, CourseError> {
        if active == Some(course_id) {
            return Ok(CourseSelection::Navigate(course_id));
        }
        let course = courses.iter().find(|c| c.id == course_id);
        if let Some(course) = course.filter(|c| c.requires_camera()) {
            info!(%course_id, "camera consent required");
            return Ok(CourseSelection::CameraConsentRequired(CameraConsent {
                course_id,
                title: course.title.clone(),
            }));
        }
        self.activate(course_id).await
    }

    /// The user accepted camera access for a pending course.
    ///
    /// # Errors
    ///
    /// Returns `CourseError::Storage` if the progress update fails.
    pub async fn confirm_camera(
        &self,
        consent: CameraConsent,
    ) -> Result<CourseSelection, CourseError> {
        self.activate(consent.course_id).await
    }

    async fn activate(&self, course_id: CourseId) -> Result<CourseSelection, CourseError> {
        if let Err(err) = self.user_progress.upsert_user_progress(course_id).await {
            warn!(%course_id, error = %err, "failed to switch course");
            self.feedback.notify_error(COURSE_ERROR_MESSAGE);
            return Err(err.into());
        }
        info!(%course_id, "active course changed");
        Ok(CourseSelection::Navigate(course_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::{FeedbackEvent, RecordingFeedback};
    use storage::InMemoryRepository;

    fn courses() -> Vec<Course> {
        vec![
            Course::new(CourseId::new(1), "Spanish"),
            Course::new(CourseId::new(2), "ASL"),
        ]
    }

    fn service(repo: &InMemoryRepository) -> (CourseSelectionService, Arc<RecordingFeedback>) {
        let feedback = Arc::new(RecordingFeedback::new());
        let svc = CourseSelectionService::new(Arc::new(repo.clone()), feedback.clone());
        (svc, feedback)
    }

    #[tokio::test]
    async fn active_course_navigates_without_writing() {
        let repo = InMemoryRepository::new();
        let (svc, _) = service(&repo);
        let selection = svc
            .select(&courses(), Some(CourseId::new(1)), CourseId::new(1))
            .await
            .unwrap();
        assert_eq!(selection, CourseSelection::Navigate(CourseId::new(1)));
        assert_eq!(repo.get_user_progress().await.unwrap(), None);
    }

    #[tokio::test]
    async fn sign_course_waits_for_camera_consent() {
        let repo = InMemoryRepository::new();
        for course in courses() {
            repo.insert_course(course).unwrap();
        }
        let (svc, _) = service(&repo);

        let selection = svc
            .select(&courses(), Some(CourseId::new(1)), CourseId::new(2))
            .await
            .unwrap();
        let CourseSelection::CameraConsentRequired(consent) = selection.clone() else {
            panic!("expected consent prompt, got {selection:?}");
        };
        assert_eq!(consent.title(), "ASL");
        assert_eq!(repo.get_user_progress().await.unwrap(), None);

        let selection = svc.confirm_camera(consent).await.unwrap();
        assert_eq!(selection, CourseSelection::Navigate(CourseId::new(2)));
        let progress = repo.get_user_progress().await.unwrap().unwrap();
        assert_eq!(progress.active_course, CourseId::new(2));
    }

    #[tokio::test]
    async fn unlisted_course_is_left_to_storage() {
        let repo = InMemoryRepository::new();
        repo.insert_course(Course::new(CourseId::new(3), "French"))
            .unwrap();
        let (svc, feedback) = service(&repo);

        let selection = svc
            .select(&courses(), None, CourseId::new(3))
            .await
            .unwrap();
        assert_eq!(selection, CourseSelection::Navigate(CourseId::new(3)));
        assert!(feedback.events().is_empty());

        let err = svc
            .select(&courses(), None, CourseId::new(9))
            .await
            .unwrap_err();
        assert!(matches!(err, CourseError::Storage(_)));
        assert_eq!(
            feedback.events(),
            vec![FeedbackEvent::Error(COURSE_ERROR_MESSAGE.into())]
        );
    }

    #[tokio::test]
    async fn storage_failure_shows_toast() {
        let repo = InMemoryRepository::new();
        let (svc, feedback) = service(&repo);

        let err = svc
            .select(&courses(), None, CourseId::new(1))
            .await
            .unwrap_err();
        assert!(matches!(err, CourseError::Storage(_)));
        assert_eq!(
            feedback.events(),
            vec![FeedbackEvent::Error(COURSE_ERROR_MESSAGE.into())]
        );
    }
}

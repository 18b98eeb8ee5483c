use serde::{Deserialize, Serialize};

use crate::model::ids::CourseId;

/// Title of the course whose lessons are answered by signing on camera.
pub const SIGN_LANGUAGE_COURSE_TITLE: &str = "ASL";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: CourseId,
    pub title: String,
    #[serde(default)]
    pub image_src: Option<String>,
}

impl Course {
    #[must_use]
    pub fn new(id: CourseId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            image_src: None,
        }
    }

    /// Sign-language courses need a webcam, so selecting one asks for consent first.
    #[must_use]
    pub fn requires_camera(&self) -> bool {
        self.title == SIGN_LANGUAGE_COURSE_TITLE
    }
}

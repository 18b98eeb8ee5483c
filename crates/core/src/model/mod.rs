mod challenge;
mod course;
mod ids;
mod labels;
mod prediction;
mod quiz;
mod settings;

pub use challenge::{Challenge, ChallengeError, ChallengeKind, ChallengeOption, prepare_lesson};
pub use course::{Course, SIGN_LANGUAGE_COURSE_TITLE};
pub use ids::{ChallengeId, ChallengeOptionId, ClassId, CourseId, LessonId, ParseIdError};
pub use labels::LabelMap;
pub use prediction::{ModelOutput, OutputShapeError, Prediction, best_prediction};
pub use quiz::{Hearts, Percentage, QuizStatus};
pub use settings::{DetectionSettings, SettingsError};

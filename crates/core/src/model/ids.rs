use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            #[must_use]
            pub const fn new(id: u64) -> Self {
                Self(id)
            }

            /// Returns the underlying u64 value
            #[must_use]
            pub fn value(&self) -> u64 {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim()
                    .parse::<u64>()
                    .map(Self)
                    .map_err(|_| ParseIdError {
                        kind: stringify!($name),
                        raw: s.to_owned(),
                    })
            }
        }
    };
}

numeric_id!(
    /// Unique identifier for a course (e.g. "ASL", "Spanish").
    CourseId
);
numeric_id!(
    /// Unique identifier for a lesson within a course.
    LessonId
);
numeric_id!(
    /// Unique identifier for a challenge within a lesson.
    ChallengeId
);
numeric_id!(
    /// Unique identifier for a multiple-choice option.
    ChallengeOptionId
);

/// Error returned when parsing an identifier from text fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    kind: &'static str,
    raw: String,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: {:?}", self.kind, self.raw)
    }
}

impl std::error::Error for ParseIdError {}

// ─── Class Ids ─────────────────────────────────────────────────────────────────

/// Class identifier emitted by the sign detection model.
///
/// The model reports classes as floating point values; only finite,
/// non-negative, integral values map to a `ClassId`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassId(u32);

impl ClassId {
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Converts a raw model class value, rejecting NaN and non-integral values.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn from_raw(raw: f32) -> Option<Self> {
        if !raw.is_finite() || raw < 0.0 || raw.fract() != 0.0 || raw >= u32::MAX as f32 {
            return None;
        }
        Some(Self(raw as u32))
    }

    #[must_use]
    pub fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Debug for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClassId({})", self.0)
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

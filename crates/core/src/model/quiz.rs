use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome state of the challenge currently on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuizStatus {
    /// Waiting for an answer.
    #[default]
    None,
    Correct,
    Wrong,
}

impl QuizStatus {
    #[must_use]
    pub fn is_awaiting_answer(self) -> bool {
        matches!(self, Self::None)
    }
}

impl fmt::Display for QuizStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::None => "none",
            Self::Correct => "correct",
            Self::Wrong => "wrong",
        };
        f.write_str(s)
    }
}

/// Consumable lives gating further quiz attempts, always within `0..=MAX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub struct Hearts(u8);

impl Hearts {
    pub const MAX: u8 = 5;

    /// Creates a heart count, clamping anything above `MAX`.
    #[must_use]
    pub fn new(count: u8) -> Self {
        Self(count.min(Self::MAX))
    }

    #[must_use]
    pub fn full() -> Self {
        Self(Self::MAX)
    }

    #[must_use]
    pub fn count(self) -> u8 {
        self.0
    }

    #[must_use]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub fn restore_one(self) -> Self {
        Self::new(self.0.saturating_add(1))
    }

    #[must_use]
    pub fn lose_one(self) -> Self {
        Self(self.0.saturating_sub(1))
    }
}

impl Default for Hearts {
    fn default() -> Self {
        Self::full()
    }
}

impl From<u8> for Hearts {
    fn from(value: u8) -> Self {
        Self::new(value)
    }
}

impl From<Hearts> for u8 {
    fn from(value: Hearts) -> Self {
        value.0
    }
}

impl fmt::Display for Hearts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lesson progress shown in the header, kept within `0.0..=100.0`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Percentage(f64);

impl Percentage {
    pub const COMPLETE: f64 = 100.0;

    #[must_use]
    pub fn new(value: f64) -> Self {
        if value.is_nan() {
            return Self(0.0);
        }
        Self(value.clamp(0.0, Self::COMPLETE))
    }

    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }

    #[must_use]
    pub fn is_complete(self) -> bool {
        self.0 >= Self::COMPLETE
    }

    /// Adds one challenge's share of the lesson (`100 / total`).
    #[must_use]
    pub fn add_share(self, total: usize) -> Self {
        if total == 0 {
            return self;
        }
        #[allow(clippy::cast_precision_loss)]
        let share = Self::COMPLETE / total as f64;
        Self::new(self.0 + share)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hearts_stay_in_range() {
        assert_eq!(Hearts::new(9).count(), 5);
        assert_eq!(Hearts::full().restore_one().count(), 5);
        assert_eq!(Hearts::new(0).lose_one().count(), 0);
        assert_eq!(Hearts::new(3).lose_one().restore_one().count(), 3);
        assert!(Hearts::new(0).is_empty());
    }

    #[test]
    fn percentage_shares_sum_to_complete() {
        for total in 1..=13 {
            let mut pct = Percentage::default();
            for _ in 0..total {
                pct = pct.add_share(total);
            }
            assert!((pct.value() - 100.0).abs() < 1e-9, "total={total}");
        }
        assert_eq!(Percentage::new(f64::NAN).value(), 0.0);
        assert_eq!(Percentage::new(140.0).value(), 100.0);
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&QuizStatus::Wrong).unwrap();
        assert_eq!(json, "\"wrong\"");
        assert!(QuizStatus::default().is_awaiting_answer());
    }
}

use chrono::{DateTime, Duration, Utc};

/// Source of "now" for the detection loop and quiz services.
///
/// `Fixed` keeps stabilizer and timer behaviour reproducible in tests.
#[derive(Debug, Clone, Copy, Default)]
pub enum Clock {
    #[default]
    Default,
    Fixed(DateTime<Utc>),
}

impl Clock {
    #[must_use]
    pub fn default_clock() -> Self {
        Self::Default
    }

    #[must_use]
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self::Fixed(at)
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::Default => Utc::now(),
            Clock::Fixed(t) => *t,
        }
    }

    /// Moves a fixed clock forward. No effect on `Clock::Default`.
    pub fn advance(&mut self, delta: Duration) {
        if let Clock::Fixed(t) = self {
            *t += delta;
        }
    }

    /// Like [`Clock::advance`], in milliseconds.
    pub fn advance_ms(&mut self, ms: i64) {
        self.advance(Duration::milliseconds(ms));
    }
}

/// Elapsed wall-clock time between two instants, zero if `later` is earlier.
#[must_use]
pub fn elapsed(earlier: DateTime<Utc>, later: DateTime<Utc>) -> std::time::Duration {
    (later - earlier).to_std().unwrap_or_default()
}

/// Deterministic timestamp for tests (2023-11-14T22:13:20Z).
pub const FIXED_TEST_TIMESTAMP: i64 = 1_700_000_000;

/// Returns a deterministic `DateTime<Utc>` for tests and doc examples.
///
/// # Panics
///
/// Panics if the fixed timestamp cannot be represented.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(FIXED_TEST_TIMESTAMP, 0)
        .expect("fixed timestamp should be valid")
}

#[must_use]
pub fn fixed_clock() -> Clock {
    Clock::fixed(fixed_now())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_advances() {
        let mut clock = fixed_clock();
        clock.advance_ms(1_500);
        assert_eq!(elapsed(fixed_now(), clock.now()).as_millis(), 1_500);
    }

    #[test]
    fn elapsed_saturates_at_zero() {
        let later = fixed_now() + Duration::seconds(3);
        assert_eq!(elapsed(later, fixed_now()), std::time::Duration::ZERO);
    }
}

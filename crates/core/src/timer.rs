use chrono::{DateTime, Utc};
use std::time::Duration;

use crate::time::elapsed;

/// Result of one timer tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerTick {
    /// Whole seconds left, rounded up for display.
    pub remaining_secs: u32,
    /// True only on the tick where the budget ran out.
    pub expired: bool,
}

/// Wall-clock budget for one detection attempt.
///
/// Starts on the first tick and is unaffected by detections; only
/// [`SessionTimer::reset`] stops it.
#[derive(Debug, Clone)]
pub struct SessionTimer {
    budget: Duration,
    started_at: Option<DateTime<Utc>>,
    expired_reported: bool,
}

impl SessionTimer {
    #[must_use]
    pub fn new(budget_secs: u32) -> Self {
        Self {
            budget: Duration::from_secs(u64::from(budget_secs)),
            started_at: None,
            expired_reported: false,
        }
    }

    #[must_use]
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expired_reported
    }

    pub fn tick(&mut self, now: DateTime<Utc>) -> TimerTick {
        let started = *self.started_at.get_or_insert(now);
        let remaining = self.budget.saturating_sub(elapsed(started, now));

        let expired = remaining.is_zero() && !self.expired_reported;
        if expired {
            self.expired_reported = true;
        }

        TimerTick {
            remaining_secs: ceil_secs(remaining),
            expired,
        }
    }

    pub fn reset(&mut self) {
        self.started_at = None;
        self.expired_reported = false;
    }
}

fn ceil_secs(d: Duration) -> u32 {
    let whole = d.as_secs() + u64::from(d.subsec_nanos() > 0);
    u32::try_from(whole).unwrap_or(u32::MAX)
}

//! Dwell-time debouncing of per-frame classifications.

use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::trace;

use crate::model::{ClassId, Prediction, best_prediction};
use crate::time::elapsed;

/// Minimum time a class must stay on top before it is trusted.
pub const DEFAULT_DWELL: Duration = Duration::from_millis(1_500);

/// Turns noisy per-tick predictions into confirmed detections.
///
/// A class is confirmed once it has been the leading valid prediction on every
/// update for at least the dwell time. Confirmation repeats on each following
/// update until the leader changes or [`DetectionStabilizer::reset`] is called.
#[derive(Debug, Clone)]
pub struct DetectionStabilizer {
    dwell: Duration,
    last_class: Option<ClassId>,
    detection_started_at: Option<DateTime<Utc>>,
}

impl Default for DetectionStabilizer {
    fn default() -> Self {
        Self::new(DEFAULT_DWELL)
    }
}

impl DetectionStabilizer {
    #[must_use]
    pub fn new(dwell: Duration) -> Self {
        Self {
            dwell,
            last_class: None,
            detection_started_at: None,
        }
    }

    #[must_use]
    pub fn dwell(&self) -> Duration {
        self.dwell
    }

    #[must_use]
    pub fn last_class(&self) -> Option<ClassId> {
        self.last_class
    }

    /// Feeds one tick of predictions and returns the class if it is confirmed.
    pub fn update(&mut self, predictions: &[Prediction], now: DateTime<Utc>) -> Option<ClassId> {
        let Some((leader, score)) = best_prediction(predictions) else {
            if self.last_class.take().is_some() {
                trace!("no valid prediction, clearing leader");
            }
            return None;
        };

        match (self.last_class, self.detection_started_at) {
            (Some(last), Some(started)) if last == leader => {
                (elapsed(started, now) >= self.dwell).then_some(leader)
            }
            _ => {
                trace!(class = %leader, score, "new leading class");
                self.last_class = Some(leader);
                self.detection_started_at = Some(now);
                None
            }
        }
    }

    pub fn reset(&mut self) {
        self.last_class = None;
        self.detection_started_at = None;
    }
}

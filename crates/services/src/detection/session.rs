use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use lingo_core::model::{ClassId, DetectionSettings};
use lingo_core::{Clock, DetectionStabilizer, SessionTimer};

use crate::error::{DetectionError, InferenceError};
use crate::inference::{Classifier, FrameSource};

const EVENT_BUFFER: usize = 16;

/// Something the detection loop wants the quiz to know about.
#[derive(Debug)]
pub enum DetectionEvent {
    /// Countdown update for display, once per tick.
    TimeLeft(u32),
    /// A class stayed on top for the full dwell time. Repeats every tick.
    Confirmed(ClassId),
    /// The attempt budget ran out. The loop has stopped.
    TimerElapsed,
    /// Too many consecutive inference failures. The loop has stopped.
    Aborted {
        failures: u32,
        last_error: InferenceError,
    },
}

impl DetectionEvent {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::TimerElapsed | Self::Aborted { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

/// Owner's side of a running detection loop.
///
/// Dropping the handle stops the loop and releases the camera.
#[derive(Debug)]
pub struct DetectionHandle {
    events: mpsc::Receiver<DetectionEvent>,
    stop: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl DetectionHandle {
    /// Waits for the next event; `None` once the loop has finished.
    pub async fn next_event(&mut self) -> Option<DetectionEvent> {
        self.events.recv().await
    }

    /// Asks the loop to stop. Any in-flight inference is dropped.
    pub fn stop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
    }

    /// Stops the loop and waits until the camera has been released.
    pub async fn shutdown(mut self) {
        self.stop();
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                warn!(error = %err, "detection task ended abnormally");
            }
        }
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(JoinHandle::is_finished)
    }
}

impl Drop for DetectionHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// State owned by one detection attempt on one challenge.
pub struct DetectionSession {
    classifier: Arc<dyn Classifier>,
    frames: Box<dyn FrameSource>,
    stabilizer: DetectionStabilizer,
    timer: SessionTimer,
    settings: DetectionSettings,
    clock: Clock,
    failures: u32,
}

impl DetectionSession {
    /// Starts a detection loop on the current tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `DetectionError::Settings` if the settings are invalid.
    pub fn spawn(
        classifier: Arc<dyn Classifier>,
        frames: Box<dyn FrameSource>,
        settings: DetectionSettings,
        clock: Clock,
    ) -> Result<DetectionHandle, DetectionError> {
        settings.validate()?;
        let session = Self {
            classifier,
            frames,
            stabilizer: DetectionStabilizer::new(settings.dwell()),
            timer: SessionTimer::new(settings.budget_secs()),
            settings,
            clock,
            failures: 0,
        };

        let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
        let (stop_tx, stop_rx) = oneshot::channel();
        let task = tokio::spawn(session.run(stop_rx, events_tx));

        Ok(DetectionHandle {
            events: events_rx,
            stop: Some(stop_tx),
            task: Some(task),
        })
    }

    async fn run(mut self, mut stop: oneshot::Receiver<()>, events: mpsc::Sender<DetectionEvent>) {
        let mut interval = tokio::time::interval(self.settings.tick_period());
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let anchor = (self.clock.now(), Instant::now());
        info!(budget_secs = self.settings.budget_secs(), "sign detection started");

        loop {
            tokio::select! {
                biased;
                _ = &mut stop => break,
                _ = interval.tick() => {}
            }

            let now = anchored_now(anchor);
            let flow = tokio::select! {
                biased;
                _ = &mut stop => Flow::Stop,
                flow = self.step(now, &events) => flow,
            };
            if flow == Flow::Stop {
                break;
            }
        }

        self.frames.stop();
        self.stabilizer.reset();
        self.timer.reset();
        info!("sign detection stopped");
    }

    async fn step(&mut self, now: DateTime<Utc>, events: &mpsc::Sender<DetectionEvent>) -> Flow {
        if let Some(frame) = self.frames.latest_frame() {
            match self.classifier.classify(&frame).await {
                Ok(predictions) => {
                    self.failures = 0;
                    if let Some(class_id) = self.stabilizer.update(&predictions, now) {
                        debug!(%class_id, "detection confirmed");
                        if events.send(DetectionEvent::Confirmed(class_id)).await.is_err() {
                            return Flow::Stop;
                        }
                    }
                }
                Err(err) => {
                    self.failures += 1;
                    warn!(error = %err, failures = self.failures, "inference tick failed");
                    if self.failures >= self.settings.max_inference_failures() {
                        let _ = events
                            .send(DetectionEvent::Aborted {
                                failures: self.failures,
                                last_error: err,
                            })
                            .await;
                        return Flow::Stop;
                    }
                }
            }
        } else {
            debug!("camera not ready, skipping tick");
        }

        let tick = self.timer.tick(now);
        // Countdown updates are advisory; drop them if the owner is behind.
        if let Err(mpsc::error::TrySendError::Closed(_)) =
            events.try_send(DetectionEvent::TimeLeft(tick.remaining_secs))
        {
            return Flow::Stop;
        }
        if tick.expired {
            info!("detection budget elapsed");
            let _ = events.send(DetectionEvent::TimerElapsed).await;
            return Flow::Stop;
        }
        Flow::Continue
    }
}

fn anchored_now(anchor: (DateTime<Utc>, Instant)) -> DateTime<Utc> {
    let elapsed = chrono::Duration::from_std(anchor.1.elapsed()).unwrap_or_default();
    anchor.0 + elapsed
}

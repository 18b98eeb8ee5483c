use std::sync::Arc;
use std::time::Duration;

use lingo_core::model::{ClassId, DetectionSettings};
use lingo_core::time::{fixed_clock, fixed_now};
use services::inference::{
    Frame, ScriptStep, ScriptedClassifier, ScriptedPrediction, StillFrameSource, frame_channel,
};
use services::{DetectionEvent, DetectionSession};

fn hello() -> Arc<ScriptedClassifier> {
    Arc::new(ScriptedClassifier::constant(ClassId::new(1), 0.92))
}

fn still() -> Box<StillFrameSource> {
    Box::new(StillFrameSource::blank(8, 8, fixed_now()))
}

fn failure() -> ScriptStep {
    ScriptStep::Failure {
        error: "device lost".into(),
    }
}

#[tokio::test(start_paused = true)]
async fn steady_sign_is_confirmed_on_the_third_tick() {
    let mut handle =
        DetectionSession::spawn(hello(), still(), DetectionSettings::default(), fixed_clock())
            .unwrap();

    let mut events = Vec::new();
    for _ in 0..5 {
        events.push(handle.next_event().await.unwrap());
    }

    assert!(matches!(events[0], DetectionEvent::TimeLeft(10)));
    assert!(matches!(events[1], DetectionEvent::TimeLeft(9)));
    assert!(matches!(events[2], DetectionEvent::Confirmed(id) if id == ClassId::new(1)));
    assert!(matches!(events[3], DetectionEvent::TimeLeft(8)));
    // Keeps confirming every tick until someone stops the session.
    assert!(matches!(events[4], DetectionEvent::Confirmed(id) if id == ClassId::new(1)));

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn faster_ticks_confirm_once_dwell_has_passed() {
    let settings = DetectionSettings::default().with_tick_period(Duration::from_millis(500));
    let mut handle = DetectionSession::spawn(hello(), still(), settings, fixed_clock()).unwrap();

    let mut confirmed_after = 0;
    while let Some(event) = handle.next_event().await {
        match event {
            DetectionEvent::TimeLeft(_) => confirmed_after += 1,
            DetectionEvent::Confirmed(_) => break,
            other => panic!("unexpected event {other:?}"),
        }
    }
    // Ticks at 0, 500 and 1000 ms pass before the 1500 ms tick confirms.
    assert_eq!(confirmed_after, 3);
    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn timer_counts_down_and_expires_once() {
    let (publisher, frames) = frame_channel();
    publisher.publish(Frame::new(image::RgbImage::new(8, 8), fixed_now()));
    let classifier = Arc::new(ScriptedClassifier::default());
    let mut handle = DetectionSession::spawn(
        classifier,
        Box::new(frames),
        DetectionSettings::default(),
        fixed_clock(),
    )
    .unwrap();

    let mut remaining = Vec::new();
    let mut elapsed = 0;
    while let Some(event) = handle.next_event().await {
        match event {
            DetectionEvent::TimeLeft(secs) => remaining.push(secs),
            DetectionEvent::TimerElapsed => elapsed += 1,
            other => panic!("unexpected event {other:?}"),
        }
    }

    assert_eq!(remaining, (0..=10).rev().collect::<Vec<u32>>());
    assert_eq!(elapsed, 1);
    assert!(publisher.is_stopped());
}

#[tokio::test(start_paused = true)]
async fn camera_not_ready_still_counts_down() {
    let (_publisher, frames) = frame_channel();
    let mut handle =
        DetectionSession::spawn(hello(), Box::new(frames), DetectionSettings::default(), fixed_clock())
            .unwrap();

    for expected in [10, 9, 8] {
        let event = handle.next_event().await.unwrap();
        assert!(matches!(event, DetectionEvent::TimeLeft(secs) if secs == expected));
    }
    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn consecutive_failures_abort_the_session() {
    let empty = ScriptStep::Predictions(Vec::new());
    let classifier = Arc::new(ScriptedClassifier::new([
        failure(),
        failure(),
        empty,
        failure(),
    ]));
    let mut handle =
        DetectionSession::spawn(classifier, still(), DetectionSettings::default(), fixed_clock())
            .unwrap();

    let mut ticks = 0;
    let mut aborted = None;
    while let Some(event) = handle.next_event().await {
        match event {
            DetectionEvent::TimeLeft(_) => ticks += 1,
            DetectionEvent::Aborted { failures, .. } => aborted = Some(failures),
            other => panic!("unexpected event {other:?}"),
        }
    }

    // The successful third call resets the count; three more failures end it.
    assert_eq!(aborted, Some(3));
    assert_eq!(ticks, 5);
}

#[tokio::test(start_paused = true)]
async fn stopping_releases_the_camera() {
    let (publisher, frames) = frame_channel();
    publisher.publish(Frame::new(image::RgbImage::new(8, 8), fixed_now()));
    let mut handle =
        DetectionSession::spawn(hello(), Box::new(frames), DetectionSettings::default(), fixed_clock())
            .unwrap();

    assert!(handle.next_event().await.is_some());
    assert!(!publisher.is_stopped());

    handle.shutdown().await;
    assert!(publisher.is_stopped());
}

#[tokio::test(start_paused = true)]
async fn dropping_the_handle_stops_the_loop() {
    let (publisher, frames) = frame_channel();
    let handle =
        DetectionSession::spawn(hello(), Box::new(frames), DetectionSettings::default(), fixed_clock())
            .unwrap();

    drop(handle);
    publisher.stopped().await;
    assert!(!publisher.publish(Frame::new(image::RgbImage::new(2, 2), fixed_now())));
}

#[test]
fn invalid_settings_are_rejected() {
    let settings: DetectionSettings = serde_json::from_str(r#"{"budget_secs": 0}"#).unwrap();
    let spawned = DetectionSession::spawn(hello(), still(), settings, fixed_clock());
    assert!(spawned.is_err());
}

#[test]
fn scripted_predictions_deserialize_from_traces() {
    let step: ScriptStep = serde_json::from_str(r#"[{"class": 1, "score": 0.5}]"#).unwrap();
    assert_eq!(
        step,
        ScriptStep::Predictions(vec![ScriptedPrediction {
            class: Some(1.0),
            score: 0.5,
        }])
    );
}

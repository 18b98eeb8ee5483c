use chrono::{DateTime, Utc};
use image::RgbImage;
use std::sync::Arc;
use tokio::sync::watch;

/// One captured video frame.
#[derive(Debug, Clone)]
pub struct Frame {
    pixels: Arc<RgbImage>,
    captured_at: DateTime<Utc>,
}

impl Frame {
    #[must_use]
    pub fn new(pixels: RgbImage, captured_at: DateTime<Utc>) -> Self {
        Self {
            pixels: Arc::new(pixels),
            captured_at,
        }
    }

    #[must_use]
    pub fn pixels(&self) -> &RgbImage {
        &self.pixels
    }

    #[must_use]
    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }
}

/// A live camera stream sampled on demand.
pub trait FrameSource: Send {
    /// The most recent frame, or `None` while the camera is not ready.
    fn latest_frame(&mut self) -> Option<Frame>;

    /// Releases the camera. Later calls to `latest_frame` return `None`.
    fn stop(&mut self);
}

//
// ─── WATCH CHANNEL SOURCE ──────────────────────────────────────────────────────
//

/// Capture side of a [`frame_channel`]; a camera task pushes frames here.
#[derive(Debug)]
pub struct FramePublisher {
    tx: watch::Sender<Option<Frame>>,
}

impl FramePublisher {
    /// Replaces the latest frame. Returns false once the consumer stopped.
    pub fn publish(&self, frame: Frame) -> bool {
        self.tx.send(Some(frame)).is_ok()
    }

    /// True when the consuming source was stopped or dropped; the camera can be released.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.tx.is_closed()
    }

    /// Resolves once the consuming source is stopped or dropped.
    pub async fn stopped(&self) {
        self.tx.closed().await;
    }
}

/// Consumer side of a [`frame_channel`]; only the newest frame is retained.
#[derive(Debug)]
pub struct WatchFrameSource {
    rx: Option<watch::Receiver<Option<Frame>>>,
}

impl FrameSource for WatchFrameSource {
    fn latest_frame(&mut self) -> Option<Frame> {
        self.rx.as_mut()?.borrow_and_update().clone()
    }

    fn stop(&mut self) {
        self.rx = None;
    }
}

/// Creates a latest-value frame channel between a capture task and the detection loop.
#[must_use]
pub fn frame_channel() -> (FramePublisher, WatchFrameSource) {
    let (tx, rx) = watch::channel(None);
    (FramePublisher { tx }, WatchFrameSource { rx: Some(rx) })
}

//
// ─── STILL SOURCE ──────────────────────────────────────────────────────────────
//

/// Serves the same frame forever; used for replays and tests.
#[derive(Debug, Clone)]
pub struct StillFrameSource {
    frame: Option<Frame>,
}

impl StillFrameSource {
    #[must_use]
    pub fn new(frame: Frame) -> Self {
        Self { frame: Some(frame) }
    }

    /// A uniformly grey frame of the given size.
    #[must_use]
    pub fn blank(width: u32, height: u32, captured_at: DateTime<Utc>) -> Self {
        let pixels = RgbImage::from_pixel(width, height, image::Rgb([128, 128, 128]));
        Self::new(Frame::new(pixels, captured_at))
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.frame.is_none()
    }
}

impl FrameSource for StillFrameSource {
    fn latest_frame(&mut self) -> Option<Frame> {
        self.frame.clone()
    }

    fn stop(&mut self) {
        self.frame = None;
    }
}

mod session;

pub use session::{DetectionEvent, DetectionHandle, DetectionSession};

#![forbid(unsafe_code)]

pub mod error;
pub mod model;
pub mod stabilizer;
pub mod time;
pub mod timer;

pub use error::Error;
pub use stabilizer::DetectionStabilizer;
pub use time::Clock;
pub use timer::{SessionTimer, TimerTick};

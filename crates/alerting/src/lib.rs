//! Alerting System
//!
//! Runs the side effects of a drowsiness alarm (alarm sound, log record) on
//! background tasks so the frame loop never waits on audio or disk.

mod dispatcher;
mod sinks;

pub use dispatcher::{AlarmDispatcher, DispatchHandle};
pub use sinks::{AlarmSink, AlarmSound, DrowsinessLog};

use thiserror::Error;

/// Alerting errors
#[derive(Debug, Error)]
pub enum AlertError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Alarm playback failed: {0}")]
    Playback(String),
    #[error("Alarm task failed: {0}")]
    Join(String),
    #[error("No async runtime available: {0}")]
    NoRuntime(String),
}

//! Drowsiness Monitor Application
//!
//! Runs a monitoring session over a stream of per-frame EAR samples produced
//! by the landmark pipeline, dispatching alarm side effects in the background.

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

mod session;
mod settings;

pub use session::{parse_line, run_session, InputLine, Session, SessionReport};
pub use settings::{AppSettings, LogFormat};

/// Application errors
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Settings error: {0}")]
    Settings(#[from] config::ConfigError),

    #[error("Detector config error: {0}")]
    Detector(#[from] dms::ConfigError),

    #[error("Alerting error: {0}")]
    Alerting(#[from] alerting::AlertError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unrecognized input line: {0:?}")]
    Input(String),
}

/// Initialize logging
///
/// Logs go to stderr; stdin carries the EAR samples.
pub fn init_logging(format: LogFormat) {
    let builder = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(true)
        .with_writer(std::io::stderr);

    let result = match format {
        LogFormat::Text => tracing::subscriber::set_global_default(builder.finish()),
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish()),
    };

    result.expect("Failed to set tracing subscriber");
}

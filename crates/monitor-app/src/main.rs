//! Drowsiness Monitor - Main Entry Point
//!
//! Reads one averaged EAR sample per line on stdin; `q` or Ctrl-C quits.

use monitor_app::{init_logging, run_session, AppSettings, Session};
use tokio::io::BufReader;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = AppSettings::load()?;
    init_logging(settings.log_format);

    info!("=== Drowsiness Monitor v{} ===", env!("CARGO_PKG_VERSION"));

    let config = settings.detector_config()?;
    let dispatcher = settings.alarm_dispatcher()?;

    let session = Session::new(config, settings.frame_rate, dispatcher);
    let stop = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Ctrl-C handler unavailable: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let report = run_session(BufReader::new(tokio::io::stdin()), session, stop).await?;
    info!("Session summary: {}", serde_json::to_string(&report)?);

    Ok(())
}

//! Monitoring session over a line-oriented EAR stream
//!
//! One line per processed frame, holding the averaged EAR of that frame.
//! A `fps=<rate>` line recalibrates for a measured frame rate and `q` quits:
//!
//! ```text
//! fps=29.5
//! 0.27
//! 0.26
//! q
//! ```

use alerting::{AlarmDispatcher, DispatchHandle};
use chrono::{DateTime, Local};
use dms::{
    calibrate, CalibratedThresholds, DrowsinessConfig, DrowsinessMonitor, EarTrace, MonitorStats,
    TraceSummary, Transition,
};
use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info, warn};

use crate::AppError;

/// Time given to in-flight alarm side effects at shutdown
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// One parsed input line
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputLine {
    Sample(f64),
    FrameRate(f64),
    Quit,
    Blank,
}

/// Parse one input line
pub fn parse_line(line: &str) -> Result<InputLine, AppError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(InputLine::Blank);
    }
    if line.eq_ignore_ascii_case("q") {
        return Ok(InputLine::Quit);
    }

    let invalid = || AppError::Input(line.to_string());
    match line.strip_prefix("fps=") {
        Some(rate) => rate.trim().parse().map(InputLine::FrameRate).map_err(|_| invalid()),
        None => line.parse().map(InputLine::Sample).map_err(|_| invalid()),
    }
}

/// End-of-session report
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub thresholds: CalibratedThresholds,
    pub stats: MonitorStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<TraceSummary>,
}

/// A monitoring session for one camera stream
pub struct Session {
    config: DrowsinessConfig,
    monitor: DrowsinessMonitor,
    dispatcher: AlarmDispatcher,
    trace: EarTrace,
    pending: Vec<DispatchHandle>,
}

impl Session {
    /// Create a session calibrated for `frame_rate`
    pub fn new(config: DrowsinessConfig, frame_rate: f64, dispatcher: AlarmDispatcher) -> Self {
        Self {
            monitor: DrowsinessMonitor::new(calibrate(&config, frame_rate)),
            config,
            dispatcher,
            trace: EarTrace::default(),
            pending: Vec::new(),
        }
    }

    pub fn monitor(&self) -> &DrowsinessMonitor {
        &self.monitor
    }

    /// Apply one input line. Returns the monitor transition for samples.
    pub fn process(&mut self, input: InputLine, now: DateTime<Local>) -> Option<Transition> {
        match input {
            InputLine::Sample(ear) => Some(self.observe(ear, now)),
            InputLine::FrameRate(rate) => {
                self.monitor.recalibrate(calibrate(&self.config, rate));
                None
            }
            InputLine::Quit | InputLine::Blank => None,
        }
    }

    /// Feed one EAR sample; dispatches the alarm side effects on a raise
    pub fn observe(&mut self, ear: f64, now: DateTime<Local>) -> Transition {
        self.trace.push(ear);
        let transition = self.monitor.observe(ear, now);

        if let Transition::AlarmRaised(event) = &transition {
            self.pending.retain(|handle| !handle.is_finished());
            self.pending.push(self.dispatcher.dispatch(*event));
        }

        debug!("{:?}", self.monitor.snapshot(ear));
        transition
    }

    /// Process lines until `q`, end of input, or `stop` completes.
    ///
    /// Lines that are not valid UTF-8 are decoded lossily and then skipped
    /// like any other unparsable line. Only read failures end the loop early.
    pub async fn run<R, S>(&mut self, mut reader: R, stop: S) -> Result<(), AppError>
    where
        R: AsyncBufRead + Unpin,
        S: Future<Output = ()>,
    {
        tokio::pin!(stop);
        let mut buf = Vec::new();

        loop {
            tokio::select! {
                _ = &mut stop => {
                    info!("Stop signal received");
                    break;
                }
                read = reader.read_until(b'\n', &mut buf) => {
                    if read? == 0 {
                        info!("End of EAR input");
                        break;
                    }
                    let parsed = parse_line(&String::from_utf8_lossy(&buf));
                    buf.clear();

                    match parsed {
                        Ok(InputLine::Quit) => {
                            info!("Quit requested");
                            break;
                        }
                        Ok(input) => {
                            self.process(input, Local::now());
                        }
                        Err(e) => warn!("Skipping input: {}", e),
                    }
                }
            }
        }

        Ok(())
    }

    /// Let in-flight side effects finish, cancelling any still running after
    /// [`SHUTDOWN_GRACE`], and report on the session
    pub async fn shutdown(self) -> SessionReport {
        for handle in self.pending {
            handle.cancel_after(SHUTDOWN_GRACE).await;
        }

        let thresholds = *self.monitor.thresholds();
        SessionReport {
            thresholds,
            stats: *self.monitor.stats(),
            trace: self.trace.summary(thresholds.ear_threshold),
        }
    }
}

/// Run `session` over `reader` and report once it ends
pub async fn run_session<R, S>(
    reader: R,
    mut session: Session,
    stop: S,
) -> Result<SessionReport, AppError>
where
    R: AsyncBufRead + Unpin,
    S: Future<Output = ()>,
{
    let outcome = session.run(reader, stop).await;
    let report = session.shutdown().await;
    outcome?;

    info!(
        "Session ended: {} frames, {} drowsiness alarms",
        report.stats.frames_observed, report.stats.episodes
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alerting::{AlarmSink, AlertError, DrowsinessLog};
    use async_trait::async_trait;
    use dms::AlarmEvent;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Counting(Arc<AtomicUsize>);

    #[async_trait]
    impl AlarmSink for Counting {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn handle(&self, _event: &AlarmEvent) -> Result<(), AlertError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn session(count: &Arc<AtomicUsize>) -> Session {
        let dispatcher = AlarmDispatcher::from_current()
            .unwrap()
            .with_sink(Counting(count.clone()));
        Session::new(DrowsinessConfig::default(), 20.0, dispatcher)
    }

    fn lines(ear: &str, count: usize) -> String {
        format!("{}\n", ear).repeat(count)
    }

    #[test]
    fn test_parse_line() {
        assert_eq!(parse_line(" 0.27 ").unwrap(), InputLine::Sample(0.27));
        assert_eq!(parse_line("fps=29.5").unwrap(), InputLine::FrameRate(29.5));
        assert_eq!(parse_line("Q").unwrap(), InputLine::Quit);
        assert_eq!(parse_line("").unwrap(), InputLine::Blank);
        assert!(matches!(parse_line("eyes"), Err(AppError::Input(_))));
        assert!(matches!(parse_line("fps=fast"), Err(AppError::Input(_))));
    }

    #[tokio::test]
    async fn test_session_raises_once_and_stops_at_quit() {
        let count = Arc::new(AtomicUsize::new(0));
        let input = format!("{}0.30\nnoise\nq\n{}", lines("0.10", 70), lines("0.10", 70));

        let report = run_session(input.as_bytes(), session(&count), std::future::pending())
            .await
            .unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(report.thresholds.consecutive_frames, 60);
        assert_eq!(report.stats.frames_observed, 71);
        assert_eq!(report.stats.episodes, 1);

        let trace = report.trace.unwrap();
        assert_eq!(trace.samples, 71);
        assert!((trace.closed_fraction - 70.0 / 71.0).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_frame_rate_header_recalibrates() {
        let count = Arc::new(AtomicUsize::new(0));
        let input = format!("fps=10\n{}", lines("0.10", 30));

        let report = run_session(input.as_bytes(), session(&count), std::future::pending())
            .await
            .unwrap();

        assert_eq!(report.thresholds.consecutive_frames, 30);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_new_episode_retriggers() {
        let count = Arc::new(AtomicUsize::new(0));
        let input = format!("{}0.26\n{}", lines("0.10", 60), lines("0.10", 60));

        let report = run_session(input.as_bytes(), session(&count), std::future::pending())
            .await
            .unwrap();

        assert_eq!(report.stats.episodes, 2);
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_stop_signal_ends_session() {
        let count = Arc::new(AtomicUsize::new(0));
        let (_writer, reader) = tokio::io::duplex(64);

        let report = run_session(tokio::io::BufReader::new(reader), session(&count), async {})
            .await
            .unwrap();

        assert_eq!(report.stats.frames_observed, 0);
        assert!(report.trace.is_none());
    }

    #[tokio::test]
    async fn test_invalid_utf8_line_is_skipped() {
        let count = Arc::new(AtomicUsize::new(0));
        let input: &[u8] = b"0.10\n0.10\n\xff\xfe\n0.10\n0.12";

        let report = run_session(input, session(&count), std::future::pending())
            .await
            .unwrap();

        assert_eq!(report.stats.frames_observed, 4);
        assert_eq!(report.stats.closed_frames, 4);
        assert_eq!(report.trace.unwrap().samples, 4);
    }

    #[tokio::test]
    async fn test_alarm_written_to_log() {
        let path = std::env::temp_dir().join(format!("drowsiness-{}.log", uuid::Uuid::new_v4()));
        let dispatcher = AlarmDispatcher::from_current()
            .unwrap()
            .with_sink(DrowsinessLog::new(&path));
        let session = Session::new(DrowsinessConfig::default(), 20.0, dispatcher);

        run_session(lines("0.05", 65).as_bytes(), session, std::future::pending())
            .await
            .unwrap();

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        tokio::fs::remove_file(&path).await.unwrap();
        assert_eq!(contents.lines().count(), 1);
        assert!(contents.starts_with("Drowsiness detected at: "));
    }
}

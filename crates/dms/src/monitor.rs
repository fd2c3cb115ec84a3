//! Eyes-closed drowsiness state machine
//!
//! One [`DrowsinessMonitor`] per tracked face. Each processed frame feeds one
//! averaged EAR sample to [`DrowsinessMonitor::observe`], which reports how the
//! alarm changed:
//!
//! - `ear < threshold` extends the closed-eye run. The run reaching
//!   `consecutive_frames` raises the alarm once; longer runs keep it going.
//! - any `ear >= threshold` ends the run immediately and clears the alarm.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::calibration::CalibratedThresholds;
use crate::state::{DrowsinessLevel, MonitorState, MonitorStats};

/// Closed-eye frames per on/off phase of the flashing alert text
pub const FLASH_PERIOD_FRAMES: u32 = 15;

/// Alert text shown by the display while the alarm is on
pub const ALERT_TEXT: &str = "!!! DROWSINESS ALERT !!!";

/// Timestamp layout used in drowsiness log records
pub const LOG_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Emitted once when an eyes-closed episode becomes drowsiness
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlarmEvent {
    /// Time of the frame that raised the alarm
    pub timestamp: DateTime<Local>,

    /// EAR of that frame
    pub ear_value: f64,
}

impl AlarmEvent {
    /// Log record text, e.g. `Drowsiness detected at: 2024-05-01 14:03:27`
    pub fn log_message(&self) -> String {
        format!(
            "Drowsiness detected at: {}",
            self.timestamp.format(LOG_TIMESTAMP_FORMAT)
        )
    }
}

/// Alarm change caused by one sample
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Nothing to report: eyes open, or closed for fewer frames than required
    NoChange,

    /// Eyes closed long enough; fire the alarm side effects
    AlarmRaised(AlarmEvent),

    /// Alarm already on and eyes still closed
    AlarmContinuing,

    /// Eyes opened while the alarm was on
    AlarmCleared,
}

impl Transition {
    /// Whether the alarm is on after this transition
    pub fn alarm_on(&self) -> bool {
        matches!(self, Self::AlarmRaised(_) | Self::AlarmContinuing)
    }

    pub fn event(&self) -> Option<&AlarmEvent> {
        match self {
            Self::AlarmRaised(event) => Some(event),
            _ => None,
        }
    }
}

/// What the display collaborator draws for the current frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DisplaySnapshot {
    pub ear: f64,
    pub closed_run_length: u32,
    pub alarm_active: bool,
    /// Flash phase derived from the closed-eye run
    pub flash_on: bool,
    /// Alert text is drawn only while the alarm is on, during the flash phase
    pub alert_text_visible: bool,
}

impl DisplaySnapshot {
    pub fn ear_label(&self) -> String {
        format!("EAR: {:.2}", self.ear)
    }
}

/// Flash phase for a closed-eye run length
pub fn flash_on(closed_run_length: u32) -> bool {
    (closed_run_length / FLASH_PERIOD_FRAMES) % 2 == 0
}

/// Drowsiness monitor for a single stream
#[derive(Debug, Clone)]
pub struct DrowsinessMonitor {
    thresholds: CalibratedThresholds,
    state: MonitorState,
    stats: MonitorStats,
}

impl DrowsinessMonitor {
    /// Create a monitor in the awake state
    pub fn new(thresholds: CalibratedThresholds) -> Self {
        debug!("Creating drowsiness monitor with thresholds: {:?}", thresholds);
        Self {
            thresholds,
            state: MonitorState::default(),
            stats: MonitorStats::default(),
        }
    }

    /// Feed one EAR sample taken at `now`.
    ///
    /// Total over all inputs: the sample is only compared against the
    /// threshold, so NaN counts as open.
    pub fn observe(&mut self, ear: f64, now: DateTime<Local>) -> Transition {
        self.stats.frames_observed = self.stats.frames_observed.saturating_add(1);

        if ear < self.thresholds.ear_threshold {
            self.stats.closed_frames = self.stats.closed_frames.saturating_add(1);
            self.state.closed_run_length = self.state.closed_run_length.saturating_add(1);

            // checked first: a raised alarm outlives an upward recalibration
            if self.state.alarm_active {
                return Transition::AlarmContinuing;
            }
            if self.state.closed_run_length < self.thresholds.consecutive_frames {
                return Transition::NoChange;
            }

            self.state.alarm_active = true;
            self.stats.episodes = self.stats.episodes.saturating_add(1);
            warn!(
                "Drowsiness detected: eyes closed for {} frames (EAR {:.3})",
                self.state.closed_run_length, ear
            );
            Transition::AlarmRaised(AlarmEvent {
                timestamp: now,
                ear_value: ear,
            })
        } else {
            self.state.closed_run_length = 0;
            if std::mem::replace(&mut self.state.alarm_active, false) {
                info!("Eyes open again (EAR {:.3}), alarm cleared", ear);
                Transition::AlarmCleared
            } else {
                Transition::NoChange
            }
        }
    }

    /// Replace the thresholds between frames, e.g. once the frame rate has
    /// been measured more accurately. The current run is kept, and a raised
    /// alarm stays on until the eyes open.
    pub fn recalibrate(&mut self, thresholds: CalibratedThresholds) {
        info!(
            "Recalibrated: {} -> {} consecutive frames",
            self.thresholds.consecutive_frames, thresholds.consecutive_frames
        );
        self.thresholds = thresholds;
    }

    /// Reset to awake (on driver change). Session stats are kept.
    pub fn reset(&mut self) {
        self.state.reset();
    }

    pub fn thresholds(&self) -> &CalibratedThresholds {
        &self.thresholds
    }

    pub fn state(&self) -> &MonitorState {
        &self.state
    }

    pub fn stats(&self) -> &MonitorStats {
        &self.stats
    }

    pub fn closed_run_length(&self) -> u32 {
        self.state.closed_run_length
    }

    pub fn level(&self) -> DrowsinessLevel {
        self.state.level()
    }

    /// Current flash phase, recomputed from the closed-eye run
    pub fn flash_on(&self) -> bool {
        flash_on(self.state.closed_run_length)
    }

    /// Display state for the frame that produced `ear`
    pub fn snapshot(&self, ear: f64) -> DisplaySnapshot {
        let flash = self.flash_on();
        DisplaySnapshot {
            ear,
            closed_run_length: self.state.closed_run_length,
            alarm_active: self.state.alarm_active,
            flash_on: flash,
            alert_text_visible: self.state.alarm_active && flash,
        }
    }
}

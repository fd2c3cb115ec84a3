//! Driver Monitoring System (DMS)
//!
//! Real-time drowsiness detection from a per-frame Eye Aspect Ratio (EAR):
//! - Tunable closed-eye threshold and duration (config file)
//! - Frame-rate calibration of the consecutive-frame count
//! - Edge-triggered eyes-closed alarm state machine
//! - EAR landmark geometry and session trace

pub mod calibration;
pub mod config;
pub mod ear;
pub mod monitor;
pub mod state;
pub mod trace;

pub use calibration::{calibrate, derive, CalibratedThresholds, NOMINAL_FRAME_RATE};
pub use config::{ConfigError, DrowsinessConfig};
pub use ear::{average_ear, eye_aspect_ratio, Point};
pub use monitor::{flash_on, AlarmEvent, DisplaySnapshot, DrowsinessMonitor, Transition, ALERT_TEXT};
pub use state::{DrowsinessLevel, MonitorState, MonitorStats};
pub use trace::{EarTrace, TraceSummary};

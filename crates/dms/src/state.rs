//! Driver state tracking

use serde::{Deserialize, Serialize};

/// Drowsiness level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DrowsinessLevel {
    #[default]
    Awake,
    Drowsy,
}

/// Eyes-closed run state (tracked over time)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MonitorState {
    /// Consecutive frames with EAR below threshold
    pub closed_run_length: u32,

    /// Whether the drowsiness alarm is on
    pub alarm_active: bool,
}

impl MonitorState {
    pub fn level(&self) -> DrowsinessLevel {
        if self.alarm_active {
            DrowsinessLevel::Drowsy
        } else {
            DrowsinessLevel::Awake
        }
    }

    /// Reset state (on driver change)
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Per-session counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MonitorStats {
    /// Samples passed to `observe`
    pub frames_observed: u64,

    /// Samples below the EAR threshold
    pub closed_frames: u64,

    /// Alarms raised
    pub episodes: u32,
}

impl MonitorStats {
    /// Fraction of observed frames with eyes closed
    pub fn closed_ratio(&self) -> f64 {
        if self.frames_observed == 0 {
            return 0.0;
        }
        self.closed_frames as f64 / self.frames_observed as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_follows_alarm() {
        let mut state = MonitorState::default();
        assert_eq!(state.level(), DrowsinessLevel::Awake);

        state.alarm_active = true;
        state.closed_run_length = 70;
        assert_eq!(state.level(), DrowsinessLevel::Drowsy);

        state.reset();
        assert_eq!(state, MonitorState::default());
    }

    #[test]
    fn test_closed_ratio() {
        assert_eq!(MonitorStats::default().closed_ratio(), 0.0);

        let stats = MonitorStats {
            frames_observed: 200,
            closed_frames: 50,
            episodes: 1,
        };
        assert!((stats.closed_ratio() - 0.25).abs() < 1e-12);
    }
}

//! Frame-rate calibration of the drowsiness thresholds

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::DrowsinessConfig;

/// Frame rate assumed when the capture device reports none (fps)
pub const NOMINAL_FRAME_RATE: f64 = 20.0;

/// Thresholds the monitor runs on, derived for one frame rate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibratedThresholds {
    /// EAR below this value counts as a closed-eye frame
    pub ear_threshold: f64,

    /// Consecutive closed-eye frames that constitute drowsiness (>= 1)
    pub consecutive_frames: u32,
}

impl CalibratedThresholds {
    /// Derive thresholds for `frame_rate`, see [`derive`]
    pub fn new(config: &DrowsinessConfig, frame_rate: f64) -> Self {
        derive(config, frame_rate)
    }
}

/// Derive the consecutive-frame count for a frame rate.
///
/// `consecutive_frames = max(1, round(frame_rate * drowsy_seconds))`. A zero,
/// negative, or non-finite frame rate is treated as unavailable and replaced
/// with [`NOMINAL_FRAME_RATE`].
pub fn derive(config: &DrowsinessConfig, frame_rate: f64) -> CalibratedThresholds {
    let frame_rate = effective_frame_rate(frame_rate);
    // `as` saturates, so absurd products clamp to u32::MAX
    let frames = (frame_rate * config.drowsy_seconds).round() as u32;

    CalibratedThresholds {
        ear_threshold: config.ear_threshold,
        consecutive_frames: frames.max(1),
    }
}

/// Like [`derive`], logging the calibration the session will run with
pub fn calibrate(config: &DrowsinessConfig, frame_rate: f64) -> CalibratedThresholds {
    if effective_frame_rate(frame_rate) != frame_rate {
        warn!(
            "Frame rate {} unavailable, assuming {} fps",
            frame_rate, NOMINAL_FRAME_RATE
        );
    }

    let thresholds = derive(config, frame_rate);
    info!("Camera FPS: {}", effective_frame_rate(frame_rate));
    info!("Alarm after {} seconds of eyes closed.", config.drowsy_seconds);
    info!("EAR threshold set to: {}", thresholds.ear_threshold);
    info!("Consecutive closed-eye frames: {}", thresholds.consecutive_frames);
    thresholds
}

fn effective_frame_rate(frame_rate: f64) -> f64 {
    if frame_rate > 0.0 && frame_rate.is_finite() {
        frame_rate
    } else {
        NOMINAL_FRAME_RATE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_default_config_at_nominal_rate() {
        let thresholds = derive(&DrowsinessConfig::default(), 20.0);
        assert_eq!(thresholds.consecutive_frames, 60);
        assert_eq!(thresholds.ear_threshold, 0.25);
    }

    #[test]
    fn test_rounds_to_nearest_frame() {
        let config = DrowsinessConfig {
            drowsy_seconds: 1.5,
            ..Default::default()
        };
        assert_eq!(derive(&config, 29.97).consecutive_frames, 45);
        assert_eq!(derive(&config, 15.1).consecutive_frames, 23);
    }

    #[test]
    fn test_minimum_one_frame() {
        let config = DrowsinessConfig {
            drowsy_seconds: 0.001,
            ..Default::default()
        };
        assert_eq!(derive(&config, 30.0).consecutive_frames, 1);
    }

    #[test]
    fn test_unavailable_rate_uses_nominal() {
        let config = DrowsinessConfig::default();
        let nominal = derive(&config, NOMINAL_FRAME_RATE);

        assert_eq!(derive(&config, 0.0), nominal);
        assert_eq!(derive(&config, -5.0), nominal);
        assert_eq!(derive(&config, f64::NAN), nominal);
        assert_eq!(calibrate(&config, 0.0), nominal);
    }

    proptest! {
        #[test]
        fn derive_matches_formula(frame_rate in 0.1f64..240.0, seconds in 0.01f64..60.0) {
            let config = DrowsinessConfig { ear_threshold: 0.25, drowsy_seconds: seconds };
            let expected = ((frame_rate * seconds).round() as u32).max(1);
            prop_assert_eq!(derive(&config, frame_rate).consecutive_frames, expected);
        }

        #[test]
        fn zero_rate_matches_nominal(seconds in 0.01f64..60.0, threshold in 0.01f64..1.0) {
            let config = DrowsinessConfig { ear_threshold: threshold, drowsy_seconds: seconds };
            prop_assert_eq!(derive(&config, 0.0), derive(&config, 20.0));
        }
    }
}

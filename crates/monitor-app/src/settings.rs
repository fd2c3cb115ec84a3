//! Application settings
//!
//! Layered with the `config` crate: built-in defaults, then an optional
//! `drowsiness-monitor.{toml,json,yaml}` file, then `DROWSY_*` environment
//! variables (`DROWSY_FRAME_RATE=30`, `DROWSY_LOG_FORMAT=json`, ...).

use alerting::{AlarmDispatcher, AlarmSound, DrowsinessLog};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use dms::DrowsinessConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

use crate::AppError;

/// Settings file name, without extension
pub const SETTINGS_FILE: &str = "drowsiness-monitor";

/// Environment variable prefix
pub const ENV_PREFIX: &str = "DROWSY";

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Detector tunables (`EYE_AR_THRESH`, `DROWSINESS_SECONDS`)
    pub config_path: PathBuf,
    /// Capture frame rate; 0 when the device reports none
    pub frame_rate: f64,
    /// Alarm sound file
    pub alarm_sound: PathBuf,
    /// External player for the alarm sound
    pub sound_player: String,
    /// Append-only drowsiness log
    pub log_path: PathBuf,
    pub log_format: LogFormat,
    /// Reject malformed detector config values instead of using defaults
    pub strict_config: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from("config.txt"),
            frame_rate: 0.0,
            alarm_sound: PathBuf::from("alarm.wav"),
            sound_player: "aplay".to_string(),
            log_path: PathBuf::from("drowsiness_log.txt"),
            log_format: LogFormat::Text,
            strict_config: false,
        }
    }
}

impl AppSettings {
    /// Load settings from the settings file and environment
    pub fn load() -> Result<Self, AppError> {
        Self::from_builder(
            Config::builder()
                .add_source(File::with_name(SETTINGS_FILE).required(false))
                .add_source(
                    Environment::with_prefix(ENV_PREFIX)
                        .prefix_separator("_")
                        .separator("__")
                        .try_parsing(true),
                ),
        )
    }

    /// Build settings from arbitrary sources over the defaults
    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, AppError> {
        Ok(builder.build()?.try_deserialize()?)
    }

    /// Load the detector config named by `config_path`
    pub fn detector_config(&self) -> Result<DrowsinessConfig, AppError> {
        let config = if self.strict_config {
            DrowsinessConfig::load_file_strict(&self.config_path)?
        } else {
            DrowsinessConfig::load_file(&self.config_path)
        };

        info!("Detector config: {:?}", config);
        Ok(config)
    }

    /// Alarm dispatcher with the sound and log sinks, on the current runtime
    pub fn alarm_dispatcher(&self) -> Result<AlarmDispatcher, AppError> {
        let dispatcher = AlarmDispatcher::from_current()?
            .with_sink(AlarmSound::new(&self.sound_player, &self.alarm_sound))
            .with_sink(DrowsinessLog::new(&self.log_path));

        info!("Alarm sinks ready: {}", dispatcher.sink_count());
        Ok(dispatcher)
    }
}

//! DMS configuration
//!
//! The detector tunables live in a line-oriented `KEY=value` text file:
//!
//! ```text
//! EYE_AR_THRESH=0.25
//! DROWSINESS_SECONDS=3
//! ```

use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Config key for the closed-eye EAR threshold
pub const EAR_THRESHOLD_KEY: &str = "EYE_AR_THRESH";

/// Config key for the closed-eye duration (seconds)
pub const DROWSY_SECONDS_KEY: &str = "DROWSINESS_SECONDS";

/// Default closed-eye EAR threshold
pub const DEFAULT_EAR_THRESHOLD: f64 = 0.25;

/// Default closed-eye duration before the alarm (seconds)
pub const DEFAULT_DROWSY_SECONDS: f64 = 3.0;

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Malformed value for {key}: {value:?}")]
    Parse { key: &'static str, value: String },

    #[error("{key} value {value} is out of range")]
    OutOfRange { key: &'static str, value: f64 },

    #[error("Config source not found: {}", .0.display())]
    SourceMissing(PathBuf),

    #[error("Failed to read config source: {0}")]
    Io(#[from] std::io::Error),
}

/// Drowsiness detector configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DrowsinessConfig {
    /// EAR below this value counts as a closed-eye frame, in (0, 1]
    pub ear_threshold: f64,

    /// Continuous closed-eye time that constitutes drowsiness (seconds)
    pub drowsy_seconds: f64,
}

impl Default for DrowsinessConfig {
    fn default() -> Self {
        Self {
            ear_threshold: DEFAULT_EAR_THRESHOLD,
            drowsy_seconds: DEFAULT_DROWSY_SECONDS,
        }
    }
}

impl DrowsinessConfig {
    /// Create strict config (alarm sooner, more frames count as closed)
    pub fn strict() -> Self {
        Self {
            ear_threshold: 0.27,
            drowsy_seconds: 2.0,
        }
    }

    /// Create lenient config (alarm later, fewer frames count as closed)
    pub fn lenient() -> Self {
        Self {
            ear_threshold: 0.21,
            drowsy_seconds: 4.5,
        }
    }

    /// Load from an optional key-value source.
    ///
    /// Never fails: an absent source yields the defaults, and a malformed or
    /// out-of-range value falls back to that field's default while the other
    /// keys are still applied.
    pub fn load(source: Option<&str>) -> Self {
        match source {
            Some(text) => Self::parse_with(text, |err| {
                warn!("{}; keeping default", err);
                Ok(())
            })
            .unwrap_or_default(),
            None => {
                let config = Self::default();
                info!("No drowsiness config source, using defaults: {:?}", config);
                config
            }
        }
    }

    /// Parse a key-value source, rejecting any malformed value for a
    /// recognized key.
    pub fn parse_strict(text: &str) -> Result<Self, ConfigError> {
        Self::parse_with(text, Err)
    }

    /// Load from a config file, tolerating a missing or unreadable file
    pub fn load_file(path: impl AsRef<Path>) -> Self {
        match read_source(path.as_ref()) {
            Ok(text) => Self::load(Some(&text)),
            Err(ConfigError::SourceMissing(path)) => {
                info!("{} not found. Using default values.", path.display());
                Self::default()
            }
            Err(err) => {
                warn!("{}. Using default values.", err);
                Self::default()
            }
        }
    }

    /// Load from a config file with strict value parsing.
    ///
    /// A missing file is still not an error; read failures and malformed
    /// values are.
    pub fn load_file_strict(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        match read_source(path.as_ref()) {
            Ok(text) => Self::parse_strict(&text),
            Err(ConfigError::SourceMissing(path)) => {
                info!("{} not found. Using default values.", path.display());
                Ok(Self::default())
            }
            Err(err) => Err(err),
        }
    }

    fn parse_with<F>(text: &str, mut on_error: F) -> Result<Self, ConfigError>
    where
        F: FnMut(ConfigError) -> Result<(), ConfigError>,
    {
        let mut config = Self::default();

        for (key, raw) in entries(text) {
            let field = match key {
                EAR_THRESHOLD_KEY => &mut config.ear_threshold,
                DROWSY_SECONDS_KEY => &mut config.drowsy_seconds,
                _ => {
                    debug!("Ignoring unrecognized config key {:?}", key);
                    continue;
                }
            };

            match parse_value(key, raw) {
                Ok(value) => *field = value,
                Err(err) => on_error(err)?,
            }
        }

        Ok(config)
    }
}

fn read_source(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|err| match err.kind() {
        ErrorKind::NotFound => ConfigError::SourceMissing(path.to_path_buf()),
        _ => ConfigError::Io(err),
    })
}

/// `KEY=value` pairs, skipping blank lines, `#` comments, and lines without `=`
fn entries(text: &str) -> impl Iterator<Item = (&str, &str)> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.trim(), value.trim()))
}

fn parse_value(key: &str, raw: &str) -> Result<f64, ConfigError> {
    let (key, in_range): (&'static str, fn(f64) -> bool) = match key {
        EAR_THRESHOLD_KEY => (EAR_THRESHOLD_KEY, |v| v > 0.0 && v <= 1.0),
        _ => (DROWSY_SECONDS_KEY, |v| v > 0.0 && v.is_finite()),
    };

    let value: f64 = raw.parse().map_err(|_| ConfigError::Parse {
        key,
        value: raw.to_string(),
    })?;

    if in_range(value) {
        Ok(value)
    } else {
        Err(ConfigError::OutOfRange { key, value })
    }
}

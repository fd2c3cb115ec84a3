//! Alarm side effects

use async_trait::async_trait;
use dms::AlarmEvent;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

use crate::AlertError;

/// Consumer of raised alarms
#[async_trait]
pub trait AlarmSink: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Handle one alarm
    async fn handle(&self, event: &AlarmEvent) -> Result<(), AlertError>;
}

/// Append-only drowsiness log file
#[derive(Debug, Clone)]
pub struct DrowsinessLog {
    path: PathBuf,
}

impl DrowsinessLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl AlarmSink for DrowsinessLog {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn handle(&self, event: &AlarmEvent) -> Result<(), AlertError> {
        let message = event.log_message();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;

        file.write_all(format!("{}\n", message).as_bytes()).await?;
        file.flush().await?;

        info!("[LOGGED] {}", message);
        Ok(())
    }
}

/// Alarm sound played through an external audio player
#[derive(Debug, Clone)]
pub struct AlarmSound {
    player: String,
    args: Vec<String>,
    sound_path: PathBuf,
}

impl AlarmSound {
    /// Play `sound_path` with `player`, e.g. `aplay alarm.wav`
    pub fn new(player: impl Into<String>, sound_path: impl Into<PathBuf>) -> Self {
        Self {
            player: player.into(),
            args: Vec::new(),
            sound_path: sound_path.into(),
        }
    }

    /// Extra player arguments placed before the sound path
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }
}

#[async_trait]
impl AlarmSink for AlarmSound {
    fn name(&self) -> &'static str {
        "sound"
    }

    async fn handle(&self, _event: &AlarmEvent) -> Result<(), AlertError> {
        debug!("Playing {} with {}", self.sound_path.display(), self.player);

        // kill_on_drop: aborting the task stops playback
        let status = Command::new(&self.player)
            .args(&self.args)
            .arg(&self.sound_path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|e| AlertError::Playback(format!("{}: {}", self.player, e)))?;

        if status.success() {
            Ok(())
        } else {
            Err(AlertError::Playback(format!(
                "{} exited with {}",
                self.player, status
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, TimeZone};

    fn event() -> AlarmEvent {
        AlarmEvent {
            timestamp: Local.with_ymd_and_hms(2024, 5, 1, 14, 3, 27).unwrap(),
            ear_value: 0.12,
        }
    }

    #[tokio::test]
    async fn test_log_appends_records() {
        let path = std::env::temp_dir().join(format!("drowsiness-{}.log", uuid::Uuid::new_v4()));
        let log = DrowsinessLog::new(&path);

        log.handle(&event()).await.unwrap();
        log.handle(&event()).await.unwrap();

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        tokio::fs::remove_file(&path).await.unwrap();
        assert_eq!(
            contents,
            "Drowsiness detected at: 2024-05-01 14:03:27\n\
             Drowsiness detected at: 2024-05-01 14:03:27\n"
        );
    }

    #[tokio::test]
    async fn test_log_reports_unwritable_path() {
        let path = std::env::temp_dir()
            .join(format!("missing-{}", uuid::Uuid::new_v4()))
            .join("drowsiness.log");
        let err = DrowsinessLog::new(path).handle(&event()).await.unwrap_err();
        assert!(matches!(err, AlertError::Io(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_sound_reports_player_status() {
        assert!(AlarmSound::new("true", "alarm.wav").handle(&event()).await.is_ok());

        let err = AlarmSound::new("false", "alarm.wav").handle(&event()).await.unwrap_err();
        assert!(matches!(err, AlertError::Playback(_)));
    }

    #[tokio::test]
    async fn test_sound_missing_player() {
        let sound = AlarmSound::new("definitely-not-an-audio-player", "alarm.wav").with_args(["-q"]);
        let err = sound.handle(&event()).await.unwrap_err();
        assert!(matches!(err, AlertError::Playback(_)));
    }
}

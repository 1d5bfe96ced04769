//! Engine configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Global engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Directory for per-job scratch files (downloaded sources, outputs).
    pub scratch_dir: PathBuf,

    /// Directory holding cursor sprite assets (`<style>.png`).
    pub sprites_dir: PathBuf,

    /// Transcoder settings.
    pub transcode: TranscodeConfig,

    /// Bounded-wait budgets.
    pub timeouts: TimeoutConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// External transcoder settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscodeConfig {
    /// ffmpeg binary name or path.
    pub ffmpeg: String,

    /// ffprobe binary name or path.
    pub ffprobe: String,

    /// x264 encoder preset.
    pub preset: String,

    /// x264 constant rate factor.
    pub crf: u32,
}

/// Bounded waits for network transfers and subprocess completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Source download budget in seconds.
    pub download_secs: u64,

    /// Result upload budget in seconds.
    pub upload_secs: u64,

    /// How long to wait for the encoder to drain after end-of-input.
    pub encoder_finish_secs: u64,

    /// Longest a single frame read or write may go without progress before
    /// the job is failed. Guards against a subprocess that hangs without
    /// exiting.
    pub frame_io_secs: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "recast=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            scratch_dir: std::env::temp_dir().join("recast"),
            sprites_dir: default_sprites_dir(),
            transcode: TranscodeConfig::default(),
            timeouts: TimeoutConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
            preset: "medium".to_string(),
            crf: 20,
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            download_secs: 600,
            upload_secs: 600,
            encoder_finish_secs: 120,
            frame_io_secs: 60,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl EngineConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        let config_path = config_file_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }
}

/// Standard config file location.
fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("recast").join("config.json")
}

/// Default sprite asset directory.
fn default_sprites_dir() -> PathBuf {
    let base = std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local").join("share")
        });
    base.join("recast").join("sprites")
}

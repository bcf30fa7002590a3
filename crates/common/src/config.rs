//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Default playback settings.
    pub playback: PlaybackDefaults,

    /// Default export settings.
    pub export: ExportDefaults,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Default playback parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackDefaults {
    /// Silence inserted between segments (seconds).
    pub delay_between_segments_secs: f64,

    /// Maximum rate of time-update notifications (Hz).
    pub time_update_hz: u32,

    /// Timeout for a single audio duration probe (seconds).
    pub probe_timeout_secs: f64,
}

/// Default export parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportDefaults {
    /// Base export resolution, e.g. "1920x1080".
    pub resolution: String,

    /// Project aspect ratio, e.g. "16:9".
    pub aspect_ratio: String,

    /// Frames per second.
    pub fps: u32,

    /// Output container/codec preset.
    pub format: String,

    /// Video bitrate in kbit/s.
    pub video_bitrate_kbps: u32,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "tilawa=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            playback: PlaybackDefaults::default(),
            export: ExportDefaults::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for PlaybackDefaults {
    fn default() -> Self {
        Self {
            delay_between_segments_secs: 1.0,
            time_update_hz: 30,
            probe_timeout_secs: 15.0,
        }
    }
}

impl Default for ExportDefaults {
    fn default() -> Self {
        Self {
            resolution: "1920x1080".to_string(),
            aspect_ratio: "16:9".to_string(),
            fps: 25,
            format: "mp4-h264".to_string(),
            video_bitrate_kbps: 8000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
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
    base.join("tilawa").join("config.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_round_trip() {
        let config = AppConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: AppConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.playback.delay_between_segments_secs, 1.0);
        assert_eq!(back.export.fps, 25);
        assert_eq!(back.export.resolution, "1920x1080");
    }
}

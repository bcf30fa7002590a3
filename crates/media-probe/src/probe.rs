//! Duration probe trait and the ffprobe-based implementation.

use std::process::Stdio;

use async_trait::async_trait;

use tilawa_common::error::{TilawaError, TilawaResult};
use tilawa_project_model::AudioRef;

/// Capability that measures the playable duration of an audio asset.
///
/// Implementations must be idempotent: probing the same reference twice
/// yields the same result (absent changes to the asset itself).
#[async_trait]
pub trait DurationProbe: Send + Sync {
    /// Measure the asset's playable duration in seconds.
    async fn probe(&self, audio: &AudioRef) -> TilawaResult<f64>;

    /// Probe name for logging.
    fn name(&self) -> &str;
}

/// Duration probe backed by the `ffprobe` binary.
///
/// Works for local files and for URLs (ffprobe handles the transport).
pub struct FfprobeDurationProbe {
    binary: String,
}

impl FfprobeDurationProbe {
    pub fn new() -> Self {
        Self {
            binary: "ffprobe".to_string(),
        }
    }

    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Check if the ffprobe binary is on PATH.
    pub fn is_available() -> bool {
        command_exists("ffprobe")
    }
}

impl Default for FfprobeDurationProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DurationProbe for FfprobeDurationProbe {
    async fn probe(&self, audio: &AudioRef) -> TilawaResult<f64> {
        let output = tokio::process::Command::new(&self.binary)
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "csv=p=0",
            ])
            .arg(audio.as_str())
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| TilawaError::probe(format!("Failed to run {}: {e}", self.binary)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TilawaError::probe(format!(
                "{} failed for {}: {}",
                self.binary,
                audio,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let seconds = stdout
            .trim()
            .lines()
            .next()
            .unwrap_or_default()
            .trim()
            .parse::<f64>()
            .map_err(|_| {
                TilawaError::probe(format!(
                    "Unexpected {} output for {}: {:?}",
                    self.binary,
                    audio,
                    stdout.trim()
                ))
            })?;

        if !seconds.is_finite() || seconds < 0.0 {
            return Err(TilawaError::probe(format!(
                "Invalid duration {seconds} for {audio}"
            )));
        }

        Ok(seconds)
    }

    fn name(&self) -> &str {
        "ffprobe"
    }
}

fn command_exists(binary: &str) -> bool {
    std::process::Command::new("sh")
        .arg("-c")
        .arg(format!("command -v {binary} >/dev/null 2>&1"))
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

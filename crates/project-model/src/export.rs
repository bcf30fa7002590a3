//! Export configuration: output formats, resolutions, and aspect-ratio
//! aware dimension derivation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Output container/codec preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExportFormat {
    Mp4H264,
    Mp4H265,
    Webm,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Mp4H264 => "mp4-h264",
            ExportFormat::Mp4H265 => "mp4-h265",
            ExportFormat::Webm => "webm",
        }
    }

    /// File extension for the container.
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Mp4H264 | ExportFormat::Mp4H265 => "mp4",
            ExportFormat::Webm => "webm",
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = ExportConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mp4-h264" | "mp4" | "h264" => Ok(ExportFormat::Mp4H264),
            "mp4-h265" | "h265" | "hevc" => Ok(ExportFormat::Mp4H265),
            "webm" | "vp9" => Ok(ExportFormat::Webm),
            other => Err(ExportConfigError::UnknownFormat(other.to_string())),
        }
    }
}

/// Errors from parsing export configuration strings.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExportConfigError {
    #[error("Unknown export format: {0}")]
    UnknownFormat(String),

    #[error("Invalid resolution (expected WIDTHxHEIGHT): {0}")]
    InvalidResolution(String),

    #[error("Invalid aspect ratio (expected W:H): {0}")]
    InvalidAspectRatio(String),
}

/// A base export resolution, e.g. 1920x1080.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl std::str::FromStr for Resolution {
    type Err = ExportConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .trim()
            .split_once(['x', 'X'])
            .ok_or_else(|| ExportConfigError::InvalidResolution(s.to_string()))?;
        let width = w
            .trim()
            .parse::<u32>()
            .map_err(|_| ExportConfigError::InvalidResolution(s.to_string()))?;
        let height = h
            .trim()
            .parse::<u32>()
            .map_err(|_| ExportConfigError::InvalidResolution(s.to_string()))?;
        if width == 0 || height == 0 {
            return Err(ExportConfigError::InvalidResolution(s.to_string()));
        }
        Ok(Resolution { width, height })
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A presentation aspect ratio, e.g. 16:9 or 9:16.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AspectRatio {
    pub w: u32,
    pub h: u32,
}

impl AspectRatio {
    pub const WIDESCREEN: AspectRatio = AspectRatio { w: 16, h: 9 };

    pub fn ratio(&self) -> f64 {
        self.w as f64 / self.h as f64
    }
}

impl std::str::FromStr for AspectRatio {
    type Err = ExportConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .trim()
            .split_once(':')
            .ok_or_else(|| ExportConfigError::InvalidAspectRatio(s.to_string()))?;
        let w = w
            .trim()
            .parse::<u32>()
            .map_err(|_| ExportConfigError::InvalidAspectRatio(s.to_string()))?;
        let h = h
            .trim()
            .parse::<u32>()
            .map_err(|_| ExportConfigError::InvalidAspectRatio(s.to_string()))?;
        if w == 0 || h == 0 {
            return Err(ExportConfigError::InvalidAspectRatio(s.to_string()));
        }
        Ok(AspectRatio { w, h })
    }
}

impl std::fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.w, self.h)
    }
}

/// Final output dimensions for a base resolution and a presentation
/// aspect ratio.
///
/// When the ratios match in magnitude (directly or orientation-swapped),
/// the base resolution is used, swapping width and height for a
/// portrait presentation on a landscape base and vice versa. Otherwise
/// the presentation's larger axis is fitted to the base resolution and
/// the other axis derived from the ratio. Both dimensions are rounded up
/// to even values for codec compatibility.
pub fn export_dimensions(base: Resolution, aspect: AspectRatio) -> Resolution {
    let project_ar = aspect.ratio();
    let export_ar = base.width as f64 / base.height as f64;

    let (mut width, mut height) = if (project_ar - export_ar).abs() < 0.01
        || (project_ar - 1.0 / export_ar).abs() < 0.01
    {
        if (project_ar < 1.0 && export_ar > 1.0) || (project_ar > 1.0 && export_ar < 1.0) {
            (base.height, base.width)
        } else {
            (base.width, base.height)
        }
    } else if project_ar > 1.0 {
        let derived = (base.width as f64 * aspect.h as f64 / aspect.w as f64).round() as u32;
        (base.width, derived)
    } else {
        let derived = (base.height as f64 * aspect.w as f64 / aspect.h as f64).round() as u32;
        (derived, base.height)
    };

    if width % 2 != 0 {
        width += 1;
    }
    if height % 2 != 0 {
        height += 1;
    }

    Resolution { width, height }
}

/// Full export configuration handed to the frame export engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Output container/codec preset.
    pub format: ExportFormat,

    /// Output width in pixels.
    pub width: u32,

    /// Output height in pixels.
    pub height: u32,

    /// Frames per second.
    pub fps: u32,

    /// Video bitrate in kbit/s.
    pub video_bitrate_kbps: u32,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            format: ExportFormat::Mp4H264,
            width: 1920,
            height: 1080,
            fps: 25,
            video_bitrate_kbps: 8000,
        }
    }
}

impl ExportConfig {
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_parsing() {
        assert_eq!("mp4-h264".parse::<ExportFormat>(), Ok(ExportFormat::Mp4H264));
        assert_eq!("WEBM".parse::<ExportFormat>(), Ok(ExportFormat::Webm));
        assert!("avi".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn test_resolution_parsing() {
        let res: Resolution = "1920x1080".parse().unwrap();
        assert_eq!(res.width, 1920);
        assert_eq!(res.height, 1080);
        assert!("1920".parse::<Resolution>().is_err());
        assert!("0x1080".parse::<Resolution>().is_err());
    }

    #[test]
    fn test_matching_orientation_keeps_base() {
        let dims = export_dimensions("1920x1080".parse().unwrap(), AspectRatio::WIDESCREEN);
        assert_eq!(dims, Resolution { width: 1920, height: 1080 });
    }

    #[test]
    fn test_portrait_project_swaps_landscape_base() {
        let dims = export_dimensions(
            "1920x1080".parse().unwrap(),
            "9:16".parse::<AspectRatio>().unwrap(),
        );
        assert_eq!(dims, Resolution { width: 1080, height: 1920 });
    }

    #[test]
    fn test_mismatched_ratio_derives_other_axis() {
        // Square presentation on a 16:9 base: the base height rules and
        // the width is derived from the ratio.
        let dims = export_dimensions(
            "1920x1080".parse().unwrap(),
            "1:1".parse::<AspectRatio>().unwrap(),
        );
        assert_eq!(dims, Resolution { width: 1080, height: 1080 });
    }

    #[test]
    fn test_dimensions_are_even() {
        let dims = export_dimensions(
            "854x480".parse().unwrap(),
            "4:3".parse::<AspectRatio>().unwrap(),
        );
        assert_eq!(dims.width % 2, 0);
        assert_eq!(dims.height % 2, 0);
    }
}

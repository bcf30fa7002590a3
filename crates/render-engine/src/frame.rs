//! Frame buffers and the renderer seam.

use tilawa_common::error::{TilawaError, TilawaResult};
use tilawa_project_model::ActiveSegment;

/// One rendered frame: tightly packed RGB24 pixels, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl FrameBuffer {
    /// Bytes per RGB24 frame at the given dimensions.
    pub fn byte_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * 3
    }

    /// A frame filled with a single color.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let mut data = Vec::with_capacity(Self::byte_len(width, height));
        for _ in 0..(width as usize * height as usize) {
            data.extend_from_slice(&rgb);
        }
        Self {
            width,
            height,
            data,
        }
    }
}

/// Trait for frame renderers.
///
/// The engine decides *what* is on screen (the active segment and the
/// offsets into it); the renderer decides *how* it looks. Renderers may
/// load assets internally but must return a complete frame or fail —
/// the engine handles per-frame failures with one fallback retry.
pub trait FrameRenderer: Send {
    /// Render the frame for `time_secs`. `context` is `None` for an
    /// empty timeline position or when the engine retries a failed
    /// frame with neutral, background-only content.
    fn render(
        &mut self,
        context: Option<&ActiveSegment<'_>>,
        time_secs: f64,
        dimensions: (u32, u32),
    ) -> TilawaResult<FrameBuffer>;

    /// Renderer name for logging.
    fn name(&self) -> &str;
}

/// Minimal renderer producing flat background-color frames.
///
/// This is the neutral fallback context made concrete, and the default
/// renderer for headless exports; composing text onto the background is
/// a richer renderer's job.
pub struct SolidColorRenderer {
    rgb: [u8; 3],
}

impl SolidColorRenderer {
    pub fn new(rgb: [u8; 3]) -> Self {
        Self { rgb }
    }

    /// Parse a `#RRGGBB` hex color.
    pub fn from_hex(hex: &str) -> TilawaResult<Self> {
        Ok(Self {
            rgb: parse_hex_color(hex)?,
        })
    }
}

impl Default for SolidColorRenderer {
    fn default() -> Self {
        Self { rgb: [0, 0, 0] }
    }
}

impl FrameRenderer for SolidColorRenderer {
    fn render(
        &mut self,
        _context: Option<&ActiveSegment<'_>>,
        _time_secs: f64,
        dimensions: (u32, u32),
    ) -> TilawaResult<FrameBuffer> {
        let (width, height) = dimensions;
        Ok(FrameBuffer::filled(width, height, self.rgb))
    }

    fn name(&self) -> &str {
        "solid-color"
    }
}

/// Parse a `#RRGGBB` (or `RRGGBB`) hex color string.
pub fn parse_hex_color(hex: &str) -> TilawaResult<[u8; 3]> {
    let digits = hex.trim().trim_start_matches('#');
    if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(TilawaError::render(format!(
            "Invalid hex color (expected #RRGGBB): {hex}"
        )));
    }
    let mut rgb = [0u8; 3];
    for (i, chunk) in rgb.iter_mut().enumerate() {
        *chunk = u8::from_str_radix(&digits[i * 2..i * 2 + 2], 16)
            .map_err(|_| TilawaError::render(format!("Invalid hex color: {hex}")))?;
    }
    Ok(rgb)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_buffer_filled() {
        let frame = FrameBuffer::filled(4, 2, [10, 20, 30]);
        assert_eq!(frame.data.len(), FrameBuffer::byte_len(4, 2));
        assert_eq!(&frame.data[0..3], &[10, 20, 30]);
        assert_eq!(&frame.data[frame.data.len() - 3..], &[10, 20, 30]);
    }

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#1a2B3c").unwrap(), [0x1a, 0x2b, 0x3c]);
        assert_eq!(parse_hex_color("000000").unwrap(), [0, 0, 0]);
        assert!(parse_hex_color("#fff").is_err());
        assert!(parse_hex_color("#zzzzzz").is_err());
    }

    #[test]
    fn test_solid_renderer_ignores_context() {
        let mut renderer = SolidColorRenderer::from_hex("#102030").unwrap();
        let frame = renderer.render(None, 1.25, (8, 8)).unwrap();
        assert_eq!(frame.width, 8);
        assert_eq!(&frame.data[0..3], &[0x10, 0x20, 0x30]);
    }
}

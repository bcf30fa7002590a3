//! Audio sink abstraction.
//!
//! The playback driver is the sole owner of its sink's lifecycle. Real
//! implementations wrap an audio output device or a browser-style media
//! element; tests use scripted fakes.

use tilawa_common::error::TilawaResult;
use tilawa_project_model::AudioRef;

/// Asynchronous signals surfaced by an audio sink.
///
/// Sinks buffer their signals and the driver drains them on each
/// service tick, mirroring a poll-based input backend.
#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    /// The loaded asset is ready for playback.
    Ready,
    /// The current asset played to its natural end.
    Ended,
    /// The sink failed to load or play the current asset.
    Error(String),
}

/// Trait for a live audio output.
pub trait AudioSink: Send {
    /// Begin loading an asset. Completion is signalled via
    /// `SinkEvent::Ready` (or `SinkEvent::Error`).
    fn load(&mut self, audio: &AudioRef) -> TilawaResult<()>;

    /// Start or resume playback of the loaded asset.
    fn play(&mut self) -> TilawaResult<()>;

    /// Pause playback, keeping the current position.
    fn pause(&mut self) -> TilawaResult<()>;

    /// Move the intra-asset position, saturating at the asset's real
    /// duration.
    fn seek(&mut self, position_secs: f64) -> TilawaResult<()>;

    /// Current intra-asset position in seconds.
    fn position_secs(&self) -> f64;

    /// Real duration of the loaded asset, once known.
    fn duration_secs(&self) -> Option<f64>;

    /// Drain the next pending event, if any.
    fn poll_event(&mut self) -> Option<SinkEvent>;

    /// Stop playback and release the loaded asset.
    fn clear(&mut self);
}

//! Segment types: one recited verse per segment.

use serde::{Deserialize, Serialize};

/// Reference to a segment's audio asset (URL or filesystem path).
///
/// The engine never interprets the contents; probes and sinks decide how
/// to open it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AudioRef(String);

impl AudioRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the reference is present at all.
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl std::fmt::Display for AudioRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AudioRef {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for AudioRef {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Resolution status of a segment's audio duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationState {
    /// No probe has run yet; duration defaults to zero.
    #[default]
    Unresolved,
    /// A probe reported a playable duration.
    Resolved,
    /// The probe failed or timed out; duration stays zero but the
    /// segment still occupies the timeline.
    Failed,
}

/// One recited verse: identity, payloads, audio reference, and the
/// mutable timing fields filled in by the resolver and the timeline
/// builder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Surah number (1-114).
    pub surah: u16,

    /// Verse number within the surah.
    pub number_in_surah: u16,

    /// Global verse number across the whole text.
    pub number: u32,

    /// Arabic verse text.
    pub text: String,

    /// Optional translation payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation: Option<String>,

    /// Audio asset reference for this recitation.
    pub audio: AudioRef,

    /// Playable duration in seconds. Zero until resolved.
    #[serde(default)]
    pub duration_secs: f64,

    /// Diagnostic flag describing how `duration_secs` was obtained.
    #[serde(default)]
    pub duration_state: DurationState,

    /// Absolute start offset on the timeline, computed by the builder.
    #[serde(default)]
    pub start_secs: f64,
}

impl Segment {
    pub fn new(
        surah: u16,
        number_in_surah: u16,
        number: u32,
        text: impl Into<String>,
        audio: impl Into<AudioRef>,
    ) -> Self {
        Self {
            surah,
            number_in_surah,
            number,
            text: text.into(),
            translation: None,
            audio: audio.into(),
            duration_secs: 0.0,
            duration_state: DurationState::Unresolved,
            start_secs: 0.0,
        }
    }

    pub fn with_translation(mut self, translation: impl Into<String>) -> Self {
        self.translation = Some(translation.into());
        self
    }

    pub fn with_duration(mut self, duration_secs: f64) -> Self {
        self.duration_secs = duration_secs;
        self.duration_state = DurationState::Resolved;
        self
    }

    /// Replace the audio reference, e.g. after a reciter switch.
    ///
    /// The duration becomes unresolved again so the next probe batch
    /// re-measures it.
    pub fn set_audio(&mut self, audio: impl Into<AudioRef>) {
        self.audio = audio.into();
        self.duration_secs = 0.0;
        self.duration_state = DurationState::Unresolved;
    }

    /// End offset on the timeline (start + duration).
    pub fn end_secs(&self) -> f64 {
        self.start_secs + self.duration_secs
    }

    /// Short human label, e.g. "2:255".
    pub fn label(&self) -> String {
        format!("{}:{}", self.surah, self.number_in_surah)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_audio_resets_duration() {
        let mut segment =
            Segment::new(1, 1, 1, "text", "https://audio.example/1.mp3").with_duration(4.5);
        assert_eq!(segment.duration_state, DurationState::Resolved);

        segment.set_audio("https://audio.example/other-reciter/1.mp3");
        assert_eq!(segment.duration_secs, 0.0);
        assert_eq!(segment.duration_state, DurationState::Unresolved);
    }

    #[test]
    fn test_serde_defaults_for_timing_fields() {
        let json = r#"{
            "surah": 2,
            "number_in_surah": 255,
            "number": 262,
            "text": "...",
            "audio": "https://audio.example/262.mp3"
        }"#;
        let segment: Segment = serde_json::from_str(json).unwrap();
        assert_eq!(segment.duration_secs, 0.0);
        assert_eq!(segment.duration_state, DurationState::Unresolved);
        assert_eq!(segment.start_secs, 0.0);
        assert!(segment.translation.is_none());
    }

    #[test]
    fn test_label() {
        let segment = Segment::new(2, 255, 262, "...", "a.mp3");
        assert_eq!(segment.label(), "2:255");
    }
}

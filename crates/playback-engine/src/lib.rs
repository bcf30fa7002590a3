//! Tilawa Playback Engine
//!
//! Drives live, audio-led playback of a timeline. The driver owns a
//! pluggable audio sink, advances across segment boundaries (including
//! the silent inter-segment delay, during which the visual holds the
//! finished segment), exposes seek/scrub and next/previous navigation,
//! and emits its own authoritative current-time signal.
//!
//! A bad asset never stalls the session: a load error is treated as the
//! natural end of that segment, surfaced as a non-fatal notification,
//! and playback moves on.

pub mod driver;
pub mod sink;

pub use driver::*;
pub use sink::*;

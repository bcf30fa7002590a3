//! Tilawa Media Probe
//!
//! Resolves the playable duration of each segment's audio asset. Probes
//! are issued concurrently and awaited as a batch, so total latency is
//! bounded by the slowest single asset rather than the sum of all of
//! them. A failed or timed-out probe yields a zero duration and a
//! diagnostic outcome — never an error: the timeline must stay buildable
//! with whatever durations could be resolved.
//!
//! The probe itself is an injected capability (`DurationProbe`), which
//! keeps batch resolution deterministic in tests and lets the CLI plug
//! in the `ffprobe`-based implementation.

pub mod probe;
pub mod resolver;

pub use probe::*;
pub use resolver::*;

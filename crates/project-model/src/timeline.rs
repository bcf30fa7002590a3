//! Timeline construction: folding segment durations and the
//! inter-segment delay into absolute start offsets.

use serde::{Deserialize, Serialize};

use crate::segment::Segment;

/// The cumulative time layout of a presentation.
///
/// A timeline is a derived value: `build_timeline` consumes a segment
/// list and returns a fresh, effectively-immutable layout. Any change to
/// the segment list, a duration, or the delay requires a rebuild — there
/// is no in-place patching, which is what lets live playback and an
/// in-flight export share a timeline (via `Arc`) without interference.
///
/// Invariants, for segments `0..n`:
/// - `segments[0].start_secs == 0`
/// - `segments[i].start_secs == segments[i-1].end() + delay` for `i > 0`
/// - `total_duration == segments[n-1].end()`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    segments: Vec<Segment>,
    inter_segment_delay: f64,
    total_duration: f64,
}

/// Build a timeline from a segment list and an inter-segment delay.
///
/// Pure and synchronous; call it after every duration-resolution batch
/// and after any edit to the segment selection or the delay. An empty
/// segment list is a valid input and yields a zero-duration timeline.
///
/// Durations are normalized to finite, non-negative values before the
/// fold so a failed probe (0.0) or a bogus value can never corrupt the
/// start offsets.
pub fn build_timeline(mut segments: Vec<Segment>, inter_segment_delay: f64) -> Timeline {
    let delay = if inter_segment_delay.is_finite() && inter_segment_delay >= 0.0 {
        inter_segment_delay
    } else {
        tracing::warn!(
            delay = inter_segment_delay,
            "Invalid inter-segment delay; clamping to 0"
        );
        0.0
    };

    let count = segments.len();
    let mut accumulated = 0.0;
    for (i, segment) in segments.iter_mut().enumerate() {
        if !segment.duration_secs.is_finite() || segment.duration_secs < 0.0 {
            tracing::debug!(
                segment = %segment.label(),
                duration = segment.duration_secs,
                "Normalizing invalid segment duration to 0"
            );
            segment.duration_secs = 0.0;
        }
        segment.start_secs = accumulated;
        accumulated += segment.duration_secs;
        if i + 1 < count {
            accumulated += delay;
        }
    }

    Timeline {
        segments,
        inter_segment_delay: delay,
        total_duration: accumulated,
    }
}

impl Timeline {
    /// An empty, zero-duration timeline ("nothing selected yet").
    pub fn empty() -> Self {
        build_timeline(Vec::new(), 0.0)
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn segment(&self, index: usize) -> Option<&Segment> {
        self.segments.get(index)
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn inter_segment_delay(&self) -> f64 {
        self.inter_segment_delay
    }

    pub fn total_duration(&self) -> f64 {
        self.total_duration
    }

    /// Delay that follows segment `index`: the inter-segment delay for
    /// all but the last segment, which has none.
    pub fn delay_after(&self, index: usize) -> f64 {
        if index + 1 < self.segments.len() {
            self.inter_segment_delay
        } else {
            0.0
        }
    }

    /// The half-open display window `[start, end)` of segment `index`,
    /// covering its audio plus its trailing delay.
    pub fn display_window(&self, index: usize) -> Option<(f64, f64)> {
        let segment = self.segments.get(index)?;
        let start = segment.start_secs;
        let end = start + segment.duration_secs + self.delay_after(index);
        Some((start, end))
    }
}

impl Default for Timeline {
    fn default() -> Self {
        Self::empty()
    }
}

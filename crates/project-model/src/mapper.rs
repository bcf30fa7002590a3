//! Time-to-content mapping: which segment is active at a timeline
//! position, and how far into it.
//!
//! Both the live playback driver and the frame export engine resolve
//! on-screen content through this single lookup, which is what keeps a
//! live preview and an exported video in agreement.

use crate::segment::Segment;
use crate::timeline::Timeline;

/// The segment active at a queried timeline position.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveSegment<'a> {
    /// The active segment.
    pub segment: &'a Segment,

    /// Index of the segment in the timeline.
    pub index: usize,

    /// Seconds since the segment's audio started. Uncapped while inside
    /// the segment's display window: during the trailing delay this
    /// exceeds the audio duration, which callers read as "hold the last
    /// frame". Clamped to the audio duration at and past the end of the
    /// timeline.
    pub offset_into_audio: f64,

    /// Seconds since the segment's display window opened.
    pub offset_into_window: f64,
}

impl ActiveSegment<'_> {
    /// Whether the audio has finished and the visual is holding its
    /// last frame (trailing delay or end of timeline).
    pub fn is_holding(&self) -> bool {
        self.offset_into_audio >= self.segment.duration_secs
    }
}

/// Map an absolute timeline position to its active segment.
///
/// Each segment owns the half-open display window
/// `[start, start + duration + delay_after)`. Positions at or past the
/// total duration resolve to the last segment with the audio offset
/// clamped to its duration ("hold at end"). Negative positions and empty
/// timelines map to `None`.
///
/// Deterministic and side-effect-free: identical inputs always produce
/// identical outputs, which is what makes frame export reproducible.
pub fn map_time(timeline: &Timeline, t: f64) -> Option<ActiveSegment<'_>> {
    if timeline.is_empty() || !t.is_finite() || t < 0.0 {
        return None;
    }

    for (index, segment) in timeline.segments().iter().enumerate() {
        let window_start = segment.start_secs;
        let window_end = window_start + segment.duration_secs + timeline.delay_after(index);
        if t >= window_start && t < window_end {
            let offset = t - window_start;
            return Some(ActiveSegment {
                segment,
                index,
                offset_into_audio: offset,
                offset_into_window: offset,
            });
        }
    }

    // At or past the end: hold the last segment at its final audio frame.
    if t >= timeline.total_duration() {
        let index = timeline.len() - 1;
        let segment = timeline.segment(index)?;
        return Some(ActiveSegment {
            segment,
            index,
            offset_into_audio: segment.duration_secs,
            offset_into_window: segment.duration_secs,
        });
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::build_timeline;

    fn two_segment_timeline() -> Timeline {
        // Durations [5, 3], delay 1: starts [0, 6], total 9.
        let segments = vec![
            Segment::new(1, 1, 1, "first", "a.mp3").with_duration(5.0),
            Segment::new(1, 2, 2, "second", "b.mp3").with_duration(3.0),
        ];
        build_timeline(segments, 1.0)
    }

    #[test]
    fn test_maps_inside_audio() {
        let timeline = two_segment_timeline();
        let active = map_time(&timeline, 2.5).unwrap();
        assert_eq!(active.index, 0);
        assert_eq!(active.offset_into_audio, 2.5);
        assert!(!active.is_holding());
    }

    #[test]
    fn test_trailing_delay_holds_previous_segment() {
        let timeline = two_segment_timeline();
        // t = 5.5 is past segment 0's audio but inside its delay window.
        let active = map_time(&timeline, 5.5).unwrap();
        assert_eq!(active.index, 0);
        assert_eq!(active.offset_into_audio, 5.5);
        assert!(active.is_holding());
    }

    #[test]
    fn test_window_boundary_starts_next_segment() {
        let timeline = two_segment_timeline();
        let active = map_time(&timeline, 6.0).unwrap();
        assert_eq!(active.index, 1);
        assert_eq!(active.offset_into_audio, 0.0);
    }

    #[test]
    fn test_end_clamps_to_last_segment() {
        let timeline = two_segment_timeline();
        for t in [9.0, 9.1, 1000.0] {
            let active = map_time(&timeline, t).unwrap();
            assert_eq!(active.index, 1);
            assert_eq!(active.offset_into_audio, 3.0);
            assert!(active.is_holding());
        }
    }

    #[test]
    fn test_negative_and_empty_map_to_none() {
        let timeline = two_segment_timeline();
        assert!(map_time(&timeline, -0.001).is_none());
        assert!(map_time(&Timeline::empty(), 0.0).is_none());
        assert!(map_time(&Timeline::empty(), 5.0).is_none());
    }

    #[test]
    fn test_non_finite_position_maps_to_none() {
        let timeline = two_segment_timeline();
        assert!(map_time(&timeline, f64::NAN).is_none());
        assert!(map_time(&timeline, f64::INFINITY).is_none());
    }

    #[test]
    fn test_zero_duration_segment_is_skipped_unless_delayed() {
        // A zero-duration segment with zero delay has an empty window;
        // its neighbor owns the boundary instant.
        let segments = vec![
            Segment::new(1, 1, 1, "first", "a.mp3").with_duration(2.0),
            Segment::new(1, 2, 2, "broken", "b.mp3"),
            Segment::new(1, 3, 3, "third", "c.mp3").with_duration(2.0),
        ];
        let timeline = build_timeline(segments, 0.0);
        let active = map_time(&timeline, 2.0).unwrap();
        assert_eq!(active.index, 2);

        // With a delay the zero-duration segment still gets a window.
        let segments = vec![
            Segment::new(1, 1, 1, "first", "a.mp3").with_duration(2.0),
            Segment::new(1, 2, 2, "broken", "b.mp3"),
            Segment::new(1, 3, 3, "third", "c.mp3").with_duration(2.0),
        ];
        let timeline = build_timeline(segments, 1.0);
        let active = map_time(&timeline, 3.5).unwrap();
        assert_eq!(active.index, 1);
        assert!(active.is_holding());
    }

    #[test]
    fn test_deterministic() {
        let timeline = two_segment_timeline();
        let a = map_time(&timeline, 5.5).unwrap();
        let b = map_time(&timeline, 5.5).unwrap();
        assert_eq!(a, b);
    }
}

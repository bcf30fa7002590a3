use proptest::prelude::*;

use tilawa_project_model::{build_timeline, map_time, Segment};

fn segments_from_durations(durations: &[f64]) -> Vec<Segment> {
    durations
        .iter()
        .enumerate()
        .map(|(i, d)| {
            Segment::new(1, i as u16 + 1, i as u32 + 1, format!("verse {i}"), "a.mp3")
                .with_duration(*d)
        })
        .collect()
}

proptest! {
    /// start[0] == 0; start[i] == start[i-1] + dur[i-1] + delay;
    /// total == start[last] + dur[last].
    #[test]
    fn start_time_fold_invariant(
        durations in prop::collection::vec(0.0f64..600.0, 1..24),
        delay in 0.0f64..30.0,
    ) {
        let timeline = build_timeline(segments_from_durations(&durations), delay);
        let segments = timeline.segments();

        prop_assert_eq!(segments[0].start_secs, 0.0);
        for i in 1..segments.len() {
            let expected = segments[i - 1].start_secs + segments[i - 1].duration_secs + delay;
            prop_assert!((segments[i].start_secs - expected).abs() < 1e-9);
        }

        let last = &segments[segments.len() - 1];
        prop_assert!((timeline.total_duration() - (last.start_secs + last.duration_secs)).abs() < 1e-9);
    }

    /// Rebuilding from unchanged inputs reproduces bit-identical offsets.
    #[test]
    fn rebuild_is_bit_identical(
        durations in prop::collection::vec(0.0f64..600.0, 1..24),
        delay in 0.0f64..30.0,
    ) {
        let first = build_timeline(segments_from_durations(&durations), delay);
        let second = build_timeline(first.segments().to_vec(), first.inter_segment_delay());

        for (a, b) in first.segments().iter().zip(second.segments()) {
            prop_assert_eq!(a.start_secs.to_bits(), b.start_secs.to_bits());
        }
        prop_assert_eq!(first.total_duration().to_bits(), second.total_duration().to_bits());
    }

    /// map_time is total on [0, total_duration] and deterministic.
    #[test]
    fn map_time_total_and_deterministic(
        durations in prop::collection::vec(0.0f64..600.0, 1..24),
        delay in 0.0f64..30.0,
        fraction in 0.0f64..=1.0,
    ) {
        let timeline = build_timeline(segments_from_durations(&durations), delay);
        let t = timeline.total_duration() * fraction;

        let first = map_time(&timeline, t);
        prop_assert!(first.is_some());
        let second = map_time(&timeline, t);
        prop_assert_eq!(first, second);
    }

    /// At and past the end, the mapper holds the last segment with the
    /// audio offset clamped to its duration.
    #[test]
    fn map_time_clamps_at_end(
        durations in prop::collection::vec(0.0f64..600.0, 1..24),
        delay in 0.0f64..30.0,
        epsilon in 0.0f64..100.0,
    ) {
        let timeline = build_timeline(segments_from_durations(&durations), delay);
        let last_index = timeline.len() - 1;
        let last_duration = timeline.segment(last_index).unwrap().duration_secs;

        let at_end = map_time(&timeline, timeline.total_duration()).unwrap();
        prop_assert_eq!(at_end.index, last_index);
        prop_assert_eq!(at_end.offset_into_audio, last_duration);

        let past_end = map_time(&timeline, timeline.total_duration() + epsilon).unwrap();
        prop_assert_eq!(past_end.index, last_index);
        prop_assert_eq!(past_end.offset_into_audio, last_duration);
    }

    /// The active segment's display window always contains the queried
    /// position (below the end clamp).
    #[test]
    fn mapped_window_contains_position(
        durations in prop::collection::vec(0.01f64..600.0, 1..24),
        delay in 0.0f64..30.0,
        fraction in 0.0f64..1.0,
    ) {
        let timeline = build_timeline(segments_from_durations(&durations), delay);
        let t = timeline.total_duration() * fraction;

        let active = map_time(&timeline, t).unwrap();
        let (start, end) = timeline.display_window(active.index).unwrap();
        prop_assert!(t >= start && t < end);
        prop_assert!((active.offset_into_window - (t - start)).abs() < 1e-9);
    }
}

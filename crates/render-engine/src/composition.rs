//! Frame composition planning: the deterministic mapping from frame
//! indices to on-screen content.
//!
//! The export loop derives each frame's content from the same
//! `map_time` lookup live playback uses; this module exposes that plan
//! as plain data so frame-accuracy can be verified without rendering a
//! single pixel.

use serde::Serialize;

use tilawa_project_model::{map_time, Timeline};

/// Content instructions for a single exported frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameComposition {
    /// Frame number.
    pub frame_index: u64,

    /// Time in seconds.
    pub time_secs: f64,

    /// Active segment, or `None` on an empty timeline.
    pub segment: Option<SegmentFrame>,
}

/// The segment-derived part of a frame's composition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentFrame {
    /// Index of the active segment.
    pub index: usize,

    /// Seconds into the segment's audio (uncapped during the trailing
    /// delay window).
    pub offset_into_audio: f64,

    /// Seconds into the segment's display window.
    pub offset_into_window: f64,

    /// Whether the audio has finished and the frame holds the
    /// segment's last visual state.
    pub holding: bool,
}

/// Number of frames needed to cover `total_duration` at `fps`.
pub fn total_frames(total_duration: f64, fps: u32) -> u64 {
    (total_duration * fps.max(1) as f64).ceil() as u64
}

/// Timestamp of a frame at the given rate.
pub fn frame_time(frame_index: u64, fps: u32) -> f64 {
    frame_index as f64 / fps.max(1) as f64
}

/// Compute the composition of one frame.
pub fn compute_composition(timeline: &Timeline, frame_index: u64, fps: u32) -> FrameComposition {
    let time_secs = frame_time(frame_index, fps);
    let segment = map_time(timeline, time_secs).map(|active| SegmentFrame {
        index: active.index,
        offset_into_audio: active.offset_into_audio,
        offset_into_window: active.offset_into_window,
        holding: active.is_holding(),
    });

    FrameComposition {
        frame_index,
        time_secs,
        segment,
    }
}

/// Compute the full composition plan for an export.
pub fn compute_compositions(timeline: &Timeline, fps: u32) -> Vec<FrameComposition> {
    let count = total_frames(timeline.total_duration(), fps);
    let mut compositions = Vec::with_capacity(count as usize);
    for frame in 0..count {
        compositions.push(compute_composition(timeline, frame, fps));
    }
    compositions
}

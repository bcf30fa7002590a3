//! Show a segment list and its computed timeline.

use std::path::PathBuf;

use tilawa_project_model::{build_timeline, DurationState};
use tilawa_render_engine::total_frames;

use super::ProjectFile;

pub fn run(path: PathBuf, fps: u32) -> anyhow::Result<()> {
    let file = ProjectFile::load(&path)?;
    let timeline = build_timeline(file.segments.clone(), file.delay_between_segments);

    println!("Project: {}", file.display_name());
    println!("  Segments: {}", timeline.len());
    println!("  Inter-segment delay: {:.2}s", timeline.inter_segment_delay());
    println!("  Total duration: {:.2}s", timeline.total_duration());
    println!("  Frames at {fps} fps: {}", total_frames(timeline.total_duration(), fps));
    println!();

    if timeline.is_empty() {
        println!("  (no segments selected)");
        return Ok(());
    }

    println!("  {:<6} {:<8} {:>9} {:>9} {:>12}", "#", "verse", "start", "duration", "state");
    for (index, segment) in timeline.segments().iter().enumerate() {
        let state = match segment.duration_state {
            DurationState::Resolved => "resolved",
            DurationState::Unresolved => "unresolved",
            DurationState::Failed => "failed",
        };
        println!(
            "  {:<6} {:<8} {:>8.2}s {:>8.2}s {:>12}",
            index,
            segment.label(),
            segment.start_secs,
            segment.duration_secs,
            state
        );
    }

    Ok(())
}

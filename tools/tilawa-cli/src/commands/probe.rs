//! Resolve audio durations with ffprobe.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tilawa_media_probe::{resolve_durations, FfprobeDurationProbe};
use tilawa_project_model::build_timeline;

use super::ProjectFile;

pub async fn run(path: PathBuf, timeout_secs: u64, write: bool) -> anyhow::Result<()> {
    let mut file = ProjectFile::load(&path)?;
    if file.segments.is_empty() {
        println!("No segments to probe.");
        return Ok(());
    }

    if !FfprobeDurationProbe::is_available() {
        return Err(anyhow::anyhow!("ffprobe not found on PATH"));
    }

    println!(
        "Probing {} segments (timeout {timeout_secs}s each)...",
        file.segments.len()
    );

    let probe = Arc::new(FfprobeDurationProbe::new());
    let report = resolve_durations(
        &file.segments,
        probe,
        Duration::from_secs(timeout_secs),
        Some(Box::new(|done, total| {
            print!("\r  Resolving durations: {done}/{total}  ");
        })),
    )
    .await;
    println!();

    report.apply(&mut file.segments);
    for (index, reason) in report.failures() {
        println!("  Segment {index} failed: {reason}");
    }

    let timeline = build_timeline(file.segments.clone(), file.delay_between_segments);
    println!(
        "Resolved {}/{} segments; total duration {:.2}s",
        report.resolved_count(),
        timeline.len(),
        timeline.total_duration()
    );

    if write {
        let resolved = ProjectFile {
            name: file.name.clone(),
            delay_between_segments: file.delay_between_segments,
            segments: timeline.segments().to_vec(),
        };
        resolved.save(&path)?;
        println!("Wrote resolved durations to {}", path.display());
    }

    Ok(())
}

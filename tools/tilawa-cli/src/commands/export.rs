//! Export a timeline to video.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tilawa_common::config::AppConfig;
use tilawa_media_probe::{resolve_durations, FfprobeDurationProbe};
use tilawa_project_model::{
    build_timeline, export_dimensions, AspectRatio, DurationState, ExportConfig, ExportFormat,
    Resolution,
};
use tilawa_render_engine::{
    run_export, ExportHandle, ExportJob, ExportProgress, FfmpegEncodeSink, SolidColorRenderer,
};

use super::ProjectFile;

#[allow(clippy::too_many_arguments)]
pub async fn run(
    path: PathBuf,
    output: Option<PathBuf>,
    format: String,
    resolution: String,
    aspect_ratio: String,
    fps: u32,
    background: String,
    probe: bool,
) -> anyhow::Result<()> {
    let app_config = AppConfig::load();
    let mut file = ProjectFile::load(&path)?;
    if file.segments.is_empty() {
        return Err(anyhow::anyhow!("No segments selected; nothing to export"));
    }

    let export_format: ExportFormat = format
        .parse()
        .map_err(|e| anyhow::anyhow!("{e}. Use: mp4-h264, mp4-h265, webm"))?;
    let base: Resolution = resolution.parse().map_err(|e| anyhow::anyhow!("{e}"))?;
    let aspect: AspectRatio = aspect_ratio.parse().map_err(|e| anyhow::anyhow!("{e}"))?;

    let needs_probe = file
        .segments
        .iter()
        .any(|s| s.duration_state == DurationState::Unresolved);
    if needs_probe {
        if !probe {
            return Err(anyhow::anyhow!(
                "Segment durations are unresolved; run `tilawa probe` first or pass --probe"
            ));
        }
        if !FfprobeDurationProbe::is_available() {
            return Err(anyhow::anyhow!("ffprobe not found on PATH"));
        }
        let report = resolve_durations(
            &file.segments,
            Arc::new(FfprobeDurationProbe::new()),
            Duration::from_secs_f64(app_config.playback.probe_timeout_secs),
            None,
        )
        .await;
        report.apply(&mut file.segments);
        for (index, reason) in report.failures() {
            println!("  Segment {index} unresolved: {reason}");
        }
    }

    let timeline = Arc::new(build_timeline(
        file.segments.clone(),
        file.delay_between_segments,
    ));

    if !FfmpegEncodeSink::is_available() {
        return Err(anyhow::anyhow!("ffmpeg not found on PATH"));
    }

    let dims = export_dimensions(base, aspect);
    let output_path = output.unwrap_or_else(|| {
        path.with_file_name(format!(
            "{}.{}",
            file.display_name().replace(' ', "_"),
            export_format.extension()
        ))
    });

    let config = ExportConfig {
        format: export_format,
        width: dims.width,
        height: dims.height,
        fps,
        video_bitrate_kbps: app_config.export.video_bitrate_kbps,
    };

    println!("Exporting: {}", file.display_name());
    println!("  Output: {}", output_path.display());
    println!("  Format: {export_format}");
    println!("  Resolution: {dims} @ {fps}fps");
    println!("  Duration: {:.2}s", timeline.total_duration());

    let job = ExportJob::new(timeline, config);
    let mut renderer = SolidColorRenderer::from_hex(&background)
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    let mut sink = FfmpegEncodeSink::new(
        &output_path,
        export_format,
        app_config.export.video_bitrate_kbps,
    );

    let progress_cb: Box<dyn Fn(ExportProgress) + Send> = Box::new(|p| {
        print!(
            "\r  Progress: {:.1}% ({}/{} frames, ETA: {:.0}s)  ",
            p.progress * 100.0,
            p.frames_rendered,
            p.total_frames,
            p.eta_secs,
        );
    });

    let handle = ExportHandle::new();
    match run_export(&job, &mut renderer, &mut sink, Some(progress_cb), &handle).await {
        Ok(summary) => {
            println!(
                "\nExport {:?} after {} frames in {:.1}s: {}",
                summary.status,
                summary.frames_rendered,
                summary.elapsed_secs,
                output_path.display()
            );
        }
        Err(e) => {
            println!("\nExport failed: {e}");
        }
    }

    Ok(())
}

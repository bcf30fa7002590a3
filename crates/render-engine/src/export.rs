//! Export job management and the deterministic frame loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;

use tilawa_common::error::{TilawaError, TilawaResult};
use tilawa_project_model::{map_time, ExportConfig, Timeline};

use crate::composition::{frame_time, total_frames};
use crate::frame::{FrameBuffer, FrameRenderer};

/// Yield to the runtime after this many frames so a long export cannot
/// starve the host task.
const YIELD_EVERY_FRAMES: u64 = 8;

/// An export job ready to run.
///
/// The timeline is snapshotted at construction: live edits build new
/// `Arc`s and can never mutate the layout an in-flight export iterates.
#[derive(Debug, Clone)]
pub struct ExportJob {
    /// Immutable timeline snapshot.
    pub timeline: Arc<Timeline>,

    /// Output configuration.
    pub config: ExportConfig,
}

impl ExportJob {
    pub fn new(timeline: Arc<Timeline>, config: ExportConfig) -> Self {
        Self { timeline, config }
    }

    /// Number of frames this job will produce.
    pub fn total_frames(&self) -> u64 {
        total_frames(self.timeline.total_duration(), self.config.fps)
    }
}

/// Progress callback for export rendering.
pub type ProgressCallback = Box<dyn Fn(ExportProgress) + Send>;

/// Export progress report.
#[derive(Debug, Clone, Serialize)]
pub struct ExportProgress {
    /// Current progress [0.0, 1.0].
    pub progress: f64,

    /// Frames rendered so far.
    pub frames_rendered: u64,

    /// Total frames to render.
    pub total_frames: u64,

    /// Estimated time remaining in seconds.
    pub eta_secs: f64,

    /// Current stage.
    pub stage: ExportStage,
}

/// Stages of the export process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportStage {
    Preparing,
    Rendering,
    Finalizing,
    Complete,
    Cancelled,
    Failed,
}

/// Terminal status of a finished export.
///
/// Failure is the `Err` arm of `run_export`; a cancelled export is not
/// an error and gets its own status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportStatus {
    Completed,
    Cancelled,
}

/// Summary returned by a finished (non-failed) export.
#[derive(Debug, Clone, Serialize)]
pub struct ExportSummary {
    pub status: ExportStatus,
    pub frames_rendered: u64,
    pub total_frames: u64,
    pub elapsed_secs: f64,
}

/// Cancellation handle for an in-flight export.
///
/// The flag is polled at the top of each frame iteration, never midway
/// through a frame.
#[derive(Debug, Clone, Default)]
pub struct ExportHandle {
    cancelled: Arc<AtomicBool>,
}

impl ExportHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Takes effect at the next frame boundary.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Trait for capture/encode sinks.
///
/// Sinks receive ordered frames at a declared rate and produce an
/// encoded artifact. `abort` must discard whatever partial output
/// exists; it is the cancellation and failure path.
pub trait EncodeSink: Send {
    /// Open the sink for a stream of `width`x`height` RGB24 frames at
    /// `fps`.
    fn begin(&mut self, width: u32, height: u32, fps: u32) -> TilawaResult<()>;

    /// Submit the next frame in order.
    fn submit(&mut self, frame: &FrameBuffer) -> TilawaResult<()>;

    /// Finalize the artifact after the last frame.
    fn finish(&mut self) -> TilawaResult<()>;

    /// Abort and discard partial output.
    fn abort(&mut self) -> TilawaResult<()>;

    /// Sink name for logging.
    fn name(&self) -> &str;
}

/// Run an export job to completion, cancellation, or failure.
///
/// Walks synthetic timestamps `frame / fps` from frame 0 to the last
/// frame, resolves content through the shared mapper, renders through
/// the injected renderer, and feeds the sink. Decoupled from live
/// playback and from real audio timing; the loop yields cooperatively
/// every few frames.
///
/// A renderer failure on a single frame is retried once with the
/// neutral background-only context; a second failure aborts the export.
/// Sink failures abort immediately. On cancellation the sink is told to
/// discard partial output and the summary reports `Cancelled`.
pub async fn run_export(
    job: &ExportJob,
    renderer: &mut dyn FrameRenderer,
    sink: &mut dyn EncodeSink,
    progress: Option<ProgressCallback>,
    handle: &ExportHandle,
) -> TilawaResult<ExportSummary> {
    let started = Instant::now();
    let total = job.total_frames();
    let fps = job.config.fps;
    let dimensions = job.config.dimensions();

    if fps == 0 {
        return Err(TilawaError::export("frame rate must be at least 1 fps"));
    }
    if total == 0 {
        return Err(TilawaError::export(
            "timeline duration is zero; nothing to export",
        ));
    }

    tracing::info!(
        frames = total,
        fps,
        width = dimensions.0,
        height = dimensions.1,
        renderer = renderer.name(),
        sink = sink.name(),
        "Starting export"
    );

    report(&progress, 0.0, 0, total, 0.0, ExportStage::Preparing);
    sink.begin(dimensions.0, dimensions.1, fps)?;

    let timeline = &job.timeline;
    for frame_index in 0..total {
        // Cancellation is polled only at frame boundaries.
        if handle.is_cancelled() {
            tracing::info!(frame = frame_index, "Export cancelled; discarding partial output");
            if let Err(err) = sink.abort() {
                tracing::warn!(error = %err, "Encode sink abort failed");
            }
            report(
                &progress,
                frame_index as f64 / total as f64,
                frame_index,
                total,
                0.0,
                ExportStage::Cancelled,
            );
            return Ok(ExportSummary {
                status: ExportStatus::Cancelled,
                frames_rendered: frame_index,
                total_frames: total,
                elapsed_secs: started.elapsed().as_secs_f64(),
            });
        }

        let t = frame_time(frame_index, fps);
        let context = map_time(timeline, t);

        let frame = match renderer.render(context.as_ref(), t, dimensions) {
            Ok(frame) => frame,
            Err(first_err) => {
                tracing::warn!(
                    frame = frame_index,
                    error = %first_err,
                    "Frame render failed; retrying with neutral context"
                );
                match renderer.render(None, t, dimensions) {
                    Ok(frame) => frame,
                    Err(second_err) => {
                        if let Err(abort_err) = sink.abort() {
                            tracing::warn!(error = %abort_err, "Encode sink abort failed");
                        }
                        report(&progress, 0.0, frame_index, total, 0.0, ExportStage::Failed);
                        return Err(TilawaError::export(format!(
                            "frame {frame_index} failed twice: {first_err}; fallback: {second_err}"
                        )));
                    }
                }
            }
        };

        if let Err(err) = sink.submit(&frame) {
            if let Err(abort_err) = sink.abort() {
                tracing::warn!(error = %abort_err, "Encode sink abort failed");
            }
            report(&progress, 0.0, frame_index, total, 0.0, ExportStage::Failed);
            return Err(err);
        }

        let rendered = frame_index + 1;
        let elapsed = started.elapsed().as_secs_f64();
        let eta = elapsed / rendered as f64 * (total - rendered) as f64;
        report(
            &progress,
            rendered as f64 / total as f64,
            rendered,
            total,
            eta,
            ExportStage::Rendering,
        );

        if rendered % YIELD_EVERY_FRAMES == 0 {
            tokio::task::yield_now().await;
        }
    }

    report(&progress, 1.0, total, total, 0.0, ExportStage::Finalizing);
    sink.finish()?;
    report(&progress, 1.0, total, total, 0.0, ExportStage::Complete);

    let elapsed = started.elapsed().as_secs_f64();
    tracing::info!(frames = total, elapsed_secs = elapsed, "Export finished");

    Ok(ExportSummary {
        status: ExportStatus::Completed,
        frames_rendered: total,
        total_frames: total,
        elapsed_secs: elapsed,
    })
}

fn report(
    progress: &Option<ProgressCallback>,
    fraction: f64,
    frames_rendered: u64,
    total_frames: u64,
    eta_secs: f64,
    stage: ExportStage,
) {
    if let Some(callback) = progress {
        callback(ExportProgress {
            progress: fraction,
            frames_rendered,
            total_frames,
            eta_secs,
            stage,
        });
    }
}

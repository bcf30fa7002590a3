//! FFmpeg-backed encode sink.
//!
//! Streams raw RGB24 frames into an `ffmpeg` subprocess over stdin and
//! lets it do the encoding. Aborting kills the process and removes the
//! partial output file.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};

use tilawa_common::error::{TilawaError, TilawaResult};
use tilawa_project_model::ExportFormat;

use crate::export::EncodeSink;
use crate::frame::FrameBuffer;

/// Encode sink that pipes raw frames into ffmpeg.
pub struct FfmpegEncodeSink {
    output_path: PathBuf,
    format: ExportFormat,
    video_bitrate_kbps: u32,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stderr_task: Option<std::thread::JoinHandle<String>>,
    frame_bytes: usize,
    frames_submitted: u64,
}

impl FfmpegEncodeSink {
    pub fn new(
        output_path: impl Into<PathBuf>,
        format: ExportFormat,
        video_bitrate_kbps: u32,
    ) -> Self {
        Self {
            output_path: output_path.into(),
            format,
            video_bitrate_kbps,
            child: None,
            stdin: None,
            stderr_task: None,
            frame_bytes: 0,
            frames_submitted: 0,
        }
    }

    /// Check if the ffmpeg binary is on PATH.
    pub fn is_available() -> bool {
        command_exists("ffmpeg")
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn frames_submitted(&self) -> u64 {
        self.frames_submitted
    }

    fn codec_args(&self) -> Vec<String> {
        let video_bitrate = format!("{}k", self.video_bitrate_kbps.max(1000));
        match self.format {
            ExportFormat::Mp4H264 => vec![
                "-c:v".to_string(),
                "libx264".to_string(),
                "-preset".to_string(),
                "medium".to_string(),
                "-profile:v".to_string(),
                "high".to_string(),
                "-pix_fmt".to_string(),
                "yuv420p".to_string(),
                "-b:v".to_string(),
                video_bitrate,
                "-movflags".to_string(),
                "+faststart".to_string(),
            ],
            ExportFormat::Mp4H265 => vec![
                "-c:v".to_string(),
                "libx265".to_string(),
                "-preset".to_string(),
                "medium".to_string(),
                "-pix_fmt".to_string(),
                "yuv420p".to_string(),
                "-b:v".to_string(),
                video_bitrate,
                "-movflags".to_string(),
                "+faststart".to_string(),
            ],
            ExportFormat::Webm => vec![
                "-c:v".to_string(),
                "libvpx-vp9".to_string(),
                "-b:v".to_string(),
                video_bitrate,
            ],
        }
    }

    fn cleanup_partial_output(&self) {
        if self.output_path.exists() {
            if let Err(err) = std::fs::remove_file(&self.output_path) {
                tracing::warn!(
                    path = %self.output_path.display(),
                    error = %err,
                    "Failed to remove partial export output"
                );
            }
        }
    }
}

impl EncodeSink for FfmpegEncodeSink {
    fn begin(&mut self, width: u32, height: u32, fps: u32) -> TilawaResult<()> {
        if self.child.is_some() {
            return Err(TilawaError::export("encode sink already started"));
        }
        if let Some(parent) = self.output_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut args: Vec<String> = vec![
            "-y".to_string(),
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-f".to_string(),
            "rawvideo".to_string(),
            "-pix_fmt".to_string(),
            "rgb24".to_string(),
            "-s".to_string(),
            format!("{width}x{height}"),
            "-r".to_string(),
            fps.to_string(),
            "-i".to_string(),
            "-".to_string(),
        ];
        args.extend(self.codec_args());
        args.push(self.output_path.display().to_string());

        tracing::debug!(args = ?args, "Starting ffmpeg encode process");
        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| TilawaError::export(format!("Failed to start ffmpeg: {e}")))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| TilawaError::export("Failed to open ffmpeg stdin"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| TilawaError::export("Failed to capture ffmpeg stderr"))?;

        // Drain stderr concurrently so ffmpeg cannot block on a full pipe.
        let stderr_task = std::thread::spawn(move || -> String {
            let mut reader = std::io::BufReader::new(stderr);
            let mut output = String::new();
            match reader.read_to_string(&mut output) {
                Ok(_) => output,
                Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
            }
        });

        tracing::info!(
            pid = child.id(),
            output = %self.output_path.display(),
            "ffmpeg encode process started"
        );

        self.frame_bytes = FrameBuffer::byte_len(width, height);
        self.frames_submitted = 0;
        self.child = Some(child);
        self.stdin = Some(stdin);
        self.stderr_task = Some(stderr_task);
        Ok(())
    }

    fn submit(&mut self, frame: &FrameBuffer) -> TilawaResult<()> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| TilawaError::export("encode sink not started"))?;
        if frame.data.len() != self.frame_bytes {
            return Err(TilawaError::export(format!(
                "frame size mismatch: got {} bytes, expected {}",
                frame.data.len(),
                self.frame_bytes
            )));
        }
        stdin
            .write_all(&frame.data)
            .map_err(|e| TilawaError::export(format!("Failed to write frame to ffmpeg: {e}")))?;
        self.frames_submitted += 1;
        Ok(())
    }

    fn finish(&mut self) -> TilawaResult<()> {
        // Closing stdin signals end of stream so ffmpeg can flush and
        // finalize the container.
        drop(self.stdin.take());

        let mut child = self
            .child
            .take()
            .ok_or_else(|| TilawaError::export("encode sink not started"))?;
        let status = child
            .wait()
            .map_err(|e| TilawaError::export(format!("Failed to wait on ffmpeg: {e}")))?;

        let stderr_output = self
            .stderr_task
            .take()
            .and_then(|task| task.join().ok())
            .unwrap_or_default();

        if !status.success() {
            self.cleanup_partial_output();
            return Err(TilawaError::export(format!(
                "ffmpeg encode failed (status {}): {}",
                status,
                stderr_output.trim()
            )));
        }

        tracing::info!(
            frames = self.frames_submitted,
            output = %self.output_path.display(),
            "ffmpeg encode finished"
        );
        Ok(())
    }

    fn abort(&mut self) -> TilawaResult<()> {
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            if let Err(err) = child.kill() {
                tracing::warn!(error = %err, "Failed to kill ffmpeg process");
            }
            let _ = child.wait();
        }
        if let Some(task) = self.stderr_task.take() {
            let _ = task.join();
        }
        self.cleanup_partial_output();
        tracing::info!(
            frames = self.frames_submitted,
            "ffmpeg encode aborted; partial output discarded"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}

impl Drop for FfmpegEncodeSink {
    fn drop(&mut self) {
        // A sink dropped mid-stream (e.g. on panic) must not leave a
        // zombie encoder running.
        if self.child.is_some() {
            let _ = self.abort();
        }
    }
}

fn command_exists(binary: &str) -> bool {
    Command::new("sh")
        .arg("-c")
        .arg(format!("command -v {binary} >/dev/null 2>&1"))
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submit_before_begin_fails() {
        let mut sink = FfmpegEncodeSink::new("/tmp/out.mp4", ExportFormat::Mp4H264, 8000);
        let frame = FrameBuffer::filled(2, 2, [0, 0, 0]);
        assert!(sink.submit(&frame).is_err());
    }

    #[test]
    fn test_codec_args_per_format() {
        let h264 = FfmpegEncodeSink::new("a.mp4", ExportFormat::Mp4H264, 8000);
        assert!(h264.codec_args().contains(&"libx264".to_string()));

        let h265 = FfmpegEncodeSink::new("a.mp4", ExportFormat::Mp4H265, 8000);
        assert!(h265.codec_args().contains(&"libx265".to_string()));

        let webm = FfmpegEncodeSink::new("a.webm", ExportFormat::Webm, 8000);
        assert!(webm.codec_args().contains(&"libvpx-vp9".to_string()));
    }

    #[test]
    fn test_bitrate_floor() {
        let sink = FfmpegEncodeSink::new("a.mp4", ExportFormat::Mp4H264, 100);
        assert!(sink.codec_args().contains(&"1000k".to_string()));
    }
}

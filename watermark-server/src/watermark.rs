//! Watermark compositing through ffmpeg.
//!
//! The watermark is scaled to 15% of the source image width, keeps its
//! aspect ratio, and is overlaid 20px from the left and bottom edges. Output
//! is written with `-q:v 2`.
//!
//! A failed run may leave a partial file at the destination.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tracing::{error, info};

/// Filter graph: scale `[1]` against `[0]`'s width, then overlay bottom-left.
///
/// Inside `scale2ref`, `iw` is the reference (source) width and `mdar` is the
/// display aspect ratio of the input being scaled (the watermark).
pub const WATERMARK_FILTER: &str =
    "[1:v][0:v]scale2ref=w=iw*0.15:h=ow/mdar[wm][base];[base][wm]overlay=x=20:y=H-h-20";

/// JPEG quality scale passed to `-q:v`.
pub const OUTPUT_QUALITY: &str = "2";

/// Running the compositing process failed.
#[derive(Debug, Error)]
pub enum ProcessExecError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: ExitStatus,
        stderr: String,
    },
}

/// Overlays a watermark onto an image file.
///
/// Implementations may block the calling task until the work finishes.
#[async_trait]
pub trait Watermarker: Send + Sync {
    async fn apply_watermark(
        &self,
        source: &Path,
        dest: &Path,
        watermark: &Path,
    ) -> Result<(), ProcessExecError>;
}

/// [`Watermarker`] that shells out to ffmpeg.
#[derive(Debug, Clone)]
pub struct FfmpegWatermarker {
    ffmpeg_path: PathBuf,
}

impl FfmpegWatermarker {
    pub fn new(ffmpeg_path: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
        }
    }

    /// Arguments for one compositing run.
    ///
    /// Paths are passed through unchanged, including non-UTF-8 ones.
    pub fn build_args(source: &Path, dest: &Path, watermark: &Path) -> Vec<OsString> {
        vec![
            "-nostdin".into(),
            "-hide_banner".into(),
            "-loglevel".into(),
            "error".into(),
            "-y".into(),
            "-i".into(),
            source.as_os_str().to_owned(),
            "-i".into(),
            watermark.as_os_str().to_owned(),
            "-filter_complex".into(),
            WATERMARK_FILTER.into(),
            "-q:v".into(),
            OUTPUT_QUALITY.into(),
            dest.as_os_str().to_owned(),
        ]
    }
}

#[async_trait]
impl Watermarker for FfmpegWatermarker {
    async fn apply_watermark(
        &self,
        source: &Path,
        dest: &Path,
        watermark: &Path,
    ) -> Result<(), ProcessExecError> {
        let program = self.ffmpeg_path.to_string_lossy().to_string();

        info!(
            source = %source.display(),
            dest = %dest.display(),
            "watermark_starting"
        );

        let output = Command::new(&self.ffmpeg_path)
            .args(Self::build_args(source, dest, watermark))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| {
                error!(program = %program, error = %source, "watermark_spawn_failed");
                ProcessExecError::Spawn {
                    program: program.clone(),
                    source,
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            error!(
                program = %program,
                exit_code = ?output.status.code(),
                stderr = %stderr,
                "watermark_failed"
            );
            return Err(ProcessExecError::Failed {
                program,
                status: output.status,
                stderr,
            });
        }

        info!(dest = %dest.display(), "watermark_complete");

        Ok(())
    }
}

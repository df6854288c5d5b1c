//! External media tooling: stream inspection and fast-start remuxing.
//!
//! Both capabilities are traits so the pipeline can run against fakes in
//! tests. The ffmpeg-backed implementations run the binaries with a bounded
//! deadline and kill the child if the calling future is dropped.

use crate::api::error::AppError;
use crate::models::ContainerFormat;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, error};

/// Width and height of one media stream as reported by the inspection tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub struct StreamDimensions {
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
}

#[async_trait]
pub trait MediaProbe: Send + Sync {
    /// Returns the streams of the file at `path`, in container order.
    async fn probe(&self, path: &Path) -> Result<Vec<StreamDimensions>, AppError>;
}

#[async_trait]
pub trait Remuxer: Send + Sync {
    /// Copies every stream of `input` into `output` with the index moved to
    /// the front of the file. Encoded payloads must not change.
    async fn remux(
        &self,
        input: &Path,
        output: &Path,
        format: &ContainerFormat,
    ) -> Result<(), AppError>;
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<StreamDimensions>,
}

pub(crate) fn parse_ffprobe_output(stdout: &[u8]) -> Result<Vec<StreamDimensions>, AppError> {
    let parsed: FfprobeOutput = serde_json::from_slice(stdout)
        .map_err(|e| AppError::ProbeFailure(format!("unparseable ffprobe output: {}", e)))?;
    Ok(parsed.streams)
}

pub struct FfprobeProbe {
    binary: PathBuf,
    timeout: Duration,
}

impl FfprobeProbe {
    pub fn new(binary: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }
}

#[async_trait]
impl MediaProbe for FfprobeProbe {
    async fn probe(&self, path: &Path) -> Result<Vec<StreamDimensions>, AppError> {
        debug!("Running ffprobe on {}", path.display());

        let child = Command::new(&self.binary)
            .args(["-v", "error", "-print_format", "json", "-show_streams"])
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, child)
            .await
            .map_err(|_| {
                AppError::ProbeFailure(format!(
                    "ffprobe timed out after {}s",
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| AppError::ProbeFailure(format!("failed to run ffprobe: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            error!("ffprobe failed ({}): {}", output.status, stderr.trim());
            return Err(AppError::ProbeFailure(format!(
                "ffprobe exited with {}",
                output.status
            )));
        }

        parse_ffprobe_output(&output.stdout)
    }
}

pub struct FfmpegRemuxer {
    binary: PathBuf,
    timeout: Duration,
}

impl FfmpegRemuxer {
    pub fn new(binary: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }

    pub(crate) fn build_args(input: &Path, output: &Path, format: &ContainerFormat) -> Vec<String> {
        vec![
            "-y".to_string(),
            "-v".to_string(),
            "error".to_string(),
            "-i".to_string(),
            input.to_string_lossy().into_owned(),
            "-map".to_string(),
            "0".to_string(),
            "-c".to_string(),
            "copy".to_string(),
            "-movflags".to_string(),
            "faststart".to_string(),
            "-f".to_string(),
            format.muxer.to_string(),
            output.to_string_lossy().into_owned(),
        ]
    }
}

#[async_trait]
impl Remuxer for FfmpegRemuxer {
    async fn remux(
        &self,
        input: &Path,
        output: &Path,
        format: &ContainerFormat,
    ) -> Result<(), AppError> {
        let args = Self::build_args(input, output, format);
        debug!("Running ffmpeg {}", args.join(" "));

        let child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let result = tokio::time::timeout(self.timeout, child)
            .await
            .map_err(|_| {
                AppError::OptimizationFailure(format!(
                    "ffmpeg timed out after {}s",
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| AppError::OptimizationFailure(format!("failed to run ffmpeg: {}", e)))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            error!("ffmpeg failed ({}): {}", result.status, stderr.trim());
            return Err(AppError::OptimizationFailure(format!(
                "ffmpeg exited with {}",
                result.status
            )));
        }

        Ok(())
    }
}

use crate::api::error::AppError;
use crate::services::media::Remuxer;
use crate::services::stager::StagedFile;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Produces a fast-start copy of a staged upload.
pub struct StreamOptimizer {
    remuxer: Arc<dyn Remuxer>,
    staging_dir: PathBuf,
}

impl StreamOptimizer {
    pub fn new(remuxer: Arc<dyn Remuxer>, staging_dir: PathBuf) -> Self {
        Self {
            remuxer,
            staging_dir,
        }
    }

    /// The returned file owns its own temporary region; `input` stays untouched.
    pub async fn optimize(&self, input: &StagedFile) -> Result<StagedFile, AppError> {
        let format = *input.format();

        let output = tempfile::Builder::new()
            .prefix("faststart-")
            .suffix(format.extension)
            .tempfile_in(&self.staging_dir)
            .map_err(|e| AppError::StagingIo(format!("failed to create output file: {}", e)))?;

        self.remuxer
            .remux(input.path(), output.path(), &format)
            .await?;

        let size = tokio::fs::metadata(output.path())
            .await
            .map(|m| m.len())
            .map_err(|e| AppError::OptimizationFailure(format!("remux output missing: {}", e)))?;

        if size == 0 {
            return Err(AppError::OptimizationFailure(
                "remux produced an empty file".to_string(),
            ));
        }

        info!(
            input_size = input.size(),
            output_size = size,
            "Rewrote container for fast start"
        );

        Ok(StagedFile::new(output, size, format))
    }
}

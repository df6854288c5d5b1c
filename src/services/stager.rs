use crate::api::error::AppError;
use crate::models::{ContainerFormat, VideoAsset};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tracing::{debug, warn};

const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// A request-scoped temporary file. The backing file is removed when the
/// value is dropped, whichever way the owning request ends.
#[derive(Debug)]
pub struct StagedFile {
    file: NamedTempFile,
    size: u64,
    format: ContainerFormat,
}

impl StagedFile {
    pub(crate) fn new(file: NamedTempFile, size: u64, format: ContainerFormat) -> Self {
        Self { file, size, format }
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn format(&self) -> &ContainerFormat {
        &self.format
    }

    /// Opens an independent read handle positioned at offset 0.
    pub async fn open(&self) -> Result<tokio::fs::File, AppError> {
        tokio::fs::File::open(self.file.path())
            .await
            .map_err(|e| AppError::StagingIo(format!("failed to reopen staged file: {}", e)))
    }
}

/// Receives upload streams and turns them into staged files after checking
/// ownership, content type and size.
pub struct IngestStager {
    staging_dir: PathBuf,
    max_upload_size: u64,
    allowed_content_types: Vec<String>,
}

impl IngestStager {
    pub fn new(
        staging_dir: PathBuf,
        max_upload_size: u64,
        allowed_content_types: Vec<String>,
    ) -> Self {
        Self {
            staging_dir,
            max_upload_size,
            allowed_content_types,
        }
    }

    pub fn authorize(&self, asset: &VideoAsset, caller: &str) -> Result<(), AppError> {
        if asset.user_id != caller {
            warn!(video_id = %asset.id, caller, "Rejected upload from non-owner");
            return Err(AppError::Unauthorized(
                "You don't have access to update this video".to_string(),
            ));
        }
        Ok(())
    }

    /// Maps a declared `Content-Type` onto an allow-listed container format.
    /// Parameters such as `; codecs=...` are ignored.
    pub fn resolve_format(&self, declared: Option<&str>) -> Result<ContainerFormat, AppError> {
        let declared = declared
            .ok_or_else(|| AppError::InvalidContentType("Missing content type".to_string()))?;

        let media_type: mime::Mime = declared
            .parse()
            .map_err(|_| AppError::InvalidContentType(format!("Malformed content type: {}", declared)))?;
        let essence = media_type.essence_str();

        let allowed = self
            .allowed_content_types
            .iter()
            .any(|t| t.eq_ignore_ascii_case(essence));

        match ContainerFormat::for_content_type(essence) {
            Some(format) if allowed => Ok(format),
            _ => Err(AppError::InvalidContentType(format!(
                "Forbidden upload type {} (allowed: {})",
                essence,
                self.allowed_content_types.join(", ")
            ))),
        }
    }

    /// Streams `reader` into a fresh temporary file, enforcing the size ceiling.
    pub async fn stage<R>(&self, mut reader: R, format: ContainerFormat) -> Result<StagedFile, AppError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let temp_file = tempfile::Builder::new()
            .prefix("upload-")
            .suffix(format.extension)
            .tempfile_in(&self.staging_dir)
            .map_err(|e| AppError::StagingIo(format!("failed to create staging file: {}", e)))?;

        let mut writer = tokio::fs::File::from_std(
            temp_file
                .reopen()
                .map_err(|e| AppError::StagingIo(e.to_string()))?,
        );

        let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
        let mut total: u64 = 0;

        loop {
            let n = reader.read(&mut buffer).await.map_err(map_read_error)?;
            if n == 0 {
                break;
            }

            total += n as u64;
            if total > self.max_upload_size {
                return Err(AppError::PayloadTooLarge(format!(
                    "Upload exceeds the maximum allowed size of {} bytes",
                    self.max_upload_size
                )));
            }

            writer
                .write_all(&buffer[..n])
                .await
                .map_err(|e| AppError::StagingIo(format!("failed to write staging file: {}", e)))?;
        }

        writer
            .flush()
            .await
            .map_err(|e| AppError::StagingIo(format!("failed to flush staging file: {}", e)))?;
        writer
            .sync_all()
            .await
            .map_err(|e| AppError::StagingIo(format!("failed to sync staging file: {}", e)))?;

        debug!("Staged {} bytes at {}", total, temp_file.path().display());

        Ok(StagedFile::new(temp_file, total, format))
    }
}

fn map_read_error(e: std::io::Error) -> AppError {
    let msg = e.to_string();
    if msg.contains("length limit exceeded") {
        AppError::PayloadTooLarge("Request body exceeds the maximum allowed limit".to_string())
    } else {
        AppError::BadRequest(format!("Failed to read upload stream: {}", msg))
    }
}

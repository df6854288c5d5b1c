use crate::api::error::AppError;
use crate::models::{ContainerFormat, Orientation, StorageReference, VideoAsset, VideoLocation};
use crate::services::record_store::VideoRecordStore;
use crate::services::stager::StagedFile;
use crate::services::storage::StorageService;
use crate::utils::keyed_mutex::KeyedMutex;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::Utc;
use rand::RngCore;
use rand::rngs::OsRng;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

const OBJECT_TOKEN_BYTES: usize = 32;

/// 32 bytes from the OS CSPRNG, unpadded URL-safe base64.
pub fn object_token() -> String {
    let mut bytes = [0u8; OBJECT_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

pub fn storage_key(orientation: Orientation, format: &ContainerFormat) -> String {
    format!("{}/{}{}", orientation, object_token(), format.extension)
}

pub struct Publisher {
    storage: Arc<dyn StorageService>,
    records: Arc<dyn VideoRecordStore>,
    bucket: String,
    locks: KeyedMutex,
}

impl Publisher {
    pub fn new(
        storage: Arc<dyn StorageService>,
        records: Arc<dyn VideoRecordStore>,
        bucket: String,
    ) -> Self {
        Self {
            storage,
            records,
            bucket,
            locks: KeyedMutex::new(),
        }
    }

    /// Uploads the optimized file and points the video record at it.
    ///
    /// Publishing for one video id is serialized, so the record always pairs
    /// the orientation and reference of the same upload. The previously
    /// referenced object is left in place.
    pub async fn publish(
        &self,
        staged: &StagedFile,
        video_id: Uuid,
        orientation: Orientation,
    ) -> Result<VideoAsset, AppError> {
        let format = *staged.format();
        let reference = StorageReference::new(&self.bucket, storage_key(orientation, &format));

        let guard = self.locks.lock(video_id).await;
        let result = self.publish_locked(staged, video_id, orientation, reference).await;
        drop(guard);
        self.locks.cleanup();
        result
    }

    async fn publish_locked(
        &self,
        staged: &StagedFile,
        video_id: Uuid,
        orientation: Orientation,
        reference: StorageReference,
    ) -> Result<VideoAsset, AppError> {
        self.storage
            .put_file(&reference, staged.path(), staged.format().content_type)
            .await
            .map_err(|e| AppError::UploadFailure(e.to_string()))?;

        info!(
            %video_id,
            bucket = %reference.bucket,
            key = %reference.key,
            size = staged.size(),
            "Uploaded video object"
        );

        match self.record_reference(video_id, orientation, &reference).await {
            Ok(video) => Ok(video),
            Err(e) => {
                warn!(
                    %video_id,
                    key = %reference.key,
                    "Record update failed after upload, removing orphaned object: {}",
                    e
                );
                if let Err(delete_err) = self.storage.delete_object(&reference).await {
                    error!(
                        %video_id,
                        key = %reference.key,
                        "Failed to remove orphaned object: {}",
                        delete_err
                    );
                }
                Err(e)
            }
        }
    }

    async fn record_reference(
        &self,
        video_id: Uuid,
        orientation: Orientation,
        reference: &StorageReference,
    ) -> Result<VideoAsset, AppError> {
        let mut video = self.records.get(video_id).await.map_err(|e| match e {
            AppError::NotFound(msg) => AppError::RecordUpdateFailure(msg),
            other => AppError::RecordUpdateFailure(other.to_string()),
        })?;

        video.orientation = orientation;
        video.location = Some(VideoLocation::Stored(reference.clone()));
        video.updated_at = Utc::now();

        self.records.update(&video).await.map_err(|e| match e {
            e @ AppError::RecordUpdateFailure(_) => e,
            other => AppError::RecordUpdateFailure(other.to_string()),
        })?;

        Ok(video)
    }
}

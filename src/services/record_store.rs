use crate::api::error::AppError;
use crate::entities::{prelude::*, *};
use crate::models::{NewVideo, Orientation, StorageReference, VideoAsset, VideoLocation};
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

/// Persisted-record store for video assets.
#[async_trait]
pub trait VideoRecordStore: Send + Sync {
    async fn create(&self, video: NewVideo) -> Result<VideoAsset, AppError>;

    /// Fails with `NotFound` when no record has this id.
    async fn get(&self, id: Uuid) -> Result<VideoAsset, AppError>;

    async fn update(&self, video: &VideoAsset) -> Result<(), AppError>;

    async fn list_for_owner(&self, user_id: &str) -> Result<Vec<VideoAsset>, AppError>;

    async fn ping(&self) -> bool;
}

pub struct SeaOrmVideoStore {
    db: DatabaseConnection,
}

impl SeaOrmVideoStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn to_asset(model: videos::Model) -> Result<VideoAsset, AppError> {
    let id = Uuid::parse_str(&model.id)
        .map_err(|e| AppError::Internal(format!("corrupt video id {}: {}", model.id, e)))?;

    let orientation: Orientation = model.orientation.parse()?;

    let location = match (model.storage_bucket, model.storage_key) {
        (Some(bucket), Some(key)) => Some(VideoLocation::Stored(StorageReference { bucket, key })),
        (None, None) => None,
        (bucket, key) => {
            return Err(AppError::Internal(format!(
                "video {} has a partial storage reference (bucket: {:?}, key: {:?})",
                model.id, bucket, key
            )));
        }
    };

    Ok(VideoAsset {
        id,
        user_id: model.user_id,
        title: model.title,
        description: model.description,
        orientation,
        location,
        created_at: model.created_at,
        updated_at: model.updated_at,
    })
}

#[async_trait]
impl VideoRecordStore for SeaOrmVideoStore {
    async fn create(&self, video: NewVideo) -> Result<VideoAsset, AppError> {
        let now = Utc::now();
        let model = videos::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            user_id: Set(video.user_id),
            title: Set(video.title),
            description: Set(video.description),
            orientation: Set(Orientation::Unset.as_str().to_string()),
            storage_bucket: Set(None),
            storage_key: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await?;

        to_asset(model)
    }

    async fn get(&self, id: Uuid) -> Result<VideoAsset, AppError> {
        let model = Videos::find_by_id(id.to_string())
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Video {} not found", id)))?;

        to_asset(model)
    }

    async fn update(&self, video: &VideoAsset) -> Result<(), AppError> {
        let (storage_bucket, storage_key) = match &video.location {
            None => (None, None),
            Some(VideoLocation::Stored(reference)) => {
                (Some(reference.bucket.clone()), Some(reference.key.clone()))
            }
            Some(VideoLocation::Signed { .. }) => {
                return Err(AppError::RecordUpdateFailure(
                    "signed locations are never persisted".to_string(),
                ));
            }
        };

        let existing = Videos::find_by_id(video.id.to_string())
            .one(&self.db)
            .await
            .map_err(|e| AppError::RecordUpdateFailure(e.to_string()))?
            .ok_or_else(|| AppError::RecordUpdateFailure(format!("Video {} vanished", video.id)))?;

        let mut active: videos::ActiveModel = existing.into();
        active.title = Set(video.title.clone());
        active.description = Set(video.description.clone());
        active.orientation = Set(video.orientation.as_str().to_string());
        active.storage_bucket = Set(storage_bucket);
        active.storage_key = Set(storage_key);
        active.updated_at = Set(video.updated_at);

        active
            .update(&self.db)
            .await
            .map_err(|e| AppError::RecordUpdateFailure(e.to_string()))?;

        Ok(())
    }

    async fn list_for_owner(&self, user_id: &str) -> Result<Vec<VideoAsset>, AppError> {
        Videos::find()
            .filter(videos::Column::UserId.eq(user_id))
            .order_by_desc(videos::Column::CreatedAt)
            .all(&self.db)
            .await?
            .into_iter()
            .map(to_asset)
            .collect()
    }

    async fn ping(&self) -> bool {
        self.db.ping().await.is_ok()
    }
}

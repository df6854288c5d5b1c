use crate::api::error::AppError;
use crate::models::{VideoAsset, VideoLocation};
use crate::services::storage::StorageService;
use std::sync::Arc;
use std::time::Duration;

/// Swaps a stored reference for a short-lived playback URL on the way out.
pub struct UrlSigner {
    storage: Arc<dyn StorageService>,
    ttl: Duration,
}

impl UrlSigner {
    pub fn new(storage: Arc<dyn StorageService>, ttl: Duration) -> Self {
        Self { storage, ttl }
    }

    /// Videos without uploaded content are returned unchanged.
    pub async fn sign(&self, mut video: VideoAsset) -> Result<VideoAsset, AppError> {
        let reference = match &video.location {
            Some(VideoLocation::Stored(reference)) => reference,
            None | Some(VideoLocation::Signed { .. }) => return Ok(video),
        };

        let url = self
            .storage
            .presign_get(reference, self.ttl)
            .await
            .map_err(|e| AppError::SigningFailure(e.to_string()))?;

        video.location = Some(VideoLocation::Signed { url });
        Ok(video)
    }

    pub async fn sign_all(&self, videos: Vec<VideoAsset>) -> Result<Vec<VideoAsset>, AppError> {
        let mut signed = Vec::with_capacity(videos.len());
        for video in videos {
            signed.push(self.sign(video).await?);
        }
        Ok(signed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Orientation, StorageReference};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::path::Path;
    use std::sync::Mutex;
    use uuid::Uuid;

    #[derive(Default)]
    struct RecordingStorage {
        presign_calls: Mutex<Vec<(StorageReference, Duration)>>,
        fail: bool,
    }

    #[async_trait]
    impl StorageService for RecordingStorage {
        async fn put_file(
            &self,
            _reference: &StorageReference,
            _path: &Path,
            _content_type: &str,
        ) -> anyhow::Result<()> {
            unimplemented!()
        }

        async fn presign_get(
            &self,
            reference: &StorageReference,
            ttl: Duration,
        ) -> anyhow::Result<String> {
            self.presign_calls
                .lock()
                .unwrap()
                .push((reference.clone(), ttl));
            if self.fail {
                anyhow::bail!("missing credentials");
            }
            Ok(format!(
                "https://{}.s3.amazonaws.com/{}?X-Amz-Expires={}",
                reference.bucket,
                reference.key,
                ttl.as_secs()
            ))
        }

        async fn delete_object(&self, _reference: &StorageReference) -> anyhow::Result<()> {
            unimplemented!()
        }

        async fn bucket_exists(&self, _bucket: &str) -> anyhow::Result<bool> {
            Ok(true)
        }
    }

    fn video(location: Option<VideoLocation>) -> VideoAsset {
        VideoAsset {
            id: Uuid::new_v4(),
            user_id: "user_1".to_string(),
            title: "clip".to_string(),
            description: None,
            orientation: Orientation::Landscape,
            location,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_unpublished_video_is_returned_unchanged() {
        let storage = Arc::new(RecordingStorage::default());
        let signer = UrlSigner::new(storage.clone(), Duration::from_secs(60));

        let original = video(None);
        let signed = signer.sign(original.clone()).await.unwrap();
        assert_eq!(signed, original);
        assert!(storage.presign_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stored_reference_becomes_signed_url() {
        let storage = Arc::new(RecordingStorage::default());
        let signer = UrlSigner::new(storage.clone(), Duration::from_secs(60));
        let reference = StorageReference::new("videos", "landscape/tok.mp4");

        let signed = signer
            .sign(video(Some(VideoLocation::Stored(reference.clone()))))
            .await
            .unwrap();

        match signed.location {
            Some(VideoLocation::Signed { url }) => {
                assert!(url.contains("landscape/tok.mp4"));
                assert!(url.contains("X-Amz-Expires=60"));
            }
            other => panic!("expected signed location, got {:?}", other),
        }
        let calls = storage.presign_calls.lock().unwrap();
        assert_eq!(calls.as_slice(), &[(reference, Duration::from_secs(60))]);
    }

    #[tokio::test]
    async fn test_signing_failure_propagates() {
        let storage = Arc::new(RecordingStorage {
            fail: true,
            ..Default::default()
        });
        let signer = UrlSigner::new(storage, Duration::from_secs(60));

        let err = signer
            .sign(video(Some(VideoLocation::Stored(StorageReference::new(
                "videos", "other/x.mp4",
            )))))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::SigningFailure(_)));
    }

    #[tokio::test]
    async fn test_sign_all_mixes_published_and_unpublished() {
        let storage = Arc::new(RecordingStorage::default());
        let signer = UrlSigner::new(storage.clone(), Duration::from_secs(60));

        let videos = vec![
            video(None),
            video(Some(VideoLocation::Stored(StorageReference::new(
                "videos",
                "portrait/a.mp4",
            )))),
        ];
        let signed = signer.sign_all(videos).await.unwrap();
        assert!(signed[0].location.is_none());
        assert!(matches!(signed[1].location, Some(VideoLocation::Signed { .. })));
        assert_eq!(storage.presign_calls.lock().unwrap().len(), 1);
    }
}

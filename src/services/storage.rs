use crate::models::StorageReference;
use anyhow::Result;
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use std::path::Path;
use std::time::Duration;

/// Object storage capability used by the publisher and the URL signer.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Uploads the file at `path` under `reference`.
    async fn put_file(
        &self,
        reference: &StorageReference,
        path: &Path,
        content_type: &str,
    ) -> Result<()>;

    /// Mints a time-limited GET URL for `reference`.
    async fn presign_get(&self, reference: &StorageReference, ttl: Duration) -> Result<String>;

    async fn delete_object(&self, reference: &StorageReference) -> Result<()>;

    async fn bucket_exists(&self, bucket: &str) -> Result<bool>;
}

pub struct S3StorageService {
    client: Client,
}

impl S3StorageService {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl StorageService for S3StorageService {
    async fn put_file(
        &self,
        reference: &StorageReference,
        path: &Path,
        content_type: &str,
    ) -> Result<()> {
        let body = ByteStream::from_path(path).await?;

        let res = self
            .client
            .put_object()
            .bucket(&reference.bucket)
            .key(&reference.key)
            .content_type(content_type)
            .body(body)
            .send()
            .await;

        if let Err(e) = res {
            tracing::error!(
                "S3 put_object failed: dest={}/{}, error={:?}",
                reference.bucket,
                reference.key,
                e
            );
            return Err(e.into());
        }
        Ok(())
    }

    async fn presign_get(&self, reference: &StorageReference, ttl: Duration) -> Result<String> {
        let presign_config = PresigningConfig::expires_in(ttl)?;

        let presigned = self
            .client
            .get_object()
            .bucket(&reference.bucket)
            .key(&reference.key)
            .presigned(presign_config)
            .await?;

        Ok(presigned.uri().to_string())
    }

    async fn delete_object(&self, reference: &StorageReference) -> Result<()> {
        self.client
            .delete_object()
            .bucket(&reference.bucket)
            .key(&reference.key)
            .send()
            .await?;
        Ok(())
    }

    async fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        let res = self.client.head_bucket().bucket(bucket).send().await;

        match res {
            Ok(_) => Ok(true),
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_not_found() {
                    Ok(false)
                } else {
                    Err(anyhow::anyhow!(service_error))
                }
            }
        }
    }
}

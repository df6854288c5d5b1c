use crate::config::AppConfig;
use crate::services::storage::{S3StorageService, StorageService};
use aws_sdk_s3::config::Region;
use std::env;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Builds the S3 client from configuration. A custom endpoint switches to
/// path-style addressing for MinIO; static credentials are used when both
/// `S3_ACCESS_KEY` and `S3_SECRET_KEY` are set, the default chain otherwise.
pub async fn setup_storage(config: &AppConfig) -> Arc<S3StorageService> {
    let mut loader = aws_config::from_env().region(Region::new(config.s3_region.clone()));

    if let Some(endpoint_url) = &config.s3_endpoint {
        loader = loader.endpoint_url(endpoint_url);
    }

    if let (Ok(access_key), Ok(secret_key)) = (env::var("S3_ACCESS_KEY"), env::var("S3_SECRET_KEY")) {
        loader = loader.credentials_provider(aws_sdk_s3::config::Credentials::new(
            access_key, secret_key, None, None, "static",
        ));
    }

    let aws_config = loader.load().await;

    let s3_config = aws_sdk_s3::config::Builder::from(&aws_config)
        .force_path_style(config.s3_endpoint.is_some())
        .build();

    info!(
        "☁️  S3 Storage: {} (Bucket: {})",
        config.s3_endpoint.as_deref().unwrap_or("aws"),
        config.s3_bucket
    );

    let storage = Arc::new(S3StorageService::new(aws_sdk_s3::Client::from_conf(s3_config)));

    match storage.bucket_exists(&config.s3_bucket).await {
        Ok(true) => info!("✅ Bucket '{}' is ready", config.s3_bucket),
        Ok(false) => warn!("🪣 Bucket '{}' does not exist", config.s3_bucket),
        Err(e) => error!("❌ Failed to reach bucket '{}': {}", config.s3_bucket, e),
    }

    storage
}

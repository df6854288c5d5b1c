use crate::api::error::AppError;
use crate::models::VideoAsset;
use crate::services::classifier::MediaClassifier;
use crate::services::optimizer::StreamOptimizer;
use crate::services::publisher::Publisher;
use crate::services::record_store::VideoRecordStore;
use crate::services::stager::IngestStager;
use std::sync::Arc;
use tokio::io::AsyncRead;
use tracing::{Instrument, info, info_span};
use uuid::Uuid;

/// Write path for one upload: stage, classify, optimize, publish.
///
/// Every temporary file is owned by a local in `ingest` and is gone by the
/// time it returns or its future is dropped.
pub struct IngestPipeline {
    records: Arc<dyn VideoRecordStore>,
    stager: IngestStager,
    classifier: MediaClassifier,
    optimizer: StreamOptimizer,
    publisher: Publisher,
}

impl IngestPipeline {
    pub fn new(
        records: Arc<dyn VideoRecordStore>,
        stager: IngestStager,
        classifier: MediaClassifier,
        optimizer: StreamOptimizer,
        publisher: Publisher,
    ) -> Self {
        Self {
            records,
            stager,
            classifier,
            optimizer,
            publisher,
        }
    }

    /// Checks ownership before any of the body is read.
    pub async fn authorize(&self, video_id: Uuid, caller: &str) -> Result<VideoAsset, AppError> {
        let video = self.records.get(video_id).await?;
        self.stager.authorize(&video, caller)?;
        Ok(video)
    }

    pub async fn ingest<R>(
        &self,
        video_id: Uuid,
        caller: &str,
        content_type: Option<&str>,
        reader: R,
    ) -> Result<VideoAsset, AppError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let span = info_span!("ingest", %video_id, caller);

        async move {
            self.authorize(video_id, caller).await?;
            let format = self.stager.resolve_format(content_type)?;

            let staged = self.stager.stage(reader, format).await?;
            info!(size = staged.size(), content_type = format.content_type, "Upload staged");

            let orientation = self.classifier.classify(&staged).await?;
            let optimized = self.optimizer.optimize(&staged).await?;
            drop(staged);

            let video = self
                .publisher
                .publish(&optimized, video_id, orientation)
                .await?;

            info!(%orientation, "Upload published");
            Ok(video)
        }
        .instrument(span)
        .await
    }
}

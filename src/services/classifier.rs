use crate::api::error::AppError;
use crate::models::Orientation;
use crate::services::media::MediaProbe;
use crate::services::stager::StagedFile;
use std::sync::Arc;
use tracing::info;

const LANDSCAPE_RANGE: (f64, f64) = (1.70, 1.80);
const PORTRAIT_RANGE: (f64, f64) = (0.55, 0.60);

/// Buckets a width/height pair. Range bounds are inclusive.
pub fn classify_dimensions(width: u32, height: u32) -> Result<Orientation, AppError> {
    if height == 0 {
        return Err(AppError::InvalidDimensions { width, height });
    }

    let ratio = width as f64 / height as f64;

    if (LANDSCAPE_RANGE.0..=LANDSCAPE_RANGE.1).contains(&ratio) {
        Ok(Orientation::Landscape)
    } else if (PORTRAIT_RANGE.0..=PORTRAIT_RANGE.1).contains(&ratio) {
        Ok(Orientation::Portrait)
    } else {
        Ok(Orientation::Other)
    }
}

pub struct MediaClassifier {
    probe: Arc<dyn MediaProbe>,
}

impl MediaClassifier {
    pub fn new(probe: Arc<dyn MediaProbe>) -> Self {
        Self { probe }
    }

    /// Classifies a staged file by the first stream the probe reports.
    pub async fn classify(&self, staged: &StagedFile) -> Result<Orientation, AppError> {
        let streams = self.probe.probe(staged.path()).await?;

        let first = streams.first().ok_or(AppError::NoStreamsFound)?;
        let orientation = classify_dimensions(first.width, first.height)?;

        info!(
            width = first.width,
            height = first.height,
            %orientation,
            "Classified staged upload"
        );
        Ok(orientation)
    }
}

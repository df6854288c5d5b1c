use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Invalid content type: {0}")]
    InvalidContentType(String),

    #[error("Payload Too Large: {0}")]
    PayloadTooLarge(String),

    #[error("Staging I/O error: {0}")]
    StagingIo(String),

    #[error("No streams found in media file")]
    NoStreamsFound,

    #[error("Invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("Probe failure: {0}")]
    ProbeFailure(String),

    #[error("Optimization failure: {0}")]
    OptimizationFailure(String),

    #[error("Upload failure: {0}")]
    UploadFailure(String),

    #[error("Record update failure: {0}")]
    RecordUpdateFailure(String),

    #[error("Signing failure: {0}")]
    SigningFailure(String),

    #[error("Internal Server Error: {0}")]
    Internal(String),

    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

impl AppError {
    /// Stable identifier reported to clients alongside the message.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Database(_) => "database",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::BadRequest(_) => "bad_request",
            AppError::NotFound(_) => "not_found",
            AppError::InvalidContentType(_) => "invalid_content_type",
            AppError::PayloadTooLarge(_) => "payload_too_large",
            AppError::StagingIo(_) => "staging_io",
            AppError::NoStreamsFound => "no_streams_found",
            AppError::InvalidDimensions { .. } => "invalid_dimensions",
            AppError::ProbeFailure(_) => "probe_failure",
            AppError::OptimizationFailure(_) => "optimization_failure",
            AppError::UploadFailure(_) => "upload_failure",
            AppError::RecordUpdateFailure(_) => "record_update_failure",
            AppError::SigningFailure(_) => "signing_failure",
            AppError::Internal(_) | AppError::Anyhow(_) => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidContentType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let kind = self.kind();

        let message = if status.is_server_error() {
            tracing::error!(kind, "{}", self);
            "Internal Server Error".to_string()
        } else {
            match self {
                AppError::Unauthorized(msg)
                | AppError::BadRequest(msg)
                | AppError::NotFound(msg)
                | AppError::InvalidContentType(msg)
                | AppError::PayloadTooLarge(msg) => msg,
                other => other.to_string(),
            }
        };

        let body = Json(json!({
            "error": message,
            "kind": kind,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[test]
    fn test_validation_errors_map_to_client_status() {
        assert_eq!(
            AppError::Unauthorized("x".into()).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::InvalidContentType("video/avi".into()).status(),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
        assert_eq!(
            AppError::PayloadTooLarge("x".into()).status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert!(AppError::BadRequest("x".into()).status().is_client_error());
    }

    #[test]
    fn test_dependency_errors_map_to_server_status() {
        for err in [
            AppError::NoStreamsFound,
            AppError::InvalidDimensions {
                width: 10,
                height: 0,
            },
            AppError::ProbeFailure("exit 1".into()),
            AppError::OptimizationFailure("exit 1".into()),
            AppError::UploadFailure("denied".into()),
            AppError::RecordUpdateFailure("gone".into()),
            AppError::SigningFailure("no creds".into()),
        ] {
            assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
            assert!(!err.status().is_client_error());
        }
    }

    #[tokio::test]
    async fn test_server_error_body_hides_details() {
        let response = AppError::ProbeFailure("ffprobe: secret path".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["kind"], "probe_failure");
        assert_eq!(json["error"], "Internal Server Error");
    }

    #[tokio::test]
    async fn test_client_error_body_keeps_message() {
        let response = AppError::InvalidContentType("video/avi is not allowed".into())
            .into_response();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["kind"], "invalid_content_type");
        assert_eq!(json["error"], "video/avi is not allowed");
    }
}

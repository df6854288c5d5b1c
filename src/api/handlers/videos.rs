use crate::AppState;
use crate::api::error::AppError;
use crate::models::{NewVideo, VideoAsset};
use crate::utils::auth::Claims;
use axum::{
    Extension, Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
};
use futures::TryStreamExt;
use serde::Deserialize;
use tokio_util::io::StreamReader;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

/// Multipart field carrying the video bytes.
pub const VIDEO_FIELD: &str = "video";

#[derive(Deserialize, ToSchema)]
pub struct CreateVideoRequest {
    pub title: String,
    pub description: Option<String>,
}

fn parse_video_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::BadRequest(format!("Invalid video id: {}", raw)))
}

#[utoipa::path(
    post,
    path = "/api/videos",
    request_body = CreateVideoRequest,
    responses(
        (status = 201, description = "Video created", body = VideoAsset),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("jwt" = [])
    ),
    tag = "videos"
)]
pub async fn create_video(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateVideoRequest>,
) -> Result<(StatusCode, Json<VideoAsset>), AppError> {
    let title = payload.title.trim();
    if title.is_empty() {
        return Err(AppError::BadRequest("Title must not be empty".to_string()));
    }

    let video = state
        .records
        .create(NewVideo {
            user_id: claims.sub,
            title: title.to_string(),
            description: payload.description,
        })
        .await?;

    info!(video_id = %video.id, owner = %video.user_id, "Video created");
    Ok((StatusCode::CREATED, Json(video)))
}

#[utoipa::path(
    get,
    path = "/api/videos",
    responses(
        (status = 200, description = "Caller's videos with playback URLs", body = Vec<VideoAsset>),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("jwt" = [])
    ),
    tag = "videos"
)]
pub async fn list_videos(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<VideoAsset>>, AppError> {
    let videos = state.records.list_for_owner(&claims.sub).await?;
    Ok(Json(state.signer.sign_all(videos).await?))
}

#[utoipa::path(
    get,
    path = "/api/videos/{id}",
    params(
        ("id" = String, Path, description = "Video ID")
    ),
    responses(
        (status = 200, description = "Video with playback URL", body = VideoAsset),
        (status = 400, description = "Invalid video id"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Video not found")
    ),
    security(
        ("jwt" = [])
    ),
    tag = "videos"
)]
pub async fn get_video(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Json<VideoAsset>, AppError> {
    let video_id = parse_video_id(&id)?;
    let video = state.pipeline.authorize(video_id, &claims.sub).await?;
    Ok(Json(state.signer.sign(video).await?))
}

/// Accepts one video file, classifies and optimizes it, publishes it and
/// returns the updated record.
#[utoipa::path(
    post,
    path = "/api/video_upload/{id}",
    params(
        ("id" = String, Path, description = "Video ID")
    ),
    request_body(content = String, description = "Multipart form with a `video` file field", content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Video published", body = VideoAsset),
        (status = 400, description = "Invalid video id or missing file"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Video not found"),
        (status = 413, description = "Upload too large"),
        (status = 415, description = "Unsupported content type"),
        (status = 500, description = "Processing failed")
    ),
    security(
        ("jwt" = [])
    ),
    tag = "videos"
)]
pub async fn upload_video(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<VideoAsset>, AppError> {
    let video_id = parse_video_id(&id)?;

    // Ownership is settled before any of the body is consumed.
    state.pipeline.authorize(video_id, &claims.sub).await?;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        let err_msg = e.to_string();
        if err_msg.contains("length limit exceeded") {
            AppError::PayloadTooLarge("Request body exceeds the maximum allowed limit".to_string())
        } else {
            AppError::BadRequest(err_msg)
        }
    })? {
        if field.name() != Some(VIDEO_FIELD) {
            continue;
        }

        let content_type = field.content_type().map(|s| s.to_string());
        let reader = StreamReader::new(field.map_err(std::io::Error::other));

        let video = state
            .pipeline
            .ingest(video_id, &claims.sub, content_type.as_deref(), reader)
            .await?;

        return Ok(Json(video));
    }

    Err(AppError::BadRequest(format!(
        "Missing multipart field '{}'",
        VIDEO_FIELD
    )))
}

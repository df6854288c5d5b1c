pub mod api;
pub mod config;
pub mod entities;
pub mod infrastructure;
pub mod models;
pub mod services;
pub mod utils;

use crate::config::AppConfig;
use crate::services::pipeline::IngestPipeline;
use crate::services::record_store::VideoRecordStore;
use crate::services::signer::UrlSigner;
use crate::services::storage::StorageService;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

/// Allowance for multipart framing on top of the file itself.
const MULTIPART_OVERHEAD: usize = 10 * 1024 * 1024;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::videos::create_video,
        api::handlers::videos::list_videos,
        api::handlers::videos::get_video,
        api::handlers::videos::upload_video,
        api::handlers::health::health_check,
    ),
    components(
        schemas(
            api::handlers::videos::CreateVideoRequest,
            api::handlers::health::HealthResponse,
            models::VideoAsset,
            models::VideoLocation,
            models::StorageReference,
            models::Orientation,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "videos", description = "Video records and uploads"),
        (name = "system", description = "Service status")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "jwt",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub records: Arc<dyn VideoRecordStore>,
    pub storage: Arc<dyn StorageService>,
    pub pipeline: Arc<IngestPipeline>,
    pub signer: Arc<UrlSigner>,
    pub config: AppConfig,
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();

    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if config.allowed_origins.iter().any(|o| o == "*") {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(AllowOrigin::list(origins))
    }
}

pub fn create_app(state: AppState) -> Router {
    let upload_limit = state.config.max_upload_size.saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(api::handlers::health::health_check))
        .route(
            "/api/videos",
            get(api::handlers::videos::list_videos)
                .post(api::handlers::videos::create_video)
                .layer(from_fn_with_state(
                    state.clone(),
                    api::middleware::auth::auth_middleware,
                )),
        )
        .route(
            "/api/videos/:id",
            get(api::handlers::videos::get_video).layer(from_fn_with_state(
                state.clone(),
                api::middleware::auth::auth_middleware,
            )),
        )
        .route(
            "/api/video_upload/:id",
            post(api::handlers::videos::upload_video)
                .layer(DefaultBodyLimit::max(upload_limit))
                .layer(from_fn_with_state(
                    state.clone(),
                    api::middleware::auth::auth_middleware,
                )),
        )
        .layer(cors_layer(&state.config))
        .layer(from_fn(api::middleware::request_id::request_id_middleware))
        .with_state(state)
}

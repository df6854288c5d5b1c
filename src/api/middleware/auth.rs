use crate::AppState;
use crate::api::error::AppError;
use crate::utils::auth::validate_jwt;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use tracing::debug;

/// Resolves the bearer token into `Claims` and stores them in the request
/// extensions for the handlers.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|s| s.trim().to_string())
        .ok_or_else(|| AppError::Unauthorized("Missing bearer token".to_string()))?;

    let claims = validate_jwt(&token, &state.config.jwt_secret).map_err(|e| {
        debug!("Rejected token: {}", e);
        AppError::Unauthorized("Invalid or expired token".to_string())
    })?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

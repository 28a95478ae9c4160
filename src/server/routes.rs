//! Gateway HTTP routes

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{debug, error, warn};

use super::assets::license_summary;
use super::AppState;
use crate::api::{is_evm_address, ApiResponse, RegisterDerivativeRequest, RegisterStoryRequest};
use crate::error::{ErrorKind, FolioError};

impl IntoResponse for FolioError {
    fn into_response(self) -> Response {
        let status = match self.kind() {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Upstream | ErrorKind::Config | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };

        match self.kind() {
            ErrorKind::Config => error!(error = %self, "Request needs missing configuration"),
            ErrorKind::Upstream | ErrorKind::Internal => error!(error = %self, "Request failed"),
            ErrorKind::Validation | ErrorKind::NotFound => debug!(error = %self, "Request rejected"),
        }

        (status, Json(ApiResponse::<()>::from_error(&self))).into_response()
    }
}

/// 200 with the `success: true` body and a public cache lifetime
fn cached<T: Serialize>(data: T, max_age_secs: u64) -> Response {
    let mut response = Json(ApiResponse::Ok(data)).into_response();
    if let Ok(value) = HeaderValue::from_str(&format!("public, max-age={}", max_age_secs)) {
        response.headers_mut().insert(header::CACHE_CONTROL, value);
    }
    response
}

fn require_ip_id(ip_id: &str) -> Result<(), FolioError> {
    if is_evm_address(ip_id) {
        Ok(())
    } else {
        Err(FolioError::Validation(format!("Invalid IP id: {}", ip_id)))
    }
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, FolioError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| FolioError::Validation(format!("Invalid request body: {}", rejection.body_text())))
}

pub async fn health() -> impl IntoResponse {
    "OK"
}

/// GET /api/stories/:ip_id
pub async fn get_story(State(state): State<AppState>, Path(ip_id): Path<String>) -> Result<Response, FolioError> {
    require_ip_id(&ip_id)?;
    let max_age = state.story_ttl_secs();

    let hit = state.story_cache.lock().unwrap_or_else(|e| e.into_inner()).get(&ip_id);
    if let Some(hit) = hit {
        return Ok(cached(hit, max_age));
    }

    let assets = state.assets()?;
    let story = assets
        .story(&ip_id)
        .await?
        .ok_or_else(|| FolioError::NotFound(format!("Story {} not found", ip_id)))?;

    state
        .story_cache
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .put(ip_id, story.clone());
    Ok(cached(story, max_age))
}

/// GET /api/licenses/:ip_id
pub async fn get_licenses(State(state): State<AppState>, Path(ip_id): Path<String>) -> Result<Response, FolioError> {
    require_ip_id(&ip_id)?;
    let max_age = state.license_ttl_secs();

    let hit = state.license_cache.lock().unwrap_or_else(|e| e.into_inner()).get(&ip_id);
    if let Some(hit) = hit {
        return Ok(cached(hit, max_age));
    }

    let assets = state.assets()?;
    let licenses = assets
        .licenses(&ip_id)
        .await?
        .ok_or_else(|| FolioError::NotFound(format!("No licenses found for {}", ip_id)))?;

    let summary = license_summary(licenses);
    state
        .license_cache
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .put(ip_id, summary.clone());
    Ok(cached(summary, max_age))
}

/// GET /api/stories/:ip_id/licenses
pub async fn get_story_licenses(
    State(state): State<AppState>,
    Path(ip_id): Path<String>,
) -> Result<Response, FolioError> {
    let licenses = state
        .catalog
        .licenses(&ip_id)
        .ok_or_else(|| FolioError::NotFound(format!("Story {} not found", ip_id)))?;
    Ok(Json(ApiResponse::Ok(licenses)).into_response())
}

/// POST /api/register-story
pub async fn register_story(
    State(state): State<AppState>,
    payload: Result<Json<RegisterStoryRequest>, JsonRejection>,
) -> Result<Response, FolioError> {
    let req = body(payload)?;
    let data = state.registration.register_story(&req).await?;
    Ok(Json(ApiResponse::Ok(data)).into_response())
}

/// POST /api/register-derivative
pub async fn register_derivative(
    State(state): State<AppState>,
    payload: Result<Json<RegisterDerivativeRequest>, JsonRejection>,
) -> Result<Response, FolioError> {
    let req = body(payload)?;
    let data = state.registration.register_derivative(&req).await.map_err(|e| {
        if e.kind() == ErrorKind::Validation {
            warn!(parent = %req.parent_ip_id, error = %e, "Derivative rejected");
        }
        e
    })?;
    Ok(Json(ApiResponse::Ok(data)).into_response())
}

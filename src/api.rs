// src/api.rs
//! Dashboard JSON API over the digest service.

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        FromRequest, FromRequestParts, Path, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;

use crate::digest::{DigestMode, DigestOutcome, DigestService};
use crate::post::DigestPost;
use crate::store::{
    NewGroup, Preferences, PreferencesUpdate, SourceGroup, StoreError, DEFAULT_MIN_COMMENTS,
    DEFAULT_MIN_SCORE,
};

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<DigestService>,
}

impl AppState {
    pub fn new(service: Arc<DigestService>) -> Self {
        Self { service }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/subreddits", get(list_groups).post(add_group))
        .route("/api/subreddits/{id}", delete(delete_group))
        .route("/api/subreddits/{id}/toggle", patch(toggle_group))
        .route("/api/preferences", get(get_preferences).put(update_preferences))
        .route("/api/preview", post(preview))
        .route("/api/test-email", post(test_email))
        .route("/api/send-preview", post(send_preview))
        .route("/api/send-digest", post(send_digest))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/* -------- extractors -------- */

/// `Json` whose rejections render as [`ApiError`].
#[derive(FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
struct ApiJson<T>(T);

/// `Path` whose rejections render as [`ApiError`].
#[derive(FromRequestParts)]
#[from_request(via(Path), rejection(ApiError))]
struct ApiPath<T>(T);

/* -------- errors -------- */

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Internal(anyhow::Error),
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::GroupNotFound(_) => ApiError::NotFound(e.to_string()),
            StoreError::DuplicateGroup(_)
            | StoreError::InvalidGroupName(_)
            | StoreError::InvalidPreferences(_) => ApiError::BadRequest(e.to_string()),
            StoreError::Io { .. } | StoreError::Json(_) | StoreError::Task(_) => {
                ApiError::Internal(e.into())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(r: JsonRejection) -> Self {
        ApiError::BadRequest(r.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(r: PathRejection) -> Self {
        ApiError::BadRequest(r.body_text())
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        ApiError::Internal(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::BadRequest(d) => (StatusCode::BAD_REQUEST, d),
            ApiError::NotFound(d) => (StatusCode::NOT_FOUND, d),
            ApiError::Internal(e) => {
                tracing::error!(error = ?e, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, format!("{e:#}"))
            }
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

/* -------- handlers -------- */

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

async fn list_groups(State(state): State<AppState>) -> Json<Vec<SourceGroup>> {
    Json(state.service.store().groups())
}

#[derive(Debug, Deserialize)]
struct AddGroupReq {
    name: String,
    #[serde(default)]
    min_upvotes: Option<i64>,
    #[serde(default)]
    min_comments: Option<u64>,
}

async fn add_group(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<AddGroupReq>,
) -> ApiResult<SourceGroup> {
    let new = NewGroup {
        name: body.name,
        min_upvotes: body.min_upvotes.unwrap_or(DEFAULT_MIN_SCORE),
        min_comments: body.min_comments.unwrap_or(DEFAULT_MIN_COMMENTS),
    };
    let now = Utc::now();
    let group = state
        .service
        .store()
        .blocking(move |s| s.add_group(new, now))
        .await?;
    tracing::info!(group = %group.name, id = group.id, "subreddit added");
    Ok(Json(group))
}

async fn delete_group(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<u64>,
) -> ApiResult<Value> {
    state
        .service
        .store()
        .blocking(move |s| s.delete_group(id))
        .await?;
    Ok(Json(json!({ "status": "deleted" })))
}

async fn toggle_group(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<u64>,
) -> ApiResult<SourceGroup> {
    let group = state
        .service
        .store()
        .blocking(move |s| s.toggle_group(id))
        .await?;
    Ok(Json(group))
}

async fn get_preferences(State(state): State<AppState>) -> Json<Preferences> {
    Json(state.service.store().preferences())
}

async fn update_preferences(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<PreferencesUpdate>,
) -> ApiResult<Preferences> {
    let prefs = state
        .service
        .store()
        .blocking(move |s| s.update_preferences(body))
        .await?;
    Ok(Json(prefs))
}

#[derive(Debug, Serialize)]
struct PreviewResp {
    posts: Vec<DigestPost>,
    count: usize,
}

async fn preview(State(state): State<AppState>) -> ApiResult<PreviewResp> {
    let posts = state.service.preview().await?;
    if posts.is_empty() {
        return Err(ApiError::NotFound("No posts found".into()));
    }
    let count = posts.len();
    Ok(Json(PreviewResp { posts, count }))
}

async fn test_email(State(state): State<AppState>) -> ApiResult<Value> {
    let recipient = state.service.send_test_email().await?;
    Ok(Json(json!({
        "status": "sent",
        "message": format!("Test email sent to {recipient}"),
    })))
}

async fn send_preview(State(state): State<AppState>) -> ApiResult<DigestOutcome> {
    match state.service.send(DigestMode::Preview).await? {
        DigestOutcome::NoPosts => Err(ApiError::NotFound("No posts found".into())),
        sent => Ok(Json(sent)),
    }
}

async fn send_digest(State(state): State<AppState>) -> ApiResult<DigestOutcome> {
    Ok(Json(state.service.send(DigestMode::Scheduled).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_status() {
        let code = |e: StoreError| ApiError::from(e).into_response().status();
        assert_eq!(code(StoreError::GroupNotFound(3)), StatusCode::NOT_FOUND);
        assert_eq!(
            code(StoreError::DuplicateGroup("rust".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            code(StoreError::InvalidPreferences("x".into())),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn other_errors_are_500() {
        let resp = ApiError::from(anyhow::anyhow!("smtp down")).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

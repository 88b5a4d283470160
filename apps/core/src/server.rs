//! HTTP service boundary.
//!
//! Thin axum layer over the batch classifier: a multipart JSON upload in,
//! a JSON result list or a zip archive out, plus health and intent-listing
//! endpoints. Malformed uploads are rejected with a client error before
//! any model work begins; internal failures surface as a generic server
//! error with details only in the logs.

use crate::error::AppError;
use crate::models::{BatchOutcome, Conversation};
use crate::output;
use crate::service::{parse_batch, ConversationClassifier};
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

/// Uploads above this size are rejected outright.
const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

#[derive(Clone)]
pub struct ServerState {
    pub classifier: Arc<dyn ConversationClassifier>,
}

/// Builds the service router. The classifier behind `state` must be fully
/// loaded before this is served; requests are never queued against a
/// partially-initialized engine.
pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/intents", get(list_intents))
        .route("/classify", post(classify))
        .route("/classify/archive", post(classify_archive))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Binds and serves until the process is stopped.
pub async fn serve(
    classifier: Arc<dyn ConversationClassifier>,
    host: &str,
    port: u16,
) -> Result<(), AppError> {
    let state = ServerState { classifier };
    let app = router(state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "HTTP service listening");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health(State(state): State<ServerState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "models": state.classifier.model_ids(),
        "intents": state.classifier.intents().len(),
    }))
}

async fn list_intents(State(state): State<ServerState>) -> Json<Vec<String>> {
    Json(state.classifier.intents())
}

async fn classify(
    State(state): State<ServerState>,
    multipart: Multipart,
) -> Result<Json<BatchOutcome>, ApiError> {
    let conversations = read_upload(multipart).await?;
    let outcome = state.classifier.classify_batch(conversations).await;
    Ok(Json(outcome))
}

async fn classify_archive(
    State(state): State<ServerState>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let conversations = read_upload(multipart).await?;
    let outcome = state.classifier.classify_batch(conversations).await;
    let bytes = output::archive_bytes(&outcome.results)?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/zip"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"classification_results.zip\"",
            ),
        ],
        bytes,
    )
        .into_response())
}

/// Pulls the first file field out of the upload, validates its name, and
/// parses it as a conversation batch.
async fn read_upload(mut multipart: Multipart) -> Result<Vec<Conversation>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError(AppError::MalformedInput(format!("Invalid upload: {}", e))))?
    {
        let Some(filename) = field.file_name().map(|n| n.to_string()) else {
            continue;
        };
        validate_upload_filename(&filename)?;

        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError(AppError::MalformedInput(format!("Invalid upload: {}", e))))?;
        return parse_batch(&data).map_err(ApiError);
    }

    Err(ApiError(AppError::MalformedInput(
        "No file field in upload".into(),
    )))
}

/// Uploads must be JSON files.
pub fn validate_upload_filename(filename: &str) -> Result<(), AppError> {
    if filename.ends_with(".json") {
        Ok(())
    } else {
        Err(AppError::MalformedInput(
            "Please upload a valid JSON file".into(),
        ))
    }
}

/// Maps application errors onto HTTP responses: client mistakes get a 400
/// with the message, everything else a generic 500.
pub struct ApiError(AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self.0 {
            AppError::MalformedInput(msg) | AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, msg.clone())
            }
            other => {
                error!(error = %other, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
        };

        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

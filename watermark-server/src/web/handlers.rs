//! HTTP endpoint handlers.
//!
//! The LINE webhook handler only:
//! 1. Verifies the signature over the raw body
//! 2. Decodes the event batch
//! 3. Runs the batch through the pipeline and acknowledges with 200
//!
//! The remaining handlers expose the watermarked outputs.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::image_fs::{self, list_output_images};
use crate::line::WebhookRequest;
use crate::web::signature::{verify_line_signature, SIGNATURE_HEADER};
use crate::webhook::WebhookService;
use crate::Config;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub webhook: Arc<WebhookService>,
}

impl AppState {
    pub fn new(config: Config, webhook: WebhookService) -> Self {
        Self {
            config: Arc::new(config),
            webhook: Arc::new(webhook),
        }
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// =============================================================================
// LINE Webhook
// =============================================================================

/// LINE webhook endpoint.
///
/// Per-event failures never change the response: once the signature and
/// body are accepted the answer is always `200 Ok`.
pub async fn line_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let signature = match headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok()) {
        Some(s) => s,
        None => {
            warn!(body_length = body.len(), "line_signature_header_missing");
            return (StatusCode::BAD_REQUEST, "Missing x-line-signature header");
        }
    };

    if !verify_line_signature(&state.config.line_channel_secret, &body, signature) {
        warn!(body_length = body.len(), "line_signature_invalid");
        return (StatusCode::UNAUTHORIZED, "Unauthorized");
    }

    let request: WebhookRequest = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(e) => {
            warn!(error = %e, "line_webhook_body_invalid");
            return (StatusCode::BAD_REQUEST, "Invalid webhook body");
        }
    };

    info!(
        destination = ?request.destination,
        event_count = request.events.len(),
        "line_webhook_received"
    );

    let events = request.into_events();
    state.webhook.handle_webhook_events(&events).await;

    info!(event_count = events.len(), "line_webhook_done");

    (StatusCode::OK, "Ok")
}

// =============================================================================
// Output Images
// =============================================================================

/// Error body for the image endpoints.
#[derive(Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

/// Public URLs of all watermarked images, most recent first.
pub async fn list_images(State(state): State<AppState>) -> impl IntoResponse {
    let output_root = state.webhook.paths().output_root();

    match list_output_images(output_root).await {
        Ok(files) => {
            let urls: Vec<String> = files
                .iter()
                .map(|f| format!("{}/static/{}", state.config.app_domain, f))
                .collect();
            Ok(Json(urls))
        }
        Err(e) => {
            error!(path = %output_root.display(), error = %e, "images_list_failed");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    success: false,
                    error: "Failed to list images".to_string(),
                }),
            ))
        }
    }
}

/// Result body for image deletion.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteImageResponse {
    pub success: bool,
    pub filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub deleted_from_images: bool,
    pub deleted_from_images_output: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

/// Delete an image from both the incoming and output roots.
///
/// - 400: not a bare file name
/// - 404: neither copy existed
/// - 207: at least one deletion failed
/// - 200: every existing copy was removed
pub async fn delete_image(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> impl IntoResponse {
    let outcome = match image_fs::delete_image(state.webhook.paths(), &filename).await {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!(filename = %filename, "image_delete_invalid_filename");
            return (
                StatusCode::BAD_REQUEST,
                Json(DeleteImageResponse {
                    success: false,
                    filename,
                    message: Some(e.to_string()),
                    deleted_from_images: false,
                    deleted_from_images_output: false,
                    errors: Vec::new(),
                }),
            );
        }
    };

    if outcome.not_found() {
        return (
            StatusCode::NOT_FOUND,
            Json(DeleteImageResponse {
                success: false,
                filename,
                message: Some("File not found in either folder".to_string()),
                deleted_from_images: false,
                deleted_from_images_output: false,
                errors: Vec::new(),
            }),
        );
    }

    let success = outcome.errors.is_empty();
    let status = if success {
        StatusCode::OK
    } else {
        StatusCode::MULTI_STATUS
    };

    (
        status,
        Json(DeleteImageResponse {
            success,
            filename,
            message: None,
            deleted_from_images: outcome.deleted_from_images,
            deleted_from_images_output: outcome.deleted_from_images_output,
            errors: outcome.errors,
        }),
    )
}

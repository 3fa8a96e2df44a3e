//! Web server module.
//!
//! - Receives LINE webhooks, verifies their signature and runs the batch
//!   through the image pipeline
//! - Lists and deletes watermarked outputs
//! - Serves outputs as static files under `/static`

pub mod handlers;
pub mod signature;

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

pub use handlers::{
    delete_image, health, line_webhook, list_images, AppState, DeleteImageResponse,
    ErrorResponse, HealthResponse,
};
pub use signature::{sign_body, verify_line_signature, SIGNATURE_HEADER};

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let static_files = ServeDir::new(state.webhook.paths().output_root());

    Router::new()
        .route("/health", get(health))
        .route("/lh", post(line_webhook))
        .route("/images", get(list_images))
        .route("/images/:filename", delete(delete_image))
        .nest_service("/static", static_files)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

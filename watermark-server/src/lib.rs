//! Photomark - LINE image watermarking service.
//!
//! Receives LINE webhook deliveries, downloads images users send to the
//! bot, stamps a watermark on them with ffmpeg and publishes the results
//! as static files.
//!
//! ## Architecture
//!
//! ```text
//! LINE → /lh (signature check) → WebhookService → LINE content API
//!                                        ↓
//!                           images/ → ffmpeg → images-output/ → /static
//! ```

pub mod config;
pub mod image_fs;
pub mod line;
pub mod watermark;
pub mod web;
pub mod webhook;

// Re-export commonly used types
pub use config::Config;
pub use image_fs::{ImageName, ImagePaths};
pub use line::{ContentFetcher, LineContentClient, WebhookEvent};
pub use watermark::{FfmpegWatermarker, Watermarker};
pub use web::AppState;
pub use webhook::{PipelineError, PipelineStats, WebhookService};

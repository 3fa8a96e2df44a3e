//! Configuration module for environment variable parsing.
//!
//! Configuration is read once at startup and handed to each component
//! explicitly. Nothing below the binary reads the environment.

use std::env;
use std::path::PathBuf;
use tracing::warn;

/// Default LINE content-delivery host.
pub const DEFAULT_LINE_CONTENT_BASE_URL: &str = "https://api-data.line.me";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port for the web server to listen on
    pub port: u16,

    /// Public origin used to build static image URLs (e.g. `https://img.example.com`)
    pub app_domain: String,

    /// LINE channel access token used as bearer credential for content fetches
    pub line_channel_access_token: String,

    /// LINE channel secret used to verify `x-line-signature`
    pub line_channel_secret: String,

    /// Base URL of the LINE content-delivery API
    pub line_content_base_url: String,

    /// HTTP timeout for a single content fetch in milliseconds
    pub content_fetch_timeout_ms: u64,

    // =========================================================================
    // Image storage
    // =========================================================================

    /// Directory for freshly fetched originals
    pub incoming_dir: PathBuf,

    /// Directory for watermarked outputs (served under `/static`)
    pub output_dir: PathBuf,

    /// Watermark asset overlaid onto every image
    pub watermark_path: PathBuf,

    /// ffmpeg executable used for compositing
    pub ffmpeg_path: PathBuf,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let port = parse_or("PORT", 3000);

        Config {
            port,

            app_domain: env::var("APP_DOMAIN")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| format!("http://localhost:{}", port)),

            line_channel_access_token: env::var("LINE_CHANNEL_ACCESS_TOKEN").unwrap_or_default(),

            line_channel_secret: env::var("LINE_CHANNEL_SECRET").unwrap_or_default(),

            line_content_base_url: env::var("LINE_CONTENT_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_LINE_CONTENT_BASE_URL.to_string()),

            content_fetch_timeout_ms: parse_or("CONTENT_FETCH_TIMEOUT_MS", 30_000),

            incoming_dir: path_or("IMAGES_DIR", "images"),

            output_dir: path_or("IMAGES_OUTPUT_DIR", "images-output"),

            watermark_path: path_or("WATERMARK_PATH", "assets/photo-mark.png"),

            ffmpeg_path: path_or("FFMPEG_PATH", "ffmpeg"),
        }
    }
}

/// Parse a variable into `T`, falling back to `default` when unset or invalid.
fn parse_or<T>(name: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    let raw = match env::var(name) {
        Ok(v) => v,
        Err(_) => return default,
    };

    match raw.trim().parse::<T>() {
        Ok(value) => value,
        Err(_) => {
            warn!(env_var = name, value = %raw, "Invalid value, using default");
            default
        }
    }
}

/// Read a path variable, ignoring blank values.
fn path_or(name: &str, default: &str) -> PathBuf {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
        .into()
}

//! LINE Messaging API integration.
//!
//! - Webhook payload types consumed by the pipeline
//! - Content-delivery client for downloading message bodies

pub mod client;
pub mod types;

pub use client::{
    ContentFetchError, ContentFetcher, ContentStream, GetMessageContentError, LineContentClient,
};
pub use types::{
    ContentProvider, EventMessage, ImageEventMessage, MessageEvent, TextEventMessage,
    WebhookEvent, WebhookRequest,
};

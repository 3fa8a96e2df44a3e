//! Webhook event pipeline.
//!
//! Classifies each event and, for LINE-hosted images, runs
//! fetch → write incoming file → watermark.
//!
//! ## Processing Flow
//!
//! ```text
//! WebhookEvent → message? → image? → line-hosted? → fetch → write → watermark → output path
//! ```
//!
//! The first failing step ends that event only. Events of one delivery are
//! handled one at a time, in order, and a failure never stops the batch.

pub mod error;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::image_fs::{ImageName, ImagePaths};
use crate::line::{
    ContentFetcher, ContentProvider, ContentStream, EventMessage, ImageEventMessage, WebhookEvent,
};
use crate::watermark::Watermarker;

pub use error::{PipelineError, PipelineResult};

/// Counters of pipeline outcomes since startup.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PipelineStats {
    /// Events that produced an output image
    pub processed: u64,
    /// Events dropped at any step
    pub dropped: u64,
}

#[derive(Default)]
struct Counters {
    processed: AtomicU64,
    dropped: AtomicU64,
}

/// Runs webhook events through the image pipeline.
pub struct WebhookService {
    fetcher: Arc<dyn ContentFetcher>,
    watermarker: Arc<dyn Watermarker>,
    paths: ImagePaths,
    counters: Counters,
}

impl WebhookService {
    pub fn new(
        fetcher: Arc<dyn ContentFetcher>,
        watermarker: Arc<dyn Watermarker>,
        paths: ImagePaths,
    ) -> Self {
        Self {
            fetcher,
            watermarker,
            paths,
            counters: Counters::default(),
        }
    }

    pub fn paths(&self) -> &ImagePaths {
        &self.paths
    }

    pub fn stats(&self) -> PipelineStats {
        PipelineStats {
            processed: self.counters.processed.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
        }
    }

    /// Process every event in order, one at a time.
    ///
    /// Failures are logged and counted, never returned.
    pub async fn handle_webhook_events(&self, events: &[WebhookEvent]) {
        info!(event_count = events.len(), "webhook_batch_start");

        let mut processed = 0usize;
        for (index, event) in events.iter().enumerate() {
            match self.handle_event(event).await {
                Ok(output) => {
                    processed += 1;
                    self.counters.processed.fetch_add(1, Ordering::Relaxed);
                    info!(
                        index = index,
                        output = %output.display(),
                        "webhook_event_processed"
                    );
                }
                Err(e) => {
                    self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        index = index,
                        event_kind = event.kind(),
                        error_kind = e.kind(),
                        error = %e,
                        "webhook_event_dropped"
                    );
                }
            }
        }

        info!(
            event_count = events.len(),
            processed = processed,
            dropped = events.len() - processed,
            "webhook_batch_complete"
        );
    }

    /// Classify one event and, if it is a LINE-hosted image, watermark it.
    ///
    /// Returns the full path of the watermarked output.
    pub async fn handle_event(&self, event: &WebhookEvent) -> PipelineResult<PathBuf> {
        let message = match event {
            WebhookEvent::Message(message_event) => &message_event.message,
            WebhookEvent::Follow
            | WebhookEvent::Unfollow
            | WebhookEvent::Join
            | WebhookEvent::Leave
            | WebhookEvent::MemberJoined
            | WebhookEvent::MemberLeft
            | WebhookEvent::Postback
            | WebhookEvent::Beacon
            | WebhookEvent::AccountLink
            | WebhookEvent::Things
            | WebhookEvent::Unsend
            | WebhookEvent::VideoPlayComplete
            | WebhookEvent::Unknown => {
                return Err(PipelineError::InvalidWebhookEvent(event.kind()));
            }
        };

        let image = match message {
            EventMessage::Image(image) => image,
            EventMessage::Text(_)
            | EventMessage::Video
            | EventMessage::Audio
            | EventMessage::File
            | EventMessage::Location
            | EventMessage::Sticker
            | EventMessage::Unknown => {
                return Err(PipelineError::InvalidEventMessageType(message.kind()));
            }
        };

        let name = self.handle_image_event(image).await?;

        let original = self.paths.original_path(&name);
        let output = self.paths.output_path(&name);

        self.watermarker
            .apply_watermark(&original, &output, self.paths.watermark_path())
            .await?;

        Ok(output)
    }

    /// Fetch a LINE-hosted image and store it under the incoming root.
    ///
    /// The name is generated only after the fetch succeeds.
    pub async fn handle_image_event(&self, image: &ImageEventMessage) -> PipelineResult<ImageName> {
        match &image.content_provider {
            ContentProvider::Line => {}
            ContentProvider::External { .. } => {
                return Err(PipelineError::InvalidContentProvider(
                    image.content_provider.kind(),
                ));
            }
        }

        let content = self.fetcher.fetch_content(&image.id).await?;

        let name = ImageName::generate();
        let path = self.paths.original_path(&name);

        let bytes_written = write_content(&path, content)
            .await
            .map_err(PipelineError::WriteToFile)?;

        info!(
            message_id = %image.id,
            image_name = %name,
            bytes_written = bytes_written,
            "incoming_image_written"
        );

        Ok(name)
    }
}

/// Drain `content` into a new file at `path`.
async fn write_content(path: &Path, mut content: ContentStream) -> std::io::Result<u64> {
    let mut file = tokio::fs::File::create(path).await?;
    let mut written = 0u64;

    while let Some(chunk) = content.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }

    file.flush().await?;
    Ok(written)
}

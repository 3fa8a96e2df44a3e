use thiserror::Error;

use crate::line::ContentFetchError;
use crate::watermark::ProcessExecError;

/// Why an event left the pipeline without producing an output image.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("event is not a message event (got {0})")]
    InvalidWebhookEvent(&'static str),

    #[error("message is not an image (got {0})")]
    InvalidEventMessageType(&'static str),

    #[error("image content is not hosted by LINE (got {0})")]
    InvalidContentProvider(&'static str),

    #[error(transparent)]
    ContentFetch(#[from] ContentFetchError),

    #[error("failed to write incoming image: {0}")]
    WriteToFile(#[source] std::io::Error),

    #[error("failed to apply watermark: {0}")]
    ProcessExec(#[from] ProcessExecError),
}

impl PipelineError {
    /// Stable label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::InvalidWebhookEvent(_) => "invalid_webhook_event",
            PipelineError::InvalidEventMessageType(_) => "invalid_event_message_type",
            PipelineError::InvalidContentProvider(_) => "invalid_content_provider",
            PipelineError::ContentFetch(_) => "content_fetch_error",
            PipelineError::WriteToFile(_) => "write_to_file_error",
            PipelineError::ProcessExec(_) => "process_exec_error",
        }
    }
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

//! LINE Messaging API webhook payload types.
//!
//! Only the parts of the payload the image pipeline consumes are modelled
//! in detail. Every union is closed: kinds the platform adds later land in
//! an `Unknown` variant instead of failing deserialization.

use serde::Deserialize;
use tracing::warn;

// =============================================================================
// Request Body
// =============================================================================

/// Body of a webhook delivery.
///
/// Events are kept as raw JSON until [`WebhookRequest::into_events`] so
/// one malformed event cannot reject the whole delivery.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookRequest {
    /// Bot user ID that should receive the events
    #[serde(default)]
    pub destination: Option<String>,
    /// Raw event objects in delivery order
    #[serde(default)]
    pub events: Vec<serde_json::Value>,
}

impl WebhookRequest {
    /// Convert raw events into typed events, skipping ones that do not parse.
    ///
    /// Order of the remaining events is preserved.
    pub fn into_events(self) -> Vec<WebhookEvent> {
        self.events
            .into_iter()
            .enumerate()
            .filter_map(|(index, raw)| match serde_json::from_value::<WebhookEvent>(raw) {
                Ok(event) => Some(event),
                Err(e) => {
                    warn!(index = index, error = %e, "line_event_malformed");
                    None
                }
            })
            .collect()
    }
}

// =============================================================================
// Webhook Events
// =============================================================================

/// A single webhook event, tagged by its `type` field.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WebhookEvent {
    Message(MessageEvent),
    Follow,
    Unfollow,
    Join,
    Leave,
    MemberJoined,
    MemberLeft,
    Postback,
    Beacon,
    AccountLink,
    Things,
    Unsend,
    VideoPlayComplete,
    #[serde(other)]
    Unknown,
}

impl WebhookEvent {
    /// Event kind as it appears on the wire, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            WebhookEvent::Message(_) => "message",
            WebhookEvent::Follow => "follow",
            WebhookEvent::Unfollow => "unfollow",
            WebhookEvent::Join => "join",
            WebhookEvent::Leave => "leave",
            WebhookEvent::MemberJoined => "memberJoined",
            WebhookEvent::MemberLeft => "memberLeft",
            WebhookEvent::Postback => "postback",
            WebhookEvent::Beacon => "beacon",
            WebhookEvent::AccountLink => "accountLink",
            WebhookEvent::Things => "things",
            WebhookEvent::Unsend => "unsend",
            WebhookEvent::VideoPlayComplete => "videoPlayComplete",
            WebhookEvent::Unknown => "unknown",
        }
    }
}

/// Payload of a `message` event.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MessageEvent {
    /// Token for replying to this event
    #[serde(default, rename = "replyToken")]
    pub reply_token: Option<String>,
    /// Event time in milliseconds since the epoch
    #[serde(default)]
    pub timestamp: Option<i64>,
    /// The message itself
    pub message: EventMessage,
}

// =============================================================================
// Messages
// =============================================================================

/// Message carried by a `message` event, tagged by its `type` field.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EventMessage {
    Image(ImageEventMessage),
    Text(TextEventMessage),
    Video,
    Audio,
    File,
    Location,
    Sticker,
    #[serde(other)]
    Unknown,
}

impl EventMessage {
    /// Message kind as it appears on the wire, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            EventMessage::Image(_) => "image",
            EventMessage::Text(_) => "text",
            EventMessage::Video => "video",
            EventMessage::Audio => "audio",
            EventMessage::File => "file",
            EventMessage::Location => "location",
            EventMessage::Sticker => "sticker",
            EventMessage::Unknown => "unknown",
        }
    }
}

/// An `image` message.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ImageEventMessage {
    /// Platform-assigned message ID, used to fetch the binary content
    pub id: String,
    /// Where the binary content is hosted
    #[serde(rename = "contentProvider")]
    pub content_provider: ContentProvider,
}

/// A `text` message.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TextEventMessage {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub text: String,
}

/// Where an image's bytes live.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ContentProvider {
    /// Hosted by LINE; fetchable through the content API
    Line,
    /// Hosted by a third party
    External {
        #[serde(default, rename = "originalContentUrl")]
        original_content_url: Option<String>,
        #[serde(default, rename = "previewImageUrl")]
        preview_image_url: Option<String>,
        #[serde(default)]
        url: Option<String>,
    },
}

impl ContentProvider {
    pub fn kind(&self) -> &'static str {
        match self {
            ContentProvider::Line => "line",
            ContentProvider::External { .. } => "external",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_image_message_event_deserialization() {
        let raw = json!({
            "type": "message",
            "replyToken": "r1",
            "timestamp": 1700000000000i64,
            "source": {"type": "user", "userId": "U1"},
            "message": {
                "type": "image",
                "id": "m1",
                "contentProvider": {"type": "line"}
            }
        });

        let event: WebhookEvent = serde_json::from_value(raw).unwrap();
        match event {
            WebhookEvent::Message(MessageEvent {
                message: EventMessage::Image(image),
                reply_token,
                ..
            }) => {
                assert_eq!(image.id, "m1");
                assert_eq!(image.content_provider, ContentProvider::Line);
                assert_eq!(reply_token.as_deref(), Some("r1"));
            }
            other => panic!("Expected image message, got {:?}", other),
        }
    }

    #[test]
    fn test_external_content_provider() {
        let raw = json!({
            "type": "image",
            "id": "m2",
            "contentProvider": {
                "type": "external",
                "originalContentUrl": "https://example.com/a.jpg"
            }
        });

        let message: EventMessage = serde_json::from_value(raw).unwrap();
        match message {
            EventMessage::Image(image) => {
                assert_eq!(image.content_provider.kind(), "external");
            }
            other => panic!("Expected image message, got {:?}", other),
        }
    }

    #[test]
    fn test_non_message_events_ignore_extra_fields() {
        let event: WebhookEvent =
            serde_json::from_value(json!({"type": "follow", "replyToken": "r"})).unwrap();
        assert_eq!(event, WebhookEvent::Follow);

        let event: WebhookEvent =
            serde_json::from_value(json!({"type": "brandNewKind", "x": 1})).unwrap();
        assert_eq!(event, WebhookEvent::Unknown);
    }

    #[test]
    fn test_text_message_kind() {
        let event: WebhookEvent = serde_json::from_value(json!({
            "type": "message",
            "message": {"type": "text", "text": "hi"}
        }))
        .unwrap();

        match event {
            WebhookEvent::Message(m) => assert_eq!(m.message.kind(), "text"),
            other => panic!("Expected message event, got {:?}", other),
        }
    }

    #[test]
    fn test_into_events_skips_malformed() {
        let request: WebhookRequest = serde_json::from_value(json!({
            "destination": "Ubot",
            "events": [
                {"type": "follow"},
                {"type": "message", "message": {"type": "image", "id": "m1"}},
                {"type": "message", "message": {"type": "text", "text": "hi"}}
            ]
        }))
        .unwrap();

        let events = request.into_events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], WebhookEvent::Follow);
        assert_eq!(events[1].kind(), "message");
    }
}

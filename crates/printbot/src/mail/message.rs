//! Message model as seen by the pipeline, plus its provider wire format.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Body format of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentType {
    #[default]
    Text,
    Html,
}

impl ContentType {
    /// Parses the provider's content type label. Anything but `html` is text.
    pub fn from_label(label: &str) -> Self {
        if label.trim().eq_ignore_ascii_case("html") {
            ContentType::Html
        } else {
            ContentType::Text
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Text => "text",
            ContentType::Html => "html",
        }
    }
}

/// A candidate message, read-only to the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    /// Mailbox-local item id. Changes when the message moves in some providers.
    pub id: String,
    /// Provider-assigned stable identifier (RFC 5322 Message-ID).
    pub internet_message_id: Option<String>,
    pub subject: String,
    /// Sender address, empty when the provider did not report one.
    pub sender: String,
    /// Received timestamp as reported by the provider.
    pub received: String,
    pub content_type: ContentType,
    pub body: String,
    /// Short preview used when the body is empty.
    pub body_preview: String,
}

impl Message {
    /// Dedup key: the stable identifier when present, else the local id.
    pub fn stable_id(&self) -> &str {
        match self.internet_message_id.as_deref() {
            Some(id) if !id.trim().is_empty() => id,
            _ => &self.id,
        }
    }

    /// True when `stable_id` had to fall back to the local id.
    pub fn uses_local_id(&self) -> bool {
        !matches!(self.internet_message_id.as_deref(), Some(id) if !id.trim().is_empty())
    }

    /// Parsed received timestamp, if the provider value is RFC 3339.
    pub fn received_at(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.received)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

/// Collection wrapper returned by list endpoints.
#[derive(Debug, Deserialize)]
pub(crate) struct GraphCollection<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
    #[serde(rename = "@odata.nextLink", default)]
    pub next_link: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GraphMessage {
    pub id: String,
    #[serde(default)]
    pub internet_message_id: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub from: Option<GraphRecipient>,
    #[serde(default)]
    pub received_date_time: Option<String>,
    #[serde(default)]
    pub body: Option<GraphBody>,
    #[serde(default)]
    pub body_preview: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GraphRecipient {
    #[serde(default)]
    pub email_address: Option<GraphEmailAddress>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GraphEmailAddress {
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GraphBody {
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

impl From<GraphMessage> for Message {
    fn from(msg: GraphMessage) -> Self {
        let sender = msg
            .from
            .and_then(|from| from.email_address)
            .and_then(|addr| addr.address)
            .unwrap_or_default();
        let (content_type, body) = match msg.body {
            Some(body) => (
                body.content_type
                    .as_deref()
                    .map(ContentType::from_label)
                    .unwrap_or_default(),
                body.content.unwrap_or_default(),
            ),
            None => (ContentType::Text, String::new()),
        };

        Message {
            id: msg.id,
            internet_message_id: msg.internet_message_id,
            subject: msg.subject.unwrap_or_default(),
            sender,
            received: msg.received_date_time.unwrap_or_default(),
            content_type,
            body,
            body_preview: msg.body_preview.unwrap_or_default(),
        }
    }
}

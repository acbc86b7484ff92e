//! Outcome model returned by every capability handler.

use std::ops::Deref;

use rmcp::model::{CallToolResult, Content, ResourceContents};
use serde::Serialize;
use serde_json::{json, Value as JsonValue};

/// One unit of response payload handed back to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentItem {
    /// Base64-encoded inline image.
    Image {
        data: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
    Text { text: String },
    /// Binary payload addressed by a `data:` URI.
    Resource { resource: EmbeddedResource },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmbeddedResource {
    pub uri: String,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
}

impl EmbeddedResource {
    /// The base64 payload carried by the data URI, if it is one.
    pub fn blob(&self) -> Option<&str> {
        self.uri
            .strip_prefix("data:")
            .and_then(|rest| rest.split_once(";base64,"))
            .map(|(_, data)| data)
    }
}

/// A non-empty run of content items. Only [`Outcome::success`] builds one,
/// so a success can never be empty:
///
/// ```compile_fail
/// use pylon_mcp_gateway::core::content::{ContentItems, Outcome};
/// let empty = Outcome::Success(ContentItems(Vec::new()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ContentItems(Vec<ContentItem>);

impl Deref for ContentItems {
    type Target = [ContentItem];

    fn deref(&self) -> &[ContentItem] {
        &self.0
    }
}

/// Success carries at least one item; failure carries one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success(ContentItems),
    Failure(String),
}

impl Outcome {
    pub fn success(item: ContentItem) -> Self {
        Outcome::Success(ContentItems(vec![item]))
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Outcome::Failure(message.into())
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Outcome::Failure(_))
    }

    pub fn items(&self) -> &[ContentItem] {
        match self {
            Outcome::Success(items) => &items[..],
            Outcome::Failure(_) => &[],
        }
    }

    /// Wire shape: `{"content":[...]}` plus `"isError": true` on failure.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Outcome::Success(items) => json!({ "content": items }),
            Outcome::Failure(message) => json!({
                "content": [ContentItem::Text { text: message.clone() }],
                "isError": true,
            }),
        }
    }
}

impl From<ContentItem> for Content {
    fn from(item: ContentItem) -> Self {
        match item {
            ContentItem::Image { data, mime_type } => Content::image(data, mime_type),
            ContentItem::Text { text } => Content::text(text),
            ContentItem::Resource { resource } => {
                let blob = resource.blob().unwrap_or_default().to_owned();
                let contents = serde_json::from_value::<ResourceContents>(json!({
                    "uri": resource.uri,
                    "mimeType": resource.mime_type,
                    "blob": blob,
                }));
                match contents {
                    Ok(contents) => Content::resource(contents),
                    Err(e) => Content::text(format!("unrepresentable resource: {e}")),
                }
            }
        }
    }
}

impl From<Outcome> for CallToolResult {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Success(items) => {
                CallToolResult::success(items.0.into_iter().map(Content::from).collect())
            }
            Outcome::Failure(message) => CallToolResult::error(vec![Content::text(message)]),
        }
    }
}

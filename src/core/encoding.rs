//! Response encoder: successful response bytes -> protocol content.
//!
//! The rule is declared by each capability and never sniffed from the
//! payload. Structured responses keep the key order the remote sent.

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::core::content::{ContentItem, EmbeddedResource};
use crate::core::error::CapabilityError;

/// Where an image's MIME type comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MimeSource {
    Fixed(&'static str),
    /// Response `content-type`, or `fallback` when the header is missing.
    Response { fallback: &'static str },
}

impl MimeSource {
    pub fn resolve(&self, content_type: Option<&str>) -> String {
        match self {
            MimeSource::Fixed(mime) => (*mime).to_owned(),
            MimeSource::Response { fallback } => content_type
                .and_then(essence)
                .unwrap_or(*fallback)
                .to_owned(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Image(MimeSource),
    JsonText,
    Resource { mime: &'static str },
}

impl Encoding {
    pub fn encode(
        &self,
        body: &[u8],
        content_type: Option<&str>,
    ) -> Result<ContentItem, CapabilityError> {
        match self {
            Encoding::Image(source) => Ok(image(body, source.resolve(content_type))),
            Encoding::JsonText => json_text(body),
            Encoding::Resource { mime } => Ok(resource(body, mime)),
        }
    }
}

pub fn image(body: &[u8], mime_type: impl Into<String>) -> ContentItem {
    ContentItem::Image {
        data: STANDARD.encode(body),
        mime_type: mime_type.into(),
    }
}

/// Parse as JSON and re-emit with two-space indentation.
pub fn json_text(body: &[u8]) -> Result<ContentItem, CapabilityError> {
    let value: serde_json::Value = serde_json::from_slice(body)?;
    let text = serde_json::to_string_pretty(&value)?;
    Ok(ContentItem::Text { text })
}

pub fn resource(body: &[u8], mime_type: &str) -> ContentItem {
    ContentItem::Resource {
        resource: EmbeddedResource {
            uri: data_uri(mime_type, body),
            mime_type: mime_type.to_owned(),
        },
    }
}

pub fn data_uri(mime_type: &str, body: &[u8]) -> String {
    format!("data:{mime_type};base64,{}", STANDARD.encode(body))
}

/// Inverse of [`data_uri`]: returns the MIME type and the decoded bytes.
pub fn decode_data_uri(uri: &str) -> Option<(String, Vec<u8>)> {
    let rest = uri.strip_prefix("data:")?;
    let (mime, data) = rest.split_once(";base64,")?;
    let bytes = STANDARD.decode(data).ok()?;
    Some((mime.to_owned(), bytes))
}

pub fn decode_base64(data: &str) -> Option<Vec<u8>> {
    STANDARD.decode(data).ok()
}

/// `image/png; charset=binary` -> `image/png`
pub fn essence(content_type: &str) -> Option<&str> {
    let mime = content_type.split(';').next()?.trim();
    (!mime.is_empty()).then_some(mime)
}

use std::time::Duration;

use thiserror::Error;

/// Failure raised while talking to a remote service. Any non-2xx status is
/// folded in here, so the response encoder only ever sees successful bytes.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("API error {status}: {body}")]
    Status { status: u16, body: String },
    #[error("request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
    #[error("{0}")]
    Network(String),
    #[error("request cancelled")]
    Cancelled,
    #[error("invalid request URL: {0}")]
    InvalidUrl(String),
}

impl TransportError {
    pub fn status_code(&self) -> Option<u16> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Worth another attempt: timeouts, connection faults, 429 and 5xx.
    /// Other 4xx answers will not change on a retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            TransportError::Timeout(_) | TransportError::Network(_) => true,
            TransportError::Status { status, .. } => *status == 429 || *status >= 500,
            TransportError::Cancelled | TransportError::InvalidUrl(_) => false,
        }
    }
}

/// Everything that can go wrong between an inbound invocation and its outcome.
#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("invalid argument `{field}`: {reason}")]
    Validation { field: String, reason: String },
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("could not decode response: {0}")]
    Decoding(String),
    #[error("unknown capability group: {0}")]
    UnknownCapabilityGroup(String),
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    #[error("duplicate tool name: {0}")]
    DuplicateTool(String),
}

impl CapabilityError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        CapabilityError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Short label used for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            CapabilityError::Validation { .. } => "validation",
            CapabilityError::Transport(_) => "transport",
            CapabilityError::Decoding(_) => "decoding",
            CapabilityError::UnknownCapabilityGroup(_) => "unknown_group",
            CapabilityError::UnknownTool(_) => "unknown_tool",
            CapabilityError::DuplicateTool(_) => "duplicate_tool",
        }
    }
}

impl From<serde_json::Error> for CapabilityError {
    fn from(e: serde_json::Error) -> Self {
        CapabilityError::Decoding(e.to_string())
    }
}

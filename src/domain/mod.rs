//! Endpoint directory: capability group -> remote base URL.

use std::collections::BTreeMap;

use crate::core::error::CapabilityError;

/// Compiled-in base URLs. Configuration may override individual entries.
pub const DEFAULT_ENDPOINTS: &[(&str, &str)] = &[
    ("screenshot", "https://pylon-screenshot-api.fly.dev"),
    ("pdf_parse", "https://pylon-pdf-parse-api.fly.dev"),
    ("qr_code", "https://pylon-qr-code-api.fly.dev"),
    ("domain_intel", "https://pylon-domain-intel-api.fly.dev"),
    ("email_validate", "https://pylon-email-validate-api.fly.dev"),
    ("image_resize", "https://pylon-image-resize-api.fly.dev"),
    ("md_to_pdf", "https://pylon-md-to-pdf-api.fly.dev"),
    ("html_to_pdf", "https://pylon-html-to-pdf-api.fly.dev"),
    ("ocr", "https://pylon-ocr-api.fly.dev"),
    ("alpha_alerts", "https://pylon-alpha-alerts-api.fly.dev"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointEntry<'a> {
    pub name: &'a str,
    pub base_url: &'a str,
}

/// Read-only after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointDirectory {
    entries: BTreeMap<String, String>,
}

impl Default for EndpointDirectory {
    fn default() -> Self {
        Self {
            entries: DEFAULT_ENDPOINTS
                .iter()
                .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
                .collect(),
        }
    }
}

impl EndpointDirectory {
    /// Defaults with `overrides` applied. Overriding a group that has no
    /// default entry is rejected.
    pub fn with_overrides<'a, I>(overrides: I) -> Result<Self, CapabilityError>
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        let mut dir = Self::default();
        for (group, base) in overrides {
            let slot = dir
                .entries
                .get_mut(group.as_str())
                .ok_or_else(|| CapabilityError::UnknownCapabilityGroup(group.clone()))?;
            *slot = base.clone();
        }
        Ok(dir)
    }

    pub fn resolve(&self, group: &str) -> Result<&str, CapabilityError> {
        self.entries
            .get(group)
            .map(String::as_str)
            .ok_or_else(|| CapabilityError::UnknownCapabilityGroup(group.to_owned()))
    }

    pub fn entries(&self) -> impl Iterator<Item = EndpointEntry<'_>> {
        self.entries.iter().map(|(name, base_url)| EndpointEntry { name, base_url })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

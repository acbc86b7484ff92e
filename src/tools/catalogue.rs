//! The ten published capabilities, as data.

use crate::core::encoding::{Encoding, MimeSource};
use crate::core::schema::{DefaultValue, ParamKind, ParamSpec};
use crate::core::tool::{CapabilityDefinition, RequestShape};

const PNG: Encoding = Encoding::Image(MimeSource::Fixed("image/png"));
const PDF: Encoding = Encoding::Resource { mime: "application/pdf" };

pub const ALERT_TYPES: &[&str] = &["latest", "whales", "launches"];

pub const CAPABILITIES: &[CapabilityDefinition] = &[
    CapabilityDefinition {
        name: "pylon_screenshot",
        group: "screenshot",
        action: "Screenshot",
        description: "Take a screenshot of any webpage. Returns a PNG image.",
        params: &[
            ParamSpec::required("url", "URL to screenshot", ParamKind::Url),
            ParamSpec::optional(
                "width",
                "Viewport width",
                ParamKind::Integer { min: 320, max: 3840 },
                DefaultValue::Int(1280),
            ),
            ParamSpec::optional(
                "height",
                "Viewport height",
                ParamKind::Integer { min: 200, max: 2160 },
                DefaultValue::Int(800),
            ),
            ParamSpec::optional(
                "full_page",
                "Capture full scrollable page",
                ParamKind::Boolean,
                DefaultValue::Bool(false),
            ),
        ],
        request: RequestShape::Query {
            path: "/screenshot",
            fields: &[
                ("url", "url"),
                ("width", "width"),
                ("height", "height"),
                ("full_page", "fullPage"),
            ],
            fixed: &[("format", "png")],
        },
        encoding: PNG,
    },
    CapabilityDefinition {
        name: "pylon_pdf_parse",
        group: "pdf_parse",
        action: "PDF parse",
        description: "Extract text and metadata from a PDF file. Provide a publicly accessible URL to the PDF.",
        params: &[ParamSpec::required("file_url", "URL to the PDF file", ParamKind::Url)],
        request: RequestShape::JsonBody { path: "/parse", fields: &["file_url"] },
        encoding: Encoding::JsonText,
    },
    CapabilityDefinition {
        name: "pylon_qr_code",
        group: "qr_code",
        action: "QR code",
        description: "Generate a QR code image from text or a URL. Returns a PNG image.",
        params: &[ParamSpec::required(
            "text",
            "Text or URL to encode in the QR code",
            ParamKind::Text { non_empty: true },
        )],
        request: RequestShape::Query { path: "/qr", fields: &[("text", "text")], fixed: &[] },
        encoding: PNG,
    },
    CapabilityDefinition {
        name: "pylon_domain_intel",
        group: "domain_intel",
        action: "Domain intel",
        description: "Get WHOIS and DNS intelligence for a domain. Returns JSON with registration, nameservers, DNS records, etc.",
        params: &[ParamSpec::required(
            "domain",
            "Domain name to look up (e.g. example.com)",
            ParamKind::Text { non_empty: false },
        )],
        request: RequestShape::Query { path: "/lookup", fields: &[("domain", "domain")], fixed: &[] },
        encoding: Encoding::JsonText,
    },
    CapabilityDefinition {
        name: "pylon_email_validate",
        group: "email_validate",
        action: "Email validation",
        description: "Validate an email address. Checks format, MX records, and deliverability. Returns JSON.",
        params: &[ParamSpec::required("email", "Email address to validate", ParamKind::Email)],
        request: RequestShape::Query { path: "/validate", fields: &[("email", "email")], fixed: &[] },
        encoding: Encoding::JsonText,
    },
    CapabilityDefinition {
        name: "pylon_image_resize",
        group: "image_resize",
        action: "Image resize",
        description: "Resize an image from a URL. Returns the resized image.",
        params: &[
            ParamSpec::required("file_url", "URL to the image file", ParamKind::Url),
            ParamSpec::required(
                "width",
                "Target width in pixels",
                ParamKind::Integer { min: 1, max: 4096 },
            ),
            ParamSpec::required(
                "height",
                "Target height in pixels",
                ParamKind::Integer { min: 1, max: 4096 },
            ),
        ],
        request: RequestShape::Query {
            path: "/resize",
            fields: &[("file_url", "file_url"), ("width", "width"), ("height", "height")],
            fixed: &[],
        },
        encoding: Encoding::Image(MimeSource::Response { fallback: "image/png" }),
    },
    CapabilityDefinition {
        name: "pylon_md_to_pdf",
        group: "md_to_pdf",
        action: "MD to PDF",
        description: "Convert Markdown text to a PDF document. Returns base64-encoded PDF.",
        params: &[ParamSpec::required(
            "markdown",
            "Markdown content to convert",
            ParamKind::Text { non_empty: false },
        )],
        request: RequestShape::JsonBody { path: "/convert", fields: &["markdown"] },
        encoding: PDF,
    },
    CapabilityDefinition {
        name: "pylon_html_to_pdf",
        group: "html_to_pdf",
        action: "HTML to PDF",
        description: "Convert raw HTML to a PDF document. Returns base64-encoded PDF.",
        params: &[ParamSpec::required(
            "html",
            "HTML content to convert",
            ParamKind::Text { non_empty: false },
        )],
        request: RequestShape::JsonBody { path: "/convert", fields: &["html"] },
        encoding: PDF,
    },
    CapabilityDefinition {
        name: "pylon_ocr",
        group: "ocr",
        action: "OCR",
        description: "Extract text from an image using OCR. Provide a publicly accessible URL to the image.",
        params: &[ParamSpec::required("file_url", "URL to the image file", ParamKind::Url)],
        request: RequestShape::JsonBody { path: "/ocr", fields: &["file_url"] },
        encoding: Encoding::JsonText,
    },
    CapabilityDefinition {
        name: "pylon_alpha_alerts",
        group: "alpha_alerts",
        action: "Alpha alerts",
        description: "Get crypto alpha alerts: latest signals, whale movements, or new token launches. Returns JSON.",
        params: &[ParamSpec::optional(
            "type",
            "Type of alerts to fetch",
            ParamKind::Choice(ALERT_TYPES),
            DefaultValue::Str("latest"),
        )],
        request: RequestShape::Query { path: "/alerts", fields: &[("type", "type")], fixed: &[] },
        encoding: Encoding::JsonText,
    },
];

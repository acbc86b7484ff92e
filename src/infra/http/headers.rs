use std::sync::atomic::{AtomicU64, Ordering};

use reqwest::RequestBuilder;

static SEQ: AtomicU64 = AtomicU64::new(0);

/// Request id for log correlation, e.g. `pylon-20261017T101500123-7`.
pub fn generate_request_id() -> String {
    let now = chrono::Utc::now();
    let seq = SEQ.fetch_add(1, Ordering::Relaxed);
    format!("pylon-{}-{seq}", now.format("%Y%m%dT%H%M%S%3f"))
}

/// Add standard headers to an outgoing request. Returns the updated builder and the request id used.
pub fn add_standard_headers(
    builder: RequestBuilder,
    request_id: Option<String>,
) -> (RequestBuilder, String) {
    let rid = request_id.unwrap_or_else(generate_request_id);
    let b = builder.header("x-request-id", rid.as_str()).header(
        reqwest::header::USER_AGENT,
        format!("pylon-mcp-gateway/{}", env!("CARGO_PKG_VERSION")),
    );
    (b, rid)
}

/// Attach the shared secret when one is configured; absent means no header.
pub fn add_test_key(builder: RequestBuilder, test_key: Option<&str>) -> RequestBuilder {
    match test_key {
        Some(key) => builder.header("x-test-key", key),
        None => builder,
    }
}

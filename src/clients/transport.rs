use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client, Url};
use serde_json::Value as JsonValue;
use tokio_util::sync::CancellationToken;

use crate::core::error::TransportError;
use crate::core::tool::HttpMethod;
use crate::infra::config::TransportConfig;
use crate::infra::http::headers::{add_standard_headers, add_test_key, generate_request_id};
use crate::infra::runtime::limits::{make_http_client_with, retry_async};

pub const JSON: &str = "application/json";

/// One outbound call, built per invocation and discarded afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportRequest {
    pub method: HttpMethod,
    pub base_url: String,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<JsonValue>,
    pub content_type: &'static str,
}

impl TransportRequest {
    pub fn get(base_url: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            base_url: base_url.into(),
            path: path.into(),
            query: Vec::new(),
            body: None,
            content_type: JSON,
        }
    }

    pub fn post(base_url: impl Into<String>, path: impl Into<String>, body: JsonValue) -> Self {
        Self {
            method: HttpMethod::Post,
            body: Some(body),
            ..Self::get(base_url, path)
        }
    }

    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }

    /// `base` + `path`, with the query form-encoded.
    pub fn url(&self) -> Result<Url, TransportError> {
        let raw = format!("{}{}", self.base_url.trim_end_matches('/'), self.path);
        let mut url = Url::parse(&raw).map_err(|e| TransportError::InvalidUrl(format!("{raw}: {e}")))?;
        if !self.query.is_empty() {
            url.query_pairs_mut().extend_pairs(self.query.iter());
        }
        Ok(url)
    }
}

/// A successful (2xx) response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Vec<u8>,
    pub content_type: Option<String>,
}

/// Seam between the registry and the network.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        request: &TransportRequest,
        cancel: &CancellationToken,
    ) -> Result<TransportResponse, TransportError>;
}

#[derive(Clone)]
pub struct HttpTransport {
    http: Client,
    test_key: Option<String>,
    timeout: Duration,
    retries: u32,
    max_error_body: usize,
}

impl HttpTransport {
    pub fn from_config(cfg: &TransportConfig) -> Result<Self, TransportError> {
        Ok(Self {
            http: make_http_client_with(cfg)?,
            test_key: cfg.test_key.clone(),
            timeout: cfg.timeout,
            retries: cfg.retries,
            max_error_body: cfg.max_error_body,
        })
    }

    pub async fn get(
        &self,
        base_url: &str,
        path: &str,
        query: Vec<(String, String)>,
        cancel: &CancellationToken,
    ) -> Result<TransportResponse, TransportError> {
        let request = TransportRequest::get(base_url, path).with_query(query);
        self.send(&request, cancel).await
    }

    pub async fn post(
        &self,
        base_url: &str,
        path: &str,
        body: JsonValue,
        cancel: &CancellationToken,
    ) -> Result<TransportResponse, TransportError> {
        let request = TransportRequest::post(base_url, path, body);
        self.send(&request, cancel).await
    }

    async fn attempt(&self, url: Url, request: &TransportRequest, rid: &str) -> Result<TransportResponse, TransportError> {
        let builder = match request.method {
            HttpMethod::Get => self.http.get(url),
            HttpMethod::Post => {
                let body = match &request.body {
                    Some(JsonValue::String(s)) => s.clone(),
                    Some(v) => serde_json::to_string(v).map_err(|e| TransportError::Network(e.to_string()))?,
                    None => String::new(),
                };
                self.http.post(url).header(CONTENT_TYPE, request.content_type).body(body)
            }
        };
        let (builder, _rid) = add_standard_headers(builder, Some(rid.to_owned()));
        let builder = add_test_key(builder, self.test_key.as_deref());

        let resp = builder.send().await.map_err(|e| self.classify(e))?;
        let status = resp.status();
        if !status.is_success() {
            // The status is known; the body is only diagnostic.
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: read_error_body(resp, self.max_error_body).await,
            });
        }
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let body = resp.bytes().await.map_err(|e| self.classify(e))?;
        Ok(TransportResponse {
            status: status.as_u16(),
            body: body.to_vec(),
            content_type,
        })
    }

    fn classify(&self, e: reqwest::Error) -> TransportError {
        if e.is_timeout() {
            TransportError::Timeout(self.timeout)
        } else {
            TransportError::Network(e.to_string())
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        request: &TransportRequest,
        cancel: &CancellationToken,
    ) -> Result<TransportResponse, TransportError> {
        let url = request.url()?;
        let rid = generate_request_id();
        tracing::debug!(method = request.method.as_str(), url = %url, request_id = %rid, "upstream request");

        // POST bodies are not known to be idempotent upstream; only GET retries.
        let retries = match request.method {
            HttpMethod::Get => self.retries,
            HttpMethod::Post => 0,
        };
        let start = Instant::now();
        let rid_ref = rid.as_str();
        let work = retry_async(retries, TransportError::is_retryable, move |n| {
            if n > 0 {
                tracing::debug!(attempt = n + 1, request_id = %rid_ref, "retrying upstream request");
            }
            self.attempt(url.clone(), request, rid_ref)
        });
        // One budget for the whole call, retries and backoff included.
        let res = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(TransportError::Cancelled),
            res = tokio::time::timeout(self.timeout, work) => {
                res.unwrap_or(Err(TransportError::Timeout(self.timeout)))
            }
        };
        match &res {
            Ok(r) => tracing::debug!(
                status = r.status,
                bytes = r.body.len(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                request_id = %rid,
                "upstream response"
            ),
            Err(e) => tracing::warn!(error = %e, request_id = %rid, "upstream request failed"),
        }
        res
    }
}

/// Best-effort read of a non-2xx body. Keeps at most `max` bytes (plus room
/// to finish a UTF-8 sequence); a body that fails mid-stream keeps what arrived.
async fn read_error_body(mut resp: reqwest::Response, max: usize) -> String {
    let keep = max.saturating_add(4);
    let mut kept = Vec::new();
    let mut total = 0usize;
    loop {
        match resp.chunk().await {
            Ok(Some(chunk)) => {
                total += chunk.len();
                let room = keep.saturating_sub(kept.len());
                kept.extend_from_slice(&chunk[..room.min(chunk.len())]);
            }
            Ok(None) => break,
            Err(e) => {
                tracing::debug!(error = %e, received = total, "error body cut short");
                break;
            }
        }
    }
    truncate_diagnostic(&String::from_utf8_lossy(&kept), total, max)
}

/// Cap diagnostic text at `max` bytes without splitting a UTF-8 sequence.
/// `total_len` is the full size the text was taken from.
pub fn truncate_diagnostic(text: &str, total_len: usize, max: usize) -> String {
    if total_len <= max && text.len() <= max {
        return text.to_owned();
    }
    let mut cut = max.min(text.len());
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}… [truncated {} bytes]", &text[..cut], total_len.saturating_sub(cut))
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn transport(cfg: TransportConfig) -> HttpTransport {
        HttpTransport::from_config(&cfg).unwrap()
    }

    #[test]
    fn url_joins_base_path_and_encodes_query() {
        let req = TransportRequest::get("https://svc.example/", "/qr")
            .with_query(vec![("text".into(), "a b&c".into())]);
        assert_eq!(req.url().unwrap().as_str(), "https://svc.example/qr?text=a+b%26c");
    }

    #[test]
    fn bad_base_is_invalid_url() {
        let err = TransportRequest::get("not a base", "/x").url().unwrap_err();
        assert!(matches!(err, TransportError::InvalidUrl(_)));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_diagnostic("short", 5, 10), "short");
        let long = "é".repeat(10); // 20 bytes
        let out = truncate_diagnostic(&long, long.len(), 5);
        assert!(out.starts_with("éé…"));
        assert!(out.ends_with("[truncated 16 bytes]"));
    }

    #[tokio::test]
    async fn get_returns_body_and_content_type() {
        let server = MockServer::start();
        let m = server.mock(|when, then| {
            when.method(GET)
                .path("/lookup")
                .query_param("domain", "example.com")
                .header_exists("x-request-id")
                .header_exists("user-agent");
            then.status(200).header("content-type", "application/json").body(r#"{"ok":true}"#);
        });
        let t = transport(TransportConfig::default());
        let res = t
            .get(
                &server.base_url(),
                "/lookup",
                vec![("domain".into(), "example.com".into())],
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        m.assert();
        assert_eq!(res.status, 200);
        assert_eq!(res.body, br#"{"ok":true}"#.to_vec());
        assert_eq!(res.content_type.as_deref(), Some("application/json"));
    }

    #[tokio::test]
    async fn post_sends_json_body() {
        let server = MockServer::start();
        let m = server.mock(|when, then| {
            when.method(POST)
                .path("/ocr")
                .header("content-type", "application/json")
                .json_body(json!({"file_url": "https://example.com/a.png"}));
            then.status(200).json_body(json!({"text": "hello"}));
        });
        let t = transport(TransportConfig::default());
        let res = t
            .post(
                &server.base_url(),
                "/ocr",
                json!({"file_url": "https://example.com/a.png"}),
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        m.assert();
        assert_eq!(res.status, 200);
    }

    #[tokio::test]
    async fn secret_header_is_attached_when_configured() {
        let server = MockServer::start();
        let m = server.mock(|when, then| {
            when.method(GET).path("/qr").header("x-test-key", "s3cret");
            then.status(200).body("png");
        });
        let t = transport(TransportConfig {
            test_key: Some("s3cret".into()),
            ..TransportConfig::default()
        });
        t.get(&server.base_url(), "/qr", Vec::new(), &CancellationToken::new())
            .await
            .unwrap();
        m.assert();
    }

    #[tokio::test]
    async fn non_success_status_is_a_failure_with_body() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/qr");
            then.status(429).body("slow down");
        });
        let t = transport(TransportConfig::default());
        let err = t
            .get(&server.base_url(), "/qr", Vec::new(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), Some(429));
        assert_eq!(err.to_string(), "API error 429: slow down");
    }

    #[tokio::test]
    async fn long_error_bodies_are_capped() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/qr");
            then.status(500).body("x".repeat(10_000));
        });
        let t = transport(TransportConfig {
            max_error_body: 64,
            ..TransportConfig::default()
        });
        let err = t
            .get(&server.base_url(), "/qr", Vec::new(), &CancellationToken::new())
            .await
            .unwrap_err();
        let TransportError::Status { body, .. } = err else {
            panic!("expected status error")
        };
        assert!(body.len() < 128);
        assert!(body.contains("truncated 9936 bytes"));
    }

    #[tokio::test]
    async fn get_retries_when_configured() {
        let server = MockServer::start();
        let m = server.mock(|when, then| {
            when.method(GET).path("/alerts");
            then.status(503).body("warming up");
        });
        let t = transport(TransportConfig {
            retries: 2,
            ..TransportConfig::default()
        });
        let err = t
            .get(&server.base_url(), "/alerts", Vec::new(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), Some(503));
        m.assert_hits(3);
    }

    #[tokio::test]
    async fn post_is_never_retried() {
        let server = MockServer::start();
        let m = server.mock(|when, then| {
            when.method(POST).path("/convert");
            then.status(503);
        });
        let t = transport(TransportConfig {
            retries: 2,
            ..TransportConfig::default()
        });
        let err = t
            .post(&server.base_url(), "/convert", json!({"html": "<p/>"}), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), Some(503));
        assert!(err.to_string().starts_with("API error 503"));
        m.assert_hits(1);
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let server = MockServer::start();
        let m = server.mock(|when, then| {
            when.method(GET).path("/lookup");
            then.status(404).body("no such domain");
        });
        let t = transport(TransportConfig {
            retries: 3,
            ..TransportConfig::default()
        });
        let err = t
            .get(&server.base_url(), "/lookup", Vec::new(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "API error 404: no such domain");
        m.assert_hits(1);
    }

    #[tokio::test]
    async fn rate_limits_are_retried() {
        let server = MockServer::start();
        let m = server.mock(|when, then| {
            when.method(GET).path("/validate");
            then.status(429).body("slow down");
        });
        let t = transport(TransportConfig {
            retries: 1,
            ..TransportConfig::default()
        });
        let err = t
            .get(&server.base_url(), "/validate", Vec::new(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), Some(429));
        m.assert_hits(2);
    }

    #[tokio::test]
    async fn retries_share_one_timeout_budget() {
        let server = MockServer::start();
        let m = server.mock(|when, then| {
            when.method(GET).path("/screenshot");
            then.status(200).delay(Duration::from_secs(5)).body("late");
        });
        let t = transport(TransportConfig {
            timeout: Duration::from_millis(200),
            retries: 3,
            ..TransportConfig::default()
        });
        let start = Instant::now();
        let err = t
            .get(&server.base_url(), "/screenshot", Vec::new(), &CancellationToken::new())
            .await
            .unwrap_err();
        let elapsed = start.elapsed();
        assert!(matches!(err, TransportError::Timeout(_)), "got {err:?}");
        assert_eq!(err.to_string(), "request timed out after 200ms");
        assert!(elapsed < Duration::from_millis(600), "took {elapsed:?}");
        assert!(m.hits() <= 2);
    }

    /// Serves one request: a status line promising more body than it sends.
    async fn truncated_response_server(head: &'static str, partial: &'static str) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut req = Vec::new();
            let mut buf = [0u8; 1024];
            while !req.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = sock.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                req.extend_from_slice(&buf[..n]);
            }
            sock.write_all(head.as_bytes()).await.unwrap();
            sock.write_all(partial.as_bytes()).await.unwrap();
            let _ = sock.shutdown().await;
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn status_survives_a_truncated_error_body() {
        let base = truncated_response_server(
            "HTTP/1.1 500 Internal Server Error\r\nContent-Length: 100\r\n\r\n",
            "partial",
        )
        .await;
        let t = transport(TransportConfig::default());
        let err = t
            .get(&base, "/qr", Vec::new(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), Some(500), "got {err:?}");
        assert!(err.to_string().starts_with("API error 500: "));
    }

    #[tokio::test]
    async fn slow_upstream_times_out() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/screenshot");
            then.status(200).delay(Duration::from_secs(5)).body("late");
        });
        let t = transport(TransportConfig {
            timeout: Duration::from_millis(200),
            ..TransportConfig::default()
        });
        let start = Instant::now();
        let err = t
            .get(&server.base_url(), "/screenshot", Vec::new(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Timeout(_)), "got {err:?}");
        assert!(start.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn cancellation_abandons_the_call() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/screenshot");
            then.status(200).delay(Duration::from_secs(5)).body("late");
        });
        let t = transport(TransportConfig::default());
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });
        let start = Instant::now();
        let err = t
            .get(&server.base_url(), "/screenshot", Vec::new(), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Cancelled));
        assert!(start.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn connection_refused_is_a_network_failure() {
        let t = transport(TransportConfig::default());
        let err = t
            .get("http://127.0.0.1:9", "/x", Vec::new(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Network(_) | TransportError::Timeout(_)));
    }
}

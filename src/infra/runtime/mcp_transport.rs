//! Generic MCP transport helpers (stdio + streamable HTTP) decoupled from tool logic.

use std::sync::Arc;

use rmcp::serve_server;
use rmcp::transport::streamable_http_server::tower::{StreamableHttpServerConfig, StreamableHttpService};

pub use rmcp::transport::streamable_http_server::session::local::LocalSessionManager;
pub use rmcp::ServerHandler;

/// Serve `handler` over line-framed JSON-RPC on stdin/stdout until the peer hangs up.
pub async fn serve_stdio<H>(handler: H) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
where
    H: ServerHandler,
{
    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();
    let running = serve_server(handler, (stdin, stdout)).await?;
    let reason = running.waiting().await?;
    tracing::info!(?reason, "stdio session ended");
    Ok(())
}

/// Each new session gets a fresh handler from `factory`.
pub fn make_streamable_http_service<H>(
    factory: impl Fn() -> H + Send + Sync + 'static,
    session_mgr: Arc<LocalSessionManager>,
) -> StreamableHttpService<H, LocalSessionManager>
where
    H: ServerHandler,
{
    let cfg = StreamableHttpServerConfig::default();
    tracing::debug!(stateful_mode = cfg.stateful_mode, keep_alive = ?cfg.sse_keep_alive, "streamable HTTP config");
    StreamableHttpService::new(move || Ok(factory()), session_mgr, cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EndpointDirectory;
    use crate::infra::config::TransportConfig;
    use crate::infra::mcp::PylonSvc;
    use crate::clients::transport::HttpTransport;
    use crate::tools::{catalogue::CAPABILITIES, CapabilityRegistry};

    #[test]
    fn streamable_http_service_builds() {
        let transport = HttpTransport::from_config(&TransportConfig::default()).unwrap();
        let registry =
            CapabilityRegistry::new(CAPABILITIES, EndpointDirectory::default(), Arc::new(transport)).unwrap();
        let session_mgr = Arc::new(LocalSessionManager::default());
        let _svc = make_streamable_http_service(move || PylonSvc::new(registry.clone()), session_mgr);
    }
}

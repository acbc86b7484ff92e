use crate::infra::config::{AppConfig, Config};
use crate::infra::mcp::PylonSvc;
use crate::tools::CapabilityRegistry;
use std::net::SocketAddr;

/// Run the gateway in whichever mode `MODE` selects.
pub async fn run_server() -> anyhow::Result<()> {
    let cfg = Config::from_env();
    let app_cfg = AppConfig::from_env_and_toml()?;
    tracing::info!(
        mode = %cfg.mode,
        port = cfg.port,
        timeout_ms = app_cfg.transport.timeout.as_millis() as u64,
        retries = app_cfg.transport.retries,
        test_key = app_cfg.transport.test_key.is_some(),
        "BOOT pylon-mcp-gateway"
    );
    let registry = CapabilityRegistry::from_config(&app_cfg)?;

    match cfg.mode.as_str() {
        "stdio" => {
            crate::infra::runtime::mcp_transport::serve_stdio(PylonSvc::new(registry))
                .await
                .map_err(|e| anyhow::anyhow!(e))?;
        }
        "server" => {
            let app = crate::infra::http_app::build_app(registry);
            let addr: SocketAddr = ([0, 0, 0, 0], cfg.port).into();
            tracing::info!(%addr, "listening");
            axum::serve(tokio::net::TcpListener::bind(addr).await?, app).await?;
        }
        other => anyhow::bail!("invalid MODE: {other}. Must be 'stdio' or 'server'"),
    }
    Ok(())
}

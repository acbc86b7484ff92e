use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;

use crate::core::content::{ContentItem, Outcome};
use crate::core::encoding::{decode_base64, decode_data_uri};
use crate::core::schema::JsonObject;
use crate::infra::config::{AppConfig, Config};
use crate::tools::CapabilityRegistry;

#[derive(Parser)]
#[command(name = "pylon-mcp-gateway")]
#[command(about = "Pylon MCP Gateway - runs the gateway, or administers it with a subcommand")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Health check a running server-mode gateway
    Health {
        /// Service URL to check
        #[arg(short, long, default_value = "http://localhost:8080")]
        url: String,
    },
    /// Validate configuration
    Config {
        /// Validate config without starting service
        #[arg(long)]
        validate: bool,
    },
    /// List the published tools and the endpoint each one calls
    Tools,
    /// Invoke one capability and print the outcome
    Call {
        /// Tool name, e.g. `pylon_qr_code` or `qr_code`
        tool: String,
        /// Arguments as a JSON object
        #[arg(short, long, default_value = "{}")]
        args: String,
        /// Write the decoded image or resource bytes here
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

pub async fn run() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Some(command) => run_commands(command).await,
        None => match crate::infra::boot::run_server().await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                tracing::error!(error = %e, "gateway exited with error");
                eprintln!("❌ {e:#}");
                ExitCode::FAILURE
            }
        },
    }
}

pub async fn run_commands(command: Commands) -> ExitCode {
    match command {
        Commands::Health { url } => match health_check(&url).await {
            Ok(_) => {
                println!("✅ Service is healthy");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("❌ Health check failed: {}", e);
                ExitCode::FAILURE
            }
        },
        Commands::Config { validate: _ } => match validate_config() {
            Ok(cfg) => {
                println!("✅ Configuration is valid");
                println!("  Timeout: {}ms", cfg.transport.timeout.as_millis());
                println!("  Retries: {}", cfg.transport.retries);
                println!(
                    "  Test key: {}",
                    if cfg.transport.test_key.is_some() { "set" } else { "not set" }
                );
                if let Ok(dir) = cfg.endpoint_directory() {
                    println!("  Endpoints:");
                    for entry in dir.entries() {
                        println!("    {:<15} {}", entry.name, entry.base_url);
                    }
                }
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("❌ Configuration validation failed: {}", e);
                ExitCode::FAILURE
            }
        },
        Commands::Tools => match list_tools() {
            Ok(lines) => {
                for line in lines {
                    println!("{line}");
                }
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("❌ Could not load tools: {}", e);
                ExitCode::FAILURE
            }
        },
        Commands::Call { tool, args, output } => match call_tool(&tool, &args, output.as_deref()).await {
            Ok(outcome) => {
                println!("{}", serde_json::to_string_pretty(&outcome.to_json()).unwrap_or_default());
                if outcome.is_error() {
                    ExitCode::FAILURE
                } else {
                    ExitCode::SUCCESS
                }
            }
            Err(e) => {
                eprintln!("❌ Call failed: {}", e);
                ExitCode::FAILURE
            }
        },
    }
}

async fn health_check(url: &str) -> anyhow::Result<()> {
    let client = reqwest::Client::new();
    let response = client
        .get(format!("{}/healthz", url.trim_end_matches('/')))
        .timeout(std::time::Duration::from_millis(500))
        .send()
        .await?;

    if response.status().is_success() {
        Ok(())
    } else {
        anyhow::bail!("HTTP {}", response.status())
    }
}

fn validate_config() -> anyhow::Result<AppConfig> {
    let cfg = Config::from_env();
    if !matches!(cfg.mode.as_str(), "server" | "stdio") {
        anyhow::bail!("Invalid MODE: {}. Must be 'server' or 'stdio'", cfg.mode);
    }
    if cfg.mode == "server" && cfg.port == 0 {
        anyhow::bail!("PORT cannot be 0");
    }
    let app_cfg = AppConfig::from_env_and_toml()?;
    app_cfg.endpoint_directory()?;
    Ok(app_cfg)
}

fn list_tools() -> anyhow::Result<Vec<String>> {
    let registry = CapabilityRegistry::from_config(&AppConfig::from_env_and_toml()?)?;
    registry
        .list()
        .iter()
        .map(|def| -> anyhow::Result<String> {
            let base = registry.endpoints().resolve(def.group)?;
            Ok(format!(
                "{:<22} {} {}{}\n    {}",
                def.name,
                def.method().as_str(),
                base,
                def.request.path(),
                def.description
            ))
        })
        .collect()
}

async fn call_tool(tool: &str, raw_args: &str, output: Option<&Path>) -> anyhow::Result<Outcome> {
    let args: JsonObject = serde_json::from_str(raw_args)
        .map_err(|e| anyhow::anyhow!("--args must be a JSON object: {e}"))?;
    let registry = CapabilityRegistry::from_config(&AppConfig::from_env_and_toml()?)?;
    let outcome = registry.call(tool, &args, &CancellationToken::new()).await?;
    if let (Some(path), Some(item)) = (output, outcome.items().first()) {
        let bytes = payload_bytes(item)?;
        std::fs::write(path, &bytes)?;
        eprintln!("wrote {} bytes to {}", bytes.len(), path.display());
    }
    Ok(outcome)
}

/// Raw bytes behind a content item: decoded image/resource data, or UTF-8 text.
fn payload_bytes(item: &ContentItem) -> anyhow::Result<Vec<u8>> {
    match item {
        ContentItem::Image { data, .. } => {
            decode_base64(data).ok_or_else(|| anyhow::anyhow!("image data is not valid base64"))
        }
        ContentItem::Resource { resource } => decode_data_uri(&resource.uri)
            .map(|(_, bytes)| bytes)
            .ok_or_else(|| anyhow::anyhow!("resource uri is not a base64 data URI")),
        ContentItem::Text { text } => Ok(text.as_bytes().to_vec()),
    }
}

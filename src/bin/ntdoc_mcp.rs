//! Standalone MCP server binary for the NTDoc backend.
//!
//! Exposes the NTDoc document management REST API as MCP tools over a
//! streamable-HTTP transport with bearer-token passthrough.
//!
//! Usage:
//! ```
//! ntdoc-mcp --port 8002 --base-url http://localhost:8070
//! ```

use clap::Parser;
use ntdoc_mcp::config::{Overrides, Settings};
use ntdoc_mcp::mcp::runtime;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "ntdoc-mcp")]
#[command(about = "MCP gateway for the NTDoc document management API")]
#[command(version)]
struct Cli {
    /// Base URL of the NTDoc REST backend
    #[arg(long)]
    base_url: Option<String>,
    /// Address to bind the MCP server to
    #[arg(long)]
    host: Option<String>,
    /// Port to bind the MCP server to
    #[arg(long)]
    port: Option<u16>,
    /// Server name reported to MCP clients
    #[arg(long)]
    server_name: Option<String>,
    /// Enable debug logging
    #[arg(long)]
    debug: bool,
    /// Default log level when RUST_LOG is not set
    #[arg(long)]
    log_level: Option<String>,
    /// OAuth issuer URL advertised in the resource metadata
    #[arg(long)]
    issuer_url: Option<String>,
    /// Canonical URL of this resource server
    #[arg(long)]
    resource_server_url: Option<String>,
    /// Scope a token must carry; repeat the flag for multiple scopes
    #[arg(long = "required-scope")]
    required_scopes: Vec<String>,
}

impl Cli {
    fn into_overrides(self) -> Overrides {
        Overrides {
            backend_base_url: self.base_url,
            host: self.host,
            port: self.port,
            server_name: self.server_name,
            debug: self.debug,
            log_level: self.log_level,
            issuer_url: self.issuer_url,
            resource_server_url: self.resource_server_url,
            required_scopes: self.required_scopes,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Settings::resolve(cli.into_overrides(), |key| std::env::var(key).ok())?;
    init_tracing(&settings);

    tracing::info!(
        "Starting NTDoc MCP server v{} ({})",
        ntdoc_mcp::VERSION,
        settings.server_name
    );

    runtime::serve(settings).await
}

fn init_tracing(settings: &Settings) {
    let default_directive = if settings.debug {
        "debug".to_string()
    } else {
        settings.log_level.to_string().to_lowercase()
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

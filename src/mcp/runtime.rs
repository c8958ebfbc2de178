//! Streamable-HTTP runtime assembly.
//!
//! Wires the tool server, session manager, and auth gate into an axum app and
//! owns the serve loop. The process stays here until shutdown.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::middleware;
use axum::routing::{any_service, get};
use axum::Router;
use rmcp::transport::streamable_http_server::session::local::LocalSessionManager;
use rmcp::transport::streamable_http_server::StreamableHttpService;
use rmcp::transport::StreamableHttpServerConfig;
use tower_http::cors::{Any, CorsLayer};

use crate::backend::BackendClient;
use crate::config::Settings;
use crate::mcp::auth::{oauth_protected_resource, require_bearer_token, AuthGate};
use crate::mcp::server::NtdocBridgeServer;

/// Run the MCP server until shutdown. Returns only on ctrl-c or a fatal
/// startup error.
pub async fn serve(settings: Settings) -> Result<()> {
    let backend = BackendClient::new(settings.backend_base_url.clone())
        .context("failed to construct backend HTTP client")?;
    let server = NtdocBridgeServer::new(settings.server_name.clone(), backend);
    let gate = Arc::new(AuthGate::new(&settings));

    let mcp_service: StreamableHttpService<NtdocBridgeServer, LocalSessionManager> =
        StreamableHttpService::new(
            move || Ok(server.clone()),
            LocalSessionManager::default().into(),
            StreamableHttpServerConfig::default(),
        );

    // The metadata document must stay reachable without credentials so
    // clients can discover the authorization server after a 401.
    let metadata_routes = Router::new()
        .route(
            "/.well-known/oauth-protected-resource",
            get(oauth_protected_resource).options(oauth_protected_resource),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(gate.clone());

    let app = Router::new()
        .route("/mcp", any_service(mcp_service))
        .layer(middleware::from_fn_with_state(gate, require_bearer_token))
        .merge(metadata_routes);

    let listener = tokio::net::TcpListener::bind(settings.bind_addr())
        .await
        .with_context(|| format!("failed to bind {}", settings.bind_addr()))?;
    tracing::info!(
        "MCP server listening on http://{}/mcp (backend: {})",
        listener.local_addr()?,
        settings.backend_base_url
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("MCP server terminated abnormally")?;

    tracing::info!("MCP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to install ctrl-c handler: {err}");
        return;
    }
    tracing::info!("shutdown signal received");
}

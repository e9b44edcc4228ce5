//! Registrar server entry point.
//!
//! Initialises tracing, loads configuration from `REGISTRAR_*` environment
//! variables, opens the registrations file and serves:
//!   - `/mcp`: MCP Streamable-HTTP transport with the registration tools
//!   - the JSON API from [`http::router`] (including `/health`)

mod http;
mod state;
mod tools;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum_server::tls_rustls::RustlsConfig;
use tracing_subscriber::EnvFilter;

use rmcp::transport::streamable_http_server::{
    StreamableHttpService, session::local::LocalSessionManager,
};

use registrar_common::ServerConfig;

use crate::state::AppState;
use crate::tools::RegistrarTools;

const ENV_PREFIX: &str = "REGISTRAR_";

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Tracing with RUST_LOG env filter.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!("registrar-server starting");

    // 2. Configuration from REGISTRAR_* env vars.
    let config: ServerConfig = envy::prefixed(ENV_PREFIX)
        .from_env()
        .context("failed to load config from REGISTRAR_* env vars")?;

    tracing::info!(
        listen_addr = %config.listen_addr,
        registrations_file = %config.registrations_file.display(),
        tls_enabled = config.tls_paths().is_some(),
        "configuration loaded",
    );

    // 3. One store per process, shared by every transport.
    let state = Arc::new(AppState::open(&config.registrations_file)?);

    // 4. MCP service: a fresh RegistrarTools per session over the shared state.
    let state_for_factory = Arc::clone(&state);
    let service = StreamableHttpService::new(
        move || Ok(RegistrarTools::new(Arc::clone(&state_for_factory))),
        LocalSessionManager::default().into(),
        Default::default(),
    );

    let router = http::router(state).nest_service("/mcp", service);

    // 5. Bind and serve (TLS or plaintext).
    if let Some((cert_path, key_path)) = config.tls_paths() {
        tracing::info!("TLS enabled, loading cert from {}", cert_path.display());
        let tls_config = RustlsConfig::from_pem_file(cert_path, key_path)
            .await
            .context("failed to load TLS certificates")?;

        tracing::info!("registrar ready at https://{}", config.listen_addr);

        axum_server::bind_rustls(config.listen_addr, tls_config)
            .serve(router.into_make_service())
            .await
            .context("HTTPS server error")?;
    } else {
        tracing::info!(
            "registrar ready at http://{} (MCP at /mcp, TLS disabled)",
            config.listen_addr,
        );

        let listener = tokio::net::TcpListener::bind(config.listen_addr)
            .await
            .context("failed to bind TCP listener")?;

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("HTTP server error")?;
    }

    tracing::info!("registrar-server shut down");
    Ok(())
}

/// Wait for SIGINT (Ctrl-C) for graceful shutdown.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::info!("received shutdown signal");
}

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{info, warn};

use inputd_core::capability::CapabilityResolver;
use inputd_core::protocol;
use inputd_core::server::{Listener, ServerContext};
use inputd_platform::capability::BackendCandidate;

#[derive(Parser, Debug)]
#[command(name = "inputd")]
#[command(about = "Privileged local input-injection command server")]
#[command(version)]
struct Cli {
    /// Shared secret the automation controller must present
    token: Option<String>,

    /// TCP port to listen on (loopback only)
    #[arg(long, default_value_t = protocol::DEFAULT_PORT, env = "INPUTD_PORT")]
    port: u16,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "INPUTD_LOG_LEVEL")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    let Some(token) = cli.token else {
        bail!("no security token provided");
    };

    info!(
        "inputd v{} starting (token: {}…)",
        env!("CARGO_PKG_VERSION"),
        token_prefix(&token),
    );

    let resolver = Arc::new(CapabilityResolver::new(backend_candidates()));
    if !resolver.initialize() {
        // not fatal: injection commands report false until a lazy retry binds
        warn!("injection capability unavailable at startup");
    }

    let ctx = ServerContext::new(token.into_bytes(), resolver);
    let listener = Listener::bind(cli.port, ctx)
        .await
        .context("failed to create listening socket")?;

    listener.serve().await?;
    info!("server stopped");
    Ok(())
}

/// First few characters of the secret, enough to correlate logs without
/// writing the whole token to the log sink.
fn token_prefix(token: &str) -> &str {
    let end = token
        .char_indices()
        .nth(5)
        .map(|(i, _)| i)
        .unwrap_or(token.len());
    &token[..end]
}

#[cfg(target_os = "linux")]
fn backend_candidates() -> Vec<BackendCandidate> {
    inputd_linux::backend_candidates()
}

#[cfg(not(target_os = "linux"))]
fn backend_candidates() -> Vec<BackendCandidate> {
    Vec::new()
}

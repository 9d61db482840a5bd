//! Serve command - runs the session server.

use std::net::SocketAddr;

use anyhow::{Result, bail};
use clap::Args;
use keepsake_server::{Manager, Server, config::is_valid_cookie_name};
use keepsake_session::StoreRegistry;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::Context;

/// Arguments for the serve command.
///
/// CLI arguments override config file values.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to bind to (overrides config)
    #[arg(short, long)]
    pub bind: Option<SocketAddr>,

    /// Session backend name (overrides config)
    #[arg(long)]
    pub backend: Option<String>,

    /// Session cookie name (overrides config)
    #[arg(long)]
    pub cookie_name: Option<String>,

    /// Idle lifetime of sessions in seconds (overrides config)
    #[arg(long)]
    pub max_lifetime: Option<u64>,
}

/// Run the serve command.
pub async fn run(args: ServeArgs, ctx: &Context) -> Result<()> {
    let mut config = ctx.load_config()?;

    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    if let Some(backend) = args.backend {
        config.session.backend = backend;
    }
    if let Some(cookie_name) = args.cookie_name {
        if !is_valid_cookie_name(&cookie_name) {
            bail!("'{}' is not a valid cookie name", cookie_name);
        }
        config.session.cookie_name = cookie_name;
    }
    if let Some(secs) = args.max_lifetime {
        config.session.max_lifetime_secs = secs;
    }
    config.validate()?;

    // Backends are registered once, before any manager exists.
    let registry = StoreRegistry::with_memory().install()?;
    let manager = Manager::from_registry(
        registry,
        &config.session.backend,
        &config.session.cookie_name,
        config.session.store_config(),
    )?;

    info!(
        backend = %config.session.backend,
        cookie = %config.session.cookie_name,
        max_lifetime_secs = config.session.max_lifetime_secs,
        "Session manager ready"
    );
    if ctx.verbose {
        info!(backends = ?registry.names(), "Registered backends");
    }

    let shutdown = CancellationToken::new();
    tokio::spawn(cancel_on_signal(tokio::signal::ctrl_c(), shutdown.clone()));

    Server::new(manager, config.server).run(shutdown).await?;
    Ok(())
}

/// Cancel `shutdown` once `signal` fires.
///
/// If the signal handler cannot be installed the server keeps running and
/// has to be stopped some other way.
async fn cancel_on_signal(
    signal: impl Future<Output = std::io::Result<()>>,
    shutdown: CancellationToken,
) {
    match signal.await {
        Ok(()) => {
            info!("Shutdown signal received");
            shutdown.cancel();
        }
        Err(e) => warn!(error = %e, "Failed to listen for shutdown signal, Ctrl+C disabled"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_signal_cancels_shutdown() {
        let shutdown = CancellationToken::new();
        cancel_on_signal(async { Ok(()) }, shutdown.clone()).await;
        assert!(shutdown.is_cancelled());
    }

    #[tokio::test]
    async fn test_failed_signal_keeps_running() {
        let shutdown = CancellationToken::new();
        let failed = async { Err(std::io::Error::other("no signal support")) };

        cancel_on_signal(failed, shutdown.clone()).await;

        assert!(!shutdown.is_cancelled());
    }
}

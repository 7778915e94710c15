//! natsgate serve command
//!
//! Runs the gateway in the foreground until Ctrl-C or SIGTERM, then stops
//! it: the bus pool is drained and every client gets a normal close.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use natsgate_server::GatewayServer;
use tracing::{error, info};

use crate::config::{ConfigLoader, RawConfig};

/// Arguments for the serve command
#[derive(Debug, Default, Args)]
pub struct ServeArgs {
    /// Address to listen on, e.g. 0.0.0.0:8080
    #[arg(short, long)]
    pub listen: Option<String>,

    /// Bus address, e.g. nats://127.0.0.1:4222 or memory://
    #[arg(short, long)]
    pub bus: Option<String>,

    /// Allow-listed topic; repeat for several (replaces the configured list)
    #[arg(short, long = "topic", value_name = "TOPIC")]
    pub topics: Vec<String>,
}

impl ServeArgs {
    /// The flags as the last config layer
    fn overrides(&self) -> RawConfig {
        RawConfig {
            listen_address: self.listen.clone(),
            bus_address: self.bus.clone(),
            topics: (!self.topics.is_empty()).then(|| self.topics.clone()),
            ..RawConfig::default()
        }
    }
}

/// Run the serve command
pub async fn run(args: ServeArgs, explicit: Option<&Path>) -> Result<()> {
    let config = ConfigLoader::load(explicit, args.overrides())?;
    config.validate()?;
    if config.topics.is_empty() {
        tracing::warn!("no topics configured; every subscribe will be refused");
    }

    info!(
        address = %config.listen_address,
        bus = %config.bus_address,
        "starting natsgate"
    );
    let server = Arc::new(GatewayServer::new(config));

    let stopper = Arc::clone(&server);
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("shutdown signal received");
        stopper.stop().await;
    });

    if let Err(e) = server.start().await {
        error!(error = %e, "gateway failed");
        return Err(e).context("gateway failed");
    }
    info!("natsgate stopped");
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on unix
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

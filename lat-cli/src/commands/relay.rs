//! `lat relay` - run the relay agent as a native-messaging host
//!
//! The browser launches this process and talks to it over stdin/stdout, so
//! nothing but protocol frames may be written to stdout.

use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use lat_core::{HostKind, LatError};
use lat_relay::{HttpCollector, NativeHost, RelayAgent, TabCache};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::{ConfigLoader, LatConfig, validate_endpoint};

#[derive(Debug, Args)]
pub struct RelayArgs {
    /// Collector URL, overriding the configuration
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Browser family: chromium or firefox
    #[arg(long)]
    pub host: Option<HostKind>,
}

/// Apply command-line overrides on top of the loaded configuration
pub fn configure(args: &RelayArgs, mut config: LatConfig) -> Result<LatConfig> {
    if let Some(endpoint) = &args.endpoint {
        config.collector.endpoint = validate_endpoint(endpoint)?;
    }
    if let Some(host) = args.host {
        config.relay.host = host;
    }
    Ok(config)
}

/// Serve one native-messaging session until EOF or `shutdown`
///
/// Deliveries still in flight when the session ends get at most one
/// collector timeout to finish. Returns the number of frames read.
pub async fn serve<R, W>(
    config: &LatConfig,
    reader: R,
    writer: W,
    shutdown: CancellationToken,
) -> Result<usize, LatError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let collector = Arc::new(HttpCollector::new(&config.collector)?);
    let tabs = Arc::new(TabCache::new());
    let agent = Arc::new(RelayAgent::new(&config.relay, collector, tabs.clone()));
    let heartbeat = agent.spawn_heartbeat(shutdown.clone());

    let host = NativeHost::new(agent.clone(), tabs);
    let result = host.run(reader, writer, shutdown.clone()).await;

    shutdown.cancel();
    if let Err(e) = heartbeat.await {
        warn!(error = %e, "Heartbeat task failed");
    }
    if tokio::time::timeout(config.collector.timeout, agent.drain())
        .await
        .is_err()
    {
        warn!("Dropping deliveries still in flight");
    }

    Ok(result?)
}

pub async fn run(args: RelayArgs) -> Result<()> {
    let config = configure(&args, ConfigLoader::load()?)?;

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl-C");
                signal.cancel();
            }
            Err(e) => warn!(error = %e, "Could not listen for Ctrl-C"),
        }
    });

    info!(
        endpoint = %config.collector.endpoint,
        host = %config.relay.host,
        "Relay agent listening on stdio"
    );

    let frames = serve(&config, tokio::io::stdin(), tokio::io::stdout(), shutdown).await?;
    info!(frames, "Relay agent stopped");
    Ok(())
}

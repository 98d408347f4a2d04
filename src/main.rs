//! mDNS reflector - Entry point.
//!
//! Captures mDNS queries on the configured interface and re-emits them from
//! the interface's own hardware address, so discovery crosses the boundary
//! the interface bridges.

use std::borrow::Cow;

use anyhow::{Context, Result};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use bonjour_reflector::config::Config;
use bonjour_reflector::mdns::Reflector;
use bonjour_reflector::network::{
    BufferPool, CaptureFilter, CaptureSession, find_interface, local_mac,
};
use bonjour_reflector::pipeline::{PipelineStats, record_channel, spawn_decode_pipeline};
use bonjour_reflector::server::{ReflectorStats, run_reflector};

/// Wait for a shutdown signal, or for the reflector to stop on its own.
async fn wait_for_shutdown(
    cancel: CancellationToken,
    mut reflector_handle: JoinHandle<ReflectorStats>,
    pipeline_handle: JoinHandle<PipelineStats>,
) {
    let finished = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C received, shutting down...");
            None
        }
        result = &mut reflector_handle => Some(result),
    };
    cancel.cancel();

    // The pipeline only leaves a blocked publish once the reflector has dropped its receiver.
    let result = match finished {
        Some(result) => result,
        None => reflector_handle.await,
    };
    match result {
        Ok(stats) => info!(
            received = stats.records_received,
            reflected = stats.queries_reflected,
            dropped = stats.non_queries_dropped,
            failures = stats.failures,
            "Reflector stopped"
        ),
        Err(err) => error!("Reflector task failed: {err}"),
    }
    if let Err(err) = pipeline_handle.await {
        error!("Decode pipeline task failed: {err}");
    }

    info!("Shutdown complete.");
}

async fn run() -> Result<()> {
    let config_path = std::env::var("CONFIG_PATH")
        .map(Cow::Owned)
        .unwrap_or(Cow::Borrowed("config.toml"));
    let config = Config::load(config_path.as_ref()).context("Failed to load configuration")?;

    bonjour_reflector::metrics::init(&config.metrics).context("Failed to initialize metrics")?;
    if config.metrics.enabled {
        info!("Metrics enabled on {}", config.metrics.listen);
    }

    info!("Starting mDNS reflector on {}", config.interface);

    let interface =
        find_interface(&config.interface).context("Failed to find network interface")?;
    let our_mac = local_mac(&interface).context("Failed to get interface hardware address")?;
    info!("Local MAC: {our_mac}");

    let mut session = CaptureSession::open(&config.interface, &config.capture)
        .context("Failed to open capture session")?;
    let filter = CaptureFilter::for_local_mac(our_mac);
    session
        .set_filter(&filter)
        .context("Failed to install capture filter")?;
    info!("Capture filter: {filter}");

    let (capture, sender) = session.split().context("Failed to split capture session")?;

    let (record_tx, record_rx) = record_channel(config.channel_capacity);
    let cancel = CancellationToken::new();

    let pipeline_handle = spawn_decode_pipeline(capture, record_tx, cancel.clone());

    let reflector = Reflector::new(our_mac, BufferPool::new(config.buffer_pool_size));
    let reflector_handle = tokio::spawn(run_reflector(
        record_rx,
        reflector,
        sender,
        cancel.clone(),
    ));

    wait_for_shutdown(cancel, reflector_handle, pipeline_handle).await;

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    run().await
}

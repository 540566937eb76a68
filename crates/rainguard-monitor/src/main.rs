use anyhow::Context;
use clap::Parser;
use rainguard_monitor::config::{load_config, Args};
use rainguard_monitor::feed::run_feed;
use rainguard_monitor::logging::init_logging;
use rainguard_monitor::snapshot::{load_initial_stats, SnapshotClient};
use rainguard_monitor::{spawn_transport, DashboardStore, TransportConfig};
use std::io;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config(Args::parse()).context("invalid configuration")?;
    if !init_logging(&config) {
        eprintln!("logging already initialised; continuing with the existing subscriber");
    }

    info!(
        event = "monitor_start",
        origin = %config.origin,
        ws_url = %config.ws_url,
        stats_url = %config.stats_url,
        reconnect_delay_ms = config.reconnect_delay.as_millis() as u64,
        keepalive_secs = config.keepalive_interval.as_secs()
    );

    let store = DashboardStore::new();

    let printer = {
        let rx = store.subscribe();
        let severities = config.severities.clone();
        tokio::spawn(async move {
            if let Err(err) = run_feed(rx, severities, io::stdout()).await {
                error!(event = "feed_error", error = %err);
            }
        })
    };

    if config.snapshot_enabled {
        let client = SnapshotClient::new(config.stats_url.clone(), config.snapshot_timeout)
            .context("building snapshot client")?;
        let store = store.clone();
        tokio::spawn(async move {
            load_initial_stats(&client, &store).await;
        });
    }

    let transport = spawn_transport(
        TransportConfig {
            url: config.ws_url.clone(),
            reconnect_delay: config.reconnect_delay,
            keepalive_interval: config.keepalive_interval,
            max_frame_bytes: config.max_frame_bytes,
        },
        store.clone(),
    );

    tokio::signal::ctrl_c()
        .await
        .context("waiting for ctrl-c")?;

    info!(
        event = "monitor_stop",
        connect_attempts = transport.connect_attempts(),
        keepalives_sent = transport.keepalives_sent()
    );
    transport.shutdown();
    printer.abort();
    Ok(())
}

// Application crate: unwrap/expect/panic acceptable outside the libraries.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod snapshot;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::Parser;
use pixie_display::PixelDisplay;
use pixie_engine::messaging::mqtt::{self, BrokerSettings};
use pixie_engine::{LinkStatus, MessagingClient, Orchestrator, OrchestratorHandle};
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use crate::snapshot::PngSnapshotSink;

/// Time allowed for the transport task to close the connection on exit
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

#[derive(Parser, Debug)]
#[command(name = "pixie-sim")]
#[command(about = "Simulate a pixie 64x64 LED photo frame", long_about = None)]
#[command(version)]
struct Settings {
    /// MQTT broker host
    #[arg(long, env = "PIXIE_MQTT_HOST", default_value = "localhost")]
    host: String,
    /// MQTT broker port
    #[arg(long, env = "PIXIE_MQTT_PORT", default_value_t = 1883)]
    port: u16,
    /// Device identifier used in topic names
    #[arg(long, env = "PIXIE_ID", default_value_t = 12)]
    pixie_id: u32,
    /// Broker username
    #[arg(long, env = "PIXIE_MQTT_USERNAME", default_value = "server")]
    username: String,
    /// Broker password
    #[arg(long, env = "PIXIE_MQTT_PASSWORD", default_value = "", hide_env_values = true)]
    password: String,
    /// MQTT keep-alive in seconds
    #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u64).range(5..=3600))]
    keep_alive_secs: u64,
    /// Write the panel to this PNG file (refreshed at most once per second)
    #[arg(long, env = "PIXIE_SNAPSHOT")]
    snapshot: Option<PathBuf>,
    /// Snapshot upscale factor
    #[arg(long, default_value_t = 8, value_parser = clap::value_parser!(u32).range(1..=32))]
    scale: u32,
    /// Give up if the broker does not accept the connection within this many seconds
    #[arg(long, default_value_t = 15)]
    connect_timeout_secs: u64,
    /// Stop after this many seconds instead of running until interrupted
    #[arg(long)]
    run_for_secs: Option<u64>,
}

impl Settings {
    fn broker(&self) -> BrokerSettings {
        BrokerSettings {
            host: self.host.clone(),
            port: self.port,
            username: self.username.clone(),
            password: self.password.clone(),
            keep_alive: Duration::from_secs(self.keep_alive_secs),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::parse();
    init_tracing();
    tracing::info!(
        pixie = settings.pixie_id,
        host = %settings.host,
        port = settings.port,
        "starting simulator"
    );

    let display = match &settings.snapshot {
        Some(path) => {
            tracing::info!(path = %path.display(), "writing snapshots");
            PixelDisplay::with_sink(Box::new(PngSnapshotSink::new(
                path.clone(),
                settings.scale,
            )))
        }
        None => PixelDisplay::new(),
    };

    let (client, inbox, link) = MessagingClient::new(settings.pixie_id);
    let transport = mqtt::spawn(settings.broker(), link);

    let timeout = Duration::from_secs(settings.connect_timeout_secs);
    if let Err(err) = wait_connected(inbox.status.clone(), timeout).await {
        client.disconnect();
        return Err(err);
    }

    let (handle, intents) = OrchestratorHandle::channel();
    spawn_stop_triggers(&handle, settings.run_for_secs);

    let mut orchestrator = Orchestrator::new(display, client.clone());
    orchestrator.run(inbox, intents).await;

    client.disconnect();
    if tokio::time::timeout(SHUTDOWN_GRACE, transport).await.is_err() {
        tracing::warn!("transport did not shut down in time");
    }
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn wait_connected(mut status: watch::Receiver<LinkStatus>, timeout: Duration) -> Result<()> {
    let connected = tokio::time::timeout(
        timeout,
        status.wait_for(|link| *link == LinkStatus::Connected),
    )
    .await;
    match connected {
        Ok(Ok(_)) => Ok(()),
        Ok(Err(_)) => bail!("message bus client shut down before connecting"),
        Err(_) => bail!("broker did not accept the connection within {timeout:?}"),
    }
}

fn spawn_stop_triggers(handle: &OrchestratorHandle, run_for_secs: Option<u64>) {
    let on_interrupt = handle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, stopping");
            on_interrupt.stop();
        }
    });

    if let Some(secs) = run_for_secs {
        let on_deadline = handle.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(secs)).await;
            tracing::info!(secs, "run time elapsed, stopping");
            on_deadline.stop();
        });
    }
}

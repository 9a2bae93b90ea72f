//! Sotto Daemon - coalescing volume control service.
//!
//! This is the entry point for `sottod`, which serializes volume and mute
//! requests from many clients against one audio device and one settings
//! store, and notifies watching connections of out-of-band changes.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod controller;
mod monitor;
mod signals;

use sotto_core::DeviceState;
use sotto_db::{ConfigStore, Database};
use sotto_device::{Device, MixerProfile, ShellMixer};
use sotto_ipc::{Server, WatcherRegistry};

use controller::Controller;
use monitor::MonitorHandle;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("sotto=info".parse()?)
                .add_directive("sottod=debug".parse()?),
        )
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "Starting Sotto daemon");

    let config = config::load_config()?;

    let db = match &config.database.path {
        Some(path) => Database::open_at(path.clone()),
        None => Database::open(),
    }
    .context("Failed to open database")?;

    let mut store = ConfigStore::new(db, Duration::from_millis(config.daemon.stale_limit_ms));
    store.warm().context("Failed to load settings")?;

    let profile = MixerProfile {
        mixer_name: store.mixer_name()?,
        mode: store.mixer_mode()?,
        volume_curve: store.volume_curve()?,
    };
    info!(?profile, "Mixer configured");
    let mut device = ShellMixer::new(profile);

    // Baseline for out-of-band change detection. A device that is not
    // answering yet is not fatal; the store knows what we last wanted.
    let initial_state = match device.read() {
        Ok(state) => state,
        Err(e) => {
            warn!(error = %e, "Device unavailable at startup, seeding from the store");
            DeviceState { level: store.level()?, muted: store.mute()? }
        }
    };
    info!(level = initial_state.level, muted = initial_state.muted, "Initial device state");

    let (server, request_rx) =
        Server::bind(&config.daemon.bind_addr).await.context("Failed to start server")?;

    let watchers = Arc::new(WatcherRegistry::new());
    let cancel = CancellationToken::new();

    signals::setup_signal_handlers(cancel.clone());

    let server_cancel = cancel.clone();
    let server_task = tokio::spawn(async move {
        server.run(server_cancel).await;
    });

    let monitor = MonitorHandle::new(Duration::from_millis(config.daemon.monitor_period_ms));
    let tick_rx = monitor::spawn(monitor.clone(), cancel.clone());

    let controller =
        Controller::new(device, store, watchers, monitor, request_rx, tick_rx, initial_state);

    info!("Daemon running");
    controller.run(cancel.clone()).await;

    // The controller is the daemon's spine; once it stops, everything stops.
    cancel.cancel();
    let _ = server_task.await;

    info!("Sotto daemon stopped");
    Ok(())
}

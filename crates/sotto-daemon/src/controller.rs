//! The coordination engine.
//!
//! One controller task owns the device and the settings store outright; no
//! other task touches either. Each cycle drains every queued request into a
//! batch, folds the batch into at most one net level change plus a mute
//! transition, applies the side effects in the fixed order
//! mute -> set-level -> unmute, and fans replies out per command class.
//! Device polls requested by the change monitor run here too, so watcher
//! notifications leave in the same order the state changed.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use sotto_core::{Command, DeviceState, parse_error_line};
use sotto_db::ConfigStore;
use sotto_device::Device;
use sotto_ipc::{ClientId, Origin, Request, WatcherRegistry};

use crate::monitor::MonitorHandle;

/// What a processed batch asks of the daemon.
#[derive(Debug, PartialEq, Eq)]
pub enum BatchOutcome {
    Continue,
    Shutdown,
}

/// Per-class reply membership for one batch. An origin joins every class
/// implied by every command it issued, but appears at most once per class.
#[derive(Default)]
struct ReplyClasses {
    getters: HashMap<ClientId, Origin>,
    setters: HashMap<ClientId, Origin>,
    muters: HashMap<ClientId, Origin>,
    unmuters: HashMap<ClientId, Origin>,
    quitters: HashMap<ClientId, Origin>,
}

fn join(class: &mut HashMap<ClientId, Origin>, origin: Origin) {
    class.entry(origin.id()).or_insert(origin);
}

/// The single coordinating task over device, store, and watchers.
pub struct Controller<D: Device> {
    device: D,
    store: ConfigStore,
    watchers: Arc<WatcherRegistry>,
    monitor: MonitorHandle,
    requests: mpsc::Receiver<Request>,
    ticks: mpsc::Receiver<()>,
    /// Device state as of our last read or write, the baseline for
    /// out-of-band change detection.
    last_seen: DeviceState,
}

impl<D: Device> Controller<D> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        device: D,
        store: ConfigStore,
        watchers: Arc<WatcherRegistry>,
        monitor: MonitorHandle,
        requests: mpsc::Receiver<Request>,
        ticks: mpsc::Receiver<()>,
        initial_state: DeviceState,
    ) -> Self {
        Self { device, store, watchers, monitor, requests, ticks, last_seen: initial_state }
    }

    /// Process batches and polls until cancelled or shut down.
    pub async fn run(mut self, cancel: CancellationToken) {
        info!("Controller running");
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,

                Some(()) = self.ticks.recv() => self.poll_device(),

                request = self.requests.recv() => {
                    let Some(first) = request else { break };
                    let batch = self.drain_into_batch(first);
                    if self.process_batch(batch) == BatchOutcome::Shutdown {
                        info!("Shutdown requested by client");
                        cancel.cancel();
                        break;
                    }
                }
            }
        }
        info!("Controller stopped");
    }

    /// Pull everything already queued behind the first request; a burst of
    /// commands becomes one batch and one net device effect.
    fn drain_into_batch(&mut self, first: Request) -> Vec<Request> {
        let mut batch = vec![first];
        while let Ok(request) = self.requests.try_recv() {
            batch.push(request);
        }
        if batch.len() > 1 {
            debug!(len = batch.len(), "Coalescing batch");
        }
        batch
    }

    /// Apply one batch: fold commands, mutate the device at most once per
    /// effect, reply per class.
    fn process_batch(&mut self, batch: Vec<Request>) -> BatchOutcome {
        let seed = match self.store.level() {
            Ok(level) => level,
            Err(e) => {
                error!(error = %e, "Cannot read level, seeding from last device state");
                self.last_seen.level
            }
        };
        let mut level = i32::from(seed);

        let mut classes = ReplyClasses::default();
        let mut set_requested = false;
        let mut mute_requested = false;
        let mut unmute_requested = false;
        let mut shutdown = false;

        for request in batch {
            match request.command {
                Command::Get => join(&mut classes.getters, request.origin),
                Command::SetAbsolute(value) => {
                    set_requested = true;
                    level = i32::from(value);
                    join(&mut classes.setters, request.origin);
                }
                Command::Delta(delta) => {
                    set_requested = true;
                    level += i32::from(delta);
                    join(&mut classes.setters, request.origin);
                }
                Command::Mute => {
                    mute_requested = true;
                    unmute_requested = false;
                    join(&mut classes.muters, request.origin);
                }
                Command::Unmute => {
                    unmute_requested = true;
                    mute_requested = false;
                    join(&mut classes.unmuters, request.origin);
                }
                Command::Watch => {
                    // A new watcher starts from a known state: subscribe,
                    // then answer with the current status like a get.
                    self.watchers.add(request.origin.clone());
                    join(&mut classes.getters, request.origin);
                }
                Command::Quit => {
                    self.watchers.remove(request.origin.id());
                    join(&mut classes.quitters, request.origin);
                }
                Command::Shutdown => shutdown = true,
                Command::Unparsed => {
                    debug!(raw = %request.raw, "Unparsable input");
                    request.origin.send_line(parse_error_line(&request.raw));
                }
            }
        }

        let applied = self.apply_effects(seed, level, set_requested, mute_requested, unmute_requested);
        if applied.touched_device {
            self.monitor.reset_wait();
        }

        let status = self.status_line();
        if applied.mute_confirmed {
            self.send_class(&classes.muters, &status);
        }
        if applied.set_confirmed {
            self.send_class(&classes.setters, &status);
        }
        if applied.unmute_confirmed {
            self.send_class(&classes.unmuters, &status);
        }
        self.send_class(&classes.getters, &status);
        for quitter in classes.quitters.values() {
            quitter.close();
        }

        if shutdown { BatchOutcome::Shutdown } else { BatchOutcome::Continue }
    }

    /// Side effects in the fixed order mute -> set-level -> unmute. A batch
    /// that changes the level and ends unmuted engages mute around the
    /// level write so the change never lands audibly at the wrong level.
    fn apply_effects(
        &mut self,
        seed: u8,
        level: i32,
        set_requested: bool,
        mute_requested: bool,
        unmute_requested: bool,
    ) -> AppliedEffects {
        let mut applied = AppliedEffects::default();

        if mute_requested || (unmute_requested && set_requested) {
            match self.device.set_mute(true) {
                Ok(()) => {
                    applied.touched_device = true;
                    self.last_seen.muted = true;
                    if mute_requested {
                        if let Err(e) = self.store.set_mute(true) {
                            error!(error = %e, "Failed to persist mute");
                        }
                    }
                }
                Err(e) => {
                    error!(error = %e, "Device mute failed");
                    if mute_requested {
                        applied.mute_confirmed = false;
                    } else {
                        // The protective bracket could not engage; the
                        // level write below proceeds without it.
                        warn!("Level change proceeding unbracketed");
                    }
                }
            }
        }

        if set_requested {
            let warning = match self.store.warning_level() {
                Ok(w) => w,
                Err(e) => {
                    warn!(error = %e, "Cannot read warning level, clamping to 100");
                    100
                }
            };
            let clamped = u8::try_from(level.clamp(0, i32::from(warning))).unwrap_or(warning);

            if clamped == seed {
                debug!(level = clamped, "Level already current, device write skipped");
            } else {
                match self.device.set_volume(clamped) {
                    Ok(device_level) => {
                        applied.touched_device = true;
                        self.last_seen.level = device_level;
                        if let Err(e) = self.store.set_level(device_level) {
                            error!(error = %e, "Failed to persist level");
                        }
                    }
                    Err(e) => {
                        error!(error = %e, "Device level write failed");
                        applied.set_confirmed = false;
                    }
                }
            }
        }

        if unmute_requested {
            // Restore the persisted desired level before lifting mute, so
            // nothing ever plays louder than intended. The bracketed level
            // write above already did this when it succeeded.
            if !(set_requested && applied.set_confirmed) {
                match self.store.level() {
                    Ok(desired) if desired != self.last_seen.level => {
                        match self.device.set_volume(desired) {
                            Ok(device_level) => {
                                applied.touched_device = true;
                                self.last_seen.level = device_level;
                            }
                            Err(e) => {
                                error!(error = %e, "Level restore failed, leaving mute engaged");
                                applied.unmute_confirmed = false;
                            }
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        error!(error = %e, "Cannot read desired level, leaving mute engaged");
                        applied.unmute_confirmed = false;
                    }
                }
            }

            if applied.unmute_confirmed {
                match self.device.set_mute(false) {
                    Ok(()) => {
                        applied.touched_device = true;
                        self.last_seen.muted = false;
                        if let Err(e) = self.store.set_mute(false) {
                            error!(error = %e, "Failed to persist unmute");
                        }
                    }
                    Err(e) => {
                        error!(error = %e, "Device unmute failed");
                        applied.unmute_confirmed = false;
                    }
                }
            }
        }

        applied
    }

    /// Handle one monitor tick: read the device and, if something changed
    /// behind our back, converge the store and notify every watcher.
    fn poll_device(&mut self) {
        let state = match self.device.read() {
            Ok(state) => state,
            Err(e) => {
                warn!(error = %e, "Device poll failed");
                return;
            }
        };

        if state == self.last_seen {
            return;
        }
        info!(level = state.level, muted = state.muted, "Out-of-band device change");

        // A muted device reporting some level does not change what the
        // user asked to hear once unmuted.
        if state.level != self.last_seen.level && !state.muted {
            if let Err(e) = self.store.set_level(state.level) {
                error!(error = %e, "Failed to persist observed level");
            }
        }
        if state.muted != self.last_seen.muted {
            if let Err(e) = self.store.set_mute(state.muted) {
                error!(error = %e, "Failed to persist observed mute");
            }
        }

        self.last_seen = state;
        self.watchers.broadcast(&state.status_line());
    }

    /// Compose the reply line from the (cache-served) persisted state.
    fn status_line(&mut self) -> String {
        let level = self.store.level().unwrap_or(self.last_seen.level);
        let muted = self.store.mute().unwrap_or(self.last_seen.muted);
        DeviceState { level, muted }.status_line()
    }

    fn send_class(&self, class: &HashMap<ClientId, Origin>, status: &str) {
        for origin in class.values() {
            if !origin.send_line(status) {
                warn!(client_id = origin.id(), "Reply send failed, connection presumed dead");
                self.watchers.remove(origin.id());
            }
        }
    }
}

/// Which effects completed, gating per-class confirmations.
struct AppliedEffects {
    mute_confirmed: bool,
    set_confirmed: bool,
    unmute_confirmed: bool,
    touched_device: bool,
}

impl Default for AppliedEffects {
    fn default() -> Self {
        Self { mute_confirmed: true, set_confirmed: true, unmute_confirmed: true, touched_device: false }
    }
}

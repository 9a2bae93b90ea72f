//! The watcher broadcast set.

use std::collections::HashMap;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::messages::{ClientId, Origin};

/// Connections subscribed to continuous state-change notifications.
///
/// Shared between the controller (broadcasts) and the connection layer; all
/// touches are short, so a plain mutex suffices.
#[derive(Default)]
pub struct WatcherRegistry {
    inner: Mutex<HashMap<ClientId, Origin>>,
}

impl WatcherRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection for notifications. Re-adding is a no-op.
    pub fn add(&self, origin: Origin) {
        debug!(client_id = origin.id(), "Watcher added");
        self.inner.lock().insert(origin.id(), origin);
    }

    /// Drop a connection from the set. Returns whether it was present.
    pub fn remove(&self, id: ClientId) -> bool {
        self.inner.lock().remove(&id).is_some()
    }

    /// Deliver one line to every watcher.
    ///
    /// A watcher whose send fails is presumed dead and removed immediately;
    /// the failure is logged and never surfaced to other watchers.
    pub fn broadcast(&self, line: &str) {
        self.inner.lock().retain(|id, origin| {
            let delivered = origin.send_line(line);
            if !delivered {
                warn!(client_id = *id, "Watcher send failed, removing");
            }
            delivered
        });
    }

    /// Number of registered watchers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Whether no watcher is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

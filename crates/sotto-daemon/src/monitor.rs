//! Periodic device polling with a movable deadline.
//!
//! The monitor task owns only the timer. When the deadline expires it sends
//! a tick to the controller, which performs the actual device read, so the
//! device stays confined to one task. After a command-driven device change
//! the controller calls [`MonitorHandle::reset_wait`] to push the next poll
//! a full period out; re-polling right after our own write tells us nothing.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{Notify, mpsc};
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Shared timer state; any task may move the deadline.
#[derive(Clone)]
pub struct MonitorHandle {
    deadline: Arc<Mutex<Instant>>,
    notify: Arc<Notify>,
    period: Duration,
}

impl MonitorHandle {
    /// Create a handle whose first deadline is one period from now.
    #[must_use]
    pub fn new(period: Duration) -> Self {
        Self {
            deadline: Arc::new(Mutex::new(Instant::now() + period)),
            notify: Arc::new(Notify::new()),
            period,
        }
    }

    /// Postpone the next poll by a full period from now, waking the timer
    /// so it picks up the new deadline.
    pub fn reset_wait(&self) {
        *self.deadline.lock() = Instant::now() + self.period;
        self.notify.notify_one();
    }

    pub(crate) fn target(&self) -> Instant {
        *self.deadline.lock()
    }

    fn rearm(&self) {
        *self.deadline.lock() = Instant::now() + self.period;
    }
}

/// Spawn the timer task. Each expiry sends one tick to the controller; a
/// tick already pending means a poll is coming anyway, so ticks never queue.
pub fn spawn(handle: MonitorHandle, cancel: CancellationToken) -> mpsc::Receiver<()> {
    let (tick_tx, tick_rx) = mpsc::channel(1);

    tokio::spawn(async move {
        loop {
            let target = handle.target();
            tokio::select! {
                () = cancel.cancelled() => break,

                // Deadline moved; loop around and sleep towards the new one.
                () = handle.notify.notified() => {}

                () = sleep_until(target) => {
                    let _ = tick_tx.try_send(());
                    handle.rearm();
                }
            }
        }
        info!("Change monitor stopped");
    });

    tick_rx
}

//! Signal handling for graceful shutdown.

use tokio_util::sync::CancellationToken;
use tracing::info;

/// Set up signal handlers that trip the daemon-wide cancellation token
/// when a shutdown signal (SIGTERM, SIGINT) arrives.
pub fn setup_signal_handlers(cancel: CancellationToken) {
    let term_cancel = cancel.clone();
    tokio::spawn(async move {
        if let Ok(mut stream) =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        {
            stream.recv().await;
            info!("Received SIGTERM");
            term_cancel.cancel();
        }
    });

    let int_cancel = cancel;
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received SIGINT");
            int_cancel.cancel();
        }
    });
}

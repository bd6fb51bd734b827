//! Shutdown on SIGTERM/SIGINT.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Spawns a listener that cancels `token` on SIGTERM or SIGINT (Ctrl+C).
///
/// The listener also exits quietly when `token` is cancelled some other way.
pub fn spawn_signal_listener(token: CancellationToken) {
    tokio::spawn(async move {
        tokio::select! {
            _ = token.cancelled() => {
                debug!("signal listener stopped");
                return;
            }
            _ = wait_for_shutdown_signal() => {}
        }
        token.cancel();
    });
}

/// Installs the handlers and returns a fresh token they cancel.
pub fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    spawn_signal_listener(token.clone());
    token
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(sigterm) => sigterm,
        Err(e) => {
            warn!(error = %e, "failed to install SIGTERM handler, only Ctrl+C stops the poller");
            wait_for_ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
        _ = wait_for_ctrl_c() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    wait_for_ctrl_c().await;
}

async fn wait_for_ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("received SIGINT (Ctrl+C), shutting down"),
        Err(e) => {
            warn!(error = %e, "failed to listen for Ctrl+C");
            // Without a handler there is nothing to wait for; never resolve.
            std::future::pending::<()>().await;
        }
    }
}

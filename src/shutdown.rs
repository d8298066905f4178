//! Cooperative shutdown.
//!
//! The first SIGINT / SIGTERM / SIGHUP cancels a
//! [`tokio_util::sync::CancellationToken`]; the sync pipeline polls it
//! between items and between chunks, so the file currently being written
//! is finished or abandoned cleanly. A second signal force-exits.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio_util::sync::CancellationToken;

async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to register SIGTERM handler");
        let mut sighup = signal(SignalKind::hangup()).expect("failed to register SIGHUP handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
            _ = sighup.recv() => {}
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for Ctrl+C");
    }
}

/// Install signal handlers and return the token they cancel.
pub(crate) fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();

    let handler_token = token.clone();
    tokio::spawn(async move {
        static SEEN_ONE: AtomicBool = AtomicBool::new(false);
        loop {
            wait_for_signal().await;
            if SEEN_ONE.swap(true, Ordering::SeqCst) {
                tracing::warn!("Force exit requested");
                std::process::exit(130);
            }
            tracing::info!("Received shutdown signal, finishing current item...");
            tracing::info!("Press Ctrl+C again to force exit");
            handler_token.cancel();
        }
    });

    token
}

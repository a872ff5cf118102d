//! TCP listener: accept loop and per-connection task management.
//!
//! The accept loop never blocks indefinitely: `accept()` runs under a short
//! timeout so the shared shutdown flag is polled even when nobody is
//! connecting. Each accepted socket is handed to a freshly spawned connection
//! task before the next `accept()` — one slow client never delays another.
//!
//! Shutdown fans out to the connection tasks through a `watch` channel, so a
//! stopping server (or a test) can terminate every worker deterministically
//! without waiting for the peers to hang up.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::time::timeout;
use tracing::{error, info};

use crate::infrastructure::network::connection::{handle_connection, ServerContext};

/// How long one `accept()` may wait before the shutdown flag is re-checked.
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Error type for listener setup.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("bind failed on {addr}: {source}")]
    BindFailed {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

/// The bound chat service, ready to run.
pub struct ChatServer {
    listener: TcpListener,
    ctx: Arc<ServerContext>,
    shutdown_tx: watch::Sender<bool>,
}

impl ChatServer {
    /// Binds the listener and prepares the shared context.
    ///
    /// Binding to port 0 picks a free port — `local_addr` tells you which,
    /// which is how the integration tests avoid port collisions.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::BindFailed`] when the address cannot be bound
    /// (port in use, missing privileges).
    pub async fn bind(addr: SocketAddr, ctx: ServerContext) -> Result<Self, NetworkError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| NetworkError::BindFailed { addr, source })?;
        let (shutdown_tx, _) = watch::channel(false);
        Ok(Self {
            listener,
            ctx: Arc::new(ctx),
            shutdown_tx,
        })
    }

    /// The address the listener actually bound.
    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.listener.local_addr()
    }

    /// Runs the accept loop until `running` is cleared.
    ///
    /// On exit, every live connection task is told to stop through the watch
    /// channel before this returns.
    pub async fn run(self, running: Arc<AtomicBool>) {
        match self.listener.local_addr() {
            Ok(addr) => info!("chat server listening on {addr}"),
            Err(_) => info!("chat server listening"),
        }

        loop {
            if !running.load(Ordering::Relaxed) {
                info!("shutdown flag set; stopping accept loop");
                break;
            }

            // A short timeout keeps the loop responsive to the flag even when
            // no clients are connecting.
            match timeout(ACCEPT_POLL_INTERVAL, self.listener.accept()).await {
                Ok(Ok((stream, peer_addr))) => {
                    let ctx = Arc::clone(&self.ctx);
                    let shutdown = self.shutdown_tx.subscribe();
                    tokio::spawn(async move {
                        handle_connection(stream, peer_addr, ctx, shutdown).await;
                    });
                }
                Ok(Err(e)) => {
                    // Transient accept failure (e.g. fd exhaustion). Keep the
                    // server alive; only this accept attempt is lost.
                    error!("accept error: {e}");
                }
                Err(_) => {
                    // Timeout — loop back to check the flag.
                }
            }
        }

        // Tell every connection task to stop.
        let _ = self.shutdown_tx.send(true);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

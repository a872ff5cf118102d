//! The per-connection protocol state machine.
//!
//! Every accepted socket gets two tasks:
//!
//! - the **connection task** (this module's `run_connection`): drives the
//!   linear lifecycle `Handshaking → Authenticating → Active → Closed`,
//!   reading and decrypting inbound lines;
//! - the **writer task**: drains the connection's outbound queue and encrypts
//!   each plaintext line under the peer's negotiated public key at the point
//!   of write. The registry hands the queue's sender to anyone who wants to
//!   deliver to this client, which is how every recipient gets ciphertext
//!   produced under its own key.
//!
//! Cleanup happens on a single sequential exit path at the end of the
//! connection task, and registry removal is conn-id-checked, so no
//! combination of triggers (reader EOF, writer failure, shutdown signal) can
//! double-broadcast a departure.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};
use uuid::Uuid;

use chat_core::protocol::command;
use chat_core::{handshake, ChannelError, SecureReader, SecureWriter};

use crate::application::auth::Authenticator;
use crate::application::registry::{ClientHandle, Registry};
use crate::application::router;

/// Capacity of the per-connection outbound queue. Delivery is fire-and-forget;
/// when a slow client's queue fills up, further lines for it are dropped.
const OUTBOUND_QUEUE_CAPACITY: usize = 64;

/// Lifecycle of one connection. Strictly linear — there are no backward
/// transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Key exchange in progress; nothing is registered yet.
    Handshaking,
    /// Login attempts are being processed.
    Authenticating,
    /// Registered in the room; chat lines flowing.
    Active,
    /// Deregistered, departure announced, transport released.
    Closed,
}

/// Everything a connection task needs, owned by the server and shared.
pub struct ServerContext {
    pub registry: Registry,
    pub authenticator: Arc<dyn Authenticator>,
    /// Modulus size for the per-connection key pair.
    pub key_bits: u64,
}

/// Entry point for a freshly accepted TCP connection.
///
/// Splits the stream and runs the state machine; this is the function the
/// accept loop spawns.
pub async fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    ctx: Arc<ServerContext>,
    shutdown: watch::Receiver<bool>,
) {
    let conn_id = Uuid::new_v4();
    info!("connection {conn_id} accepted from {peer_addr}");
    let (read_half, write_half) = stream.into_split();
    run_connection(read_half, write_half, ctx, conn_id, shutdown).await;
}

/// Runs the full lifecycle of one connection over any transport.
///
/// Generic over the stream halves so tests can drive it through an in-memory
/// duplex pipe.
pub async fn run_connection<R, W>(
    read: R,
    write: W,
    ctx: Arc<ServerContext>,
    conn_id: Uuid,
    mut shutdown: watch::Receiver<bool>,
) where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let mut state = ConnectionState::Handshaking;

    // ── Handshaking ───────────────────────────────────────────────────────────
    let (mut reader, writer) = match handshake(read, write, ctx.key_bits).await {
        Ok(halves) => halves,
        Err(e) => {
            debug!("connection {conn_id}: handshake failed: {e}");
            return;
        }
    };

    // The writer task owns the encrypting half from here on; everything this
    // connection ever sends goes through the queue.
    let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);
    let writer_task = tokio::spawn(run_writer(outbound_rx, writer, conn_id));

    transition(&mut state, ConnectionState::Authenticating, conn_id);

    // ── Authenticating ────────────────────────────────────────────────────────
    let username =
        match authenticate(&mut reader, &outbound_tx, &ctx, conn_id, &mut shutdown).await {
            Some(username) => username,
            None => {
                // Transport failed or shutdown was signalled before a login
                // succeeded; nothing was registered, nothing to announce.
                transition(&mut state, ConnectionState::Closed, conn_id);
                drop(outbound_tx);
                let _ = writer_task.await;
                return;
            }
        };

    transition(&mut state, ConnectionState::Active, conn_id);
    info!("connection {conn_id}: {username} joined the room");
    ctx.registry
        .broadcast_from(&username, &command::join_notice(&username))
        .await;

    // ── Active ────────────────────────────────────────────────────────────────
    loop {
        tokio::select! {
            result = reader.recv_line() => match result {
                Ok(line) => router::dispatch(&ctx.registry, &username, &line).await,
                Err(ChannelError::Cipher(e)) => {
                    // A single undecryptable line never kills the worker.
                    warn!("connection {conn_id}: dropping undecryptable line: {e}");
                }
                Err(e) => {
                    debug!("connection {conn_id}: read path ended: {e}");
                    break;
                }
            },
            // The server is shutting down; leave without waiting for the peer.
            _ = shutdown.changed() => break,
            // The writer task died (transport failure on the send side).
            _ = outbound_tx.closed() => break,
        }
    }

    // ── Closed ────────────────────────────────────────────────────────────────
    transition(&mut state, ConnectionState::Closed, conn_id);
    if ctx.registry.deregister(&username, conn_id).await {
        ctx.registry
            .broadcast_from(&username, &command::leave_notice(&username))
            .await;
        info!("connection {conn_id}: {username} left the room");
    }
    drop(outbound_tx);
    let _ = writer_task.await;
}

/// Logs a state change. Transitions are strictly forward.
fn transition(state: &mut ConnectionState, next: ConnectionState, conn_id: Uuid) {
    debug!("connection {conn_id}: {state:?} → {next:?}");
    *state = next;
}

// ── Authentication ────────────────────────────────────────────────────────────

/// Runs login attempts until one is accepted.
///
/// Each attempt is two encrypted lines: username, then password. The attempt
/// succeeds iff the nickname grammar holds, the nickname is free, and the
/// authenticator approves — and registration itself is the atomic
/// arbiter when two connections race for one nickname. Every failure mode
/// (including undecryptable lines) collapses into the single `WRONG LOGIN`
/// reply, and the loop continues.
///
/// Returns `None` when the transport closes or shutdown is signalled; the
/// loop never gives up on its own.
async fn authenticate<R: AsyncRead + Unpin>(
    reader: &mut SecureReader<R>,
    outbound_tx: &mpsc::Sender<String>,
    ctx: &ServerContext,
    conn_id: Uuid,
    shutdown: &mut watch::Receiver<bool>,
) -> Option<String> {
    loop {
        let username = recv_credential_line(reader, conn_id, shutdown).await?;
        let password = recv_credential_line(reader, conn_id, shutdown).await?;

        let (username, password) = match (username, password) {
            (Some(username), Some(password)) => (username, password),
            // One of the two lines did not decrypt: a failed attempt, not a
            // dead connection.
            _ => {
                queue_line(outbound_tx, command::WRONG_LOGIN);
                continue;
            }
        };

        let acceptable = command::is_valid_nickname(&username)
            && !ctx.registry.contains(&username).await
            && ctx.authenticator.authenticate(&username, &password).await;

        if acceptable {
            let handle = ClientHandle {
                conn_id,
                outbound: outbound_tx.clone(),
            };
            match ctx.registry.try_register(&username, handle).await {
                Ok(()) => {
                    queue_line(outbound_tx, command::LOGIN_ACCEPTED);
                    return Some(username);
                }
                Err(e) => {
                    // Lost a race for the nickname between the pre-check and
                    // the insert; indistinguishable from any other failure.
                    debug!("connection {conn_id}: {e}");
                }
            }
        }

        queue_line(outbound_tx, command::WRONG_LOGIN);
    }
}

/// Receives one credential line.
///
/// `Some(Some(line))` — decrypted; `Some(None)` — undecryptable but the
/// connection lives; `None` — transport closed or shutdown signalled.
async fn recv_credential_line<R: AsyncRead + Unpin>(
    reader: &mut SecureReader<R>,
    conn_id: Uuid,
    shutdown: &mut watch::Receiver<bool>,
) -> Option<Option<String>> {
    tokio::select! {
        result = reader.recv_line() => match result {
            Ok(line) => Some(Some(line)),
            Err(ChannelError::Cipher(e)) => {
                debug!("connection {conn_id}: undecryptable credential line: {e}");
                Some(None)
            }
            Err(e) => {
                debug!("connection {conn_id}: transport ended during login: {e}");
                None
            }
        },
        _ = shutdown.changed() => None,
    }
}

/// Queues one plaintext line on this connection's own outbound queue.
fn queue_line(outbound_tx: &mpsc::Sender<String>, line: &str) {
    if let Err(e) = outbound_tx.try_send(line.to_string()) {
        debug!("outbound queue unavailable: {e}");
    }
}

// ── Writer task ───────────────────────────────────────────────────────────────

/// Drains the outbound queue, encrypting each line under the peer's key.
///
/// Exits when the queue closes (connection task is done) or a write fails;
/// dropping the receiver is what the connection task observes through
/// `outbound_tx.closed()`.
async fn run_writer<W: AsyncWrite + Unpin>(
    mut outbound_rx: mpsc::Receiver<String>,
    mut writer: SecureWriter<W>,
    conn_id: Uuid,
) {
    while let Some(line) = outbound_rx.recv().await {
        if let Err(e) = writer.send_line(&line).await {
            debug!("connection {conn_id}: write failed: {e}");
            break;
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

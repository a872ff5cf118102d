//! The client registry: the process-wide nickname → connection directory.
//!
//! The registry is the only resource shared across connection tasks. It is an
//! explicitly owned service object — constructed once in `main` (or a test)
//! and handed to every connection handler — never ambient global state.
//!
//! # Delivery model
//!
//! A registered [`ClientHandle`] carries the *plaintext* sending half of that
//! connection's outbound queue. The queue's consumer is the connection's
//! writer task, which owns the recipient's negotiated keys and encrypts at
//! the point of write. Fan-out therefore encrypts independently per
//! recipient; a message is never encrypted once and copied.
//!
//! Delivery is fire-and-forget: `try_send` with no backpressure. A full or
//! closed queue means that one recipient loses the line (logged at debug) —
//! it never stalls the sender or the rest of the room.
//!
//! # Consistency
//!
//! A nickname is present iff a live, authenticated connection owns it.
//! Registration is atomic under the write lock, so two connections racing to
//! claim one nickname cannot both succeed. Removal is conn-id-checked so a
//! late close trigger can never evict a successor that re-registered the
//! same nickname.

use std::collections::HashMap;

use thiserror::Error;
use tokio::sync::{mpsc, RwLock};
use tracing::debug;
use uuid::Uuid;

/// Error type for registry operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("nickname already registered: {0}")]
    NicknameTaken(String),
}

/// The registry's view of one authenticated connection.
#[derive(Debug, Clone)]
pub struct ClientHandle {
    /// Connection identity, assigned at accept time. Used to make removal
    /// idempotent across multiple close triggers.
    pub conn_id: Uuid,
    /// Plaintext lines queued here are encrypted by the connection's own
    /// writer task under its peer key.
    pub outbound: mpsc::Sender<String>,
}

/// The nickname → connection directory.
#[derive(Debug, Default)]
pub struct Registry {
    inner: RwLock<HashMap<String, ClientHandle>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `nickname`, failing if it is already present.
    ///
    /// The contains-check and the insert happen under one write-lock
    /// acquisition, which is what makes concurrent duplicate logins
    /// impossible.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NicknameTaken`] when the nickname is held by
    /// a live connection.
    pub async fn try_register(
        &self,
        nickname: &str,
        handle: ClientHandle,
    ) -> Result<(), RegistryError> {
        let mut clients = self.inner.write().await;
        if clients.contains_key(nickname) {
            return Err(RegistryError::NicknameTaken(nickname.to_string()));
        }
        clients.insert(nickname.to_string(), handle);
        Ok(())
    }

    /// Removes `nickname`, but only if it is still owned by `conn_id`.
    ///
    /// Returns whether a removal happened. Calling again (or calling after
    /// another connection re-registered the nickname) is a no-op, which keeps
    /// the close path idempotent.
    pub async fn deregister(&self, nickname: &str, conn_id: Uuid) -> bool {
        let mut clients = self.inner.write().await;
        match clients.get(nickname) {
            Some(handle) if handle.conn_id == conn_id => {
                clients.remove(nickname);
                true
            }
            _ => false,
        }
    }

    /// Whether `nickname` is currently registered.
    pub async fn contains(&self, nickname: &str) -> bool {
        self.inner.read().await.contains_key(nickname)
    }

    /// Snapshot of all registered nicknames, for the `:clients` roster.
    pub async fn nicknames(&self) -> Vec<String> {
        self.inner.read().await.keys().cloned().collect()
    }

    /// Queues `line` to every registered connection except `sender`.
    ///
    /// Iterates a snapshot taken under the read lock; connections joining or
    /// leaving mid-broadcast may or may not see this particular line. A
    /// failed queue push is isolated to that recipient.
    pub async fn broadcast_from(&self, sender: &str, line: &str) {
        let recipients: Vec<(String, mpsc::Sender<String>)> = {
            let clients = self.inner.read().await;
            clients
                .iter()
                .filter(|(nickname, _)| nickname.as_str() != sender)
                .map(|(nickname, handle)| (nickname.clone(), handle.outbound.clone()))
                .collect()
        };

        for (nickname, outbound) in recipients {
            if let Err(e) = outbound.try_send(line.to_string()) {
                debug!("dropping broadcast line for {nickname}: {e}");
            }
        }
    }

    /// Queues `line` to exactly one recipient.
    ///
    /// Returns `false` when the nickname is not registered — the caller's cue
    /// to answer `SERVER: WRONG NICKNAME`. A present-but-unreachable
    /// recipient still counts as delivered; its own close path will clean up.
    pub async fn send_to(&self, nickname: &str, line: &str) -> bool {
        let outbound = {
            let clients = self.inner.read().await;
            match clients.get(nickname) {
                Some(handle) => handle.outbound.clone(),
                None => return false,
            }
        };
        if let Err(e) = outbound.try_send(line.to_string()) {
            debug!("dropping private line for {nickname}: {e}");
        }
        true
    }

    /// Number of registered connections.
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

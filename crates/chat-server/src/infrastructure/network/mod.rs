//! Network infrastructure for the chat server.
//!
//! # Sub-modules
//!
//! - **`listener`** – Binds the TCP listener and runs the accept loop; one
//!   spawned task per accepted connection, watch-channel shutdown fan-out.
//!
//! - **`connection`** – The per-connection protocol state machine:
//!   handshake → authentication → message loop → cleanup, plus the writer
//!   task that encrypts outbound lines under the peer's key.

pub mod connection;
pub mod listener;

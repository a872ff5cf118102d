//! Infrastructure layer for the chat server.
//!
//! Contains the OS-facing adapters: TCP listener and per-connection tasks,
//! and configuration file persistence.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `chat_core`, but must not be imported by the application layer.

pub mod network;
pub mod storage;

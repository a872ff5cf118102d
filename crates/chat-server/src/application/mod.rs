//! Application layer use cases for the chat server.
//!
//! This layer orchestrates the domain without touching sockets or the file
//! system. It depends on abstractions (the [`auth::Authenticator`] trait)
//! rather than concrete implementations, so infrastructure can be swapped
//! without changing this code — and so tests can inject mocks.
//!
//! # Sub-modules
//!
//! - **`registry`** – The concurrent nickname → connection directory: atomic
//!   registration, idempotent removal, snapshot broadcast, point delivery.
//!   This is the single shared resource of the whole server.
//!
//! - **`auth`** – The credential-check seam. The server only ever calls
//!   `authenticate(username, password)`; everything behind it is the store's
//!   business.
//!
//! - **`router`** – Classifies each decrypted chat line and dispatches it
//!   against the registry (roster reply, private delivery, room broadcast).

pub mod auth;
pub mod registry;
pub mod router;

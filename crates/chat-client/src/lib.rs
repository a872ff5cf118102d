//! chat-client library entry point.
//!
//! [`session::ClientSession`] holds everything protocol-shaped — connect, key
//! exchange, login, the encrypted line duplex — and is console-free, so tests
//! drive it programmatically. The interactive front-end in `main.rs` is a
//! thin wrapper: prompts on stdin, received lines on stdout.

pub mod session;

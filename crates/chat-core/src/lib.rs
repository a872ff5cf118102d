//! # chat-core
//!
//! Shared library for CipherChat containing the public-key cipher, the
//! encrypted line-oriented channel, and the chat command grammar.
//!
//! This crate is used by both the server and the client applications.
//! It has no dependency on sockets or OS APIs — the channel layer is generic
//! over any async byte stream, which is also what makes it testable with
//! in-memory duplex pipes.
//!
//! The crate defines:
//!
//! - **`cipher`** – Key-pair generation and the modular-exponentiation
//!   transform, plus the per-line string codec. The transform is a textbook
//!   unpadded scheme, kept deliberately (it is the wire format every peer
//!   speaks), and confined to this module so a hardened scheme could be
//!   swapped in without touching the protocol.
//!
//! - **`protocol`** – The two-line public-key handshake, the encrypted
//!   `SecureReader`/`SecureWriter` halves, and the plaintext command grammar
//!   (`:clients`, `@nickname …`, broadcast) with every payload the wire
//!   carries.

pub mod cipher;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `chat_core::KeyPair` instead of `chat_core::cipher::keys::KeyPair`.
pub use cipher::keys::{KeyError, KeyPair, PublicKey, MIN_KEY_BITS};
pub use cipher::transform::{decrypt_line, encrypt_line, CipherError};
pub use protocol::channel::{handshake, ChannelError, SecureReader, SecureWriter};
pub use protocol::command::Command;

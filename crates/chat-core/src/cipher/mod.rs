//! The public-key cipher: key generation and the numeric transform.
//!
//! Every connection generates a fresh [`keys::KeyPair`] and exchanges the
//! public half during the handshake; all chat traffic is then encoded through
//! [`transform::encrypt_line`] / [`transform::decrypt_line`].

pub mod keys;
pub mod transform;

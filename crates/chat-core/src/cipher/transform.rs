//! The modular-exponentiation transform and the per-line string codec.
//!
//! Wire format of one encrypted line:
//!
//! ```text
//! <block> <block> <block> …
//! ```
//!
//! one decimal block per plaintext `char` (its Unicode scalar value raised to
//! the key exponent mod the modulus), blocks joined by single spaces. The
//! empty string encodes to the empty line.
//!
//! The transform is unpadded and deterministic — a textbook scheme, preserved
//! as-is because it *is* the wire format. Everything outside this module only
//! sees plaintext strings and [`CipherError`].

use num_bigint::BigUint;
use thiserror::Error;

use crate::cipher::keys::{KeyPair, PublicKey};

/// Error type for the decrypt path.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CipherError {
    /// The input is not a valid encoded block sequence, or decryption did not
    /// yield a valid Unicode scalar (wrong key, truncation, corruption).
    #[error("malformed ciphertext: {0}")]
    MalformedCiphertext(String),
}

/// Encrypts a single numeric block: `block^e mod n`.
pub fn encrypt_block(block: &BigUint, key: &PublicKey) -> BigUint {
    block.modpow(&key.exponent, &key.modulus)
}

/// Decrypts a single numeric block: `block^d mod n`.
pub fn decrypt_block(block: &BigUint, pair: &KeyPair) -> BigUint {
    block.modpow(pair.private_exponent(), &pair.public().modulus)
}

/// Encrypts a plaintext line into its wire representation.
///
/// Key generation guarantees the modulus exceeds every Unicode scalar value,
/// so encoding a character can never overflow a block.
pub fn encrypt_line(plaintext: &str, key: &PublicKey) -> String {
    plaintext
        .chars()
        .map(|c| encrypt_block(&BigUint::from(c as u32), key).to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Decrypts one wire line back into plaintext.
///
/// # Errors
///
/// Returns [`CipherError::MalformedCiphertext`] when a block is not a decimal
/// number or decrypts to something that is not a Unicode scalar value. The
/// error is deliberately loud: garbage input must never come back as a
/// silently wrong string.
pub fn decrypt_line(ciphertext: &str, pair: &KeyPair) -> Result<String, CipherError> {
    ciphertext
        .split_whitespace()
        .map(|token| {
            let block = BigUint::parse_bytes(token.as_bytes(), 10).ok_or_else(|| {
                CipherError::MalformedCiphertext(format!("non-decimal block {token:?}"))
            })?;
            let value = decrypt_block(&block, pair);
            let scalar = u32::try_from(&value).map_err(|_| {
                CipherError::MalformedCiphertext("block decrypts outside char range".to_string())
            })?;
            char::from_u32(scalar).ok_or_else(|| {
                CipherError::MalformedCiphertext(format!("block decrypts to invalid scalar {scalar:#x}"))
            })
        })
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

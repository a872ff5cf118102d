//! The encrypted line channel and its handshake.
//!
//! A connection starts with a two-line public-key exchange: each side writes
//! its exponent and modulus as decimal text lines, then reads the peer's two
//! lines. Both sides write *before* reading, so the exchange cannot deadlock
//! regardless of which role a side plays. After the handshake, every line in
//! both directions is an encrypted block sequence — no plaintext ever crosses
//! the wire again.
//!
//! The channel is generic over `AsyncRead`/`AsyncWrite` rather than a TCP
//! stream: the server and client hand in the two halves of a socket, tests
//! hand in the halves of `tokio::io::duplex`.
//!
//! There is no key rotation and no forward secrecy; the negotiated pair lives
//! exactly as long as the connection.

use num_bigint::BigUint;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::debug;

use crate::cipher::keys::{KeyError, KeyPair, PublicKey};
use crate::cipher::transform::{decrypt_line, encrypt_line, CipherError};

/// Error type for channel operations.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The transport failed or the peer disconnected. Callers treat this as
    /// the end of the connection.
    #[error("channel closed")]
    Closed,

    /// A handshake key line was not a decimal number. The connection is
    /// unusable and should be dropped.
    #[error("malformed public key material: {0}")]
    MalformedKey(String),

    /// A received line did not decrypt. Recoverable: the caller decides
    /// whether to count it as a failed attempt or drop the line.
    #[error(transparent)]
    Cipher(#[from] CipherError),

    /// Local key generation failed before anything touched the wire.
    #[error(transparent)]
    Key(#[from] KeyError),
}

/// Receiving half: reads wire lines and decrypts them with the local key pair.
pub struct SecureReader<R> {
    reader: BufReader<R>,
    keys: KeyPair,
}

/// Sending half: encrypts under the peer's public key and writes wire lines.
pub struct SecureWriter<W> {
    writer: W,
    peer_key: PublicKey,
}

/// Performs the key exchange and returns the two encrypted halves.
///
/// Generates a fresh [`KeyPair`] of `key_bits`, sends the public half as two
/// decimal lines (exponent, then modulus), then reads the peer's public key
/// the same way.
///
/// # Errors
///
/// [`ChannelError::Key`] if `key_bits` is rejected, [`ChannelError::Closed`]
/// on transport failure, [`ChannelError::MalformedKey`] if the peer's key
/// lines are not decimal numbers.
pub async fn handshake<R, W>(
    read: R,
    write: W,
    key_bits: u64,
) -> Result<(SecureReader<R>, SecureWriter<W>), ChannelError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let keys = KeyPair::generate(key_bits)?;
    let mut reader = BufReader::new(read);
    let mut writer = write;

    write_raw_line(&mut writer, &keys.public().exponent.to_string()).await?;
    write_raw_line(&mut writer, &keys.public().modulus.to_string()).await?;

    let exponent = read_key_line(&mut reader).await?;
    let modulus = read_key_line(&mut reader).await?;

    Ok((
        SecureReader { reader, keys },
        SecureWriter {
            writer,
            peer_key: PublicKey { exponent, modulus },
        },
    ))
}

impl<R: AsyncRead + Unpin> SecureReader<R> {
    /// Reads one wire line and decrypts it.
    ///
    /// # Errors
    ///
    /// [`ChannelError::Closed`] on EOF or transport failure;
    /// [`ChannelError::Cipher`] when the line does not decrypt.
    pub async fn recv_line(&mut self) -> Result<String, ChannelError> {
        let wire = read_raw_line(&mut self.reader).await?;
        Ok(decrypt_line(&wire, &self.keys)?)
    }
}

impl<W: AsyncWrite + Unpin> SecureWriter<W> {
    /// Encrypts one plaintext line under the peer key and writes it.
    ///
    /// # Errors
    ///
    /// [`ChannelError::Closed`] on transport failure.
    pub async fn send_line(&mut self, plaintext: &str) -> Result<(), ChannelError> {
        let wire = encrypt_line(plaintext, &self.peer_key);
        write_raw_line(&mut self.writer, &wire).await
    }

    /// The peer's public key, as negotiated at handshake time.
    pub fn peer_key(&self) -> &PublicKey {
        &self.peer_key
    }
}

// ── Raw line I/O ──────────────────────────────────────────────────────────────

async fn read_raw_line<R: AsyncRead + Unpin>(
    reader: &mut BufReader<R>,
) -> Result<String, ChannelError> {
    let mut line = String::new();
    let n = reader.read_line(&mut line).await.map_err(|e| {
        debug!("channel read failed: {e}");
        ChannelError::Closed
    })?;
    if n == 0 {
        // read_line returning 0 bytes means EOF — the peer is gone.
        return Err(ChannelError::Closed);
    }
    while line.ends_with('\n') || line.ends_with('\r') {
        line.pop();
    }
    Ok(line)
}

async fn write_raw_line<W: AsyncWrite + Unpin>(
    writer: &mut W,
    line: &str,
) -> Result<(), ChannelError> {
    let io_err = |e: std::io::Error| {
        debug!("channel write failed: {e}");
        ChannelError::Closed
    };
    writer.write_all(line.as_bytes()).await.map_err(io_err)?;
    writer.write_all(b"\n").await.map_err(io_err)?;
    writer.flush().await.map_err(io_err)
}

async fn read_key_line<R: AsyncRead + Unpin>(
    reader: &mut BufReader<R>,
) -> Result<BigUint, ChannelError> {
    let line = read_raw_line(reader).await?;
    BigUint::parse_bytes(line.trim().as_bytes(), 10)
        .ok_or_else(|| ChannelError::MalformedKey(format!("expected a decimal line, got {line:?}")))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

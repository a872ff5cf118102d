//! The client side of a chat connection.
//!
//! A [`ClientSession`] is the protocol without the console: TCP connect, key
//! exchange, the two-line login, and the encrypted duplex afterwards. The
//! connector sends its own public key immediately on connect and then reads
//! the server's — the same order the server uses, so neither side waits on
//! the other.

use std::net::SocketAddr;

use thiserror::Error;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::debug;

use chat_core::protocol::command;
use chat_core::{handshake, ChannelError, SecureReader, SecureWriter};

/// Error type for session setup and traffic.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Channel(#[from] ChannelError),
}

/// One established, key-negotiated connection to the chat server.
pub struct ClientSession {
    reader: SecureReader<OwnedReadHalf>,
    writer: SecureWriter<OwnedWriteHalf>,
}

impl ClientSession {
    /// Connects and performs the key exchange.
    ///
    /// # Errors
    ///
    /// [`SessionError::Connect`] when the TCP connection fails,
    /// [`SessionError::Channel`] when the handshake does.
    pub async fn connect(addr: SocketAddr, key_bits: u64) -> Result<Self, SessionError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|source| SessionError::Connect { addr, source })?;
        let (read_half, write_half) = stream.into_split();
        let (reader, writer) = handshake(read_half, write_half, key_bits).await?;
        debug!("key exchange with {addr} complete");
        Ok(Self { reader, writer })
    }

    /// Sends one login attempt and reads the verdict.
    ///
    /// Returns `true` iff the server accepted. A `false` leaves the session
    /// open for another attempt — the server never hangs up on a failed
    /// login.
    ///
    /// # Errors
    ///
    /// [`SessionError::Channel`] when the transport fails or the reply does
    /// not decrypt.
    pub async fn login(&mut self, username: &str, password: &str) -> Result<bool, SessionError> {
        self.writer.send_line(username).await?;
        self.writer.send_line(password).await?;
        let reply = self.reader.recv_line().await?;
        Ok(reply == command::LOGIN_ACCEPTED)
    }

    /// Sends one chat line.
    ///
    /// # Errors
    ///
    /// [`SessionError::Channel`] when the transport fails.
    pub async fn send_line(&mut self, line: &str) -> Result<(), SessionError> {
        Ok(self.writer.send_line(line).await?)
    }

    /// Receives one decrypted line.
    ///
    /// # Errors
    ///
    /// [`SessionError::Channel`] when the transport closes or a line does not
    /// decrypt.
    pub async fn recv_line(&mut self) -> Result<String, SessionError> {
        Ok(self.reader.recv_line().await?)
    }

    /// Splits into independent receive and send halves, so printing and
    /// stdin-driven sending can run concurrently.
    pub fn split(self) -> (SecureReader<OwnedReadHalf>, SecureWriter<OwnedWriteHalf>) {
        (self.reader, self.writer)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    /// A minimal scripted server: accepts one connection, handshakes, then
    /// answers login attempts for exactly one known credential pair.
    async fn scripted_server() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            let (read_half, write_half) = stream.into_split();
            let (mut rx, mut tx) = handshake(read_half, write_half, 64)
                .await
                .expect("server handshake");
            loop {
                let username = match rx.recv_line().await {
                    Ok(line) => line,
                    Err(_) => return,
                };
                let password = match rx.recv_line().await {
                    Ok(line) => line,
                    Err(_) => return,
                };
                let reply = if username == "alice" && password == "pw1" {
                    command::LOGIN_ACCEPTED
                } else {
                    command::WRONG_LOGIN
                };
                if tx.send_line(reply).await.is_err() {
                    return;
                }
                if reply == command::LOGIN_ACCEPTED {
                    break;
                }
            }
            // Echo the first chat line back, prefixed like a broadcast.
            if let Ok(line) = rx.recv_line().await {
                let _ = tx.send_line(&format!("alice: {line}")).await;
            }
        });
        addr
    }

    #[tokio::test]
    async fn test_connect_to_unreachable_address_fails() {
        // Port 1 on loopback is essentially never listening.
        let addr: SocketAddr = "127.0.0.1:1".parse().unwrap();
        let result = ClientSession::connect(addr, 64).await;
        assert!(matches!(result, Err(SessionError::Connect { .. })));
    }

    #[tokio::test]
    async fn test_login_retry_then_accept() {
        let addr = scripted_server().await;
        let mut session = ClientSession::connect(addr, 64).await.expect("connect");

        assert!(!session.login("alice", "wrong").await.expect("first attempt"));
        assert!(session.login("alice", "pw1").await.expect("second attempt"));
    }

    #[tokio::test]
    async fn test_chat_lines_flow_after_login() {
        let addr = scripted_server().await;
        let mut session = ClientSession::connect(addr, 64).await.expect("connect");
        assert!(session.login("alice", "pw1").await.expect("login"));

        session.send_line("hello").await.expect("send");
        assert_eq!(session.recv_line().await.expect("recv"), "alice: hello");
    }

    #[tokio::test]
    async fn test_split_halves_work_independently() {
        let addr = scripted_server().await;
        let mut session = ClientSession::connect(addr, 64).await.expect("connect");
        assert!(session.login("alice", "pw1").await.expect("login"));

        let (mut rx, mut tx) = session.split();
        tx.send_line("ping").await.expect("send");
        assert_eq!(rx.recv_line().await.expect("recv"), "alice: ping");
    }
}

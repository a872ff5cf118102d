//! CipherChat interactive console client.
//!
//! Connects to a chat server, exchanges keys, walks the user through login,
//! then runs two concurrent flows until either side hangs up:
//!
//! - stdin → server: every non-empty console line is encrypted and sent;
//! - server → stdout: every received line is decrypted and printed.
//!
//! # Usage
//!
//! ```text
//! chat-client [OPTIONS]
//!
//! Options:
//!   --host <HOST>       Server hostname or IP [default: 127.0.0.1]
//!   --port <PORT>       Server TCP port       [default: 4077]
//!   --key-bits <BITS>   Cipher key size       [default: 512]
//! ```
//!
//! Environment variables `CHAT_HOST` / `CHAT_PORT` override the defaults;
//! CLI arguments win over both.

use std::io::Write as _;
use std::net::SocketAddr;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use chat_client::session::ClientSession;

/// CipherChat console client.
#[derive(Debug, Parser)]
#[command(name = "chat-client", about = "Encrypted chat room console client", version)]
struct Cli {
    /// Server hostname or IP address.
    #[arg(long, default_value = "127.0.0.1", env = "CHAT_HOST")]
    host: String,

    /// Server TCP port.
    #[arg(long, default_value_t = 4077, env = "CHAT_PORT")]
    port: u16,

    /// Modulus size for the connection key pair.
    #[arg(long, default_value_t = 512)]
    key_bits: u64,
}

impl Cli {
    fn server_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid server address: '{}:{}'", self.host, self.port))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Diagnostics stay out of the chat display unless RUST_LOG asks for them.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();
    let addr = cli.server_addr()?;

    let mut session = ClientSession::connect(addr, cli.key_bits)
        .await
        .with_context(|| format!("could not reach the chat server at {addr}"))?;

    let stdin = BufReader::new(tokio::io::stdin());
    let mut console = stdin.lines();

    // ── Login loop: prompt until the server accepts ───────────────────────────
    loop {
        let username = prompt(&mut console, "Nickname: ").await?;
        let password = prompt(&mut console, "Password: ").await?;
        if session
            .login(&username, &password)
            .await
            .context("connection lost during login")?
        {
            println!("LOGIN ACCEPTED");
            break;
        }
        println!("WRONG LOGIN");
    }

    // ── Chat session: print task + stdin loop ─────────────────────────────────
    let (mut rx, mut tx) = session.split();
    let mut printer = tokio::spawn(async move {
        loop {
            match rx.recv_line().await {
                Ok(line) => println!("{line}"),
                Err(e) => {
                    debug!("receive loop ended: {e}");
                    break;
                }
            }
        }
    });

    loop {
        tokio::select! {
            maybe_line = console.next_line() => {
                match maybe_line.context("failed to read from stdin")? {
                    // Match the classic console behaviour: empty lines are
                    // not sent.
                    Some(line) if line.is_empty() => continue,
                    Some(line) => tx
                        .send_line(&line)
                        .await
                        .context("connection lost while sending")?,
                    None => break, // stdin EOF: the user is done
                }
            }
            result = &mut printer => {
                result.context("print task failed")?;
                println!("Disconnected from server.");
                return Ok(());
            }
        }
    }

    Ok(())
}

/// Prints `label` without a newline and reads one console line.
async fn prompt(
    console: &mut tokio::io::Lines<BufReader<tokio::io::Stdin>>,
    label: &str,
) -> anyhow::Result<String> {
    print!("{label}");
    std::io::stdout().flush().context("failed to flush stdout")?;
    console
        .next_line()
        .await
        .context("failed to read from stdin")?
        .context("stdin closed before login completed")
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["chat-client"]);
        assert_eq!(cli.host, "127.0.0.1");
        assert_eq!(cli.port, 4077);
        assert_eq!(cli.key_bits, 512);
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::parse_from([
            "chat-client",
            "--host",
            "10.0.0.5",
            "--port",
            "9000",
            "--key-bits",
            "256",
        ]);
        assert_eq!(cli.host, "10.0.0.5");
        assert_eq!(cli.port, 9000);
        assert_eq!(cli.key_bits, 256);
    }

    #[test]
    fn test_server_addr_combines_host_and_port() {
        let cli = Cli::parse_from(["chat-client", "--host", "192.168.1.7", "--port", "4077"]);
        assert_eq!(
            cli.server_addr().unwrap(),
            "192.168.1.7:4077".parse().unwrap()
        );
    }

    #[test]
    fn test_server_addr_rejects_garbage_host() {
        let cli = Cli::parse_from(["chat-client", "--host", "not an address"]);
        assert!(cli.server_addr().is_err());
    }
}

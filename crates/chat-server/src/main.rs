//! CipherChat server entry point.
//!
//! Wires together configuration, the credential store, the client registry,
//! and the TCP accept loop, then runs until Ctrl-C.
//!
//! ```text
//! main()
//!  └─ load_config()            -- TOML config (or defaults on first run)
//!  └─ StaticCredentialStore    -- [[users]] entries from the config
//!  └─ ChatServer::bind()       -- TCP listener + shared registry
//!  └─ run()                    -- accept loop until the shutdown flag clears
//! ```
//!
//! # Usage
//!
//! ```text
//! chat-server [OPTIONS]
//!
//! Options:
//!   --bind <ADDR>   IP address to listen on   [default: from config]
//!   --port <PORT>   TCP port to listen on     [default: from config]
//! ```
//!
//! CLI arguments override the config file; both can be overridden by the
//! `CHAT_BIND` / `CHAT_PORT` environment variables. The log level comes from
//! `RUST_LOG`, falling back to the config's `server.log_level`.

use std::net::{IpAddr, SocketAddr};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use chat_server::application::auth::StaticCredentialStore;
use chat_server::application::registry::Registry;
use chat_server::infrastructure::network::connection::ServerContext;
use chat_server::infrastructure::network::listener::ChatServer;
use chat_server::infrastructure::storage::config::load_config;

/// CipherChat server.
///
/// Accepts TCP clients, negotiates a per-connection public-key cipher, and
/// relays authenticated chat traffic between them.
#[derive(Debug, Parser)]
#[command(name = "chat-server", about = "Encrypted multi-client chat room", version)]
struct Cli {
    /// IP address to bind the listener to. Overrides the config file.
    #[arg(long, env = "CHAT_BIND")]
    bind: Option<IpAddr>,

    /// TCP port to listen on. Overrides the config file.
    #[arg(long, env = "CHAT_PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = load_config().context("failed to load configuration")?;

    // `RUST_LOG` wins; the config file supplies the fallback level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.server.log_level.clone())),
        )
        .init();

    info!("CipherChat server starting");

    let bind_ip = match cli.bind {
        Some(ip) => ip,
        None => config
            .network
            .bind_address
            .parse()
            .with_context(|| format!("invalid bind address {:?}", config.network.bind_address))?,
    };
    let addr = SocketAddr::new(bind_ip, cli.port.unwrap_or(config.network.port));

    let ctx = ServerContext {
        registry: Registry::new(),
        authenticator: Arc::new(StaticCredentialStore::from_users(&config.users)),
        key_bits: config.cipher.key_bits,
    };
    if config.users.is_empty() {
        tracing::warn!("no [[users]] configured; every login will be rejected");
    }

    let server = ChatServer::bind(addr, ctx)
        .await
        .with_context(|| format!("failed to start chat server on {addr}"))?;

    // ── Ctrl-C handler ────────────────────────────────────────────────────────
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            running_clone.store(false, Ordering::Relaxed);
        }
    });

    server.run(running).await;

    info!("CipherChat server stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

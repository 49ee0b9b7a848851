//! Broadcast hub server
//!
//! Run with: cargo run --bin sighub-server -- --key-dir keys
//!
//! Every `<username>.pub` file in the key directory registers one user. The
//! hub listens on 0.0.0.0:50051 unless `--listen` (or `SIGHUB_ADDR`) says
//! otherwise. Set `RUST_LOG=sighub=debug` to trace individual messages.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use sighub::hub::{HubConfig, SenderPolicy};
use sighub::protocol::DEFAULT_MAX_FRAME_LEN;
use sighub::registry::config::DEFAULT_OUTBOUND_CAPACITY;
use sighub::{Hub, HubServer, KeyStore, KeyStoreAuthenticator, ServerConfig};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Socket address to listen on
    #[arg(long, env = "SIGHUB_ADDR", default_value = "0.0.0.0:50051")]
    listen: SocketAddr,

    /// Directory of `<username>.pub` PEM public keys
    #[arg(long, env = "SIGHUB_KEY_DIR", default_value = "keys")]
    key_dir: PathBuf,

    /// Deliveries queued per peer before it is disconnected
    #[arg(long, env = "SIGHUB_OUTBOUND_CAPACITY", default_value_t = DEFAULT_OUTBOUND_CAPACITY)]
    outbound_capacity: usize,

    /// Also deliver each message back to its sender
    #[arg(long, env = "SIGHUB_ECHO_TO_SENDER")]
    echo_to_sender: bool,

    /// Maximum concurrent connections (0 = unlimited)
    #[arg(long, env = "SIGHUB_MAX_CONNECTIONS", default_value_t = 0)]
    max_connections: usize,

    /// Longest accepted inbound line in bytes
    #[arg(long, env = "SIGHUB_MAX_FRAME_LEN", default_value_t = DEFAULT_MAX_FRAME_LEN)]
    max_frame_len: usize,

    /// Seconds between stats log lines (0 disables)
    #[arg(long, env = "SIGHUB_STATS_INTERVAL_SECS", default_value_t = 60)]
    stats_interval_secs: u64,
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let keys = KeyStore::load(&args.key_dir)
        .with_context(|| format!("failed to load keys from {}", args.key_dir.display()))?;
    if keys.is_empty() {
        warn!(dir = %args.key_dir.display(), "No public keys loaded; every message will be rejected");
    } else {
        info!(users = ?keys.usernames(), "Loaded public keys");
    }

    let sender_policy = if args.echo_to_sender {
        SenderPolicy::Include
    } else {
        SenderPolicy::Exclude
    };
    let hub_config = HubConfig::default()
        .outbound_capacity(args.outbound_capacity)
        .sender_policy(sender_policy);
    let hub = Hub::with_config(KeyStoreAuthenticator::from(keys), hub_config);

    let config = ServerConfig::with_addr(args.listen)
        .max_connections(args.max_connections)
        .max_frame_len(args.max_frame_len)
        .stats_interval(Duration::from_secs(args.stats_interval_secs));
    let server = HubServer::new(config, hub);

    server
        .run_until(async {
            if let Err(error) = tokio::signal::ctrl_c().await {
                warn!(?error, "ctrl-c handler failed");
            }
        })
        .await
        .with_context(|| format!("hub server on {} failed", args.listen))?;

    let stats = server.hub().stats();
    info!(
        accepted = stats.messages_accepted,
        rejected = stats.rejected(),
        connections = stats.connections_opened,
        "Hub stopped"
    );
    Ok(())
}

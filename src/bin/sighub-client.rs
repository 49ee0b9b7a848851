//! Line-oriented hub client
//!
//! Run with: cargo run --bin sighub-client -- --username alice --key alice.pem
//!
//! Each line typed on stdin is signed and sent; every delivery from the hub
//! is printed on its own line. `/quit`, end of input or Ctrl-C leaves.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::select;
use tracing::{info, warn};

use sighub::{HubClient, Signer};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Hub address to connect to
    #[arg(long, env = "SIGHUB_SERVER", default_value = "127.0.0.1:50051")]
    server: String,

    /// Username whose public key the hub holds
    #[arg(long, env = "SIGHUB_USERNAME")]
    username: String,

    /// PEM private key used to sign messages
    #[arg(long, env = "SIGHUB_KEY")]
    key: PathBuf,
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let signer = Signer::load(&args.key)
        .with_context(|| format!("failed to load private key {}", args.key.display()))?;
    let client = HubClient::connect(args.server.as_str(), args.username.as_str(), signer)
        .await
        .with_context(|| format!("failed to connect to {}", args.server))?;
    info!(server = %args.server, username = %args.username, "Connected");

    let (mut sender, mut receiver) = client.split();
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    loop {
        select! {
            delivery = receiver.recv() => {
                match delivery.context("connection to hub failed")? {
                    Some(delivery) => println!("{}", delivery.text),
                    None => {
                        eprintln!("*** hub closed the connection");
                        break;
                    }
                }
            }
            line = stdin.next_line() => {
                let Some(line) = line? else { break };
                let text = line.trim_end();
                if text.is_empty() {
                    continue;
                }
                if text.eq_ignore_ascii_case("/quit") {
                    break;
                }
                sender.send(text).await.context("failed to send message")?;
            }
            ctrl_c = tokio::signal::ctrl_c() => {
                if let Err(error) = ctrl_c {
                    warn!(?error, "ctrl-c handler failed");
                }
                break;
            }
        }
    }

    if let Err(error) = sender.shutdown().await {
        warn!(?error, "failed to shut down connection cleanly");
    }
    Ok(())
}

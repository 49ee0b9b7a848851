//! Shared helpers for end-to-end hub tests

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use sighub::{
    Hub, HubClient, HubConfig, HubServer, KeyStore, KeyStoreAuthenticator, ServerConfig, Signer,
};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

pub const FIXTURES: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures");

/// How long a peer waits before concluding nothing is coming
pub const QUIET_PERIOD: Duration = Duration::from_millis(200);

pub fn key_dir() -> PathBuf {
    Path::new(FIXTURES).join("keys")
}

pub fn signer(user: &str) -> Signer {
    Signer::load(Path::new(FIXTURES).join("private").join(format!("{user}.pem"))).unwrap()
}

/// Hub server running on an ephemeral loopback port
pub struct TestServer {
    pub addr: SocketAddr,
    pub hub: Arc<Hub<KeyStoreAuthenticator>>,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<sighub::Result<()>>,
}

impl TestServer {
    pub async fn start() -> Self {
        Self::start_with(HubConfig::default(), ServerConfig::default()).await
    }

    pub async fn start_with(hub_config: HubConfig, server_config: ServerConfig) -> Self {
        let keys = KeyStore::load(key_dir()).unwrap();
        let hub = Hub::with_config(KeyStoreAuthenticator::from(keys), hub_config);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = HubServer::new(server_config.stats_interval(Duration::ZERO), hub);
        let hub = Arc::clone(server.hub());

        let (tx, rx) = oneshot::channel();
        let handle = tokio::spawn(async move {
            server
                .serve_until(listener, async {
                    let _ = rx.await;
                })
                .await
        });

        Self {
            addr,
            hub,
            shutdown: Some(tx),
            handle,
        }
    }

    /// Connect as `user` and wait until the hub has registered the peer
    pub async fn client(&self, user: &str) -> HubClient {
        let before = self.hub.registry().len();
        let client = HubClient::connect(self.addr, user, signer(user)).await.unwrap();
        self.wait_for_peers(before + 1).await;
        client
    }

    pub async fn wait_for_peers(&self, count: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.hub.registry().len() != count {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
    }

    pub async fn stop(mut self) -> sighub::Result<()> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        self.handle.await.unwrap()
    }
}

/// Next delivery text, failing the test after a few seconds
pub async fn recv_text(client: &mut HubClient) -> String {
    tokio::time::timeout(Duration::from_secs(5), client.recv())
        .await
        .unwrap()
        .unwrap()
        .unwrap()
        .text
}

/// True when nothing arrives within [`QUIET_PERIOD`]
pub async fn stays_quiet(client: &mut HubClient) -> bool {
    tokio::time::timeout(QUIET_PERIOD, client.recv()).await.is_err()
}

//! Connection handler
//!
//! Drives one peer's stream: registers with the hub, then runs a reader and a
//! writer side by side until either ends.
//!
//! - The reader decodes inbound lines and submits them to the hub.
//! - The writer drains the connection's outbound queue to the socket.
//!
//! Whichever finishes first cancels the other. Leaving the registry also
//! ends both, even when the writer is stuck on a peer that stopped reading.
//! EOF, a read or write error, or eviction all lead to the same close path,
//! which releases the registration exactly once.

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use futures::StreamExt;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::sync::mpsc;
use tokio_util::codec::{FramedRead, LinesCodec};

use crate::auth::Authenticator;
use crate::hub::{Hub, Outcome, Registration, Rejection};
use crate::protocol::{frame_codec, TransportError};
use crate::session::ConnectionState;

/// Why a connection ended without a transport error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Peer closed its side of the stream
    PeerClosed,
    /// Registry dropped the outbound queue (slow consumer)
    Evicted,
}

/// A single peer connection
pub struct Connection<A: Authenticator, S> {
    stream: S,
    hub: Arc<Hub<A>>,
    state: ConnectionState,
    max_frame_len: usize,
}

impl<A, S> Connection<A, S>
where
    A: Authenticator,
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap an accepted stream
    pub fn new(
        stream: S,
        peer_addr: Option<SocketAddr>,
        hub: Arc<Hub<A>>,
        max_frame_len: usize,
    ) -> Self {
        Self {
            stream,
            hub,
            state: ConnectionState::new(peer_addr),
            max_frame_len,
        }
    }

    /// Run until the peer disconnects, the transport fails, or the peer is
    /// evicted
    pub async fn run(self) -> Result<CloseReason, TransportError> {
        let Connection {
            stream,
            hub,
            mut state,
            max_frame_len,
        } = self;

        let (registration, mut outbound) = hub.connect();
        state.on_registered(registration.id());

        let (read_half, write_half) = tokio::io::split(stream);
        let mut frames = FramedRead::new(read_half, frame_codec(max_frame_len));
        let mut writer = BufWriter::new(write_half);

        let result = tokio::select! {
            result = read_loop(&hub, &registration, &mut frames, &mut state, max_frame_len) => result,
            result = write_loop(&mut writer, &mut outbound) => result,
            _ = registration.removed() => Ok(CloseReason::Evicted),
        };

        state.close();
        registration.close();
        drop(outbound);

        tracing::info!(
            connection_id = ?state.id,
            peer = ?state.peer_addr,
            received = state.messages_received,
            accepted = state.messages_accepted,
            rejected = state.messages_rejected,
            duration_ms = state.duration().as_millis() as u64,
            reason = ?result.as_ref().ok(),
            "Connection closed"
        );

        result
    }
}

async fn read_loop<A, R>(
    hub: &Hub<A>,
    registration: &Registration,
    frames: &mut FramedRead<R, LinesCodec>,
    state: &mut ConnectionState,
    max_frame_len: usize,
) -> Result<CloseReason, TransportError>
where
    A: Authenticator,
    R: AsyncRead + Unpin,
{
    loop {
        state.start_reading();

        let line = match frames.next().await {
            Some(Ok(line)) => line,
            Some(Err(e)) => return Err(TransportError::from_codec(e, max_frame_len)),
            None => return Ok(CloseReason::PeerClosed),
        };

        if line.trim().is_empty() {
            continue;
        }

        state.start_delivering();
        match hub.submit_frame(registration, &line) {
            Ok(Outcome::Rejected(Rejection::Deregistered)) => {
                state.record_outcome(false);
                return Ok(CloseReason::Evicted);
            }
            Ok(outcome) => state.record_outcome(outcome.is_delivered()),
            Err(e) => {
                state.record_outcome(false);
                tracing::error!(
                    connection_id = %registration.id(),
                    error = %e,
                    "Failed to process message"
                );
            }
        }
    }
}

async fn write_loop<W>(
    writer: &mut W,
    outbound: &mut mpsc::Receiver<Bytes>,
) -> Result<CloseReason, TransportError>
where
    W: AsyncWrite + Unpin,
{
    while let Some(frame) = outbound.recv().await {
        writer.write_all(&frame).await?;
        writer.flush().await?;
    }
    Ok(CloseReason::Evicted)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::io::{AsyncBufReadExt, BufReader, DuplexStream};
    use tokio::time::timeout;

    use super::*;
    use crate::auth::AuthError;
    use crate::hub::HubConfig;
    use crate::protocol::{decode_frame, Delivery, SignedMessage, DEFAULT_MAX_FRAME_LEN};

    struct StaticAuthenticator;

    impl Authenticator for StaticAuthenticator {
        fn authenticate(
            &self,
            username: &str,
            signature: &str,
            _message: &[u8],
        ) -> Result<bool, AuthError> {
            match username {
                "alice" | "bob" => Ok(signature == "ok"),
                other => Err(AuthError::UnknownUser(other.to_string())),
            }
        }
    }

    fn spawn_connection(
        hub: &Arc<Hub<StaticAuthenticator>>,
        max_frame_len: usize,
    ) -> (
        DuplexStream,
        tokio::task::JoinHandle<Result<CloseReason, TransportError>>,
    ) {
        let (client, server) = tokio::io::duplex(4096);
        let connection = Connection::new(server, None, Arc::clone(hub), max_frame_len);
        (client, tokio::spawn(connection.run()))
    }

    async fn wait_for_peers(hub: &Hub<StaticAuthenticator>, count: usize) {
        timeout(Duration::from_secs(2), async {
            while hub.registry().len() != count {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
    }

    async fn send(stream: &mut DuplexStream, message: &SignedMessage) {
        stream.write_all(&message.to_frame().unwrap()).await.unwrap();
    }

    #[tokio::test]
    async fn test_relays_between_connections() {
        let hub = Arc::new(Hub::new(StaticAuthenticator));
        let (mut alice, _alice_task) = spawn_connection(&hub, DEFAULT_MAX_FRAME_LEN);
        let (bob, _bob_task) = spawn_connection(&hub, DEFAULT_MAX_FRAME_LEN);
        wait_for_peers(&hub, 2).await;

        send(&mut alice, &SignedMessage::new("1", "alice", "hey bob", "ok")).await;

        let mut bob = BufReader::new(bob);
        let mut line = String::new();
        timeout(Duration::from_secs(2), bob.read_line(&mut line))
            .await
            .unwrap()
            .unwrap();
        let delivery: Delivery = decode_frame(line.trim_end()).unwrap();
        assert_eq!(delivery.text, "alice: hey bob");
    }

    #[tokio::test]
    async fn test_peer_close_deregisters() {
        let hub = Arc::new(Hub::new(StaticAuthenticator));
        let (client, task) = spawn_connection(&hub, DEFAULT_MAX_FRAME_LEN);
        wait_for_peers(&hub, 1).await;

        drop(client);

        let reason = timeout(Duration::from_secs(2), task).await.unwrap().unwrap();
        assert_eq!(reason.unwrap(), CloseReason::PeerClosed);
        assert!(hub.registry().is_empty());
        assert_eq!(hub.stats().active_connections, 0);
    }

    #[tokio::test]
    async fn test_rejections_keep_connection_open() {
        let hub = Arc::new(Hub::new(StaticAuthenticator));
        let (mut alice, alice_task) = spawn_connection(&hub, DEFAULT_MAX_FRAME_LEN);
        let (bob, _bob_task) = spawn_connection(&hub, DEFAULT_MAX_FRAME_LEN);
        wait_for_peers(&hub, 2).await;

        alice.write_all(b"this is not json\n\n").await.unwrap();
        send(&mut alice, &SignedMessage::new("1", "alice", "forged", "bad")).await;
        send(&mut alice, &SignedMessage::new("2", "nobody", "who", "ok")).await;
        send(&mut alice, &SignedMessage::new("3", "alice", "real", "ok")).await;

        let mut bob = BufReader::new(bob);
        let mut line = String::new();
        timeout(Duration::from_secs(2), bob.read_line(&mut line))
            .await
            .unwrap()
            .unwrap();
        let delivery: Delivery = decode_frame(line.trim_end()).unwrap();
        assert_eq!(delivery.text, "alice: real");
        assert!(!alice_task.is_finished());

        let stats = hub.stats();
        assert_eq!(stats.rejected(), 3);
        assert_eq!(stats.messages_accepted, 1);
    }

    #[tokio::test]
    async fn test_oversized_frame_closes_only_that_connection() {
        let hub = Arc::new(Hub::new(StaticAuthenticator));
        let (mut noisy, noisy_task) = spawn_connection(&hub, 64);
        let (_quiet, quiet_task) = spawn_connection(&hub, 64);
        wait_for_peers(&hub, 2).await;

        noisy.write_all(&[b'a'; 200]).await.unwrap();
        noisy.write_all(b"\n").await.unwrap();

        let result = timeout(Duration::from_secs(2), noisy_task).await.unwrap().unwrap();
        assert!(matches!(result, Err(TransportError::FrameTooLong { max: 64 })));
        assert_eq!(hub.registry().len(), 1);
        assert!(!quiet_task.is_finished());
    }

    #[tokio::test]
    async fn test_unread_peer_is_evicted_and_closed() {
        let hub = Arc::new(Hub::with_config(
            StaticAuthenticator,
            HubConfig::default().outbound_capacity(1),
        ));
        let (mut alice, _alice_task) = spawn_connection(&hub, DEFAULT_MAX_FRAME_LEN);

        // tiny pipe that nobody reads: the writer stalls and the queue fills
        let (mut stalled_client, stalled_server) = tokio::io::duplex(8);
        let stalled = Connection::new(stalled_server, None, Arc::clone(&hub), DEFAULT_MAX_FRAME_LEN);
        let stalled_task = tokio::spawn(stalled.run());
        wait_for_peers(&hub, 2).await;

        for i in 0..8 {
            let text = format!("message number {i}");
            send(&mut alice, &SignedMessage::new(i.to_string(), "alice", text, "ok")).await;
        }
        wait_for_peers(&hub, 1).await;
        assert!(hub.stats().evictions >= 1);

        // the stalled client is still open; eviction alone ends its handler
        let reason = timeout(Duration::from_secs(2), stalled_task).await.unwrap().unwrap();
        assert_eq!(reason.unwrap(), CloseReason::Evicted);
        assert_eq!(hub.stats().active_connections, 1);

        let frame = SignedMessage::new("late", "bob", "after eviction", "ok").to_frame().unwrap();
        let _ = timeout(Duration::from_millis(500), stalled_client.write_all(&frame)).await;

        let mut alice = BufReader::new(alice);
        let mut line = String::new();
        assert!(timeout(Duration::from_millis(300), alice.read_line(&mut line))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_evicted_reader_stops_submitting() {
        let hub = Arc::new(Hub::new(StaticAuthenticator));
        let (mut bob, bob_task) = spawn_connection(&hub, DEFAULT_MAX_FRAME_LEN);
        wait_for_peers(&hub, 1).await;
        let bob_id = hub.registry().connection_ids()[0];
        let (alice, _alice_task) = spawn_connection(&hub, DEFAULT_MAX_FRAME_LEN);
        wait_for_peers(&hub, 2).await;

        assert!(hub.registry().deregister(bob_id));

        let reason = timeout(Duration::from_secs(2), bob_task).await.unwrap().unwrap();
        assert_eq!(reason.unwrap(), CloseReason::Evicted);

        let _ = bob
            .write_all(&SignedMessage::new("1", "bob", "ghost", "ok").to_frame().unwrap())
            .await;
        let mut alice = BufReader::new(alice);
        let mut line = String::new();
        assert!(timeout(Duration::from_millis(300), alice.read_line(&mut line))
            .await
            .is_err());
        assert_eq!(hub.stats().messages_accepted, 0);
    }
}

//! Hub client connection
//!
//! High-level API for sending signed messages to a hub and reading the
//! deliveries it fans out.
//!
//! # Example
//! ```no_run
//! use sighub::client::{HubClient, Signer};
//!
//! # async fn example() -> sighub::error::Result<()> {
//! let signer = Signer::load("keys/alice.pem")?;
//! let mut client = HubClient::connect("127.0.0.1:50051", "alice", signer).await?;
//!
//! client.send("hello everyone").await?;
//! while let Some(delivery) = client.recv().await? {
//!     println!("{}", delivery.text);
//! }
//! # Ok(())
//! # }
//! ```

use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio_util::codec::{FramedRead, LinesCodec};

use crate::error::Result;
use crate::protocol::{decode_frame, frame_codec, Delivery, SignedMessage, TransportError};
use crate::protocol::DEFAULT_MAX_FRAME_LEN;

use super::signer::Signer;

/// Connected hub client
pub struct HubClient {
    sender: HubSender,
    receiver: HubReceiver,
}

impl HubClient {
    /// Connect to a hub as `username`
    pub async fn connect(
        addr: impl ToSocketAddrs,
        username: impl Into<String>,
        signer: Signer,
    ) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        let username = username.into();

        tracing::debug!(peer = ?stream.peer_addr().ok(), username = %username, "Connected to hub");

        let (read_half, write_half) = stream.into_split();
        Ok(Self {
            sender: HubSender {
                writer: write_half,
                signer,
                username,
            },
            receiver: HubReceiver {
                frames: FramedRead::new(read_half, frame_codec(DEFAULT_MAX_FRAME_LEN)),
            },
        })
    }

    /// Username messages are signed as
    pub fn username(&self) -> &str {
        &self.sender.username
    }

    /// Sign and send `text`
    pub async fn send(&mut self, text: &str) -> Result<SignedMessage> {
        self.sender.send(text).await
    }

    /// Send a pre-built message as is
    pub async fn send_message(&mut self, message: &SignedMessage) -> Result<()> {
        self.sender.send_message(message).await
    }

    /// Next delivery, or `None` once the hub closes the connection
    pub async fn recv(&mut self) -> Result<Option<Delivery>> {
        self.receiver.recv().await
    }

    /// Split into independently owned halves
    pub fn split(self) -> (HubSender, HubReceiver) {
        (self.sender, self.receiver)
    }
}

/// Sending half of a [`HubClient`]
pub struct HubSender {
    writer: OwnedWriteHalf,
    signer: Signer,
    username: String,
}

impl HubSender {
    /// Sign and send `text`, returning the message as sent
    pub async fn send(&mut self, text: &str) -> Result<SignedMessage> {
        let message = self.signer.sign_message(&self.username, text)?;
        self.send_message(&message).await?;
        Ok(message)
    }

    /// Send a pre-built message as is
    pub async fn send_message(&mut self, message: &SignedMessage) -> Result<()> {
        let frame = message.to_frame()?;
        self.writer
            .write_all(&frame)
            .await
            .map_err(TransportError::from)?;
        Ok(())
    }

    /// Close the sending direction
    pub async fn shutdown(&mut self) -> Result<()> {
        self.writer.shutdown().await.map_err(TransportError::from)?;
        Ok(())
    }
}

/// Receiving half of a [`HubClient`]
pub struct HubReceiver {
    frames: FramedRead<OwnedReadHalf, LinesCodec>,
}

impl HubReceiver {
    /// Next delivery, or `None` once the hub closes the connection
    pub async fn recv(&mut self) -> Result<Option<Delivery>> {
        loop {
            match self.frames.next().await {
                None => return Ok(None),
                Some(Err(e)) => {
                    return Err(TransportError::from_codec(e, DEFAULT_MAX_FRAME_LEN).into())
                }
                Some(Ok(line)) if line.trim().is_empty() => continue,
                Some(Ok(line)) => return Ok(Some(decode_frame(&line)?)),
            }
        }
    }
}

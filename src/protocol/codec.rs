//! Newline-delimited JSON framing
//!
//! Line framing keeps the protocol usable from `nc` and friends. The reader
//! side uses `LinesCodec` with a hard length cap so a peer cannot make the hub
//! buffer an unbounded line.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_util::codec::LinesCodec;

use super::message::SignedMessage;

/// Default cap on a single inbound line (64KB)
pub const DEFAULT_MAX_FRAME_LEN: usize = 64 * 1024;

/// Line codec with the given maximum frame length
pub fn frame_codec(max_frame_len: usize) -> LinesCodec {
    LinesCodec::new_with_max_length(max_frame_len)
}

/// Encode a record as JSON followed by `\n`
pub fn encode_frame<T: Serialize>(record: &T) -> Result<Bytes, serde_json::Error> {
    let mut encoded = serde_json::to_vec(record)?;
    encoded.push(b'\n');
    Ok(Bytes::from(encoded))
}

/// Decode one line (without its terminator) into a record
pub fn decode_frame<T: DeserializeOwned>(line: &str) -> Result<T, serde_json::Error> {
    serde_json::from_str(line.trim_end_matches('\r'))
}

/// Decode an inbound [`SignedMessage`] line
pub fn decode_signed(line: &str) -> Result<SignedMessage, serde_json::Error> {
    decode_frame(line)
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;
    use tokio::io::AsyncWriteExt;
    use tokio_util::codec::FramedRead;

    use super::*;
    use crate::protocol::Delivery;

    #[test]
    fn test_decode_tolerates_crlf() {
        let line = "{\"text\":\"a: b\"}\r";
        let delivery: Delivery = decode_frame(line).unwrap();

        assert_eq!(delivery.text, "a: b");
    }

    #[test]
    fn test_decode_signed_rejects_garbage() {
        assert!(decode_signed("hello").is_err());
        assert!(decode_signed("{\"text\":\"no signature\"}").is_err());
    }

    #[tokio::test]
    async fn test_framed_read_splits_lines() {
        let (mut tx, rx) = tokio::io::duplex(1024);
        let first = SignedMessage::new("1", "alice", "one", "c2ln").to_frame().unwrap();
        let second = SignedMessage::new("2", "alice", "two", "c2ln").to_frame().unwrap();
        tx.write_all(&first).await.unwrap();
        tx.write_all(&second).await.unwrap();
        drop(tx);

        let mut frames = FramedRead::new(rx, frame_codec(DEFAULT_MAX_FRAME_LEN));
        let one = decode_signed(&frames.next().await.unwrap().unwrap()).unwrap();
        let two = decode_signed(&frames.next().await.unwrap().unwrap()).unwrap();

        assert_eq!(one.text, "one");
        assert_eq!(two.text, "two");
        assert!(frames.next().await.is_none());
    }

    #[tokio::test]
    async fn test_frame_length_cap() {
        let (mut tx, rx) = tokio::io::duplex(1024);
        tx.write_all(&[b'x'; 100]).await.unwrap();
        tx.write_all(b"\n").await.unwrap();
        drop(tx);

        let mut frames = FramedRead::new(rx, frame_codec(16));
        let result = frames.next().await.unwrap();

        assert!(matches!(
            result,
            Err(tokio_util::codec::LinesCodecError::MaxLineLengthExceeded)
        ));
    }
}

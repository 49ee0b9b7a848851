//! Wire records

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use super::codec::encode_frame;

/// Inbound chat message with a claimed author and signature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedMessage {
    /// Opaque client-chosen token
    pub id: String,
    /// Claimed author
    pub username: String,
    /// Message body; the signature covers its UTF-8 bytes
    pub text: String,
    /// Base64 RSASSA-PKCS1-v1_5 signature over SHA-256 of `text`
    pub signature: String,
}

impl SignedMessage {
    /// Create a message from its parts
    pub fn new(
        id: impl Into<String>,
        username: impl Into<String>,
        text: impl Into<String>,
        signature: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            text: text.into(),
            signature: signature.into(),
        }
    }

    /// Encode as one newline-terminated JSON frame
    pub fn to_frame(&self) -> Result<Bytes, serde_json::Error> {
        encode_frame(self)
    }
}

/// Outbound record fanned out to peers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delivery {
    /// `"<username>: <message text>"`
    pub text: String,
}

impl Delivery {
    /// Format an accepted message for delivery
    pub fn from_message(message: &SignedMessage) -> Self {
        Self {
            text: format!("{}: {}", message.username, message.text),
        }
    }

    /// Encode as one newline-terminated JSON frame
    ///
    /// The hub encodes once per accepted message; every peer queue gets a
    /// reference-counted clone of the same buffer.
    pub fn to_frame(&self) -> Result<Bytes, serde_json::Error> {
        encode_frame(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delivery_format() {
        let message = SignedMessage::new("1", "alice", "hello there", "sig");
        let delivery = Delivery::from_message(&message);

        assert_eq!(delivery.text, "alice: hello there");
    }

    #[test]
    fn test_delivery_frame_shape() {
        let delivery = Delivery {
            text: "bob: hi".into(),
        };
        let frame = delivery.to_frame().unwrap();

        assert_eq!(&frame[..], b"{\"text\":\"bob: hi\"}\n");
    }

    #[test]
    fn test_signed_message_wire_fields() {
        let json = r#"{"id":"abc","username":"carol","text":"yo","signature":"c2ln"}"#;
        let message: SignedMessage = serde_json::from_str(json).unwrap();

        assert_eq!(message, SignedMessage::new("abc", "carol", "yo", "c2ln"));
    }

    #[test]
    fn test_missing_field_is_rejected() {
        let json = r#"{"id":"abc","username":"carol","text":"yo"}"#;
        assert!(serde_json::from_str::<SignedMessage>(json).is_err());
    }
}

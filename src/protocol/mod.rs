//! Wire protocol
//!
//! Connections carry newline-delimited JSON. Clients send [`SignedMessage`]
//! records; the hub sends [`Delivery`] records back.
//!
//! ```text
//! client ──► {"id":"…","username":"alice","text":"hi","signature":"<base64>"}\n
//! client ◄── {"text":"alice: hi"}\n
//! ```

pub mod codec;
pub mod error;
pub mod message;

pub use codec::{decode_frame, decode_signed, encode_frame, frame_codec, DEFAULT_MAX_FRAME_LEN};
pub use error::TransportError;
pub use message::{Delivery, SignedMessage};

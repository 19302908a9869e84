//! Wire protocol for the dirlock daemon.
//!
//! Two codecs carry the same fields: a fixed-field binary form ([`binary`])
//! used on plain TCP streams and in binary WebSocket messages, and a
//! self-describing JSON form ([`text`]) used in text WebSocket messages.
//! The codecs are stateless per message.

pub mod binary;
pub mod error;
pub mod message;
pub mod text;

pub use error::ProtocolError;
pub use message::{
    LockCommand, LockCommandResult, LockRequest, LockResponse, VERSION_MAJOR, VERSION_MINOR,
};

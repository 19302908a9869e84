//! Protocol vocabulary: commands, results, request and response descriptors.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Major version of the dirlock protocol.
pub const VERSION_MAJOR: u8 = 0;
/// Minor version of the dirlock protocol.
pub const VERSION_MINOR: u8 = 1;

/// A lock command a client can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LockCommand {
    /// Query the current status of a named lock.
    Peek = 2,
    /// Request acquisition of a named lock.
    Acquire = 3,
    /// Request release of a named lock.
    Release = 4,
    /// Verify that a named lock is still held by the caller.
    Verify = 5,
}

impl LockCommand {
    /// Maps a wire byte to a command.
    ///
    /// Byte 0 is the uninitialized sentinel and byte 1 is reserved; both
    /// map to `None`, as does any other unassigned value. The codecs carry
    /// such bytes through unchanged; rejecting them is the server's job,
    /// which answers `BadRequest` rather than dropping the session.
    pub fn from_wire(value: u8) -> Option<Self> {
        match value {
            2 => Some(LockCommand::Peek),
            3 => Some(LockCommand::Acquire),
            4 => Some(LockCommand::Release),
            5 => Some(LockCommand::Verify),
            _ => None,
        }
    }
}

impl fmt::Display for LockCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockCommand::Peek => write!(f, "Peek"),
            LockCommand::Acquire => write!(f, "Acquire"),
            LockCommand::Release => write!(f, "Release"),
            LockCommand::Verify => write!(f, "Verify"),
        }
    }
}

/// The result of a lock command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LockCommandResult {
    /// The command was well-formed but ownership or availability said no.
    Failed = 1,
    /// The command succeeded.
    Success = 2,
    /// The request itself was rejected.
    BadRequest = 3,
    /// An unexpected system-level failure while serving the command.
    InternalError = 4,
}

impl LockCommandResult {
    /// Maps a wire byte to a result. Value 0 is reserved-invalid.
    pub fn from_wire(value: u8) -> Option<Self> {
        match value {
            1 => Some(LockCommandResult::Failed),
            2 => Some(LockCommandResult::Success),
            3 => Some(LockCommandResult::BadRequest),
            4 => Some(LockCommandResult::InternalError),
            _ => None,
        }
    }
}

impl fmt::Display for LockCommandResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockCommandResult::Failed => write!(f, "Failed"),
            LockCommandResult::Success => write!(f, "Success"),
            LockCommandResult::BadRequest => write!(f, "BadRequest"),
            LockCommandResult::InternalError => write!(f, "InternalError"),
        }
    }
}

// Results travel as their wire byte in both codecs; a value outside the
// assigned range is a decode error, unlike command bytes.
impl Serialize for LockCommandResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(*self as u8)
    }
}

impl<'de> Deserialize<'de> for LockCommandResult {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = u8::deserialize(deserializer)?;
        LockCommandResult::from_wire(value)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid result value {value}")))
    }
}

/// A lock command request descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockRequest {
    pub version_major: u8,
    pub version_minor: u8,
    /// Raw command byte as carried on the wire; see [`LockRequest::command`].
    pub command: u8,
    pub lock_name: String,
}

impl LockRequest {
    /// Builds a request for `command` at the current protocol version.
    pub fn new(command: LockCommand, lock_name: impl Into<String>) -> Self {
        Self {
            version_major: VERSION_MAJOR,
            version_minor: VERSION_MINOR,
            command: command as u8,
            lock_name: lock_name.into(),
        }
    }

    /// The validated view of the command byte.
    pub fn command(&self) -> Option<LockCommand> {
        LockCommand::from_wire(self.command)
    }
}

/// A response to a [`LockRequest`]; always echoes the request, with the
/// server's own protocol version stamped over the client's.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockResponse {
    #[serde(flatten)]
    pub request: LockRequest,
    pub result: LockCommandResult,
    /// Human-readable explanation; empty on plain success.
    pub reason: String,
    /// Meaningful only for Peek responses.
    pub is_locked: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_wire_values() {
        assert_eq!(LockCommand::from_wire(0), None);
        assert_eq!(LockCommand::from_wire(1), None);
        assert_eq!(LockCommand::from_wire(2), Some(LockCommand::Peek));
        assert_eq!(LockCommand::from_wire(5), Some(LockCommand::Verify));
        assert_eq!(LockCommand::from_wire(6), None);
        assert_eq!(LockCommand::Acquire as u8, 3);
        assert_eq!(LockCommand::Release as u8, 4);
    }

    #[test]
    fn result_wire_values() {
        assert_eq!(LockCommandResult::from_wire(0), None);
        assert_eq!(LockCommandResult::from_wire(1), Some(LockCommandResult::Failed));
        assert_eq!(LockCommandResult::from_wire(4), Some(LockCommandResult::InternalError));
        assert_eq!(LockCommandResult::from_wire(5), None);
    }

    #[test]
    fn request_defaults_to_current_version() {
        let req = LockRequest::new(LockCommand::Acquire, "job-1");
        assert_eq!(req.version_major, VERSION_MAJOR);
        assert_eq!(req.version_minor, VERSION_MINOR);
        assert_eq!(req.command(), Some(LockCommand::Acquire));
    }

    #[test]
    fn display_matches_command_names() {
        assert_eq!(LockCommand::Peek.to_string(), "Peek");
        assert_eq!(LockCommandResult::BadRequest.to_string(), "BadRequest");
    }
}

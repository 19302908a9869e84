//! Self-describing JSON codec.
//!
//! One JSON document per message. Response objects flatten the echoed
//! request's fields alongside the result, so both forms carry identical
//! information.

use crate::error::ProtocolError;
use crate::message::{LockRequest, LockResponse};

/// Encodes a request as a JSON document.
pub fn encode_request(request: &LockRequest) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(request)?)
}

/// Decodes a request from a JSON document.
pub fn decode_request(payload: &str) -> Result<LockRequest, ProtocolError> {
    Ok(serde_json::from_str(payload)?)
}

/// Encodes a response as a JSON document.
pub fn encode_response(response: &LockResponse) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(response)?)
}

/// Decodes a response from a JSON document.
pub fn decode_response(payload: &str) -> Result<LockResponse, ProtocolError> {
    Ok(serde_json::from_str(payload)?)
}

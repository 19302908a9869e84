//! Fixed-field binary codec.
//!
//! The encoding is a self-delimiting field sequence, so plain streams need
//! no outer length prefix. All integers are big-endian; strings are a `u32`
//! length followed by UTF-8 bytes.
//!
//! ```text
//! request  = version_major u8 | version_minor u8 | command u8
//!          | name_len u32 | name bytes
//! response = request | result u8 | reason_len u32 | reason bytes
//!          | is_locked u8
//! ```

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::ProtocolError;
use crate::message::{LockCommandResult, LockRequest, LockResponse};

/// Upper bound on an encoded lock name.
pub const MAX_NAME_LEN: usize = 4 * 1024;
/// Upper bound on an encoded reason string.
pub const MAX_REASON_LEN: usize = 64 * 1024;

/// Encodes a request into its wire bytes.
pub fn encode_request(request: &LockRequest) -> Vec<u8> {
    let mut buf = Vec::with_capacity(3 + 4 + request.lock_name.len());
    buf.push(request.version_major);
    buf.push(request.version_minor);
    buf.push(request.command);
    put_string(&mut buf, &request.lock_name);
    buf
}

/// Encodes a response into its wire bytes.
pub fn encode_response(response: &LockResponse) -> Vec<u8> {
    let mut buf = encode_request(&response.request);
    buf.push(response.result as u8);
    put_string(&mut buf, &response.reason);
    buf.push(response.is_locked as u8);
    buf
}

/// Reads one request from the stream.
///
/// End-of-stream anywhere inside the message is an error; use
/// [`read_request_or_eof`] where a clean close between messages is
/// expected.
pub async fn read_request<R>(reader: &mut R) -> Result<LockRequest, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let version_major = reader.read_u8().await?;
    read_request_after_first_byte(reader, version_major).await
}

/// Reads one request, or `None` if the stream ended before its first byte.
pub async fn read_request_or_eof<R>(reader: &mut R) -> Result<Option<LockRequest>, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut first = [0u8; 1];
    if reader.read(&mut first).await? == 0 {
        return Ok(None);
    }
    read_request_after_first_byte(reader, first[0]).await.map(Some)
}

async fn read_request_after_first_byte<R>(
    reader: &mut R,
    version_major: u8,
) -> Result<LockRequest, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let version_minor = reader.read_u8().await?;
    let command = reader.read_u8().await?;
    let lock_name = read_string(reader, MAX_NAME_LEN).await?;
    Ok(LockRequest {
        version_major,
        version_minor,
        command,
        lock_name,
    })
}

/// Reads one response from the stream.
pub async fn read_response<R>(reader: &mut R) -> Result<LockResponse, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let request = read_request(reader).await?;
    let result_byte = reader.read_u8().await?;
    let result = LockCommandResult::from_wire(result_byte)
        .ok_or(ProtocolError::InvalidResult(result_byte))?;
    let reason = read_string(reader, MAX_REASON_LEN).await?;
    let is_locked = reader.read_u8().await? != 0;
    Ok(LockResponse {
        request,
        result,
        reason,
        is_locked,
    })
}

fn put_string(buf: &mut Vec<u8>, value: &str) {
    buf.extend_from_slice(&(value.len() as u32).to_be_bytes());
    buf.extend_from_slice(value.as_bytes());
}

async fn read_string<R>(reader: &mut R, max: usize) -> Result<String, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let len = reader.read_u32().await? as usize;
    if len > max {
        return Err(ProtocolError::StringTooLong { len, max });
    }
    let mut bytes = vec![0u8; len];
    reader.read_exact(&mut bytes).await?;
    String::from_utf8(bytes).map_err(|_| ProtocolError::InvalidUtf8)
}

//! Server side of the WebSocket opening handshake (RFC 6455 Section 4.2).
//!
//! The HTTP exchange itself belongs to the embedding server. These helpers
//! check the upgrade request headers and build the `101 Switching Protocols`
//! response the server writes before handing the stream to a
//! [`Session`](crate::Session).

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use http::header::{CONNECTION, SEC_WEBSOCKET_ACCEPT, SEC_WEBSOCKET_KEY, SEC_WEBSOCKET_VERSION, UPGRADE};
use http::{HeaderMap, HeaderValue, Response, StatusCode};
use sha1::{Digest, Sha1};

use crate::error::{Error, Result};

/// The WebSocket GUID used in the Sec-WebSocket-Accept calculation (RFC 6455).
pub const WS_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// The only protocol version this implementation speaks.
pub const WS_VERSION: &str = "13";

/// Computes the Sec-WebSocket-Accept value from the client's Sec-WebSocket-Key.
///
/// The accept key is calculated as: Base64(SHA-1(trim(key) + GUID))
///
/// # Example
///
/// ```
/// use wsock::protocol::handshake::compute_accept_key;
///
/// let key = "dGhlIHNhbXBsZSBub25jZQ==";
/// let accept = compute_accept_key(key);
/// assert_eq!(accept, "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=");
/// ```
#[must_use]
pub fn compute_accept_key(key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(key.trim().as_bytes());
    hasher.update(WS_GUID.as_bytes());
    BASE64.encode(hasher.finalize())
}

fn header<'a>(headers: &'a HeaderMap, name: &http::HeaderName) -> Result<&'a str> {
    let value = headers
        .get(name)
        .ok_or_else(|| Error::InvalidHandshake(format!("Missing {name} header")))?;
    value
        .to_str()
        .map(str::trim)
        .map_err(|_| Error::InvalidHandshake(format!("Invalid {name} header")))
}

/// Check that the headers describe a WebSocket upgrade request.
///
/// Requires `Upgrade: websocket`, a `Connection` header listing `upgrade`, a
/// non-empty `Sec-WebSocket-Key` and `Sec-WebSocket-Version: 13`. Header
/// names and the `Upgrade`/`Connection` tokens are matched case-insensitively.
///
/// Returns the trimmed client key.
///
/// # Errors
///
/// Returns `Error::InvalidHandshake` naming the first header that is missing
/// or wrong.
pub fn validate_upgrade_request(headers: &HeaderMap) -> Result<&str> {
    let upgrade = header(headers, &UPGRADE)?;
    if !upgrade.eq_ignore_ascii_case("websocket") {
        return Err(Error::InvalidHandshake(format!(
            "Upgrade header must be websocket, got {upgrade:?}"
        )));
    }

    let connection = header(headers, &CONNECTION)?;
    if !connection
        .split(',')
        .any(|token| token.trim().eq_ignore_ascii_case("upgrade"))
    {
        return Err(Error::InvalidHandshake(
            "Connection header must contain upgrade".into(),
        ));
    }

    let key = header(headers, &SEC_WEBSOCKET_KEY)?;
    if key.is_empty() {
        return Err(Error::InvalidHandshake(
            "Sec-WebSocket-Key header is empty".into(),
        ));
    }

    let version = header(headers, &SEC_WEBSOCKET_VERSION)?;
    if version != WS_VERSION {
        return Err(Error::InvalidHandshake(format!(
            "Unsupported Sec-WebSocket-Version: {version}"
        )));
    }

    Ok(key)
}

/// Validate an upgrade request and build the `101 Switching Protocols` reply.
///
/// # Errors
///
/// Returns `Error::InvalidHandshake` if the request is not a valid upgrade.
pub fn accept_response(headers: &HeaderMap) -> Result<Response<()>> {
    let key = validate_upgrade_request(headers)?;
    let accept = HeaderValue::from_str(&compute_accept_key(key))
        .map_err(|e| Error::InvalidHandshake(e.to_string()))?;

    let mut response = Response::new(());
    *response.status_mut() = StatusCode::SWITCHING_PROTOCOLS;
    let reply = response.headers_mut();
    reply.insert(UPGRADE, HeaderValue::from_static("websocket"));
    reply.insert(CONNECTION, HeaderValue::from_static("Upgrade"));
    reply.insert(SEC_WEBSOCKET_ACCEPT, accept);
    reply.insert(SEC_WEBSOCKET_VERSION, HeaderValue::from_static(WS_VERSION));
    Ok(response)
}

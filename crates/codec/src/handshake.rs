use aws_lc_rs::digest;
use base64::prelude::*;

use super::{Error, GUID};

/// Derive the `Sec-WebSocket-Accept` token from the client key.
///
/// The token is the base64 encoding of the SHA-1 digest of the key
/// concatenated with the fixed protocol [`GUID`]. Deterministic, the
/// same key always yields the same token.
///
/// # Test
///
/// ```
/// use ws_server_codec::handshake::accept_key;
///
/// assert_eq!(
///     accept_key("dGhlIHNhbXBsZSBub25jZQ=="),
///     "s3pPLMBiTxaQ9kYGzzhZRbK+xOo="
/// );
/// ```
pub fn accept_key(key: &str) -> String {
    let mut ctx = digest::Context::new(&digest::SHA1_FOR_LEGACY_USE_ONLY);
    ctx.update(key.as_bytes());
    ctx.update(GUID.as_bytes());
    BASE64_STANDARD.encode(ctx.finish().as_ref())
}

/// Build the complete `101 Switching Protocols` response block.
///
/// The caller writes the returned string verbatim to the transport, the
/// blank line at the end hands the stream over to frame traffic. An
/// empty key is a client error and must be rejected before any
/// websocket state is established.
///
/// # Test
///
/// ```
/// use ws_server_codec::handshake::response;
///
/// let res = response("dGhlIHNhbXBsZSBub25jZQ==").unwrap();
///
/// assert!(res.starts_with("HTTP/1.1 101 Switching Protocols\r\n"));
/// assert!(res.contains("Sec-WebSocket-Accept: s3pPLMBiTxaQ9kYGzzhZRbK+xOo=\r\n"));
/// assert!(res.ends_with("\r\n\r\n"));
/// ```
pub fn response(key: &str) -> Result<String, Error> {
    if key.is_empty() {
        return Err(Error::MissingKey);
    }

    let mut res = String::with_capacity(130);
    res.push_str("HTTP/1.1 101 Switching Protocols\r\n");
    res.push_str("Upgrade: websocket\r\n");
    res.push_str("Connection: Upgrade\r\n");
    res.push_str(format!("Sec-WebSocket-Accept: {}\r\n\r\n", accept_key(key)).as_str());
    Ok(res)
}

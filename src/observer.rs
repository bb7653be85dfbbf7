use std::net::SocketAddr;

/// Application seam of the server.
///
/// One decoded text message goes in, an optional text reply comes out,
/// strictly in arrival order for any one connection. Implementations
/// are shared across all sessions and must not hold per-connection
/// state of their own.
pub trait Observer: Send + Sync {
    /// A connection completed the opening handshake.
    fn on_open(&self, _addr: &SocketAddr) {}

    /// One text frame arrived on an open connection. Returning a string
    /// sends it back as a single text frame.
    fn on_message(&self, addr: &SocketAddr, message: &str) -> Option<String>;

    /// The connection left the open state, whatever the reason.
    fn on_close(&self, _addr: &SocketAddr) {}
}

/// Replies to every message with its own payload.
pub struct Echo;

impl Observer for Echo {
    fn on_message(&self, addr: &SocketAddr, message: &str) -> Option<String> {
        log::info!("message: addr={}, size={}", addr, message.len());
        Some(message.to_string())
    }
}

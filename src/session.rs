use std::{net::SocketAddr, str::Utf8Error, sync::Arc};

use bytes::BytesMut;
use codec::{
    Opcode,
    frame::{Frame, OutboundFrame},
    handshake,
};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::observer::Observer;

/// Connection lifecycle. `Closed` is terminal, once there the session
/// issues no further reads or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    AwaitingUpgrade,
    Open,
    Closed,
}

#[derive(Debug)]
pub enum SessionError {
    /// The bytes before the blank line were not an acceptable upgrade
    /// request.
    InvalidUpgrade,
    Codec(codec::Error),
    Utf8Error(Utf8Error),
    IoError(std::io::Error),
}

impl std::error::Error for SessionError {}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl From<codec::Error> for SessionError {
    fn from(value: codec::Error) -> Self {
        Self::Codec(value)
    }
}

impl From<Utf8Error> for SessionError {
    fn from(value: Utf8Error) -> Self {
        Self::Utf8Error(value)
    }
}

impl From<std::io::Error> for SessionError {
    fn from(value: std::io::Error) -> Self {
        Self::IoError(value)
    }
}

/// One websocket connection over one transport handle.
///
/// The session owns the transport for its whole lifetime and shares no
/// state with any other session. It performs the handshake exchange,
/// then decodes inbound frames in arrival order and routes each text
/// message through the observer, writing any reply back as a single
/// unmasked text frame.
///
/// All reads go through one accumulating buffer, so a frame split
/// across any number of reads decodes the same as a frame delivered
/// whole, and bytes after the upgrade block are kept for the frame
/// stage.
pub struct Session<T, O> {
    transport: T,
    addr: SocketAddr,
    observer: Arc<O>,
    state: State,
    buffer: BytesMut,
}

impl<T, O> Session<T, O>
where
    T: AsyncRead + AsyncWrite + Unpin,
    O: Observer,
{
    pub fn new(transport: T, addr: SocketAddr, observer: Arc<O>) -> Self {
        Self {
            transport,
            addr,
            observer,
            state: State::AwaitingUpgrade,
            buffer: BytesMut::with_capacity(4096),
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Drive the session to its end.
    ///
    /// Returns when the peer closes the transport or on the first
    /// fatal error, the session is `Closed` either way. Any error is
    /// local to this one connection.
    pub async fn run(&mut self) -> Result<(), SessionError> {
        let result = match self.upgrade().await {
            Ok(()) => {
                self.observer.on_open(&self.addr);
                let result = self.read_loop().await;
                self.observer.on_close(&self.addr);
                result
            }
            Err(e) => Err(e),
        };

        self.state = State::Closed;
        result
    }

    /// Read until the blank line, answer with the 101 response.
    ///
    /// A request without an acceptable key never enters the open
    /// state, the transport is simply abandoned.
    async fn upgrade(&mut self) -> Result<(), SessionError> {
        loop {
            if let Some(end) = request_end(&self.buffer) {
                let head = self.buffer.split_to(end);
                let key = sec_websocket_key(&head)?;
                let response = handshake::response(&key)?;

                self.transport.write_all(response.as_bytes()).await?;
                self.state = State::Open;
                return Ok(());
            }

            if self.transport.read_buf(&mut self.buffer).await? == 0 {
                return Err(SessionError::InvalidUpgrade);
            }
        }
    }

    /// Frame traffic, one decode per complete buffered frame.
    ///
    /// `message_size` is probed on every pass, an incomplete frame just
    /// waits for the next read. Decode failures are connection-fatal,
    /// the framing offers no way to resynchronize once offsets are
    /// lost.
    async fn read_loop(&mut self) -> Result<(), SessionError> {
        let mut reply = BytesMut::with_capacity(1500);

        loop {
            loop {
                let size = match Frame::message_size(&self.buffer)? {
                    Some(size) if size <= self.buffer.len() => size,
                    _ => break,
                };

                let chunk = self.buffer.split_to(size);
                let frame = Frame::decode(&chunk)?;
                let message = std::str::from_utf8(&frame.payload)?;

                if let Some(text) = self.observer.on_message(&self.addr, message) {
                    OutboundFrame {
                        opcode: Opcode::Text,
                        payload: text.as_bytes(),
                    }
                    .encode(&mut reply)?;

                    self.transport.write_all(&reply).await?;
                }
            }

            if self.transport.read_buf(&mut self.buffer).await? == 0 {
                // A frame left half-buffered at end of stream is a
                // truncation, a clean close leaves nothing behind.
                if !self.buffer.is_empty() {
                    return Err(SessionError::Codec(codec::Error::Truncated));
                }

                return Ok(());
            }
        }
    }
}

/// Index one past the `\r\n\r\n` terminator, if buffered yet.
fn request_end(bytes: &[u8]) -> Option<usize> {
    bytes
        .windows(4)
        .position(|window| window == b"\r\n\r\n")
        .map(|index| index + 4)
}

/// Pull the `Sec-WebSocket-Key` out of the upgrade request.
///
/// The request must parse as HTTP and announce `Upgrade: websocket`,
/// everything else about the request line and headers is left to the
/// surrounding layer by design.
fn sec_websocket_key(bytes: &[u8]) -> Result<String, SessionError> {
    let mut headers = [httparse::EMPTY_HEADER; 32];
    let mut request = httparse::Request::new(&mut headers);
    if !matches!(request.parse(bytes), Ok(httparse::Status::Complete(_))) {
        return Err(SessionError::InvalidUpgrade);
    }

    let mut upgrade = false;
    let mut key = None;
    for header in request.headers.iter() {
        if header.name.eq_ignore_ascii_case("upgrade") {
            upgrade = std::str::from_utf8(header.value)
                .is_ok_and(|value| value.trim().eq_ignore_ascii_case("websocket"));
        } else if header.name.eq_ignore_ascii_case("sec-websocket-key") {
            key = std::str::from_utf8(header.value)
                .ok()
                .map(|value| value.trim().to_string());
        }
    }

    match (upgrade, key) {
        (true, Some(key)) => Ok(key),
        _ => Err(SessionError::InvalidUpgrade),
    }
}

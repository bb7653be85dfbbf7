//! ## The WebSocket Protocol (server side)
//!
//! [RFC6455]: https://tools.ietf.org/html/rfc6455
//! [Section 5.2]: https://tools.ietf.org/html/rfc6455#section-5.2
//!
//! The WebSocket Protocol enables two-way communication between a client
//! and a remote host over a single TCP connection. The protocol consists
//! of an opening handshake followed by basic message framing, layered
//! over TCP; the frame layout is defined in [Section 5.2].
//!
//! This crate implements the server half of a deliberately small subset
//! of [RFC6455]: the opening handshake computation and the codec for
//! single, unfragmented, masked text frames whose payload length fits in
//! 16 bits. Everything here is pure computation over byte slices, the
//! surrounding server owns all I/O and decides when enough bytes have
//! been buffered to feed the decoder.

pub mod frame;
pub mod handshake;

use std::{array::TryFromSliceError, str::Utf8Error};

use num_enum::TryFromPrimitive;

/// Fixed GUID appended to the client key during the opening handshake.
pub const GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// FIN flag in the first header byte.
pub const FIN_BIT: u8 = 0x80;

/// Low 4 bits of the first header byte carry the opcode.
pub const OPCODE_MASK: u8 = 0x0F;

/// MASK flag in the second header byte.
pub const MASK_BIT: u8 = 0x80;

/// Length-class marker for a 16-bit extended payload length.
pub const U16_LENGTH_MARKER: u8 = 126;

/// Length-class marker for a 64-bit extended payload length.
pub const U64_LENGTH_MARKER: u8 = 127;

/// Largest payload length that fits in the 7-bit length field.
pub const MAX_LITERAL_LENGTH: usize = 125;

/// Largest payload length this subset can carry on the wire.
pub const MAX_PAYLOAD_LENGTH: usize = 65535;

#[derive(Debug)]
pub enum Error {
    /// The upgrade request carried no `Sec-WebSocket-Key` header.
    MissingKey,
    /// The slice ended before the frame did.
    Truncated,
    /// A client-to-server frame arrived with the mask bit clear.
    UnmaskedFrame,
    /// The 64-bit length class was requested.
    UnsupportedLengthClass,
    /// Any opcode other than text, carries the raw 4-bit value.
    UnsupportedOpcode(u8),
    /// A frame without the FIN bit, fragmentation is not supported.
    Fragmented,
    /// Outbound payload does not fit the 16-bit length class.
    PayloadTooLarge,
    Utf8Error(Utf8Error),
    TryFromSliceError(TryFromSliceError),
}

impl std::error::Error for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl From<Utf8Error> for Error {
    fn from(value: Utf8Error) -> Self {
        Self::Utf8Error(value)
    }
}

impl From<TryFromSliceError> for Error {
    fn from(value: TryFromSliceError) -> Self {
        Self::TryFromSliceError(value)
    }
}

/// Frame type carried in the low 4 bits of the first header byte.
///
/// Only `Text` is accepted by the decoder, the other variants exist so
/// that rejecting them produces a typed error instead of mis-decoding
/// their bytes as text.
///
/// # Test
///
/// ```
/// use ws_server_codec::Opcode;
///
/// assert_eq!(Opcode::try_from(0x1).unwrap(), Opcode::Text);
/// assert_eq!(Opcode::try_from(0x9).unwrap(), Opcode::Ping);
/// assert!(Opcode::try_from(0x3).is_err());
/// ```
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
pub enum Opcode {
    Continuation = 0x0,
    Text = 0x1,
    Binary = 0x2,
    Close = 0x8,
    Ping = 0x9,
    Pong = 0xA,
}

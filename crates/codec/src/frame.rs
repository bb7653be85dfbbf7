//! 0                   1                   2                   3
//! 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-------+-+-------------+-------------------------------+
//! |F|R|R|R| opcode|M| Payload len |    Extended payload length    |
//! |I|S|S|S|  (4)  |A|     (7)     |            (16/64)            |
//! |N|V|V|V|       |S|             |   (if payload len==126/127)   |
//! | |1|2|3|       |K|             |                               |
//! +-+-+-+-+-------+-+-------------+ - - - - - - - - - - - - - - - +
//! |    Extended payload length continued, if payload len == 127   |
//! + - - - - - - - - - - - - - - - +-------------------------------+
//! |    Extended payload length    | Masking-key, if MASK set to 1 |
//! +-------------------------------+-------------------------------+
//! |    Masking-key (continued)    |          Payload Data         |
//! +-------------------------------- - - - - - - - - - - - - - - - +

use bytes::{BufMut, BytesMut};

use super::{
    Error, FIN_BIT, MASK_BIT, MAX_LITERAL_LENGTH, MAX_PAYLOAD_LENGTH, OPCODE_MASK, Opcode,
    U16_LENGTH_MARKER, U64_LENGTH_MARKER,
};

/// Payload masking.
///
/// Every client-to-server frame is obfuscated by XOR-ing each payload
/// byte with one byte of a 4-byte key, cycling through the key. The
/// operation is an involution, applying it twice with the same key
/// recovers the original bytes.
///
/// # Test
///
/// ```
/// use ws_server_codec::frame::apply_mask;
///
/// let key = [0x37, 0xfa, 0x21, 0x3d];
/// let mut data = *b"Hello";
///
/// apply_mask(&mut data, key);
/// assert_eq!(&data, &[0x7f, 0x9f, 0x4d, 0x51, 0x58]);
///
/// apply_mask(&mut data, key);
/// assert_eq!(&data, b"Hello");
/// ```
pub fn apply_mask(payload: &mut [u8], key: [u8; 4]) {
    for (i, byte) in payload.iter_mut().enumerate() {
        *byte ^= key[i % 4];
    }
}

/// One decoded client-to-server frame.
///
/// The payload is stored unmasked, `payload.len()` always equals the
/// length resolved from the wire header.
pub struct Frame {
    pub fin: bool,
    pub opcode: Opcode,
    pub masking_key: [u8; 4],
    pub payload: Vec<u8>,
}

impl Frame {
    /// Resolve the total wire size of the frame starting at `bytes[0]`.
    ///
    /// Returns `Ok(None)` while too few bytes are buffered to resolve
    /// the header, the caller keeps accumulating and probes again on
    /// the next read. Protocol violations that are visible from the
    /// header alone fail here, before any payload byte is consumed.
    ///
    /// # Test
    ///
    /// ```
    /// use ws_server_codec::frame::Frame;
    ///
    /// // 5 byte literal length, masked: 2 + 4 + 5 bytes total.
    /// assert_eq!(Frame::message_size(&[0x81, 0x85]).unwrap(), Some(11));
    ///
    /// // Header not complete yet.
    /// assert_eq!(Frame::message_size(&[0x81]).unwrap(), None);
    /// assert_eq!(Frame::message_size(&[0x81, 0xFE, 0x00]).unwrap(), None);
    ///
    /// // 16-bit length class, 200 byte payload: 4 + 4 + 200.
    /// assert_eq!(Frame::message_size(&[0x81, 0xFE, 0x00, 0xC8]).unwrap(), Some(208));
    /// ```
    pub fn message_size(bytes: &[u8]) -> Result<Option<usize>, Error> {
        if bytes.len() < 2 {
            return Ok(None);
        }

        let length_class = bytes[1] & !MASK_BIT;
        if length_class == U64_LENGTH_MARKER {
            return Err(Error::UnsupportedLengthClass);
        }

        if bytes[1] & MASK_BIT == 0 {
            return Err(Error::UnmaskedFrame);
        }

        let (header_size, payload_size) = if length_class == U16_LENGTH_MARKER {
            if bytes.len() < 4 {
                return Ok(None);
            }

            (4, u16::from_be_bytes(bytes[2..4].try_into()?) as usize)
        } else {
            (2, length_class as usize)
        };

        Ok(Some(header_size + 4 + payload_size))
    }

    /// Decode exactly one complete frame from the slice.
    ///
    /// The slice must hold the whole frame, use [`Frame::message_size`]
    /// to find out how many bytes that is. The payload is unmasked in
    /// the returned frame.
    ///
    /// # Test
    ///
    /// ```
    /// use ws_server_codec::frame::{Frame, apply_mask};
    /// use ws_server_codec::Opcode;
    ///
    /// let key = [0x37, 0xfa, 0x21, 0x3d];
    /// let mut payload = *b"Hello";
    /// apply_mask(&mut payload, key);
    ///
    /// let mut bytes = vec![0x81, 0x85];
    /// bytes.extend_from_slice(&key);
    /// bytes.extend_from_slice(&payload);
    ///
    /// let frame = Frame::decode(&bytes).unwrap();
    ///
    /// assert!(frame.fin);
    /// assert_eq!(frame.opcode, Opcode::Text);
    /// assert_eq!(frame.masking_key, key);
    /// assert_eq!(frame.payload, b"Hello");
    /// ```
    pub fn decode(bytes: &[u8]) -> Result<Self, Error> {
        let size = Self::message_size(bytes)?.ok_or(Error::Truncated)?;
        if bytes.len() < size {
            return Err(Error::Truncated);
        }

        let fin = bytes[0] & FIN_BIT != 0;
        if !fin {
            return Err(Error::Fragmented);
        }

        let opcode = Opcode::try_from(bytes[0] & OPCODE_MASK)
            .map_err(|_| Error::UnsupportedOpcode(bytes[0] & OPCODE_MASK))?;
        if opcode != Opcode::Text {
            return Err(Error::UnsupportedOpcode(opcode as u8));
        }

        let offset = if bytes[1] & !MASK_BIT == U16_LENGTH_MARKER {
            4
        } else {
            2
        };

        let masking_key: [u8; 4] = bytes[offset..offset + 4].try_into()?;
        let mut payload = bytes[offset + 4..size].to_vec();
        apply_mask(&mut payload, masking_key);

        Ok(Self {
            fin,
            opcode,
            masking_key,
            payload,
        })
    }
}

/// One server-to-client frame to be serialized.
///
/// Server frames are never masked, the encoder leaves the mask bit
/// clear and emits no masking key.
pub struct OutboundFrame<'a> {
    pub opcode: Opcode,
    pub payload: &'a [u8],
}

impl OutboundFrame<'_> {
    /// Serialize the frame into `bytes`, replacing its content.
    ///
    /// The FIN bit is always set, this subset never fragments. Payloads
    /// above the 16-bit length class fail before anything is written.
    ///
    /// # Test
    ///
    /// ```
    /// use bytes::BytesMut;
    /// use ws_server_codec::Opcode;
    /// use ws_server_codec::frame::OutboundFrame;
    ///
    /// let mut bytes = BytesMut::with_capacity(1500);
    ///
    /// OutboundFrame {
    ///     opcode: Opcode::Text,
    ///     payload: b"Hello",
    /// }
    /// .encode(&mut bytes)
    /// .unwrap();
    ///
    /// assert_eq!(&bytes[..], &[0x81, 0x05, b'H', b'e', b'l', b'l', b'o']);
    /// ```
    pub fn encode(self, bytes: &mut BytesMut) -> Result<(), Error> {
        let size = self.payload.len();
        if size > MAX_PAYLOAD_LENGTH {
            return Err(Error::PayloadTooLarge);
        }

        bytes.clear();
        bytes.put_u8(FIN_BIT | self.opcode as u8);

        if size <= MAX_LITERAL_LENGTH {
            bytes.put_u8(size as u8);
        } else {
            bytes.put_u8(U16_LENGTH_MARKER);
            bytes.put_u16(size as u16);
        }

        bytes.extend_from_slice(self.payload);
        Ok(())
    }
}

use anyhow::Result;
use bytes::BytesMut;
use ws_server_codec::{
    Error, Opcode,
    frame::{Frame, OutboundFrame, apply_mask},
    handshake,
};

const MASKING_KEY: [u8; 4] = [0x37, 0xfa, 0x21, 0x3d];

/// Build a masked client frame around the payload, the way a browser
/// would put it on the wire.
fn client_frame(opcode: u8, fin: bool, payload: &[u8]) -> Vec<u8> {
    let mut bytes = vec![if fin { 0x80 | opcode } else { opcode }];

    if payload.len() <= 125 {
        bytes.push(0x80 | payload.len() as u8);
    } else {
        bytes.push(0x80 | 126);
        bytes.extend_from_slice(&(payload.len() as u16).to_be_bytes());
    }

    bytes.extend_from_slice(&MASKING_KEY);

    let mut masked = payload.to_vec();
    apply_mask(&mut masked, MASKING_KEY);
    bytes.extend_from_slice(&masked);
    bytes
}

#[test]
fn test_handshake_accept_key() {
    // The canonical RFC6455 vector.
    assert_eq!(
        handshake::accept_key("dGhlIHNhbXBsZSBub25jZQ=="),
        "s3pPLMBiTxaQ9kYGzzhZRbK+xOo="
    );

    // Deterministic: same key, same token, every call.
    assert_eq!(
        handshake::accept_key("x3JJHMbDL1EzLkh9GBhXDw=="),
        handshake::accept_key("x3JJHMbDL1EzLkh9GBhXDw==")
    );
}

#[test]
fn test_handshake_response() -> Result<()> {
    let res = handshake::response("dGhlIHNhbXBsZSBub25jZQ==")?;

    assert_eq!(
        res,
        "HTTP/1.1 101 Switching Protocols\r\n\
         Upgrade: websocket\r\n\
         Connection: Upgrade\r\n\
         Sec-WebSocket-Accept: s3pPLMBiTxaQ9kYGzzhZRbK+xOo=\r\n\r\n"
    );

    assert!(matches!(handshake::response(""), Err(Error::MissingKey)));
    Ok(())
}

#[test]
fn test_masking_is_an_involution() {
    let payload: Vec<u8> = (0..=255u8).cycle().take(65535).collect();

    let mut masked = payload.clone();
    apply_mask(&mut masked, MASKING_KEY);
    assert_ne!(masked, payload);

    apply_mask(&mut masked, MASKING_KEY);
    assert_eq!(masked, payload);
}

#[test]
fn test_encode_literal_length() -> Result<()> {
    let mut bytes = BytesMut::with_capacity(1500);

    OutboundFrame {
        opcode: Opcode::Text,
        payload: b"Hello",
    }
    .encode(&mut bytes)?;

    assert_eq!(bytes.len(), 7);
    assert_eq!(&bytes[..2], &[0x81, 0x05]);
    assert_eq!(&bytes[2..], b"Hello".as_slice());
    Ok(())
}

#[test]
fn test_encode_u16_length() -> Result<()> {
    let payload = vec![0x61u8; 200];
    let mut bytes = BytesMut::with_capacity(1500);

    OutboundFrame {
        opcode: Opcode::Text,
        payload: &payload,
    }
    .encode(&mut bytes)?;

    assert_eq!(&bytes[..4], &[0x81, 0x7E, 0x00, 0xC8]);
    assert_eq!(&bytes[4..], payload.as_slice());
    Ok(())
}

#[test]
fn test_encode_length_class_boundaries() -> Result<()> {
    let mut bytes = BytesMut::with_capacity(u16::MAX as usize + 2);

    // 125 is the last literal length, a 2 byte header.
    OutboundFrame {
        opcode: Opcode::Text,
        payload: &vec![0u8; 125],
    }
    .encode(&mut bytes)?;
    assert_eq!(&bytes[..2], &[0x81, 125]);
    assert_eq!(bytes.len(), 2 + 125);

    // 126 spills into the 16-bit class, a 4 byte header.
    OutboundFrame {
        opcode: Opcode::Text,
        payload: &vec![0u8; 126],
    }
    .encode(&mut bytes)?;
    assert_eq!(&bytes[..4], &[0x81, 126, 0x00, 0x7E]);
    assert_eq!(bytes.len(), 4 + 126);

    // 65535 is the last representable length.
    OutboundFrame {
        opcode: Opcode::Text,
        payload: &vec![0u8; 65535],
    }
    .encode(&mut bytes)?;
    assert_eq!(&bytes[..4], &[0x81, 126, 0xFF, 0xFF]);
    assert_eq!(bytes.len(), 4 + 65535);

    // One past the class is a local error, nothing gets written.
    assert!(matches!(
        OutboundFrame {
            opcode: Opcode::Text,
            payload: &vec![0u8; 65536],
        }
        .encode(&mut bytes),
        Err(Error::PayloadTooLarge)
    ));

    Ok(())
}

#[test]
fn test_decode_round_trip() -> Result<()> {
    for payload in [
        b"".as_slice(),
        b"Hello".as_slice(),
        &vec![0xF0u8; 125],
        &vec![0x0Fu8; 126],
        &(0..=255u8).cycle().take(65535).collect::<Vec<u8>>(),
    ] {
        let bytes = client_frame(0x1, true, payload);
        let size = Frame::message_size(&bytes)?;
        assert_eq!(size, Some(bytes.len()));

        let frame = Frame::decode(&bytes)?;
        assert!(frame.fin);
        assert_eq!(frame.opcode, Opcode::Text);
        assert_eq!(frame.masking_key, MASKING_KEY);
        assert_eq!(frame.payload, payload);
    }

    Ok(())
}

#[test]
fn test_decode_rejects_unmasked_frame() {
    // A valid server-style frame, which a client must never send.
    assert!(matches!(
        Frame::message_size(&[0x81, 0x05, b'H', b'e', b'l', b'l', b'o']),
        Err(Error::UnmaskedFrame)
    ));
}

#[test]
fn test_decode_rejects_u64_length_class() {
    // The length class check fires before any extended length or mask
    // bytes are looked at, even with the mask bit clear.
    assert!(matches!(
        Frame::message_size(&[0x81, 0x80 | 127]),
        Err(Error::UnsupportedLengthClass)
    ));
    assert!(matches!(
        Frame::message_size(&[0x81, 127]),
        Err(Error::UnsupportedLengthClass)
    ));
}

#[test]
fn test_decode_rejects_non_text_opcodes() {
    for opcode in [0x0, 0x2, 0x8, 0x9, 0xA] {
        let bytes = client_frame(opcode, true, b"Hello");
        assert!(matches!(
            Frame::decode(&bytes),
            Err(Error::UnsupportedOpcode(value)) if value == opcode
        ));
    }

    // Reserved opcodes fail the same way instead of mis-decoding.
    let bytes = client_frame(0x3, true, b"Hello");
    assert!(matches!(
        Frame::decode(&bytes),
        Err(Error::UnsupportedOpcode(0x3))
    ));
}

#[test]
fn test_decode_rejects_fragmented_frame() {
    let bytes = client_frame(0x1, false, b"Hello");
    assert!(matches!(Frame::decode(&bytes), Err(Error::Fragmented)));
}

#[test]
fn test_decode_incomplete_frame() -> Result<()> {
    let bytes = client_frame(0x1, true, b"Hello");

    // Every strict prefix resolves to "keep reading", never to a wrong
    // frame, the probe result stays stable until the frame is whole.
    for cut in 2..bytes.len() {
        match Frame::message_size(&bytes[..cut])? {
            Some(size) => assert_eq!(size, bytes.len()),
            None => assert!(cut < 4),
        }

        assert!(matches!(
            Frame::decode(&bytes[..cut]),
            Err(Error::Truncated)
        ));
    }

    Ok(())
}

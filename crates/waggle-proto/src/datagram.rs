//! In-PAN datagram envelope.
//!
//! Peers on the same PAN tunnel UDP-style datagrams by prefixing every
//! payload with an 8-byte envelope carried in the data region of a 16-bit
//! transmit request / receive packet:
//!
//! `[from_port: u16] [to_port: u16] [length: u16] [checksum: u16]`
//!
//! All fields big-endian. `length` counts the envelope itself plus the
//! payload; `checksum` is unused over the air and always zero. The radio
//! frame's own checksum protects the bytes.

use bytes::BufMut;

use crate::{
    errors::ProtocolError,
    frame::{ApiFrame, MAX_DATA_LEN, be_u16},
};

/// Size of the datagram envelope.
pub const DATAGRAM_HEADER_LEN: usize = 8;

/// Largest datagram payload that fits a frame's data region.
pub const MAX_DATAGRAM_PAYLOAD: usize = MAX_DATA_LEN - DATAGRAM_HEADER_LEN;

/// Frame id used for datagram transmit requests.
pub const DATAGRAM_FRAME_ID: u8 = 0xCF;

/// A port/address pair identifying a datagram endpoint on the PAN.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanSocketAddr {
    /// UDP-style port number.
    pub port: u16,
    /// 16-bit radio address.
    pub addr: u16,
}

/// Wrap a payload in a datagram envelope, ready to transmit.
///
/// Produces a [`ApiFrame::TxRequest16`] addressed to `to.addr` whose data
/// region is the envelope followed by the payload.
///
/// # Errors
///
/// `PayloadTooLarge` when the payload exceeds [`MAX_DATAGRAM_PAYLOAD`].
pub fn encode_datagram(
    payload: &[u8],
    from_port: u16,
    to: PanSocketAddr,
) -> Result<ApiFrame, ProtocolError> {
    if payload.len() > MAX_DATAGRAM_PAYLOAD {
        return Err(ProtocolError::PayloadTooLarge {
            size: payload.len(),
            max: MAX_DATAGRAM_PAYLOAD,
        });
    }

    let mut data = Vec::with_capacity(DATAGRAM_HEADER_LEN + payload.len());
    data.put_u16(from_port);
    data.put_u16(to.port);
    data.put_u16((DATAGRAM_HEADER_LEN + payload.len()) as u16);
    data.put_u16(0);
    data.put_slice(payload);

    Ok(ApiFrame::TxRequest16 { frame_id: DATAGRAM_FRAME_ID, dest: to.addr, options: 0, data })
}

/// Unwrap a received datagram.
///
/// Accepts only [`ApiFrame::RxPacket16`] frames whose data region holds a
/// consistent envelope. Returns the payload slice and the sender's
/// port/address.
///
/// # Errors
///
/// `UnexpectedFrameType` for any other variant, `DatagramTooShort` when the
/// data region cannot hold the envelope, `DatagramLengthMismatch` when the
/// envelope's length field disagrees with the frame.
pub fn decode_datagram(frame: &ApiFrame) -> Result<(&[u8], PanSocketAddr), ProtocolError> {
    let (source, data) = match frame {
        ApiFrame::RxPacket16 { source, data, .. } => (*source, data.as_slice()),
        other => return Err(ProtocolError::UnexpectedFrameType(other.frame_type())),
    };

    if data.len() < DATAGRAM_HEADER_LEN {
        return Err(ProtocolError::DatagramTooShort { len: data.len() });
    }

    let from_port = be_u16(&data[0..2]);
    let declared = usize::from(be_u16(&data[4..6]));
    if declared != data.len() {
        return Err(ProtocolError::DatagramLengthMismatch { declared, actual: data.len() });
    }

    Ok((&data[DATAGRAM_HEADER_LEN..], PanSocketAddr { port: from_port, addr: source }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_fills_the_envelope() {
        let frame = encode_datagram(b"PING", 1000, PanSocketAddr { port: 7, addr: 0x0A0A })
            .unwrap();
        let ApiFrame::TxRequest16 { frame_id, dest, options, data } = &frame else {
            panic!("expected a 16-bit transmit request");
        };
        assert_eq!(*frame_id, DATAGRAM_FRAME_ID);
        assert_eq!(*dest, 0x0A0A);
        assert_eq!(*options, 0);
        assert_eq!(
            data.as_slice(),
            // from_port 1000, to_port 7, length 12, checksum 0, "PING"
            [0x03, 0xE8, 0x00, 0x07, 0x00, 0x0C, 0x00, 0x00, b'P', b'I', b'N', b'G']
        );
    }

    #[test]
    fn decode_rejects_length_mismatch() {
        let frame = ApiFrame::RxPacket16 {
            source: 0x0A0A,
            rssi: 40,
            options: 0,
            // Envelope declares 13 bytes but the region holds 12.
            data: vec![0x03, 0xE8, 0x00, 0x07, 0x00, 0x0D, 0x00, 0x00, b'P', b'I', b'N', b'G'],
        };
        assert_eq!(
            decode_datagram(&frame),
            Err(ProtocolError::DatagramLengthMismatch { declared: 13, actual: 12 })
        );
    }

    #[test]
    fn decode_rejects_other_variants() {
        let frame = ApiFrame::ModemStatus { status: 0 };
        assert!(matches!(
            decode_datagram(&frame),
            Err(ProtocolError::UnexpectedFrameType(_))
        ));
    }
}

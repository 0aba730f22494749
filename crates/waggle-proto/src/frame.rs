//! Typed API frames and their wire codec.
//!
//! A framed message on the serial line is:
//!
//! `[0x7E] [length: u16 BE] [payload: length bytes] [checksum: u8]`
//!
//! The payload begins with a one-byte API identifier selecting the frame
//! variant; the remaining payload bytes are variant-specific with every
//! multi-byte integer in big-endian order. The checksum is `0xFF` minus the
//! low byte of the sum of the payload bytes, so a valid payload plus its
//! checksum sums to `0xFF` modulo 256.
//!
//! [`ApiFrame`] is the tagged representation of all twelve variants.
//! [`ApiFrame::encode_wire`] and [`ApiFrame::decode_wire`] convert between
//! the typed form and complete wire frames; byte-at-a-time reception from a
//! serial line goes through [`crate::Deframer`] instead.

use bytes::BufMut;

use crate::errors::ProtocolError;

/// Every frame on the wire starts with this byte.
pub const START_DELIMITER: u8 = 0x7E;

/// Maximum length of the variable data/value region of any frame.
pub const MAX_DATA_LEN: usize = 100;

/// Maximum value of the wire length field: the largest variant header
/// (remote AT command, 15 bytes including the identifier) plus
/// [`MAX_DATA_LEN`].
pub const MAX_PAYLOAD_LEN: usize = 15 + MAX_DATA_LEN;

/// Framing overhead: delimiter, two length bytes, checksum.
pub const WIRE_OVERHEAD: usize = 4;

/// Maximum size of a complete frame on the wire.
pub const MAX_WIRE_LEN: usize = MAX_PAYLOAD_LEN + WIRE_OVERHEAD;

/// Transmit option flag: disable the remote acknowledgement.
pub const TX_OPT_DISABLE_ACK: u8 = 0x01;
/// Transmit option flag: enable APS encryption.
pub const TX_OPT_ENABLE_APS: u8 = 0x02;
/// Transmit option flag: send with the broadcast PAN identifier.
pub const TX_OPT_BROADCAST_PAN: u8 = 0x04;

/// Transmit status: delivered.
pub const TX_STATUS_SUCCESS: u8 = 0x00;
/// Transmit status: no acknowledgement from the remote module.
pub const TX_STATUS_NO_ACK: u8 = 0x01;
/// Transmit status: clear-channel assessment failure.
pub const TX_STATUS_CCA_FAILURE: u8 = 0x02;
/// Transmit status: request purged from the transmit FIFO.
pub const TX_STATUS_PURGED: u8 = 0x03;

/// AT command response status: success.
pub const AT_STATUS_OK: u8 = 0;
/// AT command response status: error.
pub const AT_STATUS_ERROR: u8 = 1;
/// AT command response status: the command is not recognized.
pub const AT_STATUS_INVALID_COMMAND: u8 = 2;
/// AT command response status: the parameter is out of range.
pub const AT_STATUS_INVALID_PARAMETER: u8 = 3;
/// AT command response status: no response from the remote module.
pub const AT_STATUS_NO_RESPONSE: u8 = 4;

/// Receive option flag: the packet was address-broadcast.
pub const RX_OPT_ADDRESS_BROADCAST: u8 = 0x02;
/// Receive option flag: the packet was PAN-broadcast.
pub const RX_OPT_PAN_BROADCAST: u8 = 0x04;

// Fixed header bytes of each variant, identifier included. Bounds checks in
// `decode_payload` subtract the identifier byte already consumed.
const TX_REQUEST_64_HEADER: usize = 11;
const TX_REQUEST_16_HEADER: usize = 5;
const AT_COMMAND_HEADER: usize = 4;
const TX_REQUEST_HEADER: usize = 14;
const REMOTE_AT_COMMAND_HEADER: usize = 15;
const RX_PACKET_64_HEADER: usize = 11;
const RX_PACKET_16_HEADER: usize = 5;
const AT_COMMAND_RESPONSE_HEADER: usize = 5;
const REMOTE_AT_COMMAND_RESPONSE_HEADER: usize = 15;

/// API identifier of each frame variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FrameType {
    /// Transmit request, 64-bit addressing.
    TxRequest64 = 0x00,
    /// Transmit request, 16-bit addressing.
    TxRequest16 = 0x01,
    /// AT command, applied immediately.
    AtCommand = 0x08,
    /// AT command, queued until applied.
    AtCommandQueue = 0x09,
    /// Extended transmit request (64-bit plus 16-bit addressing).
    TxRequest = 0x10,
    /// AT command addressed to a remote module.
    RemoteAtCommand = 0x17,
    /// Received packet, 64-bit addressing.
    RxPacket64 = 0x80,
    /// Received packet, 16-bit addressing.
    RxPacket16 = 0x81,
    /// Response to an AT command.
    AtCommandResponse = 0x88,
    /// Outcome of a preceding transmit request.
    TxStatus = 0x89,
    /// Unsolicited modem status report.
    ModemStatus = 0x8A,
    /// Response to a remote AT command.
    RemoteAtCommandResponse = 0x97,
}

impl FrameType {
    /// Parse an API identifier byte. `None` if unrecognized.
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(Self::TxRequest64),
            0x01 => Some(Self::TxRequest16),
            0x08 => Some(Self::AtCommand),
            0x09 => Some(Self::AtCommandQueue),
            0x10 => Some(Self::TxRequest),
            0x17 => Some(Self::RemoteAtCommand),
            0x80 => Some(Self::RxPacket64),
            0x81 => Some(Self::RxPacket16),
            0x88 => Some(Self::AtCommandResponse),
            0x89 => Some(Self::TxStatus),
            0x8A => Some(Self::ModemStatus),
            0x97 => Some(Self::RemoteAtCommandResponse),
            _ => None,
        }
    }

    /// The identifier byte written on the wire.
    #[must_use]
    pub fn to_u8(self) -> u8 {
        self as u8
    }
}

/// A typed API frame.
///
/// One variant per API identifier; see [`FrameType`]. The `data`/`value`
/// regions carry at most [`MAX_DATA_LEN`] bytes — longer regions are
/// rejected when encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiFrame {
    /// Transmit request using the destination's 64-bit address (0x00).
    TxRequest64 {
        /// Echoed in the matching transmit status; 0 suppresses the status.
        frame_id: u8,
        /// 64-bit destination address. `0xFFFF` broadcasts.
        dest: u64,
        /// Transmit option flags (`TX_OPT_*`).
        options: u8,
        /// Application payload.
        data: Vec<u8>,
    },
    /// Transmit request using the destination's 16-bit address (0x01).
    TxRequest16 {
        /// Echoed in the matching transmit status; 0 suppresses the status.
        frame_id: u8,
        /// 16-bit destination address. `0xFFFF` broadcasts.
        dest: u16,
        /// Transmit option flags (`TX_OPT_*`).
        options: u8,
        /// Application payload.
        data: Vec<u8>,
    },
    /// AT command applied immediately (0x08).
    AtCommand {
        /// Echoed in the response; 0 suppresses the response.
        frame_id: u8,
        /// Two ASCII command letters.
        command: [u8; 2],
        /// Register value to set; empty to query.
        value: Vec<u8>,
    },
    /// AT command queued until an apply (0x09).
    AtCommandQueue {
        /// Echoed in the response; 0 suppresses the response.
        frame_id: u8,
        /// Two ASCII command letters.
        command: [u8; 2],
        /// Register value to set; empty to query.
        value: Vec<u8>,
    },
    /// Extended transmit request with both address widths (0x10).
    TxRequest {
        /// Echoed in the matching transmit status; 0 suppresses the status.
        frame_id: u8,
        /// 64-bit destination address.
        dest64: u64,
        /// 16-bit destination address; `0xFFFE` when unknown.
        dest16: u16,
        /// Maximum broadcast hops; 0 uses the module maximum.
        broadcast_radius: u8,
        /// Transmit option flags (`TX_OPT_*`).
        options: u8,
        /// Application payload.
        data: Vec<u8>,
    },
    /// AT command addressed to a remote module (0x17).
    RemoteAtCommand {
        /// Echoed in the response; 0 suppresses the response.
        frame_id: u8,
        /// 64-bit destination address.
        dest64: u64,
        /// 16-bit destination address; `0xFFFE` when unknown.
        dest16: u16,
        /// Remote command options (0x02 applies changes immediately).
        command_options: u8,
        /// Two ASCII command letters.
        command: [u8; 2],
        /// Register value to set; empty to query.
        value: Vec<u8>,
    },
    /// Received packet with the sender's 64-bit address (0x80).
    RxPacket64 {
        /// 64-bit source address.
        source: u64,
        /// Received signal strength, -dBm.
        rssi: u8,
        /// Receive option flags (`RX_OPT_*`).
        options: u8,
        /// Application payload.
        data: Vec<u8>,
    },
    /// Received packet with the sender's 16-bit address (0x81).
    RxPacket16 {
        /// 16-bit source address.
        source: u16,
        /// Received signal strength, -dBm.
        rssi: u8,
        /// Receive option flags (`RX_OPT_*`).
        options: u8,
        /// Application payload.
        data: Vec<u8>,
    },
    /// Response to an AT command (0x88).
    AtCommandResponse {
        /// Frame id of the command this responds to.
        frame_id: u8,
        /// Echoed command letters.
        command: [u8; 2],
        /// Response status (`AT_STATUS_*`).
        status: u8,
        /// Register value for queries; empty otherwise.
        value: Vec<u8>,
    },
    /// Outcome of a preceding transmit request (0x89).
    TxStatus {
        /// Frame id of the transmit request this reports on.
        frame_id: u8,
        /// Transmit status (`TX_STATUS_*`).
        status: u8,
    },
    /// Unsolicited modem status (0x8A).
    ModemStatus {
        /// Modem status code; see [`crate::modem_status_text`].
        status: u8,
    },
    /// Response to a remote AT command (0x97).
    RemoteAtCommandResponse {
        /// Frame id of the command this responds to.
        frame_id: u8,
        /// 64-bit address of the responding module.
        source64: u64,
        /// 16-bit address of the responding module.
        source16: u16,
        /// Echoed command letters.
        command: [u8; 2],
        /// Response status (`AT_STATUS_*`).
        status: u8,
        /// Register value for queries; empty otherwise.
        value: Vec<u8>,
    },
}

impl ApiFrame {
    /// The variant's API identifier.
    #[must_use]
    pub fn frame_type(&self) -> FrameType {
        match self {
            Self::TxRequest64 { .. } => FrameType::TxRequest64,
            Self::TxRequest16 { .. } => FrameType::TxRequest16,
            Self::AtCommand { .. } => FrameType::AtCommand,
            Self::AtCommandQueue { .. } => FrameType::AtCommandQueue,
            Self::TxRequest { .. } => FrameType::TxRequest,
            Self::RemoteAtCommand { .. } => FrameType::RemoteAtCommand,
            Self::RxPacket64 { .. } => FrameType::RxPacket64,
            Self::RxPacket16 { .. } => FrameType::RxPacket16,
            Self::AtCommandResponse { .. } => FrameType::AtCommandResponse,
            Self::TxStatus { .. } => FrameType::TxStatus,
            Self::ModemStatus { .. } => FrameType::ModemStatus,
            Self::RemoteAtCommandResponse { .. } => FrameType::RemoteAtCommandResponse,
        }
    }

    /// Length of the variable data/value region (0 for fixed-size frames).
    #[must_use]
    pub fn variable_len(&self) -> usize {
        match self {
            Self::TxRequest64 { data, .. }
            | Self::TxRequest16 { data, .. }
            | Self::TxRequest { data, .. }
            | Self::RxPacket64 { data, .. }
            | Self::RxPacket16 { data, .. } => data.len(),
            Self::AtCommand { value, .. }
            | Self::AtCommandQueue { value, .. }
            | Self::RemoteAtCommand { value, .. }
            | Self::AtCommandResponse { value, .. }
            | Self::RemoteAtCommandResponse { value, .. } => value.len(),
            Self::TxStatus { .. } | Self::ModemStatus { .. } => 0,
        }
    }

    /// Write the payload bytes (identifier plus variant fields, big-endian).
    ///
    /// Writes unconditionally; length limits are enforced by
    /// [`ApiFrame::encode_wire`].
    pub fn encode_payload(&self, dst: &mut impl BufMut) {
        dst.put_u8(self.frame_type().to_u8());
        match self {
            Self::TxRequest64 { frame_id, dest, options, data } => {
                dst.put_u8(*frame_id);
                dst.put_u64(*dest);
                dst.put_u8(*options);
                dst.put_slice(data);
            }
            Self::TxRequest16 { frame_id, dest, options, data } => {
                dst.put_u8(*frame_id);
                dst.put_u16(*dest);
                dst.put_u8(*options);
                dst.put_slice(data);
            }
            Self::AtCommand { frame_id, command, value }
            | Self::AtCommandQueue { frame_id, command, value } => {
                dst.put_u8(*frame_id);
                dst.put_slice(command);
                dst.put_slice(value);
            }
            Self::TxRequest { frame_id, dest64, dest16, broadcast_radius, options, data } => {
                dst.put_u8(*frame_id);
                dst.put_u64(*dest64);
                dst.put_u16(*dest16);
                dst.put_u8(*broadcast_radius);
                dst.put_u8(*options);
                dst.put_slice(data);
            }
            Self::RemoteAtCommand { frame_id, dest64, dest16, command_options, command, value } => {
                dst.put_u8(*frame_id);
                dst.put_u64(*dest64);
                dst.put_u16(*dest16);
                dst.put_u8(*command_options);
                dst.put_slice(command);
                dst.put_slice(value);
            }
            Self::RxPacket64 { source, rssi, options, data } => {
                dst.put_u64(*source);
                dst.put_u8(*rssi);
                dst.put_u8(*options);
                dst.put_slice(data);
            }
            Self::RxPacket16 { source, rssi, options, data } => {
                dst.put_u16(*source);
                dst.put_u8(*rssi);
                dst.put_u8(*options);
                dst.put_slice(data);
            }
            Self::AtCommandResponse { frame_id, command, status, value } => {
                dst.put_u8(*frame_id);
                dst.put_slice(command);
                dst.put_u8(*status);
                dst.put_slice(value);
            }
            Self::TxStatus { frame_id, status } => {
                dst.put_u8(*frame_id);
                dst.put_u8(*status);
            }
            Self::ModemStatus { status } => {
                dst.put_u8(*status);
            }
            Self::RemoteAtCommandResponse {
                frame_id,
                source64,
                source16,
                command,
                status,
                value,
            } => {
                dst.put_u8(*frame_id);
                dst.put_u64(*source64);
                dst.put_u16(*source16);
                dst.put_slice(command);
                dst.put_u8(*status);
                dst.put_slice(value);
            }
        }
    }

    /// Decode a payload (identifier byte first) into a typed frame.
    ///
    /// # Errors
    ///
    /// `UnknownFrameType` for an unrecognized identifier, `FrameTruncated`
    /// when the payload is shorter than the variant's fixed header.
    pub fn decode_payload(payload: &[u8]) -> Result<Self, ProtocolError> {
        let Some((&ident, rest)) = payload.split_first() else {
            return Err(ProtocolError::FrameTruncated { expected: 1, actual: 0 });
        };
        let ty = FrameType::from_u8(ident).ok_or(ProtocolError::UnknownFrameType(ident))?;

        let require = |min: usize| {
            if payload.len() < min {
                Err(ProtocolError::FrameTruncated { expected: min, actual: payload.len() })
            } else {
                Ok(())
            }
        };

        match ty {
            FrameType::TxRequest64 => {
                require(TX_REQUEST_64_HEADER)?;
                Ok(Self::TxRequest64 {
                    frame_id: rest[0],
                    dest: be_u64(&rest[1..9]),
                    options: rest[9],
                    data: rest[10..].to_vec(),
                })
            }
            FrameType::TxRequest16 => {
                require(TX_REQUEST_16_HEADER)?;
                Ok(Self::TxRequest16 {
                    frame_id: rest[0],
                    dest: be_u16(&rest[1..3]),
                    options: rest[3],
                    data: rest[4..].to_vec(),
                })
            }
            FrameType::AtCommand => {
                require(AT_COMMAND_HEADER)?;
                Ok(Self::AtCommand {
                    frame_id: rest[0],
                    command: [rest[1], rest[2]],
                    value: rest[3..].to_vec(),
                })
            }
            FrameType::AtCommandQueue => {
                require(AT_COMMAND_HEADER)?;
                Ok(Self::AtCommandQueue {
                    frame_id: rest[0],
                    command: [rest[1], rest[2]],
                    value: rest[3..].to_vec(),
                })
            }
            FrameType::TxRequest => {
                require(TX_REQUEST_HEADER)?;
                Ok(Self::TxRequest {
                    frame_id: rest[0],
                    dest64: be_u64(&rest[1..9]),
                    dest16: be_u16(&rest[9..11]),
                    broadcast_radius: rest[11],
                    options: rest[12],
                    data: rest[13..].to_vec(),
                })
            }
            FrameType::RemoteAtCommand => {
                require(REMOTE_AT_COMMAND_HEADER)?;
                Ok(Self::RemoteAtCommand {
                    frame_id: rest[0],
                    dest64: be_u64(&rest[1..9]),
                    dest16: be_u16(&rest[9..11]),
                    command_options: rest[11],
                    command: [rest[12], rest[13]],
                    value: rest[14..].to_vec(),
                })
            }
            FrameType::RxPacket64 => {
                require(RX_PACKET_64_HEADER)?;
                Ok(Self::RxPacket64 {
                    source: be_u64(&rest[0..8]),
                    rssi: rest[8],
                    options: rest[9],
                    data: rest[10..].to_vec(),
                })
            }
            FrameType::RxPacket16 => {
                require(RX_PACKET_16_HEADER)?;
                Ok(Self::RxPacket16 {
                    source: be_u16(&rest[0..2]),
                    rssi: rest[2],
                    options: rest[3],
                    data: rest[4..].to_vec(),
                })
            }
            FrameType::AtCommandResponse => {
                require(AT_COMMAND_RESPONSE_HEADER)?;
                Ok(Self::AtCommandResponse {
                    frame_id: rest[0],
                    command: [rest[1], rest[2]],
                    status: rest[3],
                    value: rest[4..].to_vec(),
                })
            }
            FrameType::TxStatus => {
                require(3)?;
                Ok(Self::TxStatus { frame_id: rest[0], status: rest[1] })
            }
            FrameType::ModemStatus => {
                require(2)?;
                Ok(Self::ModemStatus { status: rest[0] })
            }
            FrameType::RemoteAtCommandResponse => {
                require(REMOTE_AT_COMMAND_RESPONSE_HEADER)?;
                Ok(Self::RemoteAtCommandResponse {
                    frame_id: rest[0],
                    source64: be_u64(&rest[1..9]),
                    source16: be_u16(&rest[9..11]),
                    command: [rest[11], rest[12]],
                    status: rest[13],
                    value: rest[14..].to_vec(),
                })
            }
        }
    }

    /// Encode a complete wire frame: delimiter, length, payload, checksum.
    ///
    /// # Errors
    ///
    /// `PayloadTooLarge` when the data/value region exceeds [`MAX_DATA_LEN`]
    /// or the payload exceeds [`MAX_PAYLOAD_LEN`].
    pub fn encode_wire(&self, dst: &mut Vec<u8>) -> Result<(), ProtocolError> {
        let variable = self.variable_len();
        if variable > MAX_DATA_LEN {
            return Err(ProtocolError::PayloadTooLarge { size: variable, max: MAX_DATA_LEN });
        }

        let mut payload = Vec::with_capacity(MAX_PAYLOAD_LEN);
        self.encode_payload(&mut payload);
        if payload.len() > MAX_PAYLOAD_LEN {
            return Err(ProtocolError::PayloadTooLarge {
                size: payload.len(),
                max: MAX_PAYLOAD_LEN,
            });
        }

        dst.reserve(payload.len() + WIRE_OVERHEAD);
        dst.put_u8(START_DELIMITER);
        dst.put_u16(payload.len() as u16);
        dst.put_slice(&payload);
        dst.put_u8(checksum(&payload));
        Ok(())
    }

    /// Strictly decode one complete wire frame from a buffer.
    ///
    /// Unlike [`crate::Deframer`], which silently resynchronizes on garbage,
    /// this expects the delimiter in the first byte and the whole frame to
    /// be present.
    ///
    /// # Errors
    ///
    /// `BadStartDelimiter`, `PayloadTooLarge`, `FrameTruncated`,
    /// `ChecksumMismatch`, or any [`ApiFrame::decode_payload`] error.
    pub fn decode_wire(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.is_empty() {
            return Err(ProtocolError::FrameTruncated { expected: WIRE_OVERHEAD, actual: 0 });
        }
        if bytes[0] != START_DELIMITER {
            return Err(ProtocolError::BadStartDelimiter(bytes[0]));
        }
        if bytes.len() < WIRE_OVERHEAD {
            return Err(ProtocolError::FrameTruncated {
                expected: WIRE_OVERHEAD,
                actual: bytes.len(),
            });
        }

        let declared = usize::from(be_u16(&bytes[1..3]));
        if declared > MAX_PAYLOAD_LEN {
            return Err(ProtocolError::PayloadTooLarge { size: declared, max: MAX_PAYLOAD_LEN });
        }

        let total = declared + WIRE_OVERHEAD;
        if bytes.len() < total {
            return Err(ProtocolError::FrameTruncated { expected: total, actual: bytes.len() });
        }

        let payload = &bytes[3..3 + declared];
        let received = bytes[3 + declared];
        if !verify_checksum(payload, received) {
            return Err(ProtocolError::ChecksumMismatch {
                computed: checksum(payload),
                received,
            });
        }

        Self::decode_payload(payload)
    }
}

/// Checksum over a payload: `0xFF` minus the low byte of the byte sum.
#[must_use]
pub fn checksum(payload: &[u8]) -> u8 {
    let sum = payload.iter().fold(0u8, |acc, byte| acc.wrapping_add(*byte));
    0xFF - sum
}

/// A payload and its checksum byte must sum to `0xFF` modulo 256.
#[must_use]
pub fn verify_checksum(payload: &[u8], checksum: u8) -> bool {
    payload.iter().fold(checksum, |acc, byte| acc.wrapping_add(*byte)) == 0xFF
}

pub(crate) fn be_u16(bytes: &[u8]) -> u16 {
    u16::from_be_bytes([bytes[0], bytes[1]])
}

pub(crate) fn be_u64(bytes: &[u8]) -> u64 {
    u64::from_be_bytes([
        bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_of_empty_payload_is_ff() {
        assert_eq!(checksum(&[]), 0xFF);
        assert!(verify_checksum(&[], 0xFF));
    }

    #[test]
    fn frame_type_round_trips_all_identifiers() {
        for ident in [
            0x00u8, 0x01, 0x08, 0x09, 0x10, 0x17, 0x80, 0x81, 0x88, 0x89, 0x8A, 0x97,
        ] {
            let ty = FrameType::from_u8(ident).unwrap();
            assert_eq!(ty.to_u8(), ident);
        }
        assert_eq!(FrameType::from_u8(0x42), None);
    }

    #[test]
    fn oversized_data_region_is_rejected() {
        let frame = ApiFrame::TxRequest16 {
            frame_id: 1,
            dest: 0x0001,
            options: 0,
            data: vec![0u8; MAX_DATA_LEN + 1],
        };
        let mut wire = Vec::new();
        assert!(matches!(
            frame.encode_wire(&mut wire),
            Err(ProtocolError::PayloadTooLarge { size, max })
                if size == MAX_DATA_LEN + 1 && max == MAX_DATA_LEN
        ));
    }

    #[test]
    fn truncated_payload_reports_expected_length() {
        // A remote AT command needs 15 payload bytes.
        let err = ApiFrame::decode_payload(&[0x17, 0x01, 0x02]).unwrap_err();
        assert_eq!(err, ProtocolError::FrameTruncated { expected: 15, actual: 3 });
    }
}

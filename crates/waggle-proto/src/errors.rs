//! Protocol error types.

use crate::frame::FrameType;

/// Errors produced while encoding or decoding wire frames and datagrams.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// A payload (or datagram payload) exceeds the protocol maximum.
    #[error("payload too large: {size} bytes (max {max})")]
    PayloadTooLarge {
        /// Offending length in bytes.
        size: usize,
        /// Maximum the protocol allows in this position.
        max: usize,
    },

    /// Fewer bytes were available than the frame layout requires.
    #[error("frame truncated: need {expected} bytes, have {actual}")]
    FrameTruncated {
        /// Bytes the layout requires.
        expected: usize,
        /// Bytes actually present.
        actual: usize,
    },

    /// The frame checksum did not validate.
    #[error("checksum mismatch: computed {computed:#04x}, received {received:#04x}")]
    ChecksumMismatch {
        /// Checksum computed over the received payload.
        computed: u8,
        /// Checksum byte received on the wire.
        received: u8,
    },

    /// The API identifier byte matches no known frame type.
    #[error("unknown API frame type {0:#04x}")]
    UnknownFrameType(u8),

    /// A byte other than the start delimiter where a frame must begin.
    #[error("expected start delimiter 0x7e, found {0:#04x}")]
    BadStartDelimiter(u8),

    /// A datagram operation was handed the wrong frame variant.
    #[error("expected a 16-bit receive packet, got {0:?}")]
    UnexpectedFrameType(FrameType),

    /// The data region is too short to hold a datagram envelope.
    #[error("datagram too short: {len} bytes (envelope is 8 bytes)")]
    DatagramTooShort {
        /// Length of the data region.
        len: usize,
    },

    /// The envelope's declared length disagrees with the frame.
    #[error("datagram length mismatch: declared {declared}, actual {actual}")]
    DatagramLengthMismatch {
        /// Length field carried in the envelope.
        declared: usize,
        /// Actual data-region length.
        actual: usize,
    },
}

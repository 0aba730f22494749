//! Byte-at-a-time frame reception.
//!
//! [`Deframer`] is the receive state machine for the serial line. It is
//! sans-IO: the caller feeds it one byte at a time and handles timeouts and
//! transport errors itself. Bytes seen before a start delimiter are dropped
//! silently, which is how the receiver resynchronizes after line noise or a
//! torn frame.

use crate::{
    errors::ProtocolError,
    frame::{MAX_PAYLOAD_LEN, START_DELIMITER, checksum, verify_checksum},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Hunting for the start delimiter; everything else is dropped.
    Sync,
    /// Delimiter seen, waiting for the high length byte.
    LenHigh,
    /// Waiting for the low length byte.
    LenLow { high: u8 },
    /// Collecting payload bytes.
    Payload { remaining: usize },
    /// Payload complete, waiting for the checksum byte.
    Checksum,
}

/// Receive state machine turning a serial byte stream into frame payloads.
///
/// [`Deframer::push`] yields `Ok(Some(payload))` when a frame validates,
/// `Ok(None)` while a frame is in progress, and an error when the declared
/// length is oversized or the checksum fails. Errors reset the machine to
/// the hunting state; the stream recovers at the next start delimiter.
#[derive(Debug)]
pub struct Deframer {
    state: State,
    payload: Vec<u8>,
}

impl Default for Deframer {
    fn default() -> Self {
        Self::new()
    }
}

impl Deframer {
    /// A fresh deframer, hunting for a start delimiter.
    #[must_use]
    pub fn new() -> Self {
        Self { state: State::Sync, payload: Vec::with_capacity(MAX_PAYLOAD_LEN) }
    }

    /// Whether a frame is currently in progress (delimiter seen, frame not
    /// yet complete). Callers use this to tell an idle timeout from
    /// mid-frame byte starvation.
    #[must_use]
    pub fn in_frame(&self) -> bool {
        self.state != State::Sync
    }

    /// Drop any partial frame and resume hunting for a delimiter.
    pub fn reset(&mut self) {
        self.state = State::Sync;
        self.payload.clear();
    }

    /// Feed one byte from the line.
    ///
    /// # Errors
    ///
    /// `PayloadTooLarge` when the declared length exceeds
    /// [`MAX_PAYLOAD_LEN`], `ChecksumMismatch` when the trailing byte does
    /// not validate. Both reset the machine.
    pub fn push(&mut self, byte: u8) -> Result<Option<Vec<u8>>, ProtocolError> {
        match self.state {
            State::Sync => {
                if byte == START_DELIMITER {
                    self.state = State::LenHigh;
                }
                Ok(None)
            }
            State::LenHigh => {
                self.state = State::LenLow { high: byte };
                Ok(None)
            }
            State::LenLow { high } => {
                let declared = usize::from(u16::from_be_bytes([high, byte]));
                if declared > MAX_PAYLOAD_LEN {
                    self.reset();
                    return Err(ProtocolError::PayloadTooLarge {
                        size: declared,
                        max: MAX_PAYLOAD_LEN,
                    });
                }
                self.payload.clear();
                self.state =
                    if declared == 0 { State::Checksum } else { State::Payload { remaining: declared } };
                Ok(None)
            }
            State::Payload { remaining } => {
                self.payload.push(byte);
                self.state = if remaining == 1 {
                    State::Checksum
                } else {
                    State::Payload { remaining: remaining - 1 }
                };
                Ok(None)
            }
            State::Checksum => {
                self.state = State::Sync;
                if verify_checksum(&self.payload, byte) {
                    Ok(Some(std::mem::take(&mut self.payload)))
                } else {
                    let err = ProtocolError::ChecksumMismatch {
                        computed: checksum(&self.payload),
                        received: byte,
                    };
                    self.payload.clear();
                    Err(err)
                }
            }
        }
    }
}

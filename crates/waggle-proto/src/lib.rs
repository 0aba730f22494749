//! Wire protocol for 802.15.4/ZigBee radio modules.
//!
//! Radio modules talk to the host over a serial line. In API mode every
//! exchange is a framed binary message: a start delimiter, a big-endian
//! length, a typed payload, and a one-byte checksum. This crate is the
//! sans-IO protocol layer:
//!
//! - [`ApiFrame`] — the twelve typed frame variants and their payload and
//!   wire codecs.
//! - [`Deframer`] — the byte-at-a-time receive state machine with silent
//!   resynchronization on line noise.
//! - [`encode_datagram`]/[`decode_datagram`] — the 8-byte UDP-style
//!   envelope peers use to tunnel datagrams inside a PAN.
//!
//! Serial I/O, timeouts, and the AT command dialogue live in the driver
//! crate; this crate never touches a transport.

mod datagram;
mod deframe;
mod errors;
mod frame;
mod status;

pub use datagram::{
    DATAGRAM_FRAME_ID, DATAGRAM_HEADER_LEN, MAX_DATAGRAM_PAYLOAD, PanSocketAddr, decode_datagram,
    encode_datagram,
};
pub use deframe::Deframer;
pub use errors::ProtocolError;
pub use frame::{
    AT_STATUS_ERROR, AT_STATUS_INVALID_COMMAND, AT_STATUS_INVALID_PARAMETER, AT_STATUS_NO_RESPONSE,
    AT_STATUS_OK, ApiFrame, FrameType, MAX_DATA_LEN, MAX_PAYLOAD_LEN, MAX_WIRE_LEN,
    RX_OPT_ADDRESS_BROADCAST, RX_OPT_PAN_BROADCAST, START_DELIMITER, TX_OPT_BROADCAST_PAN,
    TX_OPT_DISABLE_ACK, TX_OPT_ENABLE_APS, TX_STATUS_CCA_FAILURE, TX_STATUS_NO_ACK,
    TX_STATUS_PURGED, TX_STATUS_SUCCESS, WIRE_OVERHEAD, checksum, verify_checksum,
};
pub use status::{modem_status_text, tx_status_text};

//! Driver error types.

use std::io;

use waggle_proto::ProtocolError;

/// Errors from the byte-level transport.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// No byte arrived within the requested timeout.
    #[error("read timed out")]
    TimedOut,

    /// The underlying serial device failed.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Errors surfaced by driver session operations.
///
/// A `Serial` transport failure poisons the session half it occurs on:
/// every later operation on that half fails with `Inherited` until the
/// session is dropped and recreated. Everything else is recoverable —
/// `Protocol`, `FrameIntegrity`, and `Timeout` drop the offending frame
/// and the receiver resynchronizes at the next start delimiter.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// The session was poisoned by an earlier failure.
    #[error("session unusable after an earlier {0} failure")]
    Inherited(&'static str),

    /// The serial transport failed.
    #[error("serial transport failure")]
    Serial(#[source] io::Error),

    /// A frame failed to encode or decode (checksum, size, unknown type).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Byte starvation in the middle of a frame.
    #[error("incomplete frame: byte starvation mid-frame")]
    FrameIntegrity,

    /// No frame arrived within the caller's budget.
    #[error("timed out waiting for a frame")]
    Timeout,

    /// The module reported an operating mode this driver does not know.
    #[error("module reported an unrecognized operating mode")]
    Mode,

    /// An AT exchange returned an error or a mismatched response.
    #[error("unexpected AT response from the module")]
    Response,
}

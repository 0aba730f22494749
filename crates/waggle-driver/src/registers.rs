//! Register access over API-mode AT request/response pairs.
//!
//! The module exposes its configuration as named two-letter registers. In
//! API mode a register access is an `AtCommand` frame answered by an
//! `AtCommandResponse` carrying the echoed command letters, a status byte,
//! and the register value for queries. The module must be in API mode for
//! any of these.

use waggle_proto::{AT_STATUS_OK, ApiFrame};

use crate::{error::DriverError, session::Driver};

/// Frame id used for register exchanges.
const REGISTER_FRAME_ID: u8 = 0xCF;

/// 16-bit source address register.
pub const REG_ADDRESS_16: [u8; 2] = *b"MY";

/// PAN identifier register.
pub const REG_PAN_ID: [u8; 2] = *b"ID";

impl Driver {
    /// Write a named register.
    ///
    /// Multi-byte values are written big-endian by the caller.
    ///
    /// # Errors
    ///
    /// `Response` when the module echoes different command letters or a
    /// non-zero status; receive errors pass through.
    pub fn write_register(&mut self, name: [u8; 2], value: &[u8]) -> Result<(), DriverError> {
        self.send_at_command(REGISTER_FRAME_ID, name, value)?;
        self.await_at_response(name).map(|_| ())
    }

    /// Read a named register.
    pub fn read_register(&mut self, name: [u8; 2]) -> Result<Vec<u8>, DriverError> {
        self.send_at_command(REGISTER_FRAME_ID, name, &[])?;
        self.await_at_response(name)
    }

    /// Set the module's 16-bit address and PAN identifier.
    pub fn set_address16(&mut self, addr: u16, pan: u16) -> Result<(), DriverError> {
        self.write_register(REG_ADDRESS_16, &addr.to_be_bytes())?;
        self.write_register(REG_PAN_ID, &pan.to_be_bytes())
    }

    /// Read the module's 16-bit address and PAN identifier.
    ///
    /// # Errors
    ///
    /// `Response` when either register is not exactly two bytes wide.
    pub fn get_address16(&mut self) -> Result<(u16, u16), DriverError> {
        let addr = self.read_register(REG_ADDRESS_16)?;
        let pan = self.read_register(REG_PAN_ID)?;
        match (addr.as_slice(), pan.as_slice()) {
            ([a0, a1], [p0, p1]) => {
                Ok((u16::from_be_bytes([*a0, *a1]), u16::from_be_bytes([*p0, *p1])))
            }
            _ => Err(DriverError::Response),
        }
    }

    /// Wait for the response to a register exchange.
    ///
    /// Frames of other kinds that arrive meanwhile (data packets, modem
    /// statuses) are dropped with a warning; register exchanges run during
    /// configuration, before the session carries traffic.
    fn await_at_response(&mut self, name: [u8; 2]) -> Result<Vec<u8>, DriverError> {
        let budget = self.config().register_timeout;
        loop {
            match self.receive_with_budget(budget)? {
                ApiFrame::AtCommandResponse { command, status, value, .. } => {
                    if command != name || status != AT_STATUS_OK {
                        return Err(DriverError::Response);
                    }
                    return Ok(value);
                }
                other => {
                    tracing::warn!(
                        frame_type = ?other.frame_type(),
                        "discarding frame while awaiting an AT response"
                    );
                }
            }
        }
    }
}

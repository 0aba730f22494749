//! Byte-level serial transport.
//!
//! The driver session talks to the radio module through the [`Transport`]
//! trait: read one byte with a timeout, write a buffer, clone the handle so
//! a session can be split into transmit and receive halves. Production uses
//! [`SerialLink`] over a real serial device; tests substitute an in-memory
//! scripted link.

use std::{
    io,
    io::{Read, Write},
    time::Duration,
};

use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};

use crate::error::TransportError;

/// Line rate the radio module ships with.
pub const BAUD_RATE: u32 = 9600;

/// Byte-level access to the serial line the module is connected to.
pub trait Transport: Send {
    /// Read a single byte, waiting at most `timeout`. A zero timeout polls:
    /// it returns whatever byte is already buffered or
    /// [`TransportError::TimedOut`] immediately.
    fn read_byte(&mut self, timeout: Duration) -> Result<u8, TransportError>;

    /// Write the whole buffer.
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), TransportError>;

    /// A second handle onto the same line, for splitting a session into
    /// transmit and receive halves.
    fn try_clone(&self) -> Result<Box<dyn Transport>, TransportError>;
}

/// [`Transport`] over a serial device: 9600 baud, 8 data bits, no parity,
/// one stop bit, RTS/CTS flow control.
pub struct SerialLink {
    port: Box<dyn SerialPort>,
    /// Timeout currently programmed into the port, to skip redundant
    /// `set_timeout` calls on the byte-read hot path.
    timeout: Option<Duration>,
}

impl SerialLink {
    /// Open and configure the serial device at `path`.
    pub fn open(path: &str) -> Result<Self, TransportError> {
        let port = serialport::new(path, BAUD_RATE)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::Hardware)
            .timeout(Duration::from_millis(1000))
            .open()
            .map_err(|e| TransportError::Io(e.into()))?;
        Ok(Self { port, timeout: None })
    }
}

impl Transport for SerialLink {
    fn read_byte(&mut self, timeout: Duration) -> Result<u8, TransportError> {
        if self.timeout != Some(timeout) {
            self.port.set_timeout(timeout).map_err(|e| TransportError::Io(e.into()))?;
            self.timeout = Some(timeout);
        }

        let mut byte = [0u8; 1];
        match self.port.read(&mut byte) {
            Ok(1) => Ok(byte[0]),
            Ok(_) => Err(TransportError::TimedOut),
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Err(TransportError::TimedOut),
            Err(e) => Err(TransportError::Io(e)),
        }
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        self.port.write_all(bytes)?;
        self.port.flush()?;
        Ok(())
    }

    fn try_clone(&self) -> Result<Box<dyn Transport>, TransportError> {
        let port = self.port.try_clone().map_err(|e| TransportError::Io(e.into()))?;
        Ok(Box::new(Self { port, timeout: None }))
    }
}

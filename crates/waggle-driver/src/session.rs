//! Driver session: framed I/O and the transparent-mode AT dialogue.
//!
//! A [`Driver`] owns the serial line the radio module is connected to. In
//! API mode it sends and receives typed frames ([`DriverTx::send`],
//! [`DriverRx::receive`]); in transparent mode it runs the timed `+++` AT
//! dialogue ([`Driver::xfer_at_command`]) used for mode switching.
//!
//! A session can be [`Driver::split`] into a transmit half and a receive
//! half over cloned handles of the same line, so one thread can send while
//! another blocks in receive. Each half carries its own poison latch: a
//! session-fatal failure makes every later call on that half fail
//! [`DriverError::Inherited`] until the session is recreated.

use std::{
    thread,
    time::{Duration, Instant},
};

use waggle_proto::{ApiFrame, Deframer, MAX_WIRE_LEN};

use crate::{
    error::{DriverError, TransportError},
    transport::{SerialLink, Transport},
};

/// Operating mode of the radio module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Transparent serial passthrough with the in-band AT escape.
    Transparent,
    /// Framed binary API messages.
    Api,
}

/// Receive budget for [`DriverRx::receive`].
///
/// `Millis` is decremented in place by the elapsed wall time, so after the
/// call the caller observes how much budget remained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeout {
    /// Return immediately once no byte is buffered.
    NoWait,
    /// Wait at most this many milliseconds in total.
    Millis(u32),
    /// Block until a frame arrives.
    Infinite,
}

/// Session timing knobs. Defaults match the module's guard-time and
/// response-latency requirements; tests shorten them.
#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    /// Quiet period before the `+++` escape sequence.
    pub guard_time: Duration,
    /// Per-line read budget inside the AT dialogue.
    pub command_timeout: Duration,
    /// Budget for an API-mode AT command response, in milliseconds.
    pub register_timeout: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            guard_time: Duration::from_millis(1100),
            command_timeout: Duration::from_millis(2000),
            register_timeout: 1000,
        }
    }
}

/// Longest line accepted from the module during the AT dialogue.
const AT_LINE_MAX: usize = 256;

/// Per-read slice used to realize an infinite receive budget.
const INFINITE_POLL: Duration = Duration::from_secs(60);

/// Transmit half of a session.
pub struct DriverTx {
    link: Box<dyn Transport>,
    scratch: Vec<u8>,
    fault: Option<&'static str>,
}

/// Receive half of a session.
pub struct DriverRx {
    link: Box<dyn Transport>,
    deframer: Deframer,
    fault: Option<&'static str>,
}

/// A driver session bound to a serial line.
pub struct Driver {
    tx: DriverTx,
    rx: DriverRx,
    config: SessionConfig,
}

impl Driver {
    /// The session's timing configuration.
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }
}

impl Driver {
    /// Open the serial device at `path` with default timing.
    pub fn open(path: &str) -> Result<Self, DriverError> {
        Self::open_with(path, SessionConfig::default())
    }

    /// Open the serial device at `path`.
    pub fn open_with(path: &str, config: SessionConfig) -> Result<Self, DriverError> {
        let link = SerialLink::open(path).map_err(fatal_open)?;
        Self::from_transport(Box::new(link), config)
    }

    /// Build a session over an existing transport (tests use an in-memory
    /// link here).
    pub fn from_transport(
        link: Box<dyn Transport>,
        config: SessionConfig,
    ) -> Result<Self, DriverError> {
        let rx_link = link.try_clone().map_err(fatal_open)?;
        Ok(Self {
            tx: DriverTx { link, scratch: Vec::with_capacity(MAX_WIRE_LEN), fault: None },
            rx: DriverRx { link: rx_link, deframer: Deframer::new(), fault: None },
            config,
        })
    }

    /// Split the session into independent transmit and receive halves.
    #[must_use]
    pub fn split(self) -> (DriverTx, DriverRx) {
        (self.tx, self.rx)
    }

    /// Send a typed frame. See [`DriverTx::send`].
    pub fn send(&mut self, frame: &ApiFrame) -> Result<(), DriverError> {
        self.tx.send(frame)
    }

    /// Receive one typed frame. See [`DriverRx::receive`].
    pub fn receive(&mut self, timeout: &mut Timeout) -> Result<ApiFrame, DriverError> {
        self.rx.receive(timeout)
    }

    /// Send an AT command frame (applied immediately).
    pub fn send_at_command(
        &mut self,
        frame_id: u8,
        command: [u8; 2],
        value: &[u8],
    ) -> Result<(), DriverError> {
        self.tx.send(&ApiFrame::AtCommand { frame_id, command, value: value.to_vec() })
    }

    /// Send an AT command frame (queued until applied).
    pub fn send_at_command_queue(
        &mut self,
        frame_id: u8,
        command: [u8; 2],
        value: &[u8],
    ) -> Result<(), DriverError> {
        self.tx.send(&ApiFrame::AtCommandQueue { frame_id, command, value: value.to_vec() })
    }

    /// Send an AT command to a remote module.
    #[allow(clippy::too_many_arguments)]
    pub fn send_remote_at_command(
        &mut self,
        frame_id: u8,
        dest64: u64,
        dest16: u16,
        command: [u8; 2],
        command_options: u8,
        value: &[u8],
    ) -> Result<(), DriverError> {
        self.tx.send(&ApiFrame::RemoteAtCommand {
            frame_id,
            dest64,
            dest16,
            command_options,
            command,
            value: value.to_vec(),
        })
    }

    /// Send a transmit request using 64-bit addressing.
    pub fn send_tx_request64(
        &mut self,
        frame_id: u8,
        dest: u64,
        options: u8,
        data: &[u8],
    ) -> Result<(), DriverError> {
        self.tx.send(&ApiFrame::TxRequest64 { frame_id, dest, options, data: data.to_vec() })
    }

    /// Send a transmit request using 16-bit addressing.
    pub fn send_tx_request16(
        &mut self,
        frame_id: u8,
        dest: u16,
        options: u8,
        data: &[u8],
    ) -> Result<(), DriverError> {
        self.tx.send(&ApiFrame::TxRequest16 { frame_id, dest, options, data: data.to_vec() })
    }

    /// Send an extended transmit request (both address widths).
    #[allow(clippy::too_many_arguments)]
    pub fn send_tx_request(
        &mut self,
        frame_id: u8,
        dest64: u64,
        dest16: u16,
        broadcast_radius: u8,
        options: u8,
        data: &[u8],
    ) -> Result<(), DriverError> {
        self.tx.send(&ApiFrame::TxRequest {
            frame_id,
            dest64,
            dest16,
            broadcast_radius,
            options,
            data: data.to_vec(),
        })
    }

    /// Run one transparent-mode AT exchange.
    ///
    /// Honors the module's guard time, enters command mode with `+++`,
    /// issues `AT<command><args>`, and leaves command mode with `ATCN`. The
    /// response line is returned with a trailing `OK\r` stripped; other
    /// value responses are returned as read.
    ///
    /// # Errors
    ///
    /// `Response` when any step answers something other than the expected
    /// acknowledgement (or nothing at all within the per-line budget),
    /// `Serial` on transport failure, `Inherited` on a poisoned session.
    pub fn xfer_at_command(
        &mut self,
        command: [u8; 2],
        args: &[u8],
    ) -> Result<Vec<u8>, DriverError> {
        if let Some(kind) = self.tx.fault.or(self.rx.fault) {
            return Err(DriverError::Inherited(kind));
        }

        // The module only honors the escape sequence after a quiet period.
        thread::sleep(self.config.guard_time);
        self.tx.write_raw(b"+++")?;

        let ack = self.read_line()?;
        if !ack.ends_with(b"OK\r") {
            return Err(DriverError::Response);
        }

        let mut request = Vec::with_capacity(5 + args.len());
        request.extend_from_slice(b"AT");
        request.extend_from_slice(&command);
        request.extend_from_slice(args);
        request.push(b'\r');
        self.tx.write_raw(&request)?;

        let mut line = self.read_line()?;
        if line.ends_with(b"ERROR\r") {
            return Err(DriverError::Response);
        }
        if line.ends_with(b"OK\r") {
            line.truncate(line.len() - 3);
        }

        self.tx.write_raw(b"ATCN\r")?;
        let ack = self.read_line()?;
        if !ack.ends_with(b"OK\r") {
            return Err(DriverError::Response);
        }

        Ok(line)
    }

    /// Switch the module's operating mode (transparent-mode exchange).
    pub fn set_mode(&mut self, mode: Mode) -> Result<(), DriverError> {
        let ascii = match mode {
            Mode::Transparent => b'0',
            Mode::Api => b'1',
        };
        self.xfer_at_command(*b"AP", &[ascii]).map(|_| ())
    }

    /// Query the module's operating mode (transparent-mode exchange).
    ///
    /// # Errors
    ///
    /// `Mode` when the module answers something other than ASCII '0'/'1'.
    pub fn mode(&mut self) -> Result<Mode, DriverError> {
        let response = self.xfer_at_command(*b"AP", &[])?;
        match response.first() {
            Some(b'0') => Ok(Mode::Transparent),
            Some(b'1') => Ok(Mode::Api),
            _ => Err(DriverError::Mode),
        }
    }

    pub(crate) fn receive_with_budget(
        &mut self,
        budget_ms: u32,
    ) -> Result<ApiFrame, DriverError> {
        let mut timeout = Timeout::Millis(budget_ms);
        self.rx.receive(&mut timeout)
    }

    /// Read bytes until a carriage return, within the per-line budget.
    fn read_line(&mut self) -> Result<Vec<u8>, DriverError> {
        let mut line = Vec::new();
        loop {
            match self.rx.link.read_byte(self.config.command_timeout) {
                Ok(byte) => {
                    line.push(byte);
                    if byte == b'\r' || line.len() >= AT_LINE_MAX {
                        return Ok(line);
                    }
                }
                Err(TransportError::TimedOut) => return Err(DriverError::Response),
                Err(TransportError::Io(e)) => {
                    self.rx.fault = Some("serial");
                    return Err(DriverError::Serial(e));
                }
            }
        }
    }
}

impl DriverTx {
    /// Encode and send a typed frame in a single buffered write.
    ///
    /// # Errors
    ///
    /// `Protocol` when the frame exceeds size limits (the session stays
    /// usable), `Serial` on transport failure (poisons this half),
    /// `Inherited` on a poisoned half.
    pub fn send(&mut self, frame: &ApiFrame) -> Result<(), DriverError> {
        if let Some(kind) = self.fault {
            return Err(DriverError::Inherited(kind));
        }

        self.scratch.clear();
        frame.encode_wire(&mut self.scratch)?;
        tracing::debug!(frame_type = ?frame.frame_type(), bytes = ?HexDump(&self.scratch), "sending frame");
        self.write_raw_latched()
    }

    fn write_raw(&mut self, bytes: &[u8]) -> Result<(), DriverError> {
        self.scratch.clear();
        self.scratch.extend_from_slice(bytes);
        self.write_raw_latched()
    }

    fn write_raw_latched(&mut self) -> Result<(), DriverError> {
        match self.link.write_all(&self.scratch) {
            Ok(()) => Ok(()),
            Err(TransportError::Io(e)) => {
                self.fault = Some("serial");
                Err(DriverError::Serial(e))
            }
            Err(TransportError::TimedOut) => {
                self.fault = Some("serial");
                Err(DriverError::Serial(std::io::ErrorKind::TimedOut.into()))
            }
        }
    }
}

impl DriverRx {
    /// Receive one typed frame within the given budget.
    ///
    /// Drives the deframer byte by byte. On return a `Millis` budget has
    /// been reduced by the elapsed time. A timeout before any byte of this
    /// call was consumed is `Timeout`; starvation mid-frame is
    /// `FrameIntegrity`, dropping the partial frame. Both, like checksum,
    /// size, and unknown-type failures, leave the half usable — the line
    /// resynchronizes at the next delimiter. Only transport I/O failure
    /// poisons the half.
    pub fn receive(&mut self, timeout: &mut Timeout) -> Result<ApiFrame, DriverError> {
        if let Some(kind) = self.fault {
            return Err(DriverError::Inherited(kind));
        }

        self.deframer.reset();
        let mut consumed = false;

        loop {
            let wait = match *timeout {
                Timeout::NoWait => Duration::ZERO,
                Timeout::Millis(ms) => Duration::from_millis(u64::from(ms)),
                Timeout::Infinite => INFINITE_POLL,
            };

            let started = Instant::now();
            let result = self.link.read_byte(wait);
            if let Timeout::Millis(ms) = timeout {
                *ms = ms.saturating_sub(started.elapsed().as_millis() as u32);
            }

            match result {
                Ok(byte) => {
                    consumed = true;
                    if let Some(payload) = self.deframer.push(byte)? {
                        let frame = ApiFrame::decode_payload(&payload)?;
                        tracing::trace!(frame_type = ?frame.frame_type(), "received frame");
                        return Ok(frame);
                    }
                }
                Err(TransportError::TimedOut) => {
                    if matches!(timeout, Timeout::Infinite) {
                        continue;
                    }
                    if consumed {
                        // Drop the partial frame; the line resynchronizes
                        // at the next start delimiter.
                        self.deframer.reset();
                        return Err(DriverError::FrameIntegrity);
                    }
                    return Err(DriverError::Timeout);
                }
                Err(TransportError::Io(e)) => {
                    self.fault = Some("serial");
                    return Err(DriverError::Serial(e));
                }
            }
        }
    }
}

fn fatal_open(err: TransportError) -> DriverError {
    match err {
        TransportError::Io(e) => DriverError::Serial(e),
        TransportError::TimedOut => DriverError::Serial(std::io::ErrorKind::TimedOut.into()),
    }
}

/// Lowercase hex rendering for frame byte logs.
struct HexDump<'a>(&'a [u8]);

impl std::fmt::Debug for HexDump<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

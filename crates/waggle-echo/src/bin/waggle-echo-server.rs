//! Echo server: answers in-PAN datagrams directly at the driver level.
//!
//! Listens on the radio link for datagram-carrying packets, and echoes
//! every payload back to the sender's port and address. Useful as the
//! remote end for `waggle-echo-client` runs, and as the smallest complete
//! example of driver-level datagram I/O.
//!
//! # Usage
//!
//! ```bash
//! waggle-echo-server --serial /dev/ttyUSB0 --addr 0x0A0A --pan 0x0A0A
//! ```

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use waggle_driver::{Driver, DriverError, Mode, Timeout};
use waggle_proto::{
    ApiFrame, TX_STATUS_SUCCESS, decode_datagram, encode_datagram, modem_status_text,
    tx_status_text,
};

/// UDP port of the echo service.
const ECHO_PORT: u16 = 7;

/// How long to wait for a transmit status after each reply, in
/// milliseconds.
const STATUS_TIMEOUT: u32 = 1000;

/// Echo server answering datagrams on the radio link
#[derive(Parser, Debug)]
#[command(name = "waggle-echo-server")]
#[command(about = "Echoes in-PAN datagrams back to their sender")]
#[command(version)]
struct Args {
    /// Serial device the radio module is connected to, e.g. /dev/ttyUSB0
    #[arg(short, long)]
    serial: String,

    /// 16-bit radio address of the server (decimal or 0x-hex)
    #[arg(short, long, default_value = "0x0A0A", value_parser = parse_u16)]
    addr: u16,

    /// PAN identifier (decimal or 0x-hex)
    #[arg(short, long, default_value = "0x0A0A", value_parser = parse_u16)]
    pan: u16,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn parse_u16(input: &str) -> Result<u16, String> {
    let input = input.trim();
    let parsed = match input.strip_prefix("0x").or_else(|| input.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => input.parse(),
    };
    parsed.map_err(|e| format!("invalid 16-bit value '{input}': {e}"))
}

fn main() {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    if let Err(e) = run(&args) {
        tracing::error!("echo server failed: {e}");
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), DriverError> {
    let mut driver = Driver::open(&args.serial)?;

    let mode = driver.mode()?;
    tracing::info!(
        "module operates in {} mode",
        match mode {
            Mode::Transparent => "transparent",
            Mode::Api => "API",
        }
    );
    if mode != Mode::Api {
        driver.set_mode(Mode::Api)?;
        tracing::info!("switched the module to API mode");
    }

    driver.set_address16(args.addr, args.pan)?;
    tracing::info!(
        "echo server listening on {:#06x} (PAN {:#06x})",
        args.addr,
        args.pan
    );

    loop {
        let mut timeout = Timeout::Infinite;
        let frame = match driver.receive(&mut timeout) {
            Ok(frame) => frame,
            Err(e @ (DriverError::Inherited(_) | DriverError::Serial(_))) => return Err(e),
            Err(e) => {
                tracing::warn!("dropping malformed frame: {e}");
                continue;
            }
        };

        match &frame {
            ApiFrame::RxPacket16 { rssi, .. } => {
                let (payload, from) = match decode_datagram(&frame) {
                    Ok(decoded) => decoded,
                    Err(e) => {
                        tracing::warn!("dropping packet without a datagram: {e}");
                        continue;
                    }
                };
                tracing::debug!(
                    "{} bytes from {:#06x}:{} at -{}dBm",
                    payload.len(),
                    from.addr,
                    from.port,
                    rssi
                );

                let reply = match encode_datagram(payload, ECHO_PORT, from) {
                    Ok(reply) => reply,
                    Err(e) => {
                        tracing::warn!("cannot echo payload: {e}");
                        continue;
                    }
                };
                driver.send(&reply)?;
                await_tx_status(&mut driver)?;
            }
            ApiFrame::ModemStatus { status } => {
                tracing::info!("modem status: {}", modem_status_text(*status));
            }
            other => {
                tracing::debug!(frame_type = ?other.frame_type(), "discarding frame");
            }
        }
    }
}

/// Wait for the status of the reply just sent, dropping unrelated frames.
fn await_tx_status(driver: &mut Driver) -> Result<(), DriverError> {
    let mut timeout = Timeout::Millis(STATUS_TIMEOUT);
    loop {
        match driver.receive(&mut timeout) {
            Ok(ApiFrame::TxStatus { status, .. }) => {
                if status != TX_STATUS_SUCCESS {
                    tracing::warn!("echo transmit failed: {}", tx_status_text(status));
                }
                return Ok(());
            }
            Ok(other) => {
                tracing::debug!(frame_type = ?other.frame_type(), "discarding frame while awaiting transmit status");
            }
            Err(DriverError::Timeout) => {
                tracing::warn!("no transmit status within {STATUS_TIMEOUT} ms");
                return Ok(());
            }
            Err(e @ (DriverError::Inherited(_) | DriverError::Serial(_))) => return Err(e),
            Err(e) => {
                tracing::warn!("dropping malformed frame: {e}");
            }
        }
    }
}

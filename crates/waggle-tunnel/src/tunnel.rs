//! The tunnel: a TUN interface bridged onto the radio link by two threads.
//!
//! The transmit thread reads IP packets from the TUN device, converts them
//! to transmit requests, sends them, and then blocks until the receive
//! thread observes the module's transmit status — so at most one transmit
//! is in flight at any time. The receive thread blocks on the radio,
//! forwards data packets to the TUN device in arrival order, and posts
//! transmit statuses to the waiting transmitter.
//!
//! Only the transmit thread touches the driver's send half and only the
//! receive thread touches its receive half; the split makes that ownership
//! structural.

use std::{net::Ipv4Addr, thread};

use crossbeam_channel::{Receiver, Sender};
use waggle_driver::{Driver, DriverError, DriverRx, DriverTx, Mode, Timeout};
use waggle_proto::{ApiFrame, TX_STATUS_SUCCESS, modem_status_text, tx_status_text};

use crate::{
    error::TunnelError,
    inet::{ip_to_tx_request, rx_packet_to_ip},
    tun::{PacketIo, TunDevice},
};

/// Largest IP packet read from the TUN device in one go.
pub const TUN_MTU: usize = 576;

/// Tunnel parameters.
#[derive(Debug, Clone)]
pub struct TunnelConfig {
    /// Serial device the radio module is connected to.
    pub serial: String,
    /// Address to assign to the tunnel interface. The network half (/16)
    /// becomes the PAN identifier, the host half the module's 16-bit radio
    /// address.
    pub inet: Ipv4Addr,
}

/// A running tunnel's state, ready to be driven by [`Tunnel::run`].
pub struct Tunnel {
    tx: DriverTx,
    rx: DriverRx,
    tun: TunDevice,
    local: Ipv4Addr,
}

impl Tunnel {
    /// Initialize the radio module and the TUN interface.
    ///
    /// Switches the module to API mode if necessary and programs its
    /// 16-bit address and PAN from the tunnel address. Any failure here is
    /// fatal to the daemon.
    pub fn open(config: &TunnelConfig) -> Result<Self, TunnelError> {
        let mut driver = Driver::open(&config.serial)?;

        if driver.mode()? != Mode::Api {
            driver.set_mode(Mode::Api)?;
            tracing::info!("switched the module to API mode");
        }

        let bits = u32::from(config.inet);
        let pan = (bits >> 16) as u16;
        let addr = (bits & 0xFFFF) as u16;
        driver.set_address16(addr, pan)?;
        tracing::info!("module addressed {addr:#06x} (PAN {pan:#06x})");

        let tun = TunDevice::open(config.inet)?;
        let (tx, rx) = driver.split();

        Ok(Self { tx, rx, tun, local: config.inet })
    }

    /// Run both tunnel threads until the session dies.
    pub fn run(self) {
        let Self { tx, rx, tun, local } = self;
        let (status_tx, status_rx) = crossbeam_channel::unbounded();

        thread::scope(|scope| {
            scope.spawn(|| transmit_loop(tx, &tun, status_rx));
            scope.spawn(|| receive_loop(rx, &tun, local, status_tx));
        });
    }
}

/// TUN → radio. Runs until the TUN device or the session fails fatally.
pub fn transmit_loop(mut tx: DriverTx, tun: &impl PacketIo, statuses: Receiver<u8>) {
    let mut buffer = [0u8; TUN_MTU];
    loop {
        let read = match tun.recv_packet(&mut buffer) {
            Ok(read) => read,
            Err(e) => {
                tracing::error!("failed to read from the TUN device: {e}");
                return;
            }
        };

        let frame = match ip_to_tx_request(&buffer[..read]) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!("dropping packet from the TUN device: {e}");
                continue;
            }
        };
        if let ApiFrame::TxRequest16 { dest, data, .. } = &frame {
            tracing::debug!("---> {} bytes to {:#06x}", data.len(), dest);
        }

        match tx.send(&frame) {
            Ok(()) => {}
            Err(e @ (DriverError::Inherited(_) | DriverError::Serial(_))) => {
                tracing::error!("radio send failed: {e}");
                return;
            }
            Err(e) => {
                tracing::warn!("dropping unsendable frame: {e}");
                continue;
            }
        }

        // One transmit in flight at a time: wait for the receive thread to
        // observe the module's status report.
        match statuses.recv() {
            Ok(TX_STATUS_SUCCESS) => {}
            Ok(code) => tracing::warn!("transmit failed: {}", tx_status_text(code)),
            Err(_) => return, // receive thread is gone
        }
    }
}

/// Radio → TUN. Runs until the session fails fatally.
pub fn receive_loop(
    mut rx: DriverRx,
    tun: &impl PacketIo,
    local: Ipv4Addr,
    statuses: Sender<u8>,
) {
    loop {
        let mut timeout = Timeout::Infinite;
        let frame = match rx.receive(&mut timeout) {
            Ok(frame) => frame,
            Err(e @ (DriverError::Inherited(_) | DriverError::Serial(_))) => {
                tracing::error!("radio receive failed: {e}");
                return;
            }
            Err(e) => {
                tracing::warn!("dropping malformed frame: {e}");
                continue;
            }
        };

        match &frame {
            ApiFrame::RxPacket16 { source, rssi, data, .. } => {
                tracing::debug!("<--- {} bytes from {:#06x} at -{}dBm", data.len(), source, rssi);
                match rx_packet_to_ip(local, &frame) {
                    Ok(packet) => {
                        if let Err(e) = tun.send_packet(&packet) {
                            tracing::error!("failed to write to the TUN device: {e}");
                        }
                    }
                    Err(e) => tracing::warn!("dropping radio packet: {e}"),
                }
            }
            ApiFrame::TxStatus { status, .. } => {
                // Release the transmit thread. A send failure means the
                // transmitter is gone, which ends this thread's purpose too
                // but not its packet forwarding.
                let _ = statuses.send(*status);
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

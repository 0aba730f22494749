//! TUN device access.
//!
//! The tunnel terminates on a point-to-point TUN interface delivering raw
//! IP packets (no packet-info preamble). The interface address and /16
//! netmask are assigned through the `ip` utility after the device is
//! created.

use std::{io, net::Ipv4Addr, process::Command};

use tun_tap::{Iface, Mode};

use crate::error::TunnelError;

/// Packet-level I/O the tunnel loops run against. The production
/// implementation is [`TunDevice`]; tests substitute a scripted queue.
pub trait PacketIo: Sync {
    /// Read one IP packet, blocking until one is available.
    fn recv_packet(&self, buf: &mut [u8]) -> io::Result<usize>;

    /// Write one IP packet.
    fn send_packet(&self, packet: &[u8]) -> io::Result<usize>;
}

/// A configured TUN interface.
pub struct TunDevice {
    iface: Iface,
}

impl TunDevice {
    /// Create a TUN interface and assign `addr` with a /16 netmask.
    pub fn open(addr: Ipv4Addr) -> Result<Self, TunnelError> {
        let iface = Iface::without_packet_info("waggle%d", Mode::Tun).map_err(TunnelError::Tun)?;
        configure_interface(iface.name(), addr)?;
        tracing::info!(name = iface.name(), %addr, "TUN interface up");
        Ok(Self { iface })
    }

    /// Interface name assigned by the kernel.
    #[must_use]
    pub fn name(&self) -> &str {
        self.iface.name()
    }
}

impl PacketIo for TunDevice {
    fn recv_packet(&self, buf: &mut [u8]) -> io::Result<usize> {
        self.iface.recv(buf)
    }

    fn send_packet(&self, packet: &[u8]) -> io::Result<usize> {
        self.iface.send(packet)
    }
}

fn configure_interface(name: &str, addr: Ipv4Addr) -> Result<(), TunnelError> {
    run_ip(&["addr", "add", &format!("{addr}/16"), "dev", name])?;
    run_ip(&["link", "set", "dev", name, "up"])
}

fn run_ip(args: &[&str]) -> Result<(), TunnelError> {
    let status = Command::new("ip")
        .args(args)
        .status()
        .map_err(|e| TunnelError::Configure(format!("ip {}: {e}", args.join(" "))))?;
    if !status.success() {
        return Err(TunnelError::Configure(format!("ip {} exited with {status}", args.join(" "))));
    }
    Ok(())
}

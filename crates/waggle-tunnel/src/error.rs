//! Tunnel error types.

use std::io;

use etherparse::IpNumber;
use waggle_driver::DriverError;
use waggle_proto::FrameType;

/// Errors from the IPv4/UDP ↔ radio frame bridge.
#[derive(Debug, thiserror::Error)]
pub enum InetError {
    /// Only UDP is carried over the radio link.
    #[error("not a UDP packet (protocol {0:?})")]
    NotUdp(IpNumber),

    /// The IPv4 header failed to parse.
    #[error(transparent)]
    Ipv4(#[from] etherparse::err::ipv4::HeaderSliceError),

    /// The buffer is shorter than the header's total length.
    #[error("IP packet truncated: header claims {claimed} bytes, buffer holds {actual}")]
    Truncated {
        /// Total length claimed by the IPv4 header.
        claimed: usize,
        /// Bytes actually available.
        actual: usize,
    },

    /// The UDP segment does not fit a radio frame's data region.
    #[error("UDP segment too large for a radio frame: {size} bytes (max {max})")]
    SegmentTooLarge {
        /// Segment size in bytes.
        size: usize,
        /// Largest segment a frame can carry.
        max: usize,
    },

    /// Only 16-bit receive packets can be turned into IP packets.
    #[error("expected a 16-bit receive packet, got {0:?}")]
    NotDataPacket(FrameType),

    /// Serializing the IPv4 header failed.
    #[error("failed to serialize the IPv4 header")]
    Header(#[source] io::Error),
}

/// Errors from tunnel setup and operation.
#[derive(Debug, thiserror::Error)]
pub enum TunnelError {
    /// The radio driver failed.
    #[error("radio driver error")]
    Driver(#[from] DriverError),

    /// The TUN device could not be opened.
    #[error("failed to open the TUN device")]
    Tun(#[source] io::Error),

    /// The network interface could not be configured.
    #[error("failed to configure the network interface: {0}")]
    Configure(String),
}

//! IPv4/UDP ↔ radio frame bridge.
//!
//! The tunnel maps IP addresses onto the PAN: the network half of a /16
//! address is the PAN identifier, the host half is a module's 16-bit radio
//! address. Only the UDP header and payload cross the air — the IP header
//! is stripped on the way out and reconstructed on the way in.

use std::net::Ipv4Addr;

use etherparse::{IpNumber, Ipv4Header, Ipv4HeaderSlice};
use waggle_proto::{ApiFrame, MAX_DATA_LEN};

use crate::error::InetError;

/// Frame id stamped on tunnel transmit requests.
pub const INET_FRAME_ID: u8 = 0xAA;

/// IPv4 identification field of reconstructed packets.
const IP_IDENT: u16 = 42;

/// Time-to-live of reconstructed packets.
const IP_TTL: u8 = 64;

/// Turn an IPv4/UDP packet read from the TUN device into a transmit
/// request addressed to the host half of the destination IP.
///
/// # Errors
///
/// `NotUdp` for any other protocol, `Ipv4`/`Truncated` for malformed
/// packets, `SegmentTooLarge` when the UDP segment exceeds a frame's data
/// region.
pub fn ip_to_tx_request(packet: &[u8]) -> Result<ApiFrame, InetError> {
    let header = Ipv4HeaderSlice::from_slice(packet)?;
    if header.protocol() != IpNumber::UDP {
        return Err(InetError::NotUdp(header.protocol()));
    }

    let header_len = usize::from(header.ihl()) * 4;
    let total_len = usize::from(header.total_len());
    if total_len < header_len || packet.len() < total_len {
        return Err(InetError::Truncated { claimed: total_len, actual: packet.len() });
    }

    let segment = &packet[header_len..total_len];
    if segment.len() > MAX_DATA_LEN {
        return Err(InetError::SegmentTooLarge { size: segment.len(), max: MAX_DATA_LEN });
    }

    let dest = (u32::from(header.destination_addr()) & 0xFFFF) as u16;
    Ok(ApiFrame::TxRequest16 {
        frame_id: INET_FRAME_ID,
        dest,
        options: 0,
        data: segment.to_vec(),
    })
}

/// Turn a received radio packet back into an IPv4/UDP packet for the TUN
/// device.
///
/// The source address is synthesized from the local address's network half
/// and the sender's 16-bit radio address; the destination is the local
/// address.
///
/// # Errors
///
/// `NotDataPacket` for any variant other than a 16-bit receive packet,
/// `SegmentTooLarge` when the data region cannot be expressed as an IPv4
/// total length.
pub fn rx_packet_to_ip(local: Ipv4Addr, frame: &ApiFrame) -> Result<Vec<u8>, InetError> {
    let ApiFrame::RxPacket16 { source, data, .. } = frame else {
        return Err(InetError::NotDataPacket(frame.frame_type()));
    };

    let local_bits = u32::from(local);
    let source_addr = Ipv4Addr::from((local_bits & 0xFFFF_0000) | u32::from(*source));

    let segment_len = u16::try_from(data.len())
        .map_err(|_| InetError::SegmentTooLarge { size: data.len(), max: MAX_DATA_LEN })?;
    let mut header =
        Ipv4Header::new(segment_len, IP_TTL, IpNumber::UDP, source_addr.octets(), local.octets())
            .map_err(|_| InetError::SegmentTooLarge { size: data.len(), max: MAX_DATA_LEN })?;
    header.identification = IP_IDENT;

    let mut packet = Vec::with_capacity(Ipv4Header::MIN_LEN + data.len());
    header.write(&mut packet).map_err(InetError::Header)?;
    packet.extend_from_slice(data);
    Ok(packet)
}

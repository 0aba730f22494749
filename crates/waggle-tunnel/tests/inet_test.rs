//! IP bridge tests: fixed packet vectors and header reconstruction.

use std::net::Ipv4Addr;

use etherparse::Ipv4HeaderSlice;
use waggle_tunnel::{INET_FRAME_ID, InetError, ip_to_tx_request, rx_packet_to_ip};
use waggle_proto::ApiFrame;

/// A handcrafted IPv4/UDP packet.
fn udp_packet(source: [u8; 4], dest: [u8; 4], src_port: u16, dst_port: u16, payload: &[u8]) -> Vec<u8> {
    let udp_len = 8 + payload.len();
    let total_len = 20 + udp_len;

    let mut packet = Vec::with_capacity(total_len);
    packet.push(0x45); // version 4, IHL 5
    packet.push(0x00); // TOS
    packet.extend_from_slice(&(total_len as u16).to_be_bytes());
    packet.extend_from_slice(&[0x00, 0x00]); // identification
    packet.extend_from_slice(&[0x00, 0x00]); // flags + fragment offset
    packet.push(64); // TTL
    packet.push(17); // UDP
    packet.extend_from_slice(&[0x00, 0x00]); // header checksum (unchecked on parse)
    packet.extend_from_slice(&source);
    packet.extend_from_slice(&dest);

    packet.extend_from_slice(&src_port.to_be_bytes());
    packet.extend_from_slice(&dst_port.to_be_bytes());
    packet.extend_from_slice(&(udp_len as u16).to_be_bytes());
    packet.extend_from_slice(&[0x00, 0x00]); // UDP checksum
    packet.extend_from_slice(payload);
    packet
}

/// One's-complement sum of a header; a valid checksummed header sums to
/// 0xFFFF.
fn ones_complement_sum(header: &[u8]) -> u16 {
    let mut sum: u32 = 0;
    for pair in header.chunks(2) {
        sum += u32::from(u16::from_be_bytes([pair[0], pair[1]]));
    }
    while sum > 0xFFFF {
        sum = (sum >> 16) + (sum & 0xFFFF);
    }
    sum as u16
}

#[test]
fn udp_packet_becomes_a_tx_request_to_the_host_half() {
    let packet = udp_packet([10, 10, 0, 1], [10, 10, 10, 10], 1000, 7, b"HELLO");
    let frame = ip_to_tx_request(&packet).unwrap();

    let ApiFrame::TxRequest16 { frame_id, dest, options, data } = frame else {
        panic!("expected a 16-bit transmit request");
    };
    assert_eq!(frame_id, INET_FRAME_ID);
    assert_eq!(dest, 0x0A0A);
    assert_eq!(options, 0);
    // The data region is the UDP header followed by the payload.
    assert_eq!(
        data,
        [0x03, 0xE8, 0x00, 0x07, 0x00, 0x0D, 0x00, 0x00, b'H', b'E', b'L', b'L', b'O']
    );
}

#[test]
fn non_udp_packets_are_rejected() {
    let mut packet = udp_packet([10, 10, 0, 1], [10, 10, 10, 10], 1000, 7, b"HELLO");
    packet[9] = 6; // TCP
    assert!(matches!(ip_to_tx_request(&packet), Err(InetError::NotUdp(_))));
}

#[test]
fn truncated_packets_are_rejected() {
    let packet = udp_packet([10, 10, 0, 1], [10, 10, 10, 10], 1000, 7, b"HELLO");
    let claimed = packet.len();
    let err = ip_to_tx_request(&packet[..claimed - 3]).unwrap_err();
    assert!(matches!(err, InetError::Truncated { claimed: c, actual: a } if c == claimed && a == claimed - 3));
}

#[test]
fn received_radio_packet_becomes_a_checksummed_ip_packet() {
    let local = Ipv4Addr::new(10, 10, 123, 123);
    let segment = [0x03, 0xE8, 0x00, 0x07, 0x00, 0x0D, 0x00, 0x00, b'H', b'E', b'L', b'L', b'O'];
    let frame =
        ApiFrame::RxPacket16 { source: 0x0A0A, rssi: 40, options: 0, data: segment.to_vec() };

    let packet = rx_packet_to_ip(local, &frame).unwrap();
    assert_eq!(packet.len(), 20 + segment.len());

    let header = Ipv4HeaderSlice::from_slice(&packet).unwrap();
    assert_eq!(header.ihl(), 5);
    assert_eq!(header.ttl(), 64);
    assert_eq!(header.identification(), 42);
    assert_eq!(usize::from(header.total_len()), packet.len());
    // Source = local network half + the sender's radio address.
    assert_eq!(header.source(), [10, 10, 10, 10]);
    assert_eq!(header.destination(), [10, 10, 123, 123]);
    // Standard IPv4 one's-complement header checksum.
    assert_eq!(ones_complement_sum(&packet[..20]), 0xFFFF);
    // The segment rides behind the header untouched.
    assert_eq!(&packet[20..], segment);
}

#[test]
fn bridge_round_trip_addresses_the_local_host_half() {
    let local = Ipv4Addr::new(10, 10, 123, 123);
    let segment = vec![0x03, 0xE8, 0x00, 0x07, 0x00, 0x09, 0x00, 0x00, b'H', b'I'];
    let frame = ApiFrame::RxPacket16 { source: 0x0A0A, rssi: 40, options: 0, data: segment.clone() };

    // Loop the reconstructed packet straight back into the bridge.
    let packet = rx_packet_to_ip(local, &frame).unwrap();
    let back = ip_to_tx_request(&packet).unwrap();

    let ApiFrame::TxRequest16 { dest, data, .. } = back else {
        panic!("expected a 16-bit transmit request");
    };
    assert_eq!(dest, 0x7B7B); // host half of 10.10.123.123
    assert_eq!(data, segment);
}

#[test]
fn other_frame_variants_cannot_become_ip_packets() {
    let local = Ipv4Addr::new(10, 10, 123, 123);
    let frame = ApiFrame::ModemStatus { status: 0 };
    assert!(matches!(
        rx_packet_to_ip(local, &frame),
        Err(InetError::NotDataPacket(_))
    ));
}

//! Property-based tests for the frame codec.
//!
//! These verify the codec for ALL valid inputs, not just specific examples:
//! round-trip identity for every frame variant, checksum algebra, deframer
//! resynchronization, and datagram envelope closure.

use proptest::prelude::*;
use waggle_proto::{
    ApiFrame, DATAGRAM_FRAME_ID, Deframer, MAX_DATAGRAM_PAYLOAD, MAX_PAYLOAD_LEN, PanSocketAddr,
    ProtocolError, START_DELIMITER, checksum, decode_datagram, encode_datagram,
};

/// Strategy for a data/value region within protocol limits.
fn arbitrary_data() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=100)
}

/// Strategy for two ASCII command letters.
fn arbitrary_command() -> impl Strategy<Value = [u8; 2]> {
    prop::array::uniform2(b'A'..=b'Z')
}

/// Strategy for arbitrary frames of every variant.
fn arbitrary_frame() -> impl Strategy<Value = ApiFrame> {
    prop_oneof![
        (any::<u8>(), any::<u64>(), any::<u8>(), arbitrary_data()).prop_map(
            |(frame_id, dest, options, data)| ApiFrame::TxRequest64 {
                frame_id,
                dest,
                options,
                data
            }
        ),
        (any::<u8>(), any::<u16>(), any::<u8>(), arbitrary_data()).prop_map(
            |(frame_id, dest, options, data)| ApiFrame::TxRequest16 {
                frame_id,
                dest,
                options,
                data
            }
        ),
        (any::<u8>(), arbitrary_command(), arbitrary_data()).prop_map(
            |(frame_id, command, value)| ApiFrame::AtCommand { frame_id, command, value }
        ),
        (any::<u8>(), arbitrary_command(), arbitrary_data()).prop_map(
            |(frame_id, command, value)| ApiFrame::AtCommandQueue { frame_id, command, value }
        ),
        (any::<u8>(), any::<u64>(), any::<u16>(), any::<u8>(), any::<u8>(), arbitrary_data())
            .prop_map(|(frame_id, dest64, dest16, broadcast_radius, options, data)| {
                ApiFrame::TxRequest { frame_id, dest64, dest16, broadcast_radius, options, data }
            }),
        (
            any::<u8>(),
            any::<u64>(),
            any::<u16>(),
            any::<u8>(),
            arbitrary_command(),
            arbitrary_data()
        )
            .prop_map(|(frame_id, dest64, dest16, command_options, command, value)| {
                ApiFrame::RemoteAtCommand {
                    frame_id,
                    dest64,
                    dest16,
                    command_options,
                    command,
                    value,
                }
            }),
        (any::<u64>(), any::<u8>(), any::<u8>(), arbitrary_data()).prop_map(
            |(source, rssi, options, data)| ApiFrame::RxPacket64 { source, rssi, options, data }
        ),
        (any::<u16>(), any::<u8>(), any::<u8>(), arbitrary_data()).prop_map(
            |(source, rssi, options, data)| ApiFrame::RxPacket16 { source, rssi, options, data }
        ),
        (any::<u8>(), arbitrary_command(), any::<u8>(), arbitrary_data()).prop_map(
            |(frame_id, command, status, value)| ApiFrame::AtCommandResponse {
                frame_id,
                command,
                status,
                value
            }
        ),
        (any::<u8>(), any::<u8>())
            .prop_map(|(frame_id, status)| ApiFrame::TxStatus { frame_id, status }),
        any::<u8>().prop_map(|status| ApiFrame::ModemStatus { status }),
        (
            any::<u8>(),
            any::<u64>(),
            any::<u16>(),
            arbitrary_command(),
            any::<u8>(),
            arbitrary_data()
        )
            .prop_map(|(frame_id, source64, source16, command, status, value)| {
                ApiFrame::RemoteAtCommandResponse {
                    frame_id,
                    source64,
                    source16,
                    command,
                    status,
                    value,
                }
            }),
    ]
}

#[test]
fn prop_wire_round_trip_is_identity() {
    proptest!(|(frame in arbitrary_frame())| {
        let mut wire = Vec::new();
        frame.encode_wire(&mut wire).expect("should encode");

        let decoded = ApiFrame::decode_wire(&wire).expect("should decode");
        prop_assert_eq!(decoded, frame);
    });
}

#[test]
fn prop_deframer_accepts_every_encoded_frame() {
    proptest!(|(frame in arbitrary_frame())| {
        let mut wire = Vec::new();
        frame.encode_wire(&mut wire).expect("should encode");

        let declared = usize::from(u16::from_be_bytes([wire[1], wire[2]]));
        let mut deframer = Deframer::new();
        let mut delivered = None;
        for byte in &wire {
            if let Some(payload) = deframer.push(*byte).expect("no deframe error") {
                delivered = Some(payload);
            }
        }

        let payload = delivered.expect("deframer should deliver the frame");
        // The deframer delivers exactly the declared number of payload bytes.
        prop_assert_eq!(payload.len(), declared);
        prop_assert_eq!(ApiFrame::decode_payload(&payload).expect("should decode"), frame);
    });
}

#[test]
fn prop_payload_plus_checksum_sums_to_ff() {
    proptest!(|(payload in prop::collection::vec(any::<u8>(), 0..=MAX_PAYLOAD_LEN))| {
        let check = checksum(&payload);
        let sum = payload
            .iter()
            .fold(check, |acc, byte| acc.wrapping_add(*byte));
        prop_assert_eq!(sum, 0xFF);
    });
}

#[test]
fn prop_leading_garbage_does_not_change_the_result() {
    proptest!(|(
        frame in arbitrary_frame(),
        garbage in prop::collection::vec(any::<u8>().prop_filter("not the delimiter", |b| *b != START_DELIMITER), 0..64),
    )| {
        let mut wire = Vec::new();
        frame.encode_wire(&mut wire).expect("should encode");

        let mut noisy = garbage;
        noisy.extend_from_slice(&wire);

        let mut deframer = Deframer::new();
        let mut delivered = None;
        for byte in &noisy {
            if let Some(payload) = deframer.push(*byte).expect("no deframe error") {
                delivered = Some(payload);
            }
        }

        let payload = delivered.expect("deframer should resynchronize");
        prop_assert_eq!(ApiFrame::decode_payload(&payload).expect("should decode"), frame);
    });
}

#[test]
fn prop_datagram_closure() {
    proptest!(|(
        payload in prop::collection::vec(any::<u8>(), 0..=MAX_DATAGRAM_PAYLOAD),
        from_port in any::<u16>(),
        to_port in any::<u16>(),
        addr in any::<u16>(),
    )| {
        let sent = encode_datagram(&payload, from_port, PanSocketAddr { port: to_port, addr })
            .expect("should encode");

        // What the peer transmits comes back to us as a receive packet with
        // the same data region and the peer's source address.
        let ApiFrame::TxRequest16 { frame_id, data, .. } = sent else {
            panic!("expected a 16-bit transmit request");
        };
        prop_assert_eq!(frame_id, DATAGRAM_FRAME_ID);

        let received = ApiFrame::RxPacket16 { source: addr, rssi: 40, options: 0, data };
        let (decoded, from) = decode_datagram(&received).expect("should decode");
        prop_assert_eq!(decoded, payload.as_slice());
        prop_assert_eq!(from, PanSocketAddr { port: from_port, addr });
    });
}

#[test]
fn prop_oversized_datagram_payloads_are_rejected() {
    proptest!(|(extra in 1usize..=16, from_port in any::<u16>())| {
        let payload = vec![0u8; MAX_DATAGRAM_PAYLOAD + extra];
        let result = encode_datagram(&payload, from_port, PanSocketAddr { port: 7, addr: 1 });
        let is_too_large = matches!(result, Err(ProtocolError::PayloadTooLarge { .. }));
        prop_assert!(is_too_large);
    });
}

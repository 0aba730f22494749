//! Fixed wire vectors for the frame codec.
//!
//! Byte-for-byte checks against known-good frames, plus the strict decoder's
//! error cases.

use waggle_proto::{ApiFrame, Deframer, ProtocolError, tx_status_text};

#[test]
fn tx_request_16_encodes_byte_for_byte() {
    let frame = ApiFrame::TxRequest16 {
        frame_id: 0xCF,
        dest: 0x0A0A,
        options: 0x00,
        data: vec![0x48, 0x69],
    };

    let mut wire = Vec::new();
    frame.encode_wire(&mut wire).unwrap();
    assert_eq!(wire, [0x7E, 0x00, 0x07, 0x01, 0xCF, 0x0A, 0x0A, 0x00, 0x48, 0x69, 0x6A]);
}

#[test]
fn modem_status_decodes_from_a_noisy_stream() {
    let mut deframer = Deframer::new();
    let mut frames = Vec::new();
    for byte in [0xAA, 0x55, 0x7E, 0x00, 0x02, 0x8A, 0x01, 0x74] {
        if let Some(payload) = deframer.push(byte).unwrap() {
            frames.push(ApiFrame::decode_payload(&payload).unwrap());
        }
    }
    assert_eq!(frames, [ApiFrame::ModemStatus { status: 0x01 }]);
    assert!(!deframer.in_frame());
}

#[test]
fn strict_decode_accepts_a_clean_frame() {
    let frame = ApiFrame::decode_wire(&[0x7E, 0x00, 0x02, 0x8A, 0x01, 0x74]).unwrap();
    assert_eq!(frame, ApiFrame::ModemStatus { status: 0x01 });
}

#[test]
fn strict_decode_rejects_a_bad_checksum() {
    let err = ApiFrame::decode_wire(&[0x7E, 0x00, 0x02, 0x8A, 0x01, 0x00]).unwrap_err();
    assert_eq!(err, ProtocolError::ChecksumMismatch { computed: 0x74, received: 0x00 });
}

#[test]
fn strict_decode_rejects_an_oversized_length() {
    // Declared length 2000.
    let err = ApiFrame::decode_wire(&[0x7E, 0x07, 0xD0, 0x00]).unwrap_err();
    assert!(matches!(err, ProtocolError::PayloadTooLarge { size: 2000, .. }));
}

#[test]
fn strict_decode_rejects_a_missing_delimiter() {
    let err = ApiFrame::decode_wire(&[0x42, 0x00, 0x02, 0x8A, 0x01, 0x74]).unwrap_err();
    assert_eq!(err, ProtocolError::BadStartDelimiter(0x42));
}

#[test]
fn strict_decode_rejects_a_truncated_frame() {
    // Header claims 2 payload bytes, only one present and no checksum.
    let err = ApiFrame::decode_wire(&[0x7E, 0x00, 0x02, 0x8A]).unwrap_err();
    assert_eq!(err, ProtocolError::FrameTruncated { expected: 6, actual: 4 });
}

#[test]
fn at_command_response_round_trips_with_value() {
    let frame = ApiFrame::AtCommandResponse {
        frame_id: 0xCF,
        command: *b"MY",
        status: 0,
        value: vec![0x0A, 0x0A],
    };
    let mut wire = Vec::new();
    frame.encode_wire(&mut wire).unwrap();
    assert_eq!(ApiFrame::decode_wire(&wire).unwrap(), frame);
}

#[test]
fn tx_status_table_covers_the_common_codes() {
    assert_eq!(tx_status_text(0x00), "success");
    assert_eq!(tx_status_text(0x01), "MAC ACK failure");
    assert_eq!(tx_status_text(0x74), "payload too large");
    assert_eq!(tx_status_text(0xEE), "unknown transmit status");
}

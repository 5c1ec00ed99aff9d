//! Integration tests for the dotmatrix-core wire format.
//!
//! These tests drive the public API end to end: a `FrameStore` supplies the
//! pixel data, a `Message` is built from it, and the encoded bytes are checked
//! by decoding them the way the display firmware does.

use dotmatrix_core::protocol::messages::{
    AnimationFrame, AnimationFramesMessage, CellularAutomatonMessage, PACKET_HEADER_SIZE,
};
use dotmatrix_core::protocol::{decode_frame_header, decode_packet, frame_packet, PacketHeader};
use dotmatrix_core::{
    checksum16, encode_packet, transmission_header, DisplayCommand, FrameSource, FrameStore,
    Message,
};

/// Builds an animation-frames message covering every frame in `store`.
fn animation_from(store: &FrameStore) -> Message {
    let (rows, columns) = store.grid_dimensions();
    Message::AnimationFrames(AnimationFramesMessage {
        frames: (0..store.frame_count())
            .map(|i| AnimationFrame {
                duration_ms: store.frame_duration_ms(i),
                bytes: store.frame_bytes(i),
            })
            .collect(),
        repeat_count: store.repeat_count(),
        rows,
        columns,
    })
}

// ── Packet framing ────────────────────────────────────────────────────────────

#[test]
fn test_packet_header_describes_any_payload() {
    let payloads: Vec<Vec<u8>> = vec![
        vec![],
        vec![0x00],
        vec![0xFF; 3],
        (0..=255).collect(),
        vec![0xA5; 4096],
    ];

    for payload in payloads {
        // Act
        let packet = frame_packet(&payload);

        // Assert
        let header = PacketHeader::parse(&packet).unwrap();
        assert_eq!(usize::from(header.payload_len), payload.len());
        assert_eq!(header.crc, checksum16(&payload));
        assert_eq!(packet.len(), PACKET_HEADER_SIZE + payload.len());
    }
}

// ── Animation frames ──────────────────────────────────────────────────────────

#[test]
fn test_animation_packet_count_and_indices_match_frames() {
    // Arrange: 7 frames, each with a distinct pixel lit
    let mut store = FrameStore::new(8, 8).unwrap();
    for i in 1..7 {
        store.add_frame(None).unwrap();
        store.set_pixel(i, i, i, true).unwrap();
    }
    let msg = animation_from(&store);

    // Act
    let header = transmission_header(&msg);

    // Assert
    assert_eq!(header, [0x10, 0x07, 0x00]);
    for i in 0..7 {
        let packet = encode_packet(&msg, i).unwrap();
        let (_, body, _) = decode_packet(&packet).unwrap();
        let frame = decode_frame_header(body).unwrap();
        assert_eq!(usize::from(frame.index), i);
        assert_eq!(&body[9..], store.frame_bytes(i).as_slice());
    }
    assert!(encode_packet(&msg, 7).is_none());
}

#[test]
fn test_blank_four_by_four_frame_encodes_expected_body() {
    // Arrange
    let mut store = FrameStore::new(4, 4).unwrap();
    store.set_frame_duration(0, 100).unwrap();
    let msg = animation_from(&store);

    // Act
    let header = transmission_header(&msg);
    let packet = encode_packet(&msg, 0).unwrap();

    // Assert – one byte per 4-pixel row, four rows
    assert_eq!(header, [0x10, 0x01, 0x00]);
    assert_eq!(
        &packet[PACKET_HEADER_SIZE..],
        &[
            0x00, 0x00, // index
            0x04, 0x00, // frame byte count
            0x04, 0x04, // rows, columns
            0x64, 0x00, // 100 ms
            0x00, // repeat count
            0x00, 0x00, 0x00, 0x00, // pixels
        ]
    );
}

// ── Cellular automaton ────────────────────────────────────────────────────────

#[test]
fn test_cellular_automaton_body_keeps_row_major_cell_order() {
    // Arrange
    let mut store = FrameStore::new(4, 4).unwrap();
    store.set_pixel(0, 3, 1, true).unwrap();
    store.set_pixel(0, 0, 3, true).unwrap();
    store.set_pixel(0, 0, 1, true).unwrap();
    store.set_frame_duration(0, 500).unwrap();
    let msg = Message::CellularAutomatonConfig(CellularAutomatonMessage {
        tick_interval_ms: store.frame_duration_ms(0),
        live_cells: store.live_cells(0),
    });

    // Act
    let packet = encode_packet(&msg, 0).unwrap();

    // Assert – (column, row) pairs, row 0 first
    let (_, body, _) = decode_packet(&packet).unwrap();
    assert_eq!(transmission_header(&msg), [0x11, 0x01, 0x00]);
    assert_eq!(body, &[0xF4, 0x01, 1, 0, 3, 0, 1, 3]);
}

// ── Commands ──────────────────────────────────────────────────────────────────

#[test]
fn test_command_messages_are_single_byte_packets() {
    let commands = [
        (DisplayCommand::SetClockMode, 0x01),
        (DisplayCommand::SecondAnimationActive, 0x02),
        (DisplayCommand::SecondAnimationInactive, 0x03),
        (DisplayCommand::ScrollDate, 0x04),
    ];

    for (command, code) in commands {
        let msg = Message::Command(command);
        let packet = encode_packet(&msg, 0).unwrap();
        assert_eq!(transmission_header(&msg), [0x12, 0x01, 0x00]);
        assert_eq!(&packet[PACKET_HEADER_SIZE..], &[code]);
    }
}

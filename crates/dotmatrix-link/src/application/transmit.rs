//! Builds the message for a transmit request from the current frame data.
//!
//! A [`Message`] is a snapshot: it is assembled from the frame source at the
//! moment the user asks to transmit, so edits made while a long animation is
//! on the wire do not leak into it.

use dotmatrix_core::protocol::messages::{
    AnimationFrame, AnimationFramesMessage, CellularAutomatonMessage, FRAME_HEADER_SIZE,
    MAX_PACKET_COUNT, MAX_PAYLOAD_LEN,
};
use dotmatrix_core::{DisplayCommand, FrameError, FrameSource, Message};

/// What the user asked to send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransmitRequest {
    /// The whole animation, or only `current_frame` when `only_current` is set.
    AnimationFrames {
        only_current: bool,
        current_frame: usize,
    },
    /// Seeds the display's automaton from the live cells of `frame`; that
    /// frame's duration becomes the tick interval.
    CellularAutomaton { frame: usize },
    Command(DisplayCommand),
}

/// Builds the message for `request` from `source`.
///
/// # Errors
///
/// Returns [`FrameError::FrameOutOfRange`] if the request names a frame the
/// source does not have, [`FrameError::TooManyFrames`] if the animation has
/// more frames than a transmission can announce, and
/// [`FrameError::PayloadTooLarge`] if a packet body would overflow its 16-bit
/// length field.
pub fn build_message<S>(source: &S, request: &TransmitRequest) -> Result<Message, FrameError>
where
    S: FrameSource + ?Sized,
{
    match *request {
        TransmitRequest::AnimationFrames {
            only_current,
            current_frame,
        } => {
            check_frame(source, current_frame)?;
            let frames = if only_current {
                current_frame..current_frame + 1
            } else {
                0..source.frame_count()
            };
            if frames.len() > MAX_PACKET_COUNT {
                return Err(FrameError::TooManyFrames {
                    count: frames.len(),
                    max: MAX_PACKET_COUNT,
                });
            }

            let (rows, columns) = source.grid_dimensions();
            let frames = frames
                .map(|i| -> Result<AnimationFrame, FrameError> {
                    let bytes = source.frame_bytes(i);
                    check_payload_len(FRAME_HEADER_SIZE + bytes.len())?;
                    Ok(AnimationFrame {
                        duration_ms: source.frame_duration_ms(i),
                        bytes,
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Message::AnimationFrames(AnimationFramesMessage {
                frames,
                repeat_count: source.repeat_count(),
                rows,
                columns,
            }))
        }
        TransmitRequest::CellularAutomaton { frame } => {
            check_frame(source, frame)?;
            let live_cells = source.live_cells(frame);
            check_payload_len(2 + 2 * live_cells.len())?;
            Ok(Message::CellularAutomatonConfig(CellularAutomatonMessage {
                tick_interval_ms: source.frame_duration_ms(frame),
                live_cells,
            }))
        }
        TransmitRequest::Command(command) => Ok(Message::Command(command)),
    }
}

fn check_frame<S>(source: &S, index: usize) -> Result<(), FrameError>
where
    S: FrameSource + ?Sized,
{
    let count = source.frame_count();
    if index >= count {
        return Err(FrameError::FrameOutOfRange { index, count });
    }
    Ok(())
}

fn check_payload_len(len: usize) -> Result<(), FrameError> {
    if len > MAX_PAYLOAD_LEN {
        return Err(FrameError::PayloadTooLarge {
            len,
            max: MAX_PAYLOAD_LEN,
        });
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::mock;
    use mockall::predicate::eq;

    mock! {
        pub Source {}

        impl FrameSource for Source {
            fn frame_count(&self) -> usize;
            fn grid_dimensions(&self) -> (u8, u8);
            fn repeat_count(&self) -> u8;
            fn frame_bytes(&self, index: usize) -> Vec<u8>;
            fn frame_duration_ms(&self, index: usize) -> u16;
            fn live_cells(&self, index: usize) -> Vec<(u8, u8)>;
        }
    }

    fn three_frame_source() -> MockSource {
        let mut source = MockSource::new();
        source.expect_frame_count().return_const(3usize);
        source.expect_grid_dimensions().return_const((8u8, 16u8));
        source.expect_repeat_count().return_const(2u8);
        source
            .expect_frame_bytes()
            .returning(|i| vec![i as u8; 16]);
        source
            .expect_frame_duration_ms()
            .returning(|i| 100 * (i as u16 + 1));
        source
    }

    #[test]
    fn test_build_message_full_animation_reads_every_frame() {
        // Arrange
        let source = three_frame_source();
        let request = TransmitRequest::AnimationFrames {
            only_current: false,
            current_frame: 1,
        };

        // Act
        let msg = build_message(&source, &request).unwrap();

        // Assert
        let Message::AnimationFrames(m) = msg else {
            panic!("expected animation frames");
        };
        assert_eq!(m.frames.len(), 3);
        assert_eq!((m.rows, m.columns, m.repeat_count), (8, 16, 2));
        assert_eq!(m.frames[2].duration_ms, 300);
        assert_eq!(m.frames[2].bytes, vec![2u8; 16]);
    }

    #[test]
    fn test_build_message_only_current_reads_one_frame() {
        // Arrange
        let mut source = MockSource::new();
        source.expect_frame_count().return_const(5usize);
        source.expect_grid_dimensions().return_const((4u8, 4u8));
        source.expect_repeat_count().return_const(0u8);
        source
            .expect_frame_bytes()
            .with(eq(3))
            .times(1)
            .returning(|_| vec![0xF0, 0x00, 0x00, 0x0F]);
        source
            .expect_frame_duration_ms()
            .with(eq(3))
            .times(1)
            .return_const(40u16);

        // Act
        let msg = build_message(
            &source,
            &TransmitRequest::AnimationFrames {
                only_current: true,
                current_frame: 3,
            },
        )
        .unwrap();

        // Assert
        assert_eq!(msg.packet_count(), 1);
        let Message::AnimationFrames(m) = msg else {
            panic!("expected animation frames");
        };
        assert_eq!(m.frames[0].duration_ms, 40);
        assert_eq!(m.frames[0].bytes, vec![0xF0, 0x00, 0x00, 0x0F]);
    }

    #[test]
    fn test_build_message_cellular_automaton_uses_frame_duration_as_tick() {
        // Arrange
        let mut source = MockSource::new();
        source.expect_frame_count().return_const(2usize);
        source
            .expect_frame_duration_ms()
            .with(eq(1))
            .return_const(250u16);
        source
            .expect_live_cells()
            .with(eq(1))
            .returning(|_| vec![(3, 0), (0, 1), (2, 1)]);

        // Act
        let msg = build_message(&source, &TransmitRequest::CellularAutomaton { frame: 1 }).unwrap();

        // Assert
        assert_eq!(
            msg,
            Message::CellularAutomatonConfig(CellularAutomatonMessage {
                tick_interval_ms: 250,
                live_cells: vec![(3, 0), (0, 1), (2, 1)],
            })
        );
    }

    #[test]
    fn test_build_message_command_ignores_frame_source() {
        // A mock with no expectations panics if any method is called.
        let source = MockSource::new();
        let msg = build_message(&source, &TransmitRequest::Command(DisplayCommand::ScrollDate));
        assert_eq!(msg, Ok(Message::Command(DisplayCommand::ScrollDate)));
    }

    #[test]
    fn test_build_message_rejects_out_of_range_frame() {
        let mut source = MockSource::new();
        source.expect_frame_count().return_const(2usize);
        let result = build_message(&source, &TransmitRequest::CellularAutomaton { frame: 2 });
        assert_eq!(result, Err(FrameError::FrameOutOfRange { index: 2, count: 2 }));
    }

    #[test]
    fn test_build_message_rejects_fully_lit_largest_grid_as_automaton() {
        // Arrange: every cell of a 255x255 grid is live
        let mut store = dotmatrix_core::FrameStore::new(255, 255).unwrap();
        for row in 0..255 {
            for column in 0..255 {
                store.set_pixel(0, row, column, true).unwrap();
            }
        }

        // Act
        let result = build_message(&store, &TransmitRequest::CellularAutomaton { frame: 0 });

        // Assert
        assert_eq!(
            result,
            Err(FrameError::PayloadTooLarge {
                len: 130_052,
                max: 65_535
            })
        );
    }

    #[test]
    fn test_build_message_largest_grid_animation_still_fits() {
        let mut store = dotmatrix_core::FrameStore::new(255, 255).unwrap();
        store.set_pixel(0, 254, 254, true).unwrap();
        let msg = build_message(
            &store,
            &TransmitRequest::AnimationFrames {
                only_current: true,
                current_frame: 0,
            },
        )
        .unwrap();
        assert_eq!(dotmatrix_core::check_encodable(&msg), Ok(()));
    }

    #[test]
    fn test_build_message_rejects_too_many_frames() {
        // The frame count is checked before any frame is read.
        let mut source = MockSource::new();
        source.expect_frame_count().return_const(70_000usize);
        let result = build_message(
            &source,
            &TransmitRequest::AnimationFrames {
                only_current: false,
                current_frame: 0,
            },
        );
        assert_eq!(
            result,
            Err(FrameError::TooManyFrames {
                count: 70_000,
                max: 65_535
            })
        );
    }

    #[test]
    fn test_build_message_accepts_frame_store() {
        // Arrange
        let mut store = dotmatrix_core::FrameStore::new(2, 3).unwrap();
        store.set_pixel(0, 1, 2, true).unwrap();

        // Act
        let msg = build_message(&store, &TransmitRequest::CellularAutomaton { frame: 0 }).unwrap();

        // Assert
        assert_eq!(
            msg,
            Message::CellularAutomatonConfig(CellularAutomatonMessage {
                tick_interval_ms: 0,
                live_cells: vec![(2, 1)],
            })
        );
    }
}

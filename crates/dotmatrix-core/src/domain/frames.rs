//! Frame-source contract and the in-memory frame store.
//!
//! The codec never owns pixel data.  It asks a [`FrameSource`] for each
//! frame's packed bitmap, duration, and live-cell list at the moment a
//! message is built.
//!
//! # Bitmap packing
//!
//! Frames are packed row-major.  Each row starts on a fresh byte and is padded
//! with zero bits up to a whole number of bytes; within a byte the leftmost
//! pixel is the most significant bit:
//!
//! ```text
//! columns = 10, row = ■□■□□□□□ □■
//! bytes   = 0b1010_0000, 0b0100_0000
//! ```

use thiserror::Error;

/// Largest row or column count; grid dimensions travel as one byte each.
pub const MAX_GRID_DIMENSION: usize = 255;

/// Errors raised by [`FrameStore`] operations and by building a message from frames.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("grid dimensions {rows}x{columns} out of range (1..={MAX_GRID_DIMENSION} each)")]
    InvalidDimensions { rows: usize, columns: usize },

    #[error("frame {index} out of range ({count} frame(s))")]
    FrameOutOfRange { index: usize, count: usize },

    #[error("pixel ({row}, {column}) outside a {rows}x{columns} grid")]
    PixelOutOfRange {
        row: usize,
        column: usize,
        rows: u8,
        columns: u8,
    },

    #[error("packet body of {len} bytes exceeds the {max}-byte limit")]
    PayloadTooLarge { len: usize, max: usize },

    #[error("{count} frames exceed the {max}-frame transmission limit")]
    TooManyFrames { count: usize, max: usize },
}

/// Supplies per-frame data on demand.
///
/// Frame indices are 0-based.  Implementations may return empty data for an
/// index at or above [`FrameSource::frame_count`]; callers check the range
/// first.
pub trait FrameSource {
    /// Number of frames in the animation (at least one).
    fn frame_count(&self) -> usize;

    /// Grid size as `(rows, columns)`.
    fn grid_dimensions(&self) -> (u8, u8);

    /// How many times the display replays the animation.
    fn repeat_count(&self) -> u8;

    /// Packed bitmap of frame `index` (see the module docs for the layout).
    fn frame_bytes(&self, index: usize) -> Vec<u8>;

    /// Display time of frame `index` in milliseconds.
    fn frame_duration_ms(&self, index: usize) -> u16;

    /// Live cells of frame `index` as `(column, row)` pairs, row-major.
    fn live_cells(&self, index: usize) -> Vec<(u8, u8)>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Frame {
    duration_ms: u16,
    pixels: Vec<bool>,
}

impl Frame {
    fn blank(cell_count: usize) -> Self {
        Self {
            duration_ms: 0,
            pixels: vec![false; cell_count],
        }
    }
}

/// An animation held in memory: one or more equally sized pixel grids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameStore {
    rows: u8,
    columns: u8,
    repeat_count: u8,
    frames: Vec<Frame>,
}

impl FrameStore {
    /// Creates a store holding a single blank frame.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::InvalidDimensions`] if either dimension is zero
    /// or above [`MAX_GRID_DIMENSION`].
    pub fn new(rows: usize, columns: usize) -> Result<Self, FrameError> {
        let valid = 1..=MAX_GRID_DIMENSION;
        if !valid.contains(&rows) || !valid.contains(&columns) {
            return Err(FrameError::InvalidDimensions { rows, columns });
        }
        Ok(Self {
            rows: rows as u8,
            columns: columns as u8,
            repeat_count: 0,
            frames: vec![Frame::blank(rows * columns)],
        })
    }

    pub fn rows(&self) -> u8 {
        self.rows
    }

    pub fn columns(&self) -> u8 {
        self.columns
    }

    pub fn set_repeat_count(&mut self, repeat_count: u8) {
        self.repeat_count = repeat_count;
    }

    /// Appends a frame and returns its index.
    ///
    /// With `duplicate_of = Some(i)` the new frame copies frame `i`'s pixels
    /// and duration; otherwise it is blank with a zero duration.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::FrameOutOfRange`] if `duplicate_of` is invalid.
    pub fn add_frame(&mut self, duplicate_of: Option<usize>) -> Result<usize, FrameError> {
        let frame = match duplicate_of {
            Some(index) => self.frame(index)?.clone(),
            None => Frame::blank(self.cell_count()),
        };
        self.frames.push(frame);
        Ok(self.frames.len() - 1)
    }

    /// Removes frame `index`.  The last remaining frame is never removed;
    /// returns whether a frame was deleted.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::FrameOutOfRange`] for an invalid index.
    pub fn delete_frame(&mut self, index: usize) -> Result<bool, FrameError> {
        self.frame(index)?;
        if self.frames.len() == 1 {
            return Ok(false);
        }
        self.frames.remove(index);
        Ok(true)
    }

    /// Turns every pixel of frame `index` off.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::FrameOutOfRange`] for an invalid index.
    pub fn clear_frame(&mut self, index: usize) -> Result<(), FrameError> {
        self.frame_mut(index)?.pixels.fill(false);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`FrameError::FrameOutOfRange`] for an invalid index.
    pub fn set_frame_duration(&mut self, index: usize, duration_ms: u16) -> Result<(), FrameError> {
        self.frame_mut(index)?.duration_ms = duration_ms;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`FrameError`] if the frame or pixel is out of range.
    pub fn set_pixel(
        &mut self,
        index: usize,
        row: usize,
        column: usize,
        on: bool,
    ) -> Result<(), FrameError> {
        let cell = self.cell_index(row, column)?;
        self.frame_mut(index)?.pixels[cell] = on;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`FrameError`] if the frame or pixel is out of range.
    pub fn pixel(&self, index: usize, row: usize, column: usize) -> Result<bool, FrameError> {
        let cell = self.cell_index(row, column)?;
        Ok(self.frame(index)?.pixels[cell])
    }

    /// Bytes per packed row: `ceil(columns / 8)`.
    pub fn bytes_per_row(&self) -> usize {
        usize::from(self.columns).div_ceil(8)
    }

    fn cell_count(&self) -> usize {
        usize::from(self.rows) * usize::from(self.columns)
    }

    fn cell_index(&self, row: usize, column: usize) -> Result<usize, FrameError> {
        if row >= usize::from(self.rows) || column >= usize::from(self.columns) {
            return Err(FrameError::PixelOutOfRange {
                row,
                column,
                rows: self.rows,
                columns: self.columns,
            });
        }
        Ok(row * usize::from(self.columns) + column)
    }

    fn frame(&self, index: usize) -> Result<&Frame, FrameError> {
        let count = self.frames.len();
        self.frames
            .get(index)
            .ok_or(FrameError::FrameOutOfRange { index, count })
    }

    fn frame_mut(&mut self, index: usize) -> Result<&mut Frame, FrameError> {
        let count = self.frames.len();
        self.frames
            .get_mut(index)
            .ok_or(FrameError::FrameOutOfRange { index, count })
    }
}

impl FrameSource for FrameStore {
    fn frame_count(&self) -> usize {
        self.frames.len()
    }

    fn grid_dimensions(&self) -> (u8, u8) {
        (self.rows, self.columns)
    }

    fn repeat_count(&self) -> u8 {
        self.repeat_count
    }

    fn frame_bytes(&self, index: usize) -> Vec<u8> {
        let Some(frame) = self.frames.get(index) else {
            return Vec::new();
        };
        let columns = usize::from(self.columns);
        let mut out = Vec::with_capacity(self.bytes_per_row() * usize::from(self.rows));
        for row in frame.pixels.chunks(columns) {
            for chunk in row.chunks(8) {
                let byte = chunk
                    .iter()
                    .enumerate()
                    .filter(|&(_, &on)| on)
                    .fold(0u8, |acc, (bit, _)| acc | (0x80 >> bit));
                out.push(byte);
            }
        }
        out
    }

    fn frame_duration_ms(&self, index: usize) -> u16 {
        self.frames.get(index).map_or(0, |f| f.duration_ms)
    }

    fn live_cells(&self, index: usize) -> Vec<(u8, u8)> {
        let Some(frame) = self.frames.get(index) else {
            return Vec::new();
        };
        let columns = usize::from(self.columns);
        frame
            .pixels
            .iter()
            .enumerate()
            .filter(|&(_, &on)| on)
            .map(|(cell, _)| ((cell % columns) as u8, (cell / columns) as u8))
            .collect()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

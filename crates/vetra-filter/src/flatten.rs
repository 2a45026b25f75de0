//! Persisted filter records.
//!
//! A filter graph serializes as, per node: `input_count: i32`, then
//! for each input a presence `bool` followed (when present) by the
//! child's embedded record, then the crop rect as four `f32`s and its
//! edge flags as a `u32`. Streams older than
//! [`VERSION_NO_LEGACY_UNIQUE_ID`] carry a trailing `u32` (a
//! since-removed per-node id) that is read and discarded.
//!
//! Validation is bail-early: any structural problem yields a typed
//! [`DeserializeError`], and callers are expected to fall back to a
//! zero-input node rather than propagate.

use std::sync::Arc;

use kurbo::Rect;

use vetra_core::error::DeserializeError;

use crate::crop::{CropEdges, CropRect};
use crate::node::ImageFilter;

/// Stream version at which the trailing per-node unique id was removed.
pub const VERSION_NO_LEGACY_UNIQUE_ID: u32 = 2;

/// Version written by current code.
pub const CURRENT_VERSION: u32 = 2;

/// Little-endian append-only byte sink.
#[derive(Debug, Default)]
pub struct WriteBuffer {
    data: Vec<u8>,
}

impl WriteBuffer {
    pub fn new() -> Self {
        WriteBuffer { data: Vec::new() }
    }

    pub fn write_i32(&mut self, v: i32) {
        self.data.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.data.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_f32(&mut self, v: f32) {
        self.data.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_bool(&mut self, v: bool) {
        self.data.push(v as u8);
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

/// Little-endian cursor with underrun tracking.
///
/// Reads past the end return zero values and latch the buffer invalid;
/// callers check [`ReadBuffer::is_valid`] at their convenience.
pub struct ReadBuffer<'a> {
    data: &'a [u8],
    pos: usize,
    valid: bool,
    version: u32,
}

impl<'a> ReadBuffer<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_version(data, CURRENT_VERSION)
    }

    pub fn with_version(data: &'a [u8], version: u32) -> Self {
        ReadBuffer { data, pos: 0, valid: true, version }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn is_version_lt(&self, version: u32) -> bool {
        self.version < version
    }

    fn take<const N: usize>(&mut self) -> [u8; N] {
        match self.data.get(self.pos..self.pos + N) {
            Some(bytes) => {
                self.pos += N;
                bytes.try_into().expect("slice length checked")
            }
            None => {
                self.valid = false;
                [0; N]
            }
        }
    }

    pub fn read_i32(&mut self) -> i32 {
        i32::from_le_bytes(self.take())
    }

    pub fn read_u32(&mut self) -> u32 {
        u32::from_le_bytes(self.take())
    }

    pub fn read_f32(&mut self) -> f32 {
        f32::from_le_bytes(self.take())
    }

    pub fn read_bool(&mut self) -> bool {
        self.take::<1>()[0] != 0
    }
}

/// The deserialized common state of one filter node.
pub struct CommonRecord {
    pub inputs: Vec<Option<Arc<dyn ImageFilter>>>,
    pub crop_rect: CropRect,
}

impl CommonRecord {
    /// Read one node record. `expected_count < 0` accepts any input
    /// count; otherwise the stream's count must match. `read_child`
    /// materializes each embedded child record.
    pub fn unflatten(
        buffer: &mut ReadBuffer<'_>,
        expected_count: i32,
        read_child: &mut dyn FnMut(&mut ReadBuffer<'_>) -> Option<Arc<dyn ImageFilter>>,
    ) -> Result<CommonRecord, DeserializeError> {
        let count = buffer.read_i32();
        if !buffer.is_valid() {
            return Err(DeserializeError::BufferUnderrun);
        }
        if count < 0 {
            return Err(DeserializeError::NegativeCount);
        }
        if expected_count >= 0 && count != expected_count {
            return Err(DeserializeError::CountMismatch {
                expected: expected_count,
                actual: count,
            });
        }

        let mut inputs = Vec::with_capacity(count as usize);
        for _ in 0..count {
            if buffer.read_bool() {
                if !buffer.is_valid() {
                    return Err(DeserializeError::BufferUnderrun);
                }
                match read_child(buffer) {
                    Some(child) => inputs.push(Some(child)),
                    None => return Err(DeserializeError::InvalidChild),
                }
            } else {
                inputs.push(None);
            }
            if !buffer.is_valid() {
                return Err(DeserializeError::BufferUnderrun);
            }
        }

        let rect = Rect::new(
            buffer.read_f32() as f64,
            buffer.read_f32() as f64,
            buffer.read_f32() as f64,
            buffer.read_f32() as f64,
        );
        if !buffer.is_valid() {
            return Err(DeserializeError::BufferUnderrun);
        }
        if !(rect.x0.is_finite() && rect.y0.is_finite() && rect.x1.is_finite() && rect.y1.is_finite())
        {
            return Err(DeserializeError::NonFiniteRect);
        }

        let flags = buffer.read_u32();
        if buffer.is_version_lt(VERSION_NO_LEGACY_UNIQUE_ID) {
            let _legacy_unique_id = buffer.read_u32();
        }
        if !buffer.is_valid() {
            return Err(DeserializeError::BufferUnderrun);
        }

        Ok(CommonRecord {
            inputs,
            crop_rect: CropRect::new(rect, CropEdges::from_bits_truncate(flags)),
        })
    }

    /// Write one node record; `write_child` embeds each present input.
    pub fn flatten(
        inputs: &[Option<Arc<dyn ImageFilter>>],
        crop_rect: &CropRect,
        buffer: &mut WriteBuffer,
        write_child: &mut dyn FnMut(&Arc<dyn ImageFilter>, &mut WriteBuffer),
    ) {
        buffer.write_i32(inputs.len() as i32);
        for input in inputs {
            buffer.write_bool(input.is_some());
            if let Some(child) = input {
                write_child(child, buffer);
            }
        }
        let rect = crop_rect.rect();
        buffer.write_f32(rect.x0 as f32);
        buffer.write_f32(rect.y0 as f32);
        buffer.write_f32(rect.x1 as f32);
        buffer.write_f32(rect.y1 as f32);
        buffer.write_u32(crop_rect.edges().bits());
    }
}

//! Bounds-checked little-endian reads from a firmware image

use crate::errors::{PowerError, PowerResult};

/// Fixed-width reads at an absolute byte offset.
///
/// Every read fails with [`PowerError::OutOfBounds`] when
/// `offset + width > len()`; nothing is ever read past the end.
pub trait ImageAccessor {
    /// Total image length in bytes
    fn len(&self) -> usize;

    /// Borrow `width` bytes starting at `offset`
    fn bytes(&self, offset: usize, width: usize) -> PowerResult<&[u8]>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read_u8(&self, offset: usize) -> PowerResult<u8> {
        Ok(self.bytes(offset, 1)?[0])
    }

    fn read_u16(&self, offset: usize) -> PowerResult<u16> {
        let b = self.bytes(offset, 2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn read_u32(&self, offset: usize) -> PowerResult<u32> {
        let b = self.bytes(offset, 4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }
}

/// Read-only view over an in-memory (or memory-mapped) image.
#[derive(Debug, Clone, Copy)]
pub struct Image<'a> {
    data: &'a [u8],
}

impl<'a> Image<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }
}

impl ImageAccessor for Image<'_> {
    fn len(&self) -> usize {
        self.data.len()
    }

    fn bytes(&self, offset: usize, width: usize) -> PowerResult<&[u8]> {
        let out_of_bounds = PowerError::OutOfBounds {
            offset,
            width,
            len: self.data.len(),
        };
        let end = offset.checked_add(width).ok_or(out_of_bounds.clone())?;
        self.data.get(offset..end).ok_or(out_of_bounds)
    }
}

//! Versioned sub-table decoders and the record helpers they share

pub mod boost;
pub mod cstep;

use crate::errors::{PowerError, PowerResult};
use crate::image::ImageAccessor;

pub use boost::{decode_boost, BoostEntry, BoostSubentry, BoostTable, BoostTableV11};
pub use cstep::{decode_cstep, CstepEntry1, CstepEntry2, CstepTable, CstepTableV10};

/// Power-state index packed into bits 5..=8 of a record's first word.
pub const PSTATE_MASK: u16 = 0x01e0;
pub const PSTATE_SHIFT: u16 = 5;

pub fn pstate_from(field: u16) -> u8 {
    ((field & PSTATE_MASK) >> PSTATE_SHIFT) as u8
}

/// Knobs that change how record arrays are decoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Refuse to allocate records whose bytes do not fit inside the image.
    pub strict_bounds: bool,
}

/// Outcome of decoding one sub-table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableState<T> {
    /// Not referenced by the directory; the decoder never ran
    Absent,
    Decoded(T),
    /// The decoder ran and gave up
    Rejected(PowerError),
}

impl<T> Default for TableState<T> {
    fn default() -> Self {
        TableState::Absent
    }
}

impl<T> TableState<T> {
    pub fn from_result(result: PowerResult<T>) -> Self {
        match result {
            Ok(table) => TableState::Decoded(table),
            Err(e) => TableState::Rejected(e),
        }
    }

    pub fn decoded(&self) -> Option<&T> {
        match self {
            TableState::Decoded(t) => Some(t),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&PowerError> {
        match self {
            TableState::Rejected(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, TableState::Absent)
    }
}

/// Reads one-byte header fields in order, remembering whether any failed.
pub(crate) struct HeaderReader<'a, I: ImageAccessor + ?Sized> {
    image: &'a I,
    base: usize,
    pub failed: bool,
}

impl<'a, I: ImageAccessor + ?Sized> HeaderReader<'a, I> {
    pub fn new(image: &'a I, base: usize) -> Self {
        Self {
            image,
            base,
            failed: false,
        }
    }

    /// Field at `base + at`; 0 when unreadable.
    pub fn u8(&mut self, at: usize) -> u8 {
        match self.image.read_u8(self.base + at) {
            Ok(v) => v,
            Err(_) => {
                self.failed = true;
                0
            }
        }
    }
}

/// Record field reads. Fields past the end of the image decode as zero.
pub(crate) fn field_u8<I: ImageAccessor + ?Sized>(image: &I, offset: usize) -> u8 {
    image.read_u8(offset).unwrap_or(0)
}

pub(crate) fn field_u16<I: ImageAccessor + ?Sized>(image: &I, offset: usize) -> u16 {
    image.read_u16(offset).unwrap_or(0)
}

/// Make sure `needed` bytes starting at `offset` lie inside the image.
pub(crate) fn check_footprint<I: ImageAccessor + ?Sized>(
    image: &I,
    offset: usize,
    needed: usize,
) -> PowerResult<()> {
    let available = image.len().saturating_sub(offset);
    if needed > available {
        return Err(PowerError::TruncatedTable {
            offset,
            needed,
            length: available,
        });
    }
    Ok(())
}

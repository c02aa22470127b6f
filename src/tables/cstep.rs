//! CSTEP sub-table: a p-state index array followed by a clock-step array

use super::{check_footprint, field_u16, field_u8, pstate_from, DecodeOptions, HeaderReader};
use crate::errors::{PowerError, PowerResult};
use crate::image::ImageAccessor;

pub const CSTEP_VERSION_10: u8 = 0x10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CstepTable {
    V10(CstepTableV10),
}

impl CstepTable {
    pub fn version(&self) -> u8 {
        match self {
            CstepTable::V10(_) => CSTEP_VERSION_10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CstepTableV10 {
    pub offset: usize,
    pub valid: bool,
    pub hlen: u8,
    pub rlen: u8,
    pub entriesnum: u8,
    pub ssz: u8,
    pub snr: u8,
    pub entries1: Vec<CstepEntry1>,
    pub entries2: Vec<CstepEntry2>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CstepEntry1 {
    pub offset: usize,
    pub pstate: u8,
    /// Index into the second array
    pub index: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CstepEntry2 {
    pub offset: usize,
    /// MHz
    pub freq: u16,
    pub unknown: [u8; 2],
    pub voltage: u8,
    /// `freq > 0`. Invalid records are kept; consumers filter on this.
    pub valid: bool,
}

impl CstepTableV10 {
    pub fn entry1_offset(&self, i: usize) -> usize {
        self.offset + self.hlen as usize + i * self.rlen as usize
    }

    /// The second array starts right after the last first-array record.
    pub fn entry2_offset(&self, i: usize) -> usize {
        self.entry1_offset(self.entriesnum as usize) + i * self.ssz as usize
    }

    pub fn valid_entries2(&self) -> impl Iterator<Item = (usize, &CstepEntry2)> {
        self.entries2.iter().enumerate().filter(|(_, e)| e.valid)
    }
}

/// Decode the CSTEP table whose header starts at `offset`.
pub fn decode_cstep<I: ImageAccessor + ?Sized>(
    image: &I,
    offset: usize,
    options: &DecodeOptions,
) -> PowerResult<CstepTable> {
    let version = image.read_u8(offset)?;
    match version {
        CSTEP_VERSION_10 => decode_v10(image, offset, options).map(CstepTable::V10),
        _ => {
            log::warn!("Unknown CSTEP table version 0x{:x}", version);
            Err(PowerError::UnsupportedVersion {
                table: "CSTEP",
                version,
            })
        }
    }
}

fn decode_v10<I: ImageAccessor + ?Sized>(
    image: &I,
    offset: usize,
    options: &DecodeOptions,
) -> PowerResult<CstepTableV10> {
    // Entry count comes before the second array's sizes here, unlike BOOST.
    let mut header = HeaderReader::new(image, offset);
    let mut table = CstepTableV10 {
        offset,
        valid: false,
        hlen: header.u8(0x1),
        rlen: header.u8(0x2),
        entriesnum: header.u8(0x3),
        ssz: header.u8(0x4),
        snr: header.u8(0x5),
        entries1: Vec::new(),
        entries2: Vec::new(),
    };
    if header.failed {
        return Ok(table);
    }
    table.valid = true;

    if options.strict_bounds {
        let needed = table.hlen as usize
            + table.entriesnum as usize * table.rlen as usize
            + table.snr as usize * table.ssz as usize;
        check_footprint(image, offset, needed)?;
    }

    let entries1 = (0..table.entriesnum as usize)
        .map(|i| {
            let data = table.entry1_offset(i);
            CstepEntry1 {
                offset: data,
                pstate: pstate_from(field_u16(image, data)),
                index: field_u8(image, data + 0x3),
            }
        })
        .collect();

    let entries2 = (0..table.snr as usize)
        .map(|i| {
            let data = table.entry2_offset(i);
            let freq = field_u16(image, data);
            CstepEntry2 {
                offset: data,
                freq,
                unknown: [field_u8(image, data + 0x2), field_u8(image, data + 0x3)],
                voltage: field_u8(image, data + 0x4),
                valid: freq > 0,
            }
        })
        .collect();

    table.entries1 = entries1;
    table.entries2 = entries2;
    Ok(table)
}

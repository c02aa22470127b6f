//! BOOST sub-table: boost entries, each with a fixed number of per-domain subentries

use super::{check_footprint, field_u16, field_u8, pstate_from, DecodeOptions, HeaderReader};
use crate::errors::{PowerError, PowerResult};
use crate::image::ImageAccessor;

pub const BOOST_VERSION_11: u8 = 0x11;

/// A decoded BOOST table, tagged by layout version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoostTable {
    V11(BoostTableV11),
}

impl BoostTable {
    pub fn version(&self) -> u8 {
        match self {
            BoostTable::V11(_) => BOOST_VERSION_11,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoostTableV11 {
    /// Absolute offset of the table header
    pub offset: usize,
    /// False when a header field could not be read; no entries are decoded then
    pub valid: bool,
    pub hlen: u8,
    pub rlen: u8,
    pub ssz: u8,
    pub snr: u8,
    pub entriesnum: u8,
    pub entries: Vec<BoostEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoostEntry {
    pub offset: usize,
    pub pstate: u8,
    /// MHz
    pub min: u16,
    /// MHz
    pub max: u16,
    pub subentries: Vec<BoostSubentry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoostSubentry {
    pub offset: usize,
    pub domain: u8,
    pub percent: u8,
    pub min: u16,
    pub max: u16,
}

impl BoostTableV11 {
    /// Distance between consecutive entries, subentries included.
    pub fn stride(&self) -> usize {
        self.rlen as usize + self.snr as usize * self.ssz as usize
    }

    pub fn entry_offset(&self, i: usize) -> usize {
        self.offset + self.hlen as usize + i * self.stride()
    }
}

/// Decode the BOOST table whose header starts at `offset`.
pub fn decode_boost<I: ImageAccessor + ?Sized>(
    image: &I,
    offset: usize,
    options: &DecodeOptions,
) -> PowerResult<BoostTable> {
    let version = image.read_u8(offset)?;
    match version {
        BOOST_VERSION_11 => decode_v11(image, offset, options).map(BoostTable::V11),
        _ => {
            log::warn!("Unknown BOOST table version 0x{:x}", version);
            Err(PowerError::UnsupportedVersion {
                table: "BOOST",
                version,
            })
        }
    }
}

fn decode_v11<I: ImageAccessor + ?Sized>(
    image: &I,
    offset: usize,
    options: &DecodeOptions,
) -> PowerResult<BoostTableV11> {
    let mut header = HeaderReader::new(image, offset);
    let mut table = BoostTableV11 {
        offset,
        valid: false,
        hlen: header.u8(0x1),
        rlen: header.u8(0x2),
        ssz: header.u8(0x3),
        snr: header.u8(0x4),
        entriesnum: header.u8(0x5),
        entries: Vec::new(),
    };
    if header.failed {
        return Ok(table);
    }
    table.valid = true;

    if options.strict_bounds {
        let needed = table.hlen as usize + table.entriesnum as usize * table.stride();
        check_footprint(image, offset, needed)?;
    }

    let rlen = table.rlen as usize;
    let ssz = table.ssz as usize;
    let entries = (0..table.entriesnum as usize)
        .map(|i| {
            let data = table.entry_offset(i);
            let subentries = (0..table.snr as usize)
                .map(|j| {
                    let sdata = data + rlen + j * ssz;
                    BoostSubentry {
                        offset: sdata,
                        domain: field_u8(image, sdata),
                        percent: field_u8(image, sdata + 0x1),
                        min: field_u16(image, sdata + 0x2),
                        max: field_u16(image, sdata + 0x4),
                    }
                })
                .collect();

            BoostEntry {
                offset: data,
                pstate: pstate_from(field_u16(image, data)),
                min: field_u16(image, data + 0x2),
                max: field_u16(image, data + 0x4),
                subentries,
            }
        })
        .collect();
    table.entries = entries;

    Ok(table)
}

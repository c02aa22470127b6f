//! Decoded power directory and the single-pass parse that builds it

use crate::directory::{walk, DirectoryLocation, SubtableRef, TableKind};
use crate::errors::PowerResult;
use crate::image::ImageAccessor;
use crate::tables::{decode_boost, decode_cstep, BoostTable, CstepTable, DecodeOptions, TableState};

/// Everything decoded from one power directory. Owned by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PowerDirectory {
    pub location: DirectoryLocation,
    /// Non-zero slots in directory order
    pub tables: Vec<SubtableRef>,
    pub boost: TableState<BoostTable>,
    pub cstep: TableState<CstepTable>,
}

impl PowerDirectory {
    pub fn version(&self) -> u8 {
        self.location.version
    }

    /// Resolved offset of a known sub-table, if the directory points to it.
    pub fn table_offset(&self, kind: TableKind) -> Option<u16> {
        self.tables
            .iter()
            .find(|t| t.kind == Some(kind))
            .map(|t| t.offset)
    }

    pub fn unknown_slots(&self) -> impl Iterator<Item = &SubtableRef> {
        self.tables.iter().filter(|t| t.kind.is_none())
    }
}

/// Parse the power directory with default options.
pub fn parse_power<I: ImageAccessor>(image: &I, location: DirectoryLocation) -> PowerResult<PowerDirectory> {
    parse_power_with(image, location, &DecodeOptions::default())
}

/// Walk the directory, then run each present sub-table's decoder once.
///
/// Only an unsupported directory version fails the whole parse. A sub-table
/// decoder failing leaves its own state `Rejected` and nothing else.
pub fn parse_power_with<I: ImageAccessor>(
    image: &I,
    location: DirectoryLocation,
    options: &DecodeOptions,
) -> PowerResult<PowerDirectory> {
    let tables = walk(image, &location)?;
    log::debug!(
        "power directory v{} at 0x{:x}: {} slots in use",
        location.version,
        location.base,
        tables.len()
    );

    let mut power = PowerDirectory {
        location,
        tables,
        boost: TableState::Absent,
        cstep: TableState::Absent,
    };

    if let Some(offset) = power.table_offset(TableKind::Boost) {
        power.boost = TableState::from_result(decode_boost(image, offset as usize, options));
    }
    if let Some(offset) = power.table_offset(TableKind::Cstep) {
        power.cstep = TableState::from_result(decode_cstep(image, offset as usize, options));
    }

    Ok(power)
}

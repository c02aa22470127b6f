//! Power ('P') directory: slot layouts, slot resolution and the directory walk

use crate::errors::{PowerError, PowerResult};
use crate::image::ImageAccessor;

/// Where the power directory lives in the image, as reported by the BIT table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectoryLocation {
    /// Absolute offset of the first slot
    pub base: usize,
    /// Declared directory length in bytes
    pub length: usize,
    /// Directory format version (1 or 2)
    pub version: u8,
}

/// Sub-table kinds the directory can point to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableKind {
    Performance,
    MemoryTimings,
    MemoryTimingsMapping,
    Thermal,
    Voltage,
    Unk,
    VoltMapping,
    Boost,
    Cstep,
}

impl TableKind {
    pub fn name(&self) -> &'static str {
        match self {
            TableKind::Performance => "PERFORMANCE",
            TableKind::MemoryTimings => "MEMORY TIMINGS",
            TableKind::MemoryTimingsMapping => "MEMORY TIMINGS MAPPING",
            TableKind::Thermal => "THERMAL",
            TableKind::Voltage => "VOLTAGE",
            TableKind::Unk => "UNK",
            TableKind::VoltMapping => "VOLT MAPPING",
            TableKind::Boost => "BOOST",
            TableKind::Cstep => "CSTEP",
        }
    }
}

/// (slot offset within the directory, kind)
type SlotLayout = &'static [(u16, TableKind)];

const LAYOUT_V1: SlotLayout = &[
    (0x00, TableKind::Performance),
    (0x04, TableKind::MemoryTimings),
    (0x0c, TableKind::Thermal),
    (0x10, TableKind::Voltage),
    (0x15, TableKind::Unk),
];

const LAYOUT_V2: SlotLayout = &[
    (0x00, TableKind::Performance),
    (0x04, TableKind::MemoryTimingsMapping),
    (0x08, TableKind::MemoryTimings),
    (0x0c, TableKind::Voltage),
    (0x10, TableKind::Thermal),
    (0x18, TableKind::Unk),
    (0x20, TableKind::VoltMapping),
    (0x30, TableKind::Boost),
    (0x34, TableKind::Cstep),
];

fn layout_for(version: u8) -> PowerResult<SlotLayout> {
    match version {
        1 => Ok(LAYOUT_V1),
        2 => Ok(LAYOUT_V2),
        _ => Err(PowerError::UnsupportedVersion {
            table: "power directory",
            version,
        }),
    }
}

/// Slot offsets are 16-bit, so a directory can't span more than this.
pub const MAX_DIRECTORY_LENGTH: usize = 0x1_0000;

/// Absolute image offset of a directory slot.
fn slot_address<I: ImageAccessor + ?Sized>(image: &I, dir: &DirectoryLocation, slot: usize) -> PowerResult<usize> {
    dir.base.checked_add(slot).ok_or(PowerError::OutOfBounds {
        offset: dir.base,
        width: 2,
        len: image.len(),
    })
}

/// A known slot after resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedSlot {
    pub kind: TableKind,
    /// Offset of the slot within the directory
    pub slot: u16,
    /// Absolute offset of the sub-table (0 if absent)
    pub offset: u16,
}

/// Resolve a directory slot, selected either by its index in the version's
/// layout or by its byte offset within the directory. Exactly one selector
/// must be given.
pub fn resolve<I: ImageAccessor + ?Sized>(
    image: &I,
    dir: &DirectoryLocation,
    index: Option<usize>,
    offset: Option<u16>,
) -> PowerResult<ResolvedSlot> {
    // Selector misuse is reported before the version is looked at.
    let (slot, kind) = match (index, offset) {
        (Some(_), Some(_)) => {
            return Err(PowerError::InvalidArgument(
                "select a slot by index or by offset, not both",
            ));
        }
        (None, None) => {
            return Err(PowerError::InvalidArgument("no slot selector given"));
        }
        (Some(idx), None) => *layout_for(dir.version)?.get(idx).ok_or(PowerError::NotFound {
            slot: u16::try_from(idx).unwrap_or(u16::MAX),
        })?,
        (None, Some(off)) => *layout_for(dir.version)?
            .iter()
            .find(|(slot, _)| *slot == off)
            .ok_or(PowerError::NotFound { slot: off })?,
    };

    let needed = slot as usize + 2;
    if needed > dir.length {
        return Err(PowerError::TruncatedTable {
            offset: dir.base,
            needed,
            length: dir.length,
        });
    }

    let offset = image.read_u16(slot_address(image, dir, slot as usize)?)?;
    Ok(ResolvedSlot { kind, slot, offset })
}

/// One non-zero directory slot found by [`walk`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubtableRef {
    /// `None` when the slot does not match a known kind
    pub kind: Option<TableKind>,
    pub slot: u16,
    pub offset: u16,
}

impl SubtableRef {
    pub fn name(&self) -> &'static str {
        self.kind.map_or("UNKNOWN", |k| k.name())
    }
}

/// Walk every two-byte slot of the directory and collect the non-zero ones.
///
/// Zero slots are absent. Slots that do not match the layout are kept as
/// UNKNOWN and the walk carries on to the end of the directory.
pub fn walk<I: ImageAccessor + ?Sized>(image: &I, dir: &DirectoryLocation) -> PowerResult<Vec<SubtableRef>> {
    if let Err(e) = layout_for(dir.version) {
        log::warn!("Unknown power directory version 0x{:x}", dir.version);
        return Err(e);
    }
    if dir.length > MAX_DIRECTORY_LENGTH {
        return Err(PowerError::InvalidArgument("power directory longer than 64 KiB"));
    }

    let mut tables = Vec::new();
    for pos in (0..dir.length).step_by(2) {
        let Ok(value) = slot_address(image, dir, pos).and_then(|at| image.read_u16(at)) else {
            continue;
        };
        if value == 0 {
            continue;
        }
        let Ok(slot) = u16::try_from(pos) else {
            break;
        };

        let kind = match resolve(image, dir, None, Some(slot)) {
            Ok(resolved) => Some(resolved.kind),
            Err(PowerError::NotFound { .. }) => {
                log::warn!("Unknown power table at slot 0x{:02x} => 0x{:x}", slot, value);
                None
            }
            Err(e) => {
                log::debug!("slot 0x{:02x} left unresolved: {}", slot, e);
                None
            }
        };

        tables.push(SubtableRef {
            kind,
            slot,
            offset: value,
        });
    }

    Ok(tables)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::Image;
    use crate::logger::capture::{capture, warnings};

    fn image_with_dir(base: usize, slots: &[(usize, u16)], total: usize) -> Vec<u8> {
        let mut data = vec![0u8; total];
        for &(slot, value) in slots {
            data[base + slot..base + slot + 2].copy_from_slice(&value.to_le_bytes());
        }
        data
    }

    #[test]
    fn test_resolve_v1_performance_by_offset() {
        let data = image_with_dir(0x40, &[(0x00, 0x0120)], 0x100);
        let img = Image::new(&data);
        let dir = DirectoryLocation { base: 0x40, length: 0x18, version: 1 };

        let r = resolve(&img, &dir, None, Some(0x00)).unwrap();
        assert_eq!(r.kind, TableKind::Performance);
        assert_eq!(r.kind.name(), "PERFORMANCE");
        assert_eq!(r.offset, 0x120);
    }

    #[test]
    fn test_resolve_by_index_matches_layout() {
        let data = image_with_dir(0, &[(0x30, 0x0200), (0x34, 0x0300)], 0x80);
        let img = Image::new(&data);
        let dir = DirectoryLocation { base: 0, length: 0x38, version: 2 };

        let boost = resolve(&img, &dir, Some(7), None).unwrap();
        assert_eq!((boost.kind, boost.slot, boost.offset), (TableKind::Boost, 0x30, 0x200));
        let cstep = resolve(&img, &dir, Some(8), None).unwrap();
        assert_eq!((cstep.kind, cstep.slot, cstep.offset), (TableKind::Cstep, 0x34, 0x300));
        assert!(matches!(
            resolve(&img, &dir, Some(9), None),
            Err(PowerError::NotFound { .. })
        ));
    }

    #[test]
    fn test_resolve_selector_misuse() {
        let data = image_with_dir(0, &[(0x00, 0x0120)], 0x40);
        let img = Image::new(&data);
        let dir = DirectoryLocation { base: 0, length: 0x38, version: 2 };

        // Both selectors would resolve on their own.
        assert!(matches!(
            resolve(&img, &dir, Some(0), Some(0x00)),
            Err(PowerError::InvalidArgument(_))
        ));
        assert!(matches!(
            resolve(&img, &dir, None, None),
            Err(PowerError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_resolve_unknown_directory_version() {
        let data = [0u8; 0x40];
        let img = Image::new(&data);
        for version in [0u8, 3, 0x10, 0xff] {
            let dir = DirectoryLocation { base: 0, length: 0x38, version };
            assert_eq!(
                resolve(&img, &dir, None, Some(0)),
                Err(PowerError::UnsupportedVersion { table: "power directory", version })
            );
            assert!(walk(&img, &dir).is_err());
        }
    }

    #[test]
    fn test_resolve_unknown_offset() {
        let data = [0u8; 0x40];
        let img = Image::new(&data);
        let dir = DirectoryLocation { base: 0, length: 0x38, version: 2 };
        assert_eq!(
            resolve(&img, &dir, None, Some(0x02)),
            Err(PowerError::NotFound { slot: 0x02 })
        );
    }

    #[test]
    fn test_resolve_slot_beyond_declared_length() {
        let data = image_with_dir(0, &[(0x34, 0x0300)], 0x40);
        let img = Image::new(&data);
        // CSTEP slot is at 0x34, needs 0x36 bytes of directory.
        let dir = DirectoryLocation { base: 0, length: 0x35, version: 2 };
        assert_eq!(
            resolve(&img, &dir, None, Some(0x34)),
            Err(PowerError::TruncatedTable { offset: 0, needed: 0x36, length: 0x35 })
        );
    }

    #[test]
    fn test_resolve_propagates_accessor_error() {
        let data = [0u8; 0x10];
        let img = Image::new(&data);
        let dir = DirectoryLocation { base: 0x08, length: 0x38, version: 2 };
        assert!(matches!(
            resolve(&img, &dir, None, Some(0x10)),
            Err(PowerError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_walk_skips_zero_and_keeps_unknown() {
        let data = image_with_dir(
            0x10,
            &[(0x00, 0x0100), (0x02, 0x0bad), (0x30, 0x0200), (0x36, 0x0300)],
            0x80,
        );
        let img = Image::new(&data);
        let dir = DirectoryLocation { base: 0x10, length: 0x38, version: 2 };

        let tables = walk(&img, &dir).unwrap();
        let summary: Vec<(u16, &str, u16)> =
            tables.iter().map(|t| (t.slot, t.name(), t.offset)).collect();
        assert_eq!(
            summary,
            vec![
                (0x00, "PERFORMANCE", 0x100),
                (0x02, "UNKNOWN", 0xbad),
                (0x30, "BOOST", 0x200),
                (0x36, "UNKNOWN", 0x300),
            ]
        );
    }

    #[test]
    fn test_walk_reaches_end_of_short_image() {
        // Directory claims more bytes than the image holds; unreadable slots are skipped.
        let data = image_with_dir(0, &[(0x00, 0x0120), (0x0c, 0x0140)], 0x0e);
        let img = Image::new(&data);
        let dir = DirectoryLocation { base: 0, length: 0x38, version: 1 };

        let tables = walk(&img, &dir).unwrap();
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[1].kind, Some(TableKind::Thermal));
    }

    #[test]
    fn test_selector_misuse_wins_over_unknown_version() {
        let data = [0u8; 0x40];
        let img = Image::new(&data);
        let dir = DirectoryLocation { base: 0, length: 0x38, version: 3 };

        assert!(matches!(
            resolve(&img, &dir, Some(0), Some(0)),
            Err(PowerError::InvalidArgument(_))
        ));
        assert!(matches!(
            resolve(&img, &dir, None, None),
            Err(PowerError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_base_near_address_limit() {
        let data = [0xffu8; 0x40];
        let img = Image::new(&data);
        let dir = DirectoryLocation { base: usize::MAX - 1, length: 0x38, version: 2 };

        assert_eq!(walk(&img, &dir), Ok(Vec::new()));
        assert!(matches!(
            resolve(&img, &dir, None, Some(0x34)),
            Err(PowerError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_walk_rejects_directory_past_slot_range() {
        let mut data = image_with_dir(0, &[(0x00, 0x0120)], 0x10004);
        data[0x10000..0x10002].copy_from_slice(&0x0badu16.to_le_bytes());
        let img = Image::new(&data);

        let dir = DirectoryLocation { base: 0, length: 0x10002, version: 2 };
        assert!(matches!(walk(&img, &dir), Err(PowerError::InvalidArgument(_))));

        // A full 64 KiB directory is still walked, once per slot.
        let dir = DirectoryLocation { length: MAX_DIRECTORY_LENGTH, ..dir };
        let tables = walk(&img, &dir).unwrap();
        assert_eq!(tables.len(), 1);
        assert_eq!((tables[0].kind, tables[0].offset), (Some(TableKind::Performance), 0x120));
    }

    #[test]
    fn test_walk_warns_on_unknown_slot_only() {
        // 0x02 is not in the layout; 0x34 is CSTEP but past the declared length.
        let data = image_with_dir(0, &[(0x00, 0x0120), (0x02, 0x0bad), (0x34, 0x0300)], 0x40);
        let img = Image::new(&data);
        let dir = DirectoryLocation { base: 0, length: 0x35, version: 2 };

        let (tables, records) = capture(|| walk(&img, &dir).unwrap());
        assert_eq!(tables.len(), 3);
        assert_eq!(tables[2].kind, None);
        let warned = warnings(&records);
        assert_eq!(warned.len(), 1, "{:?}", records);
        assert!(warned[0].contains("slot 0x02"));
    }

    #[test]
    fn test_walk_is_silent_on_zero_slots() {
        let data = image_with_dir(0, &[(0x00, 0x0120), (0x30, 0x0200)], 0x40);
        let img = Image::new(&data);
        let dir = DirectoryLocation { base: 0, length: 0x38, version: 2 };

        let (tables, records) = capture(|| walk(&img, &dir).unwrap());
        assert_eq!(tables.len(), 2);
        assert!(warnings(&records).is_empty(), "{:?}", records);
    }

    #[test]
    fn test_walk_warns_on_unknown_directory_version() {
        let data = [0u8; 0x40];
        let img = Image::new(&data);
        let dir = DirectoryLocation { base: 0, length: 0x38, version: 7 };

        let (result, records) = capture(|| walk(&img, &dir));
        assert!(result.is_err());
        assert_eq!(warnings(&records), vec!["Unknown power directory version 0x7"]);
    }
}

//! BIT (BIOS Information Table) lookup of the power directory

use crate::directory::DirectoryLocation;
use crate::errors::{PowerError, PowerResult};
use crate::image::ImageAccessor;

/// `0xB8FF` id followed by the "BIT\0" signature
pub const BIT_MAGIC: [u8; 6] = [0xff, 0xb8, b'B', b'I', b'T', 0x00];

/// Token id of the power ('P') directory
pub const BIT_TOKEN_POWER: u8 = b'P';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitHeader {
    /// Absolute offset of the header id
    pub offset: usize,
    pub header_size: u8,
    pub token_size: u8,
    pub token_entries: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitToken {
    pub id: u8,
    pub data_version: u8,
    pub data_size: u16,
    pub data_pointer: u16,
}

/// Find the BIT header by scanning for its magic.
pub fn find_bit<I: ImageAccessor + ?Sized>(image: &I) -> PowerResult<BitHeader> {
    let data = image.bytes(0, image.len())?;
    let offset = data
        .windows(BIT_MAGIC.len())
        .position(|w| w == BIT_MAGIC)
        .ok_or(PowerError::NotFound { slot: 0 })?;

    Ok(BitHeader {
        offset,
        header_size: image.read_u8(offset + 8)?,
        token_size: image.read_u8(offset + 9)?,
        token_entries: image.read_u8(offset + 10)?,
    })
}

/// Read every token listed by the BIT header.
pub fn bit_tokens<I: ImageAccessor + ?Sized>(image: &I, bit: &BitHeader) -> PowerResult<Vec<BitToken>> {
    let first = bit.offset + bit.header_size as usize;
    (0..bit.token_entries as usize)
        .map(|i| {
            let at = first + i * bit.token_size as usize;
            Ok(BitToken {
                id: image.read_u8(at)?,
                data_version: image.read_u8(at + 1)?,
                data_size: image.read_u16(at + 2)?,
                data_pointer: image.read_u16(at + 4)?,
            })
        })
        .collect()
}

/// Location of the power directory as advertised by the 'P' BIT token.
pub fn locate_power_directory<I: ImageAccessor + ?Sized>(image: &I) -> PowerResult<DirectoryLocation> {
    let bit = find_bit(image)?;
    let token = bit_tokens(image, &bit)?
        .into_iter()
        .find(|t| t.id == BIT_TOKEN_POWER)
        .ok_or(PowerError::NotFound {
            slot: BIT_TOKEN_POWER as u16,
        })?;

    log::debug!(
        "BIT table 'P' at 0x{:x}, version {}, {} bytes",
        token.data_pointer,
        token.data_version,
        token.data_size
    );

    Ok(DirectoryLocation {
        base: token.data_pointer as usize,
        length: token.data_size as usize,
        version: token.data_version,
    })
}

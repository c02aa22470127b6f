//! Text dump of a decoded power directory

use std::fmt::Write;

use crate::config::DisplayConfig;
use crate::directory::TableKind;
use crate::image::ImageAccessor;
use crate::power::PowerDirectory;
use crate::tables::boost::BOOST_VERSION_11;
use crate::tables::cstep::{CstepEntry2, CSTEP_VERSION_10};
use crate::tables::{BoostTable, BoostTableV11, CstepTable, CstepTableV10, TableState};

/// Render the directory slots followed by every decoded sub-table.
pub fn render_power<I: ImageAccessor + ?Sized>(
    image: &I,
    power: &PowerDirectory,
    display: &DisplayConfig,
) -> String {
    let mut o = String::new();

    let _ = writeln!(
        o,
        "Power directory at 0x{:x}, version {}, {} bytes",
        power.location.base,
        power.location.version,
        power.location.length
    );
    for t in &power.tables {
        let _ = writeln!(o, "0x{:02x}: 0x{:x} => {} TABLE", t.slot, t.offset, t.name());
    }
    o.push('\n');

    render_state(&mut o, power, TableKind::Boost, &power.boost, |o, t| match t {
        BoostTable::V11(b) => render_boost(o, image, b, display),
    });
    render_state(&mut o, power, TableKind::Cstep, &power.cstep, |o, t| match t {
        CstepTable::V10(c) => render_cstep(o, image, c, display),
    });

    o
}

fn render_state<T>(
    o: &mut String,
    power: &PowerDirectory,
    kind: TableKind,
    state: &TableState<T>,
    render: impl FnOnce(&mut String, &T),
) {
    match state {
        TableState::Absent => {}
        TableState::Decoded(t) => render(o, t),
        TableState::Rejected(e) => {
            let offset = power.table_offset(kind).unwrap_or(0);
            let _ = writeln!(o, "{} table at 0x{:x}: {}\n", kind.name(), offset, e);
        }
    }
}

fn render_boost<I: ImageAccessor + ?Sized>(
    o: &mut String,
    image: &I,
    boost: &BoostTableV11,
    display: &DisplayConfig,
) {
    let _ = writeln!(o, "BOOST table at 0x{:x}, version {:x}", boost.offset, BOOST_VERSION_11);
    if !boost.valid {
        o.push_str("  header truncated\n\n");
        return;
    }
    hex_block(o, image, boost.offset, boost.hlen as usize, display, 0);

    for (i, e) in boost.entries.iter().enumerate() {
        let _ = writeln!(
            o,
            "\t{}: pstate {:x} min {} MHz max {} MHz",
            i, e.pstate, e.min, e.max
        );
        hex_block(o, image, e.offset, boost.rlen as usize, display, 1);

        for (j, s) in e.subentries.iter().enumerate() {
            let _ = writeln!(
                o,
                "\t\t{}: domain {:x} percent {} min {} max {}",
                j, s.domain, s.percent, s.min, s.max
            );
            hex_block(o, image, s.offset, boost.ssz as usize, display, 2);
        }
    }
    o.push('\n');
}

fn render_cstep<I: ImageAccessor + ?Sized>(
    o: &mut String,
    image: &I,
    cstep: &CstepTableV10,
    display: &DisplayConfig,
) {
    let _ = writeln!(o, "CSTEP table at 0x{:x}, version {:x}", cstep.offset, CSTEP_VERSION_10);
    if !cstep.valid {
        o.push_str("  header truncated\n\n");
        return;
    }
    hex_block(o, image, cstep.offset, cstep.hlen as usize, display, 0);

    for (i, e) in cstep.entries1.iter().enumerate() {
        let _ = writeln!(o, "\t{}: pstate {:x} index {}", i, e.pstate, e.index);
        hex_block(o, image, e.offset, cstep.rlen as usize, display, 1);
    }
    o.push_str("---\n");

    let steps: Vec<(usize, &CstepEntry2)> = if display.show_invalid {
        cstep.entries2.iter().enumerate().collect()
    } else {
        cstep.valid_entries2().collect()
    };
    for (i, e) in steps {
        let _ = writeln!(
            o,
            "\t{}: freq {} MHz unkn[0] {:x} unkn[1] {:x} voltage {}",
            i, e.freq, e.unknown[0], e.unknown[1], e.voltage
        );
        hex_block(o, image, e.offset, cstep.ssz as usize, display, 1);
    }
    o.push('\n');
}

fn hex_block<I: ImageAccessor + ?Sized>(
    o: &mut String,
    image: &I,
    offset: usize,
    len: usize,
    display: &DisplayConfig,
    indent: usize,
) {
    if display.hexdump && len > 0 {
        o.push_str(&hex_dump(image, offset, len, indent));
    }
}

/// 16 bytes per line, prefixed by the absolute offset. Bytes past the end
/// of the image are shown as `??`.
pub fn hex_dump<I: ImageAccessor + ?Sized>(image: &I, offset: usize, len: usize, indent: usize) -> String {
    let mut o = String::new();
    let pad = "\t".repeat(indent);
    for line in (0..len).step_by(16) {
        let _ = write!(o, "{}0x{:04x}:", pad, offset + line);
        for at in offset + line..offset + len.min(line + 16) {
            match image.read_u8(at) {
                Ok(b) => {
                    let _ = write!(o, " {:02x}", b);
                }
                Err(_) => o.push_str(" ??"),
            }
        }
        o.push('\n');
    }
    o
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::DirectoryLocation;
    use crate::image::Image;
    use crate::power::parse_power;

    fn sample_image() -> Vec<u8> {
        let mut data = vec![0u8; 0x100];
        data[0x10..0x12].copy_from_slice(&0x00f0u16.to_le_bytes());
        data[0x40..0x42].copy_from_slice(&0x0080u16.to_le_bytes());
        data[0x44..0x46].copy_from_slice(&0x00c0u16.to_le_bytes());
        data[0x80..0x86].copy_from_slice(&[0x11, 6, 6, 6, 1, 1]);
        data[0x86..0x88].copy_from_slice(&0x00a0u16.to_le_bytes());
        data[0xc0..0xc6].copy_from_slice(&[0x10, 6, 4, 1, 5, 2]);
        data[0xca..0xcc].copy_from_slice(&1200u16.to_le_bytes());
        data
    }

    fn render(display: &DisplayConfig) -> String {
        let data = sample_image();
        let img = Image::new(&data);
        let loc = DirectoryLocation { base: 0x10, length: 0x38, version: 2 };
        let power = parse_power(&img, loc).unwrap();
        render_power(&img, &power, display)
    }

    #[test]
    fn test_render_lists_slots_and_tables() {
        let out = render(&DisplayConfig::default());
        assert!(out.contains("0x00: 0xf0 => PERFORMANCE TABLE"));
        assert!(out.contains("0x30: 0x80 => BOOST TABLE"));
        assert!(out.contains("0x34: 0xc0 => CSTEP TABLE"));
        assert!(out.contains("BOOST table at 0x80, version 11"));
        assert!(out.contains("\t0: pstate 5 min 0 MHz max 0 MHz"));
        assert!(out.contains("CSTEP table at 0xc0, version 10"));
        assert!(out.contains("\t0: freq 1200 MHz"));
        assert!(!out.contains("\t1: freq 0 MHz"));
        assert!(!out.contains("0x0080:"));
    }

    #[test]
    fn test_render_show_invalid_and_hexdump() {
        let display = DisplayConfig { hexdump: true, show_invalid: true };
        let out = render(&display);
        assert!(out.contains("\t1: freq 0 MHz"));
        assert!(out.contains("0x0080: 11 06 06 06 01 01"));
    }

    #[test]
    fn test_render_hides_invalid_steps_but_keeps_indices() {
        let mut data = sample_image();
        // Three entries2 at 0xca, 0xcf, 0xd4; the middle one has no frequency.
        data[0xc5] = 3;
        data[0xd4..0xd6].copy_from_slice(&700u16.to_le_bytes());
        let img = Image::new(&data);
        let loc = DirectoryLocation { base: 0x10, length: 0x38, version: 2 };
        let power = parse_power(&img, loc).unwrap();

        let out = render_power(&img, &power, &DisplayConfig::default());
        assert!(out.contains("\t0: freq 1200 MHz"));
        assert!(!out.contains("\t1: freq"));
        assert!(out.contains("\t2: freq 700 MHz"));

        let display = DisplayConfig { show_invalid: true, ..DisplayConfig::default() };
        let out = render_power(&img, &power, &display);
        assert!(out.contains("\t1: freq 0 MHz"));
    }

    #[test]
    fn test_render_rejected_table() {
        let mut data = sample_image();
        data[0x80] = 0x99;
        let img = Image::new(&data);
        let loc = DirectoryLocation { base: 0x10, length: 0x38, version: 2 };
        let power = parse_power(&img, loc).unwrap();
        let out = render_power(&img, &power, &DisplayConfig::default());
        assert!(out.contains("BOOST table at 0x80: unsupported BOOST version 0x99"));
        assert!(out.contains("CSTEP table at 0xc0, version 10"));
    }

    #[test]
    fn test_hex_dump_past_end() {
        let data = [0xde, 0xad];
        let img = Image::new(&data);
        assert_eq!(hex_dump(&img, 0, 3, 0), "0x0000: de ad ??\n");
        assert_eq!(hex_dump(&img, 1, 1, 1), "\t0x0001: ad\n");
    }
}

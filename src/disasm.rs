use std::fmt::Write as _;

use crate::image::Image;
use crate::opcodes::{decode, AddrMode};

/// Render the decodable contents of `start..=end` as an assembly listing,
/// one instruction per line: address, raw bytes, mnemonic, operand.
/// Unwritten gaps are skipped; written bytes that decode to nothing are shown
/// as `???` so runaway data is visible.
pub fn disassemble(image: &Image, start: u16, end: u16) -> String {
    let mut out = String::new();
    let mut addr = start as u32;
    while addr <= end as u32 {
        let Some(op) = image.read(addr as u16) else {
            addr += 1;
            continue;
        };
        let Some((mn, mode)) = decode(op) else {
            let _ = writeln!(out, "${addr:04X}  {op:02X}        ???");
            addr += 1;
            continue;
        };

        let lo = image.read((addr as u16).wrapping_add(1)).unwrap_or(0);
        let hi = image.read((addr as u16).wrapping_add(2)).unwrap_or(0);
        let mut raw = format!("{op:02X}");
        if mode.operand_len() >= 1 {
            let _ = write!(raw, " {lo:02X}");
        }
        if mode.operand_len() >= 2 {
            let _ = write!(raw, " {hi:02X}");
        }
        let _ = writeln!(
            out,
            "${addr:04X}  {raw:<8}  {}{}",
            mn.name(),
            operand_text(mode, lo, hi, addr as u16)
        );
        addr += 1 + mode.operand_len() as u32;
    }
    out
}

fn operand_text(mode: AddrMode, lo: u8, hi: u8, addr: u16) -> String {
    let word = ((hi as u16) << 8) | lo as u16;
    match mode {
        AddrMode::Implied => String::new(),
        AddrMode::Accumulator => " A".to_string(),
        AddrMode::Immediate => format!(" #${lo:02X}"),
        AddrMode::ZeroPage => format!(" ${lo:02X}"),
        AddrMode::ZeroPageX => format!(" ${lo:02X},X"),
        AddrMode::ZeroPageY => format!(" ${lo:02X},Y"),
        AddrMode::Absolute => format!(" ${word:04X}"),
        AddrMode::AbsoluteX => format!(" ${word:04X},X"),
        AddrMode::AbsoluteY => format!(" ${word:04X},Y"),
        AddrMode::Indirect => format!(" (${word:04X})"),
        AddrMode::IndirectX => format!(" (${lo:02X},X)"),
        AddrMode::IndirectY => format!(" (${lo:02X}),Y"),
        AddrMode::Relative => {
            // Branches display their resolved target
            let target = addr.wrapping_add(2).wrapping_add_signed(lo as i8 as i16);
            format!(" ${target:04X}")
        }
    }
}

/// Hexdump of `start..=end`, sixteen cells per row. Unwritten cells render
/// as `..` so they stay distinguishable from zeroed ones; rows with nothing
/// written are skipped entirely.
pub fn dump(image: &Image, start: u16, end: u16) -> String {
    let mut out = String::new();
    let mut row = (start as u32) & !0xF;
    while row <= end as u32 {
        let cells: Vec<Option<u8>> = (0..16).map(|i| image.read((row + i) as u16)).collect();
        if cells.iter().any(Option::is_some) {
            let _ = write!(out, "{row:04X}:");
            for cell in cells {
                match cell {
                    Some(byte) => {
                        let _ = write!(out, " {byte:02X}");
                    }
                    None => out.push_str(" .."),
                }
            }
            out.push('\n');
        }
        if row + 16 > u16::MAX as u32 {
            break;
        }
        row += 16;
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::parser::Assembler;

    fn assemble(src: &str) -> Image {
        let asm = Assembler::new(src).unwrap();
        let mut image = asm.assemble().unwrap();
        image.backpatch().unwrap();
        image
    }

    #[test]
    fn lists_instructions_with_operands() {
        let image = assemble("LDA #$05 STA $0200 BRK");
        let listing = disassemble(&image, 0x0800, 0x0806);
        assert_eq!(
            listing,
            "$0800  A9 05     LDA #$05\n\
             $0802  8D 00 02  STA $0200\n\
             $0805  00        BRK\n"
        );
    }

    #[test]
    fn branches_display_their_target() {
        let image = assemble("LOOP: INX BNE LOOP");
        let listing = disassemble(&image, 0x0800, 0x0803);
        assert!(listing.contains("BNE $0800"));
    }

    #[test]
    fn listing_is_stable_under_a_second_decode() {
        let image = assemble("LDX #$00 LOOP: INX CPX #$05 BNE LOOP BRK");
        let first = disassemble(&image, 0x0800, 0x0810);
        let second = disassemble(&image, 0x0800, 0x0810);
        assert_eq!(first, second);
    }

    #[test]
    fn undecodable_bytes_are_flagged() {
        let image = assemble(".DB $FF");
        let listing = disassemble(&image, 0x0800, 0x0800);
        assert!(listing.contains("???"));
    }

    #[test]
    fn dump_marks_unwritten_cells() {
        let image = assemble("LDA #$05");
        let text = dump(&image, 0x0800, 0x080F);
        assert_eq!(
            text,
            "0800: A9 05 .. .. .. .. .. .. .. .. .. .. .. .. .. ..\n"
        );
    }

    #[test]
    fn dump_skips_empty_rows() {
        let image = assemble(".ORG $0900 .DB 1");
        let text = dump(&image, 0x0800, 0x0910);
        assert_eq!(text.lines().count(), 1);
        assert!(text.starts_with("0900: 01"));
    }
}

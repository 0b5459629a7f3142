use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;

/// Syntactic form of an operand, deciding how an instruction finds its value.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum AddrMode {
    Implied,
    Accumulator,
    Immediate,
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    Indirect,
    IndirectX,
    IndirectY,
    Relative,
}

impl AddrMode {
    pub const ALL: [AddrMode; 13] = [
        AddrMode::Implied,
        AddrMode::Accumulator,
        AddrMode::Immediate,
        AddrMode::ZeroPage,
        AddrMode::ZeroPageX,
        AddrMode::ZeroPageY,
        AddrMode::Absolute,
        AddrMode::AbsoluteX,
        AddrMode::AbsoluteY,
        AddrMode::Indirect,
        AddrMode::IndirectX,
        AddrMode::IndirectY,
        AddrMode::Relative,
    ];

    /// Operand bytes following the opcode byte.
    pub fn operand_len(self) -> u16 {
        match self {
            AddrMode::Implied | AddrMode::Accumulator => 0,
            AddrMode::Immediate
            | AddrMode::ZeroPage
            | AddrMode::ZeroPageX
            | AddrMode::ZeroPageY
            | AddrMode::IndirectX
            | AddrMode::IndirectY
            | AddrMode::Relative => 1,
            AddrMode::Absolute | AddrMode::AbsoluteX | AddrMode::AbsoluteY | AddrMode::Indirect => {
                2
            }
        }
    }
}

/// The 56 documented 6502 mnemonics plus the five simulator extensions
/// (HLT, OUT, OUY, IN, WAI).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Mnemonic {
    Adc,
    And,
    Asl,
    Bcc,
    Bcs,
    Beq,
    Bit,
    Bmi,
    Bne,
    Bpl,
    Brk,
    Bvc,
    Bvs,
    Clc,
    Cld,
    Cli,
    Clv,
    Cmp,
    Cpx,
    Cpy,
    Dec,
    Dex,
    Dey,
    Eor,
    Inc,
    Inx,
    Iny,
    Jmp,
    Jsr,
    Lda,
    Ldx,
    Ldy,
    Lsr,
    Nop,
    Ora,
    Pha,
    Php,
    Pla,
    Plp,
    Rol,
    Ror,
    Rti,
    Rts,
    Sbc,
    Sec,
    Sed,
    Sei,
    Sta,
    Stx,
    Sty,
    Tax,
    Tay,
    Tsx,
    Txa,
    Txs,
    Tya,
    Hlt,
    Out,
    Ouy,
    In,
    Wai,
}

impl FromStr for Mnemonic {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use Mnemonic::*;
        let mn = match s.to_ascii_uppercase().as_str() {
            "ADC" => Adc,
            "AND" => And,
            "ASL" => Asl,
            "BCC" => Bcc,
            "BCS" => Bcs,
            "BEQ" => Beq,
            "BIT" => Bit,
            "BMI" => Bmi,
            "BNE" => Bne,
            "BPL" => Bpl,
            "BRK" => Brk,
            "BVC" => Bvc,
            "BVS" => Bvs,
            "CLC" => Clc,
            "CLD" => Cld,
            "CLI" => Cli,
            "CLV" => Clv,
            "CMP" => Cmp,
            "CPX" => Cpx,
            "CPY" => Cpy,
            "DEC" => Dec,
            "DEX" => Dex,
            "DEY" => Dey,
            "EOR" => Eor,
            "INC" => Inc,
            "INX" => Inx,
            "INY" => Iny,
            "JMP" => Jmp,
            "JSR" => Jsr,
            "LDA" => Lda,
            "LDX" => Ldx,
            "LDY" => Ldy,
            "LSR" => Lsr,
            "NOP" => Nop,
            "ORA" => Ora,
            "PHA" => Pha,
            "PHP" => Php,
            "PLA" => Pla,
            "PLP" => Plp,
            "ROL" => Rol,
            "ROR" => Ror,
            "RTI" => Rti,
            "RTS" => Rts,
            "SBC" => Sbc,
            "SEC" => Sec,
            "SED" => Sed,
            "SEI" => Sei,
            "STA" => Sta,
            "STX" => Stx,
            "STY" => Sty,
            "TAX" => Tax,
            "TAY" => Tay,
            "TSX" => Tsx,
            "TXA" => Txa,
            "TXS" => Txs,
            "TYA" => Tya,
            "HLT" => Hlt,
            "OUT" => Out,
            "OUY" => Ouy,
            "IN" => In,
            "WAI" => Wai,
            _ => return Err(()),
        };
        Ok(mn)
    }
}

impl fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Mnemonic {
    pub const ALL: [Mnemonic; 61] = [
        Mnemonic::Adc,
        Mnemonic::And,
        Mnemonic::Asl,
        Mnemonic::Bcc,
        Mnemonic::Bcs,
        Mnemonic::Beq,
        Mnemonic::Bit,
        Mnemonic::Bmi,
        Mnemonic::Bne,
        Mnemonic::Bpl,
        Mnemonic::Brk,
        Mnemonic::Bvc,
        Mnemonic::Bvs,
        Mnemonic::Clc,
        Mnemonic::Cld,
        Mnemonic::Cli,
        Mnemonic::Clv,
        Mnemonic::Cmp,
        Mnemonic::Cpx,
        Mnemonic::Cpy,
        Mnemonic::Dec,
        Mnemonic::Dex,
        Mnemonic::Dey,
        Mnemonic::Eor,
        Mnemonic::Inc,
        Mnemonic::Inx,
        Mnemonic::Iny,
        Mnemonic::Jmp,
        Mnemonic::Jsr,
        Mnemonic::Lda,
        Mnemonic::Ldx,
        Mnemonic::Ldy,
        Mnemonic::Lsr,
        Mnemonic::Nop,
        Mnemonic::Ora,
        Mnemonic::Pha,
        Mnemonic::Php,
        Mnemonic::Pla,
        Mnemonic::Plp,
        Mnemonic::Rol,
        Mnemonic::Ror,
        Mnemonic::Rti,
        Mnemonic::Rts,
        Mnemonic::Sbc,
        Mnemonic::Sec,
        Mnemonic::Sed,
        Mnemonic::Sei,
        Mnemonic::Sta,
        Mnemonic::Stx,
        Mnemonic::Sty,
        Mnemonic::Tax,
        Mnemonic::Tay,
        Mnemonic::Tsx,
        Mnemonic::Txa,
        Mnemonic::Txs,
        Mnemonic::Tya,
        Mnemonic::Hlt,
        Mnemonic::Out,
        Mnemonic::Ouy,
        Mnemonic::In,
        Mnemonic::Wai,
    ];

    pub fn name(self) -> &'static str {
        use Mnemonic::*;
        match self {
            Adc => "ADC",
            And => "AND",
            Asl => "ASL",
            Bcc => "BCC",
            Bcs => "BCS",
            Beq => "BEQ",
            Bit => "BIT",
            Bmi => "BMI",
            Bne => "BNE",
            Bpl => "BPL",
            Brk => "BRK",
            Bvc => "BVC",
            Bvs => "BVS",
            Clc => "CLC",
            Cld => "CLD",
            Cli => "CLI",
            Clv => "CLV",
            Cmp => "CMP",
            Cpx => "CPX",
            Cpy => "CPY",
            Dec => "DEC",
            Dex => "DEX",
            Dey => "DEY",
            Eor => "EOR",
            Inc => "INC",
            Inx => "INX",
            Iny => "INY",
            Jmp => "JMP",
            Jsr => "JSR",
            Lda => "LDA",
            Ldx => "LDX",
            Ldy => "LDY",
            Lsr => "LSR",
            Nop => "NOP",
            Ora => "ORA",
            Pha => "PHA",
            Php => "PHP",
            Pla => "PLA",
            Plp => "PLP",
            Rol => "ROL",
            Ror => "ROR",
            Rti => "RTI",
            Rts => "RTS",
            Sbc => "SBC",
            Sec => "SEC",
            Sed => "SED",
            Sei => "SEI",
            Sta => "STA",
            Stx => "STX",
            Sty => "STY",
            Tax => "TAX",
            Tay => "TAY",
            Tsx => "TSX",
            Txa => "TXA",
            Txs => "TXS",
            Tya => "TYA",
            Hlt => "HLT",
            Out => "OUT",
            Ouy => "OUY",
            In => "IN",
            Wai => "WAI",
        }
    }

    pub fn is_branch(self) -> bool {
        use Mnemonic::*;
        matches!(self, Bcc | Bcs | Beq | Bmi | Bne | Bpl | Bvc | Bvs)
    }

    /// Opcode byte for this mnemonic in the given addressing mode, if the
    /// 6502 has one. This is the single source of truth for both the encoder
    /// and (through [`decode`]) the disassembler.
    pub fn opcode(self, mode: AddrMode) -> Option<u8> {
        use AddrMode::*;
        use Mnemonic::*;
        let byte = match (self, mode) {
            (Adc, Immediate) => 0x69,
            (Adc, ZeroPage) => 0x65,
            (Adc, ZeroPageX) => 0x75,
            (Adc, Absolute) => 0x6D,
            (Adc, AbsoluteX) => 0x7D,
            (Adc, AbsoluteY) => 0x79,
            (Adc, IndirectX) => 0x61,
            (Adc, IndirectY) => 0x71,

            (And, Immediate) => 0x29,
            (And, ZeroPage) => 0x25,
            (And, ZeroPageX) => 0x35,
            (And, Absolute) => 0x2D,
            (And, AbsoluteX) => 0x3D,
            (And, AbsoluteY) => 0x39,
            (And, IndirectX) => 0x21,
            (And, IndirectY) => 0x31,

            (Asl, Accumulator) => 0x0A,
            (Asl, ZeroPage) => 0x06,
            (Asl, ZeroPageX) => 0x16,
            (Asl, Absolute) => 0x0E,
            (Asl, AbsoluteX) => 0x1E,

            (Bcc, Relative) => 0x90,
            (Bcs, Relative) => 0xB0,
            (Beq, Relative) => 0xF0,
            (Bmi, Relative) => 0x30,
            (Bne, Relative) => 0xD0,
            (Bpl, Relative) => 0x10,
            (Bvc, Relative) => 0x50,
            (Bvs, Relative) => 0x70,

            (Bit, ZeroPage) => 0x24,
            (Bit, Absolute) => 0x2C,

            (Brk, Implied) => 0x00,

            (Clc, Implied) => 0x18,
            (Cld, Implied) => 0xD8,
            (Cli, Implied) => 0x58,
            (Clv, Implied) => 0xB8,

            (Cmp, Immediate) => 0xC9,
            (Cmp, ZeroPage) => 0xC5,
            (Cmp, ZeroPageX) => 0xD5,
            (Cmp, Absolute) => 0xCD,
            (Cmp, AbsoluteX) => 0xDD,
            (Cmp, AbsoluteY) => 0xD9,
            (Cmp, IndirectX) => 0xC1,
            (Cmp, IndirectY) => 0xD1,

            (Cpx, Immediate) => 0xE0,
            (Cpx, ZeroPage) => 0xE4,
            (Cpx, Absolute) => 0xEC,

            (Cpy, Immediate) => 0xC0,
            (Cpy, ZeroPage) => 0xC4,
            (Cpy, Absolute) => 0xCC,

            (Dec, ZeroPage) => 0xC6,
            (Dec, ZeroPageX) => 0xD6,
            (Dec, Absolute) => 0xCE,
            (Dec, AbsoluteX) => 0xDE,

            (Dex, Implied) => 0xCA,
            (Dey, Implied) => 0x88,

            (Eor, Immediate) => 0x49,
            (Eor, ZeroPage) => 0x45,
            (Eor, ZeroPageX) => 0x55,
            (Eor, Absolute) => 0x4D,
            (Eor, AbsoluteX) => 0x5D,
            (Eor, AbsoluteY) => 0x59,
            (Eor, IndirectX) => 0x41,
            (Eor, IndirectY) => 0x51,

            (Inc, ZeroPage) => 0xE6,
            (Inc, ZeroPageX) => 0xF6,
            (Inc, Absolute) => 0xEE,
            (Inc, AbsoluteX) => 0xFE,

            (Inx, Implied) => 0xE8,
            (Iny, Implied) => 0xC8,

            (Jmp, Absolute) => 0x4C,
            (Jmp, Indirect) => 0x6C,
            (Jsr, Absolute) => 0x20,

            (Lda, Immediate) => 0xA9,
            (Lda, ZeroPage) => 0xA5,
            (Lda, ZeroPageX) => 0xB5,
            (Lda, Absolute) => 0xAD,
            (Lda, AbsoluteX) => 0xBD,
            (Lda, AbsoluteY) => 0xB9,
            (Lda, IndirectX) => 0xA1,
            (Lda, IndirectY) => 0xB1,

            (Ldx, Immediate) => 0xA2,
            (Ldx, ZeroPage) => 0xA6,
            (Ldx, ZeroPageY) => 0xB6,
            (Ldx, Absolute) => 0xAE,
            (Ldx, AbsoluteY) => 0xBE,

            (Ldy, Immediate) => 0xA0,
            (Ldy, ZeroPage) => 0xA4,
            (Ldy, ZeroPageX) => 0xB4,
            (Ldy, Absolute) => 0xAC,
            (Ldy, AbsoluteX) => 0xBC,

            (Lsr, Accumulator) => 0x4A,
            (Lsr, ZeroPage) => 0x46,
            (Lsr, ZeroPageX) => 0x56,
            (Lsr, Absolute) => 0x4E,
            (Lsr, AbsoluteX) => 0x5E,

            (Nop, Implied) => 0xEA,

            (Ora, Immediate) => 0x09,
            (Ora, ZeroPage) => 0x05,
            (Ora, ZeroPageX) => 0x15,
            (Ora, Absolute) => 0x0D,
            (Ora, AbsoluteX) => 0x1D,
            (Ora, AbsoluteY) => 0x19,
            (Ora, IndirectX) => 0x01,
            (Ora, IndirectY) => 0x11,

            (Pha, Implied) => 0x48,
            (Php, Implied) => 0x08,
            (Pla, Implied) => 0x68,
            (Plp, Implied) => 0x28,

            (Rol, Accumulator) => 0x2A,
            (Rol, ZeroPage) => 0x26,
            (Rol, ZeroPageX) => 0x36,
            (Rol, Absolute) => 0x2E,
            (Rol, AbsoluteX) => 0x3E,

            (Ror, Accumulator) => 0x6A,
            (Ror, ZeroPage) => 0x66,
            (Ror, ZeroPageX) => 0x76,
            (Ror, Absolute) => 0x6E,
            (Ror, AbsoluteX) => 0x7E,

            (Rti, Implied) => 0x40,
            (Rts, Implied) => 0x60,

            (Sbc, Immediate) => 0xE9,
            (Sbc, ZeroPage) => 0xE5,
            (Sbc, ZeroPageX) => 0xF5,
            (Sbc, Absolute) => 0xED,
            (Sbc, AbsoluteX) => 0xFD,
            (Sbc, AbsoluteY) => 0xF9,
            (Sbc, IndirectX) => 0xE1,
            (Sbc, IndirectY) => 0xF1,

            (Sec, Implied) => 0x38,
            (Sed, Implied) => 0xF8,
            (Sei, Implied) => 0x78,

            (Sta, ZeroPage) => 0x85,
            (Sta, ZeroPageX) => 0x95,
            (Sta, Absolute) => 0x8D,
            (Sta, AbsoluteX) => 0x9D,
            (Sta, AbsoluteY) => 0x99,
            (Sta, IndirectX) => 0x81,
            (Sta, IndirectY) => 0x91,

            (Stx, ZeroPage) => 0x86,
            (Stx, ZeroPageY) => 0x96,
            (Stx, Absolute) => 0x8E,

            (Sty, ZeroPage) => 0x84,
            (Sty, ZeroPageX) => 0x94,
            (Sty, Absolute) => 0x8C,

            (Tax, Implied) => 0xAA,
            (Tay, Implied) => 0xA8,
            (Tsx, Implied) => 0xBA,
            (Txa, Implied) => 0x8A,
            (Txs, Implied) => 0x9A,
            (Tya, Implied) => 0x98,

            (Hlt, Implied) => 0x02,
            (Out, Implied) => 0xF2,
            (Ouy, Implied) => 0xFA,
            (In, Implied) => 0xF3,
            (Wai, Implied) => 0xF7,

            _ => return None,
        };
        Some(byte)
    }
}

lazy_static! {
    /// Reverse table, built from the forward table so the two can never
    /// disagree.
    static ref DECODE: [Option<(Mnemonic, AddrMode)>; 256] = {
        let mut table = [None; 256];
        for &mn in Mnemonic::ALL.iter() {
            for &mode in AddrMode::ALL.iter() {
                if let Some(op) = mn.opcode(mode) {
                    table[op as usize] = Some((mn, mode));
                }
            }
        }
        table
    };
}

/// Look an opcode byte back up into its mnemonic and addressing mode.
pub fn decode(byte: u8) -> Option<(Mnemonic, AddrMode)> {
    DECODE[byte as usize]
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn canonical_bytes() {
        assert_eq!(Mnemonic::Lda.opcode(AddrMode::Immediate), Some(0xA9));
        assert_eq!(Mnemonic::Sta.opcode(AddrMode::Absolute), Some(0x8D));
        assert_eq!(Mnemonic::Jmp.opcode(AddrMode::Indirect), Some(0x6C));
        assert_eq!(Mnemonic::Bne.opcode(AddrMode::Relative), Some(0xD0));
        // Store has no immediate form
        assert_eq!(Mnemonic::Sta.opcode(AddrMode::Immediate), None);
    }

    #[test]
    fn table_covers_all_documented_opcodes() {
        let documented = Mnemonic::ALL
            .iter()
            .filter(|mn| !matches!(mn, Mnemonic::Hlt | Mnemonic::Out | Mnemonic::Ouy | Mnemonic::In | Mnemonic::Wai))
            .flat_map(|mn| AddrMode::ALL.iter().filter_map(move |&m| mn.opcode(m)))
            .count();
        assert_eq!(documented, 151);
        let total = (0..=255u8).filter(|&b| decode(b).is_some()).count();
        assert_eq!(total, 156);
    }

    #[test]
    fn decode_round_trips() {
        for &mn in Mnemonic::ALL.iter() {
            for &mode in AddrMode::ALL.iter() {
                if let Some(op) = mn.opcode(mode) {
                    assert_eq!(decode(op), Some((mn, mode)));
                }
            }
        }
        // Gaps in the documented map stay gaps
        assert_eq!(decode(0xFF), None);
        assert_eq!(decode(0x03), None);
    }

    #[test]
    fn mnemonics_parse_case_insensitively() {
        assert_eq!("lda".parse::<Mnemonic>(), Ok(Mnemonic::Lda));
        assert_eq!("LDA".parse::<Mnemonic>(), Ok(Mnemonic::Lda));
        assert_eq!("Ouy".parse::<Mnemonic>(), Ok(Mnemonic::Ouy));
        assert!("LDZ".parse::<Mnemonic>().is_err());
    }
}

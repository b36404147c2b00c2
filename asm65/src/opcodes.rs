//! 6502 opcode tables
//!
//! Every mnemonic carries the set of addressing modes it accepts and one row
//! of the encoding matrix, indexed by [`AddrMode::index`].

use crate::addressing::{AddrMode, MODE_A, MODE_B, ModeSet};

#[rustfmt::skip]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mnemonic {
    Adc, And, Asl, Bcc, Bcs, Beq, Bit, Bmi,
    Bne, Bpl, Brk, Bvc, Bvs, Clc, Cld, Cli,
    Clv, Cmp, Cpx, Cpy, Dec, Dex, Dey, Eor,
    Inc, Inx, Iny, Jmp, Jsr, Lda, Ldx, Ldy,
    Lsr, Nop, Ora, Pha, Php, Pla, Plp, Rol,
    Ror, Rti, Rts, Sbc, Sec, Sed, Sei, Sta,
    Stx, Sty, Tax, Tay, Tsx, Txa, Txs, Tya,
}

use Mnemonic::*;

impl Mnemonic {
    #[rustfmt::skip]
    pub const ALL: [Mnemonic; 56] = [
        Adc, And, Asl, Bcc, Bcs, Beq, Bit, Bmi,
        Bne, Bpl, Brk, Bvc, Bvs, Clc, Cld, Cli,
        Clv, Cmp, Cpx, Cpy, Dec, Dex, Dey, Eor,
        Inc, Inx, Iny, Jmp, Jsr, Lda, Ldx, Ldy,
        Lsr, Nop, Ora, Pha, Php, Pla, Plp, Rol,
        Ror, Rti, Rts, Sbc, Sec, Sed, Sei, Sta,
        Stx, Sty, Tax, Tay, Tsx, Txa, Txs, Tya,
    ];

    /// Looks up a lowercase mnemonic.
    pub fn from_name(name: &str) -> Option<Mnemonic> {
        Self::ALL.into_iter().find(|m| m.name() == name)
    }

    #[rustfmt::skip]
    pub fn name(self) -> &'static str {
        match self {
            Adc => "adc", And => "and", Asl => "asl", Bcc => "bcc",
            Bcs => "bcs", Beq => "beq", Bit => "bit", Bmi => "bmi",
            Bne => "bne", Bpl => "bpl", Brk => "brk", Bvc => "bvc",
            Bvs => "bvs", Clc => "clc", Cld => "cld", Cli => "cli",
            Clv => "clv", Cmp => "cmp", Cpx => "cpx", Cpy => "cpy",
            Dec => "dec", Dex => "dex", Dey => "dey", Eor => "eor",
            Inc => "inc", Inx => "inx", Iny => "iny", Jmp => "jmp",
            Jsr => "jsr", Lda => "lda", Ldx => "ldx", Ldy => "ldy",
            Lsr => "lsr", Nop => "nop", Ora => "ora", Pha => "pha",
            Php => "php", Pla => "pla", Plp => "plp", Rol => "rol",
            Ror => "ror", Rti => "rti", Rts => "rts", Sbc => "sbc",
            Sec => "sec", Sed => "sed", Sei => "sei", Sta => "sta",
            Stx => "stx", Sty => "sty", Tax => "tax", Tay => "tay",
            Tsx => "tsx", Txa => "txa", Txs => "txs", Tya => "tya",
        }
    }

    pub fn is_branch(self) -> bool {
        matches!(self, Bcc | Bcs | Beq | Bmi | Bne | Bpl | Bvc | Bvs)
    }

    /// Shift and rotate instructions, which take the accumulator when no
    /// operand is written.
    pub fn is_shift(self) -> bool {
        matches!(self, Asl | Lsr | Rol | Ror)
    }

    /// Addressing modes the instruction accepts.
    pub fn modes(self) -> ModeSet {
        use AddrMode::*;
        match self {
            Adc | And | Cmp | Eor | Lda | Ora | Sbc => MODE_A,
            Asl | Lsr | Rol | Ror => ModeSet::of(&[Accumulator]).union(MODE_B),
            Bcc | Bcs | Beq | Bmi | Bne | Bpl | Bvc | Bvs => ModeSet::of(&[Relative]),
            Bit => ModeSet::of(&[ZeroPage, Absolute]),
            Cpx | Cpy => ModeSet::of(&[Immediate, ZeroPage, Absolute]),
            Dec | Inc => MODE_B,
            Jmp => ModeSet::of(&[Absolute, Indirect]),
            Jsr => ModeSet::of(&[Absolute]),
            Ldx => ModeSet::of(&[Immediate, ZeroPage, ZeroPageY, Absolute, AbsoluteY]),
            Ldy => ModeSet::of(&[Immediate, ZeroPage, ZeroPageX, Absolute, AbsoluteX]),
            Sta => ModeSet::of(&[ZeroPage, ZeroPageX, Absolute, AbsoluteX, AbsoluteY, IndirectX, IndirectY]),
            Stx => ModeSet::of(&[ZeroPage, ZeroPageY, Absolute]),
            Sty => ModeSet::of(&[ZeroPage, ZeroPageX, Absolute]),
            _ => ModeSet::of(&[Implied]),
        }
    }

    /// Machine code for the mode, `None` where the matrix has no encoding.
    pub fn opcode(self, mode: AddrMode) -> Option<u8> {
        u8::try_from(MACHINE_CODES[self as usize][mode.index()]).ok()
    }
}

const NA: i16 = -1;

// ACC   IMM   ZP    ZPX   ZPY   ABS   ABSX  ABSY  IMPL  REL   INDX  INDY  IND
#[rustfmt::skip]
const MACHINE_CODES: [[i16; 13]; 56] = [
    [NA,   0x69, 0x65, 0x75, NA,   0x6d, 0x7d, 0x79, NA,   NA,   0x61, 0x71, NA  ], // adc
    [NA,   0x29, 0x25, 0x35, NA,   0x2d, 0x3d, 0x39, NA,   NA,   0x21, 0x31, NA  ], // and
    [0x0a, NA,   0x06, 0x16, NA,   0x0e, 0x1e, NA,   NA,   NA,   NA,   NA,   NA  ], // asl
    [NA,   NA,   NA,   NA,   NA,   NA,   NA,   NA,   NA,   0x90, NA,   NA,   NA  ], // bcc
    [NA,   NA,   NA,   NA,   NA,   NA,   NA,   NA,   NA,   0xb0, NA,   NA,   NA  ], // bcs
    [NA,   NA,   NA,   NA,   NA,   NA,   NA,   NA,   NA,   0xf0, NA,   NA,   NA  ], // beq
    [NA,   NA,   0x24, NA,   NA,   0x2c, NA,   NA,   NA,   NA,   NA,   NA,   NA  ], // bit
    [NA,   NA,   NA,   NA,   NA,   NA,   NA,   NA,   NA,   0x30, NA,   NA,   NA  ], // bmi
    [NA,   NA,   NA,   NA,   NA,   NA,   NA,   NA,   NA,   0xd0, NA,   NA,   NA  ], // bne
    [NA,   NA,   NA,   NA,   NA,   NA,   NA,   NA,   NA,   0x10, NA,   NA,   NA  ], // bpl
    [NA,   NA,   NA,   NA,   NA,   NA,   NA,   NA,   0x00, NA,   NA,   NA,   NA  ], // brk
    [NA,   NA,   NA,   NA,   NA,   NA,   NA,   NA,   NA,   0x50, NA,   NA,   NA  ], // bvc
    [NA,   NA,   NA,   NA,   NA,   NA,   NA,   NA,   NA,   0x70, NA,   NA,   NA  ], // bvs
    [NA,   NA,   NA,   NA,   NA,   NA,   NA,   NA,   0x18, NA,   NA,   NA,   NA  ], // clc
    [NA,   NA,   NA,   NA,   NA,   NA,   NA,   NA,   0xd8, NA,   NA,   NA,   NA  ], // cld
    [NA,   NA,   NA,   NA,   NA,   NA,   NA,   NA,   0x58, NA,   NA,   NA,   NA  ], // cli
    [NA,   NA,   NA,   NA,   NA,   NA,   NA,   NA,   0xb8, NA,   NA,   NA,   NA  ], // clv
    [NA,   0xc9, 0xc5, 0xd5, NA,   0xcd, 0xdd, 0xd9, NA,   NA,   0xc1, 0xd1, NA  ], // cmp
    [NA,   0xe0, 0xe4, NA,   NA,   0xec, NA,   NA,   NA,   NA,   NA,   NA,   NA  ], // cpx
    [NA,   0xc0, 0xc4, NA,   NA,   0xcc, NA,   NA,   NA,   NA,   NA,   NA,   NA  ], // cpy
    [NA,   NA,   0xc6, 0xd6, NA,   0xce, 0xde, NA,   NA,   NA,   NA,   NA,   NA  ], // dec
    [NA,   NA,   NA,   NA,   NA,   NA,   NA,   NA,   0xca, NA,   NA,   NA,   NA  ], // dex
    [NA,   NA,   NA,   NA,   NA,   NA,   NA,   NA,   0x88, NA,   NA,   NA,   NA  ], // dey
    [NA,   0x49, 0x45, 0x55, NA,   0x4d, 0x5d, 0x59, NA,   NA,   0x41, 0x51, NA  ], // eor
    [NA,   NA,   0xe6, 0xf6, NA,   0xee, 0xfe, NA,   NA,   NA,   NA,   NA,   NA  ], // inc
    [NA,   NA,   NA,   NA,   NA,   NA,   NA,   NA,   0xe8, NA,   NA,   NA,   NA  ], // inx
    [NA,   NA,   NA,   NA,   NA,   NA,   NA,   NA,   0xc8, NA,   NA,   NA,   NA  ], // iny
    [NA,   NA,   NA,   NA,   NA,   0x4c, NA,   NA,   NA,   NA,   NA,   NA,   0x6c], // jmp
    [NA,   NA,   NA,   NA,   NA,   0x20, NA,   NA,   NA,   NA,   NA,   NA,   NA  ], // jsr
    [NA,   0xa9, 0xa5, 0xb5, NA,   0xad, 0xbd, 0xb9, NA,   NA,   0xa1, 0xb1, NA  ], // lda
    [NA,   0xa2, 0xa6, NA,   0xb6, 0xae, NA,   0xbe, NA,   NA,   NA,   NA,   NA  ], // ldx
    [NA,   0xa0, 0xa4, 0xb4, NA,   0xac, 0xbc, NA,   NA,   NA,   NA,   NA,   NA  ], // ldy
    [0x4a, NA,   0x46, 0x56, NA,   0x4e, 0x5e, NA,   NA,   NA,   NA,   NA,   NA  ], // lsr
    [NA,   NA,   NA,   NA,   NA,   NA,   NA,   NA,   0xea, NA,   NA,   NA,   NA  ], // nop
    [NA,   0x09, 0x05, 0x15, NA,   0x0d, 0x1d, 0x19, NA,   NA,   0x01, 0x11, NA  ], // ora
    [NA,   NA,   NA,   NA,   NA,   NA,   NA,   NA,   0x48, NA,   NA,   NA,   NA  ], // pha
    [NA,   NA,   NA,   NA,   NA,   NA,   NA,   NA,   0x08, NA,   NA,   NA,   NA  ], // php
    [NA,   NA,   NA,   NA,   NA,   NA,   NA,   NA,   0x68, NA,   NA,   NA,   NA  ], // pla
    [NA,   NA,   NA,   NA,   NA,   NA,   NA,   NA,   0x28, NA,   NA,   NA,   NA  ], // plp
    [0x2a, NA,   0x26, 0x36, NA,   0x2e, 0x3e, NA,   NA,   NA,   NA,   NA,   NA  ], // rol
    [0x6a, NA,   0x66, 0x76, NA,   0x6e, 0x7e, NA,   NA,   NA,   NA,   NA,   NA  ], // ror
    [NA,   NA,   NA,   NA,   NA,   NA,   NA,   NA,   0x40, NA,   NA,   NA,   NA  ], // rti
    [NA,   NA,   NA,   NA,   NA,   NA,   NA,   NA,   0x60, NA,   NA,   NA,   NA  ], // rts
    [NA,   0xe9, 0xe5, 0xf5, NA,   0xed, 0xfd, 0xf9, NA,   NA,   0xe1, 0xf1, NA  ], // sbc
    [NA,   NA,   NA,   NA,   NA,   NA,   NA,   NA,   0x38, NA,   NA,   NA,   NA  ], // sec
    [NA,   NA,   NA,   NA,   NA,   NA,   NA,   NA,   0xf8, NA,   NA,   NA,   NA  ], // sed
    [NA,   NA,   NA,   NA,   NA,   NA,   NA,   NA,   0x78, NA,   NA,   NA,   NA  ], // sei
    [NA,   NA,   0x85, 0x95, NA,   0x8d, 0x9d, 0x99, NA,   NA,   0x81, 0x91, NA  ], // sta
    [NA,   NA,   0x86, NA,   0x96, 0x8e, NA,   NA,   NA,   NA,   NA,   NA,   NA  ], // stx
    [NA,   NA,   0x84, 0x94, NA,   0x8c, NA,   NA,   NA,   NA,   NA,   NA,   NA  ], // sty
    [NA,   NA,   NA,   NA,   NA,   NA,   NA,   NA,   0xaa, NA,   NA,   NA,   NA  ], // tax
    [NA,   NA,   NA,   NA,   NA,   NA,   NA,   NA,   0xa8, NA,   NA,   NA,   NA  ], // tay
    [NA,   NA,   NA,   NA,   NA,   NA,   NA,   NA,   0xba, NA,   NA,   NA,   NA  ], // tsx
    [NA,   NA,   NA,   NA,   NA,   NA,   NA,   NA,   0x8a, NA,   NA,   NA,   NA  ], // txa
    [NA,   NA,   NA,   NA,   NA,   NA,   NA,   NA,   0x9a, NA,   NA,   NA,   NA  ], // txs
    [NA,   NA,   NA,   NA,   NA,   NA,   NA,   NA,   0x98, NA,   NA,   NA,   NA  ], // tya
];

#[cfg(test)]
mod tests {
    use super::Mnemonic::*;
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for m in Mnemonic::ALL {
            assert_eq!(Mnemonic::from_name(m.name()), Some(m));
        }
        assert_eq!(Mnemonic::from_name("LDA"), None);
        assert_eq!(Mnemonic::from_name("xyz"), None);
    }

    #[test]
    fn test_modes_match_matrix() {
        for m in Mnemonic::ALL {
            for mode in AddrMode::ALL {
                assert_eq!(
                    m.modes().contains(mode),
                    m.opcode(mode).is_some(),
                    "{} {:?}",
                    m.name(),
                    mode
                );
            }
        }
    }

    #[test]
    fn test_selected_opcodes() {
        assert_eq!(Lda.opcode(AddrMode::Immediate), Some(0xA9));
        assert_eq!(Lda.opcode(AddrMode::Absolute), Some(0xAD));
        assert_eq!(Ldx.opcode(AddrMode::ZeroPageY), Some(0xB6));
        assert_eq!(Stx.opcode(AddrMode::ZeroPageY), Some(0x96));
        assert_eq!(Jmp.opcode(AddrMode::Indirect), Some(0x6C));
        assert_eq!(Brk.opcode(AddrMode::Implied), Some(0x00));
        assert_eq!(Sta.opcode(AddrMode::Immediate), None);
    }

    #[test]
    fn test_branch_and_shift_groups() {
        let branches: Vec<_> = Mnemonic::ALL.into_iter().filter(|m| m.is_branch()).collect();
        assert_eq!(branches.len(), 8);
        assert!(branches.iter().all(|m| m.modes() == ModeSet::of(&[AddrMode::Relative])));
        assert!(Ror.is_shift());
        assert!(!Ror.is_branch());
    }
}

//! Addressing modes and mode sets

/// The 13 operand forms of the 6502, in encoding-matrix column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddrMode {
    Accumulator,
    Immediate,
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    Implied,
    Relative,
    IndirectX,
    IndirectY,
    Indirect,
}

impl AddrMode {
    pub const ALL: [AddrMode; 13] = [
        AddrMode::Accumulator,
        AddrMode::Immediate,
        AddrMode::ZeroPage,
        AddrMode::ZeroPageX,
        AddrMode::ZeroPageY,
        AddrMode::Absolute,
        AddrMode::AbsoluteX,
        AddrMode::AbsoluteY,
        AddrMode::Implied,
        AddrMode::Relative,
        AddrMode::IndirectX,
        AddrMode::IndirectY,
        AddrMode::Indirect,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn bit(self) -> u16 {
        1 << (self as u16)
    }

    /// Instruction length in bytes, opcode included.
    pub const fn size(self) -> u8 {
        match self {
            AddrMode::Accumulator | AddrMode::Implied => 1,
            AddrMode::Absolute | AddrMode::AbsoluteX | AddrMode::AbsoluteY | AddrMode::Indirect => 3,
            _ => 2,
        }
    }

    /// The absolute counterpart of a zero-page mode.
    pub const fn widened(self) -> Option<AddrMode> {
        match self {
            AddrMode::ZeroPage => Some(AddrMode::Absolute),
            AddrMode::ZeroPageX => Some(AddrMode::AbsoluteX),
            AddrMode::ZeroPageY => Some(AddrMode::AbsoluteY),
            _ => None,
        }
    }
}

/// A set of addressing modes as a bitmask, one bit per [`AddrMode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModeSet(u16);

impl ModeSet {
    pub const fn of(modes: &[AddrMode]) -> ModeSet {
        let mut bits = 0;
        let mut i = 0;
        while i < modes.len() {
            bits |= modes[i].bit();
            i += 1;
        }
        ModeSet(bits)
    }

    pub const fn union(self, other: ModeSet) -> ModeSet {
        ModeSet(self.0 | other.0)
    }

    pub const fn contains(self, mode: AddrMode) -> bool {
        self.0 & mode.bit() != 0
    }

    pub fn iter(self) -> impl Iterator<Item = AddrMode> {
        AddrMode::ALL.into_iter().filter(move |mode| self.contains(*mode))
    }
}

/// Operand forms shared by the arithmetic and load group (`adc`, `lda`, ...).
pub const MODE_A: ModeSet = ModeSet::of(&[
    AddrMode::Immediate,
    AddrMode::ZeroPage,
    AddrMode::ZeroPageX,
    AddrMode::Absolute,
    AddrMode::AbsoluteX,
    AddrMode::AbsoluteY,
    AddrMode::IndirectX,
    AddrMode::IndirectY,
]);

/// Memory operand forms of the read-modify-write group (`inc`, `asl`, ...).
pub const MODE_B: ModeSet = ModeSet::of(&[
    AddrMode::ZeroPage,
    AddrMode::ZeroPageX,
    AddrMode::Absolute,
    AddrMode::AbsoluteX,
]);

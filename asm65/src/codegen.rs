//! Instruction encoding
//!
//! Maps a resolved (mnemonic, addressing mode, operand) triple onto its
//! machine bytes. Relative branches are re-expressed as a displacement from
//! the address following the two-byte branch.

use crate::addressing::AddrMode;
use crate::assembler::Pass;
use crate::error::SyntaxError;
use crate::opcodes::Mnemonic;

/// One parsed instruction, ready for encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MachineCode {
    pub mnemonic: Mnemonic,
    pub mode: AddrMode,
    pub operand: i32,
}

impl MachineCode {
    pub fn new(mnemonic: Mnemonic, mode: AddrMode, operand: i32) -> Self {
        Self {
            mnemonic,
            mode,
            operand,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Encoding {
    bytes: [u8; 3],
    size: u8,
}

impl Encoding {
    pub fn size(&self) -> u8 {
        self.size
    }

    /// Opcode followed by 0, 1 or 2 operand bytes, little-endian.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes[..self.size as usize]
    }
}

/// Encodes `code` placed at `ip`.
///
/// Branch distances are only checked in pass 2, when targets are final.
pub fn encode(code: &MachineCode, ip: i32, pass: Pass) -> Result<Encoding, SyntaxError> {
    if !code.mnemonic.modes().contains(code.mode) {
        return Err(SyntaxError::IllegalAddressingMode);
    }
    let opcode = code.mnemonic.opcode(code.mode).ok_or_else(|| {
        SyntaxError::Internal(format!(
            "no encoding for {} in {:?} mode",
            code.mnemonic.name(),
            code.mode
        ))
    })?;
    let operand = match (code.mode, pass) {
        (AddrMode::Relative, Pass::Second) => i32::from(branch_displacement(ip, code.operand)?),
        _ => code.operand,
    };
    Ok(Encoding {
        bytes: [opcode, (operand & 0xff) as u8, ((operand >> 8) & 0xff) as u8],
        size: code.mode.size(),
    })
}

/// Two's complement displacement of a branch at `ip` to `target`.
///
/// The target may lie at most 126 bytes before the branch or 128 bytes
/// after it.
pub fn branch_displacement(ip: i32, target: i32) -> Result<u8, SyntaxError> {
    let next = ip + 2;
    if target < next {
        if ip - target >= 127 {
            return Err(SyntaxError::BranchTooFarBackward);
        }
    } else if target - ip >= 129 {
        return Err(SyntaxError::BranchTooFarForward);
    }
    Ok((target - next) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bytes(mnemonic: Mnemonic, mode: AddrMode, operand: i32) -> Vec<u8> {
        encode(&MachineCode::new(mnemonic, mode, operand), 0x1000, Pass::Second)
            .unwrap()
            .bytes()
            .to_vec()
    }

    #[test]
    fn test_encode_lengths() {
        assert_eq!(bytes(Mnemonic::Lda, AddrMode::Immediate, 0x10), vec![0xA9, 0x10]);
        assert_eq!(bytes(Mnemonic::Lda, AddrMode::Absolute, 0x1234), vec![0xAD, 0x34, 0x12]);
        assert_eq!(bytes(Mnemonic::Asl, AddrMode::Accumulator, 0), vec![0x0A]);
        assert_eq!(bytes(Mnemonic::Rts, AddrMode::Implied, 0), vec![0x60]);
        assert_eq!(bytes(Mnemonic::Jmp, AddrMode::Indirect, 0xFFFC), vec![0x6C, 0xFC, 0xFF]);
        assert_eq!(bytes(Mnemonic::Sta, AddrMode::IndirectY, 0xFB), vec![0x91, 0xFB]);
    }

    #[test]
    fn test_illegal_mode() {
        let code = MachineCode::new(Mnemonic::Sta, AddrMode::Immediate, 1);
        assert_eq!(
            encode(&code, 0x1000, Pass::First),
            Err(SyntaxError::IllegalAddressingMode)
        );
    }

    #[test]
    fn test_branch_range() {
        let ip = 0x1100;
        assert_eq!(branch_displacement(ip, ip - 126), Ok(0x80));
        assert_eq!(branch_displacement(ip, ip - 127), Err(SyntaxError::BranchTooFarBackward));
        assert_eq!(branch_displacement(ip, ip + 128), Ok(0x7E));
        assert_eq!(branch_displacement(ip, ip + 129), Err(SyntaxError::BranchTooFarForward));
        assert_eq!(branch_displacement(ip, ip + 2), Ok(0x00));
        assert_eq!(branch_displacement(ip, ip), Ok(0xFE));
    }

    #[test]
    fn test_branch_checked_in_second_pass_only() {
        let code = MachineCode::new(Mnemonic::Bne, AddrMode::Relative, 0x9000);
        assert_eq!(encode(&code, 0x1000, Pass::First).unwrap().size(), 2);
        assert_eq!(
            encode(&code, 0x1000, Pass::Second),
            Err(SyntaxError::BranchTooFarForward)
        );
        let back = MachineCode::new(Mnemonic::Bne, AddrMode::Relative, 0x0FFE);
        assert_eq!(encode(&back, 0x1000, Pass::Second).unwrap().bytes(), &[0xD0, 0xFC]);
    }
}

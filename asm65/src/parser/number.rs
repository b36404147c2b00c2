//! Numeric literal conversion in the lexer's current radix

use crate::error::LexError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberFormat {
    Hexadecimal, // $ff
    Binary,      // %11111111
    Decimal,     // 255
}

impl NumberFormat {
    /// Radix selected by a prefix character, if it is one.
    pub fn from_prefix(c: u8) -> Option<NumberFormat> {
        match c {
            b'$' => Some(NumberFormat::Hexadecimal),
            b'%' => Some(NumberFormat::Binary),
            _ => None,
        }
    }

    pub fn radix(self) -> u32 {
        match self {
            NumberFormat::Hexadecimal => 16,
            NumberFormat::Binary => 2,
            NumberFormat::Decimal => 10,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            NumberFormat::Hexadecimal => "hexadecimal",
            NumberFormat::Binary => "binary",
            NumberFormat::Decimal => "decimal",
        }
    }

    /// Whether `c` (already case-folded) is a digit in this radix.
    pub fn is_digit(self, c: u8) -> bool {
        (c as char).is_digit(self.radix())
    }
}

pub struct NumberParser;

impl NumberParser {
    /// Parse the digits of a literal (without prefix) in the given format.
    pub fn parse(digits: &str, format: NumberFormat) -> Result<i32, LexError> {
        i32::from_str_radix(digits, format.radix())
            .map_err(|_| LexError::MalformedNumber(digits.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_format() {
        assert_eq!(NumberParser::parse("ff", NumberFormat::Hexadecimal).unwrap(), 255);
        assert_eq!(NumberParser::parse("1234", NumberFormat::Hexadecimal).unwrap(), 0x1234);
        assert_eq!(NumberParser::parse("10000", NumberFormat::Hexadecimal).unwrap(), 0x10000);
    }

    #[test]
    fn test_binary_format() {
        assert_eq!(NumberParser::parse("11111111", NumberFormat::Binary).unwrap(), 255);
        assert_eq!(NumberParser::parse("10101010", NumberFormat::Binary).unwrap(), 0xAA);
    }

    #[test]
    fn test_decimal() {
        assert_eq!(NumberParser::parse("0", NumberFormat::Decimal).unwrap(), 0);
        assert_eq!(NumberParser::parse("65535", NumberFormat::Decimal).unwrap(), 65535);
    }

    #[test]
    fn test_overflow_is_malformed() {
        assert_eq!(
            NumberParser::parse("99999999999", NumberFormat::Decimal),
            Err(LexError::MalformedNumber("99999999999".to_string()))
        );
    }

    #[test]
    fn test_prefix_detection() {
        assert_eq!(NumberFormat::from_prefix(b'$'), Some(NumberFormat::Hexadecimal));
        assert_eq!(NumberFormat::from_prefix(b'%'), Some(NumberFormat::Binary));
        assert_eq!(NumberFormat::from_prefix(b'1'), None);
        assert!(NumberFormat::Hexadecimal.is_digit(b'f'));
        assert!(!NumberFormat::Binary.is_digit(b'2'));
        assert!(!NumberFormat::Decimal.is_digit(b'a'));
    }
}

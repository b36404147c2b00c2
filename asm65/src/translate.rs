//! ASCII to Commodore 64 screen code translation for character data

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AsciiTranslation {
    #[default]
    None,
    /// Upper case character set: both cases map onto the letters 1..26.
    Upper,
    /// Lower case character set: only lowercase letters are remapped.
    Lower,
}

impl AsciiTranslation {
    pub fn translate(self, c: u8) -> u8 {
        match (self, c) {
            (AsciiTranslation::None, _) => c,
            (AsciiTranslation::Upper, b'A'..=b'Z') => c - 64,
            (_, b'a'..=b'z') => c - 96,
            (_, b'@') => 0,
            (_, b'[') => 27,
            (_, b']') => 29,
            _ => c,
        }
    }

    pub fn translate_all(self, chars: &[u8]) -> Vec<u8> {
        chars.iter().map(|&c| self.translate(c)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_is_identity() {
        assert_eq!(AsciiTranslation::None.translate_all(b"Hi@["), b"Hi@[".to_vec());
    }

    #[test]
    fn test_upper() {
        assert_eq!(AsciiTranslation::Upper.translate_all(b"HELLO"), vec![8, 5, 12, 12, 15]);
        assert_eq!(AsciiTranslation::Upper.translate_all(b"hello"), vec![8, 5, 12, 12, 15]);
        assert_eq!(AsciiTranslation::Upper.translate_all(b"@[] 1"), vec![0, 27, 29, b' ', b'1']);
    }

    #[test]
    fn test_lower() {
        assert_eq!(AsciiTranslation::Lower.translate_all(b"Ab"), vec![b'A', 2]);
        assert_eq!(AsciiTranslation::Lower.translate(b'@'), 0);
    }
}

//! Anonymous `@` labels
//!
//! Pass 1 records the address of every `@` per lexical nesting level. Pass 2
//! resolves `@f`/`@+` to the nearest recorded address after the current
//! instruction and `@b`/`@-` to the nearest one at or before it.

use crate::symbol::LEVEL_LIMIT;

#[derive(Debug, Clone)]
pub struct TempLabels {
    levels: Vec<Vec<i32>>,
}

impl TempLabels {
    pub fn new() -> Self {
        Self {
            levels: vec![Vec::new(); LEVEL_LIMIT],
        }
    }

    pub fn record(&mut self, level: usize, address: i32) {
        if let Some(addresses) = self.levels.get_mut(level) {
            addresses.push(address);
        }
    }

    /// Addresses recorded at `level`, in source order.
    pub fn level(&self, level: usize) -> &[i32] {
        self.levels.get(level).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Labels recorded over all levels.
    pub fn count(&self) -> usize {
        self.levels.iter().map(Vec::len).sum()
    }
}

impl Default for TempLabels {
    fn default() -> Self {
        Self::new()
    }
}

/// First recorded address past `ip`.
pub fn resolve_forward(addresses: &[i32], ip: i32) -> Option<i32> {
    addresses.iter().copied().find(|&address| address > ip)
}

/// Last recorded address at or before `ip`. Falls back to the last address
/// of the level when every label lies ahead.
pub fn resolve_backward(addresses: &[i32], ip: i32) -> Option<i32> {
    addresses
        .iter()
        .copied()
        .rev()
        .find(|&address| address <= ip)
        .or_else(|| addresses.last().copied())
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECORDED: [i32; 3] = [0x1000, 0x1010, 0x1020];

    #[test]
    fn test_forward() {
        assert_eq!(resolve_forward(&RECORDED, 0x1005), Some(0x1010));
        assert_eq!(resolve_forward(&RECORDED, 0x1010), Some(0x1020));
        assert_eq!(resolve_forward(&RECORDED, 0x0fff), Some(0x1000));
        assert_eq!(resolve_forward(&RECORDED, 0x1020), None);
    }

    #[test]
    fn test_backward() {
        assert_eq!(resolve_backward(&RECORDED, 0x1015), Some(0x1010));
        assert_eq!(resolve_backward(&RECORDED, 0x1010), Some(0x1010));
        assert_eq!(resolve_backward(&RECORDED, 0x2000), Some(0x1020));
        assert_eq!(resolve_backward(&RECORDED, 0x0f00), Some(0x1020));
        assert_eq!(resolve_backward(&[], 0x1000), None);
    }

    #[test]
    fn test_levels_are_separate() {
        let mut labels = TempLabels::new();
        labels.record(0, 0x1000);
        labels.record(1, 0x1004);
        labels.record(1, 0x1008);
        assert_eq!(labels.level(0), &[0x1000]);
        assert_eq!(labels.level(1), &[0x1004, 0x1008]);
        assert_eq!(labels.level(LEVEL_LIMIT), &[] as &[i32]);
        assert_eq!(labels.count(), 3);
    }
}

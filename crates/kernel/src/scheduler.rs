//! Priority ready set.

/// Ready priorities as a 64-bit mask; bit `p` set means priority `p` has a
/// pending job. Priorities outside the mask are ignored.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReadySet(u64);

impl ReadySet {
    pub const fn new() -> Self {
        Self(0)
    }

    fn bit(priority: u8) -> u64 {
        1u64.checked_shl(u32::from(priority)).unwrap_or(0)
    }

    pub fn insert(&mut self, priority: u8) {
        self.0 |= Self::bit(priority);
    }

    pub fn remove(&mut self, priority: u8) {
        self.0 &= !Self::bit(priority);
    }

    pub fn contains(&self, priority: u8) -> bool {
        self.0 & Self::bit(priority) != 0
    }

    /// Highest ready priority, `None` when nothing is ready.
    pub fn max(&self) -> Option<u8> {
        // 64 leading zeros means an empty mask.
        63u8.checked_sub(self.0.leading_zeros() as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_picks_highest_priority() {
        let mut ready = ReadySet::new();
        assert_eq!(ready.max(), None);

        ready.insert(3);
        ready.insert(7);
        ready.insert(1);
        assert_eq!(ready.max(), Some(7));

        ready.remove(7);
        assert_eq!(ready.max(), Some(3));
        assert!(ready.contains(1));
        assert!(!ready.contains(7));
    }

    #[test]
    fn top_and_bottom_levels() {
        let mut ready = ReadySet::new();
        ready.insert(0);
        assert_eq!(ready.max(), Some(0));
        ready.insert(63);
        assert_eq!(ready.max(), Some(63));
        ready.remove(63);
        ready.remove(0);
        assert_eq!(ready.max(), None);
    }

    #[test]
    fn priorities_past_the_mask_are_ignored() {
        let mut ready = ReadySet::new();
        ready.insert(64);
        assert!(!ready.contains(64));
        assert_eq!(ready.max(), None);
    }
}

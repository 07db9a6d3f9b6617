//! Adaptive threshold block-size search.

/// Invalid block-size bounds.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockSizeError {
    #[error("block size bounds [{min}, {max}] are empty after rounding to odd values")]
    EmptyRange { min: u32, max: u32 },
    #[error("minimum block size {0} is below 3")]
    TooSmall(u32),
}

/// Walks the threshold window across `[min, max]` while nothing is found.
///
/// The value is always odd and inside the bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockSizeController {
    current: u32,
    min: u32,
    max: u32,
}

impl BlockSizeController {
    /// Bounds are rounded inward to odd values. Starts at the odd midpoint.
    pub fn new(min: u32, max: u32) -> Result<Self, BlockSizeError> {
        let lo = min | 1;
        let hi = if max % 2 == 1 { max } else { max.saturating_sub(1) };
        if lo < 3 {
            return Err(BlockSizeError::TooSmall(min));
        }
        if lo > hi {
            return Err(BlockSizeError::EmptyRange { min, max });
        }

        let current = ((lo + hi) / 2) | 1;
        Ok(Self {
            current: current.min(hi),
            min: lo,
            max: hi,
        })
    }

    #[inline]
    pub fn current(&self) -> u32 {
        self.current
    }

    #[inline]
    pub fn bounds(&self) -> (u32, u32) {
        (self.min, self.max)
    }

    /// Feed back the candidate count of the last frame; returns the block
    /// size for the next one.
    pub fn observe(&mut self, candidates: usize) -> u32 {
        if candidates == 0 {
            let next = self.current + 2;
            self.current = if next > self.max { self.min } else { next };
            log::debug!("no candidates, block size -> {}", self.current);
        }
        self.current
    }

    /// Manual tuning by `steps` increments of 2, clamped to the bounds.
    pub fn nudge(&mut self, steps: i32) -> u32 {
        let next = self.current as i64 + 2 * steps as i64;
        self.current = next.clamp(self.min as i64, self.max as i64) as u32;
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_odd_midpoint() {
        assert_eq!(BlockSizeController::new(3, 21).unwrap().current(), 13);
        assert_eq!(BlockSizeController::new(3, 23).unwrap().current(), 13);
        assert_eq!(BlockSizeController::new(5, 5).unwrap().current(), 5);
        let c = BlockSizeController::new(4, 10).unwrap();
        assert_eq!(c.bounds(), (5, 9));
        assert_eq!(c.current(), 7);
    }

    #[test]
    fn zero_candidates_step_and_wrap() {
        let mut c = BlockSizeController::new(3, 21).unwrap();
        assert_eq!(c.observe(0), 15);
        assert_eq!(c.observe(2), 15);
        assert_eq!(c.observe(0), 17);
        assert_eq!(c.observe(0), 19);
        assert_eq!(c.observe(0), 21);
        assert_eq!(c.observe(0), 3);
    }

    #[test]
    fn stays_odd_and_in_bounds() {
        let mut c = BlockSizeController::new(3, 11).unwrap();
        for i in 0..50 {
            let v = if i % 7 == 0 { c.nudge(-3) } else { c.observe(i % 3) };
            assert_eq!(v % 2, 1);
            assert!((3..=11).contains(&v));
        }
        assert_eq!(c.nudge(-100), 3);
        assert_eq!(c.nudge(100), 11);
    }

    #[test]
    fn invalid_bounds() {
        assert_eq!(
            BlockSizeController::new(1, 21),
            Err(BlockSizeError::TooSmall(1))
        );
        assert_eq!(
            BlockSizeController::new(21, 3),
            Err(BlockSizeError::EmptyRange { min: 21, max: 3 })
        );
        assert!(BlockSizeController::new(8, 8).is_err());
    }
}

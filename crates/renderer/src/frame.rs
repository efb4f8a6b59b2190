//! Frame-in-flight index.

/// Cyclic counter over `[0, count)` selecting the frame slot and the
/// per-frame uniform buffer for the current iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameIndex {
    current: usize,
    count: usize,
}

impl FrameIndex {
    /// Create an index over `count` frames in flight (at least one).
    pub fn new(count: usize) -> Self {
        Self {
            current: 0,
            count: count.max(1),
        }
    }

    /// Get the current frame index.
    #[inline]
    pub fn current(&self) -> usize {
        self.current
    }

    /// Number of frames in flight.
    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    /// Advance to the next frame.
    pub fn advance(&mut self) {
        self.current = (self.current + 1) % self.count;
    }
}

impl Default for FrameIndex {
    fn default() -> Self {
        Self::new(crate::DEFAULT_FRAMES_IN_FLIGHT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_cycles() {
        let mut index = FrameIndex::new(3);
        let mut seen = Vec::new();
        for _ in 0..7 {
            seen.push(index.current());
            index.advance();
        }
        assert_eq!(seen, vec![0, 1, 2, 0, 1, 2, 0]);
    }

    #[test]
    fn test_zero_count_clamped() {
        let mut index = FrameIndex::new(0);
        assert_eq!(index.count(), 1);
        index.advance();
        assert_eq!(index.current(), 0);
    }

    #[test]
    fn test_default_is_double_buffered() {
        assert_eq!(FrameIndex::default().count(), 2);
    }
}

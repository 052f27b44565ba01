// SPDX-License-Identifier: PMPL-1.0-or-later
//
// RDB Codec - Sequence generator
//
// Backs sequence-id cells, which never touch the byte stream on read. The
// generator is owned by whoever calls `Record::read` and is restarted once
// per read pass, so independent reads never share counter state.

/// Monotonic counter used to synthesize identity values while reading.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SequenceGenerator {
    /// Value restored by [`SequenceGenerator::restart`].
    origin: i32,
    /// Last value handed out (or the reset point).
    current: i32,
}

impl SequenceGenerator {
    /// A generator whose first `next()` returns 1.
    pub fn new() -> Self {
        Self::default()
    }

    /// A generator that restarts at `origin`, so the first `next()` after a
    /// restart returns `origin + 1`.
    pub fn starting_at(origin: i32) -> Self {
        Self {
            origin,
            current: origin,
        }
    }

    /// Reset the counter to `start`.
    pub fn reset(&mut self, start: i32) {
        self.current = start;
    }

    /// Reset the counter to the configured origin.
    pub fn restart(&mut self) {
        self.current = self.origin;
    }

    /// Pre-increment and return the new value.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> i32 {
        self.current = self.current.wrapping_add(1);
        self.current
    }

    /// Decrement and return the new value, never going below zero.
    pub fn previous(&mut self) -> i32 {
        self.current = self.current.saturating_sub(1).max(0);
        self.current
    }

    /// The most recently issued value.
    pub fn current(&self) -> i32 {
        self.current
    }

    /// The value `restart` returns to.
    pub fn origin(&self) -> i32 {
        self.origin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_pre_increments() {
        let mut sequence = SequenceGenerator::new();
        assert_eq!(sequence.next(), 1);
        assert_eq!(sequence.next(), 2);
        assert_eq!(sequence.current(), 2);
    }

    #[test]
    fn test_reset_and_restart() {
        let mut sequence = SequenceGenerator::starting_at(100);
        assert_eq!(sequence.next(), 101);
        sequence.reset(0);
        assert_eq!(sequence.next(), 1);
        sequence.restart();
        assert_eq!(sequence.current(), 100);
        assert_eq!(sequence.origin(), 100);
    }

    #[test]
    fn test_previous_floors_at_zero() {
        let mut sequence = SequenceGenerator::new();
        sequence.next();
        assert_eq!(sequence.previous(), 0);
        assert_eq!(sequence.previous(), 0);
    }
}

//! # Fibonacci Backoff
//!
//! Retry intervals that grow along the Fibonacci sequence: min, min, 2×min,
//! 3×min, 5×min, ... capped at max. All values are in seconds.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FibonacciBackoff {
    min_secs: u64,
    max_secs: u64,
    previous: u64,
    current: u64,
}

impl FibonacciBackoff {
    pub fn new(min_secs: u64, max_secs: u64) -> Self {
        let min_secs = min_secs.max(1);
        Self {
            min_secs,
            max_secs: max_secs.max(min_secs),
            previous: 0,
            current: min_secs,
        }
    }

    /// Return the current interval and advance the sequence
    pub fn next_backoff_seconds(&mut self) -> u64 {
        let result = self.current.min(self.max_secs);
        if self.current < self.max_secs {
            let next = self.previous.saturating_add(self.current);
            self.previous = self.current;
            self.current = next;
        }
        result
    }

    pub fn reset(&mut self) {
        self.previous = 0;
        self.current = self.min_secs;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence() {
        let mut backoff = FibonacciBackoff::new(5, 300);
        let sequence: Vec<u64> = (0..10).map(|_| backoff.next_backoff_seconds()).collect();
        assert_eq!(sequence, vec![5, 5, 10, 15, 25, 40, 65, 105, 170, 275]);
        assert_eq!(backoff.next_backoff_seconds(), 300);
        assert_eq!(backoff.next_backoff_seconds(), 300);
    }

    #[test]
    fn test_reset() {
        let mut backoff = FibonacciBackoff::new(5, 300);
        backoff.next_backoff_seconds();
        backoff.next_backoff_seconds();
        backoff.next_backoff_seconds();
        backoff.reset();
        assert_eq!(backoff.next_backoff_seconds(), 5);
    }

    #[test]
    fn test_degenerate_bounds() {
        let mut backoff = FibonacciBackoff::new(0, 0);
        assert_eq!(backoff.next_backoff_seconds(), 1);
        assert_eq!(backoff.next_backoff_seconds(), 1);
    }
}

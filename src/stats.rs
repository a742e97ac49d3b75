//! Diagnostic counters handed to an external reporting layer.

use std::time::Duration;

use num_bigint::BigUint;
use num_traits::ToPrimitive;

/// Construction counters of a transition system.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    /// Decision variables allocated so far (all pools).
    pub variables: usize,
    pub states: usize,
    pub edges: usize,
    pub layer_times: Vec<Duration>,
}

impl Diagnostics {
    pub fn layers(&self) -> usize {
        self.layer_times.len()
    }

    pub fn total_time(&self) -> Duration {
        self.layer_times.iter().sum()
    }
}

/// Counters of one search or fixed-point run.
#[derive(Debug, Clone, Default)]
pub struct SearchStats {
    pub iterations: usize,
    pub layer_times: Vec<Duration>,
    /// Product states expanded (or won, for games).
    pub visited: usize,
}

/// Saturating conversion of a model count.
pub fn count_to_usize(count: &BigUint) -> usize {
    count.to_usize().unwrap_or(usize::MAX)
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_count_conversion_saturates() {
        assert_eq!(count_to_usize(&BigUint::from(42u32)), 42);
        let huge = BigUint::from(1u32) << 200;
        assert_eq!(count_to_usize(&huge), usize::MAX);
    }

    #[test]
    fn test_total_time() {
        let d = Diagnostics {
            layer_times: vec![Duration::from_millis(2), Duration::from_millis(3)],
            ..Default::default()
        };
        assert_eq!(d.layers(), 2);
        assert_eq!(d.total_time(), Duration::from_millis(5));
    }
}

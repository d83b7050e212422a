//! Buffer pool usage counters.

use std::fmt;

/// Cumulative buffer pool counters.
///
/// Purely observational. The pool bumps them as it works and never reads
/// them back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BufferStats {
    /// Pages handed to callers, hits and misses alike.
    pub accesses: u64,
    /// Pages read from a page store.
    pub disk_reads: u64,
    /// Pages written to a page store (eviction, flush and teardown).
    pub disk_writes: u64,
}

impl BufferStats {
    /// Fraction of accesses served without a disk read, or `None` before
    /// the first access.
    pub fn hit_ratio(&self) -> Option<f64> {
        if self.accesses == 0 {
            return None;
        }
        let hits = self.accesses.saturating_sub(self.disk_reads);
        Some(hits as f64 / self.accesses as f64)
    }
}

impl fmt::Display for BufferStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "accesses: {}, disk reads: {}, disk writes: {}",
            self.accesses, self.disk_reads, self.disk_writes
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_ratio() {
        let mut stats = BufferStats::default();
        assert_eq!(stats.hit_ratio(), None);

        stats.accesses = 4;
        stats.disk_reads = 1;
        assert_eq!(stats.hit_ratio(), Some(0.75));
    }

    #[test]
    fn test_display() {
        let stats = BufferStats {
            accesses: 3,
            disk_reads: 2,
            disk_writes: 1,
        };
        assert_eq!(
            stats.to_string(),
            "accesses: 3, disk reads: 2, disk writes: 1"
        );
    }
}

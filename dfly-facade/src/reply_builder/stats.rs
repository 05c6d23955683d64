//! Per-connection reply statistics.

use std::ops::AddAssign;

/// Hot-path hash map used for per-connection counters.
pub type HotMap<K, V> = hashbrown::HashMap<K, V>;

/// Snapshot of one builder's I/O and error counters.
///
/// Snapshots from many connections can be summed with `+=` to build thread-level totals.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplyStats {
    /// Number of successful sink writes.
    pub io_write_cnt: usize,
    /// Bytes transferred by those writes.
    pub io_write_bytes: usize,
    /// Error replies grouped by error-type label.
    pub err_count: HotMap<String, u64>,
}

impl AddAssign<&ReplyStats> for ReplyStats {
    fn add_assign(&mut self, other: &ReplyStats) {
        self.io_write_cnt += other.io_write_cnt;
        self.io_write_bytes += other.io_write_bytes;
        for (kind, count) in &other.err_count {
            if let Some(total) = self.err_count.get_mut(kind.as_str()) {
                *total += count;
            } else {
                self.err_count.insert(kind.clone(), *count);
            }
        }
    }
}

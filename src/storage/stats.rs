//! Storage statistics tracking.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// I/O and allocation counters kept by the data access layer.
///
/// All fields are atomic: readers holding the shared lock bump
/// `pages_read` concurrently. `Relaxed` ordering is enough since the
/// counters are independent and only ever summed for display.
///
/// # Example
/// ```
/// use luffydb::StorageStats;
/// use std::sync::atomic::Ordering;
///
/// let stats = StorageStats::new();
/// stats.pages_read.fetch_add(1, Ordering::Relaxed);
/// assert_eq!(stats.snapshot().pages_read, 1);
/// ```
#[derive(Debug)]
pub struct StorageStats {
    /// Number of pages read from disk.
    pub pages_read: AtomicU64,

    /// Number of pages written to disk.
    pub pages_written: AtomicU64,

    /// Number of page numbers handed out by the free list.
    pub pages_allocated: AtomicU64,

    /// Number of page numbers returned to the free list.
    pub pages_released: AtomicU64,
}

impl StorageStats {
    /// Create a new stats tracker with all counters at zero.
    pub fn new() -> Self {
        Self {
            pages_read: AtomicU64::new(0),
            pages_written: AtomicU64::new(0),
            pages_allocated: AtomicU64::new(0),
            pages_released: AtomicU64::new(0),
        }
    }

    #[inline]
    pub(crate) fn record_read(&self) {
        self.pages_read.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_write(&self) {
        self.pages_written.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_allocation(&self) {
        self.pages_allocated.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_release(&self) {
        self.pages_released.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of current statistics.
    ///
    /// This returns a non-atomic copy for display/logging.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            pages_read: self.pages_read.load(Ordering::Relaxed),
            pages_written: self.pages_written.load(Ordering::Relaxed),
            pages_allocated: self.pages_allocated.load(Ordering::Relaxed),
            pages_released: self.pages_released.load(Ordering::Relaxed),
        }
    }

    /// Reset all counters to zero.
    pub fn reset(&self) {
        self.pages_read.store(0, Ordering::Relaxed);
        self.pages_written.store(0, Ordering::Relaxed);
        self.pages_allocated.store(0, Ordering::Relaxed);
        self.pages_released.store(0, Ordering::Relaxed);
    }
}

impl Default for StorageStats {
    fn default() -> Self {
        Self::new()
    }
}

/// A point-in-time snapshot of storage statistics.
///
/// Unlike `StorageStats`, this is not atomic and can be safely
/// printed, compared, subtracted, etc.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    pub pages_read: u64,
    pub pages_written: u64,
    pub pages_allocated: u64,
    pub pages_released: u64,
}

impl StatsSnapshot {
    /// Counters accumulated since an earlier snapshot.
    pub fn since(&self, earlier: &StatsSnapshot) -> StatsSnapshot {
        StatsSnapshot {
            pages_read: self.pages_read.saturating_sub(earlier.pages_read),
            pages_written: self.pages_written.saturating_sub(earlier.pages_written),
            pages_allocated: self.pages_allocated.saturating_sub(earlier.pages_allocated),
            pages_released: self.pages_released.saturating_sub(earlier.pages_released),
        }
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Stats {{ read: {}, written: {}, allocated: {}, released: {} }}",
            self.pages_read, self.pages_written, self.pages_allocated, self.pages_released
        )
    }
}

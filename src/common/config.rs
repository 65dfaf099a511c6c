//! Configuration for LuffyDB.
//!
//! Layout constants shared by the codecs live here next to [`Options`],
//! since the derived thresholds depend on both.

use crate::common::{Error, PageId, Result};

/// Default size of a page in bytes (4KB).
///
/// Matches the OS page size on the platforms we target, so one node or
/// meta record maps onto one memory page.
pub const DEFAULT_PAGE_SIZE: usize = 4096;

/// Smallest page size accepted by [`Options::validate`].
pub const MIN_PAGE_SIZE: usize = 256;

/// Largest page size accepted by [`Options::validate`].
///
/// In-page item offsets are stored as `u16`.
pub const MAX_PAGE_SIZE: usize = 1 << 16;

/// Default lower fill fraction.
pub const DEFAULT_MIN_FILL_PERCENT: f32 = 0.5;

/// Default upper fill fraction.
pub const DEFAULT_MAX_FILL_PERCENT: f32 = 0.95;

/// Node header: 1 byte leaf flag + 2 byte item count.
pub const NODE_HEADER_SIZE: usize = 3;

/// Size of an in-page item offset.
pub const OFFSET_SIZE: usize = 2;

/// Size of a key or value length prefix.
pub const LEN_PREFIX_SIZE: usize = 2;

/// Size of a serialized page number.
pub const PAGE_NUM_SIZE: usize = PageId::SIZE;

/// Smallest item budget we are willing to run with.
const MIN_ELEMENT_SIZE: usize = 16;

/// Tunables consumed by the store.
///
/// # Example
/// ```
/// use luffydb::Options;
///
/// let options = Options {
///     page_size: 8192,
///     ..Options::default()
/// };
/// assert!(options.validate().is_ok());
/// assert_eq!(options.max_threshold(), 0.95 * 8192.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Options {
    /// Size of every page in the file, in bytes.
    pub page_size: usize,
    /// Fraction of a page below which a node counts as underpopulated.
    /// Also the target for the left half of a split.
    pub min_fill_percent: f32,
    /// Fraction of a page above which a node is split.
    pub max_fill_percent: f32,
}

impl Options {
    /// Check that the options describe a usable store.
    pub fn validate(&self) -> Result<()> {
        if !(MIN_PAGE_SIZE..=MAX_PAGE_SIZE).contains(&self.page_size) {
            return Err(Error::InvalidOptions(format!(
                "page_size must be within {}..={}, got {}",
                MIN_PAGE_SIZE, MAX_PAGE_SIZE, self.page_size
            )));
        }

        let (min, max) = (self.min_fill_percent, self.max_fill_percent);
        if !(min > 0.0 && max < 1.0 && min < max) {
            return Err(Error::InvalidOptions(format!(
                "fill fractions must satisfy 0 < min < max < 1, got min={} max={}",
                min, max
            )));
        }

        if self.max_element_size() < MIN_ELEMENT_SIZE {
            return Err(Error::InvalidOptions(format!(
                "page_size {} with min={} max={} leaves no room for items",
                self.page_size, min, max
            )));
        }

        Ok(())
    }

    /// Minimum number of bytes a node should occupy.
    #[inline]
    pub fn min_threshold(&self) -> f32 {
        self.min_fill_percent * self.page_size as f32
    }

    /// Maximum number of bytes a node may occupy before it is split.
    #[inline]
    pub fn max_threshold(&self) -> f32 {
        self.max_fill_percent * self.page_size as f32
    }

    /// Largest encoded element (item plus its offset and, in internal
    /// nodes, its child pointer) that `put` accepts.
    ///
    /// Two such elements never overpopulate a node, so a node that needs
    /// splitting has at least three items. An element this size also fits
    /// under the min threshold, which bounds the right half of a split by
    /// the max threshold.
    pub fn max_element_size(&self) -> usize {
        let fixed = (NODE_HEADER_SIZE + PAGE_NUM_SIZE) as f32;
        let pair = (self.max_threshold() - fixed) / 2.0;
        let single = self.min_threshold() - fixed;
        pair.min(single).max(0.0) as usize
    }
}

impl Default for Options {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            min_fill_percent: DEFAULT_MIN_FILL_PERCENT,
            max_fill_percent: DEFAULT_MAX_FILL_PERCENT,
        }
    }
}

//! Free list - page number allocation and reuse.
//!
//! The [`FreeList`] hands out page numbers. Released pages are reused
//! (LIFO) before the file grows past its high-water mark.

use crate::common::config::PAGE_NUM_SIZE;
use crate::common::{Error, PageId, Result};

/// Tracks the highest page ever granted and a stack of released pages.
///
/// # Layout
/// ```text
/// Offset  Size       Field
/// ------  ---------  -----
/// 0       8          max_page (little-endian)
/// 8       2          released count (little-endian)
/// 10      count × 8  released page numbers
/// ```
///
/// # Invariants
/// Every released page was previously granted and is not reachable from
/// any tree. [`release`](FreeList::release) trusts the caller on this:
/// releasing a page twice, or a page still in use, corrupts the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreeList {
    /// Highest page number granted so far. Page 0 (meta) counts as granted.
    max_page: u64,
    /// Pages available for reuse, most recently released last.
    released: Vec<PageId>,
}

impl FreeList {
    const OFFSET_MAX_PAGE: usize = 0;
    const OFFSET_COUNT: usize = 8;
    const OFFSET_RELEASED: usize = 10;

    /// Create an empty free list for a fresh file.
    pub fn new() -> Self {
        Self {
            max_page: PageId::META.0,
            released: Vec::new(),
        }
    }

    /// Hand out a page number, reusing a released one if any.
    pub fn next_page(&mut self) -> PageId {
        if let Some(page) = self.released.pop() {
            return page;
        }
        self.max_page += 1;
        PageId::new(self.max_page)
    }

    /// Return a page number for reuse.
    pub fn release(&mut self, page: PageId) {
        debug_assert!(
            !page.is_meta() && page.0 <= self.max_page,
            "releasing {} which was never granted",
            page
        );
        self.released.push(page);
    }

    /// Highest page number granted so far.
    #[inline]
    pub fn max_page(&self) -> PageId {
        PageId::new(self.max_page)
    }

    /// Pages currently waiting for reuse.
    #[inline]
    pub fn released(&self) -> &[PageId] {
        &self.released
    }

    /// Number of released page numbers a page of `page_size` bytes can hold.
    ///
    /// Also bounded by the 2-byte count field.
    pub fn capacity(page_size: usize) -> usize {
        (page_size.saturating_sub(Self::OFFSET_RELEASED) / PAGE_NUM_SIZE).min(u16::MAX as usize)
    }

    /// Write the free list into the start of `buf`.
    ///
    /// # Errors
    /// [`Error::FreeListOverflow`] if the released pages don't fit.
    pub fn serialize(&self, buf: &mut [u8]) -> Result<()> {
        let capacity = Self::capacity(buf.len());
        if self.released.len() > capacity {
            return Err(Error::FreeListOverflow {
                count: self.released.len(),
                capacity,
            });
        }

        buf[Self::OFFSET_MAX_PAGE..Self::OFFSET_COUNT].copy_from_slice(&self.max_page.to_le_bytes());
        buf[Self::OFFSET_COUNT..Self::OFFSET_RELEASED]
            .copy_from_slice(&(self.released.len() as u16).to_le_bytes());

        let mut pos = Self::OFFSET_RELEASED;
        for page in &self.released {
            buf[pos..pos + PAGE_NUM_SIZE].copy_from_slice(&page.0.to_le_bytes());
            pos += PAGE_NUM_SIZE;
        }

        Ok(())
    }

    /// Read a free list from the start of `buf`.
    ///
    /// # Errors
    /// [`Error::CorruptedMeta`] if `buf` is too short for the header or its
    /// count claims more pages than `buf` can hold.
    pub fn deserialize(buf: &[u8]) -> Result<Self> {
        if buf.len() < Self::OFFSET_RELEASED {
            return Err(Error::CorruptedMeta(format!(
                "free list page of {} bytes can't hold its header",
                buf.len()
            )));
        }

        let max_page = read_u64(buf, Self::OFFSET_MAX_PAGE);
        let count = u16::from_le_bytes([buf[Self::OFFSET_COUNT], buf[Self::OFFSET_COUNT + 1]]) as usize;

        let capacity = Self::capacity(buf.len());
        if count > capacity {
            return Err(Error::CorruptedMeta(format!(
                "free list claims {} released pages but its page fits only {}",
                count, capacity
            )));
        }

        let released = (0..count)
            .map(|i| PageId::new(read_u64(buf, Self::OFFSET_RELEASED + i * PAGE_NUM_SIZE)))
            .collect();

        Ok(Self { max_page, released })
    }
}

impl Default for FreeList {
    fn default() -> Self {
        Self::new()
    }
}

fn read_u64(buf: &[u8], pos: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&buf[pos..pos + 8]);
    u64::from_le_bytes(bytes)
}

//! Page - the fundamental unit of storage.
//!
//! A [`Page`] pairs a page number with a buffer of exactly `page_size`
//! bytes. Its content is opaque at this level: the meta record, the free
//! list and B-tree nodes each interpret the bytes themselves.

use crate::common::PageId;

/// A page of data.
///
/// The buffer length is fixed at construction to the store's configured
/// page size and never changes.
///
/// # Clone Implementation
/// `Page` does NOT implement `Clone` in production code; copying a page is
/// rare and should be explicit. A `#[cfg(test)]` Clone is provided for tests.
///
/// # Example
/// ```
/// use luffydb::{Page, PageId};
///
/// let mut page = Page::new(PageId::new(3), 4096);
/// page.as_mut_slice()[0] = 0xFF;
/// assert_eq!(page.as_slice()[0], 0xFF);
/// assert_eq!(page.len(), 4096);
/// ```
pub struct Page {
    id: PageId,
    data: Box<[u8]>,
}

impl Page {
    /// Create a new zeroed page.
    pub fn new(id: PageId, page_size: usize) -> Self {
        Self {
            id,
            data: vec![0u8; page_size].into_boxed_slice(),
        }
    }

    /// The page number this buffer belongs to.
    #[inline]
    pub fn id(&self) -> PageId {
        self.id
    }

    /// Get immutable slice of page data.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Get mutable slice of page data.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Size of the page in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Always false for a page built by [`Page::new`] with a valid size.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

// Clone only available in tests - forces explicit copying in production
#[cfg(test)]
impl Clone for Page {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            data: self.data.clone(),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

//! Page identifier type.

use std::fmt;

/// Identifies a page in the database file.
///
/// Page `N` lives at byte offset `N * page_size`. The identifier is a full
/// `u64` and is serialized as 8 little-endian bytes everywhere it appears on
/// disk (meta record, free list, node child pointers).
///
/// Page 0 is reserved for the meta record, so `0` doubles as "no page" in
/// on-disk pointers (an empty collection stores root `0`).
///
/// # Example
/// ```
/// use luffydb::PageId;
///
/// let page_id = PageId::new(42);
/// assert!(!page_id.is_meta());
/// assert_eq!(page_id.0, 42);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId(pub u64);

impl PageId {
    /// The page holding the meta record.
    pub const META: PageId = PageId(0);

    /// Size of a serialized page identifier in bytes.
    pub const SIZE: usize = 8;

    /// Create a new PageId.
    #[inline]
    pub fn new(id: u64) -> Self {
        PageId(id)
    }

    /// Check if this is the meta page.
    #[inline]
    pub fn is_meta(&self) -> bool {
        *self == Self::META
    }

    /// Byte offset of this page in a file with the given page size.
    #[inline]
    pub fn offset(&self, page_size: usize) -> u64 {
        self.0 * page_size as u64
    }

    /// Decode an on-disk pointer, mapping `0` to `None`.
    #[inline]
    pub fn from_disk(raw: u64) -> Option<Self> {
        if raw == 0 {
            None
        } else {
            Some(PageId(raw))
        }
    }

    /// Encode an optional pointer for disk, mapping `None` to `0`.
    #[inline]
    pub fn to_disk(page: Option<Self>) -> u64 {
        page.map_or(0, |p| p.0)
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_meta() {
            write!(f, "Page(META)")
        } else {
            write!(f, "Page({})", self.0)
        }
    }
}

//! Meta record - the bootstrap record on page 0.
//!
//! Opening a store starts here: the [`Meta`] record says where the free
//! list image lives and where the collection catalog's root is.

use crate::common::{Error, PageId, Result};

/// The single record stored on page 0.
///
/// # Layout (24 bytes, rest of the page zero)
/// ```text
/// Offset  Size  Field
/// ------  ----  -----
/// 0       8     freelist_page (little-endian)
/// 8       8     catalog root page, 0 when empty (little-endian)
/// 16      4     page_size the file was created with (little-endian)
/// 20      4     CRC32 of bytes 0..20 (little-endian)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Meta {
    /// Page holding the free list image.
    pub freelist_page: PageId,
    /// Root of the collection catalog tree, if any collection exists.
    pub root: Option<PageId>,
    /// Page size recorded at creation.
    pub page_size: u32,
}

impl Meta {
    /// Size of the record in bytes.
    pub const SIZE: usize = 24;

    pub const OFFSET_FREELIST: usize = 0;
    pub const OFFSET_ROOT: usize = 8;
    pub const OFFSET_PAGE_SIZE: usize = 16;
    pub const OFFSET_CHECKSUM: usize = 20;

    /// Create a meta record for a fresh file.
    pub fn new(freelist_page: PageId, page_size: usize) -> Self {
        Self {
            freelist_page,
            root: None,
            page_size: page_size as u32,
        }
    }

    /// Write the record (with checksum) to the start of `buf`.
    ///
    /// # Panics
    /// Panics if `buf.len() < Meta::SIZE`.
    pub fn serialize(&self, buf: &mut [u8]) {
        assert!(buf.len() >= Self::SIZE, "buffer too small for Meta");

        buf[Self::OFFSET_FREELIST..Self::OFFSET_ROOT]
            .copy_from_slice(&self.freelist_page.0.to_le_bytes());
        buf[Self::OFFSET_ROOT..Self::OFFSET_PAGE_SIZE]
            .copy_from_slice(&PageId::to_disk(self.root).to_le_bytes());
        buf[Self::OFFSET_PAGE_SIZE..Self::OFFSET_CHECKSUM]
            .copy_from_slice(&self.page_size.to_le_bytes());

        let checksum = Self::compute_checksum(buf);
        buf[Self::OFFSET_CHECKSUM..Self::SIZE].copy_from_slice(&checksum.to_le_bytes());
    }

    /// Read and validate a record from the start of `buf`.
    ///
    /// # Errors
    /// [`Error::CorruptedMeta`] if the checksum doesn't match or the free
    /// list pointer is nonsensical.
    pub fn deserialize(buf: &[u8]) -> Result<Self> {
        if buf.len() < Self::SIZE {
            return Err(Error::CorruptedMeta(format!(
                "page of {} bytes can't hold the meta record",
                buf.len()
            )));
        }

        let stored = u32::from_le_bytes(field(buf, Self::OFFSET_CHECKSUM));
        let computed = Self::compute_checksum(buf);
        if stored != computed {
            return Err(Error::CorruptedMeta(format!(
                "checksum mismatch: stored {:#010x}, computed {:#010x}",
                stored, computed
            )));
        }

        let freelist_page = PageId::new(u64::from_le_bytes(field(buf, Self::OFFSET_FREELIST)));
        if freelist_page.is_meta() {
            return Err(Error::CorruptedMeta("free list points at page 0".into()));
        }

        Ok(Self {
            freelist_page,
            root: PageId::from_disk(u64::from_le_bytes(field(buf, Self::OFFSET_ROOT))),
            page_size: u32::from_le_bytes(field(buf, Self::OFFSET_PAGE_SIZE)),
        })
    }

    /// CRC32 over the record fields, excluding the checksum itself.
    pub fn compute_checksum(buf: &[u8]) -> u32 {
        crc32fast::hash(&buf[..Self::OFFSET_CHECKSUM])
    }
}

fn field<const N: usize>(buf: &[u8], pos: usize) -> [u8; N] {
    let mut bytes = [0u8; N];
    bytes.copy_from_slice(&buf[pos..pos + N]);
    bytes
}

// ============================================================================
// TESTS
// ============================================================================

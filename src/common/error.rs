//! Error types for LuffyDB.

use thiserror::Error;

use crate::common::PageId;

/// Convenient Result type alias.
///
/// Instead of writing `Result<T, Error>` everywhere, we can write `Result<T>`.
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors in LuffyDB.
///
/// A key that is not present is *not* an error: lookups return `Ok(None)`.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from a positioned read or write on the backing file.
    ///
    /// Short reads past the end of the file land here as well
    /// (`UnexpectedEof`).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The supplied [`Options`](crate::Options) are unusable.
    #[error("invalid options: {0}")]
    InvalidOptions(String),

    /// A mutating operation was attempted while holding only the reader lock.
    #[error("can't perform a write operation inside a read transaction")]
    WriteInsideReadTx,

    /// The encoded item would not leave room for a split.
    #[error("item of {size} bytes exceeds the maximum of {max} bytes")]
    ItemTooLarge { size: usize, max: usize },

    /// A node page could not be decoded.
    #[error("corrupted node on {page}: {reason}")]
    CorruptedNode { page: PageId, reason: String },

    /// The meta record on page 0 failed validation.
    #[error("corrupted meta page: {0}")]
    CorruptedMeta(String),

    /// The file was created with a different page size.
    #[error("page size mismatch: file uses {stored} bytes, options ask for {configured}")]
    PageSizeMismatch { stored: usize, configured: usize },

    /// Too many released pages to serialize the free list into one page.
    #[error("free list holds {count} released pages but a page fits only {capacity}")]
    FreeListOverflow { count: usize, capacity: usize },

    /// `create_collection` was called with a name already in the catalog.
    #[error("collection {0:?} already exists")]
    CollectionExists(String),

    /// The store handle has been closed.
    #[error("database is closed")]
    Closed,
}

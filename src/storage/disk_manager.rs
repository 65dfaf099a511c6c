//! Disk Manager - low-level file I/O for database pages.
//!
//! The [`DiskManager`] handles all direct file operations:
//! - Reading and writing pages at `page_number * page_size`
//! - Opening (or creating) the database file
//! - Closing the file handle

use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;

use crate::common::{Error, PageId, Result};
use crate::storage::page::Page;

/// Manages disk I/O for a single database file.
///
/// # File Layout
/// The database is stored as a single file with pages laid out sequentially:
/// ```text
/// ┌─────────┬─────────┬─────────┬─────────┬─────────┐
/// │ Page 0  │ Page 1  │ Page 2  │  ...    │ Page N  │
/// │ (meta)  │ (free)  │ (node)  │         │         │
/// └─────────┴─────────┴─────────┴─────────┴─────────┘
/// Offset:  0        P       2P      ...      N×P
/// ```
///
/// Page N is located at file offset `N × page_size`.
///
/// # Thread Safety
/// Reads are positioned (`pread`-style) and take `&self`, so any number of
/// readers can share the manager. Writes take `&mut self`; the store's
/// reader/writer lock serializes them.
///
/// # Durability
/// Writes are plain positioned writes with no `fsync()`; the file is synced
/// once on [`close`](DiskManager::close). A crash between two page writes
/// can leave the file torn.
pub struct DiskManager {
    /// `None` once the manager has been closed.
    file: Option<File>,
    page_size: usize,
}

impl DiskManager {
    /// Open a database file, creating it if it doesn't exist.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or created.
    pub fn open_or_create<P: AsRef<Path>>(path: P, page_size: usize) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        Ok(Self {
            file: Some(file),
            page_size,
        })
    }

    /// Size of each page in bytes.
    #[inline]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Whether the manager has been closed.
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.file.is_none()
    }

    /// Whether the backing file holds no data yet.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.file()?.metadata()?.len() == 0)
    }

    /// Number of whole pages currently in the file.
    pub fn page_count(&self) -> Result<u64> {
        Ok(self.file()?.metadata()?.len() / self.page_size as u64)
    }

    /// Read a page from disk.
    ///
    /// # Errors
    /// Any failed or short read is returned as [`Error::Io`]; reading past
    /// the end of the file yields `UnexpectedEof`.
    pub fn read_page(&self, page_id: PageId) -> Result<Page> {
        let file = self.file()?;

        let mut page = Page::new(page_id, self.page_size);
        read_exact_at(file, page.as_mut_slice(), page_id.offset(self.page_size))?;

        Ok(page)
    }

    /// Write a page to disk at the offset given by its number.
    ///
    /// Writing past the current end of the file extends it.
    pub fn write_page(&mut self, page: &Page) -> Result<()> {
        debug_assert_eq!(page.len(), self.page_size, "page buffer size mismatch");

        let offset = page.id().offset(self.page_size);
        let file = self.file()?;
        write_all_at(file, page.as_slice(), offset)?;

        Ok(())
    }

    /// Sync and release the file handle.
    ///
    /// Closing an already-closed manager is a no-op.
    pub fn close(&mut self) -> Result<()> {
        if let Some(file) = self.file.take() {
            file.sync_all()?;
        }
        Ok(())
    }

    fn file(&self) -> Result<&File> {
        self.file.as_ref().ok_or(Error::Closed)
    }
}

#[cfg(unix)]
fn read_exact_at(file: &File, buf: &mut [u8], offset: u64) -> io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.read_exact_at(buf, offset)
}

#[cfg(unix)]
fn write_all_at(file: &File, buf: &[u8], offset: u64) -> io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.write_all_at(buf, offset)
}

#[cfg(windows)]
fn read_exact_at(file: &File, mut buf: &mut [u8], mut offset: u64) -> io::Result<()> {
    use std::os::windows::fs::FileExt;
    while !buf.is_empty() {
        match file.seek_read(buf, offset) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "failed to fill whole buffer",
                ))
            }
            Ok(n) => {
                buf = &mut buf[n..];
                offset += n as u64;
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

#[cfg(windows)]
fn write_all_at(file: &File, mut buf: &[u8], mut offset: u64) -> io::Result<()> {
    use std::os::windows::fs::FileExt;
    while !buf.is_empty() {
        match file.seek_write(buf, offset) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "failed to write whole buffer",
                ))
            }
            Ok(n) => {
                buf = &buf[n..];
                offset += n as u64;
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

//! Store handle.

use std::path::{Path, PathBuf};

use parking_lot::RwLock;

use crate::common::{Options, Result};
use crate::storage::{Dal, StatsSnapshot};
use crate::tx::Tx;

/// An open database file.
///
/// All access goes through transactions. The whole store sits behind one
/// reader/writer lock: read transactions share it, a write transaction
/// holds it alone.
///
/// # Thread Safety
/// `Db` is `Send + Sync`; share it with `Arc<Db>`.
///
/// # Example
/// ```no_run
/// use luffydb::{Db, Options};
///
/// let db = Db::open("my_database.db", Options::default()).unwrap();
/// {
///     let mut tx = db.write_tx();
///     let mut c = tx.create_collection(b"c").unwrap();
///     c.put(&mut tx, b"key", b"value").unwrap();
/// }
/// db.close().unwrap();
/// ```
pub struct Db {
    dal: RwLock<Dal>,
    path: PathBuf,
}

impl Db {
    /// Open the store at `path`, creating and initializing the file if it
    /// is missing or empty.
    ///
    /// # Errors
    /// - [`Error::InvalidOptions`](crate::Error::InvalidOptions) for bad options
    /// - [`Error::CorruptedMeta`](crate::Error::CorruptedMeta) or
    ///   [`Error::PageSizeMismatch`](crate::Error::PageSizeMismatch) if an
    ///   existing file can't be used with `options`
    /// - I/O errors
    pub fn open<P: AsRef<Path>>(path: P, options: Options) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let dal = Dal::open(&path, options)?;
        Ok(Self {
            dal: RwLock::new(dal),
            path,
        })
    }

    /// Flush pending metadata and release the file.
    ///
    /// Waits for running transactions. Closing twice is a no-op; any other
    /// use after close fails with [`Error::Closed`](crate::Error::Closed).
    pub fn close(&self) -> Result<()> {
        self.dal.write().close()
    }

    /// Start a read transaction, blocking while a writer holds the store.
    pub fn read_tx(&self) -> Tx<'_> {
        Tx::read(self.dal.read())
    }

    /// Start a write transaction, blocking until the store is free.
    pub fn write_tx(&self) -> Tx<'_> {
        Tx::write(self.dal.write())
    }

    /// I/O counters since open, or since the last
    /// [`reset_stats`](Db::reset_stats).
    pub fn stats(&self) -> StatsSnapshot {
        self.dal.read().stats().snapshot()
    }

    /// Zero the I/O counters.
    pub fn reset_stats(&self) {
        self.dal.read().stats().reset();
        tracing::debug!(path = %self.path.display(), "reset storage stats");
    }

    pub fn options(&self) -> Options {
        *self.dal.read().options()
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl std::fmt::Debug for Db {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Db").field("path", &self.path).finish_non_exhaustive()
    }
}

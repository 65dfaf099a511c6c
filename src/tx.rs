//! Transactions - scoped access to the store.
//!
//! - A read [`Tx`] holds the store's shared lock; any number may coexist.
//! - A write [`Tx`] holds the exclusive lock.
//!
//! Either lock is released when the `Tx` is dropped.

use parking_lot::{RwLockReadGuard, RwLockWriteGuard};

use crate::collection::Collection;
use crate::common::{Error, PageId, Result};
use crate::storage::Dal;

enum Guard<'db> {
    Read(RwLockReadGuard<'db, Dal>),
    Write(RwLockWriteGuard<'db, Dal>),
}

/// A read or write transaction over a [`Db`](crate::Db).
///
/// Created by [`Db::read_tx`](crate::Db::read_tx) or
/// [`Db::write_tx`](crate::Db::write_tx). There is no commit or rollback:
/// every write goes straight to the file.
///
/// # Example
/// ```ignore
/// let tx = db.read_tx();
/// let users = tx.get_collection(b"users")?;
/// // tx drops here, read lock released
/// ```
pub struct Tx<'db> {
    guard: Guard<'db>,
}

impl<'db> Tx<'db> {
    pub(crate) fn read(lock: RwLockReadGuard<'db, Dal>) -> Self {
        tracing::trace!("read tx started");
        Self {
            guard: Guard::Read(lock),
        }
    }

    pub(crate) fn write(lock: RwLockWriteGuard<'db, Dal>) -> Self {
        tracing::trace!("write tx started");
        Self {
            guard: Guard::Write(lock),
        }
    }

    #[inline]
    pub fn is_writable(&self) -> bool {
        matches!(self.guard, Guard::Write(_))
    }

    pub(crate) fn dal(&self) -> Result<&Dal> {
        let dal: &Dal = match &self.guard {
            Guard::Read(lock) => lock,
            Guard::Write(lock) => lock,
        };
        if dal.is_closed() {
            return Err(Error::Closed);
        }
        Ok(dal)
    }

    pub(crate) fn dal_mut(&mut self) -> Result<&mut Dal> {
        match &mut self.guard {
            Guard::Read(_) => Err(Error::WriteInsideReadTx),
            Guard::Write(lock) if lock.is_closed() => Err(Error::Closed),
            Guard::Write(lock) => Ok(&mut **lock),
        }
    }

    /// Register an empty collection called `name`.
    ///
    /// # Errors
    /// - [`Error::WriteInsideReadTx`] on a read transaction
    /// - [`Error::CollectionExists`] if the name is taken
    pub fn create_collection(&mut self, name: &[u8]) -> Result<Collection> {
        let dal = self.dal_mut()?;
        let mut catalog = catalog(dal);

        if catalog.lookup(dal, name)?.is_some() {
            return Err(Error::CollectionExists(
                String::from_utf8_lossy(name).into_owned(),
            ));
        }

        catalog.insert(dal, name, &PageId::to_disk(None).to_le_bytes())?;
        dal.set_root(catalog.root());
        dal.flush_metadata()?;

        tracing::debug!(name = %String::from_utf8_lossy(name), "created collection");
        Ok(Collection::new(name, None))
    }

    /// Look up the collection called `name`.
    pub fn get_collection(&self, name: &[u8]) -> Result<Option<Collection>> {
        let dal = self.dal()?;
        let Some(entry) = catalog(dal).lookup(dal, name)? else {
            return Ok(None);
        };

        let raw: [u8; PageId::SIZE] = entry.value.as_slice().try_into().map_err(|_| {
            Error::CorruptedMeta(format!(
                "catalog entry for {:?} holds {} bytes",
                String::from_utf8_lossy(name),
                entry.value.len()
            ))
        })?;
        let root = PageId::from_disk(u64::from_le_bytes(raw));
        Ok(Some(Collection::new(name, root)))
    }

    /// Record a collection's current root in the catalog.
    pub(crate) fn save_collection(&mut self, collection: &Collection) -> Result<()> {
        let dal = self.dal_mut()?;
        let mut catalog = catalog(dal);
        catalog.insert(
            dal,
            collection.name(),
            &PageId::to_disk(collection.root()).to_le_bytes(),
        )?;
        dal.set_root(catalog.root());
        Ok(())
    }

    /// Return `page` to the free list.
    ///
    /// The page must not be reachable from any tree, and must not be
    /// released twice; neither is checked.
    ///
    /// # Errors
    /// - [`Error::WriteInsideReadTx`] on a read transaction
    /// - [`Error::FreeListOverflow`] if the free list page is full; the
    ///   page is not released
    pub fn release_page(&mut self, page: PageId) -> Result<()> {
        let dal = self.dal_mut()?;
        dal.release_page(page)?;
        dal.flush_metadata()
    }
}

impl Drop for Tx<'_> {
    fn drop(&mut self) {
        tracing::trace!(writable = self.is_writable(), "tx finished");
    }
}

/// The catalog tree, rooted at the meta record.
fn catalog(dal: &Dal) -> Collection {
    Collection::new(Vec::new(), dal.root())
}

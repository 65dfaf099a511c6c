//! Data access layer - pages, allocation and bootstrap in one place.
//!
//! The [`Dal`] owns the [`DiskManager`], the [`FreeList`] and the [`Meta`]
//! record as named fields and forwards their operations, so the B-tree only
//! ever talks to one object.

use std::path::Path;

use crate::btree::{codec, Item, Node};
use crate::common::{Error, Options, PageId, Result};
use crate::storage::disk_manager::DiskManager;
use crate::storage::freelist::FreeList;
use crate::storage::meta::Meta;
use crate::storage::page::Page;
use crate::storage::stats::StorageStats;

/// Page-level access to one open database file.
///
/// # Lifecycle
/// - [`open`](Dal::open) on an empty file writes a fresh meta record (page
///   0) and free list (page 1).
/// - [`open`](Dal::open) on an existing file reads and validates both.
/// - Allocations and root changes mark the free list / meta dirty in
///   memory; [`flush_metadata`](Dal::flush_metadata) writes them back.
pub struct Dal {
    disk: DiskManager,
    options: Options,
    freelist: FreeList,
    meta: Meta,
    stats: StorageStats,
    freelist_dirty: bool,
    meta_dirty: bool,
}

impl Dal {
    /// Open (or create) the database file at `path`.
    ///
    /// # Errors
    /// - [`Error::InvalidOptions`] if `options` fail validation
    /// - [`Error::CorruptedMeta`] / [`Error::PageSizeMismatch`] for an
    ///   existing file that doesn't match
    /// - I/O errors from the file
    pub fn open<P: AsRef<Path>>(path: P, options: Options) -> Result<Self> {
        options.validate()?;

        let disk = DiskManager::open_or_create(path.as_ref(), options.page_size)?;
        let fresh = disk.is_empty()?;

        let mut dal = Self {
            disk,
            options,
            freelist: FreeList::new(),
            meta: Meta::new(PageId::META, options.page_size),
            stats: StorageStats::new(),
            freelist_dirty: false,
            meta_dirty: false,
        };

        if fresh {
            dal.initialize()?;
            tracing::info!(path = %path.as_ref().display(), page_size = options.page_size, "initialized new database");
        } else {
            dal.load()?;
            tracing::info!(
                path = %path.as_ref().display(),
                file_pages = dal.disk.page_count()?,
                max_page = dal.freelist.max_page().0,
                released = dal.freelist.released().len(),
                "opened database"
            );
        }

        Ok(dal)
    }

    fn initialize(&mut self) -> Result<()> {
        let freelist_page = self.next_page();
        self.meta = Meta::new(freelist_page, self.options.page_size);
        self.freelist_dirty = true;
        self.meta_dirty = true;
        self.flush_metadata()
    }

    fn load(&mut self) -> Result<()> {
        self.meta = self.read_meta()?;

        let stored = self.meta.page_size as usize;
        if stored != self.options.page_size {
            return Err(Error::PageSizeMismatch {
                stored,
                configured: self.options.page_size,
            });
        }

        self.freelist = self.read_freelist()?;
        Ok(())
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[inline]
    pub fn options(&self) -> &Options {
        &self.options
    }

    #[inline]
    pub fn stats(&self) -> &StorageStats {
        &self.stats
    }

    #[inline]
    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    #[inline]
    pub fn freelist(&self) -> &FreeList {
        &self.freelist
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.disk.is_closed()
    }

    /// Root of the collection catalog.
    #[inline]
    pub fn root(&self) -> Option<PageId> {
        self.meta.root
    }

    /// Point the meta record at a new catalog root.
    pub fn set_root(&mut self, root: Option<PageId>) {
        if self.meta.root != root {
            self.meta.root = root;
            self.meta_dirty = true;
        }
    }

    // ========================================================================
    // Pages
    // ========================================================================

    /// A zeroed, page-sized buffer for page `id`.
    pub fn allocate_empty_page(&self, id: PageId) -> Page {
        Page::new(id, self.options.page_size)
    }

    pub fn read_page(&self, id: PageId) -> Result<Page> {
        let page = self.disk.read_page(id)?;
        self.stats.record_read();
        Ok(page)
    }

    pub fn write_page(&mut self, page: &Page) -> Result<()> {
        self.disk.write_page(page)?;
        self.stats.record_write();
        Ok(())
    }

    // ========================================================================
    // Free list
    // ========================================================================

    /// Hand out a page number, reusing released pages first.
    pub fn next_page(&mut self) -> PageId {
        let page = self.freelist.next_page();
        self.freelist_dirty = true;
        self.stats.record_allocation();
        tracing::trace!(%page, "allocated page");
        page
    }

    /// Return a page number for reuse.
    ///
    /// The caller must not release a page twice or one still reachable
    /// from a tree.
    ///
    /// # Errors
    /// [`Error::FreeListOverflow`] if the free list page is already full;
    /// the list is left unchanged.
    pub fn release_page(&mut self, page: PageId) -> Result<()> {
        let count = self.freelist.released().len();
        let capacity = FreeList::capacity(self.options.page_size);
        if count >= capacity {
            return Err(Error::FreeListOverflow {
                count: count + 1,
                capacity,
            });
        }

        self.freelist.release(page);
        self.freelist_dirty = true;
        self.stats.record_release();
        tracing::trace!(%page, "released page");
        Ok(())
    }

    fn read_freelist(&self) -> Result<FreeList> {
        let page = self.read_page(self.meta.freelist_page)?;
        FreeList::deserialize(page.as_slice())
    }

    fn write_freelist(&mut self) -> Result<()> {
        let mut page = self.allocate_empty_page(self.meta.freelist_page);
        self.freelist.serialize(page.as_mut_slice())?;
        self.write_page(&page)?;
        tracing::debug!(
            page = %self.meta.freelist_page,
            max_page = self.freelist.max_page().0,
            released = self.freelist.released().len(),
            "wrote free list"
        );
        Ok(())
    }

    // ========================================================================
    // Meta
    // ========================================================================

    fn read_meta(&self) -> Result<Meta> {
        let page = self.read_page(PageId::META)?;
        Meta::deserialize(page.as_slice())
    }

    fn write_meta(&mut self) -> Result<()> {
        let mut page = self.allocate_empty_page(PageId::META);
        self.meta.serialize(page.as_mut_slice());
        self.write_page(&page)
    }

    /// Write back the free list and the meta record if they changed.
    ///
    /// The free list goes first so the meta record never points at a stale
    /// image.
    pub fn flush_metadata(&mut self) -> Result<()> {
        if self.freelist_dirty {
            self.write_freelist()?;
            self.freelist_dirty = false;
        }
        if self.meta_dirty {
            self.write_meta()?;
            self.meta_dirty = false;
        }
        Ok(())
    }

    // ========================================================================
    // Nodes
    // ========================================================================

    /// Build a node on a freshly allocated page. Nothing is written.
    pub fn new_node(&mut self, items: Vec<Item>, children: Vec<PageId>) -> Node {
        let page = self.next_page();
        Node::new(page, items, children)
    }

    /// Read and decode the node on `page`.
    pub fn get_node(&self, page: PageId) -> Result<Node> {
        let page = self.read_page(page)?;
        codec::decode(&page)
    }

    /// Encode and write `node` to its page.
    pub fn write_node(&mut self, node: &Node) -> Result<()> {
        let mut page = self.allocate_empty_page(node.page);
        codec::encode(node, page.as_mut_slice());
        self.write_page(&page)
    }

    /// Reject items too large to keep the tree splittable.
    pub fn check_item(&self, item: &Item) -> Result<()> {
        let size = item.element_size(false);
        let max = self.options.max_element_size();
        if size > max {
            return Err(Error::ItemTooLarge { size, max });
        }
        Ok(())
    }

    // ========================================================================
    // Shutdown
    // ========================================================================

    /// Flush pending metadata and release the file. Idempotent.
    pub fn close(&mut self) -> Result<()> {
        if self.disk.is_closed() {
            return Ok(());
        }
        self.flush_metadata()?;
        self.disk.close()
    }
}

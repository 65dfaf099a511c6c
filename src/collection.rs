//! Collections - named B-trees inside one store.
//!
//! A [`Collection`] is just a name and a root page. All reads and writes
//! go through a [`Tx`], which holds the store lock for their duration.

use std::fmt;

use crate::btree::{Item, Node};
use crate::common::{PageId, Result};
use crate::storage::Dal;
use crate::tx::Tx;

/// A named B-tree.
///
/// Obtained from [`Tx::create_collection`] or [`Tx::get_collection`]. The
/// handle caches the root page, so use it within the transaction that
/// produced it; another writer may move the root afterwards.
///
/// Keep one handle per collection at a time. When a `put` through one
/// handle grows the tree, other handles to the same collection still point
/// at the old root; a `put` through them would write that stale root back
/// to the catalog. Debug builds catch this in [`put`](Collection::put).
///
/// # Example
/// ```no_run
/// use luffydb::{Db, Options};
///
/// let db = Db::open("my_database.db", Options::default()).unwrap();
///
/// let mut tx = db.write_tx();
/// let mut users = tx.create_collection(b"users").unwrap();
/// users.put(&mut tx, b"alice", b"admin").unwrap();
///
/// let item = users.find(&tx, b"alice").unwrap().unwrap();
/// assert_eq!(item.value, b"admin");
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Collection {
    name: Vec<u8>,
    root: Option<PageId>,
}

/// Nodes visited on the way down to the insertion point.
struct InsertionPath {
    /// Root first, target last.
    nodes: Vec<Node>,
    /// `child_indexes[i]` is the slot of `nodes[i]` in `nodes[i - 1]`.
    /// Entry 0 (the root) is unused.
    child_indexes: Vec<usize>,
    /// Position of the key in the target node.
    index: usize,
    /// Whether the target node already holds the key.
    found: bool,
}

impl Collection {
    pub(crate) fn new(name: impl Into<Vec<u8>>, root: Option<PageId>) -> Self {
        Self {
            name: name.into(),
            root,
        }
    }

    #[inline]
    pub fn name(&self) -> &[u8] {
        &self.name
    }

    /// Page of the top node, `None` while the collection is empty.
    #[inline]
    pub fn root(&self) -> Option<PageId> {
        self.root
    }

    /// Look up `key`.
    ///
    /// A missing key is `Ok(None)`; errors come only from page reads.
    pub fn find(&self, tx: &Tx<'_>, key: &[u8]) -> Result<Option<Item>> {
        self.lookup(tx.dal()?, key)
    }

    /// Insert `key` or overwrite its value.
    ///
    /// # Errors
    /// - [`Error::WriteInsideReadTx`](crate::Error::WriteInsideReadTx) on a
    ///   read transaction
    /// - [`Error::ItemTooLarge`](crate::Error::ItemTooLarge) if the item
    ///   can't be stored
    /// - I/O errors; a failure part-way through a split leaves the file
    ///   inconsistent
    ///
    /// # Panics
    /// In debug builds, panics if the catalog holds a different root for
    /// this collection than the handle does (see [`Collection`]).
    pub fn put(&mut self, tx: &mut Tx<'_>, key: &[u8], value: &[u8]) -> Result<()> {
        tx.dal_mut()?;
        if cfg!(debug_assertions) {
            if let Some(stored) = tx.get_collection(&self.name)? {
                assert_eq!(
                    stored.root,
                    self.root,
                    "stale handle for collection {:?}: the catalog root has moved",
                    String::from_utf8_lossy(&self.name)
                );
            }
        }

        let before = self.root;
        self.insert(tx.dal_mut()?, key, value)?;
        if self.root != before {
            tx.save_collection(self)?;
        }
        tx.dal_mut()?.flush_metadata()
    }

    /// Every item in ascending key order.
    pub fn items(&self, tx: &Tx<'_>) -> Result<Vec<Item>> {
        let dal = tx.dal()?;
        let mut out = Vec::new();
        if let Some(root) = self.root {
            collect_in_order(dal, root, &mut out)?;
        }
        Ok(out)
    }

    pub(crate) fn lookup(&self, dal: &Dal, key: &[u8]) -> Result<Option<Item>> {
        let Some(root) = self.root else {
            return Ok(None);
        };

        let root = dal.get_node(root)?;
        Ok(root
            .find_key(dal, key)?
            .map(|(mut node, index)| node.items.swap_remove(index)))
    }

    /// Insert without touching the catalog or flushing metadata.
    pub(crate) fn insert(&mut self, dal: &mut Dal, key: &[u8], value: &[u8]) -> Result<()> {
        let item = Item::new(key, value);
        dal.check_item(&item)?;

        let Some(root) = self.root else {
            let leaf = dal.new_node(vec![item], Vec::new());
            dal.write_node(&leaf)?;
            self.root = Some(leaf.page);
            return Ok(());
        };

        let root = dal.get_node(root)?;
        let InsertionPath {
            mut nodes,
            child_indexes,
            index,
            found,
        } = descend(dal, root, key)?;

        let target = nodes.len() - 1;
        if found {
            nodes[target].items[index] = item;
        } else {
            nodes[target].add_item(item, index);
        }

        let options = *dal.options();
        let mut dirty = vec![false; nodes.len()];
        dirty[target] = true;

        // Bottom-up: split any overpopulated child into its parent, then
        // write the child, which no longer changes.
        for parent_at in (0..target).rev() {
            let (upper, lower) = nodes.split_at_mut(parent_at + 1);
            let parent = &mut upper[parent_at];
            let child = &mut lower[0];

            if child.is_overpopulated(&options) {
                let sibling_page = dal.next_page();
                let sibling = parent.split(child, child_indexes[parent_at + 1], sibling_page, &options);
                dal.write_node(&sibling)?;
                dirty[parent_at] = true;
            }
            if dirty[parent_at + 1] {
                dal.write_node(child)?;
            }
        }

        let root = &mut nodes[0];
        if root.is_overpopulated(&options) {
            let mut new_root = dal.new_node(Vec::new(), vec![root.page]);
            let sibling_page = dal.next_page();
            let sibling = new_root.split(root, 0, sibling_page, &options);

            dal.write_node(&sibling)?;
            dal.write_node(root)?;
            dal.write_node(&new_root)?;

            tracing::debug!(
                collection = %String::from_utf8_lossy(&self.name),
                old_root = %root.page,
                new_root = %new_root.page,
                "tree grew a level"
            );
            self.root = Some(new_root.page);
        } else if dirty[0] {
            dal.write_node(root)?;
        }

        Ok(())
    }
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("name", &String::from_utf8_lossy(&self.name))
            .field("root", &self.root)
            .finish()
    }
}

/// Walk from `root` to the node that holds `key` or should receive it.
fn descend(dal: &Dal, root: Node, key: &[u8]) -> Result<InsertionPath> {
    let mut nodes = Vec::new();
    let mut child_indexes = vec![0];
    let mut node = root;

    loop {
        let (found, index) = node.find_key_in_node(key);
        if found || node.is_leaf() {
            nodes.push(node);
            return Ok(InsertionPath {
                nodes,
                child_indexes,
                index,
                found,
            });
        }

        let child = dal.get_node(node.children[index])?;
        child_indexes.push(index);
        nodes.push(node);
        node = child;
    }
}

fn collect_in_order(dal: &Dal, page: PageId, out: &mut Vec<Item>) -> Result<()> {
    let node = dal.get_node(page)?;
    if node.is_leaf() {
        out.extend(node.items);
        return Ok(());
    }

    for (child, item) in node.children.iter().zip(node.items) {
        collect_in_order(dal, *child, out)?;
        out.push(item);
    }
    if let Some(last) = node.children.last() {
        collect_in_order(dal, *last, out)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Options;
    use tempfile::{tempdir, TempDir};

    fn open_dal(options: Options) -> (Dal, TempDir) {
        let dir = tempdir().unwrap();
        let dal = Dal::open(dir.path().join("test.db"), options).unwrap();
        (dal, dir)
    }

    fn key(i: usize) -> Vec<u8> {
        format!("key{:06}", i).into_bytes()
    }

    /// Every node reachable from `page`, depth-first.
    fn all_nodes(dal: &Dal, page: PageId) -> Vec<Node> {
        let node = dal.get_node(page).unwrap();
        let mut out = Vec::new();
        for child in &node.children {
            out.extend(all_nodes(dal, *child));
        }
        out.push(node);
        out
    }

    fn in_order_keys(dal: &Dal, collection: &Collection) -> Vec<Vec<u8>> {
        let mut items = Vec::new();
        if let Some(root) = collection.root() {
            collect_in_order(dal, root, &mut items).unwrap();
        }
        items.into_iter().map(|i| i.key).collect()
    }

    #[test]
    fn test_put_on_empty_tree_creates_root_leaf() {
        let (mut dal, _dir) = open_dal(Options::default());
        let mut c = Collection::new("t", None);

        c.insert(&mut dal, b"a", b"1").unwrap();

        let root = dal.get_node(c.root().unwrap()).unwrap();
        assert!(root.is_leaf());
        assert_eq!(root.items, vec![Item::new(b"a".to_vec(), b"1".to_vec())]);
    }

    #[test]
    fn test_find_and_not_found() {
        let (mut dal, _dir) = open_dal(Options::default());
        let mut c = Collection::new("t", None);

        assert_eq!(c.lookup(&dal, b"a").unwrap(), None);

        c.insert(&mut dal, b"a", b"1").unwrap();

        assert_eq!(
            c.lookup(&dal, b"a").unwrap(),
            Some(Item::new(b"a".to_vec(), b"1".to_vec()))
        );
        assert_eq!(c.lookup(&dal, b"b").unwrap(), None);
    }

    #[test]
    fn test_overwrite_keeps_single_item() {
        let (mut dal, _dir) = open_dal(Options::default());
        let mut c = Collection::new("t", None);

        c.insert(&mut dal, b"k", b"v1").unwrap();
        c.insert(&mut dal, b"other", b"x").unwrap();
        c.insert(&mut dal, b"k", b"v2").unwrap();

        assert_eq!(in_order_keys(&dal, &c), vec![b"k".to_vec(), b"other".to_vec()]);
        assert_eq!(c.lookup(&dal, b"k").unwrap().unwrap().value, b"v2".to_vec());
    }

    #[test]
    fn test_overwrite_in_internal_node() {
        let (mut dal, _dir) = open_dal(Options::default());
        let mut c = Collection::new("t", None);
        for i in 0..300 {
            c.insert(&mut dal, &key(i), b"old").unwrap();
        }

        let root = dal.get_node(c.root().unwrap()).unwrap();
        assert!(!root.is_leaf());
        let promoted = root.items[0].key.clone();

        c.insert(&mut dal, &promoted, b"new").unwrap();

        let root = dal.get_node(c.root().unwrap()).unwrap();
        assert_eq!(root.items[0].value, b"new".to_vec());
        assert_eq!(in_order_keys(&dal, &c).len(), 300);
    }

    #[test]
    fn test_sequential_puts_split_and_bound_leaves() {
        let options = Options::default();
        let (mut dal, _dir) = open_dal(options);
        let mut c = Collection::new("t", None);

        for i in 0..1000 {
            c.insert(&mut dal, &key(i), format!("value{}", i).as_bytes()).unwrap();
        }

        let root = dal.get_node(c.root().unwrap()).unwrap();
        assert!(root.children.len() > 1);

        for node in all_nodes(&dal, c.root().unwrap()) {
            assert!(
                node.node_size() as f32 <= 0.95 * 4096.0,
                "{} holds {} bytes",
                node.page,
                node.node_size()
            );
            if !node.is_leaf() {
                assert_eq!(node.children.len(), node.items.len() + 1);
            }
        }

        let expected: Vec<Vec<u8>> = (0..1000).map(key).collect();
        assert_eq!(in_order_keys(&dal, &c), expected);

        for i in (0..1000).step_by(37) {
            let item = c.lookup(&dal, &key(i)).unwrap().unwrap();
            assert_eq!(item.value, format!("value{}", i).into_bytes());
        }
    }

    #[test]
    fn test_first_split_produces_disjoint_halves() {
        let options = Options {
            page_size: 512,
            ..Options::default()
        };
        let (mut dal, _dir) = open_dal(options);
        let mut c = Collection::new("t", None);

        let first_root = {
            c.insert(&mut dal, &key(0), b"v").unwrap();
            c.root().unwrap()
        };

        let mut i = 1;
        while c.root() == Some(first_root) {
            c.insert(&mut dal, &key(i), b"v").unwrap();
            i += 1;
        }

        let root = dal.get_node(c.root().unwrap()).unwrap();
        assert_eq!(root.items.len(), 1);
        assert_eq!(root.children.len(), 2);
        assert_eq!(root.children[0], first_root);

        let left = dal.get_node(root.children[0]).unwrap();
        let right = dal.get_node(root.children[1]).unwrap();
        let middle = &root.items[0].key;

        assert!(!left.items.is_empty() && !right.items.is_empty());
        assert!(left.items.iter().all(|item| &item.key < middle));
        assert!(right.items.iter().all(|item| &item.key > middle));
        assert_eq!(left.items.len() + right.items.len() + 1, i);
        assert!(!left.is_overpopulated(&options));
        assert!(!right.is_overpopulated(&options));
    }

    #[test]
    fn test_reverse_and_interleaved_order() {
        let options = Options {
            page_size: 512,
            ..Options::default()
        };
        let (mut dal, _dir) = open_dal(options);
        let mut c = Collection::new("t", None);

        for i in (0..200).rev() {
            c.insert(&mut dal, &key(i * 2), b"even").unwrap();
        }
        for i in 0..200 {
            c.insert(&mut dal, &key(i * 2 + 1), b"odd").unwrap();
        }

        let expected: Vec<Vec<u8>> = (0..400).map(key).collect();
        assert_eq!(in_order_keys(&dal, &c), expected);

        for node in all_nodes(&dal, c.root().unwrap()) {
            assert!(!node.is_overpopulated(&options));
        }
    }

    #[test]
    fn test_large_items_still_split() {
        let options = Options::default();
        let (mut dal, _dir) = open_dal(options);
        let mut c = Collection::new("t", None);

        let max = options.max_element_size();
        let value = vec![0x5Au8; max - 14 - 10];
        for i in 0..20 {
            c.insert(&mut dal, &key(i), &value).unwrap();
        }

        for node in all_nodes(&dal, c.root().unwrap()) {
            assert!(node.node_size() <= options.page_size);
        }
        assert_eq!(in_order_keys(&dal, &c).len(), 20);
    }

    #[test]
    fn test_item_too_large_is_rejected() {
        let (mut dal, _dir) = open_dal(Options::default());
        let mut c = Collection::new("t", None);

        let err = c.insert(&mut dal, b"k", &vec![0u8; 4096]).unwrap_err();
        assert!(matches!(err, crate::Error::ItemTooLarge { .. }));
        assert_eq!(c.root(), None);
    }

    #[test]
    fn test_collection_debug() {
        let c = Collection::new("users", Some(PageId::new(3)));
        let debug = format!("{:?}", c);
        assert!(debug.contains("users"));
        assert!(debug.contains("PageId(3)"));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "stale handle")]
    fn test_put_through_stale_handle_panics_in_debug() {
        let dir = tempdir().unwrap();
        let db = crate::Db::open(dir.path().join("test.db"), Options::default()).unwrap();

        let mut tx = db.write_tx();
        let mut first = tx.create_collection(b"c").unwrap();
        let mut second = tx.get_collection(b"c").unwrap().unwrap();

        // the first put gives the collection a root the second handle lacks
        first.put(&mut tx, b"a", b"1").unwrap();
        let _ = second.put(&mut tx, b"b", b"2");
    }
}

//! B-tree nodes and the operations that reshape them.
//!
//! A [`Node`] is always a fresh, owned copy decoded from its page; mutating
//! it has no effect on disk until it is written back through the
//! [`Dal`](crate::storage::Dal).

use std::cmp::Ordering;

use crate::common::config::{LEN_PREFIX_SIZE, NODE_HEADER_SIZE, OFFSET_SIZE, PAGE_NUM_SIZE};
use crate::common::{Options, PageId, Result};
use crate::storage::Dal;

/// A key/value pair stored in a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

impl Item {
    pub fn new(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Bytes this item occupies in a node, including its offset slot and,
    /// for internal nodes, the child pointer stored alongside it.
    #[inline]
    pub fn element_size(&self, in_leaf: bool) -> usize {
        let child = if in_leaf { 0 } else { PAGE_NUM_SIZE };
        child + OFFSET_SIZE + 2 * LEN_PREFIX_SIZE + self.key.len() + self.value.len()
    }
}

/// One B-tree vertex.
///
/// # Invariants
/// - `items` is strictly ascending by key.
/// - A leaf has no children; an internal node with `k` items has `k + 1`.
/// - Every key under `children[i]` is below `items[i].key`, and every key
///   under `children[i + 1]` is above it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub page: PageId,
    pub items: Vec<Item>,
    pub children: Vec<PageId>,
}

impl Node {
    pub fn new(page: PageId, items: Vec<Item>, children: Vec<PageId>) -> Self {
        Self {
            page,
            items,
            children,
        }
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Search this node only.
    ///
    /// Returns `(true, i)` when `items[i]` holds `key`, otherwise
    /// `(false, i)` with `i` the insertion point (first greater key).
    pub fn find_key_in_node(&self, key: &[u8]) -> (bool, usize) {
        for (i, item) in self.items.iter().enumerate() {
            match item.key.as_slice().cmp(key) {
                Ordering::Equal => return (true, i),
                Ordering::Greater => return (false, i),
                Ordering::Less => {}
            }
        }
        (false, self.items.len())
    }

    /// Descend from this node to the node holding `key`.
    ///
    /// Returns the containing node and the item's index in it, or `None`
    /// once a leaf has been searched without a match.
    pub fn find_key(self, dal: &Dal, key: &[u8]) -> Result<Option<(Node, usize)>> {
        let mut node = self;
        loop {
            let (found, index) = node.find_key_in_node(key);
            if found {
                return Ok(Some((node, index)));
            }
            if node.is_leaf() {
                return Ok(None);
            }
            node = dal.get_node(node.children[index])?;
        }
    }

    /// Insert `item` at `index`, shifting later items right.
    ///
    /// # Panics
    /// Panics if `index > items.len()`.
    pub fn add_item(&mut self, item: Item, index: usize) {
        self.items.insert(index, item);
    }

    /// Size of the `i`-th item's element in this node.
    #[inline]
    pub fn element_size(&self, i: usize) -> usize {
        self.items[i].element_size(self.is_leaf())
    }

    /// Encoded size of the whole node.
    pub fn node_size(&self) -> usize {
        let elements: usize = (0..self.items.len()).map(|i| self.element_size(i)).sum();
        let last_child = if self.is_leaf() { 0 } else { PAGE_NUM_SIZE };
        NODE_HEADER_SIZE + elements + last_child
    }

    /// Whether the node has grown past the split threshold.
    pub fn is_overpopulated(&self, options: &Options) -> bool {
        self.node_size() as f32 > options.max_threshold()
    }

    /// Whether the node has shrunk below the minimum fill.
    ///
    /// Nothing removes items yet, so no merge acts on this.
    pub fn is_underpopulated(&self, options: &Options) -> bool {
        (self.node_size() as f32) < options.min_threshold()
    }

    /// Index of the item to promote when splitting this node.
    ///
    /// Greedy: the first index past which the prefix exceeds the min
    /// threshold, restricted to `1..=len-2` so both halves keep an item.
    /// Falls back to `len - 2` (everything but the last item stays left).
    ///
    /// # Panics
    /// Panics if the node has fewer than three items.
    pub fn split_index(&self, options: &Options) -> usize {
        let len = self.items.len();
        assert!(len >= 3, "split of {} with only {} items", self.page, len);

        let mut size = NODE_HEADER_SIZE;
        for i in 0..len - 1 {
            size += self.element_size(i);
            if i >= 1 && size as f32 > options.min_threshold() {
                return i;
            }
        }
        len - 2
    }

    /// Split `child` (found at `children[child_index]` of `self`) in two.
    ///
    /// `child` keeps the items before the split index; the item at the
    /// split index moves up into `self` at `child_index`; the remaining
    /// items (and, for internal nodes, their children) move into a new
    /// sibling on page `sibling_page`, linked right after `child`.
    ///
    /// Nothing is written: the caller persists `self`, `child` and the
    /// returned sibling.
    pub fn split(
        &mut self,
        child: &mut Node,
        child_index: usize,
        sibling_page: PageId,
        options: &Options,
    ) -> Node {
        debug_assert_eq!(
            self.children.get(child_index),
            Some(&child.page),
            "{} is not child {} of {}",
            child.page,
            child_index,
            self.page
        );

        let split_index = child.split_index(options);

        let sibling_children = if child.is_leaf() {
            Vec::new()
        } else {
            child.children.split_off(split_index + 1)
        };
        let sibling_items = child.items.split_off(split_index + 1);
        let middle = child.items.remove(split_index);

        let sibling = Node::new(sibling_page, sibling_items, sibling_children);

        self.add_item(middle, child_index);
        self.children.insert(child_index + 1, sibling.page);

        tracing::trace!(
            parent = %self.page,
            child = %child.page,
            sibling = %sibling.page,
            split_index,
            "split node"
        );

        sibling
    }
}

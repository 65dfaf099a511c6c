//! Node encoding - one node per page.
//!
//! # Layout
//! ```text
//! left cursor ─▶                                      ◀─ right cursor
//! ┌──────┬───────┬──────────────────────────┬──────┬─────────────────────┐
//! │ leaf │ count │ [child] offset  × count  │[last │ free │ item N-1 … item 0│
//! │  1B  │  2B   │   8B     2B              │child]│      │                  │
//! └──────┴───────┴──────────────────────────┴──────┴─────────────────────┘
//! ```
//! Child pointers are present only in internal nodes. Each offset points at
//! an item record laid out as `[klen:2][key][vlen:2][value]`; records are
//! packed from the end of the page downward in item order. All integers are
//! little-endian.

use crate::common::config::{LEN_PREFIX_SIZE, NODE_HEADER_SIZE, OFFSET_SIZE, PAGE_NUM_SIZE};
use crate::common::{Error, PageId, Result};
use crate::storage::page::Page;

use super::node::{Item, Node};

const LEAF_FLAG: u8 = 1;
const INTERNAL_FLAG: u8 = 0;

/// Encode `node` into `buf`, which must be a whole page.
///
/// # Panics
/// Panics if the node does not fit in `buf`. Callers split overpopulated
/// nodes before writing them, so this only fires on an engine bug.
pub fn encode(node: &Node, buf: &mut [u8]) {
    let size = node.node_size();
    assert!(
        size <= buf.len(),
        "{} needs {} bytes but a page holds {}",
        node.page,
        size,
        buf.len()
    );
    debug_assert!(node.is_leaf() || node.children.len() == node.items.len() + 1);

    buf.fill(0);

    let is_leaf = node.is_leaf();
    let mut left = 0;
    let mut right = buf.len();

    buf[left] = if is_leaf { LEAF_FLAG } else { INTERNAL_FLAG };
    left += 1;
    put_u16(buf, left, node.items.len() as u16);
    left += 2;

    for (i, item) in node.items.iter().enumerate() {
        if !is_leaf {
            put_u64(buf, left, node.children[i].0);
            left += PAGE_NUM_SIZE;
        }

        right -= item.value.len();
        buf[right..right + item.value.len()].copy_from_slice(&item.value);
        right -= LEN_PREFIX_SIZE;
        put_u16(buf, right, item.value.len() as u16);

        right -= item.key.len();
        buf[right..right + item.key.len()].copy_from_slice(&item.key);
        right -= LEN_PREFIX_SIZE;
        put_u16(buf, right, item.key.len() as u16);

        put_u16(buf, left, right as u16);
        left += OFFSET_SIZE;
    }

    if let Some(last) = node.children.last() {
        put_u64(buf, left, last.0);
    }
}

/// Decode the node stored in `page`.
///
/// # Errors
/// [`Error::CorruptedNode`] if the page doesn't hold a well-formed node:
/// an unknown leaf flag, an offset or length running past the page, or a
/// child pointer to the meta page.
pub fn decode(page: &Page) -> Result<Node> {
    let reader = Reader {
        buf: page.as_slice(),
        page: page.id(),
    };

    let is_leaf = match reader.bytes(0, 1)?[0] {
        LEAF_FLAG => true,
        INTERNAL_FLAG => false,
        flag => return Err(reader.corrupted(format!("unknown leaf flag {}", flag))),
    };
    let count = reader.u16(1)? as usize;

    let mut items = Vec::with_capacity(count);
    let mut children = Vec::with_capacity(if is_leaf { 0 } else { count + 1 });
    let mut left = NODE_HEADER_SIZE;

    for _ in 0..count {
        if !is_leaf {
            children.push(reader.child(left)?);
            left += PAGE_NUM_SIZE;
        }

        let mut offset = reader.u16(left)? as usize;
        left += OFFSET_SIZE;

        let klen = reader.u16(offset)? as usize;
        offset += LEN_PREFIX_SIZE;
        let key = reader.bytes(offset, klen)?.to_vec();
        offset += klen;

        let vlen = reader.u16(offset)? as usize;
        offset += LEN_PREFIX_SIZE;
        let value = reader.bytes(offset, vlen)?.to_vec();

        items.push(Item { key, value });
    }

    if !is_leaf {
        children.push(reader.child(left)?);
    }

    Ok(Node::new(page.id(), items, children))
}

/// Bounds-checked little-endian reads over a page.
struct Reader<'a> {
    buf: &'a [u8],
    page: PageId,
}

impl<'a> Reader<'a> {
    fn bytes(&self, pos: usize, len: usize) -> Result<&'a [u8]> {
        pos.checked_add(len)
            .and_then(|end| self.buf.get(pos..end))
            .ok_or_else(|| {
                self.corrupted(format!(
                    "read of {} bytes at offset {} runs past the page",
                    len, pos
                ))
            })
    }

    fn u16(&self, pos: usize) -> Result<u16> {
        let b = self.bytes(pos, 2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn child(&self, pos: usize) -> Result<PageId> {
        let mut raw = [0u8; PAGE_NUM_SIZE];
        raw.copy_from_slice(self.bytes(pos, PAGE_NUM_SIZE)?);
        let child = PageId::new(u64::from_le_bytes(raw));
        if child.is_meta() {
            return Err(self.corrupted(format!("child pointer at offset {} is the meta page", pos)));
        }
        Ok(child)
    }

    fn corrupted(&self, reason: String) -> Error {
        Error::CorruptedNode {
            page: self.page,
            reason,
        }
    }
}

fn put_u16(buf: &mut [u8], pos: usize, value: u16) {
    buf[pos..pos + 2].copy_from_slice(&value.to_le_bytes());
}

fn put_u64(buf: &mut [u8], pos: usize, value: u64) {
    buf[pos..pos + 8].copy_from_slice(&value.to_le_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const PAGE_SIZE: usize = 4096;

    fn encode_to_page(node: &Node) -> Page {
        let mut page = Page::new(node.page, PAGE_SIZE);
        encode(node, page.as_mut_slice());
        page
    }

    #[test]
    fn test_leaf_byte_layout() {
        let node = Node::new(
            PageId::new(2),
            vec![Item::new(b"ab".to_vec(), b"xyz".to_vec())],
            Vec::new(),
        );
        let page = encode_to_page(&node);
        let buf = page.as_slice();

        assert_eq!(buf[0], 1); // leaf
        assert_eq!(&buf[1..3], &1u16.to_le_bytes());

        // record = klen(2) + "ab" + vlen(2) + "xyz" = 9 bytes at the very end
        let offset = PAGE_SIZE - 9;
        assert_eq!(&buf[3..5], &(offset as u16).to_le_bytes());
        assert_eq!(&buf[offset..offset + 2], &2u16.to_le_bytes());
        assert_eq!(&buf[offset + 2..offset + 4], b"ab");
        assert_eq!(&buf[offset + 4..offset + 6], &3u16.to_le_bytes());
        assert_eq!(&buf[offset + 6..], b"xyz");

        assert!(buf[5..offset].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_internal_byte_layout() {
        let node = Node::new(
            PageId::new(9),
            vec![Item::new(b"k".to_vec(), b"v".to_vec())],
            vec![PageId::new(3), PageId::new(4)],
        );
        let page = encode_to_page(&node);
        let buf = page.as_slice();

        assert_eq!(buf[0], 0); // internal
        assert_eq!(&buf[3..11], &3u64.to_le_bytes()); // child 0
        assert_eq!(&buf[11..13], &((PAGE_SIZE - 6) as u16).to_le_bytes());
        assert_eq!(&buf[13..21], &4u64.to_le_bytes()); // trailing child
    }

    #[test]
    fn test_roundtrip_leaf() {
        let node = Node::new(
            PageId::new(2),
            vec![
                Item::new(b"apple".to_vec(), b"red".to_vec()),
                Item::new(b"banana".to_vec(), b"".to_vec()),
                Item::new(b"cherry".to_vec(), vec![0u8; 300]),
            ],
            Vec::new(),
        );
        let decoded = decode(&encode_to_page(&node)).unwrap();
        assert_eq!(decoded, node);
        assert!(decoded.is_leaf());
    }

    #[test]
    fn test_roundtrip_internal() {
        let node = Node::new(
            PageId::new(7),
            vec![
                Item::new(b"g".to_vec(), b"1".to_vec()),
                Item::new(b"p".to_vec(), b"2".to_vec()),
            ],
            vec![PageId::new(3), PageId::new(4), PageId::new(1 << 33)],
        );
        assert_eq!(decode(&encode_to_page(&node)).unwrap(), node);
    }

    #[test]
    fn test_roundtrip_long_key_and_value() {
        // Longer than a 1-byte length prefix could describe.
        let node = Node::new(
            PageId::new(2),
            vec![Item::new(vec![7u8; 600], vec![9u8; 1200])],
            Vec::new(),
        );
        assert_eq!(decode(&encode_to_page(&node)).unwrap(), node);
    }

    #[test]
    fn test_encode_overwrites_stale_bytes() {
        let big = Node::new(
            PageId::new(2),
            vec![Item::new(vec![1u8; 100], vec![2u8; 100])],
            Vec::new(),
        );
        let small = Node::new(PageId::new(2), vec![Item::new(b"a".to_vec(), b"b".to_vec())], Vec::new());

        let mut page = encode_to_page(&big);
        encode(&small, page.as_mut_slice());

        assert_eq!(page.as_slice(), encode_to_page(&small).as_slice());
    }

    #[test]
    #[should_panic(expected = "needs")]
    fn test_encode_oversized_node_panics() {
        let node = Node::new(
            PageId::new(2),
            vec![Item::new(vec![1u8; 3000], vec![2u8; 3000])],
            Vec::new(),
        );
        encode_to_page(&node);
    }

    #[test]
    fn test_decode_zeroed_page_is_corrupted() {
        // flag 0 = internal, count 0, trailing child pointer 0 = meta page
        let page = Page::new(PageId::new(5), PAGE_SIZE);
        assert!(matches!(
            decode(&page),
            Err(Error::CorruptedNode { page, .. }) if page == PageId::new(5)
        ));
    }

    #[test]
    fn test_decode_rejects_unknown_flag() {
        let mut page = Page::new(PageId::new(5), PAGE_SIZE);
        page.as_mut_slice()[0] = 7;
        assert!(matches!(decode(&page), Err(Error::CorruptedNode { .. })));
    }

    #[test]
    fn test_decode_rejects_offset_past_page() {
        let mut page = Page::new(PageId::new(5), PAGE_SIZE);
        let buf = page.as_mut_slice();
        buf[0] = LEAF_FLAG;
        buf[1..3].copy_from_slice(&1u16.to_le_bytes());
        // offset to the last byte, so the 2-byte key length runs off the end
        buf[3..5].copy_from_slice(&((PAGE_SIZE - 1) as u16).to_le_bytes());

        assert!(matches!(decode(&page), Err(Error::CorruptedNode { .. })));
    }

    fn arb_node() -> impl Strategy<Value = Node> {
        let items = prop::collection::btree_map(
            prop::collection::vec(any::<u8>(), 1..40),
            prop::collection::vec(any::<u8>(), 0..60),
            0..40,
        );
        (items, any::<bool>(), 1u64..u64::MAX).prop_map(|(items, leaf, first_child)| {
            let items: Vec<Item> = items.into_iter().map(|(k, v)| Item::new(k, v)).collect();
            let children = if leaf || items.is_empty() {
                Vec::new()
            } else {
                (0..=items.len() as u64)
                    .map(|i| PageId::new(first_child.saturating_sub(i).max(1)))
                    .collect()
            };
            Node::new(PageId::new(2), items, children)
        })
    }

    proptest! {
        /// Anything that fits in a page decodes to exactly what was encoded.
        #[test]
        fn prop_encode_decode_roundtrip(node in arb_node()) {
            prop_assume!(node.node_size() <= PAGE_SIZE);
            let decoded = decode(&encode_to_page(&node)).unwrap();
            prop_assert_eq!(decoded.is_leaf(), node.is_leaf());
            prop_assert_eq!(decoded, node);
        }
    }
}

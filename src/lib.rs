//! LuffyDB - an embedded, single-file key/value store built on a B-tree.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                            LuffyDB                              │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │                Store Handle (db.rs)                      │   │
//! │  │          open / close / read_tx / write_tx               │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │        Transactions (tx.rs)  [one RwLock per store]     │   │
//! │  │        read guard ←─OR─→ write guard + catalog           │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │       Collections (collection.rs) + B-tree (btree/)      │   │
//! │  │     find / put / items  →  Node split + node codec       │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │           Storage Layer (storage/)                       │   │
//! │  │   Dal = DiskManager + FreeList + Meta + StorageStats     │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # File layout
//! - Page 0: meta record (free-list page, catalog root, page size, CRC32)
//! - Page 1: free list
//! - Every other page: one B-tree node
//!
//! # Modules
//! - [`common`] - Shared primitives (PageId, Error, Options)
//! - [`storage`] - Disk I/O, page allocation and bootstrap records
//! - [`btree`] - Nodes, splits and the on-page node format
//!
//! # Quick Start
//! ```no_run
//! use luffydb::{Db, Options};
//!
//! let db = Db::open("my_database.db", Options::default()).unwrap();
//!
//! let mut tx = db.write_tx();
//! let mut users = tx.create_collection(b"users").unwrap();
//! users.put(&mut tx, b"alice", b"admin").unwrap();
//! drop(tx);
//!
//! let tx = db.read_tx();
//! let users = tx.get_collection(b"users").unwrap().unwrap();
//! assert_eq!(users.find(&tx, b"alice").unwrap().unwrap().value, b"admin");
//! ```

pub mod btree;
pub mod common;
pub mod storage;

mod collection;
mod db;
mod tx;

// Re-export commonly used items at crate root for convenience
pub use btree::{Item, Node};
pub use collection::Collection;
pub use common::{Error, Options, PageId, Result};
pub use db::Db;
pub use storage::page::Page;
pub use storage::{StatsSnapshot, StorageStats};
pub use tx::Tx;

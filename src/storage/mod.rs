//! Storage layer - disk I/O, page allocation and bootstrap records.
//!
//! This module handles persistent storage:
//! - [`DiskManager`] - Low-level positioned file I/O
//! - [`Page`] - A page-sized buffer tagged with its number
//! - [`FreeList`] - Page number allocation and reuse
//! - [`Meta`] - The bootstrap record on page 0
//! - [`Dal`] - All of the above behind one handle
//! - [`StorageStats`] - I/O counters

mod dal;
mod disk_manager;
mod freelist;
mod meta;
pub mod page;
mod stats;

pub use dal::Dal;
pub use disk_manager::DiskManager;
pub use freelist::FreeList;
pub use meta::Meta;
pub use page::Page;
pub use stats::{StatsSnapshot, StorageStats};

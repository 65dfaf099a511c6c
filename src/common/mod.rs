//! Common types and utilities shared across LuffyDB.
//!
//! This module contains fundamental primitives used throughout the codebase:
//! - Configuration ([`Options`] and layout constants)
//! - Error types
//! - Page identifiers

pub mod config;
pub mod error;
mod page_id;

pub use config::Options;
pub use error::{Error, Result};
pub use page_id::PageId;

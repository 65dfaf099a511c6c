//! B-tree engine.
//!
//! - [`Node`] / [`Item`] - in-memory node and the operations that search,
//!   grow and split it
//! - [`codec`] - the on-page node format

pub mod codec;
mod node;

pub use node::{Item, Node};

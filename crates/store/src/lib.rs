//! # Usage Store
//!
//! Storage for flattened snapshot trees.
//!
//! [`NodeStore`] is the contract the snapshot pipeline writes through and the
//! query surface reads through. Two implementations ship with the crate:
//!
//! - [`MemoryNodeStore`] keeps rows in process memory
//! - [`JsonNodeStore`] keeps rows in one JSON file, replaced atomically on write
//!
//! ## Example
//!
//! ```no_run
//! use usage_store::{JsonNodeStore, NodeStore};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = JsonNodeStore::open(".usage-tree/nodes.json").await?;
//!     for stored in store.find_children(1, 42, "").await? {
//!         println!("{} {}", stored.node.node_type, stored.node.signature);
//!     }
//!     Ok(())
//! }
//! ```

mod error;
mod json_store;
mod memory;
mod store;
mod table;

pub use error::{Result, StoreError};
pub use json_store::{JsonNodeStore, NODE_STORE_SCHEMA_VERSION};
pub use memory::MemoryNodeStore;
pub use store::NodeStore;

pub use usage_protocol::{PersistedNode, StoredNode};

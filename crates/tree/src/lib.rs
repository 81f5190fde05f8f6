//! # Usage Tree
//!
//! Aggregates method invocation telemetry into a package/class/method tree and
//! flattens it into storable rows.
//!
//! ## Pipeline
//!
//! ```text
//! InvocationRecord[]
//!     │
//!     ├──> Package Filter (globs over dotted signatures)
//!     │
//!     ├──> Signature Parser
//!     │      └─ a.b.C.m(int) -> [a, b, C, m(int)]
//!     │
//!     ├──> Tree Builder
//!     │      └─ used/unused counters + last invocation on every node of a path
//!     │
//!     └──> Compressor
//!            ├─ fold single-child package chains
//!            └─ PersistedNode[] in write-sized chunks
//! ```
//!
//! ## Example
//!
//! ```
//! use usage_protocol::{InvocationRecord, SnapshotDescriptor};
//! use usage_tree::{build, PackageFilter};
//!
//! # fn main() -> usage_tree::Result<()> {
//! let descriptor = SnapshotDescriptor::new(1, 7).with_filter_invoked_at_millis(1_000);
//! let records = vec![InvocationRecord::new("com.foo.Bar.baz()", "baz", 5_000)];
//!
//! let filter = PackageFilter::parse(&descriptor.packages)?;
//! let tree = build(filter.apply(&records), descriptor.filter_invoked_at_millis)?;
//! let rows = tree.flatten(&descriptor)?;
//!
//! assert_eq!(rows.len(), 2);
//! # Ok(())
//! # }
//! ```

mod builder;
mod compress;
mod error;
mod filter;
mod signature;

pub use builder::{build, TreeBuilder, TreeNode, UsageTree};
pub use compress::{chunk_nodes, flatten, TreeConfig, DEFAULT_CHUNK_SIZE};
pub use error::{Result, TreeError};
pub use filter::{filter_records, PackageFilter};
pub use signature::{child_signature, classify, split_signature};

pub use usage_protocol::{InvocationRecord, NodeType, PersistedNode, SnapshotDescriptor};

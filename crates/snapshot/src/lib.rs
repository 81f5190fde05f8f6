//! # Usage Snapshot
//!
//! Recompute pipeline and query surface for usage snapshots.
//!
//! A recompute filters the record batch, builds the usage tree, flattens it and
//! swaps the snapshot's stored rows for the new ones in one
//! [`NodeStore::replace_snapshot`] call:
//!
//! ```text
//! SnapshotDescriptor + InvocationRecord[]
//!     │
//!     ├──> identity + filter checks (fail before any record is read)
//!     ├──> TreeBuilder (abort or skip malformed records)
//!     ├──> flatten + chunk
//!     └──> per-snapshot lock ──> replace_snapshot
//! ```
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use usage_protocol::{InvocationRecord, SnapshotDescriptor};
//! use usage_snapshot::{ServiceConfig, SnapshotService};
//! use usage_store::MemoryNodeStore;
//!
//! # #[tokio::main]
//! # async fn main() -> usage_snapshot::Result<()> {
//! let service = SnapshotService::new(Arc::new(MemoryNodeStore::new()), ServiceConfig::default())?;
//! let descriptor = SnapshotDescriptor::new(42, 7).with_filter_invoked_at_millis(1_000);
//! let records = vec![InvocationRecord::new("com.foo.Bar.baz()", "baz", 5_000)];
//!
//! let report = service.create_and_save_snapshot_nodes(&descriptor, &records).await?;
//! assert_eq!(report.nodes_written, 2);
//!
//! let top = service.read_snapshot_node(7, 42, "").await?;
//! assert_eq!(top[0].node.signature, "com.foo.Bar");
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod lock;
mod report;
mod service;

pub use config::{InvalidRecordPolicy, ServiceConfig};
pub use error::{Result, SnapshotError};
pub use report::{BuildReport, SkippedRecord};
pub use service::SnapshotService;

pub use usage_store::NodeStore;

use crate::config::{InvalidRecordPolicy, ServiceConfig};
use crate::error::Result;
use crate::lock::SnapshotLocks;
use crate::report::BuildReport;
use std::sync::Arc;
use std::time::Instant;
use usage_protocol::{InvocationRecord, SnapshotDescriptor, StoredNode};
use usage_store::NodeStore;
use usage_tree::{chunk_nodes, PackageFilter, TreeBuilder, TreeError, UsageTree};

/// Recomputes snapshot trees and answers queries over the stored rows.
///
/// Recomputes and deletes of the same snapshot are serialized; different
/// snapshots never wait on each other.
pub struct SnapshotService<S: ?Sized> {
    store: Arc<S>,
    config: ServiceConfig,
    locks: SnapshotLocks,
}

impl<S: NodeStore + ?Sized> SnapshotService<S> {
    pub fn new(store: Arc<S>, config: ServiceConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            config,
            locks: SnapshotLocks::default(),
        })
    }

    pub fn with_defaults(store: Arc<S>) -> Self {
        Self {
            store,
            config: ServiceConfig::default(),
            locks: SnapshotLocks::default(),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Rebuild a snapshot from `records` and replace its stored rows.
    ///
    /// Identity and the package filter are checked before any record is read.
    /// Nothing is written unless the whole batch was built.
    pub async fn create_and_save_snapshot_nodes(
        &self,
        descriptor: &SnapshotDescriptor,
        records: &[InvocationRecord],
    ) -> Result<BuildReport> {
        let started = Instant::now();
        let (customer_id, snapshot_id) = identity(descriptor)?;
        let filter = PackageFilter::parse(&descriptor.packages)?;

        let mut report = BuildReport::new(customer_id, snapshot_id);
        let tree = self.build_tree(&filter, descriptor, records, &mut report)?;
        log::info!(
            "Built usage tree for snapshot {}/{}: {} of {} records, {} nodes",
            customer_id,
            snapshot_id,
            report.records_built(),
            report.records_total,
            tree.node_count()
        );

        let rows = tree.flatten(descriptor)?;
        drop(tree);
        report.nodes_written = rows.len();
        let chunks = chunk_nodes(rows, self.config.tree())?;
        report.chunks_written = chunks.len();

        {
            let _guard = self.locks.acquire(customer_id, snapshot_id).await;
            self.store
                .replace_snapshot(customer_id, snapshot_id, chunks)
                .await?;
        }

        report.elapsed_ms = started.elapsed().as_millis() as u64;
        log::info!(
            "Snapshot {}/{} saved: {} rows in {} chunks ({} records skipped) in {}ms",
            customer_id,
            snapshot_id,
            report.nodes_written,
            report.chunks_written,
            report.records_skipped,
            report.elapsed_ms
        );
        Ok(report)
    }

    fn build_tree(
        &self,
        filter: &PackageFilter,
        descriptor: &SnapshotDescriptor,
        records: &[InvocationRecord],
        report: &mut BuildReport,
    ) -> Result<UsageTree> {
        report.records_total = records.len();
        let mut builder = TreeBuilder::new(descriptor.filter_invoked_at_millis);

        for (index, record) in records.iter().enumerate() {
            if !filter.matches(&record.signature) {
                continue;
            }
            report.records_matched += 1;

            let Err(err) = builder.add(record) else {
                continue;
            };
            match self.config.invalid_records {
                InvalidRecordPolicy::Abort => {
                    return Err(TreeError::InvalidRecord {
                        index,
                        source: Box::new(err),
                    }
                    .into());
                }
                InvalidRecordPolicy::Skip => {
                    log::warn!("Skipping record #{index}: {err}");
                    report.add_skipped(index, &record.signature, err.to_string());
                }
            }
        }

        Ok(builder.finish())
    }

    /// Rows directly under `parent_signature`; an empty parent lists the top level.
    pub async fn read_snapshot_node(
        &self,
        customer_id: u64,
        snapshot_id: u64,
        parent_signature: &str,
    ) -> Result<Vec<StoredNode>> {
        Ok(self
            .store
            .find_children(customer_id, snapshot_id, parent_signature)
            .await?)
    }

    pub async fn search_by_signature(
        &self,
        customer_id: u64,
        snapshot_id: u64,
        substring: &str,
        exclude_id: Option<u64>,
    ) -> Result<Vec<StoredNode>> {
        Ok(self
            .store
            .find_by_signature_substring(customer_id, snapshot_id, substring, exclude_id)
            .await?)
    }

    /// Remove every stored row of a snapshot, returning how many were removed.
    pub async fn delete_snapshot_node(&self, customer_id: u64, snapshot_id: u64) -> Result<usize> {
        let _guard = self.locks.acquire(customer_id, snapshot_id).await;
        let removed = self
            .store
            .delete_by_snapshot(customer_id, snapshot_id)
            .await?;
        log::info!("Deleted {removed} rows of snapshot {customer_id}/{snapshot_id}");
        Ok(removed)
    }
}

fn identity(descriptor: &SnapshotDescriptor) -> Result<(u64, u64)> {
    let snapshot_id = descriptor
        .id
        .ok_or(TreeError::MissingIdentity("snapshotId"))?;
    let customer_id = descriptor
        .customer_id
        .ok_or(TreeError::MissingIdentity("customerId"))?;
    Ok((customer_id, snapshot_id))
}

use crate::error::Result;
use async_trait::async_trait;
use usage_protocol::{PersistedNode, StoredNode};

/// Durable home of flattened snapshot trees.
///
/// Every query is scoped to one `(customer_id, snapshot_id)` pair and returns
/// rows in no particular order.
#[async_trait]
pub trait NodeStore: Send + Sync {
    /// Insert one write batch. The store assigns each row an id.
    async fn save_nodes(&self, batch: Vec<PersistedNode>) -> Result<()>;

    /// Remove every row of a snapshot, returning how many were removed.
    async fn delete_by_snapshot(&self, customer_id: u64, snapshot_id: u64) -> Result<usize>;

    /// Rows whose parent signature equals `parent_signature` exactly.
    async fn find_children(
        &self,
        customer_id: u64,
        snapshot_id: u64,
        parent_signature: &str,
    ) -> Result<Vec<StoredNode>>;

    /// Rows whose signature contains `substring` (case-sensitive), minus `exclude_id`.
    async fn find_by_signature_substring(
        &self,
        customer_id: u64,
        snapshot_id: u64,
        substring: &str,
        exclude_id: Option<u64>,
    ) -> Result<Vec<StoredNode>>;

    /// Swap a snapshot's rows for `chunks`.
    ///
    /// The default deletes and then saves chunk by chunk, so a failure midway
    /// leaves the snapshot partially written. Stores that can do better override it.
    async fn replace_snapshot(
        &self,
        customer_id: u64,
        snapshot_id: u64,
        chunks: Vec<Vec<PersistedNode>>,
    ) -> Result<()> {
        let removed = self.delete_by_snapshot(customer_id, snapshot_id).await?;
        log::debug!(
            "Removed {} rows of snapshot {}/{}",
            removed,
            customer_id,
            snapshot_id
        );
        for (index, chunk) in chunks.into_iter().enumerate() {
            log::debug!("Writing chunk {} ({} rows)", index, chunk.len());
            self.save_nodes(chunk).await?;
        }
        Ok(())
    }
}

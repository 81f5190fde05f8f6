use crate::error::Result;
use crate::store::NodeStore;
use crate::table::NodeTable;
use async_trait::async_trait;
use tokio::sync::RwLock;
use usage_protocol::{PersistedNode, StoredNode};

/// Process-local store. Contents are lost on drop.
#[derive(Debug, Default)]
pub struct MemoryNodeStore {
    table: RwLock<NodeTable>,
}

impl MemoryNodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows across all snapshots.
    pub async fn len(&self) -> usize {
        self.table.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl NodeStore for MemoryNodeStore {
    async fn save_nodes(&self, batch: Vec<PersistedNode>) -> Result<()> {
        self.table.write().await.insert(batch);
        Ok(())
    }

    async fn delete_by_snapshot(&self, customer_id: u64, snapshot_id: u64) -> Result<usize> {
        Ok(self
            .table
            .write()
            .await
            .delete_snapshot(customer_id, snapshot_id))
    }

    async fn find_children(
        &self,
        customer_id: u64,
        snapshot_id: u64,
        parent_signature: &str,
    ) -> Result<Vec<StoredNode>> {
        Ok(self
            .table
            .read()
            .await
            .children(customer_id, snapshot_id, parent_signature))
    }

    async fn find_by_signature_substring(
        &self,
        customer_id: u64,
        snapshot_id: u64,
        substring: &str,
        exclude_id: Option<u64>,
    ) -> Result<Vec<StoredNode>> {
        Ok(self
            .table
            .read()
            .await
            .search(customer_id, snapshot_id, substring, exclude_id))
    }

    async fn replace_snapshot(
        &self,
        customer_id: u64,
        snapshot_id: u64,
        chunks: Vec<Vec<PersistedNode>>,
    ) -> Result<()> {
        // One write guard: readers see either the old rows or the new ones.
        let mut table = self.table.write().await;
        table.delete_snapshot(customer_id, snapshot_id);
        for chunk in chunks {
            table.insert(chunk);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use usage_protocol::NodeType;

    fn node(signature: &str, parent: &str) -> PersistedNode {
        PersistedNode {
            snapshot_id: 5,
            customer_id: 9,
            signature: signature.to_string(),
            parent_signature: parent.to_string(),
            node_type: NodeType::Method,
            used_count: 1,
            unused_count: 0,
            last_invoked_at_millis: Some(10),
        }
    }

    #[tokio::test]
    async fn test_save_and_query() {
        let store = MemoryNodeStore::new();
        store
            .save_nodes(vec![node("a.B", ""), node("a.B.run()", "a.B"), node("a.B.stop()", "a.B")])
            .await
            .unwrap();

        let children = store.find_children(9, 5, "a.B").await.unwrap();
        let mut signatures: Vec<String> = children.into_iter().map(|s| s.node.signature).collect();
        signatures.sort();
        assert_eq!(signatures, vec!["a.B.run()", "a.B.stop()"]);

        let hits = store.find_by_signature_substring(9, 5, "run", None).await.unwrap();
        assert_eq!(hits.len(), 1);
        let excluded = store
            .find_by_signature_substring(9, 5, "run", Some(hits[0].id))
            .await
            .unwrap();
        assert!(excluded.is_empty());
    }

    #[tokio::test]
    async fn test_replace_snapshot_swaps_rows() {
        let store = MemoryNodeStore::new();
        store.save_nodes(vec![node("old.Old", "")]).await.unwrap();

        store
            .replace_snapshot(9, 5, vec![vec![node("new.A", "")], vec![node("new.B", "")]])
            .await
            .unwrap();

        assert_eq!(store.len().await, 2);
        assert!(store
            .find_by_signature_substring(9, 5, "old", None)
            .await
            .unwrap()
            .is_empty());
    }
}

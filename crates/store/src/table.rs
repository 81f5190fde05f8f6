use serde::{Deserialize, Serialize};
use usage_protocol::{PersistedNode, StoredNode};

/// Row table shared by the in-memory and file-backed stores.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct NodeTable {
    next_id: u64,
    nodes: Vec<StoredNode>,
}

impl NodeTable {
    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn insert(&mut self, batch: Vec<PersistedNode>) {
        self.nodes.reserve(batch.len());
        for node in batch {
            self.next_id += 1;
            self.nodes.push(StoredNode {
                id: self.next_id,
                node,
            });
        }
    }

    pub(crate) fn delete_snapshot(&mut self, customer_id: u64, snapshot_id: u64) -> usize {
        let before = self.nodes.len();
        self.nodes
            .retain(|stored| !stored.node.belongs_to(customer_id, snapshot_id));
        before - self.nodes.len()
    }

    pub(crate) fn children(
        &self,
        customer_id: u64,
        snapshot_id: u64,
        parent_signature: &str,
    ) -> Vec<StoredNode> {
        self.scoped(customer_id, snapshot_id)
            .filter(|stored| stored.node.parent_signature == parent_signature)
            .cloned()
            .collect()
    }

    pub(crate) fn search(
        &self,
        customer_id: u64,
        snapshot_id: u64,
        substring: &str,
        exclude_id: Option<u64>,
    ) -> Vec<StoredNode> {
        self.scoped(customer_id, snapshot_id)
            .filter(|stored| Some(stored.id) != exclude_id)
            .filter(|stored| stored.node.signature.contains(substring))
            .cloned()
            .collect()
    }

    fn scoped(&self, customer_id: u64, snapshot_id: u64) -> impl Iterator<Item = &StoredNode> {
        self.nodes
            .iter()
            .filter(move |stored| stored.node.belongs_to(customer_id, snapshot_id))
    }
}

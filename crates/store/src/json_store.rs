use crate::error::{Result, StoreError};
use crate::store::NodeStore;
use crate::table::NodeTable;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use usage_protocol::{PersistedNode, StoredNode};

pub const NODE_STORE_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Deserialize)]
struct PersistedNodeStore {
    schema_version: u32,
    #[serde(flatten)]
    table: NodeTable,
}

#[derive(Serialize)]
struct PersistedNodeStoreRef<'a> {
    schema_version: u32,
    #[serde(flatten)]
    table: &'a NodeTable,
}

/// Store backed by a single JSON file.
///
/// Rows are served from memory. Each mutation is applied to a copy of the table,
/// written to `<file>.tmp` and renamed over the file before it becomes visible,
/// so the file always holds a complete table.
#[derive(Debug)]
pub struct JsonNodeStore {
    path: PathBuf,
    table: RwLock<NodeTable>,
}

impl JsonNodeStore {
    /// Open the store at `path`. A missing file is an empty store.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let table = if tokio::fs::try_exists(&path).await? {
            log::info!("Loading node store from {:?}", path);
            let bytes = tokio::fs::read(&path).await?;
            let persisted: PersistedNodeStore = serde_json::from_slice(&bytes)?;
            if persisted.schema_version != NODE_STORE_SCHEMA_VERSION {
                return Err(StoreError::SchemaMismatch {
                    expected: NODE_STORE_SCHEMA_VERSION,
                    actual: persisted.schema_version,
                });
            }
            log::info!("Loaded {} nodes", persisted.table.len());
            persisted.table
        } else {
            log::info!("Creating node store at {:?}", path);
            NodeTable::default()
        };

        Ok(Self {
            path,
            table: RwLock::new(table),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn len(&self) -> usize {
        self.table.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Apply `mutate` to a copy of the table, persist the copy, then publish it.
    async fn commit<T>(&self, mutate: impl FnOnce(&mut NodeTable) -> T) -> Result<T> {
        let mut guard = self.table.write().await;
        let mut next = guard.clone();
        let outcome = mutate(&mut next);
        let bytes = serde_json::to_vec(&PersistedNodeStoreRef {
            schema_version: NODE_STORE_SCHEMA_VERSION,
            table: &next,
        })?;
        self.write_atomically(bytes).await?;
        *guard = next;
        Ok(outcome)
    }

    async fn write_atomically(&self, bytes: Vec<u8>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        log::debug!("Node store saved to {:?}", self.path);
        Ok(())
    }
}

#[async_trait]
impl NodeStore for JsonNodeStore {
    async fn save_nodes(&self, batch: Vec<PersistedNode>) -> Result<()> {
        self.commit(|table| table.insert(batch)).await
    }

    async fn delete_by_snapshot(&self, customer_id: u64, snapshot_id: u64) -> Result<usize> {
        self.commit(|table| table.delete_snapshot(customer_id, snapshot_id))
            .await
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
        self.commit(|table| {
            table.delete_snapshot(customer_id, snapshot_id);
            for chunk in chunks {
                table.insert(chunk);
            }
        })
        .await
    }
}

use serde::{Deserialize, Serialize};

/// Outcome of one snapshot recompute.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildReport {
    pub customer_id: u64,
    pub snapshot_id: u64,

    /// Records in the input batch
    pub records_total: usize,

    /// Records selected by the package filter
    pub records_matched: usize,

    /// Matched records left out because their signature could not be parsed
    pub records_skipped: usize,

    /// Rows handed to the store
    pub nodes_written: usize,

    pub chunks_written: usize,

    /// Time taken in milliseconds
    pub elapsed_ms: u64,

    pub skipped: Vec<SkippedRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedRecord {
    /// Position in the input batch
    pub index: usize,
    pub signature: String,
    pub reason: String,
}

impl BuildReport {
    pub fn new(customer_id: u64, snapshot_id: u64) -> Self {
        Self {
            customer_id,
            snapshot_id,
            ..Self::default()
        }
    }

    pub fn add_skipped(&mut self, index: usize, signature: &str, reason: String) {
        self.records_skipped += 1;
        self.skipped.push(SkippedRecord {
            index,
            signature: signature.to_string(),
            reason,
        });
    }

    /// Matched records that reached the tree.
    pub fn records_built(&self) -> usize {
        self.records_matched - self.records_skipped
    }
}

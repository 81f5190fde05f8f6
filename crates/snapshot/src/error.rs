use thiserror::Error;

pub type Result<T> = std::result::Result<T, SnapshotError>;

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("Tree error: {0}")]
    Tree(#[from] usage_tree::TreeError),

    #[error("Store error: {0}")]
    Store(#[from] usage_store::StoreError),
}

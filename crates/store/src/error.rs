use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Unsupported node store schema_version {actual} (expected {expected})")]
    SchemaMismatch { expected: u32, actual: u32 },

    #[error("{0}")]
    Other(String),
}

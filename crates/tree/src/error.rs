use thiserror::Error;

pub type Result<T> = std::result::Result<T, TreeError>;

#[derive(Error, Debug)]
pub enum TreeError {
    #[error("Invalid signature format '{signature}': {reason}")]
    InvalidSignatureFormat {
        signature: String,
        reason: &'static str,
    },

    #[error("Invalid record #{index}: {source}")]
    InvalidRecord {
        index: usize,
        #[source]
        source: Box<TreeError>,
    },

    #[error("Invalid filter pattern '{pattern}': {message}")]
    InvalidFilterPattern { pattern: String, message: String },

    #[error("Missing identity: {0} must be set before flattening")]
    MissingIdentity(&'static str),

    #[error("Invalid chunk size: must be greater than zero")]
    InvalidChunkSize,
}

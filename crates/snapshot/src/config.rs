use crate::error::Result;
use serde::{Deserialize, Serialize};
use usage_tree::{TreeConfig, DEFAULT_CHUNK_SIZE};

/// What a build does with a record whose signature cannot be parsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvalidRecordPolicy {
    /// Fail the build before anything is written.
    #[default]
    Abort,
    /// Leave the record out and list it in the report.
    Skip,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    /// Rows per store write
    pub chunk_size: usize,

    pub invalid_records: InvalidRecordPolicy,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            invalid_records: InvalidRecordPolicy::Abort,
        }
    }
}

impl ServiceConfig {
    pub fn tree(&self) -> TreeConfig {
        TreeConfig {
            chunk_size: self.chunk_size,
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.tree().validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: ServiceConfig = serde_json::from_str(r#"{"invalid_records":"skip"}"#).unwrap();
        assert_eq!(
            config,
            ServiceConfig {
                chunk_size: 1000,
                invalid_records: InvalidRecordPolicy::Skip,
            }
        );
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        assert!(serde_json::from_str::<ServiceConfig>(r#"{"chunk":5}"#).is_err());
    }

    #[test]
    fn test_zero_chunk_size_is_invalid() {
        let config = ServiceConfig {
            chunk_size: 0,
            ..ServiceConfig::default()
        };
        assert!(config.validate().is_err());
        assert!(ServiceConfig::default().validate().is_ok());
    }
}

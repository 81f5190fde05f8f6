use anyhow::{Context as AnyhowContext, Result};
use std::io::Read;
use std::path::Path;
use usage_protocol::InvocationRecord;

/// Read records from a file, or from stdin when `path` is `None` or `-`.
pub fn read_records(path: Option<&Path>) -> Result<Vec<InvocationRecord>> {
    let raw = match path {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read records from {}", path.display()))?,
        _ => {
            let mut raw = String::new();
            std::io::stdin()
                .read_to_string(&mut raw)
                .context("Failed to read records from stdin")?;
            raw
        }
    };
    parse_records(&raw)
}

/// Parse a JSON array of records or one record per line.
pub fn parse_records(raw: &str) -> Result<Vec<InvocationRecord>> {
    let trimmed = raw.trim_start();
    if trimmed.starts_with('[') {
        return serde_json::from_str(trimmed).context("Invalid JSON record array");
    }

    raw.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str(line)
                .with_context(|| format!("Invalid record on line {}", index + 1))
        })
        .collect()
}

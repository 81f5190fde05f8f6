//! Records shared by the usage tree crates.
//!
//! Input side: [`InvocationRecord`] as emitted by instrumented agents and the
//! [`SnapshotDescriptor`] that scopes one build. Output side: [`PersistedNode`]
//! rows produced by the compressor and [`StoredNode`] once a store has assigned
//! an identity.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Method name agents report for constructors.
pub const CONSTRUCTOR_METHOD_NAME: &str = "<init>";

/// One observed (or never observed) call event for a method signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationRecord {
    /// Raw signature, e.g. `com.foo.Bar.baz(java.lang.String)`
    pub signature: String,

    #[serde(default)]
    pub method_name: String,

    /// Epoch millis of the last observed call; `<= 0` means never observed
    #[serde(default)]
    pub invoked_at_millis: i64,
}

impl InvocationRecord {
    pub fn new(
        signature: impl Into<String>,
        method_name: impl Into<String>,
        invoked_at_millis: i64,
    ) -> Self {
        Self {
            signature: signature.into(),
            method_name: method_name.into(),
            invoked_at_millis,
        }
    }

    pub fn is_constructor(&self) -> bool {
        self.method_name == CONSTRUCTOR_METHOD_NAME
    }

    /// A record counts as used iff it was observed at all and not before the cutoff.
    pub fn is_used(&self, filter_invoked_at_millis: i64) -> bool {
        self.invoked_at_millis > 0 && self.invoked_at_millis >= filter_invoked_at_millis
    }
}

/// Scope of one snapshot build.
///
/// `id` and `customer_id` are optional because a descriptor may exist before the
/// snapshot row itself has been created; flattening requires both.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotDescriptor {
    pub id: Option<u64>,
    pub customer_id: Option<u64>,

    /// Comma-separated package globs; empty means "everything"
    #[serde(default)]
    pub packages: String,

    #[serde(default)]
    pub filter_invoked_at_millis: i64,
}

impl SnapshotDescriptor {
    pub fn new(id: u64, customer_id: u64) -> Self {
        Self {
            id: Some(id),
            customer_id: Some(customer_id),
            ..Self::default()
        }
    }

    pub fn with_packages(mut self, packages: impl Into<String>) -> Self {
        self.packages = packages.into();
        self
    }

    pub fn with_filter_invoked_at_millis(mut self, millis: i64) -> Self {
        self.filter_invoked_at_millis = millis;
        self
    }
}

/// Position of a node in the package/class/method hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NodeType {
    Root,
    Package,
    Class,
    Method,
}

impl NodeType {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeType::Root => "ROOT",
            NodeType::Package => "PACKAGE",
            NodeType::Class => "CLASS",
            NodeType::Method => "METHOD",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Flattened tree node, ready to be written to a store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedNode {
    pub snapshot_id: u64,
    pub customer_id: u64,
    pub signature: String,

    /// Nearest surviving ancestor; empty for top-level rows
    pub parent_signature: String,

    #[serde(rename = "type")]
    pub node_type: NodeType,

    pub used_count: u64,
    pub unused_count: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_invoked_at_millis: Option<i64>,
}

impl PersistedNode {
    pub fn total_count(&self) -> u64 {
        self.used_count + self.unused_count
    }

    pub fn belongs_to(&self, customer_id: u64, snapshot_id: u64) -> bool {
        self.customer_id == customer_id && self.snapshot_id == snapshot_id
    }
}

/// A persisted node together with the identity its store assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredNode {
    pub id: u64,

    #[serde(flatten)]
    pub node: PersistedNode,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn used_requires_positive_timestamp_at_or_after_threshold() {
        let at = |millis| InvocationRecord::new("a.B.c()", "c", millis);

        assert!(at(1000).is_used(1000));
        assert!(at(5000).is_used(1000));
        assert!(!at(999).is_used(1000));
        assert!(!at(0).is_used(0));
        assert!(!at(-5).is_used(-10));
    }

    #[test]
    fn constructor_is_detected_by_method_name() {
        assert!(InvocationRecord::new("a.B(int)", "<init>", 0).is_constructor());
        assert!(!InvocationRecord::new("a.B.init()", "init", 0).is_constructor());
    }

    #[test]
    fn invocation_record_reads_agent_json() {
        let record: InvocationRecord = serde_json::from_str(
            r#"{"signature":"com.foo.Bar.baz()","methodName":"baz","invokedAtMillis":5000}"#,
        )
        .unwrap();
        assert_eq!(record, InvocationRecord::new("com.foo.Bar.baz()", "baz", 5000));
    }

    #[test]
    fn stored_node_serializes_flat_with_type_field() {
        let stored = StoredNode {
            id: 7,
            node: PersistedNode {
                snapshot_id: 1,
                customer_id: 2,
                signature: "com.foo.Bar".to_string(),
                parent_signature: String::new(),
                node_type: NodeType::Class,
                used_count: 1,
                unused_count: 0,
                last_invoked_at_millis: Some(5000),
            },
        };

        let value = serde_json::to_value(&stored).unwrap();
        assert_eq!(value["id"], 7);
        assert_eq!(value["type"], "CLASS");
        assert_eq!(value["parentSignature"], "");
        assert_eq!(value["lastInvokedAtMillis"], 5000);

        let back: StoredNode = serde_json::from_value(value).unwrap();
        assert_eq!(back, stored);
    }
}

use crate::builder::TreeNode;
use crate::error::{Result, TreeError};
use usage_protocol::{NodeType, PersistedNode};

/// Rows handed to the store per write.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeConfig {
    pub chunk_size: usize,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl TreeConfig {
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(TreeError::InvalidChunkSize);
        }
        Ok(())
    }
}

/// Flatten a tree into persistable rows.
///
/// Single-child package chains are elided: their only child is reported under
/// the nearest surviving ancestor instead. The root never produces a row and its
/// children are reported with an empty parent signature. Row order is stable for
/// a given tree shape but carries no meaning.
pub fn flatten(
    root: &TreeNode,
    snapshot_id: Option<u64>,
    customer_id: Option<u64>,
) -> Result<Vec<PersistedNode>> {
    let snapshot_id = snapshot_id.ok_or(TreeError::MissingIdentity("snapshotId"))?;
    let customer_id = customer_id.ok_or(TreeError::MissingIdentity("customerId"))?;

    let mut rows = Vec::new();
    let mut stack: Vec<(&TreeNode, &str)> = vec![(root, "")];

    while let Some((node, parent)) = stack.pop() {
        if node.node_type() == NodeType::Root {
            stack.extend(node.children().iter().rev().map(|child| (child, parent)));
            continue;
        }

        if node.is_foldable() {
            stack.extend(node.children().iter().map(|child| (child, parent)));
            continue;
        }

        rows.push(PersistedNode {
            snapshot_id,
            customer_id,
            signature: node.signature().to_string(),
            parent_signature: parent.to_string(),
            node_type: node.node_type(),
            used_count: node.used_count(),
            unused_count: node.unused_count(),
            last_invoked_at_millis: node.last_invoked_at_millis(),
        });

        stack.extend(
            node.children()
                .iter()
                .rev()
                .map(|child| (child, node.signature())),
        );
    }

    Ok(rows)
}

/// Split rows into write batches of at most `config.chunk_size` rows.
pub fn chunk_nodes(
    nodes: Vec<PersistedNode>,
    config: TreeConfig,
) -> Result<Vec<Vec<PersistedNode>>> {
    config.validate()?;
    let chunk_size = config.chunk_size;

    let mut chunks = Vec::with_capacity(nodes.len().div_ceil(chunk_size));
    let mut rows = nodes.into_iter().peekable();
    while rows.peek().is_some() {
        chunks.push(rows.by_ref().take(chunk_size).collect());
    }
    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{build, TreeBuilder};
    use pretty_assertions::assert_eq;
    use usage_protocol::InvocationRecord;

    fn row(
        signature: &str,
        parent: &str,
        node_type: NodeType,
        used_count: u64,
        unused_count: u64,
        last_invoked_at_millis: Option<i64>,
    ) -> PersistedNode {
        PersistedNode {
            snapshot_id: 1,
            customer_id: 2,
            signature: signature.to_string(),
            parent_signature: parent.to_string(),
            node_type,
            used_count,
            unused_count,
            last_invoked_at_millis,
        }
    }

    fn sorted(mut rows: Vec<PersistedNode>) -> Vec<PersistedNode> {
        rows.sort();
        rows
    }

    fn flatten_records(records: &[InvocationRecord], threshold: i64) -> Vec<PersistedNode> {
        let tree = build(records, threshold).unwrap();
        flatten(tree.root(), Some(1), Some(2)).unwrap()
    }

    #[test]
    fn test_single_method_folds_package_chain() {
        let records = vec![InvocationRecord::new("com.foo.Bar.baz()", "baz", 5000)];
        let rows = flatten_records(&records, 1000);

        assert_eq!(
            sorted(rows),
            sorted(vec![
                row("com.foo.Bar", "", NodeType::Class, 1, 0, Some(5000)),
                row("com.foo.Bar.baz()", "com.foo.Bar", NodeType::Method, 1, 0, Some(5000)),
            ])
        );
    }

    #[test]
    fn test_branching_package_survives() {
        let records = vec![
            InvocationRecord::new("com.foo.a.A.x()", "x", 0),
            InvocationRecord::new("com.foo.b.B.y()", "y", 0),
        ];
        let rows = flatten_records(&records, 1000);

        assert_eq!(
            sorted(rows),
            sorted(vec![
                row("com.foo", "", NodeType::Package, 0, 2, None),
                row("com.foo.a.A", "com.foo", NodeType::Class, 0, 1, None),
                row("com.foo.a.A.x()", "com.foo.a.A", NodeType::Method, 0, 1, None),
                row("com.foo.b.B", "com.foo", NodeType::Class, 0, 1, None),
                row("com.foo.b.B.y()", "com.foo.b.B", NodeType::Method, 0, 1, None),
            ])
        );
    }

    #[test]
    fn test_single_child_class_is_never_folded() {
        let records = vec![InvocationRecord::new("p.q.Outer$Inner.run()", "run", 0)];
        let rows = flatten_records(&records, 0);

        let signatures: Vec<&str> = rows.iter().map(|r| r.signature.as_str()).collect();
        assert_eq!(signatures, vec!["p.q.Outer", "p.q.Outer$Inner", "p.q.Outer$Inner.run()"]);
        assert_eq!(rows[1].parent_signature, "p.q.Outer");
    }

    #[test]
    fn test_root_is_never_emitted() {
        let records = vec![
            InvocationRecord::new("a.A.x()", "x", 0),
            InvocationRecord::new("b.B.y()", "y", 0),
        ];
        let rows = flatten_records(&records, 0);
        assert!(rows.iter().all(|r| r.node_type != NodeType::Root));
        assert!(rows.iter().all(|r| !r.signature.is_empty()));
    }

    #[test]
    fn test_empty_tree_flattens_to_nothing() {
        let tree = TreeBuilder::new(0).finish();
        assert!(flatten(tree.root(), Some(1), Some(2)).unwrap().is_empty());
    }

    #[test]
    fn test_missing_identity() {
        let tree = TreeBuilder::new(0).finish();
        assert!(matches!(
            flatten(tree.root(), None, Some(2)),
            Err(TreeError::MissingIdentity("snapshotId"))
        ));
        assert!(matches!(
            flatten(tree.root(), Some(1), None),
            Err(TreeError::MissingIdentity("customerId"))
        ));
    }

    #[test]
    fn test_chunk_nodes() {
        let rows: Vec<PersistedNode> = (0..5)
            .map(|i| row(&format!("a.C{i}"), "", NodeType::Class, 1, 0, Some(1)))
            .collect();

        let chunks = chunk_nodes(rows.clone(), TreeConfig { chunk_size: 2 }).unwrap();
        assert_eq!(chunks.iter().map(Vec::len).collect::<Vec<_>>(), vec![2, 2, 1]);
        assert_eq!(chunks.concat(), rows);

        assert!(chunk_nodes(Vec::new(), TreeConfig::default())
            .unwrap()
            .is_empty());
        assert!(matches!(
            chunk_nodes(rows, TreeConfig { chunk_size: 0 }),
            Err(TreeError::InvalidChunkSize)
        ));
    }

    #[test]
    fn test_tree_config_default_and_validation() {
        assert_eq!(TreeConfig::default().chunk_size, 1000);
        assert!(TreeConfig { chunk_size: 0 }.validate().is_err());
    }
}

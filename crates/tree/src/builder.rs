use crate::compress;
use crate::error::{Result, TreeError};
use crate::signature::{child_signature, classify, split_signature};
use std::collections::HashMap;
use usage_protocol::{InvocationRecord, NodeType, PersistedNode, SnapshotDescriptor};

/// Node of the in-memory usage trie.
///
/// Each node owns its children. Children keep insertion order so every walk over
/// the same tree shape is deterministic.
#[derive(Debug)]
pub struct TreeNode {
    signature: String,
    node_type: NodeType,
    used_count: u64,
    unused_count: u64,
    last_invoked_at_millis: Option<i64>,
    children: Vec<TreeNode>,
    child_index: HashMap<String, usize>,
}

impl TreeNode {
    fn new(signature: String, node_type: NodeType) -> Self {
        Self {
            signature,
            node_type,
            used_count: 0,
            unused_count: 0,
            last_invoked_at_millis: None,
            children: Vec::new(),
            child_index: HashMap::new(),
        }
    }

    pub fn root() -> Self {
        Self::new(String::new(), NodeType::Root)
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub fn node_type(&self) -> NodeType {
        self.node_type
    }

    pub fn used_count(&self) -> u64 {
        self.used_count
    }

    pub fn unused_count(&self) -> u64 {
        self.unused_count
    }

    pub fn last_invoked_at_millis(&self) -> Option<i64> {
        self.last_invoked_at_millis
    }

    /// Children in insertion order.
    pub fn children(&self) -> &[TreeNode] {
        &self.children
    }

    /// Child reached through `segment`, if any.
    pub fn child(&self, segment: &str) -> Option<&TreeNode> {
        self.child_index.get(segment).map(|&idx| &self.children[idx])
    }

    /// Package nodes with a single child are elided from the flattened output.
    pub fn is_foldable(&self) -> bool {
        self.node_type == NodeType::Package && self.children.len() == 1
    }

    fn count(&mut self, used: bool, invoked_at_millis: i64) {
        if used {
            self.used_count += 1;
            self.last_invoked_at_millis = Some(
                self.last_invoked_at_millis
                    .map_or(invoked_at_millis, |last| last.max(invoked_at_millis)),
            );
        } else {
            self.unused_count += 1;
        }
    }

    fn child_or_insert(&mut self, segment: &str) -> &mut TreeNode {
        let idx = match self.child_index.get(segment) {
            Some(&idx) => idx,
            None => {
                let signature = child_signature(&self.signature, self.node_type, segment);
                let node_type = classify(self.node_type, segment);
                self.children.push(TreeNode::new(signature, node_type));
                let idx = self.children.len() - 1;
                self.child_index.insert(segment.to_string(), idx);
                idx
            }
        };
        &mut self.children[idx]
    }
}

// Deeply nested signatures would otherwise recurse once per level on drop.
impl Drop for TreeNode {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

/// Folds invocation records into one counted tree.
///
/// The tree is only available through [`TreeBuilder::finish`], after the whole
/// batch has been added.
#[derive(Debug)]
pub struct TreeBuilder {
    root: TreeNode,
    filter_invoked_at_millis: i64,
    records: usize,
}

impl TreeBuilder {
    pub fn new(filter_invoked_at_millis: i64) -> Self {
        Self {
            root: TreeNode::root(),
            filter_invoked_at_millis,
            records: 0,
        }
    }

    /// Parse one record and count it along its path.
    ///
    /// A malformed signature leaves the tree untouched.
    pub fn add(&mut self, record: &InvocationRecord) -> Result<()> {
        let segments = split_signature(&record.signature, record.is_constructor())?;
        let used = record.is_used(self.filter_invoked_at_millis);
        self.add_path(&segments, used, record.invoked_at_millis);
        Ok(())
    }

    /// Count one contribution on every node of `segments`, root included.
    pub fn add_path<S: AsRef<str>>(&mut self, segments: &[S], used: bool, invoked_at_millis: i64) {
        let mut node = &mut self.root;
        node.count(used, invoked_at_millis);
        for segment in segments {
            node = node.child_or_insert(segment.as_ref());
            node.count(used, invoked_at_millis);
        }
        self.records += 1;
    }

    pub fn record_count(&self) -> usize {
        self.records
    }

    pub fn finish(self) -> UsageTree {
        log::debug!("Usage tree complete: {} records", self.records);
        UsageTree {
            root: self.root,
            records: self.records,
        }
    }
}

/// Build a tree from a whole batch, failing on the first malformed record.
///
/// `InvalidRecord::index` counts the items yielded by `records`. When the batch
/// was filtered first it is a position in the filtered list, not the original
/// input; callers that need input positions drive a [`TreeBuilder`] directly.
pub fn build<'a, I>(records: I, filter_invoked_at_millis: i64) -> Result<UsageTree>
where
    I: IntoIterator<Item = &'a InvocationRecord>,
{
    let mut builder = TreeBuilder::new(filter_invoked_at_millis);
    for (index, record) in records.into_iter().enumerate() {
        builder.add(record).map_err(|err| TreeError::InvalidRecord {
            index,
            source: Box::new(err),
        })?;
    }
    Ok(builder.finish())
}

/// A finished usage tree.
#[derive(Debug)]
pub struct UsageTree {
    root: TreeNode,
    records: usize,
}

impl UsageTree {
    pub fn root(&self) -> &TreeNode {
        &self.root
    }

    pub fn record_count(&self) -> usize {
        self.records
    }

    /// Number of nodes, root excluded.
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        let mut stack: Vec<&TreeNode> = self.root.children.iter().collect();
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.children.iter());
        }
        count
    }

    /// Walk a path of segments from the root.
    pub fn find<S: AsRef<str>>(&self, segments: &[S]) -> Option<&TreeNode> {
        segments
            .iter()
            .try_fold(&self.root, |node, segment| node.child(segment.as_ref()))
    }

    pub fn flatten(&self, descriptor: &SnapshotDescriptor) -> Result<Vec<PersistedNode>> {
        compress::flatten(&self.root, descriptor.id, descriptor.customer_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record(signature: &str, method_name: &str, invoked_at_millis: i64) -> InvocationRecord {
        InvocationRecord::new(signature, method_name, invoked_at_millis)
    }

    #[test]
    fn test_build_counts_every_node_on_path() {
        let records = vec![record("com.foo.Bar.baz()", "baz", 5000)];
        let tree = build(&records, 1000).unwrap();

        let paths: [&[&str]; 4] = [
            &["com"],
            &["com", "foo"],
            &["com", "foo", "Bar"],
            &["com", "foo", "Bar", "baz()"],
        ];
        for path in paths {
            let node = tree.find(path).unwrap();
            assert_eq!(node.used_count(), 1, "{path:?}");
            assert_eq!(node.unused_count(), 0, "{path:?}");
            assert_eq!(node.last_invoked_at_millis(), Some(5000), "{path:?}");
        }
        assert_eq!(tree.root().used_count(), 1);
        assert_eq!(tree.node_count(), 4);
    }

    #[test]
    fn test_build_assigns_types_and_signatures() {
        let records = vec![record("com.foo.Outer$Inner.run(int)", "run", 1)];
        let tree = build(&records, 0).unwrap();

        let expect: [(&[&str], &str, NodeType); 5] = [
            (&["com"], "com", NodeType::Package),
            (&["com", "foo"], "com.foo", NodeType::Package),
            (&["com", "foo", "Outer"], "com.foo.Outer", NodeType::Class),
            (&["com", "foo", "Outer", "Inner"], "com.foo.Outer$Inner", NodeType::Class),
            (
                &["com", "foo", "Outer", "Inner", "run(int)"],
                "com.foo.Outer$Inner.run(int)",
                NodeType::Method,
            ),
        ];
        for (path, signature, node_type) in expect {
            let node = tree.find(path).unwrap();
            assert_eq!(node.signature(), signature);
            assert_eq!(node.node_type(), node_type);
        }
    }

    #[test]
    fn test_shared_path_accumulates() {
        let records = vec![record("a.b.C.m()", "m", 2000), record("a.b.C.m()", "m", 0)];
        let tree = build(&records, 1000).unwrap();

        let class = tree.find(&["a", "b", "C"]).unwrap();
        assert_eq!((class.used_count(), class.unused_count()), (1, 1));
        assert_eq!(class.last_invoked_at_millis(), Some(2000));
        assert_eq!(tree.node_count(), 4);
    }

    #[test]
    fn test_last_invoked_is_max_over_used_contributions() {
        let records = vec![
            record("a.B.x()", "x", 3000),
            record("a.B.y()", "y", 9000),
            record("a.B.z()", "z", 500),
        ];
        let tree = build(&records, 1000).unwrap();

        let class = tree.find(&["a", "B"]).unwrap();
        assert_eq!(class.last_invoked_at_millis(), Some(9000));
        assert_eq!((class.used_count(), class.unused_count()), (2, 1));

        let unused = tree.find(&["a", "B", "z()"]).unwrap();
        assert_eq!(unused.last_invoked_at_millis(), None);
    }

    #[test]
    fn test_constructor_creates_class_and_call_nodes() {
        let records = vec![record("a.b.C(int)", "<init>", 0)];
        let tree = build(&records, 1000).unwrap();

        let class = tree.find(&["a", "b", "C"]).unwrap();
        assert_eq!(class.node_type(), NodeType::Class);
        assert_eq!(class.unused_count(), 1);

        let ctor = tree.find(&["a", "b", "C", "C(int)"]).unwrap();
        assert_eq!(ctor.node_type(), NodeType::Method);
        assert_eq!(ctor.signature(), "a.b.C(int)");
        assert_eq!(ctor.unused_count(), 1);
    }

    #[test]
    fn test_children_keep_insertion_order() {
        let records = vec![
            record("p.Z.z()", "z", 1),
            record("p.A.a()", "a", 1),
            record("p.M.m()", "m", 1),
        ];
        let tree = build(&records, 0).unwrap();
        let names: Vec<&str> = tree
            .find(&["p"])
            .unwrap()
            .children()
            .iter()
            .map(TreeNode::signature)
            .collect();
        assert_eq!(names, vec!["p.Z", "p.A", "p.M"]);
    }

    #[test]
    fn test_build_reports_failing_record_index() {
        let records = vec![record("a.B.ok()", "ok", 1), record("a.B.broken", "broken", 1)];
        let err = build(&records, 0).unwrap_err();
        match err {
            TreeError::InvalidRecord { index, source } => {
                assert_eq!(index, 1);
                assert!(matches!(*source, TreeError::InvalidSignatureFormat { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_build_index_counts_the_records_it_was_given() {
        let records = vec![
            record("skip.Me.x()", "x", 1),
            record("a.B.ok()", "ok", 1),
            record("a.B.broken", "broken", 1),
        ];
        let filtered = crate::filter::PackageFilter::parse("a.*")
            .unwrap()
            .apply(&records);
        let err = build(filtered, 0).unwrap_err();
        assert!(matches!(err, TreeError::InvalidRecord { index: 1, .. }));
    }

    #[test]
    fn test_malformed_record_leaves_builder_untouched() {
        let mut builder = TreeBuilder::new(0);
        assert!(builder.add(&record("no.parens", "x", 1)).is_err());
        assert_eq!(builder.record_count(), 0);
        let tree = builder.finish();
        assert_eq!(tree.node_count(), 0);
        assert_eq!(tree.root().unused_count(), 0);
    }

    #[test]
    fn test_deep_nesting_is_walked_iteratively() {
        let depth = 3_000;
        let segments = vec!["C"; depth];
        let mut builder = TreeBuilder::new(0);
        builder.add_path(&segments, true, 1);
        let tree = builder.finish();
        assert_eq!(tree.node_count(), depth);

        let rows = tree.flatten(&SnapshotDescriptor::new(1, 1)).unwrap();
        assert_eq!(rows.len(), depth);
        assert!(rows.iter().all(|row| row.node_type == NodeType::Class));
        assert_eq!(rows[0].parent_signature, "");
        drop(tree);
    }
}

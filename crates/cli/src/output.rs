use anyhow::Result;
use serde::Serialize;
use usage_protocol::StoredNode;
use usage_snapshot::BuildReport;

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Rows sorted by signature, one per line.
pub fn print_nodes(mut nodes: Vec<StoredNode>) {
    nodes.sort_by(|a, b| a.node.signature.cmp(&b.node.signature));
    eprintln!("{} nodes", nodes.len());
    for stored in &nodes {
        println!("{}", format_node(stored));
    }
}

pub fn format_node(stored: &StoredNode) -> String {
    let node = &stored.node;
    let last = node
        .last_invoked_at_millis
        .map(|millis| millis.to_string())
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{:>6} {:<7} used={:<5} unused={:<5} last={:<13} {}",
        stored.id,
        node.node_type.as_str(),
        node.used_count,
        node.unused_count,
        last,
        node.signature
    )
}

pub fn print_report(report: &BuildReport) {
    println!(
        "Snapshot {}/{}: {} rows in {} chunks from {} of {} records ({} skipped) in {}ms",
        report.customer_id,
        report.snapshot_id,
        report.nodes_written,
        report.chunks_written,
        report.records_built(),
        report.records_total,
        report.records_skipped,
        report.elapsed_ms
    );
    for skipped in &report.skipped {
        println!("  skipped #{} {}: {}", skipped.index, skipped.signature, skipped.reason);
    }
}

//! JSON export — the canonical graph document.
//!
//! This is the hand-off format for a storage collaborator: it carries the
//! node pool, the relationships with their endpoint ids, and the namespace
//! map of the graph.
//!
//! ```text
//! Graph → export_json() → {"__id", "__nodes", "__relationships", ...}
//!       → import_json() → Graph (relationships re-wired to the pool)
//! ```

use std::io::{Read, Write};

use crate::model::Graph;
use crate::Result;

/// Write `graph` as a pretty-printed canonical document.
pub fn export_json(graph: &Graph, writer: &mut dyn Write) -> Result<()> {
    serde_json::to_writer_pretty(&mut *writer, &graph.to_json())?;
    writeln!(writer)?;
    tracing::debug!(
        graph = %graph.id(), nodes = graph.node_count(), relationships = graph.relationship_count(),
        "graph exported"
    );
    Ok(())
}

/// Read a canonical document back into a graph.
pub fn import_json(reader: &mut dyn Read) -> Result<Graph> {
    let document: serde_json::Value = serde_json::from_reader(reader)?;
    let graph = Graph::from_json(&document)?;
    tracing::debug!(
        graph = %graph.id(), nodes = graph.node_count(), relationships = graph.relationship_count(),
        "graph imported"
    );
    Ok(graph)
}

//! Namespace paths: delimiter-joined id chains from a root.
//!
//! Walks relationships from parent (left) to child (right), depth first,
//! in relationship order. A node reachable through several parents keeps
//! the first path found and is not walked again.

use hashbrown::HashMap;

use super::{Graph, NodeId};

/// Path of every node reachable from `root`. The root maps to its own id.
pub fn namespace_map(graph: &Graph, root: &NodeId) -> HashMap<NodeId, String> {
    let mut children: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
    for rel in graph.relationships() {
        if let (Some(parent), Some(child)) = (rel.left_id(), rel.right_id()) {
            children.entry(parent).or_default().push(child);
        }
    }

    let mut map = HashMap::new();
    map.insert(root.clone(), root.to_string());
    descend(root, &root.to_string(), graph.namespace_delimiter(), &children, &mut map);
    map
}

fn descend(
    parent: &NodeId,
    path: &str,
    delimiter: &str,
    children: &HashMap<NodeId, Vec<NodeId>>,
    map: &mut HashMap<NodeId, String>,
) {
    let Some(kids) = children.get(parent) else { return };
    for child in kids {
        if map.contains_key(child) {
            continue;
        }
        let child_path = format!("{path}{delimiter}{child}");
        map.insert(child.clone(), child_path.clone());
        descend(child, &child_path, delimiter, children, map);
    }
}

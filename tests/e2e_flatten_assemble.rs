//! End-to-end tests for the nested ⇄ normalized transform.
//!
//! Each test builds nested nodes, flattens them into a `NodeDataGraph`, and
//! checks the pool, the synthesized edges, the namespace map, and the
//! assembled reconstruction.

use entity_graph::{
    Graph, GraphConfig, Node, NodeDataGraph, NodeId, Protection, Value, Warning,
};
use pretty_assertions::assert_eq;

// ============================================================================
// Helper: the A/B/C/D/E/ROOT document
// ============================================================================

fn sample_root() -> Node {
    let a = Node::with_id("A", "A");
    let b = Node::with_id("B", "B");
    let c = Node::with_id("C", "C");
    let d = Node::with_id("D", Value::list([a, b, c]));
    let e = Node::with_id("E", Value::list([Value::map([("D_d", d)])]));
    Node::with_id("ROOT", e)
}

fn id(s: &str) -> NodeId {
    NodeId::from(s)
}

// ============================================================================
// 1. Flatten counts: 6 nodes, 5 relationships, 6 namespace entries
// ============================================================================

#[test]
fn test_flatten_sample_counts() {
    let flat = NodeDataGraph::new(&sample_root()).unwrap();
    let graph = flat.graph();

    assert_eq!(graph.node_count(), 6);
    assert_eq!(graph.relationship_count(), 5);
    assert_eq!(flat.namespace_map().len(), 6);
    assert!(graph.relationships().iter().all(|r| r.protection() == Protection::Preserve));
    assert!(graph.relationships().iter().all(|r| r.rel_type() == "EMBEDDED"));
}

// ============================================================================
// 2. Namespace paths follow parent → child edges
// ============================================================================

#[test]
fn test_flatten_sample_namespaces() {
    let flat = NodeDataGraph::new(&sample_root()).unwrap();
    let map = flat.namespace_map();

    assert_eq!(map[&id("ROOT")], "ROOT");
    assert_eq!(map[&id("E")], "ROOT::E");
    assert_eq!(map[&id("D")], "ROOT::E::D");
    assert_eq!(map[&id("A")], "ROOT::E::D::A");
    assert_eq!(map[&id("C")], "ROOT::E::D::C");
}

#[test]
fn test_custom_delimiter() {
    let config = GraphConfig::default().with_namespace_delimiter("/");
    let flat = NodeDataGraph::with_config(&sample_root(), config).unwrap();
    assert_eq!(flat.namespace_map()[&id("B")], "ROOT/E/D/B");
}

// ============================================================================
// 3. Pooled payloads hold markers, never nodes
// ============================================================================

#[test]
fn test_pool_payloads_are_markers() {
    let flat = NodeDataGraph::new(&sample_root()).unwrap();
    let e = flat.graph().node(&id("E")).unwrap();
    assert_eq!(
        e.data(),
        Value::list([Value::map([("D_d", Value::reference("Node", &id("D")))])])
    );
    assert!(flat.graph().nodes().all(|n| n.children().next().is_none()));
}

// ============================================================================
// 4. assemble(flatten(n)) == n
// ============================================================================

#[test]
fn test_assemble_roundtrip() {
    let root = sample_root();
    let flat = NodeDataGraph::new(&root).unwrap();
    let assembled = flat.assemble().unwrap();

    assert!(assembled.warnings.is_empty());
    assert_eq!(assembled.root, root);
    assert!(!assembled.root.ptr_eq(&root));
}

#[test]
fn test_assemble_keeps_timestamps_and_fields() {
    let leaf = Node::builder("leaf").with_id("leaf").with_name("the leaf").with_ttl(60).build().unwrap();
    let root = Node::builder(Value::map([("x", leaf)])).with_id("root").with_timestamps(5, 6).build().unwrap();

    let assembled = NodeDataGraph::new(&root).unwrap().assemble().unwrap().root;
    assert_eq!(assembled.created_at(), 5);
    assert_eq!(assembled.updated_at(), 6);
    let kid = assembled.children().next().unwrap();
    assert_eq!(kid.name().as_deref(), Some("the leaf"));
    assert_eq!(kid.ttl(), 60);
}

#[test]
fn test_assemble_preserves_sharing() {
    let shared = Node::with_id("shared", 1);
    let root = Node::with_id("root", Value::list([shared.clone(), shared]));
    let flat = NodeDataGraph::new(&root).unwrap();

    // one edge per embedding, one pooled node per id
    assert_eq!(flat.graph().node_count(), 2);
    assert_eq!(flat.graph().relationship_count(), 2);

    let kids: Vec<Node> = flat.assemble().unwrap().root.children().collect();
    assert_eq!(kids.len(), 2);
    assert!(kids[0].ptr_eq(&kids[1]));
}

#[test]
fn test_flatten_does_not_touch_caller_nodes() {
    let root = sample_root();
    let before = root.to_json();
    let _flat = NodeDataGraph::new(&root).unwrap();
    assert_eq!(root.to_json(), before);
}

// ============================================================================
// 5. Partial graphs: missing references pass through
// ============================================================================

#[test]
fn test_assemble_partial_graph() {
    let flat = NodeDataGraph::new(&sample_root()).unwrap();
    let mut graph: Graph = flat.into_graph();
    graph.subtract_node(&id("B"));

    let assembled = NodeDataGraph::assemble_graph(&graph, &id("ROOT")).unwrap();
    assert_eq!(assembled.warnings, vec![Warning::MissingReference(id("B"))]);

    let d = assembled.root.children().next().unwrap().children().next().unwrap();
    assert_eq!(d.id(), &id("D"));
    let items = d.data();
    let items = items.as_list().unwrap();
    assert!(items[0].as_node().is_some());
    assert_eq!(items[1], Value::reference("Node", &id("B")));
}

#[test]
fn test_assemble_from_any_root() {
    let flat = NodeDataGraph::new(&sample_root()).unwrap();
    let d = NodeDataGraph::assemble_graph(flat.graph(), &id("D")).unwrap().root;
    assert_eq!(d.children().count(), 3);
}

// ============================================================================
// 6. Node::to_graph
// ============================================================================

#[test]
fn test_node_to_graph() {
    let flat = sample_root().to_graph().unwrap();
    assert_eq!(flat.root_id(), &id("ROOT"));
    assert_eq!(flat.graph().isolates().len(), 0);
}

//! End-to-end tests for the canonical graph document.
//!
//! export → import must give back an equal graph whose relationships are
//! wired to the imported node pool.

use entity_graph::{
    export_json, import_json, Graph, Node, NodeDataGraph, NodeId, Protection, Relationship, Value,
};
use pretty_assertions::assert_eq;

fn roundtrip(graph: &Graph) -> Graph {
    let mut buf = Vec::new();
    export_json(graph, &mut buf).unwrap();
    import_json(&mut buf.as_slice()).unwrap()
}

// ============================================================================
// 1. Plain graphs
// ============================================================================

#[test]
fn test_graph_roundtrip_preserves_everything() {
    let a = Node::builder(Value::map([("age", Value::from(30))])).with_id("a").with_name("alice").build().unwrap();
    let b = Node::with_id("b", "bob");
    let rel = Relationship::builder(&a, &b)
        .with_rel_type("knows")
        .with_direction(entity_graph::Direction::LeftToRight)
        .build()
        .unwrap();
    let mut graph = Graph::new();
    graph.add_relationship(&rel).unwrap();

    let back = roundtrip(&graph);
    assert_eq!(back.id(), graph.id());
    assert_eq!(back.node_count(), 2);
    assert_eq!(back.node(&NodeId::from("a")), graph.node(&NodeId::from("a")));
    assert_eq!(back.relationships(), graph.relationships());
    assert_eq!(back.to_json(), graph.to_json());
}

#[test]
fn test_imported_relationships_point_into_the_pool() {
    let (a, b) = (Node::with_id("a", 1), Node::with_id("b", 2));
    let mut graph = Graph::new();
    graph.add_relationship(&Relationship::new(&a, &b)).unwrap();

    let back = roundtrip(&graph);
    let rel = &back.relationships()[0];
    let left = rel.left_node().unwrap();
    assert!(left.ptr_eq(back.node(&NodeId::from("a")).unwrap()));
    assert!(!left.ptr_eq(&a));
}

// ============================================================================
// 2. Protection survives the trip and is re-wired
// ============================================================================

#[test]
fn test_imported_protection_fires() {
    let (a, b) = (Node::with_id("a", 1), Node::with_id("b", 2));
    let mut graph = Graph::new();
    let rel = Relationship::builder(&a, &b).with_protection(Protection::CascadeDelete).build().unwrap();
    graph.add_relationship(&rel).unwrap();

    let mut back = roundtrip(&graph);
    let imported = back.relationships()[0].clone();
    assert_eq!(imported.protection(), Protection::CascadeDelete);

    back.subtract_node(&NodeId::from("b"));
    assert!(imported.is_reset());
    // the exported original is unaffected
    assert!(rel.is_active());
}

// ============================================================================
// 3. Flattened documents reassemble after a trip through JSON
// ============================================================================

#[test]
fn test_flattened_graph_roundtrip_then_assemble() {
    let leaf = Node::with_id("leaf", "x");
    let mid = Node::with_id("mid", Value::map([("leaf", Value::from(&leaf))]));
    let root = Node::with_id("root", Value::list([Value::from(&mid), Value::from(&leaf)]));

    let flat = NodeDataGraph::new(&root).unwrap();
    let back = roundtrip(flat.graph());
    assert_eq!(back.namespace_map(), flat.namespace_map());
    assert_eq!(back.namespace_delimiter(), "::");
    assert_eq!(back.relationship_count(), 3);

    let assembled = NodeDataGraph::assemble_graph(&back, &NodeId::from("root")).unwrap();
    assert!(assembled.warnings.is_empty());
    assert_eq!(assembled.root, root);
}

// ============================================================================
// 4. Malformed documents
// ============================================================================

#[test]
fn test_import_rejects_dangling_relationship() {
    let (a, b) = (Node::with_id("a", 1), Node::with_id("b", 2));
    let mut graph = Graph::new();
    graph.add_relationship(&Relationship::new(&a, &b)).unwrap();

    let mut document = graph.to_json();
    document["__nodes"].as_array_mut().unwrap().retain(|n| n["__object"]["id"] != "b");
    assert!(Graph::from_json(&document).is_err());
}

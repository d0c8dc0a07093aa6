//! End-to-end tests for the operator algebra.
//!
//! Operands are nodes, relationships and graphs; each test combines two of
//! them through `OperatorResolver` and checks the resulting element.

use entity_graph::{
    Direction, Element, Error, Graph, Kind, Node, NodeDataGraph, NodeId, OperatorResolver,
    Relationship, Value,
};

// ============================================================================
// Helper
// ============================================================================

fn nodes(ids: &[&str]) -> Vec<Node> {
    ids.iter().map(|id| Node::with_id(*id, *id)).collect()
}

// ============================================================================
// 1. Entity - entity → Relationship
// ============================================================================

#[test]
fn test_link_is_undirected() {
    let n = nodes(&["a", "b"]);
    let rel = n[0].link(&n[1]).unwrap().into_relationship().unwrap();
    assert_eq!(rel.direction(), Direction::None);
    assert_eq!(rel.left_node().unwrap().id(), n[0].id());
    assert_eq!(rel.right_node().unwrap().id(), n[1].id());
}

#[test]
fn test_directed_links() {
    let n = nodes(&["a", "b"]);
    let ltr = n[0].link_left_to_right(&n[1]).unwrap().into_relationship().unwrap();
    let rtl = n[0].link_right_to_left(&n[1]).unwrap().into_relationship().unwrap();
    assert_eq!(ltr.direction(), Direction::LeftToRight);
    assert_eq!(rtl.direction(), Direction::RightToLeft);
}

// ============================================================================
// 2. Relationship - entity → Graph with a bridge
// ============================================================================

#[test]
fn test_chain_of_links() {
    let n = nodes(&["a", "b", "c"]);
    let ab = n[0].link(&n[1]).unwrap();
    let graph = ab.link(&n[2]).unwrap().into_graph().unwrap();

    assert_eq!(graph.node_count(), 3);
    assert_eq!(graph.relationship_count(), 2);

    let bridge = &graph.relationships()[1];
    assert_eq!(bridge.left_id().unwrap().as_str(), "b");
    assert_eq!(bridge.right_id().unwrap().as_str(), "c");
}

#[test]
fn test_entity_then_relationship() {
    let n = nodes(&["a", "b", "c"]);
    let bc = Relationship::new(&n[1], &n[2]);
    let graph = n[0].link_left_to_right(&bc).unwrap().into_graph().unwrap();

    assert_eq!(graph.node_count(), 3);
    assert_eq!(graph.relationship_count(), 2);
    let bridge = graph.relationships().iter().find(|r| r.id() != bc.id()).unwrap();
    assert_eq!(bridge.direction(), Direction::LeftToRight);
    assert_eq!(bridge.left_id().unwrap().as_str(), "a");
    assert_eq!(bridge.right_id().unwrap().as_str(), "b");
}

#[test]
fn test_relationship_then_relationship() {
    let n = nodes(&["a", "b", "c", "d"]);
    let ab = Relationship::new(&n[0], &n[1]);
    let cd = Relationship::new(&n[2], &n[3]);
    let graph = (&ab).link_right_to_left(&cd).unwrap().into_graph().unwrap();

    assert_eq!(graph.node_count(), 4);
    assert_eq!(graph.relationship_count(), 3);
    let bridge = &graph.relationships()[2];
    assert_eq!(bridge.direction(), Direction::RightToLeft);
    assert_eq!(bridge.left_id().unwrap().as_str(), "b");
    assert_eq!(bridge.right_id().unwrap().as_str(), "c");
}

// ============================================================================
// 3. Graph + / - anything
// ============================================================================

#[test]
fn test_graph_union() {
    let n = nodes(&["a", "b", "c", "d", "e"]);
    let mut g1 = Graph::new();
    g1.add_relationship(&Relationship::new(&n[0], &n[1])).unwrap();
    let mut g2 = Graph::new();
    g2.add_relationship(&Relationship::new(&n[2], &n[3])).unwrap();
    g2.add_relationship(&Relationship::new(&n[3], &n[4])).unwrap();

    let union = g1.merge(g2).unwrap().into_graph().unwrap();
    assert_eq!(union.node_count(), 5);
    assert_eq!(union.relationship_count(), 3);
}

#[test]
fn test_graph_add_and_subtract_entities() {
    let n = nodes(&["a", "b", "c"]);
    let graph = Graph::new();
    let graph = graph.merge(&n[0]).unwrap();
    let graph = graph.merge(Relationship::new(&n[1], &n[2])).unwrap();
    let graph = graph.into_graph().unwrap();
    assert_eq!(graph.node_count(), 3);
    assert_eq!(graph.isolates().len(), 1);

    let graph = graph.subtract(&n[1]).unwrap().into_graph().unwrap();
    assert_eq!(graph.node_count(), 2);
    assert_eq!(graph.relationship_count(), 0);
}

#[test]
fn test_graph_subtract_graph() {
    let n = nodes(&["a", "b", "c"]);
    let whole = n[0].link(&n[1]).unwrap().link(&n[2]).unwrap().into_graph().unwrap();
    let part = n[0].link(&n[1]).unwrap().into_relationship().unwrap().to_graph().unwrap();

    let rest = whole.subtract(part).unwrap().into_graph().unwrap();
    // `part` holds a different a-b edge; removing a and b takes both edges
    assert_eq!(rest.node_count(), 1);
    assert_eq!(rest.relationship_count(), 0);
}

#[test]
fn test_union_of_flattens_sharing_an_embedded_node() {
    let x = Node::with_id("X", "shared");
    let r1 = Node::with_id("R1", Value::list([Value::from(&x)]));
    let r2 = Node::with_id("R2", Value::list([Value::from(&x)]));
    let g1 = NodeDataGraph::new(&r1).unwrap().into_graph();
    let g2 = NodeDataGraph::new(&r2).unwrap().into_graph();

    // g2 and its copy of X are released by the merge
    let union = g1.merge(g2).unwrap().into_graph().unwrap();
    assert_eq!(union.node_count(), 3);
    assert_eq!(union.relationship_count(), 2);

    let pooled_x = union.node(&NodeId::from("X")).unwrap();
    for rel in union.relationships() {
        assert!(rel.is_active());
        assert!(rel.right_node().unwrap().ptr_eq(pooled_x));
    }
    assert_eq!(union.to_json()["__relationships"].as_array().unwrap().len(), 2);
    assert_eq!(union.relationships_of(&NodeId::from("X")).len(), 2);
}

// ============================================================================
// 4. Unsupported combinations
// ============================================================================

#[test]
fn test_unsupported_operands() {
    let n = nodes(&["a", "b"]);
    let graph = Graph::new();

    let err = n[0].link(graph.clone()).unwrap_err();
    assert!(matches!(err, Error::UnsupportedOperands { left: Kind::Node, right: Kind::Graph, .. }));

    let err = n[0].merge(&n[1]).unwrap_err();
    assert!(matches!(err, Error::UnsupportedOperands { op: "+", .. }));

    let err = graph.link(&n[0]).unwrap_err();
    assert!(matches!(err, Error::UnsupportedOperands { left: Kind::Graph, right: Kind::Node, .. }));
}

#[test]
fn test_element_dispatch() {
    let n = nodes(&["a", "b"]);
    let element = Element::from(&n[0]);
    assert_eq!(element.kind(), Kind::Node);
    let rel = element.link_left_to_right(&n[1]).unwrap();
    assert_eq!(rel.kind(), Kind::Relationship);
}

#[test]
fn test_link_with_dropped_endpoint_fails() {
    let a = Node::with_id("a", 0);
    let rel = {
        let b = Node::with_id("b", 0);
        Relationship::new(&a, &b)
    };
    let c = Node::with_id("c", 0);
    assert!(matches!((&rel).link(&c), Err(Error::DetachedRelationship(_))));
}

//! # Property-Based Tests
//!
//! Structural round-trips over generated acyclic payloads: the canonical
//! JSON form and the flatten/assemble pair must both be lossless.

use entity_graph::{Node, NodeDataGraph, Value};
use proptest::collection::{btree_map, vec};
use proptest::prelude::*;

// =============================================================================
// STRATEGIES
// =============================================================================

fn scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Int),
        (-1.0e12..1.0e12f64).prop_map(Value::Float),
        prop_oneof![Just(f64::NAN), Just(f64::INFINITY), Just(f64::NEG_INFINITY)].prop_map(Value::Float),
        "[a-zA-Z0-9 _.-]{0,16}".prop_map(Value::String),
        vec(any::<u8>(), 0..8).prop_map(Value::Bytes),
    ]
}

/// Nested payloads with embedded nodes; every embedded node is fresh, so
/// the tree is acyclic and ids never collide.
fn payload() -> impl Strategy<Value = Value> {
    scalar().prop_recursive(4, 48, 4, |inner| {
        prop_oneof![
            vec(inner.clone(), 0..4).prop_map(Value::List),
            btree_map("[a-z]{1,5}", inner.clone(), 0..4).prop_map(Value::Map),
            inner.prop_map(|data| Value::Node(Node::new(data))),
        ]
    })
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// parse(serialize(n)) == n
    #[test]
    fn canonical_json_roundtrip(data in payload()) {
        let node = Node::new(data);
        let back = Node::from_json(&node.to_json()).expect("decode");
        prop_assert_eq!(&back, &node);
        prop_assert_eq!(back.canonical_string(), node.canonical_string());
    }

    /// assemble(flatten(n)) == n, without touching the input.
    #[test]
    fn flatten_assemble_roundtrip(data in payload()) {
        let root = Node::new(data);
        let before = root.to_json();

        let flat = NodeDataGraph::new(&root).expect("flatten");
        let assembled = flat.assemble().expect("assemble");

        prop_assert!(assembled.warnings.is_empty());
        prop_assert_eq!(&assembled.root, &root);
        prop_assert_eq!(root.to_json(), before);
    }

    /// Every pooled node but the root is reached by at least one edge, and
    /// every one of them has a namespace path.
    #[test]
    fn flatten_pool_is_connected(data in payload()) {
        let root = Node::new(data);
        let flat = NodeDataGraph::new(&root).expect("flatten");
        let graph = flat.graph();

        prop_assert_eq!(flat.namespace_map().len(), graph.node_count());
        for node in graph.nodes() {
            if node.id() == root.id() {
                continue;
            }
            prop_assert!(graph.relationships().iter().any(|r| r.right_id().as_ref() == Some(node.id())));
        }
    }
}

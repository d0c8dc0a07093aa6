//! # entity-graph — In-Memory Entity Graph Engine
//!
//! Models arbitrary nested application data as typed, identified nodes,
//! relates them with typed edges, composes nodes/edges/graphs algebraically,
//! and converts between the nested view (nodes embedded inside other nodes'
//! payloads) and the normalized view (flat node pool + explicit edges).
//!
//! ## Design Principles
//!
//! 1. **Handles, not copies**: `Node` and `Relationship` are cheap shared
//!    handles; embedding a node shares its identity
//! 2. **Edges never own**: a `Relationship` holds weak back-references and
//!    resolves its protection policy the moment an endpoint is dropped
//! 3. **Explicit algebra**: operand kinds are dispatched through a
//!    pair-keyed table, never through tag arithmetic
//! 4. **Canonical form is the contract**: equality, hashing and export all
//!    go through the same serialized shape
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use entity_graph::{Node, NodeDataGraph, OperatorResolver, Value};
//!
//! # fn example() -> entity_graph::Result<()> {
//! let a = Node::with_id("A", "leaf");
//! let root = Node::with_id("ROOT", Value::list([Value::from(a.clone())]));
//!
//! // Nested -> normalized
//! let flat = NodeDataGraph::new(&root)?;
//! assert_eq!(flat.graph().node_count(), 2);
//!
//! // Normalized -> nested
//! let assembled = flat.assemble()?;
//! assert_eq!(assembled.root, root);
//!
//! // Algebra
//! let edge = a.link_left_to_right(&root)?;
//! # let _ = edge;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod index;
pub mod hooks;
pub mod config;
pub mod export;

// ============================================================================
// Re-exports: Model
// ============================================================================

pub use model::{
    Node, NodeBuilder, NodeId, Children,
    Relationship, RelationshipBuilder, RelId, Direction, Protection, RelationType,
    Endpoint, EndpointSlot,
    Graph, GraphId, NodeDataGraph, Assembled,
    Value, PropertyMap, Encoding,
    Kind, DirectionTag, Operation, Element, OperatorResolver, direction_of,
    ShapeDescriptor, ShapeRegistry, IndexSpec,
    Versioned,
};

// ============================================================================
// Re-exports: Indexing, hooks, configuration, export
// ============================================================================

pub use index::{Indexed, IndexDefinition, IndexType};
pub use hooks::{Event, EventKind, Notifier, Validator};
pub use config::GraphConfig;
pub use export::{export_json, import_json};

// ============================================================================
// Error Types
// ============================================================================

/// Fatal errors. Every one of these aborts the call that raised it.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unsupported operand kinds for '{op}': {left} and {right}")]
    UnsupportedOperands { op: &'static str, left: Kind, right: Kind },

    #[error("Type error on field '{field}': expected {expected}, got {got}")]
    TypeMismatch { field: String, expected: String, got: String },

    #[error("Shape conflict: {0}")]
    ShapeConflict(String),

    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Field is read-only: {0}")]
    ReadOnlyField(String),

    #[error("Unknown encoding: {0}")]
    UnknownEncoding(String),

    #[error("Relationship is detached: {0}")]
    DetachedRelationship(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Malformed document: {0}")]
    Malformed(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

// ============================================================================
// Warnings
// ============================================================================

/// Recoverable conditions. The operation that reports one has already
/// completed; warnings are also emitted through `tracing`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Warning {
    #[error("Encoding mismatch on node {node}: declared {declared}, detected {detected}")]
    EncodingMismatch { node: NodeId, declared: Encoding, detected: Encoding },

    #[error("Circular reference in payload of node {0}")]
    CircularReference(NodeId),

    #[error("Unresolved reference to node {0}")]
    MissingReference(NodeId),

    #[error("Write to frozen entity {entity} ignored (field '{field}')")]
    FrozenWrite { entity: String, field: String },
}

//! # Entity Graph Model
//!
//! Nodes, relationships and graphs, the operator algebra that combines
//! them, and the flatten/assemble transform between nested and normalized
//! form.
//!
//! Design rule: no storage, no query language, no I/O here. Collaborators
//! reach this module through `hooks` and the canonical codec only.

pub mod algebra;
pub mod codec;
pub mod encoding;
pub mod graph;
pub mod namespace;
pub mod node;
pub mod node_data_graph;
pub mod property_map;
pub mod relationship;
pub mod shape;
pub mod value;
pub mod versioning;

pub use algebra::{direction_of, DirectionTag, Element, Kind, Operation, OperatorResolver};
pub use encoding::Encoding;
pub use graph::{Graph, GraphId};
pub use node::{Children, Node, NodeBuilder, NodeId};
pub use node_data_graph::{Assembled, NodeDataGraph};
pub use property_map::PropertyMap;
pub use relationship::{
    Direction, Endpoint, EndpointSlot, Protection, RelId, RelationType, Relationship,
    RelationshipBuilder,
};
pub use shape::{IndexSpec, ShapeDescriptor, ShapeRegistry};
pub use value::Value;
pub use versioning::Versioned;

/// Current UTC time as epoch seconds.
pub(crate) fn now_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}

//! Operator algebra over graph elements.
//!
//! Combining two elements (`link`, `link_left_to_right`,
//! `link_right_to_left`, `merge`, `subtract`) first resolves the ordered
//! pair of operand kinds to a [`DirectionTag`], then lets the left operand
//! decide what the operation means for that tag.
//!
//! ```text
//! node  - node   → Relationship(NONE)
//! node  > node   → Relationship(LEFT_TO_RIGHT)
//! rel   - node   → Graph { rel, bridge(rel.right, node) }
//! graph + graph  → Graph (union)
//! graph - node   → Graph (node and its edges removed)
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{Direction, Graph, Node, NodeDataGraph, Relationship};
use crate::{Error, Result};

// ============================================================================
// Kinds and direction tags
// ============================================================================

/// Element kind, used only for operator dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Kind {
    None,
    Core,
    Node,
    Relationship,
    Index,
    Graph,
    Constraint,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Kind::None => "NONE",
            Kind::Core => "CORE",
            Kind::Node => "NODE",
            Kind::Relationship => "RELATIONSHIP",
            Kind::Index => "INDEX",
            Kind::Graph => "GRAPH",
            Kind::Constraint => "CONSTRAINT",
        })
    }
}

/// Which semantic operation an ordered operand pair selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectionTag {
    EntityEntity,
    EntityRelationship,
    RelationshipRelationship,
    RelationshipEntity,
    GraphGraph,
    GraphEntity,
    GraphRelationship,
    NotFound,
}

/// Ordered pair table. `(Node, Relationship)` and `(Relationship, Node)`
/// are distinct entries.
const DIRECTION_TABLE: &[((Kind, Kind), DirectionTag)] = &[
    ((Kind::Node, Kind::Node), DirectionTag::EntityEntity),
    ((Kind::Node, Kind::Relationship), DirectionTag::EntityRelationship),
    ((Kind::Relationship, Kind::Relationship), DirectionTag::RelationshipRelationship),
    ((Kind::Relationship, Kind::Node), DirectionTag::RelationshipEntity),
    ((Kind::Graph, Kind::Graph), DirectionTag::GraphGraph),
    ((Kind::Graph, Kind::Node), DirectionTag::GraphEntity),
    ((Kind::Graph, Kind::Relationship), DirectionTag::GraphRelationship),
];

/// Resolve an ordered pair of kinds. Total: absent pairs map to `NotFound`.
pub fn direction_of(left: Kind, right: Kind) -> DirectionTag {
    DIRECTION_TABLE
        .iter()
        .find(|(pair, _)| *pair == (left, right))
        .map(|(_, tag)| *tag)
        .unwrap_or(DirectionTag::NotFound)
}

// ============================================================================
// Operations
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// `-` between entities
    Link,
    /// `>`
    LinkLeftRight,
    /// `<`
    LinkRightLeft,
    /// `+`
    Add,
    /// `-` between a graph and anything
    Sub,
}

impl Operation {
    pub fn symbol(&self) -> &'static str {
        match self {
            Operation::Link | Operation::Sub => "-",
            Operation::LinkLeftRight => ">",
            Operation::LinkRightLeft => "<",
            Operation::Add => "+",
        }
    }

    /// Direction of the edge a link operation creates.
    pub fn link_direction(&self) -> Option<Direction> {
        match self {
            Operation::Link => Some(Direction::None),
            Operation::LinkLeftRight => Some(Direction::LeftToRight),
            Operation::LinkRightLeft => Some(Direction::RightToLeft),
            Operation::Add | Operation::Sub => None,
        }
    }

    pub(crate) fn unsupported(&self, left: Kind, right: Kind) -> Error {
        Error::UnsupportedOperands { op: self.symbol(), left, right }
    }
}

// ============================================================================
// Element
// ============================================================================

/// Any operand of the algebra.
#[derive(Debug, Clone)]
pub enum Element {
    Node(Node),
    Relationship(Relationship),
    Graph(Graph),
}

impl Element {
    pub fn kind(&self) -> Kind {
        match self {
            Element::Node(_) => Kind::Node,
            Element::Relationship(_) => Kind::Relationship,
            Element::Graph(_) => Kind::Graph,
        }
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Element::Node(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_relationship(&self) -> Option<&Relationship> {
        match self {
            Element::Relationship(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_graph(&self) -> Option<&Graph> {
        match self {
            Element::Graph(g) => Some(g),
            _ => None,
        }
    }

    pub fn into_relationship(self) -> Option<Relationship> {
        match self {
            Element::Relationship(r) => Some(r),
            _ => None,
        }
    }

    pub fn into_graph(self) -> Option<Graph> {
        match self {
            Element::Graph(g) => Some(g),
            _ => None,
        }
    }
}

impl From<Node> for Element { fn from(n: Node) -> Self { Element::Node(n) } }
impl From<&Node> for Element { fn from(n: &Node) -> Self { Element::Node(n.clone()) } }
impl From<Relationship> for Element { fn from(r: Relationship) -> Self { Element::Relationship(r) } }
impl From<&Relationship> for Element { fn from(r: &Relationship) -> Self { Element::Relationship(r.clone()) } }
impl From<Graph> for Element { fn from(g: Graph) -> Self { Element::Graph(g) } }
impl From<NodeDataGraph> for Element { fn from(g: NodeDataGraph) -> Self { Element::Graph(g.into_graph()) } }

// ============================================================================
// OperatorResolver
// ============================================================================

/// The contract every algebra operand implements: report a kind, and
/// interpret an operation for a resolved direction tag.
///
/// The named operators are provided on top of `operation_resolution`.
pub trait OperatorResolver: Sized {
    fn kind(&self) -> Kind;

    fn operation_resolution(
        self,
        other: Element,
        operation: Operation,
        direction: DirectionTag,
    ) -> Result<Element>;

    /// `self - other`: undirected link.
    fn link(self, other: impl Into<Element>) -> Result<Element> {
        self.apply(other.into(), Operation::Link)
    }

    /// `self > other`
    fn link_left_to_right(self, other: impl Into<Element>) -> Result<Element> {
        self.apply(other.into(), Operation::LinkLeftRight)
    }

    /// `self < other`
    fn link_right_to_left(self, other: impl Into<Element>) -> Result<Element> {
        self.apply(other.into(), Operation::LinkRightLeft)
    }

    /// `self + other`
    fn merge(self, other: impl Into<Element>) -> Result<Element> {
        self.apply(other.into(), Operation::Add)
    }

    /// `self - other` where `self` is a graph.
    fn subtract(self, other: impl Into<Element>) -> Result<Element> {
        self.apply(other.into(), Operation::Sub)
    }

    #[doc(hidden)]
    fn apply(self, other: Element, operation: Operation) -> Result<Element> {
        let direction = direction_of(self.kind(), other.kind());
        if direction == DirectionTag::NotFound {
            return Err(operation.unsupported(self.kind(), other.kind()));
        }
        self.operation_resolution(other, operation, direction)
    }
}

impl OperatorResolver for Element {
    fn kind(&self) -> Kind {
        Element::kind(self)
    }

    fn operation_resolution(
        self,
        other: Element,
        operation: Operation,
        direction: DirectionTag,
    ) -> Result<Element> {
        match self {
            Element::Node(n) => (&n).operation_resolution(other, operation, direction),
            Element::Relationship(r) => (&r).operation_resolution(other, operation, direction),
            Element::Graph(g) => g.operation_resolution(other, operation, direction),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_order_sensitive() {
        assert_eq!(direction_of(Kind::Node, Kind::Relationship), DirectionTag::EntityRelationship);
        assert_eq!(direction_of(Kind::Relationship, Kind::Node), DirectionTag::RelationshipEntity);
        assert_ne!(
            direction_of(Kind::Node, Kind::Relationship),
            direction_of(Kind::Relationship, Kind::Node)
        );
    }

    #[test]
    fn test_table_is_total() {
        let kinds = [
            Kind::None, Kind::Core, Kind::Node, Kind::Relationship,
            Kind::Index, Kind::Graph, Kind::Constraint,
        ];
        let found = kinds
            .iter()
            .flat_map(|a| kinds.iter().map(move |b| direction_of(*a, *b)))
            .filter(|tag| *tag != DirectionTag::NotFound)
            .count();
        assert_eq!(found, DIRECTION_TABLE.len());
        assert_eq!(direction_of(Kind::Node, Kind::Graph), DirectionTag::NotFound);
        assert_eq!(direction_of(Kind::Index, Kind::Index), DirectionTag::NotFound);
    }

    #[test]
    fn test_operation_symbols() {
        assert_eq!(Operation::Link.symbol(), "-");
        assert_eq!(Operation::LinkLeftRight.link_direction(), Some(Direction::LeftToRight));
        assert_eq!(Operation::Add.link_direction(), None);
    }
}

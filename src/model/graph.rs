//! Graph — node pool plus relationship list, with merge/subtract algebra.
//!
//! Invariant: every relationship in the graph has both endpoints in the
//! node pool. `add_relationship` inserts them; `subtract_node` takes the
//! node's relationships with it.

use std::collections::BTreeMap;
use std::fmt;

use hashbrown::{HashMap, HashSet};
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};

use super::codec::{Decoder, OBJECT_KEY, TYPE_KEY};
use super::{
    DirectionTag, Element, Kind, Node, NodeId, Operation, OperatorResolver, RelId, Relationship,
};
use crate::{Error, Result};

pub const DEFAULT_NAMESPACE_DELIMITER: &str = "/";

const GRAPH_ID_KEY: &str = "__id";
const NODES_KEY: &str = "__nodes";
const RELATIONSHIPS_KEY: &str = "__relationships";
const NAMESPACE_MAP_KEY: &str = "__namespace_map";
const NAMESPACE_DELIMITER_KEY: &str = "__namespace_delimiter";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GraphId(pub String);

impl GraphId {
    pub fn generate() -> Self {
        GraphId(uuid::Uuid::new_v4().to_string())
    }
}

impl fmt::Display for GraphId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone)]
pub struct Graph {
    id: GraphId,
    // Before `nodes`: edges are released before the endpoints they watch.
    relationships: Vec<Relationship>,
    relationship_ids: HashSet<RelId>,
    nodes: BTreeMap<NodeId, Node>,
    namespace_map: HashMap<NodeId, String>,
    namespace_delimiter: String,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Graph {
    pub fn new() -> Self {
        Self::with_delimiter(DEFAULT_NAMESPACE_DELIMITER)
    }

    pub fn with_delimiter(delimiter: impl Into<String>) -> Self {
        Self {
            id: GraphId::generate(),
            relationships: Vec::new(),
            relationship_ids: HashSet::new(),
            nodes: BTreeMap::new(),
            namespace_map: HashMap::new(),
            namespace_delimiter: delimiter.into(),
        }
    }

    pub fn id(&self) -> &GraphId {
        &self.id
    }

    pub fn namespace_delimiter(&self) -> &str {
        &self.namespace_delimiter
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn relationship_count(&self) -> usize {
        self.relationships.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.relationships.is_empty()
    }

    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn contains_node(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Nodes in id order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    pub fn relationship(&self, id: &RelId) -> Option<&Relationship> {
        self.relationships.iter().find(|r| r.id().as_ref() == Some(id))
    }

    /// Relationships with `id` on either side, in insertion order.
    pub fn relationships_of(&self, id: &NodeId) -> Vec<&Relationship> {
        self.relationships.iter().filter(|r| r.touches(id)).collect()
    }

    pub fn namespace_map(&self) -> &HashMap<NodeId, String> {
        &self.namespace_map
    }

    pub fn namespace_of(&self, id: &NodeId) -> Option<&str> {
        self.namespace_map.get(id).map(String::as_str)
    }

    pub(crate) fn set_namespace_map(&mut self, map: HashMap<NodeId, String>) {
        self.namespace_map = map;
    }

    // ========================================================================
    // Growth
    // ========================================================================

    /// Insert a node; an existing node with the same id is kept.
    /// Returns whether the node was inserted.
    pub fn add_node(&mut self, node: &Node) -> bool {
        if self.nodes.contains_key(node.id()) {
            return false;
        }
        self.nodes.insert(node.id().clone(), node.clone());
        true
    }

    /// Insert a relationship and both its endpoints. A relationship whose
    /// id is already present is skipped. Returns whether it was inserted.
    pub fn add_relationship(&mut self, rel: &Relationship) -> Result<bool> {
        let id = rel.id().ok_or_else(|| Error::DetachedRelationship(rel.describe()))?;
        let (left, right) = match (rel.left_node(), rel.right_node()) {
            (Some(l), Some(r)) => (l, r),
            _ => return Err(Error::DetachedRelationship(rel.describe())),
        };
        if !self.relationship_ids.insert(id) {
            return Ok(false);
        }
        self.add_node(&left);
        self.add_node(&right);
        self.push_pooled(rel, &left, &right);
        Ok(true)
    }

    /// Append `rel`, re-pointed at the pooled handles when an endpoint id
    /// is held here by a different node handle.
    fn push_pooled(&mut self, rel: &Relationship, left: &Node, right: &Node) {
        let (Some(pooled_left), Some(pooled_right)) = (self.nodes.get(left.id()), self.nodes.get(right.id()))
        else {
            self.relationships.push(rel.clone());
            return;
        };
        if pooled_left.ptr_eq(left) && pooled_right.ptr_eq(right) {
            self.relationships.push(rel.clone());
        } else {
            tracing::debug!(rel = %rel.describe(), graph = %self.id, "relationship rebound to pooled endpoints");
            let rebound = rel.rebound(pooled_left, pooled_right);
            self.relationships.push(rebound);
        }
    }

    /// Union by id: nodes and namespace entries already present win,
    /// relationships are appended and re-pointed at the pooled nodes.
    pub fn add_graph(&mut self, other: &Graph) {
        for node in other.nodes.values() {
            self.add_node(node);
        }
        for rel in &other.relationships {
            let Some(id) = rel.id() else { continue };
            if !self.relationship_ids.insert(id) {
                continue;
            }
            match (rel.left_node(), rel.right_node()) {
                (Some(left), Some(right)) => self.push_pooled(rel, &left, &right),
                _ => self.relationships.push(rel.clone()),
            }
        }
        for (id, path) in &other.namespace_map {
            self.namespace_map.entry(id.clone()).or_insert_with(|| path.clone());
        }
        tracing::debug!(
            graph = %self.id, from = %other.id,
            nodes = self.nodes.len(), relationships = self.relationships.len(),
            "graphs merged"
        );
    }

    // ========================================================================
    // Shrinking
    // ========================================================================

    /// Remove a node together with every relationship incident to it.
    pub fn subtract_node(&mut self, id: &NodeId) -> Option<Node> {
        let node = self.nodes.remove(id)?;
        self.retain_relationships(|r| !r.touches(id));
        self.namespace_map.remove(id);
        Some(node)
    }

    pub fn subtract_relationship(&mut self, id: &RelId) -> Option<Relationship> {
        let index = self.relationships.iter().position(|r| r.id().as_ref() == Some(id))?;
        self.relationship_ids.remove(id);
        Some(self.relationships.remove(index))
    }

    /// Remove `other`'s relationships, then its nodes.
    pub fn subtract_graph(&mut self, other: &Graph) {
        for rel in &other.relationships {
            if let Some(id) = rel.id() {
                self.subtract_relationship(&id);
            }
        }
        for id in other.nodes.keys() {
            self.subtract_node(id);
        }
    }

    /// Nodes no relationship touches through a live endpoint, in id order.
    /// A `PRESERVE` snapshot does not count as incidence.
    pub fn isolates(&self) -> Vec<&Node> {
        let mut touched: HashSet<NodeId> = HashSet::new();
        for rel in &self.relationships {
            touched.extend(rel.left_node().map(|n| n.id().clone()));
            touched.extend(rel.right_node().map(|n| n.id().clone()));
        }
        self.nodes.values().filter(|n| !touched.contains(n.id())).collect()
    }

    pub fn clear(&mut self) {
        self.relationships.clear();
        self.relationship_ids.clear();
        self.nodes.clear();
        self.namespace_map.clear();
    }

    fn retain_relationships(&mut self, keep: impl Fn(&Relationship) -> bool) {
        let (kept, dropped): (Vec<_>, Vec<_>) = std::mem::take(&mut self.relationships)
            .into_iter()
            .partition(|r| keep(r));
        for rel in &dropped {
            if let Some(id) = rel.id() {
                self.relationship_ids.remove(&id);
            }
        }
        self.relationships = kept;
    }
}

// ============================================================================
// Canonical document
// ============================================================================

impl Graph {
    /// `{"__id", "__nodes", "__relationships", "__namespace_map",
    /// "__namespace_delimiter"}`. Relationships that lost an endpoint are
    /// left out.
    pub fn to_json(&self) -> JsonValue {
        let nodes: Vec<JsonValue> = self.nodes.values().map(Node::to_json).collect();
        let relationships: Vec<JsonValue> = self
            .relationships
            .iter()
            .filter(|r| r.is_active())
            .map(|r| {
                let mut wrapper = JsonMap::new();
                wrapper.insert(TYPE_KEY.into(), JsonValue::String(r.type_name().to_owned()));
                wrapper.insert(OBJECT_KEY.into(), r.to_canonical());
                JsonValue::Object(wrapper)
            })
            .collect();
        let namespace: BTreeMap<&str, &str> = self
            .namespace_map
            .iter()
            .map(|(id, path)| (id.as_str(), path.as_str()))
            .collect();

        let mut object = JsonMap::new();
        object.insert(GRAPH_ID_KEY.into(), JsonValue::String(self.id.0.clone()));
        object.insert(NODES_KEY.into(), JsonValue::Array(nodes));
        object.insert(RELATIONSHIPS_KEY.into(), JsonValue::Array(relationships));
        object.insert(
            NAMESPACE_MAP_KEY.into(),
            JsonValue::Object(namespace.into_iter().map(|(k, v)| (k.to_owned(), JsonValue::from(v))).collect()),
        );
        object.insert(NAMESPACE_DELIMITER_KEY.into(), JsonValue::String(self.namespace_delimiter.clone()));
        JsonValue::Object(object)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_json())?)
    }

    /// Rebuild a graph document. Relationships are re-wired to the decoded
    /// node pool, so their protection watches are live again.
    pub fn from_json(json: &JsonValue) -> Result<Graph> {
        let object = json
            .as_object()
            .ok_or_else(|| Error::Malformed("graph document must be a mapping".into()))?;
        let array = |key: &str| -> Result<&Vec<JsonValue>> {
            match object.get(key) {
                Some(JsonValue::Array(items)) => Ok(items),
                _ => Err(Error::Malformed(format!("graph document without '{key}' list"))),
            }
        };

        let delimiter = object
            .get(NAMESPACE_DELIMITER_KEY)
            .and_then(JsonValue::as_str)
            .unwrap_or(DEFAULT_NAMESPACE_DELIMITER);
        let mut graph = Graph::with_delimiter(delimiter);
        if let Some(id) = object.get(GRAPH_ID_KEY).and_then(JsonValue::as_str) {
            graph.id = GraphId(id.to_owned());
        }

        let mut decoder = Decoder::new();
        for node in array(NODES_KEY)? {
            graph.add_node(&decoder.node(node)?);
        }
        for wrapper in array(RELATIONSHIPS_KEY)? {
            let type_name = wrapper
                .get(TYPE_KEY)
                .and_then(JsonValue::as_str)
                .ok_or_else(|| Error::Malformed(format!("relationship without {TYPE_KEY}")))?;
            let canonical = wrapper
                .get(OBJECT_KEY)
                .ok_or_else(|| Error::Malformed(format!("relationship without {OBJECT_KEY}")))?;
            let rel = Relationship::from_canonical(canonical, type_name, &mut decoder, |id| graph.node(id).cloned())?;
            graph.add_relationship(&rel)?;
        }
        if let Some(namespace) = object.get(NAMESPACE_MAP_KEY).and_then(JsonValue::as_object) {
            for (id, path) in namespace {
                let path = path
                    .as_str()
                    .ok_or_else(|| Error::Malformed(format!("namespace path of '{id}' must be a string")))?;
                graph.namespace_map.insert(NodeId::from(id.as_str()), path.to_owned());
            }
        }
        Ok(graph)
    }

    pub fn from_json_str(text: &str) -> Result<Graph> {
        Self::from_json(&serde_json::from_str(text)?)
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("id", &self.id)
            .field("nodes", &self.nodes.len())
            .field("relationships", &self.relationships.len())
            .field("namespace_delimiter", &self.namespace_delimiter)
            .finish()
    }
}

// ============================================================================
// Algebra
// ============================================================================

impl OperatorResolver for Graph {
    fn kind(&self) -> Kind {
        Kind::Graph
    }

    fn operation_resolution(
        mut self,
        other: Element,
        operation: Operation,
        direction: DirectionTag,
    ) -> Result<Element> {
        match (operation, direction, other) {
            (Operation::Add, DirectionTag::GraphGraph, Element::Graph(other)) => {
                self.add_graph(&other);
            }
            (Operation::Add, DirectionTag::GraphEntity, Element::Node(node)) => {
                self.add_node(&node);
            }
            (Operation::Add, DirectionTag::GraphRelationship, Element::Relationship(rel)) => {
                self.add_relationship(&rel)?;
            }
            (Operation::Sub, DirectionTag::GraphGraph, Element::Graph(other)) => {
                self.subtract_graph(&other);
            }
            (Operation::Sub, DirectionTag::GraphEntity, Element::Node(node)) => {
                self.subtract_node(node.id());
            }
            (Operation::Sub, DirectionTag::GraphRelationship, Element::Relationship(rel)) => {
                let id = rel.id().ok_or_else(|| Error::DetachedRelationship(rel.describe()))?;
                self.subtract_relationship(&id);
            }
            (_, _, other) => return Err(operation.unsupported(Kind::Graph, other.kind())),
        }
        Ok(Element::Graph(self))
    }
}

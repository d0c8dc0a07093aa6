//! Node — identified, versioned carrier of a nested payload.
//!
//! A `Node` is a shared handle: cloning it (or embedding it in another
//! node's payload) shares the same identity. Use [`Node::clone_node`] for a
//! structural copy.
//!
//! Relationships never own their endpoints. When the last handle to a node
//! is dropped, every relationship watching it resolves its protection
//! policy before the node's memory is released.

use std::borrow::Borrow;
use std::cell::{OnceCell, RefCell};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::iter::FusedIterator;
use std::rc::{Rc, Weak};
use std::sync::Arc;

use hashbrown::{HashMap, HashSet};
use serde::{Deserialize, Serialize};

use super::codec::Encoder;
use super::relationship::{self, RelInner, Watch};
use super::shape::ShapeRegistry;
use super::{
    now_timestamp, DirectionTag, Element, Encoding, Graph, Kind, NodeDataGraph, Operation,
    OperatorResolver, PropertyMap, Relationship, ShapeDescriptor, Value,
};
use crate::hooks::{Event, EventKind, Hooks, Notifier, Validator};
use crate::{Error, Result, Warning};

/// Stable node identifier, assigned at construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    /// Fresh random id (UUID v4, simple form).
    pub fn generate() -> Self {
        NodeId(uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeId { fn from(s: &str) -> Self { NodeId(s.to_owned()) } }
impl From<String> for NodeId { fn from(s: String) -> Self { NodeId(s) } }
impl From<&NodeId> for NodeId { fn from(id: &NodeId) -> Self { id.clone() } }

impl Borrow<str> for NodeId {
    fn borrow(&self) -> &str { &self.0 }
}

/// `ttl` value meaning "never expires". TTL is stored, never enforced.
pub const UNBOUNDED_TTL: i64 = -1;

// ============================================================================
// Node handle and shared state
// ============================================================================

/// A node in the entity graph.
#[derive(Clone)]
pub struct Node {
    pub(crate) inner: Rc<NodeInner>,
}

pub(crate) struct NodeInner {
    pub(crate) id: NodeId,
    pub(crate) shape: Arc<ShapeDescriptor>,
    pub(crate) hooks: Hooks,
    pub(crate) state: RefCell<NodeState>,
    pub(crate) watchers: RefCell<Vec<Watch>>,
}

#[derive(Debug)]
pub(crate) struct NodeState {
    pub(crate) version: u64,
    pub(crate) name: Option<String>,
    pub(crate) key: Option<String>,
    pub(crate) encoding: Encoding,
    pub(crate) ttl: i64,
    pub(crate) created_at: i64,
    pub(crate) updated_at: i64,
    pub(crate) data: Value,
    pub(crate) extra: PropertyMap,
    pub(crate) frozen: bool,
}

impl NodeState {
    pub(crate) fn fresh(now: i64) -> Self {
        Self {
            version: 0,
            name: None,
            key: None,
            encoding: Encoding::default(),
            ttl: UNBOUNDED_TTL,
            created_at: now,
            updated_at: now,
            data: Value::Null,
            extra: PropertyMap::new(),
            frozen: false,
        }
    }

    /// Every field but the payload, which the caller supplies.
    fn detached(&self, data: Value) -> Self {
        Self {
            version: self.version,
            name: self.name.clone(),
            key: self.key.clone(),
            encoding: self.encoding,
            ttl: self.ttl,
            created_at: self.created_at,
            updated_at: self.updated_at,
            data,
            extra: self.extra.clone(),
            frozen: false,
        }
    }
}

impl NodeInner {
    pub(crate) fn add_watch(&self, watch: Watch) {
        let mut watchers = self.watchers.borrow_mut();
        watchers.retain(|w| w.relationship.strong_count() > 0);
        watchers.push(watch);
    }

    pub(crate) fn remove_watches(&self, relationship: &Weak<RelInner>) {
        self.watchers
            .borrow_mut()
            .retain(|w| w.relationship.strong_count() > 0 && !Weak::ptr_eq(&w.relationship, relationship));
    }
}

impl Drop for NodeInner {
    fn drop(&mut self) {
        let watchers = std::mem::take(self.watchers.get_mut());
        if watchers.is_empty() {
            return;
        }
        tracing::debug!(node = %self.id, watchers = watchers.len(), "endpoint released");

        // At most one snapshot per drop, however many relationships preserve it.
        let snapshot = OnceCell::new();
        let this: &NodeInner = self;
        let take_snapshot = || snapshot.get_or_init(|| Encoder::new().wrapped(this)).clone();
        for watch in watchers {
            relationship::endpoint_lost(watch, &take_snapshot);
        }
    }
}

// ============================================================================
// Construction
// ============================================================================

impl Node {
    /// Node with a generated id and the default shape.
    pub fn new(data: impl Into<Value>) -> Self {
        Self::with_id(NodeId::generate(), data)
    }

    /// Node with a caller-supplied id and the default shape.
    pub fn with_id(id: impl Into<NodeId>, data: impl Into<Value>) -> Self {
        let node = Self::from_parts(
            id.into(),
            ShapeRegistry::default_node(),
            Hooks::default(),
            NodeState::fresh(now_timestamp()),
        );
        // Warnings are already traced; a plain constructor has no caller
        // channel for them.
        let _ = node.ingest(data.into());
        node
    }

    pub fn builder(data: impl Into<Value>) -> NodeBuilder {
        NodeBuilder::new(data.into())
    }

    pub(crate) fn from_parts(
        id: NodeId,
        shape: Arc<ShapeDescriptor>,
        hooks: Hooks,
        state: NodeState,
    ) -> Self {
        Self {
            inner: Rc::new(NodeInner {
                id,
                shape,
                hooks,
                state: RefCell::new(state),
                watchers: RefCell::new(Vec::new()),
            }),
        }
    }
}

/// Builder for nodes that need more than an id and a payload.
#[must_use]
pub struct NodeBuilder {
    id: Option<NodeId>,
    shape: Option<Arc<ShapeDescriptor>>,
    type_name: Option<String>,
    state: NodeState,
    fields: PropertyMap,
    hooks: Hooks,
    data: Value,
}

impl NodeBuilder {
    fn new(data: Value) -> Self {
        Self {
            id: None,
            shape: None,
            type_name: None,
            state: NodeState::fresh(now_timestamp()),
            fields: PropertyMap::new(),
            hooks: Hooks::default(),
            data,
        }
    }

    pub fn with_id(mut self, id: impl Into<NodeId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.state.name = Some(name.into());
        self
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.state.key = Some(key.into());
        self
    }

    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.state.encoding = encoding;
        self
    }

    pub fn with_ttl(mut self, ttl: i64) -> Self {
        self.state.ttl = ttl;
        self
    }

    pub fn with_timestamps(mut self, created_at: i64, updated_at: i64) -> Self {
        self.state.created_at = created_at;
        self.state.updated_at = updated_at;
        self
    }

    pub fn with_shape(mut self, shape: Arc<ShapeDescriptor>) -> Self {
        self.shape = Some(shape);
        self
    }

    /// Shape by name, resolved through the global registry at build time.
    pub fn with_type(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    /// Value for an extension field declared by the node's shape.
    pub fn with_field(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    pub fn with_validator(mut self, validator: Rc<dyn Validator>) -> Self {
        self.hooks.validator = Some(validator);
        self
    }

    pub fn with_notifier(mut self, notifier: Rc<dyn Notifier>) -> Self {
        self.hooks.notifier = Some(notifier);
        self
    }

    pub fn build(self) -> Result<Node> {
        self.build_with_warnings().map(|(node, _)| node)
    }

    /// Build, also handing back the warnings raised while ingesting the
    /// payload (encoding correction, circular reference).
    pub fn build_with_warnings(self) -> Result<(Node, Vec<Warning>)> {
        let shape = match (self.shape, self.type_name) {
            (Some(shape), _) => shape,
            (None, Some(name)) => ShapeRegistry::global().resolve(&name, Kind::Node)?,
            (None, None) => ShapeRegistry::default_node(),
        };
        if shape.base() != Kind::Node {
            return Err(Error::ShapeConflict(format!(
                "'{}' is a {} shape, not a node shape", shape.name(), shape.base()
            )));
        }
        if let Some(field) = self.fields.keys().find(|f| !shape.is_extra_field(f)) {
            return Err(Error::UnknownField(format!("{field} on shape '{}'", shape.name())));
        }
        if let Some(validator) = &self.hooks.validator {
            validator.validate(&self.data).map_err(Error::Validation)?;
        }

        let mut state = self.state;
        state.extra = self.fields;
        let id = self.id.unwrap_or_else(NodeId::generate);
        let node = Node::from_parts(id, shape, self.hooks, state);
        let warnings = node.ingest(self.data);
        node.notify(EventKind::Created, None);
        Ok((node, warnings))
    }
}

// ============================================================================
// Accessors
// ============================================================================

impl Node {
    pub fn id(&self) -> &NodeId {
        &self.inner.id
    }

    /// Name of the node's shape (`"Node"` unless a shape was given).
    pub fn type_name(&self) -> &str {
        self.inner.shape.name()
    }

    pub fn shape(&self) -> &Arc<ShapeDescriptor> {
        &self.inner.shape
    }

    pub fn version(&self) -> u64 { self.inner.state.borrow().version }
    pub fn name(&self) -> Option<String> { self.inner.state.borrow().name.clone() }
    pub fn key(&self) -> Option<String> { self.inner.state.borrow().key.clone() }
    pub fn encoding(&self) -> Encoding { self.inner.state.borrow().encoding }
    pub fn ttl(&self) -> i64 { self.inner.state.borrow().ttl }
    pub fn created_at(&self) -> i64 { self.inner.state.borrow().created_at }
    pub fn updated_at(&self) -> i64 { self.inner.state.borrow().updated_at }
    pub fn is_frozen(&self) -> bool { self.inner.state.borrow().frozen }

    /// Copy of the payload. Embedded nodes are shared handles.
    pub fn data(&self) -> Value {
        self.inner.state.borrow().data.clone()
    }

    /// Number of live handles to this node.
    pub fn handle_count(&self) -> usize {
        Rc::strong_count(&self.inner)
    }

    /// Whether both handles point at the same node (identity, not structure).
    pub fn ptr_eq(&self, other: &Node) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Read a base or extension field by name.
    ///
    /// Unset optional fields read as `Value::Null`; unknown fields and unset
    /// extension fields read as `None`.
    pub fn get_field(&self, field: &str) -> Option<Value> {
        let state = self.inner.state.borrow();
        let value = match field {
            "id" => Value::String(self.inner.id.0.clone()),
            "version" => Value::Int(state.version as i64),
            "name" => state.name.clone().into(),
            "key" => state.key.clone().into(),
            "encoding" => Value::String(state.encoding.as_str().to_owned()),
            "createdAt" => Value::Int(state.created_at),
            "updatedAt" => Value::Int(state.updated_at),
            "ttl" => Value::Int(state.ttl),
            "data" => state.data.clone(),
            other => return state.extra.get(other).cloned(),
        };
        Some(value)
    }
}

// ============================================================================
// Writes
// ============================================================================

/// A validated field write, applied only when the node is not frozen.
enum FieldWrite {
    Name(Option<String>),
    Key(Option<String>),
    Ttl(i64),
    Encoding(Encoding),
    Extra(String, Value),
}

impl Node {
    /// Replace the payload.
    ///
    /// Runs the validator first (failure is fatal). Byte payloads are
    /// decoded to text; when the detected encoding differs from the
    /// declared one, the detected encoding is adopted and an
    /// `EncodingMismatch` warning is returned. A payload that reaches this
    /// node again yields a `CircularReference` warning.
    pub fn set_data(&self, data: impl Into<Value>) -> Result<Vec<Warning>> {
        let data = data.into();
        if self.is_frozen() {
            return Ok(vec![self.frozen_write("data")]);
        }
        if let Some(validator) = &self.inner.hooks.validator {
            validator.validate(&data).map_err(Error::Validation)?;
        }

        let before = self.inner.hooks.notifier.as_ref().map(|_| self.data());
        let warnings = self.ingest(data);
        self.touch();
        self.notify(EventKind::Updated, before);
        Ok(warnings)
    }

    /// Write a field by name, checking its type.
    pub fn set_field(&self, field: &str, value: impl Into<Value>) -> Result<Vec<Warning>> {
        let value = value.into();
        let write = match field {
            "data" => return self.set_data(value),
            "id" | "version" | "createdAt" | "updatedAt" => {
                return Err(Error::ReadOnlyField(field.to_owned()));
            }
            "name" => FieldWrite::Name(optional_text(field, &value)?),
            "key" => FieldWrite::Key(match &value {
                Value::Null => None,
                Value::String(s) => Some(s.clone()),
                Value::Int(_) | Value::Float(_) | Value::Bool(_) => Some(value.to_string()),
                other => return Err(type_mismatch(field, "scalar", other)),
            }),
            "ttl" => FieldWrite::Ttl(value.as_int().ok_or_else(|| type_mismatch(field, "INTEGER", &value))?),
            "encoding" => FieldWrite::Encoding(
                value.as_str().ok_or_else(|| type_mismatch(field, "STRING", &value))?.parse()?,
            ),
            other if self.inner.shape.is_extra_field(other) => FieldWrite::Extra(other.to_owned(), value),
            other => {
                return Err(Error::UnknownField(format!("{other} on shape '{}'", self.type_name())));
            }
        };
        Ok(self.apply(field, write).into_iter().collect())
    }

    pub fn set_name(&self, name: impl Into<String>) -> Option<Warning> {
        self.apply("name", FieldWrite::Name(Some(name.into())))
    }

    pub fn set_key(&self, key: Option<String>) -> Option<Warning> {
        self.apply("key", FieldWrite::Key(key))
    }

    pub fn set_ttl(&self, ttl: i64) -> Option<Warning> {
        self.apply("ttl", FieldWrite::Ttl(ttl))
    }

    pub fn set_encoding(&self, encoding: Encoding) -> Option<Warning> {
        self.apply("encoding", FieldWrite::Encoding(encoding))
    }

    fn apply(&self, field: &str, write: FieldWrite) -> Option<Warning> {
        if self.is_frozen() {
            return Some(self.frozen_write(field));
        }
        let replaced = {
            let mut state = self.inner.state.borrow_mut();
            match write {
                FieldWrite::Name(name) => {
                    state.name = name;
                    None
                }
                FieldWrite::Key(key) => {
                    state.key = key;
                    None
                }
                FieldWrite::Ttl(ttl) => {
                    state.ttl = ttl;
                    None
                }
                FieldWrite::Encoding(encoding) => {
                    state.encoding = encoding;
                    None
                }
                FieldWrite::Extra(name, value) => state.extra.insert(name, value),
            }
        };
        // The replaced extension value may hold the last handle to a
        // watched node; it is released after the borrow ends.
        drop(replaced);
        self.touch();
        None
    }

    fn frozen_write(&self, field: &str) -> Warning {
        tracing::warn!(node = %self.inner.id, field, "write to frozen node ignored");
        Warning::FrozenWrite { entity: self.inner.id.to_string(), field: field.to_owned() }
    }

    /// Store a payload without validation, notification or timestamp
    /// changes. Decodes byte payloads and checks for cycles.
    fn ingest(&self, data: Value) -> Vec<Warning> {
        let mut warnings = Vec::new();
        let data = match data {
            Value::Bytes(bytes) => {
                let (text, mismatch) = self.decode_bytes(&bytes);
                warnings.extend(mismatch);
                Value::String(text)
            }
            other => other,
        };
        // The old payload may hold the last handle to a watched node; drop
        // it outside the borrow so endpoint hooks can read this node.
        let old = std::mem::replace(&mut self.inner.state.borrow_mut().data, data);
        drop(old);
        warnings.extend(self.detect_cycle());
        warnings
    }

    fn decode_bytes(&self, bytes: &[u8]) -> (String, Option<Warning>) {
        let declared = self.encoding();
        let detected = Encoding::detect(bytes);
        if declared.accepts(detected) {
            return (declared.decode(bytes), None);
        }
        tracing::warn!(
            node = %self.inner.id, %declared, %detected,
            "detected encoding differs from declared, adopting detected"
        );
        self.inner.state.borrow_mut().encoding = detected;
        let warning = Warning::EncodingMismatch { node: self.inner.id.clone(), declared, detected };
        (detected.decode(bytes), Some(warning))
    }

    fn detect_cycle(&self) -> Option<Warning> {
        let target = Rc::as_ptr(&self.inner);
        let mut seen = HashSet::new();
        let state = self.inner.state.borrow();
        if reaches(&state.data, target, &mut seen) {
            tracing::warn!(node = %self.inner.id, "circular reference in payload");
            return Some(Warning::CircularReference(self.inner.id.clone()));
        }
        None
    }

    fn touch(&self) {
        self.inner.state.borrow_mut().updated_at = now_timestamp();
    }

    pub(crate) fn notify(&self, kind: EventKind, before: Option<Value>) {
        if let Some(notifier) = &self.inner.hooks.notifier {
            notifier.notify(&Event {
                kind,
                node: self.inner.id.clone(),
                before,
                after: self.data(),
            });
        }
    }

    pub(crate) fn bump_version(&self, version: u64, updated_at: i64) {
        let mut state = self.inner.state.borrow_mut();
        state.version = version;
        state.updated_at = updated_at;
    }

    pub(crate) fn set_frozen(&self, frozen: bool) {
        self.inner.state.borrow_mut().frozen = frozen;
    }

    /// Swap the payload as-is, keeping `updatedAt`. Used by the
    /// flatten/assemble transform, which must not disturb identity fields.
    pub(crate) fn replace_data_raw(&self, data: Value) -> Value {
        std::mem::replace(&mut self.inner.state.borrow_mut().data, data)
    }

    /// New node with this node's identity fields and the given payload.
    pub(crate) fn copy_with_data(&self, data: Value) -> Node {
        self.copy_as(self.inner.id.clone(), data)
    }

    fn copy_as(&self, id: NodeId, data: Value) -> Node {
        let state = self.inner.state.borrow().detached(data);
        Node::from_parts(id, self.inner.shape.clone(), self.inner.hooks.clone(), state)
    }
}

fn optional_text(field: &str, value: &Value) -> Result<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        other => Err(type_mismatch(field, "STRING", other)),
    }
}

fn type_mismatch(field: &str, expected: &str, got: &Value) -> Error {
    Error::TypeMismatch {
        field: field.to_owned(),
        expected: expected.to_owned(),
        got: got.type_name().to_owned(),
    }
}

fn reaches(value: &Value, target: *const NodeInner, seen: &mut HashSet<*const NodeInner>) -> bool {
    match value {
        Value::Node(node) => {
            let ptr = Rc::as_ptr(&node.inner);
            if ptr == target {
                return true;
            }
            if !seen.insert(ptr) {
                return false;
            }
            let state = node.inner.state.borrow();
            reaches(&state.data, target, seen)
        }
        Value::List(items) => items.iter().any(|v| reaches(v, target, seen)),
        Value::Map(map) => map.values().any(|v| reaches(v, target, seen)),
        _ => false,
    }
}

// ============================================================================
// Structure: children, cloning, graph view
// ============================================================================

impl Node {
    /// Nodes embedded directly in the payload, found by walking through
    /// maps and lists but not into the embedded nodes themselves.
    pub fn children(&self) -> Children {
        Children {
            owner: self.inner.id.clone(),
            pending: vec![self.data()],
        }
    }

    /// Deep copy. Embedded nodes are copied too, preserving sharing and
    /// cycles within the payload.
    ///
    /// `as_new` gives the copy a fresh id, version 0, unbounded ttl and
    /// current timestamps; otherwise every identity field is kept.
    pub fn clone_node(&self, as_new: bool) -> Node {
        let id = if as_new { NodeId::generate() } else { self.inner.id.clone() };
        let copy = self.deep_copy_as(id, &mut HashMap::new());
        if as_new {
            let now = now_timestamp();
            let mut state = copy.inner.state.borrow_mut();
            state.version = 0;
            state.ttl = UNBOUNDED_TTL;
            state.created_at = now;
            state.updated_at = now;
        }
        copy.notify(EventKind::Cloned, Some(self.data()));
        copy
    }

    /// Deep copy under the same ids, without notifying anyone.
    pub(crate) fn structural_copy(&self) -> Node {
        self.deep_copy_as(self.inner.id.clone(), &mut HashMap::new())
    }

    fn deep_copy_as(&self, id: NodeId, memo: &mut HashMap<*const NodeInner, Node>) -> Node {
        let key = Rc::as_ptr(&self.inner);
        if let Some(done) = memo.get(&key) {
            return done.clone();
        }
        let data = self.data();
        let copy = self.copy_as(id, Value::Null);
        memo.insert(key, copy.clone());
        let data = copy_value(data, memo);
        copy.replace_data_raw(data);
        copy
    }

    /// The normalized graph of this node and everything embedded in it.
    pub fn to_graph(&self) -> Result<NodeDataGraph> {
        NodeDataGraph::new(self)
    }
}

fn copy_value(value: Value, memo: &mut HashMap<*const NodeInner, Node>) -> Value {
    match value {
        Value::Node(node) => {
            let id = node.inner.id.clone();
            Value::Node(node.deep_copy_as(id, memo))
        }
        Value::List(items) => Value::List(items.into_iter().map(|v| copy_value(v, memo)).collect()),
        Value::Map(map) => Value::Map(map.into_iter().map(|(k, v)| (k, copy_value(v, memo))).collect()),
        other => other,
    }
}

/// Lazy walk over the nodes embedded in a payload snapshot.
///
/// Single pass: the iterator consumes its snapshot as it goes.
pub struct Children {
    owner: NodeId,
    pending: Vec<Value>,
}

impl Iterator for Children {
    type Item = Node;

    fn next(&mut self) -> Option<Node> {
        while let Some(value) = self.pending.pop() {
            match value {
                Value::Node(node) if node.inner.id != self.owner => return Some(node),
                Value::List(items) => self.pending.extend(items.into_iter().rev()),
                Value::Map(map) => self.pending.extend(map.into_values().rev()),
                _ => {}
            }
        }
        None
    }
}

impl FusedIterator for Children {}

// ============================================================================
// Algebra
// ============================================================================

impl OperatorResolver for &Node {
    fn kind(&self) -> Kind {
        Kind::Node
    }

    fn operation_resolution(
        self,
        other: Element,
        operation: Operation,
        direction: DirectionTag,
    ) -> Result<Element> {
        let Some(link) = operation.link_direction() else {
            return Err(operation.unsupported(Kind::Node, other.kind()));
        };
        match (direction, other) {
            (DirectionTag::EntityEntity, Element::Node(other)) => {
                let rel = Relationship::builder(self, &other).with_direction(link).build()?;
                Ok(Element::Relationship(rel))
            }
            (DirectionTag::EntityRelationship, Element::Relationship(other)) => {
                let head = other
                    .left_node()
                    .ok_or_else(|| Error::DetachedRelationship(other.describe()))?;
                let bridge = Relationship::builder(self, &head).with_direction(link).build()?;
                let mut graph = Graph::new();
                graph.add_node(self);
                graph.add_relationship(&other)?;
                graph.add_relationship(&bridge)?;
                Ok(Element::Graph(graph))
            }
            (_, other) => Err(operation.unsupported(Kind::Node, other.kind())),
        }
    }
}

// ============================================================================
// Equality, hashing, formatting
// ============================================================================

impl Node {
    /// Compact canonical JSON text; the basis of equality and hashing.
    pub fn canonical_string(&self) -> String {
        self.to_json().to_string()
    }
}

/// Structural: two nodes are equal when their canonical forms are.
impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.canonical_string() == other.canonical_string()
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical_string().hash(state);
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct("Node");
        out.field("id", &self.inner.id).field("type", &self.type_name());
        if let Ok(state) = self.inner.state.try_borrow() {
            out.field("version", &state.version).field("name", &state.name);
        }
        out.finish()
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

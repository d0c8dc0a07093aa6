//! Relationship — typed edge between two nodes, with an endpoint lifecycle
//! policy.
//!
//! Endpoints are weak back-references. When an endpoint's last handle is
//! dropped, exactly one outcome fires, in this precedence:
//!
//! ```text
//! custom hook     → hook(rel, slot), nothing else
//! CASCADE_DELETE  → rel.reset()
//! PRESERVE        → snapshot stored, accessor returns it
//! NONE            → accessor returns None
//! ```

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::{Rc, Weak};
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};

use super::codec::{Decoder, Encoder, OBJECT_KEY};
use super::node::NodeInner;
use super::shape::ShapeRegistry;
use super::{
    DirectionTag, Element, Graph, Kind, Node, NodeId, Operation, OperatorResolver, PropertyMap,
    ShapeDescriptor, Value,
};
use crate::{Error, Result, Warning};

/// Relation type given to relationships built without one.
pub const DEFAULT_REL_TYPE: &str = "RELATIONSHIP";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelId(pub String);

impl RelId {
    pub fn generate() -> Self {
        RelId(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RelId { fn from(s: &str) -> Self { RelId(s.to_owned()) } }
impl From<String> for RelId { fn from(s: String) -> Self { RelId(s) } }

// ============================================================================
// Enums
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    #[default]
    None,
    LeftToRight,
    RightToLeft,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::None => "NONE",
            Direction::LeftToRight => "LEFT_TO_RIGHT",
            Direction::RightToLeft => "RIGHT_TO_LEFT",
        }
    }
}

impl FromStr for Direction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "NONE" => Ok(Direction::None),
            "LEFT_TO_RIGHT" => Ok(Direction::LeftToRight),
            "RIGHT_TO_LEFT" => Ok(Direction::RightToLeft),
            other => Err(Error::TypeMismatch {
                field: "direction".into(),
                expected: "NONE | LEFT_TO_RIGHT | RIGHT_TO_LEFT".into(),
                got: other.to_owned(),
            }),
        }
    }
}

/// What happens to a relationship when one of its endpoints is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Protection {
    #[default]
    None,
    CascadeDelete,
    Preserve,
}

impl Protection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protection::None => "NONE",
            Protection::CascadeDelete => "CASCADE_DELETE",
            Protection::Preserve => "PRESERVE",
        }
    }
}

impl FromStr for Protection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "NONE" => Ok(Protection::None),
            "CASCADE_DELETE" => Ok(Protection::CascadeDelete),
            "PRESERVE" => Ok(Protection::Preserve),
            other => Err(Error::TypeMismatch {
                field: "protection".into(),
                expected: "NONE | CASCADE_DELETE | PRESERVE".into(),
                got: other.to_owned(),
            }),
        }
    }
}

/// Well-known relation type tags. Any upper-case string is accepted where
/// a relation type is expected; these are the ones the crate itself uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationType {
    Child,
    Parent,
    Embedded,
    Strong,
    Weak,
    Ref,
    None,
}

impl RelationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationType::Child => "CHILD",
            RelationType::Parent => "PARENT",
            RelationType::Embedded => "EMBEDDED",
            RelationType::Strong => "STRONG",
            RelationType::Weak => "WEAK",
            RelationType::Ref => "REF",
            RelationType::None => "NONE",
        }
    }
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<RelationType> for String {
    fn from(t: RelationType) -> Self { t.as_str().to_owned() }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointSlot {
    Left,
    Right,
}

/// What an endpoint accessor sees: the live node, or the snapshot a
/// `PRESERVE` relationship captured when the node was dropped.
#[derive(Debug, Clone, PartialEq)]
pub enum Endpoint {
    Live(Node),
    Snapshot(JsonValue),
}

impl Endpoint {
    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Endpoint::Live(n) => Some(n),
            Endpoint::Snapshot(_) => None,
        }
    }

    pub fn as_snapshot(&self) -> Option<&JsonValue> {
        match self {
            Endpoint::Snapshot(s) => Some(s),
            Endpoint::Live(_) => None,
        }
    }

    pub fn id(&self) -> Option<NodeId> {
        match self {
            Endpoint::Live(n) => Some(n.id().clone()),
            Endpoint::Snapshot(s) => s[OBJECT_KEY]["id"].as_str().map(NodeId::from),
        }
    }
}

/// Callback fired instead of the protection policy when an endpoint drops.
pub type EndpointLostHook = Rc<dyn Fn(&Relationship, EndpointSlot)>;

/// Registered on a node so its drop can reach the relationship.
pub(crate) struct Watch {
    pub(crate) relationship: Weak<RelInner>,
    pub(crate) slot: EndpointSlot,
}

// ============================================================================
// Relationship handle
// ============================================================================

#[derive(Clone)]
pub struct Relationship {
    pub(crate) inner: Rc<RelInner>,
}

pub(crate) struct RelInner {
    shape: Arc<ShapeDescriptor>,
    hook: Option<EndpointLostHook>,
    state: RefCell<RelState>,
}

struct RelState {
    id: Option<RelId>,
    name: Option<String>,
    rel_type: String,
    direction: Direction,
    protection: Protection,
    left: Option<Weak<NodeInner>>,
    right: Option<Weak<NodeInner>>,
    safe: BTreeMap<EndpointSlot, JsonValue>,
    data: PropertyMap,
    extra: PropertyMap,
    version: u64,
    frozen: bool,
}

impl RelState {
    fn slot(&self, slot: EndpointSlot) -> &Option<Weak<NodeInner>> {
        match slot {
            EndpointSlot::Left => &self.left,
            EndpointSlot::Right => &self.right,
        }
    }

    fn duplicate(&self) -> Self {
        Self {
            id: self.id.clone(),
            name: self.name.clone(),
            rel_type: self.rel_type.clone(),
            direction: self.direction,
            protection: self.protection,
            left: self.left.clone(),
            right: self.right.clone(),
            safe: self.safe.clone(),
            data: self.data.clone(),
            extra: self.extra.clone(),
            version: self.version,
            frozen: false,
        }
    }
}

/// Builder for relationships; `Relationship::new` covers the defaults.
#[must_use]
pub struct RelationshipBuilder {
    left: Node,
    right: Node,
    id: Option<RelId>,
    name: Option<String>,
    rel_type: Option<String>,
    type_name: Option<String>,
    direction: Direction,
    protection: Protection,
    data: PropertyMap,
    fields: PropertyMap,
    hook: Option<EndpointLostHook>,
}

impl RelationshipBuilder {
    pub fn with_id(mut self, id: impl Into<RelId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Relation type tag, upper-cased.
    pub fn with_rel_type(mut self, rel_type: impl Into<String>) -> Self {
        self.rel_type = Some(rel_type.into().to_uppercase());
        self
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_protection(mut self, protection: Protection) -> Self {
        self.protection = protection;
        self
    }

    pub fn with_data(mut self, data: PropertyMap) -> Self {
        self.data = data;
        self
    }

    /// Shape by name, resolved through the global registry at build time.
    pub fn with_type(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    /// Value for an extension field declared by the relationship's shape.
    pub fn with_field(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    /// Hook fired instead of the protection policy when an endpoint drops.
    pub fn on_endpoint_lost(mut self, hook: impl Fn(&Relationship, EndpointSlot) + 'static) -> Self {
        self.hook = Some(Rc::new(hook));
        self
    }

    pub fn build(self) -> Result<Relationship> {
        let shape = match &self.type_name {
            Some(name) => ShapeRegistry::global().resolve(name, Kind::Relationship)?,
            None => ShapeRegistry::default_relationship(),
        };
        if let Some(field) = self.fields.keys().find(|f| !shape.is_extra_field(f)) {
            return Err(Error::UnknownField(format!("{field} on shape '{}'", shape.name())));
        }

        let state = RelState {
            id: Some(self.id.unwrap_or_else(RelId::generate)),
            name: self.name,
            rel_type: self.rel_type.unwrap_or_else(|| DEFAULT_REL_TYPE.to_owned()),
            direction: self.direction,
            protection: self.protection,
            left: Some(Rc::downgrade(&self.left.inner)),
            right: Some(Rc::downgrade(&self.right.inner)),
            safe: BTreeMap::new(),
            data: self.data,
            extra: self.fields,
            version: 0,
            frozen: false,
        };
        Ok(Relationship::from_state(shape, self.hook, state))
    }
}

impl Relationship {
    /// Undirected, unprotected relationship of the default type.
    pub fn new(left: &Node, right: &Node) -> Self {
        let state = RelState {
            id: Some(RelId::generate()),
            name: None,
            rel_type: DEFAULT_REL_TYPE.to_owned(),
            direction: Direction::None,
            protection: Protection::None,
            left: Some(Rc::downgrade(&left.inner)),
            right: Some(Rc::downgrade(&right.inner)),
            safe: BTreeMap::new(),
            data: PropertyMap::new(),
            extra: PropertyMap::new(),
            version: 0,
            frozen: false,
        };
        Self::from_state(ShapeRegistry::default_relationship(), None, state)
    }

    pub fn builder(left: &Node, right: &Node) -> RelationshipBuilder {
        RelationshipBuilder {
            left: left.clone(),
            right: right.clone(),
            id: None,
            name: None,
            rel_type: None,
            type_name: None,
            direction: Direction::None,
            protection: Protection::None,
            data: PropertyMap::new(),
            fields: PropertyMap::new(),
            hook: None,
        }
    }

    fn from_state(shape: Arc<ShapeDescriptor>, hook: Option<EndpointLostHook>, state: RelState) -> Self {
        let rel = Self {
            inner: Rc::new(RelInner { shape, hook, state: RefCell::new(state) }),
        };
        rel.wire();
        rel
    }

    /// Same id, endpoints and fields in a new handle; unfrozen.
    pub(crate) fn duplicate(&self) -> Relationship {
        let state = self.inner.state.borrow().duplicate();
        Self::from_state(self.inner.shape.clone(), self.inner.hook.clone(), state)
    }

    /// Same id and fields in a new handle pointing at `left` and `right`.
    pub(crate) fn rebound(&self, left: &Node, right: &Node) -> Relationship {
        let mut state = {
            let current = self.inner.state.borrow();
            let mut state = current.duplicate();
            state.frozen = current.frozen;
            state
        };
        state.safe.clear();
        state.left = Some(Rc::downgrade(&left.inner));
        state.right = Some(Rc::downgrade(&right.inner));
        Self::from_state(self.inner.shape.clone(), self.inner.hook.clone(), state)
    }
}

// ============================================================================
// Endpoint watches
// ============================================================================

impl Relationship {
    fn needs_watch(&self) -> bool {
        self.inner.hook.is_some() || self.inner.state.borrow().protection != Protection::None
    }

    fn live_endpoints(&self) -> Vec<(EndpointSlot, Rc<NodeInner>)> {
        let state = self.inner.state.borrow();
        [EndpointSlot::Left, EndpointSlot::Right]
            .into_iter()
            .filter_map(|slot| state.slot(slot).as_ref().and_then(Weak::upgrade).map(|n| (slot, n)))
            .collect()
    }

    fn wire(&self) {
        if !self.needs_watch() {
            return;
        }
        for (slot, node) in self.live_endpoints() {
            node.add_watch(Watch { relationship: Rc::downgrade(&self.inner), slot });
        }
    }

    fn unwire(&self) {
        let me = Rc::downgrade(&self.inner);
        for (_, node) in self.live_endpoints() {
            node.remove_watches(&me);
        }
    }

    /// Replace the protection policy, re-wiring the endpoint watches.
    pub fn set_protection(&self, protection: Protection) -> Option<Warning> {
        if self.is_frozen() {
            return Some(self.frozen_write("protection"));
        }
        self.unwire();
        self.inner.state.borrow_mut().protection = protection;
        self.wire();
        None
    }

    fn resolve_lost_endpoint(&self, slot: EndpointSlot, snapshot: &dyn Fn() -> JsonValue) {
        if let Some(hook) = self.inner.hook.clone() {
            tracing::debug!(rel = %self.describe(), ?slot, "endpoint lost, custom hook");
            hook(self, slot);
            return;
        }
        let protection = self.protection();
        tracing::debug!(rel = %self.describe(), ?slot, protection = protection.as_str(), "endpoint lost");
        match protection {
            Protection::CascadeDelete => self.reset(),
            Protection::Preserve => {
                let snapshot = snapshot();
                self.inner.state.borrow_mut().safe.insert(slot, snapshot);
            }
            Protection::None => {}
        }
    }

    /// Drive the relationship to its inert state: no id, no endpoints, no
    /// direction, no data, relation type `NONE`.
    pub fn reset(&self) {
        self.unwire();
        let (safe, data) = {
            let mut state = self.inner.state.borrow_mut();
            state.id = None;
            state.name = None;
            state.left = None;
            state.right = None;
            state.direction = Direction::None;
            state.rel_type = RelationType::None.as_str().to_owned();
            (std::mem::take(&mut state.safe), std::mem::take(&mut state.data))
        };
        // Released outside the borrow: data may hold the last handle to a
        // node this relationship watches.
        drop((safe, data));
    }
}

/// Called from a node's drop for each relationship watching it.
pub(crate) fn endpoint_lost(watch: Watch, snapshot: &dyn Fn() -> JsonValue) {
    let Some(inner) = watch.relationship.upgrade() else { return };
    Relationship { inner }.resolve_lost_endpoint(watch.slot, snapshot);
}

// ============================================================================
// Accessors
// ============================================================================

impl Relationship {
    pub fn id(&self) -> Option<RelId> { self.inner.state.borrow().id.clone() }
    pub fn name(&self) -> Option<String> { self.inner.state.borrow().name.clone() }
    pub fn rel_type(&self) -> String { self.inner.state.borrow().rel_type.clone() }
    pub fn direction(&self) -> Direction { self.inner.state.borrow().direction }
    pub fn protection(&self) -> Protection { self.inner.state.borrow().protection }
    pub fn data(&self) -> PropertyMap { self.inner.state.borrow().data.clone() }
    pub fn version(&self) -> u64 { self.inner.state.borrow().version }
    pub fn is_frozen(&self) -> bool { self.inner.state.borrow().frozen }

    pub fn type_name(&self) -> &str {
        self.inner.shape.name()
    }

    pub fn shape(&self) -> &Arc<ShapeDescriptor> {
        &self.inner.shape
    }

    pub fn endpoint(&self, slot: EndpointSlot) -> Option<Endpoint> {
        let state = self.inner.state.borrow();
        if let Some(node) = state.slot(slot).as_ref().and_then(Weak::upgrade) {
            return Some(Endpoint::Live(Node { inner: node }));
        }
        state.safe.get(&slot).cloned().map(Endpoint::Snapshot)
    }

    pub fn left(&self) -> Option<Endpoint> { self.endpoint(EndpointSlot::Left) }
    pub fn right(&self) -> Option<Endpoint> { self.endpoint(EndpointSlot::Right) }

    pub fn left_node(&self) -> Option<Node> { self.left().and_then(|e| e.as_node().cloned()) }
    pub fn right_node(&self) -> Option<Node> { self.right().and_then(|e| e.as_node().cloned()) }

    /// Endpoint id, live or from a preserved snapshot.
    pub fn left_id(&self) -> Option<NodeId> { self.left().and_then(|e| e.id()) }
    pub fn right_id(&self) -> Option<NodeId> { self.right().and_then(|e| e.id()) }

    /// Both endpoints alive.
    pub fn is_active(&self) -> bool {
        self.left_node().is_some() && self.right_node().is_some()
    }

    pub fn is_reset(&self) -> bool {
        let state = self.inner.state.borrow();
        state.id.is_none() && state.left.is_none() && state.right.is_none()
    }

    pub fn touches(&self, node: &NodeId) -> bool {
        self.left_id().as_ref() == Some(node) || self.right_id().as_ref() == Some(node)
    }

    pub fn ptr_eq(&self, other: &Relationship) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Short label for logs and errors.
    pub fn describe(&self) -> String {
        let state = self.inner.state.borrow();
        match &state.id {
            Some(id) => format!("{}({id})", state.rel_type),
            None => format!("{}(<reset>)", state.rel_type),
        }
    }

    pub fn get_field(&self, field: &str) -> Option<Value> {
        let state = self.inner.state.borrow();
        let value = match field {
            "id" => state.id.as_ref().map(|id| id.0.clone()).into(),
            "version" => Value::Int(state.version as i64),
            "name" => state.name.clone().into(),
            "relType" => Value::String(state.rel_type.clone()),
            "direction" => Value::from(state.direction.as_str()),
            "protection" => Value::from(state.protection.as_str()),
            "data" => Value::Map(state.data.clone()),
            other => return state.extra.get(other).cloned(),
        };
        Some(value)
    }
}

// ============================================================================
// Writes
// ============================================================================

impl Relationship {
    /// Update name and/or data in one call; `None` leaves a field as is.
    pub fn set(&self, name: Option<&str>, data: Option<PropertyMap>) -> Option<Warning> {
        if self.is_frozen() {
            return Some(self.frozen_write("name"));
        }
        let old = {
            let mut state = self.inner.state.borrow_mut();
            if let Some(name) = name {
                state.name = Some(name.to_owned());
            }
            data.map(|data| std::mem::replace(&mut state.data, data))
        };
        drop(old);
        None
    }

    pub fn set_data(&self, data: PropertyMap) -> Option<Warning> {
        self.set(None, Some(data))
    }

    pub fn set_direction(&self, direction: Direction) -> Option<Warning> {
        if self.is_frozen() {
            return Some(self.frozen_write("direction"));
        }
        self.inner.state.borrow_mut().direction = direction;
        None
    }

    /// Write a field by name, checking its type.
    pub fn set_field(&self, field: &str, value: impl Into<Value>) -> Result<Option<Warning>> {
        let value = value.into();
        let text = |expected: &str| {
            value.as_str().map(str::to_owned).ok_or_else(|| Error::TypeMismatch {
                field: field.to_owned(),
                expected: expected.to_owned(),
                got: value.type_name().to_owned(),
            })
        };
        match field {
            "id" | "version" => Err(Error::ReadOnlyField(field.to_owned())),
            "name" => Ok(self.set(Some(&text("STRING")?), None)),
            "relType" => {
                if self.is_frozen() {
                    return Ok(Some(self.frozen_write(field)));
                }
                self.inner.state.borrow_mut().rel_type = text("STRING")?.to_uppercase();
                Ok(None)
            }
            "direction" => Ok(self.set_direction(text("STRING")?.parse()?)),
            "protection" => Ok(self.set_protection(text("STRING")?.parse()?)),
            "data" => match value {
                Value::Map(map) => Ok(self.set_data(map)),
                other => Err(Error::TypeMismatch {
                    field: field.to_owned(),
                    expected: "MAP".into(),
                    got: other.type_name().to_owned(),
                }),
            },
            other if self.inner.shape.is_extra_field(other) => {
                if self.is_frozen() {
                    return Ok(Some(self.frozen_write(field)));
                }
                let old = self.inner.state.borrow_mut().extra.insert(other.to_owned(), value);
                drop(old);
                Ok(None)
            }
            other => Err(Error::UnknownField(format!("{other} on shape '{}'", self.type_name()))),
        }
    }

    /// A new relationship of another type between the same endpoints,
    /// keeping direction, protection, name and data.
    pub fn retype(&self, rel_type: impl Into<String>) -> Result<Relationship> {
        let (left, right) = match (self.left_node(), self.right_node()) {
            (Some(l), Some(r)) => (l, r),
            _ => return Err(Error::DetachedRelationship(self.describe())),
        };
        let mut state = self.inner.state.borrow().duplicate();
        state.id = Some(RelId::generate());
        state.rel_type = rel_type.into().to_uppercase();
        state.version = 0;
        state.safe.clear();
        state.left = Some(Rc::downgrade(&left.inner));
        state.right = Some(Rc::downgrade(&right.inner));
        Ok(Self::from_state(self.inner.shape.clone(), self.inner.hook.clone(), state))
    }

    fn frozen_write(&self, field: &str) -> Warning {
        tracing::warn!(rel = %self.describe(), field, "write to frozen relationship ignored");
        Warning::FrozenWrite { entity: self.describe(), field: field.to_owned() }
    }

    pub(crate) fn set_frozen(&self, frozen: bool) {
        self.inner.state.borrow_mut().frozen = frozen;
    }

    pub(crate) fn bump_version(&self, version: u64) {
        self.inner.state.borrow_mut().version = version;
    }

    /// Graph holding this relationship and its endpoints.
    pub fn to_graph(&self) -> Result<Graph> {
        let mut graph = Graph::new();
        graph.add_relationship(self)?;
        Ok(graph)
    }
}

// ============================================================================
// Canonical form
// ============================================================================

impl Relationship {
    /// `{id, name, relType, direction, protection, left, right, data}` with
    /// endpoints as node ids, plus declared extension fields.
    pub fn to_canonical(&self) -> JsonValue {
        let (left, right) = (self.left_id(), self.right_id());
        let mut encoder = Encoder::new();
        let state = self.inner.state.borrow();
        let id_json = |id: Option<String>| id.map_or(JsonValue::Null, JsonValue::String);

        let mut object = JsonMap::new();
        object.insert("id".into(), id_json(state.id.as_ref().map(|id| id.0.clone())));
        object.insert("name".into(), id_json(state.name.clone()));
        object.insert("relType".into(), JsonValue::String(state.rel_type.clone()));
        object.insert("direction".into(), JsonValue::from(state.direction.as_str()));
        object.insert("protection".into(), JsonValue::from(state.protection.as_str()));
        object.insert("left".into(), id_json(left.map(|id| id.0)));
        object.insert("right".into(), id_json(right.map(|id| id.0)));
        object.insert("data".into(), encoder.map(&state.data));
        for field in self.inner.shape.extra_fields() {
            let value = state.extra.get(field).map_or(JsonValue::Null, |v| encoder.value(v));
            object.insert(field.clone(), value);
        }
        JsonValue::Object(object)
    }

    /// Rebuild from canonical form, resolving endpoint ids through `lookup`.
    pub(crate) fn from_canonical(
        json: &JsonValue,
        type_name: &str,
        decoder: &mut Decoder,
        lookup: impl Fn(&NodeId) -> Option<Node>,
    ) -> Result<Relationship> {
        let object = json
            .as_object()
            .ok_or_else(|| Error::Malformed("relationship must be a mapping".into()))?;
        let text = |field: &str| -> Result<Option<String>> {
            match object.get(field) {
                None | Some(JsonValue::Null) => Ok(None),
                Some(JsonValue::String(s)) => Ok(Some(s.clone())),
                Some(_) => Err(Error::Malformed(format!("relationship field '{field}' must be a string"))),
            }
        };
        let endpoint = |field: &str| -> Result<Node> {
            let id = text(field)?
                .ok_or_else(|| Error::Malformed(format!("relationship without '{field}' endpoint")))?;
            lookup(&NodeId::from(id.as_str()))
                .ok_or_else(|| Error::Malformed(format!("endpoint '{id}' not in node pool")))
        };

        let (left, right) = (endpoint("left")?, endpoint("right")?);
        let mut builder = Relationship::builder(&left, &right).with_type(type_name);
        if let Some(id) = text("id")? {
            builder = builder.with_id(id);
        }
        if let Some(name) = text("name")? {
            builder = builder.with_name(name);
        }
        if let Some(rel_type) = text("relType")? {
            builder = builder.with_rel_type(rel_type);
        }
        if let Some(direction) = text("direction")? {
            builder = builder.with_direction(direction.parse()?);
        }
        if let Some(protection) = text("protection")? {
            builder = builder.with_protection(protection.parse()?);
        }
        if let Some(data) = object.get("data").and_then(JsonValue::as_object) {
            builder = builder.with_data(decoder.map(data)?);
        }
        const BASE: &[&str] = &["id", "name", "relType", "direction", "protection", "left", "right", "data"];
        for (field, value) in object.iter().filter(|(k, _)| !BASE.contains(&k.as_str())) {
            builder = builder.with_field(field.clone(), decoder.value(value)?);
        }
        builder.build()
    }

    pub fn canonical_string(&self) -> String {
        self.to_canonical().to_string()
    }
}

/// Structural, over the canonical form.
impl PartialEq for Relationship {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.canonical_string() == other.canonical_string()
    }
}

impl Eq for Relationship {}

impl Hash for Relationship {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical_string().hash(state);
    }
}

impl fmt::Debug for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Relationship")
            .field("id", &self.id())
            .field("rel_type", &self.rel_type())
            .field("direction", &self.direction())
            .field("protection", &self.protection())
            .field("left", &self.left_id())
            .field("right", &self.right_id())
            .finish()
    }
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_canonical())
    }
}

// ============================================================================
// Algebra
// ============================================================================

impl OperatorResolver for &Relationship {
    fn kind(&self) -> Kind {
        Kind::Relationship
    }

    fn operation_resolution(
        self,
        other: Element,
        operation: Operation,
        direction: DirectionTag,
    ) -> Result<Element> {
        let Some(link) = operation.link_direction() else {
            return Err(operation.unsupported(Kind::Relationship, other.kind()));
        };
        let tail = self
            .right_node()
            .ok_or_else(|| Error::DetachedRelationship(self.describe()))?;

        let mut graph = Graph::new();
        graph.add_relationship(self)?;
        match (direction, other) {
            (DirectionTag::RelationshipEntity, Element::Node(other)) => {
                let bridge = Relationship::builder(&tail, &other).with_direction(link).build()?;
                graph.add_node(&other);
                graph.add_relationship(&bridge)?;
            }
            (DirectionTag::RelationshipRelationship, Element::Relationship(other)) => {
                let head = other
                    .left_node()
                    .ok_or_else(|| Error::DetachedRelationship(other.describe()))?;
                let bridge = Relationship::builder(&tail, &head).with_direction(link).build()?;
                graph.add_relationship(&other)?;
                graph.add_relationship(&bridge)?;
            }
            (_, other) => return Err(operation.unsupported(Kind::Relationship, other.kind())),
        }
        Ok(Element::Graph(graph))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_defaults() {
        let (a, b) = (Node::new(1), Node::new(2));
        let rel = Relationship::new(&a, &b);
        assert_eq!(rel.rel_type(), DEFAULT_REL_TYPE);
        assert_eq!(rel.direction(), Direction::None);
        assert_eq!(rel.protection(), Protection::None);
        assert!(rel.is_active());
        assert_eq!(rel.left_node().unwrap(), a);
    }

    #[test]
    fn test_unprotected_endpoint_goes_null() {
        let a = Node::new(1);
        let rel = {
            let b = Node::new(2);
            Relationship::new(&a, &b)
        };
        assert!(rel.right().is_none());
        assert!(rel.left().is_some());
        assert!(rel.id().is_some());
    }

    #[test]
    fn test_cascade_delete_resets() {
        let b = Node::new(2);
        let rel = {
            let a = Node::new(1);
            Relationship::builder(&a, &b)
                .with_protection(Protection::CascadeDelete)
                .with_direction(Direction::LeftToRight)
                .build()
                .unwrap()
        };
        assert!(rel.is_reset());
        assert_eq!(rel.direction(), Direction::None);
        assert_eq!(rel.rel_type(), "NONE");
        assert!(rel.left().is_none());
        assert!(rel.right().is_none());
        // the watch on b is gone too
        assert!(b.inner.watchers.borrow().is_empty());
    }

    #[test]
    fn test_preserve_snapshots_endpoint() {
        let a = Node::new(1);
        let (rel, expected) = {
            let b = Node::with_id("b", "keep me");
            let rel = Relationship::builder(&a, &b).with_protection(Protection::Preserve).build().unwrap();
            (rel, b.to_json())
        };
        assert_eq!(rel.right(), Some(Endpoint::Snapshot(expected)));
        assert_eq!(rel.right_id(), Some(NodeId::from("b")));
        assert!(rel.right_node().is_none());
    }

    #[test]
    fn test_custom_hook_takes_precedence() {
        let fired = Rc::new(Cell::new(None));
        let seen = fired.clone();
        let a = Node::new(1);
        let rel = {
            let b = Node::new(2);
            Relationship::builder(&a, &b)
                .with_protection(Protection::CascadeDelete)
                .on_endpoint_lost(move |_, slot| seen.set(Some(slot)))
                .build()
                .unwrap()
        };
        assert_eq!(fired.get(), Some(EndpointSlot::Right));
        assert!(!rel.is_reset());
    }

    #[test]
    fn test_set_protection_rewires_once() {
        let (a, b) = (Node::new(1), Node::new(2));
        let rel = Relationship::new(&a, &b);
        assert!(a.inner.watchers.borrow().is_empty());

        rel.set_protection(Protection::Preserve);
        rel.set_protection(Protection::Preserve);
        assert_eq!(a.inner.watchers.borrow().len(), 1);

        rel.set_protection(Protection::None);
        assert!(a.inner.watchers.borrow().is_empty());
    }

    #[test]
    fn test_set_and_retype() {
        let (a, b) = (Node::new(1), Node::new(2));
        let rel = Relationship::builder(&a, &b).with_rel_type("knows").build().unwrap();
        assert_eq!(rel.rel_type(), "KNOWS");

        rel.set(Some("friendship"), Some(PropertyMap::from([("since".to_owned(), Value::Int(2020))])));
        let other = rel.retype(RelationType::Strong).unwrap();
        assert_ne!(other.id(), rel.id());
        assert_eq!(other.rel_type(), "STRONG");
        assert_eq!(other.name().as_deref(), Some("friendship"));
        assert_eq!(other.data(), rel.data());
    }

    #[test]
    fn test_typed_field_writes() {
        let (a, b) = (Node::new(1), Node::new(2));
        let rel = Relationship::new(&a, &b);
        rel.set_field("direction", "LEFT_TO_RIGHT").unwrap();
        assert_eq!(rel.direction(), Direction::LeftToRight);
        assert!(rel.set_field("direction", "SIDEWAYS").is_err());
        assert!(matches!(rel.set_field("data", 3), Err(Error::TypeMismatch { .. })));
        assert!(matches!(rel.set_field("id", "x"), Err(Error::ReadOnlyField(_))));
    }

    #[test]
    fn test_equality_over_canonical_form() {
        let (a, b) = (Node::with_id("a", 1), Node::with_id("b", 2));
        let one = Relationship::builder(&a, &b).with_id("r").build().unwrap();
        let two = Relationship::builder(&a, &b).with_id("r").build().unwrap();
        assert_eq!(one, two);
        two.set_direction(Direction::RightToLeft);
        assert_ne!(one, two);
    }
}

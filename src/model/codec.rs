//! Canonical JSON codec for values and nodes.
//!
//! ```text
//! node       → {"__type": "<Type>", "__object": {id, name, key, encoding,
//!                                                createdAt, updatedAt, ttl, data}}
//! marker     → {"__type": "<Type>", "__id": "<id>"}     (plain map, never decoded)
//! bytes      → {"__bytes": "<hex>"}
//! NaN / ±inf → {"__float": "NaN" | "inf" | "-inf"}
//! ```
//!
//! Extension fields declared by a node's shape are written next to the
//! base fields; nodes of the default shape carry exactly the eight keys.

use hashbrown::HashMap;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map as JsonMap, Number, Value as JsonValue};

use super::node::{NodeInner, NodeState, UNBOUNDED_TTL};
use super::shape::NODE_FIELDS;
use super::{now_timestamp, Encoding, Kind, Node, NodeId, PropertyMap, ShapeRegistry, Value};
use crate::hooks::Hooks;
use crate::{Error, Result, Warning};

pub const TYPE_KEY: &str = "__type";
pub const OBJECT_KEY: &str = "__object";
pub const ID_KEY: &str = "__id";
pub const BYTES_KEY: &str = "__bytes";
pub const FLOAT_KEY: &str = "__float";

// ============================================================================
// Encoding
// ============================================================================

/// Serializer state: the chain of nodes currently being written, used to
/// cut cycles, and the warnings raised on the way.
pub(crate) struct Encoder {
    ancestors: Vec<*const NodeInner>,
    warnings: Vec<Warning>,
}

impl Encoder {
    pub(crate) fn new() -> Self {
        Self { ancestors: Vec::new(), warnings: Vec::new() }
    }

    pub(crate) fn into_warnings(self) -> Vec<Warning> {
        self.warnings
    }

    /// `{"__type", "__object"}` wrapper, or a reference marker when `node`
    /// is already being written further up the chain.
    pub(crate) fn wrapped(&mut self, node: &NodeInner) -> JsonValue {
        let ptr: *const NodeInner = node;
        if self.ancestors.contains(&ptr) {
            tracing::warn!(node = %node.id, "circular reference cut during serialization");
            self.warnings.push(Warning::CircularReference(node.id.clone()));
            return marker(node.shape.name(), &node.id);
        }

        let object = self.canonical(node);
        let mut wrapper = JsonMap::new();
        wrapper.insert(TYPE_KEY.to_owned(), JsonValue::String(node.shape.name().to_owned()));
        wrapper.insert(OBJECT_KEY.to_owned(), object);
        JsonValue::Object(wrapper)
    }

    /// The canonical mapping of one node.
    pub(crate) fn canonical(&mut self, node: &NodeInner) -> JsonValue {
        let ptr: *const NodeInner = node;
        self.ancestors.push(ptr);

        let state = node.state.borrow();
        let mut object = JsonMap::new();
        object.insert("id".to_owned(), JsonValue::String(node.id.0.clone()));
        object.insert("name".to_owned(), optional(&state.name));
        object.insert("key".to_owned(), optional(&state.key));
        object.insert("encoding".to_owned(), JsonValue::String(state.encoding.as_str().to_owned()));
        object.insert("createdAt".to_owned(), JsonValue::from(state.created_at));
        object.insert("updatedAt".to_owned(), JsonValue::from(state.updated_at));
        object.insert("ttl".to_owned(), JsonValue::from(state.ttl));
        object.insert("data".to_owned(), self.value(&state.data));
        for field in node.shape.extra_fields() {
            let value = state.extra.get(field).map_or(JsonValue::Null, |v| self.value(v));
            object.insert(field.clone(), value);
        }
        drop(state);

        self.ancestors.pop();
        JsonValue::Object(object)
    }

    pub(crate) fn value(&mut self, value: &Value) -> JsonValue {
        match value {
            Value::Null => JsonValue::Null,
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::Int(i) => JsonValue::from(*i),
            Value::Float(f) => match Number::from_f64(*f) {
                Some(number) => JsonValue::Number(number),
                None => {
                    let mut object = JsonMap::new();
                    object.insert(FLOAT_KEY.to_owned(), JsonValue::String(non_finite_text(*f).to_owned()));
                    JsonValue::Object(object)
                }
            },
            Value::String(s) => JsonValue::String(s.clone()),
            Value::Bytes(bytes) => {
                let mut object = JsonMap::new();
                object.insert(BYTES_KEY.to_owned(), JsonValue::String(hex::encode(bytes)));
                JsonValue::Object(object)
            }
            Value::List(items) => JsonValue::Array(items.iter().map(|v| self.value(v)).collect()),
            Value::Map(map) => self.map(map),
            Value::Node(node) => self.wrapped(&node.inner),
        }
    }

    pub(crate) fn map(&mut self, map: &PropertyMap) -> JsonValue {
        JsonValue::Object(map.iter().map(|(k, v)| (k.clone(), self.value(v))).collect())
    }
}

fn optional(value: &Option<String>) -> JsonValue {
    value.as_ref().map_or(JsonValue::Null, |s| JsonValue::String(s.clone()))
}

fn marker(type_name: &str, id: &NodeId) -> JsonValue {
    let mut object = JsonMap::new();
    object.insert(TYPE_KEY.to_owned(), JsonValue::String(type_name.to_owned()));
    object.insert(ID_KEY.to_owned(), JsonValue::String(id.0.clone()));
    JsonValue::Object(object)
}

// ============================================================================
// Decoding
// ============================================================================

/// Deserializer state. Nodes are shared by id within one document, so an
/// embedded node written out twice decodes to a single handle.
#[derive(Default)]
pub(crate) struct Decoder {
    nodes: HashMap<NodeId, Node>,
}

impl Decoder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn value(&mut self, json: &JsonValue) -> Result<Value> {
        Ok(match json {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Bool(*b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            JsonValue::String(s) => Value::String(s.clone()),
            JsonValue::Array(items) => {
                Value::List(items.iter().map(|v| self.value(v)).collect::<Result<_>>()?)
            }
            JsonValue::Object(object) => {
                if is_wrapper(object) {
                    return self.node(json).map(Value::Node);
                }
                if let Some(hex_text) = bytes_text(object) {
                    let bytes = hex::decode(hex_text)
                        .map_err(|e| Error::Malformed(format!("{BYTES_KEY}: {e}")))?;
                    return Ok(Value::Bytes(bytes));
                }
                if let Some(text) = single_text(object, FLOAT_KEY) {
                    return parse_non_finite(text).map(Value::Float);
                }
                Value::Map(self.map(object)?)
            }
        })
    }

    pub(crate) fn map(&mut self, object: &JsonMap<String, JsonValue>) -> Result<PropertyMap> {
        object
            .iter()
            .map(|(k, v)| Ok((k.clone(), self.value(v)?)))
            .collect()
    }

    /// Decode a `{"__type", "__object"}` wrapper.
    pub(crate) fn node(&mut self, json: &JsonValue) -> Result<Node> {
        let wrapper = json
            .as_object()
            .filter(|o| is_wrapper(o))
            .ok_or_else(|| Error::Malformed(format!("expected {{{TYPE_KEY}, {OBJECT_KEY}}} wrapper")))?;
        let type_name = wrapper
            .get(TYPE_KEY)
            .and_then(JsonValue::as_str)
            .ok_or_else(|| Error::Malformed(format!("{TYPE_KEY} must be a string")))?;
        let object = wrapper
            .get(OBJECT_KEY)
            .and_then(JsonValue::as_object)
            .ok_or_else(|| Error::Malformed(format!("{OBJECT_KEY} must be a mapping")))?;

        let id = NodeId::from(
            object
                .get("id")
                .and_then(JsonValue::as_str)
                .ok_or_else(|| Error::Malformed("node without string id".into()))?,
        );
        if let Some(existing) = self.nodes.get(&id) {
            return Ok(existing.clone());
        }

        let shape = ShapeRegistry::global().resolve(type_name, Kind::Node)?;
        let now = now_timestamp();
        let mut state = NodeState::fresh(now);
        state.name = text_field(object, "name")?;
        state.key = match object.get("key") {
            None | Some(JsonValue::Null) => None,
            Some(JsonValue::String(s)) => Some(s.clone()),
            Some(other @ (JsonValue::Number(_) | JsonValue::Bool(_))) => Some(other.to_string()),
            Some(_) => return Err(malformed_field("key", "scalar")),
        };
        if let Some(encoding) = text_field(object, "encoding")? {
            state.encoding = encoding.parse::<Encoding>()?;
        }
        state.created_at = int_field(object, "createdAt")?.unwrap_or(now);
        state.updated_at = int_field(object, "updatedAt")?.unwrap_or(state.created_at);
        state.ttl = int_field(object, "ttl")?.unwrap_or(UNBOUNDED_TTL);

        let node = Node::from_parts(id.clone(), shape.clone(), Hooks::default(), state);
        // Registered before the payload so a self-reference resolves to it.
        self.nodes.insert(id, node.clone());

        for (field, value) in object {
            if NODE_FIELDS.contains(&field.as_str()) {
                continue;
            }
            if !shape.is_extra_field(field) {
                return Err(Error::UnknownField(format!("{field} on shape '{}'", shape.name())));
            }
            let value = self.value(value)?;
            node.inner.state.borrow_mut().extra.insert(field.clone(), value);
        }
        let data = match object.get("data") {
            Some(data) => self.value(data)?,
            None => Value::Null,
        };
        node.replace_data_raw(data);
        Ok(node)
    }
}

fn is_wrapper(object: &JsonMap<String, JsonValue>) -> bool {
    object.len() == 2 && object.contains_key(TYPE_KEY) && object.contains_key(OBJECT_KEY)
}

fn bytes_text(object: &JsonMap<String, JsonValue>) -> Option<&str> {
    single_text(object, BYTES_KEY)
}

fn single_text<'a>(object: &'a JsonMap<String, JsonValue>, key: &str) -> Option<&'a str> {
    if object.len() != 1 {
        return None;
    }
    object.get(key).and_then(JsonValue::as_str)
}

fn non_finite_text(f: f64) -> &'static str {
    if f.is_nan() {
        "NaN"
    } else if f > 0.0 {
        "inf"
    } else {
        "-inf"
    }
}

fn parse_non_finite(text: &str) -> Result<f64> {
    match text {
        "NaN" => Ok(f64::NAN),
        "inf" => Ok(f64::INFINITY),
        "-inf" => Ok(f64::NEG_INFINITY),
        other => Err(Error::Malformed(format!("{FLOAT_KEY}: '{other}' is not NaN, inf or -inf"))),
    }
}

fn text_field(object: &JsonMap<String, JsonValue>, field: &str) -> Result<Option<String>> {
    match object.get(field) {
        None | Some(JsonValue::Null) => Ok(None),
        Some(JsonValue::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(malformed_field(field, "string")),
    }
}

fn int_field(object: &JsonMap<String, JsonValue>, field: &str) -> Result<Option<i64>> {
    match object.get(field) {
        None | Some(JsonValue::Null) => Ok(None),
        Some(v) => v.as_i64().map(Some).ok_or_else(|| malformed_field(field, "integer")),
    }
}

fn malformed_field(field: &str, expected: &str) -> Error {
    Error::Malformed(format!("node field '{field}' must be {expected}"))
}

// ============================================================================
// Public surface
// ============================================================================

impl Node {
    /// Wrapped canonical form, `{"__type", "__object"}`.
    pub fn to_json(&self) -> JsonValue {
        Encoder::new().wrapped(&self.inner)
    }

    /// Wrapped canonical form plus any warnings raised writing it.
    pub fn to_json_with_warnings(&self) -> (JsonValue, Vec<Warning>) {
        let mut encoder = Encoder::new();
        let json = encoder.wrapped(&self.inner);
        (json, encoder.into_warnings())
    }

    /// The bare canonical mapping, without the type wrapper.
    pub fn to_canonical(&self) -> JsonValue {
        Encoder::new().canonical(&self.inner)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_json())?)
    }

    pub fn from_json(json: &JsonValue) -> Result<Node> {
        Decoder::new().node(json)
    }

    pub fn from_json_str(text: &str) -> Result<Node> {
        Self::from_json(&serde_json::from_str(text)?)
    }
}

impl Value {
    pub fn to_json(&self) -> JsonValue {
        Encoder::new().value(self)
    }

    pub fn from_json(json: &JsonValue) -> Result<Value> {
        Decoder::new().value(json)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let json = JsonValue::deserialize(deserializer)?;
        Value::from_json(&json).map_err(D::Error::custom)
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Node {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let json = JsonValue::deserialize(deserializer)?;
        Node::from_json(&json).map_err(D::Error::custom)
    }
}

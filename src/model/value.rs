//! Payload value type carried by nodes and relationship data.

use std::fmt;

use super::codec::{ID_KEY, TYPE_KEY};
use super::{Node, NodeId, PropertyMap};

/// Payload value.
///
/// Covers everything a node payload may hold:
/// - Scalars: Null, Bool, Int, Float, String, Bytes
/// - Containers: List (ordered sequence), Map (keyed mapping)
/// - Graph: an embedded `Node`, shared by handle
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    Map(PropertyMap),
    Node(Node),
}

// ============================================================================
// Type checking
// ============================================================================

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Bool(_) => "BOOLEAN",
            Value::Int(_) => "INTEGER",
            Value::Float(_) => "FLOAT",
            Value::String(_) => "STRING",
            Value::Bytes(_) => "BYTES",
            Value::List(_) => "LIST",
            Value::Map(_) => "MAP",
            Value::Node(_) => "NODE",
        }
    }

    pub fn is_null(&self) -> bool { matches!(self, Value::Null) }
    pub fn is_numeric(&self) -> bool { matches!(self, Value::Int(_) | Value::Float(_)) }
    pub fn is_string(&self) -> bool { matches!(self, Value::String(_)) }

    /// Attempt to extract as i64. Floats must be whole and inside the i64
    /// range.
    pub fn as_int(&self) -> Option<i64> {
        const LOWER: f64 = i64::MIN as f64;
        const UPPER: f64 = i64::MAX as f64;
        match self {
            Value::Int(i) => Some(*i),
            Value::Float(f) if f.fract() == 0.0 && (LOWER..UPPER).contains(f) => Some(*f as i64),
            _ => None,
        }
    }

    /// Attempt to extract as f64
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Attempt to extract as &str
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Value::Node(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&PropertyMap> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn list(items: impl IntoIterator<Item = impl Into<Value>>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

// ============================================================================
// Reference markers
// ============================================================================

impl Value {
    /// The `{__type, __id}` marker that stands in for an embedded node in
    /// normalized form.
    pub fn reference(type_name: &str, id: &NodeId) -> Self {
        let mut marker = PropertyMap::new();
        marker.insert(TYPE_KEY.to_owned(), Value::String(type_name.to_owned()));
        marker.insert(ID_KEY.to_owned(), Value::String(id.as_str().to_owned()));
        Value::Map(marker)
    }

    /// `(type, id)` when this value is exactly a reference marker.
    ///
    /// The key set must be `{__type, __id}` and nothing else, which keeps
    /// markers distinguishable from full `{__type, __object}` wrappers.
    pub fn as_reference(&self) -> Option<(&str, NodeId)> {
        let Value::Map(m) = self else { return None };
        if m.len() != 2 {
            return None;
        }
        match (m.get(TYPE_KEY), m.get(ID_KEY)) {
            (Some(Value::String(t)), Some(Value::String(id))) => Some((t, NodeId::from(id.as_str()))),
            _ => None,
        }
    }

    pub fn is_reference(&self) -> bool {
        self.as_reference().is_some()
    }
}

// ============================================================================
// Conversions (From impls)
// ============================================================================

impl From<bool> for Value { fn from(v: bool) -> Self { Value::Bool(v) } }
impl From<i32> for Value { fn from(v: i32) -> Self { Value::Int(v as i64) } }
impl From<i64> for Value { fn from(v: i64) -> Self { Value::Int(v) } }
impl From<f64> for Value { fn from(v: f64) -> Self { Value::Float(v) } }
impl From<String> for Value { fn from(v: String) -> Self { Value::String(v) } }
impl From<&str> for Value { fn from(v: &str) -> Self { Value::String(v.to_owned()) } }
impl From<&[u8]> for Value { fn from(v: &[u8]) -> Self { Value::Bytes(v.to_vec()) } }
impl From<Node> for Value { fn from(v: Node) -> Self { Value::Node(v) } }
impl From<&Node> for Value { fn from(v: &Node) -> Self { Value::Node(v.clone()) } }
impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self { Value::List(v.into_iter().map(Into::into).collect()) }
}
impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self { v.map(Into::into).unwrap_or(Value::Null) }
}

// ============================================================================
// Display
// ============================================================================

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::String(s) => write!(f, "\"{}\"", s.replace('"', "\\\"")),
            Value::Bytes(b) => write!(f, "<bytes[{}]>", b.len()),
            Value::List(l) => {
                write!(f, "[")?;
                for (i, v) in l.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
            Value::Map(m) => {
                write!(f, "{{")?;
                for (i, (k, v)) in m.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{k}: {v}")?;
                }
                write!(f, "}}")
            }
            Value::Node(n) => write!(f, "{}({})", n.type_name(), n.id()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_from() {
        assert_eq!(Value::from("hello"), Value::String("hello".into()));
        assert_eq!(Value::from(42), Value::Int(42));
        assert_eq!(Value::from(3.5), Value::Float(3.5));
        assert_eq!(Value::from(true), Value::Bool(true));
        assert_eq!(Value::from(None::<i64>), Value::Null);
    }

    #[test]
    fn test_as_int_rejects_out_of_range_floats() {
        assert_eq!(Value::from(42.0).as_int(), Some(42));
        assert_eq!(Value::from(-9.0e18).as_int(), Some(-9_000_000_000_000_000_000));
        assert_eq!(Value::from(1.5).as_int(), None);
        assert_eq!(Value::from(1e30).as_int(), None);
        assert_eq!(Value::from(9.223_372_036_854_775_807e18).as_int(), None);
        assert_eq!(Value::from(f64::NAN).as_int(), None);
        assert_eq!(Value::from(f64::INFINITY).as_int(), None);
    }

    #[test]
    fn test_reference_marker_key_set() {
        let marker = Value::reference("Node", &NodeId::from("A"));
        let (ty, id) = marker.as_reference().unwrap();
        assert_eq!(ty, "Node");
        assert_eq!(id, NodeId::from("A"));

        // A third key makes it an ordinary map
        let mut widened = marker.as_map().unwrap().clone();
        widened.insert("extra".into(), Value::Null);
        assert!(Value::Map(widened).as_reference().is_none());
    }

    #[test]
    fn test_display_nested() {
        let v = Value::map([("a", Value::list([1, 2]))]);
        assert_eq!(v.to_string(), "{a: [1, 2]}");
    }
}

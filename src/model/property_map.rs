//! PropertyMap — the keyed mapping inside payloads and relationship data.

use std::collections::BTreeMap;
use super::Value;

/// A map of property names to values.
///
/// Ordered so that the canonical serialized form is deterministic.
pub type PropertyMap = BTreeMap<String, Value>;

/// Convert iterator of (key, value) pairs into a `Value::Map`.
impl Value {
    pub fn map<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        Value::Map(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl From<PropertyMap> for Value {
    fn from(map: PropertyMap) -> Self { Value::Map(map) }
}

//! Index management.
//!
//! Entities compute their own index values; an external index store
//! upserts them. Every entity carries one unique index named after its
//! type, plus whatever its shape declares.

use serde::{Deserialize, Serialize};

use crate::model::shape::IndexFields;
use crate::model::{Node, Relationship, ShapeDescriptor, Value};

/// Prefix of the per-type unique constraint name.
pub const UNIQUE_CONSTRAINT_PREFIX: &str = "UQ";

/// Index value contributed by a field the instance does not have.
pub const NULL_INDEX_VALUE: &str = "null";

/// Joins the field values of a composite index.
pub const INDEX_SEPARATOR: &str = ":";

/// Type of index to create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexType {
    /// Unique constraint over the entity's type and id.
    Unique,
    /// Declared field-list index, values joined with `:`.
    Composite,
}

/// Index definition for an external index store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDefinition {
    pub name: String,
    pub entity_type: String,
    pub index_type: IndexType,
    pub fields: Vec<String>,
}

impl IndexDefinition {
    /// Every index an instance of `shape` reports: the unique constraint
    /// first, then the declared indexes in name order.
    pub fn for_shape(shape: &ShapeDescriptor) -> Vec<IndexDefinition> {
        let mut definitions = vec![IndexDefinition {
            name: unique_constraint_name(shape.name()),
            entity_type: shape.name().to_owned(),
            index_type: IndexType::Unique,
            fields: vec!["id".to_owned()],
        }];
        definitions.extend(shape.indexes().iter().map(|(name, fields)| IndexDefinition {
            name: name.clone(),
            entity_type: shape.name().to_owned(),
            index_type: IndexType::Composite,
            fields: fields.to_vec(),
        }));
        definitions
    }
}

pub fn unique_constraint_name(type_name: &str) -> String {
    format!("{UNIQUE_CONSTRAINT_PREFIX}_{type_name}")
}

/// Indexing policy: index name → index value.
pub trait Indexed {
    fn shape(&self) -> &ShapeDescriptor;

    /// Field value by name; `None` when the instance lacks the field.
    fn index_field(&self, field: &str) -> Option<Value>;

    /// `<Type>:<id>`. Reset relationships have no id and index as `null`.
    fn unique_index(&self) -> String {
        let id = self.index_field("id").map_or_else(|| NULL_INDEX_VALUE.to_owned(), |v| index_text(&v));
        format!("{}{INDEX_SEPARATOR}{id}", self.shape().name())
    }

    fn indexes(&self) -> std::collections::BTreeMap<String, String> {
        let shape = self.shape();
        let mut out = std::collections::BTreeMap::new();
        out.insert(unique_constraint_name(shape.name()), self.unique_index());
        for (name, fields) in shape.indexes() {
            out.insert(name.clone(), self.composite_value(fields));
        }
        out
    }

    #[doc(hidden)]
    fn composite_value(&self, fields: &IndexFields) -> String {
        fields
            .iter()
            .map(|f| self.index_field(f).map_or_else(|| NULL_INDEX_VALUE.to_owned(), |v| index_text(&v)))
            .collect::<Vec<_>>()
            .join(INDEX_SEPARATOR)
    }
}

/// Text form of one field value inside an index.
fn index_text(value: &Value) -> String {
    match value {
        Value::Null => NULL_INDEX_VALUE.to_owned(),
        Value::String(s) => s.clone(),
        Value::Bool(_) | Value::Int(_) | Value::Float(_) => value.to_string(),
        other => other.to_json().to_string(),
    }
}

impl Indexed for Node {
    fn shape(&self) -> &ShapeDescriptor {
        Node::shape(self)
    }

    fn index_field(&self, field: &str) -> Option<Value> {
        self.get_field(field)
    }
}

impl Indexed for Relationship {
    fn shape(&self) -> &ShapeDescriptor {
        Relationship::shape(self)
    }

    fn index_field(&self, field: &str) -> Option<Value> {
        self.get_field(field)
    }
}

//! Shape registry — named node/relationship subtypes.
//!
//! A shape is data, not a generated type: a name, the base kind it refines,
//! the extension fields its instances may carry, and the index field-lists
//! the indexing policy reads. Registration is idempotent by name.

use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock};

use hashbrown::HashMap;
use parking_lot::RwLock;
use smallvec::SmallVec;

use super::Kind;
use crate::{Error, Result};

/// Requested index spec: index name → field names.
pub type IndexSpec = BTreeMap<String, Vec<String>>;

/// Field list of one declared index.
pub type IndexFields = SmallVec<[String; 4]>;

pub const DEFAULT_NODE_SHAPE: &str = "Node";
pub const DEFAULT_RELATIONSHIP_SHAPE: &str = "Relationship";

/// Fields every node exposes to the indexing policy.
pub const NODE_FIELDS: &[&str] = &[
    "id", "version", "name", "key", "encoding", "createdAt", "updatedAt", "ttl", "data",
];

/// Fields every relationship exposes to the indexing policy.
pub const RELATIONSHIP_FIELDS: &[&str] = &[
    "id", "version", "name", "relType", "direction", "protection", "data",
];

// ============================================================================
// ShapeDescriptor
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeDescriptor {
    name: String,
    base: Kind,
    extra_fields: Vec<String>,
    indexes: BTreeMap<String, IndexFields>,
}

impl ShapeDescriptor {
    fn empty(name: &str, base: Kind) -> Self {
        Self {
            name: name.to_owned(),
            base,
            extra_fields: Vec::new(),
            indexes: BTreeMap::new(),
        }
    }

    /// Build a normalized descriptor. Extension fields that shadow a base
    /// field are ignored; index lists keep only known fields, and lists that
    /// end up empty are dropped.
    fn normalized(name: &str, base: Kind, extra_fields: &[&str], index_spec: &IndexSpec) -> Self {
        let base_fields = base_fields(base);
        let mut shape = Self::empty(name, base);

        for field in extra_fields {
            if field.is_empty() || base_fields.contains(field) {
                continue;
            }
            if !shape.extra_fields.iter().any(|f| f == field) {
                shape.extra_fields.push((*field).to_owned());
            }
        }

        for (index, fields) in index_spec {
            let mut valid = IndexFields::new();
            for field in fields {
                if shape.has_field(field) && !valid.contains(field) {
                    valid.push(field.clone());
                }
            }
            if !valid.is_empty() {
                shape.indexes.insert(index.clone(), valid);
            }
        }

        shape
    }

    pub fn name(&self) -> &str { &self.name }
    pub fn base(&self) -> Kind { self.base }
    pub fn extra_fields(&self) -> &[String] { &self.extra_fields }
    pub fn indexes(&self) -> &BTreeMap<String, IndexFields> { &self.indexes }

    pub fn is_extra_field(&self, field: &str) -> bool {
        self.extra_fields.iter().any(|f| f == field)
    }

    /// Base field of the shape's kind, or a declared extension field.
    pub fn has_field(&self, field: &str) -> bool {
        base_fields(self.base).contains(&field) || self.is_extra_field(field)
    }
}

fn base_fields(base: Kind) -> &'static [&'static str] {
    match base {
        Kind::Relationship => RELATIONSHIP_FIELDS,
        _ => NODE_FIELDS,
    }
}

// ============================================================================
// ShapeRegistry
// ============================================================================

static GLOBAL: LazyLock<ShapeRegistry> = LazyLock::new(ShapeRegistry::new);

/// Name → shape. Shared process-wide through [`ShapeRegistry::global`];
/// standalone registries are useful in tests.
pub struct ShapeRegistry {
    shapes: RwLock<HashMap<String, Arc<ShapeDescriptor>>>,
}

impl ShapeRegistry {
    /// A registry pre-seeded with the default `Node` and `Relationship`
    /// shapes.
    pub fn new() -> Self {
        let mut shapes = HashMap::new();
        shapes.insert(
            DEFAULT_NODE_SHAPE.to_owned(),
            Arc::new(ShapeDescriptor::empty(DEFAULT_NODE_SHAPE, Kind::Node)),
        );
        shapes.insert(
            DEFAULT_RELATIONSHIP_SHAPE.to_owned(),
            Arc::new(ShapeDescriptor::empty(DEFAULT_RELATIONSHIP_SHAPE, Kind::Relationship)),
        );
        Self { shapes: RwLock::new(shapes) }
    }

    pub fn global() -> &'static ShapeRegistry {
        &GLOBAL
    }

    /// Register `name`, or hand back the existing descriptor when the
    /// request normalizes to the same shape. A different base kind, field
    /// set or index spec under an existing name is a `ShapeConflict`.
    pub fn register(
        &self,
        name: &str,
        base: Kind,
        extra_fields: &[&str],
        index_spec: &IndexSpec,
    ) -> Result<Arc<ShapeDescriptor>> {
        check_base(name, base)?;
        let requested = ShapeDescriptor::normalized(name, base, extra_fields, index_spec);

        let mut shapes = self.shapes.write();
        if let Some(existing) = shapes.get(name) {
            if **existing == requested {
                tracing::trace!(shape = name, "shape reused");
                return Ok(existing.clone());
            }
            return Err(Error::ShapeConflict(format!(
                "'{name}' is already registered with a different definition"
            )));
        }

        let shape = Arc::new(requested);
        shapes.insert(name.to_owned(), shape.clone());
        tracing::debug!(shape = name, base = %base, indexes = shape.indexes.len(), "shape registered");
        Ok(shape)
    }

    /// Existing shape of the given base kind, or a fresh empty one.
    pub fn resolve(&self, name: &str, base: Kind) -> Result<Arc<ShapeDescriptor>> {
        check_base(name, base)?;
        if let Some(existing) = self.shapes.read().get(name) {
            if existing.base != base {
                return Err(Error::ShapeConflict(format!(
                    "'{name}' is registered as {}, not {base}", existing.base
                )));
            }
            return Ok(existing.clone());
        }
        self.register(name, base, &[], &IndexSpec::new())
    }

    pub fn get(&self, name: &str) -> Option<Arc<ShapeDescriptor>> {
        self.shapes.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.shapes.read().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.shapes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.read().is_empty()
    }

    pub(crate) fn default_node() -> Arc<ShapeDescriptor> {
        Self::seeded(DEFAULT_NODE_SHAPE, Kind::Node)
    }

    pub(crate) fn default_relationship() -> Arc<ShapeDescriptor> {
        Self::seeded(DEFAULT_RELATIONSHIP_SHAPE, Kind::Relationship)
    }

    fn seeded(name: &str, base: Kind) -> Arc<ShapeDescriptor> {
        // Seeded at construction and never replaceable: `register` refuses
        // any differing definition under an existing name.
        Self::global()
            .get(name)
            .unwrap_or_else(|| Arc::new(ShapeDescriptor::empty(name, base)))
    }
}

impl Default for ShapeRegistry {
    fn default() -> Self { Self::new() }
}

fn check_base(name: &str, base: Kind) -> Result<()> {
    match base {
        Kind::Node | Kind::Relationship => Ok(()),
        other => Err(Error::ShapeConflict(format!(
            "'{name}' must refine NODE or RELATIONSHIP, not {other}"
        ))),
    }
}

//! Versioning policy shared by nodes and relationships.
//!
//! A frozen instance ignores field writes (each ignored write reports a
//! `FrozenWrite` warning). `new_version` is the way forward from a frozen
//! instance: it copies the entity under the same id with the next version
//! number, freezes the original and applies the new payload to the copy.

use super::{now_timestamp, Node, PropertyMap, Relationship, Value};
use crate::hooks::EventKind;
use crate::Result;

pub trait Versioned: Sized {
    /// What `new_version` may apply to the copy.
    type Payload;

    fn version(&self) -> u64;
    fn is_frozen(&self) -> bool;
    fn freeze(&self);
    fn unfreeze(&self);

    /// Copy with the same id and `version + 1`; freezes `self`.
    fn new_version(&self, data: Option<Self::Payload>) -> Result<Self>;
}

impl Versioned for Node {
    type Payload = Value;

    fn version(&self) -> u64 {
        Node::version(self)
    }

    fn is_frozen(&self) -> bool {
        Node::is_frozen(self)
    }

    fn freeze(&self) {
        self.set_frozen(true);
    }

    fn unfreeze(&self) {
        self.set_frozen(false);
    }

    fn new_version(&self, data: Option<Value>) -> Result<Node> {
        let next = self.clone_node(false);
        if let Some(data) = data {
            next.set_data(data)?;
        }
        next.bump_version(Node::version(self) + 1, now_timestamp());
        self.freeze();
        tracing::debug!(node = %self.id(), version = next.version(), "new version");
        next.notify(EventKind::Versioned, Some(self.data()));
        Ok(next)
    }
}

impl Versioned for Relationship {
    type Payload = PropertyMap;

    fn version(&self) -> u64 {
        Relationship::version(self)
    }

    fn is_frozen(&self) -> bool {
        Relationship::is_frozen(self)
    }

    fn freeze(&self) {
        self.set_frozen(true);
    }

    fn unfreeze(&self) {
        self.set_frozen(false);
    }

    fn new_version(&self, data: Option<PropertyMap>) -> Result<Relationship> {
        let next = self.duplicate();
        if let Some(data) = data {
            next.set_data(data);
        }
        next.bump_version(Relationship::version(self) + 1);
        self.freeze();
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Warning;

    #[test]
    fn test_new_version_freezes_original() {
        let v1 = Node::with_id("doc", "draft");
        let v2 = v1.new_version(Some(Value::from("final"))).unwrap();

        assert_eq!(v2.id(), v1.id());
        assert_eq!(v2.version(), 1);
        assert_eq!(v2.data(), Value::from("final"));
        assert!(v1.is_frozen());
        assert!(!v2.is_frozen());

        let warnings = v1.set_data("edit").unwrap();
        assert!(matches!(warnings.as_slice(), [Warning::FrozenWrite { .. }]));
        assert_eq!(v1.data(), Value::from("draft"));

        v1.unfreeze();
        assert!(v1.set_data("edit").unwrap().is_empty());
    }

    #[test]
    fn test_frozen_field_writes_warn() {
        let node = Node::new(1);
        node.freeze();
        assert!(node.set_name("x").is_some());
        assert!(node.set_field("ttl", 5).unwrap().len() == 1);
        assert_eq!(node.ttl(), -1);
    }

    #[test]
    fn test_relationship_versions() {
        let (a, b) = (Node::new(1), Node::new(2));
        let r1 = Relationship::new(&a, &b);
        let r2 = r1.new_version(Some(PropertyMap::from([("w".to_owned(), Value::Int(3))]))).unwrap();
        assert_eq!(r2.id(), r1.id());
        assert_eq!(r2.version(), 1);
        assert!(r1.is_frozen());
        assert!(r1.set(Some("late"), None).is_some());
        assert_eq!(r2.data()["w"], Value::Int(3));
    }
}

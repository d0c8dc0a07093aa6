//! Graph configuration.

use serde::{Deserialize, Serialize};

use crate::model::RelationType;
use crate::Result;

/// Settings for the flatten transform.
///
/// Partial documents load; missing keys take their defaults.
///
/// ```
/// use entity_graph::GraphConfig;
///
/// let config = GraphConfig::from_json_str(r#"{"rel_type": "child"}"#).unwrap();
/// assert_eq!(config.rel_type, "CHILD");
/// assert_eq!(config.namespace_delimiter, "::");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Joins ids in namespace paths.
    pub namespace_delimiter: String,
    /// Relation type of the edges flatten synthesizes.
    pub rel_type: String,
    /// Flatten a deep copy of the root rather than the caller's nodes.
    pub clone_root: bool,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            namespace_delimiter: "::".to_owned(),
            rel_type: RelationType::Embedded.as_str().to_owned(),
            clone_root: true,
        }
    }
}

impl GraphConfig {
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: GraphConfig = serde_json::from_str(text)?;
        Ok(config.normalized())
    }

    pub fn with_namespace_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.namespace_delimiter = delimiter.into();
        self
    }

    pub fn with_rel_type(mut self, rel_type: impl Into<String>) -> Self {
        self.rel_type = rel_type.into().to_uppercase();
        self
    }

    pub fn with_clone_root(mut self, clone_root: bool) -> Self {
        self.clone_root = clone_root;
        self
    }

    fn normalized(mut self) -> Self {
        self.rel_type = self.rel_type.to_uppercase();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GraphConfig::default();
        assert_eq!(config.namespace_delimiter, "::");
        assert_eq!(config.rel_type, "EMBEDDED");
        assert!(config.clone_root);
    }

    #[test]
    fn test_builder_uppercases() {
        let config = GraphConfig::default().with_rel_type(RelationType::Child).with_namespace_delimiter("/");
        assert_eq!(config.rel_type, "CHILD");
        assert_eq!(config.namespace_delimiter, "/");
    }

    #[test]
    fn test_partial_json() {
        let config = GraphConfig::from_json_str(r#"{"clone_root": false}"#).unwrap();
        assert!(!config.clone_root);
        assert_eq!(config.rel_type, "EMBEDDED");
        assert!(GraphConfig::from_json_str("[1]").is_err());
    }
}

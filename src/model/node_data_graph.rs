//! NodeDataGraph — a graph anchored at one root node.
//!
//! `flatten` turns a nested node (other nodes embedded in its payload) into
//! a flat pool plus synthesized edges; `assemble` is the inverse.
//!
//! ```text
//! ROOT{ E{ [ {D_d: D{A, B, C}} ] } }
//!
//!   flatten ↓                      ↑ assemble
//!
//! pool:  ROOT{__ref E}  E{[{D_d: __ref D}]}  D{__ref A, ...}  A  B  C
//! edges: ROOT→E  E→D  D→A  D→B  D→C            (relType EMBEDDED, PRESERVE)
//! ```

use hashbrown::{HashMap, HashSet};

use super::namespace;
use super::{Graph, Node, NodeId, Protection, Relationship, Value};
use crate::config::GraphConfig;
use crate::{Error, Result, Warning};

/// Result of `assemble`: the rebuilt root and any unresolved references.
#[derive(Debug, Clone)]
pub struct Assembled {
    pub root: Node,
    pub warnings: Vec<Warning>,
}

#[derive(Debug, Clone)]
pub struct NodeDataGraph {
    graph: Graph,
    root: NodeId,
    config: GraphConfig,
}

impl NodeDataGraph {
    pub fn new(root: &Node) -> Result<Self> {
        Self::with_config(root, GraphConfig::default())
    }

    /// Flatten `root`. With `clone_root` off, the caller's nodes are
    /// pooled as they are and their payloads rewritten to markers.
    pub fn with_config(root: &Node, config: GraphConfig) -> Result<Self> {
        let root = if config.clone_root { root.structural_copy() } else { root.clone() };
        let graph = flatten(&root, &config)?;
        Ok(Self { graph, root: root.id().clone(), config })
    }

    /// Flatten a new root into this graph's configuration, replacing the
    /// previous contents.
    pub fn set_root(&mut self, root: &Node) -> Result<()> {
        *self = Self::with_config(root, self.config.clone())?;
        Ok(())
    }

    pub fn root_id(&self) -> &NodeId {
        &self.root
    }

    /// The pooled root, payload in marker form.
    pub fn root(&self) -> Option<&Node> {
        self.graph.node(&self.root)
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn into_graph(self) -> Graph {
        self.graph
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    pub fn rel_type(&self) -> &str {
        &self.config.rel_type
    }

    pub fn namespace_map(&self) -> &hashbrown::HashMap<NodeId, String> {
        self.graph.namespace_map()
    }

    /// Nested reconstruction of the root. The pool is left untouched.
    pub fn assemble(&self) -> Result<Assembled> {
        Self::assemble_graph(&self.graph, &self.root)
    }

    /// Nested reconstruction of `root` from any graph whose payloads use
    /// reference markers. Ids absent from the pool stay as markers and are
    /// reported as `MissingReference`.
    pub fn assemble_graph(graph: &Graph, root: &NodeId) -> Result<Assembled> {
        let pooled = graph
            .node(root)
            .ok_or_else(|| Error::NotFound(format!("root node {root} not in graph {}", graph.id())))?;
        let mut assembler = Assembler { graph, built: HashMap::new(), missing: HashSet::new(), warnings: Vec::new() };
        let root = assembler.rebuild(pooled);
        tracing::debug!(
            root = %root.id(), nodes = assembler.built.len(), missing = assembler.warnings.len(),
            "assembled"
        );
        Ok(Assembled { root, warnings: assembler.warnings })
    }
}

// ============================================================================
// Flatten
// ============================================================================

fn flatten(root: &Node, config: &GraphConfig) -> Result<Graph> {
    let mut pool = Pool::default();
    pool.insert(root);

    let mut graph = Graph::with_delimiter(config.namespace_delimiter.as_str());
    for id in &pool.order {
        graph.add_node(&pool.nodes[id]);
    }

    // One edge per marker occurrence, owners in pool order.
    for id in &pool.order {
        let owner = &pool.nodes[id];
        let mut markers = Vec::new();
        collect_markers(&owner.data(), &mut markers);
        for child_id in markers {
            let Some(child) = pool.nodes.get(&child_id) else {
                tracing::debug!(owner = %id, child = %child_id, "marker outside pool, no edge");
                continue;
            };
            let rel = Relationship::builder(owner, child)
                .with_rel_type(config.rel_type.as_str())
                .with_protection(Protection::Preserve)
                .build()?;
            graph.add_relationship(&rel)?;
        }
    }

    let map = namespace::namespace_map(&graph, root.id());
    graph.set_namespace_map(map);
    tracing::debug!(
        root = %root.id(), nodes = graph.node_count(), relationships = graph.relationship_count(),
        "flattened"
    );
    Ok(graph)
}

#[derive(Default)]
struct Pool {
    nodes: HashMap<NodeId, Node>,
    order: Vec<NodeId>,
}

impl Pool {
    /// Pool `node` (first one per id wins) and rewrite its payload with
    /// markers, pooling embedded nodes first. Returns the node's marker.
    fn insert(&mut self, node: &Node) -> Value {
        let marker = Value::reference(node.type_name(), node.id());
        if self.nodes.contains_key(node.id()) {
            return marker;
        }
        self.nodes.insert(node.id().clone(), node.clone());
        self.order.push(node.id().clone());

        let data = node.replace_data_raw(Value::Null);
        let substituted = self.substitute(data);
        node.replace_data_raw(substituted);
        marker
    }

    fn substitute(&mut self, value: Value) -> Value {
        match value {
            Value::Node(node) => self.insert(&node),
            Value::List(items) => Value::List(items.into_iter().map(|v| self.substitute(v)).collect()),
            Value::Map(map) => Value::Map(map.into_iter().map(|(k, v)| (k, self.substitute(v))).collect()),
            other => other,
        }
    }
}

fn collect_markers(value: &Value, out: &mut Vec<NodeId>) {
    if let Some((_, id)) = value.as_reference() {
        out.push(id);
        return;
    }
    match value {
        Value::List(items) => items.iter().for_each(|v| collect_markers(v, out)),
        Value::Map(map) => map.values().for_each(|v| collect_markers(v, out)),
        _ => {}
    }
}

// ============================================================================
// Assemble
// ============================================================================

struct Assembler<'a> {
    graph: &'a Graph,
    built: HashMap<NodeId, Node>,
    missing: HashSet<NodeId>,
    warnings: Vec<Warning>,
}

impl<'a> Assembler<'a> {
    fn rebuild(&mut self, pooled: &Node) -> Node {
        if let Some(done) = self.built.get(pooled.id()) {
            return done.clone();
        }
        let copy = pooled.copy_with_data(Value::Null);
        self.built.insert(pooled.id().clone(), copy.clone());
        let data = self.resolve(pooled.data());
        copy.replace_data_raw(data);
        copy
    }

    fn resolve(&mut self, value: Value) -> Value {
        let reference = value.as_reference().map(|(_, id)| id);
        if let Some(id) = reference {
            let graph = self.graph;
            return match graph.node(&id) {
                Some(pooled) => Value::Node(self.rebuild(pooled)),
                None => {
                    if self.missing.insert(id.clone()) {
                        tracing::warn!(node = %id, "reference not in pool, left unresolved");
                        self.warnings.push(Warning::MissingReference(id));
                    }
                    value
                }
            };
        }
        match value {
            Value::Node(node) => Value::Node(self.rebuild(&node)),
            Value::List(items) => Value::List(items.into_iter().map(|v| self.resolve(v)).collect()),
            Value::Map(map) => Value::Map(map.into_iter().map(|(k, v)| (k, self.resolve(v))).collect()),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_flatten_replaces_embeds_with_markers() {
        let leaf = Node::with_id("leaf", "x");
        let root = Node::with_id("root", Value::map([("child", Value::from(&leaf))]));
        let flat = NodeDataGraph::new(&root).unwrap();

        let pooled = flat.root().unwrap();
        assert_eq!(pooled.data(), Value::map([("child", Value::reference("Node", &NodeId::from("leaf")))]));
        // the caller's node is untouched
        assert!(root.data().as_map().unwrap()["child"].as_node().is_some());

        let rel = &flat.graph().relationships()[0];
        assert_eq!(rel.rel_type(), "EMBEDDED");
        assert_eq!(rel.protection(), Protection::Preserve);
        assert_eq!(rel.left_id(), Some(NodeId::from("root")));
        assert_eq!(rel.right_id(), Some(NodeId::from("leaf")));
    }

    #[test]
    fn test_without_clone_rewrites_in_place() {
        let leaf = Node::with_id("leaf", "x");
        let root = Node::with_id("root", Value::list([Value::from(&leaf)]));
        let config = GraphConfig::default().with_clone_root(false).with_rel_type("child");
        let flat = NodeDataGraph::with_config(&root, config).unwrap();

        assert!(flat.root().unwrap().ptr_eq(&root));
        assert!(root.data().as_list().unwrap()[0].is_reference());
        assert_eq!(flat.graph().relationships()[0].rel_type(), "CHILD");
    }

    #[test]
    fn test_assemble_missing_reference_is_not_fatal() {
        let root = Node::with_id(
            "root",
            Value::list([Value::reference("Node", &NodeId::from("ghost")), Value::reference("Node", &NodeId::from("ghost"))]),
        );
        let mut graph = Graph::new();
        graph.add_node(&root);

        let assembled = NodeDataGraph::assemble_graph(&graph, &NodeId::from("root")).unwrap();
        assert_eq!(assembled.warnings, vec![Warning::MissingReference(NodeId::from("ghost"))]);
        assert!(assembled.root.data().as_list().unwrap()[0].is_reference());
    }

    #[test]
    fn test_assemble_unknown_root() {
        let graph = Graph::new();
        let err = NodeDataGraph::assemble_graph(&graph, &NodeId::from("nope"));
        assert!(matches!(err, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_self_embedding_root_terminates() {
        let root = Node::with_id("self", Value::Null);
        root.set_data(Value::list([Value::from(&root)])).unwrap();
        let flat = NodeDataGraph::with_config(&root, GraphConfig::default().with_clone_root(false)).unwrap();
        assert_eq!(flat.graph().node_count(), 1);
        assert_eq!(flat.graph().relationship_count(), 1);
        // in-place flatten replaced the self handle with a marker
        assert!(root.children().next().is_none());
    }

    #[test]
    fn test_set_root_reflattens() {
        let mut flat = NodeDataGraph::new(&Node::with_id("one", 1)).unwrap();
        flat.set_root(&Node::with_id("two", Value::list([Value::from(Node::with_id("kid", 0))]))).unwrap();
        assert_eq!(flat.root_id(), &NodeId::from("two"));
        assert_eq!(flat.graph().node_count(), 2);
        assert_eq!(flat.namespace_map()[&NodeId::from("kid")], "two::kid");
    }
}

//! The CeleryScript tree.
//!
//! Nodes and leaves live in an arena owned by [`Tree`] and refer to each
//! other through [`NodeId`] / [`LeafId`] handles. Every node except the root
//! records its parent; the handle is written once, when the node is
//! allocated, and a [`Tree`] offers no way to change it afterwards.
//!
//! Trees are built from a [`NodeSpec`] (an owned, nested description) or
//! decoded from the JSON wire format. Code that inspects a tree goes
//! through the borrowed cursors [`NodeRef`], [`LeafRef`] and [`ValueRef`].

use std::fmt;

use serde::{Deserialize, Serialize, Serializer};

use crate::{Kind, TreeError, Value};

// ══════════════════════════════════════════════════════════════════════════════
// Handles & storage
// ══════════════════════════════════════════════════════════════════════════════

/// Handle to a node in a [`Tree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

/// Handle to a leaf in a [`Tree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LeafId(pub u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

impl LeafId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// The value stored under an argument key.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Node(NodeId),
    Leaf(LeafId),
    /// Input that was neither a node nor a scalar, kept as received.
    Malformed(serde_json::Value),
}

/// An internal tree element.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: Kind,
    /// Argument keys are unique and kept in declaration order.
    pub args: Vec<(String, ArgValue)>,
    pub body: Vec<NodeId>,
    pub parent: Option<NodeId>,
    pub comment: Option<String>,
}

/// A terminal element holding one scalar.
#[derive(Debug, Clone, PartialEq)]
pub struct Leaf {
    /// The argument key this leaf is stored under.
    pub kind: String,
    pub value: Value,
    pub parent: NodeId,
}

/// An arena of nodes and leaves rooted at the first node.
#[derive(Debug, Clone, PartialEq)]
pub struct Tree {
    nodes: Vec<Node>,
    leaves: Vec<Leaf>,
}

// ══════════════════════════════════════════════════════════════════════════════
// NodeSpec
// ══════════════════════════════════════════════════════════════════════════════

/// An owned description of a node and everything below it.
///
/// ```
/// use celery_types::{Kind, NodeSpec, Tree};
///
/// let tree = Tree::new(
///     NodeSpec::new(Kind::Sequence)
///         .arg("version", 20)
///         .child(NodeSpec::new(Kind::Wait).arg("milliseconds", 500)),
/// );
/// assert_eq!(tree.root().body().count(), 1);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSpec {
    pub kind: Kind,
    pub args: Vec<(String, ArgSpec)>,
    pub body: Vec<NodeSpec>,
    pub comment: Option<String>,
}

/// An argument value inside a [`NodeSpec`].
#[derive(Debug, Clone, PartialEq)]
pub enum ArgSpec {
    Node(NodeSpec),
    Leaf(Value),
    Malformed(serde_json::Value),
}

impl NodeSpec {
    pub fn new(kind: Kind) -> Self {
        Self {
            kind,
            args: Vec::new(),
            body: Vec::new(),
            comment: None,
        }
    }

    /// Set an argument. Setting an existing key replaces its value in place.
    pub fn arg(mut self, key: impl Into<String>, value: impl Into<ArgSpec>) -> Self {
        let key = key.into();
        let value = value.into();
        match self.args.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.args.push((key, value)),
        }
        self
    }

    /// Remove an argument if present.
    pub fn without_arg(mut self, key: &str) -> Self {
        self.args.retain(|(k, _)| k != key);
        self
    }

    /// Append a body child.
    pub fn child(mut self, node: NodeSpec) -> Self {
        self.body.push(node);
        self
    }

    pub fn children(mut self, nodes: impl IntoIterator<Item = NodeSpec>) -> Self {
        self.body.extend(nodes);
        self
    }

    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Decode a node object. `path` names the position for error messages.
    fn from_json(json: &serde_json::Value, path: &str) -> Result<Self, TreeError> {
        let obj = json.as_object().ok_or_else(|| TreeError::NotANode {
            path: path.to_string(),
        })?;

        let kind = match obj.get("kind") {
            None | Some(serde_json::Value::Null) => {
                return Err(TreeError::MissingKind {
                    path: path.to_string(),
                })
            }
            Some(serde_json::Value::String(name)) => name.parse::<Kind>()?,
            Some(other) => return Err(TreeError::UnknownKind(other.to_string())),
        };

        let mut spec = NodeSpec::new(kind);

        match obj.get("args") {
            None | Some(serde_json::Value::Null) => {}
            Some(serde_json::Value::Object(args)) => {
                for (key, value) in args {
                    let arg = ArgSpec::from_json(value, &format!("{path}.args.{key}"))?;
                    spec.args.push((key.clone(), arg));
                }
            }
            Some(_) => {
                return Err(TreeError::BadArgs {
                    path: path.to_string(),
                })
            }
        }

        match obj.get("body") {
            None | Some(serde_json::Value::Null) => {}
            Some(serde_json::Value::Array(items)) => {
                for (i, item) in items.iter().enumerate() {
                    let child_path = format!("{path}.body[{i}]");
                    if !item.is_object() {
                        return Err(TreeError::BadBody { path: child_path });
                    }
                    spec.body.push(NodeSpec::from_json(item, &child_path)?);
                }
            }
            Some(_) => {
                return Err(TreeError::BadBody {
                    path: path.to_string(),
                })
            }
        }

        if let Some(serde_json::Value::String(comment)) = obj.get("comment") {
            spec.comment = Some(comment.clone());
        }

        Ok(spec)
    }
}

impl ArgSpec {
    fn from_json(json: &serde_json::Value, path: &str) -> Result<Self, TreeError> {
        if let Some(value) = Value::from_json(json) {
            return Ok(ArgSpec::Leaf(value));
        }
        let is_node = json
            .get("kind")
            .and_then(serde_json::Value::as_str)
            .is_some_and(|name| name.parse::<Kind>().is_ok());
        if is_node {
            Ok(ArgSpec::Node(NodeSpec::from_json(json, path)?))
        } else {
            Ok(ArgSpec::Malformed(json.clone()))
        }
    }
}

impl From<NodeSpec> for ArgSpec {
    fn from(node: NodeSpec) -> Self {
        ArgSpec::Node(node)
    }
}

impl From<Value> for ArgSpec {
    fn from(value: Value) -> Self {
        ArgSpec::Leaf(value)
    }
}

macro_rules! leaf_arg_from {
    ($($t:ty),*) => {
        $(impl From<$t> for ArgSpec {
            fn from(v: $t) -> Self {
                ArgSpec::Leaf(Value::from(v))
            }
        })*
    };
}

leaf_arg_from!(bool, i32, i64, f64, &str, String);

// ══════════════════════════════════════════════════════════════════════════════
// Tree
// ══════════════════════════════════════════════════════════════════════════════

impl Tree {
    /// Allocate a tree from a spec. The spec's node becomes the root.
    pub fn new(root: NodeSpec) -> Self {
        let mut tree = Tree {
            nodes: Vec::new(),
            leaves: Vec::new(),
        };
        tree.alloc_node(root, None);
        tree
    }

    /// Decode a tree from JSON text.
    pub fn from_json(json: &str) -> Result<Self, TreeError> {
        let value: serde_json::Value =
            serde_json::from_str(json).map_err(|e| TreeError::InvalidJson(e.to_string()))?;
        Self::from_value(&value)
    }

    /// Decode a tree from a parsed JSON document.
    pub fn from_value(json: &serde_json::Value) -> Result<Self, TreeError> {
        Ok(Self::new(NodeSpec::from_json(json, "root")?))
    }

    /// Encode the tree back into its wire form.
    pub fn to_value(&self) -> serde_json::Value {
        self.node_to_json(self.root().id())
    }

    pub fn to_json(&self) -> String {
        self.to_value().to_string()
    }

    pub fn root(&self) -> NodeRef<'_> {
        self.node(NodeId(0))
    }

    /// Cursor for a node of this tree.
    ///
    /// Handles are only minted by the tree itself; passing one from a
    /// different tree is a caller bug and panics if out of range.
    pub fn node(&self, id: NodeId) -> NodeRef<'_> {
        debug_assert!(id.index() < self.nodes.len(), "node handle out of range");
        NodeRef { tree: self, id }
    }

    pub fn get(&self, id: NodeId) -> Option<NodeRef<'_>> {
        (id.index() < self.nodes.len()).then(|| NodeRef { tree: self, id })
    }

    pub fn leaf(&self, id: LeafId) -> LeafRef<'_> {
        debug_assert!(id.index() < self.leaves.len(), "leaf handle out of range");
        LeafRef { tree: self, id }
    }

    /// All nodes in allocation order: each node, then its argument nodes,
    /// then its body.
    pub fn nodes(&self) -> impl Iterator<Item = NodeRef<'_>> {
        (0..self.nodes.len()).map(move |i| NodeRef {
            tree: self,
            id: NodeId(i as u32),
        })
    }

    /// All leaves in allocation order.
    pub fn leaves(&self) -> impl Iterator<Item = LeafRef<'_>> {
        (0..self.leaves.len()).map(move |i| LeafRef {
            tree: self,
            id: LeafId(i as u32),
        })
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn leaf_count(&self) -> usize {
        self.leaves.len()
    }

    fn alloc_node(&mut self, spec: NodeSpec, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            kind: spec.kind,
            args: Vec::new(),
            body: Vec::new(),
            parent,
            comment: spec.comment,
        });

        let mut args = Vec::with_capacity(spec.args.len());
        for (key, arg) in spec.args {
            let value = match arg {
                ArgSpec::Node(node) => ArgValue::Node(self.alloc_node(node, Some(id))),
                ArgSpec::Leaf(value) => {
                    let leaf = LeafId(self.leaves.len() as u32);
                    self.leaves.push(Leaf {
                        kind: key.clone(),
                        value,
                        parent: id,
                    });
                    ArgValue::Leaf(leaf)
                }
                ArgSpec::Malformed(json) => ArgValue::Malformed(json),
            };
            args.push((key, value));
        }

        let mut body = Vec::with_capacity(spec.body.len());
        for child in spec.body {
            body.push(self.alloc_node(child, Some(id)));
        }

        let node = &mut self.nodes[id.index()];
        node.args = args;
        node.body = body;
        id
    }

    fn node_to_json(&self, id: NodeId) -> serde_json::Value {
        let node = &self.nodes[id.index()];
        let mut obj = serde_json::Map::new();
        obj.insert("kind".into(), node.kind.as_str().into());

        let mut args = serde_json::Map::new();
        for (key, value) in &node.args {
            let json = match value {
                ArgValue::Node(child) => self.node_to_json(*child),
                ArgValue::Leaf(leaf) => self.leaves[leaf.index()].value.to_json(),
                ArgValue::Malformed(raw) => raw.clone(),
            };
            args.insert(key.clone(), json);
        }
        obj.insert("args".into(), serde_json::Value::Object(args));

        if !node.body.is_empty() {
            let body = node.body.iter().map(|c| self.node_to_json(*c)).collect();
            obj.insert("body".into(), serde_json::Value::Array(body));
        }
        if let Some(comment) = &node.comment {
            obj.insert("comment".into(), comment.clone().into());
        }
        serde_json::Value::Object(obj)
    }
}

impl Serialize for Tree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Cursors
// ══════════════════════════════════════════════════════════════════════════════

/// A borrowed view of one node.
#[derive(Clone, Copy)]
pub struct NodeRef<'t> {
    tree: &'t Tree,
    id: NodeId,
}

/// A borrowed view of one leaf.
#[derive(Clone, Copy)]
pub struct LeafRef<'t> {
    tree: &'t Tree,
    id: LeafId,
}

/// A borrowed argument value.
#[derive(Debug, Clone, Copy)]
pub enum ValueRef<'t> {
    Node(NodeRef<'t>),
    Leaf(LeafRef<'t>),
    Malformed(&'t serde_json::Value),
}

impl<'t> NodeRef<'t> {
    fn data(self) -> &'t Node {
        &self.tree.nodes[self.id.index()]
    }

    pub fn id(self) -> NodeId {
        self.id
    }

    pub fn tree(self) -> &'t Tree {
        self.tree
    }

    pub fn kind(self) -> Kind {
        self.data().kind
    }

    pub fn comment(self) -> Option<&'t str> {
        self.data().comment.as_deref()
    }

    pub fn parent(self) -> Option<NodeRef<'t>> {
        let tree = self.tree;
        self.data().parent.map(|id| NodeRef { tree, id })
    }

    /// Arguments in declaration order.
    pub fn args(self) -> impl Iterator<Item = (&'t str, ValueRef<'t>)> {
        let tree = self.tree;
        self.data()
            .args
            .iter()
            .map(move |(key, value)| (key.as_str(), ValueRef::new(tree, value)))
    }

    pub fn arg_keys(self) -> impl Iterator<Item = &'t str> {
        self.data().args.iter().map(|(key, _)| key.as_str())
    }

    pub fn arg(self, key: &str) -> Option<ValueRef<'t>> {
        let tree = self.tree;
        self.data()
            .args
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, value)| ValueRef::new(tree, value))
    }

    pub fn has_arg(self, key: &str) -> bool {
        self.data().args.iter().any(|(k, _)| k == key)
    }

    /// The scalar under `key`, when that argument is a leaf.
    pub fn leaf_value(self, key: &str) -> Option<&'t Value> {
        self.arg(key)?.as_leaf().map(LeafRef::value)
    }

    /// The node under `key`, when that argument is a node.
    pub fn node_arg(self, key: &str) -> Option<NodeRef<'t>> {
        self.arg(key)?.as_node()
    }

    pub fn body(self) -> impl DoubleEndedIterator<Item = NodeRef<'t>> + ExactSizeIterator {
        let tree = self.tree;
        self.data().body.iter().map(move |&id| NodeRef { tree, id })
    }
}

impl<'t> LeafRef<'t> {
    fn data(self) -> &'t Leaf {
        &self.tree.leaves[self.id.index()]
    }

    pub fn id(self) -> LeafId {
        self.id
    }

    /// The argument key this leaf sits under.
    pub fn kind(self) -> &'t str {
        &self.data().kind
    }

    pub fn value(self) -> &'t Value {
        &self.data().value
    }

    pub fn parent(self) -> NodeRef<'t> {
        NodeRef {
            tree: self.tree,
            id: self.data().parent,
        }
    }
}

impl<'t> ValueRef<'t> {
    fn new(tree: &'t Tree, value: &'t ArgValue) -> Self {
        match value {
            ArgValue::Node(id) => ValueRef::Node(NodeRef { tree, id: *id }),
            ArgValue::Leaf(id) => ValueRef::Leaf(LeafRef { tree, id: *id }),
            ArgValue::Malformed(raw) => ValueRef::Malformed(raw),
        }
    }

    pub fn as_node(self) -> Option<NodeRef<'t>> {
        match self {
            ValueRef::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_leaf(self) -> Option<LeafRef<'t>> {
        match self {
            ValueRef::Leaf(leaf) => Some(leaf),
            _ => None,
        }
    }
}

impl fmt::Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef")
            .field("id", &self.id)
            .field("kind", &self.kind())
            .finish()
    }
}

impl fmt::Debug for LeafRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LeafRef")
            .field("id", &self.id)
            .field("kind", &self.kind())
            .field("value", self.value())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Tree {
        Tree::new(
            NodeSpec::new(Kind::Sequence)
                .arg(
                    "locals",
                    NodeSpec::new(Kind::ScopeDeclaration).child(
                        NodeSpec::new(Kind::ParameterDeclaration)
                            .arg("label", "parent")
                            .arg("default_value", NodeSpec::new(Kind::Nothing)),
                    ),
                )
                .arg("version", 20)
                .child(NodeSpec::new(Kind::Wait).arg("milliseconds", 100))
                .child(NodeSpec::new(Kind::TakePhoto)),
        )
    }

    #[test]
    fn test_root_has_no_parent() {
        let tree = sample();
        assert!(tree.root().parent().is_none());
        assert_eq!(tree.root().kind(), Kind::Sequence);
    }

    #[test]
    fn test_every_non_root_node_has_a_parent() {
        let tree = sample();
        for node in tree.nodes().skip(1) {
            assert!(node.parent().is_some(), "{node:?} has no parent");
        }
    }

    #[test]
    fn test_body_children_point_back_at_parent() {
        let tree = sample();
        let root = tree.root();
        for child in root.body() {
            assert_eq!(child.parent().map(NodeRef::id), Some(root.id()));
        }
    }

    #[test]
    fn test_arg_nodes_point_back_at_owner() {
        let tree = sample();
        let locals = tree.root().node_arg("locals").unwrap();
        assert_eq!(locals.parent().unwrap().id(), tree.root().id());
        let decl = locals.body().next().unwrap();
        assert_eq!(decl.parent().unwrap().id(), locals.id());
    }

    #[test]
    fn test_leaf_kind_is_its_key() {
        let tree = sample();
        let leaf = tree.root().arg("version").unwrap().as_leaf().unwrap();
        assert_eq!(leaf.kind(), "version");
        assert_eq!(leaf.value(), &Value::Integer(20));
        assert_eq!(leaf.parent().kind(), Kind::Sequence);
    }

    #[test]
    fn test_args_keep_declaration_order() {
        let tree = sample();
        let keys: Vec<&str> = tree.root().arg_keys().collect();
        assert_eq!(keys, vec!["locals", "version"]);
    }

    #[test]
    fn test_spec_arg_replaces_existing_key() {
        let spec = NodeSpec::new(Kind::Wait)
            .arg("milliseconds", 1)
            .arg("milliseconds", 2);
        assert_eq!(spec.args.len(), 1);
        assert_eq!(spec.args[0].1, ArgSpec::Leaf(Value::Integer(2)));
    }

    #[test]
    fn test_get_out_of_range() {
        let tree = sample();
        assert!(tree.get(NodeId(999)).is_none());
        assert!(tree.get(NodeId(0)).is_some());
    }

    #[test]
    fn test_counts() {
        let tree = sample();
        // sequence, scope_declaration, parameter_declaration, nothing, wait, take_photo
        assert_eq!(tree.node_count(), 6);
        // label, version, milliseconds
        assert_eq!(tree.leaf_count(), 3);
    }
}

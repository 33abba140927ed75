//! The corpus: the grammar and type rules of CeleryScript.
//!
//! A [`Corpus`] maps every argument name to the node kinds and leaf types it
//! accepts, and every node kind to its exact argument set and the kinds its
//! body may contain. Both may carry a custom validator that receives the
//! device context, which is how permission rules reach the checker.
//!
//! The declarative part is a serde document ([`CorpusSchema`]) so a grammar
//! can be stored as JSON; validators are attached in code afterwards.
//!
//! ```
//! use celery_checker::Corpus;
//! use celery_types::{Kind, LeafType};
//!
//! let corpus: Corpus = Corpus::new()
//!     .arg("milliseconds", [], [LeafType::Integer])
//!     .node(Kind::Wait, ["milliseconds"], []);
//! assert_eq!(corpus.required_arg_keys(Kind::Wait).unwrap(), ["milliseconds"]);
//! ```

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use celery_types::{Kind, LeafType, NodeRef, Result, TypeCheckError, ValueRef};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Custom rule for one argument, run after its structural check.
pub type ArgValidator<D> = Arc<dyn Fn(ValueRef<'_>, &D) -> Result<()> + Send + Sync>;

/// Custom rule for a whole node, run after all of its arguments.
pub type NodeValidator<D> = Arc<dyn Fn(NodeRef<'_>, &D) -> Result<()> + Send + Sync>;

// ══════════════════════════════════════════════════════════════════════════════
// Definitions
// ══════════════════════════════════════════════════════════════════════════════

/// What one argument key accepts.
pub struct ArgDefinition<D> {
    name: String,
    allowed_kinds: BTreeSet<Kind>,
    allowed_leaf_types: BTreeSet<LeafType>,
    validator: Option<ArgValidator<D>>,
}

impl<D> ArgDefinition<D> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Node kinds accepted when the value is a node.
    pub fn allowed_kinds(&self) -> &BTreeSet<Kind> {
        &self.allowed_kinds
    }

    /// Leaf types accepted when the value is a leaf.
    pub fn allowed_leaf_types(&self) -> &BTreeSet<LeafType> {
        &self.allowed_leaf_types
    }

    pub fn allows_kind(&self, kind: Kind) -> bool {
        self.allowed_kinds.contains(&kind)
    }

    pub fn allows_leaf_type(&self, ty: LeafType) -> bool {
        self.allowed_leaf_types.contains(&ty)
    }

    pub fn validator(&self) -> Option<&ArgValidator<D>> {
        self.validator.as_ref()
    }
}

/// The shape of one node kind.
pub struct NodeDefinition<D> {
    kind: Kind,
    args: Vec<String>,
    body: BTreeSet<Kind>,
    validator: Option<NodeValidator<D>>,
}

impl<D> NodeDefinition<D> {
    pub fn kind(&self) -> Kind {
        self.kind
    }

    /// The exact argument keys, in schema order.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn body(&self) -> &BTreeSet<Kind> {
        &self.body
    }

    pub fn validator(&self) -> Option<&NodeValidator<D>> {
        self.validator.as_ref()
    }
}

impl<D> Clone for ArgDefinition<D> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            allowed_kinds: self.allowed_kinds.clone(),
            allowed_leaf_types: self.allowed_leaf_types.clone(),
            validator: self.validator.clone(),
        }
    }
}

impl<D> Clone for NodeDefinition<D> {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            args: self.args.clone(),
            body: self.body.clone(),
            validator: self.validator.clone(),
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Corpus
// ══════════════════════════════════════════════════════════════════════════════

/// Registry of argument and node definitions, generic over the device
/// context handed to validators.
///
/// A corpus is immutable once handed to a checker and is `Send + Sync`, so
/// one instance can serve concurrent checks of independent trees.
pub struct Corpus<D = ()> {
    args: HashMap<String, ArgDefinition<D>>,
    nodes: HashMap<Kind, NodeDefinition<D>>,
}

impl<D> Corpus<D> {
    /// An empty corpus.
    pub fn new() -> Self {
        Self {
            args: HashMap::new(),
            nodes: HashMap::new(),
        }
    }

    /// Define an argument and what it accepts. Redefining replaces.
    pub fn arg(
        mut self,
        name: &str,
        kinds: impl IntoIterator<Item = Kind>,
        leaf_types: impl IntoIterator<Item = LeafType>,
    ) -> Self {
        self.args.insert(
            name.to_string(),
            ArgDefinition {
                name: name.to_string(),
                allowed_kinds: kinds.into_iter().collect(),
                allowed_leaf_types: leaf_types.into_iter().collect(),
                validator: None,
            },
        );
        self
    }

    /// Define a node kind: its exact argument keys and allowed body kinds.
    pub fn node<'k>(
        mut self,
        kind: Kind,
        args: impl IntoIterator<Item = &'k str>,
        body: impl IntoIterator<Item = Kind>,
    ) -> Self {
        let mut keys: Vec<String> = Vec::new();
        for key in args {
            if !keys.iter().any(|k| k == key) {
                keys.push(key.to_string());
            }
        }
        self.nodes.insert(
            kind,
            NodeDefinition {
                kind,
                args: keys,
                body: body.into_iter().collect(),
                validator: None,
            },
        );
        self
    }

    /// Attach a validator to a defined argument. Unknown names are ignored.
    pub fn with_arg_validator<F>(mut self, name: &str, validator: F) -> Self
    where
        F: Fn(ValueRef<'_>, &D) -> Result<()> + Send + Sync + 'static,
    {
        if let Some(def) = self.args.get_mut(name) {
            def.validator = Some(Arc::new(validator));
        }
        self
    }

    /// Attach a validator to a defined node kind. Unknown kinds are ignored.
    pub fn with_node_validator<F>(mut self, kind: Kind, validator: F) -> Self
    where
        F: Fn(NodeRef<'_>, &D) -> Result<()> + Send + Sync + 'static,
    {
        if let Some(def) = self.nodes.get_mut(&kind) {
            def.validator = Some(Arc::new(validator));
        }
        self
    }

    // ──────────────────────────────────────────────────────────────────────
    // Queries
    // ──────────────────────────────────────────────────────────────────────

    pub fn node_definition(&self, kind: Kind) -> Result<&NodeDefinition<D>> {
        self.nodes
            .get(&kind)
            .ok_or_else(|| TypeCheckError::unknown_node(kind))
    }

    pub fn arg_definition(&self, key: &str) -> Result<&ArgDefinition<D>> {
        self.args
            .get(key)
            .ok_or_else(|| TypeCheckError::unknown_arg(key))
    }

    /// The exact argument keys a node of `kind` must declare.
    pub fn required_arg_keys(&self, kind: Kind) -> Result<&[String]> {
        Ok(self.node_definition(kind)?.args())
    }

    /// The kinds allowed in the body of a node of `kind`.
    pub fn allowed_body_kinds(&self, kind: Kind) -> Result<&BTreeSet<Kind>> {
        Ok(self.node_definition(kind)?.body())
    }

    /// The custom validator for an argument, if one is registered.
    pub fn custom_validator(&self, key: &str) -> Option<&ArgValidator<D>> {
        self.args.get(key)?.validator()
    }

    /// Run the argument validator for `key` against `value`. Passes when no
    /// validator is registered.
    pub fn run_custom_validator(&self, key: &str, value: ValueRef<'_>, device: &D) -> Result<()> {
        match self.custom_validator(key) {
            Some(validator) => validator(value, device),
            None => Ok(()),
        }
    }

    /// Run the whole-node validator for `node`'s kind, if any.
    pub fn validate_node(&self, node: NodeRef<'_>, device: &D) -> Result<()> {
        match self.node_definition(node.kind())?.validator() {
            Some(validator) => validator(node, device),
            None => Ok(()),
        }
    }

    pub fn has_node(&self, kind: Kind) -> bool {
        self.nodes.contains_key(&kind)
    }

    pub fn has_arg(&self, name: &str) -> bool {
        self.args.contains_key(name)
    }

    // ──────────────────────────────────────────────────────────────────────
    // Schema documents
    // ──────────────────────────────────────────────────────────────────────

    /// Build a corpus from a schema document. Validators start empty.
    pub fn from_schema(schema: CorpusSchema) -> std::result::Result<Self, SchemaError> {
        let mut corpus = Self::new();
        for arg in schema.args {
            if corpus.has_arg(&arg.name) {
                return Err(SchemaError::DuplicateArg(arg.name));
            }
            corpus = corpus.arg(&arg.name, arg.allowed_kinds, arg.allowed_leaf_types);
        }
        for node in schema.nodes {
            if corpus.has_node(node.name) {
                return Err(SchemaError::DuplicateNode(node.name));
            }
            if let Some(missing) = node.allowed_args.iter().find(|a| !corpus.has_arg(a)) {
                return Err(SchemaError::UndeclaredArg {
                    node: node.name,
                    arg: missing.clone(),
                });
            }
            corpus = corpus.node(
                node.name,
                node.allowed_args.iter().map(String::as_str),
                node.allowed_body_types,
            );
        }
        Ok(corpus)
    }

    pub fn from_json(json: &str) -> std::result::Result<Self, SchemaError> {
        let schema: CorpusSchema =
            serde_json::from_str(json).map_err(|e| SchemaError::InvalidJson(e.to_string()))?;
        Self::from_schema(schema)
    }

    /// Export the declarative part, sorted for stable output.
    pub fn schema(&self) -> CorpusSchema {
        let mut args: Vec<ArgSchema> = self
            .args
            .values()
            .map(|def| ArgSchema {
                name: def.name.clone(),
                allowed_kinds: def.allowed_kinds.iter().copied().collect(),
                allowed_leaf_types: def.allowed_leaf_types.iter().copied().collect(),
            })
            .collect();
        args.sort_by(|a, b| a.name.cmp(&b.name));

        let mut nodes: Vec<NodeSchema> = self
            .nodes
            .values()
            .map(|def| NodeSchema {
                name: def.kind,
                allowed_args: def.args.clone(),
                allowed_body_types: def.body.iter().copied().collect(),
            })
            .collect();
        nodes.sort_by_key(|n| n.name);

        CorpusSchema { args, nodes }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(&self.schema()).unwrap_or_else(|_| "{}".to_string())
    }
}

impl<D> Default for Corpus<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> Clone for Corpus<D> {
    fn clone(&self) -> Self {
        Self {
            args: self.args.clone(),
            nodes: self.nodes.clone(),
        }
    }
}

impl<D> fmt::Debug for Corpus<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Corpus")
            .field("args", &self.args.len())
            .field("nodes", &self.nodes.len())
            .finish()
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Schema document
// ══════════════════════════════════════════════════════════════════════════════

/// The serializable grammar of a corpus.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CorpusSchema {
    #[serde(default)]
    pub args: Vec<ArgSchema>,
    #[serde(default)]
    pub nodes: Vec<NodeSchema>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArgSchema {
    pub name: String,
    #[serde(default)]
    pub allowed_kinds: Vec<Kind>,
    #[serde(default)]
    pub allowed_leaf_types: Vec<LeafType>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSchema {
    pub name: Kind,
    #[serde(default)]
    pub allowed_args: Vec<String>,
    #[serde(default)]
    pub allowed_body_types: Vec<Kind>,
}

/// Problems loading a corpus schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("invalid corpus JSON: {0}")]
    InvalidJson(String),

    #[error("argument '{0}' is defined twice")]
    DuplicateArg(String),

    #[error("node '{0}' is defined twice")]
    DuplicateNode(Kind),

    #[error("node '{node}' uses argument '{arg}', which is not defined")]
    UndeclaredArg { node: Kind, arg: String },
}

//! CeleryScript checker: walks a tree and validates it against a corpus.
//!
//! Entry point: [`Checker::check`].
//!
//! For every node, in pre-order:
//! 1. each body child's kind must be allowed under the node (`BadBody`)
//! 2. the argument keys must equal the corpus' set exactly (`MissingArg`,
//!    then `ExtraArgs`)
//! 3. each argument, in declaration order, must pair with its definition
//!    (`BadLeaf`, `Malformed`, `UnboundVariable`), then pass the
//!    argument's custom validator; node-valued arguments are then checked
//!    as subtrees of their own
//! 4. the corpus' whole-node validator runs last
//!
//! The first failure ends the check.

use celery_types::{
    bare_list, quoted_list, Kind, LeafRef, NodeRef, Result, Tree, TypeCheckError, ValueRef,
};
use tracing::{debug, trace};

use crate::corpus::{ArgDefinition, Corpus};
use crate::resolver::{self, Binding, BindingKind};
use crate::walker;

// ══════════════════════════════════════════════════════════════════════════════
// Verdict
// ══════════════════════════════════════════════════════════════════════════════

/// Outcome of [`Checker::run`]: the checked tree, or the first error.
#[derive(Debug)]
pub enum Verdict<'a> {
    Valid(&'a Tree),
    Invalid(TypeCheckError),
}

impl<'a> Verdict<'a> {
    pub fn is_valid(&self) -> bool {
        matches!(self, Verdict::Valid(_))
    }

    pub fn error(&self) -> Option<&TypeCheckError> {
        match self {
            Verdict::Valid(_) => None,
            Verdict::Invalid(err) => Some(err),
        }
    }

    pub fn into_result(self) -> Result<&'a Tree> {
        match self {
            Verdict::Valid(tree) => Ok(tree),
            Verdict::Invalid(err) => Err(err),
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Checker
// ══════════════════════════════════════════════════════════════════════════════

/// Validates one tree against a corpus, with a device context for the
/// corpus' validators.
///
/// The checker only borrows its inputs and keeps no state between calls;
/// every method re-checks from scratch.
pub struct Checker<'a, D> {
    tree: &'a Tree,
    corpus: &'a Corpus<D>,
    device: &'a D,
}

impl<'a, D> Checker<'a, D> {
    /// Create a new checker.
    pub fn new(tree: &'a Tree, corpus: &'a Corpus<D>, device: &'a D) -> Self {
        Self {
            tree,
            corpus,
            device,
        }
    }

    /// Check the whole tree. Returns the unmodified tree, or the first error.
    pub fn check(&self) -> Result<&'a Tree> {
        debug!(nodes = self.tree.node_count(), "checking tree");
        walker::travel(self.tree.root(), |node| self.validate(node)).map_err(|err| {
            debug!(kind = %err.kind, message = %err.message, "check failed");
            err
        })?;
        Ok(self.tree)
    }

    /// Like [`check`](Self::check), as a [`Verdict`].
    pub fn run(&self) -> Verdict<'a> {
        match self.check() {
            Ok(tree) => Verdict::Valid(tree),
            Err(err) => Verdict::Invalid(err),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.check().is_ok()
    }

    /// The first error in the tree, if any.
    pub fn error(&self) -> Option<TypeCheckError> {
        self.check().err()
    }

    /// Check a single leaf against the leaf types allowed for its key.
    ///
    /// The leaf may come from any tree, not only the one being checked.
    pub fn check_leaf(&self, leaf: LeafRef<'_>) -> Result<()> {
        let parent = leaf.parent();
        let def = self
            .corpus
            .arg_definition(leaf.kind())
            .map_err(|e| e.at(parent.id()))?;
        let actual = leaf.value().leaf_type();
        if def.allows_leaf_type(actual) {
            return Ok(());
        }
        Err(TypeCheckError::bad_leaf(
            leaf.kind(),
            parent.kind(),
            &bare_list(def.allowed_leaf_types()),
            &actual.to_string(),
        )
        .at(parent.id()))
    }

    // ══════════════════════════════════════════════════════════════════════
    // Nodes
    // ══════════════════════════════════════════════════════════════════════

    fn validate(&self, node: NodeRef<'_>) -> Result<()> {
        trace!(id = node.id().0, kind = %node.kind(), "validating node");
        self.validate_body(node)?;
        self.validate_node(node)
    }

    fn validate_body(&self, node: NodeRef<'_>) -> Result<()> {
        if node.body().len() == 0 {
            return Ok(());
        }
        let allowed = self
            .corpus
            .allowed_body_kinds(node.kind())
            .map_err(|e| e.at(node.id()))?;
        for (index, child) in node.body().enumerate() {
            if !allowed.contains(&child.kind()) {
                return Err(TypeCheckError::bad_body(
                    node.kind(),
                    child.kind(),
                    index,
                    &quoted_list(allowed),
                )
                .at(child.id()));
            }
        }
        Ok(())
    }

    fn validate_node(&self, node: NodeRef<'_>) -> Result<()> {
        self.check_arity(node)?;
        for (key, value) in node.args() {
            self.check_arg_validity(node, key, value)?;
        }
        self.corpus.validate_node(node, self.device)
    }

    fn check_arity(&self, node: NodeRef<'_>) -> Result<()> {
        let required = self
            .corpus
            .required_arg_keys(node.kind())
            .map_err(|e| e.at(node.id()))?;

        for key in required {
            if !node.has_arg(key) {
                let present: Vec<&str> = node.arg_keys().collect();
                return Err(TypeCheckError::missing_arg(node.kind(), key, &present).at(node.id()));
            }
        }

        let extras: Vec<&str> = node
            .arg_keys()
            .filter(|key| !required.iter().any(|r| r.as_str() == *key))
            .collect();
        if !extras.is_empty() {
            return Err(TypeCheckError::extra_args(node.kind(), &extras, required).at(node.id()));
        }
        Ok(())
    }

    // ══════════════════════════════════════════════════════════════════════
    // Arguments
    // ══════════════════════════════════════════════════════════════════════

    fn check_arg_validity(&self, owner: NodeRef<'_>, key: &str, value: ValueRef<'_>) -> Result<()> {
        match value {
            ValueRef::Node(node) => self.validate_node_pairing(owner, key, node)?,
            ValueRef::Leaf(leaf) => self.check_leaf(leaf)?,
            ValueRef::Malformed(_) => return Err(TypeCheckError::malformed(key).at(owner.id())),
        }

        self.corpus.run_custom_validator(key, value, self.device)?;

        if let ValueRef::Node(node) = value {
            walker::travel(node, |inner| self.validate(inner))?;
        }
        Ok(())
    }

    fn validate_node_pairing(&self, owner: NodeRef<'_>, key: &str, value: NodeRef<'_>) -> Result<()> {
        let def = self.corpus.arg_definition(key).map_err(|e| e.at(owner.id()))?;

        if value.kind() == Kind::Identifier {
            let binding = resolver::resolve(value)?;
            self.check_binding(&binding, def);
        }

        if def.allows_kind(value.kind()) {
            return Ok(());
        }
        let kind = value.kind().as_str();
        Err(
            TypeCheckError::bad_leaf(kind, owner.kind(), &quoted_list(def.allowed_kinds()), kind)
                .at(value.id()),
        )
    }

    /// Compatibility of a resolved binding with the argument's allowed kinds.
    ///
    /// Not enforced yet: identifiers pass once they resolve.
    fn check_binding(&self, binding: &Binding<'_>, def: &ArgDefinition<D>) {
        let expected: Vec<Kind> = def
            .allowed_kinds()
            .iter()
            .copied()
            .filter(|k| *k != Kind::Identifier)
            .collect();
        match binding.kind() {
            BindingKind::Parameter { data_type } => {
                trace!(?data_type, ?expected, "parameter binding");
            }
            BindingKind::Variable { data_value } => {
                trace!(?data_value, ?expected, "variable binding");
            }
            BindingKind::Other(kind) => {
                trace!(%kind, "binding");
            }
        }
    }
}

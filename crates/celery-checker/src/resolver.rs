//! Lexical-scope resolution of identifier references.
//!
//! An `identifier` node names a binding by its `label`. Resolution walks
//! from the reference up through its ancestors; at each one it looks for a
//! `locals` argument holding a `scope_declaration` and scans that scope's
//! declarations for a matching label. The nearest enclosing declaration
//! wins. Sibling and descendant scopes are never searched.
//!
//! Resolution is pure: a failure is returned as [`Unbound`] and the caller
//! decides how to report it.

use celery_types::{Kind, NodeId, NodeRef, TypeCheckError, Value};
use tracing::trace;

/// A successfully resolved reference.
#[derive(Debug, Clone, Copy)]
pub struct Binding<'t> {
    /// The declaration node the reference resolved to.
    pub declaration: NodeRef<'t>,
}

/// What a binding declares.
#[derive(Debug, Clone, PartialEq)]
pub enum BindingKind<'t> {
    /// `parameter_declaration`, with its declared `data_type` if it has one.
    Parameter { data_type: Option<&'t str> },
    /// `variable_declaration`, with the kind of its bound `data_value`.
    Variable { data_value: Option<Kind> },
    Other(Kind),
}

impl<'t> Binding<'t> {
    pub fn kind(&self) -> BindingKind<'t> {
        let decl = self.declaration;
        match decl.kind() {
            Kind::ParameterDeclaration => BindingKind::Parameter {
                data_type: decl.leaf_value("data_type").and_then(Value::as_str),
            },
            Kind::VariableDeclaration => BindingKind::Variable {
                data_value: decl.node_arg("data_value").map(NodeRef::kind),
            },
            other => BindingKind::Other(other),
        }
    }
}

/// A reference with no enclosing declaration for its label.
#[derive(Debug, Clone, PartialEq)]
pub struct Unbound {
    pub label: String,
    /// The identifier node that failed to resolve.
    pub reference: NodeId,
}

impl From<Unbound> for TypeCheckError {
    fn from(unbound: Unbound) -> Self {
        TypeCheckError::unbound_variable(&unbound.label).at(unbound.reference)
    }
}

/// Resolve `reference` against the scopes of its ancestors.
///
/// A reference without a `label` leaf never matches anything.
pub fn resolve(reference: NodeRef<'_>) -> Result<Binding<'_>, Unbound> {
    let label = reference.leaf_value("label");

    if let Some(label) = label {
        let mut current = Some(reference);
        while let Some(node) = current {
            if let Some(declaration) = declaration_in(node, label) {
                trace!(
                    label = %label,
                    scope_owner = %node.kind(),
                    declaration = %declaration.kind(),
                    "resolved identifier"
                );
                return Ok(Binding { declaration });
            }
            current = node.parent();
        }
    }

    Err(Unbound {
        label: label.map(ToString::to_string).unwrap_or_default(),
        reference: reference.id(),
    })
}

/// The first declaration in `node`'s local scope labelled `label`.
fn declaration_in<'t>(node: NodeRef<'t>, label: &Value) -> Option<NodeRef<'t>> {
    let locals = node.node_arg("locals")?;
    if locals.kind() != Kind::ScopeDeclaration {
        return None;
    }
    locals
        .body()
        .find(|decl| decl.leaf_value("label") == Some(label))
}

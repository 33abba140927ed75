use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Kind, NodeId};

const MISSING_ARG: &str = "Expected node '{kind}' to have a '{key}', but got: {present}.";
const EXTRA_ARGS: &str = "'{kind}' has unexpected arguments: {extras}. Allowed arguments: {allowed}";
const BAD_LEAF: &str = "Expected leaf '{kind}' within '{parent_kind}' to be one of: {allowed} but got {actual}";
const MALFORMED: &str = "Expected '{key}' to be a node or leaf, but it was neither";
const BAD_BODY: &str = "Body of '{parent}' node contains '{child}' node at index {index}. Expected one of: {allowed}";
const UNBOUND_VAR: &str = "Unbound variable: {label}";

/// Some pairing errors mean more than a syntax error. A `nothing` node in a
/// `variable_declaration` usually means the user never filled in a value.
const FRIENDLY_ERRORS: &[(&str, Kind, &str)] = &[(
    "nothing",
    Kind::VariableDeclaration,
    "You must provide a value for all parameters",
)];

/// What went wrong, independent of the rendered message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// A required argument key is absent.
    MissingArg,
    /// The node declares argument keys beyond the required set.
    ExtraArgs,
    /// A value's kind or type is not allowed in its position.
    BadLeaf,
    /// An argument value is neither a node nor a leaf.
    Malformed,
    /// A body child's kind is not allowed under its parent.
    BadBody,
    /// An identifier has no enclosing declaration with its label.
    UnboundVariable,
    /// The corpus has no definition for a node kind.
    UnknownNode,
    /// The corpus has no definition for an argument key.
    UnknownArg,
    /// Raised by a corpus validator (permission checks and the like).
    Custom,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingArg => write!(f, "missing_arg"),
            Self::ExtraArgs => write!(f, "extra_args"),
            Self::BadLeaf => write!(f, "bad_leaf"),
            Self::Malformed => write!(f, "malformed"),
            Self::BadBody => write!(f, "bad_body"),
            Self::UnboundVariable => write!(f, "unbound_variable"),
            Self::UnknownNode => write!(f, "unknown_node"),
            Self::UnknownArg => write!(f, "unknown_arg"),
            Self::Custom => write!(f, "custom"),
        }
    }
}

/// The single error a check produces: the first problem found.
///
/// `node` points at the offending node when one is known. For unbound
/// variables it is the identifier that failed to resolve.
#[derive(Debug, Clone, PartialEq, Serialize, Error)]
#[error("{message}")]
pub struct TypeCheckError {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node: Option<NodeId>,
}

impl TypeCheckError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            node: None,
        }
    }

    /// An error raised by a corpus validator.
    pub fn custom(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Custom, message)
    }

    /// Point the error at a node, unless it already points somewhere.
    pub fn at(mut self, node: NodeId) -> Self {
        self.node.get_or_insert(node);
        self
    }

    pub fn missing_arg(kind: Kind, key: &str, present: &[&str]) -> Self {
        let present = if present.is_empty() {
            "nothing".to_string()
        } else {
            present.join(", ")
        };
        let message = MISSING_ARG
            .replace("{kind}", kind.as_str())
            .replace("{key}", key)
            .replace("{present}", &present);
        Self::new(ErrorKind::MissingArg, message)
    }

    pub fn extra_args(kind: Kind, extras: &[&str], allowed: &[String]) -> Self {
        let message = EXTRA_ARGS
            .replace("{kind}", kind.as_str())
            .replace("{extras}", &quoted_list(extras))
            .replace("{allowed}", &quoted_list(allowed));
        Self::new(ErrorKind::ExtraArgs, message)
    }

    /// A value outside its allowed set. `kind` is a node kind for node
    /// values, or the argument key for leaves.
    pub fn bad_leaf(kind: &str, parent_kind: Kind, allowed: &str, actual: &str) -> Self {
        let template = FRIENDLY_ERRORS
            .iter()
            .find(|(k, p, _)| *k == kind && *p == parent_kind)
            .map(|(_, _, friendly)| *friendly)
            .unwrap_or(BAD_LEAF);
        let message = template
            .replace("{kind}", kind)
            .replace("{parent_kind}", parent_kind.as_str())
            .replace("{allowed}", allowed)
            .replace("{actual}", actual);
        Self::new(ErrorKind::BadLeaf, message)
    }

    pub fn malformed(key: &str) -> Self {
        Self::new(ErrorKind::Malformed, MALFORMED.replace("{key}", key))
    }

    pub fn bad_body(parent: Kind, child: Kind, index: usize, allowed: &str) -> Self {
        let message = BAD_BODY
            .replace("{parent}", parent.as_str())
            .replace("{child}", child.as_str())
            .replace("{index}", &index.to_string())
            .replace("{allowed}", allowed);
        Self::new(ErrorKind::BadBody, message)
    }

    pub fn unbound_variable(label: &str) -> Self {
        Self::new(ErrorKind::UnboundVariable, UNBOUND_VAR.replace("{label}", label))
    }

    pub fn unknown_node(kind: Kind) -> Self {
        Self::new(
            ErrorKind::UnknownNode,
            format!("Can't find validation rules for node '{kind}'"),
        )
    }

    pub fn unknown_arg(key: &str) -> Self {
        Self::new(
            ErrorKind::UnknownArg,
            format!("Can't find validation rules for argument '{key}'"),
        )
    }
}

/// Render names as `["a", "b"]`.
pub fn quoted_list<T: fmt::Display>(items: impl IntoIterator<Item = T>) -> String {
    let inner: Vec<String> = items.into_iter().map(|i| format!("\"{i}\"")).collect();
    format!("[{}]", inner.join(", "))
}

/// Render types as `[Integer, Float]`.
pub fn bare_list<T: fmt::Display>(items: impl IntoIterator<Item = T>) -> String {
    let inner: Vec<String> = items.into_iter().map(|i| i.to_string()).collect();
    format!("[{}]", inner.join(", "))
}

/// Errors decoding a tree from its JSON wire format.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    #[error("unknown node kind '{0}'")]
    UnknownKind(String),

    #[error("expected a node object at {path}")]
    NotANode { path: String },

    #[error("node at {path} has no 'kind'")]
    MissingKind { path: String },

    #[error("'args' of node at {path} must be an object")]
    BadArgs { path: String },

    #[error("'body' of node at {path} must be an array of nodes")]
    BadBody { path: String },
}

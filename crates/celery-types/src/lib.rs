//! Shared types for the CeleryScript checker.
//!
//! This crate defines the node kinds, leaf values, the arena-backed tree
//! with its JSON wire format, and the error types used by the checker.

mod error;
mod kind;
mod tree;
mod value;

pub use error::{bare_list, quoted_list, ErrorKind, TreeError, TypeCheckError};
pub use kind::Kind;
pub use tree::{
    ArgSpec, ArgValue, Leaf, LeafId, LeafRef, Node, NodeId, NodeRef, NodeSpec, Tree, ValueRef,
};
pub use value::{LeafType, Value};

/// Result type used throughout the checker.
pub type Result<T> = std::result::Result<T, TypeCheckError>;

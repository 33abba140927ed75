//! CeleryScript checker: schema-driven validation of sequence trees.
//!
//! ```text
//! Tree + Corpus + Device → Checker → Ok(tree) | TypeCheckError
//! ```
//!
//! A [`Corpus`] describes the grammar: which arguments each node kind takes,
//! which kinds its body may hold, and which node kinds and leaf types each
//! argument accepts. The [`Checker`] walks a [`Tree`](celery_types::Tree)
//! and reports the first place it breaks those rules.

pub mod checker;
pub mod corpus;
pub mod resolver;
pub mod walker;

pub use checker::{Checker, Verdict};
pub use corpus::{
    ArgDefinition, ArgSchema, ArgValidator, Corpus, CorpusSchema, NodeDefinition, NodeSchema,
    NodeValidator, SchemaError,
};
pub use resolver::{resolve, Binding, BindingKind, Unbound};

use celery_types::{Result, Tree};

/// Check `tree` against `corpus`, returning the tree or the first error.
pub fn check<'a, D>(tree: &'a Tree, corpus: &'a Corpus<D>, device: &'a D) -> Result<&'a Tree> {
    Checker::new(tree, corpus, device).check()
}

/// Whether `tree` passes every rule of `corpus`.
pub fn is_valid<D>(tree: &Tree, corpus: &Corpus<D>, device: &D) -> bool {
    Checker::new(tree, corpus, device).is_valid()
}

//! Variable resolution through nested scopes.

mod common;

use celery_checker::{resolve, BindingKind, Checker, Corpus};
use celery_types::{ErrorKind, Kind, NodeRef, Tree};
use common::*;
use serde_json::json;

/// The fixture corpus, with sequences allowed inside sequences so scopes
/// can nest.
fn nesting_corpus() -> Corpus<Device> {
    corpus().node(
        Kind::Sequence,
        ["locals", "version"],
        [Kind::MoveAbsolute, Kind::Wait, Kind::Execute, Kind::Sequence],
    )
}

fn identifiers(tree: &Tree) -> Vec<NodeRef<'_>> {
    tree.nodes().filter(|n| n.kind() == Kind::Identifier).collect()
}

fn tool(id: i64) -> serde_json::Value {
    json!({ "kind": "tool", "args": { "tool_id": id } })
}

fn bound_kind(reference: NodeRef<'_>) -> Option<Kind> {
    match resolve(reference).ok()?.kind() {
        BindingKind::Variable { data_value } => data_value,
        _ => None,
    }
}

#[test]
fn nearest_enclosing_scope_wins() {
    let tree = tree(sequence(
        json!([variable("x", origin())]),
        json!([
            sequence(json!([variable("x", tool(1))]), json!([move_to(identifier("x"))])),
            move_to(identifier("x"))
        ]),
    ));
    let refs = identifiers(&tree);
    assert_eq!(refs.len(), 2);

    // Allocation is pre-order, so the inner reference comes first.
    assert_eq!(bound_kind(refs[0]), Some(Kind::Tool));
    assert_eq!(bound_kind(refs[1]), Some(Kind::Coordinate));

    let corpus = nesting_corpus();
    let device = Device::default();
    assert!(Checker::new(&tree, &corpus, &device).is_valid());
}

#[test]
fn inner_declaration_is_the_resolution_target() {
    let tree = tree(sequence(
        json!([variable("x", origin())]),
        json!([sequence(
            json!([variable("x", tool(2))]),
            json!([move_to(identifier("x"))])
        )]),
    ));
    let reference = identifiers(&tree)[0];
    let binding = resolve(reference).unwrap();

    let inner_sequence = tree.root().body().next().unwrap();
    let inner_scope = inner_sequence.node_arg("locals").unwrap();
    assert_eq!(
        binding.declaration.id(),
        inner_scope.body().next().unwrap().id()
    );
}

#[test]
fn outer_scope_visible_through_inner_scope() {
    let tree = tree(sequence(
        json!([variable("home", origin())]),
        json!([sequence(
            json!([variable("other", tool(1))]),
            json!([move_to(identifier("home"))])
        )]),
    ));
    assert_eq!(bound_kind(identifiers(&tree)[0]), Some(Kind::Coordinate));
}

#[test]
fn sibling_scopes_are_not_searched() {
    let tree = tree(sequence(
        json!([]),
        json!([
            sequence(json!([variable("y", origin())]), json!([])),
            move_to(identifier("y"))
        ]),
    ));
    let corpus = nesting_corpus();
    let device = Device::default();
    let err = Checker::new(&tree, &corpus, &device).error().unwrap();
    assert_eq!(err.kind, ErrorKind::UnboundVariable);
    assert_eq!(err.message, "Unbound variable: y");
}

#[test]
fn declaration_may_reference_an_earlier_declaration() {
    assert_ok(sequence(
        json!([variable("a", origin()), variable("b", identifier("a"))]),
        json!([move_to(identifier("b"))]),
    ));
}

#[test]
fn declaration_referencing_unknown_label() {
    let err = assert_error(
        sequence(json!([variable("b", identifier("missing"))]), json!([])),
        ErrorKind::UnboundVariable,
    );
    assert_eq!(err.message, "Unbound variable: missing");
}

#[test]
fn parameter_application_resolves_against_sequence_parameters() {
    let json = sequence(
        json!([{
            "kind": "parameter_declaration",
            "args": { "label": "plant", "default_value": origin() }
        }]),
        json!([{
            "kind": "execute",
            "args": { "sequence_id": 10 },
            "body": [{
                "kind": "parameter_application",
                "args": { "label": "spot", "data_value": identifier("plant") }
            }]
        }]),
    );
    let tree = tree(json.clone());
    let binding = resolve(identifiers(&tree)[0]).unwrap();
    assert_eq!(binding.kind(), BindingKind::Parameter { data_type: None });
    assert_ok(json);
}

#[test]
fn first_matching_declaration_in_a_scope_wins() {
    let tree = tree(sequence(
        json!([variable("dup", origin()), variable("dup", tool(1))]),
        json!([move_to(identifier("dup"))]),
    ));
    assert_eq!(bound_kind(identifiers(&tree)[0]), Some(Kind::Coordinate));
}

//! Shared fixtures: a small farm-device corpus and a device to check against.

#![allow(dead_code)]

use celery_checker::{Checker, Corpus};
use celery_types::{ErrorKind, Kind, Tree, TypeCheckError, ValueRef};

use celery_types::LeafType::{Float, Integer, String as Text};

/// The device a sequence is checked for. Validators use it for ownership.
#[derive(Debug, Clone)]
pub struct Device {
    pub tools: Vec<i64>,
    pub sequences: Vec<i64>,
}

impl Default for Device {
    fn default() -> Self {
        Self {
            tools: vec![1, 2],
            sequences: vec![10, 11],
        }
    }
}

const MESSAGE_TYPES: &[&str] = &["info", "success", "warn", "error", "fun"];

fn owned_id(value: ValueRef<'_>) -> Option<i64> {
    match value.as_leaf()?.value() {
        celery_types::Value::Integer(id) => Some(*id),
        _ => None,
    }
}

pub fn corpus() -> Corpus<Device> {
    Corpus::new()
        // ── Arguments ──
        .arg("locals", [Kind::ScopeDeclaration], [])
        .arg("version", [], [Integer])
        .arg("label", [], [Text])
        .arg(
            "data_value",
            [Kind::Coordinate, Kind::Point, Kind::Tool, Kind::Identifier],
            [],
        )
        .arg("default_value", [Kind::Coordinate, Kind::Point, Kind::Tool], [])
        .arg(
            "location",
            [Kind::Coordinate, Kind::Point, Kind::Tool, Kind::Identifier],
            [],
        )
        .arg("offset", [Kind::Coordinate, Kind::Identifier], [])
        .arg("speed", [], [Integer])
        .arg("x", [], [Integer, Float])
        .arg("y", [], [Integer, Float])
        .arg("z", [], [Integer, Float])
        .arg("tool_id", [], [Integer])
        .arg("pointer_type", [], [Text])
        .arg("pointer_id", [], [Integer])
        .arg("milliseconds", [], [Integer])
        .arg("message", [], [Text])
        .arg("message_type", [], [Text])
        .arg("channel_name", [], [Text])
        .arg("sequence_id", [], [Integer])
        .arg("lhs", [], [Text])
        .arg("op", [], [Text])
        .arg("rhs", [], [Integer])
        .arg("_then", [Kind::Execute, Kind::Nothing], [])
        .arg("_else", [Kind::Execute, Kind::Nothing], [])
        .arg("pin_number", [], [Integer])
        .arg("pin_value", [], [Integer])
        .arg("pin_mode", [], [Integer])
        // ── Nodes ──
        .node(
            Kind::Sequence,
            ["locals", "version"],
            [
                Kind::MoveAbsolute,
                Kind::Wait,
                Kind::SendMessage,
                Kind::If,
                Kind::Execute,
                Kind::TakePhoto,
                Kind::WritePin,
            ],
        )
        .node(
            Kind::ScopeDeclaration,
            [],
            [Kind::VariableDeclaration, Kind::ParameterDeclaration],
        )
        .node(Kind::VariableDeclaration, ["label", "data_value"], [])
        .node(Kind::ParameterDeclaration, ["label", "default_value"], [])
        .node(Kind::ParameterApplication, ["label", "data_value"], [])
        .node(Kind::Identifier, ["label"], [])
        .node(Kind::Coordinate, ["x", "y", "z"], [])
        .node(Kind::Tool, ["tool_id"], [])
        .node(Kind::Point, ["pointer_type", "pointer_id"], [])
        .node(Kind::Nothing, [], [])
        .node(Kind::MoveAbsolute, ["location", "offset", "speed"], [])
        .node(Kind::Wait, ["milliseconds"], [])
        .node(Kind::SendMessage, ["message", "message_type"], [Kind::Channel])
        .node(Kind::Channel, ["channel_name"], [])
        .node(Kind::If, ["lhs", "op", "rhs", "_then", "_else"], [])
        .node(Kind::Execute, ["sequence_id"], [Kind::ParameterApplication])
        .node(Kind::TakePhoto, [], [])
        .node(Kind::WritePin, ["pin_number", "pin_value", "pin_mode"], [])
        // ── Validators ──
        .with_arg_validator("tool_id", |value, device: &Device| match owned_id(value) {
            Some(id) if !device.tools.contains(&id) => Err(TypeCheckError::custom(format!(
                "Tool #{id} does not belong to this device"
            ))),
            _ => Ok(()),
        })
        .with_arg_validator("sequence_id", |value, device: &Device| match owned_id(value) {
            Some(id) if !device.sequences.contains(&id) => Err(TypeCheckError::custom(format!(
                "Sequence #{id} does not belong to this device"
            ))),
            _ => Ok(()),
        })
        .with_node_validator(Kind::SendMessage, |node, _device: &Device| {
            let message_type = node
                .leaf_value("message_type")
                .and_then(|v| v.as_str())
                .unwrap_or_default();
            if MESSAGE_TYPES.contains(&message_type) {
                Ok(())
            } else {
                Err(TypeCheckError::custom(format!(
                    "'{message_type}' is not a valid message_type"
                )))
            }
        })
}

// ══════════════════════════════════════════════════════════════════════════════
// Helpers
// ══════════════════════════════════════════════════════════════════════════════

pub fn tree(json: serde_json::Value) -> Tree {
    Tree::from_value(&json).unwrap_or_else(|e| panic!("fixture does not decode: {e}"))
}

pub fn check_tree(tree: &Tree) -> Result<(), TypeCheckError> {
    let corpus = corpus();
    let device = Device::default();
    Checker::new(tree, &corpus, &device).check().map(|_| ())
}

pub fn assert_ok(json: serde_json::Value) {
    let tree = tree(json);
    if let Err(err) = check_tree(&tree) {
        panic!("expected no error, got [{}] {}", err.kind, err.message);
    }
}

pub fn assert_error(json: serde_json::Value, expected: ErrorKind) -> TypeCheckError {
    let tree = tree(json);
    match check_tree(&tree) {
        Ok(()) => panic!("expected {expected:?}, but the tree passed"),
        Err(err) => {
            assert_eq!(
                err.kind, expected,
                "expected {expected:?}, got [{}] {}",
                err.kind, err.message
            );
            err
        }
    }
}

pub fn origin() -> serde_json::Value {
    serde_json::json!({ "kind": "coordinate", "args": { "x": 0, "y": 0, "z": 0 } })
}

/// A sequence with the given local declarations and body.
pub fn sequence(locals: serde_json::Value, body: serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "kind": "sequence",
        "args": {
            "locals": { "kind": "scope_declaration", "args": {}, "body": locals },
            "version": 20
        },
        "body": body
    })
}

pub fn identifier(label: &str) -> serde_json::Value {
    serde_json::json!({ "kind": "identifier", "args": { "label": label } })
}

pub fn move_to(location: serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "kind": "move_absolute",
        "args": { "location": location, "offset": origin(), "speed": 100 }
    })
}

pub fn variable(label: &str, value: serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "kind": "variable_declaration",
        "args": { "label": label, "data_value": value }
    })
}

pub fn wait(ms: i64) -> serde_json::Value {
    serde_json::json!({ "kind": "wait", "args": { "milliseconds": ms } })
}

//! Decoding of the state wire format.
//!
//! Accepts what the tracing server accepts: IDs as JSON integers or integer
//! strings, a `null` (or `0`) parent ID meaning "no parent", and
//! `{"nocheck": true}` as the validation opt-out.

use arbor_core::{ConnectorId, ConnectorRef, EditionTime, NodeId, NodeRef, RelationId};
use serde_json::{Map, Value};

use crate::error::StateError;
use crate::state::{NewNodeState, NodeState, State};

pub(crate) fn parse_state(value: &Value) -> Result<State, StateError> {
    if !is_truthy(value) {
        return Err(StateError::Empty);
    }
    let Value::Object(obj) = value else {
        return Err(StateError::NotAnObject);
    };

    if obj.get("nocheck") == Some(&Value::Bool(true)) {
        return Ok(State::NoCheck);
    }

    let parent = parse_parent(obj.get("parent"))?;

    match obj.get("edition_time") {
        Some(raw) => {
            if !is_truthy(raw) {
                return Err(StateError::MissingEditionTime);
            }
            let edition_time = parse_time(raw)?;
            let children = parse_children(obj)?;
            let links = parse_links(obj)?;
            Ok(State::Node(NodeState::new(
                edition_time,
                parent,
                children,
                links,
            )))
        }
        None if obj.contains_key("children") || obj.contains_key("links") => {
            Err(StateError::MissingEditionTime)
        }
        None if obj.contains_key("parent") => Ok(State::NewNode(NewNodeState::new(parent))),
        None => Err(StateError::Empty),
    }
}

fn parse_parent(raw: Option<&Value>) -> Result<Option<NodeRef>, StateError> {
    let Some(raw) = raw.filter(|v| is_truthy(v)) else {
        return Ok(None);
    };
    let pair = two_elements(raw).ok_or_else(|| {
        StateError::InvalidParent("parent is no list of two elements".into())
    })?;
    if !is_truthy(&pair[0]) {
        return Ok(None);
    }
    let id = NodeId::new(parse_id(&pair[0])?);
    if !is_truthy(&pair[1]) {
        return Err(StateError::InvalidParent(format!(
            "parent {id} has no edition time"
        )));
    }
    Ok(Some(NodeRef::new(id, parse_time(&pair[1])?)))
}

fn parse_children(obj: &Map<String, Value>) -> Result<Vec<NodeRef>, StateError> {
    let Some(raw) = obj.get("children") else {
        return Ok(Vec::new());
    };
    let Value::Array(items) = raw else {
        return Err(StateError::InvalidChildren("'children' is not a list".into()));
    };
    items
        .iter()
        .map(|item| {
            let pair = two_elements(item)
                .filter(|p| p.iter().all(is_truthy))
                .ok_or_else(|| StateError::InvalidChildren(item.to_string()))?;
            Ok(NodeRef::new(
                NodeId::new(parse_id(&pair[0])?),
                parse_time(&pair[1])?,
            ))
        })
        .collect()
}

fn parse_links(obj: &Map<String, Value>) -> Result<Vec<ConnectorRef>, StateError> {
    let Some(raw) = obj.get("links") else {
        return Ok(Vec::new());
    };
    let Value::Array(items) = raw else {
        return Err(StateError::InvalidLinks("'links' is not a list".into()));
    };
    items
        .iter()
        .map(|item| match item {
            Value::Array(triple) if triple.len() == 3 && triple.iter().all(is_truthy) => {
                Ok(ConnectorRef::new(
                    ConnectorId::new(parse_id(&triple[0])?),
                    parse_time(&triple[1])?,
                    RelationId::new(parse_id(&triple[2])?),
                ))
            }
            other => Err(StateError::InvalidLinks(other.to_string())),
        })
        .collect()
}

fn two_elements(value: &Value) -> Option<&[Value]> {
    match value {
        Value::Array(items) if items.len() == 2 => Some(items.as_slice()),
        _ => None,
    }
}

fn parse_id(value: &Value) -> Result<i64, StateError> {
    let parsed = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| {
        StateError::Value(arbor_core::CoreError::InvalidId {
            kind: "state",
            input: value.to_string(),
        })
    })
}

fn parse_time(value: &Value) -> Result<EditionTime, StateError> {
    match value {
        Value::String(s) => Ok(EditionTime::parse(s)?),
        other => Err(StateError::Value(arbor_core::CoreError::InvalidEditionTime {
            input: other.to_string(),
            reason: "expected an RFC 3339 string".into(),
        })),
    }
}

/// Python-style truthiness, which is what the server applies to state
/// fields.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

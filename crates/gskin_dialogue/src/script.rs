//! Dialogue scripts
//!
//! A script is a JSON object mapping node names to lists of beats. Each
//! beat is an object with exactly one action key and an optional `if`:
//!
//! ```json
//! {
//!   "intro": [
//!     {"update_context": {"met": "true"}},
//!     {"Guard": "Halt!"},
//!     {"pause": 0.5},
//!     {"stage_direction": {"guard": "draws sword"}},
//!     {"Guard": "Again you?", "if": "met"},
//!     {"options": [
//!       {"text": "Let me pass", "value": "pass"},
//!       {"text": "Bribe", "value": "bribe", "if": "gold > 10 and _seen == 0"}
//!     ]}
//!   ],
//!   "pass": [{"next_node": "end"}]
//! }
//! ```
//!
//! Any key other than the reserved action keys is an actor name whose
//! value is the spoken line. `end` is a target that finishes the dialogue.

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::error::{DialogueError, Result};
use crate::expr::Expression;

/// Target name that finishes the dialogue
pub const END: &str = "end";

const CONDITION_KEY: &str = "if";

/// What a beat does
#[derive(Clone, Debug, PartialEq)]
pub enum Action {
    /// `{"<actor>": "<line>"}`
    Speak { actor: String, line: String },
    /// `{"next_node": "<node>"}`
    NextNode(String),
    /// `{"update_context": {"<name>": "<expression>"}}`; non-string values
    /// are stored as they are
    UpdateContext(Vec<(String, Expression)>),
    /// `{"pause": <seconds>}`
    Pause(f64),
    /// `{"options": [{"text": .., "value": .., "if": ..}]}`
    Options(Vec<Choice>),
    /// `{"stage_direction": {..}}`
    StageDirection(Map<String, Value>),
}

/// One option of a prompt
#[derive(Clone, Debug, PartialEq)]
pub struct Choice {
    pub text: String,
    /// Node to jump to when chosen
    pub target: String,
    /// Shown only while this holds; `_seen` is the number of times the
    /// option has been shown before
    pub condition: Option<Expression>,
    /// Any other keys of the option object
    pub extra: Map<String, Value>,
}

/// A single step of a node
#[derive(Clone, Debug, PartialEq)]
pub struct Beat {
    /// Consecutive conditional beats form an if/elif chain
    pub condition: Option<Expression>,
    pub action: Action,
}

/// A parsed dialogue script, nodes in file order
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Script {
    nodes: IndexMap<String, Vec<Beat>>,
}

impl Script {
    /// Parse a script from JSON text
    pub fn from_json(text: &str) -> Result<Self> {
        Self::from_value(serde_json::from_str(text)?)
    }

    /// Parse a script from an already-decoded JSON value
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(raw) = value else {
            return Err(DialogueError::NotAnObject);
        };

        let mut nodes = IndexMap::with_capacity(raw.len());
        for (name, beats) in raw {
            if name == END {
                return Err(DialogueError::ReservedNodeName);
            }
            let Value::Array(beats) = beats else {
                return Err(DialogueError::NodeNotAList(name));
            };
            let beats = beats
                .into_iter()
                .enumerate()
                .map(|(index, beat)| parse_beat(&name, index, beat))
                .collect::<Result<Vec<_>>>()?;
            nodes.insert(name, beats);
        }

        tracing::debug!(nodes = nodes.len(), "loaded dialogue script");
        Ok(Self { nodes })
    }

    /// The beats of `node`
    pub fn node(&self, node: &str) -> Option<&[Beat]> {
        self.nodes.get(node).map(Vec::as_slice)
    }

    /// The node a dialogue starts at
    pub fn first_node(&self) -> Option<&str> {
        self.nodes.keys().next().map(String::as_str)
    }

    pub fn node_names(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    /// Every node `node` can jump to, in beat order, `end` included
    pub fn targets<'a>(&'a self, node: &str) -> impl Iterator<Item = &'a str> + 'a {
        self.nodes
            .get(node)
            .into_iter()
            .flatten()
            .flat_map(|beat| -> Box<dyn Iterator<Item = &'a str> + 'a> {
                match &beat.action {
                    Action::NextNode(target) => Box::new(std::iter::once(target.as_str())),
                    Action::Options(choices) => {
                        Box::new(choices.iter().map(|choice| choice.target.as_str()))
                    }
                    _ => Box::new(std::iter::empty()),
                }
            })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

fn parse_beat(node: &str, index: usize, beat: Value) -> Result<Beat> {
    let invalid = |reason: String| DialogueError::InvalidBeat {
        node: node.to_string(),
        index,
        reason,
    };

    let Value::Object(mut fields) = beat else {
        return Err(invalid("a beat must be an object".to_string()));
    };

    let condition = fields
        .remove(CONDITION_KEY)
        .map(|condition| parse_condition(condition).map_err(&invalid))
        .transpose()?;

    if fields.len() != 1 {
        return Err(invalid(format!(
            "expected exactly one action, found {}",
            fields.len()
        )));
    }
    let Some((key, value)) = fields.into_iter().next() else {
        return Err(invalid("missing action".to_string()));
    };

    let action = match (key.as_str(), value) {
        ("next_node", Value::String(target)) => Action::NextNode(target),
        ("pause", Value::Number(seconds)) => {
            let seconds = seconds
                .as_f64()
                .filter(|s| *s >= 0.0)
                .ok_or_else(|| invalid("pause must be a non-negative number".to_string()))?;
            Action::Pause(seconds)
        }
        ("update_context", Value::Object(assignments)) => Action::UpdateContext(
            assignments
                .into_iter()
                .map(|(name, value)| {
                    let expr = match value {
                        Value::String(source) => Expression::parse(&source)?,
                        other => Expression::literal(other),
                    };
                    Ok((name, expr))
                })
                .collect::<Result<Vec<_>>>()?,
        ),
        ("stage_direction", Value::Object(direction)) => Action::StageDirection(direction),
        ("options", Value::Array(options)) => Action::Options(
            options
                .into_iter()
                .map(|option| parse_choice(option).map_err(&invalid))
                .collect::<Result<Vec<_>>>()?,
        ),
        ("next_node" | "pause" | "update_context" | "stage_direction" | "options", other) => {
            return Err(invalid(format!("`{key}` cannot take {other}")));
        }
        (_, Value::String(line)) => Action::Speak {
            actor: key.clone(),
            line,
        },
        (_, other) => return Err(invalid(format!("line of `{key}` must be a string, found {other}"))),
    };

    Ok(Beat { condition, action })
}

fn parse_condition(condition: Value) -> std::result::Result<Expression, String> {
    match condition {
        Value::String(source) => Expression::parse(&source).map_err(|err| err.to_string()),
        Value::Bool(_) => Ok(Expression::literal(condition)),
        other => Err(format!("condition must be a string, found {other}")),
    }
}

fn parse_choice(option: Value) -> std::result::Result<Choice, String> {
    let Value::Object(mut fields) = option else {
        return Err("an option must be an object".to_string());
    };

    let text = match fields.remove("text") {
        Some(Value::String(text)) => text,
        _ => return Err("an option needs a string `text`".to_string()),
    };
    let target = match fields.remove("value") {
        Some(Value::String(target)) => target,
        _ => return Err(format!("option `{text}` needs a string `value`")),
    };
    let condition = fields.remove(CONDITION_KEY).map(parse_condition).transpose()?;

    Ok(Choice {
        text,
        target,
        condition,
        extra: fields,
    })
}

//! Error types for gskin_dialogue

use gskin_core::{ConfigurationError, ExecutionError};
use thiserror::Error;

/// Errors raised while loading or running a dialogue
#[derive(Error, Debug)]
pub enum DialogueError {
    /// The script is not valid JSON
    #[error("dialogue script is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The top level of the script is not an object of nodes
    #[error("dialogue script must be an object mapping node names to beats")]
    NotAnObject,

    /// A node's value is not a list
    #[error("node `{0}` must be a list of beats")]
    NodeNotAList(String),

    /// `end` is reserved for finishing the dialogue
    #[error("`end` cannot be used as a node name")]
    ReservedNodeName,

    /// A beat could not be understood
    #[error("beat {index} of node `{node}` is invalid: {reason}")]
    InvalidBeat {
        node: String,
        index: usize,
        reason: String,
    },

    /// An expression could not be parsed
    #[error("cannot parse expression `{expr}`: {reason}")]
    Parse { expr: String, reason: String },

    /// An expression failed to evaluate
    #[error("cannot evaluate expression `{expr}`: {reason}")]
    Eval { expr: String, reason: String },

    /// `choose` was called while no prompt was shown
    #[error("no prompt is waiting for a choice")]
    NoPrompt,

    /// The chosen index is not one of the shown options
    #[error("choice {index} is out of range, {shown} option(s) shown")]
    ChoiceOutOfRange { index: usize, shown: usize },

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),
}

impl From<gskin_core::Error> for DialogueError {
    fn from(err: gskin_core::Error) -> Self {
        match err {
            gskin_core::Error::Configuration(err) => DialogueError::Configuration(err),
            gskin_core::Error::Execution(err) => DialogueError::Execution(err),
        }
    }
}

/// Result type for dialogue operations
pub type Result<T> = std::result::Result<T, DialogueError>;

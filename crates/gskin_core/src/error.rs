//! Error types shared by the gskin crates
//!
//! Failures fall into two groups: declarations that can never work
//! ([`ConfigurationError`], raised at registration or setup), and user code
//! that failed while the engine was driving it ([`ExecutionError`], raised
//! from a tick or a transition). Neither is ever swallowed by the engine.

use std::fmt;

use thiserror::Error;

/// A malformed system, component or transition declaration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// A system was registered without any required component
    #[error("system `{system}` declares no required components")]
    EmptyRequirements { system: String },

    /// A component name is empty
    #[error("system `{system}` declares an empty component name")]
    EmptyComponentName { system: String },

    /// A component name collides with a name the engine reserves
    #[error("system `{system}` uses reserved component name `{component}`")]
    ReservedComponentName { system: String, component: String },

    /// The same component is requested twice by one system
    #[error("system `{system}` requires component `{component}` more than once")]
    DuplicateComponent { system: String, component: String },

    /// The declared component names do not line up with the update function
    #[error(
        "system `{system}` declares {declared} component(s) but its update function takes {expected}"
    )]
    ArityMismatch {
        system: String,
        declared: usize,
        expected: usize,
    },

    /// Two systems disagree on the value type stored under one component name
    #[error(
        "system `{system}` reads component `{component}` as `{found}`, but it is already registered as `{registered}`"
    )]
    ConflictingComponentType {
        system: String,
        component: String,
        registered: &'static str,
        found: &'static str,
    },

    /// A system name is used twice in one schedule
    #[error("a system named `{0}` is already registered")]
    DuplicateSystem(String),

    /// No system with this name exists
    #[error("no system named `{0}` is registered")]
    UnknownSystem(String),

    /// A state machine was built without any state
    #[error("state machine declares no states")]
    NoStates,

    /// The same state was declared twice
    #[error("state {0} is declared more than once")]
    DuplicateState(String),

    /// A state is referenced but was never declared
    #[error("state {0} is not declared")]
    UndeclaredState(String),

    /// A transition points at a state that was never declared
    #[error("transition from state {from} targets unknown state {to}")]
    UnknownState { from: String, to: String },

    /// A named machine is missing from configuration
    #[error("no state machine named `{0}` is configured")]
    UnknownMachine(String),
}

/// Which lifecycle hook failed
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HookKind {
    Enter,
    Exit,
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookKind::Enter => f.write_str("enter"),
            HookKind::Exit => f.write_str("exit"),
        }
    }
}

/// User code failed while the engine was running it
#[derive(Error, Debug)]
pub enum ExecutionError {
    /// A system's update function failed on one entity
    #[error("system `{system}` failed on entity {entity}")]
    System {
        system: String,
        entity: String,
        #[source]
        source: anyhow::Error,
    },

    /// A stored component value does not have the type the system declared
    #[error(
        "system `{system}` expected component `{component}` on entity {entity} to be `{expected}`, found `{found}`"
    )]
    ComponentType {
        system: String,
        entity: String,
        component: String,
        expected: &'static str,
        found: &'static str,
    },

    /// A transition guard or router failed
    #[error("transition guard in state {state} failed on input {input}")]
    Guard {
        state: String,
        input: String,
        #[source]
        source: anyhow::Error,
    },

    /// A state's own input handler failed
    #[error("state {state} failed to handle input")]
    Handler {
        state: String,
        #[source]
        source: anyhow::Error,
    },

    /// An enter or exit hook failed
    #[error("{hook} hook of state {state} failed")]
    Hook {
        state: String,
        hook: HookKind,
        #[source]
        source: anyhow::Error,
    },

    /// The machine has not been started, or has exited
    #[error("state machine is not running")]
    NotRunning,

    /// A runtime handle does not refer to a live machine
    #[error("no state machine is registered under this handle")]
    UnknownMachine,
}

/// Either kind of gskin failure
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),
}

/// Result type for gskin operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_execution_error_keeps_source() {
        let err = ExecutionError::System {
            system: "movement".into(),
            entity: "player".into(),
            source: anyhow::anyhow!("out of bounds"),
        };

        assert_eq!(err.to_string(), "system `movement` failed on entity player");
        assert_eq!(
            err.source().map(|source| source.to_string()),
            Some("out of bounds".to_string())
        );
    }

    #[test]
    fn test_error_is_transparent() {
        let err: Error = ConfigurationError::UnknownState {
            from: "\"a\"".into(),
            to: "\"z\"".into(),
        }
        .into();

        assert_eq!(
            err.to_string(),
            "transition from state \"a\" targets unknown state \"z\""
        );
        assert!(matches!(err, Error::Configuration(_)));
    }
}

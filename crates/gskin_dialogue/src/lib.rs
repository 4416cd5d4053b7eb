//! gskin dialogue
//!
//! Branching conversations written as data. A [`Script`] is a JSON object
//! of nodes, each a list of beats (lines, pauses, stage directions, context
//! updates, jumps and prompts). A [`Dialogue`] plays a script one
//! presentable event at a time and tracks which node it is in with a
//! [`gskin_core::StateMachine`].
//!
//! # Example
//!
//! ```rust
//! use gskin_dialogue::{Dialogue, DialogueEvent};
//!
//! let mut dialogue = Dialogue::from_json(r#"{
//!     "start": [
//!         {"Ann": "Tea?"},
//!         {"options": [
//!             {"text": "Yes please", "value": "tea"},
//!             {"text": "No thanks", "value": "end"}
//!         ]}
//!     ],
//!     "tea": [
//!         {"update_context": {"served": true}},
//!         {"Ann": "Here you go."}
//!     ]
//! }"#).unwrap();
//!
//! assert!(matches!(dialogue.advance().unwrap(), Some(DialogueEvent::Speak { .. })));
//! assert!(matches!(dialogue.advance().unwrap(), Some(DialogueEvent::Prompt(choices)) if choices.len() == 2));
//!
//! dialogue.choose(0).unwrap();
//! assert!(matches!(dialogue.advance().unwrap(), Some(DialogueEvent::Speak { line, .. }) if line == "Here you go."));
//! assert_eq!(dialogue.advance().unwrap(), None);
//! assert!(dialogue.is_finished());
//! assert_eq!(dialogue.context().get("served"), Some(&serde_json::Value::Bool(true)));
//! ```
//!
//! Unknown names in expressions read as `null`; seed the context with
//! [`Dialogue::with_context`] when a script does arithmetic on counters.

pub mod error;
pub mod expr;
pub mod runner;
pub mod script;

pub use error::{DialogueError, Result};
pub use expr::{truthy, Expression};
pub use runner::{Dialogue, DialogueEvent};
pub use script::{Action, Beat, Choice, Script, END};

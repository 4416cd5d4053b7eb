//! Everything a typical game needs in one import
//!
//! ```rust
//! use gskin::prelude::*;
//! ```

pub use crate::config::GameConfig;

pub use gskin_core::{
    from_fn, screen_fn, Channel, ConfigurationError, Delivery, ExecutionError, FsmId,
    FsmRuntime, Next, Screen, ScreenManager, State, StateMachine, Step, StepMachine, Target,
};
pub use gskin_dialogue::{Choice, Dialogue, DialogueError, DialogueEvent, Script};
pub use gskin_ecs::{
    Entity, EntityCollection, EntityId, Repeat, Schedule, System, SystemResult, Tick, Timer,
    World,
};

//! gskin Core
//!
//! The pieces every other gskin crate builds on:
//!
//! - **Errors**: [`ConfigurationError`] for declarations that cannot work,
//!   [`ExecutionError`] for user code that failed while being driven
//! - **Channels**: ordered, synchronous observer lists
//! - **State Machines**: table-driven and state-driven machines sharing one
//!   exit-then-enter lifecycle, plus a runtime owning many of them
//! - **Screens**: one-screen-at-a-time management for game flow
//!
//! # Example
//!
//! ```rust
//! use gskin_core::fsm::{FsmRuntime, StateMachine};
//!
//! const IDLE: u32 = 0;
//! const ACTIVE: u32 = 1;
//! const CLICK: u32 = 1;
//!
//! let mut runtime = FsmRuntime::new();
//! let button = runtime
//!     .create(
//!         StateMachine::builder()
//!             .states([IDLE, ACTIVE])
//!             .on(IDLE, CLICK, ACTIVE)
//!             .on(ACTIVE, CLICK, IDLE)
//!             .build()
//!             .unwrap(),
//!         IDLE,
//!     )
//!     .unwrap();
//!
//! runtime.send(button, &CLICK).unwrap();
//! assert_eq!(runtime.current_state(button), Some(&ACTIVE));
//! ```

pub mod channel;
pub mod error;
pub mod fsm;
pub mod screen;

pub use channel::{Channel, Delivery, SubscriptionId};
pub use error::{ConfigurationError, Error, ExecutionError, HookKind, Result};
pub use fsm::{
    from_fn, FsmId, FsmRuntime, Next, State, StateMachine, Step, StepMachine, Target,
};
pub use screen::{screen_fn, Screen, ScreenManager};

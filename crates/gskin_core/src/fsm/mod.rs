//! State machines
//!
//! Two ways of describing a machine share one lifecycle:
//!
//! - [`StateMachine`]: a declarative transition table built once, with
//!   guards and routers deciding where an input leads.
//! - [`StepMachine`]: every state is an object whose
//!   [`State::on_input`] returns what happens next.
//!
//! Whichever style is used, a transition from `A` to `B` runs `A`'s exit
//! hooks, then `B`'s enter hooks, then makes `B` current. Returning to the
//! same state goes through exit and enter as well; only "no transition"
//! ([`Step::Ignored`]) skips the hooks.
//!
//! # Example
//!
//! ```rust
//! use gskin_core::fsm::{Step, StateMachine};
//!
//! let mut machine = StateMachine::builder()
//!     .states(["a", "b"])
//!     .on("a", "go", "b")
//!     .on("b", "back", "a")
//!     .build()
//!     .unwrap();
//!
//! machine.start("a").unwrap();
//! assert!(matches!(machine.send(&"go").unwrap(), Step::Transition { .. }));
//! assert_eq!(machine.send(&"stay").unwrap(), Step::Ignored);
//! assert_eq!(machine.state(), Some(&"b"));
//! ```

mod runtime;
mod step;
mod table;

pub use runtime::{FsmId, FsmRuntime};
pub use step::{from_fn, FnState, State, StepMachine, StepMachineBuilder};
pub use table::{StateMachine, StateMachineBuilder};

use std::fmt::Debug;

use crate::channel::Channel;
use crate::error::{ExecutionError, HookKind};

/// Where a transition leads
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Target<S> {
    /// Make this state current
    State(S),
    /// Leave the current state and stop the machine
    Exit,
}

/// What a state decided after seeing an input
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Next<K> {
    /// No transition; no hooks run
    Stay,
    /// Transition to `K`, even when `K` is the current state
    Goto(K),
    /// Leave the current state and stop the machine
    Exit,
}

/// The observable outcome of feeding a machine one input
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Step<S> {
    /// The input did not cause a transition
    Ignored,
    /// The machine was idle and has entered `S`
    Entered(S),
    /// The machine moved from one state to another (possibly the same one)
    Transition { from: S, to: S },
    /// The machine left `from` and stopped
    Exited { from: S },
}

impl<S> Step<S> {
    /// Whether the current state changed hands
    pub fn is_transition(&self) -> bool {
        !matches!(self, Step::Ignored)
    }
}

/// Current state plus the enter/exit observers of one machine
pub(crate) struct Lifecycle<S> {
    current: Option<S>,
    entered: Channel<S>,
    exited: Channel<S>,
}

impl<S> Default for Lifecycle<S> {
    fn default() -> Self {
        Self {
            current: None,
            entered: Channel::new(),
            exited: Channel::new(),
        }
    }
}

impl<S: Clone + Debug> Lifecycle<S> {
    pub(crate) fn current(&self) -> Option<&S> {
        self.current.as_ref()
    }

    pub(crate) fn entered(&mut self) -> &mut Channel<S> {
        &mut self.entered
    }

    pub(crate) fn exited(&mut self) -> &mut Channel<S> {
        &mut self.exited
    }

    /// Move to `target`, running `hooks` as exit-then-enter.
    ///
    /// Observers hear about a switch only once it is committed: `exited`
    /// then `entered`. If the exit hook fails nothing changes. If the enter
    /// hook fails the previous state is entered again and stays current, so
    /// exit and enter hooks always come in pairs; should that re-entry fail
    /// too, the machine stops and `exited` is published for it.
    pub(crate) fn switch<F>(
        &mut self,
        target: Target<S>,
        mut hooks: F,
    ) -> Result<Step<S>, ExecutionError>
    where
        F: FnMut(HookKind, &S) -> anyhow::Result<()>,
    {
        let from = self.current.clone();

        if let Some(from) = &from {
            hooks(HookKind::Exit, from).map_err(|source| hook_error(from, HookKind::Exit, source))?;
        }

        let to = match target {
            Target::State(to) => to,
            Target::Exit => {
                self.current = None;
                return Ok(match from {
                    Some(from) => {
                        self.exited.publish(&from);
                        tracing::trace!(?from, "state machine exited");
                        Step::Exited { from }
                    }
                    None => Step::Ignored,
                });
            }
        };

        if let Err(source) = hooks(HookKind::Enter, &to) {
            let err = hook_error(&to, HookKind::Enter, source);
            if let Some(from) = &from {
                if let Err(restore) = hooks(HookKind::Enter, from) {
                    tracing::warn!(?from, error = %restore, "could not re-enter state, stopping");
                    self.current = None;
                    self.exited.publish(from);
                }
            }
            return Err(err);
        }

        self.current = Some(to.clone());
        if let Some(from) = &from {
            self.exited.publish(from);
        }
        self.entered.publish(&to);

        Ok(match from {
            Some(from) => {
                tracing::trace!(?from, ?to, "state transition");
                Step::Transition { from, to }
            }
            None => {
                tracing::trace!(?to, "state machine entered");
                Step::Entered(to)
            }
        })
    }
}

fn hook_error<S: Debug>(state: &S, hook: HookKind, source: anyhow::Error) -> ExecutionError {
    ExecutionError::Hook {
        state: format!("{state:?}"),
        hook,
        source,
    }
}

//! Machines whose states decide their own transitions

use std::fmt::Debug;
use std::hash::Hash;
use std::marker::PhantomData;

use indexmap::IndexMap;

use super::{Lifecycle, Next, Step, Target};
use crate::channel::Channel;
use crate::error::{ConfigurationError, ExecutionError, HookKind, Result};

/// A state that reacts to inputs itself
///
/// The state keeps whatever it needs between inputs in its own fields.
pub trait State<K, I>: Send {
    /// Handle one input and say what happens next
    fn on_input(&mut self, input: &I) -> anyhow::Result<Next<K>>;

    /// Called when this state becomes current
    fn on_enter(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called when this state stops being current
    fn on_exit(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// A [`State`] backed by a closure, see [`from_fn`]
pub struct FnState<K, I, F> {
    func: F,
    _marker: PhantomData<fn(&I) -> K>,
}

/// Turn a closure into a [`State`] without enter/exit hooks
pub fn from_fn<K, I, F>(func: F) -> FnState<K, I, F>
where
    F: FnMut(&I) -> anyhow::Result<Next<K>> + Send,
{
    FnState {
        func,
        _marker: PhantomData,
    }
}

impl<K, I, F> State<K, I> for FnState<K, I, F>
where
    F: FnMut(&I) -> anyhow::Result<Next<K>> + Send,
{
    fn on_input(&mut self, input: &I) -> anyhow::Result<Next<K>> {
        (self.func)(input)
    }
}

/// Builder for [`StepMachine`]
pub struct StepMachineBuilder<K, I> {
    states: Vec<(K, Box<dyn State<K, I>>)>,
}

impl<K, I> StepMachineBuilder<K, I>
where
    K: Clone + Eq + Hash + Debug,
{
    /// Add a state under `key`. The first state added is the reset target.
    pub fn state(mut self, key: K, state: impl State<K, I> + 'static) -> Self {
        self.states.push((key, Box::new(state)));
        self
    }

    /// Build the machine, rejecting empty machines and duplicate keys
    pub fn build(self) -> std::result::Result<StepMachine<K, I>, ConfigurationError> {
        if self.states.is_empty() {
            return Err(ConfigurationError::NoStates);
        }

        let mut states = IndexMap::with_capacity(self.states.len());
        for (key, state) in self.states {
            if states.contains_key(&key) {
                return Err(ConfigurationError::DuplicateState(format!("{key:?}")));
            }
            states.insert(key, state);
        }

        Ok(StepMachine {
            states,
            lifecycle: Lifecycle::default(),
        })
    }
}

/// A machine where each state object returns [`Next`] for every input
///
/// # Example
///
/// ```rust
/// use gskin_core::fsm::{from_fn, Next, StepMachine};
///
/// let mut machine = StepMachine::builder()
///     .state("title", from_fn(|key: &char| {
///         Ok(if *key == ' ' { Next::Goto("play") } else { Next::Stay })
///     }))
///     .state("play", from_fn(|_: &char| Ok(Next::Stay)))
///     .build()
///     .unwrap();
///
/// machine.start("title").unwrap();
/// machine.send(&' ').unwrap();
/// assert_eq!(machine.state(), Some(&"play"));
/// ```
pub struct StepMachine<K, I> {
    states: IndexMap<K, Box<dyn State<K, I>>>,
    lifecycle: Lifecycle<K>,
}

impl<K, I> StepMachine<K, I> {
    /// Start declaring a machine
    pub fn builder() -> StepMachineBuilder<K, I> {
        StepMachineBuilder { states: Vec::new() }
    }
}

impl<K, I> StepMachine<K, I>
where
    K: Clone + Eq + Hash + Debug,
{
    /// Enter `initial`, restarting through exit/enter if already running
    pub fn start(&mut self, initial: K) -> Result<Step<K>> {
        if !self.states.contains_key(&initial) {
            return Err(ConfigurationError::UndeclaredState(format!("{initial:?}")).into());
        }
        self.switch(Target::State(initial))
    }

    /// Go back to the first declared state through exit/enter
    pub fn reset(&mut self) -> Result<Step<K>> {
        let first = self
            .states
            .get_index(0)
            .map(|(key, _)| key.clone())
            .ok_or(ConfigurationError::NoStates)?;
        self.switch(Target::State(first))
    }

    /// Let the current state handle `input`
    pub fn send(&mut self, input: &I) -> Result<Step<K>> {
        let current = self
            .lifecycle
            .current()
            .cloned()
            .ok_or(ExecutionError::NotRunning)?;

        let Some(state) = self.states.get_mut(&current) else {
            return Err(ConfigurationError::UndeclaredState(format!("{current:?}")).into());
        };

        let next = state
            .on_input(input)
            .map_err(|source| ExecutionError::Handler {
                state: format!("{current:?}"),
                source,
            })?;

        match next {
            Next::Stay => Ok(Step::Ignored),
            Next::Exit => self.switch(Target::Exit),
            Next::Goto(to) => {
                if !self.states.contains_key(&to) {
                    return Err(ConfigurationError::UnknownState {
                        from: format!("{current:?}"),
                        to: format!("{to:?}"),
                    }
                    .into());
                }
                self.switch(Target::State(to))
            }
        }
    }

    /// Leave the current state and stop
    pub fn stop(&mut self) -> Result<Step<K>> {
        self.switch(Target::Exit)
    }

    fn switch(&mut self, target: Target<K>) -> Result<Step<K>> {
        let states = &mut self.states;
        let step = self.lifecycle.switch(target, |kind, key| {
            let Some(state) = states.get_mut(key) else {
                return Ok(());
            };
            match kind {
                HookKind::Enter => state.on_enter(),
                HookKind::Exit => state.on_exit(),
            }
        })?;
        Ok(step)
    }

    /// The current state's key, if running
    pub fn state(&self) -> Option<&K> {
        self.lifecycle.current()
    }

    /// Whether the machine has a current state
    pub fn is_running(&self) -> bool {
        self.lifecycle.current().is_some()
    }

    /// Observers notified after a state became current
    pub fn entered(&mut self) -> &mut Channel<K> {
        self.lifecycle.entered()
    }

    /// Observers notified after a state stopped being current
    pub fn exited(&mut self) -> &mut Channel<K> {
        self.lifecycle.exited()
    }
}

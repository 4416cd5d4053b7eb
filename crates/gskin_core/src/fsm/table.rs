//! Declarative transition tables

use std::fmt::Debug;
use std::hash::Hash;

use indexmap::IndexMap;
use smallvec::SmallVec;

use super::{Lifecycle, Step, Target};
use crate::channel::Channel;
use crate::error::{ConfigurationError, ExecutionError, HookKind, Result};

type Hook<S> = Box<dyn FnMut(&S) -> anyhow::Result<()> + Send>;
type Guard<I> = Box<dyn FnMut(&I) -> anyhow::Result<bool> + Send>;
type Router<S, I> = Box<dyn FnMut(&I) -> anyhow::Result<Option<Target<S>>> + Send>;
type Predicate<I> = Box<dyn Fn(&I) -> bool + Send>;

enum Trigger<I> {
    Input(I),
    Matches(Predicate<I>),
    Any,
}

impl<I: PartialEq> Trigger<I> {
    fn matches(&self, input: &I) -> bool {
        match self {
            Trigger::Input(expected) => expected == input,
            Trigger::Matches(predicate) => predicate(input),
            Trigger::Any => true,
        }
    }
}

enum Action<S, I> {
    Goto(Target<S>),
    Route(Router<S, I>),
}

struct Transition<S, I> {
    trigger: Trigger<I>,
    guard: Option<Guard<I>>,
    action: Action<S, I>,
}

struct StateEntry<S, I> {
    transitions: SmallVec<[Transition<S, I>; 4]>,
    on_enter: SmallVec<[Hook<S>; 1]>,
    on_exit: SmallVec<[Hook<S>; 1]>,
}

impl<S, I> Default for StateEntry<S, I> {
    fn default() -> Self {
        Self {
            transitions: SmallVec::new(),
            on_enter: SmallVec::new(),
            on_exit: SmallVec::new(),
        }
    }
}

/// Builder for [`StateMachine`]
///
/// States must be declared with [`state`](Self::state) or
/// [`states`](Self::states); every transition, hook and fixed target is
/// checked against that set in [`build`](Self::build).
pub struct StateMachineBuilder<S, I> {
    declared: Vec<S>,
    transitions: Vec<(S, Transition<S, I>)>,
    hooks: Vec<(S, HookKind, Hook<S>)>,
}

impl<S, I> Default for StateMachineBuilder<S, I> {
    fn default() -> Self {
        Self {
            declared: Vec::new(),
            transitions: Vec::new(),
            hooks: Vec::new(),
        }
    }
}

impl<S, I> StateMachineBuilder<S, I>
where
    S: Clone + Eq + Hash + Debug,
{
    /// Declare a state
    pub fn state(mut self, state: S) -> Self {
        self.declared.push(state);
        self
    }

    /// Declare several states at once
    pub fn states(mut self, states: impl IntoIterator<Item = S>) -> Self {
        self.declared.extend(states);
        self
    }

    /// In `from`, the input `input` leads to `to`
    pub fn on(self, from: S, input: I, to: S) -> Self {
        self.push(from, Trigger::Input(input), None, Action::Goto(Target::State(to)))
    }

    /// In `from`, the input `input` stops the machine
    pub fn exit_on(self, from: S, input: I) -> Self {
        self.push(from, Trigger::Input(input), None, Action::Goto(Target::Exit))
    }

    /// In `from`, any input accepted by `predicate` leads to `to`
    pub fn on_match<P>(self, from: S, predicate: P, to: S) -> Self
    where
        P: Fn(&I) -> bool + Send + 'static,
    {
        self.push(
            from,
            Trigger::Matches(Box::new(predicate)),
            None,
            Action::Goto(Target::State(to)),
        )
    }

    /// In `from`, `input` leads to `to` only when `guard` allows it
    ///
    /// A rejected guard lets later transitions of `from` try the input.
    pub fn guarded<G>(self, from: S, input: I, guard: G, to: S) -> Self
    where
        G: FnMut(&I) -> anyhow::Result<bool> + Send + 'static,
    {
        self.push(
            from,
            Trigger::Input(input),
            Some(Box::new(guard)),
            Action::Goto(Target::State(to)),
        )
    }

    /// In `from`, let `router` pick the target for any input
    ///
    /// `Ok(None)` means this transition does not apply. Targets are checked
    /// when the router returns them.
    pub fn route<R>(self, from: S, router: R) -> Self
    where
        R: FnMut(&I) -> anyhow::Result<Option<Target<S>>> + Send + 'static,
    {
        self.push(from, Trigger::Any, None, Action::Route(Box::new(router)))
    }

    /// Run `hook` every time `state` becomes current
    pub fn on_enter<H>(mut self, state: S, hook: H) -> Self
    where
        H: FnMut(&S) -> anyhow::Result<()> + Send + 'static,
    {
        self.hooks.push((state, HookKind::Enter, Box::new(hook)));
        self
    }

    /// Run `hook` every time `state` stops being current
    pub fn on_exit<H>(mut self, state: S, hook: H) -> Self
    where
        H: FnMut(&S) -> anyhow::Result<()> + Send + 'static,
    {
        self.hooks.push((state, HookKind::Exit, Box::new(hook)));
        self
    }

    fn push(
        mut self,
        from: S,
        trigger: Trigger<I>,
        guard: Option<Guard<I>>,
        action: Action<S, I>,
    ) -> Self {
        self.transitions.push((
            from,
            Transition {
                trigger,
                guard,
                action,
            },
        ));
        self
    }

    /// Validate the declarations and build the machine
    pub fn build(self) -> std::result::Result<StateMachine<S, I>, ConfigurationError> {
        if self.declared.is_empty() {
            return Err(ConfigurationError::NoStates);
        }

        let mut states: IndexMap<S, StateEntry<S, I>> = IndexMap::with_capacity(self.declared.len());
        for state in self.declared {
            if states.contains_key(&state) {
                return Err(ConfigurationError::DuplicateState(format!("{state:?}")));
            }
            states.insert(state, StateEntry::default());
        }

        for (from, transition) in self.transitions {
            if let Action::Goto(Target::State(to)) = &transition.action {
                if !states.contains_key(to) {
                    return Err(ConfigurationError::UnknownState {
                        from: format!("{from:?}"),
                        to: format!("{to:?}"),
                    });
                }
            }
            let entry = states
                .get_mut(&from)
                .ok_or_else(|| ConfigurationError::UndeclaredState(format!("{from:?}")))?;
            entry.transitions.push(transition);
        }

        for (state, kind, hook) in self.hooks {
            let entry = states
                .get_mut(&state)
                .ok_or_else(|| ConfigurationError::UndeclaredState(format!("{state:?}")))?;
            match kind {
                HookKind::Enter => entry.on_enter.push(hook),
                HookKind::Exit => entry.on_exit.push(hook),
            }
        }

        tracing::debug!(states = states.len(), "built state machine");

        Ok(StateMachine {
            states,
            lifecycle: Lifecycle::default(),
        })
    }
}

/// A table-driven state machine over states `S` and inputs `I`
///
/// Inputs are matched against the current state's transitions in
/// declaration order; the first one whose trigger matches and whose guard
/// allows it fires. An input that matches nothing is ignored.
pub struct StateMachine<S, I> {
    states: IndexMap<S, StateEntry<S, I>>,
    lifecycle: Lifecycle<S>,
}

impl<S, I> StateMachine<S, I> {
    /// Start declaring a machine
    pub fn builder() -> StateMachineBuilder<S, I> {
        StateMachineBuilder::default()
    }
}

impl<S, I> StateMachine<S, I>
where
    S: Clone + Eq + Hash + Debug,
    I: PartialEq + Debug,
{
    /// Enter `initial`, restarting through exit/enter if already running
    pub fn start(&mut self, initial: S) -> Result<Step<S>> {
        if !self.states.contains_key(&initial) {
            return Err(ConfigurationError::UndeclaredState(format!("{initial:?}")).into());
        }
        self.switch(Target::State(initial))
    }

    /// Feed one input to the current state
    pub fn send(&mut self, input: &I) -> Result<Step<S>> {
        let current = self
            .lifecycle
            .current()
            .cloned()
            .ok_or(ExecutionError::NotRunning)?;

        let Some(target) = self.resolve(&current, input)? else {
            return Ok(Step::Ignored);
        };

        if let Target::State(to) = &target {
            if !self.states.contains_key(to) {
                return Err(ConfigurationError::UnknownState {
                    from: format!("{current:?}"),
                    to: format!("{to:?}"),
                }
                .into());
            }
        }

        self.switch(target)
    }

    /// Feed a batch of inputs, one transition at most per input
    ///
    /// Stops at the first error, or once the machine has exited.
    pub fn step<'a>(&mut self, inputs: impl IntoIterator<Item = &'a I>) -> Result<Vec<Step<S>>>
    where
        I: 'a,
    {
        let mut steps = Vec::new();
        for input in inputs {
            let step = self.send(input)?;
            let exited = matches!(step, Step::Exited { .. });
            steps.push(step);
            if exited {
                break;
            }
        }
        Ok(steps)
    }

    /// Leave the current state and stop. Stopping an idle machine is a no-op.
    pub fn stop(&mut self) -> Result<Step<S>> {
        self.switch(Target::Exit)
    }

    fn resolve(&mut self, current: &S, input: &I) -> Result<Option<Target<S>>> {
        let Some(entry) = self.states.get_mut(current) else {
            return Ok(None);
        };

        for transition in entry.transitions.iter_mut() {
            if !transition.trigger.matches(input) {
                continue;
            }
            if let Some(guard) = transition.guard.as_mut() {
                let allowed = guard(input).map_err(|source| guard_error(current, input, source))?;
                if !allowed {
                    continue;
                }
            }
            match &mut transition.action {
                Action::Goto(target) => return Ok(Some(target.clone())),
                Action::Route(router) => {
                    let routed =
                        router(input).map_err(|source| guard_error(current, input, source))?;
                    if routed.is_some() {
                        return Ok(routed);
                    }
                }
            }
        }
        Ok(None)
    }

    fn switch(&mut self, target: Target<S>) -> Result<Step<S>> {
        let states = &mut self.states;
        let step = self.lifecycle.switch(target, |kind, state| {
            let Some(entry) = states.get_mut(state) else {
                return Ok(());
            };
            let hooks = match kind {
                HookKind::Enter => &mut entry.on_enter,
                HookKind::Exit => &mut entry.on_exit,
            };
            for hook in hooks.iter_mut() {
                hook(state)?;
            }
            Ok(())
        })?;
        Ok(step)
    }

    /// The current state, if running
    pub fn state(&self) -> Option<&S> {
        self.lifecycle.current()
    }

    /// Whether the machine has a current state
    pub fn is_running(&self) -> bool {
        self.lifecycle.current().is_some()
    }

    /// Declared states in declaration order
    pub fn states(&self) -> impl Iterator<Item = &S> {
        self.states.keys()
    }

    /// Whether `state` was declared
    pub fn contains(&self, state: &S) -> bool {
        self.states.contains_key(state)
    }

    /// Observers notified after a state became current
    pub fn entered(&mut self) -> &mut Channel<S> {
        self.lifecycle.entered()
    }

    /// Observers notified after a state stopped being current
    pub fn exited(&mut self) -> &mut Channel<S> {
        self.lifecycle.exited()
    }
}

fn guard_error<S: Debug, I: Debug>(state: &S, input: &I, source: anyhow::Error) -> ExecutionError {
    ExecutionError::Guard {
        state: format!("{state:?}"),
        input: format!("{input:?}"),
        source,
    }
}

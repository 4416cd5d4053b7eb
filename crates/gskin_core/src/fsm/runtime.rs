//! Many running table machines behind copyable handles

use std::fmt::Debug;
use std::hash::Hash;

use slotmap::{new_key_type, SlotMap};

use super::{Step, StateMachine};
use crate::error::{ExecutionError, Result};

new_key_type! {
    /// Handle to a machine owned by an [`FsmRuntime`]
    pub struct FsmId;
}

/// Owns running [`StateMachine`]s and hands out [`FsmId`]s for them
pub struct FsmRuntime<S, I> {
    machines: SlotMap<FsmId, StateMachine<S, I>>,
}

impl<S, I> Default for FsmRuntime<S, I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, I> FsmRuntime<S, I> {
    /// Create an empty runtime
    pub fn new() -> Self {
        Self {
            machines: SlotMap::with_key(),
        }
    }

    /// Number of machines
    pub fn len(&self) -> usize {
        self.machines.len()
    }

    /// Whether the runtime owns no machines
    pub fn is_empty(&self) -> bool {
        self.machines.is_empty()
    }

    /// Borrow a machine
    pub fn get(&self, id: FsmId) -> Option<&StateMachine<S, I>> {
        self.machines.get(id)
    }

    /// Borrow a machine mutably, e.g. to subscribe to its channels
    pub fn get_mut(&mut self, id: FsmId) -> Option<&mut StateMachine<S, I>> {
        self.machines.get_mut(id)
    }

    /// Take a machine out of the runtime. Its current state is left as is.
    pub fn remove(&mut self, id: FsmId) -> Option<StateMachine<S, I>> {
        self.machines.remove(id)
    }
}

impl<S, I> FsmRuntime<S, I>
where
    S: Clone + Eq + Hash + Debug,
    I: PartialEq + Debug,
{
    /// Start `machine` in `initial` and keep it
    ///
    /// The machine is dropped if it fails to start.
    pub fn create(&mut self, mut machine: StateMachine<S, I>, initial: S) -> Result<FsmId> {
        machine.start(initial)?;
        Ok(self.machines.insert(machine))
    }

    /// Send `input` to one machine
    pub fn send(&mut self, id: FsmId, input: &I) -> Result<Step<S>> {
        let machine = self
            .machines
            .get_mut(id)
            .ok_or(ExecutionError::UnknownMachine)?;
        machine.send(input)
    }

    /// Current state of one machine
    pub fn current_state(&self, id: FsmId) -> Option<&S> {
        self.machines.get(id).and_then(StateMachine::state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    const IDLE: u32 = 0;
    const ACTIVE: u32 = 1;
    const CLICK: u32 = 1;

    fn toggle() -> StateMachine<u32, u32> {
        StateMachine::builder()
            .states([IDLE, ACTIVE])
            .on(IDLE, CLICK, ACTIVE)
            .on(ACTIVE, CLICK, IDLE)
            .build()
            .unwrap()
    }

    #[test]
    fn test_runtime_handles() {
        let mut runtime = FsmRuntime::new();

        let first = runtime.create(toggle(), IDLE).unwrap();
        let second = runtime.create(toggle(), ACTIVE).unwrap();
        assert_eq!(runtime.len(), 2);

        runtime.send(first, &CLICK).unwrap();
        assert_eq!(runtime.current_state(first), Some(&ACTIVE));
        assert_eq!(runtime.current_state(second), Some(&ACTIVE));

        assert!(runtime.remove(second).is_some());
        assert!(matches!(
            runtime.send(second, &CLICK),
            Err(Error::Execution(ExecutionError::UnknownMachine))
        ));
        assert_eq!(runtime.current_state(second), None);
    }

    #[test]
    fn test_create_rejects_unknown_initial_state() {
        let mut runtime = FsmRuntime::new();
        assert!(runtime.create(toggle(), 42).is_err());
        assert!(runtime.is_empty());
    }
}

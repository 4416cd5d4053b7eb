//! Screen management
//!
//! A game is usually a handful of screens (title, gameplay, game over) of
//! which exactly one runs each frame. [`ScreenManager`] owns the screens,
//! runs the current one once per frame with the caller's context and that
//! frame's events, and applies its verdict with the usual exit/enter
//! ordering.

use std::fmt::Debug;
use std::hash::Hash;
use std::marker::PhantomData;

use indexmap::IndexMap;

use crate::channel::Channel;
use crate::error::{ConfigurationError, ExecutionError, HookKind, Result};
use crate::fsm::{Lifecycle, Next, Step, Target};

/// One screen of a game
///
/// `C` is whatever the game threads through every frame (a world, a
/// surface, a schedule); `E` is the event type of the input layer.
pub trait Screen<K, C, E>: Send {
    /// Run one frame and say which screen runs next
    fn update(&mut self, ctx: &mut C, events: &[E]) -> anyhow::Result<Next<K>>;

    /// Called when the screen becomes current
    fn enter(&mut self, _ctx: &mut C) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called when the screen is left
    fn exit(&mut self, _ctx: &mut C) -> anyhow::Result<()> {
        Ok(())
    }
}

/// A [`Screen`] backed by a closure, see [`screen_fn`]
pub struct FnScreen<K, C, E, F> {
    func: F,
    _marker: PhantomData<fn(&mut C, &[E]) -> K>,
}

/// Turn a per-frame closure into a [`Screen`]
pub fn screen_fn<K, C, E, F>(func: F) -> FnScreen<K, C, E, F>
where
    F: FnMut(&mut C, &[E]) -> anyhow::Result<Next<K>> + Send,
{
    FnScreen {
        func,
        _marker: PhantomData,
    }
}

impl<K, C, E, F> Screen<K, C, E> for FnScreen<K, C, E, F>
where
    F: FnMut(&mut C, &[E]) -> anyhow::Result<Next<K>> + Send,
{
    fn update(&mut self, ctx: &mut C, events: &[E]) -> anyhow::Result<Next<K>> {
        (self.func)(ctx, events)
    }
}

/// Builder for [`ScreenManager`]
pub struct ScreenManagerBuilder<K, C, E> {
    screens: Vec<(K, Box<dyn Screen<K, C, E>>)>,
}

impl<K, C, E> ScreenManagerBuilder<K, C, E>
where
    K: Clone + Eq + Hash + Debug,
{
    /// Register a screen. The first one registered is where [`ScreenManager::start`] begins.
    pub fn screen(mut self, key: K, screen: impl Screen<K, C, E> + 'static) -> Self {
        self.screens.push((key, Box::new(screen)));
        self
    }

    /// Build the manager, rejecting empty managers and duplicate keys
    pub fn build(self) -> std::result::Result<ScreenManager<K, C, E>, ConfigurationError> {
        if self.screens.is_empty() {
            return Err(ConfigurationError::NoStates);
        }

        let mut screens = IndexMap::with_capacity(self.screens.len());
        for (key, screen) in self.screens {
            if screens.contains_key(&key) {
                return Err(ConfigurationError::DuplicateState(format!("{key:?}")));
            }
            screens.insert(key, screen);
        }

        Ok(ScreenManager {
            screens,
            lifecycle: Lifecycle::default(),
        })
    }
}

/// Runs one screen at a time and switches between them
pub struct ScreenManager<K, C, E> {
    screens: IndexMap<K, Box<dyn Screen<K, C, E>>>,
    lifecycle: Lifecycle<K>,
}

impl<K, C, E> ScreenManager<K, C, E> {
    /// Start registering screens
    pub fn builder() -> ScreenManagerBuilder<K, C, E> {
        ScreenManagerBuilder {
            screens: Vec::new(),
        }
    }
}

impl<K, C, E> ScreenManager<K, C, E>
where
    K: Clone + Eq + Hash + Debug,
{
    /// Enter the first registered screen
    pub fn start(&mut self, ctx: &mut C) -> Result<Step<K>> {
        let first = self
            .screens
            .get_index(0)
            .map(|(key, _)| key.clone())
            .ok_or(ConfigurationError::NoStates)?;
        self.switch(Target::State(first), ctx)
    }

    /// Enter `key`, leaving the current screen first if there is one
    pub fn start_at(&mut self, key: K, ctx: &mut C) -> Result<Step<K>> {
        if !self.screens.contains_key(&key) {
            return Err(ConfigurationError::UndeclaredState(format!("{key:?}")).into());
        }
        self.switch(Target::State(key), ctx)
    }

    /// Run the current screen for one frame
    pub fn update(&mut self, ctx: &mut C, events: &[E]) -> Result<Step<K>> {
        let current = self
            .lifecycle
            .current()
            .cloned()
            .ok_or(ExecutionError::NotRunning)?;

        let Some(screen) = self.screens.get_mut(&current) else {
            return Err(ConfigurationError::UndeclaredState(format!("{current:?}")).into());
        };

        let next = screen
            .update(ctx, events)
            .map_err(|source| ExecutionError::Handler {
                state: format!("{current:?}"),
                source,
            })?;

        match next {
            Next::Stay => Ok(Step::Ignored),
            Next::Exit => self.switch(Target::Exit, ctx),
            Next::Goto(to) => {
                if !self.screens.contains_key(&to) {
                    return Err(ConfigurationError::UnknownState {
                        from: format!("{current:?}"),
                        to: format!("{to:?}"),
                    }
                    .into());
                }
                self.switch(Target::State(to), ctx)
            }
        }
    }

    fn switch(&mut self, target: Target<K>, ctx: &mut C) -> Result<Step<K>> {
        let screens = &mut self.screens;
        let step = self.lifecycle.switch(target, |kind, key| {
            let Some(screen) = screens.get_mut(key) else {
                return Ok(());
            };
            match kind {
                HookKind::Enter => screen.enter(ctx),
                HookKind::Exit => screen.exit(ctx),
            }
        })?;
        Ok(step)
    }

    /// Key of the running screen
    pub fn current(&self) -> Option<&K> {
        self.lifecycle.current()
    }

    /// Whether a screen is running
    pub fn is_running(&self) -> bool {
        self.lifecycle.current().is_some()
    }

    /// Registered screen keys in registration order
    pub fn screens(&self) -> impl Iterator<Item = &K> {
        self.screens.keys()
    }

    /// Observers notified after a screen was entered
    pub fn entered(&mut self) -> &mut Channel<K> {
        self.lifecycle.entered()
    }

    /// Observers notified after a screen was left
    pub fn exited(&mut self) -> &mut Channel<K> {
        self.lifecycle.exited()
    }
}

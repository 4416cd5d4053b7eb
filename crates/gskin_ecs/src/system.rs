//! Systems: named behaviour over entities with required components

use std::marker::PhantomData;

use gskin_core::ExecutionError;
use smallvec::{smallvec, SmallVec};

use crate::component::{Component, ComponentName, ComponentType};
use crate::entity::{Entity, Fetched};
use crate::timer::Timer;

/// What a system update returns
pub type SystemResult = anyhow::Result<()>;

/// Per-tick information handed to every system call
#[derive(Debug)]
pub struct Tick<'a, C = ()> {
    /// Number of this tick, starting at 1
    pub frame: u64,
    /// Seconds since the previous tick
    pub delta: f32,
    /// Seconds since the schedule was created
    pub elapsed: f32,
    /// Caller-supplied data for this tick, e.g. the frame's input events
    pub input: &'a C,
}

#[doc(hidden)]
pub enum CallError {
    Arity,
    Type { index: usize, found: &'static str },
    Update(anyhow::Error),
}

/// Update functions that take their components as typed arguments
///
/// Implemented for closures `FnMut(&mut A, .., &Tick<C>) -> SystemResult`
/// with one to six component arguments. `Marker` only tells the
/// implementations apart.
pub trait SystemFn<C, Marker>: Send + Sync + 'static {
    /// The value types the function reads, in argument order
    fn component_types() -> SmallVec<[ComponentType; 4]>;

    #[doc(hidden)]
    fn call(
        &mut self,
        components: SmallVec<[Fetched<'_>; 4]>,
        tick: &Tick<'_, C>,
    ) -> Result<(), CallError>;
}

macro_rules! impl_system_fn {
    ($($component:ident $value:ident),+) => {
        impl<C, F, $($component),+> SystemFn<C, ($($component,)+)> for F
        where
            F: FnMut($(&mut $component,)+ &Tick<'_, C>) -> SystemResult + Send + Sync + 'static,
            $($component: Component,)+
        {
            fn component_types() -> SmallVec<[ComponentType; 4]> {
                smallvec![$(ComponentType::of::<$component>()),+]
            }

            fn call(
                &mut self,
                components: SmallVec<[Fetched<'_>; 4]>,
                tick: &Tick<'_, C>,
            ) -> Result<(), CallError> {
                let mut components = components.into_iter().enumerate();
                $(
                    let $value = match components.next() {
                        Some((index, Fetched { value, type_name })) => value
                            .downcast_mut::<$component>()
                            .ok_or(CallError::Type { index, found: type_name })?,
                        None => return Err(CallError::Arity),
                    };
                )+
                (self)($($value,)+ tick).map_err(CallError::Update)
            }
        }
    };
}

impl_system_fn!(A a);
impl_system_fn!(A a, B b);
impl_system_fn!(A a, B b, D d);
impl_system_fn!(A a, B b, D d, E e);
impl_system_fn!(A a, B b, D d, E e, G g);
impl_system_fn!(A a, B b, D d, E e, G g, H h);

trait ErasedSystemFn<C>: Send + Sync {
    fn call(
        &mut self,
        components: SmallVec<[Fetched<'_>; 4]>,
        tick: &Tick<'_, C>,
    ) -> Result<(), CallError>;
}

struct Erased<F, M> {
    func: F,
    _marker: PhantomData<fn() -> M>,
}

impl<C, F, M> ErasedSystemFn<C> for Erased<F, M>
where
    F: SystemFn<C, M>,
{
    fn call(
        &mut self,
        components: SmallVec<[Fetched<'_>; 4]>,
        tick: &Tick<'_, C>,
    ) -> Result<(), CallError> {
        self.func.call(components, tick)
    }
}

type EntityFn<C> = Box<dyn FnMut(&mut Entity, &Tick<'_, C>) -> SystemResult + Send + Sync>;
type Filter = Box<dyn Fn(&Entity) -> bool + Send + Sync>;

enum Update<C> {
    Components {
        types: SmallVec<[ComponentType; 4]>,
        func: Box<dyn ErasedSystemFn<C>>,
    },
    Entity(EntityFn<C>),
}

/// A registered behaviour: required components, optional filter, update
///
/// # Example
///
/// ```rust
/// use gskin_ecs::{System, SystemResult, Tick};
///
/// #[derive(Debug)]
/// struct Vec2(f32, f32);
///
/// let movement = System::new(
///     "movement",
///     ["pos", "velocity"],
///     |pos: &mut Vec2, vel: &mut Vec2, _: &Tick| -> SystemResult {
///         pos.0 += vel.0;
///         pos.1 += vel.1;
///         Ok(())
///     },
/// );
/// assert_eq!(movement.name(), "movement");
/// ```
pub struct System<C = ()> {
    name: String,
    requirements: SmallVec<[ComponentName; 4]>,
    filter: Option<Filter>,
    interval: Option<Timer>,
    enabled: bool,
    update: Update<C>,
}

impl<C> System<C> {
    /// A system whose update receives the required components, in order,
    /// as typed arguments
    pub fn new<F, M>(
        name: impl Into<String>,
        requirements: impl IntoIterator<Item = impl Into<ComponentName>>,
        update: F,
    ) -> Self
    where
        F: SystemFn<C, M>,
        M: 'static,
    {
        Self::with_update(
            name.into(),
            requirements,
            Update::Components {
                types: F::component_types(),
                func: Box::new(Erased {
                    func: update,
                    _marker: PhantomData,
                }),
            },
        )
    }

    /// A system whose update receives the whole entity
    ///
    /// An empty requirement list matches every entity.
    pub fn for_entity<F>(
        name: impl Into<String>,
        requirements: impl IntoIterator<Item = impl Into<ComponentName>>,
        update: F,
    ) -> Self
    where
        F: FnMut(&mut Entity, &Tick<'_, C>) -> SystemResult + Send + Sync + 'static,
    {
        Self::with_update(name.into(), requirements, Update::Entity(Box::new(update)))
    }

    fn with_update(
        name: String,
        requirements: impl IntoIterator<Item = impl Into<ComponentName>>,
        update: Update<C>,
    ) -> Self {
        Self {
            name,
            requirements: requirements.into_iter().map(Into::into).collect(),
            filter: None,
            interval: None,
            enabled: true,
            update,
        }
    }

    /// Only run on entities accepted by `filter`
    pub fn with_filter<P>(mut self, filter: P) -> Self
    where
        P: Fn(&Entity) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(filter));
        self
    }

    /// Only run on ticks where `seconds` have accumulated since the last run
    ///
    /// Time past the interval counts toward the next run, so uneven deltas
    /// do not drift the cadence.
    pub fn with_interval(mut self, seconds: f32) -> Self {
        self.set_interval(Some(seconds));
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub(crate) fn set_interval(&mut self, seconds: Option<f32>) {
        self.interval = seconds.map(Timer::repeating);
    }

    pub(crate) fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Required component names, in declaration order
    pub fn requirements(&self) -> &[ComponentName] {
        &self.requirements
    }

    /// Declared value types, one per requirement; empty for whole-entity systems
    pub fn component_types(&self) -> &[ComponentType] {
        match &self.update {
            Update::Components { types, .. } => types,
            Update::Entity(_) => &[],
        }
    }

    /// Whether the update takes typed component arguments
    pub fn takes_components(&self) -> bool {
        matches!(self.update, Update::Components { .. })
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Configured run interval in seconds
    pub fn interval(&self) -> Option<f32> {
        self.interval.as_ref().map(Timer::duration)
    }

    /// Whether this system would run on `entity`
    pub fn matches(&self, entity: &Entity) -> bool {
        entity.has_all(&self.requirements)
            && self.filter.as_ref().map_or(true, |filter| filter(entity))
    }

    /// Advance the interval timer; `true` if the system runs this tick
    pub(crate) fn is_due(&mut self, delta: f32) -> bool {
        match self.interval.as_mut() {
            Some(timer) => timer.tick(delta),
            None => true,
        }
    }

    /// Run the update on one entity if it matches. Returns whether it ran.
    pub(crate) fn run(
        &mut self,
        entity: &mut Entity,
        index: usize,
        tick: &Tick<'_, C>,
    ) -> Result<bool, ExecutionError> {
        if !self.matches(entity) {
            return Ok(false);
        }

        let result = match &mut self.update {
            Update::Entity(func) => func(entity, tick).map_err(CallError::Update),
            Update::Components { func, .. } => match entity.fetch_many(&self.requirements) {
                Some(components) => func.call(components, tick),
                None => return Ok(false),
            },
        };

        result.map(|()| true).map_err(|err| self.execution_error(err, entity, index))
    }

    fn execution_error(&self, err: CallError, entity: &Entity, index: usize) -> ExecutionError {
        let entity_label = entity.label(index);
        match err {
            CallError::Update(source) => ExecutionError::System {
                system: self.name.clone(),
                entity: entity_label,
                source,
            },
            CallError::Type { index: arg, found } => ExecutionError::ComponentType {
                system: self.name.clone(),
                entity: entity_label,
                component: self
                    .requirements
                    .get(arg)
                    .map(ToString::to_string)
                    .unwrap_or_default(),
                expected: self
                    .component_types()
                    .get(arg)
                    .map_or("<unknown>", ComponentType::name),
                found,
            },
            CallError::Arity => ExecutionError::System {
                system: self.name.clone(),
                entity: entity_label,
                source: anyhow::anyhow!("fewer components fetched than the update function takes"),
            },
        }
    }
}

impl<C> std::fmt::Debug for System<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("System")
            .field("name", &self.name)
            .field("requirements", &self.requirements)
            .field("filtered", &self.filter.is_some())
            .field("interval", &self.interval())
            .field("enabled", &self.enabled)
            .finish()
    }
}

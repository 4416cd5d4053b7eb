//! Entities: an identity plus named component values

use std::any::Any;
use std::fmt;

use slotmap::{new_key_type, Key};
use smallvec::SmallVec;

use crate::component::{Component, ComponentName};

new_key_type! {
    /// Identifier handed out by a [`World`](crate::World)
    ///
    /// Entities that were never spawned into a world carry the null id.
    pub struct EntityId;
}

type Value = Box<dyn Any + Send + Sync>;

struct Slot {
    name: ComponentName,
    value: Option<Value>,
    type_name: &'static str,
}

/// A mutable borrow of one stored component value
#[doc(hidden)]
pub struct Fetched<'a> {
    pub(crate) value: &'a mut (dyn Any + Send + Sync + 'static),
    pub(crate) type_name: &'static str,
}

/// An entity: optional debug name plus an open-ended set of components
///
/// Components are keyed by [`ComponentName`]. A key may be present with no
/// value ("absent"); for queries that is the same as the key missing.
///
/// # Example
///
/// ```rust
/// use gskin_ecs::Entity;
///
/// let mut player = Entity::named("player")
///     .with("pos", (0.0f32, 0.0f32))
///     .with("health", 3u32);
///
/// *player.get_mut::<u32>("health").unwrap() -= 1;
/// assert_eq!(player.get::<u32>("health"), Some(&2));
/// assert!(!player.has("velocity"));
/// ```
#[derive(Default)]
pub struct Entity {
    id: EntityId,
    name: Option<String>,
    slots: SmallVec<[Slot; 8]>,
}

impl Entity {
    /// Create an entity with no components
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an entity with a debug name
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Add a component, replacing any previous value under `name`
    pub fn with<T: Component>(mut self, name: impl Into<ComponentName>, value: T) -> Self {
        self.insert(name, value);
        self
    }

    /// Add a key with no value
    pub fn with_absent(mut self, name: impl Into<ComponentName>) -> Self {
        self.set_absent(name);
        self
    }

    /// Store `value` under `name`, replacing any previous value
    pub fn insert<T: Component>(&mut self, name: impl Into<ComponentName>, value: T) {
        self.put(name.into(), Some(Box::new(value)), std::any::type_name::<T>());
    }

    /// Keep the key but clear its value
    pub fn set_absent(&mut self, name: impl Into<ComponentName>) {
        self.put(name.into(), None, "<absent>");
    }

    fn put(&mut self, name: ComponentName, value: Option<Value>, type_name: &'static str) {
        match self.slots.iter_mut().find(|slot| slot.name == name) {
            Some(slot) => {
                slot.value = value;
                slot.type_name = type_name;
            }
            None => self.slots.push(Slot {
                name,
                value,
                type_name,
            }),
        }
    }

    /// Remove the key entirely. Returns whether it existed.
    pub fn remove(&mut self, name: &str) -> bool {
        match self.slots.iter().position(|slot| slot.name == *name) {
            Some(index) => {
                self.slots.remove(index);
                true
            }
            None => false,
        }
    }

    fn slot(&self, name: &str) -> Option<&Slot> {
        self.slots.iter().find(|slot| slot.name == *name)
    }

    /// Whether `name` holds a value
    pub fn has(&self, name: &str) -> bool {
        self.slot(name).is_some_and(|slot| slot.value.is_some())
    }

    /// Whether every name in `names` holds a value
    pub fn has_all<N: AsRef<str>>(&self, names: &[N]) -> bool {
        names.iter().all(|name| self.has(name.as_ref()))
    }

    /// Borrow the value under `name` if it exists and is a `T`
    pub fn get<T: Component>(&self, name: &str) -> Option<&T> {
        self.slot(name)?.value.as_deref()?.downcast_ref::<T>()
    }

    /// Mutably borrow the value under `name` if it exists and is a `T`
    pub fn get_mut<T: Component>(&mut self, name: &str) -> Option<&mut T> {
        self.slots
            .iter_mut()
            .find(|slot| slot.name == *name)?
            .value
            .as_deref_mut()?
            .downcast_mut::<T>()
    }

    /// Name of the Rust type stored under `name`
    pub fn type_name_of(&self, name: &str) -> Option<&'static str> {
        self.slot(name)
            .filter(|slot| slot.value.is_some())
            .map(|slot| slot.type_name)
    }

    /// Every key, present or absent, in insertion order
    pub fn component_names(&self) -> impl Iterator<Item = &ComponentName> {
        self.slots.iter().map(|slot| &slot.name)
    }

    /// Number of keys, present or absent
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub(crate) fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// How the entity is referred to in errors and logs
    pub(crate) fn label(&self, index: usize) -> String {
        match &self.name {
            Some(name) => format!("`{name}`"),
            None if !self.id.is_null() => format!("{:?}", self.id),
            None => format!("#{index}"),
        }
    }

    /// Borrow the values under `names`, in that order
    ///
    /// Returns `None` unless every name holds a value. `names` must not
    /// contain duplicates.
    pub(crate) fn fetch_many(&mut self, names: &[ComponentName]) -> Option<SmallVec<[Fetched<'_>; 4]>> {
        let mut fetched: SmallVec<[Option<Fetched<'_>>; 4]> = names.iter().map(|_| None).collect();

        for slot in self.slots.iter_mut() {
            let Some(index) = names.iter().position(|name| *name == slot.name) else {
                continue;
            };
            if let Some(value) = slot.value.as_deref_mut() {
                fetched[index] = Some(Fetched {
                    value,
                    type_name: slot.type_name,
                });
            }
        }

        fetched.into_iter().collect()
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let components: Vec<(&str, &str)> = self
            .slots
            .iter()
            .map(|slot| (slot.name.as_str(), slot.type_name))
            .collect();
        f.debug_struct("Entity")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("components", &components)
            .finish()
    }
}

//! gskin ECS
//!
//! A small entity-component-system where entities are open-ended bags of
//! named components and systems are closures registered with the component
//! names they need.
//!
//! - **Entities**: an identity plus `name -> value` components, see [`Entity`]
//! - **Systems**: required names, an optional filter, an update taking the
//!   components as typed arguments, see [`System`]
//! - **Schedule**: runs systems in registration order over any
//!   [`EntityCollection`], see [`Schedule`]
//! - **World**: ordered storage with generational ids, see [`World`]
//!
//! Value types are declared by each update function's signature and checked
//! against other systems once, at registration.
//!
//! # Example
//!
//! ```rust
//! use gskin_ecs::{Entity, Schedule, System, SystemResult, Tick, World};
//!
//! #[derive(Debug, PartialEq)]
//! struct Health(u32);
//!
//! let mut schedule: Schedule = Schedule::new();
//! schedule
//!     .register_system(
//!         System::new("poison", ["health"], |hp: &mut Health, _: &Tick| -> SystemResult {
//!             hp.0 = hp.0.saturating_sub(1);
//!             Ok(())
//!         })
//!         .with_filter(|entity: &Entity| entity.has("poisoned")),
//!     )
//!     .unwrap();
//!
//! let mut world = World::new();
//! let hero = world.spawn(Entity::named("hero").with("health", Health(3)).with("poisoned", true));
//! let rat = world.spawn(Entity::named("rat").with("health", Health(1)));
//!
//! schedule.tick(&mut world).unwrap();
//!
//! assert_eq!(world.get(hero).and_then(|e| e.get::<Health>("health")), Some(&Health(2)));
//! assert_eq!(world.get(rat).and_then(|e| e.get::<Health>("health")), Some(&Health(1)));
//! ```

pub mod component;
pub mod entity;
pub mod schedule;
pub mod system;
pub mod timer;
pub mod world;

pub use component::{Component, ComponentName, ComponentType, RESERVED_NAMES};
pub use entity::{Entity, EntityId};
pub use schedule::{Schedule, DEFAULT_FIXED_DELTA};
pub use system::{System, SystemFn, SystemResult, Tick};
pub use timer::{Repeat, Timer};
pub use world::{EntityCollection, World};

pub use gskin_core::{ConfigurationError, ExecutionError};

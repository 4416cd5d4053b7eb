//! gskin
//!
//! Building blocks for small games, without a renderer or a game loop:
//!
//! - [`ecs`]: entities as bags of named components, systems as closures,
//!   a [`Schedule`](ecs::Schedule) that ticks them over a
//!   [`World`](ecs::World)
//! - [`core`]: observer channels, state machines (table-driven and
//!   step-style) and a [`ScreenManager`](core::ScreenManager)
//! - [`dialogue`]: branching JSON dialogue scripts
//! - [`config`] and [`logging`]: `gskin.toml` loading and `tracing` setup
//!
//! # Example
//!
//! ```rust
//! use gskin::prelude::*;
//!
//! let config = GameConfig::from_toml_str("[game]\nfps = 10").unwrap();
//!
//! let mut schedule: Schedule = Schedule::new();
//! schedule
//!     .register_system(System::new("age", ["age"], |age: &mut f32, tick: &Tick| -> SystemResult {
//!         *age += tick.delta;
//!         Ok(())
//!     }))
//!     .unwrap();
//! config.apply_to_schedule(&mut schedule).unwrap();
//!
//! let mut world = World::new();
//! let id = world.spawn(Entity::new().with("age", 0.0f32));
//! schedule.tick(&mut world).unwrap();
//!
//! assert_eq!(world.get(id).and_then(|e| e.get::<f32>("age")), Some(&0.1));
//! ```

pub mod config;
pub mod logging;
pub mod prelude;

pub use gskin_core as core;
pub use gskin_dialogue as dialogue;
pub use gskin_ecs as ecs;

pub use config::GameConfig;

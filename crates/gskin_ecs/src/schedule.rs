//! System registration and the tick pass

use gskin_core::{ConfigurationError, ExecutionError};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::component::{ComponentName, ComponentType};
use crate::system::{System, Tick};
use crate::world::EntityCollection;

/// Default seconds per tick for [`Schedule::tick`]
pub const DEFAULT_FIXED_DELTA: f32 = 1.0 / 60.0;

/// Registered systems, run in registration order every tick
///
/// One tick runs each enabled, due system over every matching entity
/// before moving on to the next system, so later systems see what
/// earlier ones wrote during the same tick.
///
/// # Example
///
/// ```rust
/// use gskin_ecs::{Entity, Schedule, System, SystemResult, Tick};
///
/// let mut schedule: Schedule = Schedule::new();
/// schedule
///     .register_system(System::new(
///         "movement",
///         ["pos", "velocity"],
///         |pos: &mut (i32, i32), vel: &mut (i32, i32), _: &Tick| -> SystemResult {
///             pos.0 += vel.0;
///             pos.1 += vel.1;
///             Ok(())
///         },
///     ))
///     .unwrap();
///
/// let mut entities = vec![
///     Entity::new().with("pos", (0, 0)).with("velocity", (1, 1)),
///     Entity::new().with("pos", (5, 5)),
/// ];
/// schedule.tick(&mut entities).unwrap();
///
/// assert_eq!(entities[0].get::<(i32, i32)>("pos"), Some(&(1, 1)));
/// assert_eq!(entities[1].get::<(i32, i32)>("pos"), Some(&(5, 5)));
/// ```
pub struct Schedule<C = ()> {
    systems: Vec<System<C>>,
    by_name: FxHashMap<String, usize>,
    component_types: FxHashMap<ComponentName, (ComponentType, String)>,
    fixed_delta: f32,
    frame: u64,
    elapsed: f32,
}

impl<C> Default for Schedule<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Schedule<C> {
    /// Create an empty schedule
    pub fn new() -> Self {
        Self {
            systems: Vec::new(),
            by_name: FxHashMap::default(),
            component_types: FxHashMap::default(),
            fixed_delta: DEFAULT_FIXED_DELTA,
            frame: 0,
            elapsed: 0.0,
        }
    }

    /// Seconds per tick used by [`Schedule::tick`]
    pub fn with_fixed_delta(mut self, seconds: f32) -> Self {
        self.fixed_delta = seconds;
        self
    }

    pub fn set_fixed_delta(&mut self, seconds: f32) {
        self.fixed_delta = seconds;
    }

    pub fn fixed_delta(&self) -> f32 {
        self.fixed_delta
    }

    /// Validate `system` and append it to the run order
    pub fn register_system(&mut self, system: System<C>) -> Result<(), ConfigurationError> {
        self.validate(&system)?;

        for (name, ty) in system
            .requirements()
            .iter()
            .zip(system.component_types())
        {
            self.component_types
                .entry(name.clone())
                .or_insert_with(|| (*ty, system.name().to_string()));
        }

        tracing::debug!(
            system = system.name(),
            requirements = ?system.requirements(),
            "registered system"
        );

        self.by_name
            .insert(system.name().to_string(), self.systems.len());
        self.systems.push(system);
        Ok(())
    }

    fn validate(&self, system: &System<C>) -> Result<(), ConfigurationError> {
        let name = system.name();
        let requirements = system.requirements();

        if self.by_name.contains_key(name) {
            return Err(ConfigurationError::DuplicateSystem(name.to_string()));
        }

        if requirements.is_empty() && system.takes_components() {
            return Err(ConfigurationError::EmptyRequirements {
                system: name.to_string(),
            });
        }

        let mut seen: SmallVec<[&ComponentName; 4]> = SmallVec::new();
        for component in requirements {
            if component.as_str().is_empty() {
                return Err(ConfigurationError::EmptyComponentName {
                    system: name.to_string(),
                });
            }
            if component.is_reserved() {
                return Err(ConfigurationError::ReservedComponentName {
                    system: name.to_string(),
                    component: component.to_string(),
                });
            }
            if seen.contains(&component) {
                return Err(ConfigurationError::DuplicateComponent {
                    system: name.to_string(),
                    component: component.to_string(),
                });
            }
            seen.push(component);
        }

        let types = system.component_types();
        if system.takes_components() && types.len() != requirements.len() {
            return Err(ConfigurationError::ArityMismatch {
                system: name.to_string(),
                declared: requirements.len(),
                expected: types.len(),
            });
        }

        for (component, ty) in requirements.iter().zip(types) {
            if let Some((registered, owner)) = self.component_types.get(component) {
                if registered != ty {
                    tracing::debug!(
                        system = name,
                        component = component.as_str(),
                        registered_by = owner.as_str(),
                        "component type conflict"
                    );
                    return Err(ConfigurationError::ConflictingComponentType {
                        system: name.to_string(),
                        component: component.to_string(),
                        registered: registered.name(),
                        found: ty.name(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Run one tick of `delta` seconds with per-tick `input`
    ///
    /// Stops at the first failing update; mutations made before it stay.
    pub fn tick_with<E>(
        &mut self,
        entities: &mut E,
        delta: f32,
        input: &C,
    ) -> Result<(), ExecutionError>
    where
        E: EntityCollection + ?Sized,
    {
        self.frame += 1;
        self.elapsed += delta;

        let tick = Tick {
            frame: self.frame,
            delta,
            elapsed: self.elapsed,
            input,
        };

        for system in self.systems.iter_mut() {
            if !system.is_enabled() || !system.is_due(delta) {
                continue;
            }

            let mut ran = 0usize;
            for index in 0..entities.entity_count() {
                let Some(entity) = entities.entity_at_mut(index) else {
                    continue;
                };
                if system.run(entity, index, &tick)? {
                    ran += 1;
                }
            }

            tracing::trace!(system = system.name(), frame = tick.frame, ran, "ran system");
        }

        Ok(())
    }

    /// Enable/disable a system and change its interval
    pub fn configure_system(
        &mut self,
        name: &str,
        enabled: bool,
        interval: Option<f32>,
    ) -> Result<(), ConfigurationError> {
        let index = *self
            .by_name
            .get(name)
            .ok_or_else(|| ConfigurationError::UnknownSystem(name.to_string()))?;
        let system = &mut self.systems[index];
        system.set_enabled(enabled);
        system.set_interval(interval);
        Ok(())
    }

    pub fn system(&self, name: &str) -> Option<&System<C>> {
        self.by_name.get(name).map(|&index| &self.systems[index])
    }

    /// System names in run order
    pub fn system_names(&self) -> impl Iterator<Item = &str> {
        self.systems.iter().map(System::name)
    }

    pub fn len(&self) -> usize {
        self.systems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    /// Ticks run so far
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Seconds accumulated over all ticks
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }
}

impl Schedule<()> {
    /// Run one tick of [`fixed_delta`](Self::fixed_delta) seconds
    pub fn tick<E>(&mut self, entities: &mut E) -> Result<(), ExecutionError>
    where
        E: EntityCollection + ?Sized,
    {
        let delta = self.fixed_delta;
        self.tick_with(entities, delta, &())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Entity, SystemResult, World};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Copy, Debug, PartialEq)]
    struct Vec2(f32, f32);

    fn movement() -> System {
        System::new(
            "movement",
            ["pos", "velocity"],
            |pos: &mut Vec2, vel: &mut Vec2, _: &Tick| -> SystemResult {
                pos.0 += vel.0;
                pos.1 += vel.1;
                Ok(())
            },
        )
    }

    fn pos(entity: &Entity) -> Option<Vec2> {
        entity.get::<Vec2>("pos").copied()
    }

    #[test]
    fn test_only_matching_entities_move() {
        let mut schedule = Schedule::new();
        schedule.register_system(movement()).unwrap();

        let mut entities = vec![
            Entity::new()
                .with("pos", Vec2(0.0, 0.0))
                .with("velocity", Vec2(1.0, 1.0)),
            Entity::new().with("pos", Vec2(5.0, 5.0)),
        ];
        schedule.tick(&mut entities).unwrap();

        assert_eq!(pos(&entities[0]), Some(Vec2(1.0, 1.0)));
        assert_eq!(pos(&entities[1]), Some(Vec2(5.0, 5.0)));
    }

    #[test]
    fn test_absent_value_is_skipped() {
        let mut schedule = Schedule::new();
        schedule.register_system(movement()).unwrap();

        let mut entities = [Entity::new()
            .with("pos", Vec2(0.0, 0.0))
            .with_absent("velocity")];
        schedule.tick(&mut entities).unwrap();

        assert_eq!(pos(&entities[0]), Some(Vec2(0.0, 0.0)));
    }

    #[test]
    fn test_two_ticks_accumulate() {
        let mut schedule = Schedule::new();
        schedule.register_system(movement()).unwrap();

        let mut entities = vec![Entity::new()
            .with("pos", Vec2(0.0, 0.0))
            .with("velocity", Vec2(2.0, -1.0))];
        schedule.tick(&mut entities).unwrap();
        schedule.tick(&mut entities).unwrap();

        assert_eq!(pos(&entities[0]), Some(Vec2(4.0, -2.0)));
        assert_eq!(schedule.frame(), 2);
    }

    #[test]
    fn test_later_systems_see_earlier_mutations() {
        let mut schedule: Schedule = Schedule::new();
        schedule
            .register_system(System::new(
                "double",
                ["x"],
                |x: &mut i32, _: &Tick| -> SystemResult {
                    *x *= 2;
                    Ok(())
                },
            ))
            .unwrap();

        let observed = Arc::new(Mutex::new(Vec::new()));
        let sink = observed.clone();
        schedule
            .register_system(System::new("observe", ["x"], move |x: &mut i32, _: &Tick| -> SystemResult {
                sink.lock().unwrap().push(*x);
                Ok(())
            }))
            .unwrap();

        let mut entities = vec![Entity::new().with("x", 1), Entity::new().with("x", 10)];
        schedule.tick(&mut entities).unwrap();

        assert_eq!(*observed.lock().unwrap(), vec![2, 20]);
    }

    #[test]
    fn test_invocation_order_is_systems_then_entities() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut schedule: Schedule = Schedule::new();

        for name in ["first", "second"] {
            let log = log.clone();
            schedule
                .register_system(System::for_entity(name, ["id"], move |entity, _| {
                    let id = *entity.get::<u8>("id").unwrap_or(&0);
                    log.lock().unwrap().push(format!("{name}:{id}"));
                    Ok(())
                }))
                .unwrap();
        }

        let mut entities = vec![Entity::new().with("id", 1u8), Entity::new().with("id", 2u8)];
        schedule.tick(&mut entities).unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec!["first:1", "first:2", "second:1", "second:2"]
        );
    }

    #[test]
    fn test_filter_skips_entities() {
        let mut schedule = Schedule::new();
        schedule
            .register_system(movement().with_filter(|entity: &Entity| entity.name() != Some("anchor")))
            .unwrap();

        let mut entities = vec![
            Entity::named("anchor")
                .with("pos", Vec2(0.0, 0.0))
                .with("velocity", Vec2(1.0, 0.0)),
            Entity::named("drifter")
                .with("pos", Vec2(0.0, 0.0))
                .with("velocity", Vec2(1.0, 0.0)),
        ];
        schedule.tick(&mut entities).unwrap();

        assert_eq!(pos(&entities[0]), Some(Vec2(0.0, 0.0)));
        assert_eq!(pos(&entities[1]), Some(Vec2(1.0, 0.0)));
    }

    #[test]
    fn test_failure_aborts_tick_without_rollback() {
        let mut schedule: Schedule = Schedule::new();
        schedule
            .register_system(System::new("count", ["n"], |n: &mut i32, _: &Tick| -> SystemResult {
                if *n < 0 {
                    anyhow::bail!("negative counter");
                }
                *n += 1;
                Ok(())
            }))
            .unwrap();

        let mut entities = vec![
            Entity::new().with("n", 0),
            Entity::named("broken").with("n", -5),
            Entity::new().with("n", 0),
        ];
        let err = schedule.tick(&mut entities).unwrap_err();

        match err {
            ExecutionError::System { system, entity, source } => {
                assert_eq!(system, "count");
                assert_eq!(entity, "`broken`");
                assert_eq!(source.to_string(), "negative counter");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(entities[0].get::<i32>("n"), Some(&1));
        assert_eq!(entities[2].get::<i32>("n"), Some(&0));
    }

    #[test]
    fn test_type_mismatch_is_an_execution_error() {
        let mut schedule = Schedule::new();
        schedule.register_system(movement()).unwrap();

        let mut entities = vec![Entity::new().with("pos", (0.0f32, 0.0f32)).with("velocity", Vec2(1.0, 1.0))];
        let err = schedule.tick(&mut entities).unwrap_err();

        assert!(matches!(err, ExecutionError::ComponentType { ref component, .. } if component == "pos"));
    }

    #[test]
    fn test_registration_errors() {
        let mut schedule: Schedule = Schedule::new();
        schedule.register_system(movement()).unwrap();

        let cases = [
            (
                movement(),
                ConfigurationError::DuplicateSystem("movement".into()),
            ),
            (
                System::new("reserved", ["entity"], |_: &mut u8, _: &Tick| -> SystemResult { Ok(()) }),
                ConfigurationError::ReservedComponentName {
                    system: "reserved".into(),
                    component: "entity".into(),
                },
            ),
            (
                System::new("blank", [""], |_: &mut u8, _: &Tick| -> SystemResult { Ok(()) }),
                ConfigurationError::EmptyComponentName {
                    system: "blank".into(),
                },
            ),
            (
                System::new("twice", ["a", "a"], |_: &mut u8, _: &mut u8, _: &Tick| -> SystemResult { Ok(()) }),
                ConfigurationError::DuplicateComponent {
                    system: "twice".into(),
                    component: "a".into(),
                },
            ),
            (
                System::new("short", ["a", "b"], |_: &mut u8, _: &Tick| -> SystemResult { Ok(()) }),
                ConfigurationError::ArityMismatch {
                    system: "short".into(),
                    declared: 2,
                    expected: 1,
                },
            ),
            (
                System::new("none", Vec::<&'static str>::new(), |_: &mut u8, _: &Tick| -> SystemResult { Ok(()) }),
                ConfigurationError::EmptyRequirements {
                    system: "none".into(),
                },
            ),
            (
                System::new("clash", ["pos"], |_: &mut u8, _: &Tick| -> SystemResult { Ok(()) }),
                ConfigurationError::ConflictingComponentType {
                    system: "clash".into(),
                    component: "pos".into(),
                    registered: std::any::type_name::<Vec2>(),
                    found: "u8",
                },
            ),
        ];

        for (system, expected) in cases {
            assert_eq!(schedule.register_system(system), Err(expected));
        }
        assert_eq!(schedule.len(), 1);
    }

    #[test]
    fn test_interval_system_runs_every_other_tick() {
        let mut schedule: Schedule = Schedule::new().with_fixed_delta(0.25);
        schedule
            .register_system(
                System::new("regen", ["hp"], |hp: &mut u32, _: &Tick| -> SystemResult {
                    *hp += 1;
                    Ok(())
                })
                .with_interval(0.5),
            )
            .unwrap();

        let mut entities = vec![Entity::new().with("hp", 0u32)];
        for _ in 0..4 {
            schedule.tick(&mut entities).unwrap();
        }

        assert_eq!(entities[0].get::<u32>("hp"), Some(&2));
    }

    #[test]
    fn test_configure_system() {
        let mut schedule = Schedule::new();
        schedule.register_system(movement()).unwrap();
        schedule.configure_system("movement", false, None).unwrap();

        let mut entities = vec![Entity::new()
            .with("pos", Vec2(0.0, 0.0))
            .with("velocity", Vec2(1.0, 1.0))];
        schedule.tick(&mut entities).unwrap();
        assert_eq!(pos(&entities[0]), Some(Vec2(0.0, 0.0)));

        assert_eq!(
            schedule.configure_system("gravity", true, None),
            Err(ConfigurationError::UnknownSystem("gravity".into()))
        );
    }

    #[test]
    fn test_tick_input_reaches_systems() {
        let mut schedule: Schedule<Vec<char>> = Schedule::new();
        schedule
            .register_system(System::new(
                "keys",
                ["pressed"],
                |pressed: &mut String, tick: &Tick<Vec<char>>| -> SystemResult {
                    pressed.extend(tick.input.iter());
                    Ok(())
                },
            ))
            .unwrap();

        let mut entities = vec![Entity::new().with("pressed", String::new())];
        schedule.tick_with(&mut entities, 0.1, &vec!['a', 'b']).unwrap();
        schedule.tick_with(&mut entities, 0.1, &vec!['c']).unwrap();

        assert_eq!(entities[0].get::<String>("pressed").map(String::as_str), Some("abc"));
        assert_eq!(schedule.frame(), 2);
    }

    #[test]
    fn test_world_tolerates_spawn_and_despawn_between_ticks() {
        let mut schedule = Schedule::new();
        schedule.register_system(movement()).unwrap();

        let mut world = World::new();
        let first = world.spawn(
            Entity::new()
                .with("pos", Vec2(0.0, 0.0))
                .with("velocity", Vec2(1.0, 0.0)),
        );
        schedule.tick(&mut world).unwrap();

        world.despawn(first);
        let second = world.spawn(
            Entity::new()
                .with("pos", Vec2(10.0, 0.0))
                .with("velocity", Vec2(0.0, 1.0)),
        );
        schedule.tick(&mut world).unwrap();

        assert_eq!(world.len(), 1);
        assert_eq!(world.get(second).and_then(pos), Some(Vec2(10.0, 1.0)));
    }
}

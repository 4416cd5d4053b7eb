//! Ordered entity storage

use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;
use slotmap::SlotMap;

use crate::entity::{Entity, EntityId};

/// Ordered, index-addressable entities a [`Schedule`](crate::Schedule) can tick
///
/// Systems visit entities in index order. Implemented for slices, arrays,
/// `Vec<Entity>` and [`World`].
pub trait EntityCollection {
    fn entity_count(&self) -> usize;

    fn entity_at_mut(&mut self, index: usize) -> Option<&mut Entity>;
}

impl EntityCollection for [Entity] {
    fn entity_count(&self) -> usize {
        self.len()
    }

    fn entity_at_mut(&mut self, index: usize) -> Option<&mut Entity> {
        self.get_mut(index)
    }
}

impl<const N: usize> EntityCollection for [Entity; N] {
    fn entity_count(&self) -> usize {
        N
    }

    fn entity_at_mut(&mut self, index: usize) -> Option<&mut Entity> {
        self.get_mut(index)
    }
}

impl EntityCollection for Vec<Entity> {
    fn entity_count(&self) -> usize {
        self.len()
    }

    fn entity_at_mut(&mut self, index: usize) -> Option<&mut Entity> {
        self.get_mut(index)
    }
}

/// Entities in spawn order, addressable by generational [`EntityId`]
///
/// Ids of despawned entities are never confused with later ones: a reused
/// slot gets a new generation.
#[derive(Default)]
pub struct World {
    ids: SlotMap<EntityId, ()>,
    entities: IndexMap<EntityId, Entity, FxBuildHasher>,
}

impl World {
    /// Create an empty world
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entity at the end of the iteration order
    pub fn spawn(&mut self, mut entity: Entity) -> EntityId {
        let id = self.ids.insert(());
        entity.set_id(id);
        self.entities.insert(id, entity);
        tracing::trace!(?id, "spawned entity");
        id
    }

    /// Remove an entity, keeping the order of the others
    pub fn despawn(&mut self, id: EntityId) -> Option<Entity> {
        self.ids.remove(id)?;
        let mut entity = self.entities.shift_remove(&id)?;
        entity.set_id(EntityId::default());
        tracing::trace!(?id, "despawned entity");
        Some(entity)
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.ids.contains_key(id)
    }

    /// First entity with the given debug name
    pub fn find_named(&self, name: &str) -> Option<&Entity> {
        self.entities
            .values()
            .find(|entity| entity.name() == Some(name))
    }

    /// Entities holding a value under every one of `names`
    pub fn query<'a>(&'a self, names: &'a [&'a str]) -> impl Iterator<Item = &'a Entity> + 'a {
        self.entities
            .values()
            .filter(move |entity| entity.has_all(names))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.entities.values_mut()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Despawn everything
    pub fn clear(&mut self) {
        self.ids.clear();
        self.entities.clear();
    }
}

impl EntityCollection for World {
    fn entity_count(&self) -> usize {
        self.entities.len()
    }

    fn entity_at_mut(&mut self, index: usize) -> Option<&mut Entity> {
        self.entities.get_index_mut(index).map(|(_, entity)| entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::Key;

    #[test]
    fn test_spawn_assigns_ids() {
        let mut world = World::new();
        let id = world.spawn(Entity::named("a"));

        assert!(!id.is_null());
        assert_eq!(world.get(id).map(Entity::id), Some(id));
        assert!(world.contains(id));
    }

    #[test]
    fn test_despawn_keeps_order() {
        let mut world = World::new();
        let a = world.spawn(Entity::named("a"));
        let b = world.spawn(Entity::named("b"));
        let _c = world.spawn(Entity::named("c"));

        let removed = world.despawn(b).unwrap();
        assert!(removed.id().is_null());
        assert!(world.despawn(b).is_none());

        let names: Vec<_> = world.iter().filter_map(Entity::name).collect();
        assert_eq!(names, vec!["a", "c"]);
        assert!(world.contains(a));
    }

    #[test]
    fn test_reused_slot_gets_new_id() {
        let mut world = World::new();
        let old = world.spawn(Entity::new());
        world.despawn(old);
        let new = world.spawn(Entity::new());

        assert_ne!(old, new);
        assert!(world.get(old).is_none());
    }

    #[test]
    fn test_query_and_find() {
        let mut world = World::new();
        world.spawn(Entity::named("rock").with("pos", 0u8));
        world.spawn(Entity::named("ball").with("pos", 0u8).with("velocity", 1u8));

        let moving: Vec<_> = world.query(&["pos", "velocity"]).filter_map(Entity::name).collect();
        assert_eq!(moving, vec!["ball"]);
        assert!(world.find_named("rock").is_some());
        assert!(world.find_named("paper").is_none());
    }

    #[test]
    fn test_collection_indexing() {
        let mut world = World::new();
        world.spawn(Entity::named("first"));

        assert_eq!(world.entity_count(), 1);
        assert_eq!(world.entity_at_mut(0).and_then(|e| e.name().map(str::to_owned)), Some("first".into()));
        assert!(world.entity_at_mut(1).is_none());
    }
}

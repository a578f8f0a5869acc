//! Generation-tagged storage for every live entity.

use barrage_core::{EntityId, EntityKind, PatternKind, Vec2};

use crate::collision::Aabb;

/// Attributes carried only by hostiles.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HostileAttributes {
    /// Remaining hit points; the hostile is destroyed at zero.
    pub hit_points: u32,
    /// Pattern fixed at spawn.
    pub pattern: PatternKind,
    /// One-way retreat flag.
    pub is_retreating: bool,
}

/// State stored for every pooled entity.
#[derive(Clone, Debug, PartialEq)]
pub struct Entity {
    /// Centre of the entity.
    pub position: Vec2,
    /// Velocity in units per second.
    pub velocity: Vec2,
    /// Size of the collision box centred on `position`. May be smaller or
    /// larger than whatever the presentation layer draws.
    pub hitbox: Vec2,
    /// Present for hostiles only.
    pub hostile: Option<HostileAttributes>,
}

impl Entity {
    /// Creates a motionless entity with an empty hitbox.
    #[must_use]
    pub fn at(position: Vec2) -> Self {
        Self {
            position,
            velocity: Vec2::ZERO,
            hitbox: Vec2::ZERO,
            hostile: None,
        }
    }

    /// Sets the velocity, builder style.
    #[must_use]
    pub fn with_velocity(mut self, velocity: Vec2) -> Self {
        self.velocity = velocity;
        self
    }

    /// Sets a square hitbox, builder style.
    #[must_use]
    pub fn with_hitbox(mut self, size: f32) -> Self {
        self.hitbox = Vec2::splat(size);
        self
    }

    /// Collision box in world space.
    #[must_use]
    pub fn bounds(&self) -> Aabb {
        Aabb::centered(self.position, self.hitbox)
    }
}

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    entity: Option<Entity>,
}

#[derive(Debug, Default)]
struct Collection {
    slots: Vec<Slot>,
    free: Vec<u32>,
    alive: usize,
}

impl Collection {
    fn insert(&mut self, kind: EntityKind, entity: Entity) -> EntityId {
        self.alive += 1;

        if let Some(index) = self.free.pop() {
            if let Some(slot) = self.slots.get_mut(index as usize) {
                slot.entity = Some(entity);
                return EntityId::new(kind, index, slot.generation);
            }
        }

        let index = u32::try_from(self.slots.len()).unwrap_or(u32::MAX);
        self.slots.push(Slot {
            generation: 0,
            entity: Some(entity),
        });
        EntityId::new(kind, index, 0)
    }

    fn slot(&self, id: EntityId) -> Option<&Slot> {
        self.slots
            .get(id.index() as usize)
            .filter(|slot| slot.generation == id.generation())
    }

    fn slot_mut(&mut self, id: EntityId) -> Option<&mut Slot> {
        self.slots
            .get_mut(id.index() as usize)
            .filter(|slot| slot.generation == id.generation())
    }

    fn remove(&mut self, id: EntityId) -> Option<Entity> {
        let slot = self.slot_mut(id)?;
        let entity = slot.entity.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index());
        self.alive -= 1;
        Some(entity)
    }

    fn ids(&self, kind: EntityKind) -> Vec<EntityId> {
        self.iter(kind).map(|(id, _)| id).collect()
    }

    fn iter(&self, kind: EntityKind) -> impl Iterator<Item = (EntityId, &Entity)> {
        self.slots.iter().enumerate().filter_map(move |(index, slot)| {
            let entity = slot.entity.as_ref()?;
            let index = u32::try_from(index).ok()?;
            Some((EntityId::new(kind, index, slot.generation), entity))
        })
    }

    fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.slots.iter_mut().filter_map(|slot| slot.entity.as_mut())
    }
}

/// Owns the live collections of every [`EntityKind`].
///
/// The pool is pure lifecycle bookkeeping: spawning never fails, destroying is
/// idempotent, and handles carry the slot generation so that a handle held
/// past its entity's death never resolves again.
#[derive(Debug, Default)]
pub struct EntityPool {
    collections: [Collection; 5],
}

impl EntityPool {
    /// Creates an empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns a motionless entity of `kind` at `position`.
    pub fn spawn(&mut self, kind: EntityKind, position: Vec2) -> EntityId {
        self.insert(kind, Entity::at(position))
    }

    /// Spawns a fully described entity of `kind`.
    pub fn insert(&mut self, kind: EntityKind, entity: Entity) -> EntityId {
        self.collection_mut(kind).insert(kind, entity)
    }

    /// Destroys an entity. Returns whether a live entity was removed.
    ///
    /// Destroying a handle that is already dead changes nothing, so several
    /// owners may race to destroy the same entity.
    pub fn destroy(&mut self, id: EntityId) -> bool {
        self.take(id).is_some()
    }

    /// Destroys an entity and hands back its final state.
    pub fn take(&mut self, id: EntityId) -> Option<Entity> {
        self.collection_mut(id.kind()).remove(id)
    }

    /// Reports whether the handle refers to a live entity.
    #[must_use]
    pub fn is_alive(&self, id: EntityId) -> bool {
        self.get(id).is_some()
    }

    /// Resolves a handle to its live entity.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.collection(id.kind())
            .slot(id)
            .and_then(|slot| slot.entity.as_ref())
    }

    /// Resolves a handle to its live entity for mutation.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.collection_mut(id.kind())
            .slot_mut(id)
            .and_then(|slot| slot.entity.as_mut())
    }

    /// Number of live entities of `kind`.
    #[must_use]
    pub fn count_alive(&self, kind: EntityKind) -> usize {
        self.collection(kind).alive
    }

    /// Handles of the live entities of `kind` in slot order.
    #[must_use]
    pub fn ids(&self, kind: EntityKind) -> Vec<EntityId> {
        self.collection(kind).ids(kind)
    }

    /// Iterates the live entities of `kind` in slot order.
    pub fn iter(&self, kind: EntityKind) -> impl Iterator<Item = (EntityId, &Entity)> {
        self.collection(kind).iter(kind)
    }

    /// Iterates the live entities of `kind` mutably in slot order.
    pub fn iter_mut(&mut self, kind: EntityKind) -> impl Iterator<Item = &mut Entity> {
        self.collection_mut(kind).iter_mut()
    }

    /// Visits every entity of `kind` that was alive when the call started.
    ///
    /// The visitor receives the pool itself and may spawn or destroy freely.
    /// Entities destroyed during the walk are skipped once reached, and
    /// entities spawned during the walk are not visited.
    pub fn for_each_alive<F>(&mut self, kind: EntityKind, mut visit: F)
    where
        F: FnMut(&mut EntityPool, EntityId),
    {
        for id in self.ids(kind) {
            if self.is_alive(id) {
                visit(self, id);
            }
        }
    }

    fn collection(&self, kind: EntityKind) -> &Collection {
        &self.collections[slot_of(kind)]
    }

    fn collection_mut(&mut self, kind: EntityKind) -> &mut Collection {
        &mut self.collections[slot_of(kind)]
    }
}

const fn slot_of(kind: EntityKind) -> usize {
    match kind {
        EntityKind::Player => 0,
        EntityKind::PlayerBullet => 1,
        EntityKind::Hostile => 2,
        EntityKind::HostileBullet => 3,
        EntityKind::Pickup => 4,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn destroy_is_idempotent() {
        let mut pool = EntityPool::new();
        let id = pool.spawn(EntityKind::Hostile, Vec2::new(10.0, 20.0));

        assert!(pool.destroy(id));
        assert!(!pool.destroy(id));
        assert_eq!(pool.count_alive(EntityKind::Hostile), 0);
    }

    #[test]
    fn recycled_slots_reject_stale_handles() {
        let mut pool = EntityPool::new();
        let first = pool.spawn(EntityKind::HostileBullet, Vec2::ZERO);
        let _ = pool.destroy(first);
        let second = pool.spawn(EntityKind::HostileBullet, Vec2::ONE);

        assert_eq!(first.index(), second.index(), "slot is reused");
        assert_ne!(first.generation(), second.generation());
        assert!(!pool.is_alive(first));
        assert!(pool.get(first).is_none());
        assert!(!pool.destroy(first), "stale destroy spares the new occupant");
        assert!(pool.is_alive(second));
    }

    #[test]
    fn kinds_are_counted_independently() {
        let mut pool = EntityPool::new();
        let _ = pool.spawn(EntityKind::Hostile, Vec2::ZERO);
        let _ = pool.spawn(EntityKind::Hostile, Vec2::ZERO);
        let _ = pool.spawn(EntityKind::Pickup, Vec2::ZERO);

        assert_eq!(pool.count_alive(EntityKind::Hostile), 2);
        assert_eq!(pool.count_alive(EntityKind::Pickup), 1);
        assert_eq!(pool.count_alive(EntityKind::PlayerBullet), 0);
    }

    #[test]
    fn for_each_alive_skips_entities_destroyed_mid_walk() {
        let mut pool = EntityPool::new();
        let ids: Vec<EntityId> = (0..4)
            .map(|step| pool.spawn(EntityKind::Hostile, Vec2::new(step as f32, 0.0)))
            .collect();

        let mut visited = Vec::new();
        pool.for_each_alive(EntityKind::Hostile, |pool, id| {
            visited.push(id);
            if id == ids[0] {
                let _ = pool.destroy(ids[2]);
                let _ = pool.spawn(EntityKind::Hostile, Vec2::ZERO);
            }
        });

        assert_eq!(visited, vec![ids[0], ids[1], ids[3]]);
        assert_eq!(pool.count_alive(EntityKind::Hostile), 4);
    }
}

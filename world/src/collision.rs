//! Axis-aligned overlap tests between entity collections.

use barrage_core::{EntityId, EntityKind, Vec2};

use crate::pool::EntityPool;

/// Axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    min: Vec2,
    max: Vec2,
}

impl Aabb {
    /// Creates a box of `size` centred on `center`.
    #[must_use]
    pub fn centered(center: Vec2, size: Vec2) -> Self {
        let half = size * 0.5;
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// Lower corner.
    #[must_use]
    pub const fn min(&self) -> Vec2 {
        self.min
    }

    /// Upper corner.
    #[must_use]
    pub const fn max(&self) -> Vec2 {
        self.max
    }

    /// Reports whether the boxes share interior area. Touching edges do not overlap.
    #[must_use]
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.x < other.max.x
            && other.min.x < self.max.x
            && self.min.y < other.max.y
            && other.min.y < self.max.y
    }
}

/// Collects every overlapping `(first, second)` pair between two kinds.
///
/// Pairs are ordered by the slot order of `first`, then `second`. The result
/// is a snapshot; callers resolving the pairs must re-check aliveness since an
/// entity may take part in several pairs.
#[must_use]
pub fn overlapping_pairs(
    pool: &EntityPool,
    first: EntityKind,
    second: EntityKind,
) -> Vec<(EntityId, EntityId)> {
    let targets: Vec<(EntityId, Aabb)> = pool
        .iter(second)
        .map(|(id, entity)| (id, entity.bounds()))
        .collect();

    let mut pairs = Vec::new();
    for (id, entity) in pool.iter(first) {
        let bounds = entity.bounds();
        pairs.extend(
            targets
                .iter()
                .filter(|(_, target)| bounds.overlaps(target))
                .map(|(target, _)| (id, *target)),
        );
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::Entity;

    #[test]
    fn touching_edges_do_not_overlap() {
        let left = Aabb::centered(Vec2::new(0.0, 0.0), Vec2::splat(10.0));
        let right = Aabb::centered(Vec2::new(10.0, 0.0), Vec2::splat(10.0));
        let inside = Aabb::centered(Vec2::new(9.0, 9.0), Vec2::splat(10.0));

        assert!(!left.overlaps(&right));
        assert!(left.overlaps(&inside));
        assert!(inside.overlaps(&left));
    }

    #[test]
    fn pairs_follow_slot_order() {
        let mut pool = EntityPool::new();
        let near = pool.insert(
            EntityKind::PlayerBullet,
            Entity::at(Vec2::new(100.0, 100.0)).with_hitbox(8.0),
        );
        let _far = pool.insert(
            EntityKind::PlayerBullet,
            Entity::at(Vec2::new(500.0, 100.0)).with_hitbox(8.0),
        );
        let first = pool.insert(
            EntityKind::Hostile,
            Entity::at(Vec2::new(104.0, 100.0)).with_hitbox(16.0),
        );
        let second = pool.insert(
            EntityKind::Hostile,
            Entity::at(Vec2::new(96.0, 104.0)).with_hitbox(16.0),
        );

        let pairs = overlapping_pairs(&pool, EntityKind::PlayerBullet, EntityKind::Hostile);

        assert_eq!(pairs, vec![(near, first), (near, second)]);
    }
}

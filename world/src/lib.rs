#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state for barrage encounters.
//!
//! The world owns every entity and applies the physical rules of the
//! playfield: integration, retirement past the edges, overlap resolution and
//! power progression. It never decides *when* anything happens; systems do
//! that by emitting [`Command`]s, and the world reports back through
//! [`Event`]s.

mod collision;
mod player;
mod pool;

use std::time::Duration;

use barrage_core::{
    Command, DestroyCause, EncounterConfig, EntityId, EntityKind, Event, HostileTuning,
    PatternKind, PickupTuning, PlayerTuning, PlayfieldTuning, Vec2,
};
use tracing::debug;

pub use collision::{overlapping_pairs, Aabb};
pub use player::PowerProgress;
pub use pool::{Entity, EntityPool, HostileAttributes};

use player::{HitOutcome, PlayerStats};

/// Represents the authoritative encounter world.
#[derive(Debug)]
pub struct World {
    playfield: PlayfieldTuning,
    player_tuning: PlayerTuning,
    hostile_tuning: HostileTuning,
    pickup_tuning: PickupTuning,
    pool: EntityPool,
    player: EntityId,
    stats: PlayerStats,
    tick_index: u64,
}

impl World {
    /// Creates a world holding only the player, placed at its start position.
    #[must_use]
    pub fn new(config: &EncounterConfig) -> Self {
        let mut pool = EntityPool::new();
        let tuning = &config.player;
        let player = pool.insert(
            EntityKind::Player,
            Entity::at(Vec2::new(tuning.start_x, tuning.start_y)).with_hitbox(tuning.hitbox_size),
        );

        Self {
            playfield: config.playfield.clone(),
            player_tuning: config.player.clone(),
            hostile_tuning: config.hostile.clone(),
            pickup_tuning: config.pickup.clone(),
            pool,
            player,
            stats: PlayerStats::new(tuning),
            tick_index: 0,
        }
    }

    fn integrate(&mut self, dt: Duration) {
        let seconds = dt.as_secs_f32();
        for kind in EntityKind::ALL {
            for entity in self.pool.iter_mut(kind) {
                entity.position += entity.velocity * seconds;
            }
        }

        let half = self.player_tuning.half_extent;
        let max = Vec2::new(self.playfield.width - half, self.playfield.height - half)
            .max(Vec2::splat(half));
        if let Some(player) = self.pool.get_mut(self.player) {
            player.position = player.position.clamp(Vec2::splat(half), max);
        }
    }

    fn resolve_overlaps(&mut self, out_events: &mut Vec<Event>) {
        self.resolve_hostile_hits(out_events);
        self.resolve_player_hits(out_events);
        self.resolve_pickups(out_events);
    }

    fn resolve_hostile_hits(&mut self, out_events: &mut Vec<Event>) {
        for (bullet, hostile) in
            overlapping_pairs(&self.pool, EntityKind::PlayerBullet, EntityKind::Hostile)
        {
            if !self.pool.is_alive(bullet) || !self.pool.is_alive(hostile) {
                continue;
            }
            let _ = self.pool.destroy(bullet);

            let Some(entity) = self.pool.get_mut(hostile) else {
                continue;
            };
            let position = entity.position;
            let Some(attributes) = entity.hostile.as_mut() else {
                continue;
            };
            attributes.hit_points = attributes.hit_points.saturating_sub(1);

            if attributes.hit_points > 0 {
                out_events.push(Event::HostileDamaged {
                    hostile,
                    hit_points: attributes.hit_points,
                });
                continue;
            }

            let _ = self.pool.destroy(hostile);
            debug!(hostile = ?hostile, x = position.x, y = position.y, "hostile killed");
            out_events.push(Event::HostileDestroyed {
                hostile,
                cause: DestroyCause::Killed,
            });

            let pickup = self.pool.insert(
                EntityKind::Pickup,
                Entity::at(position)
                    .with_velocity(Vec2::new(0.0, self.pickup_tuning.fall_speed))
                    .with_hitbox(self.pickup_tuning.hitbox_size),
            );
            out_events.push(Event::PickupSpawned { pickup, position });
        }
    }

    fn resolve_player_hits(&mut self, out_events: &mut Vec<Event>) {
        for (player, bullet) in
            overlapping_pairs(&self.pool, EntityKind::Player, EntityKind::HostileBullet)
        {
            if self.stats.is_defeated() {
                return;
            }
            if player != self.player || !self.pool.destroy(bullet) {
                continue;
            }

            match self.stats.take_hit() {
                HitOutcome::Damaged { hit_points } => {
                    out_events.push(Event::PlayerDamaged { hit_points });
                }
                HitOutcome::Defeated { hit_points } => {
                    debug!(tick = self.tick_index, "player defeated");
                    out_events.push(Event::PlayerDamaged { hit_points });
                    out_events.push(Event::PlayerDefeated);
                }
                HitOutcome::AlreadyDefeated => {}
            }
        }
    }

    fn resolve_pickups(&mut self, out_events: &mut Vec<Event>) {
        let pairs = overlapping_pairs(&self.pool, EntityKind::Player, EntityKind::Pickup);
        for (player, pickup) in pairs {
            if player != self.player || !self.pool.destroy(pickup) {
                continue;
            }

            let progress = self
                .stats
                .collect(&self.player_tuning, self.pickup_tuning.value);
            out_events.push(Event::PickupCollected { pickup });
            out_events.push(Event::PowerChanged {
                level: progress.level,
                score: progress.score,
                threshold: progress.threshold,
            });
        }
    }

    fn retire_escaped(&mut self, out_events: &mut Vec<Event>) {
        let width = self.playfield.width;
        let height = self.playfield.height;
        let margin = self.playfield.exit_margin;

        self.pool
            .for_each_alive(EntityKind::PlayerBullet, |pool, bullet| {
                if pool.get(bullet).is_some_and(|entity| entity.position.y < 0.0) {
                    let _ = pool.destroy(bullet);
                }
            });

        self.pool.for_each_alive(EntityKind::Hostile, |pool, hostile| {
            let escaped = pool.get(hostile).is_some_and(|entity| {
                entity.position.y > height + margin || entity.position.y < -margin
            });
            if escaped && pool.destroy(hostile) {
                out_events.push(Event::HostileDestroyed {
                    hostile,
                    cause: DestroyCause::LeftPlayfield,
                });
            }
        });

        let field = Aabb::centered(
            Vec2::new(width * 0.5, height * 0.5),
            Vec2::new(width + 2.0 * margin, height + 2.0 * margin),
        );
        self.pool
            .for_each_alive(EntityKind::HostileBullet, |pool, bullet| {
                let inside = pool.get(bullet).is_some_and(|entity| {
                    let position = entity.position;
                    position.cmpge(field.min()).all() && position.cmple(field.max()).all()
                });
                if !inside {
                    let _ = pool.destroy(bullet);
                }
            });

        self.pool.for_each_alive(EntityKind::Pickup, |pool, pickup| {
            if pool.get(pickup).is_some_and(|entity| entity.position.y > height) {
                let _ = pool.destroy(pickup);
            }
        });
    }

    fn spawn_hostile(&mut self, pattern: PatternKind, position: Vec2) -> EntityId {
        let tuning = &self.hostile_tuning;
        let mut entity = Entity::at(position)
            .with_velocity(Vec2::new(0.0, tuning.descent_speed))
            .with_hitbox(tuning.hitbox_size);
        entity.hostile = Some(HostileAttributes {
            hit_points: tuning.hit_points,
            pattern,
            is_retreating: false,
        });
        self.pool.insert(EntityKind::Hostile, entity)
    }

    fn fire_player_volley(&mut self) -> Option<u32> {
        if self.stats.is_defeated() {
            return None;
        }
        let origin = self.pool.get(self.player)?.position;
        let tuning = &self.player_tuning;
        let columns = self.stats.power.max(1);
        let start_x = origin.x - (columns - 1) as f32 * tuning.column_spacing / 2.0;
        let y = origin.y - tuning.muzzle_offset;

        for column in 0..columns {
            let position = Vec2::new(start_x + column as f32 * tuning.column_spacing, y);
            let _ = self.pool.insert(
                EntityKind::PlayerBullet,
                Entity::at(position)
                    .with_velocity(Vec2::new(0.0, -tuning.bullet_speed))
                    .with_hitbox(tuning.bullet_hitbox_size),
            );
        }
        Some(columns)
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::Tick { dt } => {
            world.tick_index = world.tick_index.saturating_add(1);
            out_events.push(Event::TimeAdvanced { dt });

            world.integrate(dt);
            world.resolve_overlaps(out_events);
            world.retire_escaped(out_events);
        }
        Command::SpawnHostile { pattern, position } => {
            let hostile = world.spawn_hostile(pattern, position);
            out_events.push(Event::HostileSpawned {
                hostile,
                pattern,
                position,
            });
        }
        Command::SetHostileVelocity { hostile, velocity } => {
            if let Some(entity) = world.pool.get_mut(hostile) {
                if entity.hostile.is_some_and(|attributes| !attributes.is_retreating) {
                    entity.velocity = velocity;
                }
            }
        }
        Command::RetreatHostile { hostile } => {
            let retreat_speed = world.hostile_tuning.retreat_speed;
            let Some(entity) = world.pool.get_mut(hostile) else {
                return;
            };
            let Some(attributes) = entity.hostile.as_mut() else {
                return;
            };
            if attributes.is_retreating {
                return;
            }
            attributes.is_retreating = true;
            entity.velocity = Vec2::new(0.0, -retreat_speed);
            out_events.push(Event::HostileRetreating { hostile });
        }
        Command::FireHostileBullet { hostile, velocity } => {
            let Some(entity) = world.pool.get(hostile) else {
                return;
            };
            if entity.hostile.map_or(true, |attributes| attributes.is_retreating) {
                return;
            }
            let tuning = &world.hostile_tuning;
            let origin = entity.position + Vec2::new(0.0, tuning.muzzle_offset);
            let bullet = world.pool.insert(
                EntityKind::HostileBullet,
                Entity::at(origin)
                    .with_velocity(velocity)
                    .with_hitbox(tuning.bullet_hitbox_size),
            );
            out_events.push(Event::HostileBulletFired {
                bullet,
                hostile,
                velocity,
            });
        }
        Command::SteerPlayer { velocity } => {
            if let Some(player) = world.pool.get_mut(world.player) {
                player.velocity = velocity;
            }
        }
        Command::FirePlayerVolley => {
            if let Some(columns) = world.fire_player_volley() {
                out_events.push(Event::PlayerVolleyFired { columns });
            }
        }
        Command::Destroy { entity } => {
            if world.pool.destroy(entity) && entity.kind() == EntityKind::Hostile {
                out_events.push(Event::HostileDestroyed {
                    hostile: entity,
                    cause: DestroyCause::Removed,
                });
            }
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use barrage_core::{
        EntityId, EntityKind, HostileSnapshot, HostileView, PlayerSnapshot, PlayfieldTuning, Vec2,
    };

    use super::{PowerProgress, World};

    /// Captures a read-only view of the live hostiles.
    #[must_use]
    pub fn hostile_view(world: &World) -> HostileView {
        let snapshots = world
            .pool
            .iter(EntityKind::Hostile)
            .filter_map(|(id, entity)| {
                let attributes = entity.hostile?;
                Some(HostileSnapshot {
                    id,
                    position: entity.position,
                    velocity: entity.velocity,
                    hit_points: attributes.hit_points,
                    pattern: attributes.pattern,
                    is_retreating: attributes.is_retreating,
                })
            })
            .collect();
        HostileView::from_snapshots(snapshots)
    }

    /// Captures the player, or `None` once the player entity was removed.
    #[must_use]
    pub fn player(world: &World) -> Option<PlayerSnapshot> {
        let entity = world.pool.get(world.player)?;
        Some(PlayerSnapshot {
            id: world.player,
            position: entity.position,
            hit_points: world.stats.hit_points,
            power: world.stats.power,
            power_score: world.stats.power_score,
        })
    }

    /// Reports the player's power level, score and current threshold.
    #[must_use]
    pub fn power_progress(world: &World) -> PowerProgress {
        world.stats.progress(&world.player_tuning)
    }

    /// Reports whether the player ran out of hit points.
    #[must_use]
    pub fn is_player_defeated(world: &World) -> bool {
        world.stats.is_defeated()
    }

    /// Number of live entities of `kind`.
    #[must_use]
    pub fn count_alive(world: &World, kind: EntityKind) -> usize {
        world.pool.count_alive(kind)
    }

    /// Positions of the live entities of `kind` in slot order.
    #[must_use]
    pub fn positions(world: &World, kind: EntityKind) -> Vec<(EntityId, Vec2)> {
        world
            .pool
            .iter(kind)
            .map(|(id, entity)| (id, entity.position))
            .collect()
    }

    /// Playfield dimensions the world was built with.
    #[must_use]
    pub fn playfield(world: &World) -> &PlayfieldTuning {
        &world.playfield
    }

    /// Number of ticks processed so far.
    #[must_use]
    pub fn tick_index(world: &World) -> u64 {
        world.tick_index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tick(world: &mut World, millis: u64) -> Vec<Event> {
        let mut events = Vec::new();
        apply(
            world,
            Command::Tick {
                dt: Duration::from_millis(millis),
            },
            &mut events,
        );
        events
    }

    fn spawn(world: &mut World, pattern: PatternKind, position: Vec2) -> EntityId {
        let mut events = Vec::new();
        apply(world, Command::SpawnHostile { pattern, position }, &mut events);
        match events.as_slice() {
            [Event::HostileSpawned { hostile, .. }] => *hostile,
            other => panic!("unexpected spawn events: {other:?}"),
        }
    }

    #[test]
    fn hostiles_spawn_descending_with_full_hit_points() {
        let mut world = World::new(&EncounterConfig::default());
        let hostile = spawn(&mut world, PatternKind::Normal, Vec2::new(200.0, -32.0));

        let view = query::hostile_view(&world);
        let snapshot = view.get(hostile).expect("hostile is in the view");
        assert_eq!(snapshot.velocity, Vec2::new(0.0, 60.0));
        assert_eq!(snapshot.hit_points, 2);
        assert!(!snapshot.is_retreating);
    }

    #[test]
    fn retreat_is_one_way_and_reported_once() {
        let mut world = World::new(&EncounterConfig::default());
        let hostile = spawn(&mut world, PatternKind::Normal, Vec2::new(200.0, 100.0));
        let mut events = Vec::new();

        apply(&mut world, Command::RetreatHostile { hostile }, &mut events);
        apply(&mut world, Command::RetreatHostile { hostile }, &mut events);
        apply(
            &mut world,
            Command::SetHostileVelocity {
                hostile,
                velocity: Vec2::ZERO,
            },
            &mut events,
        );
        apply(
            &mut world,
            Command::FireHostileBullet {
                hostile,
                velocity: Vec2::new(0.0, 200.0),
            },
            &mut events,
        );

        assert_eq!(events, vec![Event::HostileRetreating { hostile }]);
        let view = query::hostile_view(&world);
        assert_eq!(view.get(hostile).map(|h| h.velocity), Some(Vec2::new(0.0, -100.0)));
    }

    #[test]
    fn hostile_bullets_appear_below_the_muzzle() {
        let mut world = World::new(&EncounterConfig::default());
        let hostile = spawn(&mut world, PatternKind::Normal, Vec2::new(200.0, 100.0));
        let mut events = Vec::new();

        apply(
            &mut world,
            Command::FireHostileBullet {
                hostile,
                velocity: Vec2::new(0.0, 200.0),
            },
            &mut events,
        );

        let bullets = query::positions(&world, EntityKind::HostileBullet);
        assert_eq!(bullets.len(), 1);
        assert_eq!(bullets[0].1, Vec2::new(200.0, 120.0));
    }

    #[test]
    fn hostiles_leaving_the_bottom_edge_are_retired() {
        let mut world = World::new(&EncounterConfig::default());
        let hostile = spawn(&mut world, PatternKind::Normal, Vec2::new(200.0, 630.0));

        let events = tick(&mut world, 100);

        assert!(events.contains(&Event::HostileDestroyed {
            hostile,
            cause: DestroyCause::LeftPlayfield,
        }));
        assert_eq!(query::count_alive(&world, EntityKind::Hostile), 0);
    }

    #[test]
    fn two_volleys_kill_a_hostile_and_drop_a_pickup() {
        let mut world = World::new(&EncounterConfig::default());
        let hostile = spawn(&mut world, PatternKind::Normal, Vec2::new(400.0, 500.0));
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::SetHostileVelocity {
                hostile,
                velocity: Vec2::ZERO,
            },
            &mut events,
        );

        let mut log = Vec::new();
        for _ in 0..2 {
            apply(&mut world, Command::FirePlayerVolley, &mut log);
            for _ in 0..3 {
                log.extend(tick(&mut world, 50));
            }
        }

        assert!(log.contains(&Event::HostileDamaged {
            hostile,
            hit_points: 1,
        }));
        assert!(log.contains(&Event::HostileDestroyed {
            hostile,
            cause: DestroyCause::Killed,
        }));
        assert!(log
            .iter()
            .any(|event| matches!(event, Event::PickupSpawned { .. })));
        assert_eq!(query::count_alive(&world, EntityKind::Hostile), 0);
    }

    #[test]
    fn volley_width_matches_power_level() {
        let mut world = World::new(&EncounterConfig::default());
        world.stats.power = 3;
        let mut events = Vec::new();

        apply(&mut world, Command::FirePlayerVolley, &mut events);

        assert_eq!(events, vec![Event::PlayerVolleyFired { columns: 3 }]);
        let xs: Vec<f32> = query::positions(&world, EntityKind::PlayerBullet)
            .into_iter()
            .map(|(_, position)| position.x)
            .collect();
        assert_eq!(xs, vec![388.0, 400.0, 412.0]);
    }

    #[test]
    fn player_is_clamped_inside_the_playfield() {
        let mut world = World::new(&EncounterConfig::default());
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::SteerPlayer {
                velocity: Vec2::new(-200.0, 200.0),
            },
            &mut events,
        );

        for _ in 0..40 {
            let _ = tick(&mut world, 100);
        }

        let player = query::player(&world).expect("player exists");
        assert_eq!(player.position, Vec2::new(16.0, 584.0));
    }

    #[test]
    fn destroy_command_reports_removed_hostiles_once() {
        let mut world = World::new(&EncounterConfig::default());
        let hostile = spawn(&mut world, PatternKind::aim(2, 2), Vec2::new(200.0, 100.0));
        let mut events = Vec::new();

        apply(&mut world, Command::Destroy { entity: hostile }, &mut events);
        apply(&mut world, Command::Destroy { entity: hostile }, &mut events);

        assert_eq!(
            events,
            vec![Event::HostileDestroyed {
                hostile,
                cause: DestroyCause::Removed,
            }]
        );
    }
}

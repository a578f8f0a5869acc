#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Barrage encounter engine.
//!
//! This crate defines the message surface that connects the runtime, the
//! authoritative world, and pure systems. Systems submit [`Command`] values
//! describing desired mutations, the world executes those commands via its
//! `apply` entry point, and then broadcasts [`Event`] values for systems to
//! react to deterministically. Systems consume event streams, query immutable
//! views such as [`HostileView`], and respond exclusively with new command
//! batches. Values crossing the boundary to a presentation layer are limited
//! to [`Notification`] (outbound), [`OperatorCommand`] and [`FrameInput`]
//! (inbound).

mod pattern;
mod tuning;

use std::time::Duration;

pub use glam::Vec2;
use serde::{Deserialize, Serialize};

pub use pattern::{PatternKind, PatternParseError, BASE_DIRECTIONS, MAX_DIRECTION_MULTIPLIER};
pub use tuning::{
    AimTuning, DirectorTuning, EncounterConfig, HostileTuning, MultiTuning, NormalTuning,
    PatternTuning, PickupTuning, PlayerTuning, PlayfieldTuning, Roster, SpawnGroup,
    StageDefinition,
};

/// Collections owned by the entity pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    /// The player ship.
    Player,
    /// Bullets fired by the player.
    PlayerBullet,
    /// Enemy units driven by attack patterns.
    Hostile,
    /// Bullets fired by hostiles.
    HostileBullet,
    /// Power points dropped by killed hostiles.
    Pickup,
}

impl EntityKind {
    /// Every kind in pool order.
    pub const ALL: [EntityKind; 5] = [
        EntityKind::Player,
        EntityKind::PlayerBullet,
        EntityKind::Hostile,
        EntityKind::HostileBullet,
        EntityKind::Pickup,
    ];
}

/// Generation-tagged handle to a pooled entity.
///
/// Slots are recycled after destruction with a bumped generation, so a handle
/// kept past its entity's death never resolves to the slot's next occupant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId {
    kind: EntityKind,
    index: u32,
    generation: u32,
}

impl EntityId {
    /// Creates a handle from its raw parts.
    #[must_use]
    pub const fn new(kind: EntityKind, index: u32, generation: u32) -> Self {
        Self {
            kind,
            index,
            generation,
        }
    }

    /// Collection the entity belongs to.
    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Slot index inside the collection.
    #[must_use]
    pub const fn index(&self) -> u32 {
        self.index
    }

    /// Generation of the slot when the handle was issued.
    #[must_use]
    pub const fn generation(&self) -> u32 {
        self.generation
    }
}

/// Why a hostile left the pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DestroyCause {
    /// Hit points dropped to zero.
    Killed,
    /// Travelled past the vertical playfield bounds.
    LeftPlayfield,
    /// Removed by an explicit destroy command.
    Removed,
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Materialises a hostile carrying the provided pattern.
    SpawnHostile {
        /// Pattern the hostile keeps for its whole lifetime.
        pattern: PatternKind,
        /// Spawn position.
        position: Vec2,
    },
    /// Overrides a hostile's velocity; ignored for dead or retreating hostiles.
    SetHostileVelocity {
        /// Hostile to steer.
        hostile: EntityId,
        /// New velocity in units per second.
        velocity: Vec2,
    },
    /// Switches a hostile into its one-way retreat.
    RetreatHostile {
        /// Hostile that stops attacking.
        hostile: EntityId,
    },
    /// Fires one bullet from a hostile's muzzle; ignored when the hostile is gone.
    FireHostileBullet {
        /// Hostile firing the bullet.
        hostile: EntityId,
        /// Bullet velocity in units per second.
        velocity: Vec2,
    },
    /// Sets the player's velocity for the coming ticks.
    SteerPlayer {
        /// New velocity in units per second.
        velocity: Vec2,
    },
    /// Fires one bullet per power level from the player.
    FirePlayerVolley,
    /// Removes an entity; destroying a dead handle is a no-op.
    Destroy {
        /// Entity to remove.
        entity: EntityId,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Confirms that a hostile entered the pool.
    HostileSpawned {
        /// Handle of the new hostile.
        hostile: EntityId,
        /// Pattern assigned at spawn.
        pattern: PatternKind,
        /// Spawn position.
        position: Vec2,
    },
    /// Confirms that a hostile began its retreat.
    HostileRetreating {
        /// Hostile that turned back.
        hostile: EntityId,
    },
    /// Reports that a hostile lost hit points without dying.
    HostileDamaged {
        /// Hostile that was hit.
        hostile: EntityId,
        /// Remaining hit points.
        hit_points: u32,
    },
    /// Confirms that a hostile left the pool.
    HostileDestroyed {
        /// Handle of the removed hostile.
        hostile: EntityId,
        /// Reason for the removal.
        cause: DestroyCause,
    },
    /// Confirms that a hostile fired a bullet.
    HostileBulletFired {
        /// Handle of the new bullet.
        bullet: EntityId,
        /// Hostile that fired it.
        hostile: EntityId,
        /// Bullet velocity.
        velocity: Vec2,
    },
    /// Confirms that the player fired a volley.
    PlayerVolleyFired {
        /// Number of bullet columns in the volley.
        columns: u32,
    },
    /// Reports that the player was hit.
    PlayerDamaged {
        /// Remaining hit points.
        hit_points: u32,
    },
    /// Reports that the player ran out of hit points. Emitted once.
    PlayerDefeated,
    /// Confirms that a power point dropped.
    PickupSpawned {
        /// Handle of the new pickup.
        pickup: EntityId,
        /// Drop position.
        position: Vec2,
    },
    /// Reports that the player collected a power point.
    PickupCollected {
        /// Handle of the collected pickup.
        pickup: EntityId,
    },
    /// Reports the player's power progression after a pickup.
    PowerChanged {
        /// Current power level.
        level: u32,
        /// Score accumulated towards the next level.
        score: u32,
        /// Score required to leave the current level.
        threshold: u32,
    },
}

/// Outbound notifications consumed by a presentation layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Notification {
    /// Player hit points changed.
    HpChanged {
        /// Remaining hit points.
        value: u32,
    },
    /// Player power progression changed.
    PowerChanged {
        /// Current power level.
        level: u32,
        /// Score accumulated towards the next level.
        score: u32,
        /// Score required to leave the current level.
        threshold: u32,
    },
    /// The active stage changed; `current` is zero before the encounter starts.
    StageChanged {
        /// Active stage number.
        current: u32,
        /// Highest stage number.
        max: u32,
    },
    /// The active stage is clear and another stage remains.
    StageReadyToAdvance,
    /// The final stage is clear.
    AllStagesCleared,
    /// The player was defeated; the encounter stops advancing.
    GameOver,
    /// The auto-fire toggle changed.
    AutoFireChanged {
        /// Whether the auto-fire timer is running.
        enabled: bool,
    },
}

/// Operator commands accepted by the encounter runtime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperatorCommand {
    /// Starts stage one.
    Start,
    /// Starts the next stage once the current one is clear.
    AdvanceStage,
    /// Freezes the simulation.
    Pause,
    /// Resumes a paused simulation.
    Resume,
    /// Discards all state and returns to the pre-start phase.
    Restart,
    /// Jumps straight to a stage; out-of-range numbers are ignored.
    JumpToStage {
        /// One-based stage number.
        stage: u32,
    },
}

/// Input snapshot gathered by adapters before stepping the encounter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameInput {
    /// Move left is held.
    pub left: bool,
    /// Move right is held.
    pub right: bool,
    /// Move up is held.
    pub up: bool,
    /// Move down is held.
    pub down: bool,
    /// Slow-mode modifier is held.
    pub slow: bool,
    /// Manual fire trigger is held.
    pub fire: bool,
    /// Auto-fire toggle was pressed on this frame.
    pub toggle_auto_fire: bool,
}

/// Immutable representation of a single hostile used for queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HostileSnapshot {
    /// Handle of the hostile.
    pub id: EntityId,
    /// Current position.
    pub position: Vec2,
    /// Current velocity.
    pub velocity: Vec2,
    /// Remaining hit points.
    pub hit_points: u32,
    /// Pattern assigned at spawn.
    pub pattern: PatternKind,
    /// Whether the hostile has started its retreat.
    pub is_retreating: bool,
}

/// Read-only snapshot describing all live hostiles.
#[derive(Clone, Debug, Default)]
pub struct HostileView {
    snapshots: Vec<HostileSnapshot>,
}

impl HostileView {
    /// Creates a new hostile view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<HostileSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &HostileSnapshot> {
        self.snapshots.iter()
    }

    /// Returns the snapshot of a live hostile; stale handles resolve to `None`.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&HostileSnapshot> {
        self.snapshots
            .binary_search_by_key(&id, |snapshot| snapshot.id)
            .ok()
            .map(|index| &self.snapshots[index])
    }

    /// Number of live hostiles captured by the view.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether no hostile is alive.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

/// Immutable representation of the player used for queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlayerSnapshot {
    /// Handle of the player entity.
    pub id: EntityId,
    /// Current position.
    pub position: Vec2,
    /// Remaining hit points.
    pub hit_points: u32,
    /// Current power level, equal to the number of bullet columns.
    pub power: u32,
    /// Score accumulated towards the next level.
    pub power_score: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(index: u32, generation: u32) -> HostileSnapshot {
        HostileSnapshot {
            id: EntityId::new(EntityKind::Hostile, index, generation),
            position: Vec2::ZERO,
            velocity: Vec2::ZERO,
            hit_points: 1,
            pattern: PatternKind::Normal,
            is_retreating: false,
        }
    }

    #[test]
    fn hostile_view_orders_snapshots_by_id() {
        let view = HostileView::from_snapshots(vec![snapshot(3, 0), snapshot(1, 0)]);
        let indices: Vec<u32> = view.iter().map(|snapshot| snapshot.id.index()).collect();
        assert_eq!(indices, vec![1, 3]);
    }

    #[test]
    fn hostile_view_rejects_stale_generations() {
        let view = HostileView::from_snapshots(vec![snapshot(2, 1)]);
        assert!(view
            .get(EntityId::new(EntityKind::Hostile, 2, 1))
            .is_some());
        assert!(view
            .get(EntityId::new(EntityKind::Hostile, 2, 0))
            .is_none());
    }
}

//! Tuning knobs and stage rosters shared by the world and the systems.
//!
//! Every struct deserialises with `#[serde(default)]`, so a configuration file
//! only needs to name the values it overrides. Defaults reproduce the classic
//! six-stage encounter on an 800×600 playfield.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::PatternKind;

/// Complete set of tuning values required to run an encounter.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncounterConfig {
    /// Playfield dimensions and retirement margins.
    pub playfield: PlayfieldTuning,
    /// Player movement, firing and power progression.
    pub player: PlayerTuning,
    /// Hostile spawn, movement and durability values.
    pub hostile: HostileTuning,
    /// Power point drop behaviour.
    pub pickup: PickupTuning,
    /// Cadence and geometry of the attack patterns.
    pub patterns: PatternTuning,
    /// Spawn queue cadence and spawn position seed.
    pub director: DirectorTuning,
    /// Ordered stage roster.
    pub stages: Roster,
}

/// Playfield dimensions measured in world units.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayfieldTuning {
    /// Horizontal extent of the playfield.
    pub width: f32,
    /// Vertical extent of the playfield.
    pub height: f32,
    /// Distance beyond the vertical edges a hostile may travel before it is retired.
    pub exit_margin: f32,
}

impl Default for PlayfieldTuning {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
            exit_margin: 32.0,
        }
    }
}

/// Player tuning values.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerTuning {
    /// Hit points the player starts with.
    pub hit_points: u32,
    /// Horizontal spawn position.
    pub start_x: f32,
    /// Vertical spawn position.
    pub start_y: f32,
    /// Movement speed in units per second.
    pub speed: f32,
    /// Speed multiplier applied while the slow modifier is held.
    pub slow_ratio: f32,
    /// Minimum time between two volleys.
    pub fire_interval_ms: u64,
    /// Upward speed of player bullets.
    pub bullet_speed: f32,
    /// Horizontal distance between adjacent bullet columns.
    pub column_spacing: f32,
    /// Distance above the player at which bullets appear.
    pub muzzle_offset: f32,
    /// Half size of the player sprite used to clamp it inside the playfield.
    pub half_extent: f32,
    /// Edge length of the square player hitbox.
    pub hitbox_size: f32,
    /// Edge length of the square player bullet hitbox.
    pub bullet_hitbox_size: f32,
    /// Highest reachable power level.
    pub max_power: u32,
    /// Score required to leave each power level, indexed by level.
    pub power_thresholds: Vec<u32>,
    /// Whether the auto-fire timer runs from the start.
    pub auto_fire: bool,
}

impl PlayerTuning {
    /// Minimum time between two volleys.
    #[must_use]
    pub fn fire_interval(&self) -> Duration {
        Duration::from_millis(self.fire_interval_ms)
    }

    /// Score needed to advance past `level`; missing table entries read as zero.
    #[must_use]
    pub fn threshold_for(&self, level: u32) -> u32 {
        usize::try_from(level)
            .ok()
            .and_then(|index| self.power_thresholds.get(index))
            .copied()
            .unwrap_or(0)
    }
}

impl Default for PlayerTuning {
    fn default() -> Self {
        Self {
            hit_points: 4,
            start_x: 400.0,
            start_y: 550.0,
            speed: 200.0,
            slow_ratio: 0.5,
            fire_interval_ms: 200,
            bullet_speed: 300.0,
            column_spacing: 12.0,
            muzzle_offset: 20.0,
            half_extent: 16.0,
            hitbox_size: 6.0,
            bullet_hitbox_size: 8.0,
            max_power: 7,
            power_thresholds: vec![0, 50, 50, 100, 150, 200, 300],
            auto_fire: false,
        }
    }
}

/// Hostile tuning values shared by every pattern family.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostileTuning {
    /// Hit points every hostile spawns with.
    pub hit_points: u32,
    /// Vertical spawn position, above the visible playfield.
    pub spawn_y: f32,
    /// Smallest horizontal spawn position (inclusive).
    pub spawn_x_min: i32,
    /// Largest horizontal spawn position (inclusive).
    pub spawn_x_max: i32,
    /// Downward speed applied on spawn.
    pub descent_speed: f32,
    /// Upward speed applied when the hostile retreats.
    pub retreat_speed: f32,
    /// Distance below the hostile at which its bullets appear.
    pub muzzle_offset: f32,
    /// Edge length of the square hostile hitbox.
    pub hitbox_size: f32,
    /// Edge length of the square hostile bullet hitbox.
    pub bullet_hitbox_size: f32,
}

impl Default for HostileTuning {
    fn default() -> Self {
        Self {
            hit_points: 2,
            spawn_y: -32.0,
            spawn_x_min: 50,
            spawn_x_max: 750,
            descent_speed: 60.0,
            retreat_speed: 100.0,
            muzzle_offset: 20.0,
            hitbox_size: 16.0,
            bullet_hitbox_size: 8.0,
        }
    }
}

/// Power point tuning values.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PickupTuning {
    /// Power score granted per collected point.
    pub value: u32,
    /// Downward speed of a dropped point.
    pub fall_speed: f32,
    /// Edge length of the square pickup hitbox.
    pub hitbox_size: f32,
}

impl Default for PickupTuning {
    fn default() -> Self {
        Self {
            value: 10,
            fall_speed: 100.0,
            hitbox_size: 32.0,
        }
    }
}

/// Cadence and geometry for every pattern family.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternTuning {
    /// Values for the `normal` family.
    pub normal: NormalTuning,
    /// Values for the `aim` family.
    pub aim: AimTuning,
    /// Values for the `multi` family.
    pub multi: MultiTuning,
}

/// Straight-down volley pattern values.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalTuning {
    /// Interval of the repeating fire timer.
    pub shot_interval_ms: u64,
    /// Shots fired before the hostile retreats.
    pub max_shots: u32,
    /// Downward bullet speed.
    pub bullet_speed: f32,
}

impl NormalTuning {
    /// Interval of the repeating fire timer.
    #[must_use]
    pub fn shot_interval(&self) -> Duration {
        Duration::from_millis(self.shot_interval_ms)
    }
}

impl Default for NormalTuning {
    fn default() -> Self {
        Self {
            shot_interval_ms: 1_200,
            max_shots: 6,
            bullet_speed: 200.0,
        }
    }
}

/// Aimed column pattern values.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AimTuning {
    /// Vertical position at which the hostile opens fire.
    pub trigger_y: f32,
    /// Bullet speed along the column angle.
    pub bullet_speed: f32,
    /// Angle between adjacent columns in degrees.
    pub column_step_degrees: f32,
    /// Delay between consecutive shots of one column.
    pub shot_step_ms: u64,
}

impl AimTuning {
    /// Delay between consecutive shots of one column.
    #[must_use]
    pub fn shot_step(&self) -> Duration {
        Duration::from_millis(self.shot_step_ms)
    }
}

impl Default for AimTuning {
    fn default() -> Self {
        Self {
            trigger_y: 120.0,
            bullet_speed: 200.0,
            column_step_degrees: 15.0,
            shot_step_ms: 150,
        }
    }
}

/// Rotating radial burst pattern values.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MultiTuning {
    /// Vertical position at which the hostile opens fire.
    pub trigger_y: f32,
    /// Radial bullet speed.
    pub bullet_speed: f32,
    /// Interval between bursts.
    pub burst_interval_ms: u64,
    /// Rotation added to the spread after every burst, in degrees.
    pub rotation_step_degrees: f32,
}

impl MultiTuning {
    /// Interval between bursts.
    #[must_use]
    pub fn burst_interval(&self) -> Duration {
        Duration::from_millis(self.burst_interval_ms)
    }
}

impl Default for MultiTuning {
    fn default() -> Self {
        Self {
            trigger_y: 160.0,
            bullet_speed: 200.0,
            burst_interval_ms: 300,
            rotation_step_degrees: 15.0,
        }
    }
}

/// Spawn queue cadence.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectorTuning {
    /// Interval of the repeating drain timer.
    pub spawn_interval_ms: u64,
    /// Seed for spawn positions.
    pub rng_seed: u64,
}

impl DirectorTuning {
    /// Interval of the repeating drain timer.
    #[must_use]
    pub fn spawn_interval(&self) -> Duration {
        Duration::from_millis(self.spawn_interval_ms)
    }
}

impl Default for DirectorTuning {
    fn default() -> Self {
        Self {
            spawn_interval_ms: 400,
            rng_seed: 0x5eed_ba22_a6e0_0001,
        }
    }
}

/// Ordered list of stages making up an encounter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Roster {
    stages: Vec<StageDefinition>,
}

impl Roster {
    /// Creates a roster from the provided stages.
    #[must_use]
    pub fn new(stages: Vec<StageDefinition>) -> Self {
        Self { stages }
    }

    /// Stages in play order.
    #[must_use]
    pub fn stages(&self) -> &[StageDefinition] {
        &self.stages
    }

    /// Looks up a stage by its one-based number.
    #[must_use]
    pub fn stage(&self, number: u32) -> Option<&StageDefinition> {
        let index = usize::try_from(number.checked_sub(1)?).ok()?;
        self.stages.get(index)
    }

    /// Number of stages, which is also the highest stage number.
    #[must_use]
    pub fn max_stage(&self) -> u32 {
        u32::try_from(self.stages.len()).unwrap_or(u32::MAX)
    }
}

impl Default for Roster {
    fn default() -> Self {
        use PatternKind::Normal;

        Self::new(vec![
            StageDefinition::new(vec![SpawnGroup::new(Normal, 10)]),
            StageDefinition::new(vec![
                SpawnGroup::new(Normal, 8),
                SpawnGroup::new(PatternKind::aim(1, 1), 2),
            ]),
            StageDefinition::new(vec![
                SpawnGroup::new(Normal, 5),
                SpawnGroup::new(PatternKind::aim(3, 1), 3),
                SpawnGroup::new(PatternKind::multi(1, 1), 2),
            ]),
            StageDefinition::new(vec![
                SpawnGroup::new(Normal, 4),
                SpawnGroup::new(PatternKind::aim(3, 2), 4),
                SpawnGroup::new(PatternKind::multi(1, 2), 2),
            ]),
            StageDefinition::new(vec![
                SpawnGroup::new(PatternKind::aim(5, 3), 5),
                SpawnGroup::new(PatternKind::multi(2, 2), 5),
            ]),
            StageDefinition::new(vec![SpawnGroup::new(PatternKind::multi(2, 3), 10)]),
        ])
    }
}

/// Composition of a single stage.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageDefinition {
    /// Groups spawned in order; each group's copies are queued contiguously.
    pub spawns: Vec<SpawnGroup>,
}

impl StageDefinition {
    /// Creates a stage from its spawn groups.
    #[must_use]
    pub fn new(spawns: Vec<SpawnGroup>) -> Self {
        Self { spawns }
    }

    /// Total number of hostiles the stage spawns.
    #[must_use]
    pub fn total(&self) -> u32 {
        self.spawns
            .iter()
            .fold(0u32, |total, group| total.saturating_add(group.count))
    }
}

/// A run of identical hostiles inside a stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnGroup {
    /// Pattern assigned to every hostile of the group.
    pub pattern: PatternKind,
    /// Number of hostiles in the group.
    pub count: u32,
}

impl SpawnGroup {
    /// Creates a spawn group.
    #[must_use]
    pub const fn new(pattern: PatternKind, count: u32) -> Self {
        Self { pattern, count }
    }
}

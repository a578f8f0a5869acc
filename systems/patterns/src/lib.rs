#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Attack pattern engine that turns hostile patterns into timed fire commands.
//!
//! Every hostile carries a [`PatternKind`] chosen at spawn. The engine keeps
//! one [`PatternState`] per live hostile, watches the hostile view for trigger
//! lines, and drives all shots from its own [`Scheduler`]. Fired timers carry
//! the hostile handle as plain data and are dispatched here, after checking
//! that the hostile is still present in the view.

use std::collections::BTreeMap;

use barrage_core::{
    AimTuning, Command, EncounterConfig, EntityId, Event, HostileView, MultiTuning,
    NormalTuning, PatternKind, PatternTuning, Vec2,
};
use barrage_scheduler::{Fired, Scheduler, TimerId};
use tracing::{debug, trace};

const DOWNWARD_DEGREES: f32 = 90.0;

/// Configuration parameters required to construct the pattern engine.
#[derive(Clone, Debug, Default)]
pub struct Config {
    normal: NormalTuning,
    aim: AimTuning,
    multi: MultiTuning,
}

impl Config {
    /// Creates a configuration from pattern tuning values.
    #[must_use]
    pub fn new(tuning: PatternTuning) -> Self {
        Self {
            normal: tuning.normal,
            aim: tuning.aim,
            multi: tuning.multi,
        }
    }

    /// Derives the configuration from a complete encounter configuration.
    #[must_use]
    pub fn from_encounter(config: &EncounterConfig) -> Self {
        Self::new(config.patterns.clone())
    }
}

/// Scratch state the engine keeps for a hostile's pattern.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PatternState {
    /// Periodic straight-down shots while descending.
    Normal {
        /// Shots fired so far.
        shots_fired: u32,
    },
    /// Aimed columns fired once the trigger line is reached.
    Aim {
        /// Number of columns fanned around the base angle.
        columns: u32,
        /// Shots per column.
        bullets_per_column: u32,
        /// Latched once the trigger line was crossed.
        has_shot: bool,
        /// Angle towards the player fixed at the trigger, in degrees.
        base_angle_degrees: f32,
        /// Shots fired so far across all columns.
        shots_fired: u32,
    },
    /// Rotating radial bursts fired once the trigger line is reached.
    Multi {
        /// Projectiles per burst.
        directions: u32,
        /// Bursts fired before retreating.
        bursts: u32,
        /// Latched once the trigger line was crossed.
        has_shot: bool,
        /// Rotation applied to the next burst, in degrees.
        rotation_degrees: f32,
        /// Bursts fired so far.
        bursts_fired: u32,
    },
}

impl PatternState {
    fn for_pattern(pattern: PatternKind) -> Self {
        match pattern {
            PatternKind::Normal => Self::Normal { shots_fired: 0 },
            PatternKind::Aim {
                columns,
                bullets_per_column,
            } => Self::Aim {
                columns: columns.max(1),
                bullets_per_column: bullets_per_column.max(1),
                has_shot: false,
                base_angle_degrees: DOWNWARD_DEGREES,
                shots_fired: 0,
            },
            PatternKind::Multi {
                bursts_per_direction,
                ..
            } => Self::Multi {
                directions: pattern.direction_count().unwrap_or(8),
                bursts: bursts_per_direction.max(1),
                has_shot: false,
                rotation_degrees: 0.0,
                bursts_fired: 0,
            },
        }
    }

    /// Reports whether the pattern already crossed its trigger line.
    ///
    /// `normal` has no trigger and always reports `false`.
    #[must_use]
    pub const fn has_shot(&self) -> bool {
        match self {
            Self::Normal { .. } => false,
            Self::Aim { has_shot, .. } | Self::Multi { has_shot, .. } => *has_shot,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum PatternTimer {
    NormalVolley { hostile: EntityId },
    AimShot { hostile: EntityId, angle_degrees: f32 },
    Retreat { hostile: EntityId },
    MultiBurst { hostile: EntityId },
}

impl PatternTimer {
    const fn hostile(&self) -> EntityId {
        match *self {
            Self::NormalVolley { hostile }
            | Self::AimShot { hostile, .. }
            | Self::Retreat { hostile }
            | Self::MultiBurst { hostile } => hostile,
        }
    }
}

#[derive(Debug)]
struct ActivePattern {
    state: PatternState,
    timers: Vec<TimerId>,
}

/// Stateful system that schedules and fires hostile attack patterns.
#[derive(Debug, Default)]
pub struct PatternEngine {
    config: Config,
    scheduler: Scheduler<PatternTimer>,
    active: BTreeMap<EntityId, ActivePattern>,
}

impl PatternEngine {
    /// Creates an engine that tracks no hostile yet.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            scheduler: Scheduler::new(),
            active: BTreeMap::new(),
        }
    }

    /// Pattern state for a tracked hostile.
    ///
    /// Hostiles are forgotten once they retreat or leave the pool.
    #[must_use]
    pub fn pattern_state(&self, hostile: EntityId) -> Option<&PatternState> {
        self.active.get(&hostile).map(|active| &active.state)
    }

    /// Number of hostiles whose patterns are still running.
    #[must_use]
    pub fn tracked(&self) -> usize {
        self.active.len()
    }

    /// Number of timers still pending across all hostiles.
    #[must_use]
    pub fn pending_timers(&self) -> usize {
        self.scheduler.len()
    }

    /// Consumes world events and emits fire, steering and retreat commands.
    ///
    /// `hostiles` must reflect the world after the events were produced and
    /// `player` is the player's current position, if any.
    pub fn handle(
        &mut self,
        events: &[Event],
        hostiles: &HostileView,
        player: Option<Vec2>,
        out: &mut Vec<Command>,
    ) {
        for event in events {
            match event {
                Event::HostileSpawned {
                    hostile, pattern, ..
                } => self.register(*hostile, *pattern),
                Event::HostileDestroyed { hostile, .. } => self.forget(*hostile),
                Event::TimeAdvanced { dt } => {
                    self.scheduler.advance(*dt);
                    self.check_triggers(hostiles, player, out);
                    while let Some(fired) = self.scheduler.pop_due() {
                        self.dispatch(fired, hostiles, out);
                    }
                }
                _ => {}
            }
        }
    }

    fn register(&mut self, hostile: EntityId, pattern: PatternKind) {
        let mut active = ActivePattern {
            state: PatternState::for_pattern(pattern),
            timers: Vec::new(),
        };
        if pattern == PatternKind::Normal {
            active.timers.push(self.scheduler.every(
                self.config.normal.shot_interval(),
                PatternTimer::NormalVolley { hostile },
            ));
        }
        trace!(hostile = ?hostile, %pattern, "pattern registered");
        if let Some(previous) = self.active.insert(hostile, active) {
            self.cancel_all(&previous.timers);
        }
    }

    fn forget(&mut self, hostile: EntityId) {
        if let Some(active) = self.active.remove(&hostile) {
            self.cancel_all(&active.timers);
        }
    }

    fn cancel_all(&mut self, timers: &[TimerId]) {
        for timer in timers {
            let _ = self.scheduler.cancel(*timer);
        }
    }

    fn check_triggers(
        &mut self,
        hostiles: &HostileView,
        player: Option<Vec2>,
        out: &mut Vec<Command>,
    ) {
        let waiting: Vec<EntityId> = self
            .active
            .iter()
            .filter(|(_, active)| !matches!(active.state, PatternState::Normal { .. }))
            .filter(|(_, active)| !active.state.has_shot())
            .map(|(hostile, _)| *hostile)
            .collect();

        for hostile in waiting {
            let Some(snapshot) = hostiles.get(hostile) else {
                self.forget(hostile);
                continue;
            };
            let trigger_y = match self.active.get(&hostile).map(|active| active.state) {
                Some(PatternState::Aim { .. }) => self.config.aim.trigger_y,
                Some(PatternState::Multi { .. }) => self.config.multi.trigger_y,
                _ => continue,
            };
            if snapshot.position.y < trigger_y {
                continue;
            }

            out.push(Command::SetHostileVelocity {
                hostile,
                velocity: Vec2::ZERO,
            });
            self.trigger(hostile, snapshot.position, player);
        }
    }

    fn trigger(&mut self, hostile: EntityId, position: Vec2, player: Option<Vec2>) {
        let Some(active) = self.active.get_mut(&hostile) else {
            return;
        };

        match &mut active.state {
            PatternState::Aim {
                columns,
                bullets_per_column,
                has_shot,
                base_angle_degrees,
                ..
            } => {
                *has_shot = true;
                let base = player
                    .map(|target| target - position)
                    .filter(|offset| *offset != Vec2::ZERO)
                    .map_or(DOWNWARD_DEGREES, |offset| {
                        offset.y.atan2(offset.x).to_degrees()
                    });
                *base_angle_degrees = base;

                let step = self.config.aim.shot_step();
                let spread = self.config.aim.column_step_degrees;
                let centre = (*columns - 1) as f32 / 2.0;
                for column in 0..*columns {
                    let angle_degrees = base + (column as f32 - centre) * spread;
                    for shot in 0..*bullets_per_column {
                        active.timers.push(self.scheduler.after(
                            step * shot,
                            PatternTimer::AimShot {
                                hostile,
                                angle_degrees,
                            },
                        ));
                    }
                }
                let retreat_at = step * (*bullets_per_column - 1);
                active.timers.push(
                    self.scheduler
                        .after(retreat_at, PatternTimer::Retreat { hostile }),
                );
                debug!(
                    hostile = ?hostile,
                    base_angle = base,
                    columns = *columns,
                    "aim triggered"
                );
            }
            PatternState::Multi {
                directions,
                bursts,
                has_shot,
                ..
            } => {
                *has_shot = true;
                active.timers.push(self.scheduler.every_n(
                    self.config.multi.burst_interval(),
                    *bursts,
                    PatternTimer::MultiBurst { hostile },
                ));
                debug!(
                    hostile = ?hostile,
                    directions = *directions,
                    bursts = *bursts,
                    "multi triggered"
                );
            }
            PatternState::Normal { .. } => {}
        }
    }

    fn dispatch(
        &mut self,
        fired: Fired<PatternTimer>,
        hostiles: &HostileView,
        out: &mut Vec<Command>,
    ) {
        let hostile = fired.action.hostile();
        let present = hostiles
            .get(hostile)
            .is_some_and(|snapshot| !snapshot.is_retreating);
        if !present || !self.active.contains_key(&hostile) {
            trace!(hostile = ?hostile, timer = fired.id.get(), "stale pattern timer cancelled");
            let _ = self.scheduler.cancel(fired.id);
            self.forget(hostile);
            return;
        }

        match fired.action {
            PatternTimer::NormalVolley { .. } => self.fire_normal(hostile, fired.id, out),
            PatternTimer::AimShot { angle_degrees, .. } => {
                if let Some(PatternState::Aim { shots_fired, .. }) = self.state_mut(hostile) {
                    *shots_fired += 1;
                }
                out.push(Command::FireHostileBullet {
                    hostile,
                    velocity: heading(angle_degrees) * self.config.aim.bullet_speed,
                });
            }
            PatternTimer::Retreat { .. } => self.retreat(hostile, out),
            PatternTimer::MultiBurst { .. } => {
                self.fire_burst(hostile, out);
                if fired.finished {
                    self.retreat(hostile, out);
                }
            }
        }
    }

    fn fire_normal(&mut self, hostile: EntityId, timer: TimerId, out: &mut Vec<Command>) {
        let max_shots = self.config.normal.max_shots;
        let Some(PatternState::Normal { shots_fired }) = self.state_mut(hostile) else {
            return;
        };

        if *shots_fired < max_shots {
            *shots_fired += 1;
            out.push(Command::FireHostileBullet {
                hostile,
                velocity: Vec2::new(0.0, self.config.normal.bullet_speed),
            });
            return;
        }

        let _ = self.scheduler.cancel(timer);
        self.retreat(hostile, out);
    }

    fn fire_burst(&mut self, hostile: EntityId, out: &mut Vec<Command>) {
        let speed = self.config.multi.bullet_speed;
        let rotation_step = self.config.multi.rotation_step_degrees;
        let Some(PatternState::Multi {
            directions,
            rotation_degrees,
            bursts_fired,
            ..
        }) = self.state_mut(hostile)
        else {
            return;
        };

        let spacing = 360.0 / *directions as f32;
        for direction in 0..*directions {
            let angle = *rotation_degrees + direction as f32 * spacing;
            out.push(Command::FireHostileBullet {
                hostile,
                velocity: heading(angle) * speed,
            });
        }
        *rotation_degrees += rotation_step;
        *bursts_fired += 1;
    }

    fn retreat(&mut self, hostile: EntityId, out: &mut Vec<Command>) {
        debug!(hostile = ?hostile, "pattern finished, hostile retreating");
        out.push(Command::RetreatHostile { hostile });
        self.forget(hostile);
    }

    fn state_mut(&mut self, hostile: EntityId) -> Option<&mut PatternState> {
        self.active.get_mut(&hostile).map(|active| &mut active.state)
    }
}

/// Unit vector pointing along `degrees`, measured clockwise from +x in screen space.
fn heading(degrees: f32) -> Vec2 {
    let (sin, cos) = degrees.to_radians().sin_cos();
    Vec2::new(cos, sin)
}

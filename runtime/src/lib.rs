#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Frame-driven encounter runtime wiring the world to every system.
//!
//! An [`Encounter`] owns the world, the wave director, the pattern engine and
//! the player control system. Presentation layers feed it one
//! [`FrameInput`] per frame plus occasional [`OperatorCommand`]s and read
//! back [`Notification`]s from its queue. Nothing runs between frames, so a
//! paused encounter freezes every timer.

mod config;

use std::{collections::VecDeque, time::Duration};

use barrage_core::{
    Command, DestroyCause, EncounterConfig, EntityKind, Event, FrameInput, Notification,
    OperatorCommand,
};
use barrage_system_patterns::{self as patterns, PatternEngine};
use barrage_system_player::{self as player, PlayerControl};
use barrage_system_waves::{self as waves, WaveDirector};
use barrage_world::{self as world, query, World};
use serde::Serialize;
use tracing::{debug, info};

pub use config::{load_config, parse_config, validate, ConfigError};

/// Lifecycle of an encounter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Phase {
    /// Waiting for the operator to start; frames do nothing.
    Idle,
    /// Frames advance the simulation.
    Running,
    /// Frames are ignored until the encounter resumes.
    Paused,
    /// The player was defeated. Only a restart leaves this phase.
    GameOver,
}

/// Running tally of what happened during an encounter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub struct EncounterStats {
    /// Frames simulated while running.
    pub frames: u64,
    /// Hostiles that entered the playfield.
    pub hostiles_spawned: u32,
    /// Hostiles destroyed by player fire.
    pub hostiles_killed: u32,
    /// Hostiles that left the playfield alive.
    pub hostiles_escaped: u32,
    /// Bullets fired by hostiles.
    pub hostile_bullets_fired: u32,
    /// Volleys fired by the player.
    pub player_volleys: u32,
    /// Power points collected.
    pub pickups_collected: u32,
}

impl EncounterStats {
    fn record(&mut self, event: &Event) {
        match event {
            Event::HostileSpawned { .. } => self.hostiles_spawned += 1,
            Event::HostileDestroyed {
                cause: DestroyCause::Killed,
                ..
            } => self.hostiles_killed += 1,
            Event::HostileDestroyed {
                cause: DestroyCause::LeftPlayfield,
                ..
            } => self.hostiles_escaped += 1,
            Event::HostileBulletFired { .. } => self.hostile_bullets_fired += 1,
            Event::PlayerVolleyFired { .. } => self.player_volleys += 1,
            Event::PickupCollected { .. } => self.pickups_collected += 1,
            _ => {}
        }
    }
}

/// A complete, self-contained encounter.
#[derive(Debug)]
pub struct Encounter {
    config: EncounterConfig,
    phase: Phase,
    world: World,
    director: WaveDirector,
    patterns: PatternEngine,
    player: PlayerControl,
    notifications: VecDeque<Notification>,
    stats: EncounterStats,
}

impl Encounter {
    /// Validates `config` and builds an idle encounter.
    ///
    /// The initial hit point, power, stage and auto-fire notifications are
    /// queued immediately.
    pub fn new(config: EncounterConfig) -> Result<Self, ConfigError> {
        validate(&config)?;

        let mut encounter = Self {
            phase: Phase::Idle,
            world: World::new(&config),
            director: WaveDirector::new(waves::Config::from_encounter(&config)),
            patterns: PatternEngine::new(patterns::Config::from_encounter(&config)),
            player: PlayerControl::new(player::Config::from_encounter(&config)),
            notifications: VecDeque::new(),
            stats: EncounterStats::default(),
            config,
        };
        encounter.announce_initial_state();
        Ok(encounter)
    }

    /// Current lifecycle phase.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Configuration the encounter was built from.
    #[must_use]
    pub const fn config(&self) -> &EncounterConfig {
        &self.config
    }

    /// Read-only access to the world for queries.
    #[must_use]
    pub const fn world(&self) -> &World {
        &self.world
    }

    /// Read-only access to the wave director.
    #[must_use]
    pub const fn director(&self) -> &WaveDirector {
        &self.director
    }

    /// Read-only access to the pattern engine.
    #[must_use]
    pub const fn patterns(&self) -> &PatternEngine {
        &self.patterns
    }

    /// Tally of everything that happened since the last (re)start.
    #[must_use]
    pub const fn stats(&self) -> &EncounterStats {
        &self.stats
    }

    /// Reports whether the auto-fire timer is running.
    #[must_use]
    pub const fn is_auto_fire(&self) -> bool {
        self.player.is_auto_fire()
    }

    /// Removes and returns every queued notification, oldest first.
    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        self.notifications.drain(..).collect()
    }

    /// Applies an operator command. Commands that do not fit the current phase are ignored.
    pub fn command(&mut self, command: OperatorCommand) {
        let mut notifications = Vec::new();
        match (command, self.phase) {
            (OperatorCommand::Restart, _) => {
                info!(phase = ?self.phase, "encounter restarted");
                self.reset();
                return;
            }
            (OperatorCommand::Start, Phase::Idle) => {
                self.director.start_game(&mut notifications);
                self.phase = Phase::Running;
            }
            (OperatorCommand::AdvanceStage, Phase::Running | Phase::Paused) => {
                self.director.next_stage(&mut notifications);
            }
            (OperatorCommand::Pause, Phase::Running) => self.phase = Phase::Paused,
            (OperatorCommand::Resume, Phase::Paused) => self.phase = Phase::Running,
            (OperatorCommand::JumpToStage { stage }, Phase::Idle) => {
                self.director.jump_to(stage, &mut notifications);
                if !notifications.is_empty() {
                    self.phase = Phase::Running;
                }
            }
            (OperatorCommand::JumpToStage { stage }, Phase::Running | Phase::Paused) => {
                self.director.jump_to(stage, &mut notifications);
            }
            (command, phase) => {
                debug!(?command, ?phase, "operator command ignored");
            }
        }
        self.notifications.extend(notifications);
    }

    /// Simulates one frame of `dt` while running.
    pub fn step(&mut self, input: &FrameInput, dt: Duration) {
        if self.phase != Phase::Running {
            return;
        }
        self.stats.frames += 1;

        let mut events = Vec::new();
        world::apply(&mut self.world, Command::Tick { dt }, &mut events);
        if query::is_player_defeated(&self.world) {
            self.publish(&events);
            return;
        }

        let mut commands = Vec::new();
        self.director.handle(&events, &mut commands);
        self.apply_all(&mut commands, &mut events);

        let hostiles = query::hostile_view(&self.world);
        let player_position = query::player(&self.world).map(|player| player.position);
        self.patterns
            .handle(&events, &hostiles, player_position, &mut commands);
        self.apply_all(&mut commands, &mut events);

        if input.toggle_auto_fire {
            let enabled = self.player.toggle_auto_fire();
            self.notifications
                .push_back(Notification::AutoFireChanged { enabled });
        }
        self.player.handle(&events, input, &mut commands);
        self.apply_all(&mut commands, &mut events);

        self.publish(&events);
        if self.phase != Phase::Running {
            return;
        }

        let live = query::count_alive(&self.world, EntityKind::Hostile);
        if let Some(clearance) = self.director.poll_clearance(live) {
            self.notifications.push_back(clearance.notification());
        }
    }

    fn apply_all(&mut self, commands: &mut Vec<Command>, events: &mut Vec<Event>) {
        for command in commands.drain(..) {
            world::apply(&mut self.world, command, events);
        }
    }

    fn publish(&mut self, events: &[Event]) {
        for event in events {
            self.stats.record(event);
            match event {
                Event::PlayerDamaged { hit_points } => {
                    self.notifications.push_back(Notification::HpChanged {
                        value: *hit_points,
                    });
                }
                Event::PowerChanged {
                    level,
                    score,
                    threshold,
                } => {
                    self.notifications.push_back(Notification::PowerChanged {
                        level: *level,
                        score: *score,
                        threshold: *threshold,
                    });
                }
                Event::PlayerDefeated => {
                    info!(
                        stage = self.director.current_stage(),
                        frames = self.stats.frames,
                        "game over"
                    );
                    self.phase = Phase::GameOver;
                    self.notifications.push_back(Notification::GameOver);
                }
                _ => {}
            }
        }
    }

    fn reset(&mut self) {
        self.phase = Phase::Idle;
        self.world = World::new(&self.config);
        self.director = WaveDirector::new(waves::Config::from_encounter(&self.config));
        self.patterns = PatternEngine::new(patterns::Config::from_encounter(&self.config));
        self.player = PlayerControl::new(player::Config::from_encounter(&self.config));
        self.stats = EncounterStats::default();
        self.announce_initial_state();
    }

    fn announce_initial_state(&mut self) {
        let hit_points = query::player(&self.world).map_or(0, |player| player.hit_points);
        let power = query::power_progress(&self.world);
        self.notifications.extend([
            Notification::HpChanged { value: hit_points },
            Notification::PowerChanged {
                level: power.level,
                score: power.score,
                threshold: power.threshold,
            },
            Notification::StageChanged {
                current: self.director.current_stage(),
                max: self.director.max_stage(),
            },
            Notification::AutoFireChanged {
                enabled: self.player.is_auto_fire(),
            },
        ]);
    }
}

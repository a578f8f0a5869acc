#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Wave director that sequences stages, drains spawn queues and detects clearance.

use std::{collections::VecDeque, time::Duration};

use barrage_core::{
    Command, DestroyCause, EncounterConfig, Event, HostileTuning, Notification, PatternKind,
    Roster, StageDefinition, Vec2,
};
use barrage_scheduler::{Scheduler, TimerId};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

/// Configuration parameters required to construct the wave director.
#[derive(Clone, Debug)]
pub struct Config {
    roster: Roster,
    spawn_interval: Duration,
    rng_seed: u64,
    spawn_x_min: i32,
    spawn_x_max: i32,
    spawn_y: f32,
}

impl Config {
    /// Creates a configuration with the default spawn area.
    #[must_use]
    pub fn new(roster: Roster, spawn_interval: Duration, rng_seed: u64) -> Self {
        let hostile = HostileTuning::default();
        Self {
            roster,
            spawn_interval,
            rng_seed,
            spawn_x_min: hostile.spawn_x_min,
            spawn_x_max: hostile.spawn_x_max,
            spawn_y: hostile.spawn_y,
        }
    }

    /// Derives the configuration from a complete encounter configuration.
    #[must_use]
    pub fn from_encounter(config: &EncounterConfig) -> Self {
        Self::new(
            config.stages.clone(),
            config.director.spawn_interval(),
            config.director.rng_seed,
        )
        .with_spawn_area(
            config.hostile.spawn_x_min,
            config.hostile.spawn_x_max,
            config.hostile.spawn_y,
        )
    }

    /// Overrides the inclusive horizontal spawn range and the spawn height.
    #[must_use]
    pub fn with_spawn_area(mut self, x_min: i32, x_max: i32, y: f32) -> Self {
        self.spawn_x_min = x_min.min(x_max);
        self.spawn_x_max = x_min.max(x_max);
        self.spawn_y = y;
        self
    }
}

/// Lifecycle of the director.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    /// No stage has started yet.
    NotStarted,
    /// A stage is running and has not been cleared.
    Spawning,
    /// The current stage was cleared; waiting for the operator.
    Cleared,
}

/// Outcome of a successful clearance check.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Clearance {
    /// The stage was cleared and another stage remains.
    ReadyToAdvance,
    /// The final stage was cleared.
    AllCleared,
}

impl Clearance {
    /// Notification announcing this clearance.
    #[must_use]
    pub const fn notification(self) -> Notification {
        match self {
            Self::ReadyToAdvance => Notification::StageReadyToAdvance,
            Self::AllCleared => Notification::AllStagesCleared,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DirectorTimer {
    Drain,
}

/// Expands a stage definition into its FIFO spawn queue.
///
/// Every group contributes `count` contiguous copies of its pattern, in
/// roster order.
#[must_use]
pub fn expand_queue(stage: &StageDefinition) -> VecDeque<PatternKind> {
    stage
        .spawns
        .iter()
        .flat_map(|group| std::iter::repeat(group.pattern).take(group.count as usize))
        .collect()
}

/// Stateful system that owns stage progress and the spawn queue.
#[derive(Debug)]
pub struct WaveDirector {
    roster: Roster,
    spawn_interval: Duration,
    spawn_x_min: i32,
    spawn_x_max: i32,
    spawn_y: f32,
    rng: ChaCha8Rng,
    scheduler: Scheduler<DirectorTimer>,
    drain_timer: Option<TimerId>,
    queue: VecDeque<PatternKind>,
    current_stage: u32,
    kills: u32,
    stage_cleared: bool,
    phase: Phase,
}

impl WaveDirector {
    /// Creates a director that has not started any stage yet.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
            roster: config.roster,
            spawn_interval: config.spawn_interval,
            spawn_x_min: config.spawn_x_min,
            spawn_x_max: config.spawn_x_max,
            spawn_y: config.spawn_y,
            scheduler: Scheduler::new(),
            drain_timer: None,
            queue: VecDeque::new(),
            current_stage: 0,
            kills: 0,
            stage_cleared: false,
            phase: Phase::NotStarted,
        }
    }

    /// Current lifecycle phase.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// One-based number of the running stage, or zero before the game starts.
    #[must_use]
    pub const fn current_stage(&self) -> u32 {
        self.current_stage
    }

    /// Number of stages in the roster.
    #[must_use]
    pub fn max_stage(&self) -> u32 {
        self.roster.max_stage()
    }

    /// Kills recorded since the current stage started.
    #[must_use]
    pub const fn kills(&self) -> u32 {
        self.kills
    }

    /// Reports whether the clearance latch is set for the current stage.
    #[must_use]
    pub const fn is_stage_cleared(&self) -> bool {
        self.stage_cleared
    }

    /// Number of hostiles still waiting to spawn.
    #[must_use]
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Patterns still waiting to spawn, front first.
    pub fn queued(&self) -> impl Iterator<Item = PatternKind> + '_ {
        self.queue.iter().copied()
    }

    /// Starts stage one. Ignored once the game has started.
    pub fn start_game(&mut self, out: &mut Vec<Notification>) {
        if self.phase != Phase::NotStarted {
            debug!(stage = self.current_stage, "start ignored, game already running");
            return;
        }
        self.begin_stage(1, out);
    }

    /// Starts the following stage. Ignored when the final stage is running.
    pub fn next_stage(&mut self, out: &mut Vec<Notification>) {
        if self.current_stage >= self.max_stage() {
            debug!(
                stage = self.current_stage,
                max_stage = self.max_stage(),
                "advance ignored, no stage remains"
            );
            return;
        }
        self.begin_stage(self.current_stage + 1, out);
    }

    /// Starts stage `stage` directly. Out-of-range stages are ignored.
    pub fn jump_to(&mut self, stage: u32, out: &mut Vec<Notification>) {
        if stage == 0 || stage > self.max_stage() {
            debug!(stage, max_stage = self.max_stage(), "jump ignored, stage out of range");
            return;
        }
        self.begin_stage(stage, out);
    }

    /// Pops at most one queued pattern and emits its spawn command.
    ///
    /// Draining an empty queue does nothing and can be repeated freely.
    pub fn drain_tick(&mut self, out: &mut Vec<Command>) {
        let Some(pattern) = self.queue.pop_front() else {
            return;
        };

        let x = self.rng.gen_range(self.spawn_x_min..=self.spawn_x_max);
        let position = Vec2::new(x as f32, self.spawn_y);
        debug!(
            stage = self.current_stage,
            %pattern,
            x,
            remaining = self.queue.len(),
            "hostile dequeued"
        );
        out.push(Command::SpawnHostile { pattern, position });
    }

    /// Counts one kill towards the current stage.
    pub fn record_kill(&mut self) {
        self.kills = self.kills.saturating_add(1);
    }

    /// Latches clearance once the queue is empty and no hostile remains alive.
    ///
    /// Returns the clearance exactly once per stage; later calls return `None`
    /// until another stage starts.
    pub fn poll_clearance(&mut self, live_hostiles: usize) -> Option<Clearance> {
        if self.phase == Phase::NotStarted
            || self.stage_cleared
            || !self.queue.is_empty()
            || live_hostiles > 0
        {
            return None;
        }

        self.stage_cleared = true;
        self.phase = Phase::Cleared;
        let clearance = if self.current_stage < self.max_stage() {
            Clearance::ReadyToAdvance
        } else {
            Clearance::AllCleared
        };
        info!(
            stage = self.current_stage,
            kills = self.kills,
            ?clearance,
            "stage cleared"
        );
        Some(clearance)
    }

    /// Consumes world events, draining the spawn queue as time advances.
    pub fn handle(&mut self, events: &[Event], out: &mut Vec<Command>) {
        for event in events {
            match event {
                Event::TimeAdvanced { dt } => {
                    self.scheduler.advance(*dt);
                    while let Some(fired) = self.scheduler.pop_due() {
                        match fired.action {
                            DirectorTimer::Drain => self.drain_tick(out),
                        }
                    }
                }
                Event::HostileDestroyed {
                    cause: DestroyCause::Killed,
                    ..
                } => self.record_kill(),
                _ => {}
            }
        }
    }

    fn begin_stage(&mut self, stage: u32, out: &mut Vec<Notification>) {
        let Some(definition) = self.roster.stage(stage) else {
            return;
        };
        let queue = expand_queue(definition);

        if let Some(timer) = self.drain_timer.take() {
            let _ = self.scheduler.cancel(timer);
        }
        self.current_stage = stage;
        self.kills = 0;
        self.stage_cleared = false;
        self.phase = Phase::Spawning;
        self.queue = queue;
        self.drain_timer = Some(
            self.scheduler
                .every(self.spawn_interval, DirectorTimer::Drain),
        );

        info!(
            stage,
            max_stage = self.max_stage(),
            queued = self.queue.len(),
            "stage started"
        );
        out.push(Notification::StageChanged {
            current: stage,
            max: self.max_stage(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn begin_stage_replaces_the_drain_timer() {
        let mut director = WaveDirector::new(Config::new(
            Roster::default(),
            Duration::from_millis(400),
            7,
        ));
        let mut notifications = Vec::new();

        director.start_game(&mut notifications);
        let first = director.drain_timer.expect("drain timer armed");
        director.jump_to(4, &mut notifications);
        let second = director.drain_timer.expect("drain timer re-armed");

        assert_ne!(first, second);
        assert!(!director.scheduler.is_scheduled(first));
        assert_eq!(director.scheduler.len(), 1);
    }
}

#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Player control system translating frame input into steering and fire commands.

use std::time::Duration;

use barrage_core::{Command, EncounterConfig, Event, FrameInput, PlayerTuning, Vec2};
use barrage_scheduler::{Scheduler, TimerId};
use tracing::debug;

/// Configuration parameters required to construct the player control system.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    speed: f32,
    slow_ratio: f32,
    fire_interval: Duration,
    auto_fire: bool,
}

impl Config {
    /// Creates a configuration from player tuning values.
    #[must_use]
    pub fn new(tuning: &PlayerTuning) -> Self {
        Self {
            speed: tuning.speed,
            slow_ratio: tuning.slow_ratio,
            fire_interval: tuning.fire_interval(),
            auto_fire: tuning.auto_fire,
        }
    }

    /// Derives the configuration from a complete encounter configuration.
    #[must_use]
    pub fn from_encounter(config: &EncounterConfig) -> Self {
        Self::new(&config.player)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(&PlayerTuning::default())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PlayerTimer {
    AutoFire,
}

/// Holding both keys of an axis resolves to the positive one.
fn axis(negative: bool, positive: bool) -> f32 {
    if positive {
        1.0
    } else if negative {
        -1.0
    } else {
        0.0
    }
}

/// Stateful system that steers the player and paces its volleys.
#[derive(Debug)]
pub struct PlayerControl {
    config: Config,
    scheduler: Scheduler<PlayerTimer>,
    auto_fire: Option<TimerId>,
    last_shot: Option<Duration>,
}

impl PlayerControl {
    /// Creates the system, arming auto-fire when the configuration enables it.
    #[must_use]
    pub fn new(config: Config) -> Self {
        let mut control = Self {
            config,
            scheduler: Scheduler::new(),
            auto_fire: None,
            last_shot: None,
        };
        if config.auto_fire {
            control.arm_auto_fire();
        }
        control
    }

    /// Reports whether the auto-fire timer is running.
    #[must_use]
    pub const fn is_auto_fire(&self) -> bool {
        self.auto_fire.is_some()
    }

    /// Flips auto-fire and returns the new state.
    ///
    /// The existing timer is always dropped, so re-enabling restarts the
    /// cadence one full interval out.
    pub fn toggle_auto_fire(&mut self) -> bool {
        if let Some(timer) = self.auto_fire.take() {
            let _ = self.scheduler.cancel(timer);
        } else {
            self.arm_auto_fire();
        }
        debug!(enabled = self.is_auto_fire(), "auto-fire toggled");
        self.is_auto_fire()
    }

    /// Velocity requested by the held movement keys.
    #[must_use]
    pub fn steering(&self, input: &FrameInput) -> Vec2 {
        let direction = Vec2::new(axis(input.left, input.right), axis(input.up, input.down));
        let speed = if input.slow {
            self.config.speed * self.config.slow_ratio
        } else {
            self.config.speed
        };
        direction * speed
    }

    /// Consumes world events and the frame input to emit player commands.
    pub fn handle(&mut self, events: &[Event], input: &FrameInput, out: &mut Vec<Command>) {
        out.push(Command::SteerPlayer {
            velocity: self.steering(input),
        });

        for event in events {
            if let Event::TimeAdvanced { dt } = event {
                self.scheduler.advance(*dt);
                while let Some(fired) = self.scheduler.pop_due() {
                    match fired.action {
                        PlayerTimer::AutoFire => self.fire(fired.due, out),
                    }
                }
            }
        }

        if input.fire && !self.is_auto_fire() {
            let now = self.scheduler.now();
            let ready = self
                .last_shot
                .map_or(true, |last| now.saturating_sub(last) >= self.config.fire_interval);
            if ready {
                self.fire(now, out);
            }
        }
    }

    fn fire(&mut self, at: Duration, out: &mut Vec<Command>) {
        self.last_shot = Some(at);
        out.push(Command::FirePlayerVolley);
    }

    fn arm_auto_fire(&mut self) {
        self.auto_fire = Some(
            self.scheduler
                .every(self.config.fire_interval, PlayerTimer::AutoFire),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slow_modifier_scales_diagonal_steering() {
        let control = PlayerControl::new(Config::default());
        let input = FrameInput {
            left: true,
            down: true,
            slow: true,
            ..FrameInput::default()
        };

        assert_eq!(control.steering(&input), Vec2::new(-100.0, 100.0));
    }

    #[test]
    fn opposite_keys_resolve_to_right_and_down() {
        let control = PlayerControl::new(Config::default());
        let input = FrameInput {
            left: true,
            right: true,
            up: true,
            down: true,
            ..FrameInput::default()
        };

        assert_eq!(control.steering(&input), Vec2::new(200.0, 200.0));
    }
}

#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Headless command-line runner that plays a barrage encounter with an autopilot.

use std::{path::PathBuf, time::Duration};

use anyhow::{bail, Context, Result};
use barrage_core::{EncounterConfig, EntityKind, FrameInput, Notification, OperatorCommand};
use barrage_runtime::{load_config, Encounter, EncounterStats, Phase};
use barrage_world::query;
use clap::Parser;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::{debug, info};

/// Vertical distance at which the autopilot starts reacting to a hostile bullet.
const DANGER_RANGE: f32 = 120.0;
/// Horizontal half-width of the corridor the autopilot keeps clear.
const DANGER_WIDTH: f32 = 24.0;
/// Distance to the wander target at which the autopilot switches to slow movement.
const SETTLE_DISTANCE: f32 = 24.0;

/// Runs an encounter without a window and reports how it went.
#[derive(Debug, Parser)]
#[command(name = "barrage", version, about)]
struct Args {
    /// Encounter configuration file. Built-in defaults are used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Overrides the director's spawn seed.
    #[arg(long)]
    seed: Option<u64>,
    /// Maximum number of frames to simulate.
    #[arg(long, default_value_t = 7_200)]
    frames: u32,
    /// Length of one frame in milliseconds.
    #[arg(long, default_value_t = 16)]
    frame_ms: u64,
    /// Starts directly at this stage.
    #[arg(long)]
    jump: Option<u32>,
    /// Starts with auto-fire enabled.
    #[arg(long)]
    auto_fire: bool,
    /// Prints the final summary as JSON.
    #[arg(long)]
    json: bool,
}

/// How the run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum Outcome {
    /// Every stage was cleared.
    Cleared,
    /// The player was defeated.
    Defeated,
    /// The frame budget ran out first.
    OutOfFrames,
}

/// Final report printed once the run ends.
#[derive(Debug, Serialize)]
struct Summary {
    outcome: Outcome,
    phase: Phase,
    stage: u32,
    max_stage: u32,
    hit_points: u32,
    power: u32,
    stats: EncounterStats,
}

/// Steers the player towards random wander targets while sidestepping incoming bullets.
#[derive(Debug)]
struct Autopilot {
    rng: ChaCha8Rng,
    target_x: f32,
    retarget_in: u32,
}

impl Autopilot {
    fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            target_x: 0.0,
            retarget_in: 0,
        }
    }

    fn input(&mut self, encounter: &Encounter) -> FrameInput {
        let world = encounter.world();
        let Some(player) = query::player(world) else {
            return FrameInput::default();
        };
        let position = player.position;

        if self.retarget_in == 0 {
            let width = query::playfield(world).width;
            self.target_x = self.rng.gen_range(width * 0.1..width * 0.9);
            self.retarget_in = self.rng.gen_range(30..120);
        } else {
            self.retarget_in -= 1;
        }

        let mut input = FrameInput {
            fire: !encounter.is_auto_fire(),
            ..FrameInput::default()
        };

        let threat = query::positions(world, EntityKind::HostileBullet)
            .into_iter()
            .map(|(_, bullet)| bullet)
            .filter(|bullet| {
                bullet.y < position.y
                    && position.y - bullet.y < DANGER_RANGE
                    && (bullet.x - position.x).abs() < DANGER_WIDTH
            })
            .max_by(|a, b| a.y.total_cmp(&b.y));

        if let Some(bullet) = threat {
            if bullet.x >= position.x {
                input.left = true;
            } else {
                input.right = true;
            }
            return input;
        }

        let offset = self.target_x - position.x;
        input.left = offset < -1.0;
        input.right = offset > 1.0;
        input.slow = offset.abs() < SETTLE_DISTANCE;
        input
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .compact()
            .init();
    }
}

fn load(args: &Args) -> Result<EncounterConfig> {
    let mut config = match &args.config {
        Some(path) => load_config(path).with_context(|| {
            format!("failed to load encounter configuration from {}", path.display())
        })?,
        None => EncounterConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.director.rng_seed = seed;
    }
    if args.auto_fire {
        config.player.auto_fire = true;
    }
    Ok(config)
}

fn run(args: &Args) -> Result<Summary> {
    let config = load(args)?;
    let seed = config.director.rng_seed;
    let mut encounter = Encounter::new(config).context("invalid encounter configuration")?;
    let mut autopilot = Autopilot::new(seed);

    match args.jump {
        Some(stage) => encounter.command(OperatorCommand::JumpToStage { stage }),
        None => encounter.command(OperatorCommand::Start),
    }
    if encounter.phase() != Phase::Running {
        bail!(
            "stage {} is out of range, the roster has {} stages",
            args.jump.unwrap_or_default(),
            encounter.director().max_stage()
        );
    }

    let dt = Duration::from_millis(args.frame_ms.max(1));
    let mut outcome = Outcome::OutOfFrames;
    for _ in 0..args.frames {
        let input = autopilot.input(&encounter);
        encounter.step(&input, dt);

        for notification in encounter.drain_notifications() {
            debug!(?notification, "notification");
            match notification {
                Notification::StageChanged { current, max } => {
                    info!(current, max, "stage started");
                }
                Notification::StageReadyToAdvance => {
                    encounter.command(OperatorCommand::AdvanceStage);
                }
                Notification::AllStagesCleared => outcome = Outcome::Cleared,
                Notification::GameOver => outcome = Outcome::Defeated,
                _ => {}
            }
        }
        if outcome != Outcome::OutOfFrames {
            break;
        }
    }

    let world = encounter.world();
    let player = query::player(world);
    Ok(Summary {
        outcome,
        phase: encounter.phase(),
        stage: encounter.director().current_stage(),
        max_stage: encounter.director().max_stage(),
        hit_points: player.map_or(0, |player| player.hit_points),
        power: query::power_progress(world).level,
        stats: *encounter.stats(),
    })
}

/// Entry point for the barrage command-line interface.
fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let summary = run(&args)?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("failed to encode summary")?
        );
    } else {
        let stats = &summary.stats;
        println!(
            "{:?} at stage {}/{} with {} hit points and power {}",
            summary.outcome, summary.stage, summary.max_stage, summary.hit_points, summary.power
        );
        println!(
            "frames {} | spawned {} | killed {} | escaped {} | hostile shots {} | volleys {} | pickups {}",
            stats.frames,
            stats.hostiles_spawned,
            stats.hostiles_killed,
            stats.hostiles_escaped,
            stats.hostile_bullets_fired,
            stats.player_volleys,
            stats.pickups_collected
        );
    }
    Ok(())
}

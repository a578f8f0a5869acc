use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
    time::Duration,
};

use barrage_core::{
    EncounterConfig, EntityKind, FrameInput, Notification, OperatorCommand, PatternKind, Roster,
    SpawnGroup, StageDefinition,
};
use barrage_runtime::{parse_config, Encounter, EncounterStats, Phase};
use barrage_world::query;

const FRAME: Duration = Duration::from_millis(100);

fn quiet_config(stages: Vec<StageDefinition>) -> EncounterConfig {
    let mut config = EncounterConfig::default();
    config.hostile.spawn_x_min = 600;
    config.hostile.spawn_x_max = 600;
    config.player.start_x = 20.0;
    config.stages = Roster::new(stages);
    config
}

fn single(pattern: PatternKind) -> StageDefinition {
    StageDefinition::new(vec![SpawnGroup::new(pattern, 1)])
}

fn run(encounter: &mut Encounter, frames: usize) -> Vec<Notification> {
    let input = FrameInput::default();
    let mut notifications = Vec::new();
    for _ in 0..frames {
        encounter.step(&input, FRAME);
        notifications.extend(encounter.drain_notifications());
    }
    notifications
}

fn count(notifications: &[Notification], wanted: &Notification) -> usize {
    notifications
        .iter()
        .filter(|notification| *notification == wanted)
        .count()
}

#[test]
fn new_encounter_announces_its_initial_state() {
    let mut encounter = Encounter::new(EncounterConfig::default()).expect("valid config");

    assert_eq!(encounter.phase(), Phase::Idle);
    assert_eq!(
        encounter.drain_notifications(),
        vec![
            Notification::HpChanged { value: 4 },
            Notification::PowerChanged {
                level: 1,
                score: 0,
                threshold: 50,
            },
            Notification::StageChanged { current: 0, max: 6 },
            Notification::AutoFireChanged { enabled: false },
        ]
    );
    assert!(encounter.drain_notifications().is_empty());
}

#[test]
fn idle_frames_do_nothing() {
    let mut encounter = Encounter::new(EncounterConfig::default()).expect("valid config");
    let _ = encounter.drain_notifications();

    assert!(run(&mut encounter, 50).is_empty());
    assert_eq!(encounter.stats().frames, 0);
    assert_eq!(query::tick_index(encounter.world()), 0);
}

#[test]
fn normal_hostile_fires_six_shots_then_retreats() {
    let mut encounter =
        Encounter::new(quiet_config(vec![single(PatternKind::Normal)])).expect("valid config");
    encounter.command(OperatorCommand::Start);

    let _ = run(&mut encounter, 95);

    assert_eq!(encounter.stats().hostiles_spawned, 1);
    assert_eq!(encounter.stats().hostile_bullets_fired, 6);
    let view = query::hostile_view(encounter.world());
    let hostile = view.iter().next().expect("hostile still on the playfield");
    assert!(hostile.is_retreating);
    assert_eq!(hostile.velocity.y, -100.0);
}

#[test]
fn escaping_hostiles_clear_the_stage_exactly_once() {
    let mut encounter = Encounter::new(quiet_config(vec![
        single(PatternKind::Normal),
        single(PatternKind::Normal),
    ]))
    .expect("valid config");
    encounter.command(OperatorCommand::Start);

    let first = run(&mut encounter, 300);
    assert_eq!(count(&first, &Notification::StageReadyToAdvance), 1);
    assert_eq!(count(&first, &Notification::AllStagesCleared), 0);
    assert_eq!(encounter.director().kills(), 0);
    assert_eq!(encounter.stats().hostiles_escaped, 1);

    encounter.command(OperatorCommand::AdvanceStage);
    let second = run(&mut encounter, 300);
    assert_eq!(second[0], Notification::StageChanged { current: 2, max: 2 });
    assert_eq!(count(&second, &Notification::StageReadyToAdvance), 0);
    assert_eq!(count(&second, &Notification::AllStagesCleared), 1);

    encounter.command(OperatorCommand::AdvanceStage);
    assert!(run(&mut encounter, 10).is_empty(), "no stage after the last");
}

#[test]
fn pause_freezes_every_timer() {
    let mut encounter =
        Encounter::new(quiet_config(vec![single(PatternKind::Normal)])).expect("valid config");
    encounter.command(OperatorCommand::Start);
    let _ = run(&mut encounter, 20);
    let fired_before = encounter.stats().hostile_bullets_fired;
    let ticks_before = query::tick_index(encounter.world());

    encounter.command(OperatorCommand::Pause);
    assert_eq!(encounter.phase(), Phase::Paused);
    let _ = run(&mut encounter, 200);
    assert_eq!(encounter.stats().hostile_bullets_fired, fired_before);
    assert_eq!(query::tick_index(encounter.world()), ticks_before);

    encounter.command(OperatorCommand::Resume);
    assert_eq!(encounter.phase(), Phase::Running);
    let _ = run(&mut encounter, 12);
    assert_eq!(encounter.stats().hostile_bullets_fired, fired_before + 1);
}

#[test]
fn restart_returns_to_idle_and_reannounces() {
    let mut encounter = Encounter::new(EncounterConfig::default()).expect("valid config");
    encounter.command(OperatorCommand::Start);
    let _ = run(&mut encounter, 30);

    encounter.command(OperatorCommand::Restart);

    assert_eq!(encounter.phase(), Phase::Idle);
    assert_eq!(encounter.director().current_stage(), 0);
    assert_eq!(query::count_alive(encounter.world(), EntityKind::Hostile), 0);
    assert_eq!(*encounter.stats(), EncounterStats::default());
    assert_eq!(
        encounter.drain_notifications(),
        vec![
            Notification::HpChanged { value: 4 },
            Notification::PowerChanged {
                level: 1,
                score: 0,
                threshold: 50,
            },
            Notification::StageChanged { current: 0, max: 6 },
            Notification::AutoFireChanged { enabled: false },
        ]
    );
}

#[test]
fn jump_from_idle_starts_running_at_that_stage() {
    let mut encounter = Encounter::new(EncounterConfig::default()).expect("valid config");
    let _ = encounter.drain_notifications();

    encounter.command(OperatorCommand::JumpToStage { stage: 9 });
    assert_eq!(encounter.phase(), Phase::Idle, "out-of-range jump is ignored");

    encounter.command(OperatorCommand::JumpToStage { stage: 3 });
    assert_eq!(encounter.phase(), Phase::Running);
    assert_eq!(
        encounter.drain_notifications(),
        vec![Notification::StageChanged { current: 3, max: 6 }]
    );

    encounter.command(OperatorCommand::Start);
    assert!(encounter.drain_notifications().is_empty(), "already started");
}

#[test]
fn auto_fire_toggle_is_announced() {
    let mut encounter = Encounter::new(EncounterConfig::default()).expect("valid config");
    encounter.command(OperatorCommand::Start);
    let _ = encounter.drain_notifications();

    let toggle = FrameInput {
        toggle_auto_fire: true,
        ..FrameInput::default()
    };
    encounter.step(&toggle, FRAME);
    assert_eq!(
        encounter.drain_notifications(),
        vec![Notification::AutoFireChanged { enabled: true }]
    );
    assert!(encounter.is_auto_fire());

    let _ = run(&mut encounter, 10);
    assert_eq!(encounter.stats().player_volleys, 5);
}

#[test]
fn defeat_ends_the_encounter() {
    let mut config = quiet_config(vec![StageDefinition::new(vec![SpawnGroup::new(
        PatternKind::Normal,
        3,
    )])]);
    config.player.start_x = 600.0;
    config.player.hit_points = 1;
    let mut encounter = Encounter::new(config).expect("valid config");
    encounter.command(OperatorCommand::Start);

    let frame = Duration::from_millis(20);
    let mut notifications = Vec::new();
    for _ in 0..500 {
        encounter.step(&FrameInput::default(), frame);
        notifications.extend(encounter.drain_notifications());
    }

    assert_eq!(encounter.phase(), Phase::GameOver);
    assert_eq!(count(&notifications, &Notification::GameOver), 1);
    assert!(notifications.contains(&Notification::HpChanged { value: 0 }));

    let frames = encounter.stats().frames;
    encounter.command(OperatorCommand::Resume);
    encounter.command(OperatorCommand::Start);
    encounter.step(&FrameInput::default(), frame);
    assert_eq!(encounter.phase(), Phase::GameOver);
    assert_eq!(encounter.stats().frames, frames);
}

#[test]
fn invalid_configurations_are_rejected() {
    let config = EncounterConfig {
        stages: Roster::new(Vec::new()),
        ..EncounterConfig::default()
    };
    assert!(Encounter::new(config).is_err());
}

#[test]
fn shipped_configuration_matches_the_defaults() {
    let config = parse_config(include_str!("../../config/encounter.toml"))
        .expect("shipped configuration is valid");
    assert_eq!(config, EncounterConfig::default());
}

#[test]
fn full_runs_replay_deterministically() {
    let first = replay_fingerprint();
    let second = replay_fingerprint();
    assert_eq!(first, second, "replay diverged between runs");
}

fn replay_fingerprint() -> u64 {
    let mut encounter = Encounter::new(EncounterConfig::default()).expect("valid config");
    encounter.command(OperatorCommand::JumpToStage { stage: 4 });
    let inputs = [
        FrameInput {
            fire: true,
            left: true,
            ..FrameInput::default()
        },
        FrameInput {
            fire: true,
            right: true,
            slow: true,
            ..FrameInput::default()
        },
    ];

    let mut hasher = DefaultHasher::new();
    for frame in 0..600 {
        encounter.step(&inputs[(frame / 40) % inputs.len()], Duration::from_millis(16));
        for notification in encounter.drain_notifications() {
            format!("{notification:?}").hash(&mut hasher);
        }
    }
    encounter.stats().hash(&mut hasher);
    encounter.phase().hash(&mut hasher);
    hasher.finish()
}

use std::time::Duration;

use barrage_scheduler::{Fired, Scheduler};

fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}

fn drain<A: Clone>(scheduler: &mut Scheduler<A>) -> Vec<Fired<A>> {
    let mut fired = Vec::new();
    while let Some(occurrence) = scheduler.pop_due() {
        fired.push(occurrence);
    }
    fired
}

#[test]
fn after_fires_exactly_once() {
    let mut scheduler = Scheduler::new();
    let id = scheduler.after(ms(100), 'a');

    scheduler.advance(ms(99));
    assert!(drain(&mut scheduler).is_empty(), "not due yet");

    scheduler.advance(ms(1));
    let fired = drain(&mut scheduler);
    assert_eq!(fired.len(), 1);
    assert_eq!(fired[0].id, id);
    assert_eq!(fired[0].due, ms(100));
    assert!(fired[0].finished);

    scheduler.advance(ms(1_000));
    assert!(drain(&mut scheduler).is_empty(), "one-shot timers never repeat");
    assert!(scheduler.is_empty());
}

#[test]
fn ties_fire_in_registration_order() {
    let mut scheduler = Scheduler::new();
    let _ = scheduler.after(ms(50), "first");
    let _ = scheduler.every(ms(50), "second");
    let _ = scheduler.after(ms(50), "third");
    let _ = scheduler.after(ms(10), "earliest");

    scheduler.advance(ms(50));
    let order: Vec<&str> = drain(&mut scheduler)
        .into_iter()
        .map(|fired| fired.action)
        .collect();

    assert_eq!(order, vec!["earliest", "first", "second", "third"]);
}

#[test]
fn every_n_fires_exactly_repeat_count_times() {
    let mut scheduler = Scheduler::new();
    let id = scheduler.every_n(ms(300), 3, "burst");

    let mut occurrences = Vec::new();
    for _ in 0..20 {
        scheduler.advance(ms(100));
        occurrences.extend(drain(&mut scheduler));
    }

    assert_eq!(occurrences.len(), 3);
    let dues: Vec<Duration> = occurrences.iter().map(|fired| fired.due).collect();
    assert_eq!(dues, vec![ms(300), ms(600), ms(900)]);
    let iterations: Vec<u32> = occurrences.iter().map(|fired| fired.iteration).collect();
    assert_eq!(iterations, vec![1, 2, 3]);
    assert_eq!(
        occurrences.iter().filter(|fired| fired.finished).count(),
        1,
        "only the final occurrence reports completion"
    );
    assert!(occurrences[2].finished);
    assert!(!scheduler.is_scheduled(id), "auto-cancelled after the last repeat");
}

#[test]
fn long_advance_interleaves_repeating_and_delayed_timers() {
    let mut scheduler = Scheduler::new();
    let _ = scheduler.every(ms(40), "repeat");
    let _ = scheduler.after(ms(90), "delayed");

    scheduler.advance(ms(130));
    let fired: Vec<(&str, Duration)> = drain(&mut scheduler)
        .into_iter()
        .map(|fired| (fired.action, fired.due))
        .collect();

    assert_eq!(
        fired,
        vec![
            ("repeat", ms(40)),
            ("repeat", ms(80)),
            ("delayed", ms(90)),
            ("repeat", ms(120)),
        ]
    );
}

#[test]
fn cancel_is_idempotent() {
    let mut scheduler = Scheduler::new();
    let id = scheduler.every(ms(10), ());

    assert!(scheduler.is_scheduled(id));
    assert!(scheduler.cancel(id));
    assert!(!scheduler.cancel(id));
    assert!(!scheduler.is_scheduled(id));

    scheduler.advance(ms(100));
    assert!(drain(&mut scheduler).is_empty());
}

#[test]
fn timers_registered_later_start_from_the_current_clock() {
    let mut scheduler = Scheduler::new();
    scheduler.advance(ms(1_000));
    let _ = scheduler.after(ms(200), "late");

    assert_eq!(scheduler.next_due(), Some(ms(1_200)));
    scheduler.advance(ms(199));
    assert!(drain(&mut scheduler).is_empty());
    scheduler.advance(ms(1));
    assert_eq!(drain(&mut scheduler).len(), 1);
}

#[test]
fn clear_drops_pending_timers_but_keeps_the_clock() {
    let mut scheduler = Scheduler::new();
    let _ = scheduler.every(ms(5), 1u8);
    let _ = scheduler.after(ms(5), 2u8);
    scheduler.advance(ms(3));

    scheduler.clear();

    assert!(scheduler.is_empty());
    assert_eq!(scheduler.now(), ms(3));
    scheduler.advance(ms(100));
    assert!(drain(&mut scheduler).is_empty());
}
